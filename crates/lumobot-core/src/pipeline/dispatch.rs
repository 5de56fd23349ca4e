use std::path::PathBuf;
use std::time::Duration;

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::Serialize;

use super::filter::NotificationFilter;
use super::generator::ReplyGenerator;
use super::resolver::resolve_thread;
use crate::ai::LanguageModel;
use crate::bsky::FeedClient;
use crate::config::{BotConfig, DelayConfig};
use crate::constants::PAUSE_MARKER;
use crate::error::BotError;
use crate::models::{timestamp, Notification};
use crate::store::{PipelineState, StateStore, UsageCounter};

/// Per-run settings taken from `BotConfig` plus CLI flags
#[derive(Debug, Clone)]
pub struct DispatchOptions {
    pub owner_did: String,
    pub bot_did: String,
    pub bot_handle: String,
    pub delay: DelayConfig,
    pub monthly_quota: Option<u32>,
    /// Generate but do not post or mark seen
    pub dry_run: bool,
    /// The run is a no-op while this file exists
    pub pause_marker: Option<PathBuf>,
}

impl DispatchOptions {
    pub fn from_config(config: &BotConfig) -> Self {
        Self {
            owner_did: config.owner_did.clone(),
            bot_did: config.bot_did.clone(),
            bot_handle: config.bot_handle.clone(),
            delay: config.delay,
            monthly_quota: config.monthly_quota,
            dry_run: false,
            pause_marker: Some(config.data_dir().join(PAUSE_MARKER)),
        }
    }
}

/// Summary of one pass, printed by the CLI
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunReport {
    pub paused: bool,
    pub dry_run: bool,
    pub fetched: usize,
    pub eligible: usize,
    /// Replies posted (drafted, in a dry run)
    pub posted: usize,
    /// Generation or post failures; these still advance the cursor
    pub failed: usize,
    /// Eligible notifications left for a later run because the quota was hit
    pub skipped_quota: usize,
    pub cursor: Option<String>,
    /// Model calls made so far this month
    pub usage: u32,
}

impl RunReport {
    /// Report for a skipped run, carrying the persisted cursor and this
    /// month's usage
    pub fn paused(mut state: PipelineState, dry_run: bool, now: DateTime<Utc>) -> Self {
        state.usage.roll_over(&UsageCounter::month_of(now));
        Self {
            paused: true,
            dry_run,
            cursor: state.cursor,
            usage: state.usage.count,
            ..Default::default()
        }
    }
}

/// One fetch-filter-reply pass over the notification list.
///
/// State is loaded once at the start and saved once at the end. Each eligible
/// notification is answered at most once: the cursor moves past it whether or
/// not the reply went out.
pub struct Dispatcher<'a> {
    feed: &'a dyn FeedClient,
    generator: ReplyGenerator<'a>,
    store: &'a dyn StateStore,
    filter: NotificationFilter,
    options: DispatchOptions,
}

impl<'a> Dispatcher<'a> {
    pub fn new(
        feed: &'a dyn FeedClient,
        model: &'a dyn LanguageModel,
        store: &'a dyn StateStore,
        options: DispatchOptions,
    ) -> Self {
        Self {
            feed,
            generator: ReplyGenerator::new(model, options.bot_handle.clone())
                .with_quota(options.monthly_quota),
            store,
            filter: NotificationFilter::new(options.owner_did.clone(), options.bot_did.clone()),
            options,
        }
    }

    pub async fn run(&self) -> Result<RunReport, BotError> {
        self.run_at(Utc::now()).await
    }

    /// Run with an explicit clock for the monthly usage rollover
    pub async fn run_at(&self, now: DateTime<Utc>) -> Result<RunReport, BotError> {
        let mut state = self.store.load();
        if self.is_paused() {
            tracing::info!("Pause marker present, skipping run");
            return Ok(RunReport::paused(state, self.options.dry_run, now));
        }

        let month = UsageCounter::month_of(now);
        if state.usage.roll_over(&month) {
            tracing::info!(month = %month, "Usage counter reset for new month");
        }

        let mut report = RunReport {
            dry_run: self.options.dry_run,
            ..Default::default()
        };

        let notifications = self
            .feed
            .fetch_notifications()
            .await
            .map_err(BotError::Fetch)?;
        let cursor_before = state.cursor.clone();
        let eligible = self.filter.select(&notifications, state.cursor.as_deref());

        report.fetched = notifications.len();
        report.eligible = eligible.len();
        tracing::info!(
            fetched = report.fetched,
            eligible = report.eligible,
            cursor = ?state.cursor,
            "Fetched notifications"
        );

        for (i, notification) in eligible.iter().enumerate() {
            if self.quota_reached(&state) {
                report.skipped_quota = eligible.len() - i;
                tracing::warn!(
                    used = state.usage.count,
                    remaining = report.skipped_quota,
                    "Monthly quota reached, leaving notifications for a later run"
                );
                break;
            }
            if i > 0 {
                self.pause_between_replies().await;
            }

            if self.process(notification, &mut state).await {
                report.posted += 1;
            } else {
                report.failed += 1;
            }
            state.advance_cursor(&notification.indexed_at);
        }

        if eligible.is_empty() {
            if let Some(latest) = latest_indexed_at(&notifications) {
                state.advance_cursor(latest);
            }
        }

        if state.cursor != cursor_before {
            self.mark_seen(state.cursor.as_deref()).await;
        }

        self.store.save(&state)?;

        report.cursor = state.cursor.clone();
        report.usage = state.usage.count;
        tracing::info!(
            posted = report.posted,
            failed = report.failed,
            skipped_quota = report.skipped_quota,
            cursor = ?report.cursor,
            "Run finished"
        );
        Ok(report)
    }

    /// Resolve, generate and post. Returns true if a reply went out.
    async fn process(&self, notification: &Notification, state: &mut PipelineState) -> bool {
        let thread = resolve_thread(self.feed, notification).await;

        let draft = match self.generator.generate(notification, &thread, state).await {
            Ok(draft) => draft,
            Err(e) => {
                tracing::warn!(uri = %notification.uri, "Reply generation failed: {:#}", e);
                return false;
            }
        };

        if self.options.dry_run {
            tracing::info!(
                uri = %draft.target,
                root = %thread.root.uri,
                parent = %thread.parent.uri,
                text = %draft.text,
                "Dry run, not posting"
            );
            state.remember_reply(&draft.text);
            return true;
        }

        match self
            .feed
            .post_reply(&draft.text, &thread.root, &thread.parent)
            .await
        {
            Ok(created) => {
                tracing::info!(
                    uri = %draft.target,
                    reply = %created.uri,
                    regenerated = draft.regenerated,
                    "Posted reply"
                );
                state.remember_reply(&draft.text);
                true
            }
            Err(e) => {
                tracing::warn!(uri = %draft.target, "Failed to post reply: {:#}", e);
                false
            }
        }
    }

    async fn mark_seen(&self, cursor: Option<&str>) {
        let Some(cursor) = cursor else {
            return;
        };
        if self.options.dry_run {
            tracing::info!(cursor = %cursor, "Dry run, not marking notifications seen");
            return;
        }
        if let Err(e) = self.feed.update_seen(cursor).await {
            tracing::warn!(cursor = %cursor, "Failed to mark notifications seen: {:#}", e);
        }
    }

    fn is_paused(&self) -> bool {
        self.options
            .pause_marker
            .as_ref()
            .is_some_and(|marker| marker.exists())
    }

    fn quota_reached(&self, state: &PipelineState) -> bool {
        self.options
            .monthly_quota
            .is_some_and(|quota| state.usage.count >= quota)
    }

    fn next_delay(&self) -> Duration {
        let (min, max) = self.options.delay.range();
        if max <= min {
            return min;
        }
        rand::thread_rng().gen_range(min..=max)
    }

    async fn pause_between_replies(&self) {
        let delay = self.next_delay();
        if delay.is_zero() {
            return;
        }
        tracing::debug!(secs = delay.as_secs(), "Waiting before next reply");
        tokio::time::sleep(delay).await;
    }
}

fn latest_indexed_at(notifications: &[Notification]) -> Option<&str> {
    notifications
        .iter()
        .map(|n| n.indexed_at.as_str())
        .filter(|ts| !ts.is_empty())
        .max_by(|a, b| timestamp::compare(a, b))
}
