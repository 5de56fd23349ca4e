//! In-process stand-ins for the network clients

use std::collections::{HashMap, VecDeque};
use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::Result;
use async_trait::async_trait;

use crate::ai::{GenerationParams, LanguageModel};
use crate::bsky::FeedClient;
use crate::models::{Notification, RecordLookup, ResolvedRecord, StrongRef};
use crate::store::{PipelineState, StateStore, StoreError};

#[derive(Debug, Clone, PartialEq)]
pub struct PostedReply {
    pub text: String,
    pub root: StrongRef,
    pub parent: StrongRef,
}

#[derive(Default)]
pub struct FakeFeed {
    notifications: Vec<Notification>,
    records: HashMap<String, ResolvedRecord>,
    fail_fetch: bool,
    fail_posts: bool,
    fail_seen: bool,
    lookups: Mutex<Vec<String>>,
    posts: Mutex<Vec<PostedReply>>,
    seen: Mutex<Vec<String>>,
}

impl FakeFeed {
    pub fn with_notifications(mut self, notifications: Vec<Notification>) -> Self {
        self.notifications = notifications;
        self
    }

    pub fn with_record(mut self, record: ResolvedRecord) -> Self {
        self.records.insert(record.uri.clone(), record);
        self
    }

    pub fn failing_fetch(mut self) -> Self {
        self.fail_fetch = true;
        self
    }

    pub fn failing_posts(mut self) -> Self {
        self.fail_posts = true;
        self
    }

    pub fn failing_seen(mut self) -> Self {
        self.fail_seen = true;
        self
    }

    pub fn lookups(&self) -> Vec<String> {
        self.lookups.lock().unwrap().clone()
    }

    pub fn posts(&self) -> Vec<PostedReply> {
        self.posts.lock().unwrap().clone()
    }

    pub fn seen(&self) -> Vec<String> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl FeedClient for FakeFeed {
    async fn fetch_notifications(&self) -> Result<Vec<Notification>> {
        if self.fail_fetch {
            anyhow::bail!("listNotifications failed (500)");
        }
        Ok(self.notifications.clone())
    }

    async fn resolve_record(&self, uri: &str) -> RecordLookup {
        self.lookups.lock().unwrap().push(uri.to_string());
        match self.records.get(uri) {
            Some(record) => RecordLookup::Found(record.clone()),
            None => RecordLookup::unavailable(uri, "not found"),
        }
    }

    async fn post_reply(&self, text: &str, root: &StrongRef, parent: &StrongRef) -> Result<StrongRef> {
        if self.fail_posts {
            anyhow::bail!("createRecord failed (400)");
        }
        let mut posts = self.posts.lock().unwrap();
        posts.push(PostedReply {
            text: text.to_string(),
            root: root.clone(),
            parent: parent.clone(),
        });
        Ok(StrongRef::new(
            format!("at://did:plc:bot/app.bsky.feed.post/reply{}", posts.len()),
            format!("bafyreply{}", posts.len()),
        ))
    }

    async fn update_seen(&self, seen_at: &str) -> Result<()> {
        self.seen.lock().unwrap().push(seen_at.to_string());
        if self.fail_seen {
            anyhow::bail!("updateSeen failed (500)");
        }
        Ok(())
    }
}

/// Loads a fixed state and rejects every save, like a read-only data dir
pub struct ReadOnlyStore {
    state: PipelineState,
}

impl ReadOnlyStore {
    pub fn new(state: PipelineState) -> Self {
        Self { state }
    }
}

impl StateStore for ReadOnlyStore {
    fn load(&self) -> PipelineState {
        self.state.clone()
    }

    fn save(&self, _state: &PipelineState) -> Result<(), StoreError> {
        Err(StoreError::Write {
            path: PathBuf::from("state.json"),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only"),
        })
    }
}

/// Replays scripted completions in order. `Err` entries fail that call; once
/// the script runs out every call returns the last entry again.
pub struct ScriptedModel {
    script: Mutex<VecDeque<Result<String, String>>>,
    last: Mutex<Option<Result<String, String>>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedModel {
    pub fn new(script: Vec<Result<&str, &str>>) -> Self {
        Self {
            script: Mutex::new(
                script
                    .into_iter()
                    .map(|r| r.map(str::to_string).map_err(str::to_string))
                    .collect(),
            ),
            last: Mutex::new(None),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn always(text: &str) -> Self {
        Self::new(vec![Ok(text)])
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl LanguageModel for ScriptedModel {
    async fn complete(&self, prompt: &str, _params: &GenerationParams) -> Result<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        let next = self.script.lock().unwrap().pop_front();
        let mut last = self.last.lock().unwrap();
        if let Some(entry) = next {
            *last = Some(entry);
        }
        match last.clone() {
            Some(Ok(text)) => Ok(text),
            Some(Err(message)) => Err(anyhow::anyhow!(message)),
            None => anyhow::bail!("no scripted completion"),
        }
    }
}
