//! XRPC client for the handful of endpoints the pipeline needs.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use super::auth::Session;
use super::FeedClient;
use crate::constants::{nsid, DEFAULT_NOTIFICATION_LIMIT, REQUEST_TIMEOUT};
use crate::models::{timestamp, AtUri, Notification, PostRecord, RecordLookup, ResolvedRecord, StrongRef};

#[derive(Debug, Deserialize)]
struct ListNotificationsResponse {
    #[serde(default)]
    notifications: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct GetRecordResponse {
    uri: String,
    cid: Option<String>,
    #[serde(default)]
    value: Value,
}

#[derive(Debug, Deserialize)]
struct CreateRecordResponse {
    uri: String,
    cid: String,
}

pub struct BskyClient {
    service_url: String,
    session: Session,
    notification_limit: u32,
    client: reqwest::Client,
}

impl BskyClient {
    pub fn new(client: reqwest::Client, service_url: &str, session: Session) -> Self {
        Self {
            service_url: service_url.trim_end_matches('/').to_string(),
            session,
            notification_limit: DEFAULT_NOTIFICATION_LIMIT,
            client,
        }
    }

    pub fn with_notification_limit(mut self, limit: u32) -> Self {
        self.notification_limit = limit;
        self
    }

    fn xrpc_url(&self, method: &str) -> String {
        format!("{}/xrpc/{}", self.service_url, method)
    }

    fn authorized(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        request
            .timeout(REQUEST_TIMEOUT)
            .header("Authorization", format!("Bearer {}", self.session.access_jwt))
    }

    async fn get_record(&self, uri: &str) -> Result<ResolvedRecord> {
        let at_uri = AtUri::parse(uri)?;

        let response = self
            .authorized(self.client.get(self.xrpc_url(nsid::GET_RECORD)))
            .query(&[
                ("repo", at_uri.authority.as_str()),
                ("collection", at_uri.collection.as_str()),
                ("rkey", at_uri.rkey.as_str()),
            ])
            .send()
            .await
            .context("Failed to send getRecord request")?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            anyhow::bail!("getRecord error ({}): {}", status, error_text);
        }

        let body: GetRecordResponse = response
            .json()
            .await
            .context("Failed to parse getRecord response")?;

        let cid = body
            .cid
            .filter(|c| !c.is_empty())
            .context("getRecord response carried no cid")?;

        let record = PostRecord::from_value(&body.value);
        Ok(ResolvedRecord {
            uri: body.uri,
            cid,
            text: record.text,
            reply: record.reply,
        })
    }
}

#[async_trait]
impl FeedClient for BskyClient {
    async fn fetch_notifications(&self) -> Result<Vec<Notification>> {
        let response = self
            .authorized(self.client.get(self.xrpc_url(nsid::LIST_NOTIFICATIONS)))
            .query(&[("limit", self.notification_limit.to_string())])
            .send()
            .await
            .context("Failed to send listNotifications request")?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            anyhow::bail!("listNotifications error ({}): {}", status, error_text);
        }

        let body: ListNotificationsResponse = response
            .json()
            .await
            .context("Failed to parse listNotifications response")?;

        let total = body.notifications.len();
        let notifications: Vec<Notification> = body
            .notifications
            .iter()
            .filter_map(Notification::from_value)
            .collect();

        if notifications.len() != total {
            tracing::debug!(
                "dropped {} non-object notification entries",
                total - notifications.len()
            );
        }
        Ok(notifications)
    }

    async fn resolve_record(&self, uri: &str) -> RecordLookup {
        match self.get_record(uri).await {
            Ok(record) => RecordLookup::Found(record),
            Err(e) => {
                tracing::debug!("could not resolve {}: {:#}", uri, e);
                RecordLookup::unavailable(uri, format!("{e:#}"))
            }
        }
    }

    async fn post_reply(&self, text: &str, root: &StrongRef, parent: &StrongRef) -> Result<StrongRef> {
        let body = serde_json::json!({
            "repo": self.session.did,
            "collection": nsid::FEED_POST,
            "record": {
                "$type": nsid::FEED_POST,
                "text": text,
                "createdAt": timestamp::now_rfc3339(),
                "reply": {
                    "root": root,
                    "parent": parent,
                },
            },
        });

        let response = self
            .authorized(self.client.post(self.xrpc_url(nsid::CREATE_RECORD)))
            .json(&body)
            .send()
            .await
            .context("Failed to send createRecord request")?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            anyhow::bail!("createRecord error ({}): {}", status, error_text);
        }

        let created: CreateRecordResponse = response
            .json()
            .await
            .context("Failed to parse createRecord response")?;

        Ok(StrongRef::new(created.uri, created.cid))
    }

    async fn update_seen(&self, seen_at: &str) -> Result<()> {
        let response = self
            .authorized(self.client.post(self.xrpc_url(nsid::UPDATE_SEEN)))
            .json(&serde_json::json!({ "seenAt": seen_at }))
            .send()
            .await
            .context("Failed to send updateSeen request")?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            anyhow::bail!("updateSeen error ({}): {}", status, error_text);
        }
        Ok(())
    }
}
