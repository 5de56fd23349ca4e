use crate::bsky::FeedClient;
use crate::models::{Notification, RecordLookup, StrongRef, ThreadContext};

/// Work out where a reply to `notification` attaches.
///
/// - A post that is not itself a reply starts its own thread: root and parent
///   are both the post.
/// - Otherwise the parent is the triggering post and the root is the root it
///   declares. The post's own record is dereferenced for its current reply
///   relationship; the relationship carried on the notification is the
///   fallback.
///
/// Never fails. Anything that cannot be looked up keeps its identifier and
/// gets the placeholder hash.
pub async fn resolve_thread(feed: &dyn FeedClient, notification: &Notification) -> ThreadContext {
    let Some(summary) = &notification.reply else {
        return ThreadContext::standalone(own_ref(feed, notification).await);
    };

    let own = feed.resolve_record(&notification.uri).await;
    log_unavailable(&own);

    let declared = own
        .found()
        .and_then(|record| record.reply.clone())
        .unwrap_or_else(|| summary.clone());

    let parent = match &own {
        RecordLookup::Found(record) => record.strong_ref(),
        RecordLookup::Unavailable { .. } => notification.strong_ref(),
    };

    let root_lookup = if declared.root.uri == notification.uri {
        own.clone()
    } else {
        lookup(feed, &declared.root.uri).await
    };

    let replied_to = if declared.parent.uri == declared.root.uri {
        root_lookup.clone()
    } else {
        lookup(feed, &declared.parent.uri).await
    };

    let parent_text = replied_to
        .found()
        .map(|record| record.text.trim().to_string())
        .filter(|text| !text.is_empty());

    ThreadContext {
        root: root_lookup.strong_ref(),
        parent,
        parent_text,
    }
}

/// The notification's own identifier and hash, looked up only when the
/// listing did not carry a hash
async fn own_ref(feed: &dyn FeedClient, notification: &Notification) -> StrongRef {
    if !notification.cid.is_empty() {
        return notification.strong_ref();
    }
    lookup(feed, &notification.uri).await.strong_ref()
}

async fn lookup(feed: &dyn FeedClient, uri: &str) -> RecordLookup {
    let result = feed.resolve_record(uri).await;
    log_unavailable(&result);
    result
}

fn log_unavailable(lookup: &RecordLookup) {
    if let RecordLookup::Unavailable { uri, reason } = lookup {
        tracing::warn!(uri = %uri, "Record unavailable, using placeholder hash: {}", reason);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::PLACEHOLDER_CID;
    use crate::models::{Reason, ReplyRef, ResolvedRecord};
    use crate::pipeline::testing::FakeFeed;

    const ROOT: &str = "at://did:plc:bot/app.bsky.feed.post/root";
    const BOT_POST: &str = "at://did:plc:bot/app.bsky.feed.post/p";
    const OWNER_POST: &str = "at://did:plc:owner/app.bsky.feed.post/n";

    fn record(uri: &str, cid: &str, text: &str, reply: Option<ReplyRef>) -> ResolvedRecord {
        ResolvedRecord {
            uri: uri.to_string(),
            cid: cid.to_string(),
            text: text.to_string(),
            reply,
        }
    }

    fn notification(uri: &str, cid: &str, reply: Option<ReplyRef>) -> Notification {
        Notification {
            uri: uri.to_string(),
            cid: cid.to_string(),
            author_did: "did:plc:owner".to_string(),
            author_handle: "owner.test".to_string(),
            reason: if reply.is_some() { Reason::Reply } else { Reason::Mention },
            indexed_at: "2024-01-02T00:00:00Z".to_string(),
            record_type: "app.bsky.feed.post".to_string(),
            text: "@bot hi".to_string(),
            reply,
        }
    }

    fn reply_ref(root: &str, parent: &str) -> ReplyRef {
        ReplyRef {
            root: StrongRef::new(root, "stale-root"),
            parent: StrongRef::new(parent, "stale-parent"),
        }
    }

    #[tokio::test]
    async fn test_standalone_post_uses_its_own_ref() {
        let feed = FakeFeed::default();
        let n = notification(OWNER_POST, "cid-n", None);

        let ctx = resolve_thread(&feed, &n).await;
        assert_eq!(ctx.root, StrongRef::new(OWNER_POST, "cid-n"));
        assert_eq!(ctx.parent, ctx.root);
        assert!(ctx.is_standalone());
        assert!(feed.lookups().is_empty());
    }

    #[tokio::test]
    async fn test_standalone_without_cid_is_dereferenced() {
        let feed = FakeFeed::default().with_record(record(OWNER_POST, "cid-fresh", "hi", None));
        let n = notification(OWNER_POST, "", None);

        let ctx = resolve_thread(&feed, &n).await;
        assert_eq!(ctx.root.cid, "cid-fresh");
        assert_eq!(ctx.parent.cid, "cid-fresh");
    }

    #[tokio::test]
    async fn test_reply_resolves_root_and_parent_text() {
        let declared = reply_ref(ROOT, BOT_POST);
        let feed = FakeFeed::default()
            .with_record(record(OWNER_POST, "cid-n", "@bot why?", Some(declared.clone())))
            .with_record(record(ROOT, "cid-root", "thread start", None))
            .with_record(record(BOT_POST, "cid-p", "It is noon.", None));
        let n = notification(OWNER_POST, "cid-n", Some(declared));

        let ctx = resolve_thread(&feed, &n).await;
        assert_eq!(ctx.root, StrongRef::new(ROOT, "cid-root"));
        assert_eq!(ctx.parent, StrongRef::new(OWNER_POST, "cid-n"));
        assert_eq!(ctx.parent_text.as_deref(), Some("It is noon."));
    }

    #[tokio::test]
    async fn test_root_equal_to_parent_is_looked_up_once() {
        let declared = reply_ref(BOT_POST, BOT_POST);
        let feed = FakeFeed::default()
            .with_record(record(OWNER_POST, "cid-n", "@bot more", Some(declared.clone())))
            .with_record(record(BOT_POST, "cid-p", "Earlier answer", None));
        let n = notification(OWNER_POST, "cid-n", Some(declared));

        let ctx = resolve_thread(&feed, &n).await;
        assert_eq!(ctx.root, StrongRef::new(BOT_POST, "cid-p"));
        assert_eq!(ctx.parent_text.as_deref(), Some("Earlier answer"));
        assert_eq!(feed.lookups(), vec![OWNER_POST.to_string(), BOT_POST.to_string()]);
    }

    #[tokio::test]
    async fn test_unavailable_root_gets_placeholder() {
        let declared = reply_ref(ROOT, BOT_POST);
        let feed = FakeFeed::default()
            .with_record(record(OWNER_POST, "cid-n", "@bot", Some(declared.clone())))
            .with_record(record(BOT_POST, "cid-p", "parent", None));
        let n = notification(OWNER_POST, "cid-n", Some(declared));

        let ctx = resolve_thread(&feed, &n).await;
        assert_eq!(ctx.root.uri, ROOT);
        assert_eq!(ctx.root.cid, PLACEHOLDER_CID);
        assert_eq!(ctx.parent.cid, "cid-n");
    }

    #[tokio::test]
    async fn test_unavailable_own_record_falls_back_to_notification() {
        let feed = FakeFeed::default();
        let n = notification(OWNER_POST, "cid-n", Some(reply_ref(ROOT, BOT_POST)));

        let ctx = resolve_thread(&feed, &n).await;
        assert_eq!(ctx.parent, StrongRef::new(OWNER_POST, "cid-n"));
        assert_eq!(ctx.root, StrongRef::placeholder(ROOT));
        assert_eq!(ctx.parent_text, None);
    }
}
