use anyhow::Result;

use super::text::{collapse_whitespace, finalize_reply, normalize_mention, truncate_at_word};
use crate::ai::{GenerationParams, LanguageModel};
use crate::constants::{PROMPT_CONTEXT_CHARS, PROMPT_MESSAGE_CHARS};
use crate::models::{Notification, ReplyDraft, ThreadContext};
use crate::store::PipelineState;

const DIRECTIVE: &str = "You are a helpful assistant replying to posts on Bluesky. \
Respond concisely in under 300 characters, in plain text, without links or emojis. \
Do not repeat content from earlier replies.";

const RETRY_DIRECTIVE: &str = "Give a different response than your previous one.";

pub fn build_prompt(message: &str, context: Option<&str>) -> String {
    let mut prompt = String::from(DIRECTIVE);
    if let Some(context) = context {
        let context = truncate_at_word(&collapse_whitespace(context), PROMPT_CONTEXT_CHARS);
        prompt.push_str("\n\nReplied-to context: ");
        prompt.push_str(&context);
    }
    prompt.push_str("\n\nMessage: ");
    prompt.push_str(&truncate_at_word(message, PROMPT_MESSAGE_CHARS));
    prompt
}

/// Prompt used once when the first answer duplicated a recent reply
pub fn build_retry_prompt(message: &str) -> String {
    format!(
        "{} {}\n\nMessage: {}",
        DIRECTIVE,
        RETRY_DIRECTIVE,
        truncate_at_word(message, PROMPT_MESSAGE_CHARS)
    )
}

/// Turns an eligible notification into a reply draft
pub struct ReplyGenerator<'a> {
    model: &'a dyn LanguageModel,
    bot_handle: String,
    params: GenerationParams,
    monthly_quota: Option<u32>,
}

impl<'a> ReplyGenerator<'a> {
    pub fn new(model: &'a dyn LanguageModel, bot_handle: impl Into<String>) -> Self {
        Self {
            model,
            bot_handle: bot_handle.into(),
            params: GenerationParams::default(),
            monthly_quota: None,
        }
    }

    /// Skip the duplicate regeneration once usage has reached `quota`
    pub fn with_quota(mut self, quota: Option<u32>) -> Self {
        self.monthly_quota = quota;
        self
    }

    /// Generate a reply, regenerating once if it matches a recent reply.
    ///
    /// Every model call is counted in `state.usage`, including failed ones.
    /// When the first call used up the monthly quota the duplicate is kept.
    pub async fn generate(
        &self,
        notification: &Notification,
        thread: &ThreadContext,
        state: &mut PipelineState,
    ) -> Result<ReplyDraft> {
        let message = normalize_mention(&notification.text, &self.bot_handle);
        if !message.mentioned {
            tracing::debug!(uri = %notification.uri, "No leading mention token");
        }

        let prompt = build_prompt(&message.text, thread.parent_text.as_deref());
        let first = self.complete(&prompt, state).await?;

        if !state.is_recent_reply(&first) {
            return Ok(ReplyDraft {
                text: first,
                target: notification.uri.clone(),
                regenerated: false,
            });
        }

        if self
            .monthly_quota
            .is_some_and(|quota| state.usage.count >= quota)
        {
            tracing::warn!(
                uri = %notification.uri,
                used = state.usage.count,
                "Reply matches a recent one but the monthly quota is used up, keeping it"
            );
            return Ok(ReplyDraft {
                text: first,
                target: notification.uri.clone(),
                regenerated: false,
            });
        }

        tracing::info!(uri = %notification.uri, "Reply matches a recent one, regenerating");
        let retry = self.complete(&build_retry_prompt(&message.text), state).await?;

        Ok(ReplyDraft {
            text: retry,
            target: notification.uri.clone(),
            regenerated: true,
        })
    }

    async fn complete(&self, prompt: &str, state: &mut PipelineState) -> Result<String> {
        state.usage.record_call();
        let raw = self.model.complete(prompt, &self.params).await?;
        Ok(finalize_reply(&raw))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::{CLARIFICATION_REPLY, MAX_REPLY_CHARS};
    use crate::models::{Reason, StrongRef};
    use crate::pipeline::testing::ScriptedModel;

    fn notification(text: &str) -> Notification {
        Notification {
            uri: "at://did:plc:owner/app.bsky.feed.post/n".to_string(),
            cid: "cid-n".to_string(),
            author_did: "did:plc:owner".to_string(),
            author_handle: "owner.test".to_string(),
            reason: Reason::Mention,
            indexed_at: "2024-01-02T00:00:00Z".to_string(),
            record_type: "app.bsky.feed.post".to_string(),
            text: text.to_string(),
            reply: None,
        }
    }

    fn standalone() -> ThreadContext {
        ThreadContext::standalone(StrongRef::new("at://did:plc:owner/app.bsky.feed.post/n", "cid-n"))
    }

    #[test]
    fn test_prompt_contains_message_and_context() {
        let prompt = build_prompt("what time is it", Some("It   was\nnoon"));
        assert!(prompt.starts_with(DIRECTIVE));
        assert!(prompt.contains("Replied-to context: It was noon"));
        assert!(prompt.ends_with("Message: what time is it"));

        let prompt = build_prompt("hi", None);
        assert!(!prompt.contains("Replied-to context"));
    }

    #[test]
    fn test_prompt_is_bounded() {
        let long = "word ".repeat(2000);
        let prompt = build_prompt(long.trim(), Some(long.trim()));
        let bound = DIRECTIVE.chars().count() + PROMPT_MESSAGE_CHARS + PROMPT_CONTEXT_CHARS + 64;
        assert!(prompt.chars().count() < bound);
    }

    #[tokio::test]
    async fn test_generate_strips_mention_and_counts_call() {
        let model = ScriptedModel::always("It is noon.");
        let generator = ReplyGenerator::new(&model, "bot");
        let mut state = PipelineState::default();

        let draft = generator
            .generate(&notification("@bot what time is it"), &standalone(), &mut state)
            .await
            .unwrap();

        assert_eq!(draft.text, "It is noon.");
        assert!(!draft.regenerated);
        assert_eq!(draft.target, "at://did:plc:owner/app.bsky.feed.post/n");
        assert_eq!(state.usage.count, 1);
        let prompts = model.prompts();
        assert!(prompts[0].ends_with("Message: what time is it"));
    }

    #[tokio::test]
    async fn test_duplicate_regenerates_once() {
        let model = ScriptedModel::new(vec![Ok("It is noon."), Ok("IT IS NOON.")]);
        let generator = ReplyGenerator::new(&model, "bot");
        let mut state = PipelineState::default();
        state.remember_reply("it is noon.");

        let draft = generator
            .generate(&notification("@bot time?"), &standalone(), &mut state)
            .await
            .unwrap();

        // second result is used even though it still collides
        assert_eq!(draft.text, "IT IS NOON.");
        assert!(draft.regenerated);
        assert_eq!(state.usage.count, 2);
        let prompts = model.prompts();
        assert_eq!(prompts.len(), 2);
        assert!(prompts[1].contains(RETRY_DIRECTIVE));
    }

    #[tokio::test]
    async fn test_duplicate_not_regenerated_past_quota() {
        let model = ScriptedModel::new(vec![Ok("It is noon."), Ok("Midday.")]);
        let generator = ReplyGenerator::new(&model, "bot").with_quota(Some(3));
        let mut state = PipelineState::default();
        state.remember_reply("it is noon.");
        state.usage.count = 2;

        let draft = generator
            .generate(&notification("@bot time?"), &standalone(), &mut state)
            .await
            .unwrap();

        assert_eq!(draft.text, "It is noon.");
        assert!(!draft.regenerated);
        assert_eq!(state.usage.count, 3);
        assert_eq!(model.prompts().len(), 1);

        // below the quota the retry still happens
        let model = ScriptedModel::new(vec![Ok("It is noon."), Ok("Midday.")]);
        let generator = ReplyGenerator::new(&model, "bot").with_quota(Some(4));
        let mut state = PipelineState::default();
        state.remember_reply("it is noon.");
        state.usage.count = 2;

        let draft = generator
            .generate(&notification("@bot time?"), &standalone(), &mut state)
            .await
            .unwrap();
        assert_eq!(draft.text, "Midday.");
        assert_eq!(state.usage.count, 4);
    }

    #[tokio::test]
    async fn test_model_error_propagates_and_is_counted() {
        let model = ScriptedModel::new(vec![Err("model loading")]);
        let generator = ReplyGenerator::new(&model, "bot");
        let mut state = PipelineState::default();

        let result = generator
            .generate(&notification("@bot hi"), &standalone(), &mut state)
            .await;
        assert!(result.is_err());
        assert_eq!(state.usage.count, 1);
    }

    #[tokio::test]
    async fn test_output_is_post_processed() {
        let model = ScriptedModel::always("Sorry, I don't know.");
        let generator = ReplyGenerator::new(&model, "bot");
        let mut state = PipelineState::default();
        let draft = generator
            .generate(&notification("@bot ?"), &standalone(), &mut state)
            .await
            .unwrap();
        assert_eq!(draft.text, CLARIFICATION_REPLY);

        let model = ScriptedModel::always(&"long words here ".repeat(50));
        let generator = ReplyGenerator::new(&model, "bot");
        let draft = generator
            .generate(&notification("@bot essay"), &standalone(), &mut state)
            .await
            .unwrap();
        assert!(draft.text.chars().count() <= MAX_REPLY_CHARS);
    }
}
