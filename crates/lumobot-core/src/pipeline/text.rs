//! Text rules for incoming posts and outgoing replies.
//!
//! Mention handling:
//! - whitespace is collapsed to single spaces
//! - one leading `@<bot handle>` token is removed, compared case-insensitively,
//!   with an optional trailing `:` or `,`
//! - only the first token is considered; a handle further into the text stays
//! - if removing the token leaves nothing, the collapsed original is kept
//!
//! Reply finalization:
//! - links and emoji are removed, whitespace collapsed
//! - any low-confidence phrase replaces the whole reply with the clarification string
//! - replies longer than the limit are cut at the last whole word and end in `…`

use crate::constants::{CLARIFICATION_REPLY, ELLIPSIS, LOW_CONFIDENCE_PHRASES, MAX_REPLY_CHARS};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedText {
    pub text: String,
    /// A leading self-mention was found and stripped
    pub mentioned: bool,
}

pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub fn normalize_mention(text: &str, bot_handle: &str) -> NormalizedText {
    let collapsed = collapse_whitespace(text);
    let handle = bot_handle.trim().trim_start_matches('@');
    if handle.is_empty() {
        return NormalizedText {
            text: collapsed,
            mentioned: false,
        };
    }

    let (first, rest) = collapsed.split_once(' ').unwrap_or((collapsed.as_str(), ""));
    let token = first.trim_end_matches([':', ',']);
    let is_self_mention = token
        .strip_prefix('@')
        .is_some_and(|h| h.eq_ignore_ascii_case(handle));

    if !is_self_mention {
        return NormalizedText {
            text: collapsed,
            mentioned: false,
        };
    }

    let rest = rest.trim();
    NormalizedText {
        text: if rest.is_empty() {
            collapsed.clone()
        } else {
            rest.to_string()
        },
        mentioned: true,
    }
}

/// Cut to at most `max_chars` characters at a word boundary, appending `…`
/// when anything was dropped. Shorter text is returned as is.
pub fn truncate_at_word(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }

    let budget = max_chars.saturating_sub(ELLIPSIS.chars().count());
    let head: String = text.chars().take(budget).collect();
    let next_is_boundary = text.chars().nth(budget).is_some_and(char::is_whitespace);

    let cut = if next_is_boundary {
        head.trim_end()
    } else {
        match head.rfind(char::is_whitespace) {
            Some(idx) => head[..idx].trim_end(),
            // A single word longer than the budget: hard cut
            None => head.as_str(),
        }
    };

    format!("{cut}{ELLIPSIS}")
}

fn is_emoji(c: char) -> bool {
    matches!(c as u32,
        0x1F000..=0x1FAFF
        | 0x2600..=0x27BF
        | 0x2B00..=0x2BFF
        | 0xFE0F
        | 0x200D)
}

/// Wrapping punctuation such as `(`, `"` or `<` is ignored
fn is_link(word: &str) -> bool {
    let lower = word
        .trim_matches(|c: char| c.is_ascii_punctuation())
        .to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://") || lower.starts_with("www.")
}

pub fn strip_links_and_emoji(text: &str) -> String {
    let without_emoji: String = text.chars().filter(|c| !is_emoji(*c)).collect();
    without_emoji
        .split_whitespace()
        .filter(|word| !is_link(word))
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn is_low_confidence(text: &str) -> bool {
    let lower = text.to_lowercase().replace('\u{2019}', "'");
    LOW_CONFIDENCE_PHRASES
        .iter()
        .any(|phrase| lower.contains(phrase))
}

/// Turn raw model output into a postable reply
pub fn finalize_reply(raw: &str) -> String {
    let cleaned = strip_links_and_emoji(raw);
    if cleaned.is_empty() || is_low_confidence(&cleaned) {
        return CLARIFICATION_REPLY.to_string();
    }
    truncate_at_word(&cleaned, MAX_REPLY_CHARS)
}
