//! Reply formatting for the messaging channel.
//!
//! Model output arrives as loose Markdown. It is rewritten into the channel's
//! rich-text subset and split into bounded, numbered chunks.

pub mod chunker;
pub mod normalize;

use docsnap_core::MessageChunk;

pub use chunker::{EMPTY_REPLY, split_into_chunks};
pub use normalize::normalize_for_channel;

/// Normalize `raw` and split it into chunks of at most `max_len` characters.
///
/// Always returns at least one chunk.
pub fn format_for_channel(raw: Option<&str>, max_len: usize) -> Vec<MessageChunk> {
    let normalized = normalize_for_channel(raw.unwrap_or_default());
    split_into_chunks(&normalized, max_len)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_input_yields_placeholder() {
        let chunks = format_for_channel(None, 1500);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, EMPTY_REPLY);
    }

    #[test]
    fn markup_only_input_yields_placeholder() {
        let chunks = format_for_channel(Some("```\n```\n\n---\n"), 1500);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, EMPTY_REPLY);
    }

    #[test]
    fn short_document_is_single_unmarked_chunk() {
        let chunks = format_for_channel(Some("# Receipt\n\n**Total:** 12.50"), 1500);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, "*Receipt*\n\n*Total:* 12.50");
    }

    #[test]
    fn long_document_is_numbered() {
        let paragraph = format!("{}.", "w".repeat(664));
        let raw = vec![paragraph; 6].join("\n\n");
        assert_eq!(raw.chars().count(), 4000);

        let chunks = format_for_channel(Some(&raw), 1500);
        assert_eq!(chunks.len(), 3);
        for (i, chunk) in chunks.iter().enumerate() {
            assert_eq!(chunk.index, i);
            assert!(chunk.text.starts_with(&format!("Part {}/3\n\n", i + 1)));
            assert!(chunk.char_len() <= 1500);
        }
    }
}
