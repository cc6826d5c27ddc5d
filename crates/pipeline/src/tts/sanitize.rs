//! Reply text sanitization for spoken output
//!
//! Agent replies are markdown aimed at a terminal-savvy reader; spoken
//! output drops code blocks and markup rather than reading them aloud.

use once_cell::sync::Lazy;
use regex::Regex;

static FENCED_CODE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)```.*?```").unwrap());
static UNCLOSED_FENCE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)```.*$").unwrap());
static INLINE_CODE: Lazy<Regex> = Lazy::new(|| Regex::new(r"`([^`]*)`").unwrap());
static LINK: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[([^\]]+)\]\([^)]*\)").unwrap());
static IMAGE: Lazy<Regex> = Lazy::new(|| Regex::new(r"!\[[^\]]*\]\([^)]*\)").unwrap());
static HEADING: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^#{1,6}\s+").unwrap());
static EMPHASIS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[*_]{1,3}([^*_]+)[*_]{1,3}").unwrap());
static LIST_MARKER: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^\s*[-*+]\s+").unwrap());
static BLOCKQUOTE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^>\s*").unwrap());
static MULTI_SPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[ \t]{2,}").unwrap());
static MULTI_NEWLINE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{2,}").unwrap());

/// Strip code blocks and markup from reply text. Returns a trimmed
/// string; empty output means there is nothing speakable and the
/// pipeline reports an error instead of synthesizing silence.
pub fn sanitize_for_speech(text: &str) -> String {
    let text = IMAGE.replace_all(text, "");
    let text = FENCED_CODE.replace_all(&text, " ");
    let text = UNCLOSED_FENCE.replace_all(&text, " ");
    let text = INLINE_CODE.replace_all(&text, "$1");
    let text = LINK.replace_all(&text, "$1");
    let text = HEADING.replace_all(&text, "");
    let text = EMPHASIS.replace_all(&text, "$1");
    let text = LIST_MARKER.replace_all(&text, "");
    let text = BLOCKQUOTE.replace_all(&text, "");
    let text = MULTI_SPACE.replace_all(&text, " ");
    let text = MULTI_NEWLINE.replace_all(&text, "\n");
    text.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text_unchanged() {
        assert_eq!(
            sanitize_for_speech("Two plus two equals four."),
            "Two plus two equals four."
        );
    }

    #[test]
    fn test_code_blocks_stripped() {
        let input = "Run this:\n```rust\nfn main() {}\n```\nThen rebuild.";
        let out = sanitize_for_speech(input);
        assert!(!out.contains("fn main"));
        assert!(out.contains("Run this:"));
        assert!(out.contains("Then rebuild."));
    }

    #[test]
    fn test_unclosed_fence_stripped() {
        let out = sanitize_for_speech("Done. ```bash\nrm -rf target");
        assert_eq!(out, "Done.");
    }

    #[test]
    fn test_inline_code_keeps_content() {
        assert_eq!(
            sanitize_for_speech("Use `cargo test` to verify."),
            "Use cargo test to verify."
        );
    }

    #[test]
    fn test_links_and_markup() {
        let input = "# Result\nSee [the docs](https://example.com) for **details**.\n- first\n- second";
        let out = sanitize_for_speech(input);
        assert_eq!(out, "Result\nSee the docs for details.\nfirst\nsecond");
    }

    #[test]
    fn test_only_code_yields_empty() {
        assert_eq!(sanitize_for_speech("```\nlet x = 1;\n```"), "");
        assert_eq!(sanitize_for_speech("   "), "");
    }
}
