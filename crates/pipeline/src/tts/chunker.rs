//! Sentence-bounded chunking for synthesis
//!
//! Groups a small fixed number of sentences per chunk so the first
//! chunk's synthesis latency stays low without flooding the backend
//! with tiny requests.

/// Splits reply text into speakable chunks.
#[derive(Debug, Clone)]
pub struct SentenceChunker {
    sentences_per_chunk: usize,
}

impl SentenceChunker {
    pub fn new(sentences_per_chunk: usize) -> Self {
        Self {
            sentences_per_chunk: sentences_per_chunk.max(1),
        }
    }

    /// Split `text` into chunks of up to `sentences_per_chunk`
    /// sentences. Text with no sentence boundary is one chunk.
    pub fn chunk(&self, text: &str) -> Vec<String> {
        let sentences = split_sentences(text);
        if sentences.is_empty() {
            return Vec::new();
        }

        sentences
            .chunks(self.sentences_per_chunk)
            .map(|group| group.join(" "))
            .collect()
    }
}

impl Default for SentenceChunker {
    fn default() -> Self {
        Self::new(2)
    }
}

const TERMINATORS: &[char] = &['.', '!', '?', '\u{2026}'];

/// Split on sentence terminators, folding trailing closers (quotes,
/// brackets) into the preceding sentence. The trailing remainder, if
/// any, becomes a final sentence of its own.
fn split_sentences(text: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut current = String::new();
    let chars: Vec<char> = text.chars().collect();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        current.push(c);
        i += 1;

        if TERMINATORS.contains(&c) {
            // Fold in repeated terminators ("..." / "?!") and closers
            while i < chars.len() {
                let next = chars[i];
                if TERMINATORS.contains(&next)
                    || matches!(next, '"' | '\'' | ')' | ']' | '\u{201d}' | '\u{2019}')
                {
                    current.push(next);
                    i += 1;
                } else {
                    break;
                }
            }
            let sentence = current.trim().to_string();
            if !sentence.is_empty() {
                sentences.push(sentence);
            }
            current.clear();
        }
    }

    let tail = current.trim().to_string();
    if !tail.is_empty() {
        sentences.push(tail);
    }
    sentences
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_two_sentences_per_chunk() {
        let chunker = SentenceChunker::new(2);
        let chunks = chunker.chunk("One. Two. Three. Four. Five.");
        assert_eq!(chunks, vec!["One. Two.", "Three. Four.", "Five."]);
    }

    #[test]
    fn test_no_boundary_single_chunk() {
        let chunker = SentenceChunker::new(2);
        let chunks = chunker.chunk("a reply with no terminator at all");
        assert_eq!(chunks, vec!["a reply with no terminator at all"]);
    }

    #[test]
    fn test_empty_text_no_chunks() {
        let chunker = SentenceChunker::new(2);
        assert!(chunker.chunk("").is_empty());
        assert!(chunker.chunk("   ").is_empty());
    }

    #[test]
    fn test_trailing_fragment_kept() {
        let chunker = SentenceChunker::new(2);
        let chunks = chunker.chunk("Done. Next we rebuild");
        assert_eq!(chunks, vec!["Done. Next we rebuild"]);
    }

    #[test]
    fn test_closers_folded_into_sentence() {
        let chunks = SentenceChunker::new(1).chunk("He said \"stop.\" Then left...");
        assert_eq!(chunks, vec!["He said \"stop.\"", "Then left..."]);
    }

    #[test]
    fn test_zero_sentences_clamped_to_one() {
        let chunker = SentenceChunker::new(0);
        let chunks = chunker.chunk("One. Two.");
        assert_eq!(chunks, vec!["One.", "Two."]);
    }
}
