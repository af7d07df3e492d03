//! Splits page text into bounded, speakable chunks.
//!
//! Paragraphs are split into sentence units, then units are packed into chunks
//! that stay between a minimum fill and a hard ceiling. Between the soft and
//! hard maximum a chunk is only closed at a sentence end that is not followed
//! by an opening quote, which keeps a quoted line together with an attribution
//! clause that follows it.

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{trace, warn};

pub const DEFAULT_MIN_CHARS: usize = 600;
pub const DEFAULT_SOFT_MAX_CHARS: usize = 1200;
pub const DEFAULT_HARD_MAX_CHARS: usize = 1500;

static RE_PARAGRAPH_BREAK: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n[ \t\r]*\n\s*").unwrap());

const TERMINALS: [char; 3] = ['.', '!', '?'];
const CLOSING_QUOTES: [char; 5] = ['"', '\'', '\u{201D}', '\u{2019}', '\u{00BB}'];
const OPENING_QUOTES: [char; 5] = ['"', '\'', '\u{201C}', '\u{2018}', '\u{00AB}'];

/// Size thresholds for chunk packing, measured in characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkPolicy {
    pub min_chars: usize,
    pub soft_max_chars: usize,
    pub hard_max_chars: usize,
}

impl Default for ChunkPolicy {
    fn default() -> Self {
        Self {
            min_chars: DEFAULT_MIN_CHARS,
            soft_max_chars: DEFAULT_SOFT_MAX_CHARS,
            hard_max_chars: DEFAULT_HARD_MAX_CHARS,
        }
    }
}

impl ChunkPolicy {
    /// Build a policy, forcing `min <= soft <= hard` and `hard >= 1`.
    pub fn new(min_chars: usize, soft_max_chars: usize, hard_max_chars: usize) -> Self {
        let hard = hard_max_chars.max(1);
        let soft = soft_max_chars.min(hard);
        let min = min_chars.min(soft);
        if (min, soft, hard) != (min_chars, soft_max_chars, hard_max_chars) {
            warn!(
                min_chars,
                soft_max_chars,
                hard_max_chars,
                min,
                soft,
                hard,
                "Chunk thresholds out of order; clamped"
            );
        }
        Self {
            min_chars: min,
            soft_max_chars: soft,
            hard_max_chars: hard,
        }
    }
}

/// Chunk one page of reconstructed text. Chunks come back in reading order
/// and are never empty.
pub fn chunk_text(text: &str, policy: &ChunkPolicy) -> Vec<String> {
    split_paragraphs(text)
        .into_iter()
        .flat_map(|paragraph| chunk_paragraph(paragraph, policy))
        .collect()
}

/// Split text on runs of two or more newlines, dropping blank paragraphs.
pub fn split_paragraphs(text: &str) -> Vec<&str> {
    RE_PARAGRAPH_BREAK
        .split(text)
        .map(str::trim)
        .filter(|paragraph| !paragraph.is_empty())
        .collect()
}

/// Break a paragraph after every `.`, `!` or `?` that is followed by
/// whitespace. Units are trimmed and never empty.
pub fn split_units(paragraph: &str) -> Vec<String> {
    let mut units = Vec::new();
    let mut current = String::new();
    let mut chars = paragraph.chars().peekable();

    while let Some(ch) = chars.next() {
        current.push(ch);
        let at_boundary = TERMINALS.contains(&ch)
            && chars.peek().map(|next| next.is_whitespace()).unwrap_or(false);
        if at_boundary {
            push_unit(&mut units, &current);
            current.clear();
        }
    }
    push_unit(&mut units, &current);

    units
}

fn push_unit(units: &mut Vec<String>, raw: &str) {
    let trimmed = raw.trim();
    if !trimmed.is_empty() {
        units.push(trimmed.to_string());
    }
}

/// Pack one paragraph's sentence units into chunks.
pub fn chunk_paragraph(paragraph: &str, policy: &ChunkPolicy) -> Vec<String> {
    let hard = policy.hard_max_chars.max(1);
    let units: Vec<String> = split_units(paragraph)
        .into_iter()
        .flat_map(|unit| split_oversized(unit, hard))
        .collect();

    let mut chunks = Vec::new();
    let mut buffer = String::new();
    let mut buffer_len = 0usize;

    for (idx, unit) in units.iter().enumerate() {
        let unit_len = unit.chars().count();
        if buffer.is_empty() {
            buffer.push_str(unit);
            buffer_len = unit_len;
            continue;
        }

        let joined_len = buffer_len + 1 + unit_len;
        let append = if joined_len > hard {
            false
        } else if buffer_len < policy.min_chars || joined_len < policy.soft_max_chars {
            true
        } else {
            !is_good_break(&buffer, unit)
        };

        if append {
            buffer.push(' ');
            buffer.push_str(unit);
            buffer_len = joined_len;
        } else {
            trace!(chunk_len = buffer_len, next_unit = idx, "Closing chunk");
            chunks.push(std::mem::take(&mut buffer));
            buffer.push_str(unit);
            buffer_len = unit_len;
        }
    }

    if !buffer.is_empty() {
        chunks.push(buffer);
    }
    chunks
}

/// A chunk may close here when the buffer ends a sentence (optionally inside a
/// closing quote) and the next unit does not open a quotation.
fn is_good_break(buffer: &str, next_unit: &str) -> bool {
    let mut tail = buffer.trim_end().chars().rev();
    let ends_sentence = match tail.next() {
        Some(last) if TERMINALS.contains(&last) => true,
        Some(last) if CLOSING_QUOTES.contains(&last) => {
            tail.next().map(|ch| TERMINALS.contains(&ch)).unwrap_or(false)
        }
        _ => false,
    };
    let opens_quote = next_unit
        .chars()
        .next()
        .map(|ch| OPENING_QUOTES.contains(&ch))
        .unwrap_or(false);
    ends_sentence && !opens_quote
}

/// Break a unit longer than `hard` at whitespace, falling back to a plain
/// character split for single words longer than the limit.
fn split_oversized(unit: String, hard: usize) -> Vec<String> {
    if unit.chars().count() <= hard {
        return vec![unit];
    }

    let mut pieces = Vec::new();
    let mut current = String::new();
    let mut current_len = 0usize;

    for word in unit.split_whitespace() {
        let word_len = word.chars().count();
        if word_len > hard {
            if !current.is_empty() {
                pieces.push(std::mem::take(&mut current));
                current_len = 0;
            }
            let chars: Vec<char> = word.chars().collect();
            for piece in chars.chunks(hard) {
                pieces.push(piece.iter().collect());
            }
            continue;
        }
        let needed = if current.is_empty() {
            word_len
        } else {
            current_len + 1 + word_len
        };
        if needed > hard {
            pieces.push(std::mem::take(&mut current));
            current.push_str(word);
            current_len = word_len;
        } else {
            if !current.is_empty() {
                current.push(' ');
            }
            current.push_str(word);
            current_len = needed;
        }
    }
    if !current.is_empty() {
        pieces.push(current);
    }
    pieces
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sentence(len: usize) -> String {
        let mut s = "a".repeat(len.saturating_sub(1));
        s.push('.');
        s
    }

    fn normalize(text: &str) -> String {
        text.split_whitespace().collect::<Vec<_>>().join(" ")
    }

    #[test]
    fn splits_paragraphs_on_blank_lines() {
        let paragraphs = split_paragraphs("One.\n\nTwo.\n\n\n\nThree.\n \n");
        assert_eq!(paragraphs, vec!["One.", "Two.", "Three."]);
    }

    #[test]
    fn single_newline_does_not_split_paragraph() {
        assert_eq!(split_paragraphs("One\ntwo."), vec!["One\ntwo."]);
    }

    #[test]
    fn units_break_after_terminal_punctuation_and_whitespace() {
        let units = split_units("Hi there. How are you? Fine!  Good");
        assert_eq!(units, vec!["Hi there.", "How are you?", "Fine!", "Good"]);
    }

    #[test]
    fn units_keep_punctuation_inside_quotes_together() {
        let units = split_units("\"Stop!\" she cried. Then silence.");
        assert_eq!(units, vec!["\"Stop!\" she cried.", "Then silence."]);
    }

    #[test]
    fn decimal_numbers_are_not_sentence_breaks() {
        assert_eq!(split_units("Pi is 3.14 or so."), vec!["Pi is 3.14 or so."]);
    }

    #[test]
    fn short_paragraph_is_one_chunk() {
        let chunks = chunk_paragraph("One. Two. Three.", &ChunkPolicy::default());
        assert_eq!(chunks, vec!["One. Two. Three."]);
    }

    #[test]
    fn fills_to_minimum_then_breaks_near_soft_max() {
        let policy = ChunkPolicy::new(10, 20, 40);
        let text = format!("{} {} {} {}", sentence(8), sentence(8), sentence(8), sentence(8));
        let chunks = chunk_paragraph(&text, &policy);
        // 8 -> below min, append (17); 17 >= min and 26 >= soft -> good break.
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].chars().count(), 17);
        assert_eq!(chunks[1].chars().count(), 17);
    }

    #[test]
    fn keeps_accumulating_past_soft_max_when_next_unit_opens_quote() {
        let policy = ChunkPolicy::new(5, 15, 60);
        let text = "He waited there. \"Come in,\" said Ana. The end.";
        let chunks = chunk_paragraph(text, &policy);
        assert_eq!(chunks[0], "He waited there. \"Come in,\" said Ana.");
        assert_eq!(chunks[1], "The end.");
    }

    #[test]
    fn closing_quote_after_terminal_counts_as_good_break() {
        assert!(is_good_break("\"Go away.\"", "Then he left."));
        assert!(is_good_break("She ran!", "Then she stopped."));
        assert!(!is_good_break("She ran,", "then stopped."));
        assert!(!is_good_break("She ran.", "\u{201C}Wait,\u{201D} he said."));
    }

    #[test]
    fn never_exceeds_hard_max() {
        let policy = ChunkPolicy::default();
        let mut text = String::new();
        for idx in 0..200 {
            text.push_str(&sentence(37 + (idx % 90)));
            text.push(' ');
        }
        text.push_str(&"x".repeat(4000));
        for chunk in chunk_text(&text, &policy) {
            assert!(!chunk.is_empty());
            assert!(chunk.chars().count() <= policy.hard_max_chars);
        }
    }

    #[test]
    fn hard_max_wins_over_minimum_fill() {
        let policy = ChunkPolicy::new(600, 1200, 1500);
        let text = format!("{} {}", sentence(500), sentence(1400));
        let chunks = chunk_paragraph(&text, &policy);
        assert_eq!(chunks.len(), 2);
        assert!(chunks.iter().all(|chunk| chunk.chars().count() <= 1500));
    }

    #[test]
    fn oversized_sentence_is_split_at_whitespace() {
        let words = vec!["word"; 100].join(" ");
        let pieces = split_oversized(words.clone(), 42);
        assert!(pieces.len() > 1);
        assert!(pieces.iter().all(|piece| piece.chars().count() <= 42));
        assert_eq!(pieces.join(" "), words);
    }

    #[test]
    fn joined_chunks_recover_paragraph_text() {
        let policy = ChunkPolicy::new(30, 60, 90);
        let paragraph = "It was late.  The rain had stopped. \"Who is there?\" asked Tom. \
            Nobody answered him! He waited, and waited, and waited some more. \
            Finally the door opened. A cold wind came in.";
        let chunks = chunk_paragraph(paragraph, &policy);
        assert!(chunks.len() > 1);
        assert_eq!(normalize(&chunks.join(" ")), normalize(paragraph));
    }

    #[test]
    fn chunk_text_preserves_paragraph_order() {
        let chunks = chunk_text("First one.\n\nSecond one.\n\nThird one.", &ChunkPolicy::default());
        assert_eq!(chunks, vec!["First one.", "Second one.", "Third one."]);
    }

    #[test]
    fn policy_thresholds_are_ordered() {
        let policy = ChunkPolicy::new(900, 500, 0);
        assert_eq!(policy.hard_max_chars, 1);
        assert_eq!(policy.soft_max_chars, 1);
        assert_eq!(policy.min_chars, 1);
    }
}
