//! Dialogue detection and speaker attribution heuristics.
//!
//! Both are plain regex checks kept behind the [`Classifier`] trait so the
//! chunk pipeline and tests do not depend on a particular heuristic.
//!
//! The ASCII single-quote pattern is permissive: two apostrophes in one chunk
//! (`don't ... Tom's`) read as a quoted span. That is a known false positive.

use once_cell::sync::Lazy;
use regex::Regex;

/// Verbs that introduce or follow a line of dialogue.
pub const ATTRIBUTION_VERBS: [&str; 9] = [
    "said",
    "replied",
    "asked",
    "exclaimed",
    "whispered",
    "shouted",
    "muttered",
    "called",
    "answered",
];

static DIALOGUE_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r#""[^"]+""#,
        r"'[^']+'",
        "\u{201C}[^\u{201D}]+\u{201D}",
        "\u{2018}[^\u{2019}]+\u{2019}",
        "\u{00AB}[^\u{00BB}]+\u{00BB}",
    ]
    .iter()
    .map(|pattern| Regex::new(pattern).unwrap())
    .collect()
});

// For each verb, "said Ana" is tried before "Ana said".
static SPEAKER_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    ATTRIBUTION_VERBS
        .iter()
        .flat_map(|verb| {
            [
                format!(r"\b{verb}\s+(\p{{Lu}}[\w'-]*)"),
                format!(r"\b(\p{{Lu}}[\w'-]*)\s+{verb}\b"),
            ]
        })
        .map(|pattern| Regex::new(&pattern).unwrap())
        .collect()
});

/// Result of classifying one chunk of text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Classification {
    pub is_dialogue: bool,
    pub speaker: Option<String>,
}

pub trait Classifier {
    fn classify(&self, text: &str) -> Classification;
}

/// Regex heuristics over a fixed set of quotation pairs and attribution verbs.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicClassifier;

impl Classifier for HeuristicClassifier {
    fn classify(&self, text: &str) -> Classification {
        Classification {
            is_dialogue: is_dialogue(text),
            speaker: extract_speaker(text),
        }
    }
}

/// True when the text holds a quoted span in any supported quotation style.
pub fn is_dialogue(text: &str) -> bool {
    DIALOGUE_PATTERNS.iter().any(|pattern| pattern.is_match(text))
}

/// First speaker name found by the attribution patterns, in priority order.
/// Only one candidate is returned per text.
pub fn extract_speaker(text: &str) -> Option<String> {
    SPEAKER_PATTERNS.iter().find_map(|pattern| {
        pattern
            .captures(text)
            .and_then(|caps| caps.get(1))
            .map(|name| name.as_str().to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn said_after_quote_is_dialogue_with_speaker() {
        let result = HeuristicClassifier.classify("\"Hello,\" said Ana.");
        assert!(result.is_dialogue);
        assert_eq!(result.speaker.as_deref(), Some("Ana"));
    }

    #[test]
    fn name_before_verb_is_attributed() {
        assert_eq!(
            extract_speaker("Marcus whispered, \"Not here.\"").as_deref(),
            Some("Marcus")
        );
    }

    #[test]
    fn detects_each_quotation_style() {
        assert!(is_dialogue("He said \"go\" twice."));
        assert!(is_dialogue("She said 'go' twice."));
        assert!(is_dialogue("\u{201C}Go,\u{201D} she said."));
        assert!(is_dialogue("\u{2018}Go,\u{2019} she said."));
        assert!(is_dialogue("\u{00AB}Allez\u{00BB}, dit-il."));
    }

    #[test]
    fn plain_narration_is_not_dialogue() {
        let result = HeuristicClassifier.classify("The wind howled across the moor.");
        assert_eq!(result, Classification::default());
    }

    #[test]
    fn apostrophes_can_false_positive() {
        assert!(is_dialogue("I don't think it's Tom's fault."));
    }

    #[test]
    fn lowercase_word_after_verb_is_not_a_name() {
        assert_eq!(extract_speaker("\"Fine,\" she said quietly."), None);
    }

    #[test]
    fn earlier_verb_in_priority_order_wins() {
        // "said" patterns are tried before "asked" patterns.
        let text = "\"Why?\" asked Ben. \"Because,\" said Clara.";
        assert_eq!(extract_speaker(text).as_deref(), Some("Clara"));
    }

    #[test]
    fn accented_names_are_attributed() {
        assert_eq!(
            extract_speaker("\u{00AB}Oui\u{00BB}, said \u{00C9}lise.").as_deref(),
            Some("\u{00C9}lise")
        );
        assert_eq!(
            extract_speaker("\u{00C9}mile said nothing at all.").as_deref(),
            Some("\u{00C9}mile")
        );
        assert_eq!(extract_speaker("\"Go,\" said Ana.").as_deref(), Some("Ana"));
    }

    #[test]
    fn speaker_can_be_present_without_quotes() {
        let result = HeuristicClassifier.classify("Then Hugo answered the door.");
        assert!(!result.is_dialogue);
        assert_eq!(result.speaker.as_deref(), Some("Hugo"));
    }
}
