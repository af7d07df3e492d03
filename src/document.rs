//! Builds the annotated chunk sequence for a whole document.

use crate::chunker::{ChunkPolicy, chunk_text};
use crate::classify::Classifier;
use crate::error::{ReaderError, Result};
use crate::layout::{PageText, reconstruct_page};
use crate::source::TextSource;
use tracing::{debug, info};

/// One speakable unit. Chunk order is reading order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// 1-based page the text came from.
    pub page: usize,
    pub text: String,
    pub is_dialogue: bool,
    pub speaker: Option<String>,
}

/// Pages and chunks of a fully processed document.
#[derive(Debug, Clone, Default)]
pub struct Document {
    pub pages: Vec<PageText>,
    pub chunks: Vec<Chunk>,
}

impl Document {
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }
}

/// Settings for turning source pages into chunks.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PipelineSettings {
    pub paragraph_gap: f32,
    pub chunk_policy: ChunkPolicy,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            paragraph_gap: crate::layout::DEFAULT_PARAGRAPH_GAP,
            chunk_policy: ChunkPolicy::default(),
        }
    }
}

/// Read every page from `source` in order and build the chunk sequence.
///
/// Nothing is returned unless the whole source was read: a failure on any
/// page aborts the build.
pub fn build_document(
    source: &mut dyn TextSource,
    settings: &PipelineSettings,
    classifier: &dyn Classifier,
) -> Result<Document> {
    let mut document = Document::default();

    loop {
        let page_number = document.pages.len() + 1;
        let items = source.next_page().map_err(|err| {
            ReaderError::DocumentLoad(format!("page {page_number}: {err:#}"))
        })?;
        let Some(items) = items else {
            break;
        };

        let raw_text = reconstruct_page(&items, settings.paragraph_gap);
        let before = document.chunks.len();
        for text in chunk_text(&raw_text, &settings.chunk_policy) {
            let classification = classifier.classify(&text);
            document.chunks.push(Chunk {
                page: page_number,
                text,
                is_dialogue: classification.is_dialogue,
                speaker: classification.speaker,
            });
        }
        debug!(
            page = page_number,
            items = items.len(),
            chars = raw_text.chars().count(),
            chunks = document.chunks.len() - before,
            "Processed page"
        );
        document.pages.push(PageText {
            page_number,
            raw_text,
        });
    }

    info!(
        pages = document.pages.len(),
        chunks = document.chunks.len(),
        dialogue = document.chunks.iter().filter(|chunk| chunk.is_dialogue).count(),
        "Document built"
    );
    Ok(document)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::HeuristicClassifier;
    use crate::layout::TextItem;
    use crate::source::MemorySource;

    #[test]
    fn chunks_inherit_page_numbers_in_order() {
        let mut source = MemorySource::new(vec![
            vec![TextItem::new(10.0, "Page one text.")],
            vec![],
            vec![
                TextItem::new(10.0, "\"Hello,\" said Ana."),
                TextItem::new(40.0, "Narration here."),
            ],
        ]);
        let document =
            build_document(&mut source, &PipelineSettings::default(), &HeuristicClassifier)
                .unwrap();

        assert_eq!(document.page_count(), 3);
        assert_eq!(document.pages[1].raw_text, "");
        let pages: Vec<usize> = document.chunks.iter().map(|chunk| chunk.page).collect();
        assert_eq!(pages, vec![1, 3, 3]);
        assert!(document.chunks[1].is_dialogue);
        assert_eq!(document.chunks[1].speaker.as_deref(), Some("Ana"));
        assert!(!document.chunks[2].is_dialogue);
    }

    #[test]
    fn source_failure_is_a_load_error() {
        let mut source = MemorySource::failing_after(vec![vec![TextItem::new(0.0, "Fine.")]]);
        let err = build_document(&mut source, &PipelineSettings::default(), &HeuristicClassifier)
            .unwrap_err();
        assert!(matches!(err, ReaderError::DocumentLoad(msg) if msg.starts_with("page 2")));
    }

    #[test]
    fn document_without_text_is_empty_but_valid() {
        let mut source = MemorySource::new(vec![vec![], vec![TextItem::new(0.0, "   ")]]);
        let document =
            build_document(&mut source, &PipelineSettings::default(), &HeuristicClassifier)
                .unwrap();
        assert!(document.is_empty());
        assert_eq!(document.page_count(), 2);
    }
}
