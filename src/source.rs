//! Text extraction sources.
//!
//! A source hands out one page of positioned text items at a time, in page
//! order. Parsing real page-description formats happens outside this crate;
//! the adapters here cover plain text and in-memory pages.

use crate::layout::TextItem;
use anyhow::{Context, Result, anyhow};
use std::collections::VecDeque;
use std::fs;
use std::path::Path;
use tracing::info;

/// Vertical distance between consecutive lines of a plain-text page.
pub const PLAIN_TEXT_LINE_HEIGHT: f32 = 10.0;

const PAGE_SEPARATOR: char = '\u{000C}';

pub trait TextSource {
    /// Next page's items in visual order, or `None` once every page was read.
    fn next_page(&mut self) -> Result<Option<Vec<TextItem>>>;
}

/// Pages already held in memory.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    pages: VecDeque<Vec<TextItem>>,
    fail_when_drained: bool,
}

impl MemorySource {
    pub fn new(pages: Vec<Vec<TextItem>>) -> Self {
        Self {
            pages: pages.into(),
            fail_when_drained: false,
        }
    }

    /// Yields `pages`, then fails instead of reporting the end.
    pub fn failing_after(pages: Vec<Vec<TextItem>>) -> Self {
        Self {
            pages: pages.into(),
            fail_when_drained: true,
        }
    }
}

impl TextSource for MemorySource {
    fn next_page(&mut self) -> Result<Option<Vec<TextItem>>> {
        match self.pages.pop_front() {
            Some(page) => Ok(Some(page)),
            None if self.fail_when_drained => Err(anyhow!("source stopped responding")),
            None => Ok(None),
        }
    }
}

/// Plain text split into pages on form feeds. Each non-blank line becomes one
/// item; blank lines leave a vertical gap so they read as paragraph breaks.
pub fn plain_text_pages(text: &str) -> Vec<Vec<TextItem>> {
    text.split(PAGE_SEPARATOR)
        .map(|page| {
            page.lines()
                .enumerate()
                .filter(|(_, line)| !line.trim().is_empty())
                .map(|(idx, line)| TextItem::new(idx as f32 * PLAIN_TEXT_LINE_HEIGHT, line.trim()))
                .collect()
        })
        .collect()
}

/// Open a plain-text or markdown file as a paged source.
pub fn load_text_source(path: &Path) -> Result<MemorySource> {
    if !is_text_file(path) {
        anyhow::bail!(
            "Unsupported source {}: expected .txt or .md",
            path.display()
        );
    }
    let data = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let pages = plain_text_pages(&data);
    info!(
        path = %path.display(),
        pages = pages.len(),
        total_chars = data.len(),
        "Loaded plain text source"
    );
    Ok(MemorySource::new(pages))
}

fn is_text_file(path: &Path) -> bool {
    matches!(
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase()),
        Some(ext) if ext == "txt" || ext == "md" || ext == "markdown"
    )
}
