//! Overlapping page chunker

use std::ops::Range;

use docqa_core::{Chunk, ChunkingConfig, Document, Error, Result};

/// Boundaries tried before a hard cut, strongest first
#[derive(Debug, Clone, Copy)]
enum Boundary {
    Paragraph,
    Line,
    Sentence,
    Word,
}

const BOUNDARY_PRIORITY: [Boundary; 4] = [
    Boundary::Paragraph,
    Boundary::Line,
    Boundary::Sentence,
    Boundary::Word,
];

impl Boundary {
    /// Whether a chunk may end just before `chars[end]`
    fn ends_at(self, chars: &[char], end: usize) -> bool {
        let last = chars[end - 1];
        match self {
            Boundary::Paragraph => end >= 2 && chars[end - 2] == '\n' && last == '\n',
            Boundary::Line => last == '\n',
            Boundary::Sentence => {
                end >= 2 && matches!(chars[end - 2], '.' | '!' | '?') && last.is_whitespace()
            }
            Boundary::Word => last.is_whitespace(),
        }
    }
}

/// Splits page text into bounded chunks that share a fixed overlap
///
/// Every chunk except a page's first starts with the last `chunk_overlap`
/// characters of its predecessor, so dropping that prefix from each follower
/// and concatenating gives back the page text exactly.
#[derive(Debug, Clone)]
pub struct Chunker {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl Chunker {
    /// Create a chunker; `chunk_overlap` must be smaller than `chunk_size`
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self> {
        if chunk_size == 0 || chunk_overlap >= chunk_size {
            return Err(Error::Configuration(format!(
                "invalid chunking: size {} overlap {}",
                chunk_size, chunk_overlap
            )));
        }
        Ok(Self {
            chunk_size,
            chunk_overlap,
        })
    }

    pub fn from_config(config: &ChunkingConfig) -> Result<Self> {
        Self::new(config.chunk_size, config.chunk_overlap)
    }

    pub fn chunk_overlap(&self) -> usize {
        self.chunk_overlap
    }

    /// Chunk every page of a document
    pub fn split(&self, document: &Document) -> Result<Vec<Chunk>> {
        if document.is_blank() {
            return Err(Error::EmptyDocument(document.id.clone()));
        }

        let mut chunks = Vec::new();
        for page in &document.pages {
            if page.text.trim().is_empty() {
                continue;
            }

            let chars: Vec<char> = page.text.chars().collect();
            for (n, range) in self.split_chars(&chars).into_iter().enumerate() {
                let ordinal = chunks.len();
                chunks.push(Chunk {
                    id: format!("{}#p{}c{}", document.id, page.index, n),
                    text: chars[range.clone()].iter().collect(),
                    source_document_id: document.id.clone(),
                    page_index: page.index,
                    char_offset_range: range,
                    ordinal,
                });
            }
        }

        Ok(chunks)
    }

    /// Character ranges covering `text`
    pub fn split_text(&self, text: &str) -> Vec<Range<usize>> {
        let chars: Vec<char> = text.chars().collect();
        self.split_chars(&chars)
    }

    fn split_chars(&self, chars: &[char]) -> Vec<Range<usize>> {
        let len = chars.len();
        let mut ranges = Vec::new();
        if len == 0 {
            return ranges;
        }

        let mut start = 0;
        loop {
            if len - start <= self.chunk_size {
                ranges.push(start..len);
                break;
            }

            let hard_end = start + self.chunk_size;
            // ending past the overlap keeps the next start moving forward
            let floor = start + (self.chunk_overlap + 1).max(self.chunk_size / 2);
            let end = Self::find_break(chars, floor, hard_end).unwrap_or(hard_end);

            ranges.push(start..end);
            start = end - self.chunk_overlap;
        }

        ranges
    }

    /// Latest end in `floor..=hard_end` that lands on the strongest boundary available
    fn find_break(chars: &[char], floor: usize, hard_end: usize) -> Option<usize> {
        BOUNDARY_PRIORITY.iter().find_map(|boundary| {
            (floor..=hard_end)
                .rev()
                .find(|&end| boundary.ends_at(chars, end))
        })
    }
}

impl Default for Chunker {
    fn default() -> Self {
        let config = ChunkingConfig::default();
        Self {
            chunk_size: config.chunk_size,
            chunk_overlap: config.chunk_overlap,
        }
    }
}

/// Rebuild page texts from their chunks by dropping each follower's overlap
pub fn reassemble_pages(chunks: &[Chunk], overlap: usize) -> Vec<(usize, String)> {
    let mut pages: Vec<(usize, String)> = Vec::new();
    for chunk in chunks {
        match pages.last_mut() {
            Some((page, text)) if *page == chunk.page_index => {
                text.extend(chunk.text.chars().skip(overlap));
            }
            _ => pages.push((chunk.page_index, chunk.text.clone())),
        }
    }
    pages
}
