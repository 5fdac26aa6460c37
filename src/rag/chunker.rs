//! Markdown-aware chunking.
//!
//! Documents are cut at heading boundaries. Each chunk keeps the path of
//! headings that encloses it. Sections shorter than `min_chars` merge into
//! the following section. Sections longer than `max_chars` are split at blank
//! lines. Fenced code blocks are never split and headings inside them are
//! ignored.

use serde::{Deserialize, Serialize};

use crate::docs::Document;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkerConfig {
    /// Sections shorter than this (trimmed chars) merge with a neighbour.
    pub min_chars: usize,
    /// Sections longer than this are split at paragraph boundaries.
    pub max_chars: usize,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self {
            min_chars: 200,
            max_chars: 2_000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Chunk {
    pub document_id: String,
    /// Position within the document, starting at 0.
    pub sequence: usize,
    pub text: String,
    pub heading_path: Vec<String>,
}

impl Chunk {
    /// `Button > Variants` style label, `None` for heading-less preambles.
    pub fn section_label(&self) -> Option<String> {
        if self.heading_path.is_empty() {
            None
        } else {
            Some(self.heading_path.join(" > "))
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct MarkdownChunker {
    config: ChunkerConfig,
}

/// A run of lines that may not be separated.
#[derive(Debug, Default)]
struct Block {
    text: String,
    heading_only: bool,
}

#[derive(Debug)]
struct Section {
    heading_path: Vec<String>,
    blocks: Vec<Block>,
}

#[derive(Debug)]
struct Piece {
    heading_path: Vec<String>,
    text: String,
}

#[derive(Debug, Clone, Copy)]
struct Fence {
    marker: char,
    len: usize,
}

impl MarkdownChunker {
    pub fn new(config: ChunkerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ChunkerConfig {
        &self.config
    }

    pub fn chunk(&self, document: &Document) -> Vec<Chunk> {
        let sections = split_sections(&document.raw_text);

        let mut pieces = Vec::new();
        for section in sections {
            pieces.extend(self.pack_section(section));
        }

        self.merge_small(pieces)
            .into_iter()
            .enumerate()
            .map(|(sequence, piece)| Chunk {
                document_id: document.id.clone(),
                sequence,
                text: piece.text.trim().to_string(),
                heading_path: piece.heading_path,
            })
            .collect()
    }

    pub fn chunk_all(&self, documents: &[Document]) -> Vec<Chunk> {
        documents.iter().flat_map(|doc| self.chunk(doc)).collect()
    }

    /// Packs blocks into pieces no longer than `max_chars` where possible.
    fn pack_section(&self, section: Section) -> Vec<Piece> {
        let mut pieces = Vec::new();
        let mut current = String::new();
        let mut pending_heading = false;

        for block in section.blocks {
            let would_overflow =
                !current.is_empty() && current.len() + block.text.len() > self.config.max_chars;
            // A heading-only block stays glued to what follows it.
            if would_overflow && !pending_heading {
                pieces.push(Piece {
                    heading_path: section.heading_path.clone(),
                    text: std::mem::take(&mut current),
                });
            }
            current.push_str(&block.text);
            pending_heading = block.heading_only;
        }

        if !current.trim().is_empty() {
            pieces.push(Piece {
                heading_path: section.heading_path,
                text: current,
            });
        }

        pieces.retain(|piece| !piece.text.trim().is_empty());
        pieces
    }

    fn merge_small(&self, pieces: Vec<Piece>) -> Vec<Piece> {
        let mut merged: Vec<Piece> = Vec::new();
        let mut current: Option<Piece> = None;

        for piece in pieces {
            current = Some(match current.take() {
                Some(mut acc) if acc.text.trim().chars().count() < self.config.min_chars => {
                    append_text(&mut acc.text, &piece.text);
                    acc
                }
                Some(acc) => {
                    merged.push(acc);
                    piece
                }
                None => piece,
            });
        }

        if let Some(last) = current {
            let too_small = last.text.trim().chars().count() < self.config.min_chars;
            match merged.last_mut() {
                Some(previous) if too_small => append_text(&mut previous.text, &last.text),
                _ => merged.push(last),
            }
        }

        merged
    }
}

fn append_text(target: &mut String, next: &str) {
    if !target.is_empty() && !target.ends_with('\n') {
        target.push('\n');
    }
    target.push_str(next);
}

/// Walks the document line by line and groups lines into heading sections.
fn split_sections(text: &str) -> Vec<Section> {
    let mut sections: Vec<Section> = Vec::new();
    let mut heading_stack: Vec<(usize, String)> = Vec::new();
    let mut current = Section {
        heading_path: Vec::new(),
        blocks: Vec::new(),
    };
    let mut block = Block::default();
    let mut fence: Option<Fence> = None;

    for line in text.split_inclusive('\n') {
        if let Some(open) = fence {
            block.text.push_str(line);
            block.heading_only = false;
            if closes_fence(line, open) {
                fence = None;
            }
            continue;
        }

        if let Some(opened) = opens_fence(line) {
            fence = Some(opened);
            block.text.push_str(line);
            block.heading_only = false;
            continue;
        }

        if let Some((level, title)) = parse_heading(line) {
            flush_block(&mut current, &mut block);
            if !current.blocks.is_empty() {
                sections.push(current);
            }
            heading_stack.retain(|(existing, _)| *existing < level);
            heading_stack.push((level, title));
            current = Section {
                heading_path: heading_stack.iter().map(|(_, t)| t.clone()).collect(),
                blocks: Vec::new(),
            };
            block.text.push_str(line);
            block.heading_only = true;
            continue;
        }

        if line.trim().is_empty() {
            block.text.push_str(line);
            flush_block(&mut current, &mut block);
            continue;
        }

        block.text.push_str(line);
        block.heading_only = false;
    }

    flush_block(&mut current, &mut block);
    if !current.blocks.is_empty() {
        sections.push(current);
    }

    sections
        .into_iter()
        .filter(|section| section.blocks.iter().any(|b| !b.text.trim().is_empty()))
        .collect()
}

fn flush_block(section: &mut Section, block: &mut Block) {
    if block.text.is_empty() {
        return;
    }
    let finished = std::mem::take(block);
    if finished.text.trim().is_empty() {
        // Blank lines attach to the previous block so offsets stay intact.
        match section.blocks.last_mut() {
            Some(previous) => previous.text.push_str(&finished.text),
            None => section.blocks.push(finished),
        }
        return;
    }
    section.blocks.push(finished);
}

/// Parses an ATX heading (`#` to `######`) outside code fences.
fn parse_heading(line: &str) -> Option<(usize, String)> {
    let trimmed = line.trim_end();
    let indent = trimmed.len() - trimmed.trim_start().len();
    if indent > 3 {
        return None;
    }
    let body = trimmed.trim_start();
    let level = body.chars().take_while(|c| *c == '#').count();
    if level == 0 || level > 6 {
        return None;
    }
    let rest = &body[level..];
    if !rest.is_empty() && !rest.starts_with([' ', '\t']) {
        return None;
    }
    let title = rest.trim().trim_end_matches('#').trim().to_string();
    Some((level, title))
}

fn opens_fence(line: &str) -> Option<Fence> {
    let trimmed = line.trim_end();
    let indent = trimmed.len() - trimmed.trim_start().len();
    if indent > 3 {
        return None;
    }
    let body = trimmed.trim_start();
    let marker = body.chars().next()?;
    if marker != '`' && marker != '~' {
        return None;
    }
    let len = body.chars().take_while(|c| *c == marker).count();
    if len < 3 {
        return None;
    }
    // Backtick fences may not carry backticks in their info string.
    if marker == '`' && body[len..].contains('`') {
        return None;
    }
    Some(Fence { marker, len })
}

fn closes_fence(line: &str, open: Fence) -> bool {
    let body = line.trim();
    let len = body.chars().take_while(|c| *c == open.marker).count();
    len >= open.len && body[len * open.marker.len_utf8()..].trim().is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::docs::Category;

    fn doc(text: &str) -> Document {
        Document {
            id: "button".to_string(),
            category: Category::Components,
            title: "Button".to_string(),
            raw_text: text.to_string(),
        }
    }

    fn chunker(min_chars: usize, max_chars: usize) -> MarkdownChunker {
        MarkdownChunker::new(ChunkerConfig {
            min_chars,
            max_chars,
        })
    }

    fn fence_lines(text: &str) -> usize {
        text.lines()
            .filter(|l| l.trim_start().starts_with("```"))
            .count()
    }

    const SAMPLE: &str = "# MindSet Design System - Button\n\
Intro paragraph about buttons.\n\
\n\
## Variants\n\
Primary, secondary and ghost.\n\
\n\
## Tokens\n\
El radius de botones es 8px.\n\
\n\
```css\n\
# not a heading\n\
\n\
.btn { border-radius: var(--radius-md); }\n\
```\n\
\n\
### Sizes\n\
Small, medium and large.\n";

    #[test]
    fn splits_at_headings_with_paths() {
        let chunks = chunker(0, 10_000).chunk(&doc(SAMPLE));
        let paths: Vec<Vec<String>> = chunks.iter().map(|c| c.heading_path.clone()).collect();
        assert_eq!(
            paths,
            vec![
                vec!["MindSet Design System - Button".to_string()],
                vec![
                    "MindSet Design System - Button".to_string(),
                    "Variants".to_string()
                ],
                vec![
                    "MindSet Design System - Button".to_string(),
                    "Tokens".to_string()
                ],
                vec![
                    "MindSet Design System - Button".to_string(),
                    "Tokens".to_string(),
                    "Sizes".to_string()
                ],
            ]
        );
        assert!(chunks[2].text.contains("# not a heading"));
        assert!(chunks.iter().enumerate().all(|(i, c)| c.sequence == i));
    }

    #[test]
    fn chunking_is_deterministic() {
        let chunker = chunker(40, 120);
        let first = chunker.chunk(&doc(SAMPLE));
        let second = chunker.chunk(&doc(SAMPLE));
        assert_eq!(first, second);
    }

    #[test]
    fn small_sections_merge_with_next() {
        let chunks = chunker(100, 10_000).chunk(&doc(SAMPLE));
        assert!(chunks.len() < 4);
        assert!(chunks[0].text.starts_with("# MindSet Design System - Button"));
        assert!(chunks[0].text.contains("## Variants"));
    }

    #[test]
    fn short_trailing_section_joins_previous() {
        let text = format!("# A\n{}\n\n# B\ntiny\n", "long text ".repeat(10));
        let chunks = chunker(20, 10_000).chunk(&doc(&text));
        assert_eq!(chunks.len(), 1);
        assert!(chunks[0].text.ends_with("tiny"));
    }

    #[test]
    fn heading_stays_with_following_content() {
        let text = format!("# Title\n\n{}\n\n{}\n", "a".repeat(50), "b".repeat(50));
        let chunks = chunker(0, 30).chunk(&doc(&text));
        assert!(chunks[0].text.starts_with("# Title"));
        assert!(chunks[0].text.contains("aaaa"));
        for chunk in &chunks {
            assert_ne!(chunk.text.trim(), "# Title");
        }
    }

    #[test]
    fn never_starts_inside_code_fence() {
        let code = (0..30)
            .map(|i| format!("line {}\n\n", i))
            .collect::<String>();
        let text = format!("# Code\nintro\n\n```tsx\n{}```\n\nafter\n\n## Next\nmore\n", code);
        let chunks = chunker(0, 40).chunk(&doc(&text));
        for chunk in &chunks {
            assert_eq!(fence_lines(&chunk.text) % 2, 0, "unbalanced: {}", chunk.text);
        }
        assert!(chunks.iter().any(|c| c.text.contains("line 29")));
    }

    #[test]
    fn tilde_fence_hides_headings() {
        let text = "# Top\n~~~\n# inside\n~~~\ncontent\n";
        let chunks = chunker(0, 10_000).chunk(&doc(text));
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].heading_path, vec!["Top".to_string()]);
    }

    #[test]
    fn preamble_without_heading_has_empty_path() {
        let chunks = chunker(0, 10_000).chunk(&doc("plain intro\n\n# Heading\nbody\n"));
        assert!(chunks[0].heading_path.is_empty());
        assert_eq!(chunks[0].section_label(), None);
        assert_eq!(chunks[1].section_label().as_deref(), Some("Heading"));
    }

    #[test]
    fn hashtag_without_space_is_not_heading() {
        assert!(parse_heading("#hashtag\n").is_none());
        assert_eq!(parse_heading("## Sizes ##\n"), Some((2, "Sizes".to_string())));
    }

    #[test]
    fn empty_document_yields_no_chunks() {
        assert!(chunker(10, 100).chunk(&doc("\n\n  \n")).is_empty());
    }
}
