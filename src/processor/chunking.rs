//! # Text Chunking Module
//!
//! Splits document text into overlapping chunks bounded by a character count.
//!
//! ## Chunking Strategy
//!
//! 1. The text is cut at the coarsest separator it contains (blank line, line
//!    break, space, then single characters). Any piece still longer than the
//!    chunk size is cut again with the next finer separator.
//! 2. The pieces are merged greedily into chunks no longer than the chunk size.
//!    When a chunk is full, pieces are dropped from its front until what is
//!    left fits in the overlap, and that tail starts the next chunk.
//!
//! Every chunk is a contiguous slice of the input and separators stay attached
//! to their pieces, so chunks only ever repeat text and never lose it. Each
//! chunk records its character offset in the source.

use std::collections::VecDeque;
use std::ops::Range;

use serde::Serialize;
use tracing::{debug, instrument};

use crate::processor::ChunkOptions;
use crate::processor::error::ProcessError;

/// Separators from coarsest to finest. The empty separator splits characters.
pub const SEPARATORS: [&str; 4] = ["\n\n", "\n", " ", ""];

/// A chunk of text with its location in the source
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TextChunk {
    /// The text of the chunk
    pub text: String,

    /// Character offset of the chunk in the source text
    pub start: usize,

    /// Index of the chunk within its document
    pub position: usize,
}

impl TextChunk {
    /// Character offset one past the end of the chunk
    pub fn end(&self) -> usize {
        self.start + self.text.chars().count()
    }
}

/// A contiguous piece of the source, in bytes, with its length in characters
#[derive(Debug, Clone)]
struct Piece {
    bytes: Range<usize>,
    chars: usize,
}

/// Split text into overlapping chunks
#[instrument(skip(text), fields(len = text.len()))]
pub fn chunk_text(text: &str, options: &ChunkOptions) -> Result<Vec<TextChunk>, ProcessError> {
    options.validate()?;
    if text.is_empty() {
        return Ok(Vec::new());
    }

    let mut pieces = Vec::new();
    split_pieces(text, 0, &SEPARATORS, options.chunk_size, &mut pieces);
    let chunks = merge_pieces(text, &pieces, options);

    debug!("Split {} pieces into {} chunks", pieces.len(), chunks.len());
    Ok(chunks)
}

/// Cut `text` (starting at byte `offset` of the source) into pieces of at most
/// `max_chars` characters
fn split_pieces(
    text: &str,
    offset: usize,
    separators: &[&str],
    max_chars: usize,
    out: &mut Vec<Piece>,
) {
    let Some(level) = separators
        .iter()
        .position(|sep| sep.is_empty() || text.contains(sep))
    else {
        out.push(Piece {
            bytes: offset..offset + text.len(),
            chars: text.chars().count(),
        });
        return;
    };
    let separator = separators[level];
    let finer = &separators[level + 1..];

    for segment in segments(text, separator) {
        let slice = &text[segment.clone()];
        let chars = slice.chars().count();
        let bytes = offset + segment.start..offset + segment.end;
        if chars <= max_chars || finer.is_empty() {
            out.push(Piece { bytes, chars });
        } else {
            split_pieces(slice, bytes.start, finer, max_chars, out);
        }
    }
}

/// Byte ranges covering `text`, each ending just after an occurrence of
/// `separator`. An empty separator yields one range per character.
fn segments(text: &str, separator: &str) -> Vec<Range<usize>> {
    if separator.is_empty() {
        return text
            .char_indices()
            .map(|(i, c)| i..i + c.len_utf8())
            .collect();
    }

    let mut ranges = Vec::new();
    let mut start = 0;
    for (i, matched) in text.match_indices(separator) {
        let end = i + matched.len();
        ranges.push(start..end);
        start = end;
    }
    if start < text.len() {
        ranges.push(start..text.len());
    }
    ranges
}

fn merge_pieces(text: &str, pieces: &[Piece], options: &ChunkOptions) -> Vec<TextChunk> {
    let mut chunks = Vec::new();
    let mut window: VecDeque<(usize, &Piece)> = VecDeque::new();
    let mut window_chars = 0;
    let mut char_offset = 0;

    for piece in pieces {
        if window_chars + piece.chars > options.chunk_size && !window.is_empty() {
            chunks.push(window_chunk(text, &window, chunks.len()));

            while window_chars > options.overlap
                || (window_chars + piece.chars > options.chunk_size && window_chars > 0)
            {
                let Some((_, dropped)) = window.pop_front() else {
                    break;
                };
                window_chars -= dropped.chars;
            }
        }

        window.push_back((char_offset, piece));
        window_chars += piece.chars;
        char_offset += piece.chars;
    }

    if !window.is_empty() {
        chunks.push(window_chunk(text, &window, chunks.len()));
    }
    chunks
}

fn window_chunk(text: &str, window: &VecDeque<(usize, &Piece)>, position: usize) -> TextChunk {
    let (start, first) = window[0];
    let last = window[window.len() - 1].1;
    TextChunk {
        text: text[first.bytes.start..last.bytes.end].to_string(),
        start,
        position,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options(chunk_size: usize, overlap: usize) -> ChunkOptions {
        ChunkOptions {
            chunk_size,
            overlap,
        }
    }

    /// Rebuild the source from chunk offsets, checking there are no gaps
    fn reconstruct(chunks: &[TextChunk]) -> String {
        let mut out = String::new();
        let mut covered = 0;
        for chunk in chunks {
            assert!(chunk.start <= covered, "gap before chunk {}", chunk.position);
            let skip = covered - chunk.start;
            out.extend(chunk.text.chars().skip(skip));
            covered = covered.max(chunk.end());
        }
        out
    }

    fn sample_text() -> String {
        let paragraph = "Galatasaray Üniversitesi 1992 yılında kurulmuştur. \
            Ortaköy kampüsü Boğaziçi kıyısındadır.\nFakülteler: Hukuk, Mühendislik, İletişim.";
        let mut text = String::new();
        for i in 0..40 {
            text.push_str(&format!("{i}. {paragraph}\n\n"));
        }
        text.push_str(&"çokuzunkelime".repeat(150));
        text
    }

    #[test]
    fn test_chunks_respect_size_and_reconstruct() {
        let text = sample_text();
        let opts = ChunkOptions::default();

        let chunks = chunk_text(&text, &opts).unwrap();

        assert!(chunks.len() > 3);
        for chunk in &chunks {
            assert!(chunk.text.chars().count() <= opts.chunk_size);
        }
        assert_eq!(reconstruct(&chunks), text);
    }

    #[test]
    fn test_overlap_is_bounded() {
        let text = sample_text();
        let opts = ChunkOptions::default();

        let chunks = chunk_text(&text, &opts).unwrap();

        for pair in chunks.windows(2) {
            let overlap = pair[0].end().saturating_sub(pair[1].start);
            assert!(overlap <= opts.overlap, "overlap {} too large", overlap);
            assert!(pair[1].start > pair[0].start);
        }
        assert!(
            chunks.windows(2).any(|pair| pair[0].end() > pair[1].start),
            "expected some chunks to overlap"
        );
    }

    #[test]
    fn test_offsets_point_into_source() {
        let text = sample_text();
        let chars: Vec<char> = text.chars().collect();

        for chunk in chunk_text(&text, &options(300, 50)).unwrap() {
            let expected: String = chars[chunk.start..chunk.end()].iter().collect();
            assert_eq!(chunk.text, expected);
        }
    }

    #[test]
    fn test_prefers_paragraph_boundaries() {
        let text = format!("{}\n\n{}", "a ".repeat(30), "b ".repeat(30));

        let chunks = chunk_text(&text, &options(70, 0)).unwrap();

        assert_eq!(chunks.len(), 2);
        assert!(chunks[0].text.ends_with("\n\n"));
        assert!(chunks[1].text.starts_with('b'));
    }

    #[test]
    fn test_short_text_is_one_chunk() {
        let chunks = chunk_text("Kısa metin.", &ChunkOptions::default()).unwrap();
        assert_eq!(
            chunks,
            vec![TextChunk {
                text: "Kısa metin.".to_string(),
                start: 0,
                position: 0,
            }]
        );
    }

    #[test]
    fn test_unbroken_text_falls_back_to_characters() {
        let text = "x".repeat(25);

        let chunks = chunk_text(&text, &options(10, 2)).unwrap();

        assert!(chunks.iter().all(|c| c.text.len() <= 10));
        assert_eq!(reconstruct(&chunks), text);
    }

    #[test]
    fn test_empty_and_invalid() {
        assert!(chunk_text("", &ChunkOptions::default()).unwrap().is_empty());
        assert!(matches!(
            chunk_text("abc", &options(10, 10)),
            Err(ProcessError::Chunking(_))
        ));
    }
}
