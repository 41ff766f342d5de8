use crate::error::IngestError;
use crate::models::Chunk;
use std::collections::VecDeque;
use std::ops::Range;

pub const DEFAULT_CHUNK_SIZE: usize = 1_000;
pub const DEFAULT_CHUNK_OVERLAP: usize = 200;

/// Split points from coarsest to finest. The empty separator cuts between characters.
const SEPARATORS: [&str; 5] = ["\n\n", "\n", ". ", " ", ""];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkingConfig {
    pub max_chars: usize,
    pub overlap_chars: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            max_chars: DEFAULT_CHUNK_SIZE,
            overlap_chars: DEFAULT_CHUNK_OVERLAP,
        }
    }
}

impl ChunkingConfig {
    pub fn validate(&self) -> Result<(), IngestError> {
        if self.max_chars == 0 {
            return Err(IngestError::InvalidChunkConfig(
                "chunk size must be greater than zero".to_string(),
            ));
        }
        if self.overlap_chars >= self.max_chars {
            return Err(IngestError::InvalidChunkConfig(format!(
                "overlap {} must be smaller than chunk size {}",
                self.overlap_chars, self.max_chars
            )));
        }
        Ok(())
    }
}

pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .replace('\u{a0}', " ")
}

/// Splits `text` into ordered, overlapping chunks of at most `max_chars` characters.
///
/// Each chunk is an exact substring of `text`. Paragraph breaks are tried first, then
/// line breaks, sentence ends and spaces; a hard character cut is the last resort.
/// Consecutive chunks inside one merge window share at most `overlap_chars` characters.
/// Whitespace-only chunks are dropped.
pub fn split_text(text: &str, config: ChunkingConfig) -> Result<Vec<Chunk>, IngestError> {
    config.validate()?;

    let mut ranges = Vec::new();
    split_recursive(text, 0..text.len(), &SEPARATORS, config, &mut ranges);

    let mut chunks = Vec::with_capacity(ranges.len());
    // range starts never decrease, so char offsets can be counted incrementally
    let mut byte_cursor = 0;
    let mut char_cursor = 0;
    for range in ranges {
        char_cursor += text[byte_cursor..range.start].chars().count();
        byte_cursor = range.start;

        let piece = &text[range];
        if piece.trim().is_empty() {
            continue;
        }

        chunks.push(Chunk {
            index: chunks.len(),
            start: char_cursor,
            text: piece.to_string(),
        });
    }

    Ok(chunks)
}

fn split_recursive(
    text: &str,
    range: Range<usize>,
    separators: &[&str],
    config: ChunkingConfig,
    out: &mut Vec<Range<usize>>,
) {
    let segment = &text[range.clone()];
    let position = separators
        .iter()
        .position(|separator| separator.is_empty() || segment.contains(separator))
        .unwrap_or(separators.len().saturating_sub(1));
    let separator = separators.get(position).copied().unwrap_or("");
    let finer = separators.get(position + 1..).unwrap_or(&[]);

    let mut pending = Vec::new();
    for piece in split_keeping_separator(segment, range.start, separator) {
        if char_len(text, &piece) < config.max_chars {
            pending.push(piece);
            continue;
        }

        if !pending.is_empty() {
            merge_pieces(text, &pending, config, out);
            pending.clear();
        }

        if finer.is_empty() {
            out.push(piece);
        } else {
            split_recursive(text, piece, finer, config, out);
        }
    }

    if !pending.is_empty() {
        merge_pieces(text, &pending, config, out);
    }
}

/// Byte ranges of `segment` cut after each separator occurrence; the separator stays
/// with the piece before it.
fn split_keeping_separator(segment: &str, offset: usize, separator: &str) -> Vec<Range<usize>> {
    if separator.is_empty() {
        return segment
            .char_indices()
            .map(|(index, ch)| offset + index..offset + index + ch.len_utf8())
            .collect();
    }

    let mut pieces = Vec::new();
    let mut start = 0;
    for (index, matched) in segment.match_indices(separator) {
        let end = index + matched.len();
        if end > start {
            pieces.push(offset + start..offset + end);
        }
        start = end;
    }
    if start < segment.len() {
        pieces.push(offset + start..offset + segment.len());
    }
    pieces
}

/// Greedily packs adjacent pieces into windows of at most `max_chars`, carrying the
/// tail of each emitted window (at most `overlap_chars`) into the next one.
fn merge_pieces(
    text: &str,
    pieces: &[Range<usize>],
    config: ChunkingConfig,
    out: &mut Vec<Range<usize>>,
) {
    let mut window: VecDeque<(Range<usize>, usize)> = VecDeque::new();
    let mut total = 0;

    for piece in pieces {
        let len = char_len(text, piece);

        if total + len > config.max_chars {
            if let Some(span) = window_span(&window) {
                out.push(span);
            }
            while total > config.overlap_chars || (total > 0 && total + len > config.max_chars) {
                match window.pop_front() {
                    Some((_, popped)) => total -= popped,
                    None => break,
                }
            }
        }

        window.push_back((piece.clone(), len));
        total += len;
    }

    if let Some(span) = window_span(&window) {
        out.push(span);
    }
}

fn window_span(window: &VecDeque<(Range<usize>, usize)>) -> Option<Range<usize>> {
    match (window.front(), window.back()) {
        (Some((first, _)), Some((last, _))) => Some(first.start..last.end),
        _ => None,
    }
}

fn char_len(text: &str, range: &Range<usize>) -> usize {
    text[range.clone()].chars().count()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(max_chars: usize, overlap_chars: usize) -> ChunkingConfig {
        ChunkingConfig {
            max_chars,
            overlap_chars,
        }
    }

    fn rebuild(chunks: &[Chunk]) -> String {
        let mut rebuilt = String::new();
        let mut covered: usize = 0;
        for chunk in chunks {
            let fresh = covered.saturating_sub(chunk.start);
            rebuilt.extend(chunk.text.chars().skip(fresh));
            covered = chunk.end();
        }
        rebuilt
    }

    const RESUME: &str = "Summary\n\nData engineer with eight years of experience building \
        batch and streaming systems. I led ETL pipelines using Python and SQL. \
        Designed warehouse models for finance reporting.\n\nExperience\n\n\
        Acme Corp, Senior Data Engineer. Migrated legacy cron jobs to Airflow and \
        cut nightly runtime by half. Mentored four junior engineers.\n\
        Globex, Data Analyst. Built dashboards in Tableau and automated reconciliations.";

    #[test]
    fn whitespace_is_normalized() {
        let input = "A  \t  lot\nof   spacing";
        let normalized = normalize_whitespace(input);
        assert_eq!(normalized, "A lot of spacing");
    }

    #[test]
    fn chunks_are_bounded_and_cover_the_input() -> Result<(), IngestError> {
        let chunks = split_text(RESUME, config(80, 20))?;

        assert!(chunks.len() > 3);
        for chunk in &chunks {
            assert!(chunk.char_len() <= 80, "chunk too long: {:?}", chunk.text);
        }
        for pair in chunks.windows(2) {
            assert!(pair[1].start >= pair[0].start);
            assert!(pair[1].end() > pair[0].end());
            assert!(pair[0].end().saturating_sub(pair[1].start) <= 20, "overlap exceeds config");
        }

        let source: Vec<char> = RESUME.chars().collect();
        let mut covered = vec![false; source.len()];
        for chunk in &chunks {
            for (offset, ch) in chunk.text.chars().enumerate() {
                assert_eq!(source[chunk.start + offset], ch);
                covered[chunk.start + offset] = true;
            }
        }
        for (position, ch) in source.iter().enumerate() {
            assert!(covered[position] || ch.is_whitespace(), "lost {ch:?} at {position}");
        }
        Ok(())
    }

    #[test]
    fn chunk_indexes_and_offsets_match_the_source() -> Result<(), IngestError> {
        let chunks = split_text(RESUME, config(120, 30))?;
        let chars: Vec<char> = RESUME.chars().collect();

        for (position, chunk) in chunks.iter().enumerate() {
            assert_eq!(chunk.index, position);
            let expected: String = chars[chunk.start..chunk.end()].iter().collect();
            assert_eq!(chunk.text, expected);
        }
        Ok(())
    }

    #[test]
    fn consecutive_word_chunks_overlap() -> Result<(), IngestError> {
        let text = "alpha bravo delta gamma omega sigma kappa theta lamda zetas ".repeat(4);
        let chunks = split_text(&text, config(30, 12))?;

        assert!(chunks.len() > 2);
        for pair in chunks.windows(2) {
            let shared = pair[0].end() - pair[1].start;
            assert!(shared > 0 && shared <= 12, "unexpected overlap {shared}");
        }
        assert_eq!(rebuild(&chunks), text);
        Ok(())
    }

    #[test]
    fn paragraph_boundaries_win_over_words() -> Result<(), IngestError> {
        let first = "Led the ETL platform team at Acme.";
        let second = "Built Tableau dashboards at Globex.";
        let text = format!("{first}\n\n{second}");

        let chunks = split_text(&text, config(40, 5))?;
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].text, format!("{first}\n\n"));
        assert_eq!(chunks[1].text, second);
        Ok(())
    }

    #[test]
    fn unbroken_text_falls_back_to_character_cuts() -> Result<(), IngestError> {
        let text = "abcdefghijklmnopqrstuvwxy";
        let chunks = split_text(text, config(10, 2))?;

        let starts: Vec<usize> = chunks.iter().map(|chunk| chunk.start).collect();
        assert_eq!(starts, vec![0, 8, 16]);
        assert_eq!(chunks[0].text, "abcdefghij");
        assert_eq!(chunks[2].text, "qrstuvwxy");
        Ok(())
    }

    #[test]
    fn multibyte_text_is_measured_in_characters() -> Result<(), IngestError> {
        let text = "résumé naïve café ".repeat(5);
        let chunks = split_text(&text, config(20, 4))?;

        for chunk in &chunks {
            assert!(chunk.char_len() <= 20);
        }
        assert_eq!(rebuild(&chunks), text);
        Ok(())
    }

    #[test]
    fn splitting_is_deterministic() -> Result<(), IngestError> {
        let first = split_text(RESUME, ChunkingConfig::default())?;
        let second = split_text(RESUME, ChunkingConfig::default())?;
        assert_eq!(first, second);
        assert_eq!(first.len(), 1);
        Ok(())
    }

    #[test]
    fn empty_text_yields_no_chunks() -> Result<(), IngestError> {
        assert!(split_text("", ChunkingConfig::default())?.is_empty());
        assert!(split_text(" \n\n ", ChunkingConfig::default())?.is_empty());
        Ok(())
    }

    #[test]
    fn overlap_must_be_smaller_than_chunk_size() {
        assert!(matches!(
            split_text("text", config(10, 10)),
            Err(IngestError::InvalidChunkConfig(_))
        ));
        assert!(matches!(
            split_text("text", config(0, 0)),
            Err(IngestError::InvalidChunkConfig(_))
        ));
    }
}
