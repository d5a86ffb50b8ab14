//! Separator-bounded segmentation: greedy accumulation under a size budget
//! with trailing-context overlap, recursing coarse-to-fine until pieces fit.

use std::collections::VecDeque;

use regex::Regex;
use tracing::warn;

use crate::measure::LengthMetric;

/// One boundary rule in the cascade, coarse to fine.
#[derive(Clone, Debug)]
pub enum Separator {
    /// Regex boundary. If the pattern carries a capture group, only the
    /// group text is the separator token; the rest of the match stays with
    /// the preceding content (the group must be a suffix of the match).
    Pattern(Regex),
    /// Literal boundary, matched verbatim. Must be non-empty.
    Literal(String),
    /// Split anywhere: fixed-stride character windows, the last resort.
    Chars,
}

impl Separator {
    pub fn pattern(pat: &str) -> Result<Self, regex::Error> {
        Ok(Separator::Pattern(Regex::new(pat)?))
    }

    pub fn literal(sep: impl Into<String>) -> Self {
        Separator::Literal(sep.into())
    }
}

/// Default cascade: paragraph breaks, line breaks, sentence boundaries
/// (whitespace after terminal punctuation), any whitespace, then characters.
pub fn default_cascade() -> Result<Vec<Separator>, regex::Error> {
    Ok(vec![
        Separator::pattern(r"\n{2,}")?,
        Separator::pattern(r"\n+")?,
        Separator::pattern(r"[.!?](\s+)")?,
        Separator::pattern(r"\s+")?,
        Separator::Chars,
    ])
}

/// Split `text` into alternating content/separator tokens. Concatenating the
/// tokens reproduces `text` exactly; separators are retained, not discarded.
fn tokenize<'a>(text: &'a str, sep: &Separator) -> Vec<&'a str> {
    let mut tokens = Vec::new();
    let mut last = 0;
    match sep {
        Separator::Pattern(re) if re.captures_len() > 1 => {
            for caps in re.captures_iter(text) {
                let Some(m) = caps.get(1) else { continue };
                if m.start() > last {
                    tokens.push(&text[last..m.start()]);
                }
                if !m.as_str().is_empty() {
                    tokens.push(m.as_str());
                }
                last = m.end();
            }
        }
        Separator::Pattern(re) => {
            for m in re.find_iter(text) {
                if m.start() > last {
                    tokens.push(&text[last..m.start()]);
                }
                if !m.as_str().is_empty() {
                    tokens.push(m.as_str());
                }
                last = m.end();
            }
        }
        Separator::Literal(lit) => {
            for (idx, m) in text.match_indices(lit.as_str()) {
                if idx > last {
                    tokens.push(&text[last..idx]);
                }
                tokens.push(m);
                last = idx + m.len();
            }
        }
        // The character fallback never tokenizes; split_on_separator slices.
        Separator::Chars => {
            tokens.push(text);
            last = text.len();
        }
    }
    if last < text.len() {
        tokens.push(&text[last..]);
    }
    tokens
}

/// Split on a single separator under `chunk_size`, keeping up to
/// `chunk_overlap` of trailing context between adjacent chunks.
///
/// The character fallback (`Separator::Chars`) slices fixed windows of
/// `chunk_size` characters every `chunk_size - chunk_overlap` characters;
/// when the overlap is not smaller than the budget, the stride falls back to
/// full-size non-overlapping steps.
pub fn split_on_separator(
    text: &str,
    sep: &Separator,
    chunk_size: usize,
    chunk_overlap: usize,
    metric: LengthMetric,
) -> Vec<String> {
    let chunk_size = chunk_size.max(1);

    if let Separator::Chars = sep {
        let step = match chunk_size.checked_sub(chunk_overlap) {
            Some(step) if step > 0 => step,
            _ => chunk_size,
        };
        let bounds: Vec<usize> = text
            .char_indices()
            .map(|(i, _)| i)
            .chain(std::iter::once(text.len()))
            .collect();
        let total = bounds.len() - 1;
        let mut chunks = Vec::new();
        let mut start = 0;
        while start < total {
            let end = (start + chunk_size).min(total);
            chunks.push(text[bounds[start]..bounds[end]].to_string());
            start += step;
        }
        return chunks;
    }

    let mut chunks = Vec::new();
    let mut window: VecDeque<&str> = VecDeque::new();
    let mut window_len = 0usize;

    for token in tokenize(text, sep) {
        let token_len = metric.measure(token);
        if window_len + token_len > chunk_size && !window.is_empty() {
            chunks.push(window.iter().copied().collect());
            // Trim whole tokens off the front until what remains fits the
            // overlap; the remainder seeds the next chunk. Never slices a
            // token, so the realized overlap may undershoot chunk_overlap.
            while window_len > chunk_overlap {
                match window.pop_front() {
                    Some(front) => window_len -= metric.measure(front),
                    None => break,
                }
            }
        }
        window.push_back(token);
        window_len += token_len;
    }

    if !window.is_empty() {
        chunks.push(window.iter().copied().collect());
    }
    chunks
}

/// Top-level entry: recursively partition `text` under `chunk_size`, trying
/// the coarsest separator first and descending into finer ones only for
/// pieces that remain oversized. A piece the finest separator cannot reduce
/// is emitted as-is with a warning, never an error.
pub fn recursive_split(
    text: &str,
    separators: &[Separator],
    chunk_size: usize,
    chunk_overlap: usize,
    metric: LengthMetric,
) -> Vec<String> {
    if metric.measure(text) <= chunk_size {
        return vec![text.to_string()];
    }

    let Some((first, rest)) = separators.split_first() else {
        warn!(
            size = metric.measure(text),
            budget = chunk_size,
            "indivisible segment exceeds budget; emitting as-is"
        );
        return vec![text.to_string()];
    };

    let mut out = Vec::new();
    for piece in split_on_separator(text, first, chunk_size, chunk_overlap, metric) {
        let piece_len = metric.measure(&piece);
        if piece_len <= chunk_size {
            out.push(piece);
        } else if rest.is_empty() {
            warn!(
                size = piece_len,
                budget = chunk_size,
                "indivisible segment exceeds budget; emitting as-is"
            );
            out.push(piece);
        } else {
            out.extend(recursive_split(&piece, rest, chunk_size, chunk_overlap, metric));
        }
    }
    out
}

/// Rough part-count estimate from the stride arithmetic, for plan output.
pub fn estimate_parts(total: usize, chunk_size: usize, chunk_overlap: usize) -> usize {
    let chunk_size = chunk_size.max(1);
    if total <= chunk_size {
        return 1;
    }
    let step = match chunk_size.checked_sub(chunk_overlap) {
        Some(step) if step > 0 => step,
        _ => chunk_size,
    };
    1 + (total - chunk_size).div_ceil(step)
}
