//! Overlap detection and stitching: rebuild one text stream from ordered
//! chunks whose shared boundary regions may have drifted.

/// Largest `k` such that the last `k` characters of `left` equal the first
/// `k` characters of `right`, with `k <= max_overlap`. Scans from the cap
/// downward and returns the first match, so coincidental smaller overlaps
/// cannot shadow the real one. Returns 0 when nothing matches.
pub fn find_overlap(left: &str, right: &str, max_overlap: usize) -> usize {
    let cap = max_overlap
        .min(left.chars().count())
        .min(right.chars().count());
    if cap == 0 {
        return 0;
    }

    // byte offsets of the k-char suffix of `left` and k-char prefix of `right`
    let tail_starts: Vec<usize> = left.char_indices().map(|(i, _)| i).rev().take(cap).collect();
    let head_ends: Vec<usize> = right
        .char_indices()
        .map(|(i, _)| i)
        .skip(1)
        .chain(std::iter::once(right.len()))
        .take(cap)
        .collect();

    for k in (1..=cap).rev() {
        if left[tail_starts[k - 1]..] == right[..head_ends[k - 1]] {
            return k;
        }
    }
    0
}

/// Result of stitching: the reconstructed text plus the indices of chunks
/// whose expected overlap was not found (appended in full).
#[derive(Clone, Debug, Default)]
pub struct Stitched {
    pub text: String,
    pub misses: Vec<usize>,
}

/// Re-join ordered chunks, trimming the detected overlap off the front of
/// each chunk after the first. An overlap that cannot be found is never an
/// error: the chunk is appended whole and its index recorded, accepting
/// possible duplication at that boundary.
pub fn stitch<S: AsRef<str>>(chunks: &[S], expected_overlap: usize) -> Stitched {
    let mut stitched = Stitched::default();
    for (i, chunk) in chunks.iter().enumerate() {
        let chunk = chunk.as_ref();
        if i == 0 {
            stitched.text.push_str(chunk);
            continue;
        }
        let k = find_overlap(&stitched.text, chunk, expected_overlap);
        if k == 0 && expected_overlap > 0 {
            stitched.misses.push(i);
        }
        let skip = chunk
            .char_indices()
            .nth(k)
            .map(|(b, _)| b)
            .unwrap_or(chunk.len());
        stitched.text.push_str(&chunk[skip..]);
    }
    stitched
}
