//! Lexical similarity: matching-block ratio.
//!
//! `ratio = 2·M / T`, where `M` is the total size of the matching blocks found
//! by repeatedly taking the longest common substring and recursing on both
//! sides of it, and `T` is the combined length of both strings. Thresholds
//! elsewhere are tuned to this exact distribution, including the "popular
//! element" rule: in a candidate of 200+ chars, a char occurring more than
//! `len / 100 + 1` times cannot seed a match.

use std::collections::HashMap;

use crate::models::QaRecord;

/// Similarity of two strings in `[0, 1]` after case normalization.
pub fn similarity(query: &str, candidate: &str) -> f64 {
    let a: Vec<char> = query.trim().to_lowercase().chars().collect();
    let b: Vec<char> = candidate.to_lowercase().chars().collect();
    ratio(&a, &b)
}

fn ratio(a: &[char], b: &[char]) -> f64 {
    let total = a.len() + b.len();
    if total == 0 {
        return 1.0;
    }
    let matched = BlockMatcher::new(a, b).matched_len();
    2.0 * matched as f64 / total as f64
}

struct BlockMatcher<'a> {
    a: &'a [char],
    b: &'a [char],
    /// Positions of each char in `b`, popular chars removed.
    b2j: HashMap<char, Vec<usize>>,
}

impl<'a> BlockMatcher<'a> {
    fn new(a: &'a [char], b: &'a [char]) -> Self {
        let mut b2j: HashMap<char, Vec<usize>> = HashMap::new();
        for (j, c) in b.iter().enumerate() {
            b2j.entry(*c).or_default().push(j);
        }

        let n = b.len();
        if n >= 200 {
            let popular_above = n / 100 + 1;
            b2j.retain(|_, positions| positions.len() <= popular_above);
        }

        Self { a, b, b2j }
    }

    /// Longest common run of `a[alo..ahi]` and `b[blo..bhi]`, earliest in `a`
    /// then earliest in `b` on ties. Returns `(i, j, size)`.
    fn longest_match(
        &self,
        alo: usize,
        ahi: usize,
        blo: usize,
        bhi: usize,
    ) -> (usize, usize, usize) {
        let (mut besti, mut bestj, mut bestsize) = (alo, blo, 0usize);
        let mut j2len: HashMap<usize, usize> = HashMap::new();

        for i in alo..ahi {
            let mut next_j2len: HashMap<usize, usize> = HashMap::new();
            if let Some(positions) = self.b2j.get(&self.a[i]) {
                for &j in positions {
                    if j < blo {
                        continue;
                    }
                    if j >= bhi {
                        break;
                    }
                    let k = j
                        .checked_sub(1)
                        .and_then(|p| j2len.get(&p))
                        .copied()
                        .unwrap_or(0)
                        + 1;
                    next_j2len.insert(j, k);
                    if k > bestsize {
                        besti = i + 1 - k;
                        bestj = j + 1 - k;
                        bestsize = k;
                    }
                }
            }
            j2len = next_j2len;
        }

        // Popular chars never seed a match but may extend one.
        while besti > alo && bestj > blo && self.a[besti - 1] == self.b[bestj - 1] {
            besti -= 1;
            bestj -= 1;
            bestsize += 1;
        }
        while besti + bestsize < ahi
            && bestj + bestsize < bhi
            && self.a[besti + bestsize] == self.b[bestj + bestsize]
        {
            bestsize += 1;
        }

        (besti, bestj, bestsize)
    }

    /// Total size of all matching blocks.
    fn matched_len(&self) -> usize {
        let mut matched = 0;
        let mut pending = vec![(0, self.a.len(), 0, self.b.len())];

        while let Some((alo, ahi, blo, bhi)) = pending.pop() {
            let (i, j, k) = self.longest_match(alo, ahi, blo, bhi);
            if k == 0 {
                continue;
            }
            matched += k;
            if alo < i && blo < j {
                pending.push((alo, i, blo, j));
            }
            if i + k < ahi && j + k < bhi {
                pending.push((i + k, ahi, j + k, bhi));
            }
        }

        matched
    }
}

/// Best-scoring record for a query.
#[derive(Debug, Clone, PartialEq)]
pub struct LexicalMatch<'r> {
    pub record: &'r QaRecord,
    pub score: f64,
}

/// Every candidate with a non-empty question, scored, in candidate order.
pub fn score_all<'r>(query: &str, candidates: &[&'r QaRecord]) -> Vec<LexicalMatch<'r>> {
    candidates
        .iter()
        .copied()
        .filter(|r| !r.question.is_empty())
        .map(|r| LexicalMatch {
            record: r,
            score: similarity(query, &r.question),
        })
        .collect()
}

/// Argmax over candidates; the first of equal scores wins. `None` when nothing
/// reaches `threshold` (or nothing scores above zero).
pub fn best_match<'r>(
    query: &str,
    candidates: &[&'r QaRecord],
    threshold: f64,
) -> Option<LexicalMatch<'r>> {
    best_of(&score_all(query, candidates), threshold)
}

/// `best_match` over already scored candidates.
pub fn best_of<'r>(scored: &[LexicalMatch<'r>], threshold: f64) -> Option<LexicalMatch<'r>> {
    let mut best: Option<&LexicalMatch<'r>> = None;
    for candidate in scored {
        if candidate.score > best.map_or(0.0, |b| b.score) {
            best = Some(candidate);
        }
    }
    best.filter(|b| b.score >= threshold).cloned()
}

/// Scored candidates ordered best-first; equal scores keep candidate order.
pub fn ranked<'r>(mut scored: Vec<LexicalMatch<'r>>) -> Vec<LexicalMatch<'r>> {
    scored.sort_by(|a, b| b.score.total_cmp(&a.score));
    scored
}
