// src/similarity.rs
//! Longest-matching-block similarity (the classic "gestalt" ratio used by diff tools).
//!
//! `ratio = 2 * M / (len(a) + len(b))`, where `M` is the total length of the matching
//! blocks found by repeatedly taking the longest common contiguous block and recursing
//! into the pieces on its left and right.
//!
//! Details that affect the exact score and therefore the 0.6 acceptance cutoff:
//! - Sequences are compared per Unicode scalar value (`char`), not per byte.
//! - Among equally long blocks the one starting earliest in `a` wins, then earliest in `b`.
//! - When `b` has 200+ elements, elements occurring in more than 1% of it (+1) are
//!   "popular" and cannot seed a match; they can still extend one.
//! - No junk predicate.
//!
//! The second sequence is preprocessed once (`BlockMatcher::new`) so it can be scored
//! against many first sequences cheaply.

use std::collections::HashMap;

/// `b` length from which the popular-element heuristic kicks in.
const AUTOJUNK_MIN_LEN: usize = 200;

/// A matching block: `a[a_start..a_start+size] == b[b_start..b_start+size]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Block {
    pub a_start: usize,
    pub b_start: usize,
    pub size: usize,
}

/// Preprocessed second sequence.
#[derive(Debug, Clone)]
pub struct BlockMatcher {
    b: Vec<char>,
    /// element -> ascending positions in `b` (popular elements removed)
    b2j: HashMap<char, Vec<usize>>,
    /// element -> full count in `b` (popular elements included)
    full_count: HashMap<char, usize>,
}

impl BlockMatcher {
    pub fn new(b: &str) -> Self {
        let b: Vec<char> = b.chars().collect();

        let mut b2j: HashMap<char, Vec<usize>> = HashMap::new();
        for (j, &c) in b.iter().enumerate() {
            b2j.entry(c).or_default().push(j);
        }
        let full_count = b2j.iter().map(|(&c, js)| (c, js.len())).collect();

        let n = b.len();
        if n >= AUTOJUNK_MIN_LEN {
            let ntest = n / 100 + 1;
            b2j.retain(|_, js| js.len() <= ntest);
        }

        Self { b, b2j, full_count }
    }

    /// Similarity of `a` against the preprocessed sequence, in `[0.0, 1.0]`.
    pub fn ratio(&self, a: &str) -> f64 {
        let a: Vec<char> = a.chars().collect();
        let matches: usize = self.blocks_of(&a).iter().map(|blk| blk.size).sum();
        calculate_ratio(matches, a.len() + self.b.len())
    }

    /// Upper bound on `ratio` from the multiset intersection of both sequences.
    pub fn quick_ratio(&self, a: &str) -> f64 {
        let mut avail: HashMap<char, isize> = HashMap::new();
        let mut matches = 0usize;
        let mut a_len = 0usize;
        for c in a.chars() {
            a_len += 1;
            let numb = *avail
                .entry(c)
                .or_insert_with(|| self.full_count.get(&c).copied().unwrap_or(0) as isize);
            avail.insert(c, numb - 1);
            if numb > 0 {
                matches += 1;
            }
        }
        calculate_ratio(matches, a_len + self.b.len())
    }

    /// Upper bound on `ratio` from the lengths alone.
    pub fn real_quick_ratio(&self, a: &str) -> f64 {
        let la = a.chars().count();
        let lb = self.b.len();
        calculate_ratio(la.min(lb), la + lb)
    }

    /// Matching blocks of `a` against `b`, sorted by position.
    pub fn matching_blocks(&self, a: &str) -> Vec<Block> {
        let a: Vec<char> = a.chars().collect();
        let mut blocks = self.blocks_of(&a);
        blocks.sort_by_key(|blk| (blk.a_start, blk.b_start));
        blocks
    }

    fn blocks_of(&self, a: &[char]) -> Vec<Block> {
        let mut queue = vec![(0, a.len(), 0, self.b.len())];
        let mut blocks = Vec::new();

        while let Some((alo, ahi, blo, bhi)) = queue.pop() {
            let blk = self.find_longest_match(a, alo, ahi, blo, bhi);
            if blk.size == 0 {
                continue;
            }
            if alo < blk.a_start && blo < blk.b_start {
                queue.push((alo, blk.a_start, blo, blk.b_start));
            }
            if blk.a_start + blk.size < ahi && blk.b_start + blk.size < bhi {
                queue.push((blk.a_start + blk.size, ahi, blk.b_start + blk.size, bhi));
            }
            blocks.push(blk);
        }

        blocks
    }

    /// Longest block inside `a[alo..ahi]` x `b[blo..bhi]`.
    fn find_longest_match(&self, a: &[char], alo: usize, ahi: usize, blo: usize, bhi: usize) -> Block {
        let b = &self.b;
        let (mut besti, mut bestj, mut bestsize) = (alo, blo, 0usize);

        // j2len[j] = length of the longest block ending at a[i-1], b[j]
        let mut j2len: HashMap<usize, usize> = HashMap::new();
        for (i, c) in a.iter().enumerate().take(ahi).skip(alo) {
            let mut next: HashMap<usize, usize> = HashMap::new();
            if let Some(js) = self.b2j.get(c) {
                for &j in js {
                    if j < blo {
                        continue;
                    }
                    if j >= bhi {
                        break;
                    }
                    let prev = if j > 0 { j2len.get(&(j - 1)).copied().unwrap_or(0) } else { 0 };
                    let k = prev + 1;
                    next.insert(j, k);
                    if k > bestsize {
                        besti = i + 1 - k;
                        bestj = j + 1 - k;
                        bestsize = k;
                    }
                }
            }
            j2len = next;
        }

        // Popular elements never seed a block, but they may extend one.
        while besti > alo && bestj > blo && a[besti - 1] == b[bestj - 1] {
            besti -= 1;
            bestj -= 1;
            bestsize += 1;
        }
        while besti + bestsize < ahi && bestj + bestsize < bhi && a[besti + bestsize] == b[bestj + bestsize] {
            bestsize += 1;
        }

        Block {
            a_start: besti,
            b_start: bestj,
            size: bestsize,
        }
    }
}

/// One-shot convenience: similarity of `a` and `b`.
pub fn ratio(a: &str, b: &str) -> f64 {
    BlockMatcher::new(b).ratio(a)
}

#[inline]
fn calculate_ratio(matches: usize, length: usize) -> f64 {
    if length == 0 {
        return 1.0;
    }
    2.0 * matches as f64 / length as f64
}
