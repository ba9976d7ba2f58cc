// src/matcher.rs
//! Entity matcher: maps one token to the closest known disease id, if close enough.

use crate::knowledge::KnowledgeBase;
use crate::similarity::BlockMatcher;

/// Minimum similarity ratio for a candidate to be accepted.
pub const MATCH_CUTOFF: f64 = 0.6;

/// Accepted candidate with its score.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EntityMatch<'a> {
    pub id: &'a str,
    pub score: f64,
}

/// Fuzzy matcher over a fixed identifier universe. Stateless after construction.
#[derive(Debug, Clone)]
pub struct EntityMatcher {
    ids: Vec<String>,
}

impl EntityMatcher {
    pub fn new(kb: &KnowledgeBase) -> Self {
        Self::from_ids(kb.ids())
    }

    pub fn from_ids<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            ids: ids.into_iter().map(Into::into).collect(),
        }
    }

    /// Best id for `token`, or `None` when nothing reaches `MATCH_CUTOFF`.
    pub fn match_token(&self, token: &str) -> Option<&str> {
        self.best_match(token).map(|m| m.id)
    }

    /// Like `match_token` but also reports the winning score.
    ///
    /// Ties on score go to the lexicographically greatest id, so the result never depends
    /// on hash order.
    pub fn best_match(&self, token: &str) -> Option<EntityMatch<'_>> {
        let word = token.to_lowercase();
        if word.is_empty() {
            return None;
        }

        // The token is the fixed side; every candidate is scored against it.
        let sm = BlockMatcher::new(&word);
        let mut best: Option<EntityMatch<'_>> = None;

        for id in &self.ids {
            if sm.real_quick_ratio(id) < MATCH_CUTOFF || sm.quick_ratio(id) < MATCH_CUTOFF {
                continue;
            }
            let score = sm.ratio(id);
            if score < MATCH_CUTOFF {
                continue;
            }
            let wins = match best {
                None => true,
                Some(b) => score > b.score || (score == b.score && id.as_str() > b.id),
            };
            if wins {
                best = Some(EntityMatch {
                    id: id.as_str(),
                    score,
                });
            }
        }

        best
    }

    pub fn ids(&self) -> &[String] {
        &self.ids
    }
}
