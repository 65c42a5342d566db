//! `weekboard-search` — boolean token matching over grid row text.
//!
//! A small AND/OR/NOT engine: the search bar turns free text into tokens,
//! each row renders to a haystack string (name, department, project names),
//! and `matches` decides row visibility. Design:
//!
//! - Normalization (trim + lowercase) happens once, at add time.
//! - Token add/remove/op-change are pure list transitions.
//! - Matching is substring containment, short-circuiting where possible.

use serde::{Deserialize, Serialize};

/// Boolean operator attached to a search token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenOp {
    And,
    Or,
    Not,
}

/// One search term with its operator. Terms are stored normalized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchToken {
    pub id: u64,
    pub term: String,
    pub op: TokenOp,
}

/// Holds the token list and evaluates haystacks against it.
#[derive(Debug, Clone, Default)]
pub struct SearchTokenEngine {
    tokens: Vec<SearchToken>,
    next_id: u64,
}

impl SearchTokenEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tokens(&self) -> &[SearchToken] {
        &self.tokens
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Add a token. The term is trimmed and lowercased; empty terms and
    /// `(term, op)` duplicates are rejected. Returns the new token's id.
    pub fn add_token(&mut self, term: &str, op: TokenOp) -> Option<u64> {
        let term = term.trim().to_lowercase();
        if term.is_empty() {
            return None;
        }
        if self.tokens.iter().any(|t| t.term == term && t.op == op) {
            return None;
        }

        let id = self.next_id;
        self.next_id += 1;
        self.tokens.push(SearchToken { id, term, op });
        Some(id)
    }

    /// Remove a token by id. Returns false if no such token.
    pub fn remove_token(&mut self, id: u64) -> bool {
        let before = self.tokens.len();
        self.tokens.retain(|t| t.id != id);
        self.tokens.len() != before
    }

    /// Change a token's operator in place. Returns false if no such token.
    pub fn set_op(&mut self, id: u64, op: TokenOp) -> bool {
        match self.tokens.iter_mut().find(|t| t.id == id) {
            Some(token) => {
                token.op = op;
                true
            }
            None => false,
        }
    }

    pub fn clear(&mut self) {
        self.tokens.clear();
    }

    /// Evaluate the token set against a row's text.
    ///
    /// - any NOT term found → false
    /// - any AND term missing → false
    /// - when OR terms exist, at least one must be found
    /// - an empty token set matches everything
    pub fn matches(&self, haystack: &str) -> bool {
        if self.tokens.is_empty() {
            return true;
        }

        let haystack = haystack.to_lowercase();
        let mut has_or = false;
        let mut or_hit = false;

        for token in &self.tokens {
            let found = haystack.contains(&token.term);
            match token.op {
                TokenOp::Not => {
                    if found {
                        return false;
                    }
                }
                TokenOp::And => {
                    if !found {
                        return false;
                    }
                }
                TokenOp::Or => {
                    has_or = true;
                    or_hit = or_hit || found;
                }
            }
        }

        !has_or || or_hit
    }
}
