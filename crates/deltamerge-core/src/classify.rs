//! Outcome classification of one merge.
//!
//! A line merge can be textually clean and still differ from the target only
//! in formatting. Such merges are not meaningful changes, so after merging we
//! compare the result with the original target under a whitespace-insensitive
//! rule:
//!
//! | Merge result                          | Outcome          | Final text       |
//! |---------------------------------------|------------------|------------------|
//! | conflict blocks present               | `Conflict`       | merge output     |
//! | clean, whitespace-equivalent to target| `NoRealChange`   | original target  |
//! | clean, otherwise                      | `Clean`          | merge output     |
//!
//! `NoRealChange` always resets the final text to the target verbatim so the
//! classification never introduces incidental whitespace drift.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::merge::{ConflictHunk, MergeResult};

// ---------------------------------------------------------------------------
// Outcome
// ---------------------------------------------------------------------------

/// Classification of one processed unit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// Conflict-free and meaningfully different from the target.
    Clean,
    /// Conflict-free and whitespace-equivalent to the target.
    NoRealChange,
    /// At least one conflict block.
    Conflict,
}

impl Outcome {
    /// Combine the outcomes of a unit's primary artifact and its companion.
    ///
    /// `Conflict` dominates, then `Clean`, then `NoRealChange`.
    #[must_use]
    pub const fn combine(self, other: Self) -> Self {
        match (self, other) {
            (Self::Conflict, _) | (_, Self::Conflict) => Self::Conflict,
            (Self::Clean, _) | (_, Self::Clean) => Self::Clean,
            (Self::NoRealChange, Self::NoRealChange) => Self::NoRealChange,
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Clean => write!(f, "clean"),
            Self::NoRealChange => write!(f, "no real change"),
            Self::Conflict => write!(f, "conflict"),
        }
    }
}

// ---------------------------------------------------------------------------
// WhitespaceRule
// ---------------------------------------------------------------------------

/// How two texts are compared for whitespace-only equivalence.
///
/// Line terminators are always ignored. Blank lines are never dropped: adding
/// or removing an empty line is a real change under both rules.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WhitespaceRule {
    /// Remove every whitespace character from every line (`diff -w`).
    #[default]
    IgnoreAll,
    /// Trim each line and collapse internal runs to a single space.
    CollapseRuns,
}

impl WhitespaceRule {
    /// Canonical form of one line under this rule.
    #[must_use]
    pub fn canonical_line(self, line: &str) -> String {
        match self {
            Self::IgnoreAll => line.chars().filter(|c| !c.is_whitespace()).collect(),
            Self::CollapseRuns => line.split_whitespace().collect::<Vec<_>>().join(" "),
        }
    }

    /// Returns `true` if `a` and `b` differ only in whitespace.
    #[must_use]
    pub fn equivalent(self, a: &str, b: &str) -> bool {
        if a == b {
            return true;
        }
        let mut left = a.lines();
        let mut right = b.lines();
        loop {
            match (left.next(), right.next()) {
                (None, None) => return true,
                (Some(x), Some(y)) => {
                    if self.canonical_line(x) != self.canonical_line(y) {
                        return false;
                    }
                }
                _ => return false,
            }
        }
    }
}

impl fmt::Display for WhitespaceRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::IgnoreAll => write!(f, "ignore-all"),
            Self::CollapseRuns => write!(f, "collapse-runs"),
        }
    }
}

// ---------------------------------------------------------------------------
// classify
// ---------------------------------------------------------------------------

/// Result of [`classify`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Classified {
    /// The outcome tag.
    pub outcome: Outcome,
    /// Text to record for this artifact.
    pub final_text: String,
    /// Conflict blocks of the merge (empty unless `Conflict`).
    pub hunks: Vec<ConflictHunk>,
}

impl Classified {
    /// Number of conflict blocks.
    #[must_use]
    pub fn conflict_count(&self) -> usize {
        self.hunks.len()
    }
}

/// Classify a merge result against the pre-merge target.
#[must_use]
pub fn classify(target: &str, merged: MergeResult, rule: WhitespaceRule) -> Classified {
    if !merged.is_clean() {
        return Classified {
            outcome: Outcome::Conflict,
            final_text: merged.text,
            hunks: merged.hunks,
        };
    }

    if rule.equivalent(&merged.text, target) {
        Classified {
            outcome: Outcome::NoRealChange,
            final_text: target.to_owned(),
            hunks: Vec::new(),
        }
    } else {
        Classified {
            outcome: Outcome::Clean,
            final_text: merged.text,
            hunks: Vec::new(),
        }
    }
}
