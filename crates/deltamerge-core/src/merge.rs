//! Three-way (diff3) line merge.
//!
//! [`merge`] applies the change `before → after` (the delta) onto `target`,
//! an independently evolved copy of `before`. The algorithm:
//!
//! 1. Split all three texts into lines. A line keeps its `\n` terminator, so a
//!    final line without one is a distinct value and the identity paths stay
//!    byte-exact.
//! 2. Align `before` against `target` and `before` against `after` with a
//!    Myers line diff (`similar`).
//! 3. Walk `before`, alternating between *stable* regions (lines matched in
//!    both alignments at the current positions, emitted verbatim) and
//!    *unstable* regions between them. An unstable region takes whichever side
//!    changed it; if both sides changed it identically the change is taken
//!    once; otherwise a conflict block is emitted.
//!
//! The merge is a pure function of its inputs: no I/O, no external process,
//! no randomness.
//!
//! ```text
//! before:  a b c d e        target:  A b c d e        after:  a b c d E
//!          ^       ^                 ^                                ^
//!          │       └── changed only by the delta ──────────────────────┘
//!          └── changed only by the target
//! merged:  A b c d E
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};
use similar::{Algorithm, DiffOp, capture_diff_slices};

/// Width of a conflict marker run (`<<<<<<<`).
pub const MARKER_WIDTH: usize = 7;

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

/// Layout of emitted conflict blocks.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConflictStyle {
    /// Target side and delta side only.
    #[default]
    Merge,
    /// Target side, the `before` lines, then the delta side.
    Diff3,
}

impl fmt::Display for ConflictStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Merge => write!(f, "merge"),
            Self::Diff3 => write!(f, "diff3"),
        }
    }
}

/// Labels printed after the conflict markers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MarkerLabels {
    /// Label after `<<<<<<<`.
    pub target: String,
    /// Label after `|||||||` (diff3 style only).
    pub before: String,
    /// Label after `>>>>>>>`.
    pub delta: String,
}

impl Default for MarkerLabels {
    fn default() -> Self {
        Self {
            target: "target".to_owned(),
            before: "before".to_owned(),
            delta: "delta".to_owned(),
        }
    }
}

/// Merge settings.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MergeOptions {
    /// Conflict block layout.
    pub style: ConflictStyle,
    /// Marker labels.
    pub labels: MarkerLabels,
}

// ---------------------------------------------------------------------------
// Result types
// ---------------------------------------------------------------------------

/// One conflict block in a merge result.
///
/// Line numbers are 1-indexed. A zero-length `before` range means both sides
/// inserted different lines at the same position; `before_start` then names
/// the line the insertion precedes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConflictHunk {
    /// First `before` line covered by the block.
    pub before_start: usize,
    /// Number of `before` lines covered.
    pub before_len: usize,
    /// Number of target-side lines inside the block.
    pub target_len: usize,
    /// Number of delta-side lines inside the block.
    pub delta_len: usize,
    /// Line of the merged text holding the opening marker.
    pub output_line: usize,
}

/// Output of [`merge`].
///
/// `hunks` is empty exactly when `text` is a marker-free candidate output.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MergeResult {
    /// Merged text, with conflict blocks when `hunks` is non-empty.
    pub text: String,
    /// One entry per conflict block, in output order.
    pub hunks: Vec<ConflictHunk>,
}

impl MergeResult {
    fn unchanged(text: &str) -> Self {
        Self {
            text: text.to_owned(),
            hunks: Vec::new(),
        }
    }

    /// Number of conflict blocks.
    #[must_use]
    pub fn conflict_count(&self) -> usize {
        self.hunks.len()
    }

    /// Returns `true` if no conflict block was emitted.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.hunks.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Entry points
// ---------------------------------------------------------------------------

/// Merge the delta `before → after` onto `target` with default options.
#[must_use]
pub fn merge(target: &str, before: &str, after: &str) -> MergeResult {
    merge_with(target, before, after, &MergeOptions::default())
}

/// Merge the delta `before → after` onto `target`.
#[must_use]
pub fn merge_with(target: &str, before: &str, after: &str, options: &MergeOptions) -> MergeResult {
    // Identity paths: delta is a no-op, or target never drifted.
    if before == after {
        return MergeResult::unchanged(target);
    }
    if target == before || target == after {
        return MergeResult::unchanged(after);
    }

    let base = split_lines(before);
    let ours = split_lines(target);
    let theirs = split_lines(after);

    let to_target = alignment(&base, &ours);
    let to_delta = alignment(&base, &theirs);

    let mut out = Emitter::new(options);
    let (mut o, mut t, mut d) = (0usize, 0usize, 0usize);

    while o < base.len() || t < ours.len() || d < theirs.len() {
        let mut run = 0;
        while o + run < base.len()
            && to_target[o + run] == Some(t + run)
            && to_delta[o + run] == Some(d + run)
        {
            run += 1;
        }
        if run > 0 {
            out.lines(&base[o..o + run]);
            o += run;
            t += run;
            d += run;
            continue;
        }

        // Next `before` line anchored on both sides closes the unstable region.
        let (o_end, t_end, d_end) = (o..base.len())
            .find_map(|i| Some((i, to_target[i]?, to_delta[i]?)))
            .unwrap_or((base.len(), ours.len(), theirs.len()));

        let region = Unstable {
            before_start: o,
            before: &base[o..o_end],
            target: &ours[t..t_end],
            delta: &theirs[d..d_end],
        };
        out.unstable(&region);

        o = o_end;
        t = t_end;
        d = d_end;
    }

    out.finish()
}

/// Split text into lines, keeping each `\n` terminator.
#[must_use]
pub fn split_lines(text: &str) -> Vec<&str> {
    text.split_inclusive('\n').collect()
}

/// Returns `true` if `text` contains a line starting with a full conflict
/// marker run (`<<<<<<<`, `=======` or `>>>>>>>`).
#[must_use]
pub fn contains_conflict_markers(text: &str) -> bool {
    text.lines().any(|line| {
        ['<', '=', '>'].iter().any(|&c| {
            line.len() >= MARKER_WIDTH && line.chars().take(MARKER_WIDTH).all(|x| x == c)
        })
    })
}

// ---------------------------------------------------------------------------
// Internals
// ---------------------------------------------------------------------------

/// For every `base` line, the index of its matched line in `side`.
fn alignment(base: &[&str], side: &[&str]) -> Vec<Option<usize>> {
    let mut matched = vec![None; base.len()];
    for op in capture_diff_slices(Algorithm::Myers, base, side) {
        if let DiffOp::Equal {
            old_index,
            new_index,
            len,
        } = op
        {
            for k in 0..len {
                matched[old_index + k] = Some(new_index + k);
            }
        }
    }
    matched
}

struct Unstable<'a> {
    before_start: usize,
    before: &'a [&'a str],
    target: &'a [&'a str],
    delta: &'a [&'a str],
}

struct Emitter<'o> {
    options: &'o MergeOptions,
    text: String,
    emitted: usize,
    hunks: Vec<ConflictHunk>,
}

impl<'o> Emitter<'o> {
    const fn new(options: &'o MergeOptions) -> Self {
        Self {
            options,
            text: String::new(),
            emitted: 0,
            hunks: Vec::new(),
        }
    }

    fn lines(&mut self, lines: &[&str]) {
        for line in lines {
            self.text.push_str(line);
        }
        self.emitted += lines.len();
    }

    fn unstable(&mut self, region: &Unstable<'_>) {
        if region.target == region.before {
            self.lines(region.delta);
        } else if region.delta == region.before || region.target == region.delta {
            self.lines(region.target);
        } else {
            self.conflict(region);
        }
    }

    fn conflict(&mut self, region: &Unstable<'_>) {
        self.hunks.push(ConflictHunk {
            before_start: region.before_start + 1,
            before_len: region.before.len(),
            target_len: region.target.len(),
            delta_len: region.delta.len(),
            output_line: self.emitted + 1,
        });

        let labels = &self.options.labels;
        self.marker('<', &labels.target);
        self.side(region.target);
        if self.options.style == ConflictStyle::Diff3 {
            self.marker('|', &labels.before);
            self.side(region.before);
        }
        self.marker('=', "");
        self.side(region.delta);
        self.marker('>', &labels.delta);
    }

    fn marker(&mut self, c: char, label: &str) {
        self.text.extend(std::iter::repeat_n(c, MARKER_WIDTH));
        if !label.is_empty() {
            self.text.push(' ');
            self.text.push_str(label);
        }
        self.text.push('\n');
        self.emitted += 1;
    }

    /// Inside a block every line is terminated so markers start a line.
    fn side(&mut self, lines: &[&str]) {
        for line in lines {
            self.text.push_str(line);
            if !line.ends_with('\n') {
                self.text.push('\n');
            }
        }
        self.emitted += lines.len();
    }

    fn finish(self) -> MergeResult {
        MergeResult {
            text: self.text,
            hunks: self.hunks,
        }
    }
}
