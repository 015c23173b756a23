//! Folding elementary buffer changes into per-line modification deltas.
//!
//! Consumers that maintain incremental per-line state (match caches, the word
//! database) ask the buffer what happened between two timestamps and get back
//! a sorted, disjoint list of [`LineModification`]s: `old_line` addresses the
//! snapshot at the earlier timestamp, `new_line` the current buffer. The fold
//! has to compose changes that land on top of each other: an insert inside an
//! earlier insertion widens it, and an erase can swallow previously added
//! lines entirely (added-then-removed lines cancel out instead of being
//! reported as removals).
//!
//! Invariants on the returned list:
//! * sorted by `old_line` and by `new_line`, windows disjoint
//!   (`next.new_line > prev.new_line + prev.num_added`);
//! * `new_line - old_line` equals the cumulative `diff()` of prior entries.

use crate::{Buffer, LineCount};

/// One contiguous modified region. The line at `old_line` / `new_line` itself
/// counts as modified; `num_removed` and `num_added` count lines removed or
/// added *after* it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineModification {
    /// Line position in the buffer at the earlier timestamp.
    pub old_line: LineCount,
    /// Line position in the current buffer.
    pub new_line: LineCount,
    /// Lines removed after `old_line`.
    pub num_removed: LineCount,
    /// Lines added after `new_line`.
    pub num_added: LineCount,
}

impl LineModification {
    /// Cumulative line shift for content following this modification:
    /// `old + diff() == new` for any untouched line after the window.
    pub fn diff(&self) -> LineCount {
        self.new_line - self.old_line + self.num_added - self.num_removed
    }
}

/// Fold all elementary changes recorded after `since` into a modification
/// list. Returns an empty list when the buffer has not changed.
pub fn compute_line_modifications(buffer: &Buffer, since: u64) -> Vec<LineModification> {
    let mut res: Vec<LineModification> = Vec::new();
    for change in buffer.changes_since(since) {
        fold_change(&mut res, change.line, change.num_removed, change.num_added);
    }
    res
}

/// Compose one elementary change (expressed in the coordinate space current
/// *before* it) onto the accumulated modification list.
fn fold_change(
    res: &mut Vec<LineModification>,
    line: LineCount,
    removed: LineCount,
    added: LineCount,
) {
    // Window of lines the change touches, pre-change coordinates. The base
    // line is touched; lines (line, line + removed] are removed.
    let win_end = line + removed;

    let first = res.partition_point(|m| m.new_line + m.num_added < line);
    let mut last = first;
    while last < res.len() && res[last].new_line <= win_end {
        last += 1;
    }

    let diff_before = if first == 0 {
        LineCount(0)
    } else {
        res[first - 1].diff()
    };

    let merged = if first == last {
        LineModification {
            old_line: line - diff_before,
            new_line: line,
            num_removed: removed,
            num_added: added,
        }
    } else {
        let intersecting = &res[first..last];
        let head = intersecting[0];
        let (old_line, new_line) = if line < head.new_line {
            (line - diff_before, line)
        } else {
            (head.old_line, head.new_line)
        };
        // Removed lines that were added by an earlier modification never
        // existed in the old snapshot; they cancel against num_added rather
        // than growing num_removed.
        let mut removed_added = LineCount(0);
        let mut sum_removed = LineCount(0);
        let mut sum_added = LineCount(0);
        for m in intersecting {
            sum_removed += m.num_removed;
            sum_added += m.num_added;
            let lo = std::cmp::max(m.new_line, line);
            let hi = std::cmp::min(m.new_line + m.num_added, win_end);
            if hi > lo {
                removed_added += hi - lo;
            }
        }
        LineModification {
            old_line,
            new_line,
            num_removed: sum_removed + (removed - removed_added),
            num_added: sum_added - removed_added + added,
        }
    };

    let shift = added - removed;
    for m in &mut res[last..] {
        m.new_line += shift;
    }
    res.splice(first..last, [merged]);
}
