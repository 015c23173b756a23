//! Per-buffer caches and incrementally maintained regex match lists.
//!
//! A [`BufferSideCache`] gives a long-lived highlighter private state on any
//! buffer it is applied to: the highlighter owns a process-unique slot id,
//! the buffer owns the state. Cached state always carries the buffer
//! timestamp it was computed at; mutators compare it against the current
//! timestamp to choose between a full rebuild and an incremental update from
//! line-modification deltas.
//!
//! Match lists are kept sorted by `(line, begin)`. The incremental update
//! drops matches on modified or removed lines, shifts the rest by the
//! cumulative line diff, rescans only the modified and added lines, and
//! merges the two sorted partitions, so cost tracks the edit rather than the
//! buffer.

use std::marker::PhantomData;

use regex::Regex;

use core_text::{Buffer, BufferCoord, ByteCount, LineCount, LineModification, ValueId};

/// Handle to per-buffer state of type `T`, attached on first access and
/// dropped with the buffer. The holder keeps only the slot id.
pub struct BufferSideCache<T> {
    id: ValueId,
    _marker: PhantomData<T>,
}

impl<T: Default + 'static> BufferSideCache<T> {
    pub fn new() -> BufferSideCache<T> {
        BufferSideCache {
            id: ValueId::next(),
            _marker: PhantomData,
        }
    }

    /// Run `f` with this highlighter's cache slot on `buffer`. The buffer's
    /// value map stays borrowed for the duration of `f`, so `f` must not
    /// reach other highlighters' slots (in particular: update the cache and
    /// extract what the dispatch step needs, then dispatch after returning).
    pub fn with<R>(&self, buffer: &Buffer, f: impl FnOnce(&mut T) -> R) -> R {
        let mut values = buffer.values();
        let slot = values
            .entry(self.id)
            .or_insert_with(|| Box::new(T::default()));
        let cache = slot
            .downcast_mut::<T>()
            .expect("buffer-side cache slot holds a foreign type");
        f(cache)
    }
}

impl<T: Default + 'static> Default for BufferSideCache<T> {
    fn default() -> Self {
        BufferSideCache::new()
    }
}

/// A single whole-pattern match on one line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegexMatch {
    pub timestamp: u64,
    pub line: LineCount,
    pub begin: ByteCount,
    pub end: ByteCount,
}

impl RegexMatch {
    pub fn begin_coord(&self) -> BufferCoord {
        BufferCoord::new(self.line, self.begin)
    }

    pub fn end_coord(&self) -> BufferCoord {
        BufferCoord::new(self.line, self.end)
    }
}

pub type RegexMatchList = Vec<RegexMatch>;

fn scan_line(
    buffer: &Buffer,
    timestamp: u64,
    line: LineCount,
    regex: &Regex,
    out: &mut RegexMatchList,
) {
    for m in regex.find_iter(buffer.line(line)) {
        out.push(RegexMatch {
            timestamp,
            line,
            begin: ByteCount(m.start() as i64),
            end: ByteCount(m.end() as i64),
        });
    }
}

/// Scan the whole buffer, line by line.
pub fn find_matches(buffer: &Buffer, regex: &Regex) -> RegexMatchList {
    let timestamp = buffer.timestamp();
    let mut matches = RegexMatchList::new();
    let mut line = LineCount(0);
    while line < buffer.line_count() {
        scan_line(buffer, timestamp, line, regex, &mut matches);
        line += 1;
    }
    matches
}

/// Bring a sorted match list up to date after the buffer moved from the
/// matches' timestamp to the current one, given the line modifications
/// between the two. Equivalent to a full rescan, at incremental cost.
pub fn update_matches(
    buffer: &Buffer,
    modifs: &[LineModification],
    matches: &mut RegexMatchList,
    regex: &Regex,
) {
    let timestamp = buffer.timestamp();

    // drop matches on touched or removed lines, shift the rest
    let mut kept = 0usize;
    for i in 0..matches.len() {
        let mut m = matches[i];
        let idx = modifs.partition_point(|modif| modif.old_line < m.line);
        let mut erase = idx < modifs.len() && modifs[idx].old_line == m.line;
        if !erase && idx > 0 {
            let prev = &modifs[idx - 1];
            erase = m.line <= prev.old_line + prev.num_removed;
            m.line += prev.diff();
        }
        erase = erase || m.line >= buffer.line_count();
        if !erase {
            m.timestamp = timestamp;
            matches[kept] = m;
            kept += 1;
        }
    }
    matches.truncate(kept);
    let pivot = matches.len();

    // fresh matches from the modified lines and the lines added after them
    for modif in modifs {
        let mut line = modif.new_line;
        while line <= modif.new_line + modif.num_added && line < buffer.line_count() {
            scan_line(buffer, timestamp, line, regex, matches);
            line += 1;
        }
    }

    if pivot < matches.len() && !matches[..pivot].is_empty() {
        let tail = matches.split_off(pivot);
        let head = std::mem::take(matches);
        *matches = merge_by_coord(head, tail);
    }
}

fn merge_by_coord(a: RegexMatchList, b: RegexMatchList) -> RegexMatchList {
    let mut out = RegexMatchList::with_capacity(a.len() + b.len());
    let mut a = a.into_iter();
    let mut b = b.into_iter();
    let mut next_a = a.next();
    let mut next_b = b.next();
    loop {
        match (next_a, next_b) {
            (Some(x), Some(y)) => {
                if x.begin_coord() <= y.begin_coord() {
                    out.push(x);
                    next_a = a.next();
                    next_b = Some(y);
                } else {
                    out.push(y);
                    next_a = Some(x);
                    next_b = b.next();
                }
            }
            (Some(x), None) => {
                out.push(x);
                out.extend(a);
                return out;
            }
            (None, Some(y)) => {
                out.push(y);
                out.extend(b);
                return out;
            }
            (None, None) => return out,
        }
    }
}
