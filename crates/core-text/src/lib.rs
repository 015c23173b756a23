//! Line-indexed text buffer collaborator.
//!
//! The display and highlighting pipeline consumes a deliberately thin buffer
//! surface: indexed line access, byte coordinates with codepoint navigation, a
//! monotonic edit timestamp, elementary change records folded into
//! [`LineModification`]s on demand, and a heterogeneous value map where
//! long-lived components park per-buffer caches.
//!
//! Storage is a plain vector of newline-terminated `String` lines. Every line,
//! including the last, ends with `'\n'`; the empty buffer is a single `"\n"`
//! line. This keeps byte coordinates trivially addressable and lets a
//! coordinate point *at* the newline (several highlighters replace it with a
//! visible glyph).
//!
//! Invariants:
//! * `lines` is never empty and every element ends with `'\n'`.
//! * `timestamp` starts at 1 and increments on every mutation, so a zeroed
//!   cache timestamp always reads as cold.
//! * `changes` is append-only and sorted by timestamp.

use std::cell::{RefCell, RefMut};

mod units;
pub use units::{ByteCount, CharCount, LineCount};

mod values;
pub use values::{ValueId, ValueMap};

pub mod intern;
pub mod line_modification;
pub mod word_db;

pub use line_modification::{compute_line_modifications, LineModification};

/// A position inside a buffer: `(line, column)` with `column` counting bytes.
/// Ordering is lexicographic (derived field order).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct BufferCoord {
    pub line: LineCount,
    pub column: ByteCount,
}

impl BufferCoord {
    pub const fn new(line: LineCount, column: ByteCount) -> BufferCoord {
        BufferCoord { line, column }
    }

    /// Sentinel greater than every real coordinate.
    pub const MAX: BufferCoord = BufferCoord::new(LineCount::MAX, ByteCount::MAX);
    /// Sentinel smaller than every real coordinate.
    pub const MIN: BufferCoord = BufferCoord::new(LineCount::MIN, ByteCount::MIN);
}

/// Convenience constructor; coordinates appear in nearly every signature of
/// the display pipeline.
#[inline]
pub const fn coord(line: i64, column: i64) -> BufferCoord {
    BufferCoord::new(LineCount(line), ByteCount(column))
}

/// Elementary change record: the affected base line plus how many following
/// lines the mutation removed / added, in the coordinate space current at the
/// time of the mutation. The base line itself counts as modified.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Change {
    pub timestamp: u64,
    pub line: LineCount,
    pub num_removed: LineCount,
    pub num_added: LineCount,
}

pub struct Buffer {
    name: String,
    lines: Vec<String>,
    timestamp: u64,
    changes: Vec<Change>,
    values: RefCell<ValueMap>,
}

impl std::fmt::Debug for Buffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Buffer")
            .field("name", &self.name)
            .field("lines", &self.lines)
            .field("timestamp", &self.timestamp)
            .field("changes", &self.changes)
            .finish()
    }
}

impl Buffer {
    /// Construct a buffer from an in-memory string slice. Content is split
    /// into newline-terminated lines; a missing final newline is supplied.
    pub fn from_str(name: impl Into<String>, content: &str) -> Buffer {
        let mut lines: Vec<String> = content.split_inclusive('\n').map(String::from).collect();
        if lines.is_empty() {
            lines.push("\n".into());
        } else if let Some(last) = lines.last_mut() {
            if !last.ends_with('\n') {
                last.push('\n');
            }
        }
        Buffer {
            name: name.into(),
            lines,
            timestamp: 1,
            changes: Vec::new(),
            values: RefCell::new(ValueMap::default()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Monotonic edit counter; increments on every mutation.
    pub fn timestamp(&self) -> u64 {
        self.timestamp
    }

    pub fn line_count(&self) -> LineCount {
        LineCount(self.lines.len() as i64)
    }

    /// The requested line, including its trailing newline.
    pub fn line(&self, line: LineCount) -> &str {
        &self.lines[line.as_usize()]
    }

    /// Byte length of a line, newline included.
    pub fn line_len(&self, line: LineCount) -> ByteCount {
        ByteCount(self.lines[line.as_usize()].len() as i64)
    }

    /// One past the final newline: `(last_line, line_len(last_line))`.
    pub fn end_coord(&self) -> BufferCoord {
        let last = self.line_count() - 1;
        BufferCoord::new(last, self.line_len(last))
    }

    pub fn is_valid(&self, pos: BufferCoord) -> bool {
        pos.line >= 0
            && pos.line < self.line_count()
            && pos.column >= 0
            && pos.column <= self.line_len(pos.line)
    }

    pub fn byte_at(&self, pos: BufferCoord) -> u8 {
        self.line(pos.line).as_bytes()[pos.column.as_usize()]
    }

    /// Coordinate of the codepoint following `pos`, clamped to `end_coord`.
    pub fn char_next(&self, pos: BufferCoord) -> BufferCoord {
        self.advance_chars(pos, CharCount(1))
    }

    /// Advance `count` codepoints from `pos`, stepping over line boundaries
    /// and clamping at `end_coord`.
    pub fn advance_chars(&self, mut pos: BufferCoord, count: CharCount) -> BufferCoord {
        let mut n = count.0;
        while n > 0 {
            if pos.line >= self.line_count() {
                return self.end_coord();
            }
            let line = self.line(pos.line);
            let col = pos.column.as_usize();
            let Some(ch) = line[col..].chars().next() else {
                // column == len, only reachable on the last line
                return self.end_coord();
            };
            n -= 1;
            let next = col + ch.len_utf8();
            pos = if next >= line.len() {
                if pos.line + 1 >= self.line_count() {
                    return self.end_coord();
                }
                BufferCoord::new(pos.line + 1, ByteCount(0))
            } else {
                BufferCoord::new(pos.line, ByteCount(next as i64))
            };
        }
        pos
    }

    /// Number of codepoints in `[begin, end)`.
    pub fn distance(&self, begin: BufferCoord, end: BufferCoord) -> CharCount {
        debug_assert!(begin <= end, "reversed range");
        let mut count = 0i64;
        let mut line = begin.line;
        while line <= end.line && line < self.line_count() {
            let content = self.line(line);
            let from = if line == begin.line {
                begin.column.as_usize()
            } else {
                0
            };
            let to = if line == end.line {
                end.column.as_usize().min(content.len())
            } else {
                content.len()
            };
            count += content[from..to].chars().count() as i64;
            line += 1;
        }
        CharCount(count)
    }

    /// Per-buffer heterogeneous value map; see [`ValueId`].
    pub fn values(&self) -> RefMut<'_, ValueMap> {
        self.values.borrow_mut()
    }

    pub(crate) fn changes_since(&self, since: u64) -> &[Change] {
        let first = self.changes.partition_point(|c| c.timestamp <= since);
        &self.changes[first..]
    }

    fn record(&mut self, line: LineCount, num_removed: LineCount, num_added: LineCount) {
        self.timestamp += 1;
        self.changes.push(Change {
            timestamp: self.timestamp,
            line,
            num_removed,
            num_added,
        });
    }

    /// Insert `text` at `pos`. Text may span lines; the buffer re-establishes
    /// newline termination afterwards.
    pub fn insert(&mut self, pos: BufferCoord, text: &str) {
        debug_assert!(self.is_valid(pos), "insert out of bounds");
        let li = pos.line.as_usize();
        let col = pos.column.as_usize();
        let line = &self.lines[li];
        let combined = format!("{}{}{}", &line[..col], text, &line[col..]);
        let mut pieces: Vec<String> = combined.split_inclusive('\n').map(String::from).collect();
        if pieces.is_empty() {
            pieces.push("\n".into());
        } else if let Some(last) = pieces.last_mut() {
            if !last.ends_with('\n') {
                last.push('\n');
            }
        }
        let num_added = LineCount(pieces.len() as i64 - 1);
        self.lines.splice(li..=li, pieces);
        self.record(pos.line, LineCount(0), num_added);
    }

    /// Erase the byte range `[begin, end)`. A range reaching `(line + 1, 0)`
    /// swallows the newline and joins lines.
    pub fn erase(&mut self, begin: BufferCoord, end: BufferCoord) {
        debug_assert!(begin <= end, "reversed erase range");
        debug_assert!(self.is_valid(begin), "erase out of bounds");
        let bl = begin.line.as_usize();
        let bcol = begin.column.as_usize();
        let ecol = end.column.as_usize();

        if begin.line == end.line && ecol < self.lines[bl].len() {
            self.lines[bl].replace_range(bcol..ecol, "");
            self.record(begin.line, LineCount(0), LineCount(0));
            return;
        }

        // spans into end.line, or swallows this line's newline
        let last = self.line_count() - 1;
        let (end_line, tail) = if begin.line == end.line {
            (begin.line + 1, String::new())
        } else if end.line > last {
            (self.line_count(), String::new())
        } else {
            (end.line, self.lines[end.line.as_usize()][ecol..].to_string())
        };
        let mut merged = format!("{}{}", &self.lines[bl][..bcol], tail);
        if !merged.ends_with('\n') {
            merged.push('\n');
        }
        let splice_end = (end_line.as_usize()).min(self.lines.len() - 1);
        self.lines.splice(bl..=splice_end, [merged]);
        self.record(begin.line, end_line - begin.line, LineCount(0));
    }

    /// Replace the content of a single line (no embedded newlines).
    pub fn replace_line(&mut self, line: LineCount, text: &str) {
        debug_assert!(!text.contains('\n'), "replace_line takes a single line");
        self.lines[line.as_usize()] = format!("{text}\n");
        self.record(line, LineCount(0), LineCount(0));
    }
}

/// Character column of `pos` with tabs expanded to the next `tabstop`
/// boundary; non-tab codepoints count one column each.
pub fn column_with_tabs(buffer: &Buffer, tabstop: i64, pos: BufferCoord) -> CharCount {
    let line = buffer.line(pos.line);
    let mut column = 0i64;
    for ch in line[..pos.column.as_usize()].chars() {
        if ch == '\t' {
            column = (column / tabstop + 1) * tabstop;
        } else {
            column += 1;
        }
    }
    CharCount(column)
}
