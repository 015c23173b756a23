//! Display atoms: the smallest styled unit the renderer consumes.
//!
//! An atom is either a live reference into the buffer (`BufferRange`), a
//! buffer range whose visual content was substituted (`ReplacedBufferRange`,
//! e.g. a tab expanded to spaces), or free-standing text with no buffer
//! coordinates (`Text`, e.g. a line-number column).
//!
//! Buffer-range atoms obey a shape invariant so content can always be served
//! from a single stored line: the range covers part of one line, or runs from
//! inside a line up to the start of the next (that is, through the newline).

use core_text::{Buffer, BufferCoord, ByteCount, CharCount};

use crate::face::Face;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AtomKind {
    BufferRange,
    ReplacedBufferRange,
    Text,
}

#[derive(Debug, Clone)]
pub struct DisplayAtom<'a> {
    kind: AtomKind,
    buffer: Option<&'a Buffer>,
    begin: BufferCoord,
    end: BufferCoord,
    text: String,
    pub face: Face,
}

impl<'a> DisplayAtom<'a> {
    pub fn from_range(buffer: &'a Buffer, begin: BufferCoord, end: BufferCoord) -> DisplayAtom<'a> {
        let atom = DisplayAtom {
            kind: AtomKind::BufferRange,
            buffer: Some(buffer),
            begin,
            end,
            text: String::new(),
            face: Face::default(),
        };
        atom.check_invariant();
        atom
    }

    pub fn from_text(text: impl Into<String>, face: Face) -> DisplayAtom<'a> {
        DisplayAtom {
            kind: AtomKind::Text,
            buffer: None,
            begin: BufferCoord::default(),
            end: BufferCoord::default(),
            text: text.into(),
            face,
        }
    }

    pub fn kind(&self) -> AtomKind {
        self.kind
    }

    pub fn has_buffer_range(&self) -> bool {
        matches!(self.kind, AtomKind::BufferRange | AtomKind::ReplacedBufferRange)
    }

    pub fn begin(&self) -> BufferCoord {
        debug_assert!(self.has_buffer_range(), "text atom has no coordinates");
        self.begin
    }

    pub fn end(&self) -> BufferCoord {
        debug_assert!(self.has_buffer_range(), "text atom has no coordinates");
        self.end
    }

    /// Resolved visual content. For a `BufferRange` this reads through to the
    /// buffer; replaced and text atoms own their string.
    pub fn content(&self) -> &str {
        match self.kind {
            AtomKind::BufferRange => {
                let buffer = self.buffer.expect("buffer-range atom without buffer");
                let line = buffer.line(self.begin.line);
                let from = self.begin.column.as_usize();
                if self.begin.line == self.end.line {
                    &line[from..self.end.column.as_usize()]
                } else {
                    &line[from..]
                }
            }
            AtomKind::ReplacedBufferRange | AtomKind::Text => &self.text,
        }
    }

    /// Visual length in codepoints. A replacement counts its own characters,
    /// not the characters of the range it covers.
    pub fn len(&self) -> CharCount {
        match self.kind {
            AtomKind::BufferRange => {
                let buffer = self.buffer.expect("buffer-range atom without buffer");
                buffer.distance(self.begin, self.end)
            }
            AtomKind::ReplacedBufferRange | AtomKind::Text => {
                CharCount(self.text.chars().count() as i64)
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == CharCount(0)
    }

    /// Substitute the visual content of a buffer range, keeping its
    /// coordinates.
    pub fn replace(&mut self, text: impl Into<String>) {
        debug_assert!(
            self.kind == AtomKind::BufferRange,
            "only a plain buffer range can be replaced"
        );
        self.kind = AtomKind::ReplacedBufferRange;
        self.text = text.into();
    }

    /// Split off the tail at `pos`, which must lie strictly inside a plain
    /// buffer range; `self` keeps `[begin, pos)` and the returned atom covers
    /// `[pos, end)` with the same face.
    pub(crate) fn split_off(&mut self, pos: BufferCoord) -> DisplayAtom<'a> {
        debug_assert!(self.kind == AtomKind::BufferRange, "cannot split a replacement");
        debug_assert!(
            self.begin < pos && pos < self.end,
            "split point must be strictly inside the atom"
        );
        let right = DisplayAtom {
            kind: AtomKind::BufferRange,
            buffer: self.buffer,
            begin: pos,
            end: self.end,
            text: String::new(),
            face: self.face,
        };
        self.end = pos;
        self.check_invariant();
        right.check_invariant();
        right
    }

    pub(crate) fn set_end(&mut self, end: BufferCoord) {
        debug_assert!(self.kind == AtomKind::BufferRange);
        self.end = end;
        self.check_invariant();
    }

    /// Drop the first `count` characters.
    pub fn trim_begin(&mut self, count: CharCount) {
        match self.kind {
            AtomKind::BufferRange => {
                let buffer = self.buffer.expect("buffer-range atom without buffer");
                self.begin = std::cmp::min(buffer.advance_chars(self.begin, count), self.end);
                self.check_invariant();
            }
            AtomKind::ReplacedBufferRange | AtomKind::Text => {
                let cut = char_offset(&self.text, count);
                self.text.replace_range(..cut, "");
            }
        }
    }

    /// Drop the last `count` characters.
    pub fn trim_end(&mut self, count: CharCount) {
        match self.kind {
            AtomKind::BufferRange => {
                let buffer = self.buffer.expect("buffer-range atom without buffer");
                let keep = self.len() - count;
                self.end = std::cmp::min(buffer.advance_chars(self.begin, keep), self.end);
                self.check_invariant();
            }
            AtomKind::ReplacedBufferRange | AtomKind::Text => {
                let keep = CharCount(self.text.chars().count() as i64) - count;
                let cut = char_offset(&self.text, keep);
                self.text.truncate(cut);
            }
        }
    }

    pub fn check_invariant(&self) {
        if self.has_buffer_range() {
            debug_assert!(self.begin <= self.end, "reversed atom range");
            debug_assert!(
                self.begin.line == self.end.line
                    || (self.begin.line + 1 == self.end.line && self.end.column == ByteCount(0)),
                "atom may span at most through its line's newline"
            );
        }
    }
}

/// Byte offset of the `count`-th character of `s` (clamped).
fn char_offset(s: &str, count: CharCount) -> usize {
    if count <= 0 {
        return 0;
    }
    s.char_indices()
        .nth(count.as_usize())
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

/// Two atoms are equal when their faces and resolved contents match,
/// regardless of variant.
impl PartialEq for DisplayAtom<'_> {
    fn eq(&self, other: &DisplayAtom<'_>) -> bool {
        self.face == other.face && self.content() == other.content()
    }
}
