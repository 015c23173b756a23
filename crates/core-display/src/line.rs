//! Display lines and the display buffer.
//!
//! A display line is an ordered atom sequence with a cached coordinate range
//! over its buffer-backed atoms; a display buffer is the per-redraw sequence
//! of display lines handed to highlighters and then to the renderer.
//!
//! Structural operations recompute the cached range before returning, so the
//! range is always current when read. Operations that split atoms return the
//! index of the first resulting atom; indices held across a structural
//! operation are invalid and must be replaced by the returned one.
//!
//! Invariant: within a line, buffer ranges of atoms are non-overlapping and
//! monotonically increasing.

use core_text::{Buffer, BufferCoord, ByteCount, CharCount, LineCount};

use crate::atom::{AtomKind, DisplayAtom};

/// Smallest / largest coordinate pair covering a set of atoms.
pub type CoordRange = (BufferCoord, BufferCoord);

/// Range of a line (or buffer) containing no buffer-backed atom: every real
/// coordinate compares inside-out against it.
pub const EMPTY_RANGE: CoordRange = (BufferCoord::MAX, BufferCoord::MIN);

#[derive(Debug, Clone)]
pub struct DisplayLine<'a> {
    atoms: Vec<DisplayAtom<'a>>,
    range: CoordRange,
}

impl Default for DisplayLine<'_> {
    fn default() -> Self {
        DisplayLine {
            atoms: Vec::new(),
            range: EMPTY_RANGE,
        }
    }
}

impl<'a> DisplayLine<'a> {
    pub fn new() -> DisplayLine<'a> {
        DisplayLine::default()
    }

    pub fn from_atoms(atoms: Vec<DisplayAtom<'a>>) -> DisplayLine<'a> {
        let mut line = DisplayLine {
            atoms,
            range: EMPTY_RANGE,
        };
        line.compute_range();
        line
    }

    pub fn atoms(&self) -> &[DisplayAtom<'a>] {
        &self.atoms
    }

    /// Mutable access for face edits and replacements; structural changes go
    /// through [`split`](Self::split) / [`insert`](Self::insert) /
    /// [`erase`](Self::erase) so the cached range stays correct.
    pub fn atoms_mut(&mut self) -> &mut [DisplayAtom<'a>] {
        &mut self.atoms
    }

    pub fn into_atoms(self) -> Vec<DisplayAtom<'a>> {
        self.atoms
    }

    /// Visual length in codepoints.
    pub fn length(&self) -> CharCount {
        self.atoms
            .iter()
            .fold(CharCount(0), |acc, atom| acc + atom.len())
    }

    /// Cached range over buffer-backed atoms; [`EMPTY_RANGE`] when none.
    pub fn range(&self) -> CoordRange {
        self.range
    }

    /// Split the atom at `idx` at coordinate `pos` (strictly inside it).
    /// Returns the index of the first of the two resulting atoms; prior
    /// indices are invalidated.
    pub fn split(&mut self, idx: usize, pos: BufferCoord) -> usize {
        let right = self.atoms[idx].split_off(pos);
        self.atoms.insert(idx + 1, right);
        self.compute_range();
        idx
    }

    /// Insert before `idx`; returns the inserted atom's index.
    pub fn insert(&mut self, idx: usize, atom: DisplayAtom<'a>) -> usize {
        self.atoms.insert(idx, atom);
        self.compute_range();
        idx
    }

    /// Remove atoms in `range`; returns the index where following atoms now
    /// sit.
    pub fn erase(&mut self, range: std::ops::Range<usize>) -> usize {
        let start = range.start;
        self.atoms.drain(range);
        self.compute_range();
        start
    }

    /// Remove and return atoms in `range`.
    pub fn drain_atoms(&mut self, range: std::ops::Range<usize>) -> Vec<DisplayAtom<'a>> {
        let drained = self.atoms.drain(range).collect();
        self.compute_range();
        drained
    }

    pub fn push_back(&mut self, atom: DisplayAtom<'a>) {
        self.atoms.push(atom);
        self.compute_range();
    }

    /// Keep only the character window `[first_char, first_char + char_count)`,
    /// splitting boundary atoms by character distance.
    pub fn trim(&mut self, first_char: CharCount, char_count: CharCount) {
        let mut remaining = first_char;
        while remaining > 0 && !self.atoms.is_empty() {
            let len = self.atoms[0].len();
            if len <= remaining {
                remaining -= len;
                self.atoms.remove(0);
            } else {
                self.atoms[0].trim_begin(remaining);
                break;
            }
        }
        let mut kept = CharCount(0);
        let mut idx = 0;
        while idx < self.atoms.len() {
            let len = self.atoms[idx].len();
            if kept + len > char_count {
                let keep = char_count - kept;
                if keep > 0 {
                    self.atoms[idx].trim_end(len - keep);
                    idx += 1;
                }
                self.atoms.truncate(idx);
                break;
            }
            kept += len;
            idx += 1;
        }
        self.compute_range();
    }

    /// Merge adjacent plain buffer ranges with equal faces and contiguous
    /// coordinates. Distinct variants never merge, and a merge never produces
    /// an atom violating the line/newline shape invariant.
    pub fn optimize(&mut self) {
        let mut idx = 0;
        while idx + 1 < self.atoms.len() {
            let mergeable = {
                let (a, b) = (&self.atoms[idx], &self.atoms[idx + 1]);
                a.kind() == AtomKind::BufferRange
                    && b.kind() == AtomKind::BufferRange
                    && a.face == b.face
                    && a.end() == b.begin()
                    && (a.begin().line == b.end().line
                        || (a.begin().line + 1 == b.end().line && b.end().column == ByteCount(0)))
            };
            if mergeable {
                let end = self.atoms[idx + 1].end();
                self.atoms[idx].set_end(end);
                self.atoms.remove(idx + 1);
            } else {
                idx += 1;
            }
        }
    }

    fn compute_range(&mut self) {
        self.range = EMPTY_RANGE;
        for atom in &self.atoms {
            if !atom.has_buffer_range() {
                continue;
            }
            self.range.0 = std::cmp::min(self.range.0, atom.begin());
            self.range.1 = std::cmp::max(self.range.1, atom.end());
        }
    }
}

#[derive(Debug)]
pub struct DisplayBuffer<'a> {
    lines: Vec<DisplayLine<'a>>,
    range: CoordRange,
}

impl Default for DisplayBuffer<'_> {
    fn default() -> Self {
        DisplayBuffer {
            lines: Vec::new(),
            range: EMPTY_RANGE,
        }
    }
}

impl<'a> DisplayBuffer<'a> {
    pub fn new() -> DisplayBuffer<'a> {
        DisplayBuffer::default()
    }

    /// Seed a display buffer for the viewport `[first, first + count)`: one
    /// spanning atom per existing buffer line, an empty display line for each
    /// requested line past the end of the buffer.
    pub fn for_viewport(buffer: &'a Buffer, first: LineCount, count: LineCount) -> DisplayBuffer<'a> {
        let mut display = DisplayBuffer::new();
        let mut line = first;
        while line < first + count {
            if line >= LineCount(0) && line < buffer.line_count() {
                let begin = BufferCoord::new(line, ByteCount(0));
                let end = BufferCoord::new(line + 1, ByteCount(0));
                display
                    .lines
                    .push(DisplayLine::from_atoms(vec![DisplayAtom::from_range(
                        buffer, begin, end,
                    )]));
            } else {
                display.lines.push(DisplayLine::new());
            }
            line += 1;
        }
        display.compute_range();
        display
    }

    pub fn lines(&self) -> &[DisplayLine<'a>] {
        &self.lines
    }

    /// Mutable line list. Callers that add or remove lines must call
    /// [`compute_range`](Self::compute_range) afterwards.
    pub fn lines_mut(&mut self) -> &mut Vec<DisplayLine<'a>> {
        &mut self.lines
    }

    pub fn into_lines(self) -> Vec<DisplayLine<'a>> {
        self.lines
    }

    /// Smallest coordinate range containing every buffer-backed atom.
    pub fn range(&self) -> CoordRange {
        self.range
    }

    pub fn compute_range(&mut self) {
        self.range = EMPTY_RANGE;
        for line in &self.lines {
            let r = line.range();
            if r == EMPTY_RANGE {
                continue;
            }
            self.range.0 = std::cmp::min(self.range.0, r.0);
            self.range.1 = std::cmp::max(self.range.1, r.1);
        }
    }

    pub fn optimize(&mut self) {
        for line in &mut self.lines {
            line.optimize();
        }
    }
}
