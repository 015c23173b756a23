//! Range application over a display buffer.
//!
//! [`highlight_range`] visits every atom overlapping a byte-coordinate range,
//! splitting boundary atoms so the transform applies exactly to the covered
//! span. [`apply_highlighter`] carves the covered atoms out into an auxiliary
//! display buffer, runs a nested highlighter over it, and splices the result
//! back, so a child highlighter never knows it ran on a sub-view.
//!
//! Both walk atoms by index; a split invalidates prior indices and the code
//! always adopts the returned one.

use core_display::{AtomKind, DisplayAtom, DisplayBuffer, DisplayLine, Face};
use core_text::BufferCoord;

use crate::{Context, HighlightFlags, Highlighter};

/// Transform overlaying `face` onto an atom; the usual payload for
/// [`highlight_range`].
pub fn apply_face(face: Face) -> impl FnMut(&mut DisplayAtom<'_>) + Copy {
    move |atom| atom.face.overlay(face)
}

/// Apply `func` to every atom covered by `[begin, end)`, splitting atoms that
/// straddle a boundary. Replaced atoms are skipped entirely when
/// `skip_replaced` is set, and are never split (their visual content has no
/// internal coordinate mapping); otherwise the transform sees them whole.
pub fn highlight_range<'a, F>(
    display: &mut DisplayBuffer<'a>,
    begin: BufferCoord,
    end: BufferCoord,
    skip_replaced: bool,
    mut func: F,
) where
    F: FnMut(&mut DisplayAtom<'a>),
{
    let range = display.range();
    if begin == end || end <= range.0 || begin >= range.1 {
        return;
    }

    for line in display.lines_mut().iter_mut() {
        let lrange = line.range();
        if lrange.1 <= begin || end < lrange.0 {
            continue;
        }

        let mut i = 0;
        while i < line.atoms().len() {
            let atom = &line.atoms()[i];
            let is_replaced = atom.kind() == AtomKind::ReplacedBufferRange;
            if !atom.has_buffer_range() || (skip_replaced && is_replaced) {
                i += 1;
                continue;
            }
            let (abegin, aend) = (atom.begin(), atom.end());
            if end <= abegin || begin >= aend {
                i += 1;
                continue;
            }

            if !is_replaced && begin > abegin {
                i = line.split(i, begin) + 1;
            }
            if !is_replaced && end < line.atoms()[i].end() {
                i = line.split(i, end);
                func(&mut line.atoms_mut()[i]);
                i += 1;
            } else {
                func(&mut line.atoms_mut()[i]);
            }
            i += 1;
        }
    }
}

/// Run `highlighter` over the sub-view of `display` covering `[begin, end)`.
///
/// Atoms overlapping the range are split at its boundaries and moved into an
/// auxiliary display buffer (replaced atoms move atomically when fully
/// covered, and stay behind otherwise). The per-line re-splice position is
/// recorded before the child runs, and the extracted atoms return to exactly
/// that spot afterwards.
pub fn apply_highlighter<'a>(
    ctx: &Context<'a>,
    flags: HighlightFlags,
    display: &mut DisplayBuffer<'a>,
    begin: BufferCoord,
    end: BufferCoord,
    highlighter: &dyn Highlighter,
) {
    let mut first_line = 0usize;
    let mut insert_idx: Vec<usize> = Vec::new();
    let mut region_display = DisplayBuffer::new();

    for (li, line) in display.lines_mut().iter_mut().enumerate() {
        let lrange = line.range();
        if lrange.1 <= begin || end <= lrange.0 {
            continue;
        }
        if region_display.lines().is_empty() {
            first_line = li;
        }

        if lrange.0 < begin || lrange.1 > end {
            let mut beg_idx = 0usize;
            let mut end_idx = line.atoms().len();

            let mut i = 0;
            while i < line.atoms().len() {
                let atom = &line.atoms()[i];
                if !atom.has_buffer_range() {
                    i += 1;
                    continue;
                }
                let (abegin, aend) = (atom.begin(), atom.end());
                if end <= abegin || begin >= aend {
                    i += 1;
                    continue;
                }
                let is_replaced = atom.kind() == AtomKind::ReplacedBufferRange;

                if abegin <= begin {
                    if is_replaced || abegin == begin {
                        beg_idx = i;
                    } else {
                        i = line.split(i, begin) + 1;
                        beg_idx = i;
                        end_idx += 1;
                    }
                }
                let cur_end = line.atoms()[i].end();
                if cur_end >= end {
                    if is_replaced || cur_end == end {
                        end_idx = i + 1;
                    } else {
                        i = line.split(i, end) + 1;
                        end_idx = i;
                    }
                }
                i += 1;
            }

            let moved = line.drain_atoms(beg_idx..end_idx);
            insert_idx.push(beg_idx);
            region_display
                .lines_mut()
                .push(DisplayLine::from_atoms(moved));
        } else {
            let taken = std::mem::take(line);
            insert_idx.push(0);
            region_display.lines_mut().push(taken);
        }
    }

    region_display.compute_range();
    highlighter.apply(ctx, flags, &mut region_display);

    for (k, region_line) in region_display.into_lines().into_iter().enumerate() {
        let line = &mut display.lines_mut()[first_line + k];
        let mut pos = insert_idx[k];
        for atom in region_line.into_atoms() {
            pos = line.insert(pos, atom) + 1;
        }
    }
    display.compute_range();
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_display::{Color, EMPTY_RANGE};
    use core_text::{coord, Buffer, LineCount};

    fn contents(display: &DisplayBuffer<'_>) -> Vec<Vec<String>> {
        display
            .lines()
            .iter()
            .map(|l| l.atoms().iter().map(|a| a.content().to_string()).collect())
            .collect()
    }

    fn assert_monotone(display: &DisplayBuffer<'_>) {
        for line in display.lines() {
            let ranged: Vec<_> = line
                .atoms()
                .iter()
                .filter(|a| a.has_buffer_range())
                .collect();
            for pair in ranged.windows(2) {
                assert!(pair[0].end() <= pair[1].begin(), "atom ranges overlap");
            }
        }
    }

    #[test]
    fn splits_exactly_around_the_range() {
        let buffer = Buffer::from_str("t", "abcdef\nghijkl\n");
        let mut display = DisplayBuffer::for_viewport(&buffer, LineCount(0), LineCount(2));
        let red = Face::new(Color::Red, Color::Default);
        highlight_range(&mut display, coord(0, 2), coord(1, 3), false, apply_face(red));

        assert_eq!(
            contents(&display),
            vec![vec!["ab", "cdef\n"], vec!["ghi", "jkl\n"]]
        );
        assert_monotone(&display);
        let line0 = &display.lines()[0];
        assert_eq!(line0.atoms()[0].face, Face::default());
        assert_eq!(line0.atoms()[1].face, red);
        let line1 = &display.lines()[1];
        assert_eq!(line1.atoms()[0].face, red);
        assert_eq!(line1.atoms()[1].face, Face::default());
    }

    #[test]
    fn empty_or_disjoint_ranges_are_noops() {
        let buffer = Buffer::from_str("t", "abc\n");
        let mut display = DisplayBuffer::for_viewport(&buffer, LineCount(0), LineCount(1));
        let red = Face::new(Color::Red, Color::Default);
        highlight_range(&mut display, coord(0, 1), coord(0, 1), false, apply_face(red));
        highlight_range(&mut display, coord(5, 0), coord(6, 0), false, apply_face(red));
        assert_eq!(contents(&display), vec![vec!["abc\n"]]);
        assert_eq!(display.lines()[0].atoms()[0].face, Face::default());
    }

    #[test]
    fn skip_replaced_leaves_substitutions_alone() {
        let buffer = Buffer::from_str("t", "ab\n");
        let mut display = DisplayBuffer::for_viewport(&buffer, LineCount(0), LineCount(1));
        {
            let line = &mut display.lines_mut()[0];
            line.split(0, coord(0, 1));
            line.atoms_mut()[0].replace("X");
        }
        let red = Face::new(Color::Red, Color::Default);
        highlight_range(&mut display, coord(0, 0), coord(1, 0), true, apply_face(red));
        let line = &display.lines()[0];
        assert_eq!(line.atoms()[0].face, Face::default());
        assert_eq!(line.atoms()[1].face, red);

        // without the flag the replacement is restyled whole
        highlight_range(&mut display, coord(0, 0), coord(0, 1), false, apply_face(red));
        assert_eq!(display.lines()[0].atoms()[0].face, red);
    }

    struct Recolor(Face);
    impl Highlighter for Recolor {
        fn apply<'a>(
            &self,
            _ctx: &Context<'a>,
            _flags: HighlightFlags,
            display: &mut DisplayBuffer<'a>,
        ) {
            let range = display.range();
            highlight_range(display, range.0, range.1, false, apply_face(self.0));
        }
    }

    struct Inert;
    impl Highlighter for Inert {
        fn apply<'a>(
            &self,
            _ctx: &Context<'a>,
            _flags: HighlightFlags,
            _display: &mut DisplayBuffer<'a>,
        ) {
        }
    }

    fn fixture() -> (crate::GlobalScope, crate::DefinedHighlighters, crate::SelectionList) {
        (
            crate::GlobalScope::new(),
            crate::DefinedHighlighters::default(),
            crate::SelectionList::default(),
        )
    }

    #[test]
    fn child_sees_only_the_subview() {
        let buffer = Buffer::from_str("t", "abcdef\nghijkl\n");
        let (scope, defined, sels) = fixture();
        let ctx = Context::new(&buffer, &sels, &scope, &defined);

        let mut display = DisplayBuffer::for_viewport(&buffer, LineCount(0), LineCount(2));
        let red = Face::new(Color::Red, Color::Default);
        apply_highlighter(
            &ctx,
            HighlightFlags::Highlight,
            &mut display,
            coord(0, 2),
            coord(1, 3),
            &Recolor(red),
        );

        assert_eq!(
            contents(&display),
            vec![vec!["ab", "cdef\n"], vec!["ghi", "jkl\n"]]
        );
        assert_monotone(&display);
        assert_eq!(display.lines()[0].atoms()[0].face, Face::default());
        assert_eq!(display.lines()[0].atoms()[1].face, red);
        assert_eq!(display.lines()[1].atoms()[0].face, red);
        assert_eq!(display.lines()[1].atoms()[1].face, Face::default());
        assert_eq!(display.range(), (coord(0, 0), coord(2, 0)));
    }

    #[test]
    fn extract_and_splice_without_child_edit_roundtrips() {
        let buffer = Buffer::from_str("t", "abcdef\nghijkl\n");
        let (scope, defined, sels) = fixture();
        let ctx = Context::new(&buffer, &sels, &scope, &defined);

        let mut display = DisplayBuffer::for_viewport(&buffer, LineCount(0), LineCount(2));
        apply_highlighter(
            &ctx,
            HighlightFlags::Highlight,
            &mut display,
            coord(0, 2),
            coord(1, 3),
            &Inert,
        );
        display.optimize();

        let original = DisplayBuffer::for_viewport(&buffer, LineCount(0), LineCount(2));
        assert_eq!(contents(&display), contents(&original));
        assert_eq!(display.range(), original.range());
    }

    #[test]
    fn lines_outside_the_range_are_untouched() {
        let buffer = Buffer::from_str("t", "aa\nbb\ncc\n");
        let (scope, defined, sels) = fixture();
        let ctx = Context::new(&buffer, &sels, &scope, &defined);

        let mut display = DisplayBuffer::for_viewport(&buffer, LineCount(0), LineCount(3));
        let red = Face::new(Color::Red, Color::Default);
        apply_highlighter(
            &ctx,
            HighlightFlags::Highlight,
            &mut display,
            coord(1, 0),
            coord(2, 0),
            &Recolor(red),
        );
        assert_eq!(display.lines()[0].atoms()[0].face, Face::default());
        assert_eq!(display.lines()[1].atoms()[0].face, red);
        assert_eq!(display.lines()[2].atoms()[0].face, Face::default());
        assert_ne!(display.range(), EMPTY_RANGE);
    }
}
