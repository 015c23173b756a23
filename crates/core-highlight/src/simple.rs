//! The simple highlighters: fills, annotation columns, glyph substitutions,
//! bracket matching and selection painting.
//!
//! Layout-affecting highlighters (tab expansion, whitespace glyphs, line
//! numbers, flag columns, unprintable substitution) run in both passes so a
//! layout-only pass still sees correct columns; purely recoloring ones bail
//! out of `MoveOnly`.

use anyhow::{bail, Result};
use unicode_width::UnicodeWidthChar;

use core_display::{
    AtomKind, Color, DisplayAtom, DisplayBuffer, Face, EMPTY_RANGE,
};
use core_text::{column_with_tabs, coord, Buffer, BufferCoord, ByteCount};

use crate::range::{apply_face, highlight_range};
use crate::{Context, FnHighlighter, GlobalScope, HighlightFlags, Highlighter, HighlighterAndId};

/// Overlay one face across the entire viewport.
struct Fill {
    spec: String,
}

impl Highlighter for Fill {
    fn apply<'a>(&self, ctx: &Context<'a>, flags: HighlightFlags, display: &mut DisplayBuffer<'a>) {
        if flags != HighlightFlags::Highlight {
            return;
        }
        let Ok(face) = ctx.faces().resolve(&self.spec) else {
            return;
        };
        let range = display.range();
        highlight_range(display, range.0, range.1, true, apply_face(face));
    }
}

pub fn fill_factory(params: &[String], scope: &GlobalScope) -> Result<HighlighterAndId> {
    let [spec] = params else {
        bail!("wrong parameter count; expected <facespec>");
    };
    scope.faces.resolve(spec)?;
    Ok((
        format!("fill_{spec}"),
        Box::new(Fill { spec: spec.clone() }),
    ))
}

/// First codepoint of the atom satisfying `pred`, as
/// `(coordinate, one-past coordinate, char)`. The newline, when matched, ends
/// at the next line's start.
fn first_special<'a>(
    atom: &DisplayAtom<'a>,
    pred: impl Fn(char) -> bool,
) -> Option<(BufferCoord, BufferCoord, char)> {
    let begin = atom.begin();
    let (off, c) = atom.content().char_indices().find(|&(_, c)| pred(c))?;
    let cbegin = BufferCoord::new(begin.line, begin.column + off as i64);
    let cend = if c == '\n' {
        BufferCoord::new(begin.line + 1, ByteCount(0))
    } else {
        BufferCoord::new(cbegin.line, cbegin.column + c.len_utf8() as i64)
    };
    Some((cbegin, cend, c))
}

/// Isolate the codepoint at `[cbegin, cend)` within atom `i` of `line`,
/// splitting around it; returns the index of the isolated atom.
fn isolate<'a>(
    line: &mut core_display::DisplayLine<'a>,
    mut i: usize,
    cbegin: BufferCoord,
    cend: BufferCoord,
) -> usize {
    if cbegin != line.atoms()[i].begin() {
        i = line.split(i, cbegin) + 1;
    }
    if cend < line.atoms()[i].end() {
        i = line.split(i, cend);
    }
    i
}

/// Replace each tab with spaces up to the next tabstop.
pub fn expand_tabulations<'a>(
    ctx: &Context<'a>,
    _flags: HighlightFlags,
    display: &mut DisplayBuffer<'a>,
) {
    let tabstop = ctx.options().int("tabstop").unwrap_or(8).max(1);
    let buffer = ctx.buffer();
    for line in display.lines_mut().iter_mut() {
        let mut i = 0;
        while i < line.atoms().len() {
            let atom = &line.atoms()[i];
            if atom.kind() != AtomKind::BufferRange {
                i += 1;
                continue;
            }
            let Some((cbegin, cend, _)) = first_special(atom, |c| c == '\t') else {
                i += 1;
                continue;
            };
            i = isolate(line, i, cbegin, cend);
            let column = column_with_tabs(buffer, tabstop, cbegin).0;
            let count = (tabstop - column % tabstop) as usize;
            line.atoms_mut()[i].replace(" ".repeat(count));
            i += 1;
        }
    }
}

/// Make whitespace visible: tabs as `→` plus padding, spaces as `·`, the
/// newline as `¬`.
pub fn show_whitespaces<'a>(
    ctx: &Context<'a>,
    _flags: HighlightFlags,
    display: &mut DisplayBuffer<'a>,
) {
    let tabstop = ctx.options().int("tabstop").unwrap_or(8).max(1);
    let buffer = ctx.buffer();
    for line in display.lines_mut().iter_mut() {
        let mut i = 0;
        while i < line.atoms().len() {
            let atom = &line.atoms()[i];
            if atom.kind() != AtomKind::BufferRange {
                i += 1;
                continue;
            }
            let special = first_special(atom, |c| c == '\t' || c == ' ' || c == '\n');
            let Some((cbegin, cend, c)) = special else {
                i += 1;
                continue;
            };
            i = isolate(line, i, cbegin, cend);
            let replacement = match c {
                '\t' => {
                    let column = column_with_tabs(buffer, tabstop, cbegin).0;
                    let count = (tabstop - column % tabstop) as usize;
                    format!("→{}", " ".repeat(count - 1))
                }
                ' ' => "·".to_string(),
                _ => "¬".to_string(),
            };
            line.atoms_mut()[i].replace(replacement);
            i += 1;
        }
    }
}

/// Prepend a right-aligned line-number column, wide enough for the last line.
pub fn show_line_numbers<'a>(
    ctx: &Context<'a>,
    _flags: HighlightFlags,
    display: &mut DisplayBuffer<'a>,
) {
    let mut digits = 0usize;
    let mut rest = ctx.buffer().line_count().0;
    while rest > 0 {
        digits += 1;
        rest /= 10;
    }
    let face = ctx.faces().resolve("LineNumbers").unwrap_or_default();
    for line in display.lines_mut().iter_mut() {
        if line.range() == EMPTY_RANGE {
            continue;
        }
        let number = line.range().0.line.0 + 1;
        let atom = DisplayAtom::from_text(format!("{number:>digits$}│"), face);
        line.insert(0, atom);
    }
}

/// Prepend a fixed-width flag column fed from a line-flags option.
struct FlagLines {
    bg: Color,
    option: String,
}

impl Highlighter for FlagLines {
    fn apply<'a>(&self, ctx: &Context<'a>, _flags: HighlightFlags, display: &mut DisplayBuffer<'a>) {
        let Ok(flags_list) = ctx.options().line_flags(&self.option) else {
            return;
        };
        let width = flags_list
            .iter()
            .map(|f| f.text.chars().count())
            .max()
            .unwrap_or(0);
        for line in display.lines_mut().iter_mut() {
            if line.range() == EMPTY_RANGE {
                continue;
            }
            let number = line.range().0.line + 1;
            let flag = flags_list.iter().find(|f| f.line == number);
            let (color, text) = match flag {
                Some(f) => (f.color, f.text.as_str()),
                None => (Color::Default, ""),
            };
            let pad = width - text.chars().count();
            let atom = DisplayAtom::from_text(
                format!("{text}{}", " ".repeat(pad)),
                Face::new(color, self.bg),
            );
            line.insert(0, atom);
        }
    }
}

pub fn flag_lines_factory(params: &[String], scope: &GlobalScope) -> Result<HighlighterAndId> {
    let [bg, option_name] = params else {
        bail!("wrong parameter count; expected <bg-color> <option-name>");
    };
    let bg = Color::parse(bg)?;
    // verify option presence and type now
    scope.options.line_flags(option_name)?;
    Ok((
        format!("hlflags_{option_name}"),
        Box::new(FlagLines {
            bg,
            option: option_name.clone(),
        }),
    ))
}

/// Overlay a face on one whole line, the line number coming from an
/// integer option (1-based).
struct LineOption {
    option: String,
    spec: String,
}

impl Highlighter for LineOption {
    fn apply<'a>(&self, ctx: &Context<'a>, flags: HighlightFlags, display: &mut DisplayBuffer<'a>) {
        if flags != HighlightFlags::Highlight {
            return;
        }
        let Ok(line) = ctx.options().int(&self.option) else {
            return;
        };
        let Ok(face) = ctx.faces().resolve(&self.spec) else {
            return;
        };
        highlight_range(
            display,
            coord(line - 1, 0),
            coord(line, 0),
            false,
            apply_face(face),
        );
    }
}

pub fn line_option_factory(params: &[String], scope: &GlobalScope) -> Result<HighlighterAndId> {
    let [option_name, facespec] = params else {
        bail!("wrong parameter count; expected <option-name> <facespec>");
    };
    scope.options.int(option_name)?;
    scope.faces.resolve(facespec)?;
    Ok((
        format!("hlline_{option_name}"),
        Box::new(LineOption {
            option: option_name.clone(),
            spec: facespec.clone(),
        }),
    ))
}

const MATCHING_PAIRS: [(u8, u8); 4] = [(b'(', b')'), (b'{', b'}'), (b'[', b']'), (b'<', b'>')];

fn next_byte(buffer: &Buffer, pos: BufferCoord) -> BufferCoord {
    if pos.column + 1 < buffer.line_len(pos.line) {
        BufferCoord::new(pos.line, pos.column + 1)
    } else {
        BufferCoord::new(pos.line + 1, ByteCount(0))
    }
}

fn prev_byte(buffer: &Buffer, pos: BufferCoord) -> BufferCoord {
    if pos.column > 0 {
        BufferCoord::new(pos.line, pos.column - 1)
    } else {
        let line = pos.line - 1;
        BufferCoord::new(line, buffer.line_len(line) - 1)
    }
}

/// Highlight the partner of the bracket under each selection cursor,
/// tracking nesting, within the displayed range.
pub fn show_matching_char<'a>(
    ctx: &Context<'a>,
    flags: HighlightFlags,
    display: &mut DisplayBuffer<'a>,
) {
    if flags != HighlightFlags::Highlight {
        return;
    }
    let range = display.range();
    if range == EMPTY_RANGE {
        return;
    }
    let face = ctx.faces().resolve("MatchingChar").unwrap_or_default();
    let buffer = ctx.buffer();

    for sel in ctx.selections().iter() {
        let pos = sel.cursor;
        if pos < range.0 || pos >= range.1 {
            continue;
        }
        let under = buffer.byte_at(pos);
        for &(open, close) in &MATCHING_PAIRS {
            if under == open {
                let mut level = 1i32;
                let mut it = next_byte(buffer, pos);
                let mut found = None;
                while it < range.1 {
                    let b = buffer.byte_at(it);
                    if b == open {
                        level += 1;
                    } else if b == close {
                        level -= 1;
                        if level == 0 {
                            found = Some(it);
                            break;
                        }
                    }
                    it = next_byte(buffer, it);
                }
                if let Some(partner) = found {
                    highlight_range(
                        display,
                        partner,
                        buffer.char_next(partner),
                        false,
                        apply_face(face),
                    );
                }
                break;
            } else if under == close && pos > range.0 {
                let mut level = 1i32;
                let mut it = prev_byte(buffer, pos);
                let mut found = None;
                while it > range.0 {
                    let b = buffer.byte_at(it);
                    if b == close {
                        level += 1;
                    } else if b == open {
                        level -= 1;
                        if level == 0 {
                            found = Some(it);
                            break;
                        }
                    }
                    it = prev_byte(buffer, it);
                }
                // the range boundary itself is only a partner at top level
                if found.is_none() && buffer.byte_at(range.0) == open && level == 1 {
                    found = Some(range.0);
                }
                if let Some(partner) = found {
                    highlight_range(
                        display,
                        partner,
                        buffer.char_next(partner),
                        false,
                        apply_face(face),
                    );
                }
                break;
            }
        }
    }
}

/// Paint every selection with the Primary/Secondary selection face, then the
/// cursor codepoints on top.
pub fn highlight_selections<'a>(
    ctx: &Context<'a>,
    flags: HighlightFlags,
    display: &mut DisplayBuffer<'a>,
) {
    if flags != HighlightFlags::Highlight {
        return;
    }
    let buffer = ctx.buffer();
    let selections = ctx.selections();
    for (i, sel) in selections.iter().enumerate() {
        let forward = sel.anchor <= sel.cursor;
        let begin = if forward {
            sel.anchor
        } else {
            buffer.char_next(sel.cursor)
        };
        let end = if forward {
            sel.cursor
        } else {
            buffer.char_next(sel.anchor)
        };
        let primary = i == selections.main_index();
        let face = ctx
            .faces()
            .resolve(if primary {
                "PrimarySelection"
            } else {
                "SecondarySelection"
            })
            .unwrap_or_default();
        highlight_range(display, begin, end, false, apply_face(face));
    }
    for (i, sel) in selections.iter().enumerate() {
        let primary = i == selections.main_index();
        let face = ctx
            .faces()
            .resolve(if primary {
                "PrimaryCursor"
            } else {
                "SecondaryCursor"
            })
            .unwrap_or_default();
        highlight_range(
            display,
            sel.cursor,
            buffer.char_next(sel.cursor),
            false,
            apply_face(face),
        );
    }
}

/// Replace codepoints with no printable width (other than the newline) with
/// their `U+XXXX` notation, red on black.
pub fn expand_unprintable<'a>(
    _ctx: &Context<'a>,
    _flags: HighlightFlags,
    display: &mut DisplayBuffer<'a>,
) {
    for line in display.lines_mut().iter_mut() {
        let mut i = 0;
        while i < line.atoms().len() {
            let atom = &line.atoms()[i];
            if atom.kind() != AtomKind::BufferRange {
                i += 1;
                continue;
            }
            let special = first_special(atom, |c| c != '\n' && c.width().is_none());
            let Some((cbegin, cend, c)) = special else {
                i += 1;
                continue;
            };
            i = isolate(line, i, cbegin, cend);
            let replaced = &mut line.atoms_mut()[i];
            replaced.replace(format!("U+{:04X}", c as u32));
            replaced.face = Face::new(Color::Red, Color::Black);
            i += 1;
        }
    }
}

pub fn number_lines_factory(params: &[String], _scope: &GlobalScope) -> Result<HighlighterAndId> {
    if !params.is_empty() {
        bail!("wrong parameter count; number_lines takes no parameter");
    }
    Ok((
        "number_lines".to_string(),
        Box::new(FnHighlighter::new(show_line_numbers)),
    ))
}

pub fn show_matching_factory(params: &[String], _scope: &GlobalScope) -> Result<HighlighterAndId> {
    if !params.is_empty() {
        bail!("wrong parameter count; show_matching takes no parameter");
    }
    Ok((
        "show_matching".to_string(),
        Box::new(FnHighlighter::new(show_matching_char)),
    ))
}

pub fn show_whitespaces_factory(
    params: &[String],
    _scope: &GlobalScope,
) -> Result<HighlighterAndId> {
    if !params.is_empty() {
        bail!("wrong parameter count; show_whitespaces takes no parameter");
    }
    Ok((
        "show_whitespaces".to_string(),
        Box::new(FnHighlighter::new(show_whitespaces)),
    ))
}
