//! Invocation context: the environment a highlight pass runs in.
//!
//! The context bundles shared references to the current buffer, the selection
//! list, and the embedder-owned shared scope (faces, options, registers) plus
//! the registry of named highlighters. Highlighters borrow it for the
//! duration of one pass and hold nothing across passes.

use std::collections::HashMap;

use anyhow::{bail, Result};
use core_display::{Color, FaceRegistry};
use core_text::{Buffer, BufferCoord, LineCount};

use crate::group::DefinedHighlighters;

/// One selection: an anchor and a cursor, either order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Selection {
    pub anchor: BufferCoord,
    pub cursor: BufferCoord,
}

impl Selection {
    pub fn new(anchor: BufferCoord, cursor: BufferCoord) -> Selection {
        Selection { anchor, cursor }
    }

    /// Degenerate selection: cursor only.
    pub fn at(pos: BufferCoord) -> Selection {
        Selection {
            anchor: pos,
            cursor: pos,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SelectionList {
    selections: Vec<Selection>,
    main_index: usize,
}

impl SelectionList {
    pub fn new(selections: Vec<Selection>, main_index: usize) -> SelectionList {
        debug_assert!(selections.is_empty() || main_index < selections.len());
        SelectionList {
            selections,
            main_index,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Selection> {
        self.selections.iter()
    }

    pub fn len(&self) -> usize {
        self.selections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.selections.is_empty()
    }

    pub fn main_index(&self) -> usize {
        self.main_index
    }
}

/// A `(line, color, text)` flag as stored in a line-flags option. Lines are
/// 1-based, matching how the option is written by users.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineFlag {
    pub line: LineCount,
    pub color: Color,
    pub text: String,
}

/// Typed option values. Highlighter factories check the variant at
/// construction time; a later type change surfaces as a missing value, not a
/// panic.
#[derive(Debug, Clone, PartialEq)]
pub enum OptionValue {
    Int(i64),
    Bool(bool),
    String(String),
    /// A regex option stores the pattern; consumers compile lazily so an
    /// edited option can fail soft.
    Regex(String),
    LineFlags(Vec<LineFlag>),
}

#[derive(Default)]
pub struct OptionStore {
    values: HashMap<String, OptionValue, ahash::RandomState>,
}

impl OptionStore {
    pub fn set(&mut self, name: impl Into<String>, value: OptionValue) {
        self.values.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<&OptionValue> {
        self.values.get(name)
    }

    pub fn int(&self, name: &str) -> Result<i64> {
        match self.values.get(name) {
            Some(OptionValue::Int(v)) => Ok(*v),
            Some(_) => bail!("option '{name}' is not an integer"),
            None => bail!("no such option '{name}'"),
        }
    }

    pub fn regex_pattern(&self, name: &str) -> Result<&str> {
        match self.values.get(name) {
            Some(OptionValue::Regex(p)) => Ok(p),
            Some(_) => bail!("option '{name}' is not a regex"),
            None => bail!("no such option '{name}'"),
        }
    }

    pub fn line_flags(&self, name: &str) -> Result<&[LineFlag]> {
        match self.values.get(name) {
            Some(OptionValue::LineFlags(flags)) => Ok(flags),
            Some(_) => bail!("option '{name}' is not a line-flags list"),
            None => bail!("no such option '{name}'"),
        }
    }
}

/// Named registers; the search highlighter reads the `/` register.
#[derive(Default)]
pub struct Registers {
    values: HashMap<char, String, ahash::RandomState>,
}

impl Registers {
    pub fn set(&mut self, name: char, value: impl Into<String>) {
        self.values.insert(name, value.into());
    }

    /// Register content, empty when unset.
    pub fn get(&self, name: char) -> &str {
        self.values.get(&name).map(String::as_str).unwrap_or("")
    }
}

/// Embedder-owned shared state: face aliases, options, registers. Initialized
/// at startup and passed explicitly wherever needed; there are no process
/// globals behind it.
pub struct GlobalScope {
    pub faces: FaceRegistry,
    pub options: OptionStore,
    pub registers: Registers,
}

impl Default for GlobalScope {
    fn default() -> Self {
        let mut options = OptionStore::default();
        options.set("tabstop", OptionValue::Int(8));
        GlobalScope {
            faces: FaceRegistry::new(),
            options,
            registers: Registers::default(),
        }
    }
}

impl GlobalScope {
    pub fn new() -> GlobalScope {
        GlobalScope::default()
    }
}

/// Borrowed view of everything a highlighter may consult during a pass.
#[derive(Clone, Copy)]
pub struct Context<'a> {
    buffer: &'a Buffer,
    selections: &'a SelectionList,
    scope: &'a GlobalScope,
    defined: &'a DefinedHighlighters,
}

impl<'a> Context<'a> {
    pub fn new(
        buffer: &'a Buffer,
        selections: &'a SelectionList,
        scope: &'a GlobalScope,
        defined: &'a DefinedHighlighters,
    ) -> Context<'a> {
        Context {
            buffer,
            selections,
            scope,
            defined,
        }
    }

    pub fn buffer(&self) -> &'a Buffer {
        self.buffer
    }

    pub fn selections(&self) -> &'a SelectionList {
        self.selections
    }

    pub fn options(&self) -> &'a OptionStore {
        &self.scope.options
    }

    pub fn faces(&self) -> &'a FaceRegistry {
        &self.scope.faces
    }

    pub fn registers(&self) -> &'a Registers {
        &self.scope.registers
    }

    /// Value of a register as seen by the main selection.
    pub fn main_sel_register_value(&self, name: char) -> &'a str {
        self.scope.registers.get(name)
    }

    pub fn defined(&self) -> &'a DefinedHighlighters {
        self.defined
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn typed_option_accessors_check_variants() {
        let mut store = OptionStore::default();
        store.set("tabstop", OptionValue::Int(4));
        store.set("todo", OptionValue::Regex("TODO".into()));
        assert_eq!(store.int("tabstop").unwrap(), 4);
        assert_eq!(store.regex_pattern("todo").unwrap(), "TODO");
        assert!(store.int("todo").is_err());
        assert!(store.regex_pattern("missing").is_err());
        assert!(store.line_flags("tabstop").is_err());
    }

    #[test]
    fn registers_default_to_empty() {
        let mut regs = Registers::default();
        assert_eq!(regs.get('/'), "");
        regs.set('/', "pattern");
        assert_eq!(regs.get('/'), "pattern");
    }
}
