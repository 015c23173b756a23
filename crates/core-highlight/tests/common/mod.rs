//! Shared scaffolding for the highlighting integration tests.
#![allow(dead_code)]

use core_display::DisplayBuffer;
use core_highlight::{Context, DefinedHighlighters, GlobalScope, Selection, SelectionList};
use core_text::{Buffer, LineCount};

pub struct Fixture {
    pub buffer: Buffer,
    pub selections: SelectionList,
    pub scope: GlobalScope,
    pub defined: DefinedHighlighters,
}

impl Fixture {
    pub fn new(content: &str) -> Fixture {
        Fixture {
            buffer: Buffer::from_str("test", content),
            selections: SelectionList::default(),
            scope: GlobalScope::new(),
            defined: DefinedHighlighters::default(),
        }
    }

    pub fn with_selections(mut self, selections: Vec<Selection>, main: usize) -> Fixture {
        self.selections = SelectionList::new(selections, main);
        self
    }

    pub fn ctx(&self) -> Context<'_> {
        Context::new(&self.buffer, &self.selections, &self.scope, &self.defined)
    }

    pub fn display(&self, first: i64, count: i64) -> DisplayBuffer<'_> {
        DisplayBuffer::for_viewport(&self.buffer, LineCount(first), LineCount(count))
    }
}

/// Atom contents per display line.
pub fn contents(display: &DisplayBuffer<'_>) -> Vec<Vec<String>> {
    display
        .lines()
        .iter()
        .map(|line| {
            line.atoms()
                .iter()
                .map(|atom| atom.content().to_string())
                .collect()
        })
        .collect()
}
