//! Highlighter pipeline: composable, cache-backed display buffer transforms.
//!
//! A highlighter is a long-lived value with one operation: mutate a display
//! buffer for the current context. Highlighters compose into ordered groups,
//! partition the buffer into recursively delimited regions, and keep
//! per-buffer pattern-match caches maintained from line-modification deltas
//! instead of rescans.
//!
//! Scheduling model: everything here runs synchronously on the editor's
//! single event loop. Highlighters never block, never see a buffer mutate
//! mid-pass, and per-highlighter mutable state uses plain interior
//! mutability.
//!
//! Error policy: fallible work happens at construction (factories return
//! `anyhow` errors to the command layer). An installed highlighter is
//! infallible; runtime degradations (an invalid dynamic regex, a dangling
//! reference) produce no output for the frame and a `tracing` event, never a
//! failed redraw.

use core_display::DisplayBuffer;

mod cache;
mod context;
mod group;
mod range;
mod regexes;
mod regions;
mod registry;
mod simple;

pub use cache::{find_matches, update_matches, BufferSideCache, RegexMatch, RegexMatchList};
pub use context::{
    Context, GlobalScope, LineFlag, OptionStore, OptionValue, Registers, Selection, SelectionList,
};
pub use group::{DefinedHighlighters, HighlighterGroup, IdMap};
pub use range::{apply_face, apply_highlighter, highlight_range};
pub use regexes::{DynamicRegexHighlighter, FacesSpec, RegexHighlighter, RegexSource};
pub use regions::{RegionDesc, RegionMatches, RegionsHighlighter};
pub use registry::{builtin_registry, HighlighterRegistry};
pub use simple::{
    expand_tabulations, expand_unprintable, highlight_selections, show_line_numbers,
    show_matching_char, show_whitespaces,
};

/// Which pass is running: a full styling pass, or a layout-only pass where
/// content substitutions must still happen (so byte to column math stays
/// valid) but no face may change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HighlightFlags {
    Highlight,
    MoveOnly,
}

/// A highlighter mutates a display buffer to change the visual representation
/// of a buffer: recoloring text, adding annotation columns, or substituting
/// content.
pub trait Highlighter {
    fn apply<'a>(&self, ctx: &Context<'a>, flags: HighlightFlags, display: &mut DisplayBuffer<'a>);

    /// Downcast hook used for slash-path addressing into nested groups.
    fn as_group(&self) -> Option<&HighlighterGroup> {
        None
    }

    fn as_group_mut(&mut self) -> Option<&mut HighlighterGroup> {
        None
    }
}

impl std::fmt::Debug for dyn Highlighter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("<highlighter>")
    }
}

/// Id under which a highlighter is installed, plus the highlighter itself.
pub type HighlighterAndId = (String, Box<dyn Highlighter>);

/// Factory invoked by the command layer: parameters in, installed highlighter
/// out. Errors are configuration errors and surface to the user.
pub type HighlighterFactory =
    fn(&[String], &GlobalScope) -> anyhow::Result<HighlighterAndId>;

/// Plain-function highlighter signature, for the built-ins that carry no
/// configuration.
pub type HighlighterFn = for<'a> fn(&Context<'a>, HighlightFlags, &mut DisplayBuffer<'a>);

/// Adapter wrapping a [`HighlighterFn`] into the [`Highlighter`] trait.
pub struct FnHighlighter {
    func: HighlighterFn,
}

impl FnHighlighter {
    pub fn new(func: HighlighterFn) -> FnHighlighter {
        FnHighlighter { func }
    }
}

impl Highlighter for FnHighlighter {
    fn apply<'a>(&self, ctx: &Context<'a>, flags: HighlightFlags, display: &mut DisplayBuffer<'a>) {
        (self.func)(ctx, flags, display)
    }
}
