//! Factory registry: string name to highlighter constructor.
//!
//! The command layer resolves a factory by name and calls it with raw string
//! parameters; errors are configuration errors carrying a human-readable
//! message, and nothing is installed on failure. The registry is populated at
//! startup and only read afterwards.

use anyhow::{bail, Result};
use tracing::debug;

use crate::group::{group_factory, reference_factory};
use crate::regexes::{regex_factory, regex_option_factory, search_factory};
use crate::regions::regions_factory;
use crate::simple::{
    fill_factory, flag_lines_factory, line_option_factory, number_lines_factory,
    show_matching_factory, show_whitespaces_factory,
};
use crate::{GlobalScope, HighlighterAndId, HighlighterFactory, IdMap};

#[derive(Default)]
pub struct HighlighterRegistry {
    factories: IdMap<HighlighterFactory>,
}

impl HighlighterRegistry {
    pub fn new() -> HighlighterRegistry {
        HighlighterRegistry::default()
    }

    pub fn register(&mut self, name: impl Into<String>, factory: HighlighterFactory) -> Result<()> {
        let name = name.into();
        debug!(target: "highlight", name = %name, "registered highlighter factory");
        self.factories.append(name, factory)
    }

    /// Build a highlighter through the named factory.
    pub fn build(
        &self,
        name: &str,
        params: &[String],
        scope: &GlobalScope,
    ) -> Result<HighlighterAndId> {
        let Some(factory) = self.factories.get(name) else {
            bail!("no highlighter factory '{name}'");
        };
        factory(params, scope)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.factories.iter().map(|(name, _)| name)
    }
}

/// Registry preloaded with every built-in factory.
pub fn builtin_registry() -> HighlighterRegistry {
    let mut registry = HighlighterRegistry::new();
    let builtins: [(&str, HighlighterFactory); 12] = [
        ("number_lines", number_lines_factory),
        ("show_matching", show_matching_factory),
        ("show_whitespaces", show_whitespaces_factory),
        ("fill", fill_factory),
        ("regex", regex_factory),
        ("regex_option", regex_option_factory),
        ("search", search_factory),
        ("group", group_factory),
        ("flag_lines", flag_lines_factory),
        ("line_option", line_option_factory),
        ("ref", reference_factory),
        ("regions", regions_factory),
    ];
    for (name, factory) in builtins {
        registry
            .register(name, factory)
            .expect("builtin factory names are unique");
    }
    registry
}
