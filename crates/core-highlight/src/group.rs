//! Highlighter groups, the defined-highlighter tree, and by-name references.
//!
//! A group is an ordered, named collection of children applied in insertion
//! order; nested groups form a tree addressed with slash-separated paths.
//! A `ref` highlighter points into the embedder's [`DefinedHighlighters`]
//! registry by name, resolved at each invocation so the target may be defined
//! later (or never: a miss is silently skipped).

use anyhow::{bail, Result};
use tracing::debug;

use core_display::DisplayBuffer;

use crate::{Context, GlobalScope, HighlightFlags, Highlighter, HighlighterAndId};

/// Ordered map with string ids; insertion order is application order.
pub struct IdMap<T> {
    entries: Vec<(String, T)>,
}

impl<T> Default for IdMap<T> {
    fn default() -> Self {
        IdMap {
            entries: Vec::new(),
        }
    }
}

impl<T> IdMap<T> {
    pub fn new() -> IdMap<T> {
        IdMap::default()
    }

    pub fn append(&mut self, id: impl Into<String>, value: T) -> Result<()> {
        let id = id.into();
        if self.contains(&id) {
            bail!("duplicate id '{id}'");
        }
        self.entries.push((id, value));
        Ok(())
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.iter().any(|(name, _)| name == id)
    }

    pub fn get(&self, id: &str) -> Option<&T> {
        self.entries
            .iter()
            .find(|(name, _)| name == id)
            .map(|(_, value)| value)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut T> {
        self.entries
            .iter_mut()
            .find(|(name, _)| name == id)
            .map(|(_, value)| value)
    }

    pub fn remove(&mut self, id: &str) -> Option<T> {
        let idx = self.entries.iter().position(|(name, _)| name == id)?;
        Some(self.entries.remove(idx).1)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &T)> {
        self.entries.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Ordered, named collection of highlighters applied in insertion order.
#[derive(Default)]
pub struct HighlighterGroup {
    children: IdMap<Box<dyn Highlighter>>,
}

impl HighlighterGroup {
    pub fn new() -> HighlighterGroup {
        HighlighterGroup::default()
    }

    pub fn add(&mut self, id: impl Into<String>, highlighter: Box<dyn Highlighter>) -> Result<()> {
        self.children.append(id, highlighter)
    }

    pub fn remove(&mut self, id: &str) -> Result<()> {
        match self.children.remove(id) {
            Some(_) => Ok(()),
            None => bail!("no highlighter '{id}' in group"),
        }
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.children.iter().map(|(id, _)| id)
    }

    /// Look up a child by slash-separated path.
    pub fn get(&self, path: &str) -> Option<&dyn Highlighter> {
        match path.split_once('/') {
            None => self.children.get(path).map(Box::as_ref),
            Some((head, rest)) => self.children.get(head)?.as_group()?.get(rest),
        }
    }

    /// Mutable group lookup by slash-separated path, for runtime edits of the
    /// highlighter tree.
    pub fn get_group_mut(&mut self, path: &str) -> Result<&mut HighlighterGroup> {
        let (head, rest) = match path.split_once('/') {
            None => (path, None),
            Some((head, rest)) => (head, Some(rest)),
        };
        let Some(child) = self.children.get_mut(head) else {
            bail!("no highlighter '{head}' in group");
        };
        let Some(group) = child.as_group_mut() else {
            bail!("'{head}' is not a group");
        };
        match rest {
            None => Ok(group),
            Some(rest) => group.get_group_mut(rest),
        }
    }
}

impl Highlighter for HighlighterGroup {
    fn apply<'a>(&self, ctx: &Context<'a>, flags: HighlightFlags, display: &mut DisplayBuffer<'a>) {
        for (_, child) in self.children.iter() {
            child.apply(ctx, flags, display);
        }
    }

    fn as_group(&self) -> Option<&HighlighterGroup> {
        Some(self)
    }

    fn as_group_mut(&mut self) -> Option<&mut HighlighterGroup> {
        Some(self)
    }
}

/// The embedder-owned tree of named highlighters that `ref` highlighters
/// resolve against.
#[derive(Default)]
pub struct DefinedHighlighters {
    root: HighlighterGroup,
}

impl DefinedHighlighters {
    pub fn new() -> DefinedHighlighters {
        DefinedHighlighters::default()
    }

    pub fn root_mut(&mut self) -> &mut HighlighterGroup {
        &mut self.root
    }

    pub fn add(&mut self, id: impl Into<String>, highlighter: Box<dyn Highlighter>) -> Result<()> {
        self.root.add(id, highlighter)
    }

    pub fn get(&self, path: &str) -> Option<&dyn Highlighter> {
        self.root.get(path)
    }
}

/// By-name pointer into [`DefinedHighlighters`], dereferenced at invocation.
struct Reference {
    name: String,
}

impl Highlighter for Reference {
    fn apply<'a>(&self, ctx: &Context<'a>, flags: HighlightFlags, display: &mut DisplayBuffer<'a>) {
        match ctx.defined().get(&self.name) {
            Some(target) => target.apply(ctx, flags, display),
            None => {
                debug!(target: "highlight", name = %self.name, "reference target not found");
            }
        }
    }
}

pub fn group_factory(params: &[String], _scope: &GlobalScope) -> Result<HighlighterAndId> {
    let [name] = params else {
        bail!("wrong parameter count; expected <name>");
    };
    Ok((name.clone(), Box::new(HighlighterGroup::new())))
}

pub fn reference_factory(params: &[String], _scope: &GlobalScope) -> Result<HighlighterAndId> {
    let [name] = params else {
        bail!("wrong parameter count; expected <name>");
    };
    Ok((
        name.clone(),
        Box::new(Reference { name: name.clone() }),
    ))
}
