//! Regex-driven highlighters.
//!
//! [`RegexHighlighter`] colors capture groups of a fixed pattern, scanning a
//! windowed slice of the buffer (viewport plus a margin of 10 lines each way)
//! into a per-buffer cache so horizontal scrolling and small vertical moves
//! reuse it. [`DynamicRegexHighlighter`] wraps it for patterns read at
//! invocation time from a register (`search`) or from an option
//! (`regex_option`); a pattern that fails to compile highlights nothing.

use std::cell::RefCell;

use anyhow::{bail, Context as _, Result};
use regex::Regex;
use tracing::debug;

use core_display::{CoordRange, DisplayBuffer, Face, EMPTY_RANGE};
use core_text::{Buffer, BufferCoord, ByteCount, LineCount};

use crate::cache::BufferSideCache;
use crate::range::{apply_face, highlight_range};
use crate::{Context, GlobalScope, HighlightFlags, Highlighter, HighlighterAndId};

/// Sparse capture-group-index to face-spec mapping.
pub type FacesSpec = Vec<Option<String>>;

/// Lines scanned beyond the viewport on each side.
const WINDOW_MARGIN: i64 = 10;

type CaptureSpans = Vec<Option<(BufferCoord, BufferCoord)>>;

#[derive(Default)]
struct RegexCache {
    range: (LineCount, LineCount),
    timestamp: u64,
    matches: Vec<CaptureSpans>,
}

pub struct RegexHighlighter {
    regex: Regex,
    faces: FacesSpec,
    cache: BufferSideCache<RegexCache>,
}

impl RegexHighlighter {
    pub fn new(regex: Regex, faces: FacesSpec) -> RegexHighlighter {
        RegexHighlighter {
            regex,
            faces,
            cache: BufferSideCache::new(),
        }
    }

    fn update_cache(&self, cache: &mut RegexCache, buffer: &Buffer, range: CoordRange) {
        let first_line = range.0.line;
        let last_line = std::cmp::min(buffer.line_count() - 1, range.1.line);

        if buffer.timestamp() == cache.timestamp
            && first_line >= cache.range.0
            && last_line <= cache.range.1
        {
            return;
        }

        cache.range.0 = std::cmp::max(LineCount(0), first_line - WINDOW_MARGIN);
        cache.range.1 = std::cmp::min(buffer.line_count() - 1, last_line + WINDOW_MARGIN);
        cache.timestamp = buffer.timestamp();
        debug!(
            target: "highlight",
            pattern = self.regex.as_str(),
            first = cache.range.0 .0,
            last = cache.range.1 .0,
            "rescanning regex window"
        );

        cache.matches.clear();
        let mut line = cache.range.0;
        while line <= cache.range.1 {
            for caps in self.regex.captures_iter(buffer.line(line)) {
                let spans: CaptureSpans = (0..self.regex.captures_len())
                    .map(|group| {
                        caps.get(group).map(|m| {
                            (
                                BufferCoord::new(line, ByteCount(m.start() as i64)),
                                BufferCoord::new(line, ByteCount(m.end() as i64)),
                            )
                        })
                    })
                    .collect();
                cache.matches.push(spans);
            }
            line += 1;
        }
    }
}

impl Highlighter for RegexHighlighter {
    fn apply<'a>(&self, ctx: &Context<'a>, flags: HighlightFlags, display: &mut DisplayBuffer<'a>) {
        if flags != HighlightFlags::Highlight {
            return;
        }
        let range = display.range();
        if range == EMPTY_RANGE {
            return;
        }

        let mut resolved: Vec<Option<Face>> = vec![None; self.faces.len()];
        self.cache.with(ctx.buffer(), |cache| {
            self.update_cache(cache, ctx.buffer(), range);
            for spans in &cache.matches {
                for (group, span) in spans.iter().enumerate() {
                    let Some(spec) = self.faces.get(group).and_then(Option::as_ref) else {
                        continue;
                    };
                    let Some((begin, end)) = span else {
                        continue;
                    };
                    let face = match resolved[group] {
                        Some(face) => face,
                        None => {
                            let face = ctx.faces().resolve(spec).unwrap_or_default();
                            resolved[group] = Some(face);
                            face
                        }
                    };
                    highlight_range(display, *begin, *end, true, apply_face(face));
                }
            }
        });
    }
}

/// Where a dynamic pattern comes from.
pub enum RegexSource {
    /// A register, read through the caller's context.
    Register(char),
    /// A regex-typed option.
    Option(String),
}

#[derive(Default)]
struct DynamicState {
    last_pattern: String,
    highlighter: Option<RegexHighlighter>,
}

pub struct DynamicRegexHighlighter {
    source: RegexSource,
    faces: FacesSpec,
    state: RefCell<DynamicState>,
}

impl DynamicRegexHighlighter {
    pub fn new(source: RegexSource, faces: FacesSpec) -> DynamicRegexHighlighter {
        DynamicRegexHighlighter {
            source,
            faces,
            state: RefCell::new(DynamicState::default()),
        }
    }
}

impl Highlighter for DynamicRegexHighlighter {
    fn apply<'a>(&self, ctx: &Context<'a>, flags: HighlightFlags, display: &mut DisplayBuffer<'a>) {
        if flags != HighlightFlags::Highlight {
            return;
        }
        let pattern = match &self.source {
            RegexSource::Register(name) => ctx.main_sel_register_value(*name).to_string(),
            RegexSource::Option(name) => ctx
                .options()
                .regex_pattern(name)
                .unwrap_or_default()
                .to_string(),
        };

        let mut state = self.state.borrow_mut();
        if pattern != state.last_pattern {
            state.highlighter = if pattern.is_empty() {
                None
            } else {
                match Regex::new(&pattern) {
                    Ok(regex) => Some(RegexHighlighter::new(regex, self.faces.clone())),
                    Err(err) => {
                        debug!(
                            target: "highlight",
                            pattern = %pattern,
                            error = %err,
                            "dynamic regex failed to compile"
                        );
                        None
                    }
                }
            };
            state.last_pattern = pattern;
        }
        if let Some(highlighter) = &state.highlighter {
            highlighter.apply(ctx, flags, display);
        }
    }
}

pub fn regex_factory(params: &[String], scope: &GlobalScope) -> Result<HighlighterAndId> {
    if params.len() < 2 {
        bail!("wrong parameter count; expected <pattern> <capture>:<facespec>…");
    }
    let mut faces: FacesSpec = Vec::new();
    for spec in &params[1..] {
        let Some((capture, facespec)) = spec.split_once(':') else {
            bail!("wrong face spec: '{spec}', expected <capture>:<facespec>");
        };
        let capture: usize = capture
            .parse()
            .with_context(|| format!("invalid capture index in '{spec}'"))?;
        scope.faces.resolve(facespec)?;
        if capture >= faces.len() {
            faces.resize(capture + 1, None);
        }
        faces[capture] = Some(facespec.to_string());
    }
    let regex = Regex::new(&params[0])
        .with_context(|| format!("regex error in '{}'", params[0]))?;
    Ok((
        format!("hlregex'{}'", params[0]),
        Box::new(RegexHighlighter::new(regex, faces)),
    ))
}

pub fn search_factory(params: &[String], _scope: &GlobalScope) -> Result<HighlighterAndId> {
    if !params.is_empty() {
        bail!("wrong parameter count; search takes no parameter");
    }
    let faces = vec![Some("Search".to_string())];
    Ok((
        "hlsearch".to_string(),
        Box::new(DynamicRegexHighlighter::new(
            RegexSource::Register('/'),
            faces,
        )),
    ))
}

pub fn regex_option_factory(params: &[String], scope: &GlobalScope) -> Result<HighlighterAndId> {
    let [option_name, facespec] = params else {
        bail!("wrong parameter count; expected <option-name> <facespec>");
    };
    // verify option presence and type now
    scope.options.regex_pattern(option_name)?;
    scope.faces.resolve(facespec)?;
    let faces = vec![Some(facespec.clone())];
    Ok((
        format!("hloption_{option_name}"),
        Box::new(DynamicRegexHighlighter::new(
            RegexSource::Option(option_name.clone()),
            faces,
        )),
    ))
}
