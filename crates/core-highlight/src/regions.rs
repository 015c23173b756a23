//! Regions highlighter: partition the buffer into named, possibly recursive
//! delimited regions and dispatch each to a child highlighter group.
//!
//! Per region definition the cache holds three sorted match lists (begin,
//! end, recurse), maintained incrementally from line-modification deltas.
//! Resolution walks the lists with a cursor: the earliest begin wins (ties go
//! to the region defined first), its matching end is found by consuming one
//! extra end per recurse match seen before it, and the cursor jumps past the
//! region. Empty begin/end matches (lookarounds) advance the cursor by one
//! column so resolution always makes progress.

use anyhow::{bail, Context as _, Result};
use regex::Regex;
use tracing::debug;

use core_display::{DisplayBuffer, EMPTY_RANGE};
use core_text::{
    compute_line_modifications, coord, Buffer, BufferCoord, ByteCount, LineModification,
};

use crate::cache::{find_matches, update_matches, BufferSideCache, RegexMatchList};
use crate::group::{HighlighterGroup, IdMap};
use crate::range::apply_highlighter;
use crate::{Context, GlobalScope, HighlightFlags, Highlighter, HighlighterAndId};

/// Begin/end/recurse patterns delimiting one region kind.
pub struct RegionDesc {
    pub begin: Regex,
    pub end: Regex,
    pub recurse: Option<Regex>,
}

impl RegionDesc {
    fn find_matches(&self, buffer: &Buffer) -> RegionMatches {
        RegionMatches {
            begin_matches: find_matches(buffer, &self.begin),
            end_matches: find_matches(buffer, &self.end),
            recurse_matches: match &self.recurse {
                Some(recurse) => find_matches(buffer, recurse),
                None => RegexMatchList::new(),
            },
        }
    }

    fn update_matches(
        &self,
        buffer: &Buffer,
        modifs: &[LineModification],
        matches: &mut RegionMatches,
    ) {
        update_matches(buffer, modifs, &mut matches.begin_matches, &self.begin);
        update_matches(buffer, modifs, &mut matches.end_matches, &self.end);
        if let Some(recurse) = &self.recurse {
            update_matches(buffer, modifs, &mut matches.recurse_matches, recurse);
        }
    }
}

/// The three sorted match lists of one region definition.
#[derive(Default)]
pub struct RegionMatches {
    pub begin_matches: RegexMatchList,
    pub end_matches: RegexMatchList,
    pub recurse_matches: RegexMatchList,
}

impl RegionMatches {
    /// Index of the first begin match at or after `pos`.
    fn find_next_begin(&self, pos: BufferCoord) -> usize {
        self.begin_matches
            .partition_point(|m| m.begin_coord() < pos)
    }

    /// Index of the end match closing a region whose begin ends at `beg_pos`,
    /// consuming one additional end per recurse match crossed on the way.
    fn find_matching_end(&self, mut beg_pos: BufferCoord) -> Option<usize> {
        let mut end_it = 0usize;
        let mut rec_it = 0usize;
        let mut recurse_level = 0i64;
        loop {
            end_it += self.end_matches[end_it..]
                .partition_point(|m| m.begin_coord() < beg_pos);
            rec_it += self.recurse_matches[rec_it..]
                .partition_point(|m| m.begin_coord() < beg_pos);

            if end_it == self.end_matches.len() {
                return None;
            }

            // a recurse starting before the candidate end consumes it, even
            // when the two overlap (an escape pattern eating the delimiter)
            while rec_it < self.recurse_matches.len()
                && self.recurse_matches[rec_it].begin_coord()
                    < self.end_matches[end_it].begin_coord()
            {
                recurse_level += 1;
                rec_it += 1;
            }

            if recurse_level == 0 {
                return Some(end_it);
            }
            recurse_level -= 1;
            beg_pos = self.end_matches[end_it].end_coord();
        }
    }
}

/// One resolved region: coordinates plus the index of its definition.
#[derive(Debug, Clone, Copy)]
struct Region {
    begin: BufferCoord,
    end: BufferCoord,
    region: usize,
}

#[derive(Default)]
struct RegionsCache {
    timestamp: u64,
    matches: Vec<RegionMatches>,
    regions: Vec<Region>,
}

pub struct RegionsHighlighter {
    regions: Vec<(String, RegionDesc)>,
    default_group: Option<String>,
    groups: IdMap<HighlighterGroup>,
    cache: BufferSideCache<RegionsCache>,
}

impl RegionsHighlighter {
    /// Build from named region definitions plus an optional default group
    /// covering the gaps. Child groups are created per region name (and for
    /// the default); populate them through [`group_mut`](Self::group_mut).
    pub fn new(
        regions: Vec<(String, RegionDesc)>,
        default_group: Option<String>,
    ) -> Result<RegionsHighlighter> {
        if regions.is_empty() {
            bail!("at least one region must be defined");
        }
        let mut groups = IdMap::new();
        for (name, desc) in &regions {
            if desc.begin.as_str().is_empty() || desc.end.as_str().is_empty() {
                bail!("invalid regex for region highlighter");
            }
            groups.append(name.clone(), HighlighterGroup::new())?;
        }
        if let Some(default) = &default_group {
            if !groups.contains(default) {
                groups.append(default.clone(), HighlighterGroup::new())?;
            }
        }
        Ok(RegionsHighlighter {
            regions,
            default_group,
            groups,
            cache: BufferSideCache::new(),
        })
    }

    /// The child group for a region name (or the default group's name).
    pub fn group_mut(&mut self, name: &str) -> Option<&mut HighlighterGroup> {
        self.groups.get_mut(name)
    }

    /// Earliest begin match at or after `pos` across all regions; ties go to
    /// the region defined first.
    fn find_next_begin(cache: &RegionsCache, pos: BufferCoord) -> Option<(usize, usize)> {
        let mut res: Option<(usize, usize)> = None;
        for (region, matches) in cache.matches.iter().enumerate() {
            let it = matches.find_next_begin(pos);
            if it == matches.begin_matches.len() {
                continue;
            }
            let candidate = matches.begin_matches[it].begin_coord();
            let better = match res {
                None => true,
                Some((r, i)) => candidate < cache.matches[r].begin_matches[i].begin_coord(),
            };
            if better {
                res = Some((region, it));
            }
        }
        res
    }

    fn update_cache(&self, cache: &mut RegionsCache, buffer: &Buffer) {
        let timestamp = buffer.timestamp();
        if cache.timestamp == timestamp {
            return;
        }

        if cache.timestamp == 0 {
            debug!(target: "highlight", buffer = buffer.name(), "full region scan");
            cache.matches = self
                .regions
                .iter()
                .map(|(_, desc)| desc.find_matches(buffer))
                .collect();
        } else {
            let modifs = compute_line_modifications(buffer, cache.timestamp);
            debug!(
                target: "highlight",
                buffer = buffer.name(),
                modifications = modifs.len(),
                "incremental region update"
            );
            for ((_, desc), matches) in self.regions.iter().zip(&mut cache.matches) {
                desc.update_matches(buffer, &modifs, matches);
            }
        }
        cache.timestamp = timestamp;

        cache.regions.clear();
        let mut begin = Self::find_next_begin(cache, coord(-1, 0));
        while let Some((region, beg_it)) = begin {
            let matches = &cache.matches[region];
            let beg = matches.begin_matches[beg_it];
            match matches.find_matching_end(beg.end_coord()) {
                None => {
                    cache.regions.push(Region {
                        begin: beg.begin_coord(),
                        end: buffer.end_coord(),
                        region,
                    });
                    break;
                }
                Some(end_it) => {
                    let end = matches.end_matches[end_it];
                    cache.regions.push(Region {
                        begin: beg.begin_coord(),
                        end: end.end_coord(),
                        region,
                    });
                    let mut next_pos = end.end_coord();
                    // empty begin and empty end (e.g. lookarounds) would pin
                    // the cursor; nudge it one column forward
                    if next_pos == beg.begin_coord() {
                        next_pos.column += 1;
                    }
                    begin = Self::find_next_begin(cache, next_pos);
                }
            }
        }
    }
}

impl Highlighter for RegionsHighlighter {
    fn apply<'a>(&self, ctx: &Context<'a>, flags: HighlightFlags, display: &mut DisplayBuffer<'a>) {
        if flags != HighlightFlags::Highlight {
            return;
        }
        let range = display.range();
        if range == EMPTY_RANGE {
            return;
        }
        let buffer = ctx.buffer();

        let regions: Vec<Region> = self.cache.with(buffer, |cache| {
            self.update_cache(cache, buffer);
            cache.regions.clone()
        });

        let first = regions.partition_point(|r| r.end < range.0);
        let last = first + regions[first..].partition_point(|r| r.begin < range.1);

        let correct = |c: BufferCoord| -> BufferCoord {
            if c.line < buffer.line_count() && buffer.line_len(c.line) == c.column {
                BufferCoord::new(c.line + 1, ByteCount(0))
            } else {
                c
            }
        };

        let default_group = self
            .default_group
            .as_deref()
            .and_then(|name| self.groups.get(name));

        let mut last_begin = range.0;
        for region in &regions[first..last] {
            if let Some(default) = default_group {
                if last_begin < region.begin {
                    apply_highlighter(
                        ctx,
                        flags,
                        display,
                        correct(last_begin),
                        correct(region.begin),
                        default,
                    );
                }
            }
            let name = &self.regions[region.region].0;
            if let Some(group) = self.groups.get(name) {
                apply_highlighter(
                    ctx,
                    flags,
                    display,
                    correct(region.begin),
                    correct(region.end),
                    group,
                );
            }
            last_begin = region.end;
        }
        if let Some(default) = default_group {
            if last_begin < range.1 {
                apply_highlighter(ctx, flags, display, correct(last_begin), range.1, default);
            }
        }
    }
}

pub fn regions_factory(params: &[String], _scope: &GlobalScope) -> Result<HighlighterAndId> {
    let mut rest = params;
    let mut default_group = None;
    if rest.first().map(String::as_str) == Some("-default") {
        let Some(name) = rest.get(1) else {
            bail!("-default requires a group name");
        };
        default_group = Some(name.clone());
        rest = &rest[2..];
    }
    if rest.len() < 5 || (rest.len() - 1) % 4 != 0 {
        bail!("wrong parameter count; expected [-default <group>] <id> (<group> <begin> <end> <recurse>)+");
    }

    let id = rest[0].clone();
    let mut regions = Vec::new();
    for chunk in rest[1..].chunks(4) {
        let [name, begin, end, recurse] = chunk else {
            unreachable!("chunk size checked above");
        };
        if name.is_empty() || begin.is_empty() || end.is_empty() {
            bail!("group id, begin and end must not be empty");
        }
        let desc = RegionDesc {
            begin: Regex::new(begin).with_context(|| format!("regex error in '{begin}'"))?,
            end: Regex::new(end).with_context(|| format!("regex error in '{end}'"))?,
            recurse: if recurse.is_empty() {
                None
            } else {
                Some(Regex::new(recurse).with_context(|| format!("regex error in '{recurse}'"))?)
            },
        };
        regions.push((name.clone(), desc));
    }
    Ok((
        id,
        Box::new(RegionsHighlighter::new(regions, default_group)?),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::range::{apply_face, highlight_range};
    use crate::{DefinedHighlighters, SelectionList};
    use core_display::{Color, Face};
    use core_text::LineCount;

    struct Paint(Face);
    impl Highlighter for Paint {
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

    struct Fixture {
        buffer: Buffer,
        selections: SelectionList,
        scope: GlobalScope,
        defined: DefinedHighlighters,
    }

    impl Fixture {
        fn new(content: &str) -> Fixture {
            Fixture {
                buffer: Buffer::from_str("test", content),
                selections: SelectionList::default(),
                scope: GlobalScope::new(),
                defined: DefinedHighlighters::default(),
            }
        }

        fn ctx(&self) -> Context<'_> {
            Context::new(&self.buffer, &self.selections, &self.scope, &self.defined)
        }
    }

    fn string_region() -> (String, RegionDesc) {
        (
            "string".to_string(),
            RegionDesc {
                begin: Regex::new("\"").unwrap(),
                end: Regex::new("\"").unwrap(),
                recurse: Some(Regex::new(r"\\.").unwrap()),
            },
        )
    }

    fn painted_spans(display: &DisplayBuffer<'_>, fg: Color) -> Vec<String> {
        display
            .lines()
            .iter()
            .flat_map(|l| l.atoms())
            .filter(|a| a.face.fg == fg)
            .map(|a| a.content().to_string())
            .collect()
    }

    #[test]
    fn escaped_quote_does_not_close_the_region() {
        let fx = Fixture::new("he said \"x \\\" y\" then\n");
        let mut hl = RegionsHighlighter::new(vec![string_region()], None).unwrap();
        hl.group_mut("string")
            .unwrap()
            .add("paint", Box::new(Paint(Face::new(Color::Red, Color::Default))))
            .unwrap();

        let mut display = DisplayBuffer::for_viewport(&fx.buffer, LineCount(0), LineCount(1));
        hl.apply(&fx.ctx(), HighlightFlags::Highlight, &mut display);

        assert_eq!(
            painted_spans(&display, Color::Red).join(""),
            "\"x \\\" y\""
        );
    }

    #[test]
    fn default_group_covers_the_gaps() {
        let fx = Fixture::new("a \"s1\" b \"s2\" c\n");
        let mut hl =
            RegionsHighlighter::new(vec![string_region()], Some("code".to_string())).unwrap();
        hl.group_mut("string")
            .unwrap()
            .add("paint", Box::new(Paint(Face::new(Color::Red, Color::Default))))
            .unwrap();
        hl.group_mut("code")
            .unwrap()
            .add("paint", Box::new(Paint(Face::new(Color::Blue, Color::Default))))
            .unwrap();

        let mut display = DisplayBuffer::for_viewport(&fx.buffer, LineCount(0), LineCount(1));
        hl.apply(&fx.ctx(), HighlightFlags::Highlight, &mut display);

        assert_eq!(painted_spans(&display, Color::Red), ["\"s1\"", "\"s2\""]);
        assert_eq!(painted_spans(&display, Color::Blue), ["a ", " b ", " c\n"]);
    }

    #[test]
    fn multiline_region_and_unterminated_tail() {
        let fx = Fixture::new("x <!-- c1\nc2 --> y\nz <!-- open\nstill\n");
        let comment = (
            "comment".to_string(),
            RegionDesc {
                begin: Regex::new("<!--").unwrap(),
                end: Regex::new("-->").unwrap(),
                recurse: None,
            },
        );
        let mut hl = RegionsHighlighter::new(vec![comment], None).unwrap();
        hl.group_mut("comment")
            .unwrap()
            .add("paint", Box::new(Paint(Face::new(Color::Green, Color::Default))))
            .unwrap();

        let mut display = DisplayBuffer::for_viewport(&fx.buffer, LineCount(0), LineCount(4));
        hl.apply(&fx.ctx(), HighlightFlags::Highlight, &mut display);

        assert_eq!(
            painted_spans(&display, Color::Green).join(""),
            "<!-- c1\nc2 --><!-- open\nstill\n"
        );
    }

    #[test]
    fn earliest_region_wins_and_first_defined_breaks_ties() {
        let fx = Fixture::new("x [a] {b}\n");
        let braces = RegionsHighlighter::new(
            vec![
                (
                    "square".to_string(),
                    RegionDesc {
                        begin: Regex::new(r"\[").unwrap(),
                        end: Regex::new(r"\]").unwrap(),
                        recurse: None,
                    },
                ),
                (
                    "curly".to_string(),
                    RegionDesc {
                        begin: Regex::new(r"\{").unwrap(),
                        end: Regex::new(r"\}").unwrap(),
                        recurse: None,
                    },
                ),
            ],
            None,
        );
        let mut hl = braces.unwrap();
        hl.group_mut("square")
            .unwrap()
            .add("paint", Box::new(Paint(Face::new(Color::Red, Color::Default))))
            .unwrap();
        hl.group_mut("curly")
            .unwrap()
            .add("paint", Box::new(Paint(Face::new(Color::Blue, Color::Default))))
            .unwrap();

        let mut display = DisplayBuffer::for_viewport(&fx.buffer, LineCount(0), LineCount(1));
        hl.apply(&fx.ctx(), HighlightFlags::Highlight, &mut display);
        assert_eq!(painted_spans(&display, Color::Red), ["[a]"]);
        assert_eq!(painted_spans(&display, Color::Blue), ["{b}"]);
    }

    #[test]
    fn empty_delimiters_advance_one_column() {
        // `^` matches empty at the start of every line: begin == end for each
        // region, and resolution must still terminate
        let fx = Fixture::new("aa\nbb\n");
        let empty = (
            "mark".to_string(),
            RegionDesc {
                begin: Regex::new("^").unwrap(),
                end: Regex::new("^").unwrap(),
                recurse: None,
            },
        );
        let hl = RegionsHighlighter::new(vec![empty], None).unwrap();
        let mut display = DisplayBuffer::for_viewport(&fx.buffer, LineCount(0), LineCount(2));
        // no children installed; resolving without hanging is the assertion
        hl.apply(&fx.ctx(), HighlightFlags::Highlight, &mut display);
    }

    #[test]
    fn incremental_edit_keeps_regions_current() {
        let mut fx = Fixture::new("a \"one\" b\nplain\n");
        let mut hl = RegionsHighlighter::new(vec![string_region()], None).unwrap();
        hl.group_mut("string")
            .unwrap()
            .add("paint", Box::new(Paint(Face::new(Color::Red, Color::Default))))
            .unwrap();

        {
            let mut display = DisplayBuffer::for_viewport(&fx.buffer, LineCount(0), LineCount(2));
            hl.apply(&fx.ctx(), HighlightFlags::Highlight, &mut display);
            assert_eq!(painted_spans(&display, Color::Red), ["\"one\""]);
        }

        fx.buffer.replace_line(LineCount(1), "now \"two\" here");
        let mut display = DisplayBuffer::for_viewport(&fx.buffer, LineCount(0), LineCount(2));
        hl.apply(&fx.ctx(), HighlightFlags::Highlight, &mut display);
        assert_eq!(painted_spans(&display, Color::Red), ["\"one\"", "\"two\""]);
    }

    #[test]
    fn construction_validation() {
        assert!(RegionsHighlighter::new(vec![], None).is_err());
        let scope = GlobalScope::new();
        assert!(regions_factory(
            &["c".into(), "string".into(), "\"".into(), "\"".into()],
            &scope
        )
        .is_err());
        assert!(regions_factory(
            &["c".into(), "string".into(), "".into(), "\"".into(), "".into()],
            &scope
        )
        .is_err());
        assert!(regions_factory(
            &[
                "c".into(),
                "string".into(),
                "\"".into(),
                "\"".into(),
                r"\\.".into()
            ],
            &scope
        )
        .is_ok());
    }
}
