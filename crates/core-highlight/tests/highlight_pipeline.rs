//! End-to-end pipeline scenarios: a root group driving the built-in
//! highlighters over a freshly seeded display buffer, the way a renderer
//! does per redraw.

mod common;

use common::{contents, Fixture};
use core_display::{Attribute, Color, Face};
use core_highlight::{
    builtin_registry, HighlightFlags, Highlighter, HighlighterGroup, OptionValue, Selection,
};
use core_text::coord;

#[test]
fn fill_yellow_over_two_lines() {
    let fx = Fixture::new("ab\ncd\n");
    let registry = builtin_registry();
    let (_, fill) = registry
        .build("fill", &["yellow".to_string()], &fx.scope)
        .unwrap();

    let mut display = fx.display(0, 2);
    fill.apply(&fx.ctx(), HighlightFlags::Highlight, &mut display);

    assert_eq!(contents(&display), vec![vec!["ab\n"], vec!["cd\n"]]);
    for line in display.lines() {
        assert_eq!(line.atoms()[0].face.fg, Color::Yellow);
    }
}

#[test]
fn group_pipeline_numbers_then_matches_then_selections() {
    let mut fx = Fixture::new("fn main() {\n    let x = 1;\n}\n")
        .with_selections(vec![Selection::new(coord(1, 8), coord(1, 9))], 0);
    fx.scope.options.set("tabstop", OptionValue::Int(4));

    let registry = builtin_registry();
    let mut root = HighlighterGroup::new();
    let (id, numbers) = registry.build("number_lines", &[], &fx.scope).unwrap();
    root.add(id, numbers).unwrap();
    let (id, keywords) = registry
        .build(
            "regex",
            &[r"\b(fn|let)\b".to_string(), "1:red+b".to_string()],
            &fx.scope,
        )
        .unwrap();
    root.add(id, keywords).unwrap();

    let mut display = fx.display(0, 3);
    root.apply(&fx.ctx(), HighlightFlags::Highlight, &mut display);

    let lines = contents(&display);
    assert_eq!(lines[0][0], "1│");
    assert_eq!(lines[0][1], "fn");
    assert_eq!(lines[1][0], "2│");
    assert_eq!(lines[2], vec!["3│", "}\n"]);

    let fn_atom = &display.lines()[0].atoms()[1];
    assert_eq!(fn_atom.face.fg, Color::Red);
    assert!(fn_atom.face.attributes.contains(Attribute::BOLD));

    // keyword on line 1 sits after the number column, still styled
    let let_atom = display.lines()[1]
        .atoms()
        .iter()
        .find(|a| a.content() == "let")
        .expect("keyword atom");
    assert_eq!(let_atom.face.fg, Color::Red);
}

#[test]
fn search_reads_the_slash_register() {
    let mut fx = Fixture::new("alpha beta alpha\n");
    fx.scope.registers.set('/', "alpha");
    let registry = builtin_registry();
    let (_, search) = registry.build("search", &[], &fx.scope).unwrap();

    let mut display = fx.display(0, 1);
    search.apply(&fx.ctx(), HighlightFlags::Highlight, &mut display);
    let underlined: Vec<String> = display.lines()[0]
        .atoms()
        .iter()
        .filter(|a| a.face.attributes.contains(Attribute::UNDERLINE))
        .map(|a| a.content().to_string())
        .collect();
    assert_eq!(underlined, ["alpha", "alpha"]);
}

#[test]
fn invalid_search_pattern_highlights_nothing() {
    let mut fx = Fixture::new("alpha (beta\n");
    fx.scope.registers.set('/', "(unclosed");
    let registry = builtin_registry();
    let (_, search) = registry.build("search", &[], &fx.scope).unwrap();

    let mut display = fx.display(0, 1);
    search.apply(&fx.ctx(), HighlightFlags::Highlight, &mut display);
    assert_eq!(contents(&display), vec![vec!["alpha (beta\n"]]);
    assert_eq!(display.lines()[0].atoms()[0].face, Face::default());
}

#[test]
fn regex_option_follows_option_edits() {
    let mut fx = Fixture::new("todo: fixme\n");
    fx.scope
        .options
        .set("todo_pattern", OptionValue::Regex("todo".into()));
    let registry = builtin_registry();
    let (_, hl) = registry
        .build(
            "regex_option",
            &["todo_pattern".to_string(), "green".to_string()],
            &fx.scope,
        )
        .unwrap();

    let mut display = fx.display(0, 1);
    hl.apply(&fx.ctx(), HighlightFlags::Highlight, &mut display);
    let green: Vec<String> = display.lines()[0]
        .atoms()
        .iter()
        .filter(|a| a.face.fg == Color::Green)
        .map(|a| a.content().to_string())
        .collect();
    assert_eq!(green, ["todo"]);

    fx.scope
        .options
        .set("todo_pattern", OptionValue::Regex("fixme".into()));
    let mut display = fx.display(0, 1);
    hl.apply(&fx.ctx(), HighlightFlags::Highlight, &mut display);
    let green: Vec<String> = display.lines()[0]
        .atoms()
        .iter()
        .filter(|a| a.face.fg == Color::Green)
        .map(|a| a.content().to_string())
        .collect();
    assert_eq!(green, ["fixme"]);
}

#[test]
fn regex_cache_follows_buffer_edits() {
    let mut fx = Fixture::new("mark none\nplain\nmark twice mark\n");
    let registry = builtin_registry();
    let (_, hl) = registry
        .build("regex", &["mark".to_string(), "0:blue".to_string()], &fx.scope)
        .unwrap();

    let count_blue = |display: &core_display::DisplayBuffer<'_>| {
        display
            .lines()
            .iter()
            .flat_map(|l| l.atoms())
            .filter(|a| a.face.fg == Color::Blue)
            .count()
    };

    let mut display = fx.display(0, 3);
    hl.apply(&fx.ctx(), HighlightFlags::Highlight, &mut display);
    assert_eq!(count_blue(&display), 3);

    // an edit bumps the timestamp; the next pass sees fresh matches
    fx.buffer.replace_line(core_text::LineCount(0), "none left");
    let mut display = fx.display(0, 3);
    hl.apply(&fx.ctx(), HighlightFlags::Highlight, &mut display);
    assert_eq!(count_blue(&display), 2);
}

#[test]
fn move_only_substitutes_but_never_styles() {
    let mut fx = Fixture::new("a\tb\n")
        .with_selections(vec![Selection::at(coord(0, 0))], 0);
    fx.scope.options.set("tabstop", OptionValue::Int(4));
    fx.scope.registers.set('/', "b");

    let registry = builtin_registry();
    let mut root = HighlighterGroup::new();
    for (name, params) in [
        ("show_whitespaces", vec![]),
        ("search", vec![]),
        ("fill", vec!["yellow".to_string()]),
    ] {
        let (id, hl) = registry.build(name, &params, &fx.scope).unwrap();
        root.add(id, hl).unwrap();
    }

    let mut display = fx.display(0, 1);
    root.apply(&fx.ctx(), HighlightFlags::MoveOnly, &mut display);

    // layout changed: tab replaced by the glyph run, newline by ¬
    assert_eq!(contents(&display), vec![vec!["a", "→  ", "b", "¬"]]);
    // but no atom got a face
    for atom in display.lines()[0].atoms() {
        assert_eq!(atom.face, Face::default());
    }
}

#[test]
fn highlighting_twice_is_idempotent() {
    let mut fx = Fixture::new("let a = \"s\";\n");
    fx.scope.registers.set('/', "a");
    let registry = builtin_registry();
    let mut root = HighlighterGroup::new();
    for (name, params) in [
        ("fill", vec!["yellow".to_string()]),
        ("regex", vec![r"let".to_string(), "0:red".to_string()]),
        ("search", vec![]),
    ] {
        let (id, hl) = registry.build(name, &params, &fx.scope).unwrap();
        root.add(id, hl).unwrap();
    }

    let mut once = fx.display(0, 1);
    root.apply(&fx.ctx(), HighlightFlags::Highlight, &mut once);

    let mut twice = fx.display(0, 1);
    root.apply(&fx.ctx(), HighlightFlags::Highlight, &mut twice);
    root.apply(&fx.ctx(), HighlightFlags::Highlight, &mut twice);

    once.optimize();
    twice.optimize();
    assert_eq!(contents(&once), contents(&twice));
    let faces_of = |d: &core_display::DisplayBuffer<'_>| {
        d.lines()
            .iter()
            .flat_map(|l| l.atoms())
            .map(|a| a.face)
            .collect::<Vec<_>>()
    };
    assert_eq!(faces_of(&once), faces_of(&twice));
}

#[test]
fn empty_buffer_is_a_noop_for_every_builtin() {
    let mut fx = Fixture::new("");
    fx.scope
        .options
        .set("flags", OptionValue::LineFlags(vec![]));
    fx.scope
        .options
        .set("hl_line", OptionValue::Int(1));
    fx.scope
        .options
        .set("pat", OptionValue::Regex("x".into()));
    let registry = builtin_registry();

    let builds: Vec<(&str, Vec<String>)> = vec![
        ("number_lines", vec![]),
        ("show_matching", vec![]),
        ("show_whitespaces", vec![]),
        ("fill", vec!["yellow".into()]),
        ("regex", vec!["x".into(), "0:red".into()]),
        ("regex_option", vec!["pat".into(), "red".into()]),
        ("search", vec![]),
        ("flag_lines", vec!["black".into(), "flags".into()]),
        ("line_option", vec!["hl_line".into(), "blue".into()]),
        ("ref", vec!["missing".into()]),
    ];
    for (name, params) in builds {
        let (_, hl) = registry.build(name, &params, &fx.scope).unwrap();
        // viewport entirely past the single empty line
        let mut display = fx.display(5, 2);
        hl.apply(&fx.ctx(), HighlightFlags::Highlight, &mut display);
        assert!(
            display.lines().iter().all(|l| l.atoms().is_empty()),
            "{name} emitted atoms past the end of the buffer"
        );
    }
}
