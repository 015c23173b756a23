//! Faces: a foreground color, a background color and an attribute set.
//!
//! Highlighters never paint cells directly; they overlay faces onto display
//! atoms and the drawing backend translates the final face per atom. Overlay
//! semantics: a non-default color replaces, attributes accumulate.
//!
//! Faces are usually referred to by spec string. A spec is either an alias
//! registered in the [`FaceRegistry`] (`LineNumbers`, `Search`, …) or a
//! literal `fg[,bg][+attributes]` where colors are names, `rgb:RRGGBB` or
//! `default`, and attributes are single letters.

use std::collections::HashMap;

use anyhow::{bail, Context, Result};
use bitflags::bitflags;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Color {
    #[default]
    Default,
    Black,
    Red,
    Green,
    Yellow,
    Blue,
    Magenta,
    Cyan,
    White,
    Rgb {
        r: u8,
        g: u8,
        b: u8,
    },
}

impl Color {
    /// Parse a color name or `rgb:RRGGBB`.
    pub fn parse(s: &str) -> Result<Color> {
        let color = match s {
            "default" => Color::Default,
            "black" => Color::Black,
            "red" => Color::Red,
            "green" => Color::Green,
            "yellow" => Color::Yellow,
            "blue" => Color::Blue,
            "magenta" => Color::Magenta,
            "cyan" => Color::Cyan,
            "white" => Color::White,
            _ => {
                let Some(hex) = s.strip_prefix("rgb:") else {
                    bail!("unknown color '{s}'");
                };
                if hex.len() != 6 {
                    bail!("expected 6 hex digits in '{s}'");
                }
                let parse = |range: std::ops::Range<usize>| {
                    u8::from_str_radix(&hex[range], 16)
                        .with_context(|| format!("invalid hex digits in '{s}'"))
                };
                Color::Rgb {
                    r: parse(0..2)?,
                    g: parse(2..4)?,
                    b: parse(4..6)?,
                }
            }
        };
        Ok(color)
    }
}

bitflags! {
    /// Text attributes; `empty()` is the normal rendition.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Attribute: u8 {
        const BOLD      = 1 << 0;
        const UNDERLINE = 1 << 1;
        const REVERSE   = 1 << 2;
        const BLINK     = 1 << 3;
        const DIM       = 1 << 4;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Face {
    pub fg: Color,
    pub bg: Color,
    pub attributes: Attribute,
}

impl Face {
    pub const fn new(fg: Color, bg: Color) -> Face {
        Face {
            fg,
            bg,
            attributes: Attribute::empty(),
        }
    }

    pub const fn with_attributes(fg: Color, bg: Color, attributes: Attribute) -> Face {
        Face { fg, bg, attributes }
    }

    /// Overlay `other` on top of this face: non-default colors replace, the
    /// attribute sets are combined.
    pub fn overlay(&mut self, other: Face) {
        if other.fg != Color::Default {
            self.fg = other.fg;
        }
        if other.bg != Color::Default {
            self.bg = other.bg;
        }
        self.attributes |= other.attributes;
    }
}

/// Named face aliases plus literal spec parsing.
pub struct FaceRegistry {
    aliases: HashMap<String, Face, ahash::RandomState>,
}

impl Default for FaceRegistry {
    fn default() -> Self {
        let mut reg = FaceRegistry {
            aliases: HashMap::default(),
        };
        reg.register("LineNumbers", Face::new(Color::Yellow, Color::Default));
        reg.register(
            "Search",
            Face::with_attributes(Color::Default, Color::Default, Attribute::UNDERLINE),
        );
        reg.register(
            "MatchingChar",
            Face::with_attributes(Color::Default, Color::Default, Attribute::BOLD),
        );
        reg.register("PrimarySelection", Face::new(Color::White, Color::Blue));
        reg.register("SecondarySelection", Face::new(Color::Black, Color::Blue));
        reg.register("PrimaryCursor", Face::new(Color::Black, Color::White));
        reg.register("SecondaryCursor", Face::new(Color::Black, Color::White));
        reg
    }
}

impl FaceRegistry {
    pub fn new() -> FaceRegistry {
        FaceRegistry::default()
    }

    /// Register or redefine an alias.
    pub fn register(&mut self, name: impl Into<String>, face: Face) {
        self.aliases.insert(name.into(), face);
    }

    /// Resolve a face spec: alias lookup first, else literal parse. Errors on
    /// anything that is neither.
    pub fn resolve(&self, spec: &str) -> Result<Face> {
        if let Some(face) = self.aliases.get(spec) {
            return Ok(*face);
        }
        parse_face_spec(spec)
    }
}

/// Parse a literal `fg[,bg][+attributes]` spec.
fn parse_face_spec(spec: &str) -> Result<Face> {
    let (colors, attrs) = match spec.split_once('+') {
        Some((c, a)) => (c, a),
        None => (spec, ""),
    };
    let (fg, bg) = match colors.split_once(',') {
        Some((fg, bg)) => (Color::parse(fg)?, Color::parse(bg)?),
        None if colors.is_empty() => (Color::Default, Color::Default),
        None => (Color::parse(colors)?, Color::Default),
    };
    let mut attributes = Attribute::empty();
    for c in attrs.chars() {
        attributes |= match c {
            'b' => Attribute::BOLD,
            'u' => Attribute::UNDERLINE,
            'r' => Attribute::REVERSE,
            'B' => Attribute::BLINK,
            'd' => Attribute::DIM,
            _ => bail!("unknown attribute '{c}' in face spec '{spec}'"),
        };
    }
    Ok(Face {
        fg,
        bg,
        attributes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_literal_specs() {
        let reg = FaceRegistry::new();
        assert_eq!(
            reg.resolve("yellow").unwrap(),
            Face::new(Color::Yellow, Color::Default)
        );
        assert_eq!(
            reg.resolve("red,black+bu").unwrap(),
            Face::with_attributes(
                Color::Red,
                Color::Black,
                Attribute::BOLD | Attribute::UNDERLINE
            )
        );
        assert_eq!(
            reg.resolve("rgb:1a2B3c").unwrap(),
            Face::new(
                Color::Rgb {
                    r: 0x1a,
                    g: 0x2b,
                    b: 0x3c
                },
                Color::Default
            )
        );
    }

    #[test]
    fn rejects_malformed_specs() {
        let reg = FaceRegistry::new();
        assert!(reg.resolve("chartreuse-ish").is_err());
        assert!(reg.resolve("rgb:12345").is_err());
        assert!(reg.resolve("red+x").is_err());
    }

    #[test]
    fn aliases_take_precedence() {
        let mut reg = FaceRegistry::new();
        assert!(reg.resolve("Search").is_ok());
        reg.register("yellow", Face::new(Color::Red, Color::Default));
        // a registered alias shadows the literal color of the same name
        assert_eq!(reg.resolve("yellow").unwrap().fg, Color::Red);
    }

    #[test]
    fn overlay_replaces_non_default_and_merges_attributes() {
        let mut face = Face::with_attributes(Color::Red, Color::Black, Attribute::BOLD);
        face.overlay(Face::with_attributes(
            Color::Default,
            Color::Blue,
            Attribute::DIM,
        ));
        assert_eq!(face.fg, Color::Red);
        assert_eq!(face.bg, Color::Blue);
        assert_eq!(face.attributes, Attribute::BOLD | Attribute::DIM);
    }
}
