//! Font enumeration defense
//!
//! `document.fonts.check` answers `false` for any family outside a fixed list
//! of fonts present on practically every desktop, so probing for installed
//! fonts only ever reveals the common set.

use std::rc::Rc;

use crate::capability::{CapResult, CapabilityError, FontsApi, FontsSlot, PageHost};

pub const STANDARD_FONTS: &[&str] = &[
    "Arial",
    "Arial Black",
    "Comic Sans MS",
    "Courier",
    "Courier New",
    "Georgia",
    "Helvetica",
    "Impact",
    "Lucida Console",
    "Lucida Sans Unicode",
    "Palatino Linotype",
    "Tahoma",
    "Times",
    "Times New Roman",
    "Trebuchet MS",
    "Verdana",
];

const GENERIC_FAMILIES: &[&str] = &[
    "serif",
    "sans-serif",
    "monospace",
    "cursive",
    "fantasy",
    "system-ui",
    "ui-serif",
    "ui-sans-serif",
    "ui-monospace",
    "emoji",
    "math",
];

/// Family names from a CSS `font` shorthand such as
/// `italic bold 12px/1.5 "Fira Code", monospace`.
pub fn font_families(font: &str) -> Vec<String> {
    let mut rest = font.trim();
    // Skip style, weight and size tokens up to and including the size.
    loop {
        let (token, tail) = match rest.find(char::is_whitespace) {
            Some(i) => (&rest[..i], rest[i..].trim_start()),
            None => break,
        };
        if token.starts_with('"') || token.starts_with('\'') || token.ends_with(',') {
            break;
        }
        rest = tail;
        if token.starts_with(|c: char| c.is_ascii_digit() || c == '.') {
            break;
        }
    }

    rest.split(',')
        .map(|family| family.trim().trim_matches(|c| c == '"' || c == '\'').trim())
        .filter(|family| !family.is_empty())
        .map(str::to_string)
        .collect()
}

pub fn is_standard_family(family: &str) -> bool {
    STANDARD_FONTS.iter().chain(GENERIC_FAMILIES).any(|known| known.eq_ignore_ascii_case(family))
}

pub struct StandardFontsOnly {
    inner: FontsSlot,
}

impl FontsApi for StandardFontsOnly {
    fn check(&self, font: &str, text: Option<&str>) -> CapResult<bool> {
        if font_families(font).iter().any(|family| !is_standard_family(family)) {
            return Ok(false);
        }
        self.inner.check(font, text)
    }
}

pub fn install<P: PageHost>(host: &P) -> CapResult<()> {
    let inner = host.fonts().ok_or(CapabilityError::Unavailable("document.fonts"))?;
    host.set_fonts(Rc::new(StandardFontsOnly { inner }))
}
