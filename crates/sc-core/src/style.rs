//! Inline style declarations (`style="left: 10px; top: 4px"`).
//!
//! Inline style is the authoritative source of a node's geometry, so the
//! parser is strict about numbers: only plain or `px` lengths count as
//! usable geometry. Anything else (`auto`, `50%`, `calc(..)`) makes the
//! value unusable and callers fall back to the live bounding box.

use serde::{Deserialize, Serialize};
use winnow::ascii::multispace0;
use winnow::combinator::{eof, opt, terminated};
use winnow::error::ContextError;
use winnow::prelude::*;
use winnow::token::{take_till, take_while};

/// Ordered list of `property: value` declarations.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InlineStyle {
    decls: Vec<(String, String)>,
}

impl InlineStyle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse CSS declaration text. Malformed declarations are skipped, never
    /// fatal: a stray `;` or a property without a value does not discard the
    /// rest of the style.
    pub fn parse(text: &str) -> Self {
        let mut style = Self::new();
        let mut rest = text;
        while !rest.trim().is_empty() {
            match parse_declaration.parse_next(&mut rest) {
                Ok(Some((name, value))) => style.set(name, value),
                Ok(None) => {}
                Err(_) => {
                    // Skip to the next separator and carry on.
                    match rest.find(';') {
                        Some(pos) => rest = &rest[pos + 1..],
                        None => break,
                    }
                }
            }
        }
        style
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.decls
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Read a property as a pixel length.
    pub fn get_px(&self, name: &str) -> Option<f32> {
        self.get(name).and_then(parse_px)
    }

    /// Set a property, replacing an existing declaration in place so the
    /// declaration order stays stable.
    pub fn set(&mut self, name: &str, value: &str) {
        let name = to_kebab_case(name.trim());
        let value = value.trim().to_string();
        if let Some(slot) = self.decls.iter_mut().find(|(n, _)| *n == name) {
            slot.1 = value;
        } else {
            self.decls.push((name, value));
        }
    }

    pub fn set_px(&mut self, name: &str, px: f32) {
        self.set(name, &format_px(px));
    }

    pub fn remove(&mut self, name: &str) -> Option<String> {
        let pos = self.decls.iter().position(|(n, _)| n == name)?;
        Some(self.decls.remove(pos).1)
    }

    pub fn is_empty(&self) -> bool {
        self.decls.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.decls.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    /// Serialize back to declaration text.
    pub fn to_css(&self) -> String {
        self.decls
            .iter()
            .map(|(n, v)| format!("{n}: {v};"))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Parse a pixel length: `12`, `12px`, `-3.5px`. Non-finite results and
/// any other unit are rejected.
pub fn parse_px(value: &str) -> Option<f32> {
    let mut input = value.trim();
    let n = terminated(parse_number, (opt("px"), eof))
        .parse_next(&mut input)
        .ok()?;
    n.is_finite().then_some(n)
}

/// Format a pixel length the way the resize and drag handlers write it.
pub fn format_px(px: f32) -> String {
    if px.fract() == 0.0 {
        format!("{}px", px as i64)
    } else {
        format!("{px}px")
    }
}

/// `backgroundColor` → `background-color`. Already-kebab names pass through.
pub fn to_kebab_case(name: &str) -> String {
    if name.starts_with("--") {
        return name.to_string();
    }
    let mut out = String::with_capacity(name.len() + 4);
    for c in name.chars() {
        if c.is_ascii_uppercase() {
            out.push('-');
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

// ─── Low-level parsers ──────────────────────────────────────────────────

fn skip_space(input: &mut &str) {
    let _: Result<&str, winnow::error::ErrMode<ContextError>> = multispace0.parse_next(input);
}

fn parse_property_name<'a>(input: &mut &'a str) -> ModalResult<&'a str> {
    take_while(1.., |c: char| c.is_alphanumeric() || c == '-' || c == '_').parse_next(input)
}

/// One `name: value;` declaration. `Ok(None)` for an empty declaration.
fn parse_declaration<'a>(input: &mut &'a str) -> ModalResult<Option<(&'a str, &'a str)>> {
    skip_space(input);
    if input.starts_with(';') {
        *input = &input[1..];
        return Ok(None);
    }
    let name = parse_property_name.parse_next(input)?;
    skip_space(input);
    let _ = ':'.parse_next(input)?;
    let value: &str = take_till(0.., ';').parse_next(input)?;
    if input.starts_with(';') {
        *input = &input[1..];
    }
    let value = value.trim();
    if value.is_empty() {
        return Ok(None);
    }
    Ok(Some((name, value)))
}

fn parse_number(input: &mut &str) -> ModalResult<f32> {
    let start = *input;
    if input.starts_with('-') || input.starts_with('+') {
        *input = &input[1..];
    }
    let int: &str = take_while(0.., |c: char| c.is_ascii_digit()).parse_next(input)?;
    let mut frac_len = 0;
    if input.starts_with('.') {
        *input = &input[1..];
        let frac: &str = take_while(0.., |c: char| c.is_ascii_digit()).parse_next(input)?;
        frac_len = frac.len();
    }
    if int.is_empty() && frac_len == 0 {
        return Err(winnow::error::ErrMode::Backtrack(ContextError::new()));
    }
    let matched = &start[..start.len() - input.len()];
    matched
        .parse::<f32>()
        .map_err(|_| winnow::error::ErrMode::Backtrack(ContextError::new()))
}
