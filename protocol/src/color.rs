// SPDX-License-Identifier: LGPL-3.0-only
// SPDX-FileCopyrightText: 2023 Denis Drakhnia <numas13@gmail.com>

//! Colour codes in player and server names.
//!
//! The engine treats `^` followed by a digit as a colour escape. Only the low
//! three bits of the digit are used, so `^8` is black and `^9` is red again.

use std::borrow::Cow;

/// Colour selected by an escape sequence.
#[allow(missing_docs)]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Color {
    Black,
    Red,
    Green,
    Yellow,
    Blue,
    Cyan,
    Magenta,
    White,
}

impl TryFrom<&str> for Color {
    type Error = ();

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let digit = match value.as_bytes() {
            [b'^', c] if c.is_ascii_digit() => (c - b'0') & 7,
            _ => return Err(()),
        };
        Ok(match digit {
            0 => Self::Black,
            1 => Self::Red,
            2 => Self::Green,
            3 => Self::Yellow,
            4 => Self::Blue,
            5 => Self::Cyan,
            6 => Self::Magenta,
            _ => Self::White,
        })
    }
}

/// Returns `true` if `s` starts with a colour escape.
#[inline]
pub fn is_color_code(s: &str) -> bool {
    matches!(s.as_bytes(), [b'^', c, ..] if c.is_ascii_digit())
}

/// Splits a leading colour escape from `s`.
#[inline]
pub fn trim_start_color(s: &str) -> (&str, &str) {
    let n = if is_color_code(s) { 2 } else { 0 };
    s.split_at(n)
}

/// Iterator over `(colour code, text)` runs of a string.
///
/// The colour code is empty for the first run if the string does not start
/// with an escape.
pub struct ColorIter<'a> {
    inner: &'a str,
}

impl<'a> ColorIter<'a> {
    /// Creates a new `ColorIter`.
    pub fn new(inner: &'a str) -> Self {
        Self { inner }
    }
}

impl<'a> Iterator for ColorIter<'a> {
    type Item = (&'a str, &'a str);

    fn next(&mut self) -> Option<Self::Item> {
        if self.inner.is_empty() {
            return None;
        }
        let mut start = self.inner.chars().next().map_or(1, char::len_utf8);
        let i = loop {
            match self.inner[start..].find('^') {
                Some(p) if is_color_code(&self.inner[start + p..]) => break start + p,
                Some(p) => start += p + 1,
                None => break self.inner.len(),
            }
        };
        let (head, tail) = self.inner.split_at(i);
        let (color, text) = trim_start_color(head);
        self.inner = tail;
        Some((color, text))
    }
}

/// Removes all colour escapes from `s`.
pub fn trim_color(s: &str) -> Cow<'_, str> {
    let (_, s) = trim_start_color(s);
    if !s.contains('^') {
        return Cow::Borrowed(s);
    }

    let mut out = String::with_capacity(s.len());
    for (_, s) in ColorIter::new(s) {
        out.push_str(s);
    }

    Cow::Owned(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trim_start_colors() {
        assert_eq!(trim_start_color("foo^2bar"), ("", "foo^2bar"));
        assert_eq!(trim_start_color("^foo^2bar"), ("", "^foo^2bar"));
        assert_eq!(trim_start_color("^1foo^2bar"), ("^1", "foo^2bar"));
    }

    #[test]
    fn trim_colors() {
        assert_eq!(trim_color("foo^2bar"), "foobar");
        assert_eq!(trim_color("^1Movie ^7Battles ^3II"), "Movie Battles II");
        assert_eq!(trim_color("^1foo^bar^3"), "foo^bar");
        assert_eq!(trim_color("^1foo^2bar^"), "foobar^");
        assert_eq!(trim_color("^foo^bar^"), "^foo^bar^");
        assert_eq!(trim_color("^^1x"), "^x");
    }

    #[test]
    fn multibyte_names() {
        assert_eq!(trim_color("é^1ß^2"), "éß");
        let runs: Vec<_> = ColorIter::new("ü^4x").collect();
        assert_eq!(runs, [("", "ü"), ("^4", "x")]);
    }

    #[test]
    fn color_digits_wrap() {
        assert_eq!(Color::try_from("^1"), Ok(Color::Red));
        assert_eq!(Color::try_from("^7"), Ok(Color::White));
        assert_eq!(Color::try_from("^8"), Ok(Color::Black));
        assert_eq!(Color::try_from("^9"), Ok(Color::Red));
        assert_eq!(Color::try_from("^a"), Err(()));
        assert_eq!(Color::try_from(""), Err(()));
    }
}
