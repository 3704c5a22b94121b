// SPDX-License-Identifier: GPL-3.0-only

//! Matching of free-text mod names from server listings.

use mbii_protocol::color;
use serde::Deserialize;

/// Selector that matches every server.
pub const ALL: &str = "All";

const ALL_LEGACY: &str = "All Mods";

/// Normalizes `text` for comparison.
///
/// Colour codes and HTML entities are removed, the text is lowercased, every
/// character except ASCII letters, digits and spaces is dropped and runs of
/// whitespace are collapsed into a single space.
pub fn sanitize(text: &str) -> String {
    let text = color::trim_color(text).to_lowercase();
    let mut out = String::with_capacity(text.len());
    let mut chars = text.char_indices().peekable();
    while let Some((i, c)) = chars.next() {
        if c == '&' {
            if let Some(len) = entity_len(&text[i..]) {
                // `&nbsp;` and friends separate words
                out.push(' ');
                while chars.peek().map_or(false, |&(j, _)| j < i + len) {
                    chars.next();
                }
                continue;
            }
        }
        if c.is_whitespace() {
            out.push(' ');
        } else if c.is_ascii_lowercase() || c.is_ascii_digit() {
            out.push(c);
        }
    }
    out.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Returns the byte length of an HTML entity at the start of `s`.
fn entity_len(s: &str) -> Option<usize> {
    let body = s.strip_prefix('&')?;
    let body = body.strip_prefix('#').unwrap_or(body);
    let end = body.find(';')?;
    let name = &body[..end];
    let valid = !name.is_empty() && name.len() <= 8 && name.bytes().all(|c| c.is_ascii_alphanumeric());
    valid.then(|| s.len() - body.len() + end + 1)
}

/// A mod selector with the strings that identify it in listings.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ModAlias {
    pub name: String,
    pub aliases: Vec<String>,
}

impl ModAlias {
    pub fn new<I, S>(name: &str, aliases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.to_owned(),
            aliases: aliases.into_iter().map(Into::into).collect(),
        }
    }
}

/// Mod selectors available for filtering.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ModTable {
    mods: Vec<ModAlias>,
}

impl Default for ModTable {
    fn default() -> Self {
        Self::new(default_mods())
    }
}

pub fn default_mods() -> Vec<ModAlias> {
    vec![
        ModAlias::new(
            "Movie Battles II",
            ["movie battles", "moviebattles", "Movie Battles", "mb2", "mbii"],
        ),
        ModAlias::new("basejk", ["basejk", "basejka", "base"]),
        ModAlias::new("OpenJK", ["openjk", "ojk"]),
    ]
}

impl ModTable {
    pub fn new(mods: Vec<ModAlias>) -> Self {
        Self { mods }
    }

    /// Returns `true` if `selector` disables filtering.
    pub fn is_all(selector: &str) -> bool {
        let selector = selector.trim();
        selector.is_empty()
            || selector.eq_ignore_ascii_case(ALL)
            || selector.eq_ignore_ascii_case(ALL_LEGACY)
    }

    /// Selector names, `All` first and the rest sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<_> = self.mods.iter().map(|i| i.name.as_str()).collect();
        names.sort_unstable_by_key(|s| s.to_lowercase());
        names.insert(0, ALL);
        names
    }

    /// Sanitized aliases for `selector`.
    ///
    /// An unknown selector is its own alias.
    fn aliases(&self, selector: &str) -> Vec<String> {
        let selector = selector.trim();
        let aliases = match self
            .mods
            .iter()
            .find(|i| i.name.eq_ignore_ascii_case(selector))
        {
            Some(entry) => entry.aliases.iter().map(|s| sanitize(s)).collect(),
            None => vec![sanitize(selector)],
        };
        aliases.into_iter().filter(|s| !s.is_empty()).collect()
    }

    /// Builds a predicate over raw mod names for `selector`.
    pub fn matcher(&self, selector: &str) -> impl Fn(&str) -> bool {
        let all = Self::is_all(selector);
        let aliases = self.aliases(selector);
        move |mod_name: &str| {
            if all {
                return true;
            }
            let mod_name = sanitize(mod_name);
            aliases.iter().any(|alias| mod_name.contains(alias.as_str()))
        }
    }
}
