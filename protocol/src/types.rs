// SPDX-License-Identifier: LGPL-3.0-only
// SPDX-FileCopyrightText: 2023 Denis Drakhnia <numas13@gmail.com>

//! Helper types.

use std::ascii;
use std::fmt::{self, Write};

/// Raw packet bytes printed for logs.
///
/// Bytes outside printable ASCII are written as `\xNN`, so a reply from a
/// misbehaving server can be logged safely.
#[derive(Copy, Clone, PartialEq, Eq)]
pub struct Str<'a>(pub &'a [u8]);

impl fmt::Display for Str<'_> {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        self.0
            .iter()
            .flat_map(|&c| ascii::escape_default(c))
            .try_for_each(|c| fmt.write_char(c as char))
    }
}

impl fmt::Debug for Str<'_> {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        write!(fmt, "b\"{}\"", self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escape_bytes() {
        let s = Str(b"\xff\xff\xff\xffgetstatus\n");
        assert_eq!(s.to_string(), "\\xff\\xff\\xff\\xffgetstatus\\n");
        assert_eq!(Str(b"map mb2_dotf").to_string(), "map mb2_dotf");
        assert_eq!(format!("{:?}", Str(b"a\\b")), "b\"a\\\\b\"");
    }
}
