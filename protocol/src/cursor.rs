// SPDX-License-Identifier: LGPL-3.0-only
// SPDX-FileCopyrightText: 2023 Denis Drakhnia <numas13@gmail.com>

//! Byte-level reading and writing of connectionless packets.

use std::fmt::{self, Write};

use thiserror::Error;

/// The error type for reading and writing packet bytes.
#[derive(Error, Copy, Clone, Debug, PartialEq, Eq)]
pub enum CursorError {
    /// The packet ended in the middle of a field.
    #[error("Unexpected end of packet")]
    UnexpectedEnd,
    /// The packet does not start with the expected bytes.
    #[error("Unexpected packet header")]
    Mismatch,
    /// The packet has bytes after its last field.
    #[error("Trailing bytes after packet")]
    TrailingBytes,
    /// An info string key is not framed by backslashes.
    #[error("Invalid info string key")]
    InvalidKey,
    /// The output buffer is too small.
    #[error("Output buffer is too small")]
    Overflow,
}

pub type Result<T, E = CursorError> = std::result::Result<T, E>;

/// Reader over a received datagram.
#[derive(Copy, Clone, Debug)]
pub struct Cursor<'a> {
    buf: &'a [u8],
}

impl<'a> Cursor<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf }
    }

    /// Unread bytes.
    pub fn rest(&self) -> &'a [u8] {
        self.buf
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        if n > self.buf.len() {
            return Err(CursorError::UnexpectedEnd);
        }
        let (head, tail) = self.buf.split_at(n);
        self.buf = tail;
        Ok(head)
    }

    pub fn take_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut ret = [0; N];
        ret.copy_from_slice(self.take(N)?);
        Ok(ret)
    }

    pub fn take_u16_be(&mut self) -> Result<u16> {
        self.take_array().map(u16::from_be_bytes)
    }

    /// Consumes `prefix` or fails without moving.
    pub fn expect(&mut self, prefix: &[u8]) -> Result<()> {
        match self.buf.strip_prefix(prefix) {
            Some(tail) => {
                self.buf = tail;
                Ok(())
            }
            None => Err(CursorError::Mismatch),
        }
    }

    pub fn expect_end(&self) -> Result<()> {
        if self.buf.is_empty() {
            Ok(())
        } else {
            Err(CursorError::TrailingBytes)
        }
    }

    /// Reads up to the next `\n` and consumes it. An unterminated tail counts
    /// as the last line.
    pub fn line(&mut self) -> Option<&'a [u8]> {
        if self.buf.is_empty() {
            return None;
        }
        let (line, tail) = match self.buf.iter().position(|&c| c == b'\n') {
            Some(i) => (&self.buf[..i], &self.buf[i + 1..]),
            None => (self.buf, &[][..]),
        };
        self.buf = tail;
        Some(line)
    }

    /// Reads one `\key\value` pair of an info string.
    ///
    /// Returns `None` and consumes the terminating `\n` at the end of the
    /// string. A value runs until the next `\`, `\n` or the end of the packet.
    pub fn info_pair(&mut self) -> Result<Option<(&'a [u8], &'a [u8])>> {
        match self.buf.first() {
            None => return Ok(None),
            Some(b'\n') => {
                self.buf = &self.buf[1..];
                return Ok(None);
            }
            Some(b'\\') => {}
            Some(_) => return Err(CursorError::InvalidKey),
        }
        let body = &self.buf[1..];
        let key_len = body
            .iter()
            .position(|&c| c == b'\\' || c == b'\n')
            .filter(|&i| body[i] == b'\\')
            .ok_or(CursorError::InvalidKey)?;
        let (key, body) = (&body[..key_len], &body[key_len + 1..]);
        let value_len = body
            .iter()
            .position(|&c| c == b'\\' || c == b'\n')
            .unwrap_or(body.len());
        let (value, tail) = body.split_at(value_len);
        self.buf = tail;
        Ok(Some((key, value)))
    }
}

/// Writer of an outgoing datagram into a fixed buffer.
pub struct CursorMut<'a> {
    buf: &'a mut [u8],
    pos: usize,
}

impl<'a> CursorMut<'a> {
    pub fn new(buf: &'a mut [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Number of bytes written.
    pub fn pos(&self) -> usize {
        self.pos
    }

    pub fn put(&mut self, bytes: &[u8]) -> Result<&mut Self> {
        let end = self.pos + bytes.len();
        self.buf
            .get_mut(self.pos..end)
            .ok_or(CursorError::Overflow)?
            .copy_from_slice(bytes);
        self.pos = end;
        Ok(self)
    }

    /// Writes the text form of `value`.
    pub fn put_display(&mut self, value: impl fmt::Display) -> Result<&mut Self> {
        write!(self, "{}", value).map_err(|_| CursorError::Overflow)?;
        Ok(self)
    }
}

impl Write for CursorMut<'_> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.put(s.as_bytes()).map(|_| ()).map_err(|_| fmt::Error)
    }
}
