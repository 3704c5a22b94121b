// SPDX-License-Identifier: LGPL-3.0-only

#![deny(missing_docs)]

//! Out-of-band protocol between Jedi Academy clients, game servers and masters.
//!
//! Movie Battles II runs on the Jedi Academy engine, which speaks the Quake III
//! connectionless protocol: every packet starts with four `0xff` bytes followed
//! by an ASCII command.

mod cursor;

pub mod color;
pub mod game;
pub mod master;
pub mod server;
pub mod types;

pub use cursor::CursorError;

use thiserror::Error;

/// Prefix of every connectionless packet.
pub const OOB_HEADER: &[u8] = b"\xff\xff\xff\xff";

/// Jedi Academy network protocol version (1.01).
pub const PROTOCOL_VERSION: u32 = 26;

/// Default UDP port of Jedi Academy masters and servers.
pub const DEFAULT_PORT: u16 = 29070;

/// The error type for decoding and encoding packets.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum Error {
    /// Failed to decode a packet.
    #[error("Invalid packet")]
    InvalidPacket,
    /// Cursor error.
    #[error("{0}")]
    CursorError(#[from] CursorError),
}
