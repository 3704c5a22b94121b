// SPDX-License-Identifier: LGPL-3.0-only

//! Game server packets.

use log::debug;

use crate::cursor::Cursor;
use crate::types::Str;
use crate::Error;

/// Game server reply to [`GetStatus`](crate::game::GetStatus).
///
/// The reply is an info string with server cvars followed by one line per
/// connected player in the form `<score> <ping> "<name>"`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StatusResponse<'a> {
    info: Vec<(&'a str, &'a str)>,
    players: Vec<Player<'a>>,
}

/// A player line from [`StatusResponse`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Player<'a> {
    /// Score.
    pub score: i32,
    /// Latency between the server and the player.
    pub ping: u32,
    /// Name with colour codes.
    pub name: &'a str,
}

impl<'a> Player<'a> {
    fn parse(line: &'a str) -> Option<Self> {
        let mut it = line.splitn(3, ' ');
        let score = it.next()?.parse().ok()?;
        let ping = it.next()?.parse().ok()?;
        let name = it.next().unwrap_or_default().trim_matches('"');
        Some(Self { score, ping, name })
    }
}

impl StatusResponse<'_> {
    /// Packet header.
    pub const HEADER: &'static [u8] = b"\xff\xff\xff\xffstatusResponse\n";
}

impl<'a> StatusResponse<'a> {
    /// Decode packet from `src`.
    pub fn decode(src: &'a [u8]) -> Result<Self, Error> {
        let mut cur = Cursor::new(src);
        cur.expect(Self::HEADER)?;

        let mut ret = Self::default();
        while let Some((key, value)) = cur.info_pair()? {
            match (std::str::from_utf8(key), std::str::from_utf8(value)) {
                (Ok(key), Ok(value)) => ret.info.push((key, value)),
                _ => debug!("Invalid status cvar \"{}\" = \"{}\"", Str(key), Str(value)),
            }
        }

        while let Some(line) = cur.line() {
            if line.is_empty() {
                continue;
            }
            match std::str::from_utf8(line).ok().and_then(Player::parse) {
                Some(player) => ret.players.push(player),
                None => debug!("Invalid status player line \"{}\"", Str(line)),
            }
        }

        Ok(ret)
    }

    /// Returns the value of the cvar `key`.
    pub fn get(&self, key: &str) -> Option<&'a str> {
        self.info
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|&(_, v)| v)
    }

    /// Iterator over all server cvars in packet order.
    pub fn info(&self) -> impl Iterator<Item = (&'a str, &'a str)> + '_ {
        self.info.iter().copied()
    }

    /// Connected players.
    pub fn players(&self) -> &[Player<'a>] {
        &self.players
    }

    /// Server name with colour codes.
    pub fn hostname(&self) -> Option<&'a str> {
        self.get("sv_hostname")
    }

    /// Current map.
    pub fn map(&self) -> Option<&'a str> {
        self.get("mapname")
    }

    /// Game modification name, e.g. `MBII`.
    pub fn gamename(&self) -> Option<&'a str> {
        self.get("gamename")
    }

    /// Raw `g_gametype` value.
    pub fn gametype(&self) -> Option<u32> {
        self.get("g_gametype").and_then(|s| s.trim().parse().ok())
    }

    /// Maximum number of players.
    pub fn max_clients(&self) -> Option<u32> {
        self.get("sv_maxclients").and_then(|s| s.trim().parse().ok())
    }

    /// Returns `true` if the server requires a password.
    pub fn need_password(&self) -> bool {
        matches!(self.get("g_needpass").map(str::trim), Some(s) if s != "0" && !s.is_empty())
    }
}

/// Returns a display name of a Jedi Academy game type.
pub fn gametype_name(gametype: u32) -> Option<&'static str> {
    Some(match gametype {
        0 => "FFA",
        1 => "Holocron",
        2 => "Jedi Master",
        3 => "Duel",
        4 => "Power Duel",
        5 => "Single Player",
        6 => "Team FFA",
        7 => "Siege",
        8 => "CTF",
        9 => "CTY",
        _ => return None,
    })
}
