// Copyright 2023-2025 the tabiya developers.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Board height assumed by the algebraic codec when no explicit height is
/// given. Only the string conversion depends on it.
pub const DEFAULT_ROWS: i32 = 8;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoordParseError {
    #[error("malformed coordinate: {0}")]
    Malformed(String),
}

/// A zero-based (file, rank) pair. `y` counts from the top of the board,
/// so on an 8-row board rank 8 is `y = 0` and rank 1 is `y = 7`, the
/// order in which FEN lists its ranks.
///
/// A `Coord` is a plain value: out-of-range coordinates may exist (they
/// arise naturally while stepping rays off the edge) and are rejected by
/// board lookups rather than by construction.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Coord {
    pub x: i32,
    pub y: i32,
}

impl Coord {
    pub const fn new(x: i32, y: i32) -> Coord {
        Coord { x, y }
    }

    /// Parses an algebraic coordinate such as `e4` against a board of the
    /// given height. The file letter must fall inside the board and the
    /// rank must be a digit sequence not starting with `0`; ranks beyond
    /// the board are preserved as out-of-range values.
    pub fn from_algebraic(s: &str, rows: i32) -> Result<Coord, CoordParseError> {
        let malformed = || CoordParseError::Malformed(s.to_string());

        let mut chars = s.chars();
        let file = match chars.next() {
            Some(c) if c.is_ascii_lowercase() && ((c as i32) - ('a' as i32)) < rows => {
                (c as i32) - ('a' as i32)
            }
            _ => return Err(malformed()),
        };

        let digits = chars.as_str();
        if digits.is_empty() || digits.starts_with('0') || !digits.bytes().all(|b| b.is_ascii_digit())
        {
            return Err(malformed());
        }

        let rank: i32 = digits.parse().map_err(|_| malformed())?;
        let y = if rank > rows { rank } else { rows - rank };
        Ok(Coord::new(file, y))
    }

    /// Renders this coordinate in algebraic form against a board of the
    /// given height. The inverse of [`Coord::from_algebraic`] for every
    /// in-range coordinate.
    pub fn to_algebraic(self, rows: i32) -> String {
        let file = ((b'a' as i32 + self.x) as u8) as char;
        format!("{}{}", file, (self.y - rows).abs())
    }

    /// Returns a new coordinate displaced by the given file and rank
    /// deltas.
    pub const fn offset_by(self, dx: i32, dy: i32) -> Coord {
        Coord::new(self.x + dx, self.y + dy)
    }

    /// Mirrors the coordinate through the center of a square board of the
    /// given height, as seen from the other player's side.
    pub fn rotate(self, rows: i32) -> Coord {
        Coord::new((self.x - (rows - 1)).abs(), (self.y - (rows - 1)).abs())
    }

    /// True when `other` lies to the north of this coordinate. With
    /// `Some(n)`, true only when it lies exactly `n` ranks north.
    pub fn is_north_to(self, other: Coord, range: Option<i32>) -> bool {
        match range {
            Some(n) => self.y == other.y + n,
            None => self.y > other.y,
        }
    }

    /// True when `other` lies to the south of this coordinate. With
    /// `Some(n)`, true only when it lies exactly `n` ranks south.
    pub fn is_south_to(self, other: Coord, range: Option<i32>) -> bool {
        match range {
            Some(n) => self.y == other.y - n,
            None => self.y < other.y,
        }
    }

    /// True when `other` lies to the west of this coordinate. With
    /// `Some(n)`, true only when it lies exactly `n` files west.
    pub fn is_west_to(self, other: Coord, range: Option<i32>) -> bool {
        match range {
            Some(n) => self.x == other.x + n,
            None => self.x > other.x,
        }
    }

    /// True when `other` lies to the east of this coordinate. With
    /// `Some(n)`, true only when it lies exactly `n` files east.
    pub fn is_east_to(self, other: Coord, range: Option<i32>) -> bool {
        match range {
            Some(n) => self.x == other.x - n,
            None => self.x < other.x,
        }
    }

    /// True when `other` shares a diagonal with this coordinate. With
    /// `Some(n)`, the diagonal distance must be exactly `n`.
    pub fn is_diagonal_to(self, other: Coord, range: Option<i32>) -> bool {
        let dx = (other.x - self.x).abs();
        let dy = (other.y - self.y).abs();
        dx == dy && dx > 0 && range.map_or(true, |n| dx == n)
    }

    /// True when `other` shares a file with this coordinate. With
    /// `Some(n)`, the rank distance must be exactly `n`.
    pub fn is_vertical_to(self, other: Coord, range: Option<i32>) -> bool {
        let dy = (other.y - self.y).abs();
        self.x == other.x && dy > 0 && range.map_or(true, |n| dy == n)
    }

    /// True when `other` shares a rank with this coordinate. With
    /// `Some(n)`, the file distance must be exactly `n`.
    pub fn is_horizontal_to(self, other: Coord, range: Option<i32>) -> bool {
        let dx = (other.x - self.x).abs();
        self.y == other.y && dx > 0 && range.map_or(true, |n| dx == n)
    }

    /// True when both the file and rank distances to `other` are at most
    /// `range`.
    pub fn is_within_range(self, other: Coord, range: i32) -> bool {
        (other.x - self.x).abs() <= range && (other.y - self.y).abs() <= range
    }

    /// True when `other` is a knight's jump away: neither on a line nor a
    /// diagonal with this coordinate, yet within two squares.
    pub fn is_knight_move_to(self, other: Coord) -> bool {
        !self.is_diagonal_to(other, None)
            && !self.is_vertical_to(other, None)
            && !self.is_horizontal_to(other, None)
            && self != other
            && self.is_within_range(other, 2)
    }

    /// True when `other` is exactly `range` king steps away (Chebyshev
    /// distance), defaulting to one. A coordinate is never adjacent to
    /// itself.
    pub fn is_adjacent_to(self, other: Coord, range: Option<i32>) -> bool {
        let n = range.unwrap_or(1);
        let chebyshev = (other.x - self.x).abs().max((other.y - self.y).abs());
        self != other && chebyshev == n
    }
}

impl fmt::Display for Coord {
    /// Renders against the default board height; positions on other board
    /// sizes should go through [`Coord::to_algebraic`].
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_algebraic(DEFAULT_ROWS))
    }
}
