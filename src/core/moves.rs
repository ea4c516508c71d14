// Copyright 2023-2025 the tabiya developers.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};

use crate::core::{Color, Coord, PieceKind, DEFAULT_ROWS};

/// A move to be applied to a board: an origin, a destination, and the
/// options that shape how the transition is bookkept.
///
/// `special_moves` carries dependent sub-moves applied immediately after
/// the head move; castling is a king move whose special move is the rook
/// hop. Sub-moves are always applied with `update_game_data` suppressed so
/// that the clocks, castling rights, en passant window and side to move
/// are recomputed exactly once per turn.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveSpec {
    pub from: Coord,
    pub to: Coord,
    /// When false, the transition relocates pieces but leaves the side to
    /// move, clocks, castling rights and en passant window untouched.
    pub update_game_data: bool,
    /// Overwrites the destination with this kind (in the mover's color)
    /// after relocation.
    pub promotion: Option<PieceKind>,
    /// Dependent sub-moves applied in order after the head move.
    pub special_moves: Vec<MoveSpec>,
}

impl MoveSpec {
    pub fn new(from: Coord, to: Coord) -> MoveSpec {
        MoveSpec {
            from,
            to,
            update_game_data: true,
            promotion: None,
            special_moves: Vec::new(),
        }
    }

    pub fn with_promotion(mut self, kind: PieceKind) -> MoveSpec {
        self.promotion = Some(kind);
        self
    }

    pub fn without_game_data(mut self) -> MoveSpec {
        self.update_game_data = false;
        self
    }

    /// Chains `next` onto this move as a dependent sub-move.
    pub fn then(mut self, next: MoveSpec) -> MoveSpec {
        self.special_moves.push(next);
        self
    }

    /// The canonical kingside castle for `color`: the king's two-square
    /// hop toward the h-file with the rook relocation chained on.
    pub fn kingside_castle(color: Color) -> MoveSpec {
        match color {
            Color::White => WHITE_KINGSIDE_CASTLE.clone(),
            Color::Black => BLACK_KINGSIDE_CASTLE.clone(),
        }
    }

    /// The canonical queenside castle for `color`.
    pub fn queenside_castle(color: Color) -> MoveSpec {
        match color {
            Color::White => WHITE_QUEENSIDE_CASTLE.clone(),
            Color::Black => BLACK_QUEENSIDE_CASTLE.clone(),
        }
    }
}

fn castle(king_from: &str, king_to: &str, rook_from: &str, rook_to: &str) -> MoveSpec {
    let at = |s| Coord::from_algebraic(s, DEFAULT_ROWS).unwrap();
    MoveSpec::new(at(king_from), at(king_to))
        .then(MoveSpec::new(at(rook_from), at(rook_to)).without_game_data())
}

lazy_static! {
    static ref WHITE_KINGSIDE_CASTLE: MoveSpec = castle("e1", "g1", "h1", "f1");
    static ref WHITE_QUEENSIDE_CASTLE: MoveSpec = castle("e1", "c1", "a1", "d1");
    static ref BLACK_KINGSIDE_CASTLE: MoveSpec = castle("e8", "g8", "h8", "f8");
    static ref BLACK_QUEENSIDE_CASTLE: MoveSpec = castle("e8", "c8", "a8", "d8");
}
