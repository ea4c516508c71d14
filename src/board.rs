// Copyright 2023-2025 the tabiya developers.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use std::{convert::TryFrom, fmt};

use thiserror::Error;

use crate::{
    analysis::Analysis,
    core::{CastleStatus, Color, Coord, MoveSpec, Piece, PieceKind},
    notation::{self, NotationError},
};

/// The file the kings start on; castling rights are keyed off it.
const KING_FILE: i32 = 4;

/// Possible errors that can arise when parsing a FEN string into a
/// [`Board`]. Each field of the record fails distinctly so that callers
/// can report precisely which one was invalid.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum FenParseError {
    #[error("expected 6 fields, found {0}")]
    WrongFieldCount(usize),
    #[error("invalid side to move: {0}")]
    InvalidSideToMove(String),
    #[error("invalid castling availability: {0}")]
    InvalidCastlingRights(String),
    #[error("invalid en passant square: {0}")]
    InvalidEnPassant(String),
    #[error("invalid halfmove clock: {0}")]
    InvalidHalfmoveClock(String),
    #[error("invalid fullmove number: {0}")]
    InvalidFullmoveNumber(String),
    #[error("unknown piece: {0}")]
    UnknownPiece(char),
}

/// Possible errors that can arise when applying a move to a [`Board`].
/// Off-board endpoints fail distinctly from notation errors.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum MoveError {
    #[error("no square {0} on this board")]
    MissingSquare(String),
    #[error(transparent)]
    Notation(#[from] NotationError),
}

/// A position snapshot: the piece placement grid plus the game data FEN
/// records alongside it. A `Board` is never mutated; every transition
/// ([`Board::update`], [`Board::clear`], [`Board::make_move`]) returns a
/// new value, so concurrent readers may freely share one instance.
///
/// The grid is standard 8×8 chess by default but nothing outside the
/// algebraic codec assumes that height.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Board {
    /// Row-major placement, top rank first, matching FEN field order.
    grid: Vec<Vec<Option<Piece>>>,
    to_move: Color,
    castling_rights: CastleStatus,
    en_passant: Option<Coord>,
    halfmove_clock: u32,
    fullmove_number: u32,
}

impl Board {
    pub const STARTING_POSITION: &'static str =
        "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";
    pub const EMPTY_POSITION: &'static str = "8/8/8/8/8/8/8/8 w KQkq - 0 1";

    /// Constructs a board from explicit fields; [`Board::from_fen`] is the
    /// usual entry point.
    pub fn new(
        grid: Vec<Vec<Option<Piece>>>,
        to_move: Color,
        castling_rights: CastleStatus,
        en_passant: Option<Coord>,
        halfmove_clock: u32,
        fullmove_number: u32,
    ) -> Board {
        Board {
            grid,
            to_move,
            castling_rights,
            en_passant,
            halfmove_clock,
            fullmove_number,
        }
    }

    pub fn starting_position() -> Board {
        Board::from_fen(Board::STARTING_POSITION).unwrap()
    }

    pub fn rows(&self) -> i32 {
        self.grid.len() as i32
    }

    pub fn columns(&self) -> i32 {
        self.grid.first().map_or(0, |row| row.len()) as i32
    }

    pub fn to_move(&self) -> Color {
        self.to_move
    }

    pub fn castling_rights(&self) -> CastleStatus {
        self.castling_rights
    }

    pub fn can_castle_kingside(&self, color: Color) -> bool {
        self.castling_rights.contains(kingside_castle_mask(color))
    }

    pub fn can_castle_queenside(&self, color: Color) -> bool {
        self.castling_rights.contains(queenside_castle_mask(color))
    }

    pub fn en_passant_square(&self) -> Option<Coord> {
        self.en_passant
    }

    pub fn halfmove_clock(&self) -> u32 {
        self.halfmove_clock
    }

    pub fn fullmove_number(&self) -> u32 {
        self.fullmove_number
    }

    /// Whether the coordinate names an existing grid cell.
    pub fn contains(&self, coord: Coord) -> bool {
        coord.y >= 0
            && coord.x >= 0
            && (coord.y as usize) < self.grid.len()
            && (coord.x as usize) < self.grid[coord.y as usize].len()
    }

    /// The piece at the coordinate, or `None` when the square is empty or
    /// off the board. Read-only lookups never fail.
    pub fn piece_at(&self, coord: Coord) -> Option<Piece> {
        if !self.contains(coord) {
            return None;
        }

        self.grid[coord.y as usize][coord.x as usize]
    }

    pub fn is_occupied(&self, coord: Coord) -> bool {
        self.piece_at(coord).is_some()
    }

    pub fn is_empty(&self, coord: Coord) -> bool {
        !self.is_occupied(coord)
    }

    /// Every coordinate on the board, top rank first.
    pub fn coords(&self) -> impl Iterator<Item = Coord> + '_ {
        self.grid.iter().enumerate().flat_map(|(y, row)| {
            (0..row.len()).map(move |x| Coord::new(x as i32, y as i32))
        })
    }

    /// The algebraic name of a coordinate relative to this board's height.
    pub fn algebraic(&self, coord: Coord) -> String {
        coord.to_algebraic(self.rows())
    }

    /// Derives a new board with the square's content replaced. Off-board
    /// coordinates leave the board unchanged.
    pub fn update(&self, coord: Coord, content: Option<Piece>) -> Board {
        let mut next = self.clone();
        next.set(coord, content);
        next
    }

    /// Derives a new board with the square emptied.
    pub fn clear(&self, coord: Coord) -> Board {
        self.update(coord, None)
    }

    fn set(&mut self, coord: Coord, content: Option<Piece>) {
        if self.contains(coord) {
            self.grid[coord.y as usize][coord.x as usize] = content;
        }
    }
}

//
// Move application.
//

impl Board {
    /// Applies a move, producing the successor position. Both endpoints
    /// must name existing grid cells; beyond that the applier performs no
    /// legality check. Callers are expected to draw moves from the
    /// analysis layer or the notation resolver.
    ///
    /// Dependent sub-moves in `spec.special_moves` are applied in order
    /// after the head move, always with game data updates suppressed.
    pub fn make_move(&self, spec: &MoveSpec) -> Result<Board, MoveError> {
        for endpoint in [spec.from, spec.to] {
            if !self.contains(endpoint) {
                return Err(MoveError::MissingSquare(self.algebraic(endpoint)));
            }
        }

        let moving = self.piece_at(spec.from);
        let captured = self.piece_at(spec.to);

        let mut next = self.clone();
        next.set(spec.from, None);
        next.set(spec.to, moving);

        if spec.update_game_data {
            next.castling_rights = self.castling_rights_after(spec.from);
            next.en_passant = self.en_passant_after(moving, spec);
            next.halfmove_clock =
                if captured.is_some() || matches!(moving, Some(p) if p.kind == PieceKind::Pawn) {
                    0
                } else {
                    self.halfmove_clock + 1
                };
            if self.to_move == Color::Black {
                next.fullmove_number = self.fullmove_number + 1;
            }
            next.to_move = self.to_move.toggle();
        }

        if let (Some(piece), Some(kind)) = (moving, spec.promotion) {
            next.set(spec.to, Some(Piece::new(piece.color, kind)));
        }

        tracing::debug!(
            from = %self.algebraic(spec.from),
            to = %self.algebraic(spec.to),
            game_data = spec.update_game_data,
            "applying move"
        );

        for special in &spec.special_moves {
            next = next.make_move(&special.clone().without_game_data())?;
        }

        Ok(next)
    }

    /// Resolves a notation string against this position and applies the
    /// resulting move. The resolver is handed a legal-move lookup bound to
    /// this position and the current side to move.
    pub fn make_move_notated(&self, text: &str) -> Result<Board, MoveError> {
        let analysis = Analysis::of(self);
        let spec = notation::resolve(text, self.to_move, &analysis)?;
        self.make_move(&spec)
    }

    /// A right is revoked once its king's or rook's home square is vacated
    /// by any move from that square, by either color; it never comes back.
    fn castling_rights_after(&self, from: Coord) -> CastleStatus {
        let mut rights = self.castling_rights;
        for color in crate::core::colors() {
            let home_rank = match color {
                Color::White => self.rows() - 1,
                Color::Black => 0,
            };
            if from.y != home_rank {
                continue;
            }

            if from.x == KING_FILE {
                rights.remove(castle_mask(color));
            } else if from.x == self.columns() - 1 {
                rights.remove(kingside_castle_mask(color));
            } else if from.x == 0 {
                rights.remove(queenside_castle_mask(color));
            }
        }

        rights
    }

    /// The en passant window opens only immediately after a two-square
    /// pawn push, on the square the pawn skipped; any other move closes
    /// it.
    fn en_passant_after(&self, moving: Option<Piece>, spec: &MoveSpec) -> Option<Coord> {
        let piece = moving?;
        if piece.kind != PieceKind::Pawn || !spec.from.is_vertical_to(spec.to, Some(2)) {
            return None;
        }

        Some(Coord::new(spec.from.x, (spec.from.y + spec.to.y) / 2))
    }
}

//
// FEN parsing and generation.
//
// A Board is one-to-one with a FEN record: six space-separated fields
// covering placement, side to move, castling availability, the en passant
// target and the two move clocks. Parsing validates each field eagerly and
// fails with the field-specific error.
//

impl Board {
    pub fn from_fen(fen: &str) -> Result<Board, FenParseError> {
        let fields: Vec<&str> = fen.split(' ').collect();
        if fields.len() != 6 {
            return Err(FenParseError::WrongFieldCount(fields.len()));
        }

        let grid = parse_placement(fields[0])?;
        let rows = grid.len() as i32;

        let to_move = match fields[1] {
            "w" => Color::White,
            "b" => Color::Black,
            other => return Err(FenParseError::InvalidSideToMove(other.to_string())),
        };

        let castling_rights = parse_castling(fields[2])?;
        let en_passant = parse_en_passant(fields[3], rows)?;

        let halfmove_clock = fields[4]
            .parse::<u32>()
            .map_err(|_| FenParseError::InvalidHalfmoveClock(fields[4].to_string()))?;
        let fullmove_number = fields[5]
            .parse::<u32>()
            .map_err(|_| FenParseError::InvalidFullmoveNumber(fields[5].to_string()))?;

        Ok(Board {
            grid,
            to_move,
            castling_rights,
            en_passant,
            halfmove_clock,
            fullmove_number,
        })
    }

    pub fn as_fen(&self) -> String {
        let placement = self
            .grid
            .iter()
            .map(|row| {
                let mut field = String::new();
                let mut empty_squares = 0;
                for cell in row {
                    match cell {
                        Some(piece) => {
                            if empty_squares != 0 {
                                field.push_str(&empty_squares.to_string());
                                empty_squares = 0;
                            }
                            field.push(piece.fen_char());
                        }
                        None => empty_squares += 1,
                    }
                }
                if empty_squares != 0 {
                    field.push_str(&empty_squares.to_string());
                }
                field
            })
            .collect::<Vec<_>>()
            .join("/");

        let mut castling = String::new();
        if self.can_castle_kingside(Color::White) {
            castling.push('K');
        }
        if self.can_castle_queenside(Color::White) {
            castling.push('Q');
        }
        if self.can_castle_kingside(Color::Black) {
            castling.push('k');
        }
        if self.can_castle_queenside(Color::Black) {
            castling.push('q');
        }
        if castling.is_empty() {
            castling.push('-');
        }

        let en_passant = match self.en_passant {
            Some(coord) => self.algebraic(coord),
            None => "-".to_string(),
        };

        let side = match self.to_move {
            Color::White => 'w',
            Color::Black => 'b',
        };

        format!(
            "{} {} {} {} {} {}",
            placement, side, castling, en_passant, self.halfmove_clock, self.fullmove_number
        )
    }
}

fn parse_placement(field: &str) -> Result<Vec<Vec<Option<Piece>>>, FenParseError> {
    field
        .split('/')
        .map(|row| {
            let mut cells = Vec::new();
            for c in row.chars() {
                if let Some(run) = c.to_digit(10) {
                    cells.extend(std::iter::repeat(None).take(run as usize));
                } else {
                    let piece =
                        Piece::try_from(c).map_err(|_| FenParseError::UnknownPiece(c))?;
                    cells.push(Some(piece));
                }
            }
            Ok(cells)
        })
        .collect()
}

fn parse_castling(field: &str) -> Result<CastleStatus, FenParseError> {
    if field == "-" {
        return Ok(CastleStatus::NONE);
    }

    let mut status = CastleStatus::NONE;
    let mut last_index = None;
    for c in field.chars() {
        let (index, flag) = match c {
            'K' => (0, CastleStatus::WHITE_KINGSIDE),
            'Q' => (1, CastleStatus::WHITE_QUEENSIDE),
            'k' => (2, CastleStatus::BLACK_KINGSIDE),
            'q' => (3, CastleStatus::BLACK_QUEENSIDE),
            _ => return Err(FenParseError::InvalidCastlingRights(field.to_string())),
        };

        // The field must list rights in canonical KQkq order, each at most
        // once.
        if last_index.map_or(false, |last| index <= last) {
            return Err(FenParseError::InvalidCastlingRights(field.to_string()));
        }
        last_index = Some(index);
        status |= flag;
    }

    if status == CastleStatus::NONE {
        return Err(FenParseError::InvalidCastlingRights(field.to_string()));
    }

    Ok(status)
}

fn parse_en_passant(field: &str, rows: i32) -> Result<Option<Coord>, FenParseError> {
    if field == "-" {
        return Ok(None);
    }

    let invalid = || FenParseError::InvalidEnPassant(field.to_string());
    let coord = Coord::from_algebraic(field, rows).map_err(|_| invalid())?;

    // Only the two ranks a double pawn push can skip over qualify.
    if coord.y != 2 && coord.y != rows - 3 {
        return Err(invalid());
    }

    Ok(Some(coord))
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (y, row) in self.grid.iter().enumerate() {
            for cell in row {
                match cell {
                    Some(piece) => write!(f, " {} ", piece)?,
                    None => write!(f, " . ")?,
                }
            }

            writeln!(f, "| {}", self.rows() - y as i32)?;
        }

        for _ in 0..self.columns() {
            write!(f, "---")?;
        }

        writeln!(f)?;
        for x in 0..self.columns() {
            write!(f, " {} ", ((b'a' as i32 + x) as u8) as char)?;
        }

        writeln!(f)?;
        Ok(())
    }
}

impl Default for Board {
    fn default() -> Self {
        Board::starting_position()
    }
}

fn kingside_castle_mask(color: Color) -> CastleStatus {
    match color {
        Color::White => CastleStatus::WHITE_KINGSIDE,
        Color::Black => CastleStatus::BLACK_KINGSIDE,
    }
}

fn queenside_castle_mask(color: Color) -> CastleStatus {
    match color {
        Color::White => CastleStatus::WHITE_QUEENSIDE,
        Color::Black => CastleStatus::BLACK_QUEENSIDE,
    }
}

fn castle_mask(color: Color) -> CastleStatus {
    match color {
        Color::White => CastleStatus::WHITE,
        Color::Black => CastleStatus::BLACK,
    }
}
