// Copyright 2023-2025 the tabiya developers.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Derived, read-only information about a position: which squares each
//! piece attacks, which squares each color controls, and where each piece
//! may actually move.
//!
//! An [`Analysis`] is recomputed in full for the board it is given: any
//! square change can alter obstruction on several rays at once, so there
//! is deliberately no incremental update and no cache across board states.

use std::collections::{HashMap, HashSet};

use serde::Serialize;

use crate::{
    board::Board,
    core::{Color, Coord, Piece, PieceKind},
    notation::MovableLookup,
};

const ORTHOGONAL_STEPS: [(i32, i32); 4] = [(0, -1), (0, 1), (-1, 0), (1, 0)];
const DIAGONAL_STEPS: [(i32, i32); 4] = [(-1, -1), (-1, 1), (1, -1), (1, 1)];
const KNIGHT_JUMPS: [(i32, i32); 8] = [
    (-1, -2),
    (-1, 2),
    (1, -2),
    (1, 2),
    (-2, -1),
    (-2, 1),
    (2, -1),
    (2, 1),
];

/// Everything the analysis knows about one square.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SquareInfo {
    pub coordinate: Coord,
    pub controlled_by_white: bool,
    pub controlled_by_black: bool,
    pub piece: Option<PieceInfo>,
}

/// Everything the analysis knows about one piece.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PieceInfo {
    pub piece: Piece,
    pub location: Coord,
    /// The raw attacked squares, before any occupancy filtering. A slider
    /// controls the first blocking square on each ray, friend or foe.
    pub attacks: Vec<Coord>,
    /// The filtered legal destinations.
    pub moves: Vec<Coord>,
    /// For kings only: whether the opponent currently attacks this square.
    pub in_check: bool,
}

/// A full attack and legal-move breakdown of one [`Board`].
#[derive(Clone, Debug)]
pub struct Analysis {
    rows: i32,
    map: HashMap<Coord, SquareInfo>,
    controlled_white: HashSet<Coord>,
    controlled_black: HashSet<Coord>,
}

impl Analysis {
    /// Computes the analysis for a board. Two passes: every piece's raw
    /// attacks are aggregated into the per-color controlled sets first,
    /// because king move filtering needs the opponent's complete set
    /// before any legal destination can be settled.
    pub fn of(board: &Board) -> Analysis {
        let mut controlled_white = HashSet::new();
        let mut controlled_black = HashSet::new();
        let mut pieces = Vec::new();

        for coord in board.coords() {
            if let Some(piece) = board.piece_at(coord) {
                let attacks = attacked_squares(board, coord, piece);
                match piece.color {
                    Color::White => controlled_white.extend(attacks.iter().copied()),
                    Color::Black => controlled_black.extend(attacks.iter().copied()),
                }
                pieces.push((coord, piece, attacks));
            }
        }

        let mut map: HashMap<Coord, SquareInfo> = board
            .coords()
            .map(|coord| {
                (
                    coord,
                    SquareInfo {
                        coordinate: coord,
                        controlled_by_white: controlled_white.contains(&coord),
                        controlled_by_black: controlled_black.contains(&coord),
                        piece: None,
                    },
                )
            })
            .collect();

        for (coord, piece, attacks) in pieces {
            let opponent_controls = match piece.color {
                Color::White => &controlled_black,
                Color::Black => &controlled_white,
            };
            let moves = legal_destinations(board, coord, piece, &attacks, opponent_controls);
            let in_check = piece.kind == PieceKind::King && opponent_controls.contains(&coord);

            if let Some(info) = map.get_mut(&coord) {
                info.piece = Some(PieceInfo {
                    piece,
                    location: coord,
                    attacks,
                    moves,
                    in_check,
                });
            }
        }

        Analysis {
            rows: board.rows(),
            map,
            controlled_white,
            controlled_black,
        }
    }

    /// The deduplicated set of squares attacked by the given color.
    pub fn controlled_squares(&self, color: Color) -> &HashSet<Coord> {
        match color {
            Color::White => &self.controlled_white,
            Color::Black => &self.controlled_black,
        }
    }

    pub fn is_controlled_by(&self, coord: Coord, color: Color) -> bool {
        self.controlled_squares(color).contains(&coord)
    }

    pub fn is_controlled(&self, coord: Coord) -> bool {
        self.is_controlled_by(coord, Color::White) || self.is_controlled_by(coord, Color::Black)
    }

    /// The square's derived info, or `None` for coordinates outside the
    /// grid; read-only queries never fail.
    pub fn square(&self, coord: Coord) -> Option<&SquareInfo> {
        self.map.get(&coord)
    }

    /// The piece info at the coordinate, if a piece stands there.
    pub fn piece(&self, coord: Coord) -> Option<&PieceInfo> {
        self.square(coord).and_then(|info| info.piece.as_ref())
    }

    /// Every piece on the board, either color, whose legal destinations
    /// include the given coordinate.
    pub fn pieces_movable_to(&self, to: Coord) -> Vec<&PieceInfo> {
        self.map
            .values()
            .filter_map(|info| info.piece.as_ref())
            .filter(|piece| piece.moves.contains(&to))
            .collect()
    }
}

impl MovableLookup for Analysis {
    fn origins_movable_to(&self, to: Coord, color: Color, kind: PieceKind) -> Vec<Coord> {
        self.pieces_movable_to(to)
            .into_iter()
            .filter(|info| info.piece.color == color && info.piece.kind == kind)
            .map(|info| info.location)
            .collect()
    }

    fn rows(&self) -> i32 {
        self.rows
    }
}

/// The rank direction a pawn of this color advances in; white plays up
/// the board, toward y = 0.
fn forward(color: Color) -> i32 {
    match color {
        Color::White => -1,
        Color::Black => 1,
    }
}

fn start_rank(color: Color, rows: i32) -> i32 {
    match color {
        Color::White => rows - 2,
        Color::Black => 1,
    }
}

fn attacked_squares(board: &Board, from: Coord, piece: Piece) -> Vec<Coord> {
    match piece.kind {
        PieceKind::Rook => ray_attacks(board, from, &ORTHOGONAL_STEPS),
        PieceKind::Bishop => ray_attacks(board, from, &DIAGONAL_STEPS),
        PieceKind::Queen => {
            let mut attacks = ray_attacks(board, from, &ORTHOGONAL_STEPS);
            attacks.extend(ray_attacks(board, from, &DIAGONAL_STEPS));
            attacks
        }
        PieceKind::Knight => {
            let attacks = step_attacks(board, from, &KNIGHT_JUMPS);
            debug_assert!(attacks.iter().all(|&to| from.is_knight_move_to(to)));
            attacks
        }
        PieceKind::King => {
            let mut attacks = step_attacks(board, from, &ORTHOGONAL_STEPS);
            attacks.extend(step_attacks(board, from, &DIAGONAL_STEPS));
            debug_assert!(attacks.iter().all(|&to| from.is_adjacent_to(to, None)));
            attacks
        }
        PieceKind::Pawn => {
            let dy = forward(piece.color);
            step_attacks(board, from, &[(-1, dy), (1, dy)])
        }
    }
}

/// Walks each direction one step at a time, stopping at the first occupied
/// square but still appending it: a slider controls its blocker, friend or
/// foe.
fn ray_attacks(board: &Board, from: Coord, steps: &[(i32, i32)]) -> Vec<Coord> {
    let mut attacks = Vec::new();
    for &(dx, dy) in steps {
        let mut cursor = from.offset_by(dx, dy);
        while board.contains(cursor) {
            attacks.push(cursor);
            if board.is_occupied(cursor) {
                break;
            }
            cursor = cursor.offset_by(dx, dy);
        }
    }

    attacks
}

fn step_attacks(board: &Board, from: Coord, offsets: &[(i32, i32)]) -> Vec<Coord> {
    offsets
        .iter()
        .map(|&(dx, dy)| from.offset_by(dx, dy))
        .filter(|&coord| board.contains(coord))
        .collect()
}

/// Narrows a piece's attacked squares into its playable destinations.
///
/// Kings may not step onto an opponent-controlled square, but nothing here
/// detects pins or restricts other pieces while the king is in check; a
/// caller wanting fully chess-legal generation must layer a
/// "does this move leave my king attacked" filter on top.
fn legal_destinations(
    board: &Board,
    from: Coord,
    piece: Piece,
    attacks: &[Coord],
    opponent_controls: &HashSet<Coord>,
) -> Vec<Coord> {
    let empty_or_enemy =
        |coord: &Coord| board.piece_at(*coord).map_or(true, |p| p.color != piece.color);

    match piece.kind {
        PieceKind::Knight | PieceKind::Bishop | PieceKind::Rook | PieceKind::Queen => {
            attacks.iter().copied().filter(empty_or_enemy).collect()
        }
        PieceKind::King => attacks
            .iter()
            .copied()
            .filter(empty_or_enemy)
            .filter(|coord| !opponent_controls.contains(coord))
            .collect(),
        PieceKind::Pawn => {
            // Diagonal attacks are playable only as captures.
            let mut moves: Vec<Coord> = attacks
                .iter()
                .copied()
                .filter(|coord| {
                    board
                        .piece_at(*coord)
                        .map_or(false, |p| p.color != piece.color)
                })
                .collect();

            let dy = forward(piece.color);
            let single = from.offset_by(0, dy);
            if board.contains(single) && board.is_empty(single) {
                moves.push(single);

                let double = from.offset_by(0, 2 * dy);
                if from.y == start_rank(piece.color, board.rows())
                    && board.contains(double)
                    && board.is_empty(double)
                {
                    moves.push(double);
                }
            }

            moves
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::DEFAULT_ROWS;

    fn at(s: &str) -> Coord {
        Coord::from_algebraic(s, DEFAULT_ROWS).unwrap()
    }

    fn coords(names: &[&str]) -> HashSet<Coord> {
        names.iter().map(|s| at(s)).collect()
    }

    fn empty_board() -> Board {
        Board::from_fen(Board::EMPTY_POSITION).unwrap()
    }

    fn place(board: &Board, coord: &str, piece: char) -> Board {
        use std::convert::TryFrom;
        board.update(at(coord), Some(Piece::try_from(piece).unwrap()))
    }

    fn moves_of(analysis: &Analysis, coord: &str) -> HashSet<Coord> {
        analysis
            .piece(at(coord))
            .expect("no piece at queried square")
            .moves
            .iter()
            .copied()
            .collect()
    }

    mod controlled {
        use super::*;

        #[test]
        fn pawns() {
            let board = place(
                &place(&place(&place(&empty_board(), "e2", 'P'), "a4", 'P'), "e7", 'p'),
                "b5",
                'p',
            );
            let analysis = Analysis::of(&board);

            assert_eq!(
                coords(&["b5", "d3", "f3"]),
                *analysis.controlled_squares(Color::White)
            );
            assert_eq!(
                coords(&["d6", "f6", "a4", "c4"]),
                *analysis.controlled_squares(Color::Black)
            );
        }

        #[test]
        fn knights() {
            let board = place(
                &place(&place(&place(&empty_board(), "e2", 'N'), "c4", 'N'), "e7", 'n'),
                "d6",
                'n',
            );
            let analysis = Analysis::of(&board);

            assert_eq!(
                coords(&[
                    "b6", "d6", "a5", "e5", "d4", "f4", "a3", "c3", "e3", "g3", "b2", "d2",
                    "c1", "g1",
                ]),
                *analysis.controlled_squares(Color::White)
            );
            assert_eq!(
                coords(&[
                    "c8", "e8", "g8", "b7", "f7", "c6", "g6", "b5", "d5", "f5", "c4", "e4",
                ]),
                *analysis.controlled_squares(Color::Black)
            );
        }

        #[test]
        fn rooks() {
            let board = place(&place(&empty_board(), "e2", 'R'), "e7", 'r');
            let analysis = Analysis::of(&board);

            assert_eq!(
                coords(&[
                    "e7", "e6", "e5", "e4", "e3", "a2", "b2", "c2", "d2", "f2", "g2", "h2",
                    "e1",
                ]),
                *analysis.controlled_squares(Color::White)
            );
            assert_eq!(
                coords(&[
                    "e8", "a7", "b7", "c7", "d7", "f7", "g7", "h7", "e6", "e5", "e4", "e3",
                    "e2",
                ]),
                *analysis.controlled_squares(Color::Black)
            );
        }

        #[test]
        fn bishops() {
            let board = place(&place(&empty_board(), "e2", 'B'), "g4", 'b');
            let analysis = Analysis::of(&board);

            assert_eq!(
                coords(&["a6", "b5", "c4", "d3", "f1", "g4", "f3", "d1"]),
                *analysis.controlled_squares(Color::White)
            );
            assert_eq!(
                coords(&["c8", "d7", "e6", "f5", "h3", "h5", "f3", "e2"]),
                *analysis.controlled_squares(Color::Black)
            );
        }

        #[test]
        fn queens() {
            let board = place(&place(&empty_board(), "e2", 'Q'), "e7", 'q');
            let analysis = Analysis::of(&board);

            assert_eq!(
                coords(&[
                    "a6", "b5", "c4", "d3", "f1", "h5", "g4", "f3", "d1", "e7", "e6", "e5",
                    "e4", "e3", "e1", "a2", "b2", "c2", "d2", "f2", "g2", "h2",
                ]),
                *analysis.controlled_squares(Color::White)
            );
            assert_eq!(
                coords(&[
                    "d8", "f6", "g5", "h4", "f8", "d6", "c5", "b4", "a3", "a7", "b7", "c7",
                    "d7", "f7", "g7", "h7", "e8", "e6", "e5", "e4", "e3", "e2",
                ]),
                *analysis.controlled_squares(Color::Black)
            );
        }

        #[test]
        fn kings() {
            let board = place(&place(&empty_board(), "e2", 'K'), "h8", 'k');
            let analysis = Analysis::of(&board);

            assert_eq!(
                coords(&["d3", "e3", "f3", "d2", "f2", "d1", "e1", "f1"]),
                *analysis.controlled_squares(Color::White)
            );
            assert_eq!(
                coords(&["g8", "g7", "h7"]),
                *analysis.controlled_squares(Color::Black)
            );
        }

        #[test]
        fn starting_position() {
            let analysis = Analysis::of(&Board::starting_position());

            assert_eq!(
                coords(&[
                    "a3", "b3", "c3", "d3", "e3", "f3", "g3", "h3", "a2", "b2", "c2", "d2",
                    "e2", "f2", "g2", "h2", "b1", "c1", "d1", "e1", "f1", "g1",
                ]),
                *analysis.controlled_squares(Color::White)
            );
            assert_eq!(
                coords(&[
                    "a6", "b6", "c6", "d6", "e6", "f6", "g6", "h6", "a7", "b7", "c7", "d7",
                    "e7", "f7", "g7", "h7", "b8", "c8", "d8", "e8", "f8", "g8",
                ]),
                *analysis.controlled_squares(Color::Black)
            );
        }

        #[test]
        fn obstructed_rays_include_the_blocker() {
            let board = Board::from_fen("8/4P3/8/4R3/8/4P3/8/8 w - - 0 1").unwrap();
            let analysis = Analysis::of(&board);

            let rook = analysis.piece(at("e5")).unwrap();
            let attacks: HashSet<Coord> = rook.attacks.iter().copied().collect();

            assert!(attacks.contains(&at("e6")));
            assert!(attacks.contains(&at("e7")), "the blocker itself is controlled");
            assert!(attacks.contains(&at("e4")));
            assert!(attacks.contains(&at("e3")));
            assert!(!attacks.contains(&at("e8")), "rays stop at the first blocker");
            assert!(!attacks.contains(&at("e2")));
        }

        #[test]
        fn recomputation_is_idempotent() {
            let board =
                Board::from_fen("r3k2r/p1ppqpb1/bn2pnp1/3PN3/Pp2P3/2N2Q1p/1PPBBPPP/R3K2R w KQkq - 0 1")
                    .unwrap();

            let first = Analysis::of(&board);
            let second = Analysis::of(&board);

            for color in crate::core::colors() {
                assert_eq!(
                    first.controlled_squares(color),
                    second.controlled_squares(color)
                );
            }
        }

        #[test]
        fn control_flags_on_squares() {
            let analysis = Analysis::of(&Board::starting_position());

            assert!(!analysis.is_controlled(at("d4")));
            assert!(!analysis.is_controlled_by(at("d4"), Color::White));
            assert!(!analysis.is_controlled_by(at("d4"), Color::Black));

            assert!(analysis.is_controlled_by(at("d3"), Color::White));
            assert!(analysis.is_controlled_by(at("d6"), Color::Black));
            assert!(analysis.is_controlled(at("d3")));

            let d3 = analysis.square(at("d3")).unwrap();
            assert!(d3.controlled_by_white);
            assert!(!d3.controlled_by_black);
        }
    }

    mod moves {
        use super::*;

        #[test]
        fn pawn_pushes_and_captures() {
            let board = place(&Board::starting_position(), "f3", 'p');
            let analysis = Analysis::of(&board);

            assert_eq!(coords(&["e3", "e4", "f3"]), moves_of(&analysis, "e2"));
            assert_eq!(coords(&["e2", "g2"]), moves_of(&analysis, "f3"));
        }

        #[test]
        fn pawn_double_push_requires_both_squares_empty() {
            let board = Board::from_fen("8/8/8/8/8/4p3/4P3/8 w - - 0 1").unwrap();
            let analysis = Analysis::of(&board);

            assert_eq!(HashSet::new(), moves_of(&analysis, "e2"));
        }

        #[test]
        fn pawn_does_not_capture_straight_ahead() {
            let board = Board::from_fen("8/8/8/8/4p3/8/4P3/8 w - - 0 1").unwrap();
            let analysis = Analysis::of(&board);

            // The single push is open but the double push is blocked.
            assert_eq!(coords(&["e3"]), moves_of(&analysis, "e2"));
        }

        #[test]
        fn knight_moves_ignore_obstruction_but_not_friends() {
            let board = place(&Board::starting_position(), "b6", 'n').clear(at("d7"));
            let analysis = Analysis::of(&board);

            assert_eq!(coords(&["a6", "c6", "d7"]), moves_of(&analysis, "b8"));
            assert_eq!(coords(&["d7", "d5", "c4", "a4"]), moves_of(&analysis, "b6"));
        }

        #[test]
        fn king_avoids_controlled_squares() {
            let board = place(&Board::starting_position(), "a8", 'K');
            let analysis = Analysis::of(&board);

            // b7 is covered by the bishop on c8; a7 and b8 are capturable.
            assert_eq!(coords(&["a7", "b8"]), moves_of(&analysis, "a8"));
            assert_eq!(HashSet::new(), moves_of(&analysis, "e8"));
        }

        #[test]
        fn king_destinations_never_intersect_opponent_control() {
            let board =
                Board::from_fen("r3k2r/p1ppqpb1/bn2pnp1/3PN3/Pp2P3/2N2Q1p/1PPBBPPP/R3K2R w KQkq - 0 1")
                    .unwrap();
            let analysis = Analysis::of(&board);

            for coord in [at("e1"), at("e8")] {
                let king = analysis.piece(coord).unwrap();
                let opponent = king.piece.color.toggle();
                for destination in &king.moves {
                    assert!(
                        !analysis.is_controlled_by(*destination, opponent),
                        "king at {} may not step onto {}",
                        coord,
                        destination
                    );
                }
            }
        }

        #[test]
        fn king_in_check_flag() {
            let board = place(
                &Board::starting_position().clear(at("e2")).clear(at("e7")),
                "e4",
                'r',
            );
            let analysis = Analysis::of(&board);

            assert!(analysis.piece(at("e1")).unwrap().in_check);
            assert!(!analysis.piece(at("e8")).unwrap().in_check);
        }

        #[test]
        fn in_check_is_only_set_for_kings() {
            let board = place(
                &Board::starting_position().clear(at("e2")).clear(at("e7")),
                "e4",
                'r',
            );
            let analysis = Analysis::of(&board);

            assert!(!analysis.piece(at("d1")).unwrap().in_check);
        }
    }

    mod map {
        use super::*;

        #[test]
        fn empty_squares_carry_no_piece_data() {
            let analysis = Analysis::of(&Board::starting_position());
            assert!(analysis.square(at("e4")).unwrap().piece.is_none());
            assert!(analysis.piece(at("e4")).is_none());
        }

        #[test]
        fn piece_data_records_location_and_identity() {
            let analysis = Analysis::of(&Board::starting_position());
            let info = analysis.piece(at("e2")).unwrap();

            assert_eq!(at("e2"), info.location);
            assert_eq!(PieceKind::Pawn, info.piece.kind);
            assert_eq!(Color::White, info.piece.color);
        }

        #[test]
        fn square_data_records_coordinate() {
            let analysis = Analysis::of(&Board::starting_position());
            assert_eq!(at("d4"), analysis.square(at("d4")).unwrap().coordinate);
        }

        #[test]
        fn off_board_square_is_not_found() {
            let analysis = Analysis::of(&Board::starting_position());
            assert!(analysis.square(Coord::new(0, 8)).is_none());
            assert!(analysis.square(Coord::new(-1, 3)).is_none());
        }

        #[test]
        fn pieces_movable_to_square() {
            let analysis = Analysis::of(&Board::starting_position());

            let origins: Vec<Coord> = analysis
                .pieces_movable_to(at("e4"))
                .into_iter()
                .map(|info| info.location)
                .collect();
            assert_eq!(vec![at("e2")], origins);

            assert!(analysis.pieces_movable_to(at("a1")).is_empty());
        }

        #[test]
        fn reverse_lookup_matches_forward_moves() {
            let board =
                Board::from_fen("r3k2r/p1ppqpb1/bn2pnp1/3PN3/Pp2P3/2N2Q1p/1PPBBPPP/R3K2R w KQkq - 0 1")
                    .unwrap();
            let analysis = Analysis::of(&board);

            for coord in board.coords() {
                let via_lookup: HashSet<Coord> = analysis
                    .pieces_movable_to(coord)
                    .into_iter()
                    .map(|info| info.location)
                    .collect();
                let via_moves: HashSet<Coord> = board
                    .coords()
                    .filter_map(|c| analysis.piece(c))
                    .filter(|info| info.moves.contains(&coord))
                    .map(|info| info.location)
                    .collect();
                assert_eq!(via_moves, via_lookup);
            }
        }

        #[test]
        fn square_info_serializes() {
            let analysis = Analysis::of(&Board::starting_position());
            let json = serde_json::to_string(analysis.square(at("e2")).unwrap()).unwrap();

            assert!(json.contains("\"pawn\""));
            assert!(json.contains("\"white\""));
        }
    }
}
