// Copyright 2023-2025 the tabiya developers.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Resolution of algebraic move notation against a position.
//!
//! The resolver understands the castling tokens `0-0` and `0-0-0`, long
//! form (`e2-e4`, optionally with an `x` separator and a promotion
//! suffix), and short form (`e4`, `Nbd2`), with trailing annotation glyphs
//! ignored. Short form needs to know which pieces can reach the target;
//! that knowledge is injected through the [`MovableLookup`] trait so the
//! resolver stays testable without a board.

use thiserror::Error;

use crate::core::{Color, Coord, MoveSpec, PieceKind};

/// The legal-move knowledge the resolver depends on, bound to a position
/// and supplied by the analysis layer.
pub trait MovableLookup {
    /// Origins of every piece of the given color and kind whose legal
    /// destinations include `to`.
    fn origins_movable_to(&self, to: Coord, color: Color, kind: PieceKind) -> Vec<Coord>;

    /// The height of the board this lookup is bound to; the resolver
    /// needs it to read coordinates.
    fn rows(&self) -> i32;
}

/// Possible errors that can arise when resolving a notation string.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum NotationError {
    /// The string matches no recognized grammar.
    #[error("the move {0} is invalid")]
    Invalid(String),
    /// The grammar matched but no legal piece can reach the target.
    #[error("the move {0} cannot legally be reached by any piece on the board")]
    Unreachable(String),
    /// More than one candidate piece remained after disambiguation.
    #[error("the move {0} is ambiguous")]
    Ambiguous(String),
}

/// Characters which annotate a move without changing what it is.
const ANNOTATIONS: [char; 5] = ['?', '=', '+', '#', '!'];

/// Parses a move string into a [`MoveSpec`] for the given side to move.
pub fn resolve(
    text: &str,
    to_move: Color,
    lookup: &dyn MovableLookup,
) -> Result<MoveSpec, NotationError> {
    let stripped: String = text.chars().filter(|c| !ANNOTATIONS.contains(c)).collect();

    if stripped == "0-0" {
        return Ok(MoveSpec::kingside_castle(to_move));
    }
    if stripped == "0-0-0" {
        return Ok(MoveSpec::queenside_castle(to_move));
    }

    let rows = lookup.rows();
    let chars: Vec<char> = stripped.chars().collect();
    let tokens = coordinate_tokens(&chars, rows);

    let (from, to, to_end) = match tokens.len() {
        0 => return Err(NotationError::Invalid(text.to_string())),
        1 => {
            let (_, end, to) = tokens[0];
            let kind = leading_piece_kind(&chars);
            let from = resolve_short_origin(text, &chars, to, kind, to_move, lookup)?;
            (from, to, end)
        }
        _ => {
            let (_, _, from) = tokens[0];
            let (_, end, to) = tokens[1];
            (from, to, end)
        }
    };

    let mut spec = MoveSpec::new(from, to);
    if let Some(kind) = promotion_suffix(&chars, to_end) {
        spec = spec.with_promotion(kind);
    }

    tracing::debug!(
        notation = text,
        from = %from.to_algebraic(rows),
        to = %to.to_algebraic(rows),
        "resolved move"
    );

    Ok(spec)
}

/// A leading uppercase piece letter selects the piece kind; everything
/// else is a pawn move.
fn leading_piece_kind(chars: &[char]) -> PieceKind {
    match chars.first() {
        Some(&c) if "NBRQK".contains(c) => {
            PieceKind::from_notation_letter(c).expect("letter set mismatch")
        }
        _ => PieceKind::Pawn,
    }
}

/// Short-form origin resolution: a unique candidate wins outright; a
/// file-or-rank disambiguator may narrow the field to one; anything else
/// is ambiguous (several candidates left) or unreachable (none).
fn resolve_short_origin(
    text: &str,
    chars: &[char],
    to: Coord,
    kind: PieceKind,
    to_move: Color,
    lookup: &dyn MovableLookup,
) -> Result<Coord, NotationError> {
    let candidates = lookup.origins_movable_to(to, to_move, kind);
    if candidates.len() == 1 {
        return Ok(candidates[0]);
    }

    let mut remaining = candidates;
    if let Some(disambiguator) = disambiguator(chars) {
        remaining.retain(|origin| origin.to_algebraic(lookup.rows()).contains(disambiguator));
        if remaining.len() == 1 {
            return Ok(remaining[0]);
        }
    }

    if remaining.len() > 1 {
        Err(NotationError::Ambiguous(text.to_string()))
    } else {
        Err(NotationError::Unreachable(text.to_string()))
    }
}

/// A four-character short move with a leading piece letter carries a one
/// character file-or-rank disambiguator: `Nbd2`, `N8d7`.
fn disambiguator(chars: &[char]) -> Option<char> {
    if chars.len() != 4 || !"NBRQK".contains(chars[0]) {
        return None;
    }

    let c = chars[1];
    if c.is_ascii_lowercase() || c.is_ascii_digit() {
        Some(c)
    } else {
        None
    }
}

/// An `NBRQ` letter directly after the destination promotes the pawn.
fn promotion_suffix(chars: &[char], to_end: usize) -> Option<PieceKind> {
    let c = *chars.get(to_end)?;
    if "NBRQ".contains(c) {
        PieceKind::from_notation_letter(c)
    } else {
        None
    }
}

/// Scans for coordinate tokens: a file letter inside the board followed by
/// a rank number naming an existing rank. Returns (start, end, coord)
/// triples in reading order.
fn coordinate_tokens(chars: &[char], rows: i32) -> Vec<(usize, usize, Coord)> {
    let mut tokens = Vec::new();
    let mut i = 0;
    while i < chars.len() {
        if let Some((end, coord)) = coordinate_at(chars, i, rows) {
            tokens.push((i, end, coord));
            i = end;
        } else {
            i += 1;
        }
    }

    tokens
}

fn coordinate_at(chars: &[char], start: usize, rows: i32) -> Option<(usize, Coord)> {
    let file = *chars.get(start)?;
    if !file.is_ascii_lowercase() || (file as i32) - ('a' as i32) >= rows {
        return None;
    }

    let first_digit = *chars.get(start + 1)?;
    if !first_digit.is_ascii_digit() || first_digit == '0' {
        return None;
    }

    let mut end = start + 2;
    while end < chars.len() && chars[end].is_ascii_digit() {
        end += 1;
    }

    let token: String = chars[start..end].iter().collect();
    let coord = Coord::from_algebraic(&token, rows).ok()?;
    if coord.y < 0 || coord.y >= rows {
        return None;
    }

    Some((end, coord))
}
