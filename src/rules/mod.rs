//! Thin adapter over the `shakmaty` chess rules library.
//!
//! This module is the "Rules adapter" component from the design: it owns all
//! direct `shakmaty` usage so the rest of the crate works with plain `Fen`
//! strings, SAN strings, and small value types instead of juggling
//! `shakmaty::Chess` positions everywhere.

pub mod types;

pub use types::{Piece, RulesError, RulesResult};

use shakmaty::san::San;
use shakmaty::uci::UciMove;
use shakmaty::{CastlingMode, Chess, Color, Move, Position, Role, Square};

/// Normalize a FEN to its identity form: board, side, castling, en-passant.
/// Halfmove/fullmove counters are dropped since they do not affect analysis
/// identity (two positions reached via different move counts are the same
/// position for caching and tag purposes).
pub fn normalize_fen(fen: &str) -> RulesResult<String> {
    let fields: Vec<&str> = fen.split_whitespace().collect();
    if fields.len() < 4 {
        return Err(RulesError::InvalidFen(fen.to_string()));
    }
    Ok(fields[..4].join(" "))
}

/// Parse a FEN into a legal `shakmaty::Chess` position.
pub fn position_from_fen(fen: &str) -> RulesResult<Chess> {
    let setup: shakmaty::fen::Fen = fen
        .parse()
        .map_err(|_| RulesError::InvalidFen(fen.to_string()))?;
    setup
        .into_position(CastlingMode::Standard)
        .map_err(|e| RulesError::IllegalPosition(e.to_string()))
}

/// Render a position back to a full FEN string.
pub fn fen_from_position(pos: &Chess) -> String {
    shakmaty::fen::Fen::from_position(pos.clone(), shakmaty::EnPassantMode::Legal).to_string()
}

/// Side to move for a FEN, without building a full position.
pub fn side_to_move(fen: &str) -> RulesResult<Color> {
    let fields: Vec<&str> = fen.split_whitespace().collect();
    match fields.get(1) {
        Some(&"w") => Ok(Color::White),
        Some(&"b") => Ok(Color::Black),
        _ => Err(RulesError::InvalidFen(fen.to_string())),
    }
}

/// Resolve a SAN move string against a FEN, returning the `shakmaty::Move`.
pub fn resolve_san(fen: &str, san: &str) -> RulesResult<Move> {
    let pos = position_from_fen(fen)?;
    let parsed: San = san
        .parse()
        .map_err(|_| RulesError::InvalidSan(san.to_string()))?;
    parsed
        .to_move(&pos)
        .map_err(|_| RulesError::IllegalMove(san.to_string()))
}

/// Resolve a UCI move string against a FEN, returning the `shakmaty::Move`.
pub fn resolve_uci(fen: &str, uci: &str) -> RulesResult<Move> {
    let pos = position_from_fen(fen)?;
    let parsed =
        UciMove::from_ascii(uci.as_bytes()).map_err(|_| RulesError::InvalidUci(uci.to_string()))?;
    parsed
        .to_move(&pos)
        .map_err(|_| RulesError::IllegalMove(uci.to_string()))
}

/// Play a SAN move against a FEN and return the resulting FEN.
pub fn play_san(fen: &str, san: &str) -> RulesResult<String> {
    let mut pos = position_from_fen(fen)?;
    let mv = resolve_san(fen, san)?;
    pos.play_unchecked(&mv);
    Ok(fen_from_position(&pos))
}

/// Replay a sequence of SAN moves starting from `fen`, returning the FEN
/// after each ply (`fens[0]` is the position after the first move) plus the
/// final FEN. Fails fast on the first illegal/unparseable move, reporting
/// how many plies were applied before the failure.
pub fn replay_san_line(fen: &str, moves_san: &[String]) -> (Vec<String>, Option<RulesError>) {
    let mut pos = match position_from_fen(fen) {
        Ok(p) => p,
        Err(e) => return (Vec::new(), Some(e)),
    };
    let mut fens = Vec::with_capacity(moves_san.len());
    for san in moves_san {
        let parsed: San = match san.parse() {
            Ok(s) => s,
            Err(_) => return (fens, Some(RulesError::InvalidSan(san.clone()))),
        };
        let mv = match parsed.to_move(&pos) {
            Ok(m) => m,
            Err(_) => return (fens, Some(RulesError::IllegalMove(san.clone()))),
        };
        pos.play_unchecked(&mv);
        fens.push(fen_from_position(&pos));
    }
    (fens, None)
}

/// Convert a `shakmaty::Move` to SAN text against the position it was played in.
pub fn move_to_san(pos: &Chess, mv: &Move) -> String {
    San::from_move(pos, mv).to_string()
}

/// Convert a `shakmaty::Move` to UCI text.
pub fn move_to_uci(mv: &Move) -> String {
    mv.to_uci(CastlingMode::Standard).to_string()
}

/// All legal moves at a FEN, as SAN strings, in `shakmaty`'s enumeration order.
pub fn legal_moves_san(fen: &str) -> RulesResult<Vec<String>> {
    let pos = position_from_fen(fen)?;
    Ok(pos
        .legal_moves()
        .iter()
        .map(|mv| move_to_san(&pos, mv))
        .collect())
}

/// Is this SAN move legal at this FEN?
pub fn is_legal_san(fen: &str, san: &str) -> bool {
    resolve_san(fen, san).is_ok()
}

/// Enumerate the pieces attacking a square, for the side given.
pub fn attackers(pos: &Chess, square: Square, attacker_color: Color) -> Vec<Piece> {
    pos.board()
        .attacks_to(square, attacker_color, pos.board().occupied())
        .into_iter()
        .filter_map(|sq| {
            pos.board()
                .piece_at(sq)
                .map(|p| Piece { role: p.role, color: p.color, square: sq })
        })
        .collect()
}

/// Defenders of a square (pieces of `square`'s own occupant's color that
/// attack it) — same primitive as `attackers` with the color flipped by the
/// caller; kept as a distinct name because callers reason about "defenders"
/// and "attackers" as different concepts even though the underlying query is
/// identical.
pub fn defenders(pos: &Chess, square: Square, defender_color: Color) -> Vec<Piece> {
    attackers(pos, square, defender_color)
}

/// Chebyshev distance between two squares (king-move distance), used by the
/// king-zone and outpost reachability checks.
pub fn square_distance(a: Square, b: Square) -> u32 {
    let a_file: u8 = a.file().into();
    let b_file: u8 = b.file().into();
    let a_rank: u8 = a.rank().into();
    let b_rank: u8 = b.rank().into();
    let file_d = (a_file as i16 - b_file as i16).unsigned_abs() as u32;
    let rank_d = (a_rank as i16 - b_rank as i16).unsigned_abs() as u32;
    file_d.max(rank_d)
}

/// Standard piece values in centipawns, used for material counting, MVV-LVA,
/// and SEE.
pub const fn piece_value(role: Role) -> i32 {
    match role {
        Role::Pawn => 100,
        Role::Knight => 320,
        Role::Bishop => 330,
        Role::Rook => 500,
        Role::Queen => 900,
        Role::King => 0,
    }
}

/// Material balance from `pos.turn()`'s perspective, in centipawns.
pub fn material_balance(pos: &Chess) -> i32 {
    let board = pos.board();
    let mut total = 0i32;
    for role in [Role::Pawn, Role::Knight, Role::Bishop, Role::Rook, Role::Queen] {
        let white = board.by_piece(shakmaty::Piece { color: Color::White, role }).into_iter().count() as i32;
        let black = board.by_piece(shakmaty::Piece { color: Color::Black, role }).into_iter().count() as i32;
        total += (white - black) * piece_value(role);
    }
    if pos.turn() == Color::White {
        total
    } else {
        -total
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const START: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

    #[test]
    fn normalizes_fen_to_first_four_fields() {
        let normalized = normalize_fen(START).unwrap();
        assert_eq!(normalized, "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq -");
    }

    #[test]
    fn plays_legal_san() {
        let after = play_san(START, "e4").unwrap();
        assert!(after.starts_with("rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR"));
    }

    #[test]
    fn rejects_illegal_san() {
        assert!(play_san(START, "e5").is_err());
    }

    #[test]
    fn replays_full_line() {
        let moves = vec!["e4".to_string(), "e5".to_string(), "Nf3".to_string()];
        let (fens, err) = replay_san_line(START, &moves);
        assert!(err.is_none());
        assert_eq!(fens.len(), 3);
    }

    #[test]
    fn material_balance_is_zero_at_start() {
        let pos = position_from_fen(START).unwrap();
        assert_eq!(material_balance(&pos), 0);
    }
}
