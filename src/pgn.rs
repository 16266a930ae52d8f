//! PGN text parsing into a flat mainline SAN move list, used by
//! `investigate_game` to accept a raw `pgn` string directly rather than
//! requiring callers to pre-split it into a move list.

use pgn_reader::{BufferedReader, SanPlus, Skip, Visitor};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PgnError {
    #[error("no game found in pgn text")]
    Empty,
    #[error("io error while reading pgn: {0}")]
    Io(#[from] std::io::Error),
}

pub type PgnResult<T> = Result<T, PgnError>;

#[derive(Default)]
struct SanCollector {
    moves: Vec<String>,
}

impl Visitor for SanCollector {
    type Result = Vec<String>;

    fn san(&mut self, san_plus: SanPlus) {
        self.moves.push(san_plus.to_string());
    }

    fn begin_variation(&mut self) -> Skip {
        // Only the mainline matters for per-ply critical-moment analysis.
        Skip(true)
    }

    fn end_game(&mut self) -> Self::Result {
        std::mem::take(&mut self.moves)
    }
}

/// Parse the first game in `pgn` into its mainline SAN move list.
pub fn moves_from_pgn(pgn: &str) -> PgnResult<Vec<String>> {
    let mut reader = BufferedReader::new_cursor(pgn.as_bytes());
    let mut visitor = SanCollector::default();
    reader.read_game(&mut visitor)?.ok_or(PgnError::Empty)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_mainline_moves_and_skips_variations() {
        let pgn = "1. e4 e5 (1... c5 2. Nf3) 2. Nf3 Nc6 *";
        let moves = moves_from_pgn(pgn).unwrap();
        assert_eq!(moves, vec!["e4", "e5", "Nf3", "Nc6"]);
    }

    #[test]
    fn empty_text_is_an_error() {
        assert!(moves_from_pgn("").is_err());
    }
}
