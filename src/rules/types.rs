use shakmaty::{Color, Role, Square};

/// A piece located on a square, the unit most tag/threat code reasons about
/// instead of raw `shakmaty::Board` indexing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Piece {
    pub role: Role,
    pub color: Color,
    pub square: Square,
}

impl Piece {
    /// Identifier token of the form `<Letter><square>`, e.g. `Ng1`, `pe7`,
    /// matching the `pieces` field convention described for `Tag`.
    pub fn token(&self) -> String {
        let letter = match self.role {
            Role::Pawn => "",
            Role::Knight => "N",
            Role::Bishop => "B",
            Role::Rook => "R",
            Role::Queen => "Q",
            Role::King => "K",
        };
        format!("{letter}{}", self.square)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RulesError {
    #[error("invalid FEN: {0}")]
    InvalidFen(String),
    #[error("illegal position: {0}")]
    IllegalPosition(String),
    #[error("invalid SAN: {0}")]
    InvalidSan(String),
    #[error("invalid UCI move: {0}")]
    InvalidUci(String),
    #[error("illegal move: {0}")]
    IllegalMove(String),
}

pub type RulesResult<T> = Result<T, RulesError>;
