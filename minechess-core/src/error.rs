//! Move rejection reasons

use crate::board::Position;

/// Why a move request was rejected. State is never mutated on rejection.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum MoveError {
    #[error("game is over")]
    GameOver,

    #[error("square out of bounds: ({}, {})", .0.x, .0.y)]
    OutOfBounds(Position),

    #[error("no piece on {0}")]
    EmptySquare(Position),

    #[error("not your turn")]
    NotYourTurn,

    #[error("illegal move")]
    IllegalMove,

    #[error("king would be left in check")]
    KingLeftInCheck,

    #[error("promotion piece required")]
    PromotionRequired,

    #[error("invalid promotion")]
    InvalidPromotion,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        assert_eq!(MoveError::NotYourTurn.to_string(), "not your turn");
        assert_eq!(MoveError::IllegalMove.to_string(), "illegal move");
        assert_eq!(
            MoveError::KingLeftInCheck.to_string(),
            "king would be left in check"
        );
        assert_eq!(
            MoveError::EmptySquare(Position::new(4, 4)).to_string(),
            "no piece on e4"
        );
        assert_eq!(
            MoveError::OutOfBounds(Position::new(9, -1)).to_string(),
            "square out of bounds: (9, -1)"
        );
    }
}
