//! Algebraic-style move notation

use crate::board::Position;
use crate::pieces::PieceType;

/// Notation for a plain move, computed from the pre-move board
///
/// Piece letter, then the origin file for a pawn moving diagonally, then `x`
/// when the destination is occupied, then the destination square. Castling
/// and en passant adjustments are applied by the move engine.
pub fn move_notation(piece_type: PieceType, from: Position, to: Position, capture: bool) -> String {
    let mut notation = String::from(piece_type.notation());
    if piece_type == PieceType::Pawn && from.x != to.x {
        notation.push(from.file_notation());
    }
    if capture {
        notation.push('x');
    }
    notation.push_str(&to.square_notation());
    notation
}

pub const KINGSIDE_CASTLE: &str = "O-O";
pub const QUEENSIDE_CASTLE: &str = "O-O-O";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pawn_push() {
        let n = move_notation(
            PieceType::Pawn,
            Position::new(4, 6),
            Position::new(4, 4),
            false,
        );
        assert_eq!(n, "e4");
    }

    #[test]
    fn test_pawn_capture_names_origin_file() {
        let n = move_notation(
            PieceType::Pawn,
            Position::new(4, 4),
            Position::new(3, 3),
            true,
        );
        assert_eq!(n, "exd5");
    }

    #[test]
    fn test_piece_capture() {
        let n = move_notation(
            PieceType::Knight,
            Position::new(6, 7),
            Position::new(5, 5),
            true,
        );
        assert_eq!(n, "Nxf3");
    }
}
