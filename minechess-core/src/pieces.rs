//! Piece type definitions

use serde::{Deserialize, Serialize};

use crate::board::Position;

/// Side color
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Color {
    White,
    Black,
}

impl Color {
    pub fn opponent(self) -> Self {
        match self {
            Color::White => Color::Black,
            Color::Black => Color::White,
        }
    }

    /// Row direction this side's pawns advance in
    pub fn forward(self) -> i8 {
        match self {
            Color::White => -1,
            Color::Black => 1,
        }
    }

    /// Row holding this side's king and rooks at the start
    pub fn back_rank(self) -> i8 {
        match self {
            Color::White => 7,
            Color::Black => 0,
        }
    }

    /// Row this side's pawns start on
    pub fn pawn_rank(self) -> i8 {
        match self {
            Color::White => 6,
            Color::Black => 1,
        }
    }

    /// Row where this side's pawns promote
    pub fn promotion_rank(self) -> i8 {
        self.opponent().back_rank()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Color::White => "white",
            Color::Black => "black",
        }
    }
}

impl std::fmt::Display for Color {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Chess piece kinds
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PieceType {
    King,
    Queen,
    Rook,
    Bishop,
    Knight,
    Pawn,
}

impl PieceType {
    /// Letter used in move notation (empty for pawns)
    pub fn notation(self) -> &'static str {
        match self {
            PieceType::King => "K",
            PieceType::Queen => "Q",
            PieceType::Rook => "R",
            PieceType::Bishop => "B",
            PieceType::Knight => "N",
            PieceType::Pawn => "",
        }
    }

    /// Whether a pawn may promote to this type
    pub fn is_promotion_target(self) -> bool {
        matches!(
            self,
            PieceType::Queen | PieceType::Rook | PieceType::Bishop | PieceType::Knight
        )
    }

    /// Parse the single-letter suffix used in coordinate moves (`e7e8q`)
    pub fn from_letter(c: char) -> Option<Self> {
        match c.to_ascii_lowercase() {
            'k' => Some(PieceType::King),
            'q' => Some(PieceType::Queen),
            'r' => Some(PieceType::Rook),
            'b' => Some(PieceType::Bishop),
            'n' => Some(PieceType::Knight),
            'p' => Some(PieceType::Pawn),
            _ => None,
        }
    }
}

/// A piece on the board
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Piece {
    #[serde(rename = "type")]
    pub piece_type: PieceType,
    pub color: Color,
    pub position: Position,
    pub has_moved: bool,
}

impl Piece {
    pub fn new(piece_type: PieceType, color: Color, position: Position) -> Self {
        Self {
            piece_type,
            color,
            position,
            has_moved: false,
        }
    }

    pub fn is_king(&self) -> bool {
        self.piece_type == PieceType::King
    }

    pub fn is_pawn(&self) -> bool {
        self.piece_type == PieceType::Pawn
    }
}
