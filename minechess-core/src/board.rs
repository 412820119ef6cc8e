//! 8x8 board geometry and piece storage
//!
//! Coordinates follow the wire format: `x` is the file (0 = a), `y` is the
//! row counted from black's side (0 = rank 8, 7 = rank 1).

use serde::{Deserialize, Serialize};

use crate::pieces::{Color, Piece, PieceType};

/// Board size along each axis
pub const BOARD_SIZE: i8 = 8;

/// Rook-like direction vectors (dx, dy)
pub const ORTHOGONAL: [(i8, i8); 4] = [(1, 0), (-1, 0), (0, 1), (0, -1)];

/// Bishop-like direction vectors (dx, dy)
pub const DIAGONAL: [(i8, i8); 4] = [(1, 1), (1, -1), (-1, 1), (-1, -1)];

/// Knight jumps (dx, dy)
pub const KNIGHT_JUMPS: [(i8, i8); 8] = [
    (2, 1),
    (2, -1),
    (-2, 1),
    (-2, -1),
    (1, 2),
    (1, -2),
    (-1, 2),
    (-1, -2),
];

/// Square coordinates
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    pub x: i8,
    pub y: i8,
}

impl Position {
    pub const fn new(x: i8, y: i8) -> Self {
        Self { x, y }
    }

    /// Check if this square is on the board
    pub fn is_valid(&self) -> bool {
        (0..BOARD_SIZE).contains(&self.x) && (0..BOARD_SIZE).contains(&self.y)
    }

    /// Offset by (dx, dy), `None` when the result leaves the board
    pub fn offset(&self, dx: i8, dy: i8) -> Option<Position> {
        let next = Position::new(self.x + dx, self.y + dy);
        next.is_valid().then_some(next)
    }

    /// File letter, `a` through `h`
    pub fn file_notation(&self) -> char {
        (b'a' + self.x as u8) as char
    }

    /// Square name such as `e4`
    pub fn square_notation(&self) -> String {
        format!("{}{}", self.file_notation(), BOARD_SIZE - self.y)
    }

    /// Parse a square name such as `e4`
    pub fn from_square(name: &str) -> Option<Position> {
        let mut chars = name.chars();
        let file = chars.next()?.to_ascii_lowercase();
        let rank = chars.next()?.to_digit(10)? as i8;
        if chars.next().is_some() || !('a'..='h').contains(&file) {
            return None;
        }
        let pos = Position::new(file as i8 - 'a' as i8, BOARD_SIZE - rank);
        pos.is_valid().then_some(pos)
    }
}

impl std::fmt::Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.square_notation())
    }
}

/// Grid of optional pieces plus cached king squares
///
/// The king cache must be kept in sync on every king move; check detection
/// reads it instead of scanning the board.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoardState {
    board: [[Option<Piece>; 8]; 8],
    white_king_position: Position,
    black_king_position: Position,
}

const BACK_RANK: [PieceType; 8] = [
    PieceType::Rook,
    PieceType::Knight,
    PieceType::Bishop,
    PieceType::Queen,
    PieceType::King,
    PieceType::Bishop,
    PieceType::Knight,
    PieceType::Rook,
];

impl BoardState {
    /// Standard initial position
    pub fn new() -> Self {
        let mut board = Self::empty();
        for color in [Color::White, Color::Black] {
            for x in 0..BOARD_SIZE {
                let back = Position::new(x, color.back_rank());
                board.place(Piece::new(BACK_RANK[x as usize], color, back));
                let pawn = Position::new(x, color.pawn_rank());
                board.place(Piece::new(PieceType::Pawn, color, pawn));
            }
        }
        board
    }

    /// Board with no pieces
    ///
    /// The king cache points at the standard squares until a king is placed.
    pub fn empty() -> Self {
        Self {
            board: [[None; 8]; 8],
            white_king_position: Position::new(4, Color::White.back_rank()),
            black_king_position: Position::new(4, Color::Black.back_rank()),
        }
    }

    // ========================================================================
    // ACCESSORS
    // ========================================================================

    /// Piece at a square. Panics on coordinates outside the board.
    pub fn get(&self, pos: Position) -> Option<&Piece> {
        self.board[pos.y as usize][pos.x as usize].as_ref()
    }

    pub fn is_empty(&self, pos: Position) -> bool {
        self.get(pos).is_none()
    }

    /// Cached king square for a color
    pub fn king_position(&self, color: Color) -> Position {
        match color {
            Color::White => self.white_king_position,
            Color::Black => self.black_king_position,
        }
    }

    /// Iterate occupied squares
    pub fn pieces(&self) -> impl Iterator<Item = &Piece> + '_ {
        self.board.iter().flatten().flatten()
    }

    // ========================================================================
    // MUTATION
    // ========================================================================

    /// Put a piece on the square stored in its `position`
    pub fn place(&mut self, piece: Piece) {
        let pos = piece.position;
        if piece.is_king() {
            self.set_king_position(piece.color, pos);
        }
        self.board[pos.y as usize][pos.x as usize] = Some(piece);
    }

    /// Remove and return whatever occupies a square
    pub fn take(&mut self, pos: Position) -> Option<Piece> {
        self.board[pos.y as usize][pos.x as usize].take()
    }

    /// Move the piece on `from` to `to`, marking it as moved
    ///
    /// Any occupant of `to` is overwritten. Returns the relocated piece.
    pub fn relocate(&mut self, from: Position, to: Position) -> Option<Piece> {
        let mut piece = self.take(from)?;
        piece.position = to;
        piece.has_moved = true;
        self.board[to.y as usize][to.x as usize] = Some(piece);
        Some(piece)
    }

    /// Change the type of the piece on a square
    pub fn set_piece_type(&mut self, pos: Position, piece_type: PieceType) {
        if let Some(piece) = self.board[pos.y as usize][pos.x as usize].as_mut() {
            piece.piece_type = piece_type;
        }
    }

    pub fn set_king_position(&mut self, color: Color, pos: Position) {
        match color {
            Color::White => self.white_king_position = pos,
            Color::Black => self.black_king_position = pos,
        }
    }
}

impl Default for BoardState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_position() {
        let board = BoardState::new();
        assert_eq!(board.pieces().count(), 32);

        let white_king = board.get(Position::new(4, 7)).unwrap();
        assert_eq!(white_king.piece_type, PieceType::King);
        assert_eq!(white_king.color, Color::White);
        assert_eq!(board.king_position(Color::White), Position::new(4, 7));
        assert_eq!(board.king_position(Color::Black), Position::new(4, 0));

        let black_queen = board.get(Position::new(3, 0)).unwrap();
        assert_eq!(black_queen.piece_type, PieceType::Queen);
        assert_eq!(black_queen.color, Color::Black);

        for x in 0..8 {
            assert!(board.get(Position::new(x, 6)).unwrap().is_pawn());
            assert!(board.get(Position::new(x, 1)).unwrap().is_pawn());
            assert!(board.is_empty(Position::new(x, 4)));
        }
    }

    #[test]
    fn test_stored_positions_match_squares() {
        let board = BoardState::new();
        for y in 0..8 {
            for x in 0..8 {
                let pos = Position::new(x, y);
                if let Some(piece) = board.get(pos) {
                    assert_eq!(piece.position, pos);
                    assert!(!piece.has_moved);
                }
            }
        }
    }

    #[test]
    fn test_relocate() {
        let mut board = BoardState::new();
        let moved = board
            .relocate(Position::new(4, 6), Position::new(4, 4))
            .unwrap();
        assert_eq!(moved.position, Position::new(4, 4));
        assert!(moved.has_moved);
        assert!(board.is_empty(Position::new(4, 6)));
        assert_eq!(board.get(Position::new(4, 4)), Some(&moved));
    }

    #[test]
    fn test_square_notation() {
        assert_eq!(Position::new(4, 4).square_notation(), "e4");
        assert_eq!(Position::new(0, 7).square_notation(), "a1");
        assert_eq!(Position::new(7, 0).square_notation(), "h8");
        assert_eq!(Position::from_square("e2"), Some(Position::new(4, 6)));
        assert_eq!(Position::from_square("h8"), Some(Position::new(7, 0)));
        assert_eq!(Position::from_square("i1"), None);
        assert_eq!(Position::from_square("a9"), None);
        assert_eq!(Position::from_square("a10"), None);
    }

    #[test]
    fn test_offset_stays_on_board() {
        let corner = Position::new(0, 0);
        assert_eq!(corner.offset(-1, 0), None);
        assert_eq!(corner.offset(1, 1), Some(Position::new(1, 1)));
    }
}
