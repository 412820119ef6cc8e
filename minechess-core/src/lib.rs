//! MineChess Core - Board model and move engine
//!
//! This crate provides the authoritative chess rules for MineChess:
//! - Board geometry and piece storage with a cached king position
//! - Piece types and colors
//! - Move validation (movement rules, castling, en passant, promotion, pins)
//! - Move execution with ply recording and check/checkmate/stalemate detection
//! - Algebraic-style move notation

pub mod board;
pub mod error;
pub mod game;
pub mod notation;
pub mod pieces;
pub mod rules;

// Re-exports for convenient access
pub use board::{BoardState, Position, BOARD_SIZE};
pub use error::MoveError;
pub use game::{
    CapturedPieces, CastleRookMove, Clock, GameState, Move, MoveRequest, Players, Ply,
    Resolution, INITIAL_CLOCK,
};
pub use pieces::{Color, Piece, PieceType};
pub use rules::{is_king_in_check, legal_destinations, validate_move};
