//! Game state and move execution

use serde::{Deserialize, Deserializer, Serialize};

use crate::board::{BoardState, Position};
use crate::error::MoveError;
use crate::notation::{move_notation, KINGSIDE_CASTLE, QUEENSIDE_CASTLE};
use crate::pieces::{Color, Piece, PieceType};
use crate::rules;

// ============================================================================
// CONSTANTS
// ============================================================================

/// Starting clock per side, in the frontend's time units
pub const INITIAL_CLOCK: u32 = 3000;

// ============================================================================
// CORE TYPES
// ============================================================================

/// A requested move as received from a client
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveRequest {
    pub from: Position,
    pub to: Position,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub promotion: Option<PieceType>,
}

impl MoveRequest {
    pub fn new(from: Position, to: Position) -> Self {
        Self {
            from,
            to,
            promotion: None,
        }
    }

    pub fn with_promotion(mut self, piece_type: PieceType) -> Self {
        self.promotion = Some(piece_type);
        self
    }

    /// Parse coordinate notation such as `e2e4` or `e7e8q`
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        let from = Position::from_square(text.get(0..2)?)?;
        let to = Position::from_square(text.get(2..4)?)?;
        let promotion = match text.get(4..)? {
            "" => None,
            rest => {
                let mut chars = rest.chars();
                let piece = PieceType::from_letter(chars.next()?)?;
                if chars.next().is_some() {
                    return None;
                }
                Some(piece)
            }
        };
        Some(Self { from, to, promotion })
    }
}

/// Clients send `"promotion": ""` when no promotion is chosen
fn empty_as_none<'de, D>(deserializer: D) -> Result<Option<PieceType>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Piece(PieceType),
        Text(String),
    }

    match Option::<Raw>::deserialize(deserializer)? {
        None => Ok(None),
        Some(Raw::Piece(piece)) => Ok(Some(piece)),
        Some(Raw::Text(text)) if text.is_empty() => Ok(None),
        Some(Raw::Text(text)) => Err(serde::de::Error::custom(format!(
            "unknown promotion piece: {text}"
        ))),
    }
}

/// Rook relocation performed as part of castling
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CastleRookMove {
    pub from: Position,
    pub to: Position,
}

/// One half-move with all of its effects
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ply {
    /// The moving piece as it stood before the move
    pub piece: Piece,
    pub from: Position,
    pub to: Position,
    pub captured_piece: Option<Piece>,
    pub castle_rook_move: Option<CastleRookMove>,
    pub promotion: Option<PieceType>,
    pub notation: String,
}

/// A white ply and the black reply, once played
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Move {
    pub white_ply: Ply,
    pub black_ply: Option<Ply>,
}

/// Pieces captured by each side
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapturedPieces {
    pub white: Vec<Piece>,
    pub black: Vec<Piece>,
}

impl CapturedPieces {
    fn push(&mut self, capturer: Color, piece: Piece) {
        match capturer {
            Color::White => self.white.push(piece),
            Color::Black => self.black.push(piece),
        }
    }
}

/// Remaining time per side. Carried but not ticked.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Clock {
    pub white: u32,
    pub black: u32,
}

impl Default for Clock {
    fn default() -> Self {
        Self {
            white: INITIAL_CLOCK,
            black: INITIAL_CLOCK,
        }
    }
}

/// Player identifier seated on each side; empty string when unassigned
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Players {
    pub white: String,
    pub black: String,
}

impl Players {
    pub fn get(&self, color: Color) -> &str {
        match color {
            Color::White => &self.white,
            Color::Black => &self.black,
        }
    }

    /// Color seated by a player, if any
    pub fn color_of(&self, player_id: &str) -> Option<Color> {
        if player_id.is_empty() {
            None
        } else if self.white == player_id {
            Some(Color::White)
        } else if self.black == player_id {
            Some(Color::Black)
        } else {
            None
        }
    }

    pub fn has_open_seat(&self) -> bool {
        self.white.is_empty() || self.black.is_empty()
    }

    /// Seat a player in the first open slot, white first
    ///
    /// A player already seated gets their existing color back. The empty id
    /// marks an open seat and is never seated.
    pub fn seat(&mut self, player_id: &str) -> Option<Color> {
        if player_id.is_empty() {
            return None;
        }
        if let Some(color) = self.color_of(player_id) {
            return Some(color);
        }
        if self.white.is_empty() {
            self.white = player_id.to_string();
            Some(Color::White)
        } else if self.black.is_empty() {
            self.black = player_id.to_string();
            Some(Color::Black)
        } else {
            None
        }
    }
}

/// Terminal outcome
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Resolution {
    Checkmate,
    Stalemate,
}

// ============================================================================
// GAME STATE
// ============================================================================

/// Full authoritative game state, serialized as the `gameState` payload
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameState {
    pub board: BoardState,
    pub to_move: Color,
    pub move_history: Vec<Move>,
    pub captured_pieces: CapturedPieces,
    pub is_check: bool,
    pub selected_square: Option<Position>,
    pub legal_moves: Vec<Position>,
    pub en_passant_target: Option<Position>,
    pub resolve: Option<Resolution>,
    pub clock: Clock,
    pub players: Players,
    pub promotion_square: Option<Position>,
}

impl GameState {
    /// Standard starting position, white to move
    pub fn new() -> Self {
        Self::from_board(BoardState::new(), Color::White)
    }

    /// Arbitrary position, used for setups and tests
    ///
    /// When `to_move` is black, the first recorded ply opens a new history
    /// entry of its own: it is stored in `white_ply` with `black_ply` left
    /// empty, and white's reply opens the next entry. `Ply::piece.color`
    /// always names the side that actually moved.
    pub fn from_board(board: BoardState, to_move: Color) -> Self {
        let is_check = rules::is_king_in_check(&board, to_move);
        Self {
            board,
            to_move,
            move_history: Vec::new(),
            captured_pieces: CapturedPieces::default(),
            is_check,
            selected_square: None,
            legal_moves: Vec::new(),
            en_passant_target: None,
            resolve: None,
            clock: Clock::default(),
            players: Players::default(),
            promotion_square: None,
        }
    }

    /// The most recent ply, if any
    pub fn last_ply(&self) -> Option<&Ply> {
        let last = self.move_history.last()?;
        last.black_ply.as_ref().or(Some(&last.white_ply))
    }

    /// Legal destinations for the piece on `from`
    ///
    /// Empty when the square is empty, out of range, belongs to the side not
    /// on move, or the game is over.
    pub fn legal_moves_from(&self, from: Position) -> Vec<Position> {
        if self.resolve.is_some() || !from.is_valid() {
            return vec![];
        }
        match self.board.get(from) {
            Some(piece) if piece.color == self.to_move => {
                rules::legal_destinations(&self.board, from, self.en_passant_target)
            }
            _ => vec![],
        }
    }

    /// Validate then execute. State is untouched when validation fails.
    pub fn make_move(&mut self, request: MoveRequest) -> Result<Ply, MoveError> {
        rules::validate_move(self, &request)?;
        Ok(self.execute_move(request))
    }

    // ========================================================================
    // EXECUTION
    // ========================================================================

    /// Apply an already validated move and return the recorded ply
    ///
    /// Panics if `request.from` is empty or out of range; call
    /// [`rules::validate_move`] first.
    pub fn execute_move(&mut self, request: MoveRequest) -> Ply {
        let MoveRequest { from, to, promotion } = request;
        let mover = self.to_move;

        let mut ply = self.make_ply(request);

        self.board.relocate(from, to);
        if let Some(piece_type) = promotion {
            self.board.set_piece_type(to, piece_type);
        }
        if let Some(captured) = ply.captured_piece {
            self.captured_pieces.push(mover, captured);
        }

        match ply.piece.piece_type {
            PieceType::King => {
                self.handle_castle(&mut ply);
                self.board.set_king_position(mover, to);
                self.en_passant_target = None;
            }
            PieceType::Pawn => self.handle_en_passant(&mut ply),
            _ => self.en_passant_target = None,
        }

        self.record_ply(mover, ply.clone());

        self.to_move = mover.opponent();
        self.is_check = rules::is_king_in_check(&self.board, self.to_move);

        if !rules::has_legal_moves(&self.board, self.to_move, self.en_passant_target) {
            self.resolve = Some(if self.is_check {
                Resolution::Checkmate
            } else {
                Resolution::Stalemate
            });
        }

        ply
    }

    /// Ply skeleton from the pre-move board; castling and en passant are
    /// filled in after the pieces move
    fn make_ply(&self, request: MoveRequest) -> Ply {
        let piece = *self
            .board
            .get(request.from)
            .expect("execute_move called without a piece on the origin square");
        let captured_piece = self.board.get(request.to).copied();
        let notation = move_notation(
            piece.piece_type,
            request.from,
            request.to,
            captured_piece.is_some(),
        );

        Ply {
            piece,
            from: request.from,
            to: request.to,
            captured_piece,
            castle_rook_move: None,
            promotion: request.promotion,
            notation,
        }
    }

    fn handle_castle(&mut self, ply: &mut Ply) {
        if (ply.to.x - ply.from.x).abs() != 2 {
            return;
        }
        let rank = ply.from.y;
        let (rook_from, rook_to) = rules::castle_rook_files(ply.to.x);
        let rook_move = CastleRookMove {
            from: Position::new(rook_from, rank),
            to: Position::new(rook_to, rank),
        };
        self.board.relocate(rook_move.from, rook_move.to);
        ply.castle_rook_move = Some(rook_move);
        ply.notation = if rook_from == 0 {
            QUEENSIDE_CASTLE
        } else {
            KINGSIDE_CASTLE
        }
        .to_string();
    }

    fn handle_en_passant(&mut self, ply: &mut Ply) {
        let (from, to) = (ply.from, ply.to);

        if self.en_passant_target == Some(to) && from.x != to.x {
            // The captured pawn sits beside the origin, directly behind the destination
            let behind = Position::new(to.x, from.y);
            if let Some(captured) = self.board.take(behind) {
                self.captured_pieces.push(ply.piece.color, captured);
                ply.captured_piece = Some(captured);
            }
            ply.notation = format!("x{}", ply.notation);
        }

        self.en_passant_target = match to.y - from.y {
            2 => Some(Position::new(to.x, to.y - 1)),
            -2 => Some(Position::new(to.x, to.y + 1)),
            _ => None,
        };
    }

    fn record_ply(&mut self, mover: Color, ply: Ply) {
        match mover {
            Color::White => self.move_history.push(Move {
                white_ply: ply,
                black_ply: None,
            }),
            Color::Black => match self.move_history.last_mut() {
                Some(last) if last.black_ply.is_none() => last.black_ply = Some(ply),
                // Black opening a custom setup, see `from_board`
                _ => self.move_history.push(Move {
                    white_ply: ply,
                    black_ply: None,
                }),
            },
        }
    }
}

impl Default for GameState {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn sq(name: &str) -> Position {
        Position::from_square(name).unwrap()
    }

    fn play(state: &mut GameState, moves: &[&str]) {
        for text in moves {
            let request = MoveRequest::parse(text).unwrap();
            state
                .make_move(request)
                .unwrap_or_else(|e| panic!("{text} rejected: {e}"));
        }
    }

    #[test]
    fn test_game_creation() {
        let state = GameState::new();
        assert_eq!(state.to_move, Color::White);
        assert!(state.move_history.is_empty());
        assert!(!state.is_check);
        assert_eq!(state.resolve, None);
        assert_eq!(state.clock.white, INITIAL_CLOCK);
        assert_eq!(state.players.white, "");
    }

    #[test]
    fn test_parse_request() {
        let request = MoveRequest::parse("e7e8q").unwrap();
        assert_eq!(request.from, sq("e7"));
        assert_eq!(request.to, sq("e8"));
        assert_eq!(request.promotion, Some(PieceType::Queen));
        assert!(MoveRequest::parse("e2").is_none());
        assert!(MoveRequest::parse("e2e4qq").is_none());
    }

    #[test]
    fn test_request_accepts_empty_promotion() {
        let json = r#"{"from":{"x":4,"y":6},"to":{"x":4,"y":4},"promotion":""}"#;
        let request: MoveRequest = serde_json::from_str(json).unwrap();
        assert_eq!(request.promotion, None);

        let json = r#"{"from":{"x":4,"y":1},"to":{"x":4,"y":0},"promotion":"queen"}"#;
        let request: MoveRequest = serde_json::from_str(json).unwrap();
        assert_eq!(request.promotion, Some(PieceType::Queen));

        let json = r#"{"from":{"x":4,"y":6},"to":{"x":4,"y":4}}"#;
        let request: MoveRequest = serde_json::from_str(json).unwrap();
        assert_eq!(request.promotion, None);
    }

    #[test]
    fn test_capture_is_recorded() {
        let mut state = GameState::new();
        play(&mut state, &["e2e4", "d7d5", "e4d5"]);
        let ply = state.last_ply().unwrap();
        assert_eq!(ply.notation, "exd5");
        assert_eq!(ply.captured_piece.unwrap().piece_type, PieceType::Pawn);
        assert_eq!(state.captured_pieces.white.len(), 1);
        assert!(state.captured_pieces.black.is_empty());
    }

    #[test]
    fn test_rejection_leaves_state_untouched() {
        let mut state = GameState::new();
        let before = state.clone();
        let err = state
            .make_move(MoveRequest::new(sq("e2"), sq("e5")))
            .unwrap_err();
        assert_eq!(err, MoveError::IllegalMove);
        assert_eq!(state, before);
    }

    #[test]
    fn test_state_json_field_names() {
        let state = GameState::new();
        let json = serde_json::to_value(&state).unwrap();
        for key in [
            "board",
            "toMove",
            "moveHistory",
            "capturedPieces",
            "isCheck",
            "selectedSquare",
            "legalMoves",
            "enPassantTarget",
            "resolve",
            "clock",
            "players",
            "promotionSquare",
        ] {
            assert!(json.get(key).is_some(), "missing {key}");
        }
        assert_eq!(json["toMove"], "white");
        assert_eq!(json["board"]["whiteKingPosition"]["y"], 7);
        assert_eq!(json["board"]["board"][0][4]["type"], "king");
        assert!(json["board"]["board"][4][4].is_null());
    }

    #[test]
    fn test_seating() {
        let mut players = Players::default();
        assert_eq!(players.seat("alice"), Some(Color::White));
        assert_eq!(players.seat("bob"), Some(Color::Black));
        assert_eq!(players.seat("alice"), Some(Color::White));
        assert_eq!(players.seat("carol"), None);
        assert_eq!(players.color_of("bob"), Some(Color::Black));
        assert_eq!(players.color_of(""), None);
        assert!(!players.has_open_seat());
    }

    #[test]
    fn test_empty_id_is_never_seated() {
        let mut players = Players::default();
        assert_eq!(players.seat(""), None);
        assert_eq!(players.seat("bob"), Some(Color::White));
        assert_eq!(players.seat(""), None);
        assert_eq!(players.seat("carol"), Some(Color::Black));
        assert_eq!(players.white, "bob");
        assert_eq!(players.black, "carol");
    }
}
