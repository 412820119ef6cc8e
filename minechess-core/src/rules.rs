//! Movement rules, attack detection and move validation

use crate::board::{BoardState, Position, DIAGONAL, KNIGHT_JUMPS, ORTHOGONAL};
use crate::error::MoveError;
use crate::game::{GameState, MoveRequest};
use crate::pieces::{Color, Piece, PieceType};

/// King file at the start of the game
const KING_FILE: i8 = 4;

// ============================================================================
// ATTACK DETECTION
// ============================================================================

/// Whether any piece of `by` attacks `pos`
///
/// Walks outward from the target: pawn and knight offsets, then rook and
/// bishop lines until the first blocker, then adjacent kings.
pub fn is_square_attacked(board: &BoardState, pos: Position, by: Color) -> bool {
    let holds = |p: Position, types: &[PieceType]| {
        board
            .get(p)
            .is_some_and(|piece| piece.color == by && types.contains(&piece.piece_type))
    };

    // A pawn of `by` attacks one row ahead of itself, so look one row behind
    let behind = -by.forward();
    for dx in [-1, 1] {
        if let Some(p) = pos.offset(dx, behind) {
            if holds(p, &[PieceType::Pawn]) {
                return true;
            }
        }
    }

    for &(dx, dy) in &KNIGHT_JUMPS {
        if let Some(p) = pos.offset(dx, dy) {
            if holds(p, &[PieceType::Knight]) {
                return true;
            }
        }
    }

    let lines = [
        (&ORTHOGONAL, [PieceType::Rook, PieceType::Queen]),
        (&DIAGONAL, [PieceType::Bishop, PieceType::Queen]),
    ];
    for (dirs, sliders) in lines {
        for &(dx, dy) in dirs {
            let mut current = pos;
            while let Some(next) = current.offset(dx, dy) {
                if let Some(piece) = board.get(next) {
                    if piece.color == by && sliders.contains(&piece.piece_type) {
                        return true;
                    }
                    break;
                }
                current = next;
            }
        }
    }

    ORTHOGONAL
        .iter()
        .chain(DIAGONAL.iter())
        .filter_map(|&(dx, dy)| pos.offset(dx, dy))
        .any(|p| holds(p, &[PieceType::King]))
}

/// Whether `color`'s king is attacked, using the cached king square
pub fn is_king_in_check(board: &BoardState, color: Color) -> bool {
    is_square_attacked(board, board.king_position(color), color.opponent())
}

// ============================================================================
// MOVE GENERATION
// ============================================================================

/// Destinations reachable by movement rules, before the own-king check
///
/// Castling destinations are only produced when every castling condition
/// holds, including the attacked-square conditions.
pub fn pseudo_legal_destinations(
    board: &BoardState,
    from: Position,
    en_passant: Option<Position>,
) -> Vec<Position> {
    let piece = match board.get(from) {
        Some(p) => *p,
        None => return vec![],
    };

    let mut moves = Vec::new();
    match piece.piece_type {
        PieceType::Pawn => pawn_moves(board, &piece, en_passant, &mut moves),
        PieceType::Knight => step_moves(board, &piece, &KNIGHT_JUMPS, &mut moves),
        PieceType::Bishop => slide_moves(board, &piece, &DIAGONAL, &mut moves),
        PieceType::Rook => slide_moves(board, &piece, &ORTHOGONAL, &mut moves),
        PieceType::Queen => {
            slide_moves(board, &piece, &ORTHOGONAL, &mut moves);
            slide_moves(board, &piece, &DIAGONAL, &mut moves);
        }
        PieceType::King => {
            step_moves(board, &piece, &ORTHOGONAL, &mut moves);
            step_moves(board, &piece, &DIAGONAL, &mut moves);
            castle_moves(board, &piece, &mut moves);
        }
    }
    moves
}

fn can_land(board: &BoardState, piece: &Piece, dest: Position) -> bool {
    board.get(dest).map_or(true, |occupant| occupant.color != piece.color)
}

fn step_moves(board: &BoardState, piece: &Piece, offsets: &[(i8, i8)], moves: &mut Vec<Position>) {
    for &(dx, dy) in offsets {
        if let Some(dest) = piece.position.offset(dx, dy) {
            if can_land(board, piece, dest) {
                moves.push(dest);
            }
        }
    }
}

fn slide_moves(board: &BoardState, piece: &Piece, dirs: &[(i8, i8)], moves: &mut Vec<Position>) {
    for &(dx, dy) in dirs {
        let mut current = piece.position;
        while let Some(next) = current.offset(dx, dy) {
            match board.get(next) {
                Some(occupant) => {
                    if occupant.color != piece.color {
                        moves.push(next);
                    }
                    break; // Blocked
                }
                None => moves.push(next),
            }
            current = next;
        }
    }
}

fn pawn_moves(
    board: &BoardState,
    piece: &Piece,
    en_passant: Option<Position>,
    moves: &mut Vec<Position>,
) {
    let forward = piece.color.forward();
    let from = piece.position;

    if let Some(one) = from.offset(0, forward) {
        if board.is_empty(one) {
            moves.push(one);
            if from.y == piece.color.pawn_rank() {
                if let Some(two) = one.offset(0, forward) {
                    if board.is_empty(two) {
                        moves.push(two);
                    }
                }
            }
        }
    }

    for dx in [-1, 1] {
        if let Some(dest) = from.offset(dx, forward) {
            let captures = board
                .get(dest)
                .is_some_and(|occupant| occupant.color != piece.color);
            if captures || en_passant == Some(dest) {
                moves.push(dest);
            }
        }
    }
}

fn castle_moves(board: &BoardState, king: &Piece, moves: &mut Vec<Position>) {
    let rank = king.color.back_rank();
    if king.has_moved || king.position != Position::new(KING_FILE, rank) {
        return;
    }
    let enemy = king.color.opponent();
    if is_square_attacked(board, king.position, enemy) {
        return;
    }

    // (rook file, squares that must be empty, squares the king crosses, king target)
    let sides: [(i8, &[i8], [i8; 2], i8); 2] = [
        (7, &[5, 6], [5, 6], 6),
        (0, &[1, 2, 3], [3, 2], 2),
    ];
    for (rook_file, between, crossed, target) in sides {
        let rook_ok = board.get(Position::new(rook_file, rank)).is_some_and(|rook| {
            rook.piece_type == PieceType::Rook && rook.color == king.color && !rook.has_moved
        });
        if !rook_ok {
            continue;
        }
        if !between.iter().all(|&x| board.is_empty(Position::new(x, rank))) {
            continue;
        }
        if crossed
            .iter()
            .any(|&x| is_square_attacked(board, Position::new(x, rank), enemy))
        {
            continue;
        }
        moves.push(Position::new(target, rank));
    }
}

// ============================================================================
// LEGALITY
// ============================================================================

/// Board after moving `from` to `to`, including en passant removal and the
/// castling rook. Used to test whether the mover's king ends up attacked.
fn simulate(board: &BoardState, from: Position, to: Position, en_passant: Option<Position>) -> BoardState {
    let mut next = board.clone();
    let piece = match next.relocate(from, to) {
        Some(p) => p,
        None => return next,
    };

    match piece.piece_type {
        PieceType::King => {
            next.set_king_position(piece.color, to);
            if (to.x - from.x).abs() == 2 {
                let (rook_from, rook_to) = castle_rook_files(to.x);
                next.relocate(Position::new(rook_from, from.y), Position::new(rook_to, from.y));
            }
        }
        PieceType::Pawn if en_passant == Some(to) && from.x != to.x => {
            next.take(Position::new(to.x, from.y));
        }
        _ => {}
    }
    next
}

/// Rook (from, to) files for a castling king landing on `king_target_file`
pub(crate) fn castle_rook_files(king_target_file: i8) -> (i8, i8) {
    if king_target_file > KING_FILE {
        (7, 5)
    } else {
        (0, 3)
    }
}

/// Whether moving `from` to `to` keeps the mover's king out of check
pub fn keeps_king_safe(
    board: &BoardState,
    from: Position,
    to: Position,
    en_passant: Option<Position>,
) -> bool {
    let color = match board.get(from) {
        Some(piece) => piece.color,
        None => return false,
    };
    !is_king_in_check(&simulate(board, from, to, en_passant), color)
}

/// Every square the piece on `from` may legally move to
pub fn legal_destinations(
    board: &BoardState,
    from: Position,
    en_passant: Option<Position>,
) -> Vec<Position> {
    pseudo_legal_destinations(board, from, en_passant)
        .into_iter()
        .filter(|&to| keeps_king_safe(board, from, to, en_passant))
        .collect()
}

/// Whether `color` has at least one legal move
pub fn has_legal_moves(board: &BoardState, color: Color, en_passant: Option<Position>) -> bool {
    board
        .pieces()
        .filter(|piece| piece.color == color)
        .any(|piece| {
            pseudo_legal_destinations(board, piece.position, en_passant)
                .into_iter()
                .any(|to| keeps_king_safe(board, piece.position, to, en_passant))
        })
}

/// Check a move request against the current state without mutating it
pub fn validate_move(state: &GameState, request: &MoveRequest) -> Result<(), MoveError> {
    if state.resolve.is_some() {
        return Err(MoveError::GameOver);
    }
    for pos in [request.from, request.to] {
        if !pos.is_valid() {
            return Err(MoveError::OutOfBounds(pos));
        }
    }

    let board = &state.board;
    let piece = board
        .get(request.from)
        .ok_or(MoveError::EmptySquare(request.from))?;
    if piece.color != state.to_move {
        return Err(MoveError::NotYourTurn);
    }

    let en_passant = state.en_passant_target;
    if !pseudo_legal_destinations(board, request.from, en_passant).contains(&request.to) {
        return Err(MoveError::IllegalMove);
    }
    if !keeps_king_safe(board, request.from, request.to, en_passant) {
        return Err(MoveError::KingLeftInCheck);
    }

    let promotes = piece.is_pawn() && request.to.y == piece.color.promotion_rank();
    match request.promotion {
        None if promotes => Err(MoveError::PromotionRequired),
        Some(target) if !promotes || !target.is_promotion_target() => {
            Err(MoveError::InvalidPromotion)
        }
        _ => Ok(()),
    }
}
