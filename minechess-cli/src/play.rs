//! Play command - replay coordinate moves through the engine
//!
//! ## Architecture (4-layer granularity)
//!
//! - Level 1: run() - orchestration
//! - Level 2: parse_moves(), replay(), report_results()
//! - Level 3: (delegated to minechess-core)
//! - Level 4: formatting utilities

use anyhow::{Context, Result};
use clap::Args;

use minechess_core::{GameState, MoveRequest, Resolution};

// ============================================================================
// COMMAND ARGUMENTS (Level 4 - Configuration)
// ============================================================================

#[derive(Args)]
pub struct PlayArgs {
    /// Moves in coordinate notation, e.g. e2e4 e7e5 g1f3 (append q/r/b/n to promote)
    #[arg(required = true, value_name = "MOVE")]
    pub moves: Vec<String>,

    /// Print the final game state as JSON
    #[arg(long)]
    pub json: bool,
}

// ============================================================================
// LEVEL 1 - ORCHESTRATION
// ============================================================================

/// Run play command
///
/// 1. Parse every move up front
/// 2. Replay them from the starting position
/// 3. Report the final position
pub fn run(args: PlayArgs) -> Result<()> {
    let requests = parse_moves(&args.moves)?;

    tracing::debug!("Replaying {} moves", requests.len());

    let state = replay(&requests, &args.moves)?;

    report_results(&state, args.json)
}

// ============================================================================
// LEVEL 2 - PHASES
// ============================================================================

fn parse_moves(moves: &[String]) -> Result<Vec<MoveRequest>> {
    moves
        .iter()
        .map(|text| {
            MoveRequest::parse(text).with_context(|| format!("Cannot parse move: {}", text))
        })
        .collect()
}

/// Apply moves in order, stopping at the first rejection
fn replay(requests: &[MoveRequest], labels: &[String]) -> Result<GameState> {
    let mut state = GameState::new();
    for (index, (request, label)) in requests.iter().zip(labels).enumerate() {
        state
            .make_move(*request)
            .with_context(|| format!("Move {} ({}) rejected", index + 1, label))?;
    }
    Ok(state)
}

fn report_results(state: &GameState, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(state)?);
    } else {
        print_text_results(state);
    }
    Ok(())
}

// ============================================================================
// LEVEL 4 - FORMATTING
// ============================================================================

fn print_text_results(state: &GameState) {
    println!("{}", format_history(state));
    println!("{}", format_status(state));
}

/// Numbered move list, e.g. `1. e4 e5 2. Nf3`
fn format_history(state: &GameState) -> String {
    state
        .move_history
        .iter()
        .enumerate()
        .map(|(i, mv)| match &mv.black_ply {
            Some(black) => format!("{}. {} {}", i + 1, mv.white_ply.notation, black.notation),
            None => format!("{}. {}", i + 1, mv.white_ply.notation),
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn format_status(state: &GameState) -> String {
    match state.resolve {
        Some(Resolution::Checkmate) => {
            format!("Checkmate, {} wins", state.to_move.opponent())
        }
        Some(Resolution::Stalemate) => "Stalemate".to_string(),
        None if state.is_check => format!("{} to move (in check)", state.to_move),
        None => format!("{} to move", state.to_move),
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn moves(line: &[&str]) -> Vec<String> {
        line.iter().map(|m| m.to_string()).collect()
    }

    fn play(line: &[&str]) -> Result<GameState> {
        let labels = moves(line);
        let requests = parse_moves(&labels)?;
        replay(&requests, &labels)
    }

    #[test]
    fn test_replay_and_history() {
        let state = play(&["e2e4", "e7e5", "g1f3"]).unwrap();
        assert_eq!(format_history(&state), "1. e4 e5 2. Nf3");
        assert_eq!(format_status(&state), "black to move");
    }

    #[test]
    fn test_checkmate_status() {
        let state = play(&["f2f3", "e7e5", "g2g4", "d8h4"]).unwrap();
        assert_eq!(format_status(&state), "Checkmate, black wins");
    }

    #[test]
    fn test_bad_input_reported() {
        let err = play(&["e2e4", "xx"]).unwrap_err();
        assert!(err.to_string().contains("Cannot parse move: xx"));

        let err = play(&["e2e4", "e2e4"]).unwrap_err();
        assert!(err.to_string().contains("Move 2 (e2e4) rejected"));
    }
}
