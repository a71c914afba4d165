use engine::{GameEngine, ValidActions};

use super::{Action, GameState};

#[derive(Default)]
pub struct Engine {}

impl Engine {
    pub fn new() -> Self {
        Self {}
    }
}

impl GameEngine for Engine {
    type Action = Action;
    type State = GameState;
    type Terminal = i32;

    fn take_action(&self, game_state: &Self::State, action: &Self::Action) -> Self::State {
        let board = if action.is_pass() {
            game_state.board.pass()
        } else {
            game_state.board.next(action.square())
        };

        GameState {
            board,
            black_to_move: !game_state.black_to_move,
            ply: game_state.ply + 1,
        }
    }

    fn player_to_move(&self, game_state: &Self::State) -> usize {
        game_state.player_to_move()
    }

    fn move_number(&self, game_state: &Self::State) -> usize {
        game_state.ply / 2 + 1
    }

    fn terminal_state(&self, game_state: &Self::State) -> Option<Self::Terminal> {
        game_state
            .board
            .is_game_over()
            .then(|| game_state.board.final_score())
    }
}

impl ValidActions for Engine {
    type Action = Action;
    type State = GameState;

    /// Legal squares, or a single pass when the side to move is blocked but the game goes on.
    fn valid_actions(&self, game_state: &Self::State) -> Vec<Self::Action> {
        let board = &game_state.board;
        if board.can_move() {
            board.legal_squares().map(Action).collect()
        } else if board.pass().can_move() {
            vec![Action::pass()]
        } else {
            vec![]
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use engine::GameState as GameStateTrait;

    #[test]
    fn test_new_state_is_correct() {
        let state = GameState::initial();
        assert!(state.black_to_move);
        assert_eq!(state.board, crate::Board::initial());
        assert_eq!(state.ply, 0);
    }

    #[test]
    fn test_take_action_switches_player() {
        let engine = Engine::new();
        let state = GameState::initial();
        let action = engine.valid_actions(&state)[0];
        let next = engine.take_action(&state, &action);

        assert!(!next.black_to_move);
        assert_eq!(engine.player_to_move(&next), 2);
        assert_eq!(next.ply, 1);
    }

    #[test]
    fn test_initial_has_four_actions() {
        let engine = Engine::new();
        assert_eq!(engine.valid_actions(&GameState::initial()).len(), 4);
        assert_eq!(engine.terminal_state(&GameState::initial()), None);
    }

    #[test]
    fn test_symmetric_openings_share_a_position() {
        let engine = Engine::new();
        let state = GameState::initial();
        let positions = engine
            .valid_actions(&state)
            .iter()
            .map(|action| engine.take_action(&state, action).position())
            .collect::<std::collections::HashSet<_>>();

        assert_eq!(positions.len(), 1);
        assert!(!positions.contains(&state.position()));
    }

    #[test]
    fn test_full_board_is_terminal() {
        let engine = Engine::new();
        let state = GameState::from_board(crate::Board::new(u64::MAX >> 4, 0xF << 60), true);

        assert_eq!(engine.terminal_state(&state), Some(60 - 4));
        assert!(engine.valid_actions(&state).is_empty());
    }
}
