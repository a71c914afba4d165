/// Rules of a two player, alternating, perfect information game.
pub trait GameEngine {
    type Action;
    type State;
    type Terminal;

    /// Applies an action that must be legal in `game_state`.
    fn take_action(&self, game_state: &Self::State, action: &Self::Action) -> Self::State;

    /// 1 for the first player, 2 for the second.
    fn player_to_move(&self, game_state: &Self::State) -> usize;

    fn move_number(&self, game_state: &Self::State) -> usize;

    /// The outcome from the perspective of the player to move, or `None` while the game continues.
    fn terminal_state(&self, game_state: &Self::State) -> Option<Self::Terminal>;
}

pub trait ValidActions {
    type Action;
    type State;

    fn valid_actions(&self, game_state: &Self::State) -> Vec<Self::Action>;
}
