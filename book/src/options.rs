use anyhow::Result;
use common::{Config, ConfigLoader};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookOptions {
    /// Search level used when analysing positions.
    pub level: u8,
    /// Depth of the book. `fill` does not expand positions with this many empty squares or fewer,
    /// and `prune` removes the positions with fewer.
    pub n_empties: u8,
    /// Tolerated loss, in discs, for a move to stay in the book before the endgame.
    pub midgame_error: i32,
    /// Tolerated loss once the position is solved exactly at `level`.
    pub endcut_error: i32,
    pub verbosity: u8,
    /// Seed of the random move selection. A random seed is drawn when absent.
    #[serde(default)]
    pub seed: Option<u64>,
}

impl BookOptions {
    /// The error tolerance that applies to a position with `n_empties` empty squares.
    pub fn error_for(&self, n_empties: u8) -> i32 {
        if n_empties <= self.level {
            self.endcut_error
        } else {
            self.midgame_error
        }
    }
}

impl Default for BookOptions {
    fn default() -> Self {
        Self {
            level: 10,
            n_empties: 24,
            midgame_error: 2,
            endcut_error: 16,
            verbosity: 1,
            seed: None,
        }
    }
}

impl Config for BookOptions {
    fn load(config: &ConfigLoader) -> Result<Self> {
        let defaults = Self::default();

        Ok(Self {
            level: config
                .get("level")
                .and_then(|v| v.as_u8())
                .unwrap_or(defaults.level),
            n_empties: config
                .get("n_empties")
                .and_then(|v| v.as_u8())
                .unwrap_or(defaults.n_empties),
            midgame_error: config
                .get("midgame_error")
                .and_then(|v| v.as_i32())
                .unwrap_or(defaults.midgame_error),
            endcut_error: config
                .get("endcut_error")
                .and_then(|v| v.as_i32())
                .unwrap_or(defaults.endcut_error),
            verbosity: config
                .get("verbosity")
                .and_then(|v| v.as_u8())
                .unwrap_or(defaults.verbosity),
            seed: config
                .get("seed")
                .and_then(|v| v.as_usize())
                .map(|seed| seed as u64),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = BookOptions::default();
        assert_eq!(options.level, 10);
        assert_eq!(options.n_empties, 24);
        assert_eq!(options.midgame_error, 2);
        assert_eq!(options.endcut_error, 16);
        assert_eq!(options.verbosity, 1);
    }

    #[test]
    fn test_error_for_switches_at_level() {
        let options = BookOptions::default();
        assert_eq!(options.error_for(10), 16);
        assert_eq!(options.error_for(11), 2);
    }

    #[test]
    fn test_load_from_scoped_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("client.conf");
        std::fs::write(&path, "book { level = 5, midgame_error = 4 }\nverbosity = 2\n").unwrap();

        let config = ConfigLoader::new(&path, "book".to_string()).unwrap();
        let options: BookOptions = config.load().unwrap();

        assert_eq!(options.level, 5);
        assert_eq!(options.midgame_error, 4);
        assert_eq!(options.verbosity, 2);
        assert_eq!(options.n_empties, 24);
    }
}
