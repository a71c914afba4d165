use std::collections::BTreeMap;
use std::fmt::{self, Display, Formatter};

use log::info;

use crate::Book;

/// Aggregate counters of a book.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BookStats {
    pub n_nodes: usize,
    pub n_links: usize,
    pub n_leaves: usize,
    pub n_todo: usize,
    pub n_done: usize,
    /// Number of positions per count of empty squares.
    pub by_empties: BTreeMap<u8, usize>,
}

impl Display for BookStats {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{} positions, {} links, {} leaves, {} todo, {} done",
            self.n_nodes, self.n_links, self.n_leaves, self.n_todo, self.n_done
        )?;
        for (n_empties, n_positions) in self.by_empties.iter().rev() {
            writeln!(f, "{:>3} empties: {}", n_empties, n_positions)?;
        }
        Ok(())
    }
}

impl Book {
    pub fn stats(&self) -> BookStats {
        self.store
            .iter()
            .fold(BookStats::default(), |mut stats, position| {
                stats.n_nodes += 1;
                stats.n_links += position.links.len();
                stats.n_leaves += usize::from(position.leaf.is_some());
                stats.n_todo += usize::from(position.flags.todo);
                stats.n_done += usize::from(position.flags.done);
                *stats.by_empties.entry(position.n_empties()).or_default() += 1;
                stats
            })
    }

    /// Logs the book summary and returns it.
    pub fn info(&self) -> BookStats {
        let stats = self.stats();
        info!(
            "Book of {}: {} positions, {} links, {} todo",
            self.date.format("%Y-%m-%d %H:%M:%S"),
            stats.n_nodes,
            stats.n_links,
            stats.n_todo
        );
        info!(
            "Level {}, {} empties, errors {}/{}",
            self.options.level,
            self.options.n_empties,
            self.options.midgame_error,
            self.options.endcut_error
        );
        stats
    }

    /// Resets the game statistics of every position.
    pub fn stats_clean(&mut self) {
        for position in self.store.iter_mut().filter(|position| position.has_stats()) {
            position.clear_stats();
            self.need_saving = true;
        }
    }
}
