mod bestpath;
mod book;
mod extract;
mod ingest;
mod link;
mod maintain;
mod negamax;
mod options;
mod persistence;
mod position;
mod prune;
mod query;
mod search;
mod stats;
mod store;

pub use bestpath::*;
pub use book::Book;
pub use ingest::*;
pub use link::*;
pub use maintain::*;
pub use options::*;
pub use position::*;
pub use prune::*;
pub use query::*;
pub use search::*;
pub use stats::*;
pub use store::*;
