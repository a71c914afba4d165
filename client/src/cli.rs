use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[clap(author, version)]
#[clap(name = "Opening Book Client")]
#[clap(about = "Builds, maintains and queries an opening book", long_about = None)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Creates a book holding the initial position.
    New(BookArgs),
    Info(BookArgs),
    /// Adds the positions of a text export.
    Import(FileCommand),
    Export(FileCommand),
    Link(BookArgs),
    Fix(BookArgs),
    Negamax(BookArgs),
    Prune(BookArgs),
    Deepen(BookArgs),
    Fill(FillCommand),
    Play(BookArgs),
    Merge(FileCommand),
    /// Keeps only the positions reachable from a position.
    Subtree(PositionCommand),
    Show(ShowCommand),
    Deviate(WidenCommand),
    Enhance(WidenCommand),
    /// Adds a file of games, one move sequence per line.
    AddGames(FileCommand),
    CheckGames(FileCommand),
    /// Writes the best lines of the book as a file of games.
    Skeleton(FileCommand),
    Bestpath(BestPathCommand),
}

#[derive(Args)]
pub struct BookArgs {
    #[clap(short, long, default_value_t = String::from("client.conf"))]
    pub config: String,

    /// Path of the book file. Defaults to `book_file` of the config, then to `book.gz`.
    #[clap(short, long)]
    pub book: Option<String>,

    #[clap(short, long)]
    pub level: Option<u8>,

    #[clap(short, long)]
    pub verbosity: Option<u8>,
}

#[derive(Args)]
pub struct FileCommand {
    #[clap(flatten)]
    pub book: BookArgs,

    pub file: String,
}

#[derive(Args)]
pub struct FillCommand {
    #[clap(flatten)]
    pub book: BookArgs,

    /// Positions with this many empty squares or fewer are not expanded. Defaults to the
    /// configured value.
    #[clap(short, long)]
    pub n_empties: Option<u8>,
}

#[derive(Args)]
pub struct PositionCommand {
    #[clap(flatten)]
    pub book: BookArgs,

    /// Moves leading to the position from the initial one, such as f5d6c3.
    #[clap(default_value_t = String::new())]
    pub line: String,
}

#[derive(Args)]
pub struct ShowCommand {
    #[clap(flatten)]
    pub position: PositionCommand,

    /// Prints the position as JSON.
    #[clap(long)]
    pub json: bool,
}

#[derive(Args)]
pub struct WidenCommand {
    #[clap(flatten)]
    pub position: PositionCommand,

    #[clap(short, long, default_value_t = 2)]
    pub width: usize,

    #[clap(short, long, default_value_t = 4)]
    pub depth: usize,
}

#[derive(Args)]
pub struct BestPathCommand {
    #[clap(flatten)]
    pub position: PositionCommand,

    #[clap(long, default_value_t = 0)]
    pub min_empties: u8,

    #[clap(long, default_value_t = 60)]
    pub max_empties: u8,
}
