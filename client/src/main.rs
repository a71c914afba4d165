mod cli;

use std::path::PathBuf;

use anyhow::{anyhow, Result};
use book::{Book, BookOptions};
use clap::Parser;
use cli::{BookArgs, Cli, Commands, PositionCommand};
use common::{get_env_u64, ConfigLoader, FsExt};
use dotenv::dotenv;
use env_logger::Env;
use log::info;
use othello::{Base, Board, Game, Search};

const DEFAULT_BOOK: &str = "book.gz";

fn main() -> Result<()> {
    dotenv().ok();
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    match &cli.command {
        Commands::New(args) => {
            let (options, path) = load_config(args)?;
            let mut book = Book::new(options);
            book.add_board(&Board::initial())?;
            book.save(path)?;
        }
        Commands::Info(args) => {
            let book = open_book(args)?;
            println!("{}", book.info());
        }
        Commands::Import(command) => {
            let mut book = open_book(&command.book)?;
            book.import(input_file(&command.file)?)?;
            book.link();
            book.negamax();
            close_book(book, &command.book)?;
        }
        Commands::Export(command) => {
            let mut book = open_book(&command.book)?;
            book.export(&command.file)?;
        }
        Commands::Link(args) => {
            let mut book = open_book(args)?;
            book.link();
            book.negamax();
            close_book(book, args)?;
        }
        Commands::Fix(args) => {
            let mut book = open_book(args)?;
            book.fix();
            book.correct_solved();
            book.negamax();
            close_book(book, args)?;
        }
        Commands::Negamax(args) => {
            let mut book = open_book(args)?;
            book.negamax();
            close_book(book, args)?;
        }
        Commands::Prune(args) => {
            let mut book = open_book(args)?;
            book.negamax();
            book.prune();
            book.negamax();
            close_book(book, args)?;
        }
        Commands::Deepen(args) => {
            let mut book = open_book(args)?;
            book.deepen()?;
            close_book(book, args)?;
        }
        Commands::Fill(command) => {
            let mut book = open_book(&command.book)?;
            let n_empties = command.n_empties.unwrap_or(book.options().n_empties);
            book.fill(n_empties);
            close_book(book, &command.book)?;
        }
        Commands::Play(args) => {
            let mut book = open_book(args)?;
            book.play();
            close_book(book, args)?;
        }
        Commands::Merge(command) => {
            let mut book = open_book(&command.book)?;
            let other = Book::load(input_file(&command.file)?)?;
            book.merge(&other);
            book.link();
            book.negamax();
            close_book(book, &command.book)?;
        }
        Commands::Subtree(command) => {
            let mut book = open_book(&command.book)?;
            book.subtree(&board_from_line(&command.line)?)?;
            close_book(book, &command.book)?;
        }
        Commands::Show(command) => {
            let book = open_book(&command.position.book)?;
            let board = board_from_line(&command.position.line)?;
            if command.json {
                let view = book
                    .show_for_api(&board)
                    .ok_or_else(|| anyhow!("Position not in the book"))?;
                println!("{}", serde_json::to_string_pretty(&view)?);
            } else {
                let text = book
                    .show(&board)
                    .ok_or_else(|| anyhow!("Position not in the book"))?;
                println!("{}", text);
            }
        }
        Commands::Deviate(command) => {
            let mut book = open_book(&command.position.book)?;
            let board = board_from_line(&command.position.line)?;
            book.deviate(&board, command.width, command.depth)?;
            close_book(book, &command.position.book)?;
        }
        Commands::Enhance(command) => {
            let mut book = open_book(&command.position.book)?;
            let board = board_from_line(&command.position.line)?;
            book.enhance(&board, command.width, command.depth)?;
            close_book(book, &command.position.book)?;
        }
        Commands::AddGames(command) => {
            let mut book = open_book(&command.book)?;
            let base = Base::load(input_file(&command.file)?)?;
            book.add_base(&base)?;
            book.negamax();
            close_book(book, &command.book)?;
        }
        Commands::CheckGames(command) => {
            let book = open_book(&command.book)?;
            let base = Base::load(input_file(&command.file)?)?;
            let report = book.check_base(&base);
            println!(
                "{} games: {} complete, {} illegal, {} positions missing, {} deviations",
                report.n_games,
                report.n_complete,
                report.n_illegal,
                report.n_missing,
                report.n_deviations
            );
        }
        Commands::Skeleton(command) => {
            let book = open_book(&command.book)?;
            let base = book.extract_skeleton();
            base.save(command.file.relative_to_cwd()?)?;
            info!("Wrote {} lines to {}", base.len(), command.file);
        }
        Commands::Bestpath(command) => {
            let book = open_book(&command.position.book)?;
            let board = board_from_line(&command.position.line)?;
            let outcome = book.count_board_bestpath(
                &board,
                command.min_empties..=command.max_empties,
                |_| {},
            )?;
            println!("{:?}", outcome);
        }
    }

    Ok(())
}

/// Options and book path from the config file, overridden by the command line.
fn load_config(args: &BookArgs) -> Result<(BookOptions, PathBuf)> {
    let config_path = args.config.relative_to_cwd()?;
    let config = if config_path.is_file() {
        ConfigLoader::new(config_path, "book".to_string())?
    } else {
        ConfigLoader::empty("book".to_string())
    };

    let path = match &args.book {
        Some(book) => book.relative_to_cwd()?,
        None => config
            .get_relative_path("book_file")
            .or_else(|_| DEFAULT_BOOK.relative_to_cwd())?,
    };

    let mut options: BookOptions = config.load()?;
    if let Some(level) = args.level {
        options.level = level;
    }
    if let Some(verbosity) = args.verbosity {
        options.verbosity = verbosity;
    }
    if options.seed.is_none() {
        options.seed = get_env_u64("BOOK_SEED");
    }

    Ok((options, path))
}

/// Loads the book with the current options and the reference search attached. A missing book
/// file starts an empty book.
fn open_book(args: &BookArgs) -> Result<Book> {
    let (options, path) = load_config(args)?;

    let mut book = if path.is_file() {
        Book::load(&path)?
    } else {
        info!("No book at {:?}, starting an empty one", path);
        Book::new(options.clone())
    };
    book.set_options(options);
    book.set_search(Search::new());

    Ok(book)
}

fn close_book(mut book: Book, args: &BookArgs) -> Result<()> {
    if book.need_saving() {
        let (_, path) = load_config(args)?;
        book.save(path)?;
    }
    Ok(())
}

fn input_file(file: &str) -> Result<PathBuf> {
    let path = file.relative_to_cwd()?;
    path.assert_file_exists()?;
    Ok(path)
}

fn board_from_line(line: &str) -> Result<Board> {
    let game = line.parse::<Game>()?;
    let (_, last) = game.plies()?;
    Ok(last.board)
}
