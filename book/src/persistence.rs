use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;
use std::str::FromStr;

use anyhow::{anyhow, bail, Context, Result};
use chrono::{DateTime, Utc};
use common::FsExt;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use log::{info, warn};
use serde::{Deserialize, Serialize};

use othello::{
    parse_square, square_to_string, symmetric_square, Board, BOARD_SIZE, SCORE_MAX, SCORE_MIN,
};

use crate::{Book, BookOptions, Link, Position, PositionStore, Score};

const FORMAT: &str = "opening-book";
const VERSION: u32 = 1;

#[derive(Serialize)]
struct BookFileRef<'a> {
    format: &'a str,
    version: u32,
    date: DateTime<Utc>,
    options: &'a BookOptions,
    positions: &'a [Position],
}

#[derive(Deserialize)]
struct BookFile {
    format: String,
    version: u32,
    date: DateTime<Utc>,
    options: BookOptions,
    positions: Vec<Position>,
}

impl Book {
    /// Reads a book written by `save`. The best-path overlay starts empty.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).with_context(|| format!("Failed to open {:?}", path))?;
        let content = GzDecoder::new(file);
        let book_file: BookFile = serde_json::from_reader(content)
            .with_context(|| format!("Failed to read book {:?}", path))?;

        if book_file.format != FORMAT || book_file.version != VERSION {
            bail!(
                "Unsupported book format {:?} version {} in {:?}",
                book_file.format,
                book_file.version,
                path
            );
        }
        for position in &book_file.positions {
            check_position(position).with_context(|| format!("In {:?}", path))?;
        }

        let mut book = Book::new(book_file.options);
        book.store = PositionStore::from_positions(book_file.positions);
        book.date = book_file.date;
        book.need_saving = false;

        if book.options.verbosity > 0 {
            info!("Loaded {} positions from {:?}", book.len(), path);
        }

        Ok(book)
    }

    /// Replaces the content of the book with the one stored at `path`. The attached search is
    /// kept. On failure the book is left empty.
    pub fn reload(&mut self, path: impl AsRef<Path>) -> Result<()> {
        match Book::load(path) {
            Ok(loaded) => {
                self.store = loaded.store;
                self.options = loaded.options;
                self.date = loaded.date;
                self.need_saving = false;
                self.bestpath.write().clear();
                Ok(())
            }
            Err(err) => {
                self.store.clear();
                self.bestpath.write().clear();
                self.date = Utc::now();
                self.need_saving = false;
                Err(err)
            }
        }
    }

    /// Writes the book sorted by board and stamps it with the current date.
    pub fn save(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        self.store.sort();
        self.date = Utc::now();

        path.ensure_parent_dir()?;
        let file = File::create(path).with_context(|| format!("Failed to create {:?}", path))?;
        let mut compressor = GzEncoder::new(file, Compression::default());
        serde_json::to_writer(
            &mut compressor,
            &BookFileRef {
                format: FORMAT,
                version: VERSION,
                date: self.date,
                options: &self.options,
                positions: self.store.as_slice(),
            },
        )?;
        compressor.finish()?;

        self.need_saving = false;
        if self.options.verbosity > 0 {
            info!("Saved {} positions to {:?}", self.len(), path);
        }

        Ok(())
    }

    /// Writes one line of text per position, sorted by board.
    pub fn export(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        self.store.sort();

        path.ensure_parent_dir()?;
        let file = File::create(path).with_context(|| format!("Failed to create {:?}", path))?;
        let mut writer = BufWriter::new(file);
        writer.write_all(self.to_text().as_bytes())?;
        writer.flush()?;

        if self.options.verbosity > 0 {
            info!("Exported {} positions to {:?}", self.len(), path);
        }

        Ok(())
    }

    /// Adds the positions of a text export. Positions already in the book are replaced. Nothing is
    /// added when a line is malformed. Returns the number of positions read.
    ///
    /// The text carries no flags. DONE follows from the bounds and a position is TODO when it is
    /// not over, has no leaf and some of its moves are unlinked.
    pub fn import(&mut self, path: impl AsRef<Path>) -> Result<usize> {
        let path = path.as_ref();
        let text =
            fs::read_to_string(path).with_context(|| format!("Failed to read {:?}", path))?;
        let positions = parse_text(&text).with_context(|| format!("In {:?}", path))?;
        let n_positions = positions.len();

        for position in positions {
            self.store.insert(position);
        }
        if n_positions > 0 {
            self.need_saving = true;
        }
        if self.options.verbosity > 0 {
            info!("Imported {} positions from {:?}", n_positions, path);
        }

        Ok(n_positions)
    }

    pub fn to_text(&self) -> String {
        let mut text = String::from(
            "# board level value lower upper wins draws losses lines leaf links\n",
        );
        for position in self.store.iter() {
            text.push_str(&format_position(position));
            text.push('\n');
        }
        text
    }

    /// Builds a book from a text export, with the flags derived as in `import`.
    pub fn from_text(text: &str, options: BookOptions) -> Result<Self> {
        let mut book = Book::new(options);
        book.store = PositionStore::from_positions(parse_text(text)?);
        Ok(book)
    }
}

fn parse_text(text: &str) -> Result<Vec<Position>> {
    let mut positions = Vec::new();

    for (index, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let position = parse_position(line).with_context(|| format!("Line {}", index + 1))?;
        positions.push(position);
    }

    Ok(positions)
}

fn format_position(position: &Position) -> String {
    let leaf = position
        .leaf
        .map_or_else(|| "--".to_string(), |leaf| format_link(&leaf));
    let links = if position.links.is_empty() {
        "--".to_string()
    } else {
        position
            .links
            .iter()
            .map(format_link)
            .collect::<Vec<_>>()
            .join(",")
    };

    format!(
        "{} {} {} {} {} {} {} {} {} {} {}",
        position.board.to_compact(),
        position.level,
        position.score.value,
        position.score.lower,
        position.score.upper,
        position.n_wins,
        position.n_draws,
        position.n_losses,
        position.n_lines,
        leaf,
        links
    )
}

fn format_link(link: &Link) -> String {
    format!("{}:{}", square_to_string(link.square), link.score)
}

fn parse_link(s: &str) -> Result<Link> {
    let (square, score) = s
        .split_once(':')
        .ok_or_else(|| anyhow!("Invalid move {:?}, expected square:score", s))?;
    Ok(Link::new(parse_square(square)?, parse_score(score, "score")?))
}

fn parse_score(s: &str, name: &str) -> Result<i32> {
    let score = parse_field(s, name)?;
    check_score(score, name)?;
    Ok(score)
}

fn check_score(score: i32, name: &str) -> Result<()> {
    if !(SCORE_MIN..=SCORE_MAX).contains(&score) {
        bail!("The {} {} is out of [{}, {}]", name, score, SCORE_MIN, SCORE_MAX);
    }
    Ok(())
}

/// Rejects stored positions with an invalid board or scores out of range.
fn check_position(position: &Position) -> Result<()> {
    if !position.board.is_valid() {
        bail!("Invalid board\n{}", position.board);
    }
    let score = position.score;
    check_score(score.value, "value")?;
    check_score(score.lower, "lower")?;
    check_score(score.upper, "upper")?;
    if score.lower > score.upper {
        bail!("Lower bound {} above upper bound {}", score.lower, score.upper);
    }
    for link in position.links.iter().chain(position.leaf.iter()) {
        check_score(link.score, "score")?;
    }
    Ok(())
}

fn parse_field<T: FromStr>(s: &str, name: &str) -> Result<T> {
    s.parse()
        .map_err(|_| anyhow!("Invalid {} {:?}", name, s))
}

/// Parses one exported position. Boards that are not in canonical form are turned into it along
/// with their moves.
fn parse_position(line: &str) -> Result<Position> {
    let fields = line.split_whitespace().collect::<Vec<_>>();
    let [board, level, value, lower, upper, wins, draws, losses, lines, leaf, links] =
        fields.as_slice()
    else {
        bail!("Expected 11 fields, found {}", fields.len());
    };

    let board = board.parse::<Board>()?;
    if !board.is_valid() {
        bail!("Invalid board\n{}", board);
    }
    let (canonical, symmetry) = board.unique();
    let to_canonical = |link: Link| -> Result<Link> {
        if link.square as usize >= BOARD_SIZE || !board.is_legal(link.square) {
            bail!("Illegal move {}", square_to_string(link.square));
        }
        Ok(Link::new(symmetric_square(link.square, symmetry), link.score))
    };

    let mut position = Position::new(canonical);
    position.level = parse_field(level, "level")?;
    position.score = Score::new(
        parse_score(value, "value")?,
        parse_score(lower, "lower")?,
        parse_score(upper, "upper")?,
    );
    if position.score.lower > position.score.upper {
        bail!(
            "Lower bound {} above upper bound {}",
            position.score.lower,
            position.score.upper
        );
    }
    position.score.clamp();
    position.n_wins = parse_field(wins, "wins")?;
    position.n_draws = parse_field(draws, "draws")?;
    position.n_losses = parse_field(losses, "losses")?;
    position.n_lines = parse_field(lines, "lines")?;

    if *leaf != "--" {
        position.leaf = Some(to_canonical(parse_link(leaf)?)?);
    }
    if *links != "--" {
        for link in links.split(',') {
            let link = to_canonical(parse_link(link)?)?;
            if position.has_link(link.square) {
                warn!("Duplicate link {} ignored", square_to_string(link.square));
                continue;
            }
            position.add_link(link);
        }
    }

    position.update_done();
    position.flags.todo =
        !position.is_game_over() && position.leaf.is_none() && !position.is_fully_linked();

    Ok(position)
}
