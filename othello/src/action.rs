use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};

use crate::constants::{NO_MOVE, PASS};

/// A move in the game: a square index from `a1` = 0 to `h8` = 63, or a pass.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Action(pub u8);

impl Action {
    pub fn pass() -> Self {
        Action(PASS)
    }

    pub fn is_pass(&self) -> bool {
        self.0 == PASS
    }

    pub fn square(&self) -> u8 {
        self.0
    }
}

pub fn square_to_string(square: u8) -> String {
    match square {
        PASS => "ps".to_string(),
        NO_MOVE => "--".to_string(),
        s if s < 64 => {
            let file = (b'a' + s % 8) as char;
            let rank = (b'1' + s / 8) as char;
            format!("{}{}", file, rank)
        }
        _ => "??".to_string(),
    }
}

pub fn parse_square(s: &str) -> Result<u8> {
    let lower = s.trim().to_ascii_lowercase();
    match lower.as_str() {
        "ps" | "pa" | "pass" => return Ok(PASS),
        "--" => return Ok(NO_MOVE),
        _ => {}
    }

    let bytes = lower.as_bytes();
    if bytes.len() != 2 {
        return Err(anyhow!("Invalid square: {:?}", s));
    }

    let (file, rank) = (bytes[0], bytes[1]);
    if !(b'a'..=b'h').contains(&file) || !(b'1'..=b'8').contains(&rank) {
        return Err(anyhow!("Invalid square: {:?}", s));
    }

    Ok((rank - b'1') * 8 + (file - b'a'))
}

/// Parses a run of concatenated squares such as `f5d6c3`. Whitespace is ignored.
pub fn parse_squares(s: &str) -> Result<Vec<u8>> {
    let compact: String = s.chars().filter(|c| !c.is_whitespace()).collect();
    if compact.len() % 2 != 0 {
        return Err(anyhow!("Odd length move sequence: {:?}", s));
    }

    compact
        .as_bytes()
        .chunks(2)
        .map(|chunk| parse_square(std::str::from_utf8(chunk)?))
        .collect()
}

impl FromStr for Action {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let square = parse_square(s)?;
        if square == NO_MOVE {
            return Err(anyhow!("{:?} is not a playable move", s));
        }

        Ok(Action(square))
    }
}

impl Display for Action {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "{}", square_to_string(self.0))
    }
}
