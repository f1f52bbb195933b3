use std::str::FromStr;

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum IdListError {
    #[error("empty entry in id list '{0}'")]
    Empty(String),
    #[error("'{0}' is not a valid id")]
    InvalidNumber(String),
    #[error("range {start}-{end} runs backwards")]
    Reversed { start: u64, end: u64 },
    #[error("range {start}-{end} expands past {} ids", MAX_IDS)]
    TooWide { start: u64, end: u64 },
}

/// Most ids one list may expand to.
pub const MAX_IDS: usize = 1_000_000;

/// Comma separated ids and inclusive ranges, e.g. `1-10,15,20-22`.
///
/// Order of first appearance is kept; repeats are dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdList(pub Vec<u64>);

impl IdList {
    pub fn into_inner(self) -> Vec<u64> {
        self.0
    }
}

impl FromStr for IdList {
    type Err = IdListError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut ids: Vec<u64> = Vec::new();
        for part in s.split(',') {
            let part = part.trim();
            if part.is_empty() {
                return Err(IdListError::Empty(s.to_string()));
            }
            match part.split_once('-') {
                Some((a, b)) => {
                    let start = parse_id(a)?;
                    let end = parse_id(b)?;
                    if start > end {
                        return Err(IdListError::Reversed { start, end });
                    }
                    // `end - start` cannot underflow after the order check.
                    let room = (MAX_IDS - ids.len()) as u64;
                    if end - start >= room {
                        return Err(IdListError::TooWide { start, end });
                    }
                    ids.extend(start..=end);
                }
                None => {
                    let id = parse_id(part)?;
                    if ids.len() >= MAX_IDS {
                        return Err(IdListError::TooWide { start: id, end: id });
                    }
                    ids.push(id);
                }
            }
        }
        let mut seen = std::collections::HashSet::new();
        ids.retain(|id| seen.insert(*id));
        Ok(IdList(ids))
    }
}

fn parse_id(s: &str) -> Result<u64, IdListError> {
    let s = s.trim();
    s.parse().map_err(|_| IdListError::InvalidNumber(s.to_string()))
}
