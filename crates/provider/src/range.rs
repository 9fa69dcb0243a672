//! A1 notation ranges.
//!
//! Tab names are always single-quoted, with embedded quotes doubled:
//! `'Q1 Budget'!A1`, `'Bob''s'!A1`. A bare name such as `Q1` or `FY2024`
//! would otherwise be read as a cell on the first tab.

use crate::error::{ProviderError, ProviderResult};
use std::fmt;

/// A range inside one tab: the whole tab, or an anchor cell to write or
/// append from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct A1Range {
    pub tab: String,
    pub anchor: Option<CellRef>,
}

/// Zero-based cell coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CellRef {
    pub row: usize,
    pub col: usize,
}

impl CellRef {
    pub const ORIGIN: CellRef = CellRef { row: 0, col: 0 };

    /// Parse a cell reference such as `A1` or `AB12`.
    pub fn parse(s: &str) -> ProviderResult<Self> {
        let split = s
            .find(|c: char| c.is_ascii_digit())
            .ok_or_else(|| ProviderError::InvalidRange(s.to_string()))?;
        let (letters, digits) = s.split_at(split);
        if letters.is_empty() || !letters.chars().all(|c| c.is_ascii_uppercase()) {
            return Err(ProviderError::InvalidRange(s.to_string()));
        }

        let col = letters
            .bytes()
            .fold(0usize, |acc, b| {
                acc.saturating_mul(26).saturating_add((b - b'A' + 1) as usize)
            })
            - 1;
        let row: usize = digits
            .parse()
            .map_err(|_| ProviderError::InvalidRange(s.to_string()))?;
        if row == 0 {
            return Err(ProviderError::InvalidRange(s.to_string()));
        }
        Ok(Self { row: row - 1, col })
    }
}

impl fmt::Display for CellRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut letters = Vec::new();
        let mut n = self.col + 1;
        while n > 0 {
            let rem = (n - 1) % 26;
            letters.push(b'A' + rem as u8);
            n = (n - 1) / 26;
        }
        letters.reverse();
        write!(f, "{}{}", String::from_utf8_lossy(&letters), self.row + 1)
    }
}

impl A1Range {
    /// The tab's full value range, with no fixed bound.
    pub fn whole(tab: impl Into<String>) -> Self {
        Self {
            tab: tab.into(),
            anchor: None,
        }
    }

    /// A range anchored at the tab's first cell.
    pub fn origin(tab: impl Into<String>) -> Self {
        Self {
            tab: tab.into(),
            anchor: Some(CellRef::ORIGIN),
        }
    }

    /// The anchor cell, defaulting to the tab origin.
    pub fn start(&self) -> CellRef {
        self.anchor.unwrap_or(CellRef::ORIGIN)
    }
}

/// Quote a tab name for A1 notation.
pub fn quote_tab(tab: &str) -> String {
    format!("'{}'", tab.replace('\'', "''"))
}

impl fmt::Display for A1Range {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tab = quote_tab(&self.tab);
        match self.anchor {
            Some(cell) => write!(f, "{tab}!{cell}"),
            None => f.write_str(&tab),
        }
    }
}
