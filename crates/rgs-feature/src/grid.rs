//! Symbol grid with reel-major linear addressing
//!
//! ```text
//!            reel 0   reel 1   reel 2
//!   row 0      0        3        6
//!   row 1      1        4        7
//!   row 2      2        5        8
//! ```
//!
//! Every position list in the effect library uses `reel * rows + row`.

use serde::{Deserialize, Serialize};

use crate::error::DataError;

/// Symbol id
pub type Symbol = i32;

/// Placeholder for cells no reel has filled yet
pub const EMPTY: Symbol = -1;

/// Linear position of a cell
pub fn encode(rows: usize, reel: usize, row: usize) -> usize {
    reel * rows + row
}

/// Cell of a linear position, as `(reel, row)`
pub fn decode(rows: usize, position: usize) -> (usize, usize) {
    if rows == 0 {
        return (0, 0);
    }
    (position / rows, position % rows)
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grid {
    reels: usize,
    rows: usize,
    cells: Vec<Symbol>,
}

impl Grid {
    /// Grid of `reels x rows` empty cells
    pub fn new(reels: usize, rows: usize) -> Self {
        Self::filled(reels, rows, EMPTY)
    }

    pub fn filled(reels: usize, rows: usize, symbol: Symbol) -> Self {
        Self {
            reels,
            rows,
            cells: vec![symbol; reels * rows],
        }
    }

    /// Build from reel columns (top row first); all reels must have equal height
    pub fn from_reels(columns: Vec<Vec<Symbol>>) -> Result<Self, DataError> {
        let rows = columns.first().map_or(0, Vec::len);
        if let Some(bad) = columns.iter().position(|c| c.len() != rows) {
            return Err(DataError::Malformed(format!(
                "reel {} has {} rows, expected {}",
                bad,
                columns[bad].len(),
                rows
            )));
        }
        Ok(Self {
            reels: columns.len(),
            rows,
            cells: columns.into_iter().flatten().collect(),
        })
    }

    pub fn reels(&self) -> usize {
        self.reels
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn cells(&self) -> &[Symbol] {
        &self.cells
    }

    /// Linear position of a cell, checked against the grid shape
    pub fn position(&self, reel: usize, row: usize) -> Result<usize, DataError> {
        if reel >= self.reels || row >= self.rows {
            return Err(DataError::CellOutOfBounds {
                reel,
                row,
                reels: self.reels,
                rows: self.rows,
            });
        }
        Ok(encode(self.rows, reel, row))
    }

    /// Cell of a linear position, checked against the grid shape
    pub fn cell(&self, position: usize) -> Result<(usize, usize), DataError> {
        self.check(position)?;
        Ok(decode(self.rows, position))
    }

    fn check(&self, position: usize) -> Result<(), DataError> {
        if position >= self.cells.len() {
            return Err(DataError::PositionOutOfBounds {
                position,
                len: self.cells.len(),
            });
        }
        Ok(())
    }

    pub fn get(&self, position: usize) -> Result<Symbol, DataError> {
        self.check(position)?;
        Ok(self.cells[position])
    }

    pub fn set(&mut self, position: usize, symbol: Symbol) -> Result<(), DataError> {
        self.check(position)?;
        self.cells[position] = symbol;
        Ok(())
    }

    /// Set every listed position, failing before any write if one is out of bounds
    pub fn set_all(&mut self, positions: &[usize], symbol: Symbol) -> Result<(), DataError> {
        for &p in positions {
            self.check(p)?;
        }
        for &p in positions {
            self.cells[p] = symbol;
        }
        Ok(())
    }

    pub fn at(&self, reel: usize, row: usize) -> Result<Symbol, DataError> {
        let position = self.position(reel, row)?;
        Ok(self.cells[position])
    }

    /// Symbols of one reel, top row first
    pub fn reel(&self, reel: usize) -> Result<&[Symbol], DataError> {
        let start = self.position(reel, 0)?;
        Ok(&self.cells[start..start + self.rows])
    }

    /// Linear positions of one reel
    pub fn reel_positions(&self, reel: usize) -> Result<Vec<usize>, DataError> {
        let start = self.position(reel, 0)?;
        Ok((start..start + self.rows).collect())
    }

    /// Positions holding `symbol`, ascending
    pub fn positions_of(&self, symbol: Symbol) -> Vec<usize> {
        self.cells
            .iter()
            .enumerate()
            .filter(|&(_, &s)| s == symbol)
            .map(|(p, _)| p)
            .collect()
    }

    pub fn count(&self, symbol: Symbol) -> usize {
        self.cells.iter().filter(|&&s| s == symbol).count()
    }

    /// Reel columns, top row first
    pub fn to_reels(&self) -> Vec<Vec<Symbol>> {
        if self.rows == 0 {
            return vec![Vec::new(); self.reels];
        }
        self.cells.chunks(self.rows).map(<[Symbol]>::to_vec).collect()
    }
}
