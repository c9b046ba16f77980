//! Square game board with run-length win evaluation.
//!
//! - One instance per match, 3x3 or 5x5 depending on the room theme.
//! - Win condition is 3 consecutive marks on a 3x3 board, 4 on 5x5.
//! - Diagonal runs are checked for every valid diagonal offset in both
//!   directions, not only the two main diagonals, so a run of 4 inside
//!   an off-center diagonal of a 5x5 board counts.

use crate::symbol::Symbol;

/// Square grid of optional marks. Indexed `[row][col]`.
#[derive(Debug, Clone)]
pub struct Board {
    size: usize,
    cells: Vec<Vec<Option<Symbol>>>,
}

impl Board {
    /// Create an empty `size` x `size` board.
    pub fn new(size: usize) -> Self {
        Board {
            size,
            cells: vec![vec![None; size]; size],
        }
    }

    /// Board edge length.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Number of consecutive marks required to win on this board.
    pub fn win_condition(&self) -> usize {
        if self.size == 5 {
            4
        } else {
            3
        }
    }

    /// Whether `(x, y)` is a valid cell coordinate.
    pub fn in_bounds(&self, x: i64, y: i64) -> bool {
        x >= 0 && y >= 0 && (x as usize) < self.size && (y as usize) < self.size
    }

    /// Mark at `(x, y)`, or `None` if the cell is empty.
    pub fn cell(&self, x: usize, y: usize) -> Option<Symbol> {
        self.cells[x][y]
    }

    /// Place `symbol` at `(x, y)`. The caller has already validated
    /// bounds and emptiness.
    pub fn mark(&mut self, x: usize, y: usize, symbol: Symbol) {
        self.cells[x][y] = Some(symbol);
    }

    /// Clear every cell for the next round.
    pub fn clear(&mut self) {
        for row in &mut self.cells {
            for cell in row {
                *cell = None;
            }
        }
    }

    /// True when no empty cell remains.
    pub fn is_full(&self) -> bool {
        self.cells
            .iter()
            .all(|row| row.iter().all(|cell| cell.is_some()))
    }

    /// All empty cells except `(exclude_x, exclude_y)`.
    ///
    /// Used by the biased referee to pick a substitute cell for a
    /// disfavored placement.
    pub fn empty_cells_except(&self, exclude_x: usize, exclude_y: usize) -> Vec<(usize, usize)> {
        let mut empties = Vec::new();
        for (x, row) in self.cells.iter().enumerate() {
            for (y, cell) in row.iter().enumerate() {
                if cell.is_none() && !(x == exclude_x && y == exclude_y) {
                    empties.push((x, y));
                }
            }
        }
        empties
    }

    /// True if some row, column, or diagonal contains a run of
    /// `win_condition()` consecutive `symbol` marks.
    pub fn has_winning_run(&self, symbol: Symbol) -> bool {
        let n = self.size;
        let need = self.win_condition();

        // Rows.
        for x in 0..n {
            if self.line_has_run((0..n).map(|y| (x, y)), symbol, need) {
                return true;
            }
        }

        // Columns.
        for y in 0..n {
            if self.line_has_run((0..n).map(|x| (x, y)), symbol, need) {
                return true;
            }
        }

        // Down-right diagonals, every offset long enough to hold a run.
        for start in 0..=(n - need) {
            let len = n - start;
            if self.line_has_run((0..len).map(|i| (start + i, i)), symbol, need) {
                return true;
            }
            if self.line_has_run((0..len).map(|i| (i, start + i)), symbol, need) {
                return true;
            }
        }

        // Down-left diagonals.
        for start in 0..=(n - need) {
            let len = n - start;
            if self.line_has_run((0..len).map(|i| (start + i, n - 1 - i)), symbol, need) {
                return true;
            }
            if self.line_has_run((0..len).map(|i| (i, n - 1 - start - i)), symbol, need) {
                return true;
            }
        }

        false
    }

    /// Render as wire-shaped rows of strings (`""` for empty cells).
    pub fn rows_as_strings(&self) -> Vec<Vec<String>> {
        self.cells
            .iter()
            .map(|row| {
                row.iter()
                    .map(|cell| match cell {
                        Some(s) => s.as_char().to_string(),
                        None => String::new(),
                    })
                    .collect()
            })
            .collect()
    }

    /// Longest-run check along one line of coordinates.
    fn line_has_run(
        &self,
        coords: impl Iterator<Item = (usize, usize)>,
        symbol: Symbol,
        need: usize,
    ) -> bool {
        let mut run = 0;
        for (x, y) in coords {
            if self.cells[x][y] == Some(symbol) {
                run += 1;
                if run == need {
                    return true;
                }
            } else {
                run = 0;
            }
        }
        false
    }
}
