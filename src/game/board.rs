use super::Player;
use crate::error::MoveError;

pub const ROWS: usize = 6;
pub const COLS: usize = 7;

/// Length of a run that wins the game.
pub const CONNECT: usize = 4;

/// Direction vectors (Δrow, Δcol) walked forward from every occupied cell:
/// horizontal, vertical, diagonal down-right and diagonal up-right.
const DIRECTIONS: [(isize, isize); 4] = [(0, 1), (1, 0), (1, 1), (-1, 1)];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Cell {
    Empty,
    Filled(Player),
}

impl Cell {
    pub fn player(self) -> Option<Player> {
        match self {
            Cell::Empty => None,
            Cell::Filled(player) => Some(player),
        }
    }

    pub fn is_empty(self) -> bool {
        self == Cell::Empty
    }
}

/// Cells of a run of at least [`CONNECT`] pieces, in walking order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WinningLine {
    pub player: Player,
    pub cells: Vec<(usize, usize)>,
}

/// A rows × cols grid. Row 0 is the top, the last row is the floor.
///
/// Moves never mutate a board: [`Board::drop_piece`] returns a new value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Board {
    rows: usize,
    cols: usize,
    cells: Vec<Cell>,
}

impl Board {
    /// Create a new empty board with the classic 6×7 dimensions
    pub fn new() -> Self {
        Self::empty(ROWS, COLS)
    }

    /// Create an empty board of the given dimensions
    pub fn empty(rows: usize, cols: usize) -> Self {
        Board {
            rows,
            cols,
            cells: vec![Cell::Empty; rows * cols],
        }
    }

    /// Build a board from explicit rows. Every row must have `cols` cells and
    /// there must be exactly `rows` of them; callers normalize beforehand.
    pub fn from_rows(rows: Vec<Vec<Cell>>) -> Self {
        let row_count = rows.len();
        let cols = rows.first().map_or(0, Vec::len);
        debug_assert!(rows.iter().all(|r| r.len() == cols), "ragged board rows");
        Board {
            rows: row_count,
            cols,
            cells: rows.into_iter().flatten().collect(),
        }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Get the cell at a specific position
    /// Row 0 is the top, row `rows - 1` is the bottom
    pub fn get(&self, row: usize, col: usize) -> Cell {
        self.cells[self.index(row, col)]
    }

    /// Cells of one row, left to right.
    pub fn row(&self, row: usize) -> &[Cell] {
        let start = row * self.cols;
        &self.cells[start..start + self.cols]
    }

    pub fn is_valid_column(&self, col: usize) -> bool {
        col < self.cols
    }

    /// Check if a column is full
    pub fn is_column_full(&self, col: usize) -> bool {
        if !self.is_valid_column(col) || self.rows == 0 {
            return true;
        }
        !self.get(0, col).is_empty()
    }

    /// Drop a piece in a column. Returns the resulting board and the row where
    /// the piece landed; `self` is left untouched either way.
    pub fn drop_piece(&self, col: usize, player: Player) -> Result<(Board, usize), MoveError> {
        if !self.is_valid_column(col) {
            return Err(MoveError::InvalidColumn {
                column: col,
                cols: self.cols,
            });
        }

        let row = (0..self.rows)
            .rev()
            .find(|&row| self.get(row, col).is_empty())
            .ok_or(MoveError::ColumnFull { column: col })?;

        let mut next = self.clone();
        let idx = next.index(row, col);
        next.cells[idx] = player.to_cell();
        Ok((next, row))
    }

    /// Check if the board is completely full
    pub fn is_full(&self) -> bool {
        self.cells.iter().all(|cell| !cell.is_empty())
    }

    /// Number of occupied cells.
    pub fn piece_count(&self) -> usize {
        self.cells.iter().filter(|cell| !cell.is_empty()).count()
    }

    /// True if `player` owns a run of at least four cells anywhere.
    pub fn has_four(&self, player: Player) -> bool {
        self.find_line(Some(player)).is_some()
    }

    /// The player owning a winning run, if any.
    pub fn winner(&self) -> Option<Player> {
        self.find_line(None).map(|line| line.player)
    }

    /// The first winning run found scanning top-left to bottom-right.
    pub fn winning_line(&self) -> Option<WinningLine> {
        self.find_line(None)
    }

    /// True when every piece rests on the floor or on another piece.
    pub fn is_settled(&self) -> bool {
        (0..self.cols).all(|col| {
            let mut seen_piece = false;
            (0..self.rows).all(|row| {
                let filled = !self.get(row, col).is_empty();
                let ok = filled || !seen_piece;
                seen_piece |= filled;
                ok
            })
        })
    }

    fn find_line(&self, only: Option<Player>) -> Option<WinningLine> {
        for row in 0..self.rows {
            for col in 0..self.cols {
                let Some(player) = self.get(row, col).player() else {
                    continue;
                };
                if only.is_some_and(|p| p != player) {
                    continue;
                }
                // All four directions are tried from this origin before moving on.
                for &(dr, dc) in &DIRECTIONS {
                    let cells = self.run_from(row, col, dr, dc, player);
                    if cells.len() >= CONNECT {
                        return Some(WinningLine { player, cells });
                    }
                }
            }
        }
        None
    }

    /// Walk forward from (row, col) while cells belong to `player`.
    fn run_from(
        &self,
        row: usize,
        col: usize,
        dr: isize,
        dc: isize,
        player: Player,
    ) -> Vec<(usize, usize)> {
        let mut cells = Vec::with_capacity(CONNECT);
        let (mut r, mut c) = (row as isize, col as isize);
        while r >= 0
            && c >= 0
            && (r as usize) < self.rows
            && (c as usize) < self.cols
            && self.get(r as usize, c as usize) == Cell::Filled(player)
        {
            cells.push((r as usize, c as usize));
            r += dr;
            c += dc;
        }
        cells
    }

    fn index(&self, row: usize, col: usize) -> usize {
        assert!(row < self.rows && col < self.cols, "cell ({row}, {col}) out of bounds");
        row * self.cols + col
    }
}

impl Default for Board {
    fn default() -> Self {
        Self::new()
    }
}
