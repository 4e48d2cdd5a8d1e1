use crate::player::Color;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

pub const ROWS: usize = 6;
pub const COLS: usize = 7;

/// Number of aligned discs needed to win.
pub const CONNECT: usize = 4;

/// Row and column deltas of the four line directions: horizontal, vertical,
/// and the two diagonals.
const DIRECTIONS: [(isize, isize); 4] = [(0, 1), (1, 0), (1, 1), (-1, 1)];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Cell {
    #[default]
    Empty,
    Occupied(Color),
}

impl Cell {
    pub fn as_u8(self) -> u8 {
        match self {
            Cell::Empty => 0,
            Cell::Occupied(color) => color.as_u8(),
        }
    }
}

impl Serialize for Cell {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u8(self.as_u8())
    }
}

impl<'de> Deserialize<'de> for Cell {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        match u8::deserialize(deserializer)? {
            0 => Ok(Cell::Empty),
            raw => Color::from_u8(raw)
                .map(Cell::Occupied)
                .ok_or_else(|| serde::de::Error::custom(format!("invalid cell value: {raw}"))),
        }
    }
}

/// 6×7 grid. Row 0 is the top, row 5 the bottom; discs fall toward row 5.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct Board {
    cells: [[Cell; COLS]; ROWS],
}

impl Board {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, row: usize, col: usize) -> Cell {
        self.cells[row][col]
    }

    /// Lowest empty row of `col`, scanning bottom-up.
    pub fn landing_row(&self, col: usize) -> Option<usize> {
        if col >= COLS {
            return None;
        }
        (0..ROWS).rev().find(|&row| self.cells[row][col] == Cell::Empty)
    }

    pub fn is_column_full(&self, col: usize) -> bool {
        self.landing_row(col).is_none()
    }

    /// A board is full once its top row has no empty cell.
    pub fn is_full(&self) -> bool {
        self.cells[0].iter().all(|cell| *cell != Cell::Empty)
    }

    pub fn legal_columns(&self) -> Vec<usize> {
        (0..COLS).filter(|&col| !self.is_column_full(col)).collect()
    }

    /// Drops a disc into `col` and returns the row it landed on.
    pub(crate) fn place(&mut self, col: usize, color: Color) -> Option<usize> {
        let row = self.landing_row(col)?;
        self.cells[row][col] = Cell::Occupied(color);
        Some(row)
    }

    /// Copy of this board with a disc dropped into `col`, plus its row.
    pub fn with_disc(&self, col: usize, color: Color) -> Option<(Board, usize)> {
        let mut next = *self;
        let row = next.place(col, color)?;
        Some((next, row))
    }

    /// Whether the disc at (row, col) completes a line of four in any
    /// direction.
    pub fn wins_through(&self, row: usize, col: usize) -> bool {
        let cell = self.get(row, col);
        if cell == Cell::Empty {
            return false;
        }
        DIRECTIONS.iter().any(|&(dr, dc)| {
            1 + self.run_length(row, col, dr, dc, cell) + self.run_length(row, col, -dr, -dc, cell)
                >= CONNECT
        })
    }

    fn run_length(&self, row: usize, col: usize, dr: isize, dc: isize, cell: Cell) -> usize {
        let mut count = 0;
        let mut r = row as isize + dr;
        let mut c = col as isize + dc;
        while (0..ROWS as isize).contains(&r)
            && (0..COLS as isize).contains(&c)
            && self.cells[r as usize][c as usize] == cell
        {
            count += 1;
            r += dr;
            c += dc;
        }
        count
    }

    /// Full-board scan for four aligned discs of `color`.
    pub fn has_four(&self, color: Color) -> bool {
        let target = Cell::Occupied(color);
        (0..ROWS).any(|row| {
            (0..COLS).any(|col| {
                DIRECTIONS.iter().any(|&(dr, dc)| {
                    (0..CONNECT as isize).all(|step| {
                        let r = row as isize + dr * step;
                        let c = col as isize + dc * step;
                        (0..ROWS as isize).contains(&r)
                            && (0..COLS as isize).contains(&c)
                            && self.cells[r as usize][c as usize] == target
                    })
                })
            })
        })
    }

    /// Rebuilds a board from wire values, top row first.
    pub fn from_rows(rows: [[u8; COLS]; ROWS]) -> Option<Self> {
        let mut board = Board::new();
        for (r, row) in rows.iter().enumerate() {
            for (c, value) in row.iter().enumerate() {
                board.cells[r][c] = match value {
                    0 => Cell::Empty,
                    raw => Cell::Occupied(Color::from_u8(*raw)?),
                };
            }
        }
        Some(board)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn discs_stack_from_the_bottom() {
        let mut board = Board::new();
        assert_eq!(board.place(2, Color::One), Some(5));
        assert_eq!(board.place(2, Color::Two), Some(4));
        assert_eq!(board.get(5, 2), Cell::Occupied(Color::One));
        assert_eq!(board.get(4, 2), Cell::Occupied(Color::Two));
        assert_eq!(board.landing_row(2), Some(3));
    }

    #[test]
    fn full_column_has_no_landing_row() {
        let mut board = Board::new();
        for i in 0..ROWS {
            let color = if i % 2 == 0 { Color::One } else { Color::Two };
            assert!(board.place(0, color).is_some());
        }
        assert!(board.is_column_full(0));
        assert_eq!(board.place(0, Color::One), None);
        assert!(!board.legal_columns().contains(&0));
    }

    #[test]
    fn out_of_range_column_is_never_legal() {
        let board = Board::new();
        assert_eq!(board.landing_row(COLS), None);
    }

    #[test]
    fn wins_through_matches_full_scan_on_diagonal() {
        let board = Board::from_rows([
            [0, 0, 0, 0, 0, 0, 0],
            [0, 0, 0, 0, 0, 0, 0],
            [0, 0, 0, 1, 0, 0, 0],
            [0, 0, 1, 2, 0, 0, 0],
            [0, 1, 2, 2, 0, 0, 0],
            [1, 2, 2, 2, 0, 0, 0],
        ])
        .expect("valid rows");
        assert!(board.has_four(Color::One));
        assert!(board.wins_through(2, 3));
        assert!(board.wins_through(5, 0));
        assert!(!board.has_four(Color::Two));
    }

    #[test]
    fn serializes_as_numeric_grid() {
        let mut board = Board::new();
        board.place(3, Color::Two);
        let json = serde_json::to_value(board).expect("serialize");
        assert_eq!(json[5][3], 2);
        assert_eq!(json[0][0], 0);
        assert_eq!(json.as_array().map(|rows| rows.len()), Some(ROWS));
    }
}
