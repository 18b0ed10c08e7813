//! The square board players fight over.

use conquest_protocol::{Cell, PlayerId};

use crate::RoomError;

/// Square grid of [`Cell`]s, stored row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoardGrid {
    size: usize,
    cells: Vec<Cell>,
}

impl BoardGrid {
    pub fn new(size: usize) -> Self {
        Self {
            size,
            cells: vec![Cell::EMPTY; size * size],
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Total number of cells.
    pub fn capacity(&self) -> usize {
        self.cells.len()
    }

    pub fn get(&self, x: usize, y: usize) -> Option<&Cell> {
        (x < self.size && y < self.size).then(|| &self.cells[y * self.size + x])
    }

    /// Claims `(x, y)` for `player`.
    ///
    /// - empty cell: owned by `player` at strength 1
    /// - another player's cell: taken over, strength back to 1
    /// - own cell: strength + 1, capped at [`Cell::MAX_STRENGTH`]
    ///
    /// Returns the cell after the claim.
    ///
    /// # Errors
    /// `RoomError::OutOfBounds` for coordinates off the board; nothing
    /// changes.
    pub fn claim(&mut self, player: PlayerId, x: i64, y: i64) -> Result<Cell, RoomError> {
        let index = self.index_of(x, y).ok_or(RoomError::OutOfBounds {
            x,
            y,
            size: self.size,
        })?;
        let cell = &mut self.cells[index];
        if cell.owner == Some(player) {
            cell.strength = (cell.strength + 1).min(Cell::MAX_STRENGTH);
        } else {
            cell.owner = Some(player);
            cell.strength = 1;
        }
        Ok(*cell)
    }

    pub fn owned_count(&self) -> usize {
        self.cells.iter().filter(|c| c.is_owned()).count()
    }

    /// Cells currently owned by `player`.
    pub fn owned_by(&self, player: PlayerId) -> usize {
        self.cells.iter().filter(|c| c.owner == Some(player)).count()
    }

    /// True once every cell has an owner; the game ends here.
    pub fn is_full(&self) -> bool {
        self.owned_count() == self.capacity()
    }

    /// The board as rows, `rows()[y][x]`.
    pub fn rows(&self) -> Vec<Vec<Cell>> {
        if self.size == 0 {
            return Vec::new();
        }
        self.cells.chunks(self.size).map(<[Cell]>::to_vec).collect()
    }

    fn index_of(&self, x: i64, y: i64) -> Option<usize> {
        let x = usize::try_from(x).ok()?;
        let y = usize::try_from(y).ok()?;
        (x < self.size && y < self.size).then_some(y * self.size + x)
    }
}
