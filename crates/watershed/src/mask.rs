//! Cell masks produced by the upstream tracer.

use terrain_grid::{Pixel, PixelWindow};

/// A set of grid cells stored as a bitmap over its bounding box.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellMask {
    bounds: PixelWindow,
    bits: Vec<u64>,
    count: usize,
}

impl CellMask {
    /// Build a mask from a list of cells. Duplicates are counted once.
    pub fn from_cells(cells: &[Pixel]) -> Self {
        let Some(first) = cells.first() else {
            return Self {
                bounds: PixelWindow::new(0, 0, 0, 0),
                bits: Vec::new(),
                count: 0,
            };
        };

        let (mut min_col, mut min_row) = (first.col, first.row);
        let (mut max_col, mut max_row) = (first.col, first.row);
        for p in cells {
            min_col = min_col.min(p.col);
            min_row = min_row.min(p.row);
            max_col = max_col.max(p.col);
            max_row = max_row.max(p.row);
        }

        let bounds = PixelWindow::new(
            min_col,
            min_row,
            max_col - min_col + 1,
            max_row - min_row + 1,
        );
        let mut mask = Self {
            bounds,
            bits: vec![0; bounds.len().div_ceil(64)],
            count: 0,
        };
        for p in cells {
            let idx = mask.index(p.col, p.row);
            let (word, bit) = (idx / 64, 1u64 << (idx % 64));
            if mask.bits[word] & bit == 0 {
                mask.bits[word] |= bit;
                mask.count += 1;
            }
        }
        mask
    }

    fn index(&self, col: usize, row: usize) -> usize {
        (row - self.bounds.row) * self.bounds.width + (col - self.bounds.col)
    }

    pub fn contains(&self, col: usize, row: usize) -> bool {
        if !self.bounds.contains(col, row) {
            return false;
        }
        let idx = self.index(col, row);
        self.bits[idx / 64] & (1u64 << (idx % 64)) != 0
    }

    /// Membership for signed coordinates; negative is never a member.
    pub fn contains_signed(&self, col: i64, row: i64) -> bool {
        col >= 0 && row >= 0 && self.contains(col as usize, row as usize)
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Bounding box of the member cells.
    pub fn bounds(&self) -> PixelWindow {
        self.bounds
    }

    /// Member cells in row-major order.
    pub fn iter(&self) -> impl Iterator<Item = Pixel> + '_ {
        let b = self.bounds;
        (0..b.len())
            .filter(move |idx| self.bits[idx / 64] & (1u64 << (idx % 64)) != 0)
            .map(move |idx| Pixel::new(b.col + idx % b.width, b.row + idx / b.width))
    }

    pub fn is_subset_of(&self, other: &CellMask) -> bool {
        self.iter().all(|p| other.contains(p.col, p.row))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_mask() {
        let mask = CellMask::from_cells(&[]);
        assert!(mask.is_empty());
        assert!(!mask.contains(0, 0));
        assert_eq!(mask.iter().count(), 0);
    }

    #[test]
    fn test_membership_and_bounds() {
        let cells = [Pixel::new(3, 2), Pixel::new(5, 4), Pixel::new(3, 2)];
        let mask = CellMask::from_cells(&cells);

        assert_eq!(mask.len(), 2);
        assert_eq!(mask.bounds(), PixelWindow::new(3, 2, 3, 3));
        assert!(mask.contains(5, 4));
        assert!(!mask.contains(4, 3));
        assert!(!mask.contains_signed(-1, 2));
        assert_eq!(
            mask.iter().collect::<Vec<_>>(),
            vec![Pixel::new(3, 2), Pixel::new(5, 4)]
        );
    }

    #[test]
    fn test_subset() {
        let small = CellMask::from_cells(&[Pixel::new(1, 1)]);
        let large = CellMask::from_cells(&[Pixel::new(1, 1), Pixel::new(1, 2)]);
        assert!(small.is_subset_of(&large));
        assert!(!large.is_subset_of(&small));
    }
}
