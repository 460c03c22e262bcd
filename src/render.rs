use std::fmt;

use crate::error::{Error, Result};
use crate::geometry::{CanvasSize, Point, ProjectedEllipse};

/// Shades from transparent to opaque.
const SHADES: &[u8] = b" .:-=+*#%@";

/// A character grid that ellipses are rasterized into, one sample per cell
/// taken at the cell center.
#[derive(Debug, Clone)]
pub struct TerminalCanvas {
    columns: usize,
    rows: usize,
    cells: Vec<u8>,
}

impl TerminalCanvas {
    pub fn new(columns: usize, rows: usize) -> Result<Self> {
        let cells = columns
            .checked_mul(rows)
            .ok_or(Error::GridTooLarge { columns, rows })?;
        Ok(Self {
            columns,
            rows,
            cells: vec![SHADES[0]; cells],
        })
    }

    pub fn dimensions(&self) -> (usize, usize) {
        (self.columns, self.rows)
    }

    pub fn clear(&mut self) {
        self.cells.fill(SHADES[0]);
    }

    /// Repaints the grid with `ellipses`, later ellipses drawn over earlier ones.
    pub fn paint(&mut self, ellipses: &[ProjectedEllipse], canvas: CanvasSize) {
        self.clear();
        if self.columns == 0 || self.rows == 0 {
            return;
        }
        let cell_w = canvas.width / self.columns as f64;
        let cell_h = canvas.height / self.rows as f64;

        for ellipse in ellipses {
            let shade = shade(ellipse.opacity);
            let (min, max) = ellipse.bounding_box();
            let (c0, c1) = cell_span(min.x, max.x, cell_w, self.columns);
            let (r0, r1) = cell_span(min.y, max.y, cell_h, self.rows);
            for row in r0..r1 {
                for col in c0..c1 {
                    let center =
                        Point::new((col as f64 + 0.5) * cell_w, (row as f64 + 0.5) * cell_h);
                    if ellipse.contains(center) {
                        self.cells[row * self.columns + col] = shade;
                    }
                }
            }
        }
    }

    pub fn cell(&self, column: usize, row: usize) -> Option<char> {
        if column >= self.columns || row >= self.rows {
            return None;
        }
        Some(char::from(self.cells[row * self.columns + column]))
    }
}

fn shade(opacity: f64) -> u8 {
    let top = (SHADES.len() - 1) as f64;
    // anything visible gets at least the faintest mark
    let idx = (opacity.clamp(0.0, 1.0) * top).ceil() as usize;
    SHADES[idx]
}

/// Cells overlapping `[lo, hi]`, clamped to the grid.
fn cell_span(lo: f64, hi: f64, cell: f64, count: usize) -> (usize, usize) {
    if cell <= 0.0 || !cell.is_finite() || !lo.is_finite() || !hi.is_finite() {
        return (0, 0);
    }
    let first = (lo / cell).floor().max(0.0) as usize;
    let last = ((hi / cell).ceil().max(0.0) as usize).min(count);
    (first.min(last), last)
}

impl fmt::Display for TerminalCanvas {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let border = "-".repeat(self.columns);
        writeln!(f, "+{border}+")?;
        for row in self.cells.chunks(self.columns.max(1)) {
            writeln!(f, "|{}|", String::from_utf8_lossy(row))?;
        }
        writeln!(f, "+{border}+")
    }
}
