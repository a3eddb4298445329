//! Per-grid cell storage and the rendered-window state machine.

pub use self::rendered::{AnchorKind, RenderedWindow, ViewportMargins, WindowType};
pub use self::ring::RingBuffer;

pub mod rendered;
pub mod ring;

/// Inline capacity of a cell's text buffer, in bytes.
///
/// Large enough for any single grapheme cluster Nvim sends for a cell;
/// longer clusters are truncated at a character boundary.
pub const CELL_TEXT_CAPACITY: usize = 16;

/// One cell of a grid: a short UTF-8 text plus its highlight id.
///
/// The right half of a double-width glyph is transmitted as an empty
/// cell; it is stored with `is_continuation` set and the left half gets
/// `double_width`.
#[derive(Debug, Clone, Copy)]
pub struct GridCell {
    text: [u8; CELL_TEXT_CAPACITY],
    text_len: u8,
    pub hl_id: u64,
    pub double_width: bool,
    pub is_continuation: bool,
}

impl Default for GridCell {
    fn default() -> Self {
        let mut cell = GridCell {
            text: [0; CELL_TEXT_CAPACITY],
            text_len: 1,
            hl_id: 0,
            double_width: false,
            is_continuation: false,
        };
        cell.text[0] = b' ';
        cell
    }
}

impl GridCell {
    pub fn new(text: &str, hl_id: u64) -> Self {
        let mut cell = GridCell {
            text: [0; CELL_TEXT_CAPACITY],
            text_len: 0,
            hl_id,
            double_width: false,
            is_continuation: false,
        };
        cell.set_text(text);
        cell
    }

    /// Replaces the cell text, truncating at a character boundary if the
    /// cluster does not fit the inline buffer.
    pub fn set_text(&mut self, text: &str) {
        let mut len = text.len().min(CELL_TEXT_CAPACITY);
        while len > 0 && !text.is_char_boundary(len) {
            len -= 1;
        }

        self.text[..len].copy_from_slice(&text.as_bytes()[..len]);
        self.text_len = len as u8;
    }

    pub fn text(&self) -> &str {
        std::str::from_utf8(&self.text[..self.text_len as usize]).unwrap_or("")
    }

    /// Resets the cell to a plain space with default highlighting.
    pub fn clear(&mut self) {
        *self = GridCell::default();
    }

    fn is_default(&self) -> bool {
        self.hl_id == 0 && self.text() == " "
    }
}

/// A run-length encoded cell update within a `grid_line` event.
#[derive(Debug, Clone, PartialEq)]
pub struct CellRun {
    /// Text for each produced cell; empty for the right half of a
    /// double-width glyph.
    pub text: String,
    /// Highlight id, already resolved across the carry-over rule of the
    /// wire format.
    pub hl_id: u64,
    /// How many consecutive cells this run covers.
    pub repeat: u64,
}

/// A fixed-width row of cells.
#[derive(Debug, Clone, Default)]
pub struct GridLine {
    cells: Vec<GridCell>,
}

impl GridLine {
    pub fn new(width: usize) -> Self {
        Self {
            cells: vec![GridCell::default(); width],
        }
    }

    pub fn width(&self) -> usize {
        self.cells.len()
    }

    pub fn cell(&self, col: usize) -> Option<&GridCell> {
        self.cells.get(col)
    }

    pub fn cell_mut(&mut self, col: usize) -> Option<&mut GridCell> {
        self.cells.get_mut(col)
    }

    /// Resizes the line in place, preserving the overlapping prefix.
    /// New trailing cells are initialized to defaults.
    pub fn resize_width(&mut self, width: usize) {
        self.cells.resize_with(width, GridCell::default);
    }

    /// Copies the overlapping prefix of `source` into this line.
    pub fn copy_prefix_from(&mut self, source: &GridLine) {
        let n = self.cells.len().min(source.cells.len());
        self.cells[..n].clone_from_slice(&source.cells[..n]);
    }

    /// Copies all cells from `source`, resizing to match.
    pub fn copy_from(&mut self, source: &GridLine) {
        self.cells.resize_with(source.cells.len(), GridCell::default);
        self.cells.clone_from_slice(&source.cells);
    }

    /// Copies the column range `left..right` from `source`.
    pub fn copy_cols_from(&mut self, source: &GridLine, left: usize, right: usize) {
        let right = right.min(self.cells.len()).min(source.cells.len());
        if left < right {
            self.cells[left..right].clone_from_slice(&source.cells[left..right]);
        }
    }

    /// Resets the column range `left..right` to default cells.
    pub fn clear_cols(&mut self, left: usize, right: usize) {
        let right = right.min(self.cells.len());
        for cell in &mut self.cells[left.min(right)..right] {
            cell.clear();
        }
    }

    pub fn clear(&mut self) {
        for cell in &mut self.cells {
            cell.clear();
        }
    }

    /// Applies run-length encoded cell updates starting at `col_start`.
    ///
    /// Stops at the end of the line. An empty run text marks the
    /// continuation half of a double-width glyph and flags the cell to
    /// its left.
    pub fn apply_runs(&mut self, col_start: usize, runs: &[CellRun]) {
        let mut col = col_start;

        for run in runs {
            let continuation = run.text.is_empty();
            if continuation && col > 0 {
                if let Some(left) = self.cells.get_mut(col - 1) {
                    left.double_width = true;
                }
            }

            for _ in 0..run.repeat {
                let cell = match self.cells.get_mut(col) {
                    Some(cell) => cell,
                    None => return,
                };

                cell.set_text(&run.text);
                cell.hl_id = run.hl_id;
                cell.double_width = false;
                cell.is_continuation = continuation;
                col += 1;
            }
        }
    }

    /// Whether the line holds nothing but default cells.
    pub fn is_blank(&self) -> bool {
        self.cells.iter().all(GridCell::is_default)
    }
}
