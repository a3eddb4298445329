/// Cursor position in grid-local coordinates.
///
/// The position is kept relative to the grid it sits on; the renderer
/// adds the window's own position at draw time so the cursor follows a
/// moving window without extra bookkeeping.
#[derive(Debug, Copy, Clone, Default)]
pub struct Cursor {
    pub grid: u64,
    pub row: u64,
    pub col: u64,
}

impl Cursor {
    pub fn move_to(mut self, grid: u64, row: u64, col: u64) -> Self {
        self.grid = grid;
        self.row = row;
        self.col = col;

        self
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum CursorShape {
    Block,
    Horizontal,
    Vertical,
}

impl Default for CursorShape {
    fn default() -> Self {
        Self::Block
    }
}

/// Cursor blink schedule in milliseconds. All zeros means no blinking.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct Blink {
    pub wait: u64,
    pub on: u64,
    pub off: u64,
}

/// Cursor properties for one editor mode, from `mode_info_set`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CursorMode {
    pub name: String,
    pub shape: CursorShape,
    /// Portion of the cell the cursor occupies, 0.0..=1.0.
    pub cell_percentage: f64,
    pub blink: Blink,
    /// Highlight group for the cursor; 0 swaps foreground and background.
    pub attr_id: u64,
}
