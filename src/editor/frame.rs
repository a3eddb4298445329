//! Projection of the editor state into a renderer-agnostic frame.
//!
//! The frame is a borrowed view: window iteration and cell access are
//! lazy, nothing is allocated on this path, and the snapshot is valid
//! until the next event application. Style resolution happens here so
//! the renderer never touches the highlight table.

use super::{
    CmdlineState, DefaultColors, Editor, MessageState, PopupMenuState, StatusFlags, TablineState,
};
use crate::color::Color;
use crate::cursor::{Blink, CursorShape};
use crate::grid::{GridCell, RenderedWindow, ViewportMargins, WindowType};
use crate::nvim::StyleFlags;

/// A cell's visual attributes with every channel resolved.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CellStyle {
    pub foreground: Color,
    pub background: Color,
    pub special: Color,
    pub blend: u8,
    pub flags: StyleFlags,
}

/// One cell as handed to the renderer.
#[derive(Debug, Clone, Copy)]
pub struct FrameCell<'e> {
    pub text: &'e str,
    pub style: CellStyle,
    pub double_width: bool,
    pub is_continuation: bool,
}

/// An immutable snapshot of the current editor state.
pub struct Frame<'e> {
    editor: &'e Editor,
}

impl<'e> Frame<'e> {
    pub(super) fn new(editor: &'e Editor) -> Self {
        Self { editor }
    }

    /// Windows in draw order: roots by id, then floats by
    /// `(zindex, composition order, id)`.
    pub fn windows(&self) -> impl Iterator<Item = FrameWindow<'e>> + '_ {
        let editor = self.editor;
        editor.composition().iter().filter_map(move |id| {
            editor.window(*id).map(|window| FrameWindow { window, editor })
        })
    }

    pub fn window(&self, grid: u64) -> Option<FrameWindow<'e>> {
        let editor = self.editor;
        editor
            .window(grid)
            .map(|window| FrameWindow { window, editor })
    }

    pub fn title(&self) -> &'e str {
        self.editor.title()
    }

    pub fn status(&self) -> StatusFlags {
        self.editor.status()
    }

    pub fn default_colors(&self) -> DefaultColors {
        self.editor.default_colors()
    }

    pub fn mode_name(&self) -> &'e str {
        self.editor.mode_name()
    }

    pub fn messages(&self) -> &'e MessageState {
        self.editor.messages()
    }

    pub fn cmdline(&self) -> Option<&'e CmdlineState> {
        self.editor.cmdline()
    }

    pub fn popupmenu(&self) -> Option<&'e PopupMenuState> {
        self.editor.popupmenu()
    }

    pub fn tabline(&self) -> &'e TablineState {
        self.editor.tabline()
    }

    /// Cursor snapshot, absent while the target grid is not composited
    /// or the backend is busy (a busy backend hides the cursor).
    pub fn cursor(&self) -> Option<FrameCursor> {
        if self.editor.status().busy {
            return None;
        }

        let cursor = self.editor.cursor();
        let window = self.editor.window(cursor.grid)?;

        let scroll_position = window.scroll_animation.position;
        let position = (
            window.grid_position.0 + cursor.col as f32,
            window.grid_position.1 + cursor.row as f32 - scroll_position,
        );

        let (shape, cell_percentage, blink, style) = match self.editor.current_cursor_mode() {
            Some(mode) => {
                let style = if mode.attr_id == 0 {
                    None
                } else {
                    Some(resolve_style(self.editor, mode.attr_id))
                };
                (mode.shape, mode.cell_percentage, mode.blink, style)
            }
            None => (CursorShape::Block, 0.0, Blink::default(), None),
        };

        Some(FrameCursor {
            grid: cursor.grid,
            row: cursor.row,
            col: cursor.col,
            position,
            shape,
            cell_percentage,
            blink,
            style,
            scroll_position,
        })
    }
}

/// One window of the frame, with cell accessors bound to it.
pub struct FrameWindow<'e> {
    window: &'e RenderedWindow,
    editor: &'e Editor,
}

impl<'e> FrameWindow<'e> {
    pub fn id(&self) -> u64 {
        self.window.id
    }

    pub fn kind(&self) -> WindowType {
        self.window.window_type
    }

    /// Fractional position in outer-grid cells.
    pub fn position(&self) -> (f32, f32) {
        self.window.grid_position
    }

    /// Extent to render, in cells. The display extent can lag the grid
    /// extent mid-resize; rendering is capped to what actually exists.
    pub fn size(&self) -> (usize, usize) {
        (
            self.window.display_width.min(self.window.grid_width),
            self.window.display_height.min(self.window.grid_height),
        )
    }

    pub fn zindex(&self) -> u64 {
        self.window.zindex
    }

    pub fn margins(&self) -> ViewportMargins {
        self.window.viewport_margins
    }

    /// Compositing opacity. Floats follow the popup-menu blend option
    /// when they host the popup menu; everything else is opaque.
    pub fn opacity(&self) -> f32 {
        let is_pum_grid = self
            .editor
            .popupmenu()
            .map_or(false, |menu| menu.grid == self.window.id);
        if is_pum_grid {
            1.0 - self.editor.options().pumblend.min(100) as f32 / 100.0
        } else {
            1.0
        }
    }

    /// Whether the renderer should draw this window through the
    /// scrollback path this frame.
    pub fn has_scroll_animation(&self) -> bool {
        self.window.has_scroll_animation() && self.window.has_valid_scrollback()
    }

    /// Scroll offset in lines; negative while content slides upward.
    pub fn scroll_position(&self) -> f32 {
        self.window.scroll_animation.position
    }

    /// Sub-line offset rounded to whole pixels.
    pub fn scroll_pixel_offset(&self, cell_height: f32) -> f32 {
        self.window.sub_line_offset(cell_height).round()
    }

    /// Unrounded sub-line offset for renderers that subpixel-position.
    pub fn scroll_pixel_offset_raw(&self, cell_height: f32) -> f32 {
        self.window.sub_line_offset(cell_height)
    }

    /// Reads a live cell with its style resolved.
    pub fn cell(&self, row: usize, col: usize) -> Option<FrameCell<'e>> {
        self.window
            .get_cell(row, col)
            .map(|cell| self.style_cell(cell))
    }

    /// Reads a scrollback cell at the current animation offset;
    /// `inner_row` may be -1 or `inner` for the extra edge row.
    pub fn scroll_cell(&self, inner_row: i64, col: usize) -> Option<FrameCell<'e>> {
        self.window
            .get_scroll_cell(inner_row, col)
            .map(|cell| self.style_cell(cell))
    }

    fn style_cell(&self, cell: &'e GridCell) -> FrameCell<'e> {
        FrameCell {
            text: cell.text(),
            style: resolve_style(self.editor, cell.hl_id),
            double_width: cell.double_width,
            is_continuation: cell.is_continuation,
        }
    }
}

/// Cursor state for the renderer. `scroll_position` lets it distinguish
/// cursor motion from scroll-induced motion of the whole window.
#[derive(Debug, Clone, Copy)]
pub struct FrameCursor {
    pub grid: u64,
    pub row: u64,
    pub col: u64,
    /// Grid-space position with the window scroll subtracted from Y.
    pub position: (f32, f32),
    pub shape: CursorShape,
    pub cell_percentage: f64,
    pub blink: Blink,
    /// Resolved style of the cursor mode; `None` means "swap the cell's
    /// colors".
    pub style: Option<CellStyle>,
    pub scroll_position: f32,
}

fn resolve_style(editor: &Editor, hl_id: u64) -> CellStyle {
    let attr = editor.hl_attr(hl_id);
    let defaults = editor.default_colors();

    let mut foreground = attr.foreground.unwrap_or(defaults.foreground);
    let mut background = attr.background.unwrap_or(defaults.background);
    if attr.reverse() {
        std::mem::swap(&mut foreground, &mut background);
    }

    CellStyle {
        foreground,
        background,
        special: attr.special.unwrap_or(defaults.special),
        blend: attr.blend,
        flags: attr.flags,
    }
}
