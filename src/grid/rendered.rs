//! Per-window grid state: the live viewport ring, the scrollback ring
//! consumed during smooth-scroll animation, and the lifecycle flags the
//! compositor filters on.
//!
//! Cell content and scroll motion are decoupled on purpose. Grid events
//! mutate only the live ring; viewport events only latch a pending line
//! delta. The two meet at `flush`, which rebuilds the scrollback and
//! displaces the scroll spring by the consumed delta.

use super::{CellRun, GridLine, RingBuffer};
use crate::settings::Settings;
use crate::spring::Spring;

/// The outer container grid. Its statusline and tabline cells sit at
/// changing positions, so its content is never preserved across resizes.
const OUTER_GRID: u64 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowType {
    Root,
    Floating,
    Message,
}

/// Corner of the floating window that is pinned to the anchor position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnchorKind {
    NorthWest,
    NorthEast,
    SouthWest,
    SouthEast,
}

impl Default for AnchorKind {
    fn default() -> Self {
        Self::NorthWest
    }
}

/// Resolved anchoring of a floating window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnchorInfo {
    pub anchor_grid: u64,
    pub anchor_left: f32,
    pub anchor_top: f32,
    pub z: u64,
}

/// A float position received before the window has dimensions. The
/// anchor math needs the window extent, so the record is held until the
/// first resize that establishes one.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PendingAnchor {
    pub kind: AnchorKind,
    pub anchor_grid: u64,
    pub anchor_row: f64,
    pub anchor_col: f64,
    pub zindex: u64,
}

/// Fixed frame rows and columns excluded from scrolling (winbar,
/// statusline and friends).
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ViewportMargins {
    pub top: usize,
    pub bottom: usize,
    pub left: usize,
    pub right: usize,
}

/// State of one backend grid as the renderer sees it.
pub struct RenderedWindow {
    pub id: u64,
    pub window_type: WindowType,

    /// Buffer extent, from resize events.
    pub grid_width: usize,
    pub grid_height: usize,
    /// Visible extent, from positioning events. May differ from the grid
    /// extent transiently while a resize settles.
    pub display_width: usize,
    pub display_height: usize,

    /// Fractional position of the grid in outer-grid cells.
    pub grid_position: (f32, f32),
    pub target_position: (f32, f32),
    /// Springs for window-move animation. Wired but bypassed: positions
    /// snap so backend-driven moves are not animated twice.
    position_springs: (Spring, Spring),

    pub zindex: u64,
    pub composition_order: u64,
    pub anchor_info: Option<AnchorInfo>,
    pub pending_anchor: Option<PendingAnchor>,
    pub viewport_margins: ViewportMargins,
    pub message_scrolled: bool,

    actual_lines: Option<RingBuffer<Option<GridLine>>>,
    scrollback_lines: Option<RingBuffer<Option<GridLine>>>,

    /// Viewport delta awaiting the next flush.
    scroll_delta: i64,
    /// Latched once any non-zero viewport delta has been observed.
    pub has_scrolled: bool,
    pub scroll_animation: Spring,

    pub valid: bool,
    pub hidden: bool,
    pub has_position: bool,
    pub needs_content: bool,
    pub dirty: bool,
}

impl RenderedWindow {
    pub fn new(id: u64) -> Self {
        Self {
            id,
            window_type: WindowType::Root,
            grid_width: 0,
            grid_height: 0,
            display_width: 0,
            display_height: 0,
            grid_position: (0.0, 0.0),
            target_position: (0.0, 0.0),
            position_springs: (Spring::default(), Spring::default()),
            zindex: 0,
            composition_order: 0,
            anchor_info: None,
            pending_anchor: None,
            viewport_margins: ViewportMargins::default(),
            message_scrolled: false,
            actual_lines: None,
            scrollback_lines: None,
            scroll_delta: 0,
            has_scrolled: false,
            scroll_animation: Spring::default(),
            valid: false,
            hidden: false,
            has_position: false,
            needs_content: true,
            dirty: false,
        }
    }

    /// Resizes the grid buffer.
    ///
    /// Width growth at the same height resizes lines in place, which is
    /// the hot path while a side panel animates open. Any other change
    /// rebuilds both rings. Content is preserved only when it cannot
    /// produce artifacts: the outer grid repositions its statusline cells
    /// on every resize, and shrinking width leaves edge-aligned
    /// highlights bleeding color, so neither preserves.
    pub fn resize(&mut self, width: usize, height: usize) {
        if (width, height) == (self.grid_width, self.grid_height) {
            return;
        }

        log::trace!(
            target: "window-resize",
            "grid {}: {}x{} -> {}x{}",
            self.id,
            self.grid_width,
            self.grid_height,
            width,
            height
        );

        if height == self.grid_height
            && width > self.grid_width
            && self.actual_lines.is_some()
            && self.id != OUTER_GRID
        {
            if let Some(lines) = &mut self.actual_lines {
                for row in 0..height as i64 {
                    if let Some(line) = lines.get_mut(row).as_mut() {
                        line.resize_width(width);
                    }
                }
            }
            self.grid_width = width;
            return;
        }

        let preserve =
            self.id != OUTER_GRID && self.actual_lines.is_some() && width >= self.grid_width;
        let old_height = self.grid_height as i64;

        let mut lines = RingBuffer::<Option<GridLine>>::new(height);
        for row in 0..height as i64 {
            let mut line = GridLine::new(width);
            if preserve && row < old_height {
                if let Some(old) = self
                    .actual_lines
                    .as_ref()
                    .and_then(|old| old.get(row).as_ref())
                {
                    line.copy_prefix_from(old);
                }
            }
            lines.set(row, Some(line));
        }

        // Both scrollback halves start as copies of the new content so a
        // negative logical index during a scroll-down animation already
        // yields a valid line.
        let mut scrollback = RingBuffer::<Option<GridLine>>::new(2 * height);
        for row in 0..height as i64 {
            let line = lines.get(row).clone();
            scrollback.set(row, line.clone());
            scrollback.set(row + height as i64, line);
        }

        self.actual_lines = Some(lines);
        self.scrollback_lines = Some(scrollback);
        self.grid_width = width;
        self.grid_height = height;
        self.scroll_delta = 0;
        self.scroll_animation.reset();
        self.dirty = true;
        self.valid = true;
    }

    /// Applies a run-length encoded row update from a `grid_line` event.
    pub fn apply_line(&mut self, row: usize, col_start: usize, runs: &[CellRun]) {
        if row >= self.grid_height {
            return;
        }
        if let Some(lines) = &mut self.actual_lines {
            if let Some(line) = lines.get_mut(row as i64).as_mut() {
                line.apply_runs(col_start, runs);
            }
        }
        self.dirty = true;
        self.needs_content = false;
    }

    /// Resets every live line to blank cells.
    pub fn clear_grid(&mut self) {
        if let Some(lines) = &mut self.actual_lines {
            for row in 0..lines.len() as i64 {
                if let Some(line) = lines.get_mut(row).as_mut() {
                    line.clear();
                }
            }
        }
        self.dirty = true;
    }

    /// Moves a rectangular region of the live grid, as instructed by a
    /// `grid_scroll` event. A full-grid vertical move is a ring rotation;
    /// anything else copies row by row within the region.
    ///
    /// This is a cell move only. The scroll animation is driven solely by
    /// viewport events.
    pub fn scroll(&mut self, top: i64, bottom: i64, left: i64, right: i64, rows: i64, cols: i64) {
        let grid_width = self.grid_width;
        let grid_height = self.grid_height as i64;
        let lines = match &mut self.actual_lines {
            Some(lines) => lines,
            None => return,
        };

        if rows == 0 {
            return;
        }

        let full_grid =
            top == 0 && bottom == grid_height && left == 0 && right == grid_width as i64;
        if full_grid && cols == 0 {
            lines.rotate(rows);
            self.dirty = true;
            return;
        }

        let left = left.max(0) as usize;
        let right = (right.max(0) as usize).min(grid_width);
        let top = top.max(0);
        let bottom = bottom.min(grid_height);

        if rows > 0 {
            for row in top..(bottom - rows).max(top) {
                Self::copy_row_region(lines, row + rows, row, left, right);
            }
            for row in (bottom - rows).max(top)..bottom {
                Self::clear_row_region(lines, row, left, right);
            }
        } else {
            for row in ((top - rows).min(bottom)..bottom).rev() {
                Self::copy_row_region(lines, row + rows, row, left, right);
            }
            for row in top..(top - rows).min(bottom) {
                Self::clear_row_region(lines, row, left, right);
            }
        }

        self.dirty = true;
    }

    fn copy_row_region(
        lines: &mut RingBuffer<Option<GridLine>>,
        src: i64,
        dst: i64,
        left: usize,
        right: usize,
    ) {
        let source = lines.get(src).clone();
        if let (Some(source), Some(dest)) = (source, lines.get_mut(dst).as_mut()) {
            dest.copy_cols_from(&source, left, right);
        }
    }

    fn clear_row_region(
        lines: &mut RingBuffer<Option<GridLine>>,
        row: i64,
        left: usize,
        right: usize,
    ) {
        if let Some(line) = lines.get_mut(row).as_mut() {
            line.clear_cols(left, right);
        }
    }

    /// Latches the viewport scroll delta for the next flush.
    ///
    /// The backend emits a second, zero-delta viewport event as
    /// confirmation of each scroll; swallowing the pending delta on that
    /// event would lose the scroll before flush consumes it, so zero
    /// deltas are ignored.
    pub fn set_viewport(&mut self, _topline: f64, _botline: f64, scroll_delta: i64) {
        if scroll_delta != 0 {
            self.scroll_delta = scroll_delta;
            self.has_scrolled = true;
        }
    }

    pub fn set_viewport_margins(&mut self, margins: ViewportMargins) {
        self.viewport_margins = margins;
    }

    /// Completes the current redraw transaction for this window.
    ///
    /// Rebuilds the scrollback from the live inner region, rotates it by
    /// the pending viewport delta and displaces the scroll spring so the
    /// renderer can slide the old content into place.
    pub fn flush(&mut self, settings: &Settings) {
        let lines = match &self.actual_lines {
            Some(lines) => lines,
            None => return,
        };

        let inner_top = self.viewport_margins.top as i64;
        let inner_bottom = self.grid_height as i64 - self.viewport_margins.bottom as i64;
        let inner = inner_bottom - inner_top;
        if inner <= 0 {
            return;
        }

        let matches_inner = self
            .scrollback_lines
            .as_ref()
            .map_or(false, |sb| sb.len() as i64 == 2 * inner);
        if !matches_inner {
            // Margins changed since the last rebuild. Start the scrollback
            // over from the inner region; any in-flight animation is
            // meaningless against the new geometry.
            let mut scrollback = RingBuffer::<Option<GridLine>>::new(2 * inner as usize);
            for i in 0..inner {
                let line = lines.get(inner_top + i).clone();
                scrollback.set(i, line.clone());
                scrollback.set(i + inner, line);
            }
            self.scrollback_lines = Some(scrollback);
            self.scroll_delta = 0;
            self.scroll_animation.reset();
            return;
        }

        let delta = std::mem::replace(&mut self.scroll_delta, 0);
        let scrollback = match &mut self.scrollback_lines {
            Some(scrollback) => scrollback,
            None => return,
        };

        if delta != 0 {
            scrollback.rotate(delta);
        }

        for i in 0..inner {
            if let Some(source) = lines.get(inner_top + i).as_ref() {
                match scrollback.get_mut(i) {
                    Some(dest) => dest.copy_from(source),
                    slot => *slot = Some(source.clone()),
                }
            }
        }

        if delta != 0 {
            // Content moved up by `delta`, so the visible offset now sits
            // `delta` lines behind the target.
            let limit = inner as f32 * settings.far_scroll_lines.max(1) as f32;
            let position = self.scroll_animation.position - delta as f32;
            self.scroll_animation.position = position.max(-limit).min(limit);
        }

        self.needs_content = false;
    }

    /// Advances the scroll spring. Returns whether it is still moving.
    pub fn animate(&mut self, dt: f32, settings: &Settings) -> bool {
        self.scroll_animation.update(
            dt,
            settings.scroll_animation_length,
            settings.scroll_snap_threshold,
        )
    }

    /// Positions the window in the outer grid (a `win_pos` event). A
    /// hidden window becomes visible again.
    pub fn set_position(&mut self, start_col: f32, start_row: f32, width: usize, height: usize) {
        self.window_type = WindowType::Root;
        self.display_width = width;
        self.display_height = height;
        self.snap_to(start_col, start_row);
        self.anchor_info = None;
        self.has_position = true;
        self.hidden = false;
        self.dirty = true;
    }

    /// Installs an already-resolved floating position.
    pub fn set_float_position(&mut self, left: f32, top: f32) {
        self.window_type = WindowType::Floating;
        self.display_width = self.grid_width;
        self.display_height = self.grid_height;
        self.snap_to(left, top);
        self.has_position = true;
        self.hidden = false;
        self.dirty = true;
    }

    /// Positions the message grid at `row` of the outer grid.
    pub fn set_message_position(&mut self, row: f32, scrolled: bool) {
        self.window_type = WindowType::Message;
        self.display_width = self.grid_width;
        self.display_height = self.grid_height;
        self.message_scrolled = scrolled;
        self.snap_to(0.0, row);
        self.has_position = true;
        self.hidden = false;
        self.dirty = true;
    }

    fn snap_to(&mut self, left: f32, top: f32) {
        self.grid_position = (left, top);
        self.target_position = (left, top);
        self.position_springs.0.reset();
        self.position_springs.1.reset();
    }

    pub fn hide(&mut self) {
        self.hidden = true;
        self.dirty = true;
    }

    /// Reads a live cell.
    pub fn get_cell(&self, row: usize, col: usize) -> Option<&super::GridCell> {
        if row >= self.grid_height {
            return None;
        }
        self.actual_lines
            .as_ref()?
            .get(row as i64)
            .as_ref()?
            .cell(col)
    }

    /// Reads a scrollback cell at the current animation offset.
    ///
    /// `inner_row` is relative to the inner region and may be -1 (or
    /// `inner`) so the renderer can draw the extra row sliding in at the
    /// edge. Lookups truncate toward zero so scroll-up and scroll-down
    /// stay symmetric.
    pub fn get_scroll_cell(&self, inner_row: i64, col: usize) -> Option<&super::GridCell> {
        let scrollback = self.scrollback_lines.as_ref()?;
        if scrollback.is_empty() {
            return None;
        }
        let index = self.scroll_animation.position.trunc() as i64 + inner_row;
        scrollback.get(index).as_ref()?.cell(col)
    }

    /// Fractional part of the scroll offset in pixels; positive when the
    /// content should shift down on screen.
    pub fn sub_line_offset(&self, cell_height: f32) -> f32 {
        let position = self.scroll_animation.position;
        (position.trunc() - position) * cell_height
    }

    /// Whether the scrollback can back a scroll animation right now.
    ///
    /// Windows that never saw a viewport delta (permanent side panels,
    /// the statusline) report false so they are not drawn through the
    /// scrollback path, which would jitter on content-only updates.
    pub fn has_valid_scrollback(&self) -> bool {
        if !self.has_scrolled {
            return false;
        }

        let scrollback = match &self.scrollback_lines {
            Some(scrollback) if !scrollback.is_empty() => scrollback,
            _ => return false,
        };

        match scrollback.get(0) {
            Some(line) if line.width() > 0 && !line.is_blank() => {}
            _ => return false,
        }

        let position = self.scroll_animation.position;
        if position != 0.0 && scrollback.get(position.trunc() as i64).is_none() {
            return false;
        }

        true
    }

    /// Whether a scroll animation is in flight.
    pub fn has_scroll_animation(&self) -> bool {
        self.scroll_animation.position != 0.0
    }

    /// Viewport delta latched for the next flush.
    pub fn pending_scroll_delta(&self) -> i64 {
        self.scroll_delta
    }

    /// The window-move springs. Both stay at rest today: positions snap
    /// so backend-driven moves are not animated twice.
    pub fn position_springs(&self) -> (Spring, Spring) {
        self.position_springs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> Settings {
        Settings::default()
    }

    /// Builds a window and fills each row with a distinct hl id.
    fn filled_window(id: u64, width: usize, height: usize) -> RenderedWindow {
        let mut window = RenderedWindow::new(id);
        window.resize(width, height);
        for row in 0..height {
            window.apply_line(
                row,
                0,
                &[CellRun {
                    text: "x".into(),
                    hl_id: 10 + row as u64,
                    repeat: width as u64,
                }],
            );
        }
        window
    }

    fn scrollback_fingerprint(window: &RenderedWindow) -> Vec<(i64, Option<(String, u64)>)> {
        let inner = window.grid_height as i64
            - window.viewport_margins.top as i64
            - window.viewport_margins.bottom as i64;
        (-inner..inner)
            .map(|i| {
                let cell = window.get_scroll_cell(i, 0);
                (i, cell.map(|c| (c.text().to_owned(), c.hl_id)))
            })
            .collect()
    }

    #[test]
    fn simple_scroll_rotates_scrollback() {
        let mut window = filled_window(2, 80, 24);
        window.flush(&settings());

        window.set_viewport(1.0, 25.0, 1);
        window.flush(&settings());

        assert_eq!(window.scroll_animation.position, -1.0);
        // Row 0 is rendered through scrollback[-1]: the pre-scroll line.
        let cell = window.get_scroll_cell(0, 0).expect("extra row missing");
        assert_eq!(cell.hl_id, 10);
        assert_eq!(cell.text(), "x");
        assert!(window.has_valid_scrollback());
    }

    #[test]
    fn confirmation_viewport_event_keeps_pending_delta() {
        let mut window = filled_window(2, 40, 10);
        window.flush(&settings());

        window.set_viewport(3.0, 13.0, 3);
        window.set_viewport(3.0, 13.0, 0);
        assert_eq!(window.pending_scroll_delta(), 3);

        window.flush(&settings());
        assert_eq!(window.scroll_animation.position, -3.0);
    }

    #[test]
    fn flush_clamps_position_to_inner_height() {
        let mut window = filled_window(2, 40, 10);
        window.flush(&settings());

        window.set_viewport(0.0, 0.0, 25);
        window.flush(&settings());
        assert_eq!(window.scroll_animation.position, -10.0);

        window.set_viewport(0.0, 0.0, -50);
        window.flush(&settings());
        assert_eq!(window.scroll_animation.position, 10.0);
    }

    #[test]
    fn margin_change_forces_scrollback_rebuild() {
        let mut window = filled_window(2, 80, 24);
        window.flush(&settings());
        window.set_viewport(1.0, 25.0, 1);
        window.flush(&settings());
        assert_eq!(window.scroll_animation.position, -1.0);

        window.set_viewport_margins(ViewportMargins {
            top: 1,
            bottom: 1,
            left: 0,
            right: 0,
        });
        window.flush(&settings());

        // 2 * (24 - 1 - 1) slots, both halves from the inner region.
        assert_eq!(window.scroll_animation.position, 0.0);
        assert_eq!(window.pending_scroll_delta(), 0);
        let first = window.get_scroll_cell(0, 0).unwrap();
        let mirrored = window.get_scroll_cell(-22, 0).unwrap();
        assert_eq!(first.hl_id, 11);
        assert_eq!(mirrored.hl_id, first.hl_id);
    }

    #[test]
    fn flush_without_changes_is_idempotent() {
        let mut window = filled_window(2, 32, 8);
        window.set_viewport(0.0, 0.0, 2);
        window.flush(&settings());

        let before = scrollback_fingerprint(&window);
        let position = window.scroll_animation.position;

        window.flush(&settings());
        window.flush(&settings());

        assert_eq!(scrollback_fingerprint(&window), before);
        assert_eq!(window.scroll_animation.position, position);
    }

    #[test]
    fn full_grid_scroll_rotates_live_ring() {
        let mut window = filled_window(2, 16, 4);

        window.scroll(0, 4, 0, 16, 1, 0);
        assert_eq!(window.get_cell(0, 0).unwrap().hl_id, 11);
        assert_eq!(window.get_cell(2, 0).unwrap().hl_id, 13);
        // The vacated last row wraps to stale content; the backend
        // overwrites it with a grid_line before flush.
        assert_eq!(window.get_cell(3, 0).unwrap().hl_id, 10);
    }

    #[test]
    fn region_scroll_moves_and_clears() {
        let mut window = filled_window(2, 16, 6);

        // Scroll rows 1..5 up by one, columns 4..12 only.
        window.scroll(1, 5, 4, 12, 1, 0);

        assert_eq!(window.get_cell(1, 4).unwrap().hl_id, 12);
        assert_eq!(window.get_cell(1, 0).unwrap().hl_id, 11);
        assert_eq!(window.get_cell(3, 4).unwrap().hl_id, 14);
        // Vacated region bottom is cleared.
        assert_eq!(window.get_cell(4, 4).unwrap().hl_id, 0);
        assert_eq!(window.get_cell(4, 0).unwrap().hl_id, 14);
    }

    #[test]
    fn region_scroll_down_clears_top() {
        let mut window = filled_window(2, 8, 5);

        // Columns 0..6 only, so this takes the copying path instead of
        // the full-grid rotation.
        window.scroll(0, 5, 0, 6, -2, 0);

        assert_eq!(window.get_cell(2, 0).unwrap().hl_id, 10);
        assert_eq!(window.get_cell(4, 0).unwrap().hl_id, 12);
        assert_eq!(window.get_cell(0, 0).unwrap().hl_id, 0);
        assert_eq!(window.get_cell(1, 0).unwrap().hl_id, 0);
        // Columns outside the region are untouched.
        assert_eq!(window.get_cell(0, 7).unwrap().hl_id, 10);
    }

    #[test]
    fn grid_scroll_does_not_touch_animation() {
        let mut window = filled_window(2, 16, 4);
        window.scroll(0, 4, 0, 16, 2, 0);

        assert_eq!(window.scroll_animation.position, 0.0);
        assert!(!window.has_scrolled);
    }

    #[test]
    fn width_growth_preserves_lines_in_place() {
        let mut window = filled_window(2, 10, 4);
        window.resize(14, 4);

        assert_eq!(window.grid_width, 14);
        assert_eq!(window.get_cell(1, 9).unwrap().hl_id, 11);
        assert_eq!(window.get_cell(1, 12).unwrap().hl_id, 0);
    }

    #[test]
    fn outer_grid_never_preserves_content() {
        let mut window = filled_window(1, 10, 4);
        window.resize(14, 4);

        assert_eq!(window.get_cell(1, 5).unwrap().hl_id, 0);
    }

    #[test]
    fn shrinking_width_discards_content() {
        let mut window = filled_window(2, 10, 4);
        window.resize(6, 4);

        assert_eq!(window.get_cell(1, 3).unwrap().hl_id, 0);
    }

    #[test]
    fn height_change_preserves_overlapping_rows() {
        let mut window = filled_window(2, 10, 4);
        window.resize(10, 6);

        assert_eq!(window.get_cell(0, 0).unwrap().hl_id, 10);
        assert_eq!(window.get_cell(3, 0).unwrap().hl_id, 13);
        assert_eq!(window.get_cell(5, 0).unwrap().hl_id, 0);
    }

    #[test]
    fn resize_resets_scroll_state() {
        let mut window = filled_window(2, 10, 4);
        window.set_viewport(0.0, 0.0, 2);
        window.flush(&settings());
        assert_ne!(window.scroll_animation.position, 0.0);

        window.resize(10, 8);
        assert_eq!(window.scroll_animation.position, 0.0);
        assert_eq!(window.pending_scroll_delta(), 0);
    }

    #[test]
    fn scrollback_invalid_until_first_scroll() {
        let mut window = filled_window(2, 10, 4);
        window.flush(&settings());
        assert!(!window.has_valid_scrollback());

        window.set_viewport(0.0, 0.0, 1);
        window.flush(&settings());
        assert!(window.has_valid_scrollback());
    }

    #[test]
    fn sub_line_offset_uses_trunc() {
        let mut window = filled_window(2, 10, 4);
        window.scroll_animation.position = -1.25;
        // trunc(-1.25) = -1; offset = (-1 - (-1.25)) * h = 0.25 * h.
        assert!((window.sub_line_offset(20.0) - 5.0).abs() < 1e-4);

        window.scroll_animation.position = 1.25;
        assert!((window.sub_line_offset(20.0) + 5.0).abs() < 1e-4);
    }

    #[test]
    fn spring_animates_back_to_rest() {
        let mut window = filled_window(2, 10, 6);
        window.flush(&settings());
        window.set_viewport(0.0, 0.0, 2);
        window.flush(&settings());

        let mut steps = 0;
        while window.animate(1.0 / 60.0, &settings()) {
            assert!(window.scroll_animation.position <= 0.0);
            steps += 1;
            assert!(steps < 1000);
        }
        assert_eq!(window.scroll_animation.position, 0.0);
        assert!(!window.has_scroll_animation());
    }
}
