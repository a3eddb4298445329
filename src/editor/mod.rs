//! Top-level UI state: every window, the highlight table, cursor and
//! modes, and the interpreter that applies redraw events to them.

pub use self::frame::{CellStyle, Frame, FrameCell, FrameCursor, FrameWindow};

use crate::color::Color;
use crate::cursor::{Cursor, CursorMode};
use crate::grid::rendered::{AnchorInfo, PendingAnchor};
use crate::grid::{AnchorKind, RenderedWindow, ViewportMargins, WindowType};
use crate::nvim::{
    FloatPosition, HlAttr, PopupMenuItem, RedrawEvent, StyledContent, TabPage, UiOption,
};
use crate::settings::Settings;
use fnv::FnvHashMap;

mod frame;

/// Message grids sort above every float unless the backend says
/// otherwise.
const MESSAGE_ZINDEX: u64 = 200;

/// Session-wide default colors; used wherever a highlight attribute
/// leaves a channel unset.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DefaultColors {
    pub foreground: Color,
    pub background: Color,
    pub special: Color,
}

impl Default for DefaultColors {
    fn default() -> Self {
        Self {
            foreground: Color::WHITE,
            background: Color::BLACK,
            special: Color::from_rgb(0xFF, 0, 0),
        }
    }
}

/// Typed UI options the client reacts to.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct GuiOptions {
    pub guifont: String,
    pub guifontwide: String,
    pub linespace: i64,
    pub pumblend: u64,
    pub showtabline: u64,
}

/// One ext-message entry.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub kind: String,
    pub content: StyledContent,
}

/// Accumulated ext-message state.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct MessageState {
    pub entries: Vec<Message>,
    pub showmode: StyledContent,
    pub showcmd: StyledContent,
    pub ruler: StyledContent,
    pub history: Vec<(String, StyledContent)>,
}

/// Latest ext-cmdline state; `None` while the cmdline is hidden.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct CmdlineState {
    pub content: StyledContent,
    pub pos: u64,
    pub first_char: String,
    pub prompt: String,
    pub indent: u64,
    pub level: u64,
}

/// Latest ext-popupmenu state; `None` while the menu is hidden.
#[derive(Debug, Clone, PartialEq)]
pub struct PopupMenuState {
    pub items: Vec<PopupMenuItem>,
    pub selected: Option<u64>,
    pub row: u64,
    pub col: u64,
    pub grid: u64,
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct TablineState {
    pub current: u64,
    pub tabs: Vec<TabPage>,
}

/// Backend status flags mirrored onto the frame snapshot.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct StatusFlags {
    pub busy: bool,
    pub mouse_enabled: bool,
    pub suspended: bool,
    pub restarting: bool,
    pub exited: bool,
}

/// The UI-state engine. Exclusively owned by the render thread; the
/// only input is the redraw event stream, the only output is the frame
/// snapshot.
pub struct Editor {
    settings: Settings,

    windows: FnvHashMap<u64, RenderedWindow>,
    hl_attrs: FnvHashMap<u64, HlAttr>,
    hl_groups: FnvHashMap<String, u64>,
    default_colors: DefaultColors,

    cursor: Cursor,
    cursor_modes: Vec<CursorMode>,
    current_mode: usize,
    mode_name: String,
    cursor_style_enabled: bool,

    options: GuiOptions,
    title: String,
    icon_title: String,
    status: StatusFlags,

    messages: MessageState,
    cmdline: Option<CmdlineState>,
    popupmenu: Option<PopupMenuState>,
    tabline: TablineState,

    /// Tiebreaker stamp for floats sharing a zindex.
    composition_counter: u64,
    /// Draw order rebuilt when a frame is taken; reused across frames.
    composition: Vec<u64>,

    pub dirty: bool,
}

impl Editor {
    pub fn new(settings: Settings) -> Self {
        Self {
            settings,
            windows: FnvHashMap::default(),
            hl_attrs: FnvHashMap::default(),
            hl_groups: FnvHashMap::default(),
            default_colors: DefaultColors::default(),
            cursor: Cursor::default(),
            cursor_modes: Vec::new(),
            current_mode: 0,
            mode_name: String::new(),
            cursor_style_enabled: false,
            options: GuiOptions::default(),
            title: String::new(),
            icon_title: String::new(),
            status: StatusFlags::default(),
            messages: MessageState::default(),
            cmdline: None,
            popupmenu: None,
            tabline: TablineState::default(),
            composition_counter: 0,
            composition: Vec::new(),
            dirty: false,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn window(&self, grid: u64) -> Option<&RenderedWindow> {
        self.windows.get(&grid)
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn icon_title(&self) -> &str {
        &self.icon_title
    }

    pub fn status(&self) -> StatusFlags {
        self.status
    }

    pub fn options(&self) -> &GuiOptions {
        &self.options
    }

    pub fn messages(&self) -> &MessageState {
        &self.messages
    }

    pub fn cmdline(&self) -> Option<&CmdlineState> {
        self.cmdline.as_ref()
    }

    pub fn popupmenu(&self) -> Option<&PopupMenuState> {
        self.popupmenu.as_ref()
    }

    pub fn tabline(&self) -> &TablineState {
        &self.tabline
    }

    pub fn cursor(&self) -> Cursor {
        self.cursor
    }

    /// Name of the active mode as announced by `mode_change`.
    pub fn mode_name(&self) -> &str {
        &self.mode_name
    }

    pub fn default_colors(&self) -> DefaultColors {
        self.default_colors
    }

    /// Cursor properties of the active mode. `None` when the backend
    /// disabled cursor styling or the index is stale.
    pub fn current_cursor_mode(&self) -> Option<&CursorMode> {
        if !self.cursor_style_enabled {
            return None;
        }
        self.cursor_modes.get(self.current_mode)
    }

    /// Highlight attribute for `id` with unset colors resolved to the
    /// session defaults. Id 0 is the defaults themselves.
    pub fn hl_attr(&self, id: u64) -> HlAttr {
        let mut attr = if id == 0 {
            HlAttr::default()
        } else {
            self.hl_attrs.get(&id).copied().unwrap_or_default()
        };

        attr.foreground = attr.foreground.or(Some(self.default_colors.foreground));
        attr.background = attr.background.or(Some(self.default_colors.background));
        attr.special = attr.special.or(Some(self.default_colors.special));

        attr
    }

    /// Highlight id bound to a UI highlight group name, if announced.
    pub fn hl_group(&self, name: &str) -> Option<u64> {
        self.hl_groups.get(name).copied()
    }

    /// Advances every scroll animation. Returns true while any window is
    /// still moving.
    pub fn animate(&mut self, dt: f32) -> bool {
        let settings = self.settings;
        let mut animating = false;
        for window in self.windows.values_mut() {
            animating |= window.animate(dt, &settings);
        }
        animating
    }

    /// Applies one redraw event.
    pub fn handle_event(&mut self, event: RedrawEvent) {
        match event {
            RedrawEvent::SetTitle(title) => {
                self.title = title;
                self.dirty = true;
            }
            RedrawEvent::SetIcon(icon) => {
                self.icon_title = icon;
                self.dirty = true;
            }
            RedrawEvent::ModeInfoSet {
                cursor_style_enabled,
                cursor_modes,
            } => {
                self.cursor_style_enabled = cursor_style_enabled;
                self.cursor_modes = cursor_modes;
            }
            RedrawEvent::OptionSet(option) => self.apply_option(option),
            RedrawEvent::ModeChange { mode, mode_idx } => {
                self.mode_name = mode;
                self.current_mode = mode_idx as usize;
                self.dirty = true;
            }
            RedrawEvent::Mouse(enabled) => self.status.mouse_enabled = enabled,
            RedrawEvent::Busy(busy) => {
                self.status.busy = busy;
                self.dirty = true;
            }
            RedrawEvent::Suspend => self.status.suspended = true,
            RedrawEvent::Restart => self.status.restarting = true,
            RedrawEvent::Exited => {
                self.status.exited = true;
                self.dirty = true;
            }
            // Multiple flushes can arrive in one drained batch; each one
            // completes a transaction and every one must be applied or
            // rapid updates stutter the scroll animation.
            RedrawEvent::Flush => {
                let settings = self.settings;
                for window in self.windows.values_mut() {
                    window.flush(&settings);
                }
                self.dirty = true;
            }

            RedrawEvent::GridResize {
                grid,
                width,
                height,
            } => {
                self.window_mut(grid)
                    .resize(width as usize, height as usize);

                let pending = self
                    .windows
                    .get_mut(&grid)
                    .and_then(|w| w.pending_anchor.take());
                if let Some(pending) = pending {
                    self.place_float(
                        grid,
                        pending.kind,
                        pending.anchor_grid,
                        pending.anchor_row,
                        pending.anchor_col,
                        pending.zindex,
                    );
                }
                self.dirty = true;
            }
            RedrawEvent::DefaultColorsSet {
                foreground,
                background,
                special,
            } => {
                self.default_colors = DefaultColors {
                    foreground,
                    background,
                    special,
                };
                self.dirty = true;
            }
            RedrawEvent::HlAttrDefine { id, attr } => {
                self.hl_attrs.insert(id, attr);
            }
            RedrawEvent::HlGroupSet { name, hl_id } => {
                self.hl_groups.insert(name, hl_id);
            }
            RedrawEvent::GridLine(update) => {
                self.window_mut(update.grid).apply_line(
                    update.row as usize,
                    update.col_start as usize,
                    &update.cells,
                );
            }
            RedrawEvent::GridClear(grid) => self.window_mut(grid).clear_grid(),
            RedrawEvent::GridDestroy(grid) => {
                self.windows.remove(&grid);
                self.dirty = true;
            }
            RedrawEvent::GridCursorGoto { grid, row, column } => {
                self.cursor = self.cursor.move_to(grid, row, column);
                self.dirty = true;
            }
            RedrawEvent::GridScroll(region) => {
                self.window_mut(region.grid).scroll(
                    region.top,
                    region.bottom,
                    region.left,
                    region.right,
                    region.rows,
                    region.cols,
                );
            }

            RedrawEvent::WinPos {
                grid,
                start_row,
                start_col,
                width,
                height,
            } => {
                self.window_mut(grid).set_position(
                    start_col as f32,
                    start_row as f32,
                    width as usize,
                    height as usize,
                );
                self.dirty = true;
            }
            RedrawEvent::WinFloatPos(float) => self.apply_float_pos(float),
            RedrawEvent::WinExternalPos { grid } => {
                // Externalized windows live in their own OS window; they
                // are no longer composited here.
                let window = self.window_mut(grid);
                window.has_position = false;
                window.dirty = true;
                self.dirty = true;
            }
            RedrawEvent::WinHide(grid) => {
                self.window_mut(grid).hide();
                self.dirty = true;
            }
            RedrawEvent::WinClose(grid) => {
                self.windows.remove(&grid);
                self.dirty = true;
            }
            RedrawEvent::MsgSetPos {
                grid,
                row,
                scrolled,
                sep_char: _,
                zindex,
            } => {
                let zindex = zindex.unwrap_or(MESSAGE_ZINDEX);
                let order = self.next_composition_order(grid, zindex);
                let window = self.window_mut(grid);
                window.zindex = zindex;
                window.composition_order = order;
                window.set_message_position(row as f32, scrolled);
                self.dirty = true;
            }
            RedrawEvent::WinViewport {
                grid,
                topline,
                botline,
                scroll_delta,
                ..
            } => {
                self.window_mut(grid)
                    .set_viewport(topline, botline, scroll_delta.unwrap_or(0));
            }
            RedrawEvent::WinViewportMargins {
                grid,
                top,
                bottom,
                left,
                right,
            } => {
                self.window_mut(grid).set_viewport_margins(ViewportMargins {
                    top: top as usize,
                    bottom: bottom as usize,
                    left: left as usize,
                    right: right as usize,
                });
            }

            RedrawEvent::MsgShow {
                kind,
                content,
                replace_last,
            } => {
                if replace_last {
                    self.messages.entries.pop();
                }
                self.messages.entries.push(Message { kind, content });
                self.dirty = true;
            }
            RedrawEvent::MsgClear => {
                self.messages.entries.clear();
                self.dirty = true;
            }
            RedrawEvent::MsgShowMode(content) => self.messages.showmode = content,
            RedrawEvent::MsgShowCmd(content) => self.messages.showcmd = content,
            RedrawEvent::MsgRuler(content) => self.messages.ruler = content,
            RedrawEvent::MsgHistoryShow(entries) => self.messages.history = entries,

            RedrawEvent::CmdlineShow {
                content,
                pos,
                first_char,
                prompt,
                indent,
                level,
            } => {
                self.cmdline = Some(CmdlineState {
                    content,
                    pos,
                    first_char,
                    prompt,
                    indent,
                    level,
                });
                self.dirty = true;
            }
            RedrawEvent::CmdlinePos { pos, level } => {
                if let Some(cmdline) = &mut self.cmdline {
                    cmdline.pos = pos;
                    cmdline.level = level;
                }
            }
            RedrawEvent::CmdlineHide => {
                self.cmdline = None;
                self.dirty = true;
            }

            RedrawEvent::PopupMenuShow {
                items,
                selected,
                row,
                col,
                grid,
            } => {
                self.popupmenu = Some(PopupMenuState {
                    items,
                    selected,
                    row,
                    col,
                    grid,
                });
                self.dirty = true;
            }
            RedrawEvent::PopupMenuSelect(selected) => {
                if let Some(menu) = &mut self.popupmenu {
                    menu.selected = selected;
                }
            }
            RedrawEvent::PopupMenuHide => {
                self.popupmenu = None;
                self.dirty = true;
            }

            RedrawEvent::TablineUpdate { current, tabs } => {
                self.tabline = TablineState { current, tabs };
                self.dirty = true;
            }
        }
    }

    /// Looks a window up, creating it on first reference.
    fn window_mut(&mut self, grid: u64) -> &mut RenderedWindow {
        self.windows
            .entry(grid)
            .or_insert_with(|| RenderedWindow::new(grid))
    }

    fn apply_option(&mut self, option: UiOption) {
        match option {
            UiOption::GuiFont(value) => self.options.guifont = value,
            UiOption::GuiFontWide(value) => self.options.guifontwide = value,
            UiOption::LineSpace(value) => self.options.linespace = value,
            UiOption::Pumblend(value) => self.options.pumblend = value.min(100),
            UiOption::ShowTabline(value) => self.options.showtabline = value,
            UiOption::Unknown { name, value } => {
                log::debug!("ignoring option {} = {}", name, value);
            }
        }
    }

    fn apply_float_pos(&mut self, float: FloatPosition) {
        let (width, height) = {
            let window = self.window_mut(float.grid);
            (window.grid_width, window.grid_height)
        };

        if width == 0 && height == 0 {
            // The anchor math needs the window extent; park the record
            // until the first resize establishes one.
            let window = self.window_mut(float.grid);
            window.window_type = WindowType::Floating;
            window.pending_anchor = Some(PendingAnchor {
                kind: float.anchor,
                anchor_grid: float.anchor_grid,
                anchor_row: float.anchor_row,
                anchor_col: float.anchor_col,
                zindex: float.zindex,
            });
            return;
        }

        self.place_float(
            float.grid,
            float.anchor,
            float.anchor_grid,
            float.anchor_row,
            float.anchor_col,
            float.zindex,
        );
    }

    /// Resolves an anchored float position and installs it.
    ///
    /// Windows reference each other only by grid id; the anchor grid is
    /// looked up through the map so ownership stays tree-shaped.
    fn place_float(
        &mut self,
        grid: u64,
        kind: AnchorKind,
        anchor_grid: u64,
        anchor_row: f64,
        anchor_col: f64,
        zindex: u64,
    ) {
        let base = self
            .windows
            .get(&anchor_grid)
            .map(|w| w.grid_position)
            .unwrap_or((0.0, 0.0));
        let (width, height) = self
            .windows
            .get(&grid)
            .map(|w| (w.grid_width as f64, w.grid_height as f64))
            .unwrap_or((0.0, 0.0));

        let mut left = anchor_col;
        let mut top = anchor_row;
        match kind {
            AnchorKind::NorthWest => {}
            AnchorKind::NorthEast => left -= width,
            AnchorKind::SouthWest => top -= height,
            AnchorKind::SouthEast => {
                left -= width;
                top -= height;
            }
        }

        let left = (left + base.0 as f64).max(0.0) as f32;
        let top = (top + base.1 as f64).max(0.0) as f32;

        let order = self.next_composition_order(grid, zindex);
        let window = self.window_mut(grid);
        window.anchor_info = Some(AnchorInfo {
            anchor_grid,
            anchor_left: left,
            anchor_top: top,
            z: zindex,
        });
        window.zindex = zindex;
        window.composition_order = order;
        window.set_float_position(left, top);
        self.dirty = true;
    }

    /// Composition order is stamped at the first observation of a
    /// `(window, zindex)` pair; repositioning at the same zindex keeps
    /// the stamp so stable floats keep their relative order.
    fn next_composition_order(&mut self, grid: u64, zindex: u64) -> u64 {
        if let Some(window) = self.windows.get(&grid) {
            let floating = matches!(
                window.window_type,
                WindowType::Floating | WindowType::Message
            );
            if floating && window.zindex == zindex {
                return window.composition_order;
            }
        }

        let order = self.composition_counter;
        self.composition_counter += 1;
        order
    }

    /// Rebuilds the draw-order scratch: roots sorted by id, then floats
    /// by `(zindex, composition order, id)`.
    fn refresh_composition(&mut self) {
        let windows = &self.windows;
        self.composition.clear();
        self.composition.extend(
            windows
                .iter()
                .filter(|(_, w)| Self::is_composited(w))
                .map(|(id, _)| *id),
        );

        let windows = &self.windows;
        self.composition.sort_by_key(|id| {
            let window = &windows[id];
            match window.window_type {
                WindowType::Root => (0u8, 0u64, 0u64, window.id),
                WindowType::Floating | WindowType::Message => {
                    (1u8, window.zindex, window.composition_order, window.id)
                }
            }
        });
    }

    /// Filters windows the renderer should not see: hidden or invalid
    /// ones, those without dimensions or placement (the outer grid is
    /// always placed), and those still waiting for first content after a
    /// resize, which would flash black.
    fn is_composited(window: &RenderedWindow) -> bool {
        !window.hidden
            && window.valid
            && window.grid_width > 0
            && window.grid_height > 0
            && !window.needs_content
            && (window.has_position || window.id == 1)
    }

    /// Takes a frame snapshot. The returned view borrows this editor and
    /// stays valid until the next event application.
    pub fn frame(&mut self) -> Frame<'_> {
        self.refresh_composition();
        self.dirty = false;
        Frame::new(self)
    }

    pub(crate) fn composition(&self) -> &[u64] {
        &self.composition
    }
}
