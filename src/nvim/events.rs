//! Typed redraw events and their streaming decode.
//!
//! Events must be handled in order. The backend sends a `flush` event
//! when it has completed a redraw of the entire screen, so all windows
//! have a consistent view of buffer state. Multiple `redraw` batches may
//! arrive before the screen is complete, with `flush` following only the
//! last one; the user should only ever see flushed state.

use super::msg::{self, Payload};
use crate::color::Color;
use crate::cursor::{CursorMode, CursorShape};
use crate::grid::{AnchorKind, CellRun};
use std::io;

/// Chunks of styled text: `(attr_id, text)` pairs.
pub type StyledContent = Vec<(u64, String)>;

bitflags::bitflags! {
    /// Style bits of a highlight attribute.
    #[derive(Default)]
    pub struct StyleFlags: u16 {
        const REVERSE       = 0b0000_0000_0000_0001;
        const ITALIC        = 0b0000_0000_0000_0010;
        const BOLD          = 0b0000_0000_0000_0100;
        const STRIKETHROUGH = 0b0000_0000_0000_1000;
        const UNDERLINE     = 0b0000_0000_0001_0000;
        const UNDERCURL     = 0b0000_0000_0010_0000;
        const UNDERDOTTED   = 0b0000_0000_0100_0000;
        const UNDERDASHED   = 0b0000_0000_1000_0000;
        const UNDERDOUBLE   = 0b0000_0001_0000_0000;
    }
}

/// Visual attributes of a highlight group.
///
/// Absent colors fall back to the session defaults at lookup time; the
/// sentinel is kept in the table so a changed default takes effect
/// without rewriting stored attributes.
#[derive(Debug, Default, Copy, Clone, PartialEq)]
pub struct HlAttr {
    pub foreground: Option<Color>,
    pub background: Option<Color>,
    /// Color for underline and undercurl, when present.
    pub special: Option<Color>,
    /// Blend level (0-100), used for floating-window transparency.
    pub blend: u8,
    pub flags: StyleFlags,
}

impl HlAttr {
    pub const fn reverse(&self) -> bool {
        self.flags.contains(StyleFlags::REVERSE)
    }

    pub const fn italic(&self) -> bool {
        self.flags.contains(StyleFlags::ITALIC)
    }

    pub const fn bold(&self) -> bool {
        self.flags.contains(StyleFlags::BOLD)
    }

    pub const fn strikethrough(&self) -> bool {
        self.flags.contains(StyleFlags::STRIKETHROUGH)
    }

    pub const fn underline(&self) -> bool {
        self.flags.contains(StyleFlags::UNDERLINE)
    }

    pub const fn undercurl(&self) -> bool {
        self.flags.contains(StyleFlags::UNDERCURL)
    }
}

/// A contiguous row update: cells are run-length encoded and the
/// highlight id carries over from the previous cell when omitted.
#[derive(Debug, Clone, PartialEq)]
pub struct GridLineUpdate {
    pub grid: u64,
    pub row: u64,
    pub col_start: u64,
    pub cells: Vec<CellRun>,
}

/// A region move inside a grid. Semantically unrelated to editor
/// scrolling: this is an optimized "copy these screen cells".
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct GridScrollRegion {
    pub grid: u64,
    pub top: i64,
    pub bottom: i64,
    pub left: i64,
    pub right: i64,
    /// Positive moves content up, negative moves it down.
    pub rows: i64,
    /// Reserved by the backend; always zero today.
    pub cols: i64,
}

/// Placement of a floating window relative to another grid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FloatPosition {
    pub grid: u64,
    pub anchor: AnchorKind,
    pub anchor_grid: u64,
    pub anchor_row: f64,
    pub anchor_col: f64,
    pub focusable: bool,
    pub zindex: u64,
}

/// An option reported through `option_set`.
#[derive(Debug, Clone, PartialEq)]
pub enum UiOption {
    GuiFont(String),
    GuiFontWide(String),
    LineSpace(i64),
    Pumblend(u64),
    ShowTabline(u64),
    /// Anything this client has no dedicated handling for.
    Unknown { name: String, value: Payload },
}

/// One entry of the tabline.
#[derive(Debug, Clone, PartialEq)]
pub struct TabPage {
    pub handle: u64,
    pub name: String,
}

/// A popup-menu completion item: word, kind, menu, info.
#[derive(Debug, Clone, PartialEq)]
pub struct PopupMenuItem {
    pub word: String,
    pub kind: String,
    pub menu: String,
    pub info: String,
}

/// UI redraw events sent by the backend.
#[derive(Debug, Clone, PartialEq)]
pub enum RedrawEvent {
    // Global events.
    SetTitle(String),
    SetIcon(String),
    ModeInfoSet {
        cursor_style_enabled: bool,
        cursor_modes: Vec<CursorMode>,
    },
    OptionSet(UiOption),
    ModeChange {
        mode: String,
        mode_idx: u64,
    },
    Mouse(bool),
    Busy(bool),
    Suspend,
    Restart,
    /// The backend is gone; synthesized on transport close as well.
    Exited,
    /// The redraw transaction is complete and may be shown.
    Flush,

    // Grid events.
    GridResize {
        grid: u64,
        width: u64,
        height: u64,
    },
    DefaultColorsSet {
        foreground: Color,
        background: Color,
        special: Color,
    },
    HlAttrDefine {
        id: u64,
        attr: HlAttr,
    },
    HlGroupSet {
        name: String,
        hl_id: u64,
    },
    GridLine(GridLineUpdate),
    GridClear(u64),
    GridDestroy(u64),
    GridCursorGoto {
        grid: u64,
        row: u64,
        column: u64,
    },
    GridScroll(GridScrollRegion),

    // Multigrid events.
    WinPos {
        grid: u64,
        start_row: u64,
        start_col: u64,
        width: u64,
        height: u64,
    },
    WinFloatPos(FloatPosition),
    WinExternalPos {
        grid: u64,
    },
    WinHide(u64),
    WinClose(u64),
    MsgSetPos {
        grid: u64,
        row: u64,
        scrolled: bool,
        sep_char: String,
        zindex: Option<u64>,
    },
    WinViewport {
        grid: u64,
        topline: f64,
        botline: f64,
        curline: u64,
        curcol: u64,
        line_count: Option<u64>,
        scroll_delta: Option<i64>,
    },
    WinViewportMargins {
        grid: u64,
        top: u64,
        bottom: u64,
        left: u64,
        right: u64,
    },

    // Ext-UI events: the latest state is stored, rendering is up to the
    // embedder.
    MsgShow {
        kind: String,
        content: StyledContent,
        replace_last: bool,
    },
    MsgClear,
    MsgShowMode(StyledContent),
    MsgShowCmd(StyledContent),
    MsgRuler(StyledContent),
    MsgHistoryShow(Vec<(String, StyledContent)>),
    CmdlineShow {
        content: StyledContent,
        pos: u64,
        first_char: String,
        prompt: String,
        indent: u64,
        level: u64,
    },
    CmdlinePos {
        pos: u64,
        level: u64,
    },
    CmdlineHide,
    PopupMenuShow {
        items: Vec<PopupMenuItem>,
        selected: Option<u64>,
        row: u64,
        col: u64,
        grid: u64,
    },
    PopupMenuSelect(Option<u64>),
    PopupMenuHide,
    TablineUpdate {
        current: u64,
        tabs: Vec<TabPage>,
    },
}

/// Decodes the params of a `redraw` notification into `out`.
///
/// The params value is an array of batches, each `[name, args...]`.
/// Unknown event names are skipped value-wise so the stream stays
/// aligned; the wire protocol is forward-compatible.
pub fn decode_redraw(raw: &mut &[u8], out: &mut Vec<RedrawEvent>) -> io::Result<()> {
    let n_batches = msg::read_array_len(raw)?;
    log::trace!("received redraw with {} batches", n_batches);

    for _ in 0..n_batches {
        decode_batch(raw, out)?;
    }

    Ok(())
}

fn decode_batch(raw: &mut &[u8], out: &mut Vec<RedrawEvent>) -> io::Result<()> {
    let batch_len = msg::read_array_len(raw)?;
    if batch_len == 0 {
        return msg::err_invalid_input();
    }

    // The first element is the event name, the rest are argument tuples.
    let name = msg::read_string(raw)?;
    let n_events = batch_len - 1;
    log::trace!("event_type = {}, n_events = {}", name, n_events);

    if !is_known_event(name) {
        log::debug!("skipping unknown event type '{}'", name);
        for _ in 0..n_events {
            msg::skip_value(raw)?;
        }
        return Ok(());
    }

    out.reserve(n_events);
    for _ in 0..n_events {
        if let Some(event) = decode_event(name, raw)? {
            out.push(event);
        }
    }

    Ok(())
}

const KNOWN_EVENTS: &[&str] = &[
    "set_title",
    "set_icon",
    "mode_info_set",
    "option_set",
    "mode_change",
    "mouse_on",
    "mouse_off",
    "busy_start",
    "busy_stop",
    "suspend",
    "restart",
    "nvim_exited",
    "flush",
    "grid_resize",
    "default_colors_set",
    "hl_attr_define",
    "hl_group_set",
    "grid_line",
    "grid_clear",
    "grid_destroy",
    "grid_cursor_goto",
    "grid_scroll",
    "win_pos",
    "win_float_pos",
    "win_external_pos",
    "win_hide",
    "win_close",
    "msg_set_pos",
    "win_viewport",
    "win_viewport_margins",
    "msg_show",
    "msg_clear",
    "msg_showmode",
    "msg_showcmd",
    "msg_ruler",
    "msg_history_show",
    "cmdline_show",
    "cmdline_pos",
    "cmdline_hide",
    "popupmenu_show",
    "popupmenu_select",
    "popupmenu_hide",
    "tabline_update",
];

fn is_known_event(name: &str) -> bool {
    KNOWN_EVENTS.contains(&name)
}

/// Reads the fields of one argument tuple, skipping any trailing values
/// a newer backend may have appended.
struct Args<'a, 'b> {
    raw: &'b mut &'a [u8],
    remaining: usize,
}

impl<'a, 'b> Args<'a, 'b> {
    fn open(raw: &'b mut &'a [u8]) -> io::Result<Self> {
        let remaining = msg::read_array_len(raw)?;
        Ok(Self { raw, remaining })
    }

    fn take(&mut self) -> io::Result<&mut &'a [u8]> {
        if self.remaining == 0 {
            return msg::err_invalid_input();
        }
        self.remaining -= 1;
        Ok(self.raw)
    }

    fn has_more(&self) -> bool {
        self.remaining > 0
    }

    fn u64(&mut self) -> io::Result<u64> {
        let raw = self.take()?;
        msg::read_u64(raw)
    }

    fn i64(&mut self) -> io::Result<i64> {
        let raw = self.take()?;
        msg::read_i64(raw)
    }

    fn number(&mut self) -> io::Result<f64> {
        let raw = self.take()?;
        msg::read_number(raw)
    }

    fn bool(&mut self) -> io::Result<bool> {
        let raw = self.take()?;
        msg::read_bool(raw)
    }

    fn string(&mut self) -> io::Result<String> {
        let raw = self.take()?;
        msg::read_string(raw).map(str::to_owned)
    }

    fn color(&mut self) -> io::Result<Color> {
        let raw = self.take()?;
        msg::read_color(raw)
    }

    fn handle(&mut self) -> io::Result<u64> {
        let raw = self.take()?;
        msg::read_handle(raw)
    }

    fn value(&mut self) -> io::Result<Payload> {
        let raw = self.take()?;
        Payload::decode(raw)
    }

    fn skip(&mut self) -> io::Result<()> {
        let raw = self.take()?;
        msg::skip_value(raw)
    }

    /// Discards whatever fields were not read.
    fn finish(mut self) -> io::Result<()> {
        while self.remaining > 0 {
            self.skip()?;
        }
        Ok(())
    }
}

fn decode_event(name: &str, raw: &mut &[u8]) -> io::Result<Option<RedrawEvent>> {
    let mut args = Args::open(raw)?;

    let event = match name {
        "set_title" => RedrawEvent::SetTitle(args.string()?),
        "set_icon" => RedrawEvent::SetIcon(args.string()?),
        "mode_info_set" => {
            let cursor_style_enabled = args.bool()?;
            let cursor_modes = decode_mode_infos(args.take()?)?;
            RedrawEvent::ModeInfoSet {
                cursor_style_enabled,
                cursor_modes,
            }
        }
        "option_set" => {
            let name = args.string()?;
            let known = match name.as_str() {
                "guifont" => Some(UiOption::GuiFont(args.string()?)),
                "guifontwide" => Some(UiOption::GuiFontWide(args.string()?)),
                "linespace" => Some(UiOption::LineSpace(args.i64()?)),
                "pumblend" => Some(UiOption::Pumblend(args.u64()?)),
                "showtabline" => Some(UiOption::ShowTabline(args.u64()?)),
                _ => None,
            };
            let option = match known {
                Some(option) => option,
                None => UiOption::Unknown {
                    name,
                    value: args.value()?,
                },
            };
            RedrawEvent::OptionSet(option)
        }
        "mode_change" => RedrawEvent::ModeChange {
            mode: args.string()?,
            mode_idx: args.u64()?,
        },
        "mouse_on" => RedrawEvent::Mouse(true),
        "mouse_off" => RedrawEvent::Mouse(false),
        "busy_start" => RedrawEvent::Busy(true),
        "busy_stop" => RedrawEvent::Busy(false),
        "suspend" => RedrawEvent::Suspend,
        "restart" => RedrawEvent::Restart,
        "nvim_exited" => RedrawEvent::Exited,
        "flush" => RedrawEvent::Flush,

        "grid_resize" => RedrawEvent::GridResize {
            grid: args.u64()?,
            width: args.u64()?,
            height: args.u64()?,
        },
        "default_colors_set" => RedrawEvent::DefaultColorsSet {
            foreground: args.color()?,
            background: args.color()?,
            special: args.color()?,
        },
        "hl_attr_define" => {
            let id = args.u64()?;
            let attr = decode_hl_attr(args.take()?)?;
            RedrawEvent::HlAttrDefine { id, attr }
        }
        "hl_group_set" => RedrawEvent::HlGroupSet {
            name: args.string()?,
            hl_id: args.u64()?,
        },
        "grid_line" => {
            let grid = args.u64()?;
            let row = args.u64()?;
            let col_start = args.u64()?;
            let cells = decode_line_cells(args.take()?)?;
            RedrawEvent::GridLine(GridLineUpdate {
                grid,
                row,
                col_start,
                cells,
            })
        }
        "grid_clear" => RedrawEvent::GridClear(args.u64()?),
        "grid_destroy" => RedrawEvent::GridDestroy(args.u64()?),
        "grid_cursor_goto" => RedrawEvent::GridCursorGoto {
            grid: args.u64()?,
            row: args.u64()?,
            column: args.u64()?,
        },
        "grid_scroll" => {
            let grid = args.u64()?;
            let top = args.i64()?;
            let bottom = args.i64()?;
            let left = args.i64()?;
            let right = args.i64()?;
            let rows = args.i64()?;
            let cols = if args.has_more() { args.i64()? } else { 0 };
            RedrawEvent::GridScroll(GridScrollRegion {
                grid,
                top,
                bottom,
                left,
                right,
                rows,
                cols,
            })
        }

        "win_pos" => {
            let grid = args.u64()?;
            args.handle()?;
            RedrawEvent::WinPos {
                grid,
                start_row: args.u64()?,
                start_col: args.u64()?,
                width: args.u64()?,
                height: args.u64()?,
            }
        }
        "win_float_pos" => {
            let grid = args.u64()?;
            args.handle()?;
            let anchor = decode_anchor(args.string()?.as_str())?;
            let anchor_grid = args.u64()?;
            let anchor_row = args.number()?;
            let anchor_col = args.number()?;
            let focusable = args.bool()?;
            let zindex = if args.has_more() { args.u64()? } else { 50 };
            RedrawEvent::WinFloatPos(FloatPosition {
                grid,
                anchor,
                anchor_grid,
                anchor_row,
                anchor_col,
                focusable,
                zindex,
            })
        }
        "win_external_pos" => {
            let grid = args.u64()?;
            args.handle()?;
            RedrawEvent::WinExternalPos { grid }
        }
        "win_hide" => RedrawEvent::WinHide(args.u64()?),
        "win_close" => RedrawEvent::WinClose(args.u64()?),
        "msg_set_pos" => {
            let grid = args.u64()?;
            let row = args.u64()?;
            let scrolled = args.bool()?;
            let sep_char = args.string()?;
            let zindex = if args.has_more() {
                Some(args.u64()?)
            } else {
                None
            };
            RedrawEvent::MsgSetPos {
                grid,
                row,
                scrolled,
                sep_char,
                zindex,
            }
        }
        "win_viewport" => {
            let grid = args.u64()?;
            args.handle()?;
            let topline = args.number()?;
            let botline = args.number()?;
            let curline = args.u64()?;
            let curcol = args.u64()?;
            let line_count = if args.has_more() {
                Some(args.u64()?)
            } else {
                None
            };
            let scroll_delta = if args.has_more() {
                Some(args.i64()?)
            } else {
                None
            };
            RedrawEvent::WinViewport {
                grid,
                topline,
                botline,
                curline,
                curcol,
                line_count,
                scroll_delta,
            }
        }
        "win_viewport_margins" => {
            let grid = args.u64()?;
            args.handle()?;
            RedrawEvent::WinViewportMargins {
                grid,
                top: args.u64()?,
                bottom: args.u64()?,
                left: args.u64()?,
                right: args.u64()?,
            }
        }

        "msg_show" => {
            let kind = args.string()?;
            let content = decode_styled_content(args.take()?)?;
            let replace_last = if args.has_more() {
                args.bool()?
            } else {
                false
            };
            RedrawEvent::MsgShow {
                kind,
                content,
                replace_last,
            }
        }
        "msg_clear" => RedrawEvent::MsgClear,
        "msg_showmode" => RedrawEvent::MsgShowMode(decode_styled_content(args.take()?)?),
        "msg_showcmd" => RedrawEvent::MsgShowCmd(decode_styled_content(args.take()?)?),
        "msg_ruler" => RedrawEvent::MsgRuler(decode_styled_content(args.take()?)?),
        "msg_history_show" => {
            let raw = args.take()?;
            let n_entries = msg::read_array_len(raw)?;
            let mut entries = Vec::with_capacity(n_entries);
            for _ in 0..n_entries {
                let mut entry = Args::open(raw)?;
                let kind = entry.string()?;
                let content = decode_styled_content(entry.take()?)?;
                entry.finish()?;
                entries.push((kind, content));
            }
            RedrawEvent::MsgHistoryShow(entries)
        }

        "cmdline_show" => {
            let content = decode_styled_content(args.take()?)?;
            RedrawEvent::CmdlineShow {
                content,
                pos: args.u64()?,
                first_char: args.string()?,
                prompt: args.string()?,
                indent: args.u64()?,
                level: args.u64()?,
            }
        }
        "cmdline_pos" => RedrawEvent::CmdlinePos {
            pos: args.u64()?,
            level: args.u64()?,
        },
        "cmdline_hide" => RedrawEvent::CmdlineHide,

        "popupmenu_show" => {
            let items = decode_popupmenu_items(args.take()?)?;
            let selected = decode_selected(args.i64()?);
            RedrawEvent::PopupMenuShow {
                items,
                selected,
                row: args.u64()?,
                col: args.u64()?,
                grid: args.u64()?,
            }
        }
        "popupmenu_select" => RedrawEvent::PopupMenuSelect(decode_selected(args.i64()?)),
        "popupmenu_hide" => RedrawEvent::PopupMenuHide,

        "tabline_update" => {
            let current = args.handle()?;
            let tabs = decode_tab_pages(args.take()?)?;
            RedrawEvent::TablineUpdate { current, tabs }
        }

        _ => {
            args.finish()?;
            return Ok(None);
        }
    };

    args.finish()?;
    Ok(Some(event))
}

fn decode_anchor(name: &str) -> io::Result<AnchorKind> {
    Ok(match name {
        "NW" => AnchorKind::NorthWest,
        "NE" => AnchorKind::NorthEast,
        "SW" => AnchorKind::SouthWest,
        "SE" => AnchorKind::SouthEast,
        _ => return msg::err_invalid_input(),
    })
}

fn decode_selected(index: i64) -> Option<u64> {
    if index < 0 {
        None
    } else {
        Some(index as u64)
    }
}

fn decode_mode_infos(raw: &mut &[u8]) -> io::Result<Vec<CursorMode>> {
    let n_infos = msg::read_array_len(raw)?;
    let mut infos = Vec::with_capacity(n_infos);

    for _ in 0..n_infos {
        let mut info = CursorMode::default();

        for _ in 0..msg::read_map_len(raw)? {
            match msg::read_string(raw)? {
                "cursor_shape" => {
                    info.shape = match msg::read_string(raw)? {
                        "block" => CursorShape::Block,
                        "horizontal" => CursorShape::Horizontal,
                        "vertical" => CursorShape::Vertical,
                        _ => return msg::err_invalid_input(),
                    }
                }
                "cell_percentage" => info.cell_percentage = msg::read_u64(raw)? as f64 / 100.0,
                "blinkwait" => info.blink.wait = msg::read_u64(raw)?,
                "blinkon" => info.blink.on = msg::read_u64(raw)?,
                "blinkoff" => info.blink.off = msg::read_u64(raw)?,
                "attr_id" | "hl_id" => info.attr_id = msg::read_u64(raw)?,
                "name" => info.name = msg::read_string(raw)?.to_owned(),
                _ => msg::skip_value(raw)?,
            }
        }

        infos.push(info);
    }

    Ok(infos)
}

fn decode_hl_attr(raw: &mut &[u8]) -> io::Result<HlAttr> {
    let mut attr = HlAttr::default();

    for _ in 0..msg::read_map_len(raw)? {
        match msg::read_string(raw)? {
            "foreground" => attr.foreground = Some(msg::read_color(raw)?),
            "background" => attr.background = Some(msg::read_color(raw)?),
            "special" => attr.special = Some(msg::read_color(raw)?),
            "blend" => attr.blend = msg::read_u64(raw)? as u8,
            "reverse" => {
                msg::read_bool(raw)?;
                attr.flags.insert(StyleFlags::REVERSE);
            }
            "italic" => {
                msg::read_bool(raw)?;
                attr.flags.insert(StyleFlags::ITALIC);
            }
            "bold" => {
                msg::read_bool(raw)?;
                attr.flags.insert(StyleFlags::BOLD);
            }
            "strikethrough" => {
                msg::read_bool(raw)?;
                attr.flags.insert(StyleFlags::STRIKETHROUGH);
            }
            "underline" => {
                msg::read_bool(raw)?;
                attr.flags.insert(StyleFlags::UNDERLINE);
            }
            "undercurl" => {
                msg::read_bool(raw)?;
                attr.flags.insert(StyleFlags::UNDERCURL);
            }
            "underdotted" => {
                msg::read_bool(raw)?;
                attr.flags.insert(StyleFlags::UNDERDOTTED);
            }
            "underdashed" => {
                msg::read_bool(raw)?;
                attr.flags.insert(StyleFlags::UNDERDASHED);
            }
            "underdouble" => {
                msg::read_bool(raw)?;
                attr.flags.insert(StyleFlags::UNDERDOUBLE);
            }
            _ => msg::skip_value(raw)?,
        }
    }

    Ok(attr)
}

fn decode_line_cells(raw: &mut &[u8]) -> io::Result<Vec<CellRun>> {
    let n_cells = msg::read_array_len(raw)?;
    let mut cells = Vec::with_capacity(n_cells);

    // The highlight id is sent for the first cell and carries across
    // until redefined.
    let mut last_hl_id = 0;
    for _ in 0..n_cells {
        let tuple_len = msg::read_array_len(raw)?;
        if tuple_len == 0 || tuple_len > 3 {
            return msg::err_invalid_input();
        }

        let text = msg::read_string(raw)?.to_owned();
        if tuple_len > 1 {
            last_hl_id = msg::read_u64(raw)?;
        }
        let repeat = if tuple_len > 2 {
            msg::read_u64(raw)?
        } else {
            1
        };

        cells.push(CellRun {
            text,
            hl_id: last_hl_id,
            repeat,
        });
    }

    Ok(cells)
}

fn decode_styled_content(raw: &mut &[u8]) -> io::Result<StyledContent> {
    let n_chunks = msg::read_array_len(raw)?;
    let mut content = Vec::with_capacity(n_chunks);

    for _ in 0..n_chunks {
        let mut chunk = Args::open(raw)?;
        let attr_id = chunk.u64()?;
        let text = chunk.string()?;
        chunk.finish()?;
        content.push((attr_id, text));
    }

    Ok(content)
}

fn decode_popupmenu_items(raw: &mut &[u8]) -> io::Result<Vec<PopupMenuItem>> {
    let n_items = msg::read_array_len(raw)?;
    let mut items = Vec::with_capacity(n_items);

    for _ in 0..n_items {
        let mut item = Args::open(raw)?;
        let word = item.string()?;
        let kind = item.string()?;
        let menu = item.string()?;
        let info = item.string()?;
        item.finish()?;
        items.push(PopupMenuItem {
            word,
            kind,
            menu,
            info,
        });
    }

    Ok(items)
}

fn decode_tab_pages(raw: &mut &[u8]) -> io::Result<Vec<TabPage>> {
    let n_tabs = msg::read_array_len(raw)?;
    let mut tabs = Vec::with_capacity(n_tabs);

    for _ in 0..n_tabs {
        let mut tab = TabPage {
            handle: 0,
            name: String::new(),
        };

        for _ in 0..msg::read_map_len(raw)? {
            match msg::read_string(raw)? {
                "tab" => tab.handle = msg::read_handle(raw)?,
                "name" => tab.name = msg::read_string(raw)?.to_owned(),
                _ => msg::skip_value(raw)?,
            }
        }

        tabs.push(tab);
    }

    Ok(tabs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nvim::msg::{
        write_array_len, write_bool, write_map_len, write_sint, write_str, write_uint,
    };

    fn decode_all(buf: &[u8]) -> Vec<RedrawEvent> {
        let mut raw = buf;
        let mut out = Vec::new();
        decode_redraw(&mut raw, &mut out).expect("decode failed");
        assert!(raw.is_empty(), "unconsumed bytes");
        out
    }

    #[test]
    fn grid_line_carries_highlight_id() {
        let mut buf = Vec::new();
        write_array_len(&mut buf, 1); // one batch
        write_array_len(&mut buf, 2); // name + one tuple
        write_str(&mut buf, "grid_line");
        write_array_len(&mut buf, 4);
        write_uint(&mut buf, 2); // grid
        write_uint(&mut buf, 0); // row
        write_uint(&mut buf, 3); // col_start
        write_array_len(&mut buf, 3); // cells
        write_array_len(&mut buf, 2);
        write_str(&mut buf, "a");
        write_uint(&mut buf, 7);
        write_array_len(&mut buf, 1);
        write_str(&mut buf, "b");
        write_array_len(&mut buf, 3);
        write_str(&mut buf, " ");
        write_uint(&mut buf, 0);
        write_uint(&mut buf, 5);

        let events = decode_all(&buf);
        assert_eq!(events.len(), 1);
        match &events[0] {
            RedrawEvent::GridLine(update) => {
                assert_eq!(update.grid, 2);
                assert_eq!(update.col_start, 3);
                assert_eq!(update.cells.len(), 3);
                assert_eq!(update.cells[0].hl_id, 7);
                // Omitted hl id carries over from the previous cell.
                assert_eq!(update.cells[1].hl_id, 7);
                assert_eq!(update.cells[2].hl_id, 0);
                assert_eq!(update.cells[2].repeat, 5);
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[test]
    fn unknown_events_are_skipped() {
        let mut buf = Vec::new();
        write_array_len(&mut buf, 2);
        // An event this client has never heard of, with a complex payload.
        write_array_len(&mut buf, 2);
        write_str(&mut buf, "grid_line_v2");
        write_array_len(&mut buf, 2);
        write_map_len(&mut buf, 1);
        write_str(&mut buf, "key");
        write_uint(&mut buf, 1);
        write_bool(&mut buf, true);
        // Followed by a regular event that must still decode.
        write_array_len(&mut buf, 2);
        write_str(&mut buf, "grid_clear");
        write_array_len(&mut buf, 1);
        write_uint(&mut buf, 4);

        let events = decode_all(&buf);
        assert_eq!(events, vec![RedrawEvent::GridClear(4)]);
    }

    #[test]
    fn win_viewport_decodes_both_arities() {
        let mut buf = Vec::new();
        write_array_len(&mut buf, 2);

        // Old 6-parameter form: no scroll delta.
        write_array_len(&mut buf, 2);
        write_str(&mut buf, "win_viewport");
        write_array_len(&mut buf, 6);
        write_uint(&mut buf, 2);
        write_uint(&mut buf, 1000); // win handle (plain int accepted)
        write_uint(&mut buf, 10);
        write_uint(&mut buf, 34);
        write_uint(&mut buf, 12);
        write_uint(&mut buf, 0);

        // Newer 8-parameter form.
        write_array_len(&mut buf, 2);
        write_str(&mut buf, "win_viewport");
        write_array_len(&mut buf, 8);
        write_uint(&mut buf, 2);
        write_uint(&mut buf, 1000);
        write_uint(&mut buf, 11);
        write_uint(&mut buf, 35);
        write_uint(&mut buf, 12);
        write_uint(&mut buf, 0);
        write_uint(&mut buf, 120);
        write_sint(&mut buf, -3);

        let events = decode_all(&buf);
        match (&events[0], &events[1]) {
            (
                RedrawEvent::WinViewport {
                    scroll_delta: None, ..
                },
                RedrawEvent::WinViewport {
                    scroll_delta: Some(delta),
                    line_count: Some(count),
                    ..
                },
            ) => {
                assert_eq!(*delta, -3);
                assert_eq!(*count, 120);
            }
            other => panic!("unexpected events {:?}", other),
        }
    }

    #[test]
    fn float_pos_parses_anchor_and_zindex() {
        let mut buf = Vec::new();
        write_array_len(&mut buf, 1);
        write_array_len(&mut buf, 2);
        write_str(&mut buf, "win_float_pos");
        write_array_len(&mut buf, 8);
        write_uint(&mut buf, 5);
        write_uint(&mut buf, 1002);
        write_str(&mut buf, "SE");
        write_uint(&mut buf, 1);
        write_uint(&mut buf, 10);
        write_uint(&mut buf, 20);
        write_bool(&mut buf, true);
        write_uint(&mut buf, 50);

        let events = decode_all(&buf);
        match &events[0] {
            RedrawEvent::WinFloatPos(float) => {
                assert_eq!(float.grid, 5);
                assert_eq!(float.anchor, AnchorKind::SouthEast);
                assert_eq!(float.anchor_grid, 1);
                assert_eq!(float.anchor_row, 10.0);
                assert_eq!(float.anchor_col, 20.0);
                assert_eq!(float.zindex, 50);
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[test]
    fn hl_attr_define_collects_flags() {
        let mut buf = Vec::new();
        write_array_len(&mut buf, 1);
        write_array_len(&mut buf, 2);
        write_str(&mut buf, "hl_attr_define");
        write_array_len(&mut buf, 4);
        write_uint(&mut buf, 9);
        write_map_len(&mut buf, 4);
        write_str(&mut buf, "foreground");
        write_uint(&mut buf, 0x00FF_0000);
        write_str(&mut buf, "bold");
        write_bool(&mut buf, true);
        write_str(&mut buf, "undercurl");
        write_bool(&mut buf, true);
        write_str(&mut buf, "blend");
        write_uint(&mut buf, 30);
        write_map_len(&mut buf, 0); // cterm attrs, ignored
        write_array_len(&mut buf, 0); // info, ignored

        let events = decode_all(&buf);
        match &events[0] {
            RedrawEvent::HlAttrDefine { id, attr } => {
                assert_eq!(*id, 9);
                assert!(attr.bold());
                assert!(attr.undercurl());
                assert!(!attr.italic());
                assert_eq!(attr.blend, 30);
                assert_eq!(attr.foreground, Some(Color::from_rgb(0xFF, 0, 0)));
                assert_eq!(attr.background, None);
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[test]
    fn batched_events_decode_in_order() {
        let mut buf = Vec::new();
        write_array_len(&mut buf, 2);

        // One batch carrying two resizes.
        write_array_len(&mut buf, 3);
        write_str(&mut buf, "grid_resize");
        write_array_len(&mut buf, 3);
        write_uint(&mut buf, 1);
        write_uint(&mut buf, 80);
        write_uint(&mut buf, 24);
        write_array_len(&mut buf, 3);
        write_uint(&mut buf, 2);
        write_uint(&mut buf, 80);
        write_uint(&mut buf, 22);

        write_array_len(&mut buf, 2);
        write_str(&mut buf, "flush");
        write_array_len(&mut buf, 0);

        let events = decode_all(&buf);
        assert_eq!(events.len(), 3);
        assert!(matches!(
            events[0],
            RedrawEvent::GridResize { grid: 1, .. }
        ));
        assert!(matches!(
            events[1],
            RedrawEvent::GridResize {
                grid: 2,
                height: 22,
                ..
            }
        ));
        assert_eq!(events[2], RedrawEvent::Flush);
    }

    #[test]
    fn msg_set_pos_zindex_is_optional() {
        let mut buf = Vec::new();
        write_array_len(&mut buf, 1);
        write_array_len(&mut buf, 2);
        write_str(&mut buf, "msg_set_pos");
        write_array_len(&mut buf, 4);
        write_uint(&mut buf, 3);
        write_uint(&mut buf, 22);
        write_bool(&mut buf, false);
        write_str(&mut buf, "─");

        let events = decode_all(&buf);
        assert_eq!(
            events[0],
            RedrawEvent::MsgSetPos {
                grid: 3,
                row: 22,
                scrolled: false,
                sep_char: "─".to_owned(),
                zindex: None,
            }
        );
    }
}
