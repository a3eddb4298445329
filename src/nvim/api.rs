//! Outbound UI calls.

use super::msg;
use super::{Neovim, SessionError};

bitflags::bitflags! {
    pub struct UiOptions: u16 {
        const RGB            = 0b0000_0000_0000_0001;
        const OVERRIDE       = 0b0000_0000_0000_0010;
        const EXT_CMDLINE    = 0b0000_0000_0000_0100;
        const EXT_HLSTATE    = 0b0000_0000_0000_1000;
        const EXT_LINEGRID   = 0b0000_0000_0001_0000;
        const EXT_MESSAGES   = 0b0000_0000_0010_0000;
        const EXT_MULTIGRID  = 0b0000_0000_0100_0000;
        const EXT_POPUPMENU  = 0b0000_0000_1000_0000;
        const EXT_TABLINE    = 0b0000_0001_0000_0000;
        const EXT_TERMCOLORS = 0b0000_0010_0000_0000;
    }
}

impl Default for UiOptions {
    /// The options a multigrid smooth-scrolling client needs.
    fn default() -> Self {
        UiOptions::RGB | UiOptions::EXT_LINEGRID | UiOptions::EXT_MULTIGRID
    }
}

const UI_OPTION_TO_KEY_MAP: &[(&str, UiOptions)] = &[
    ("rgb", UiOptions::RGB),
    ("override", UiOptions::OVERRIDE),
    ("ext_cmdline", UiOptions::EXT_CMDLINE),
    ("ext_hlstate", UiOptions::EXT_HLSTATE),
    ("ext_linegrid", UiOptions::EXT_LINEGRID),
    ("ext_messages", UiOptions::EXT_MESSAGES),
    ("ext_multigrid", UiOptions::EXT_MULTIGRID),
    ("ext_popupmenu", UiOptions::EXT_POPUPMENU),
    ("ext_tabline", UiOptions::EXT_TABLINE),
    ("ext_termcolors", UiOptions::EXT_TERMCOLORS),
];

/// Appends arguments to an RPC frame under construction.
pub(super) struct MethodCall<'p> {
    pub(super) buf: &'p mut Vec<u8>,
    pub(super) method: &'static str,
}

impl MethodCall<'_> {
    pub(super) fn add_str_arg(&mut self, arg: &str) {
        msg::write_str(self.buf, arg);
    }

    pub(super) fn add_u64_arg(&mut self, arg: u64) {
        msg::write_uint(self.buf, arg);
    }

    pub(super) fn start_map_arg(&mut self, n_pairs: u32) {
        msg::write_map_len(self.buf, n_pairs);
    }

    pub(super) fn add_bool_pair(&mut self, key: &str, arg: bool) {
        msg::write_str(self.buf, key);
        msg::write_bool(self.buf, arg);
    }

    /// Takes the finished frame out of the scratch buffer.
    pub(super) fn finish(self) -> Vec<u8> {
        log::debug!(
            "encoded RPC method '{}', total payload length: {}",
            self.method,
            self.buf.len()
        );
        self.buf.split_off(0)
    }
}

// UI RPC methods.
impl Neovim {
    /// Activates UI events on the channel.
    ///
    /// Entry point of all UI clients; allows an embedded backend to
    /// continue startup. This is the sole synchronous call: it blocks
    /// until the backend answers (or the configured deadline passes) so
    /// that redraw events cannot precede a ready client.
    ///
    /// ### Parameters:
    ///
    /// - `width`: Requested screen columns
    /// - `height`: Requested screen rows
    /// - `options`: `UiOptions` to use for this client.
    pub fn attach(&mut self, width: u64, height: u64, options: UiOptions) -> Result<(), SessionError> {
        if self.is_attached() {
            return Err(SessionError::AlreadyAttached);
        }

        log::debug!(
            "nvim_ui_attach width={}, height={}, options={:?}",
            width,
            height,
            options
        );

        let (msgid, mut rpc) = self.request("nvim_ui_attach", 3);

        rpc.add_u64_arg(width);
        rpc.add_u64_arg(height);

        rpc.start_map_arg(UI_OPTION_TO_KEY_MAP.len() as u32);
        for (key, option) in UI_OPTION_TO_KEY_MAP {
            rpc.add_bool_pair(key, options.contains(*option));
        }

        let frame = rpc.finish();
        self.perform_handshake(msgid, frame)
    }

    /// Asks the backend to resize the global screen. The actual size
    /// comes back as a `grid_resize` event.
    pub fn try_resize(&mut self, width: u64, height: u64) -> Result<(), SessionError> {
        self.ensure_attached()?;

        let mut rpc = self.notification("nvim_ui_try_resize", 2);
        rpc.add_u64_arg(width);
        rpc.add_u64_arg(height);

        let frame = rpc.finish();
        self.queue_frame(frame);
        Ok(())
    }

    /// Asks the backend to resize a single grid. Triggers a
    /// `grid_resize` with the granted size.
    pub fn try_resize_grid(
        &mut self,
        grid: u64,
        width: u64,
        height: u64,
    ) -> Result<(), SessionError> {
        self.ensure_attached()?;

        let mut rpc = self.notification("nvim_ui_try_resize_grid", 3);
        rpc.add_u64_arg(grid);
        rpc.add_u64_arg(width);
        rpc.add_u64_arg(height);

        let frame = rpc.finish();
        self.queue_frame(frame);
        Ok(())
    }

    /// Sends raw keys. This is the latency-critical path: the frame is
    /// written to the transport directly instead of waiting for the I/O
    /// loop to drain the queue.
    pub fn input(&mut self, keys: &str) -> Result<(), SessionError> {
        self.ensure_attached()?;

        let mut rpc = self.notification("nvim_input", 1);
        rpc.add_str_arg(keys);

        let frame = rpc.finish();
        self.write_direct(&frame)
    }

    /// Sends a mouse event in grid coordinates.
    pub fn input_mouse(
        &mut self,
        button: &str,
        action: &str,
        modifier: &str,
        grid: u64,
        row: u64,
        col: u64,
    ) -> Result<(), SessionError> {
        self.ensure_attached()?;

        let mut rpc = self.notification("nvim_input_mouse", 6);
        rpc.add_str_arg(button);
        rpc.add_str_arg(action);
        rpc.add_str_arg(modifier);
        rpc.add_u64_arg(grid);
        rpc.add_u64_arg(row);
        rpc.add_u64_arg(col);

        let frame = rpc.finish();
        self.write_direct(&frame)
    }

    /// Runs an ex command, fire-and-forget.
    pub fn command(&mut self, command: &str) -> Result<(), SessionError> {
        self.ensure_attached()?;

        let mut rpc = self.notification("nvim_command", 1);
        rpc.add_str_arg(command);

        let frame = rpc.finish();
        self.queue_frame(frame);
        Ok(())
    }
}
