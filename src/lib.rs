//! UI-state engine for a smooth-scrolling Neovim GUI.
//!
//! The crate connects to a Neovim backend over its binary RPC, applies
//! the multigrid redraw stream to a structured window model and exposes
//! each completed transaction as an immutable frame snapshot. Rendering
//! itself is out of scope: an embedder drains events on its render
//! thread, advances the scroll springs and draws from the snapshot.
//!
//! Three layers:
//!
//! * [`nvim`]: transport, wire codec, typed redraw events and the
//!   dedicated I/O thread feeding the event queue.
//! * [`grid`]: per-window cell state, both the live ring mutated by grid
//!   events and the scrollback ring driving smooth-scroll animation.
//! * [`editor`]: ownership of all windows and session state, the event
//!   interpreter and the frame adapter.

pub mod color;
pub mod cursor;
pub mod editor;
pub mod grid;
pub mod nvim;
pub mod settings;
pub mod spring;

pub use self::editor::Editor;
pub use self::nvim::{Neovim, RedrawWakeup, SessionError, UiOptions};
pub use self::settings::Settings;
