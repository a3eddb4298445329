//! RPC stack for the editor backend: wire codec, typed redraw events,
//! the non-blocking duplex, the I/O thread and the session handle.

#[doc(inline)]
pub use self::api::UiOptions;
#[doc(inline)]
pub use self::events::*;
#[doc(inline)]
pub use self::queue::EventQueue;
#[doc(inline)]
pub use self::rpc::RedrawWakeup;
#[doc(inline)]
pub use self::transport::Transport;

use self::api::MethodCall;
use self::rpc::IoShared;
use self::transport::TransportWriter;
use std::io;
use std::path::Path;
use std::process::Child;
use std::sync::atomic::Ordering;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;
use thiserror::Error;

mod api;
pub mod events;
pub mod msg;
pub mod queue;
mod rpc;
pub mod transport;

/// Errors surfaced by the session API.
///
/// Per-event decode problems never show up here; the I/O thread logs
/// and keeps going. These are the failures the embedder must react to.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("transport failure: {0}")]
    Transport(#[from] io::Error),
    #[error("backend rejected {method}: {error}")]
    Rpc {
        method: &'static str,
        error: String,
    },
    #[error("attach handshake timed out after {0:?}")]
    AttachTimeout(Duration),
    #[error("UI is already attached")]
    AlreadyAttached,
    #[error("UI is not attached yet")]
    NotAttached,
}

/// A backend session.
///
/// Owns the write half of the transport and the I/O thread driving the
/// read half. Redraw events accumulate in the internal queue until the
/// render thread drains them; the wakeup passed at connect time fires
/// from the I/O thread whenever a `flush` is enqueued.
pub struct Neovim {
    writer: Arc<Mutex<TransportWriter>>,
    shared: Arc<IoShared>,
    io_thread: Option<thread::JoinHandle<()>>,
    child: Option<Child>,
    rpc_buf: Vec<u8>,
    msg_id_counter: u32,
    attached: bool,
    attach_deadline: Duration,
}

impl Neovim {
    /// Connects to a backend listening on a Unix socket.
    pub fn connect_socket<W: RedrawWakeup>(path: &Path, wakeup: W) -> Result<Self, SessionError> {
        Ok(Self::start(Transport::connect_socket(path)?, wakeup))
    }

    /// Spawns an embedded backend process and connects over its stdio.
    pub fn spawn_embedded<W: RedrawWakeup>(
        program: &str,
        wakeup: W,
    ) -> Result<Self, SessionError> {
        Ok(Self::start(Transport::spawn_embedded(program)?, wakeup))
    }

    fn start<W: RedrawWakeup>(transport: Transport, wakeup: W) -> Self {
        let Transport {
            reader,
            writer,
            child,
        } = transport;

        let writer = Arc::new(Mutex::new(writer));
        let shared = Arc::new(IoShared::new());

        let io_thread = {
            let writer = writer.clone();
            let shared = shared.clone();
            thread::Builder::new()
                .name("smoovim-io".to_owned())
                .spawn(move || rpc::run(reader, writer, shared, Box::new(wakeup)))
                .expect("failed to spawn the I/O thread")
        };

        Self {
            writer,
            shared,
            io_thread: Some(io_thread),
            child,
            rpc_buf: Vec::new(),
            msg_id_counter: 0,
            attached: false,
            attach_deadline: Duration::from_secs(5),
        }
    }

    /// Overrides the handshake deadline before calling `attach`.
    pub fn set_attach_deadline(&mut self, deadline: Duration) {
        self.attach_deadline = deadline;
    }

    pub fn is_attached(&self) -> bool {
        self.attached
    }

    /// Moves every queued redraw event into `out` (which should be
    /// empty) with a single buffer swap.
    pub fn drain_events(&self, out: &mut Vec<RedrawEvent>) {
        self.shared.queue.pop_all(out);
    }

    fn next_msgid(&mut self) -> u32 {
        let id = self.msg_id_counter;
        self.msg_id_counter = self.msg_id_counter.wrapping_add(1);
        if self.msg_id_counter == u32::max_value() {
            self.msg_id_counter = 0;
        }
        id
    }

    fn notification(&mut self, method: &'static str, n_args: u32) -> MethodCall<'_> {
        self.rpc_buf.clear();
        msg::write_array_len(&mut self.rpc_buf, 3);
        msg::write_uint(&mut self.rpc_buf, 2);
        msg::write_str(&mut self.rpc_buf, method);
        msg::write_array_len(&mut self.rpc_buf, n_args);

        MethodCall {
            buf: &mut self.rpc_buf,
            method,
        }
    }

    fn request(&mut self, method: &'static str, n_args: u32) -> (u32, MethodCall<'_>) {
        let msgid = self.next_msgid();

        self.rpc_buf.clear();
        msg::write_array_len(&mut self.rpc_buf, 4);
        msg::write_uint(&mut self.rpc_buf, 0);
        msg::write_uint(&mut self.rpc_buf, msgid as u64);
        msg::write_str(&mut self.rpc_buf, method);
        msg::write_array_len(&mut self.rpc_buf, n_args);

        let call = MethodCall {
            buf: &mut self.rpc_buf,
            method,
        };
        (msgid, call)
    }

    fn ensure_attached(&self) -> Result<(), SessionError> {
        if self.attached {
            Ok(())
        } else {
            Err(SessionError::NotAttached)
        }
    }

    /// Hands a frame to the I/O thread for delivery.
    fn queue_frame(&self, frame: Vec<u8>) {
        let mut outbound = self
            .shared
            .outbound
            .lock()
            .unwrap_or_else(|e| e.into_inner());
        outbound.push(frame);
    }

    /// Writes a frame to the transport immediately, bypassing the queue.
    fn write_direct(&self, frame: &[u8]) -> Result<(), SessionError> {
        let mut writer = self.writer.lock().unwrap_or_else(|e| e.into_inner());
        writer.write_frame(frame)?;
        Ok(())
    }

    /// Sends the attach request and blocks for the matching response,
    /// which the I/O thread delivers through the pending-response slot.
    fn perform_handshake(&mut self, msgid: u32, frame: Vec<u8>) -> Result<(), SessionError> {
        self.shared.pending.register(msgid);
        self.write_direct(&frame)?;

        match self.shared.pending.wait(self.attach_deadline) {
            Some(Ok(_)) => {
                self.attached = true;
                Ok(())
            }
            Some(Err(error)) => Err(SessionError::Rpc {
                method: "nvim_ui_attach",
                error: error.to_string(),
            }),
            None => Err(SessionError::AttachTimeout(self.attach_deadline)),
        }
    }

    /// Stops the I/O thread and tears the transport down. Pending
    /// outbound frames are discarded; the embedded child, if any, is
    /// killed and reaped.
    pub fn stop(&mut self) {
        self.shared.stop.store(true, Ordering::Release);

        if let Some(io_thread) = self.io_thread.take() {
            if io_thread.join().is_err() {
                log::error!("I/O thread panicked during shutdown");
            }
        }

        {
            let mut outbound = self
                .shared
                .outbound
                .lock()
                .unwrap_or_else(|e| e.into_inner());
            outbound.clear();
        }

        if let Some(mut child) = self.child.take() {
            if let Err(error) = child.kill() {
                log::debug!("backend process already gone: {}", error);
            }
            match child.wait() {
                Ok(status) => log::info!("backend process exited with status {}", status),
                Err(error) => log::error!("failed to reap backend process: {}", error),
            }
        }

        self.attached = false;
    }
}

impl Drop for Neovim {
    fn drop(&mut self) {
        self.stop();
    }
}
