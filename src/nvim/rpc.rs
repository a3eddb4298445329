//! The I/O thread: exclusive owner of the transport read side.
//!
//! The loop never parks. Each turn drains queued outbound frames, reads
//! whatever bytes are available and decodes every complete message in
//! the buffer. A truncated message stays buffered until the next read;
//! a malformed one drops the buffer and the stream realigns at the next
//! complete message.
//!
//! Keystroke latency rides on this design: a `flush` event triggers the
//! render wakeup immediately after it is enqueued, before the loop
//! resumes reading.

use super::events::{self, RedrawEvent};
use super::msg::{self, Payload};
use super::queue::EventQueue;
use super::transport::{TransportReader, TransportWriter};
use cache_padded::CachePadded;
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::time::{Duration, Instant};

const READ_CHUNK_SIZE: usize = 16 * 1024;
const RAW_IO_BUF_INITIAL_CAPACITY: usize = 16 * 1024;

/// Render-thread wakeup invoked from the I/O thread right after a
/// `flush` event lands in the queue.
pub trait RedrawWakeup: Send + 'static {
    fn notify(&self);
}

impl<F: Fn() + Send + 'static> RedrawWakeup for F {
    fn notify(&self) {
        self()
    }
}

/// State shared between the session handle and the I/O thread.
pub(super) struct IoShared {
    pub(super) queue: EventQueue,
    pub(super) outbound: Mutex<Vec<Vec<u8>>>,
    pub(super) pending: PendingResponse,
    pub(super) stop: CachePadded<AtomicBool>,
}

impl IoShared {
    pub(super) fn new() -> Self {
        Self {
            queue: EventQueue::new(),
            outbound: Mutex::new(Vec::new()),
            pending: PendingResponse::default(),
            stop: CachePadded::new(AtomicBool::new(false)),
        }
    }
}

/// Response slot for the one synchronous call (the attach handshake).
#[derive(Default)]
pub(super) struct PendingResponse {
    slot: Mutex<PendingSlot>,
    cond: Condvar,
}

#[derive(Default)]
struct PendingSlot {
    waiting: Option<u32>,
    outcome: Option<Result<Payload, Payload>>,
}

impl PendingResponse {
    pub(super) fn register(&self, msgid: u32) {
        let mut slot = lock(&self.slot);
        slot.waiting = Some(msgid);
        slot.outcome = None;
    }

    fn deliver(&self, msgid: u32, outcome: Result<Payload, Payload>) {
        let mut slot = lock(&self.slot);
        if slot.waiting == Some(msgid) {
            slot.waiting = None;
            slot.outcome = Some(outcome);
            self.cond.notify_all();
        } else {
            log::warn!("dropping response for unexpected msgid {}", msgid);
        }
    }

    /// Blocks until the registered response arrives or the deadline
    /// passes.
    pub(super) fn wait(&self, deadline: Duration) -> Option<Result<Payload, Payload>> {
        let start = Instant::now();
        let mut slot = lock(&self.slot);

        while slot.outcome.is_none() {
            let elapsed = start.elapsed();
            if elapsed >= deadline {
                slot.waiting = None;
                return None;
            }

            let (next, timeout) = self
                .cond
                .wait_timeout(slot, deadline - elapsed)
                .unwrap_or_else(|e| e.into_inner());
            slot = next;
            if timeout.timed_out() && slot.outcome.is_none() {
                slot.waiting = None;
                return None;
            }
        }

        slot.outcome.take()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

/// Body of the I/O thread.
pub(super) fn run(
    mut reader: TransportReader,
    writer: Arc<Mutex<TransportWriter>>,
    shared: Arc<IoShared>,
    wakeup: Box<dyn RedrawWakeup>,
) {
    let mut read_buf: Vec<u8> = Vec::with_capacity(RAW_IO_BUF_INITIAL_CAPACITY);
    let mut chunk = [0u8; READ_CHUNK_SIZE];
    let mut pending_writes: Vec<Vec<u8>> = Vec::new();
    let mut decoded: Vec<RedrawEvent> = Vec::new();

    while !shared.stop.load(Ordering::Acquire) {
        {
            let mut outbound = lock(&shared.outbound);
            if !outbound.is_empty() {
                pending_writes.append(&mut outbound);
            }
        }
        if !pending_writes.is_empty() {
            let mut writer = lock(&writer);
            for frame in pending_writes.drain(..) {
                if let Err(error) = writer.write_frame(&frame) {
                    log::error!("transport write failed: {}", error);
                    announce_exit(&shared, &*wakeup);
                    return;
                }
            }
        }

        match reader.read_available(&mut chunk) {
            Ok(0) => {
                log::info!("backend closed the transport");
                announce_exit(&shared, &*wakeup);
                return;
            }
            Ok(n) => {
                log::trace!("read {} bytes from transport", n);
                read_buf.extend_from_slice(&chunk[..n]);
            }
            Err(ref error) if error.kind() == io::ErrorKind::WouldBlock => {
                std::hint::spin_loop();
                continue;
            }
            Err(ref error) if error.kind() == io::ErrorKind::Interrupted => continue,
            Err(error) => {
                log::error!("transport read failed: {}", error);
                announce_exit(&shared, &*wakeup);
                return;
            }
        }

        drain_messages(&mut read_buf, &shared, &*wakeup, &mut decoded);
    }

    log::debug!("I/O thread stopping");
}

fn announce_exit(shared: &IoShared, wakeup: &dyn RedrawWakeup) {
    shared.queue.push(RedrawEvent::Exited);
    wakeup.notify();
}

/// Decodes every complete message buffered so far and removes the
/// consumed prefix.
fn drain_messages(
    buf: &mut Vec<u8>,
    shared: &IoShared,
    wakeup: &dyn RedrawWakeup,
    scratch: &mut Vec<RedrawEvent>,
) {
    let mut consumed = 0;

    loop {
        let mut slice = &buf[consumed..];
        if slice.is_empty() {
            break;
        }

        scratch.clear();
        match decode_message(&mut slice, shared, scratch) {
            Ok(()) => {
                consumed = buf.len() - slice.len();
                for event in scratch.drain(..) {
                    let is_flush = matches!(event, RedrawEvent::Flush);
                    shared.queue.push(event);
                    if is_flush {
                        wakeup.notify();
                    }
                }
            }
            Err(ref error) if error.kind() == io::ErrorKind::UnexpectedEof => break,
            Err(error) => {
                log::error!(
                    "dropping {} unparsed bytes after decode error: {}",
                    buf.len() - consumed,
                    error
                );
                consumed = buf.len();
                break;
            }
        }
    }

    if consumed > 0 {
        buf.drain(..consumed);
    }
}

/// Decodes one RPC envelope. Redraw notifications stream straight into
/// typed events; everything else is either a response (delivered to the
/// handshake waiter) or unsupported.
fn decode_message(
    raw: &mut &[u8],
    shared: &IoShared,
    events: &mut Vec<RedrawEvent>,
) -> io::Result<()> {
    msg::read_array_len(raw)?;

    match msg::read_u64(raw)? {
        0 => {
            let msgid = msg::read_u64(raw)?;
            let method = msg::read_string(raw)?;
            log::error!(
                "backend sent unsupported request '{}' (msgid {})",
                method,
                msgid
            );
            msg::skip_value(raw)?;
        }
        1 => {
            let msgid = msg::read_u64(raw)? as u32;
            let error = Payload::decode(raw)?;
            let result = Payload::decode(raw)?;

            let outcome = if error.is_nil() {
                Ok(result)
            } else {
                Err(error)
            };
            shared.pending.deliver(msgid, outcome);
        }
        2 => {
            let method = msg::read_string(raw)?;
            if method == "redraw" {
                events::decode_redraw(raw, events)?;
            } else {
                log::warn!("ignoring notification '{}'", method);
                msg::skip_value(raw)?;
            }
        }
        _ => return msg::err_invalid_input(),
    }

    Ok(())
}
