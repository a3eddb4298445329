//! The channel between the I/O thread and the render thread.

use super::events::RedrawEvent;
use cache_padded::CachePadded;
use std::sync::Mutex;

/// Double-buffered event queue.
///
/// The producer appends under the lock; the consumer hands in its own
/// (drained) buffer and receives the full one by swap, so the critical
/// section is constant-time regardless of backlog.
pub struct EventQueue {
    events: CachePadded<Mutex<Vec<RedrawEvent>>>,
}

impl Default for EventQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl EventQueue {
    pub fn new() -> Self {
        Self {
            events: CachePadded::new(Mutex::new(Vec::new())),
        }
    }

    pub fn push(&self, event: RedrawEvent) {
        let mut events = self.events.lock().unwrap_or_else(|e| e.into_inner());
        events.push(event);
    }

    /// Swaps the internal buffer with `out`. The caller should pass an
    /// empty buffer and will own every queued event afterwards.
    pub fn pop_all(&self, out: &mut Vec<RedrawEvent>) {
        let mut events = self.events.lock().unwrap_or_else(|e| e.into_inner());
        std::mem::swap(&mut *events, out);
    }

    pub fn is_empty(&self) -> bool {
        self.events
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pop_all_swaps_buffers() {
        let queue = EventQueue::new();
        queue.push(RedrawEvent::Flush);
        queue.push(RedrawEvent::GridClear(1));

        let mut out = Vec::new();
        queue.pop_all(&mut out);

        assert_eq!(out, vec![RedrawEvent::Flush, RedrawEvent::GridClear(1)]);
        assert!(queue.is_empty());
    }

    #[test]
    fn fifo_order_is_preserved_across_threads() {
        use std::sync::Arc;

        let queue = Arc::new(EventQueue::new());
        let producer = {
            let queue = queue.clone();
            std::thread::spawn(move || {
                for grid in 0..100 {
                    queue.push(RedrawEvent::GridClear(grid));
                }
            })
        };

        producer.join().unwrap();

        let mut out = Vec::new();
        queue.pop_all(&mut out);
        let grids: Vec<u64> = out
            .iter()
            .map(|e| match e {
                RedrawEvent::GridClear(grid) => *grid,
                other => panic!("unexpected event {:?}", other),
            })
            .collect();
        assert_eq!(grids, (0..100).collect::<Vec<_>>());
    }
}
