//! Shared queue of MIDI events between the input pipeline and GETMIDIDATA.

use std::collections::VecDeque;
use std::sync::Mutex;

/// Default queue depth. At 4 bytes per event this bounds the buffer to a
/// small fixed size.
const DEFAULT_CAPACITY: usize = 128;

/// Bounded FIFO of 4-byte MIDI event packets.
///
/// The USB/BLE input side pushes; the GETMIDIDATA command drains in whole
/// events. When full, the oldest event is dropped.
#[derive(Debug)]
pub struct MidiQueue {
    events: Mutex<VecDeque<[u8; 4]>>,
    capacity: usize,
}

impl Default for MidiQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl MidiQueue {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            events: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
        }
    }

    /// Queue one event, dropping the oldest when full.
    pub fn push(&self, event: [u8; 4]) {
        let mut events = self.events.lock().unwrap();
        if events.len() >= self.capacity {
            events.pop_front();
        }
        events.push_back(event);
    }

    /// Dequeue the oldest event.
    pub fn pop(&self) -> Option<[u8; 4]> {
        self.events.lock().unwrap().pop_front()
    }

    /// Number of queued events.
    pub fn len(&self) -> usize {
        self.events.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fifo_order() {
        let q = MidiQueue::new();
        q.push([1, 0, 0, 0]);
        q.push([2, 0, 0, 0]);
        assert_eq!(q.pop(), Some([1, 0, 0, 0]));
        assert_eq!(q.pop(), Some([2, 0, 0, 0]));
        assert_eq!(q.pop(), None);
    }

    #[test]
    fn overflow_drops_oldest() {
        let q = MidiQueue::with_capacity(2);
        q.push([1, 0, 0, 0]);
        q.push([2, 0, 0, 0]);
        q.push([3, 0, 0, 0]);
        assert_eq!(q.len(), 2);
        assert_eq!(q.pop(), Some([2, 0, 0, 0]));
    }
}
