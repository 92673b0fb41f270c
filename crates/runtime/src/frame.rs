use std::sync::Arc;

use parking_lot::Mutex;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct FrameRequestId(pub u64);

/// Platform animation scheduler (`requestAnimationFrame` in the browser).
pub trait FrameScheduler {
    fn request_frame(&self) -> FrameRequestId;
    fn cancel_frame(&self, id: FrameRequestId);
}

#[derive(Debug, Default)]
struct FrameQueueState {
    next_id: u64,
    pending: Vec<FrameRequestId>,
}

/// In-process frame scheduler for native drivers and tests.
///
/// Requests accumulate until the driver calls [`FrameQueue::take_due`] at the
/// start of each frame. Clones share the same queue.
#[derive(Debug, Clone, Default)]
pub struct FrameQueue {
    inner: Arc<Mutex<FrameQueueState>>,
}

impl FrameQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pending(&self) -> usize {
        self.inner.lock().pending.len()
    }

    /// Removes and returns every request scheduled for the coming frame.
    pub fn take_due(&self) -> Vec<FrameRequestId> {
        std::mem::take(&mut self.inner.lock().pending)
    }
}

impl FrameScheduler for FrameQueue {
    fn request_frame(&self) -> FrameRequestId {
        let mut state = self.inner.lock();
        let id = FrameRequestId(state.next_id);
        state.next_id = state.next_id.wrapping_add(1);
        state.pending.push(id);
        id
    }

    fn cancel_frame(&self, id: FrameRequestId) {
        self.inner.lock().pending.retain(|p| *p != id);
    }
}

#[cfg(test)]
mod tests {
    use super::{FrameQueue, FrameScheduler};

    #[test]
    fn queue_cancel_removes_request() {
        let queue = FrameQueue::new();
        let a = queue.request_frame();
        let b = queue.request_frame();
        assert_ne!(a, b);
        queue.cancel_frame(a);
        assert_eq!(queue.pending(), 1);
        assert_eq!(queue.take_due(), vec![b]);
        assert_eq!(queue.pending(), 0);
    }

    #[test]
    fn clones_share_state() {
        let queue = FrameQueue::new();
        let handle = queue.clone();
        queue.request_frame();
        assert_eq!(handle.pending(), 1);
    }
}
