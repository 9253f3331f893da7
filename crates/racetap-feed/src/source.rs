use std::collections::VecDeque;
use std::sync::Arc;

use racetap_core::Output;

/// A per-player stream of console outputs.
///
/// `latest` is a lossy single slot for consumers that only care about the
/// current state (views); `next` is a lossless bounded queue for the one
/// consumer that must see every frame (the orchestrator). Both are
/// non-blocking.
pub trait OutputSource: Send {
    fn latest(&mut self) -> Option<Arc<Output>>;
    fn next(&mut self) -> Option<Arc<Output>>;
}

/// The latest-slot plus next-queue pair every producer publishes into.
#[derive(Debug)]
pub struct OutputSlots {
    latest: Option<Arc<Output>>,
    next: VecDeque<Arc<Output>>,
    max_queued: usize,
}

impl OutputSlots {
    pub fn new(max_queued: usize) -> Self {
        Self {
            latest: None,
            next: VecDeque::new(),
            max_queued,
        }
    }

    pub fn publish(&mut self, output: Arc<Output>) {
        self.latest = Some(Arc::clone(&output));
        self.next.push_back(output);
        while self.next.len() > self.max_queued {
            self.next.pop_front();
        }
    }

    pub fn latest(&self) -> Option<Arc<Output>> {
        self.latest.clone()
    }

    pub fn pop_next(&mut self) -> Option<Arc<Output>> {
        self.next.pop_front()
    }

    pub fn queued(&self) -> usize {
        self.next.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn queue_evicts_from_the_front() {
        let mut slots = OutputSlots::new(2);
        for elapsed in 0..4 {
            slots.publish(Arc::new(Output {
                elapsed,
                ..Output::default()
            }));
        }
        assert_eq!(slots.latest().map(|o| o.elapsed), Some(3));
        assert_eq!(slots.pop_next().map(|o| o.elapsed), Some(2));
        assert_eq!(slots.pop_next().map(|o| o.elapsed), Some(3));
        assert_eq!(slots.pop_next(), None);
        // Latest survives queue drain.
        assert!(slots.latest().is_some());
    }
}
