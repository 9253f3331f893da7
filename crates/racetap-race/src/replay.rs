//! Per-player replay decks and clip extraction.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use racetap_core::Output;

use crate::player::PlayerId;

pub const DEFAULT_REPLAY_CAPACITY: usize = 1024;

/// Bounded history of a player's recent outputs, oldest evicted first.
#[derive(Debug)]
pub struct ReplayBuffer {
    deck: VecDeque<Arc<Output>>,
    capacity: usize,
}

impl ReplayBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            deck: VecDeque::new(),
            capacity,
        }
    }

    pub fn push(&mut self, output: Arc<Output>) {
        self.deck.push_back(output);
        while self.deck.len() > self.capacity {
            self.deck.pop_front();
        }
    }

    pub fn len(&self) -> usize {
        self.deck.len()
    }

    pub fn is_empty(&self) -> bool {
        self.deck.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Arc<Output>> {
        self.deck.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<Output>> {
        self.deck.iter()
    }

    /// Copy `[from..to)` out of the deck. Indices that ran off the front
    /// through eviction clamp to the oldest retained frame.
    pub fn slice(&self, from: usize, to: usize) -> Vec<Arc<Output>> {
        let to = to.min(self.deck.len());
        let from = from.min(to);
        self.deck.range(from..to).cloned().collect()
    }
}

/// A frozen clip ready for playback.
#[derive(Debug, Clone)]
pub struct ReplayClip {
    pub name: String,
    pub outputs: Vec<Arc<Output>>,
}

impl ReplayClip {
    pub fn len(&self) -> usize {
        self.outputs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outputs.is_empty()
    }
}

/// All players' decks plus clip freezing.
#[derive(Debug)]
pub struct ReplayCenter {
    buffers: HashMap<PlayerId, ReplayBuffer>,
    capacity: usize,
}

impl ReplayCenter {
    pub fn new(capacity: usize) -> Self {
        Self {
            buffers: HashMap::new(),
            capacity,
        }
    }

    pub fn note_output(&mut self, player: PlayerId, output: Arc<Output>) {
        self.buffers
            .entry(player)
            .or_insert_with(|| ReplayBuffer::new(self.capacity))
            .push(output);
    }

    pub fn buffer(&self, player: PlayerId) -> Option<&ReplayBuffer> {
        self.buffers.get(&player)
    }

    /// Freeze a named clip of a player's deck, optionally thinned to
    /// every other frame for half-speed playback.
    pub fn freeze(
        &self,
        name: &str,
        player: PlayerId,
        from: usize,
        to: usize,
        half_speed: bool,
    ) -> Option<ReplayClip> {
        let buffer = self.buffers.get(&player)?;
        let mut outputs = buffer.slice(from, to);
        if half_speed {
            outputs = outputs.into_iter().step_by(2).collect();
        }
        Some(ReplayClip {
            name: name.to_owned(),
            outputs,
        })
    }
}

impl Default for ReplayCenter {
    fn default() -> Self {
        Self::new(DEFAULT_REPLAY_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn out(elapsed: i64) -> Arc<Output> {
        Arc::new(Output {
            elapsed,
            ..Output::default()
        })
    }

    #[test]
    fn eviction_is_oldest_first() {
        let mut buf = ReplayBuffer::new(3);
        for i in 0..10 {
            buf.push(out(i));
        }
        assert_eq!(buf.len(), 3);
        // After N pushes with bound 3, the front is push N-3.
        assert_eq!(buf.get(0).map(|o| o.elapsed), Some(7));
        assert_eq!(buf.get(2).map(|o| o.elapsed), Some(9));
    }

    #[test]
    fn slice_clamps_out_of_range_indices() {
        let mut buf = ReplayBuffer::new(4);
        for i in 0..4 {
            buf.push(out(i));
        }
        let all = buf.slice(0, 100);
        assert_eq!(all.len(), 4);
        let clamped = buf.slice(10, 2);
        assert!(clamped.is_empty());
    }

    #[test]
    fn half_speed_clip_keeps_every_other_frame() {
        let mut center = ReplayCenter::new(16);
        for i in 0..8 {
            center.note_output(1, out(i));
        }
        let clip = center.freeze("finish", 1, 0, 8, true).expect("clip");
        assert_eq!(clip.len(), 4);
        let times: Vec<i64> = clip.outputs.iter().map(|o| o.elapsed).collect();
        assert_eq!(times, vec![0, 2, 4, 6]);

        let full = center.freeze("finish", 1, 0, 8, false).expect("clip");
        assert_eq!(full.len(), 8);
    }

    #[test]
    fn unknown_player_has_no_clip() {
        let center = ReplayCenter::new(16);
        assert!(center.freeze("x", 9, 0, 1, false).is_none());
    }
}
