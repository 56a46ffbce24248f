use sonify_core::Playback;
use std::collections::VecDeque;

/// Entries kept in the feed
pub const HISTORY_LIMIT: usize = 10;

/// Recently sounded notes, newest first
#[derive(Debug, Clone, Default)]
pub struct NowPlaying {
    entries: VecDeque<Playback>,
}

impl NowPlaying {
    pub fn push(&mut self, playback: Playback) {
        self.entries.push_front(playback);
        self.entries.truncate(HISTORY_LIMIT);
    }

    pub fn entries(&self) -> impl Iterator<Item = &Playback> {
        self.entries.iter()
    }

    pub fn latest(&self) -> Option<&Playback> {
        self.entries.front()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn note(index: usize) -> Playback {
        Playback {
            title: format!("point {}", index),
            pitch: "C3".parse().unwrap(),
            index,
        }
    }

    #[test]
    fn test_capped_newest_first() {
        let mut feed = NowPlaying::default();
        for i in 0..15 {
            feed.push(note(i));
        }
        assert_eq!(feed.len(), HISTORY_LIMIT);
        assert_eq!(feed.latest().unwrap().index, 14);
        let indices: Vec<_> = feed.entries().map(|p| p.index).collect();
        assert_eq!(indices, (5..15).rev().collect::<Vec<_>>());
    }
}
