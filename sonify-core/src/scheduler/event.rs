use crate::types::Pitch;

/// Emitted once per sounded note
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Playback {
    pub title: String,
    pub pitch: Pitch,
    /// Playlist index of the point that was sounded
    pub index: usize,
}

impl Playback {
    /// Reset is only meaningful once playback has moved past the first point
    pub fn reset_enabled(&self) -> bool {
        self.index != 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reset_enabled_follows_index() {
        let pitch: Pitch = "C3".parse().unwrap();
        let first = Playback {
            title: "a".into(),
            pitch,
            index: 0,
        };
        assert!(!first.reset_enabled());

        let later = Playback { index: 3, ..first };
        assert!(later.reset_enabled());
    }
}
