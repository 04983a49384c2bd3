// highgui reports keys as one-shot events: a held key arrives as a burst of
// autorepeat events with empty polls in between. `KeyHold` turns that back into
// a level so the session's rising-edge latch sees one press per physical press.

/// Frames a key stays "held" after its last event. Covers the usual autorepeat
/// start delay (~500 ms) at the tester's ~30 ms frame pace.
pub const KEY_HOLD_FRAMES: u32 = 20;

#[derive(Debug, Clone)]
pub struct KeyHold {
    window: u32,
    frames_since_event: Option<u32>,
}

impl KeyHold {
    pub fn new(window: u32) -> Self {
        Self {
            window,
            frames_since_event: None,
        }
    }

    /// Feeds one frame's poll result and returns whether the key counts as held.
    pub fn observe(&mut self, event: bool) -> bool {
        self.frames_since_event = if event {
            Some(0)
        } else {
            self.frames_since_event.map(|n| n.saturating_add(1))
        };
        self.frames_since_event.is_some_and(|n| n < self.window)
    }
}

impl Default for KeyHold {
    fn default() -> Self {
        Self::new(KEY_HOLD_FRAMES)
    }
}
