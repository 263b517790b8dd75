use super::channel::{InputValue, RawInputValue};
use crate::math::Vec2;

/// State of one channel in one buffer frame.
///
/// `hold_time`: 0 idle, 1 first pressed frame, >1 continuing hold, -1 the frame the input was
/// released.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct InputFrameState {
    pub value: InputValue,
    pub hold_time: i32,
    /// Set only by consume.
    pub used: bool,
    /// Host-reported triggered time at resolution (seconds).
    pub elapsed: f32,
}

impl InputFrameState {
    /// Derive this frame's state from the previous frame's state (already copied in) and the
    /// latest raw sample.
    pub fn resolve(&mut self, raw: &RawInputValue) {
        self.used = false;
        self.value = raw.value;
        if raw.value.is_active() {
            self.hold_up(raw.elapsed);
        } else {
            self.release_hold();
        }
    }

    fn hold_up(&mut self, elapsed: f32) {
        self.hold_time = if self.hold_time < 0 {
            1
        } else {
            self.hold_time.saturating_add(1)
        };
        self.elapsed = elapsed;
    }

    fn release_hold(&mut self) {
        self.hold_time = if self.hold_time > 0 { -1 } else { 0 };
        self.elapsed = 0.0;
    }

    #[inline]
    pub fn can_invoke_press(&self) -> bool {
        self.hold_time == 1 && !self.used
    }

    #[inline]
    pub fn can_invoke_hold(&self) -> bool {
        self.hold_time > 1
    }

    #[inline]
    pub fn can_invoke_release(&self) -> bool {
        self.hold_time == -1
    }
}

/// One row of the input buffer.
#[derive(Clone, Debug, PartialEq)]
pub struct BufferFrame {
    /// Indexed by channel slot; every frame holds every registered channel.
    pub states: Vec<InputFrameState>,
    /// Player facing in stick space when the frame was recorded.
    pub facing: Vec2,
    /// Monotonic buffer tick that produced the frame.
    pub serial: u64,
}

impl BufferFrame {
    pub fn idle(channels: usize) -> Self {
        Self {
            states: vec![InputFrameState::default(); channels],
            facing: Vec2::new(0.0, 1.0),
            serial: 0,
        }
    }

    /// Next frame: copy of `self`, then resolved against the raw samples.
    pub fn advance(&self, raw: &[RawInputValue], facing: Vec2, serial: u64) -> Self {
        let mut next = self.clone();
        for (state, sample) in next.states.iter_mut().zip(raw) {
            state.resolve(sample);
        }
        next.facing = facing;
        next.serial = serial;
        next
    }

    #[inline]
    pub fn state(&self, slot: usize) -> Option<&InputFrameState> {
        self.states.get(slot)
    }
}

/// Up to two buffer ages satisfying one condition within the lookback window.
///
/// `older` is the oldest qualifying age; `newer` the newest one when it differs.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FrameRecord {
    pub older: Option<usize>,
    pub newer: Option<usize>,
}

impl FrameRecord {
    /// Fold one qualifying age in, scanning newest to oldest.
    #[inline]
    pub(crate) fn record(&mut self, age: usize) {
        match (self.older, self.newer) {
            (None, _) => self.older = Some(age),
            (Some(prev), None) => {
                self.newer = Some(prev);
                self.older = Some(age);
            }
            (Some(_), Some(_)) => self.older = Some(age),
        }
    }

    #[inline]
    pub fn is_some(&self) -> bool {
        self.older.is_some()
    }

    #[inline]
    pub fn newest(&self) -> Option<usize> {
        self.newer.or(self.older)
    }

    #[inline]
    pub fn oldest(&self) -> Option<usize> {
        self.older
    }
}

/// Press/hold/release records of one button channel.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ButtonValidFrames {
    pub press: FrameRecord,
    pub hold: FrameRecord,
    pub release: FrameRecord,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(pressed: bool) -> RawInputValue {
        RawInputValue {
            value: if pressed {
                InputValue::pressed()
            } else {
                InputValue::ZERO
            },
            elapsed: 0.0,
        }
    }

    #[test]
    fn hold_time_counts_up_then_releases_once() {
        let mut state = InputFrameState::default();
        let mut seen = Vec::new();
        for pressed in [true, true, true, false, false, false] {
            state.resolve(&raw(pressed));
            seen.push(state.hold_time);
        }
        assert_eq!(seen, vec![1, 2, 3, -1, 0, 0]);
    }

    #[test]
    fn press_after_release_restarts_at_one() {
        let mut state = InputFrameState::default();
        state.resolve(&raw(true));
        state.resolve(&raw(false));
        assert_eq!(state.hold_time, -1);
        state.resolve(&raw(true));
        assert_eq!(state.hold_time, 1);
        assert!(state.can_invoke_press());
    }

    #[test]
    fn used_press_cannot_be_invoked() {
        let mut state = InputFrameState::default();
        state.resolve(&raw(true));
        state.used = true;
        assert!(!state.can_invoke_press());
        state.resolve(&raw(true));
        assert!(!state.used);
        assert!(state.can_invoke_hold());
    }

    #[test]
    fn frame_record_keeps_oldest_and_newest() {
        let mut record = FrameRecord::default();
        for age in [1, 4, 9] {
            record.record(age);
        }
        assert_eq!(record.newer, Some(1));
        assert_eq!(record.older, Some(9));

        let mut single = FrameRecord::default();
        single.record(3);
        assert_eq!(single.newest(), Some(3));
        assert_eq!(single.oldest(), Some(3));
    }

    #[test]
    fn advance_resolves_every_channel() {
        let frame = BufferFrame::idle(2);
        let next = frame.advance(&[raw(true), raw(false)], Vec2::new(1.0, 0.0), 7);
        assert_eq!(next.states[0].hold_time, 1);
        assert_eq!(next.states[1].hold_time, 0);
        assert_eq!(next.serial, 7);
    }
}
