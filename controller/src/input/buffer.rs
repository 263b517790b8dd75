use serde::{Deserialize, Serialize};

use super::bindings::{
    ActionBinding, BindingHandle, BindingMeta, BindingSet, Delegate, DirectionalBinding,
    DirectionalFn, DirectionalSequenceBinding, ActionFn, SequenceBinding, SequenceFn,
    SequenceOrder, TriggerEvent, UnbindPolicy,
};
use super::channel::{ChannelRegistry, InputId, InputMap, InputValue, RawInputValue};
use super::frame_state::{BufferFrame, ButtonValidFrames};
use super::motion::MotionMatcher;
use super::ring_buffer::RingBuffer;
use crate::constants::{
    DEFAULT_BUTTON_FRAME_WINDOW, DEFAULT_FULL_FRAME_WINDOW, DEFAULT_UPDATE_FRAME_RATE,
};
use crate::error::{ConfigError, ConfigResult};
use crate::math::Vec2;

/// Buffer sizes and cadence.
///
/// Typical values:
/// - `full_frame_window`: 30 .. 60 frames (directional gestures are matched over all of it)
/// - `button_frame_window`: 10 .. 20 frames
/// - `update_frame_rate`: 50 .. 60 Hz
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InputBufferSettings {
    pub full_frame_window: usize,
    pub button_frame_window: usize,
    pub update_frame_rate: f32,
}

impl Default for InputBufferSettings {
    fn default() -> Self {
        Self {
            full_frame_window: DEFAULT_FULL_FRAME_WINDOW,
            button_frame_window: DEFAULT_BUTTON_FRAME_WINDOW,
            update_frame_rate: DEFAULT_UPDATE_FRAME_RATE,
        }
    }
}

impl InputBufferSettings {
    pub fn validate(&self) -> ConfigResult<()> {
        if self.button_frame_window == 0 || self.button_frame_window > self.full_frame_window {
            return Err(ConfigError::InvalidWindow {
                button: self.button_frame_window,
                full: self.full_frame_window,
            });
        }
        if !(self.update_frame_rate.is_finite() && self.update_frame_rate > 0.0) {
            return Err(ConfigError::InvalidFrameRate(self.update_frame_rate));
        }
        Ok(())
    }

    /// Seconds between buffer updates.
    #[inline]
    pub fn tick_interval(&self) -> f32 {
        1.0 / self.update_frame_rate
    }
}

/// Buffer updates run per `tick` call at most; a long hitch does not replay the whole backlog.
const MAX_CATCH_UP_UPDATES: u32 = 8;

/// Input buffer engine.
///
/// Notes
/// - `update_buffer` runs at the fixed `update_frame_rate`; `evaluate_events` runs every call to
///   `tick`. Hosts that drive their own cadence can call both directly.
/// - Raw samples are last-write-wins between buffer updates.
/// - Frame index `i` means "`i` buffer updates ago".
pub struct InputBuffer {
    pub(crate) settings: InputBufferSettings,
    pub(crate) channels: ChannelRegistry,
    raw: Vec<RawInputValue>,
    pub(crate) frames: RingBuffer<BufferFrame>,
    pub(crate) button_frames: Vec<ButtonValidFrames>,
    pub(crate) directional_frames: Vec<Option<usize>>,
    pub(crate) matchers: Vec<MotionMatcher>,
    facing: Vec2,
    accumulator: f32,
    serial: u64,
    next_handle: u32,
    pub(crate) actions: BindingSet<ActionBinding>,
    pub(crate) sequences: BindingSet<SequenceBinding>,
    pub(crate) directionals: BindingSet<DirectionalBinding>,
    pub(crate) directional_sequences: BindingSet<DirectionalSequenceBinding>,
}

impl InputBuffer {
    pub fn new(map: &InputMap, settings: InputBufferSettings) -> ConfigResult<Self> {
        settings.validate()?;
        let channels = ChannelRegistry::build(map)?;

        let slots = channels.len();
        let gestures = channels.directionals.len();
        Ok(Self {
            settings,
            raw: vec![RawInputValue::default(); slots],
            frames: RingBuffer::filled(settings.full_frame_window, BufferFrame::idle(slots)),
            button_frames: vec![ButtonValidFrames::default(); slots],
            directional_frames: vec![None; gestures],
            matchers: vec![MotionMatcher::default(); gestures],
            channels,
            facing: Vec2::new(0.0, 1.0),
            accumulator: 0.0,
            serial: 0,
            next_handle: 0,
            actions: BindingSet::default(),
            sequences: BindingSet::default(),
            directionals: BindingSet::default(),
            directional_sequences: BindingSet::default(),
        })
    }

    #[inline]
    pub fn settings(&self) -> &InputBufferSettings {
        &self.settings
    }

    /// Frame recorded `age` buffer updates ago.
    #[inline]
    pub fn frame(&self, age: usize) -> Option<&BufferFrame> {
        self.frames.get(age)
    }

    /// Ids of the frame-state columns, in slot order.
    pub fn channel_ids(&self) -> &[InputId] {
        &self.channels.ids
    }

    /* ~~~~~ Raw input ~~~~~ */

    /// Host notification that an input is triggered with `value`.
    pub fn trigger_input(&mut self, id: &InputId, value: InputValue, elapsed: f32) {
        let Some(slot) = self.channels.slot(id) else {
            log::warn!("trigger_input: unknown input `{id}`");
            return;
        };
        self.raw[slot] = RawInputValue { value, elapsed };
    }

    /// Host notification that an input is no longer triggered.
    pub fn complete_input(&mut self, id: &InputId) {
        let Some(slot) = self.channels.slot(id) else {
            log::warn!("complete_input: unknown input `{id}`");
            return;
        };
        self.raw[slot] = RawInputValue::default();
    }

    /// Player facing in stick space, used by player-relative gestures.
    pub fn set_facing(&mut self, facing: Vec2) {
        if facing.norm_squared() > 0.0 {
            self.facing = facing;
        }
    }

    /* ~~~~~ Cadence ~~~~~ */

    /// Advance by `dt` seconds: run due buffer updates, age latent bindings, evaluate events.
    pub fn tick(&mut self, dt: f32) {
        let interval = self.settings.tick_interval();
        self.accumulator += dt.max(0.0);

        let mut updates = 0;
        while self.accumulator >= interval {
            self.accumulator -= interval;
            if updates < MAX_CATCH_UP_UPDATES {
                self.update_buffer();
                updates += 1;
            }
        }

        self.actions.advance(dt);
        self.sequences.advance(dt);
        self.directionals.advance(dt);
        self.directional_sequences.advance(dt);

        self.evaluate_events();
    }

    /// Push one frame built from the latest raw samples and recompute valid frames.
    pub fn update_buffer(&mut self) {
        self.serial += 1;
        let next = match self.frames.front() {
            Some(front) => front.advance(&self.raw, self.facing, self.serial),
            None => BufferFrame::idle(self.channels.len()).advance(&self.raw, self.facing, self.serial),
        };
        self.frames.push_front(next);

        for slot in 0..self.channels.len() {
            self.refresh_button_frames(slot);
        }
        for index in 0..self.channels.directionals.len() {
            self.refresh_directional_frame(index);
        }
    }

    /// Scan the button window newest to oldest.
    pub(crate) fn refresh_button_frames(&mut self, slot: usize) {
        let mut valid = ButtonValidFrames::default();
        let window = self.settings.button_frame_window.min(self.frames.len());
        for age in 0..window {
            let Some(state) = self.frames.get(age).and_then(|f| f.state(slot)) else {
                continue;
            };
            if state.can_invoke_press() {
                valid.press.record(age);
            }
            if state.can_invoke_hold() {
                valid.hold.record(age);
            }
            if state.can_invoke_release() {
                valid.release.record(age);
            }
        }
        self.button_frames[slot] = valid;
    }

    /// Scan the whole buffer oldest to newest through the gesture matcher.
    pub(crate) fn refresh_directional_frame(&mut self, index: usize) {
        let Some((def, axis_slot)) = self.channels.directionals.get(index) else {
            return;
        };
        let matcher = &mut self.matchers[index];
        matcher.reset();

        let mut found = None;
        for age in (0..self.frames.len()).rev() {
            let Some(frame) = self.frames.get(age) else {
                continue;
            };
            let input = frame
                .state(*axis_slot)
                .map_or(Vec2::zeros(), |s| s.value.axis2d());
            if matcher.check(def, input, frame.facing) {
                found = Some(age);
                break;
            }
        }
        if found.is_none() {
            matcher.reset();
        }
        self.directional_frames[index] = found;
    }

    /* ~~~~~ Consume ~~~~~ */

    /// Mark a press as used so no other binding can take it.
    ///
    /// The oldest valid press is consumed unless `consume_newer` asks for the newest one. The used
    /// flag is propagated to older frames up to the previous release.
    pub fn consume_button_input(&mut self, id: &InputId, consume_newer: bool) -> bool {
        let Some(slot) = self.channels.slot(id) else {
            log::error!("consume_button_input: unknown input `{id}`");
            return false;
        };
        let press = self.button_frames[slot].press;
        let target = if consume_newer {
            press.newest()
        } else {
            press.oldest()
        };
        let Some(age) = target else {
            return false;
        };
        self.consume_at(slot, age)
    }

    pub(crate) fn consume_at(&mut self, slot: usize, age: usize) -> bool {
        let Some(state) = self.frames.get_mut(age).and_then(|f| f.states.get_mut(slot)) else {
            return false;
        };
        if !state.can_invoke_press() {
            return false;
        }
        state.used = true;
        self.propagate_consume(slot, age + 1);
        self.refresh_button_frames(slot);
        true
    }

    fn propagate_consume(&mut self, slot: usize, from_age: usize) {
        for age in from_age..self.frames.len() {
            let Some(state) = self.frames.get_mut(age).and_then(|f| f.states.get_mut(slot)) else {
                break;
            };
            if state.hold_time == -1 {
                break;
            }
            state.used = true;
        }
    }

    /// Erase a completed gesture by zeroing its axis samples from the head to the matched frame.
    pub fn consume_directional_input(&mut self, id: &InputId) -> bool {
        let Some(index) = self.channels.directional(id) else {
            log::error!("consume_directional_input: unknown gesture `{id}`");
            return false;
        };
        let Some(matched) = self.directional_frames[index] else {
            return false;
        };
        let axis_slot = self.channels.directionals[index].1;
        for age in 0..=matched {
            if let Some(state) = self.frames.get_mut(age).and_then(|f| f.states.get_mut(axis_slot)) {
                state.value = InputValue::ZERO;
            }
        }
        self.directional_frames[index] = None;
        self.matchers[index].reset();
        true
    }

    /* ~~~~~ Queries ~~~~~ */

    pub fn can_press_input(&self, id: &InputId) -> bool {
        self.channels
            .slot(id)
            .is_some_and(|slot| self.button_frames[slot].press.is_some())
    }

    /// Whether the oldest (or newest) press in the button window has been consumed.
    pub fn is_input_consumed(&self, id: &InputId, check_newer: bool) -> bool {
        let Some(slot) = self.channels.slot(id) else {
            return false;
        };
        let window = self.settings.button_frame_window.min(self.frames.len());
        let mut presses = (0..window).filter_map(|age| {
            self.frames
                .get(age)
                .and_then(|f| f.state(slot))
                .filter(|s| s.hold_time == 1)
        });
        let press = if check_newer {
            presses.next()
        } else {
            presses.last()
        };
        press.is_some_and(|s| s.used)
    }

    /// True while the input is still held and the press that started the hold was consumed.
    pub fn is_consumed_input_held(&self, id: &InputId) -> bool {
        let Some(slot) = self.channels.slot(id) else {
            return false;
        };
        let Some(front) = self.frames.front().and_then(|f| f.state(slot)) else {
            return false;
        };
        if front.hold_time < 1 {
            return false;
        }
        // The press frame sits `hold_time - 1` updates back.
        let press_age = (front.hold_time - 1) as usize;
        self.frames
            .get(press_age)
            .and_then(|f| f.state(slot))
            .is_some_and(|s| s.hold_time == 1 && s.used)
    }

    /// Seconds the input has been held, as reported by the host.
    pub fn time_input_held(&self, id: &InputId) -> f32 {
        self.channels
            .slot(id)
            .and_then(|slot| self.frames.front().and_then(|f| f.state(slot)))
            .filter(|s| s.hold_time > 0)
            .map_or(0.0, |s| s.elapsed)
    }

    /// Buffer frame at which a gesture last completed.
    pub fn directional_valid_frame(&self, id: &InputId) -> Option<usize> {
        self.channels
            .directional(id)
            .and_then(|index| self.directional_frames[index])
    }

    pub fn button_valid_frames(&self, id: &InputId) -> Option<ButtonValidFrames> {
        self.channels.slot(id).map(|slot| self.button_frames[slot])
    }

    /* ~~~~~ Bindings ~~~~~ */

    fn next_meta(&mut self, priority: i32, auto_consume: bool, policy: UnbindPolicy) -> BindingMeta {
        self.next_handle = self.next_handle.wrapping_add(1);
        let mut meta = BindingMeta::new(BindingHandle(self.next_handle), priority, auto_consume);
        meta.policy = policy;
        meta
    }

    pub fn bind_action(
        &mut self,
        input: InputId,
        trigger: TriggerEvent,
        auto_consume: bool,
        priority: i32,
        delegate: Delegate<ActionFn>,
    ) -> BindingHandle {
        self.bind_action_with_policy(input, trigger, auto_consume, priority, UnbindPolicy::Never, delegate)
    }

    pub fn bind_action_with_policy(
        &mut self,
        input: InputId,
        trigger: TriggerEvent,
        auto_consume: bool,
        priority: i32,
        policy: UnbindPolicy,
        delegate: Delegate<ActionFn>,
    ) -> BindingHandle {
        let meta = self.next_meta(priority, auto_consume, policy);
        let handle = meta.handle;
        self.actions.insert(ActionBinding {
            meta,
            input,
            trigger,
            delegate,
        });
        handle
    }

    pub fn unbind_action(&mut self, handle: BindingHandle) -> bool {
        self.actions.mark(handle)
    }

    /// Two-button binding. With `first_is_hold`, order is ignored and only `second` is consumed.
    #[allow(clippy::too_many_arguments)]
    pub fn bind_action_sequence(
        &mut self,
        first: InputId,
        second: InputId,
        auto_consume: bool,
        first_is_hold: bool,
        order_matters: bool,
        priority: i32,
        delegate: Delegate<SequenceFn>,
    ) -> BindingHandle {
        let meta = self.next_meta(priority, auto_consume, UnbindPolicy::Never);
        let handle = meta.handle;
        self.sequences.insert(SequenceBinding {
            meta,
            first,
            second,
            first_is_hold,
            order_matters: order_matters && !first_is_hold,
            delegate,
        });
        handle
    }

    pub fn unbind_action_sequence(&mut self, handle: BindingHandle) -> bool {
        self.sequences.mark(handle)
    }

    pub fn bind_directional_action(
        &mut self,
        gesture: InputId,
        auto_consume: bool,
        priority: i32,
        delegate: Delegate<DirectionalFn>,
    ) -> BindingHandle {
        let meta = self.next_meta(priority, auto_consume, UnbindPolicy::Never);
        let handle = meta.handle;
        self.directionals.insert(DirectionalBinding {
            meta,
            gesture,
            delegate,
        });
        handle
    }

    pub fn unbind_directional_action(&mut self, handle: BindingHandle) -> bool {
        self.directionals.mark(handle)
    }

    pub fn bind_directional_action_sequence(
        &mut self,
        input: InputId,
        gesture: InputId,
        order: SequenceOrder,
        auto_consume: bool,
        priority: i32,
        delegate: Delegate<ActionFn>,
    ) -> BindingHandle {
        let meta = self.next_meta(priority, auto_consume, UnbindPolicy::Never);
        let handle = meta.handle;
        self.directional_sequences.insert(DirectionalSequenceBinding {
            meta,
            input,
            gesture,
            order,
            delegate,
        });
        handle
    }

    pub fn unbind_directional_action_sequence(&mut self, handle: BindingHandle) -> bool {
        self.directional_sequences.mark(handle)
    }

    /// Change the unbind policy of any binding. Returns false for unknown handles.
    pub fn set_unbind_policy(&mut self, handle: BindingHandle, policy: UnbindPolicy) -> bool {
        let meta = self
            .actions
            .iter_mut()
            .map(|b| &mut b.meta)
            .chain(self.sequences.iter_mut().map(|b| &mut b.meta))
            .chain(self.directionals.iter_mut().map(|b| &mut b.meta))
            .chain(self.directional_sequences.iter_mut().map(|b| &mut b.meta))
            .find(|m| m.handle == handle);
        match meta {
            Some(meta) => {
                meta.policy = policy;
                true
            }
            None => false,
        }
    }

    /// Number of live (unmarked) bindings across all kinds.
    pub fn binding_count(&self) -> usize {
        let live = |m: &BindingMeta| !m.marked;
        self.actions.iter().filter(|b| live(&b.meta)).count()
            + self.sequences.iter().filter(|b| live(&b.meta)).count()
            + self.directionals.iter().filter(|b| live(&b.meta)).count()
            + self.directional_sequences.iter().filter(|b| live(&b.meta)).count()
    }
}
