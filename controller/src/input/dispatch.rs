/*!
Binding evaluation.

Notes
- Kinds are evaluated in a fixed order: directional+button sequences, button sequences,
  directional gestures, single buttons. Within a kind, higher priority goes first.
- A binding fires at most once per piece of evidence (the buffer frames it matched). A press that
  was not consumed therefore fires each interested binding once, not once per buffer update.
- Auto-consuming bindings mark what they matched as used, which hides it from every binding
  evaluated after them.
*/

use super::bindings::{SequenceOrder, TriggerEvent};
use super::buffer::InputBuffer;
use super::channel::InputValue;
use super::frame_state::InputFrameState;

impl InputBuffer {
    /// Run every live binding against the current valid frames.
    pub fn evaluate_events(&mut self) {
        self.sweep_bindings();

        self.evaluate_directional_sequences();
        self.evaluate_sequences();
        self.evaluate_directionals();
        self.evaluate_actions();

        self.sweep_bindings();
    }

    fn sweep_bindings(&mut self) {
        self.actions.sweep();
        self.sequences.sweep();
        self.directionals.sweep();
        self.directional_sequences.sweep();
    }

    #[inline]
    fn serial_at(&self, age: usize) -> u64 {
        self.frames.get(age).map_or(0, |f| f.serial)
    }

    #[inline]
    fn state_at(&self, slot: usize, age: usize) -> InputFrameState {
        self.frames
            .get(age)
            .and_then(|f| f.state(slot))
            .copied()
            .unwrap_or_default()
    }

    fn evaluate_directional_sequences(&mut self) {
        let mut bindings = std::mem::take(&mut self.directional_sequences);
        for binding in bindings.iter_mut() {
            if binding.meta.marked || !binding.delegate.is_bound() {
                continue;
            }
            let Some(slot) = self.channels.slot(&binding.input) else {
                log::error!("directional sequence: unknown input `{}`", binding.input);
                continue;
            };
            let Some(gesture) = self.channels.directional(&binding.gesture) else {
                log::error!("directional sequence: unknown gesture `{}`", binding.gesture);
                continue;
            };

            let Some(d_age) = self.directional_frames[gesture] else {
                continue;
            };
            let Some(b_age) = self.button_frames[slot].press.oldest() else {
                continue;
            };
            let ordered = match binding.order {
                SequenceOrder::None => true,
                SequenceOrder::DirectionalFirst => d_age >= b_age,
                SequenceOrder::ButtonFirst => b_age > d_age,
            };
            if !ordered {
                continue;
            }

            let evidence = (self.serial_at(d_age), self.serial_at(b_age));
            if !binding.meta.try_fire(evidence) {
                continue;
            }
            let state = self.state_at(slot, b_age);
            log::debug!(
                "directional sequence `{}` + `{}` fired (gesture {d_age}, button {b_age})",
                binding.gesture,
                binding.input
            );
            if binding.meta.auto_consume {
                self.consume_at(slot, b_age);
                self.consume_directional_input(&binding.gesture);
            }
            (binding.delegate.callback_mut())(state.value, state.elapsed);
        }
        self.directional_sequences = bindings;
    }

    fn evaluate_sequences(&mut self) {
        let mut bindings = std::mem::take(&mut self.sequences);
        for binding in bindings.iter_mut() {
            if binding.meta.marked || !binding.delegate.is_bound() {
                continue;
            }
            let (Some(first), Some(second)) = (
                self.channels.slot(&binding.first),
                self.channels.slot(&binding.second),
            ) else {
                log::error!(
                    "action sequence: unknown input in `{}` -> `{}`",
                    binding.first,
                    binding.second
                );
                continue;
            };

            let first_frames = self.button_frames[first];
            let second_frames = self.button_frames[second];

            let matched = if binding.first_is_hold {
                // First must still be held at (or after) the second's press.
                match (first_frames.hold.newest(), second_frames.press.oldest()) {
                    (Some(h), Some(p)) if h <= p && first != second => Some((h, p)),
                    _ => None,
                }
            } else if first == second {
                // Double tap: two distinct presses of one button.
                match (first_frames.press.older, first_frames.press.newer) {
                    (Some(a), Some(b)) => Some((a, b)),
                    _ => None,
                }
            } else {
                match (first_frames.press.oldest(), second_frames.press.newest()) {
                    (Some(a), Some(b)) if !binding.order_matters || a > b => Some((a, b)),
                    _ => None,
                }
            };
            let Some((a, b)) = matched else {
                continue;
            };

            let evidence = (self.serial_at(a), self.serial_at(b));
            if !binding.meta.try_fire(evidence) {
                continue;
            }
            let first_state = self.state_at(first, a);
            let second_state = self.state_at(second, b);
            log::debug!(
                "action sequence `{}` -> `{}` fired ({a}, {b})",
                binding.first,
                binding.second
            );
            if binding.meta.auto_consume {
                if binding.first_is_hold {
                    self.consume_at(second, b);
                } else if first == second {
                    // Newer first: consuming the older press propagates up to its release only.
                    self.consume_at(second, b);
                    self.consume_at(first, a);
                } else {
                    self.consume_at(first, a);
                    self.consume_at(second, b);
                }
            }
            (binding.delegate.callback_mut())(first_state.value, second_state.value);
        }
        self.sequences = bindings;
    }

    fn evaluate_directionals(&mut self) {
        let mut bindings = std::mem::take(&mut self.directionals);
        for binding in bindings.iter_mut() {
            if binding.meta.marked || !binding.delegate.is_bound() {
                continue;
            }
            let Some(gesture) = self.channels.directional(&binding.gesture) else {
                log::error!("directional action: unknown gesture `{}`", binding.gesture);
                continue;
            };
            let Some(age) = self.directional_frames[gesture] else {
                continue;
            };
            let serial = self.serial_at(age);
            if !binding.meta.try_fire((serial, serial)) {
                continue;
            }
            log::debug!("directional action `{}` fired ({age})", binding.gesture);
            if binding.meta.auto_consume {
                self.consume_directional_input(&binding.gesture);
            }
            (binding.delegate.callback_mut())();
        }
        self.directionals = bindings;
    }

    fn evaluate_actions(&mut self) {
        let mut bindings = std::mem::take(&mut self.actions);
        for binding in bindings.iter_mut() {
            if binding.meta.marked || !binding.delegate.is_bound() {
                continue;
            }
            let Some(slot) = self.channels.slot(&binding.input) else {
                log::error!("action: unknown input `{}`", binding.input);
                continue;
            };
            let frames = self.button_frames[slot];
            let age = match binding.trigger {
                TriggerEvent::Press => frames.press.oldest(),
                TriggerEvent::Hold => frames.hold.newest(),
                TriggerEvent::Release => frames.release.newest(),
            };
            let Some(age) = age else {
                continue;
            };

            let serial = self.serial_at(age);
            if !binding.meta.try_fire((serial, serial)) {
                continue;
            }
            let state = self.state_at(slot, age);
            // Release frames carry a zero value; report a pressed value for the released button.
            let value = match binding.trigger {
                TriggerEvent::Release => InputValue::pressed(),
                _ => state.value,
            };
            log::trace!("action `{}` {:?} fired ({age})", binding.input, binding.trigger);
            if binding.meta.auto_consume && binding.trigger == TriggerEvent::Press {
                self.consume_at(slot, age);
            }
            (binding.delegate.callback_mut())(value, state.elapsed);
        }
        self.actions = bindings;
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::input::bindings::{ActionFn, Delegate, UnbindPolicy};
    use crate::input::buffer::InputBufferSettings;
    use crate::input::channel::{InputId, InputMap};
    use crate::input::motion::{Direction, MotionActionDef, MotionMode};

    fn quarter_circle() -> MotionActionDef {
        MotionActionDef {
            id: InputId::new("QuarterCircle"),
            axis: InputId::new("Move"),
            relative_to_player: false,
            mode: MotionMode::Sequence {
                steps: vec![Direction::Back, Direction::Right, Direction::Forward],
            },
        }
    }

    fn buffer() -> InputBuffer {
        let map = InputMap::default()
            .with_button("Jump")
            .with_button("Attack")
            .with_button("Block")
            .with_axis("Move")
            .with_directional(quarter_circle());
        InputBuffer::new(&map, InputBufferSettings::default()).expect("valid config")
    }

    fn counter() -> (Arc<AtomicU32>, Delegate<ActionFn>) {
        let count = Arc::new(AtomicU32::new(0));
        let c = count.clone();
        let delegate = Delegate::action(move |_, _| {
            c.fetch_add(1, Ordering::SeqCst);
        });
        (count, delegate)
    }

    fn step(buffer: &mut InputBuffer) {
        buffer.update_buffer();
        buffer.evaluate_events();
    }

    fn tap(buffer: &mut InputBuffer, id: &str) {
        buffer.trigger_input(&id.into(), InputValue::pressed(), 0.0);
        step(buffer);
        buffer.complete_input(&id.into());
        step(buffer);
    }

    fn stick(buffer: &mut InputBuffer, x: f32, y: f32) {
        if x == 0.0 && y == 0.0 {
            buffer.complete_input(&"Move".into());
        } else {
            buffer.trigger_input(&"Move".into(), InputValue::axis(x, y), 0.0);
        }
        step(buffer);
    }

    #[test]
    fn press_fires_once_and_auto_consume_blocks_lower_priority() {
        let mut buffer = buffer();
        let (high, high_delegate) = counter();
        let (low, low_delegate) = counter();
        buffer.bind_action("Jump".into(), TriggerEvent::Press, true, 10, high_delegate);
        buffer.bind_action("Jump".into(), TriggerEvent::Press, false, 0, low_delegate);

        tap(&mut buffer, "Jump");
        for _ in 0..5 {
            step(&mut buffer);
        }
        assert_eq!(high.load(Ordering::SeqCst), 1);
        assert_eq!(low.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn non_consuming_press_is_seen_by_every_binding_once() {
        let mut buffer = buffer();
        let (a, a_delegate) = counter();
        let (b, b_delegate) = counter();
        buffer.bind_action("Attack".into(), TriggerEvent::Press, false, 1, a_delegate);
        buffer.bind_action("Attack".into(), TriggerEvent::Press, false, 0, b_delegate);

        tap(&mut buffer, "Attack");
        step(&mut buffer);
        assert_eq!(a.load(Ordering::SeqCst), 1);
        assert_eq!(b.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn hold_fires_per_buffer_update_and_release_once() {
        let mut buffer = buffer();
        let (hold, hold_delegate) = counter();
        let (released, release_delegate) = counter();
        buffer.bind_action("Block".into(), TriggerEvent::Hold, false, 0, hold_delegate);
        buffer.bind_action("Block".into(), TriggerEvent::Release, false, 0, release_delegate);

        buffer.trigger_input(&"Block".into(), InputValue::pressed(), 0.0);
        for _ in 0..4 {
            step(&mut buffer);
        }
        buffer.complete_input(&"Block".into());
        for _ in 0..3 {
            step(&mut buffer);
        }
        // Hold frames are updates 2..=4.
        assert_eq!(hold.load(Ordering::SeqCst), 3);
        assert_eq!(released.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn buffered_jump_is_consumed_by_late_binding() {
        let mut buffer = buffer();
        tap(&mut buffer, "Jump");
        step(&mut buffer);

        // Bound a few frames after the press; the press is still inside the button window.
        let (jumps, delegate) = counter();
        buffer.bind_action("Jump".into(), TriggerEvent::Press, true, 0, delegate);
        step(&mut buffer);
        assert_eq!(jumps.load(Ordering::SeqCst), 1);
        assert!(!buffer.can_press_input(&"Jump".into()));
        assert!(buffer.is_input_consumed(&"Jump".into(), false));
    }

    #[test]
    fn ordered_sequence_requires_first_before_second() {
        let mut buffer = buffer();
        let fired = Arc::new(AtomicU32::new(0));
        let f = fired.clone();
        buffer.bind_action_sequence(
            "Block".into(),
            "Attack".into(),
            true,
            false,
            true,
            0,
            Delegate::sequence(move |_, _| {
                f.fetch_add(1, Ordering::SeqCst);
            }),
        );

        tap(&mut buffer, "Attack");
        tap(&mut buffer, "Block");
        assert_eq!(fired.load(Ordering::SeqCst), 0);

        tap(&mut buffer, "Attack");
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert!(buffer.is_input_consumed(&"Attack".into(), true));
        assert!(!buffer.can_press_input(&"Block".into()));
    }

    #[test]
    fn hold_sequence_consumes_only_second() {
        let mut buffer = buffer();
        let values = Arc::new(Mutex::new(Vec::new()));
        let v = values.clone();
        buffer.bind_action_sequence(
            "Block".into(),
            "Attack".into(),
            true,
            true,
            false,
            0,
            Delegate::sequence(move |a, b| {
                v.lock().expect("lock").push((a, b));
            }),
        );

        buffer.trigger_input(&"Block".into(), InputValue::pressed(), 0.0);
        step(&mut buffer);
        step(&mut buffer);
        tap(&mut buffer, "Attack");

        assert_eq!(values.lock().expect("lock").len(), 1);
        assert!(!buffer.can_press_input(&"Attack".into()));
        assert!(buffer.can_press_input(&"Block".into()));
    }

    #[test]
    fn quarter_circle_then_attack_fires_once() {
        let mut buffer = buffer();
        let (fired, delegate) = counter();
        buffer.bind_directional_action_sequence(
            "Attack".into(),
            "QuarterCircle".into(),
            SequenceOrder::DirectionalFirst,
            true,
            0,
            delegate,
        );

        stick(&mut buffer, 0.0, -1.0);
        stick(&mut buffer, 0.7, -0.7);
        stick(&mut buffer, 1.0, 0.0);
        stick(&mut buffer, 0.7, 0.7);
        stick(&mut buffer, 0.0, 1.0);
        stick(&mut buffer, 0.0, 0.0);
        tap(&mut buffer, "Attack");
        for _ in 0..5 {
            step(&mut buffer);
        }

        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert_eq!(buffer.directional_valid_frame(&"QuarterCircle".into()), None);
        assert!(!buffer.can_press_input(&"Attack".into()));
    }

    #[test]
    fn attack_before_gesture_does_not_satisfy_directional_first() {
        let mut buffer = buffer();
        let (fired, delegate) = counter();
        buffer.bind_directional_action_sequence(
            "Attack".into(),
            "QuarterCircle".into(),
            SequenceOrder::DirectionalFirst,
            true,
            0,
            delegate,
        );

        tap(&mut buffer, "Attack");
        stick(&mut buffer, 0.0, -1.0);
        stick(&mut buffer, 1.0, 0.0);
        stick(&mut buffer, 0.0, 1.0);
        stick(&mut buffer, 0.0, 0.0);

        assert_eq!(fired.load(Ordering::SeqCst), 0);
        assert!(buffer.directional_valid_frame(&"QuarterCircle".into()).is_some());
    }

    #[test]
    fn directional_action_consumes_gesture() {
        let mut buffer = buffer();
        let fired = Arc::new(AtomicU32::new(0));
        let f = fired.clone();
        buffer.bind_directional_action(
            "QuarterCircle".into(),
            true,
            0,
            Delegate::directional(move || {
                f.fetch_add(1, Ordering::SeqCst);
            }),
        );

        stick(&mut buffer, 0.0, -1.0);
        stick(&mut buffer, 1.0, 0.0);
        stick(&mut buffer, 0.0, 1.0);
        stick(&mut buffer, 0.0, 0.0);
        for _ in 0..5 {
            step(&mut buffer);
        }
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn unbind_and_dropped_owner_stop_firing() {
        let mut buffer = buffer();
        let (count, delegate) = counter();
        let handle = buffer.bind_action("Jump".into(), TriggerEvent::Press, false, 0, delegate);
        assert!(buffer.unbind_action(handle));

        let owner = Arc::new(());
        let (owned, owned_delegate) = counter();
        buffer.bind_action(
            "Jump".into(),
            TriggerEvent::Press,
            false,
            0,
            owned_delegate.with_owner(&owner),
        );
        drop(owner);

        tap(&mut buffer, "Jump");
        assert_eq!(count.load(Ordering::SeqCst), 0);
        assert_eq!(owned.load(Ordering::SeqCst), 0);
        assert_eq!(buffer.binding_count(), 0);
    }

    #[test]
    fn latent_binding_unbinds_after_fire_count() {
        let mut buffer = buffer();
        let (count, delegate) = counter();
        buffer.bind_action_with_policy(
            "Jump".into(),
            TriggerEvent::Press,
            true,
            0,
            UnbindPolicy::AfterFires(1),
            delegate,
        );
        tap(&mut buffer, "Jump");
        tap(&mut buffer, "Jump");
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert_eq!(buffer.binding_count(), 0);
    }
}
