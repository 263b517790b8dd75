use std::collections::{HashMap, HashSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use super::motion::MotionActionDef;
use crate::error::{ConfigError, ConfigResult};
use crate::math::Vec2;

/// Name of one logical input (button, axis or directional gesture).
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InputId(pub String);

impl InputId {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for InputId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl fmt::Display for InputId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Sampled value of a channel.
///
/// Buttons store `1.0` in `x` while pressed; axes store their 2D value.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct InputValue(pub Vec2);

impl InputValue {
    pub const ZERO: Self = Self(Vec2::new(0.0, 0.0));

    #[inline]
    pub fn pressed() -> Self {
        Self(Vec2::new(1.0, 0.0))
    }

    #[inline]
    pub fn axis(x: f32, y: f32) -> Self {
        Self(Vec2::new(x, y))
    }

    /// Any non-zero component counts as input.
    #[inline]
    pub fn is_active(&self) -> bool {
        self.0.x != 0.0 || self.0.y != 0.0
    }

    #[inline]
    pub fn axis2d(&self) -> Vec2 {
        self.0
    }
}

/// Latest value pushed by the host for one channel (last write wins).
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct RawInputValue {
    pub value: InputValue,
    /// Seconds the host reports the input has been triggered for.
    pub elapsed: f32,
}

/// Channels known to one input buffer.
///
/// Conventions
/// - `buttons` and `axes` get a frame-state column in every buffer frame.
/// - `directionals` are gestures read from one of the `axes`.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct InputMap {
    pub buttons: Vec<InputId>,
    pub axes: Vec<InputId>,
    pub directionals: Vec<MotionActionDef>,
}

impl InputMap {
    pub fn with_button(mut self, id: impl Into<String>) -> Self {
        self.buttons.push(InputId::new(id));
        self
    }

    pub fn with_axis(mut self, id: impl Into<String>) -> Self {
        self.axes.push(InputId::new(id));
        self
    }

    pub fn with_directional(mut self, def: MotionActionDef) -> Self {
        self.directionals.push(def);
        self
    }

    /// Reject duplicate ids (across all three sets) and gestures reading unknown axes.
    pub fn validate(&self) -> ConfigResult<()> {
        let mut seen: HashSet<&InputId> = HashSet::new();
        let ids = self
            .buttons
            .iter()
            .chain(self.axes.iter())
            .chain(self.directionals.iter().map(|d| &d.id));
        for id in ids {
            if !seen.insert(id) {
                return Err(ConfigError::DuplicateChannel(id.to_string()));
            }
        }

        for gesture in &self.directionals {
            if !self.axes.contains(&gesture.axis) {
                return Err(ConfigError::UnknownAxis {
                    gesture: gesture.id.to_string(),
                    axis: gesture.axis.to_string(),
                });
            }
        }
        Ok(())
    }
}

/// Dense slot lookup built from a validated `InputMap`.
#[derive(Clone, Debug)]
pub(crate) struct ChannelRegistry {
    /// Frame-state columns: buttons first, then axes.
    pub(crate) ids: Vec<InputId>,
    slots: HashMap<InputId, usize>,
    /// Gestures, each with the slot of the axis it reads.
    pub(crate) directionals: Vec<(MotionActionDef, usize)>,
    directional_slots: HashMap<InputId, usize>,
}

impl ChannelRegistry {
    pub(crate) fn build(map: &InputMap) -> ConfigResult<Self> {
        map.validate()?;

        let mut ids = Vec::with_capacity(map.buttons.len() + map.axes.len());
        for id in &map.buttons {
            ids.push(id.clone());
        }
        for id in &map.axes {
            ids.push(id.clone());
        }
        let slots: HashMap<InputId, usize> = ids
            .iter()
            .enumerate()
            .map(|(slot, id)| (id.clone(), slot))
            .collect();

        let mut directionals = Vec::with_capacity(map.directionals.len());
        let mut directional_slots = HashMap::new();
        for (index, def) in map.directionals.iter().enumerate() {
            let axis_slot = slots
                .get(&def.axis)
                .copied()
                .ok_or_else(|| ConfigError::UnknownAxis {
                    gesture: def.id.to_string(),
                    axis: def.axis.to_string(),
                })?;
            directionals.push((def.clone(), axis_slot));
            directional_slots.insert(def.id.clone(), index);
        }

        Ok(Self {
            ids,
            slots,
            directionals,
            directional_slots,
        })
    }

    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.ids.len()
    }

    #[inline]
    pub(crate) fn slot(&self, id: &InputId) -> Option<usize> {
        self.slots.get(id).copied()
    }

    #[inline]
    pub(crate) fn directional(&self, id: &InputId) -> Option<usize> {
        self.directional_slots.get(id).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::motion::{Direction, MotionMode};

    fn stick_gesture(axis: &str) -> MotionActionDef {
        MotionActionDef {
            id: InputId::new("QuarterCircle"),
            axis: InputId::new(axis),
            relative_to_player: false,
            mode: MotionMode::Sequence {
                steps: vec![Direction::Back, Direction::Right, Direction::Forward],
            },
        }
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let map = InputMap::default().with_button("Jump").with_axis("Jump");
        assert!(matches!(
            map.validate(),
            Err(ConfigError::DuplicateChannel(id)) if id == "Jump"
        ));
    }

    #[test]
    fn gesture_on_unknown_axis_is_rejected() {
        let map = InputMap::default()
            .with_axis("Move")
            .with_directional(stick_gesture("Look"));
        assert!(matches!(map.validate(), Err(ConfigError::UnknownAxis { .. })));
    }

    #[test]
    fn registry_assigns_buttons_before_axes() {
        let map = InputMap::default()
            .with_axis("Move")
            .with_button("Jump")
            .with_button("Attack")
            .with_directional(stick_gesture("Move"));
        let registry = ChannelRegistry::build(&map).expect("valid map");

        assert_eq!(registry.len(), 3);
        assert_eq!(registry.slot(&"Jump".into()), Some(0));
        assert_eq!(registry.slot(&"Move".into()), Some(2));
        assert_eq!(registry.directional(&"QuarterCircle".into()), Some(0));
        assert_eq!(registry.directionals[0].1, 2);
    }

    #[test]
    fn input_value_activity() {
        assert!(!InputValue::ZERO.is_active());
        assert!(InputValue::pressed().is_active());
        assert!(InputValue::axis(0.0, -0.5).is_active());
    }
}
