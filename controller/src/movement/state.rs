use serde::{Deserialize, Serialize};

use crate::collision::BodyId;
use crate::math::{Quat, Vec3};

/// Which per-substep tick the solver runs.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MovementState {
    /// Movement disabled; `perform_movement` does nothing.
    None,
    /// Walking on a walkable floor.
    Grounded,
    /// Airborne under the velocity callback's gravity.
    #[default]
    Falling,
    /// Free movement along the velocity with no floor snapping.
    General,
}

impl MovementState {
    #[inline]
    pub fn is_active(&self) -> bool {
        !matches!(self, MovementState::None)
    }
}

/// Where the character stood relative to its base the last time the base was saved.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BasedMovementInfo {
    pub base: Option<BodyId>,
    /// Base translation at the last save.
    pub base_location: Vec3,
    /// Base rotation at the last save.
    pub base_rotation: Quat,
}

impl Default for BasedMovementInfo {
    fn default() -> Self {
        Self {
            base: None,
            base_location: Vec3::zeros(),
            base_rotation: Quat::identity(),
        }
    }
}

impl BasedMovementInfo {
    #[inline]
    pub fn clear(&mut self) {
        *self = Self::default();
    }
}
