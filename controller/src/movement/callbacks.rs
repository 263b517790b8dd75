use crate::collision::{CollisionWorld, SweepHit};
use crate::math::{Quat, Vec3};

use super::floor::GroundingStatus;
use super::root_motion::AnimationRootMotion;
use super::state::MovementState;

/// What the velocity callback sees for one substep.
///
/// The callback writes the new velocity into `velocity`. Setting `requested_state` (for example
/// `Falling` when a jump starts) switches state before the substep moves.
#[derive(Clone, Copy, Debug)]
pub struct VelocityContext {
    pub velocity: Vec3,
    /// Gravity acceleration for this character (meters per second squared).
    pub gravity: Vec3,
    pub state: MovementState,
    pub floor: GroundingStatus,
    pub location: Vec3,
    pub rotation: Quat,
    pub dt: f32,
    pub requested_state: Option<MovementState>,
}

/// Host hooks the solver calls while it moves a character.
///
/// Only `calculate_velocity` is required. A plain `FnMut(&mut VelocityContext)` closure
/// implements the trait with every other hook left at its default.
pub trait MovementCallbacks {
    /// Produce this substep's velocity. Skipped while animation root motion or an override
    /// root-motion source drives the velocity.
    fn calculate_velocity(&mut self, ctx: &mut VelocityContext);

    /// New rotation after the move, or None to keep the current one.
    fn update_rotation(&mut self, _rotation: Quat, _velocity: Vec3, _dt: f32) -> Option<Quat> {
        None
    }

    fn post_process_root_motion_velocity(&mut self, velocity: Vec3, _dt: f32) -> Vec3 {
        velocity
    }

    fn post_process_root_motion_rotation(&mut self, rotation: Quat, _dt: f32) -> Quat {
        rotation
    }

    /// Advance the animation pose and hand back its root motion, if any is playing.
    fn tick_pose(&mut self, _dt: f32) -> Option<AnimationRootMotion> {
        None
    }

    fn on_move_blocked(&mut self, _hit: &SweepHit) {}

    fn on_landed(&mut self, _hit: &SweepHit) {}

    fn on_walking_off_ledge(
        &mut self,
        _previous_floor_impact_normal: Vec3,
        _previous_floor_contact_normal: Vec3,
        _previous_location: Vec3,
        _dt: f32,
    ) {
    }

    fn on_stuck_in_geometry(&mut self, _hit: &SweepHit) {}

    fn on_movement_state_changed(&mut self, _previous: MovementState, _current: MovementState) {}
}

impl<F> MovementCallbacks for F
where
    F: FnMut(&mut VelocityContext),
{
    #[inline]
    fn calculate_velocity(&mut self, ctx: &mut VelocityContext) {
        self(ctx)
    }
}

/// Collaborators borrowed for one `perform_movement` call.
pub struct MoveContext<'a> {
    pub world: &'a dyn CollisionWorld,
    pub callbacks: &'a mut dyn MovementCallbacks,
}

impl<'a> MoveContext<'a> {
    #[inline]
    pub fn new(world: &'a dyn CollisionWorld, callbacks: &'a mut dyn MovementCallbacks) -> Self {
        Self { world, callbacks }
    }
}
