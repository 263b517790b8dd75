use crate::collision::{BodyId, BodyKind, CollisionWorld, KinematicWorld, SweepHit};
use crate::constants::{RESTING_BODY_SPEED_TOLERANCE, SMALL_NUMBER};
use crate::math::{Vec3, is_nearly_zero, project_onto_normal, safe_normal, up};

use super::callbacks::MoveContext;
use super::solver::MovementSolver;
use super::state::MovementState;

/// How a radial force weakens with distance from its origin.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RadialFalloff {
    #[default]
    Constant,
    /// Full strength at the origin, zero at the radius.
    Linear,
}

/// Effect the solver wants applied to a world body.
///
/// The solver never mutates other bodies; hosts drain these after `perform_movement` and apply
/// them to their physics world.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PhysicsInteraction {
    Impulse {
        body: BodyId,
        impulse: Vec3,
        point: Vec3,
    },
    Force {
        body: BodyId,
        force: Vec3,
        point: Vec3,
    },
}

impl PhysicsInteraction {
    #[inline]
    pub fn body(&self) -> BodyId {
        match *self {
            PhysicsInteraction::Impulse { body, .. } | PhysicsInteraction::Force { body, .. } => {
                body
            }
        }
    }

    /// Apply to the in-process world (at the body's center).
    pub fn apply(&self, world: &mut KinematicWorld) {
        match *self {
            PhysicsInteraction::Impulse { body, impulse, .. } => world.apply_impulse(body, impulse),
            PhysicsInteraction::Force { body, force, .. } => world.apply_force(body, force),
        }
    }
}

impl MovementSolver {
    /// Queue an impulse (kilogram meters per second) for the next update. With
    /// `velocity_change` the impulse is a velocity and ignores mass.
    pub fn add_impulse(&mut self, impulse: Vec3, velocity_change: bool) {
        if is_nearly_zero(impulse, SMALL_NUMBER) || !self.state.is_active() {
            return;
        }
        if velocity_change {
            self.pending_impulse += impulse;
        } else if self.settings.mass > SMALL_NUMBER {
            self.pending_impulse += impulse / self.settings.mass;
        }
    }

    /// Queue a force (newtons) integrated over the next update.
    pub fn add_force(&mut self, force: Vec3) {
        if is_nearly_zero(force, SMALL_NUMBER) || !self.state.is_active() {
            return;
        }
        if self.settings.mass > SMALL_NUMBER {
            self.pending_force += force / self.settings.mass;
        }
    }

    /// Impulse away from `origin`, scaled by `falloff` inside `radius`.
    pub fn add_radial_impulse(
        &mut self,
        origin: Vec3,
        radius: f32,
        strength: f32,
        falloff: RadialFalloff,
        velocity_change: bool,
    ) {
        if let Some(impulse) = self.radial_vector(origin, radius, strength, falloff) {
            self.add_impulse(impulse, velocity_change);
        }
    }

    /// Force away from `origin`, scaled by `falloff` inside `radius`.
    pub fn add_radial_force(&mut self, origin: Vec3, radius: f32, strength: f32, falloff: RadialFalloff) {
        if let Some(force) = self.radial_vector(origin, radius, strength, falloff) {
            self.add_force(force);
        }
    }

    fn radial_vector(&self, origin: Vec3, radius: f32, strength: f32, falloff: RadialFalloff) -> Option<Vec3> {
        let delta = self.location - origin;
        let dist = delta.norm();
        if dist > radius {
            return None;
        }
        let magnitude = match falloff {
            RadialFalloff::Linear if radius > 0.0 => strength * (1.0 - dist / radius),
            _ => strength,
        };
        Some(safe_normal(delta) * magnitude)
    }

    /// Replace the velocity with `velocity` at the start of the next update.
    pub fn launch(&mut self, velocity: Vec3) {
        if self.state.is_active() {
            self.pending_launch = velocity;
        }
    }

    pub fn clear_accumulated_forces(&mut self) {
        self.pending_impulse = Vec3::zeros();
        self.pending_force = Vec3::zeros();
        self.pending_launch = Vec3::zeros();
    }

    /// Integrate queued impulses and forces, lifting off when they beat gravity.
    pub(crate) fn apply_accumulated_forces(&mut self, ctx: &mut MoveContext<'_>, dt: f32) {
        let vertical_impulse = self.pending_impulse.dot(&up());
        let vertical_force = self.pending_force.dot(&up());
        if (vertical_impulse != 0.0 || vertical_force != 0.0) && self.is_moving_on_ground() {
            let lift = vertical_impulse + vertical_force * dt - self.gravity_magnitude() * dt;
            if lift > SMALL_NUMBER {
                self.set_state(ctx, MovementState::Falling);
            }
        }

        self.velocity += self.pending_impulse + self.pending_force * dt;
        self.pending_impulse = Vec3::zeros();
        self.pending_force = Vec3::zeros();
    }

    /// Apply a queued launch. Returns true when one was pending.
    pub(crate) fn handle_pending_launch(&mut self, ctx: &mut MoveContext<'_>) -> bool {
        if is_nearly_zero(self.pending_launch, SMALL_NUMBER) {
            return false;
        }
        self.velocity = self.pending_launch;
        self.pending_launch = Vec3::zeros();
        if self.is_moving_on_ground() && self.velocity.dot(&up()) > 0.0 {
            self.set_state(ctx, MovementState::Falling);
        }
        true
    }

    /// Take every physics effect produced since the last drain.
    pub fn drain_physics_interactions(&mut self) -> Vec<PhysicsInteraction> {
        std::mem::take(&mut self.physics_outbox)
    }

    /// Push the body the character ran into.
    ///
    /// Algorithm:
    /// 1) Only blocking hits on dynamic bodies are considered.
    /// 2) The push is along `-impact_normal`, optionally scaled by how much the body already
    ///    moves along the character's velocity and by the body's mass.
    /// 3) A resting body gets an impulse; a moving one gets a continuous force.
    pub(crate) fn apply_impact_physics_forces(
        &mut self,
        world: &dyn CollisionWorld,
        hit: &SweepHit,
        acceleration: Vec3,
        velocity: Vec3,
    ) {
        if !hit.blocking {
            return;
        }
        let Some(body_id) = hit.body else {
            return;
        };
        let Some(body) = world.body_state(body_id) else {
            return;
        };
        let BodyKind::Dynamic { mass } = body.kind else {
            return;
        };
        let body_mass = mass.max(1.0);

        let point = if self.settings.push_force_using_vertical_offset {
            body.pose.translation.vector
                + up() * (body.half_extents.y * self.settings.push_force_point_vertical_offset_factor)
        } else {
            hit.impact_point
        };

        let mut force = -hit.impact_normal;
        let mut modifier = 1.0;

        let body_velocity = body.linear_velocity;
        let virtual_velocity = if is_nearly_zero(acceleration, SMALL_NUMBER) {
            velocity
        } else {
            safe_normal(acceleration) * project_onto_normal(velocity, up()).norm()
        };

        if self.settings.scale_push_force_to_velocity && !is_nearly_zero(body_velocity, SMALL_NUMBER) {
            let dot = body_velocity.dot(&virtual_velocity);
            if dot > 0.0 && dot < 1.0 {
                modifier *= dot;
            }
        }
        if self.settings.push_force_scaled_to_mass {
            modifier *= body_mass;
        }
        force *= modifier;

        let interaction = if body_velocity.norm() <= RESTING_BODY_SPEED_TOLERANCE {
            PhysicsInteraction::Impulse {
                body: body_id,
                impulse: force * self.settings.initial_push_force_factor,
                point,
            }
        } else {
            PhysicsInteraction::Force {
                body: body_id,
                force: force * self.settings.push_force_factor,
                point,
            }
        };
        self.physics_outbox.push(interaction);
    }

    /// Press the character's weight onto a dynamic floor.
    pub(crate) fn apply_downward_force(&mut self, world: &dyn CollisionWorld) {
        let scale = self.settings.standing_downward_force_scale;
        if scale == 0.0 || !self.current_floor.hit.is_valid_blocking_hit() {
            return;
        }
        let Some(body_id) = self.current_floor.hit.body else {
            return;
        };
        let Some(body) = world.body_state(body_id) else {
            return;
        };
        if !matches!(body.kind, BodyKind::Dynamic { .. }) {
            return;
        }
        let gravity = self.gravity();
        if is_nearly_zero(gravity, SMALL_NUMBER) {
            return;
        }
        self.physics_outbox.push(PhysicsInteraction::Force {
            body: body_id,
            force: gravity * self.settings.mass * scale,
            point: self.current_floor.hit.impact_point,
        });
    }
}
