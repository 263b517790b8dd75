use crate::collision::CollisionWorld;
use crate::constants::KINDA_SMALL_NUMBER;
use crate::math::{Quat, Vec3, angle_between_deg, is_nearly_zero, planar, up};

use super::callbacks::MoveContext;
use super::floor::GroundingStatus;
use super::solver::MovementSolver;
use super::state::MovementState;

impl MovementSolver {
    /// Whether moving from `old_floor` onto `new_floor` bends sharply enough to leave the ground.
    ///
    /// Notes
    /// - Cresting a hill while moving up, or tipping over an edge while moving down, are the
    ///   only cases that can catch air; the other two combinations keep the character grounded.
    /// - Disabled below `min_velocity_for_denivelation`.
    pub(crate) fn should_catch_air(&self, old_floor: &GroundingStatus, new_floor: &GroundingStatus) -> bool {
        let settings = &self.settings;
        if !settings.ledge_and_denivelation_handling || !old_floor.walkable_floor {
            return false;
        }
        let min_speed = settings.min_velocity_for_denivelation;
        if self.velocity.norm_squared() < min_speed * min_speed {
            return false;
        }

        let old_normal = old_floor.hit.impact_normal;
        let new_normal = new_floor.hit.impact_normal;
        let reference = self.stability_up();
        let flattening = old_normal.dot(&reference) < new_normal.dot(&reference);
        let rising = self.velocity.dot(&reference) > 0.0;
        if flattening != rising {
            return false;
        }

        let angle = angle_between_deg(old_normal, new_normal);
        let limit = if flattening {
            settings.max_stable_upwards_denivelation_angle
        } else {
            settings.max_stable_downwards_denivelation_angle
        };
        angle >= limit
    }

    /// Sideways move that keeps the character on a supported floor instead of walking off.
    ///
    /// Tries the direction perpendicular to `delta` on each side; zero when neither is supported.
    pub(crate) fn ledge_move(&self, world: &dyn CollisionWorld, old_location: Vec3, delta: Vec3) -> Vec3 {
        let horizontal = planar(delta);
        if is_nearly_zero(horizontal, KINDA_SMALL_NUMBER * KINDA_SMALL_NUMBER) {
            return Vec3::zeros();
        }
        let side = Vec3::new(horizontal.z, 0.0, -horizontal.x);
        if self.check_ledge_direction(world, old_location, side) {
            return side;
        }
        if self.check_ledge_direction(world, old_location, -side) {
            return -side;
        }
        Vec3::zeros()
    }

    /// A side step is supported when it is free and a stable floor lies within step reach below.
    pub(crate) fn check_ledge_direction(&self, world: &dyn CollisionWorld, old_location: Vec3, side_step: Vec3) -> bool {
        let shape = self.capsule().into();
        let dest = old_location + side_step;
        let mut hit = world.sweep(&shape, Quat::identity(), old_location, dest, &self.move_filter);
        if hit.blocking && !self.is_floor_stable(world, &hit) {
            return false;
        }
        if !hit.blocking {
            let reach = self.settings.max_step_height + self.settings.ledge_check_threshold;
            hit = world.sweep(&shape, Quat::identity(), dest, dest - up() * reach, &self.move_filter);
        }
        hit.time < 1.0 && self.is_floor_stable(world, &hit)
    }

    /// Tell the host the character left its floor.
    pub(crate) fn handle_walking_off_ledge(
        &mut self,
        ctx: &mut MoveContext<'_>,
        previous_impact_normal: Vec3,
        previous_normal: Vec3,
        previous_location: Vec3,
        dt: f32,
    ) {
        log::debug!("walking off ledge at {previous_location:?}");
        ctx.callbacks
            .on_walking_off_ledge(previous_impact_normal, previous_normal, previous_location, dt);
    }

    /// Start falling when ungrounding is forced or allowed. Returns true when the tick was handed
    /// off to the fall.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn check_fall(
        &mut self,
        ctx: &mut MoveContext<'_>,
        old_floor: &GroundingStatus,
        delta: Vec3,
        old_location: Vec3,
        remaining_time: f32,
        iter_tick: f32,
        iterations: u32,
        must_unground: bool,
    ) -> bool {
        if !must_unground && !self.settings.can_walk_off_ledges {
            return false;
        }
        self.handle_walking_off_ledge(
            ctx,
            old_floor.hit.impact_normal,
            old_floor.hit.normal,
            old_location,
            iter_tick,
        );
        if self.is_moving_on_ground() {
            self.start_falling(ctx, iterations, remaining_time, iter_tick, delta, old_location);
        }
        true
    }

    /// Switch to falling and spend the part of the substep the ground move did not use.
    pub(crate) fn start_falling(
        &mut self,
        ctx: &mut MoveContext<'_>,
        iterations: u32,
        remaining_time: f32,
        iter_tick: f32,
        delta: Vec3,
        substep_start: Vec3,
    ) {
        let desired = delta.norm();
        let actual = planar(self.location - substep_start).norm();
        let remaining = if desired < KINDA_SMALL_NUMBER {
            0.0
        } else {
            remaining_time + iter_tick * (1.0 - (actual / desired).min(1.0))
        };

        if self.is_moving_on_ground() {
            self.set_state(ctx, MovementState::Falling);
        }
        self.start_movement_tick(ctx, remaining, iterations);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collision::{KinematicWorld, SweepHit, cuboid_def};
    use crate::movement::MovementSettings;

    fn floor_with_normal(normal: Vec3) -> GroundingStatus {
        GroundingStatus {
            blocking_hit: true,
            walkable_floor: true,
            hit: SweepHit {
                blocking: true,
                normal,
                impact_normal: normal,
                ..SweepHit::default()
            },
            ..GroundingStatus::default()
        }
    }

    #[test]
    fn cresting_a_ramp_catches_air_past_upward_limit() {
        let settings = MovementSettings {
            max_stable_upwards_denivelation_angle: 20.0,
            max_stable_downwards_denivelation_angle: 20.0,
            ..Default::default()
        };
        let mut solver = MovementSolver::new(settings, Vec3::zeros(), Quat::identity());
        let ramp = floor_with_normal(Vec3::new(-0.5, 0.866, 0.0));
        let flat = floor_with_normal(Vec3::y());

        // Going up the ramp onto flat ground: 30 degrees of flattening.
        solver.velocity = Vec3::new(5.0, 2.0, 0.0);
        assert!(solver.should_catch_air(&ramp, &flat));

        // Same geometry while moving down: stays grounded.
        solver.velocity = Vec3::new(-5.0, -2.0, 0.0);
        assert!(!solver.should_catch_air(&ramp, &flat));

        // Coming from the air the old floor is not walkable.
        solver.velocity = Vec3::new(5.0, 2.0, 0.0);
        let mut airborne = ramp;
        airborne.walkable_floor = false;
        assert!(!solver.should_catch_air(&airborne, &flat));
    }

    #[test]
    fn default_denivelation_limits_never_unground() {
        let mut solver = MovementSolver::new(MovementSettings::default(), Vec3::zeros(), Quat::identity());
        solver.velocity = Vec3::new(5.0, -1.0, 0.0);
        let flat = floor_with_normal(Vec3::y());
        let steep = floor_with_normal(Vec3::new(0.707, 0.707, 0.0));
        assert!(!solver.should_catch_air(&flat, &steep));
    }

    #[test]
    fn ledge_move_slides_along_platform_edge() {
        // Platform top at y = 0 covering z <= 0.
        let world = KinematicWorld::build(vec![cuboid_def(
            1,
            Vec3::new(5.0, 0.5, 2.5),
            Vec3::new(0.0, -0.5, -2.5),
            Quat::identity(),
        )]);
        let location = Vec3::new(0.0, 0.9215, -0.2);
        let solver = MovementSolver::new(MovementSettings::default(), location, Quat::identity());
        let side = solver.ledge_move(&world, location, Vec3::new(0.0, 0.0, 0.5));
        assert!((side.norm() - 0.5).abs() < 1.0e-5);
        assert!(side.z.abs() < 1.0e-5);
    }

    #[test]
    fn ledge_move_on_pillar_has_nowhere_to_go() {
        let world = KinematicWorld::build(vec![cuboid_def(
            1,
            Vec3::new(0.3, 0.5, 0.3),
            Vec3::new(0.0, -0.5, 0.0),
            Quat::identity(),
        )]);
        let location = Vec3::new(0.0, 0.9215, 0.0);
        let solver = MovementSolver::new(MovementSettings::default(), location, Quat::identity());
        let side = solver.ledge_move(&world, location, Vec3::new(1.0, 0.0, 0.0));
        assert_eq!(side, Vec3::zeros());
    }
}
