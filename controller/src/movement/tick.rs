/*!
Per-state substep loops.

`start_movement_tick` splits the update into substeps bounded by `max_simulation_time_step` and
`max_simulation_iterations`, and dispatches on the movement state. A state change inside a loop
hands the unused time to the loop of the new state with the same iteration budget.

Substep order (every state):
1) Undo last substep's additive root motion.
2) Ask the velocity callback for a velocity, unless root motion overrides it.
3) Fold root motion into the velocity.
4) Sweep the capsule and resolve what it hit.
5) Recompute the velocity from the distance actually travelled.
*/

use crate::collision::{BodyId, BodyKind, CollisionWorld, SweepHit};
use crate::constants::{
    KINDA_SMALL_NUMBER, MAX_FLOOR_DIST, MIN_TICK_TIME, STUCK_SIDE_STEP_DISTANCE,
    VERTICAL_SLOPE_NORMAL_Y,
};
use crate::math::{
    Vec3, clamp_to_max_size, is_nearly_zero, plane_project, planar, safe_normal, up,
};

use super::callbacks::{MoveContext, VelocityContext};
use super::floor::{GroundingStatus, StepDownResult};
use super::solver::MovementSolver;
use super::state::MovementState;

impl MovementSolver {
    /// Length of the next substep.
    ///
    /// Long remainders are halved while iterations remain so the last substeps are not huge.
    pub(crate) fn simulation_time_step(&self, remaining_time: f32, iterations: u32) -> f32 {
        let mut remaining = remaining_time;
        if remaining > self.settings.max_simulation_time_step
            && iterations < self.settings.max_simulation_iterations
        {
            remaining = self.settings.max_simulation_time_step.min(remaining * 0.5);
        }
        remaining.max(MIN_TICK_TIME)
    }

    pub(crate) fn start_movement_tick(&mut self, ctx: &mut MoveContext<'_>, dt: f32, iterations: u32) {
        if dt < MIN_TICK_TIME || iterations >= self.settings.max_simulation_iterations {
            return;
        }
        if self.simulated_velocity.is_some() {
            return;
        }
        match self.state {
            MovementState::None => {}
            MovementState::Grounded => self.ground_tick(ctx, dt, iterations),
            MovementState::Falling => self.air_tick(ctx, dt, iterations),
            MovementState::General => self.general_tick(ctx, dt, iterations),
        }
    }

    /// Run the host's velocity callback for one substep.
    pub(crate) fn calculate_velocity(&mut self, ctx: &mut MoveContext<'_>, dt: f32) {
        let mut velocity_ctx = VelocityContext {
            velocity: self.velocity,
            gravity: self.gravity(),
            state: self.state,
            floor: self.current_floor,
            location: self.location,
            rotation: self.rotation,
            dt,
            requested_state: None,
        };
        ctx.callbacks.calculate_velocity(&mut velocity_ctx);
        debug_assert!(
            velocity_ctx.velocity.iter().all(|c| c.is_finite()),
            "velocity callback produced {:?}",
            velocity_ctx.velocity
        );
        self.velocity = velocity_ctx.velocity;
        if let Some(state) = velocity_ctx.requested_state {
            self.set_state(ctx, state);
        }
    }

    /// Velocity callback and root motion for one substep.
    fn update_substep_velocity(&mut self, ctx: &mut MoveContext<'_>, iter_tick: f32) {
        if !self.has_root_motion_override() {
            self.calculate_velocity(ctx, iter_tick);
        }
        self.apply_root_motion_to_velocity(ctx, iter_tick);
    }

    fn ground_tick(&mut self, ctx: &mut MoveContext<'_>, dt: f32, mut iterations: u32) {
        if dt < MIN_TICK_TIME {
            return;
        }

        self.just_teleported = false;
        let mut checked_fall = false;
        let mut tried_ledge_move = false;
        let mut remaining = dt;

        while remaining >= MIN_TICK_TIME && iterations < self.settings.max_simulation_iterations {
            iterations += 1;
            self.just_teleported = false;
            let iter_tick = self.simulation_time_step(remaining, iterations);
            remaining -= iter_tick;

            let old_base = self.based.base;
            let old_base_location = old_base
                .and_then(|id| ctx.world.body_state(id))
                .map(|b| b.pose.translation.vector);
            let old_location = self.location;
            let previous_floor = self.current_floor;

            self.restore_pre_additive_root_motion_velocity();
            self.maintain_horizontal_ground_velocity();
            self.update_substep_velocity(ctx, iter_tick);

            // The velocity callback or root motion may have lifted us off.
            if !self.is_moving_on_ground() {
                self.start_movement_tick(ctx, remaining + iter_tick, iterations - 1);
                return;
            }

            let delta = self.velocity * iter_tick;
            let zero_delta = is_nearly_zero(delta, KINDA_SMALL_NUMBER);
            let mut step_down = StepDownResult::default();

            if zero_delta {
                remaining = 0.0;
            } else {
                self.move_along_floor(ctx, iter_tick, &mut step_down);

                if !self.is_moving_on_ground() {
                    let desired = delta.norm();
                    if desired > KINDA_SMALL_NUMBER {
                        let actual = (self.location - old_location).norm();
                        remaining += iter_tick * (1.0 - (actual / desired).min(1.0));
                    }
                    self.start_movement_tick(ctx, remaining, iterations);
                    return;
                }
            }

            if step_down.computed_floor {
                self.current_floor = step_down.floor;
            } else {
                let location = self.location;
                self.current_floor = self.find_floor(ctx.world, location, zero_delta, None);
            }

            let check_ledges = !self.settings.can_walk_off_ledges;
            if check_ledges && !self.current_floor.is_walkable_floor() {
                let new_delta = if tried_ledge_move {
                    Vec3::zeros()
                } else {
                    self.ledge_move(ctx.world, old_location, delta)
                };

                if new_delta != Vec3::zeros() {
                    self.revert_move(ctx.world, old_location, old_base, old_base_location, &previous_floor, false);
                    tried_ledge_move = true;
                    self.velocity = new_delta / iter_tick;
                    remaining += iter_tick;
                    continue;
                }

                let must_unground = zero_delta || self.base_lost(ctx.world, old_base);
                if (must_unground || !checked_fall)
                    && self.check_fall(
                        ctx,
                        &previous_floor,
                        delta,
                        old_location,
                        remaining,
                        iter_tick,
                        iterations,
                        must_unground,
                    )
                {
                    return;
                }

                self.revert_move(ctx.world, old_location, old_base, old_base_location, &previous_floor, true);
                break;
            }

            if self.current_floor.is_walkable_floor() {
                if self.should_catch_air(&previous_floor, &self.current_floor) {
                    self.handle_walking_off_ledge(
                        ctx,
                        previous_floor.hit.impact_normal,
                        previous_floor.hit.normal,
                        old_location,
                        iter_tick,
                    );
                    if self.is_moving_on_ground() {
                        self.start_falling(ctx, iterations, remaining, iter_tick, delta, old_location);
                    }
                    return;
                }

                self.adjust_floor_height(ctx.world);
                self.set_base_from_floor(ctx.world);
            } else if self.current_floor.hit.start_penetrating && remaining <= 0.0 {
                // The floor probe started inside the floor; pop up out of it instead.
                let mut hit = self.current_floor.hit;
                hit.trace_end = hit.trace_start + up() * MAX_FLOOR_DIST;
                let adjustment = self.penetration_adjustment(&hit);
                self.resolve_penetration(ctx.world, adjustment, &hit);
                self.force_next_floor_check = true;
            }

            if !self.current_floor.is_walkable_floor() && !self.current_floor.hit.start_penetrating {
                let must_unground =
                    self.just_teleported || zero_delta || self.base_lost(ctx.world, old_base);
                if (must_unground || !checked_fall)
                    && self.check_fall(
                        ctx,
                        &previous_floor,
                        delta,
                        old_location,
                        remaining,
                        iter_tick,
                        iterations,
                        must_unground,
                    )
                {
                    return;
                }
                checked_fall = true;
            }

            if self.is_moving_on_ground()
                && !self.just_teleported
                && !self.has_root_motion_override()
                && iter_tick >= MIN_TICK_TIME
            {
                self.recalculate_velocity_to_reflect_move(old_location, iter_tick);
            }

            if self.location == old_location {
                break;
            }
        }

        if self.is_moving_on_ground() {
            self.maintain_horizontal_ground_velocity();
        }
    }

    /// No base, or a movable base that stopped colliding.
    fn base_lost(&self, world: &dyn CollisionWorld, old_base: Option<BodyId>) -> bool {
        let Some(id) = old_base else {
            return true;
        };
        world
            .body_state(id)
            .is_none_or(|b| !b.collision_enabled && b.kind.is_movable())
    }

    fn air_tick(&mut self, ctx: &mut MoveContext<'_>, dt: f32, mut iterations: u32) {
        if dt < MIN_TICK_TIME {
            return;
        }
        let mut remaining = dt;

        while remaining >= MIN_TICK_TIME && iterations < self.settings.max_simulation_iterations {
            iterations += 1;
            self.just_teleported = false;
            let iter_tick = self.simulation_time_step(remaining, iterations);
            remaining -= iter_tick;

            let velocity_with_root_motion = self.velocity;
            self.restore_pre_additive_root_motion_velocity();
            let old_velocity = self.velocity;

            self.update_substep_velocity(ctx, iter_tick);
            self.decay_former_base_velocity(iter_tick);

            if !self.is_falling() {
                self.start_movement_tick(ctx, remaining + iter_tick, iterations - 1);
                return;
            }

            // Trapezoidal step; reduces to velocity * dt without root motion.
            let mut adjusted = (velocity_with_root_motion + self.velocity) * 0.5 * iter_tick;
            let mut hit = self.safe_move(ctx.world, adjusted);

            let mut sub_time_remaining = iter_tick * (1.0 - hit.time);

            if !hit.blocking {
                // Only valid while the hit that set it is being resolved.
                self.current_floor.blocking_hit = false;
                self.current_floor.unstable_floor = false;
                continue;
            }

            let location = self.location;
            if self.is_valid_landing_spot(ctx.world, location, &hit) {
                remaining += sub_time_remaining;
                self.process_landed(ctx, &hit, remaining, iterations);
                return;
            }

            adjusted = self.velocity * iter_tick;

            // An edge under the lower hemisphere may still have a floor on top of it.
            if !hit.start_penetrating && self.should_check_for_valid_landing_spot(&hit) {
                let floor = self.find_floor(ctx.world, location, false, None);
                if floor.is_walkable_floor() && self.is_valid_landing_spot(ctx.world, location, &floor.hit) {
                    remaining += sub_time_remaining;
                    self.process_landed(ctx, &hit, remaining, iterations);
                    return;
                }
                self.current_floor.blocking_hit = true;
                self.current_floor.unstable_floor = true;
            }

            self.handle_impact(ctx, &hit);

            let old_hit_normal = hit.normal;
            let old_hit_impact_normal = hit.impact_normal;
            let mut delta = self.compute_slide_vector(adjusted, 1.0 - hit.time, old_hit_normal);

            let dynamic_body = hit
                .body
                .and_then(|id| ctx.world.body_state(id))
                .filter(|b| matches!(b.kind, BodyKind::Dynamic { .. }));
            if let Some(body) = dynamic_body
                && !is_nearly_zero(self.velocity, KINDA_SMALL_NUMBER)
            {
                let contact_velocity = body.velocity_at_point(hit.impact_point);
                let new_velocity = self.velocity
                    - hit.impact_normal * (self.velocity - contact_velocity).dot(&hit.impact_normal);
                self.velocity = self.keep_root_motion_planar_velocity(new_velocity);
            } else if sub_time_remaining > KINDA_SMALL_NUMBER && !self.just_teleported {
                self.velocity = self.keep_root_motion_planar_velocity(delta / sub_time_remaining);
            }

            if sub_time_remaining <= KINDA_SMALL_NUMBER || delta.dot(&adjusted) <= 0.0 {
                continue;
            }

            hit = self.safe_move(ctx.world, delta);
            if !hit.blocking {
                continue;
            }

            // Second wall.
            let last_move_time_slice = sub_time_remaining;
            sub_time_remaining *= 1.0 - hit.time;

            let location = self.location;
            if self.is_valid_landing_spot(ctx.world, location, &hit) {
                remaining += sub_time_remaining;
                self.process_landed(ctx, &hit, remaining, iterations);
                return;
            }

            self.handle_impact(ctx, &hit);

            if hit.normal.dot(&up()) > VERTICAL_SLOPE_NORMAL_Y {
                let last_move_delta = old_velocity * last_move_time_slice;
                delta = self.compute_slide_vector(last_move_delta, 1.0, old_hit_normal);
            }
            delta = self.two_wall_adjust(delta, &hit, old_hit_normal);

            if sub_time_remaining > KINDA_SMALL_NUMBER && !self.just_teleported {
                self.velocity = self.keep_root_motion_planar_velocity(delta / sub_time_remaining);
            }

            // Straddling two slopes, neither of which can be stood on.
            let ditch = old_hit_impact_normal.dot(&up()) > 0.0
                && hit.impact_normal.dot(&up()) > 0.0
                && delta.dot(&up()).abs() <= KINDA_SMALL_NUMBER
                && hit.impact_normal.dot(&old_hit_impact_normal) < 0.0;

            hit = self.safe_move(ctx.world, delta);
            if hit.time == 0.0 {
                let mut side = safe_normal(plane_project(old_hit_normal + hit.impact_normal, up()));
                if is_nearly_zero(side, KINDA_SMALL_NUMBER) {
                    side = safe_normal(Vec3::new(old_hit_normal.z, 0.0, -old_hit_normal.x));
                }
                hit = self.safe_move(ctx.world, side * STUCK_SIDE_STEP_DISTANCE);
            }

            let location = self.location;
            if ditch || self.is_valid_landing_spot(ctx.world, location, &hit) || hit.time == 0.0 {
                self.process_landed(ctx, &hit, 0.0, iterations);
                return;
            }
        }
    }

    /// While root motion drives the planar velocity, keep it and take only the vertical part.
    fn keep_root_motion_planar_velocity(&self, new_velocity: Vec3) -> Vec3 {
        if self.has_anim_root_motion() || self.root_motion.has_override_velocity_ignore_z() {
            planar(self.velocity) + up() * new_velocity.dot(&up())
        } else {
            new_velocity
        }
    }

    fn general_tick(&mut self, ctx: &mut MoveContext<'_>, dt: f32, mut iterations: u32) {
        if dt < MIN_TICK_TIME {
            return;
        }
        self.just_teleported = false;
        let mut remaining = dt;

        while remaining >= MIN_TICK_TIME && iterations < self.settings.max_simulation_iterations {
            iterations += 1;
            self.just_teleported = false;
            let iter_tick = self.simulation_time_step(remaining, iterations);
            remaining -= iter_tick;

            self.restore_pre_additive_root_motion_velocity();
            self.update_substep_velocity(ctx, iter_tick);

            if self.state != MovementState::General {
                self.start_movement_tick(ctx, remaining + iter_tick, iterations - 1);
                return;
            }

            let old_location = self.location;
            let delta = self.velocity * iter_tick;
            let mut hit = self.safe_move(ctx.world, delta);
            if hit.time < 1.0 {
                let mut step_down = StepDownResult::default();
                let stepped = hit.is_valid_blocking_hit()
                    && self.can_step_up(ctx.world, &hit)
                    && self.step_up(ctx, &hit, delta * (1.0 - hit.time), &mut step_down);
                if stepped {
                    self.just_teleported = true;
                } else {
                    self.handle_impact(ctx, &hit);
                    let normal = hit.normal;
                    self.slide_along_surface(ctx, delta, 1.0 - hit.time, normal, &mut hit, true);
                }
            }

            if !self.just_teleported && !self.has_root_motion_override() && iter_tick >= MIN_TICK_TIME {
                if self.current_floor.walkable_floor {
                    self.recalculate_velocity_to_reflect_move(old_location, iter_tick);
                } else {
                    self.velocity = (self.location - old_location) / iter_tick;
                }
            }

            if self.location == old_location {
                break;
            }
        }
    }

    /// Move along the current floor by `velocity * dt`, stepping up or sliding on blocks.
    pub(crate) fn move_along_floor(&mut self, ctx: &mut MoveContext<'_>, dt: f32, step_down: &mut StepDownResult) {
        if !self.current_floor.is_walkable_floor() {
            return;
        }

        let delta = self.velocity * dt;
        let mut hit = self.safe_move(ctx.world, delta);

        if hit.start_penetrating {
            // Deflect off the overlap rather than hitching in place.
            self.handle_impact(ctx, &hit);
            let normal = hit.normal;
            self.slide_along_surface(ctx, delta, 1.0, normal, &mut hit, true);
            if hit.start_penetrating {
                self.on_stuck_in_geometry(ctx, &hit);
            }
            return;
        }

        if !hit.is_valid_blocking_hit() {
            return;
        }

        let time_applied = hit.time;
        let hit_base = self.based.base.is_some() && hit.body == self.based.base;
        if self.can_step_up(ctx.world, &hit) || hit_base {
            let pre_step_location = self.location;
            if self.step_up(ctx, &hit, delta * (1.0 - time_applied), step_down) {
                self.just_teleported = true;
                let step_time_slice = (1.0 - time_applied) * dt;
                if !self.has_anim_root_motion() && step_time_slice > KINDA_SMALL_NUMBER {
                    self.recalculate_velocity_to_reflect_move(pre_step_location, step_time_slice);
                }
                return;
            }
        }

        self.handle_impact(ctx, &hit);
        let normal = hit.normal;
        self.slide_along_surface(ctx, delta, 1.0 - time_applied, normal, &mut hit, true);
    }

    /// Land on `hit` and continue the tick on the ground.
    pub(crate) fn process_landed(&mut self, ctx: &mut MoveContext<'_>, hit: &SweepHit, remaining_time: f32, iterations: u32) {
        log::debug!("landed on {:?} at {:?}", hit.body, self.location);
        ctx.callbacks.on_landed(hit);
        self.root_motion.finish_on_landed();

        if self.settings.enable_physics_interaction {
            let gravity = if self.is_falling() { self.gravity() } else { Vec3::zeros() };
            let acceleration = self.input_acceleration + gravity;
            let velocity = self.velocity;
            self.apply_impact_physics_forces(ctx.world, hit, acceleration, velocity);
        }

        if self.is_falling() {
            self.set_state(ctx, MovementState::Grounded);
        }
        self.start_movement_tick(ctx, remaining_time, iterations);
    }

    /// Undo a substep's move, restoring the floor and base when the base did not move.
    pub(crate) fn revert_move(
        &mut self,
        world: &dyn CollisionWorld,
        old_location: Vec3,
        old_base: Option<BodyId>,
        old_base_location: Option<Vec3>,
        old_floor: &GroundingStatus,
        fail_move: bool,
    ) {
        self.location = old_location;
        self.just_teleported = false;

        let base_unchanged = old_base
            .and_then(|id| world.body_state(id))
            .is_some_and(|b| !b.kind.is_movable() || Some(b.pose.translation.vector) == old_base_location);
        if base_unchanged {
            self.current_floor = *old_floor;
            self.set_base(world, old_base);
        } else {
            self.set_base(world, None);
        }

        if fail_move {
            self.velocity = Vec3::zeros();
            self.input_acceleration = Vec3::zeros();
        }
    }

    /// Project the velocity onto the floor, keeping its planar heading and magnitude.
    pub(crate) fn maintain_horizontal_ground_velocity(&mut self) {
        let speed = self.velocity.norm();
        let floor_normal = self.current_floor.hit.impact_normal;
        let projected = safe_normal(plane_project(self.velocity, floor_normal)) * speed;
        self.velocity = safe_normal(planar(self.velocity)) * planar(projected).norm()
            + up() * projected.dot(&up());
    }

    /// Velocity from the distance actually travelled, never faster than before the move.
    pub(crate) fn recalculate_velocity_to_reflect_move(&mut self, old_location: Vec3, dt: f32) {
        let previous_speed = self.velocity.norm();
        self.velocity = (self.location - old_location) / dt;
        self.maintain_horizontal_ground_velocity();
        self.velocity = clamp_to_max_size(self.velocity, previous_speed);
    }

    pub(crate) fn on_stuck_in_geometry(&mut self, ctx: &mut MoveContext<'_>, hit: &SweepHit) {
        log::warn!(
            "stuck in geometry: velocity {:?} location {:?} normal {:?} depth {:.4} body {:?}",
            self.velocity,
            hit.location,
            hit.normal,
            hit.penetration_depth,
            hit.body
        );
        ctx.callbacks.on_stuck_in_geometry(hit);
        // The failed move must not feed back into the velocity.
        self.just_teleported = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collision::{KinematicWorld, cuboid_def, plane_def};
    use crate::math::Quat;
    use crate::movement::{MovementCallbacks, MovementSettings, VelocityContext};

    const DT: f32 = 1.0 / 60.0;

    /// Ledge top at y = 1 covering x <= 0, ground plane at y = 0, and optionally a 45 degree
    /// ramp running down from the ledge edge to the ground at x = 1.
    fn ledge_world(with_ramp: bool) -> KinematicWorld {
        let mut bodies = vec![
            plane_def(1, Quat::identity(), Vec3::zeros()),
            cuboid_def(2, Vec3::new(5.0, 0.5, 5.0), Vec3::new(-5.0, 0.5, 0.0), Quat::identity()),
        ];
        if with_ramp {
            let tilt = Quat::from_axis_angle(&Vec3::z_axis(), -45f32.to_radians());
            let normal = tilt * Vec3::y();
            let thickness = 0.05;
            bodies.push(cuboid_def(
                3,
                Vec3::new(0.5 * 2f32.sqrt(), thickness, 5.0),
                Vec3::new(0.5, 0.5, 0.0) - normal * thickness,
                tilt,
            ));
        }
        KinematicWorld::build(bodies)
    }

    /// Walks at a fixed velocity and records state changes.
    struct Walker {
        desired: Vec3,
        transitions: Vec<(MovementState, MovementState)>,
        landings: usize,
    }

    impl Walker {
        fn new(desired: Vec3) -> Self {
            Self {
                desired,
                transitions: Vec::new(),
                landings: 0,
            }
        }
    }

    impl MovementCallbacks for Walker {
        fn calculate_velocity(&mut self, ctx: &mut VelocityContext) {
            match ctx.state {
                MovementState::Grounded => ctx.velocity = self.desired,
                MovementState::Falling => ctx.velocity += ctx.gravity * ctx.dt,
                _ => {}
            }
        }

        fn on_landed(&mut self, _hit: &SweepHit) {
            self.landings += 1;
        }

        fn on_movement_state_changed(&mut self, previous: MovementState, current: MovementState) {
            self.transitions.push((previous, current));
        }
    }

    fn standing_on_ledge(world: &KinematicWorld, settings: MovementSettings, x: f32) -> MovementSolver {
        let mut solver = MovementSolver::new(settings, Vec3::new(x, 1.0 + 0.9215, 0.0), Quat::identity());
        let mut idle = |_: &mut VelocityContext| {};
        solver.set_movement_state(world, &mut idle, MovementState::Grounded);
        assert!(solver.is_moving_on_ground());
        solver
    }

    #[test]
    fn sharp_downward_bend_catches_air_then_lands_flush() {
        let world = ledge_world(true);
        // The capsule rounds the crest a few degrees per tick; anything past 5 catches air.
        let settings = MovementSettings {
            max_stable_downwards_denivelation_angle: 5.0,
            ..Default::default()
        };
        let mut solver = standing_on_ledge(&world, settings, -1.0);
        let mut walker = Walker::new(Vec3::new(3.0, 0.0, 0.0));

        let mut fell_at = None;
        let mut landed_at = None;
        for tick in 0..180 {
            let was_falling = solver.is_falling();
            solver.perform_movement(&world, &mut walker, DT);
            if solver.is_falling() && fell_at.is_none() {
                fell_at = Some(tick);
                assert!(!solver.current_floor().is_walkable_floor());
                // Left at the crest instead of following the ramp down.
                assert!(solver.location().x < 0.5, "fell at x {}", solver.location().x);
                assert!(solver.location().y > 1.5);
            }
            if was_falling && solver.is_moving_on_ground() && landed_at.is_none() {
                landed_at = Some(tick);
                let normal = solver.current_floor().hit.impact_normal;
                assert!(
                    solver.velocity().dot(&normal).abs() < 0.05,
                    "v {:?} into floor {normal:?}",
                    solver.velocity()
                );
            }
        }

        assert!(fell_at.is_some());
        assert!(landed_at > fell_at);
        assert_eq!(
            walker.transitions.first(),
            Some(&(MovementState::Grounded, MovementState::Falling))
        );
        assert!(walker.transitions.contains(&(MovementState::Falling, MovementState::Grounded)));
        assert!(walker.landings >= 1);
        assert!(solver.is_moving_on_ground());
        assert!((solver.location().y - 0.9215).abs() < 0.01);
        assert!(solver.velocity().y.abs() < 1.0e-3);
    }

    #[test]
    fn walkable_ramp_within_bend_limits_stays_grounded() {
        let world = ledge_world(true);
        let mut solver = standing_on_ledge(&world, MovementSettings::default(), -1.0);
        let mut walker = Walker::new(Vec3::new(3.0, 0.0, 0.0));

        // Over the crest and most of the way down the ramp.
        for _ in 0..60 {
            if solver.location().x > 0.8 {
                break;
            }
            solver.perform_movement(&world, &mut walker, DT);
            assert!(solver.is_moving_on_ground(), "left the ground at x {}", solver.location().x);
        }
        assert!(solver.location().x > 0.8);
        assert!(solver.location().y < 1.5);
        assert!(walker.transitions.is_empty());
    }

    #[test]
    fn ledge_stops_walk_when_walking_off_is_disabled() {
        let world = ledge_world(false);
        let settings = MovementSettings {
            can_walk_off_ledges: false,
            ..Default::default()
        };
        let mut solver = standing_on_ledge(&world, settings, -1.0);
        let mut walker = Walker::new(Vec3::new(3.0, 0.0, 0.0));

        for _ in 0..60 {
            solver.perform_movement(&world, &mut walker, DT);
            assert!(solver.is_moving_on_ground());
        }
        // The rim may round the edge, the center never leaves the radius around it.
        assert!(solver.location().x > 0.0);
        assert!(solver.location().x < 0.4, "x {}", solver.location().x);
        assert!(solver.location().y > 1.5);
        assert!(walker.transitions.is_empty());
    }

    #[test]
    fn ledge_walk_off_disabled_redirects_along_the_edge() {
        let world = ledge_world(false);
        let settings = MovementSettings {
            can_walk_off_ledges: false,
            ..Default::default()
        };
        let mut solver = standing_on_ledge(&world, settings, -0.5);
        let mut walker = Walker::new(Vec3::new(3.0, 0.0, 0.3));

        for _ in 0..60 {
            solver.perform_movement(&world, &mut walker, DT);
            assert!(solver.is_moving_on_ground());
        }
        assert!(solver.location().x < 0.4);
        // Walking straight would drift 0.3 along z; the edge slide covers much more.
        assert!(solver.location().z.abs() > 0.5, "z {}", solver.location().z);
    }

    #[test]
    fn walking_off_is_allowed_by_default() {
        let world = ledge_world(false);
        let mut solver = standing_on_ledge(&world, MovementSettings::default(), -0.5);
        let mut walker = Walker::new(Vec3::new(3.0, 0.0, 0.0));

        for _ in 0..120 {
            solver.perform_movement(&world, &mut walker, DT);
        }
        assert_eq!(
            walker.transitions,
            vec![
                (MovementState::Grounded, MovementState::Falling),
                (MovementState::Falling, MovementState::Grounded),
            ]
        );
        assert!(solver.is_moving_on_ground());
        assert!((solver.location().y - 0.9215).abs() < 0.01);
    }

    #[test]
    fn long_steps_are_halved_until_the_last_iteration() {
        let solver = MovementSolver::new(MovementSettings::default(), Vec3::zeros(), Quat::identity());
        // 0.2 s with a 0.05 s cap: capped while iterations remain.
        assert!((solver.simulation_time_step(0.2, 1) - 0.05).abs() < 1.0e-6);
        // 0.08 s halves to 0.04 s.
        assert!((solver.simulation_time_step(0.08, 1) - 0.04).abs() < 1.0e-6);
        // Out of iterations: take everything that is left.
        assert!((solver.simulation_time_step(0.2, 8) - 0.2).abs() < 1.0e-6);
        // Never below the minimum tick.
        assert!(solver.simulation_time_step(0.0, 1) >= MIN_TICK_TIME);
    }

    #[test]
    fn ground_velocity_follows_ramp_without_gaining_speed() {
        let mut solver = MovementSolver::new(MovementSettings::default(), Vec3::zeros(), Quat::identity());
        let normal = Vec3::new(-0.5, 0.866, 0.0).normalize();
        solver.current_floor.hit.impact_normal = normal;
        solver.velocity = Vec3::new(3.0, 0.0, 0.0);
        solver.maintain_horizontal_ground_velocity();

        assert!(solver.velocity.dot(&normal).abs() < 1.0e-4);
        assert!((solver.velocity.norm() - 3.0).abs() < 1.0e-4);
        assert!(solver.velocity.y > 0.0);
    }

    #[test]
    fn recalculated_velocity_is_capped_by_previous_speed() {
        let mut solver = MovementSolver::new(MovementSettings::default(), Vec3::zeros(), Quat::identity());
        solver.current_floor.hit.impact_normal = Vec3::y();
        solver.velocity = Vec3::new(1.0, 0.0, 0.0);
        solver.location = Vec3::new(0.5, 0.2, 0.0);
        solver.recalculate_velocity_to_reflect_move(Vec3::zeros(), 0.1);

        assert!(solver.velocity.norm() <= 1.0 + 1.0e-5);
        assert!(solver.velocity.y.abs() < 1.0e-5);
    }
}
