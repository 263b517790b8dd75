/*!
Swept moves with penetration recovery, surface sliding and corner handling.

Every positional change of the character goes through `move_updated` (a single sweep) or
`safe_move` (a sweep that first pushes out of any overlap it starts in).

Notes
- Sliding on the ground never pushes the capsule up unwalkable slopes or down into the floor.
- While falling, slides are clamped so a slope never boosts the character higher than the move
  asked for.
*/

use crate::collision::{CollisionWorld, SweepHit};
use crate::constants::{
    KINDA_SMALL_NUMBER, MIN_FLOOR_DIST, PENETRATION_PULLBACK_DISTANCE, SAME_WALL_NUDGE,
};
use crate::math::{Quat, Vec3, clamp_to_max_size, is_nearly_zero, plane_project, safe_normal, up};

use super::callbacks::MoveContext;
use super::solver::MovementSolver;

impl MovementSolver {
    /// Sweep the capsule by `delta` and stop at the first blocking hit.
    pub(crate) fn move_updated(&mut self, world: &dyn CollisionWorld, delta: Vec3, rotation: Quat) -> SweepHit {
        if is_nearly_zero(delta, KINDA_SMALL_NUMBER * KINDA_SMALL_NUMBER) {
            self.rotation = rotation;
            return SweepHit::no_hit(self.location, self.location);
        }
        let hit = world.sweep(
            &self.capsule().into(),
            Quat::identity(),
            self.location,
            self.location + delta,
            &self.move_filter,
        );
        self.location = hit.location;
        self.rotation = rotation;
        hit
    }

    /// Sweep by `delta`, resolving a starting overlap and retrying once.
    pub(crate) fn safe_move(&mut self, world: &dyn CollisionWorld, delta: Vec3) -> SweepHit {
        let rotation = self.rotation;
        let mut hit = self.move_updated(world, delta, rotation);
        if hit.start_penetrating {
            let adjustment = self.penetration_adjustment(&hit);
            if self.resolve_penetration(world, adjustment, &hit) {
                hit = self.move_updated(world, delta, rotation);
            }
        }
        hit
    }

    /// Push-out vector for a start-penetrating hit, limited to `max_depenetration`.
    pub(crate) fn penetration_adjustment(&self, hit: &SweepHit) -> Vec3 {
        if !hit.start_penetrating {
            return Vec3::zeros();
        }
        let depth = if hit.penetration_depth > 0.0 {
            hit.penetration_depth
        } else {
            PENETRATION_PULLBACK_DISTANCE
        };
        let adjustment = hit.normal * (depth + PENETRATION_PULLBACK_DISTANCE);
        clamp_to_max_size(adjustment, self.settings.max_depenetration)
    }

    /// Try to move out of an overlap. Returns true when the capsule moved.
    ///
    /// Algorithm:
    /// 1) Teleport by `adjustment` when that spot is free.
    /// 2) Otherwise sweep by `adjustment`.
    /// 3) Still stuck: combine with the push-out of whatever blocked the sweep.
    /// 4) Last resort: sweep by `adjustment` plus the originally requested move.
    pub(crate) fn resolve_penetration(
        &mut self,
        world: &dyn CollisionWorld,
        adjustment: Vec3,
        hit: &SweepHit,
    ) -> bool {
        if is_nearly_zero(adjustment, KINDA_SMALL_NUMBER * KINDA_SMALL_NUMBER) {
            return false;
        }
        let rotation = self.rotation;
        let target = self.location + adjustment;
        let encroached = world
            .penetration(&self.capsule().into(), Quat::identity(), target, &self.move_filter)
            .is_some();

        let moved = if !encroached {
            self.location = target;
            true
        } else {
            let sweep = self.move_updated(world, adjustment, rotation);
            let mut moved = !sweep.start_penetrating;
            if !moved {
                let second = self.penetration_adjustment(&sweep);
                let combined = adjustment + second;
                if second != adjustment && !is_nearly_zero(combined, KINDA_SMALL_NUMBER * KINDA_SMALL_NUMBER) {
                    moved = !self.move_updated(world, combined, rotation).start_penetrating;
                }
            }
            if !moved {
                let move_delta = hit.trace_end - hit.trace_start;
                if !is_nearly_zero(move_delta, KINDA_SMALL_NUMBER * KINDA_SMALL_NUMBER) {
                    moved = !self
                        .move_updated(world, adjustment + move_delta, rotation)
                        .start_penetrating;
                }
            }
            moved
        };

        if moved {
            log::trace!("resolved penetration by {adjustment:?}");
        }
        self.just_teleported |= moved;
        moved
    }

    /// Notify the host of a blocking hit and push what was hit.
    pub(crate) fn handle_impact(&mut self, ctx: &mut MoveContext<'_>, hit: &SweepHit) {
        ctx.callbacks.on_move_blocked(hit);
        if self.settings.enable_physics_interaction {
            let gravity = if self.is_falling() { self.gravity() } else { Vec3::zeros() };
            let acceleration = self.input_acceleration + gravity;
            let velocity = self.velocity;
            self.apply_impact_physics_forces(ctx.world, hit, acceleration, velocity);
        }
    }

    /// `delta` projected onto the surface, scaled by the remaining `time`.
    pub(crate) fn compute_slide_vector(&self, delta: Vec3, time: f32, normal: Vec3) -> Vec3 {
        let result = plane_project(delta, normal) * time;
        if self.is_falling() {
            return Self::handle_slope_boosting(result, delta, time, normal);
        }
        result
    }

    /// Keep an airborne slide from climbing higher than the original move.
    fn handle_slope_boosting(slide: Vec3, delta: Vec3, time: f32, normal: Vec3) -> Vec3 {
        let mut result = slide;
        let vertical = result.dot(&up());
        if vertical <= 0.0 {
            return result;
        }

        let up_limit = delta.dot(&up()) * time;
        if vertical - up_limit > KINDA_SMALL_NUMBER {
            if up_limit > 0.0 {
                result *= up_limit / vertical;
            } else {
                result = Vec3::zeros();
            }
            let remainder = plane_project(slide - result, up());
            let normal_horizontal = safe_normal(plane_project(normal, up()));
            result += plane_project(remainder, normal_horizontal);
        }
        result
    }

    /// Slide the remaining `time` of `delta` along the surface of `hit`.
    ///
    /// Returns the fraction of `time` actually applied. `hit` is updated with the last sweep.
    pub(crate) fn slide_along_surface(
        &mut self,
        ctx: &mut MoveContext<'_>,
        delta: Vec3,
        time: f32,
        in_normal: Vec3,
        hit: &mut SweepHit,
        handle_impact: bool,
    ) -> f32 {
        if !hit.blocking {
            return 0.0;
        }

        let mut normal = in_normal;
        if self.is_moving_on_ground() {
            let floor_normal = self.current_floor.hit.impact_normal;
            if normal.dot(&up()) > 0.0 {
                // Treat unwalkable slopes as walls rather than ramps.
                if !self.is_floor_stable(ctx.world, hit) {
                    normal = safe_normal(plane_project(normal, floor_normal));
                }
            } else if normal.dot(&up()) < 0.0
                && self.current_floor.floor_dist < MIN_FLOOR_DIST
                && self.current_floor.blocking_hit
            {
                // A ceiling hit must not press the capsule into the floor.
                if delta.dot(&self.current_floor.hit.normal) < 0.0 {
                    normal = self.current_floor.hit.normal;
                }
                normal = safe_normal(plane_project(normal, floor_normal));
            }
        }

        let old_hit_normal = normal;
        let mut slide = self.compute_slide_vector(delta, time, normal);
        if slide.dot(&delta) <= 0.0 {
            return 0.0;
        }

        *hit = self.safe_move(ctx.world, slide);
        let first_hit = hit.time;
        let mut applied = first_hit;

        if hit.is_valid_blocking_hit() {
            if handle_impact {
                self.handle_impact(ctx, hit);
            }
            slide = self.two_wall_adjust(slide, hit, old_hit_normal);

            if !is_nearly_zero(slide, 1.0e-3) && slide.dot(&delta) > 0.0 {
                *hit = self.safe_move(ctx.world, slide);
                applied += hit.time * (1.0 - first_hit);
                if handle_impact && hit.blocking {
                    self.handle_impact(ctx, hit);
                }
            }
        }

        applied.clamp(0.0, 1.0)
    }

    /// Redirect `delta` after hitting a second surface.
    ///
    /// Notes
    /// - Two walls meeting at 90 degrees or less: move along their crease.
    /// - Otherwise slide along the new wall, nudging off it when it is the same wall again.
    /// - On the ground, the result never points into a floor the capsule is touching.
    pub(crate) fn two_wall_adjust(&self, delta: Vec3, hit: &SweepHit, old_hit_normal: Vec3) -> Vec3 {
        let hit_normal = hit.normal;
        let mut result;
        if old_hit_normal.dot(&hit_normal) <= 0.0 {
            let crease = safe_normal(hit_normal.cross(&old_hit_normal));
            result = crease * (delta.dot(&crease) * (1.0 - hit.time));
            if delta.dot(&result) < 0.0 {
                result = -result;
            }
        } else {
            result = plane_project(delta, hit_normal) * (1.0 - hit.time);
            if result.dot(&delta) <= 0.0 {
                result = Vec3::zeros();
            } else if (hit_normal.dot(&old_hit_normal) - 1.0).abs() < KINDA_SMALL_NUMBER {
                result += hit_normal * SAME_WALL_NUDGE;
            }
        }

        if self.is_moving_on_ground() {
            let floor_normal = self.current_floor.hit.normal;
            if result.dot(&floor_normal) < 0.0
                && self.current_floor.floor_dist < MIN_FLOOR_DIST
                && self.current_floor.blocking_hit
            {
                result = plane_project(result, floor_normal);
            }
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collision::{KinematicWorld, cuboid_def, plane_def};
    use crate::movement::{MovementSettings, MovementState, VelocityContext};

    fn solver_at(location: Vec3) -> MovementSolver {
        MovementSolver::new(MovementSettings::default(), location, Quat::identity())
    }

    fn wall_hit(normal: Vec3, time: f32) -> SweepHit {
        SweepHit {
            blocking: true,
            time,
            normal,
            impact_normal: normal,
            ..SweepHit::default()
        }
    }

    #[test]
    fn airborne_slide_does_not_climb_slopes() {
        let mut solver = solver_at(Vec3::zeros());
        let ramp = Vec3::new(-1.0, 1.0, 0.0).normalize();
        let delta = Vec3::new(1.0, 0.0, 0.0);

        solver.state = MovementState::Falling;
        let airborne = solver.compute_slide_vector(delta, 1.0, ramp);
        assert!(airborne.norm() < 1.0e-5);

        solver.state = MovementState::General;
        let free = solver.compute_slide_vector(delta, 1.0, ramp);
        assert!((free - Vec3::new(0.5, 0.5, 0.0)).norm() < 1.0e-5);
    }

    #[test]
    fn corner_of_two_walls_blocks_planar_move() {
        let solver = solver_at(Vec3::zeros());
        let hit = wall_hit(Vec3::new(-1.0, 0.0, 0.0), 0.0);
        let adjusted = solver.two_wall_adjust(Vec3::new(1.0, 0.0, 1.0), &hit, Vec3::new(0.0, 0.0, -1.0));
        assert!(adjusted.norm() < 1.0e-5);
    }

    #[test]
    fn same_wall_twice_nudges_away() {
        let solver = solver_at(Vec3::zeros());
        let normal = Vec3::new(-1.0, 0.0, 0.0);
        let adjusted = solver.two_wall_adjust(Vec3::new(1.0, 0.0, 1.0), &wall_hit(normal, 0.0), normal);
        assert!((adjusted - Vec3::new(-SAME_WALL_NUDGE, 0.0, 1.0)).norm() < 1.0e-5);
    }

    #[test]
    fn penetration_adjustment_is_clamped() {
        let settings = MovementSettings {
            max_depenetration: 0.1,
            ..Default::default()
        };
        let solver = MovementSolver::new(settings, Vec3::zeros(), Quat::identity());
        let hit = SweepHit {
            blocking: true,
            start_penetrating: true,
            penetration_depth: 0.5,
            normal: Vec3::y(),
            ..SweepHit::default()
        };
        let adjustment = solver.penetration_adjustment(&hit);
        assert!((adjustment - Vec3::new(0.0, 0.1, 0.0)).norm() < 1.0e-5);
    }

    #[test]
    fn safe_move_pushes_out_of_overlap() {
        let world = KinematicWorld::build(vec![cuboid_def(
            1,
            Vec3::new(1.0, 1.0, 1.0),
            Vec3::zeros(),
            Quat::identity(),
        )]);
        // Capsule bottom sunk 5 cm into the top face.
        let mut solver = solver_at(Vec3::new(0.0, 1.0 + 0.9 - 0.05, 0.0));
        solver.safe_move(&world, Vec3::new(0.1, 0.0, 0.0));

        assert!(solver.just_teleported);
        let overlap = world.penetration(
            &solver.capsule().into(),
            Quat::identity(),
            solver.location(),
            &solver.move_filter,
        );
        assert!(overlap.is_none_or(|p| p.depth < 1.0e-3));
        assert!(solver.location().y > 1.9 - 1.0e-3);
    }

    #[test]
    fn safe_move_out_of_ground_plane_stays_on_the_surface() {
        let world = KinematicWorld::build(vec![plane_def(1, Quat::identity(), Vec3::zeros())]);
        for sink in [0.01_f32, 0.05, 0.1] {
            let mut solver = solver_at(Vec3::new(0.0, 0.9 - sink, 0.0));
            solver.safe_move(&world, Vec3::new(0.1, 0.0, 0.0));

            let bottom = solver.location().y - 0.9;
            assert!(bottom > -1.0e-3, "sink {sink}: still under the plane at {bottom}");
            assert!(bottom < 0.01, "sink {sink}: pushed {bottom} above the plane");
        }
    }

    #[test]
    fn slide_along_wall_keeps_tangential_motion() {
        let world = KinematicWorld::build(vec![cuboid_def(
            1,
            Vec3::new(0.5, 2.0, 5.0),
            Vec3::new(1.5, 0.0, 0.0),
            Quat::identity(),
        )]);
        let mut solver = solver_at(Vec3::new(0.0, 1.0, 0.0));
        let mut callbacks = |_: &mut VelocityContext| {};
        let mut ctx = MoveContext::new(&world, &mut callbacks);

        let delta = Vec3::new(1.0, 0.0, 1.0);
        let mut hit = solver.safe_move(ctx.world, delta);
        assert!(hit.is_valid_blocking_hit());
        let normal = hit.normal;
        let applied = solver.slide_along_surface(&mut ctx, delta, 1.0 - hit.time, normal, &mut hit, true);

        assert!(applied > 0.0);
        assert!(solver.location().x < 1.0 - 0.35 + 1.0e-3);
        assert!(solver.location().z > 0.5);
    }
}
