use crate::collision::{CollisionWorld, SweepHit};
use crate::constants::{KINDA_SMALL_NUMBER, MAX_FLOOR_DIST, MAX_STEP_SIDE_Y};
use crate::math::{Vec3, up};

use super::callbacks::MoveContext;
use super::floor::StepDownResult;
use super::solver::MovementSolver;
use super::transaction::MovementTransaction;

impl MovementSolver {
    /// Whether the body behind `hit` lets characters step onto it.
    pub(crate) fn can_step_up(&self, world: &dyn CollisionWorld, hit: &SweepHit) -> bool {
        if !hit.is_valid_blocking_hit() {
            return false;
        }
        let Some(body) = hit.body.and_then(|id| world.body_state(id)) else {
            return true;
        };
        body.surface.can_step_up_on && body.surface.can_be_based_on
    }

    /// Climb the obstacle behind `hit` while moving by `delta`.
    ///
    /// Algorithm:
    /// 1) Reject hits on the upper hemisphere and hits below the current floor base.
    /// 2) Move up by the step height, forward by `delta` (sliding on walls), then down.
    /// 3) Reject steps higher than `max_step_height`, unstable landings that face the move or
    ///    end higher than the start, and landings on the capsule rim.
    ///
    /// Any rejection restores the location the step started from. On success the floor found
    /// by the down move is written to `step_down` so the caller can skip its own probe.
    pub(crate) fn step_up(
        &mut self,
        ctx: &mut MoveContext<'_>,
        step_hit: &SweepHit,
        delta: Vec3,
        step_down: &mut StepDownResult,
    ) -> bool {
        let max_step_height = self.settings.max_step_height;
        if max_step_height <= 0.0 || !self.can_step_up(ctx.world, step_hit) {
            return false;
        }

        let capsule = self.capsule();
        let half_height = capsule.total_half_height();
        let old_location = self.location;

        // The upper hemisphere touched first: this is a ceiling, not a step.
        let impact_height = (step_hit.impact_point - old_location).dot(&up());
        if impact_height > half_height - capsule.radius {
            return false;
        }

        let mut travel_up = max_step_height;
        let mut travel_down = max_step_height;
        let step_side_y = step_hit.impact_normal.dot(&up());
        let mut initial_floor_base = old_location.dot(&up()) - half_height;
        let mut floor_point = initial_floor_base;

        if self.is_moving_on_ground() && self.current_floor.is_walkable_floor() {
            // The capsule hovers; measure the step from the floor actually under it.
            let floor_dist = self.current_floor.distance_to_floor().max(0.0);
            initial_floor_base -= floor_dist;
            travel_up = (travel_up - floor_dist).max(0.0);
            travel_down = max_step_height + 2.0 * MAX_FLOOR_DIST;

            let hit_vertical_face =
                !self.is_within_edge_tolerance(step_hit.location, step_hit.impact_point, capsule.radius);
            if !self.current_floor.line_trace && !hit_vertical_face {
                floor_point = self.current_floor.hit.impact_point.dot(&up());
            } else {
                floor_point -= self.current_floor.floor_dist;
            }
        }

        if step_hit.impact_point.dot(&up()) <= initial_floor_base {
            return false;
        }

        let mut tx = MovementTransaction::begin(self);
        let rotation = tx.rotation;

        let sweep_up = tx.move_updated(ctx.world, up() * travel_up, rotation);
        if sweep_up.start_penetrating {
            return false;
        }

        let mut hit = tx.move_updated(ctx.world, delta, rotation);
        if hit.blocking {
            if hit.start_penetrating {
                return false;
            }
            if sweep_up.blocking {
                tx.handle_impact(ctx, &sweep_up);
            }
            tx.handle_impact(ctx, &hit);
            if tx.is_falling() {
                tx.commit();
                return true;
            }

            let forward_time = hit.time;
            let normal = hit.normal;
            let slide = tx.slide_along_surface(ctx, delta, 1.0 - hit.time, normal, &mut hit, true);
            if tx.is_falling() {
                return false;
            }
            if forward_time * delta.norm() < KINDA_SMALL_NUMBER && slide == 0.0 {
                return false;
            }
        }

        let hit = tx.move_updated(ctx.world, -up() * travel_down, rotation);
        if hit.start_penetrating {
            return false;
        }

        let mut result = StepDownResult::default();
        if hit.is_valid_blocking_hit() {
            let step_height = hit.impact_point.dot(&up()) - floor_point;
            if step_height > max_step_height {
                log::debug!("rejected step of {step_height:.3} m (max {max_step_height:.3} m)");
                return false;
            }

            if !tx.is_floor_stable(ctx.world, &hit) {
                if delta.dot(&hit.impact_normal) < 0.0 {
                    return false;
                }
                if (hit.location - old_location).dot(&up()) > 0.0 {
                    return false;
                }
            }

            if !tx.is_within_edge_tolerance(hit.location, hit.impact_point, capsule.radius) {
                return false;
            }

            if step_height > 0.0 && !tx.can_step_up(ctx.world, &hit) {
                return false;
            }

            let location = tx.location;
            result.floor = tx.find_floor(ctx.world, location, false, Some(&hit));
            if (hit.location - old_location).dot(&up()) > 0.0
                && !result.floor.blocking_hit
                && step_side_y < MAX_STEP_SIDE_Y
            {
                log::debug!("rejected step onto a vertical side ({step_height:.3} m)");
                return false;
            }
            result.computed_floor = true;
        }

        tx.commit();
        *step_down = result;
        true
    }
}
