/*!
Floor probing: what is under the capsule, how far, and can the character stand on it.

Algorithm (per probe):
1) Reuse a vertical downward sweep hit the caller already has, when it is edge-tolerant.
2) Sweep a slightly shortened capsule down. Hits on the capsule's side (adjacent walls,
   ledges) are retried with a thinner, shorter capsule.
3) Only when the sweep started in penetration or found nothing stable, fall back to a line
   trace from the capsule center.
4) Hits near the rim of the capsule are checked again with a smaller "perch" radius so the
   character does not stand on the very edge of a ledge.

Notes
- Distances are measured from the capsule bottom and may be negative when the capsule
  starts inside the floor; `adjust_floor_height` uses that to pull it back out.
*/

use crate::collision::{CapsuleSpec, CollisionWorld, QueryShape, SweepHit};
use crate::constants::{
    DOT_PRODUCT_45, FLOOR_SWEEP_SHRINK_SCALE, FLOOR_SWEEP_SHRINK_SCALE_OVERLAP, KINDA_SMALL_NUMBER,
    MAX_FLOOR_DIST, MIN_FLOOR_DIST, MIN_PERCH_RADIUS, SWEEP_EDGE_REJECT_DISTANCE,
};
use crate::math::{Quat, Vec3, angle_between_deg, planar, up};

use super::floor::GroundingStatus;
use super::solver::MovementSolver;

impl MovementSolver {
    /// True when `hit` is flat enough to stand on.
    ///
    /// Uses the hit surface's `walkable_slope_override` when it has one, otherwise
    /// `max_stable_slope_angle`.
    pub fn is_floor_stable(&self, world: &dyn CollisionWorld, hit: &SweepHit) -> bool {
        if !hit.is_valid_blocking_hit() {
            return false;
        }
        let max_angle = hit
            .body
            .and_then(|id| world.body_state(id))
            .and_then(|b| b.surface.walkable_slope_override)
            .unwrap_or(self.settings.max_stable_slope_angle);

        let angle = angle_between_deg(hit.impact_normal, self.stability_up());
        if angle > max_angle {
            log::trace!("floor at {angle:.1} deg exceeds {max_angle:.1} deg");
            return false;
        }
        true
    }

    /// Whether `impact_point` lies under the capsule's bottom rather than on its rim.
    #[inline]
    pub fn is_within_edge_tolerance(&self, capsule_location: Vec3, impact_point: Vec3, radius: f32) -> bool {
        let dist_sq = planar(impact_point - capsule_location).norm_squared();
        let reduced = (radius - SWEEP_EDGE_REJECT_DISTANCE)
            .max(SWEEP_EDGE_REJECT_DISTANCE + KINDA_SMALL_NUMBER);
        dist_sq < reduced * reduced
    }

    /// Sweep used by floor probes: the capsule, or a box when flat-based probing is on.
    fn floor_sweep_test(&self, world: &dyn CollisionWorld, start: Vec3, end: Vec3, capsule: CapsuleSpec) -> SweepHit {
        if !self.settings.use_flat_base_for_floor_checks {
            return world.sweep(&capsule.into(), Quat::identity(), start, end, &self.move_filter);
        }

        let half = capsule.radius * DOT_PRODUCT_45;
        let shape = QueryShape::Box {
            half_extents: Vec3::new(half, capsule.total_half_height(), half),
        };
        let diagonal = Quat::from_axis_angle(&Vec3::y_axis(), std::f32::consts::FRAC_PI_4);
        let hit = world.sweep(&shape, diagonal, start, end, &self.move_filter);
        if hit.blocking {
            return hit;
        }
        world.sweep(&shape, Quat::identity(), start, end, &self.move_filter)
    }

    /// Measure the floor below `location`.
    ///
    /// `line_distance` and `sweep_distance` are how far below the capsule bottom each query
    /// may reach; `sweep_radius` is the radius of the sweeping capsule.
    pub(crate) fn compute_floor_dist(
        &self,
        world: &dyn CollisionWorld,
        location: Vec3,
        line_distance: f32,
        sweep_distance: f32,
        sweep_radius: f32,
        downward_sweep: Option<&SweepHit>,
    ) -> GroundingStatus {
        let mut floor = GroundingStatus::default();
        let capsule = self.capsule();
        let total = capsule.total_half_height();

        let mut skip_sweep = false;
        if let Some(hit) = downward_sweep
            && hit.is_valid_blocking_hit()
            && hit.trace_start.dot(&up()) > hit.trace_end.dot(&up())
            && planar(hit.trace_start - hit.trace_end).norm_squared() <= KINDA_SMALL_NUMBER
            && self.is_within_edge_tolerance(hit.location, hit.impact_point, capsule.radius)
        {
            skip_sweep = true;
            let walkable = self.is_floor_stable(world, hit);
            let floor_dist = (location - hit.location).dot(&up());
            floor.set_from_sweep(hit, floor_dist, walkable);
            if walkable {
                return floor;
            }
        }

        if sweep_distance < line_distance {
            log::error!("floor sweep distance {sweep_distance} is shorter than line distance {line_distance}");
            return floor;
        }

        let max_penetration_adjust = MAX_FLOOR_DIST.max(capsule.radius);

        if !skip_sweep && sweep_distance > 0.0 && sweep_radius > 0.0 {
            let mut shrink_height = (total - capsule.radius) * FLOOR_SWEEP_SHRINK_SCALE;
            let mut trace_dist = sweep_distance + shrink_height;
            let mut shape = CapsuleSpec::from_total(sweep_radius, total - shrink_height);

            let mut hit =
                self.floor_sweep_test(world, location, location - up() * trace_dist, shape);
            if hit.blocking {
                if hit.start_penetrating
                    || !self.is_within_edge_tolerance(location, hit.impact_point, shape.radius)
                {
                    let radius = (shape.radius - SWEEP_EDGE_REJECT_DISTANCE - KINDA_SMALL_NUMBER).max(0.0);
                    if radius > KINDA_SMALL_NUMBER {
                        shrink_height = (total - capsule.radius) * FLOOR_SWEEP_SHRINK_SCALE_OVERLAP;
                        trace_dist = sweep_distance + shrink_height;
                        shape = CapsuleSpec::from_total(radius, (total - shrink_height).max(radius));
                        hit = self.floor_sweep_test(
                            world,
                            location,
                            location - up() * trace_dist,
                            shape,
                        );
                    }
                }

                let sweep_result = (hit.time * trace_dist - shrink_height).max(-max_penetration_adjust);
                floor.set_from_sweep(&hit, sweep_result, false);
                if hit.is_valid_blocking_hit()
                    && self.is_floor_stable(world, &hit)
                    && sweep_result <= sweep_distance
                {
                    floor.walkable_floor = true;
                    return floor;
                }
            }
        }

        // The line trace is shorter than the sweep; it only helps when the sweep was stuck.
        if !floor.blocking_hit && !floor.hit.start_penetrating {
            floor.floor_dist = sweep_distance;
            return floor;
        }

        if line_distance > 0.0 {
            let trace_dist = line_distance + total;
            let hit = world.line_trace(location, location - up() * trace_dist, &self.move_filter);
            if hit.blocking && hit.time > 0.0 {
                let line_result = (hit.time * trace_dist - total).max(-max_penetration_adjust);
                floor.blocking_hit = true;
                floor.unstable_floor = true;
                if line_result <= line_distance && self.is_floor_stable(world, &hit) {
                    floor.set_from_line_trace(&hit, floor.floor_dist, line_result, true);
                    return floor;
                }
            }
        }

        floor.walkable_floor = false;
        floor
    }

    /// Probe the floor under `location`, with perch validation.
    ///
    /// With `can_use_cached` and a solid base the previous result is reused unless a probe
    /// was forced.
    pub fn find_floor(
        &mut self,
        world: &dyn CollisionWorld,
        location: Vec3,
        can_use_cached: bool,
        downward_sweep: Option<&SweepHit>,
    ) -> GroundingStatus {
        let capsule = self.capsule();
        let height_check_adjust = if self.is_moving_on_ground() {
            MAX_FLOOR_DIST + KINDA_SMALL_NUMBER
        } else {
            -MAX_FLOOR_DIST
        };
        let probe = self
            .settings
            .extra_floor_probing_distance
            .max(self.settings.max_step_height);
        let sweep_dist = MAX_FLOOR_DIST.max(probe + height_check_adjust);
        let line_dist = sweep_dist;

        let mut need_to_validate = true;
        let mut floor;
        if self.settings.always_check_floor
            || !can_use_cached
            || self.force_next_floor_check
            || self.just_teleported
        {
            self.force_next_floor_check = false;
            floor = self.compute_floor_dist(world, location, line_dist, sweep_dist, capsule.radius, downward_sweep);
        } else {
            let base = self.based.base.map(|id| world.body_state(id));
            if let Some(state) = base {
                self.force_next_floor_check =
                    state.is_none_or(|b| !b.collision_enabled || b.kind.is_movable());
            }
            if !self.force_next_floor_check && matches!(base, Some(Some(_))) {
                floor = self.current_floor;
                need_to_validate = false;
            } else {
                self.force_next_floor_check = false;
                floor = self.compute_floor_dist(world, location, line_dist, sweep_dist, capsule.radius, downward_sweep);
            }
        }

        if need_to_validate
            && floor.blocking_hit
            && !floor.line_trace
            && self.should_compute_perch_result(&floor.hit, true)
        {
            let mut max_perch_floor_dist = sweep_dist;
            if self.is_moving_on_ground() {
                max_perch_floor_dist += self.settings.perch_additional_height.max(0.0);
            }

            match self.compute_perch_result(world, self.valid_perch_radius(), &floor.hit, max_perch_floor_dist) {
                Some(perch) => {
                    let avg = (MIN_FLOOR_DIST + MAX_FLOOR_DIST) * 0.5;
                    let move_up = avg - floor.floor_dist;
                    if move_up + perch.floor_dist >= max_perch_floor_dist {
                        floor.floor_dist = avg;
                    }
                    if !floor.walkable_floor {
                        let floor_dist = floor.floor_dist;
                        floor.set_from_line_trace(&perch.hit, floor_dist, floor_dist.max(MIN_FLOOR_DIST), true);
                    }
                }
                None => floor.walkable_floor = false,
            }
        }

        floor
    }

    /// Radius the character must keep over solid ground to stand on a ledge.
    #[inline]
    pub(crate) fn valid_perch_radius(&self) -> f32 {
        let radius = self.capsule().radius;
        (radius - self.settings.perch_radius_threshold)
            .max(MIN_PERCH_RADIUS)
            .min(radius)
    }

    /// Whether `hit` is far enough out on the capsule rim to need a perch check.
    pub(crate) fn should_compute_perch_result(&self, hit: &SweepHit, check_radius: bool) -> bool {
        if !hit.is_valid_blocking_hit() {
            return false;
        }
        if self.settings.perch_radius_threshold <= SWEEP_EDGE_REJECT_DISTANCE {
            return false;
        }
        if check_radius {
            let dist_sq = planar(hit.impact_point - hit.location).norm_squared();
            let standing = self.valid_perch_radius();
            if dist_sq <= standing * standing {
                return false;
            }
        }
        true
    }

    /// Re-probe with a thinner capsule to see whether the character can stand at `hit`.
    pub(crate) fn compute_perch_result(
        &self,
        world: &dyn CollisionWorld,
        test_radius: f32,
        hit: &SweepHit,
        max_floor_dist: f32,
    ) -> Option<GroundingStatus> {
        if max_floor_dist <= 0.0 {
            return None;
        }
        let capsule = self.capsule();
        let total = capsule.total_half_height();

        let capsule_location = if self.settings.use_flat_base_for_floor_checks {
            hit.trace_start
        } else {
            hit.location
        };
        let hit_above_base = (hit.impact_point - (capsule_location - up() * total))
            .dot(&up())
            .max(0.0);
        let perch_line_dist = (max_floor_dist - hit_above_base).max(0.0);
        let perch_sweep_dist = max_floor_dist.max(0.0) + capsule.radius;

        let result = self.compute_floor_dist(
            world,
            capsule_location,
            perch_line_dist,
            perch_sweep_dist,
            test_radius,
            None,
        );
        if !result.is_walkable_floor() {
            return None;
        }
        if hit_above_base + result.floor_dist > max_floor_dist {
            return None;
        }
        Some(result)
    }

    /// Snap the capsule back into the hover band above a walkable floor.
    pub(crate) fn adjust_floor_height(&mut self, world: &dyn CollisionWorld) {
        if !self.current_floor.is_walkable_floor() {
            return;
        }

        let mut old_floor_dist = self.current_floor.floor_dist;
        if self.current_floor.line_trace {
            // Adjusting from a line distance here would climb unwalkable walls.
            if old_floor_dist < MIN_FLOOR_DIST && self.current_floor.line_dist >= MIN_FLOOR_DIST {
                return;
            }
            old_floor_dist = self.current_floor.line_dist;
        }

        if !(MIN_FLOOR_DIST..=MAX_FLOOR_DIST).contains(&old_floor_dist) {
            let initial_height = self.location.dot(&up());
            let avg = (MIN_FLOOR_DIST + MAX_FLOOR_DIST) * 0.5;
            let move_dist = avg - old_floor_dist;
            self.just_teleported |= move_dist < 0.0;

            let hit = self.safe_move(world, up() * move_dist);
            if !hit.is_valid_blocking_hit() {
                self.current_floor.floor_dist += move_dist;
            } else if move_dist > 0.0 {
                self.current_floor.floor_dist += self.location.dot(&up()) - initial_height;
            } else {
                let floor_dist = self.location.dot(&up()) - hit.location.dot(&up());
                self.current_floor.floor_dist = floor_dist;
                if self.is_floor_stable(world, &hit) {
                    self.current_floor.set_from_sweep(&hit, floor_dist, true);
                } else {
                    self.current_floor.unstable_floor = true;
                }
            }

            self.just_teleported |= old_floor_dist < 0.0;
            self.force_next_floor_check = true;
        }
    }

    /// Whether a blocking hit while falling is somewhere the character can land.
    pub(crate) fn is_valid_landing_spot(&mut self, world: &dyn CollisionWorld, location: Vec3, hit: &SweepHit) -> bool {
        if !hit.blocking {
            return false;
        }
        let capsule = self.capsule();

        if !hit.start_penetrating {
            if !self.is_floor_stable(world, hit) {
                return false;
            }
            // The impact must be below the lower hemisphere's center.
            let lower_hemisphere = location.dot(&up()) - capsule.total_half_height() + capsule.radius;
            if hit.impact_point.dot(&up()) >= lower_hemisphere {
                return false;
            }
            if !self.is_within_edge_tolerance(hit.location, hit.impact_point, capsule.radius) {
                return false;
            }
        } else if hit.normal.dot(&up()) < KINDA_SMALL_NUMBER {
            // Penetrating something below is fine; anything sideways is not a landing.
            return false;
        }

        self.find_floor(world, location, false, Some(hit)).is_walkable_floor()
    }

    /// A falling hit worth re-probing as a possible floor.
    pub(crate) fn should_check_for_valid_landing_spot(&self, hit: &SweepHit) -> bool {
        hit.normal.dot(&up()) > KINDA_SMALL_NUMBER
            && !hit.start_penetrating
            && self.is_within_edge_tolerance(self.location, hit.impact_point, self.capsule().radius)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collision::{KinematicWorld, SurfaceProperties, WorldBodyDef, cuboid_def, plane_def};
    use crate::movement::{MovementSettings, MovementState, StabilityOrientation};

    fn flat_world() -> KinematicWorld {
        KinematicWorld::build(vec![plane_def(1, Quat::identity(), Vec3::zeros())])
    }

    fn hit_with_slope(angle_deg: f32, body: Option<u32>) -> SweepHit {
        let rad = angle_deg.to_radians();
        let normal = Vec3::new(rad.sin(), rad.cos(), 0.0);
        SweepHit {
            blocking: true,
            normal,
            impact_normal: normal,
            body,
            ..SweepHit::default()
        }
    }

    #[test]
    fn stability_is_monotonic_in_slope_angle() {
        let world = flat_world();
        let solver = MovementSolver::new(MovementSettings::default(), Vec3::zeros(), Quat::identity());
        let mut became_unstable = false;
        for step in 0..=180 {
            let angle = step as f32;
            let stable = solver.is_floor_stable(&world, &hit_with_slope(angle, None));
            if !stable {
                became_unstable = true;
            }
            assert!(!(became_unstable && stable), "stable again at {angle} deg");
            if step != 60 {
                assert_eq!(stable, angle < 60.0, "at {angle} deg");
            }
        }
    }

    #[test]
    fn surface_override_replaces_slope_limit() {
        let world = KinematicWorld::build(vec![
            cuboid_def(2, Vec3::new(1.0, 1.0, 1.0), Vec3::zeros(), Quat::identity()).with_surface(
                SurfaceProperties {
                    walkable_slope_override: Some(20.0),
                    ..Default::default()
                },
            ),
        ]);
        let solver = MovementSolver::new(MovementSettings::default(), Vec3::zeros(), Quat::identity());
        assert!(solver.is_floor_stable(&world, &hit_with_slope(15.0, Some(2))));
        assert!(!solver.is_floor_stable(&world, &hit_with_slope(30.0, Some(2))));
        assert!(solver.is_floor_stable(&world, &hit_with_slope(30.0, None)));
    }

    #[test]
    fn edge_tolerance_rejects_rim_hits() {
        let solver = MovementSolver::new(MovementSettings::default(), Vec3::zeros(), Quat::identity());
        assert!(solver.is_within_edge_tolerance(Vec3::zeros(), Vec3::new(0.2, -1.0, 0.0), 0.35));
        assert!(!solver.is_within_edge_tolerance(Vec3::zeros(), Vec3::new(0.349, -1.0, 0.0), 0.35));
    }

    #[test]
    fn floor_below_hovering_capsule_is_walkable() {
        let world = flat_world();
        let location = Vec3::new(0.0, 0.9 + 0.02, 0.0);
        let mut solver = MovementSolver::new(MovementSettings::default(), location, Quat::identity());
        let floor = solver.find_floor(&world, location, false, None);
        assert!(floor.is_walkable_floor());
        assert!(!floor.line_trace);
        assert!((floor.floor_dist - 0.02).abs() < 0.005);
        assert_eq!(floor.hit.body, Some(1));
    }

    #[test]
    fn nothing_below_reports_sweep_distance() {
        let world = KinematicWorld::build(vec![]);
        let mut solver = MovementSolver::new(MovementSettings::default(), Vec3::zeros(), Quat::identity());
        let floor = solver.find_floor(&world, Vec3::new(0.0, 5.0, 0.0), false, None);
        assert!(!floor.blocking_hit);
        assert!(!floor.is_walkable_floor());
        assert!(floor.floor_dist > 0.0);
    }

    #[test]
    fn steep_ramp_is_not_walkable() {
        let tilt = Quat::from_axis_angle(&Vec3::z_axis(), 70.0_f32.to_radians());
        let world = KinematicWorld::build(vec![WorldBodyDef::fixed(
            1,
            Vec3::zeros(),
            tilt,
            crate::collision::ColliderShapeDef::Plane {
                offset_along_normal: 0.0,
            },
        )]);
        let location = Vec3::new(0.0, 1.2, 0.0);
        let mut solver = MovementSolver::new(MovementSettings::default(), location, Quat::identity());
        let floor = solver.find_floor(&world, location, false, None);
        assert!(!floor.is_walkable_floor());
    }

    #[test]
    fn adjust_floor_height_lifts_capsule_into_band() {
        let world = flat_world();
        let location = Vec3::new(0.0, 0.9 + 0.002, 0.0);
        let mut solver = MovementSolver::new(MovementSettings::default(), location, Quat::identity());
        solver.state = MovementState::Grounded;
        solver.current_floor = solver.find_floor(&world, location, false, None);
        assert!(solver.current_floor.floor_dist < MIN_FLOOR_DIST);

        solver.adjust_floor_height(&world);
        let gap = solver.location().y - 0.9;
        assert!(gap >= MIN_FLOOR_DIST - 1.0e-3 && gap <= MAX_FLOOR_DIST + 1.0e-3, "gap {gap}");
        assert!(solver.force_next_floor_check);
    }

    #[test]
    fn capsule_up_orientation_judges_slopes_relative_to_the_capsule() {
        let world = flat_world();
        // Leaning 30 degrees toward +X, the same way the slope faces.
        let lean = Quat::from_axis_angle(&Vec3::z_axis(), -30f32.to_radians());
        let slope = hit_with_slope(70.0, None);

        let by_gravity = MovementSolver::new(MovementSettings::default(), Vec3::zeros(), lean);
        assert!(!by_gravity.is_floor_stable(&world, &slope));

        let settings = MovementSettings {
            stability_orientation: StabilityOrientation::CapsuleUp,
            ..Default::default()
        };
        let by_capsule = MovementSolver::new(settings, Vec3::zeros(), lean);
        assert!((by_capsule.stability_up() - Vec3::new(0.5, 0.866_025, 0.0)).norm() < 1.0e-4);
        assert!(by_capsule.is_floor_stable(&world, &slope));
        // Level ground is now 30 degrees off the capsule's up and still stable.
        assert!(by_capsule.is_floor_stable(&world, &hit_with_slope(0.0, None)));
        // Leaning away from the slope makes it 100 degrees off.
        assert!(!by_capsule.is_floor_stable(&world, &hit_with_slope(-70.0, None)));
    }

    /// Box top at y = 1 with its +X edge at x = 1; the capsule's round bottom rests on that edge
    /// with its center `overhang` past it.
    fn on_box_edge(extra: Vec<WorldBodyDef>, overhang: f32, perch_radius_threshold: f32) -> GroundingStatus {
        let mut bodies = vec![cuboid_def(2, Vec3::new(1.0, 0.5, 1.0), Vec3::new(0.0, 0.5, 0.0), Quat::identity())];
        bodies.extend(extra);
        let world = KinematicWorld::build(bodies);

        let settings = MovementSettings {
            perch_radius_threshold,
            ..Default::default()
        };
        let radius = settings.capsule_radius;
        let sphere_drop = (radius * radius - overhang * overhang).sqrt();
        let location = Vec3::new(1.0 + overhang, 1.0 + sphere_drop + settings.capsule_half_height + 0.02, 0.0);
        let mut solver = MovementSolver::new(settings, location, Quat::identity());
        solver.find_floor(&world, location, false, None)
    }

    #[test]
    fn rim_contact_is_walkable_without_perch_threshold() {
        let floor = on_box_edge(Vec::new(), 0.3, 0.0);
        assert!(floor.is_walkable_floor());
        assert_eq!(floor.hit.body, Some(2));
        assert!((floor.floor_dist - 0.02).abs() < 0.01, "dist {}", floor.floor_dist);
    }

    #[test]
    fn perch_threshold_rejects_standing_on_the_rim() {
        // Perch radius 0.2 around a center 0.3 past the edge finds nothing under it.
        let floor = on_box_edge(Vec::new(), 0.3, 0.15);
        assert!(!floor.is_walkable_floor());
    }

    #[test]
    fn perch_accepts_rim_with_ground_close_below() {
        // Lower ground within the perch reach keeps the edge walkable.
        let lower = plane_def(1, Quat::identity(), Vec3::new(0.0, 0.75, 0.0));
        let floor = on_box_edge(vec![lower], 0.3, 0.15);
        assert!(floor.is_walkable_floor());
        assert_eq!(floor.hit.body, Some(2));
    }

    #[test]
    fn perch_check_only_runs_past_the_perch_radius() {
        let settings = MovementSettings {
            perch_radius_threshold: 0.15,
            ..Default::default()
        };
        let solver = MovementSolver::new(settings, Vec3::zeros(), Quat::identity());
        assert!((solver.valid_perch_radius() - 0.2).abs() < 1.0e-6);

        let mut hit = hit_with_slope(0.0, None);
        hit.location = Vec3::new(0.0, 1.0, 0.0);
        hit.impact_point = Vec3::new(0.1, 0.1, 0.0);
        assert!(!solver.should_compute_perch_result(&hit, true));
        hit.impact_point = Vec3::new(0.3, 0.1, 0.0);
        assert!(solver.should_compute_perch_result(&hit, true));

        let no_perch = MovementSolver::new(MovementSettings::default(), Vec3::zeros(), Quat::identity());
        assert!(!no_perch.should_compute_perch_result(&hit, true));
    }

    #[test]
    fn flat_base_floor_check_stands_on_the_rim() {
        // A box-shaped probe reaches the edge even when the round bottom would only graze it.
        let world = KinematicWorld::build(vec![cuboid_def(
            2,
            Vec3::new(1.0, 0.5, 1.0),
            Vec3::new(0.0, 0.5, 0.0),
            Quat::identity(),
        )]);
        let settings = MovementSettings {
            use_flat_base_for_floor_checks: true,
            ..Default::default()
        };
        let location = Vec3::new(1.3, 1.0 + 0.9 + 0.02, 0.0);
        let mut solver = MovementSolver::new(settings, location, Quat::identity());
        let floor = solver.find_floor(&world, location, false, None);
        assert!(floor.is_walkable_floor());
        assert!((floor.floor_dist - 0.02).abs() < 0.01, "dist {}", floor.floor_dist);
    }
}
