use crate::collision::SweepHit;
use crate::constants::MIN_FLOOR_DIST;

/// Result of the most recent floor probe.
///
/// Notes
/// - `floor_dist` is the gap between the capsule bottom and the floor found by the sweep;
///   `line_dist` is the gap measured by the fallback line trace, when one ran.
/// - Distances are only meaningful for the substep they were computed in.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct GroundingStatus {
    /// The probe hit something.
    pub blocking_hit: bool,
    /// The hit is stable enough to stand on.
    pub walkable_floor: bool,
    /// The hit is too steep (or only the line trace found it).
    pub unstable_floor: bool,
    /// The result came from the line trace rather than the sweep.
    pub line_trace: bool,
    pub floor_dist: f32,
    pub line_dist: f32,
    pub hit: SweepHit,
}

impl GroundingStatus {
    #[inline]
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    #[inline]
    pub fn is_walkable_floor(&self) -> bool {
        self.blocking_hit && self.walkable_floor
    }

    #[inline]
    pub fn set_walkable(&mut self, walkable: bool) {
        self.walkable_floor = walkable;
    }

    pub fn set_from_sweep(&mut self, hit: &SweepHit, sweep_floor_dist: f32, walkable: bool) {
        self.blocking_hit = hit.is_valid_blocking_hit();
        self.walkable_floor = walkable;
        self.unstable_floor = self.blocking_hit && !walkable;
        self.line_trace = false;
        self.floor_dist = sweep_floor_dist;
        self.line_dist = 0.0;
        self.hit = *hit;
    }

    /// Adopt a line trace result while keeping the sweep's geometry.
    ///
    /// Time, location, impact point and trace endpoints stay those of the sweep so later
    /// distance checks remain in capsule space; normals and body come from the line hit.
    pub fn set_from_line_trace(
        &mut self,
        hit: &SweepHit,
        sweep_floor_dist: f32,
        line_dist: f32,
        walkable: bool,
    ) {
        if self.blocking_hit && hit.blocking {
            let sweep = self.hit;
            self.hit = *hit;
            self.hit.time = sweep.time;
            self.hit.impact_point = sweep.impact_point;
            self.hit.location = sweep.location;
            self.hit.trace_start = sweep.trace_start;
            self.hit.trace_end = sweep.trace_end;

            self.line_trace = true;
            self.floor_dist = sweep_floor_dist;
            self.line_dist = line_dist;
            self.walkable_floor = walkable;
            self.unstable_floor = !walkable;
        }
    }

    /// Gap to the floor the solver should trust: the line distance when the line trace won.
    #[inline]
    pub fn distance_to_floor(&self) -> f32 {
        if self.line_trace {
            self.line_dist
        } else {
            self.floor_dist
        }
    }

    /// Resting within the lower half of the hover band.
    #[inline]
    pub fn is_touching(&self) -> bool {
        self.blocking_hit && self.floor_dist < MIN_FLOOR_DIST
    }
}

/// Floor found by a successful step-up's final down move.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct StepDownResult {
    pub computed_floor: bool,
    pub floor: GroundingStatus,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::Vec3;

    fn blocking(location: Vec3, normal: Vec3) -> SweepHit {
        SweepHit {
            blocking: true,
            time: 0.25,
            location,
            impact_point: location - Vec3::y(),
            normal,
            impact_normal: normal,
            body: Some(3),
            ..SweepHit::default()
        }
    }

    #[test]
    fn sweep_result_marks_unwalkable_hit_unstable() {
        let mut floor = GroundingStatus::default();
        floor.set_from_sweep(&blocking(Vec3::y(), Vec3::y()), 0.02, false);
        assert!(floor.blocking_hit);
        assert!(floor.unstable_floor);
        assert!(!floor.is_walkable_floor());
    }

    #[test]
    fn line_trace_keeps_sweep_geometry() {
        let mut floor = GroundingStatus::default();
        let sweep = blocking(Vec3::new(0.0, 1.0, 0.0), Vec3::x());
        floor.set_from_sweep(&sweep, 0.1, false);

        let mut line = blocking(Vec3::new(0.0, 0.5, 0.0), Vec3::y());
        line.time = 0.9;
        line.body = Some(8);
        floor.set_from_line_trace(&line, 0.1, 0.02, true);

        assert!(floor.line_trace);
        assert!(floor.is_walkable_floor());
        assert_eq!(floor.hit.body, Some(8));
        assert!((floor.hit.time - 0.25).abs() < 1.0e-6);
        assert!((floor.hit.location - sweep.location).norm() < 1.0e-6);
        assert!((floor.hit.impact_normal - Vec3::y()).norm() < 1.0e-6);
        assert!((floor.distance_to_floor() - 0.02).abs() < 1.0e-6);
    }
}
