use std::fmt::Write;

use super::solver::MovementSolver;

impl MovementSolver {
    /// Multi-line summary of state, floor, base and root motion.
    pub fn debug_display(&self) -> String {
        let mut out = String::new();
        let floor = &self.current_floor;

        let _ = writeln!(out, "state     {:?}", self.state);
        let _ = writeln!(
            out,
            "location  ({:.3}, {:.3}, {:.3})",
            self.location.x, self.location.y, self.location.z
        );
        let _ = writeln!(
            out,
            "velocity  ({:.3}, {:.3}, {:.3})  |{:.3}|",
            self.velocity.x,
            self.velocity.y,
            self.velocity.z,
            self.velocity.norm()
        );
        let _ = writeln!(
            out,
            "floor     blocking={} walkable={} line={} dist={:.4} normal=({:.2}, {:.2}, {:.2})",
            floor.blocking_hit,
            floor.walkable_floor,
            floor.line_trace,
            floor.floor_dist,
            floor.hit.impact_normal.x,
            floor.hit.impact_normal.y,
            floor.hit.impact_normal.z
        );
        match self.based.base {
            Some(id) => {
                let _ = writeln!(out, "base      {id}");
            }
            None => out.push_str("base      none\n"),
        }

        let sources: Vec<&str> = self.root_motion.sources().map(|s| s.name.as_str()).collect();
        let _ = write!(
            out,
            "root      anim={} sources=[{}]",
            self.anim_root_motion.is_some(),
            sources.join(", ")
        );
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::{Quat, Vec3};
    use crate::movement::MovementSettings;

    #[test]
    fn debug_display_lists_state_and_floor() {
        let solver = MovementSolver::new(MovementSettings::default(), Vec3::new(1.0, 2.0, 3.0), Quat::identity());
        let text = solver.debug_display();
        assert!(text.starts_with("state     Falling"));
        assert!(text.contains("(1.000, 2.000, 3.000)"));
        assert!(text.contains("walkable=false"));
        assert!(text.contains("base      none"));
    }
}
