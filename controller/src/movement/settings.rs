/*!
Per-character movement tuning.

Every field has a usable default, so a JSON document only needs the values it changes.

Notes
- Distances are in meters, time in seconds, angles in degrees, mass in kilograms.
- Solver tolerances that are not meant to be tuned per character live in `crate::constants`.
*/

use serde::{Deserialize, Serialize};

use crate::collision::CapsuleSpec;
use crate::error::{ConfigError, ConfigResult};

/// Axis floor stability and denivelation are measured against.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum StabilityOrientation {
    /// Opposite to gravity.
    #[default]
    Gravity,
    /// The capsule's own up axis, so a tilted character judges slopes relative to itself.
    CapsuleUp,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MovementSettings {
    /// Capsule radius (meters).
    pub capsule_radius: f32,
    /// Half length of the capsule's cylinder section (meters). The capsule reaches
    /// `capsule_half_height + capsule_radius` below its center.
    pub capsule_half_height: f32,

    /// Character mass used to convert forces and impulses (kilograms).
    pub mass: f32,
    /// Multiplier on standard gravity reported to the velocity callback.
    ///
    /// Typical values: 1.0 .. 3.0
    pub gravity_scale: f32,

    /// Longest substep the solver simulates (seconds).
    ///
    /// Typical values: 0.016 .. 0.05
    pub max_simulation_time_step: f32,
    /// Substep budget per `perform_movement` call. The remaining time is halved on the last
    /// iterations so the budget is never exceeded by much.
    pub max_simulation_iterations: u32,
    /// Longest single push used to resolve a start-penetrating move (meters).
    pub max_depenetration: f32,

    pub stability_orientation: StabilityOrientation,
    /// Steepest slope the character can stand on (degrees).
    ///
    /// Typical values: 40 .. 60
    pub max_stable_slope_angle: f32,
    /// Probe distance added below the capsule when looking for a floor (meters).
    pub extra_floor_probing_distance: f32,
    /// Re-probe the floor every substep even when nothing moved.
    pub always_check_floor: bool,
    /// Probe the floor with a box instead of the capsule's round bottom.
    pub use_flat_base_for_floor_checks: bool,

    /// Highest step the character climbs without jumping (meters).
    ///
    /// Typical values: 0.3 .. 0.5
    pub max_step_height: f32,
    /// When false, the solver redirects along the ledge instead of walking off it.
    pub can_walk_off_ledges: bool,
    /// Extra depth below `max_step_height` the ledge redirect probe accepts (meters).
    pub ledge_check_threshold: f32,
    /// Distance in from the capsule edge inside which the character may not perch on a ledge
    /// (meters). Zero disables perching checks.
    pub perch_radius_threshold: f32,
    /// Extra height a perch may stand above the floor while grounded (meters).
    pub perch_additional_height: f32,

    /// Treat sharp changes in floor angle as leaving the ground.
    pub ledge_and_denivelation_handling: bool,
    /// Minimum speed for a denivelation to be considered (meters per second).
    pub min_velocity_for_denivelation: f32,
    /// Floor angle change going up that makes the character catch air (degrees).
    pub max_stable_upwards_denivelation_angle: f32,
    /// Floor angle change going down that makes the character catch air (degrees).
    pub max_stable_downwards_denivelation_angle: f32,

    /// Push dynamic bodies the character runs into or stands on.
    pub enable_physics_interaction: bool,
    pub push_force_scaled_to_mass: bool,
    /// Apply the push at an offset from the hit body's center instead of the impact point.
    pub push_force_using_vertical_offset: bool,
    /// Offset factor along the hit body's half height (-1 bottom, 1 top).
    pub push_force_point_vertical_offset_factor: f32,
    /// Scale the push by how much the body already moves along the character's velocity.
    pub scale_push_force_to_velocity: bool,
    /// Impulse applied to a resting body on impact (kilogram meters per second).
    pub initial_push_force_factor: f32,
    /// Force applied to a moving body on impact (newtons).
    pub push_force_factor: f32,
    /// Multiplier on the character's weight pressed onto a dynamic floor.
    pub standing_downward_force_scale: f32,

    /// Follow the floor body when it moves.
    pub move_with_base: bool,
    /// Follow the base's translation only.
    pub ignore_base_rotation: bool,
    pub impart_base_velocity_planar: bool,
    pub impart_base_velocity_vertical: bool,
    pub impart_base_angular_velocity: bool,
    /// Half life of the velocity carried off a base (seconds). Zero drops it at once; a
    /// negative value keeps it until landing.
    pub former_base_velocity_decay_half_life: f32,

    /// Use animation root motion while a montage blends in.
    pub apply_root_motion_during_blend_in: bool,
    /// Use animation root motion while a montage blends out.
    pub apply_root_motion_during_blend_out: bool,
}

impl Default for MovementSettings {
    fn default() -> Self {
        Self {
            capsule_radius: 0.35,
            capsule_half_height: 0.55,
            mass: 100.0,
            gravity_scale: 2.0,
            max_simulation_time_step: 0.05,
            max_simulation_iterations: 8,
            max_depenetration: 5.0,
            stability_orientation: StabilityOrientation::Gravity,
            max_stable_slope_angle: 60.0,
            extra_floor_probing_distance: 0.2,
            always_check_floor: true,
            use_flat_base_for_floor_checks: false,
            max_step_height: 0.45,
            can_walk_off_ledges: true,
            ledge_check_threshold: 0.04,
            perch_radius_threshold: 0.0,
            perch_additional_height: 0.4,
            ledge_and_denivelation_handling: true,
            min_velocity_for_denivelation: 0.0,
            max_stable_upwards_denivelation_angle: 180.0,
            max_stable_downwards_denivelation_angle: 180.0,
            enable_physics_interaction: true,
            push_force_scaled_to_mass: false,
            push_force_using_vertical_offset: false,
            push_force_point_vertical_offset_factor: -0.75,
            scale_push_force_to_velocity: true,
            initial_push_force_factor: 5.0,
            push_force_factor: 7500.0,
            standing_downward_force_scale: 1.0,
            move_with_base: true,
            ignore_base_rotation: false,
            impart_base_velocity_planar: true,
            impart_base_velocity_vertical: true,
            impart_base_angular_velocity: true,
            former_base_velocity_decay_half_life: 0.0,
            apply_root_motion_during_blend_in: true,
            apply_root_motion_during_blend_out: true,
        }
    }
}

impl MovementSettings {
    #[inline]
    pub fn capsule(&self) -> CapsuleSpec {
        CapsuleSpec::new(self.capsule_radius, self.capsule_half_height)
    }

    /// Reject values the solver cannot run with.
    pub fn validate(&self) -> ConfigResult<()> {
        fn invalid(name: &'static str, reason: impl Into<String>) -> ConfigError {
            ConfigError::InvalidSetting {
                name,
                reason: reason.into(),
            }
        }

        if !(self.capsule_radius > 0.0) {
            return Err(invalid("capsule_radius", "must be positive"));
        }
        if !(self.capsule_half_height >= 0.0) {
            return Err(invalid("capsule_half_height", "must not be negative"));
        }
        if !(self.mass > 0.0) {
            return Err(invalid("mass", "must be positive"));
        }
        if !(self.max_simulation_time_step > 0.0) {
            return Err(invalid("max_simulation_time_step", "must be positive"));
        }
        if self.max_simulation_iterations == 0 {
            return Err(invalid("max_simulation_iterations", "must be at least 1"));
        }
        if !(0.0..=90.0).contains(&self.max_stable_slope_angle) {
            return Err(invalid(
                "max_stable_slope_angle",
                format!("{} is outside 0..=90", self.max_stable_slope_angle),
            ));
        }
        if !(self.max_step_height >= 0.0) {
            return Err(invalid("max_step_height", "must not be negative"));
        }
        if self.max_step_height > self.capsule_half_height + self.capsule_radius * 2.0 {
            return Err(invalid(
                "max_step_height",
                "must not exceed the capsule's lower half",
            ));
        }
        for (name, angle) in [
            (
                "max_stable_upwards_denivelation_angle",
                self.max_stable_upwards_denivelation_angle,
            ),
            (
                "max_stable_downwards_denivelation_angle",
                self.max_stable_downwards_denivelation_angle,
            ),
        ] {
            if !(0.0..=180.0).contains(&angle) {
                return Err(invalid(name, format!("{angle} is outside 0..=180")));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(MovementSettings::default().validate().is_ok());
    }

    #[test]
    fn partial_json_fills_from_defaults() {
        let settings: MovementSettings =
            serde_json::from_str(r#"{ "max_step_height": 0.3, "can_walk_off_ledges": false }"#)
                .expect("valid json");
        assert!((settings.max_step_height - 0.3).abs() < 1.0e-6);
        assert!(!settings.can_walk_off_ledges);
        assert!((settings.capsule_radius - 0.35).abs() < 1.0e-6);
    }

    #[test]
    fn slope_angle_out_of_range_is_rejected() {
        let settings = MovementSettings {
            max_stable_slope_angle: 95.0,
            ..Default::default()
        };
        match settings.validate() {
            Err(ConfigError::InvalidSetting { name, .. }) => {
                assert_eq!(name, "max_stable_slope_angle")
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }
}
