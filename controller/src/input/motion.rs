/*!
Directional gesture matching.

A gesture reads one axis channel frame by frame (oldest to newest) and reports the frame at which
it completes. Two shapes are supported:

- Sequence: the stick visits a list of coarse directions in order (e.g. Back, Right, Forward).
- Angle: starting from neutral, the stick aligns with a reference direction and then sweeps at
  least `angle_delta` degrees in the configured turn direction without returning to neutral.

Conventions
- Axis `x` is right, `y` is forward. The reference directions are unit axes.
- Player-relative sequences classify the stick against the frame's facing vector instead of +Y.
*/

use serde::{Deserialize, Serialize};

use super::channel::InputId;
use crate::constants::DOT_PRODUCT_45;
use crate::math::{Vec2, angle_between_deg_2d, safe_normal_2d};

/// Coarse stick direction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    Neutral,
    Forward,
    Back,
    Left,
    Right,
}

impl Direction {
    /// Unit stick vector for the direction (zero for neutral).
    #[inline]
    pub fn vector(self) -> Vec2 {
        match self {
            Direction::Neutral => Vec2::zeros(),
            Direction::Forward => Vec2::new(0.0, 1.0),
            Direction::Back => Vec2::new(0.0, -1.0),
            Direction::Right => Vec2::new(1.0, 0.0),
            Direction::Left => Vec2::new(-1.0, 0.0),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TurnDirection {
    Clockwise,
    CounterClockwise,
    Either,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum MotionMode {
    /// Ordered list of coarse directions.
    Sequence { steps: Vec<Direction> },
    /// Sweep of at least `angle_delta` degrees starting aligned with `from`.
    Angle {
        from: Direction,
        angle_delta: f32,
        turn: TurnDirection,
    },
}

/// Configuration of one directional gesture.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MotionActionDef {
    pub id: InputId,
    /// Axis channel the gesture reads.
    pub axis: InputId,
    #[serde(default)]
    pub relative_to_player: bool,
    pub mode: MotionMode,
}

/// Classify a stick sample.
///
/// Algorithm:
/// - zero input is `Neutral`;
/// - within 45 degrees of forward is `Forward`;
/// - within 135 degrees is `Right` or `Left` by the sign of the right component;
/// - anything else is `Back`.
pub fn axis_direction(input: Vec2, forward: Vec2) -> Direction {
    if input.x == 0.0 && input.y == 0.0 {
        return Direction::Neutral;
    }
    let forward = safe_normal_2d(forward);
    let right = Vec2::new(forward.y, -forward.x);

    let stick_angle = angle_between_deg_2d(input, forward);
    if stick_angle < 45.0 {
        Direction::Forward
    } else if stick_angle < 135.0 {
        if input.dot(&right) > 0.0 {
            Direction::Right
        } else {
            Direction::Left
        }
    } else {
        Direction::Back
    }
}

/// Per-gesture progress carried across frames of one scan.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct MotionMatcher {
    check_step: usize,
    prev_angle: f32,
    cur_angle: f32,
    prev_vector: Vec2,
    /// Stick was seen at neutral.
    neutral_seen: bool,
    /// Stick aligned with the reference direction after neutral.
    aligned: bool,
}

impl MotionMatcher {
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Degrees swept so far (angle mode).
    #[inline]
    pub fn swept_angle(&self) -> f32 {
        self.cur_angle
    }

    /// Feed one frame. Returns true once the gesture is complete.
    pub fn check(&mut self, def: &MotionActionDef, input: Vec2, facing: Vec2) -> bool {
        match &def.mode {
            MotionMode::Angle {
                from,
                angle_delta,
                turn,
            } => self.check_angle(from.vector(), *angle_delta, *turn, input),
            MotionMode::Sequence { steps } => {
                if steps.is_empty() {
                    return false;
                }
                if self.check_step >= steps.len() {
                    return true;
                }
                let forward = if def.relative_to_player && facing.norm_squared() > 0.0 {
                    facing
                } else {
                    Direction::Forward.vector()
                };
                if steps[self.check_step] == axis_direction(input, forward) {
                    self.check_step += 1;
                }
                self.check_step >= steps.len()
            }
        }
    }

    fn check_angle(&mut self, from: Vec2, angle_delta: f32, turn: TurnDirection, input: Vec2) -> bool {
        let is_zero = input.x == 0.0 && input.y == 0.0;
        if self.aligned {
            if is_zero {
                self.reset();
                return false;
            }
            self.update_current_angle(from, turn, input);
            return self.cur_angle >= angle_delta;
        }

        if self.neutral_seen && safe_normal_2d(input).dot(&from) > DOT_PRODUCT_45 {
            self.aligned = true;
            // The sweep is measured from the aligned sample, not from `from` itself.
            self.prev_angle = angle_between_deg_2d(input, from);
            self.prev_vector = input;
        } else if is_zero {
            self.neutral_seen = true;
        }
        false
    }

    fn update_current_angle(&mut self, from: Vec2, turn: TurnDirection, input: Vec2) {
        let stick_angle = angle_between_deg_2d(input, from);
        let delta = (stick_angle - self.prev_angle).abs();

        let cross = self.prev_vector.x * input.y - self.prev_vector.y * input.x;
        let proper = match turn {
            TurnDirection::Clockwise => cross < 0.0,
            TurnDirection::CounterClockwise => cross > 0.0,
            TurnDirection::Either => true,
        };

        self.prev_angle = stick_angle;
        self.prev_vector = input;

        // Jumps over 90 degrees in one frame are noise (or a d-pad flip) and are not counted.
        if proper && delta <= 90.0 {
            self.cur_angle += delta;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sequence(steps: Vec<Direction>) -> MotionActionDef {
        MotionActionDef {
            id: InputId::new("Gesture"),
            axis: InputId::new("Move"),
            relative_to_player: false,
            mode: MotionMode::Sequence { steps },
        }
    }

    fn half_circle(turn: TurnDirection) -> MotionActionDef {
        MotionActionDef {
            id: InputId::new("HalfCircle"),
            axis: InputId::new("Move"),
            relative_to_player: false,
            mode: MotionMode::Angle {
                from: Direction::Back,
                angle_delta: 170.0,
                turn,
            },
        }
    }

    fn feed(matcher: &mut MotionMatcher, def: &MotionActionDef, samples: &[Vec2]) -> Option<usize> {
        samples
            .iter()
            .position(|s| matcher.check(def, *s, Vec2::new(0.0, 1.0)))
    }

    #[test]
    fn classifies_cardinal_directions() {
        let fwd = Vec2::new(0.0, 1.0);
        assert_eq!(axis_direction(Vec2::zeros(), fwd), Direction::Neutral);
        assert_eq!(axis_direction(Vec2::new(0.1, 1.0), fwd), Direction::Forward);
        assert_eq!(axis_direction(Vec2::new(1.0, 0.0), fwd), Direction::Right);
        assert_eq!(axis_direction(Vec2::new(-1.0, 0.2), fwd), Direction::Left);
        assert_eq!(axis_direction(Vec2::new(0.0, -1.0), fwd), Direction::Back);
    }

    #[test]
    fn classification_follows_facing() {
        // Facing +X: pushing the stick toward +X is forward, toward -Y is right.
        let facing = Vec2::new(1.0, 0.0);
        assert_eq!(axis_direction(Vec2::new(1.0, 0.0), facing), Direction::Forward);
        assert_eq!(axis_direction(Vec2::new(0.0, -1.0), facing), Direction::Right);
    }

    #[test]
    fn sequence_completes_on_last_step() {
        let def = sequence(vec![Direction::Back, Direction::Right, Direction::Forward]);
        let mut matcher = MotionMatcher::default();
        let samples = [
            Vec2::zeros(),
            Vec2::new(0.0, -1.0),
            Vec2::new(0.0, -1.0),
            Vec2::new(1.0, 0.0),
            Vec2::new(0.0, 1.0),
            Vec2::zeros(),
        ];
        assert_eq!(feed(&mut matcher, &def, &samples), Some(4));
    }

    #[test]
    fn sequence_out_of_order_does_not_complete() {
        let def = sequence(vec![Direction::Back, Direction::Forward]);
        let mut matcher = MotionMatcher::default();
        let samples = [Vec2::new(0.0, 1.0), Vec2::new(0.0, -1.0), Vec2::zeros()];
        assert_eq!(feed(&mut matcher, &def, &samples), None);
    }

    #[test]
    fn angle_sweep_requires_neutral_then_alignment() {
        let def = half_circle(TurnDirection::Either);
        let mut matcher = MotionMatcher::default();
        // Back -> Right -> Forward in 45 degree increments after a neutral frame.
        let mut samples = vec![Vec2::zeros()];
        for i in 0..=4 {
            let a = (-90.0f32 + 45.0 * i as f32).to_radians();
            samples.push(Vec2::new(a.cos(), a.sin()));
        }
        assert_eq!(feed(&mut matcher, &def, &samples), Some(5));
    }

    #[test]
    fn sweep_counts_from_the_aligned_sample() {
        let def = half_circle(TurnDirection::Either);
        let mut matcher = MotionMatcher::default();
        let at = |deg: f32| {
            let a = deg.to_radians();
            Vec2::new(a.cos(), a.sin())
        };
        // Aligns 40 degrees past straight back, then moves 5 more degrees.
        assert!(!matcher.check(&def, Vec2::zeros(), Vec2::new(0.0, 1.0)));
        assert!(!matcher.check(&def, at(-50.0), Vec2::new(0.0, 1.0)));
        assert!(matcher.swept_angle().abs() < 1.0e-4);
        assert!(!matcher.check(&def, at(-45.0), Vec2::new(0.0, 1.0)));
        assert!((matcher.swept_angle() - 5.0).abs() < 1.0e-2, "swept {}", matcher.swept_angle());
    }

    #[test]
    fn angle_sweep_in_wrong_direction_is_ignored() {
        let def = half_circle(TurnDirection::CounterClockwise);
        let mut matcher = MotionMatcher::default();
        let mut samples = vec![Vec2::zeros()];
        // Back -> Left -> Forward is clockwise in (x right, y forward) axes.
        for i in 0..=4 {
            let a = (-90.0f32 - 45.0 * i as f32).to_radians();
            samples.push(Vec2::new(a.cos(), a.sin()));
        }
        assert_eq!(feed(&mut matcher, &def, &samples), None);
    }

    #[test]
    fn returning_to_neutral_resets_the_sweep() {
        let def = half_circle(TurnDirection::Either);
        let mut matcher = MotionMatcher::default();
        matcher.check(&def, Vec2::zeros(), Vec2::y());
        matcher.check(&def, Vec2::new(0.0, -1.0), Vec2::y());
        matcher.check(&def, Vec2::new(0.7, -0.7), Vec2::y());
        assert!(matcher.swept_angle() > 40.0);
        matcher.check(&def, Vec2::zeros(), Vec2::y());
        assert_eq!(matcher.swept_angle(), 0.0);
    }
}
