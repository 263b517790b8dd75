/*!
Solver tolerances and input-buffer defaults.

Notes
- Distances are in meters, time in seconds, angles in degrees unless stated otherwise.
- Up is +Y. Gravity points along -Y.
- These are tolerances, not tunables. Per-character tuning lives in `MovementSettings` and
  `InputBufferSettings`; only change the values here if the whole controller needs a different
  scale.
*/

/// Smallest substep the solver will simulate (seconds).
///
/// Substeps shorter than this are dropped instead of integrated.
pub const MIN_TICK_TIME: f32 = 1.0e-6;

/// Lower bound of the band the capsule hovers above a walkable floor (meters).
///
/// Convention:
/// - The floor probe reports the gap between the capsule bottom and the floor.
/// - `adjust_floor_height` moves the capsule back into `[MIN_FLOOR_DIST, MAX_FLOOR_DIST]`.
pub const MIN_FLOOR_DIST: f32 = 0.019;

/// Upper bound of the hover band (meters).
pub const MAX_FLOOR_DIST: f32 = 0.024;

/// Hits closer than this to the capsule's outer radius count as edge clips (meters).
pub const SWEEP_EDGE_REJECT_DISTANCE: f32 = 0.0015;

/// Smallest radius a perch probe is allowed to use (meters).
pub const MIN_PERCH_RADIUS: f32 = 0.0011;

/// Extra distance added when pushing the capsule out of penetration (meters).
pub const PENETRATION_PULLBACK_DISTANCE: f32 = 0.00125;

/// Distance a sweep result is pulled back along the trace from the contact (meters).
///
/// Keeps a resting capsule from starting its next sweep in contact.
pub const SWEEP_PULLBACK_DISTANCE: f32 = 0.001;

/// Maximum `impact_normal . up` for a step side to be treated as a vertical face.
///
/// Typical values: 0.05 .. 0.1
pub const MAX_STEP_SIDE_Y: f32 = 0.08;

/// `normal . up` above which a slope is considered non-vertical.
pub const VERTICAL_SLOPE_NORMAL_Y: f32 = 0.001;

/// Practical small number for dot-product guards and distance comparisons.
pub const KINDA_SMALL_NUMBER: f32 = 1.0e-4;

/// Very small number used as a liftoff bound and for normalization guards.
pub const SMALL_NUMBER: f32 = 1.0e-8;

/// Nudge applied when a slide hits the same wall twice (meters).
pub const SAME_WALL_NUDGE: f32 = 1.0e-4;

/// Sideways nudge when an airborne slide gets wedged with zero travel (meters).
pub const STUCK_SIDE_STEP_DISTANCE: f32 = 0.01;

/// Root-motion translation components below this are dropped (meters).
pub const ROOT_MOTION_COMPONENT_CUTOFF: f32 = 1.0e-4;

/// Body speed below which an impacted body is treated as resting (meters per second).
pub const RESTING_BODY_SPEED_TOLERANCE: f32 = 0.01;

/// Slack allowed over the expected speed of a restricted move-to source (meters per second).
pub const MOVE_TO_SPEED_SLACK: f32 = 0.005;

/// Fraction of `total_half_height - radius` the first floor sweep shrinks the capsule by.
pub const FLOOR_SWEEP_SHRINK_SCALE: f32 = 0.1;

/// Fraction used by the retry sweep after an edge clip or penetration.
pub const FLOOR_SWEEP_SHRINK_SCALE_OVERLAP: f32 = 0.9;

/// Standard gravity magnitude (meters per second squared, positive value).
///
/// The solver reports `-Y * GRAVITY_MPS2 * gravity_scale` to the velocity callback.
pub const GRAVITY_MPS2: f32 = 9.81;

/// `cos(45deg)`, the alignment threshold of the directional matcher.
pub const DOT_PRODUCT_45: f32 = 0.707;

/// Default ring-buffer capacity, in buffer frames.
pub const DEFAULT_FULL_FRAME_WINDOW: usize = 40;

/// Default press/hold/release lookback, in buffer frames.
///
/// Must not exceed the full window.
pub const DEFAULT_BUTTON_FRAME_WINDOW: usize = 20;

/// Default buffer tick rate (hertz).
pub const DEFAULT_UPDATE_FRAME_RATE: f32 = 50.0;
