/*!
Kinematic character movement.

A `MovementSolver` moves one capsule through a `CollisionWorld`. The host supplies velocity
through `MovementCallbacks` and calls `perform_movement` once per update; the solver sweeps,
slides, steps up, snaps to floors, follows moving bases and lands.

- settings:    per-character tuning (serde, JSON-friendly)
- state:       movement states and base attachment info
- floor:       floor probe results
- callbacks:   host hooks and the per-call context
- solver:      the solver struct, state transitions and `perform_movement`
- tick:        per-state substep loops
- floor_probe: floor sweeps, perching and landing checks
- slide:       swept moves, depenetration and sliding
- step:        step-up
- ledge:       ledges and ground denivelation
- base:        moving bases
- forces:      external forces and physics interaction
- root_motion: root-motion sources and animation root motion
- transaction: scoped, revertible moves
*/

mod base;
pub mod callbacks;
mod debug;
pub mod floor;
mod floor_probe;
pub mod forces;
mod ledge;
pub mod root_motion;
pub mod settings;
mod slide;
pub mod solver;
pub mod state;
mod step;
mod tick;
pub mod transaction;

pub use callbacks::{MoveContext, MovementCallbacks, VelocityContext};
pub use floor::{GroundingStatus, StepDownResult};
pub use forces::{PhysicsInteraction, RadialFalloff};
pub use root_motion::{
    AccumulateMode, AnimationRootMotion, Curve, FinishVelocity, MontageState, RootMotionForce,
    RootMotionParams, RootMotionSettingsFlag, RootMotionSource, RootMotionSourceGroup,
    RootMotionSourceId,
};
pub use settings::{MovementSettings, StabilityOrientation};
pub use solver::MovementSolver;
pub use state::{BasedMovementInfo, MovementState};
pub use transaction::MovementTransaction;
