pub mod bitmask_flags;
pub mod collision;
pub mod config;
pub mod constants;
pub mod error;
pub mod input;
pub mod math;
pub mod movement;

pub use collision::{
    BodyId, BodyKind, CapsuleSpec, ColliderShapeDef, CollisionWorld, KinematicWorld, SurfaceProperties,
    SweepHit, WorldBodyDef, cuboid_def, plane_def,
};
pub use config::ControllerConfig;
pub use error::{ConfigError, ConfigResult};
pub use input::{
    BindingHandle, Delegate, Direction, InputBuffer, InputBufferSettings, InputId, InputMap, InputValue,
    MotionActionDef, MotionMode, SequenceOrder, TriggerEvent, TurnDirection, UnbindPolicy,
};
pub use math::{Quat, Vec2, Vec3};
pub use movement::{
    FinishVelocity, GroundingStatus, MovementCallbacks, MovementSettings, MovementSolver,
    MovementState, PhysicsInteraction, RootMotionForce, RootMotionSettingsFlag, RootMotionSource,
    VelocityContext,
};
