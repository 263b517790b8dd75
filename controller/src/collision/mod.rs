/*!
Collision root module.

The movement solver never talks to a physics engine directly; it reads the world through the
`CollisionWorld` trait. `KinematicWorld` is the in-process implementation built on parry queries
(re-exported by rapier3d):

- shapes: collider definitions, the character capsule and query shapes
- world:  sweep / line trace / penetration queries, body states, kinematic platform integration
*/

pub mod shapes;
pub mod world;

pub use shapes::{
    BodyKind, CapsuleSpec, ColliderShapeDef, QueryShape, SurfaceProperties, Transform,
    WorldBodyDef, shape_from_def,
};
pub use world::{
    BodyId, BodyState, CollisionWorld, KinematicWorld, Penetration, QueryFilter, SweepHit,
};

use crate::math::{Quat, Vec3};

/// Convenience: a static infinite ground plane through `translation` facing `rotation * +Y`.
#[inline]
pub fn plane_def(id: BodyId, rotation: Quat, translation: Vec3) -> WorldBodyDef {
    WorldBodyDef::fixed(
        id,
        translation,
        rotation,
        ColliderShapeDef::Plane {
            offset_along_normal: 0.0,
        },
    )
}

/// Convenience: a static cuboid with given half extents and pose.
#[inline]
pub fn cuboid_def(id: BodyId, half_extents: Vec3, translation: Vec3, rotation: Quat) -> WorldBodyDef {
    WorldBodyDef::fixed(
        id,
        translation,
        rotation,
        ColliderShapeDef::Cuboid { half_extents },
    )
}
