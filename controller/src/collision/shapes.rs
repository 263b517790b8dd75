use nalgebra as na;
use rapier3d::parry::shape::SharedShape;

use crate::math::{Iso, Quat, Vec3};

/// A rigid transform (isometry) in world space.
#[derive(Clone, Copy, Debug)]
pub struct Transform {
    pub translation: Vec3,
    pub rotation: Quat,
}

impl Transform {
    #[inline]
    pub fn new(translation: Vec3, rotation: Quat) -> Self {
        Self {
            translation,
            rotation,
        }
    }

    #[inline]
    pub fn from_translation(translation: Vec3) -> Self {
        Self::new(translation, Quat::identity())
    }

    /// Convert to nalgebra `Isometry3` for use with parry queries.
    #[inline]
    pub fn iso(&self) -> Iso {
        Iso::from_parts(
            na::Translation3::new(self.translation.x, self.translation.y, self.translation.z),
            self.rotation,
        )
    }
}

/// Supported world collider shapes.
#[derive(Clone, Debug)]
pub enum ColliderShapeDef {
    /// Infinite plane (half-space).
    ///
    /// The plane normal is derived from the pose as `rotation * +Y` and the plane sits at
    /// `dist = normal . translation + offset_along_normal`.
    Plane {
        /// Offset along the plane normal (meters).
        offset_along_normal: f32,
    },

    /// Oriented cuboid with given half-extents (meters).
    Cuboid { half_extents: Vec3 },

    /// Sphere/ball (meters).
    Sphere { radius: f32 },

    /// Y-aligned capsule (meters).
    CapsuleY { radius: f32, half_height: f32 },

    /// Y-aligned cylinder (meters).
    CylinderY { radius: f32, half_height: f32 },

    /// Y-aligned cone (meters).
    ConeY { radius: f32, half_height: f32 },

    /// Rounded cuboid (meters).
    RoundCuboid {
        half_extents: Vec3,
        border_radius: f32,
    },

    /// Y-aligned rounded cylinder (meters).
    RoundCylinderY {
        radius: f32,
        half_height: f32,
        border_radius: f32,
    },

    /// Y-aligned rounded cone (meters).
    RoundConeY {
        radius: f32,
        half_height: f32,
        border_radius: f32,
    },
}

/// How a world body moves.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum BodyKind {
    /// Never moves; can still be a movement base but imparts no velocity.
    Static,
    /// Moved by the host (platforms, elevators). Imparts its velocity to based characters.
    Kinematic,
    /// Driven by forces. Receives impact and standing forces from the character.
    Dynamic { mass: f32 },
}

impl BodyKind {
    /// True for bodies whose pose can change between ticks.
    #[inline]
    pub fn is_movable(&self) -> bool {
        !matches!(self, BodyKind::Static)
    }

    #[inline]
    pub fn mass(&self) -> Option<f32> {
        match self {
            BodyKind::Dynamic { mass } => Some(*mass),
            _ => None,
        }
    }
}

/// Per-surface movement rules.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SurfaceProperties {
    /// Replaces the character's max stable slope angle on this surface (degrees).
    pub walkable_slope_override: Option<f32>,
    /// Whether the character may step up onto this surface.
    pub can_step_up_on: bool,
    /// Whether the character may use this surface as a movement base.
    pub can_be_based_on: bool,
}

impl Default for SurfaceProperties {
    fn default() -> Self {
        Self {
            walkable_slope_override: None,
            can_step_up_on: true,
            can_be_based_on: true,
        }
    }
}

/// Canonical definition of one collider in the query world.
///
/// Conventions
/// - Units are meters.
/// - `id` is unique; the world sorts by it so insertion order is deterministic.
#[derive(Clone, Debug)]
pub struct WorldBodyDef {
    pub id: u32,
    /// World-space translation.
    pub translation: Vec3,
    /// World-space rotation (unit quaternion).
    pub rotation: Quat,
    pub shape: ColliderShapeDef,
    pub kind: BodyKind,
    pub surface: SurfaceProperties,
}

impl WorldBodyDef {
    /// A static body with default surface rules.
    pub fn fixed(id: u32, translation: Vec3, rotation: Quat, shape: ColliderShapeDef) -> Self {
        Self {
            id,
            translation,
            rotation,
            shape,
            kind: BodyKind::Static,
            surface: SurfaceProperties::default(),
        }
    }

    pub fn with_kind(mut self, kind: BodyKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_surface(mut self, surface: SurfaceProperties) -> Self {
        self.surface = surface;
        self
    }

    #[inline]
    pub fn transform(&self) -> Transform {
        Transform::new(self.translation, self.rotation)
    }
}

/// Build a parry shape from a def, along with the shape's world pose.
///
/// Planes are placed at `normal * dist` with identity rotation so the half-space normal is the
/// pose-derived one; every other shape uses the def's pose unchanged.
pub fn shape_from_def(def: &WorldBodyDef) -> (SharedShape, Iso) {
    let pose = def.transform().iso();
    match &def.shape {
        ColliderShapeDef::Plane {
            offset_along_normal,
        } => {
            let n = def.rotation * Vec3::y();
            let dist = n.dot(&def.translation) + *offset_along_normal;
            let unit_n = na::Unit::new_normalize(n);
            let at = unit_n.into_inner() * dist;
            (
                SharedShape::halfspace(unit_n),
                Iso::from_parts(na::Translation3::new(at.x, at.y, at.z), Quat::identity()),
            )
        }

        ColliderShapeDef::Cuboid { half_extents } => (
            SharedShape::cuboid(half_extents.x, half_extents.y, half_extents.z),
            pose,
        ),

        ColliderShapeDef::Sphere { radius } => (SharedShape::ball(*radius), pose),

        ColliderShapeDef::CapsuleY {
            radius,
            half_height,
        } => (SharedShape::capsule_y(*half_height, *radius), pose),

        ColliderShapeDef::CylinderY {
            radius,
            half_height,
        } => (SharedShape::cylinder(*half_height, *radius), pose),

        ColliderShapeDef::ConeY {
            radius,
            half_height,
        } => (SharedShape::cone(*half_height, *radius), pose),

        ColliderShapeDef::RoundCuboid {
            half_extents,
            border_radius,
        } => (
            SharedShape::round_cuboid(
                half_extents.x,
                half_extents.y,
                half_extents.z,
                *border_radius,
            ),
            pose,
        ),

        ColliderShapeDef::RoundCylinderY {
            radius,
            half_height,
            border_radius,
        } => (
            SharedShape::round_cylinder(*half_height, *radius, *border_radius),
            pose,
        ),

        ColliderShapeDef::RoundConeY {
            radius,
            half_height,
            border_radius,
        } => (
            SharedShape::round_cone(*half_height, *radius, *border_radius),
            pose,
        ),
    }
}

/// Capsule specification for the controlled character.
///
/// `half_height` is the half-length of the cylinder section (aligned with +Y), so the capsule
/// spans `total_half_height()` above and below its center.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CapsuleSpec {
    pub radius: f32,
    pub half_height: f32,
}

impl CapsuleSpec {
    #[inline]
    pub fn new(radius: f32, half_height: f32) -> Self {
        Self {
            radius,
            half_height,
        }
    }

    /// Distance from the capsule center to its lowest point.
    #[inline]
    pub fn total_half_height(&self) -> f32 {
        self.half_height + self.radius
    }

    /// Capsule with the same total half height but a different radius.
    ///
    /// The floor probe uses this to sweep thinner capsules that reach the same depth.
    #[inline]
    pub fn with_radius(&self, radius: f32) -> Self {
        let total = self.total_half_height();
        let radius = radius.min(total);
        Self::new(radius, (total - radius).max(0.0))
    }

    /// Capsule of `radius` whose total half height is `total_half_height`.
    #[inline]
    pub fn from_total(radius: f32, total_half_height: f32) -> Self {
        let radius = radius.min(total_half_height).max(0.0);
        Self::new(radius, (total_half_height - radius).max(0.0))
    }
}

/// Shape swept by a query.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum QueryShape {
    Capsule(CapsuleSpec),
    /// Box given by half extents; used for flat-based floor probes.
    Box { half_extents: Vec3 },
}

impl QueryShape {
    pub fn to_shared(&self) -> SharedShape {
        match *self {
            QueryShape::Capsule(c) => SharedShape::capsule_y(c.half_height, c.radius),
            QueryShape::Box { half_extents } => {
                SharedShape::cuboid(half_extents.x, half_extents.y, half_extents.z)
            }
        }
    }
}

impl From<CapsuleSpec> for QueryShape {
    fn from(value: CapsuleSpec) -> Self {
        QueryShape::Capsule(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plane_pose_is_derived_from_rotation_and_offset() {
        let def = WorldBodyDef::fixed(
            1,
            Vec3::new(0.0, 2.0, 0.0),
            Quat::identity(),
            ColliderShapeDef::Plane {
                offset_along_normal: 0.5,
            },
        );
        let (_shape, iso) = shape_from_def(&def);
        assert!((iso.translation.vector - Vec3::new(0.0, 2.5, 0.0)).norm() < 1.0e-6);
    }

    #[test]
    fn capsule_total_half_height_includes_radius() {
        let c = CapsuleSpec::new(0.4, 0.5);
        assert!((c.total_half_height() - 0.9).abs() < 1.0e-6);

        let thin = c.with_radius(0.1);
        assert!((thin.total_half_height() - 0.9).abs() < 1.0e-6);
        assert!((thin.radius - 0.1).abs() < 1.0e-6);
    }

    #[test]
    fn from_total_clamps_radius_to_height() {
        let c = CapsuleSpec::from_total(1.0, 0.5);
        assert!((c.radius - 0.5).abs() < 1.0e-6);
        assert!(c.half_height.abs() < 1.0e-6);
    }
}
