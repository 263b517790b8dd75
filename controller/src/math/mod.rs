/*!
Math aliases and vector helpers shared by the solver and the input buffer.

Conventions
- Right-handed, +Y up. "Planar" means the XZ plane; "vertical" means along +Y.
- Input axes are 2D: `x` is right, `y` is forward.
*/

use nalgebra as na;

pub mod utils;

pub type Vec2 = na::Vector2<f32>;
pub type Vec3 = na::Vector3<f32>;
pub type Quat = na::UnitQuaternion<f32>;
pub type Iso = na::Isometry3<f32>;

pub use utils::*;
