pub mod bounds;
pub mod transform;
pub mod xfo2;

pub use glam::{DMat2, DQuat, DVec2, DVec3, DVec4, Vec2, Vec3, Vec4};
pub use bounds::{Box2, Box3};
pub use transform::Xfo;
pub use xfo2::Xfo2;

pub type Point2 = DVec2;
pub type Point3 = DVec3;
pub type Vector2 = DVec2;
pub type Vector3 = DVec3;
