use glam::{Mat4, Quat, Vec3};

use crate::collision::ShapeHandle;

/// Transform component. Present on every entity.
#[derive(Debug, Clone)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
        }
    }
}

impl Transform {
    pub fn matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.position)
    }
}

/// Camera component.
#[derive(Debug, Clone)]
pub struct Camera {
    pub fov_degrees: f32,
    pub near: f32,
    pub far: f32,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            fov_degrees: 75.0,
            near: 0.1,
            far: 100_000.0,
        }
    }
}

/// First-person viewer marker component. Position lives in the entity's
/// Transform; orientation is yaw/pitch.
#[derive(Debug, Clone)]
pub struct Player {
    pub yaw: f32,
    pub pitch: f32,
    pub height: f32,
    pub radius: f32,
}

impl Default for Player {
    fn default() -> Self {
        Self {
            yaw: 0.0,
            pitch: 0.0,
            height: 65.0,
            radius: 10.0,
        }
    }
}

impl Player {
    /// World-forward unit vector for the current yaw/pitch.
    pub fn world_forward(&self) -> Vec3 {
        let rotation = Quat::from_rotation_y(self.yaw) * Quat::from_rotation_x(self.pitch);
        rotation * Vec3::NEG_Z
    }
}

/// Newtype handle into the mesh cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MeshHandle(pub usize);

/// Newtype handle into the material-instance registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SlotId(pub u64);

/// Identifies this entity as a mesh to render.
#[derive(Debug, Clone)]
pub struct MeshRenderer {
    pub mesh: MeshHandle,
    pub slot: SlotId,
}

/// A picture frame whose display surface can be rebound to a new image.
///
/// `generation` increments on every bind request; completions stamped with
/// an older generation are dropped so an in-flight load can never clobber a
/// newer bind.
#[derive(Debug, Clone)]
pub struct Painting {
    pub current_image_url: Option<String>,
    pub generation: u64,
    pub base_slot: SlotId,
    pub active_slot: SlotId,
    pub shapes: Vec<ShapeHandle>,
}

impl Painting {
    pub fn new(base_slot: SlotId, shapes: Vec<ShapeHandle>) -> Self {
        Self {
            current_image_url: None,
            generation: 0,
            base_slot,
            active_slot: base_slot,
            shapes,
        }
    }
}

/// Tag component storing the entity's config id string.
#[derive(Debug, Clone)]
pub struct EntityId(pub String);

/// Tag component for searchable tags.
#[derive(Debug, Clone)]
pub struct Tags(pub Vec<String>);
