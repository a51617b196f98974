use std::collections::HashMap;

use glam::{EulerRot, Quat, Vec3};
use hecs::World;

use atrium_core::collision::{ColliderShape, CollisionWorld};
use atrium_core::components::{
    Camera, EntityId, MeshHandle, MeshRenderer, Painting, Player, Tags, Transform,
};

use crate::assets::{ModelKind, ModelRequest};
use crate::config::GalleryConfig;
use crate::material::{MaterialInstance, MaterialRegistry};
use crate::mesh::MeshData;

/// Base material for the museum shell.
const MUSEUM_COLOR: [f32; 4] = [0.82, 0.80, 0.76, 1.0];
/// Base material for an unbound painting surface.
const CANVAS_COLOR: [f32; 4] = [0.92, 0.90, 0.85, 1.0];

/// Central gallery state: the ECS world plus entity name registry and the
/// list of paintings for picking and randomize-all.
pub struct GalleryWorld {
    pub world: World,
    pub entity_registry: HashMap<String, hecs::Entity>,
    pub paintings: Vec<hecs::Entity>,
}

impl GalleryWorld {
    pub fn new() -> Self {
        Self {
            world: World::new(),
            entity_registry: HashMap::new(),
            paintings: Vec::new(),
        }
    }

    /// Spawn the player entity from config.
    pub fn spawn_player(&mut self, config: &GalleryConfig) -> hecs::Entity {
        let player = Player {
            yaw: config.spawn.yaw.to_radians(),
            pitch: 0.0,
            height: config.movement.player_height,
            radius: config.movement.player_radius,
        };
        let camera = Camera {
            fov_degrees: config.camera.fov,
            near: config.camera.near,
            far: config.camera.far,
        };
        let transform = Transform {
            position: Vec3::from(config.spawn.position),
            ..Default::default()
        };

        let entity = self.world.spawn((
            EntityId("player".to_string()),
            player,
            camera,
            transform,
        ));
        self.entity_registry.insert("player".to_string(), entity);
        entity
    }

    /// Spawn a loaded model: place it, register one collider per primitive,
    /// and give paintings their material slot and pick shapes.
    pub fn spawn_model(
        &mut self,
        request: &ModelRequest,
        data: &MeshData,
        mesh: MeshHandle,
        materials: &mut MaterialRegistry,
        collision: &mut CollisionWorld,
    ) -> hecs::Entity {
        let transform = Transform {
            position: Vec3::from(request.position),
            rotation: euler_degrees_to_quat(request.rotation),
            scale: Vec3::from(request.scale),
        };
        let matrix = transform.matrix();

        let mut shapes = Vec::with_capacity(data.primitives.len());
        for primitive in &data.primitives {
            let positions = primitive
                .vertices
                .iter()
                .map(|v| matrix.transform_point3(Vec3::from(v.position)))
                .collect();
            shapes.push(collision.add_collider(ColliderShape {
                positions,
                indices: primitive.indices.clone(),
            }));
        }

        let (base_color, tag) = match request.kind {
            ModelKind::Museum => (MUSEUM_COLOR, "museum"),
            ModelKind::Painting => (CANVAS_COLOR, "painting"),
        };
        let slot = materials.insert(MaterialInstance::opaque(base_color));

        let entity = self.world.spawn((
            EntityId(request.id.clone()),
            Tags(vec![tag.to_string()]),
            transform,
            MeshRenderer { mesh, slot },
        ));

        if request.kind == ModelKind::Painting {
            let _ = self
                .world
                .insert_one(entity, Painting::new(slot, shapes.clone()));
            self.paintings.push(entity);
        }

        self.entity_registry.insert(request.id.clone(), entity);
        tracing::info!(
            "Spawned {} '{}' with {} colliders",
            tag,
            request.id,
            shapes.len()
        );
        entity
    }

    /// Tear down all gallery entities and bookkeeping.
    pub fn clear(&mut self) {
        self.world.clear();
        self.entity_registry.clear();
        self.paintings.clear();
    }
}

impl Default for GalleryWorld {
    fn default() -> Self {
        Self::new()
    }
}

/// Euler degrees (x, y, z) to a quaternion, yaw-pitch-roll order.
pub fn euler_degrees_to_quat(rotation: [f32; 3]) -> Quat {
    Quat::from_euler(
        EulerRot::YXZ,
        rotation[1].to_radians(),
        rotation[0].to_radians(),
        rotation[2].to_radians(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::procedural_panel;

    fn panel_request(id: &str, kind: ModelKind, position: [f32; 3]) -> ModelRequest {
        ModelRequest {
            id: id.to_string(),
            source: "procedural:panel".to_string(),
            kind,
            position,
            rotation: [0.0; 3],
            scale: [1.0; 3],
        }
    }

    #[test]
    fn test_spawn_painting_registers_collider_and_painting() {
        let mut gallery = GalleryWorld::new();
        let mut materials = MaterialRegistry::new();
        let mut collision = CollisionWorld::new(2.0, 4.0);

        let data = procedural_panel();
        let entity = gallery.spawn_model(
            &panel_request("painting_01", ModelKind::Painting, [0.0, 0.0, -5.0]),
            &data,
            MeshHandle(0),
            &mut materials,
            &mut collision,
        );

        assert_eq!(collision.collider_count(), 1);
        assert_eq!(gallery.paintings, vec![entity]);
        let painting = gallery.world.get::<&Painting>(entity).unwrap();
        assert_eq!(painting.shapes.len(), 1);
        assert!(painting.current_image_url.is_none());
        assert_eq!(materials.len(), 1);
    }

    #[test]
    fn test_spawn_museum_is_not_a_painting() {
        let mut gallery = GalleryWorld::new();
        let mut materials = MaterialRegistry::new();
        let mut collision = CollisionWorld::new(2.0, 4.0);

        let data = crate::mesh::procedural_room();
        let entity = gallery.spawn_model(
            &panel_request("museum", ModelKind::Museum, [0.0, 0.0, 0.0]),
            &data,
            MeshHandle(0),
            &mut materials,
            &mut collision,
        );

        // One collider per wall.
        assert_eq!(collision.collider_count(), 6);
        assert!(gallery.paintings.is_empty());
        assert!(gallery.world.get::<&Painting>(entity).is_err());
    }

    #[test]
    fn test_spawn_bakes_placement_into_colliders() {
        let mut gallery = GalleryWorld::new();
        let mut materials = MaterialRegistry::new();
        let mut collision = CollisionWorld::new(1.0, 2.0);

        let data = procedural_panel();
        gallery.spawn_model(
            &ModelRequest {
                id: "painting_01".to_string(),
                source: "procedural:panel".to_string(),
                kind: ModelKind::Painting,
                position: [10.0, 0.0, 0.0],
                rotation: [0.0, 90.0, 0.0],
                scale: [2.0, 2.0, 1.0],
            },
            &data,
            MeshHandle(0),
            &mut materials,
            &mut collision,
        );

        // The panel is rotated into the YZ plane at x = 10; a ray along +X
        // from the origin hits it head on.
        use atrium_core::collision::ray_shape_intersection;
        let shape = collision.shape(atrium_core::collision::ShapeHandle(0));
        let hit = ray_shape_intersection(shape, Vec3::ZERO, Vec3::X).unwrap();
        assert!((hit - 10.0).abs() < 1e-3);
    }

    #[test]
    fn test_spawn_player_uses_config() {
        let yaml = r#"
name: "T"
museum:
  id: museum
  model: procedural:room
movement:
  player_height: 50.0
  player_radius: 5.0
spawn:
  position: [1.0, 50.0, 2.0]
  yaw: 90.0
"#;
        let config: GalleryConfig = serde_yaml::from_str(yaml).unwrap();
        let mut gallery = GalleryWorld::new();
        let entity = gallery.spawn_player(&config);

        let player = gallery.world.get::<&Player>(entity).unwrap();
        assert_eq!(player.height, 50.0);
        assert_eq!(player.radius, 5.0);
        assert!((player.yaw - std::f32::consts::FRAC_PI_2).abs() < 1e-5);
        let transform = gallery.world.get::<&Transform>(entity).unwrap();
        assert_eq!(transform.position, Vec3::new(1.0, 50.0, 2.0));
    }

    #[test]
    fn test_clear_empties_registry() {
        let mut gallery = GalleryWorld::new();
        let mut materials = MaterialRegistry::new();
        let mut collision = CollisionWorld::new(2.0, 4.0);
        gallery.spawn_model(
            &panel_request("painting_01", ModelKind::Painting, [0.0; 3]),
            &procedural_panel(),
            MeshHandle(0),
            &mut materials,
            &mut collision,
        );

        gallery.clear();
        assert!(gallery.paintings.is_empty());
        assert!(gallery.entity_registry.is_empty());
        assert_eq!(gallery.world.len(), 0);
    }
}
