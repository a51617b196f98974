use glam::Vec3;

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    pub fn from_points(points: &[Vec3]) -> Self {
        let mut min = Vec3::splat(f32::INFINITY);
        let mut max = Vec3::splat(f32::NEG_INFINITY);
        for p in points {
            min = min.min(*p);
            max = max.max(*p);
        }
        if points.is_empty() {
            min = Vec3::ZERO;
            max = Vec3::ZERO;
        }
        Self { min, max }
    }

    pub fn from_center_half_extents(center: Vec3, half_extents: Vec3) -> Self {
        Self {
            min: center - half_extents,
            max: center + half_extents,
        }
    }

    pub fn intersects(&self, other: &Aabb) -> bool {
        self.min.x <= other.max.x
            && self.max.x >= other.min.x
            && self.min.y <= other.max.y
            && self.max.y >= other.min.y
            && self.min.z <= other.max.z
            && self.max.z >= other.min.z
    }
}

/// Immutable world-space triangle soup backing a collider. Shared with the
/// painting pick ray, which tests shapes directly.
#[derive(Debug, Clone)]
pub struct ColliderShape {
    pub positions: Vec<Vec3>,
    pub indices: Vec<u32>,
}

impl ColliderShape {
    pub fn triangles(&self) -> impl Iterator<Item = [Vec3; 3]> + '_ {
        self.indices.chunks_exact(3).filter_map(|tri| {
            let a = self.positions.get(tri[0] as usize)?;
            let b = self.positions.get(tri[1] as usize)?;
            let c = self.positions.get(tri[2] as usize)?;
            Some([*a, *b, *c])
        })
    }
}

/// Newtype handle into the shape store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ShapeHandle(pub usize);

struct Collider {
    shape: ShapeHandle,
    bounds: Aabb,
}

/// Registry of static colliders with a two-tier blocked query.
///
/// Colliders are registered once per renderable primitive at model load
/// time and cleared in bulk on teardown; there is no individual removal.
/// Bounds are recomputed from the shape on every query — a box stored
/// between queries is never trusted.
pub struct CollisionWorld {
    player_radius: f32,
    player_height: f32,
    shapes: Vec<ColliderShape>,
    colliders: Vec<Collider>,
}

impl CollisionWorld {
    pub fn new(player_radius: f32, player_height: f32) -> Self {
        Self {
            player_radius,
            player_height,
            shapes: Vec::new(),
            colliders: Vec::new(),
        }
    }

    /// Register a collider. Computes and stores its initial bounds.
    pub fn add_collider(&mut self, shape: ColliderShape) -> ShapeHandle {
        let handle = ShapeHandle(self.shapes.len());
        let bounds = Aabb::from_points(&shape.positions);
        self.shapes.push(shape);
        self.colliders.push(Collider {
            shape: handle,
            bounds,
        });
        handle
    }

    pub fn shape(&self, handle: ShapeHandle) -> &ColliderShape {
        &self.shapes[handle.0]
    }

    pub fn collider_count(&self) -> usize {
        self.colliders.len()
    }

    pub fn clear(&mut self) {
        self.shapes.clear();
        self.colliders.clear();
    }

    /// Answer whether movement from `position` toward `direction` is
    /// blocked by any registered collider.
    ///
    /// Two tiers per collider, short-circuiting on the first hit:
    /// box-vs-box overlap first, then a ray cast against the full triangle
    /// soup with a hit counted when it lands closer than the player
    /// radius. An empty registry never blocks.
    pub fn query(&mut self, position: Vec3, direction: Vec3) -> bool {
        let player_box = Aabb::from_center_half_extents(
            position,
            Vec3::new(
                self.player_radius,
                self.player_height / 2.0,
                self.player_radius,
            ),
        );
        let dir = direction.normalize_or_zero();

        for collider in &mut self.colliders {
            let shape = &self.shapes[collider.shape.0];
            collider.bounds = Aabb::from_points(&shape.positions);

            if player_box.intersects(&collider.bounds) {
                return true;
            }

            if dir != Vec3::ZERO {
                if let Some(distance) = ray_shape_intersection(shape, position, dir) {
                    if distance < self.player_radius {
                        return true;
                    }
                }
            }
        }
        false
    }
}

/// Nearest intersection distance of a ray with a triangle soup.
pub fn ray_shape_intersection(shape: &ColliderShape, origin: Vec3, direction: Vec3) -> Option<f32> {
    let mut nearest: Option<f32> = None;
    for triangle in shape.triangles() {
        if let Some(t) = ray_triangle_intersection(origin, direction, &triangle) {
            if nearest.map_or(true, |n| t < n) {
                nearest = Some(t);
            }
        }
    }
    nearest
}

/// Möller–Trumbore ray/triangle test. Hits on both faces; returns the ray
/// parameter for a hit in front of the origin.
fn ray_triangle_intersection(origin: Vec3, direction: Vec3, triangle: &[Vec3; 3]) -> Option<f32> {
    const EPSILON: f32 = 1e-6;

    let edge1 = triangle[1] - triangle[0];
    let edge2 = triangle[2] - triangle[0];
    let p = direction.cross(edge2);
    let det = edge1.dot(p);
    if det.abs() < EPSILON {
        return None;
    }

    let inv_det = 1.0 / det;
    let s = origin - triangle[0];
    let u = s.dot(p) * inv_det;
    if !(0.0..=1.0).contains(&u) {
        return None;
    }

    let q = s.cross(edge1);
    let v = direction.dot(q) * inv_det;
    if v < 0.0 || u + v > 1.0 {
        return None;
    }

    let t = edge2.dot(q) * inv_det;
    if t > EPSILON {
        Some(t)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Triangle soup for an axis-aligned cuboid.
    fn box_shape(min: Vec3, max: Vec3) -> ColliderShape {
        let positions = vec![
            Vec3::new(min.x, min.y, min.z),
            Vec3::new(max.x, min.y, min.z),
            Vec3::new(max.x, max.y, min.z),
            Vec3::new(min.x, max.y, min.z),
            Vec3::new(min.x, min.y, max.z),
            Vec3::new(max.x, min.y, max.z),
            Vec3::new(max.x, max.y, max.z),
            Vec3::new(min.x, max.y, max.z),
        ];
        #[rustfmt::skip]
        let indices = vec![
            0, 1, 2, 0, 2, 3, // back
            4, 6, 5, 4, 7, 6, // front
            0, 3, 7, 0, 7, 4, // left
            1, 5, 6, 1, 6, 2, // right
            3, 2, 6, 3, 6, 7, // top
            0, 4, 5, 0, 5, 1, // bottom
        ];
        ColliderShape { positions, indices }
    }

    #[test]
    fn test_empty_registry_never_blocks() {
        let mut world = CollisionWorld::new(2.0, 10.0);
        assert!(!world.query(Vec3::ZERO, Vec3::X));
        assert!(!world.query(Vec3::new(100.0, -3.0, 7.0), Vec3::ZERO));
    }

    #[test]
    fn test_player_box_overlap_blocks_regardless_of_direction() {
        let mut world = CollisionWorld::new(2.0, 10.0);
        world.add_collider(box_shape(Vec3::ZERO, Vec3::splat(10.0)));
        world.add_collider(box_shape(Vec3::splat(20.0), Vec3::splat(30.0)));

        let position = Vec3::splat(5.0);
        assert!(world.query(position, Vec3::X));
        assert!(world.query(position, Vec3::NEG_Z));
        assert!(world.query(position, Vec3::ZERO));
    }

    #[test]
    fn test_distant_collider_does_not_block() {
        let mut world = CollisionWorld::new(2.0, 10.0);
        world.add_collider(box_shape(Vec3::splat(20.0), Vec3::splat(30.0)));
        assert!(!world.query(Vec3::splat(5.0), Vec3::X));
    }

    #[test]
    fn test_enlarging_geometry_is_monotonic() {
        let mut world = CollisionWorld::new(2.0, 10.0);
        world.add_collider(box_shape(Vec3::splat(20.0), Vec3::splat(30.0)));
        let position = Vec3::splat(5.0);
        assert!(!world.query(position, Vec3::ONE.normalize()));

        // Grow the same registry entry's geometry toward the player.
        world.clear();
        world.add_collider(box_shape(Vec3::splat(4.0), Vec3::splat(30.0)));
        assert!(world.query(position, Vec3::ONE.normalize()));
    }

    #[test]
    fn test_ray_tier_blocks_outside_box_overlap() {
        // A small triangle above the player box but within player radius
        // along the view ray: the box tier misses, the ray tier must hit.
        let mut world = CollisionWorld::new(2.0, 2.0);
        world.add_collider(ColliderShape {
            positions: vec![
                Vec3::new(1.2, 1.25, -0.5),
                Vec3::new(1.2, 1.25, 0.5),
                Vec3::new(1.2, 1.45, 0.0),
            ],
            indices: vec![0, 1, 2],
        });

        let toward = Vec3::new(1.2, 1.32, 0.0).normalize();
        assert!(world.query(Vec3::ZERO, toward));
        // Looking away from the triangle, nothing blocks.
        assert!(!world.query(Vec3::ZERO, -toward));
    }

    #[test]
    fn test_ray_hit_beyond_radius_does_not_block() {
        let mut world = CollisionWorld::new(2.0, 2.0);
        world.add_collider(ColliderShape {
            positions: vec![
                Vec3::new(5.2, 1.25, -0.5),
                Vec3::new(5.2, 1.25, 0.5),
                Vec3::new(5.2, 1.45, 0.0),
            ],
            indices: vec![0, 1, 2],
        });

        let toward = Vec3::new(5.2, 1.32, 0.0).normalize();
        assert!(!world.query(Vec3::ZERO, toward));
    }

    #[test]
    fn test_ray_shape_intersection_nearest() {
        let near = box_shape(Vec3::new(4.0, -1.0, -1.0), Vec3::new(6.0, 1.0, 1.0));
        let t = ray_shape_intersection(&near, Vec3::ZERO, Vec3::X).unwrap();
        assert!((t - 4.0).abs() < 1e-4);

        let miss = ray_shape_intersection(&near, Vec3::ZERO, Vec3::NEG_X);
        assert!(miss.is_none());
    }

    #[test]
    fn test_clear_empties_registry() {
        let mut world = CollisionWorld::new(2.0, 10.0);
        world.add_collider(box_shape(Vec3::ZERO, Vec3::splat(10.0)));
        assert_eq!(world.collider_count(), 1);
        world.clear();
        assert_eq!(world.collider_count(), 0);
        assert!(!world.query(Vec3::splat(5.0), Vec3::X));
    }
}
