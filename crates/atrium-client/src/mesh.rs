use std::collections::HashMap;
use std::path::Path;

use wgpu::util::DeviceExt;

use atrium_core::components::MeshHandle;

#[derive(Debug)]
pub enum MeshError {
    Io(String),
    Gltf(gltf::Error),
    NoGeometry,
}

impl std::fmt::Display for MeshError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(msg) => write!(f, "Mesh IO error: {}", msg),
            Self::Gltf(e) => write!(f, "glTF error: {}", e),
            Self::NoGeometry => write!(f, "glTF file contains no mesh geometry"),
        }
    }
}

impl From<gltf::Error> for MeshError {
    fn from(e: gltf::Error) -> Self {
        Self::Gltf(e)
    }
}

/// 3D vertex for mesh rendering.
#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Vertex3D {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub tex_coords: [f32; 2],
}

impl Vertex3D {
    const ATTRIBS: [wgpu::VertexAttribute; 3] =
        wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x3, 2 => Float32x2];

    pub fn desc() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Vertex3D>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBS,
        }
    }
}

/// One renderable primitive with its node's world transform baked in
/// (model-local space). Kept per-primitive so every wall and frame gets
/// its own collider instead of one whole-building box.
#[derive(Debug, Clone)]
pub struct PrimitiveData {
    pub vertices: Vec<Vertex3D>,
    pub indices: Vec<u32>,
}

/// Decoded CPU-side model geometry.
#[derive(Debug, Clone)]
pub struct MeshData {
    pub primitives: Vec<PrimitiveData>,
}

impl MeshData {
    pub fn vertex_count(&self) -> usize {
        self.primitives.iter().map(|p| p.vertices.len()).sum()
    }

    pub fn index_count(&self) -> usize {
        self.primitives.iter().map(|p| p.indices.len()).sum()
    }
}

/// Procedural stand-in used when a mesh source is missing or requested
/// explicitly via a `procedural:` specifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProceduralShape {
    Room,
    Panel,
}

/// Decode a mesh source into CPU geometry.
///
/// Sources starting with `procedural:` are generated. A missing file
/// degrades to `fallback` with a warning so a gallery stays walkable
/// without binary assets.
pub fn load_mesh_data(
    project_root: &Path,
    source: &str,
    fallback: ProceduralShape,
) -> Result<MeshData, MeshError> {
    if let Some(shape) = source.strip_prefix("procedural:") {
        return Ok(match shape {
            "room" => procedural_room(),
            "panel" => procedural_panel(),
            other => {
                tracing::warn!("Unknown procedural shape '{}', using fallback", other);
                procedural(fallback)
            }
        });
    }

    let full_path = project_root.join(source);
    if !full_path.exists() {
        tracing::warn!(
            "Mesh file not found: {:?}, using procedural fallback",
            full_path
        );
        return Ok(procedural(fallback));
    }

    let (document, buffers, _images) = gltf::import(&full_path)?;

    let mut primitives = Vec::new();
    for scene in document.scenes() {
        for node in scene.nodes() {
            collect_node_primitives(&node, glam::Mat4::IDENTITY, &buffers, &mut primitives);
        }
    }

    if primitives.is_empty() {
        return Err(MeshError::NoGeometry);
    }

    let data = MeshData { primitives };
    tracing::info!(
        "glTF '{}': {} primitives, {} verts, {} indices",
        source,
        data.primitives.len(),
        data.vertex_count(),
        data.index_count()
    );
    Ok(data)
}

fn procedural(shape: ProceduralShape) -> MeshData {
    match shape {
        ProceduralShape::Room => procedural_room(),
        ProceduralShape::Panel => procedural_panel(),
    }
}

/// Recursively walk a glTF node tree, collecting mesh primitives with
/// accumulated world transforms.
fn collect_node_primitives(
    node: &gltf::Node,
    parent_transform: glam::Mat4,
    buffers: &[gltf::buffer::Data],
    out: &mut Vec<PrimitiveData>,
) {
    let local = glam::Mat4::from_cols_array_2d(&node.transform().matrix());
    let world = parent_transform * local;
    // Normal matrix: inverse-transpose of upper-left 3x3
    let normal_mat = glam::Mat3::from_mat4(world).inverse().transpose();

    if let Some(mesh) = node.mesh() {
        for primitive in mesh.primitives() {
            let reader = primitive.reader(|buf| Some(&buffers[buf.index()]));

            let positions: Vec<[f32; 3]> = match reader.read_positions() {
                Some(p) => p.collect(),
                None => continue,
            };

            let tex_coords: Vec<[f32; 2]> = reader
                .read_tex_coords(0)
                .map(|t| t.into_f32().collect())
                .unwrap_or_else(|| vec![[0.0, 0.0]; positions.len()]);

            let indices: Vec<u32> = if let Some(read_indices) = reader.read_indices() {
                read_indices.into_u32().collect()
            } else {
                (0..positions.len() as u32).collect()
            };

            let normals: Vec<[f32; 3]> = reader
                .read_normals()
                .map(|n| n.collect())
                .unwrap_or_else(|| generate_smooth_normals(&positions, &indices));

            let vertices = positions
                .iter()
                .enumerate()
                .map(|(i, pos)| {
                    let p = world.transform_point3(glam::Vec3::from(*pos));
                    let n = normal_mat
                        * glam::Vec3::from(normals.get(i).copied().unwrap_or([0.0, 1.0, 0.0]));
                    Vertex3D {
                        position: p.to_array(),
                        normal: n.normalize_or_zero().to_array(),
                        tex_coords: tex_coords.get(i).copied().unwrap_or([0.0, 0.0]),
                    }
                })
                .collect();

            out.push(PrimitiveData { vertices, indices });
        }
    }

    for child in node.children() {
        collect_node_primitives(&child, world, buffers, out);
    }
}

/// Generate smooth normals by accumulating area-weighted face normals at
/// each vertex.
fn generate_smooth_normals(positions: &[[f32; 3]], indices: &[u32]) -> Vec<[f32; 3]> {
    let mut normals = vec![glam::Vec3::ZERO; positions.len()];

    for tri in indices.chunks_exact(3) {
        let i0 = tri[0] as usize;
        let i1 = tri[1] as usize;
        let i2 = tri[2] as usize;
        if i0 < positions.len() && i1 < positions.len() && i2 < positions.len() {
            let v0 = glam::Vec3::from(positions[i0]);
            let v1 = glam::Vec3::from(positions[i1]);
            let v2 = glam::Vec3::from(positions[i2]);
            let face_normal = (v1 - v0).cross(v2 - v0);
            normals[i0] += face_normal;
            normals[i1] += face_normal;
            normals[i2] += face_normal;
        }
    }

    normals
        .iter()
        .map(|n| {
            let normalized = n.normalize_or_zero();
            if normalized == glam::Vec3::ZERO {
                [0.0, 1.0, 0.0]
            } else {
                normalized.to_array()
            }
        })
        .collect()
}

/// A unit room: six inward-facing walls of a cube centered at the origin.
/// Each face is its own primitive so each wall registers as a separate
/// collider.
pub fn procedural_room() -> MeshData {
    // (corner positions, inward normal) per face
    let faces: [([glam::Vec3; 4], glam::Vec3); 6] = [
        // Back wall (z = -0.5), faces +Z
        (
            [
                glam::Vec3::new(-0.5, -0.5, -0.5),
                glam::Vec3::new(0.5, -0.5, -0.5),
                glam::Vec3::new(0.5, 0.5, -0.5),
                glam::Vec3::new(-0.5, 0.5, -0.5),
            ],
            glam::Vec3::Z,
        ),
        // Front wall (z = 0.5), faces -Z
        (
            [
                glam::Vec3::new(0.5, -0.5, 0.5),
                glam::Vec3::new(-0.5, -0.5, 0.5),
                glam::Vec3::new(-0.5, 0.5, 0.5),
                glam::Vec3::new(0.5, 0.5, 0.5),
            ],
            glam::Vec3::NEG_Z,
        ),
        // Left wall (x = -0.5), faces +X
        (
            [
                glam::Vec3::new(-0.5, -0.5, 0.5),
                glam::Vec3::new(-0.5, -0.5, -0.5),
                glam::Vec3::new(-0.5, 0.5, -0.5),
                glam::Vec3::new(-0.5, 0.5, 0.5),
            ],
            glam::Vec3::X,
        ),
        // Right wall (x = 0.5), faces -X
        (
            [
                glam::Vec3::new(0.5, -0.5, -0.5),
                glam::Vec3::new(0.5, -0.5, 0.5),
                glam::Vec3::new(0.5, 0.5, 0.5),
                glam::Vec3::new(0.5, 0.5, -0.5),
            ],
            glam::Vec3::NEG_X,
        ),
        // Floor (y = -0.5), faces +Y
        (
            [
                glam::Vec3::new(-0.5, -0.5, 0.5),
                glam::Vec3::new(0.5, -0.5, 0.5),
                glam::Vec3::new(0.5, -0.5, -0.5),
                glam::Vec3::new(-0.5, -0.5, -0.5),
            ],
            glam::Vec3::Y,
        ),
        // Ceiling (y = 0.5), faces -Y
        (
            [
                glam::Vec3::new(-0.5, 0.5, -0.5),
                glam::Vec3::new(0.5, 0.5, -0.5),
                glam::Vec3::new(0.5, 0.5, 0.5),
                glam::Vec3::new(-0.5, 0.5, 0.5),
            ],
            glam::Vec3::NEG_Y,
        ),
    ];

    let uvs = [[0.0, 1.0], [1.0, 1.0], [1.0, 0.0], [0.0, 0.0]];
    let primitives = faces
        .iter()
        .map(|(corners, normal)| PrimitiveData {
            vertices: corners
                .iter()
                .zip(uvs.iter())
                .map(|(corner, uv)| Vertex3D {
                    position: corner.to_array(),
                    normal: normal.to_array(),
                    tex_coords: *uv,
                })
                .collect(),
            indices: vec![0, 1, 2, 0, 2, 3],
        })
        .collect();

    MeshData { primitives }
}

/// A unit panel: a quad in the XY plane facing +Z, the stand-in painting
/// surface.
pub fn procedural_panel() -> MeshData {
    let vertices = vec![
        Vertex3D {
            position: [-0.5, -0.5, 0.0],
            normal: [0.0, 0.0, 1.0],
            tex_coords: [0.0, 1.0],
        },
        Vertex3D {
            position: [0.5, -0.5, 0.0],
            normal: [0.0, 0.0, 1.0],
            tex_coords: [1.0, 1.0],
        },
        Vertex3D {
            position: [0.5, 0.5, 0.0],
            normal: [0.0, 0.0, 1.0],
            tex_coords: [1.0, 0.0],
        },
        Vertex3D {
            position: [-0.5, 0.5, 0.0],
            normal: [0.0, 0.0, 1.0],
            tex_coords: [0.0, 0.0],
        },
    ];
    let indices = vec![0, 1, 2, 0, 2, 3];

    MeshData {
        primitives: vec![PrimitiveData { vertices, indices }],
    }
}

/// A loaded GPU mesh: every primitive merged into a single draw.
pub struct GpuMesh {
    pub vertex_buffer: wgpu::Buffer,
    pub index_buffer: wgpu::Buffer,
    pub index_count: u32,
}

/// Cache of uploaded meshes, keyed by source string.
pub struct MeshCache {
    meshes: Vec<GpuMesh>,
    source_to_handle: HashMap<String, MeshHandle>,
}

impl MeshCache {
    pub fn new() -> Self {
        Self {
            meshes: Vec::new(),
            source_to_handle: HashMap::new(),
        }
    }

    /// Upload decoded geometry, merging primitives into one vertex/index
    /// buffer pair. Repeated uploads of the same source reuse the first.
    pub fn upload(
        &mut self,
        device: &wgpu::Device,
        source: &str,
        data: &MeshData,
    ) -> MeshHandle {
        if let Some(&handle) = self.source_to_handle.get(source) {
            return handle;
        }

        let mut vertices: Vec<Vertex3D> = Vec::with_capacity(data.vertex_count());
        let mut indices: Vec<u32> = Vec::with_capacity(data.index_count());
        for primitive in &data.primitives {
            let base = vertices.len() as u32;
            vertices.extend_from_slice(&primitive.vertices);
            indices.extend(primitive.indices.iter().map(|i| base + i));
        }

        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("Mesh VB: {}", source)),
            contents: bytemuck::cast_slice(&vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });

        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("Mesh IB: {}", source)),
            contents: bytemuck::cast_slice(&indices),
            usage: wgpu::BufferUsages::INDEX,
        });

        let handle = MeshHandle(self.meshes.len());
        self.meshes.push(GpuMesh {
            vertex_buffer,
            index_buffer,
            index_count: indices.len() as u32,
        });
        self.source_to_handle.insert(source.to_string(), handle);
        tracing::info!("Uploaded mesh: {}", source);
        handle
    }

    pub fn get(&self, handle: MeshHandle) -> &GpuMesh {
        &self.meshes[handle.0]
    }
}

impl Default for MeshCache {
    fn default() -> Self {
        Self::new()
    }
}
