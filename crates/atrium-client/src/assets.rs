use std::path::{Path, PathBuf};
use std::sync::mpsc::{channel, Receiver, Sender};
use std::thread;

use crate::mesh::{self, MeshData, MeshError, ProceduralShape};

#[derive(Debug)]
pub enum AssetError {
    Io(std::io::Error),
    Image(image::ImageError),
    Mesh(MeshError),
    BadColor(String),
}

impl std::fmt::Display for AssetError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "Asset IO error: {}", e),
            Self::Image(e) => write!(f, "Image decode error: {}", e),
            Self::Mesh(e) => write!(f, "{}", e),
            Self::BadColor(spec) => write!(f, "Malformed solid color spec '{}'", spec),
        }
    }
}

impl From<image::ImageError> for AssetError {
    fn from(e: image::ImageError) -> Self {
        Self::Image(e)
    }
}

impl From<MeshError> for AssetError {
    fn from(e: MeshError) -> Self {
        Self::Mesh(e)
    }
}

/// Explicit model classification, chosen by the caller when the load is
/// requested — never inferred from the source string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelKind {
    Museum,
    Painting,
}

impl ModelKind {
    fn fallback_shape(self) -> ProceduralShape {
        match self {
            ModelKind::Museum => ProceduralShape::Room,
            ModelKind::Painting => ProceduralShape::Panel,
        }
    }
}

/// A model load request with its placement.
#[derive(Debug, Clone)]
pub struct ModelRequest {
    pub id: String,
    pub source: String,
    pub kind: ModelKind,
    pub position: [f32; 3],
    /// Euler rotation in degrees.
    pub rotation: [f32; 3],
    pub scale: [f32; 3],
}

/// Identifies the painting bind an image completion belongs to. The
/// generation stamp lets the completion handler drop results that were
/// superseded by a newer bind on the same painting.
#[derive(Debug, Clone)]
pub struct ImageTicket {
    pub painting: hecs::Entity,
    pub generation: u64,
    pub url: String,
    pub fallback: bool,
}

/// A finished load, delivered on the main thread.
pub enum LoadCompletion {
    Model {
        request: ModelRequest,
        result: Result<MeshData, AssetError>,
    },
    Image {
        ticket: ImageTicket,
        result: Result<image::RgbaImage, AssetError>,
    },
}

/// Asynchronous asset loader.
///
/// Each request runs on a short-lived worker thread that does the file IO
/// and decoding; completions arrive through a channel the engine drains
/// once per frame. The main loop never blocks on a load, and completions
/// that arrive after their target is gone are simply dropped by the
/// drainer.
pub struct AssetLoader {
    project_root: PathBuf,
    tx: Sender<LoadCompletion>,
    rx: Receiver<LoadCompletion>,
}

impl AssetLoader {
    pub fn new(project_root: PathBuf) -> Self {
        let (tx, rx) = channel();
        Self {
            project_root,
            tx,
            rx,
        }
    }

    /// Issue an asynchronous model load.
    pub fn request_model(&self, request: ModelRequest) {
        let tx = self.tx.clone();
        let root = self.project_root.clone();
        thread::spawn(move || {
            let result = mesh::load_mesh_data(&root, &request.source, request.kind.fallback_shape())
                .map_err(AssetError::from);
            // The receiver may already be gone on shutdown.
            let _ = tx.send(LoadCompletion::Model { request, result });
        });
    }

    /// Issue an asynchronous image load for a painting bind.
    pub fn request_image(&self, ticket: ImageTicket) {
        let tx = self.tx.clone();
        let root = self.project_root.clone();
        thread::spawn(move || {
            let result = load_image(&root, &ticket.url);
            let _ = tx.send(LoadCompletion::Image { ticket, result });
        });
    }

    /// Drain every completion that has arrived since the last poll.
    pub fn poll(&self) -> Vec<LoadCompletion> {
        self.rx.try_iter().collect()
    }
}

/// Resolve an image URL to decoded RGBA pixels.
///
/// `solid:RRGGBB` generates a flat 64x64 image; anything else is read from
/// the filesystem relative to the project root.
fn load_image(project_root: &Path, url: &str) -> Result<image::RgbaImage, AssetError> {
    if let Some(hex) = url.strip_prefix("solid:") {
        return solid_image(url, hex);
    }

    let full_path = project_root.join(url);
    let decoded = image::open(&full_path)?;
    Ok(decoded.to_rgba8())
}

fn solid_image(spec: &str, hex: &str) -> Result<image::RgbaImage, AssetError> {
    if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(AssetError::BadColor(spec.to_string()));
    }
    let r = u8::from_str_radix(&hex[0..2], 16).map_err(|_| AssetError::BadColor(spec.into()))?;
    let g = u8::from_str_radix(&hex[2..4], 16).map_err(|_| AssetError::BadColor(spec.into()))?;
    let b = u8::from_str_radix(&hex[4..6], 16).map_err(|_| AssetError::BadColor(spec.into()))?;
    Ok(image::RgbaImage::from_pixel(
        64,
        64,
        image::Rgba([r, g, b, 255]),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn wait_for_completions(loader: &AssetLoader, count: usize) -> Vec<LoadCompletion> {
        let mut completions = Vec::new();
        for _ in 0..200 {
            completions.extend(loader.poll());
            if completions.len() >= count {
                return completions;
            }
            thread::sleep(Duration::from_millis(5));
        }
        completions
    }

    #[test]
    fn test_solid_image_decodes() {
        let img = load_image(Path::new("."), "solid:8a3324").unwrap();
        assert_eq!(img.dimensions(), (64, 64));
        assert_eq!(img.get_pixel(0, 0).0, [0x8a, 0x33, 0x24, 255]);
    }

    #[test]
    fn test_malformed_solid_spec_errors() {
        assert!(matches!(
            load_image(Path::new("."), "solid:xyz"),
            Err(AssetError::BadColor(_))
        ));
        assert!(matches!(
            load_image(Path::new("."), "solid:12345"),
            Err(AssetError::BadColor(_))
        ));
    }

    #[test]
    fn test_missing_image_file_errors() {
        let result = load_image(Path::new("/nonexistent"), "assets/images/artwork1.jpg");
        assert!(result.is_err());
    }

    #[test]
    fn test_image_request_completes_through_channel() {
        let world = hecs::World::new();
        let entity = world.reserve_entity();
        let loader = AssetLoader::new(PathBuf::from("."));

        loader.request_image(ImageTicket {
            painting: entity,
            generation: 1,
            url: "solid:1f4f7a".to_string(),
            fallback: false,
        });

        let completions = wait_for_completions(&loader, 1);
        assert_eq!(completions.len(), 1);
        match &completions[0] {
            LoadCompletion::Image { ticket, result } => {
                assert_eq!(ticket.generation, 1);
                assert!(!ticket.fallback);
                assert!(result.is_ok());
            }
            _ => panic!("expected image completion"),
        }
    }

    #[test]
    fn test_model_request_completes_with_fallback_shape() {
        let loader = AssetLoader::new(PathBuf::from("/nonexistent"));
        loader.request_model(ModelRequest {
            id: "museum".to_string(),
            source: "assets/models/museum.glb".to_string(),
            kind: ModelKind::Museum,
            position: [0.0, 0.0, -5.0],
            rotation: [0.0; 3],
            scale: [1.0; 3],
        });

        let completions = wait_for_completions(&loader, 1);
        assert_eq!(completions.len(), 1);
        match &completions[0] {
            LoadCompletion::Model { request, result } => {
                assert_eq!(request.kind, ModelKind::Museum);
                // Missing museum degrades to the procedural room.
                assert_eq!(result.as_ref().unwrap().primitives.len(), 6);
            }
            _ => panic!("expected model completion"),
        }
    }
}
