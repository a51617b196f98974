use std::collections::HashMap;

use atrium_core::components::SlotId;
use atrium_core::fade::FadeUpdate;

use crate::texture::TextureHandle;

/// CPU-side state of one material slot.
///
/// Slots are cheap value records; the GPU texture they reference lives in
/// the texture cache. Binding a new image never mutates an existing slot —
/// the base is cloned and the clone installed, so meshes sharing a base
/// material are unaffected.
#[derive(Debug, Clone)]
pub struct MaterialInstance {
    pub base_color: [f32; 4],
    pub opacity: f32,
    pub transparent: bool,
    pub texture: Option<TextureHandle>,
}

impl MaterialInstance {
    pub fn opaque(base_color: [f32; 4]) -> Self {
        Self {
            base_color,
            opacity: 1.0,
            transparent: false,
            texture: None,
        }
    }
}

/// Registry of material slots, keyed by monotonically increasing ids.
pub struct MaterialRegistry {
    instances: HashMap<u64, MaterialInstance>,
    next_id: u64,
}

impl MaterialRegistry {
    pub fn new() -> Self {
        Self {
            instances: HashMap::new(),
            next_id: 0,
        }
    }

    pub fn insert(&mut self, instance: MaterialInstance) -> SlotId {
        let id = SlotId(self.next_id);
        self.next_id += 1;
        self.instances.insert(id.0, instance);
        id
    }

    pub fn get(&self, slot: SlotId) -> Option<&MaterialInstance> {
        self.instances.get(&slot.0)
    }

    pub fn get_mut(&mut self, slot: SlotId) -> Option<&mut MaterialInstance> {
        self.instances.get_mut(&slot.0)
    }

    /// Clone `base` with `texture` attached, starting fully transparent so
    /// a fade can bring it in. The base slot is left untouched.
    pub fn clone_with_texture(&mut self, base: SlotId, texture: TextureHandle) -> SlotId {
        let mut instance = self
            .instances
            .get(&base.0)
            .cloned()
            .unwrap_or_else(|| MaterialInstance::opaque([1.0, 1.0, 1.0, 1.0]));
        instance.texture = Some(texture);
        instance.opacity = 0.0;
        instance.transparent = true;
        self.insert(instance)
    }

    /// Apply one fade-system update: set opacity, and clear the transparency
    /// flag once the fade reports completion.
    pub fn apply_fade(&mut self, update: FadeUpdate) {
        if let Some(instance) = self.instances.get_mut(&update.slot.0) {
            instance.opacity = update.opacity;
            if update.completed {
                instance.transparent = false;
            }
        }
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    pub fn clear(&mut self) {
        self.instances.clear();
    }
}

impl Default for MaterialRegistry {
    fn default() -> Self {
        Self::new()
    }
}
