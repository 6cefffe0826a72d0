use std::sync::atomic::{AtomicU32, Ordering};

use slotmap::SlotMap;

use crate::assets::server::TextureLease;
use crate::resources::material::{Material, MeshStandardMaterial};
use crate::scene::{MaterialKey, SurfaceKey};

static NEXT_SCENE_ID: AtomicU32 = AtomicU32::new(1);

/// One drawable mesh primitive.
#[derive(Debug, Clone)]
pub struct Surface {
    pub name: String,
    pub material: MaterialKey,
    pub vertex_count: usize,
    pub index_count: usize,
}

/// A loaded scene: drawable surfaces plus the material graph they reference.
///
/// Materials are shared; a material used by several surfaces is stored once
/// and receives a bound image once.
#[derive(Debug)]
pub struct Scene {
    pub id: u32,
    pub name: String,

    // ==== Component pools ====
    pub surfaces: SlotMap<SurfaceKey, Surface>,
    pub materials: SlotMap<MaterialKey, Material>,

    // ==== Texture ownership ====
    /// Textures the scene was loaded with.
    source_textures: Option<TextureLease>,
    /// Textures of the latest bind pass.
    bound_textures: Option<TextureLease>,
}

impl Default for Scene {
    fn default() -> Self {
        Self::new("Scene")
    }
}

impl Scene {
    pub fn new(name: &str) -> Self {
        Self {
            id: NEXT_SCENE_ID.fetch_add(1, Ordering::Relaxed),
            name: name.to_string(),
            surfaces: SlotMap::with_key(),
            materials: SlotMap::with_key(),
            source_textures: None,
            bound_textures: None,
        }
    }

    /// Keeps the textures the scene was loaded with alive as long as the scene.
    pub fn hold_source_textures(&mut self, lease: TextureLease) {
        self.source_textures = Some(lease);
    }

    /// Swaps in the textures of a new bind pass. Textures shared with the
    /// previous pass are already held by `lease` and survive the swap.
    pub fn hold_bound_textures(&mut self, lease: TextureLease) {
        self.bound_textures = Some(lease);
    }

    pub fn add_material(&mut self, material: impl Into<Material>) -> MaterialKey {
        self.materials.insert(material.into())
    }

    pub fn add_surface(&mut self, surface: Surface) -> SurfaceKey {
        self.surfaces.insert(surface)
    }

    #[must_use]
    pub fn get_material(&self, key: MaterialKey) -> Option<&Material> {
        self.materials.get(key)
    }

    pub fn get_material_mut(&mut self, key: MaterialKey) -> Option<&mut Material> {
        self.materials.get_mut(key)
    }

    /// Material of a surface.
    #[must_use]
    pub fn material_of(&self, surface: SurfaceKey) -> Option<&Material> {
        let surface = self.surfaces.get(surface)?;
        self.materials.get(surface.material)
    }

    /// Distinct materials referenced by at least one surface, in surface order.
    #[must_use]
    pub fn drawn_materials(&self) -> Vec<MaterialKey> {
        let mut keys: Vec<MaterialKey> = Vec::with_capacity(self.materials.len());
        for surface in self.surfaces.values() {
            if !keys.contains(&surface.material) {
                keys.push(surface.material);
            }
        }
        keys
    }

    /// Standard materials reachable from a surface.
    pub fn standard_materials(&self) -> impl Iterator<Item = (MaterialKey, &MeshStandardMaterial)> {
        self.drawn_materials()
            .into_iter()
            .filter_map(|key| Some((key, self.materials.get(key)?.as_standard()?)))
    }

    #[inline]
    #[must_use]
    pub fn surface_count(&self) -> usize {
        self.surfaces.len()
    }

    #[inline]
    #[must_use]
    pub fn material_count(&self) -> usize {
        self.materials.len()
    }
}
