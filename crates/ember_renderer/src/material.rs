//! Surface material description.

use std::hash::{Hash, Hasher};

use ember_math::DVec3;

/// Color type alias (linear RGB radiance, non-negative and unbounded)
pub type Color = DVec3;

/// Opaque handle to a texture owned by an external image store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureId(pub u32);

/// How a surface scatters incoming light.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScatterKind {
    /// Ideal Lambertian reflection
    Diffuse,
    /// Ideal specular reflection
    Mirror,
    /// Glass-like refraction with Fresnel-weighted reflection
    Dielectric,
}

/// Immutable description of a surface response.
///
/// Materials compare and hash structurally over all fields with no
/// tolerance: two materials are interchangeable exactly when every
/// field matches bit for bit. Equal materials always hash equal, so
/// `Material` works as a map key for deduplicating identical materials
/// shared by many scene objects. Callers must not rely on reference
/// identity.
#[derive(Debug, Clone, Copy)]
pub struct Material {
    pub kind: ScatterKind,
    /// Emitted radiance
    pub emission: Color,
    /// Per-channel reflectance; its largest channel also drives the
    /// roulette survival probability
    pub albedo: Color,
    /// Index of refraction, meaningful for `Dielectric` surfaces
    pub refractive_index: f64,
    pub texture: Option<TextureId>,
}

impl Material {
    /// A non-emissive Lambertian surface.
    pub fn diffuse(albedo: Color) -> Self {
        Self {
            kind: ScatterKind::Diffuse,
            emission: Color::ZERO,
            albedo,
            refractive_index: 0.0,
            texture: None,
        }
    }

    /// A diffuse light source.
    pub fn emitter(emission: Color) -> Self {
        Self {
            emission,
            ..Self::diffuse(Color::ZERO)
        }
    }

    /// A perfect mirror.
    pub fn mirror(albedo: Color) -> Self {
        Self {
            kind: ScatterKind::Mirror,
            ..Self::diffuse(albedo)
        }
    }

    /// A refractive surface such as glass or water.
    pub fn dielectric(albedo: Color, refractive_index: f64) -> Self {
        Self {
            kind: ScatterKind::Dielectric,
            refractive_index,
            ..Self::diffuse(albedo)
        }
    }

    /// Attach a texture reference.
    pub fn with_texture(mut self, texture: TextureId) -> Self {
        self.texture = Some(texture);
        self
    }

    // Bit-level image of every field. Equality and hashing both go
    // through this so they can never disagree.
    fn field_bits(&self) -> (ScatterKind, [u64; 3], [u64; 3], u64, Option<TextureId>) {
        (
            self.kind,
            self.emission.to_array().map(f64::to_bits),
            self.albedo.to_array().map(f64::to_bits),
            self.refractive_index.to_bits(),
            self.texture,
        )
    }
}

impl Default for Material {
    fn default() -> Self {
        Self::diffuse(Color::ZERO)
    }
}

impl PartialEq for Material {
    fn eq(&self, other: &Self) -> bool {
        self.field_bits() == other.field_bits()
    }
}

impl Eq for Material {}

impl Hash for Material {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.field_bits().hash(state);
    }
}
