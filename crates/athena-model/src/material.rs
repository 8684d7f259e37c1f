use glam::{Vec3, Vec4};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AlphaMode {
    #[default]
    Opaque,
    Mask,
    Blend,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Material {
    pub name: String,

    pub base_color: Vec4,
    pub base_color_image: Option<usize>,
    pub metallic: f32,
    pub roughness: f32,
    pub metallic_roughness_image: Option<usize>,
    pub normal_scale: f32,
    pub normal_image: Option<usize>,
    pub emission: Vec3,
    pub emission_strength: f32,
    pub emission_image: Option<usize>,

    // Authoring only, glTF has no core equivalent.
    pub subsurface: f32,
    pub subsurface_radius: Vec3,

    pub alpha_mode: AlphaMode,
    pub alpha_cutoff: f32,
    pub double_sided: bool,
}

impl Default for Material {
    fn default() -> Self {
        Material {
            name: String::new(),

            base_color: Vec4::ONE,
            base_color_image: None,
            metallic: 0.0,
            roughness: 0.5,
            metallic_roughness_image: None,
            normal_scale: 1.0,
            normal_image: None,
            emission: Vec3::ZERO,
            emission_strength: 1.0,
            emission_image: None,

            subsurface: 0.0,
            subsurface_radius: Vec3::ONE,

            alpha_mode: AlphaMode::Opaque,
            alpha_cutoff: 0.5,
            double_sided: false,
        }
    }
}

impl Material {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_owned(),
            ..Default::default()
        }
    }

    /// Principled material with an opaque base color.
    pub fn pbr(name: &str, color: Vec3, roughness: f32, metallic: f32) -> Self {
        Self {
            name: name.to_owned(),
            base_color: color.extend(1.0),
            roughness,
            metallic,
            ..Default::default()
        }
    }

    pub fn with_emission(mut self, emission: Vec3, strength: f32) -> Self {
        self.emission = emission;
        self.emission_strength = strength;
        self
    }

    pub fn with_subsurface(mut self, weight: f32, radius: Vec3) -> Self {
        self.subsurface = weight;
        self.subsurface_radius = radius;
        self
    }

    pub fn double_sided(mut self) -> Self {
        self.double_sided = true;
        self
    }

    pub fn is_emissive(&self) -> bool {
        self.emission != Vec3::ZERO || self.emission_image.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builders_set_fields() {
        let eyes = Material::pbr("EnemyEyes", Vec3::new(0.9, 0.1, 0.05), 0.3, 0.0)
            .with_emission(Vec3::new(1.0, 0.15, 0.05), 3.0);
        assert_eq!(eyes.base_color.w, 1.0);
        assert!(eyes.is_emissive());
        assert_eq!(eyes.emission_strength, 3.0);
        assert!(!Material::new("plain").is_emissive());
    }
}
