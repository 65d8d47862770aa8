use glam::{Vec3, Vec4};

use crate::renderer::constants::{Light, PassEnvironment};

/// Lighting environment of the scene. The first directional light is the
/// shadow caster; its direction is overwritten each frame.
#[derive(Clone, Debug)]
pub struct SceneLighting {
    pub environment: PassEnvironment,
}

impl SceneLighting {
    pub fn new(ambient_light: Vec4) -> Self {
        Self {
            environment: PassEnvironment {
                ambient_light,
                ..PassEnvironment::default()
            },
        }
    }

    pub fn add(&mut self, light: Light) -> usize {
        self.environment.lights.push(light);
        self.environment.lights.len() - 1
    }

    pub fn set_fog(&mut self, color: Vec4, start: f32, range: f32) {
        self.environment.fog_color = color;
        self.environment.fog_start = start;
        self.environment.fog_range = range;
    }

    pub fn set_sun_direction(&mut self, direction: Vec3) {
        match self.environment.lights.first_mut() {
            Some(sun) => sun.direction = direction,
            None => log::warn!("No directional light to steer"),
        }
    }

    pub fn lights(&self) -> &[Light] {
        &self.environment.lights
    }
}

/// One shadow-casting sun plus two rows of five point lights.
pub fn demo_lighting() -> SceneLighting {
    let mut lighting = SceneLighting::new(Vec4::new(0.25, 0.25, 0.35, 1.0));
    lighting.add(Light::directional(
        Vec3::new(0.57735, -0.57735, 0.57735),
        Vec3::splat(0.6),
    ));

    for i in 0..5 {
        let z = -10.0 + i as f32 * 5.0;
        for x in [-5.0, 5.0] {
            lighting.add(Light::point(Vec3::new(x, 3.5, z), Vec3::splat(0.6), 2.0, 5.0));
        }
    }

    lighting.set_fog(Vec4::new(0.7, 0.7, 0.7, 1.0), 5.0, 150.0);
    lighting
}
