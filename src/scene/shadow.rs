use glam::{Mat3, Mat4, Vec3, Vec4};

/// Direction the sun starts from before any rotation.
pub const BASE_LIGHT_DIRECTION: Vec3 = Vec3::new(0.57735, -0.57735, 0.57735);

/// Bounding sphere of everything that can cast or receive shadows.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SceneBounds {
    pub center: Vec3,
    pub radius: f32,
}

impl Default for SceneBounds {
    fn default() -> Self {
        // Covers the 20 x 30 grid.
        Self {
            center: Vec3::ZERO,
            radius: (10.0f32 * 10.0 + 15.0 * 15.0).sqrt(),
        }
    }
}

/// Off-centre orthographic volume in light view space.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LightFrustum {
    pub left: f32,
    pub right: f32,
    pub bottom: f32,
    pub top: f32,
    pub near: f32,
    pub far: f32,
}

impl LightFrustum {
    /// Axis-aligned cube of half-extent `radius` around the light-space
    /// sphere centre.
    pub fn enclosing(center_ls: Vec3, radius: f32) -> Self {
        Self {
            left: center_ls.x - radius,
            right: center_ls.x + radius,
            bottom: center_ls.y - radius,
            top: center_ls.y + radius,
            near: center_ls.z - radius,
            far: center_ls.z + radius,
        }
    }

    pub fn projection(&self) -> Mat4 {
        Mat4::orthographic_lh(
            self.left,
            self.right,
            self.bottom,
            self.top,
            self.near,
            self.far,
        )
    }
}

/// Maps clip-space x,y in [-1, 1] to texture space [0, 1] with y flipped.
/// Depth passes through unchanged.
pub fn ndc_to_texture() -> Mat4 {
    Mat4::from_cols(
        Vec4::new(0.5, 0.0, 0.0, 0.0),
        Vec4::new(0.0, -0.5, 0.0, 0.0),
        Vec4::new(0.0, 0.0, 1.0, 0.0),
        Vec4::new(0.5, 0.5, 0.0, 1.0),
    )
}

pub fn shadow_transform(light_view: Mat4, light_proj: Mat4) -> Mat4 {
    ndc_to_texture() * light_proj * light_view
}

/// Everything the shadow pass needs for one frame.
#[derive(Clone, Copy, Debug)]
pub struct LightSpace {
    pub direction: Vec3,
    pub position: Vec3,
    pub view: Mat4,
    pub proj: Mat4,
    pub frustum: LightFrustum,
    pub shadow_transform: Mat4,
}

impl LightSpace {
    pub fn new(direction: Vec3, bounds: SceneBounds) -> Self {
        let direction = direction.normalize();
        let position = -2.0 * bounds.radius * direction;
        let up = if direction.dot(Vec3::Y).abs() > 0.999 {
            Vec3::Z
        } else {
            Vec3::Y
        };
        let view = Mat4::look_at_lh(position, bounds.center, up);

        let center_ls = view.transform_point3(bounds.center);
        let frustum = LightFrustum::enclosing(center_ls, bounds.radius);
        let proj = frustum.projection();

        Self {
            direction,
            position,
            view,
            proj,
            frustum,
            shadow_transform: shadow_transform(view, proj),
        }
    }
}

/// Rotates the sun about +Y and keeps the light-space transforms current.
pub struct ShadowController {
    pub bounds: SceneBounds,
    pub rotation_speed: f32,
    pub map_size: u32,
    angle: f32,
    light: LightSpace,
}

impl ShadowController {
    pub fn new(bounds: SceneBounds, rotation_speed: f32, map_size: u32) -> Self {
        Self {
            bounds,
            rotation_speed,
            map_size,
            angle: 0.0,
            light: LightSpace::new(BASE_LIGHT_DIRECTION, bounds),
        }
    }

    pub fn update(&mut self, dt: f32) {
        self.angle += self.rotation_speed * dt;
        let direction = Mat3::from_rotation_y(self.angle) * BASE_LIGHT_DIRECTION;
        self.light = LightSpace::new(direction, self.bounds);
    }

    pub fn angle(&self) -> f32 {
        self.angle
    }

    pub fn light(&self) -> &LightSpace {
        &self.light
    }

    pub fn light_direction(&self) -> Vec3 {
        self.light.direction
    }
}
