use glam::{Mat3, Mat4, Vec3};

/// Left-handed first-person camera. `look` points forward, `right` x `up`
/// frame is kept orthonormal.
#[derive(Clone, Copy, Debug)]
pub struct Camera {
    position: Vec3,
    right: Vec3,
    up: Vec3,
    look: Vec3,
    pub fov_y_radians: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
}

impl Camera {
    pub fn new(position: Vec3) -> Self {
        Self {
            position,
            ..Self::default()
        }
    }

    pub fn set_lens(&mut self, fov_y_radians: f32, aspect: f32, near: f32, far: f32) {
        self.fov_y_radians = fov_y_radians;
        self.aspect = aspect;
        self.near = near;
        self.far = far;
    }

    pub fn set_aspect(&mut self, width: u32, height: u32) {
        self.aspect = width.max(1) as f32 / height.max(1) as f32;
    }

    pub fn look_at(&mut self, position: Vec3, target: Vec3, world_up: Vec3) {
        self.position = position;
        self.look = (target - position).normalize();
        self.right = world_up.cross(self.look).normalize();
        self.up = self.look.cross(self.right);
    }

    pub fn walk(&mut self, distance: f32) {
        self.position += self.look * distance;
    }

    pub fn strafe(&mut self, distance: f32) {
        self.position += self.right * distance;
    }

    /// Rotates `up` and `look` about the camera's right axis.
    pub fn pitch(&mut self, angle: f32) {
        let rotation = Mat3::from_axis_angle(self.right, angle);
        self.up = rotation * self.up;
        self.look = rotation * self.look;
    }

    /// Rotates the whole basis about world +Y.
    pub fn rotate_y(&mut self, angle: f32) {
        let rotation = Mat3::from_rotation_y(angle);
        self.right = rotation * self.right;
        self.up = rotation * self.up;
        self.look = rotation * self.look;
    }

    fn orthonormal_basis(&self) -> (Vec3, Vec3, Vec3) {
        let look = self.look.normalize();
        let up = look.cross(self.right).normalize();
        let right = up.cross(look);
        (right, up, look)
    }

    pub fn view(&self) -> Mat4 {
        let (_, up, look) = self.orthonormal_basis();
        Mat4::look_to_lh(self.position, look, up)
    }

    pub fn proj(&self) -> Mat4 {
        Mat4::perspective_lh(self.fov_y_radians, self.aspect, self.near, self.far)
    }

    pub fn view_proj(&self) -> Mat4 {
        self.proj() * self.view()
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn look(&self) -> Vec3 {
        self.look
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            position: Vec3::new(0.0, 2.0, -15.0),
            right: Vec3::X,
            up: Vec3::Y,
            look: Vec3::Z,
            fov_y_radians: 0.25 * std::f32::consts::PI,
            aspect: 1.0,
            near: 1.0,
            far: 1000.0,
        }
    }
}
