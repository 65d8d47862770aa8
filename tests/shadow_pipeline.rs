use glam::{Mat3, Mat4, Vec3, Vec4};

use wgpu_shadow_skinning::renderer::command::{CommandList, ResourceState, TargetId};
use wgpu_shadow_skinning::renderer::shadow_pass::{record_shadow_pass, ShadowMapTarget};
use wgpu_shadow_skinning::scene::shadow::BASE_LIGHT_DIRECTION;
use wgpu_shadow_skinning::scene::{
    LightSpace, MaterialTable, RenderItemCatalog, SceneBounds, ShadowController,
};

const EPSILON: f32 = 1e-4;

fn light_directions() -> Vec<Vec3> {
    let mut directions = vec![
        BASE_LIGHT_DIRECTION,
        Vec3::new(0.0, -1.0, 0.0),
        Vec3::new(1.0, -0.2, 0.0),
        Vec3::new(-0.3, -0.8, 0.5),
    ];
    for step in 0..8 {
        let angle = step as f32 * std::f32::consts::FRAC_PI_4;
        directions.push(Mat3::from_rotation_y(angle) * BASE_LIGHT_DIRECTION);
    }
    directions
}

fn bounds() -> SceneBounds {
    SceneBounds {
        center: Vec3::new(3.0, 1.0, -2.0),
        radius: 12.5,
    }
}

fn apply(matrix: Mat4, world: Vec3) -> Vec3 {
    let p = matrix * world.extend(1.0);
    p.truncate() / p.w
}

#[test]
fn frustum_is_a_tight_cube_around_the_bounds() {
    let bounds = bounds();
    for direction in light_directions() {
        let light = LightSpace::new(direction, bounds);
        let f = light.frustum;
        let r = bounds.radius;

        assert!((f.right - f.left - 2.0 * r).abs() < EPSILON, "{:?}", direction);
        assert!((f.top - f.bottom - 2.0 * r).abs() < EPSILON, "{:?}", direction);
        assert!((f.far - f.near - 2.0 * r).abs() < EPSILON, "{:?}", direction);

        let center_ls = light.view.transform_point3(bounds.center);
        assert!((center_ls.x - (f.left + f.right) * 0.5).abs() < EPSILON);
        assert!((center_ls.y - (f.bottom + f.top) * 0.5).abs() < EPSILON);
        assert!((center_ls.z - (f.near + f.far) * 0.5).abs() < EPSILON);
    }
}

#[test]
fn frustum_corners_map_to_texture_corners() {
    let bounds = bounds();
    for direction in light_directions() {
        let light = LightSpace::new(direction, bounds);
        let f = light.frustum;
        let light_to_world = light.view.inverse();

        // Top-left of the near plane is texel (0, 0); v grows downwards.
        let top_left_near = light_to_world.transform_point3(Vec3::new(f.left, f.top, f.near));
        let bottom_right_far =
            light_to_world.transform_point3(Vec3::new(f.right, f.bottom, f.far));

        let a = apply(light.shadow_transform, top_left_near);
        let b = apply(light.shadow_transform, bottom_right_far);
        assert!(a.abs_diff_eq(Vec3::new(0.0, 0.0, 0.0), EPSILON), "{:?}", a);
        assert!(b.abs_diff_eq(Vec3::new(1.0, 1.0, 1.0), EPSILON), "{:?}", b);
    }
}

#[test]
fn scene_centre_lands_mid_map() {
    let bounds = bounds();
    let light = LightSpace::new(BASE_LIGHT_DIRECTION, bounds);
    let uv = apply(light.shadow_transform, bounds.center);
    assert!(uv.abs_diff_eq(Vec3::splat(0.5), EPSILON), "{:?}", uv);
}

#[test]
fn controller_rotates_light_about_y() {
    let mut controller = ShadowController::new(bounds(), 0.5, 2048);
    let before = controller.light_direction();
    controller.update(1.0);
    let after = controller.light_direction();

    assert!((controller.angle() - 0.5).abs() < EPSILON);
    assert!((before.y - after.y).abs() < EPSILON);
    assert!(!before.abs_diff_eq(after, EPSILON));

    let expected = Mat3::from_rotation_y(0.5) * BASE_LIGHT_DIRECTION;
    assert!(after.abs_diff_eq(expected.normalize(), EPSILON));
}

#[test]
fn light_sits_outside_the_bounds() {
    let bounds = bounds();
    for direction in light_directions() {
        let light = LightSpace::new(direction, bounds);
        assert!(light.frustum.near > 0.0, "{:?}", light.frustum);
        let distance = (light.position - bounds.center).length();
        assert!(distance > bounds.radius);
    }
}

#[test]
fn shadow_pass_leaves_map_readable() {
    let catalog = RenderItemCatalog::new();
    let materials = MaterialTable::new();
    let mut target = ShadowMapTarget::new(1024);
    let mut commands = CommandList::new();

    for _ in 0..2 {
        record_shadow_pass(&mut commands, &mut target, &catalog, &materials);
        assert_eq!(target.state(), ResourceState::GenericRead);
    }

    let transitions: Vec<_> = commands.transitions_of(TargetId::ShadowMap).collect();
    assert_eq!(
        transitions,
        vec![
            (ResourceState::GenericRead, ResourceState::DepthWrite),
            (ResourceState::DepthWrite, ResourceState::GenericRead),
            (ResourceState::GenericRead, ResourceState::DepthWrite),
            (ResourceState::DepthWrite, ResourceState::GenericRead),
        ]
    );
    assert_eq!(commands.draws().count(), 0);
}

#[test]
fn texture_mapping_flips_y_only() {
    let m = wgpu_shadow_skinning::scene::shadow::ndc_to_texture();
    let corner = m * Vec4::new(-1.0, 1.0, 0.25, 1.0);
    assert!(corner.abs_diff_eq(Vec4::new(0.0, 0.0, 0.25, 1.0), EPSILON));
    let corner = m * Vec4::new(1.0, -1.0, 0.75, 1.0);
    assert!(corner.abs_diff_eq(Vec4::new(1.0, 1.0, 0.75, 1.0), EPSILON));
}
