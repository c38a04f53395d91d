// Host-side tests for the GPU-facing data layout. These run without a device.

use bio_core::{Camera, LayerKind, ParticleLayer, QualityTier};
use bio_render::*;

#[test]
fn uniform_structs_match_shader_layout() {
    // mat4x4 + vec2 + pad, 16-byte aligned
    assert_eq!(std::mem::size_of::<Globals>(), 80);
    assert_eq!(std::mem::size_of::<LayerParams>(), 16);
    assert_eq!(std::mem::size_of::<glam::Vec3>(), 12);
}

#[test]
fn globals_carry_projection_and_viewport() {
    let camera = Camera::new(2.0);
    let g = Globals::new(&camera, 0, 720);
    assert_eq!(g.viewport, [1.0, 720.0]);
    assert_eq!(g.view_proj, camera.view_projection().to_cols_array_2d());
}

#[test]
fn layer_params_copy_layer_appearance() {
    let layer = ParticleLayer {
        kind: LayerKind::Midground,
        count: 0,
        base_positions: vec![],
        current_positions: vec![],
        colors: vec![],
        speeds: vec![],
        scales: vec![],
        point_size: 0.6,
        opacity: 0.6,
        depth_influence: 1.0,
        wave_scale: 1.8,
        rotation_speed: 0.01,
    };
    let p = LayerParams::of(&layer);
    assert_eq!((p.point_size, p.opacity), (0.6, 0.6));
}

#[test]
fn quad_is_centred_unit_square() {
    let (mut min, mut max) = ([f32::MAX; 2], [f32::MIN; 2]);
    for [x, y] in QUAD_CORNERS {
        min = [min[0].min(x), min[1].min(y)];
        max = [max[0].max(x), max[1].max(y)];
    }
    assert_eq!(min, [-0.5, -0.5]);
    assert_eq!(max, [0.5, 0.5]);
}

#[test]
fn low_tier_disables_multisampling() {
    assert_eq!(RendererOptions::for_tier(QualityTier::Low).sample_count, 1);
    assert_eq!(RendererOptions::for_tier(QualityTier::High).sample_count, 4);
    assert!(RendererOptions::default().transparent);
}

#[test]
fn sample_count_falls_back_to_supported_value() {
    assert_eq!(pick_sample_count(4, |n| n == 4), 4);
    assert_eq!(pick_sample_count(8, |n| n <= 4), 4);
    assert_eq!(pick_sample_count(4, |_| false), 1);
    assert_eq!(pick_sample_count(0, |_| true), 1);
    assert_eq!(pick_sample_count(3, |n| n == 2), 2);
}

#[test]
fn blending_is_additive() {
    assert_eq!(ADDITIVE.color.dst_factor, wgpu::BlendFactor::One);
    assert_eq!(ADDITIVE.color.src_factor, wgpu::BlendFactor::SrcAlpha);
}
