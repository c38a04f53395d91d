use crate::constants::{
    DEPTH_DISTANCE_DIVISOR, DEPTH_FACTOR_MAX, POINTER_PARALLAX, WAVE_DIST_FREQ_XY,
    WAVE_DIST_FREQ_Z,
};
use crate::field::ParticleLayer;
use glam::{Vec2, Vec3};

/// Recompute every point of `layer` for time `t_sec`.
///
/// Three additive terms: rotation of the base xy around the origin,
/// pointer parallax scaled by distance, and a radius-phased wave. Every term
/// depends on `t_sec`, so nothing is cached between frames.
pub fn step_layer(layer: &mut ParticleLayer, t_sec: f32, pointer: Vec2) {
    let angle = t_sec * layer.rotation_speed;
    let (sin_a, cos_a) = angle.sin_cos();
    let wave = layer.wave_scale;
    let influence = layer.depth_influence;
    for ((out, base), speed) in layer
        .current_positions
        .iter_mut()
        .zip(&layer.base_positions)
        .zip(&layer.speeds)
    {
        *out = displace(*base, *speed, sin_a, cos_a, t_sec, pointer, influence, wave);
    }
}

#[inline]
#[allow(clippy::too_many_arguments)]
fn displace(
    base: Vec3,
    speed: f32,
    sin_a: f32,
    cos_a: f32,
    t_sec: f32,
    pointer: Vec2,
    depth_influence: f32,
    wave_scale: f32,
) -> Vec3 {
    let dist = base.length();
    let depth_factor = (dist / DEPTH_DISTANCE_DIVISOR * depth_influence).min(DEPTH_FACTOR_MAX);
    let phase = t_sec * speed;
    let rotated_x = base.x * cos_a - base.y * sin_a;
    let rotated_y = base.x * sin_a + base.y * cos_a;
    let ripple = phase + dist * WAVE_DIST_FREQ_XY;
    Vec3::new(
        rotated_x - pointer.x * POINTER_PARALLAX * depth_factor + ripple.sin() * wave_scale,
        rotated_y + pointer.y * POINTER_PARALLAX * depth_factor + ripple.cos() * wave_scale,
        base.z + (phase * 2.0 + dist * WAVE_DIST_FREQ_Z).sin() * wave_scale * 0.5,
    )
}

/// Steps each layer independently, in iteration order.
pub fn step_layers<'a, I>(layers: I, t_sec: f32, pointer: Vec2)
where
    I: IntoIterator<Item = &'a mut ParticleLayer>,
{
    for layer in layers {
        step_layer(layer, t_sec, pointer);
    }
}
