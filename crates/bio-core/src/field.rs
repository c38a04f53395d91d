use crate::constants::{
    BACKGROUND_COUNT_FACTOR, FIELD_RADIUS, SCALE_MAX, SCALE_MIN, SPEED_MAX, SPEED_MIN,
};
use crate::sprite::Sprite;
use crate::tier::QualityTier;
use glam::Vec3;
use rand::prelude::*;
use std::f32::consts::TAU;
use std::ops::Range;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ColorScheme {
    PinkPurple,
    BlueTeal,
}

/// Hue/saturation/lightness sampling band of a scheme.
#[derive(Clone, Debug, PartialEq)]
pub struct HslBand {
    pub hue: Range<f32>,
    pub saturation: Range<f32>,
    pub lightness: Range<f32>,
}

impl ColorScheme {
    pub fn band(self) -> HslBand {
        match self {
            ColorScheme::PinkPurple => HslBand {
                hue: 0.80..0.95,
                saturation: 0.7..1.0,
                lightness: 0.5..0.8,
            },
            ColorScheme::BlueTeal => HslBand {
                hue: 0.50..0.65,
                saturation: 0.6..1.0,
                lightness: 0.4..0.8,
            },
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LayerKind {
    Foreground,
    Midground,
    Background,
}

#[derive(Clone, Debug, PartialEq)]
pub struct LayerConfig {
    pub kind: LayerKind,
    pub count: usize,
    pub point_size: f32,
    pub opacity: f32,
    pub depth_range: f32,
    pub color_scheme: ColorScheme,
    pub depth_influence: f32,
    pub wave_scale: f32,
    pub rotation_speed: f32,
}

impl LayerConfig {
    /// The three depth planes used for a given tier, front to back.
    pub fn standard_layers(tier: QualityTier) -> [LayerConfig; 3] {
        let s = tier.settings();
        [
            LayerConfig {
                kind: LayerKind::Foreground,
                count: s.foreground_count,
                point_size: 1.0,
                opacity: 0.8,
                depth_range: 40.0,
                color_scheme: ColorScheme::PinkPurple,
                depth_influence: 1.5,
                wave_scale: 2.5,
                rotation_speed: 0.02,
            },
            LayerConfig {
                kind: LayerKind::Midground,
                count: s.back_count,
                point_size: 0.6,
                opacity: 0.6,
                depth_range: 70.0,
                color_scheme: ColorScheme::PinkPurple,
                depth_influence: 1.0,
                wave_scale: 1.8,
                rotation_speed: 0.01,
            },
            LayerConfig {
                kind: LayerKind::Background,
                count: (s.back_count as f32 * BACKGROUND_COUNT_FACTOR).floor() as usize,
                point_size: 0.4,
                opacity: 0.4,
                depth_range: 100.0,
                color_scheme: ColorScheme::BlueTeal,
                depth_influence: 0.5,
                wave_scale: 1.0,
                rotation_speed: 0.005,
            },
        ]
    }

    fn validate(&self) -> Result<(), FieldError> {
        let checks = [
            ("point_size", self.point_size),
            ("opacity", self.opacity),
            ("depth_range", self.depth_range),
            ("depth_influence", self.depth_influence),
            ("wave_scale", self.wave_scale),
        ];
        for (name, value) in checks {
            if !value.is_finite() || value < 0.0 {
                return Err(FieldError::InvalidParameter { name, value });
            }
        }
        if !self.rotation_speed.is_finite() {
            return Err(FieldError::InvalidParameter {
                name: "rotation_speed",
                value: self.rotation_speed,
            });
        }
        if self.opacity > 1.0 {
            return Err(FieldError::InvalidParameter {
                name: "opacity",
                value: self.opacity,
            });
        }
        Ok(())
    }
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum FieldError {
    #[error("invalid layer parameter `{name}`: {value}")]
    InvalidParameter { name: &'static str, value: f32 },
}

/// One depth plane of particles.
///
/// Every per-point vector has exactly `count` entries for the lifetime of the
/// layer; only `current_positions` changes after construction.
#[derive(Clone, Debug)]
pub struct ParticleLayer {
    pub kind: LayerKind,
    pub count: usize,
    pub base_positions: Vec<Vec3>,
    pub current_positions: Vec<Vec3>,
    pub colors: Vec<[f32; 3]>,
    pub speeds: Vec<f32>,
    pub scales: Vec<f32>,
    pub point_size: f32,
    pub opacity: f32,
    pub depth_influence: f32,
    pub wave_scale: f32,
    pub rotation_speed: f32,
}

pub fn build_layer<R: Rng + ?Sized>(
    config: &LayerConfig,
    rng: &mut R,
) -> Result<ParticleLayer, FieldError> {
    config.validate()?;
    let n = config.count;
    let band = config.color_scheme.band();
    let mut base_positions = Vec::with_capacity(n);
    let mut colors = Vec::with_capacity(n);
    let mut speeds = Vec::with_capacity(n);
    let mut scales = Vec::with_capacity(n);
    for _ in 0..n {
        let theta = rng.gen::<f32>() * TAU;
        let phi = (2.0 * rng.gen::<f32>() - 1.0).acos();
        // sqrt(u) radius: denser towards the rim, not a uniform-volume fill
        let r = rng.gen::<f32>().sqrt() * FIELD_RADIUS;
        let x = r * phi.sin() * theta.cos();
        let y = r * phi.sin() * theta.sin();
        let z = (rng.gen::<f32>() - 0.5) * config.depth_range;
        base_positions.push(Vec3::new(x, y, z));

        let h = sample_in(rng, &band.hue);
        let s = sample_in(rng, &band.saturation);
        let l = sample_in(rng, &band.lightness);
        colors.push(hsl_to_rgb(h, s, l));

        scales.push(sample_in(rng, &(SCALE_MIN..SCALE_MAX)));
        speeds.push(sample_in(rng, &(SPEED_MIN..SPEED_MAX)));
    }
    Ok(ParticleLayer {
        kind: config.kind,
        count: n,
        current_positions: base_positions.clone(),
        base_positions,
        colors,
        speeds,
        scales,
        point_size: config.point_size,
        opacity: config.opacity,
        depth_influence: config.depth_influence,
        wave_scale: config.wave_scale,
        rotation_speed: config.rotation_speed,
    })
}

#[inline]
fn sample_in<R: Rng + ?Sized>(rng: &mut R, range: &Range<f32>) -> f32 {
    range.start + rng.gen::<f32>() * (range.end - range.start)
}

/// HSL (all components in 0..1, hue wraps) to RGB.
pub fn hsl_to_rgb(h: f32, s: f32, l: f32) -> [f32; 3] {
    let h = h.rem_euclid(1.0);
    let s = s.clamp(0.0, 1.0);
    let l = l.clamp(0.0, 1.0);
    if s == 0.0 {
        return [l, l, l];
    }
    let q = if l <= 0.5 { l * (1.0 + s) } else { l + s - l * s };
    let p = 2.0 * l - q;
    [
        hue_to_channel(p, q, h + 1.0 / 3.0),
        hue_to_channel(p, q, h),
        hue_to_channel(p, q, h - 1.0 / 3.0),
    ]
}

fn hue_to_channel(p: f32, q: f32, t: f32) -> f32 {
    let t = t.rem_euclid(1.0);
    if t < 1.0 / 6.0 {
        p + (q - p) * 6.0 * t
    } else if t < 0.5 {
        q
    } else if t < 2.0 / 3.0 {
        p + (q - p) * 6.0 * (2.0 / 3.0 - t)
    } else {
        p
    }
}

/// Everything a session draws: the shared sprite and the layers that built.
pub struct ParticleField {
    pub sprite: Sprite,
    pub layers: Vec<ParticleLayer>,
}

impl ParticleField {
    /// Builds the standard three layers; a layer that fails is logged and left
    /// out rather than failing the whole field.
    pub fn build<R: Rng + ?Sized>(tier: QualityTier, rng: &mut R) -> Self {
        let layers = LayerConfig::standard_layers(tier)
            .iter()
            .filter_map(|config| match build_layer(config, rng) {
                Ok(layer) => Some(layer),
                Err(e) => {
                    log::error!("[field] {:?} layer skipped: {}", config.kind, e);
                    None
                }
            })
            .collect();
        Self {
            sprite: Sprite::soft_circle(crate::constants::SPRITE_SIZE),
            layers,
        }
    }

    pub fn particle_count(&self) -> usize {
        self.layers.iter().map(|l| l.count).sum()
    }
}
