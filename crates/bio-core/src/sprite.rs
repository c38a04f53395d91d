use crate::constants::SPRITE_ALPHA_STOPS;

/// Square RGBA8 paint resource shared by every layer of a session.
#[derive(Clone, Debug, PartialEq)]
pub struct Sprite {
    pub size: u32,
    pub pixels: Vec<u8>,
}

impl Sprite {
    /// White disc with a radial alpha falloff: opaque at the centre,
    /// transparent at the edge of the inscribed circle and beyond.
    pub fn soft_circle(size: u32) -> Self {
        let size = size.max(1);
        let center = size as f32 / 2.0;
        let mut pixels = Vec::with_capacity((size * size * 4) as usize);
        for y in 0..size {
            for x in 0..size {
                let dx = x as f32 + 0.5 - center;
                let dy = y as f32 + 0.5 - center;
                let t = (dx * dx + dy * dy).sqrt() / center;
                let a = (radial_alpha(t) * 255.0).round() as u8;
                pixels.extend_from_slice(&[255, 255, 255, a]);
            }
        }
        Self { size, pixels }
    }

    #[inline]
    pub fn alpha_at(&self, x: u32, y: u32) -> u8 {
        self.pixels[((y * self.size + x) * 4 + 3) as usize]
    }
}

/// Piecewise-linear alpha over normalized radius `t`.
pub fn radial_alpha(t: f32) -> f32 {
    if t <= SPRITE_ALPHA_STOPS[0].0 {
        return SPRITE_ALPHA_STOPS[0].1;
    }
    for pair in SPRITE_ALPHA_STOPS.windows(2) {
        let (t0, a0) = pair[0];
        let (t1, a1) = pair[1];
        if t <= t1 {
            let k = (t - t0) / (t1 - t0);
            return a0 + (a1 - a0) * k;
        }
    }
    0.0
}
