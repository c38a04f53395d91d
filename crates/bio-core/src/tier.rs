//! Device capability detection.
//!
//! The tier is derived once from the viewport when a session is created and
//! stays fixed for that session; a different tier needs a full re-init.

use crate::constants::{
    HIGH_COUNTS, LOW_AREA_THRESHOLD, LOW_COUNTS, MEDIUM_AREA_THRESHOLD, MEDIUM_COUNTS,
};

/// Viewport size in CSS pixels plus the device pixel ratio.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
    pub pixel_ratio: f32,
}

impl Viewport {
    pub fn new(width: f32, height: f32, pixel_ratio: f32) -> Self {
        Self {
            width,
            height,
            pixel_ratio,
        }
    }

    #[inline]
    pub fn area(&self) -> f64 {
        self.width as f64 * self.height as f64
    }

    #[inline]
    pub fn aspect(&self) -> f32 {
        if self.height > 0.0 {
            self.width / self.height
        } else {
            1.0
        }
    }

    /// Same viewport with the pixel ratio clamped to `max`.
    #[inline]
    pub fn capped(&self, max: f32) -> Self {
        Self {
            pixel_ratio: self.pixel_ratio.min(max),
            ..*self
        }
    }

    /// Backing-store size in physical pixels, never zero.
    pub fn physical_size(&self) -> (u32, u32) {
        let w = (self.width * self.pixel_ratio).round().max(1.0) as u32;
        let h = (self.height * self.pixel_ratio).round().max(1.0) as u32;
        (w, h)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum QualityTier {
    Low,
    Medium,
    High,
}

/// Per-tier rendering budget.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TierSettings {
    pub foreground_count: usize,
    pub back_count: usize,
    pub antialias: bool,
    pub max_pixel_ratio: f32,
}

impl QualityTier {
    pub fn settings(self) -> TierSettings {
        let (fore, back) = match self {
            QualityTier::High => HIGH_COUNTS,
            QualityTier::Medium => MEDIUM_COUNTS,
            QualityTier::Low => LOW_COUNTS,
        };
        TierSettings {
            foreground_count: fore,
            back_count: back,
            antialias: self != QualityTier::Low,
            max_pixel_ratio: if self == QualityTier::Low { 1.0 } else { 2.0 },
        }
    }
}

/// First match wins. Any area above the low threshold is also above the
/// medium one, so detection never yields `Low` on its own; the tier still
/// exists for callers that force it.
pub fn detect(viewport: &Viewport) -> QualityTier {
    let area = viewport.area();
    if viewport.pixel_ratio <= 1.0 || area > MEDIUM_AREA_THRESHOLD {
        QualityTier::Medium
    } else if area > LOW_AREA_THRESHOLD {
        QualityTier::Low
    } else {
        QualityTier::High
    }
}
