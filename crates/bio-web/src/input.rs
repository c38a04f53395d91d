use bio_core::Viewport;

/// Where a page listener is attached.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ListenOn {
    Window,
    Document,
    /// `document.documentElement`; `mouseleave` does not bubble past it.
    Root,
}

pub fn listen_on(kind: &str) -> ListenOn {
    match kind {
        "mouseleave" => ListenOn::Root,
        "visibilitychange" => ListenOn::Document,
        _ => ListenOn::Window,
    }
}

/// Touch handlers never cancel the event, so scrolling must not wait on them.
#[inline]
pub fn is_passive(kind: &str) -> bool {
    matches!(kind, "touchstart" | "touchmove")
}

/// Viewport from raw window metrics. Missing or non-finite sizes become 0,
/// a missing or non-positive pixel ratio becomes 1.
pub fn sanitize_viewport(width: Option<f64>, height: Option<f64>, pixel_ratio: f64) -> Viewport {
    let size = |v: Option<f64>| match v {
        Some(v) if v.is_finite() && v > 0.0 => v as f32,
        _ => 0.0,
    };
    let ratio = if pixel_ratio.is_finite() && pixel_ratio > 0.0 {
        pixel_ratio as f32
    } else {
        1.0
    };
    Viewport::new(size(width), size(height), ratio)
}

/// Only the first touch point steers the field.
#[inline]
pub fn first_touch<I>(touches: I) -> Option<(f32, f32)>
where
    I: IntoIterator<Item = (i32, i32)>,
{
    touches
        .into_iter()
        .next()
        .map(|(x, y)| (x as f32, y as f32))
}

#[inline]
pub fn css_px(v: f32) -> String {
    format!("{}px", v.max(0.0))
}

#[inline]
pub fn opacity_for(ready: bool) -> &'static str {
    if ready {
        "1"
    } else {
        "0"
    }
}
