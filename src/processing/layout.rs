use crate::config::FitMode;

/// Scale that makes the source cover the whole viewport.
pub fn cover_scale(src_w: u32, src_h: u32, view_w: u32, view_h: u32) -> f64 {
    let (iw, ih, vw, vh) = dims(src_w, src_h, view_w, view_h);
    (vw / iw).max(vh / ih)
}

/// Scale that makes the whole source visible inside the viewport.
pub fn contain_scale(src_w: u32, src_h: u32, view_w: u32, view_h: u32) -> f64 {
    let (iw, ih, vw, vh) = dims(src_w, src_h, view_w, view_h);
    (vw / iw).min(vh / ih)
}

pub fn fit_scale(fit: FitMode, src_w: u32, src_h: u32, view_w: u32, view_h: u32) -> f64 {
    match fit {
        FitMode::Cover => cover_scale(src_w, src_h, view_w, view_h),
        FitMode::Contain => contain_scale(src_w, src_h, view_w, view_h),
    }
}

fn dims(src_w: u32, src_h: u32, view_w: u32, view_h: u32) -> (f64, f64, f64, f64) {
    (
        f64::from(src_w.max(1)),
        f64::from(src_h.max(1)),
        f64::from(view_w.max(1)),
        f64::from(view_h.max(1)),
    )
}

/// Largest offset from center that still keeps the scaled asset over the viewport.
///
/// Axes where the asset is not larger than the viewport have no travel.
pub fn pan_limits(scaled_w: f64, scaled_h: f64, view_w: u32, view_h: u32) -> (f64, f64) {
    let max_x = ((scaled_w - f64::from(view_w)) / 2.0).max(0.0);
    let max_y = ((scaled_h - f64::from(view_h)) / 2.0).max(0.0);
    (max_x, max_y)
}

/// Maps an unbounded position into `[-max, max)` with modulo arithmetic.
pub fn wrap_offset(position: f64, max: f64) -> f64 {
    if !(max > f64::EPSILON) || !position.is_finite() {
        return 0.0;
    }
    let wrapped = (position + max).rem_euclid(2.0 * max) - max;
    // rem_euclid can round up to the divisor for tiny negative inputs
    if wrapped >= max { -max } else { wrapped }
}
