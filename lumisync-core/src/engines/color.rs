//! Color math shared by the sync engines.

/// Linear interpolation from `start` toward `end`.
pub fn lerp(start: f32, end: f32, factor: f32) -> f32 {
    start + (end - start) * factor
}

/// Interpolates between two hues in degrees, taking the shorter path
/// around the color wheel. The result is reduced modulo 360.
pub fn lerp_hue(start: f32, end: f32, factor: f32) -> f32 {
    let mut start = start;
    let mut end = end;
    let diff = end - start;
    if diff.abs() > 180.0 {
        if end > start {
            start += 360.0;
        } else {
            end += 360.0;
        }
    }
    lerp(start, end, factor).rem_euclid(360.0)
}

/// Applies gamma correction per channel: `255 * (c/255)^gamma`.
pub fn apply_gamma_correction(rgb: [u8; 3], gamma: f32) -> [u8; 3] {
    rgb.map(|c| (255.0 * (c as f32 / 255.0).powf(gamma)) as u8)
}

/// Converts RGB (0-255) to HSV with all components in [0, 1].
pub fn rgb_to_hsv(rgb: [u8; 3]) -> (f32, f32, f32) {
    let r = rgb[0] as f32 / 255.0;
    let g = rgb[1] as f32 / 255.0;
    let b = rgb[2] as f32 / 255.0;

    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let delta = max - min;

    let v = max;
    let s = if max > 0.0 { delta / max } else { 0.0 };

    let h = if delta == 0.0 {
        0.0
    } else if max == r {
        ((g - b) / delta).rem_euclid(6.0) / 6.0
    } else if max == g {
        ((b - r) / delta + 2.0) / 6.0
    } else {
        ((r - g) / delta + 4.0) / 6.0
    };

    (h, s, v)
}
