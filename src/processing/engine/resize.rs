// src/processing/engine/resize.rs

//! Dimension logic: the memory ceiling and the user-requested resize.

use crate::core::{BatchSettings, MAX_DIMENSION};

/// Uniformly downscales dimensions so neither side exceeds [`MAX_DIMENSION`].
///
/// Dimensions already within the ceiling are returned unchanged.
pub fn constrain_dimensions(width: u32, height: u32) -> (u32, u32) {
    if width <= MAX_DIMENSION && height <= MAX_DIMENSION {
        return (width, height);
    }

    // Integer floor(side * MAX / longest) keeps the long side at exactly MAX.
    let longest = width.max(height) as u64;
    let scale = |side: u32| (side as u64 * MAX_DIMENSION as u64 / longest) as u32;
    (scale(width).max(1), scale(height).max(1))
}

/// Applies the user resize in `settings` to the current dimensions.
///
/// With the aspect lock on, a given width wins and the height follows the
/// current ratio; otherwise each given dimension overrides independently.
/// The result is clamped to at least 1×1.
pub fn apply_resize(width: u32, height: u32, settings: &BatchSettings) -> (u32, u32) {
    let (mut w, mut h) = (width as f64, height as f64);

    if settings.wants_resize() {
        if settings.lock_aspect {
            let ratio = w / h;
            if let Some(target_w) = settings.width {
                w = target_w as f64;
                h = (w / ratio).floor();
            } else if let Some(target_h) = settings.height {
                h = target_h as f64;
                w = (h * ratio).floor();
            }
        } else {
            if let Some(target_w) = settings.width {
                w = target_w as f64;
            }
            if let Some(target_h) = settings.height {
                h = target_h as f64;
            }
        }
    }

    let w = w.floor().clamp(1.0, u32::MAX as f64) as u32;
    let h = h.floor().clamp(1.0, u32::MAX as f64) as u32;
    (w, h)
}

/// Final output dimensions for a decoded image of `width`×`height`.
pub fn target_dimensions(width: u32, height: u32, settings: &BatchSettings) -> (u32, u32) {
    let (w, h) = constrain_dimensions(width, height);
    apply_resize(w, h, settings)
}
