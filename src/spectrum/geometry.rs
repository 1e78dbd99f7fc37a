// SPDX-License-Identifier: GPL-3.0-only

//! Mapping of the passepartout onto the analysis surface
//!
//! The capture coordinate system is rotated against the render target: the
//! capture's vertical span (top/bottom) lands on the target's x axis and its
//! horizontal span (left/right) on the y axis, both flipped (`1 - value`).
//! The scissor rectangle and the readback crop use the same mapping.

use super::types::{DispersionAxis, PassepartoutRegion};
use std::ops::Range;

/// Scissor rectangle in render-target pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScissorRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl ScissorRect {
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// Scissor rectangle for the luminance pass, clipped to the surface
///
/// ```text
/// x = floor(W * (1 - max(top, bottom)))
/// y = floor(H * (1 - max(left, right)))
/// w = ceil(W * |bottom - top|)
/// h = ceil(H * |right - left|)
/// ```
pub fn scissor_rect(region: &PassepartoutRegion, width: u32, height: u32) -> ScissorRect {
    let w = width as f64;
    let h = height as f64;
    let top = region.top as f64;
    let bottom = region.bottom as f64;
    let left = region.left as f64;
    let right = region.right as f64;

    let x = (w * (1.0 - top.max(bottom))).floor() as i64;
    let y = (h * (1.0 - left.max(right))).floor() as i64;
    let sw = (w * (bottom - top).abs()).ceil() as i64;
    let sh = (h * (right - left).abs()).ceil() as i64;

    let (x0, x1) = clip_span(x, sw, width);
    let (y0, y1) = clip_span(y, sh, height);

    ScissorRect {
        x: x0,
        y: y0,
        width: x1 - x0,
        height: y1 - y0,
    }
}

fn clip_span(start: i64, len: i64, limit: u32) -> (u32, u32) {
    let limit = limit as i64;
    let lo = start.clamp(0, limit);
    let hi = (start + len).clamp(lo, limit);
    (lo as u32, hi as u32)
}

/// Region-of-interest window along the dispersion axis of length `length`
///
/// Uses the region's span on the capture axis that maps onto the dispersion
/// axis, flipped the same way as the scissor. Inverted regions are valid;
/// the bounds are swapped. An empty range is a valid result.
pub fn crop_range(region: &PassepartoutRegion, axis: DispersionAxis, length: usize) -> Range<usize> {
    let (a, b) = match axis {
        DispersionAxis::Columns => (region.top, region.bottom),
        DispersionAxis::Rows => (region.left, region.right),
    };
    let norm_min = 1.0 - a.min(b);
    let norm_max = 1.0 - a.max(b);

    let clamp = |v: f32| -> usize {
        let scaled = (v * length as f32).floor();
        if scaled <= 0.0 {
            0
        } else {
            (scaled as usize).min(length)
        }
    };

    let mut start = clamp(norm_max);
    let mut end = clamp(norm_min);
    if start > end {
        std::mem::swap(&mut start, &mut end);
    }
    start..end
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_region_covers_surface() {
        let rect = scissor_rect(&PassepartoutRegion::FULL, 640, 480);
        assert_eq!(
            rect,
            ScissorRect {
                x: 0,
                y: 0,
                width: 640,
                height: 480
            }
        );
    }

    #[test]
    fn test_scissor_axes_are_swapped_and_flipped() {
        // Vertical band in the upper half of the capture
        let region = PassepartoutRegion::new(0.25, 0.0, 0.75, 0.5);
        let rect = scissor_rect(&region, 100, 200);
        assert_eq!(rect.x, 50);
        assert_eq!(rect.width, 50);
        assert_eq!(rect.y, 50);
        assert_eq!(rect.height, 100);
    }

    #[test]
    fn test_scissor_clipped_to_surface() {
        let region = PassepartoutRegion::new(-0.5, -0.5, 1.5, 1.5);
        let rect = scissor_rect(&region, 64, 32);
        assert_eq!(rect.x, 0);
        assert_eq!(rect.y, 0);
        assert_eq!(rect.width, 64);
        assert_eq!(rect.height, 32);
    }

    #[test]
    fn test_scissor_order_independent() {
        let regions = [
            PassepartoutRegion::new(0.1, 0.2, 0.7, 0.9),
            PassepartoutRegion::new(0.7, 0.2, 0.1, 0.9),
            PassepartoutRegion::new(0.1, 0.9, 0.7, 0.2),
            PassepartoutRegion::new(0.7, 0.9, 0.1, 0.2),
            PassepartoutRegion::new(0.33, 0.0, 0.34, 1.0),
        ];
        for region in regions {
            assert_eq!(
                scissor_rect(&region, 1600, 1200),
                scissor_rect(&region.normalized(), 1600, 1200),
                "region {:?}",
                region
            );
        }
    }

    #[test]
    fn test_crop_range_columns_uses_vertical_span() {
        let region = PassepartoutRegion::new(0.0, 0.25, 1.0, 0.75);
        assert_eq!(crop_range(&region, DispersionAxis::Columns, 100), 25..75);

        let shifted = PassepartoutRegion::new(0.0, 0.0, 1.0, 0.5);
        assert_eq!(crop_range(&shifted, DispersionAxis::Columns, 100), 50..100);
    }

    #[test]
    fn test_crop_range_rows_uses_horizontal_span() {
        let region = PassepartoutRegion::new(0.25, 0.0, 0.5, 1.0);
        assert_eq!(crop_range(&region, DispersionAxis::Rows, 8), 4..6);
    }

    #[test]
    fn test_crop_range_inverted_region() {
        let region = PassepartoutRegion::new(0.0, 0.75, 1.0, 0.25);
        assert_eq!(crop_range(&region, DispersionAxis::Columns, 100), 25..75);
    }

    #[test]
    fn test_crop_range_clamped() {
        let region = PassepartoutRegion::new(0.0, -0.5, 1.0, 1.5);
        assert_eq!(crop_range(&region, DispersionAxis::Columns, 40), 0..40);
    }

    #[test]
    fn test_crop_range_empty() {
        let region = PassepartoutRegion::new(0.0, 0.5, 1.0, 0.5);
        let range = crop_range(&region, DispersionAxis::Columns, 100);
        assert!(range.is_empty());
    }
}
