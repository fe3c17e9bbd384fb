// Sprite geometry: resize to the placement box and rotate with bound expansion.

use image::imageops::{self, FilterType};
use image::{Rgba, Rgba32FImage, RgbaImage};

const ANGLE_EPSILON: f64 = 1e-9;

/// Resize to exactly `width`×`height` with Lanczos3; no-op when already that size.
///
/// Filtering runs on premultiplied color so transparent pixels add no color
/// to the edges they border.
pub fn resize_exact(image: RgbaImage, width: u32, height: u32) -> RgbaImage {
    if image.dimensions() == (width, height) {
        return image;
    }

    let mut premultiplied = Rgba32FImage::new(image.width(), image.height());
    for (dst, src) in premultiplied.pixels_mut().zip(image.pixels()) {
        let alpha = src[3] as f32 / 255.0;
        *dst = Rgba([
            src[0] as f32 / 255.0 * alpha,
            src[1] as f32 / 255.0 * alpha,
            src[2] as f32 / 255.0 * alpha,
            alpha,
        ]);
    }

    let scaled = imageops::resize(&premultiplied, width, height, FilterType::Lanczos3);
    let mut out = RgbaImage::new(width, height);
    for (dst, src) in out.pixels_mut().zip(scaled.pixels()) {
        *dst = unpremultiply(src);
    }
    out
}

fn unpremultiply(pixel: &Rgba<f32>) -> Rgba<u8> {
    let alpha = pixel[3].clamp(0.0, 1.0);
    let alpha_u8 = (alpha * 255.0).round() as u8;
    if alpha_u8 == 0 {
        return Rgba([0, 0, 0, 0]);
    }
    let channel = |value: f32| (value / alpha * 255.0).round().clamp(0.0, 255.0) as u8;
    Rgba([channel(pixel[0]), channel(pixel[1]), channel(pixel[2]), alpha_u8])
}

/// Rotate counter-clockwise by `degrees` about the image center, growing the
/// canvas so no corner is clipped. Uncovered pixels are fully transparent.
///
/// Quarter turns are exact pixel permutations; other angles are resampled
/// bicubically on premultiplied color.
pub fn rotate_expand(image: &RgbaImage, degrees: f64) -> RgbaImage {
    let angle = degrees.rem_euclid(360.0);
    let near = |target: f64| (angle - target).abs() < ANGLE_EPSILON;

    if near(0.0) || near(360.0) {
        return image.clone();
    }
    if near(90.0) {
        return imageops::rotate270(image);
    }
    if near(180.0) {
        return imageops::rotate180(image);
    }
    if near(270.0) {
        return imageops::rotate90(image);
    }

    let (src_w, src_h) = (image.width() as f64, image.height() as f64);
    let (sin, cos) = angle.to_radians().sin_cos();

    let extent_w = src_w * cos.abs() + src_h * sin.abs();
    let extent_h = src_w * sin.abs() + src_h * cos.abs();
    let dst_w = (extent_w - 1e-6).ceil().max(1.0) as u32;
    let dst_h = (extent_h - 1e-6).ceil().max(1.0) as u32;

    let mut out = RgbaImage::new(dst_w, dst_h);
    let (half_dst_w, half_dst_h) = (dst_w as f64 / 2.0, dst_h as f64 / 2.0);
    let (half_src_w, half_src_h) = (src_w / 2.0, src_h / 2.0);

    for (ox, oy, pixel) in out.enumerate_pixels_mut() {
        let dx = ox as f64 + 0.5 - half_dst_w;
        let dy = oy as f64 + 0.5 - half_dst_h;
        // Inverse of the on-screen counter-clockwise rotation (y grows downward).
        let sx = dx * cos - dy * sin + half_src_w - 0.5;
        let sy = dx * sin + dy * cos + half_src_h - 0.5;
        *pixel = sample_bicubic(image, sx, sy);
    }

    out
}

/// Keys cubic convolution kernel, a = -0.5.
fn cubic_weight(t: f64) -> f64 {
    const A: f64 = -0.5;
    let t = t.abs();
    if t <= 1.0 {
        ((A + 2.0) * t - (A + 3.0)) * t * t + 1.0
    } else if t < 2.0 {
        ((A * t - 5.0 * A) * t + 8.0 * A) * t - 4.0 * A
    } else {
        0.0
    }
}

fn sample_bicubic(image: &RgbaImage, x: f64, y: f64) -> Rgba<u8> {
    let (w, h) = (image.width() as i64, image.height() as i64);
    let x0 = x.floor() as i64;
    let y0 = y.floor() as i64;
    if x0 < -2 || y0 < -2 || x0 > w + 1 || y0 > h + 1 {
        return Rgba([0, 0, 0, 0]);
    }

    let fx = x - x0 as f64;
    let fy = y - y0 as f64;
    let wx = [
        cubic_weight(fx + 1.0),
        cubic_weight(fx),
        cubic_weight(fx - 1.0),
        cubic_weight(fx - 2.0),
    ];
    let wy = [
        cubic_weight(fy + 1.0),
        cubic_weight(fy),
        cubic_weight(fy - 1.0),
        cubic_weight(fy - 2.0),
    ];

    // Premultiplied accumulation so transparent neighbours do not bleed color.
    let mut acc = [0.0f64; 4];
    for (j, weight_y) in wy.iter().enumerate() {
        let sy = y0 - 1 + j as i64;
        if sy < 0 || sy >= h {
            continue;
        }
        for (i, weight_x) in wx.iter().enumerate() {
            let sx = x0 - 1 + i as i64;
            if sx < 0 || sx >= w {
                continue;
            }
            let p = image.get_pixel(sx as u32, sy as u32);
            let weight = weight_x * weight_y;
            let alpha = p[3] as f64;
            acc[0] += p[0] as f64 * alpha * weight;
            acc[1] += p[1] as f64 * alpha * weight;
            acc[2] += p[2] as f64 * alpha * weight;
            acc[3] += alpha * weight;
        }
    }

    let alpha = acc[3].clamp(0.0, 255.0);
    if alpha < 0.5 {
        return Rgba([0, 0, 0, 0]);
    }
    let channel = |sum: f64| (sum / acc[3]).round().clamp(0.0, 255.0) as u8;
    Rgba([
        channel(acc[0]),
        channel(acc[1]),
        channel(acc[2]),
        alpha.round() as u8,
    ])
}
