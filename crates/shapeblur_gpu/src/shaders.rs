//! WGSL compute shaders for the device pipeline.
//!
//! All passes share the `PassInfo` layout: dimensions, the current
//! Gaussian kernel size, and the Canny hysteresis thresholds. Sampling
//! clamps to the region edge, matching the host filters' border
//! handling.

/// Unpack the region (one `u32` per pixel, c0 | c1<<8 | c2<<16) into
/// three f32 channel planes plus a Rec.601 luma plane. Channel order is
/// BGR by the data model's convention, so c0 carries the blue weight.
pub const UNPACK_SHADER: &str = r#"
struct PassInfo {
    width: u32,
    height: u32,
    kernel: u32,
    pad0: u32,
    low: f32,
    high: f32,
    pad1: f32,
    pad2: f32,
};

@group(0) @binding(0)
var<storage, read> packed_pixels: array<u32>;

@group(0) @binding(1)
var<storage, read_write> plane0: array<f32>;

@group(0) @binding(2)
var<storage, read_write> plane1: array<f32>;

@group(0) @binding(3)
var<storage, read_write> plane2: array<f32>;

@group(0) @binding(4)
var<storage, read_write> gray: array<f32>;

@group(0) @binding(5)
var<uniform> info: PassInfo;

@compute @workgroup_size(256)
fn unpack_main(@builtin(global_invocation_id) id: vec3<u32>) {
    let idx = id.x;
    if (idx >= info.width * info.height) {
        return;
    }
    let px = packed_pixels[idx];
    let c0 = f32(px & 0xFFu);
    let c1 = f32((px >> 8u) & 0xFFu);
    let c2 = f32((px >> 16u) & 0xFFu);
    plane0[idx] = c0;
    plane1[idx] = c1;
    plane2[idx] = c2;
    gray[idx] = 0.114 * c0 + 0.587 * c1 + 0.299 * c2;
}
"#;

/// Two-pass separable Gaussian over one f32 plane, weights supplied by
/// the host for the pass's kernel size.
pub const GAUSSIAN_SHADER: &str = r#"
struct PassInfo {
    width: u32,
    height: u32,
    kernel: u32,
    pad0: u32,
    low: f32,
    high: f32,
    pad1: f32,
    pad2: f32,
};

@group(0) @binding(0)
var<storage, read> source_pixels: array<f32>;

@group(0) @binding(1)
var<storage, read_write> target_pixels: array<f32>;

@group(0) @binding(2)
var<storage, read> kernel_weights: array<f32>;

@group(0) @binding(3)
var<uniform> info: PassInfo;

fn sample_index(x: i32, y: i32) -> u32 {
    let sx = clamp(x, 0, i32(info.width) - 1);
    let sy = clamp(y, 0, i32(info.height) - 1);
    return u32(sy) * info.width + u32(sx);
}

@compute @workgroup_size(16, 16, 1)
fn blur_horizontal(@builtin(global_invocation_id) id: vec3<u32>) {
    let x = id.x;
    let y = id.y;
    if (x >= info.width || y >= info.height) {
        return;
    }

    let radius = info.kernel / 2u;
    var acc = 0.0;
    var k = 0u;
    loop {
        if (k >= info.kernel) {
            break;
        }
        let offset = i32(k) - i32(radius);
        let index = sample_index(i32(x) + offset, i32(y));
        acc = acc + source_pixels[index] * kernel_weights[k];
        k = k + 1u;
    }
    target_pixels[y * info.width + x] = acc;
}

@compute @workgroup_size(16, 16, 1)
fn blur_vertical(@builtin(global_invocation_id) id: vec3<u32>) {
    let x = id.x;
    let y = id.y;
    if (x >= info.width || y >= info.height) {
        return;
    }

    let radius = info.kernel / 2u;
    var acc = 0.0;
    var k = 0u;
    loop {
        if (k >= info.kernel) {
            break;
        }
        let offset = i32(k) - i32(radius);
        let index = sample_index(i32(x), i32(y) + offset);
        acc = acc + source_pixels[index] * kernel_weights[k];
        k = k + 1u;
    }
    target_pixels[y * info.width + x] = acc;
}
"#;

/// Sobel gradient over the smoothed luma plane, producing magnitude and
/// direction planes for the suppression pass.
pub const SOBEL_SHADER: &str = r#"
struct PassInfo {
    width: u32,
    height: u32,
    kernel: u32,
    pad0: u32,
    low: f32,
    high: f32,
    pad1: f32,
    pad2: f32,
};

@group(0) @binding(0)
var<storage, read> blurred_pixels: array<f32>;

@group(0) @binding(1)
var<storage, read_write> magnitude_out: array<f32>;

@group(0) @binding(2)
var<storage, read_write> direction_out: array<f32>;

@group(0) @binding(3)
var<uniform> info: PassInfo;

fn sobel_weight_x(row: u32, col: u32) -> f32 {
    if (col == 1u) {
        return 0.0;
    }
    var weight = 1.0;
    if (row == 1u) {
        weight = 2.0;
    }
    if (col == 0u) {
        return -weight;
    }
    return weight;
}

fn sobel_weight_y(row: u32, col: u32) -> f32 {
    if (row == 1u) {
        return 0.0;
    }
    var weight = 1.0;
    if (col == 1u) {
        weight = 2.0;
    }
    if (row == 0u) {
        return weight;
    }
    return -weight;
}

@compute @workgroup_size(16, 16, 1)
fn sobel_main(@builtin(global_invocation_id) id: vec3<u32>) {
    let x = id.x;
    let y = id.y;
    if (x >= info.width || y >= info.height) {
        return;
    }

    var gx = 0.0;
    var gy = 0.0;
    var ky = 0u;
    loop {
        if (ky >= 3u) {
            break;
        }
        var kx = 0u;
        loop {
            if (kx >= 3u) {
                break;
            }
            let sx = clamp(i32(x) + i32(kx) - 1, 0, i32(info.width) - 1);
            let sy = clamp(i32(y) + i32(ky) - 1, 0, i32(info.height) - 1);
            let value = blurred_pixels[u32(sy) * info.width + u32(sx)];
            gx = gx + value * sobel_weight_x(ky, kx);
            gy = gy + value * sobel_weight_y(ky, kx);
            kx = kx + 1u;
        }
        ky = ky + 1u;
    }

    let idx = y * info.width + x;
    magnitude_out[idx] = sqrt(gx * gx + gy * gy);
    direction_out[idx] = atan2(gy, gx);
}
"#;

/// Non-maximum suppression with double thresholding. Output classes:
/// 255 strong, 128 weak, 0 suppressed. Weak-to-strong hysteresis
/// linking completes on the host after readback.
pub const NMS_SHADER: &str = r#"
struct PassInfo {
    width: u32,
    height: u32,
    kernel: u32,
    pad0: u32,
    low: f32,
    high: f32,
    pad1: f32,
    pad2: f32,
};

@group(0) @binding(0)
var<storage, read> magnitude_in: array<f32>;

@group(0) @binding(1)
var<storage, read> direction_in: array<f32>;

@group(0) @binding(2)
var<storage, read_write> class_out: array<f32>;

@group(0) @binding(3)
var<uniform> info: PassInfo;

fn magnitude_at(x: i32, y: i32) -> f32 {
    if (x < 0 || y < 0 || x >= i32(info.width) || y >= i32(info.height)) {
        return 0.0;
    }
    return magnitude_in[u32(y) * info.width + u32(x)];
}

@compute @workgroup_size(16, 16, 1)
fn nms_main(@builtin(global_invocation_id) id: vec3<u32>) {
    let x = id.x;
    let y = id.y;
    if (x >= info.width || y >= info.height) {
        return;
    }

    let idx = y * info.width + x;
    let mag = magnitude_in[idx];

    var angle = direction_in[idx] * 57.29577951308232;
    if (angle < 0.0) {
        angle = angle + 180.0;
    }

    var dx: i32 = 1;
    var dy: i32 = 0;
    if (angle >= 22.5 && angle < 67.5) {
        dx = 1;
        dy = -1;
    } else if (angle >= 67.5 && angle < 112.5) {
        dx = 0;
        dy = 1;
    } else if (angle >= 112.5 && angle < 157.5) {
        dx = 1;
        dy = 1;
    }

    let ahead = magnitude_at(i32(x) + dx, i32(y) + dy);
    let behind = magnitude_at(i32(x) - dx, i32(y) - dy);

    var class_value = 0.0;
    if (mag >= ahead && mag >= behind) {
        if (mag >= info.high) {
            class_value = 255.0;
        } else if (mag >= info.low) {
            class_value = 128.0;
        }
    }
    class_out[idx] = class_value;
}
"#;
