//! wgpu device setup, buffer plumbing, and the compute pass dispatch
//! helpers shared by the device pipeline stages.

use std::sync::mpsc;

use bytemuck::{bytes_of, cast_slice, Pod, Zeroable};
use image::RgbImage;
use shapeblur::algorithms::sigma_for_kernel;
use shapeblur::types::EdgeConfig;
use shapeblur::{Result, ShapeBlurError};
use wgpu::util::DeviceExt;

use crate::shaders::{GAUSSIAN_SHADER, NMS_SHADER, SOBEL_SHADER, UNPACK_SHADER};

const WORKGROUP_1D: u32 = 256;
const WORKGROUP_2D: u32 = 16;

/// Per-pass parameters, shared layout across all shaders.
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
struct PassInfo {
    width: u32,
    height: u32,
    kernel: u32,
    pad0: u32,
    low: f32,
    high: f32,
    pad1: f32,
    pad2: f32,
}

impl PassInfo {
    fn new(width: u32, height: u32, kernel: u32, low: f32, high: f32) -> Self {
        Self {
            width,
            height,
            kernel,
            pad0: 0,
            low,
            high,
            pad1: 0.0,
            pad2: 0.0,
        }
    }
}

/// Device-resident buffers for one uploaded region. Scoped strictly to
/// a single pipeline invocation; dropping releases the device memory on
/// every exit path.
pub(crate) struct DeviceRegion {
    pub width: u32,
    pub height: u32,
    planes: [wgpu::Buffer; 3],
    gray: wgpu::Buffer,
}

/// Handle to the GPU device and queue used by the device pipeline.
pub struct GpuContext {
    device: wgpu::Device,
    queue: wgpu::Queue,
}

impl GpuContext {
    /// Probe for an accelerator and open a device.
    ///
    /// # Errors
    ///
    /// Returns [`ShapeBlurError::DeviceUnavailable`] when no compatible
    /// adapter exists or the device request fails; callers fall back to
    /// the host pipeline.
    pub fn new() -> Result<Self> {
        pollster::block_on(Self::new_async())
    }

    async fn new_async() -> Result<Self> {
        let instance = wgpu::Instance::default();
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                force_fallback_adapter: false,
                compatible_surface: None,
            })
            .await
            .ok_or_else(|| {
                ShapeBlurError::DeviceUnavailable("no compatible GPU adapter found".into())
            })?;

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("shapeblur-device"),
                    required_features: wgpu::Features::empty(),
                    // the unpack pass binds five storage buffers, which
                    // exceeds the downlevel limit of four
                    required_limits: wgpu::Limits::default(),
                },
                None,
            )
            .await
            .map_err(|err| ShapeBlurError::DeviceUnavailable(err.to_string()))?;

        Ok(Self { device, queue })
    }

    /// Upload the region once, unpacking it into three channel planes
    /// and a luma plane on the device.
    pub(crate) fn upload_region(&self, region: &RgbImage) -> DeviceRegion {
        let (width, height) = (region.width(), region.height());
        let packed: Vec<u32> = region
            .pixels()
            .map(|p| {
                let [c0, c1, c2] = p.0;
                u32::from(c0) | (u32::from(c1) << 8) | (u32::from(c2) << 16) | (255 << 24)
            })
            .collect();

        let input = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("shapeblur-region-input"),
                contents: cast_slice(&packed),
                usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST,
            });

        let pixel_bytes = plane_bytes(width, height);
        let planes = [
            self.storage_buffer(pixel_bytes, "shapeblur-plane-0"),
            self.storage_buffer(pixel_bytes, "shapeblur-plane-1"),
            self.storage_buffer(pixel_bytes, "shapeblur-plane-2"),
        ];
        let gray = self.storage_buffer(pixel_bytes, "shapeblur-gray-plane");
        let info = self.info_buffer(PassInfo::new(width, height, 0, 0.0, 0.0));

        let unpack = self.build_pipeline(
            UNPACK_SHADER,
            "shapeblur-unpack",
            "unpack_main",
            &[
                read_entry(0),
                write_entry(1),
                write_entry(2),
                write_entry(3),
                write_entry(4),
                uniform_entry(5),
            ],
            &[&input, &planes[0], &planes[1], &planes[2], &gray, &info],
        );

        let mut encoder = self.encoder("shapeblur-upload-encoder");
        dispatch_1d(&mut encoder, &unpack, (width * height).div_ceil(WORKGROUP_1D));
        self.queue.submit(std::iter::once(encoder.finish()));

        DeviceRegion {
            width,
            height,
            planes,
            gray,
        }
    }

    /// Device edge detection: smooth the luma plane, Sobel gradient,
    /// then non-maximum suppression with double thresholding. Returns
    /// the classified map (0 / 128 weak / 255 strong) after one
    /// download.
    pub(crate) fn detect_edges(
        &self,
        region: &DeviceRegion,
        config: &EdgeConfig,
    ) -> Result<Vec<f32>> {
        let (width, height) = (region.width, region.height);
        let pixel_count = (width as usize) * (height as usize);
        let pixel_bytes = plane_bytes(width, height);

        let info = self.info_buffer(PassInfo::new(
            width,
            height,
            config.smooth_kernel,
            config.low_threshold,
            config.high_threshold,
        ));
        let weights = self.weights_buffer(config.smooth_kernel);

        let temp = self.storage_buffer(pixel_bytes, "shapeblur-smooth-temp");
        let smoothed = self.storage_buffer(pixel_bytes, "shapeblur-smoothed");
        let magnitude = self.storage_buffer(pixel_bytes, "shapeblur-magnitude");
        let direction = self.storage_buffer(pixel_bytes, "shapeblur-direction");
        let classes = self.storage_buffer(pixel_bytes, "shapeblur-edge-classes");
        let readback = self.readback_buffer(pixel_bytes, "shapeblur-edge-readback");

        let blur_layout = [read_entry(0), write_entry(1), read_entry(2), uniform_entry(3)];
        let horizontal = self.build_pipeline(
            GAUSSIAN_SHADER,
            "shapeblur-smooth-horizontal",
            "blur_horizontal",
            &blur_layout,
            &[&region.gray, &temp, &weights, &info],
        );
        let vertical = self.build_pipeline(
            GAUSSIAN_SHADER,
            "shapeblur-smooth-vertical",
            "blur_vertical",
            &blur_layout,
            &[&temp, &smoothed, &weights, &info],
        );
        let sobel = self.build_pipeline(
            SOBEL_SHADER,
            "shapeblur-sobel",
            "sobel_main",
            &[read_entry(0), write_entry(1), write_entry(2), uniform_entry(3)],
            &[&smoothed, &magnitude, &direction, &info],
        );
        let nms = self.build_pipeline(
            NMS_SHADER,
            "shapeblur-nms",
            "nms_main",
            &[read_entry(0), read_entry(1), write_entry(2), uniform_entry(3)],
            &[&magnitude, &direction, &classes, &info],
        );

        let mut encoder = self.encoder("shapeblur-edge-encoder");
        dispatch_2d(&mut encoder, &horizontal, width, height);
        dispatch_2d(&mut encoder, &vertical, width, height);
        dispatch_2d(&mut encoder, &sobel, width, height);
        dispatch_2d(&mut encoder, &nms, width, height);
        encoder.copy_buffer_to_buffer(&classes, 0, &readback, 0, pixel_bytes);
        self.queue.submit(std::iter::once(encoder.finish()));

        self.read_back(&readback, pixel_count)
    }

    /// Blur all three channel planes with the caller's kernel size and
    /// download them in one pass.
    pub(crate) fn blur_planes(
        &self,
        region: &DeviceRegion,
        kernel: u32,
    ) -> Result<[Vec<f32>; 3]> {
        let (width, height) = (region.width, region.height);
        let pixel_count = (width as usize) * (height as usize);
        let pixel_bytes = plane_bytes(width, height);

        let info = self.info_buffer(PassInfo::new(width, height, kernel, 0.0, 0.0));
        let weights = self.weights_buffer(kernel);
        let temp = self.storage_buffer(pixel_bytes, "shapeblur-blur-temp");
        let blur_layout = [read_entry(0), write_entry(1), read_entry(2), uniform_entry(3)];

        let mut outputs = Vec::with_capacity(3);
        let mut readbacks = Vec::with_capacity(3);
        let mut encoder = self.encoder("shapeblur-blur-encoder");
        for (i, plane) in region.planes.iter().enumerate() {
            let output = self.storage_buffer(pixel_bytes, "shapeblur-blurred-plane");
            let readback = self.readback_buffer(pixel_bytes, "shapeblur-blur-readback");

            let horizontal = self.build_pipeline(
                GAUSSIAN_SHADER,
                &format!("shapeblur-blur-horizontal-{i}"),
                "blur_horizontal",
                &blur_layout,
                &[plane, &temp, &weights, &info],
            );
            let vertical = self.build_pipeline(
                GAUSSIAN_SHADER,
                &format!("shapeblur-blur-vertical-{i}"),
                "blur_vertical",
                &blur_layout,
                &[&temp, &output, &weights, &info],
            );
            dispatch_2d(&mut encoder, &horizontal, width, height);
            dispatch_2d(&mut encoder, &vertical, width, height);
            encoder.copy_buffer_to_buffer(&output, 0, &readback, 0, pixel_bytes);

            outputs.push(output);
            readbacks.push(readback);
        }
        self.queue.submit(std::iter::once(encoder.finish()));

        Ok([
            self.read_back(&readbacks[0], pixel_count)?,
            self.read_back(&readbacks[1], pixel_count)?,
            self.read_back(&readbacks[2], pixel_count)?,
        ])
    }

    fn storage_buffer(&self, size: wgpu::BufferAddress, label: &str) -> wgpu::Buffer {
        self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(label),
            size,
            usage: wgpu::BufferUsages::STORAGE
                | wgpu::BufferUsages::COPY_SRC
                | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        })
    }

    fn readback_buffer(&self, size: wgpu::BufferAddress, label: &str) -> wgpu::Buffer {
        self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(label),
            size,
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        })
    }

    fn info_buffer(&self, info: PassInfo) -> wgpu::Buffer {
        self.device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("shapeblur-pass-info"),
                contents: bytes_of(&info),
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            })
    }

    fn weights_buffer(&self, kernel: u32) -> wgpu::Buffer {
        let weights = gaussian_weights(kernel);
        self.device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("shapeblur-kernel-weights"),
                contents: cast_slice(&weights),
                usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST,
            })
    }

    fn encoder(&self, label: &str) -> wgpu::CommandEncoder {
        self.device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor { label: Some(label) })
    }

    fn build_pipeline(
        &self,
        shader_source: &str,
        label: &str,
        entry_point: &str,
        layout_entries: &[wgpu::BindGroupLayoutEntry],
        buffers: &[&wgpu::Buffer],
    ) -> PassPipeline {
        let shader = self
            .device
            .create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some(label),
                source: wgpu::ShaderSource::Wgsl(shader_source.into()),
            });

        let layout = self
            .device
            .create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some(label),
                entries: layout_entries,
            });

        let pipeline_layout = self
            .device
            .create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some(label),
                bind_group_layouts: &[&layout],
                push_constant_ranges: &[],
            });

        let pipeline = self
            .device
            .create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
                label: Some(label),
                layout: Some(&pipeline_layout),
                module: &shader,
                entry_point,
            });

        let entries: Vec<_> = buffers
            .iter()
            .enumerate()
            .map(|(idx, buffer)| wgpu::BindGroupEntry {
                binding: idx as u32,
                resource: buffer.as_entire_binding(),
            })
            .collect();

        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(label),
            layout: &layout,
            entries: &entries,
        });

        PassPipeline {
            pipeline,
            bind_group,
        }
    }

    fn read_back(&self, buffer: &wgpu::Buffer, expected_len: usize) -> Result<Vec<f32>> {
        let slice = buffer.slice(..);
        let (sender, receiver) = mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = sender.send(result);
        });
        let _ = self.device.poll(wgpu::Maintain::Wait);
        match receiver.recv() {
            Ok(Ok(())) => {}
            Ok(Err(err)) => {
                return Err(ShapeBlurError::DeviceUnavailable(format!(
                    "device readback failed: {err}"
                )))
            }
            Err(err) => {
                return Err(ShapeBlurError::DeviceUnavailable(format!(
                    "device readback channel closed: {err}"
                )))
            }
        }

        let data = slice.get_mapped_range();
        let values: Vec<f32> = cast_slice(&data).to_vec();
        drop(data);
        buffer.unmap();

        if values.len() != expected_len {
            return Err(ShapeBlurError::DeviceUnavailable(format!(
                "unexpected readback length: got {}, expected {expected_len}",
                values.len()
            )));
        }
        Ok(values)
    }
}

struct PassPipeline {
    pipeline: wgpu::ComputePipeline,
    bind_group: wgpu::BindGroup,
}

fn plane_bytes(width: u32, height: u32) -> wgpu::BufferAddress {
    (width as usize * height as usize * std::mem::size_of::<f32>()) as wgpu::BufferAddress
}

/// Normalized 1D Gaussian weights with sigma derived from the kernel
/// size by the same rule the host blur uses.
fn gaussian_weights(kernel: u32) -> Vec<f32> {
    let sigma = sigma_for_kernel(kernel);
    let radius = (kernel / 2) as i32;
    let mut weights: Vec<f32> = (-radius..=radius)
        .map(|i| (-(i * i) as f32 / (2.0 * sigma * sigma)).exp())
        .collect();
    let sum: f32 = weights.iter().sum();
    for w in &mut weights {
        *w /= sum;
    }
    weights
}

fn read_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::COMPUTE,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Storage { read_only: true },
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

fn write_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::COMPUTE,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Storage { read_only: false },
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

fn uniform_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::COMPUTE,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

fn dispatch_1d(encoder: &mut wgpu::CommandEncoder, pass: &PassPipeline, workgroups: u32) {
    let mut compute = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
        label: Some("shapeblur-pass-1d"),
        timestamp_writes: None,
    });
    compute.set_pipeline(&pass.pipeline);
    compute.set_bind_group(0, &pass.bind_group, &[]);
    compute.dispatch_workgroups(workgroups.max(1), 1, 1);
}

fn dispatch_2d(encoder: &mut wgpu::CommandEncoder, pass: &PassPipeline, width: u32, height: u32) {
    let groups_x = width.div_ceil(WORKGROUP_2D);
    let groups_y = height.div_ceil(WORKGROUP_2D);
    let mut compute = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
        label: Some("shapeblur-pass-2d"),
        timestamp_writes: None,
    });
    compute.set_pipeline(&pass.pipeline);
    compute.set_bind_group(0, &pass.bind_group, &[]);
    compute.dispatch_workgroups(groups_x.max(1), groups_y.max(1), 1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gaussian_weights_are_normalized_and_symmetric() {
        let weights = gaussian_weights(15);
        assert_eq!(weights.len(), 15);
        let sum: f32 = weights.iter().sum();
        assert!((sum - 1.0).abs() < 1e-5);
        assert!((weights[0] - weights[14]).abs() < 1e-6);
        assert!(weights[7] > weights[0]);
    }

    #[test]
    fn single_tap_kernel_is_identity() {
        let weights = gaussian_weights(1);
        assert_eq!(weights.len(), 1);
        assert!((weights[0] - 1.0).abs() < 1e-6);
    }

    /// Drives every compute pass once so bind group layouts are checked
    /// against the real adapter's limits. Skips only when the machine
    /// has no adapter at all; a validation failure panics the test.
    #[test]
    fn all_passes_run_within_adapter_limits() {
        let context = match GpuContext::new() {
            Ok(context) => context,
            Err(err) => {
                eprintln!("skipping GPU test: {err}");
                return;
            }
        };

        let region = RgbImage::from_pixel(16, 16, image::Rgb([40, 80, 120]));
        let device_region = context.upload_region(&region);

        let classes = context
            .detect_edges(&device_region, &EdgeConfig::default())
            .unwrap();
        assert_eq!(classes.len(), 16 * 16);
        // flat region: nothing survives thresholding
        assert!(classes.iter().all(|&c| c == 0.0));

        let planes = context.blur_planes(&device_region, 5).unwrap();
        assert_eq!(planes[0].len(), 16 * 16);
        // uniform input blurs to itself
        assert!((planes[1][8 * 16 + 8] - 80.0).abs() < 0.5);
    }
}
