// SPDX-License-Identifier: GPL-3.0-only

//! GPU reducer
//!
//! Renders the luminance pass into a full-size target, runs the reduction
//! passes through the pyramid and reads the final buffer back synchronously.
//! Every target is `Rgba32Uint`: the carry pair is stored as integers so a
//! full-scale sum keeps its carry past 255.

use super::geometry::scissor_rect;
use super::plan::{ReductionPlan, StepSize};
use super::pyramid::{ReductionPyramid, TargetAllocator};
use super::reducer::{FrameReducer, ReducedFrame};
use super::types::{FrameInput, LuminanceModel};
use crate::constants::TARGET_BYTES_PER_TEXEL;
use crate::errors::SpectrumError;
use crate::gpu::wgpu;
use crate::shaders::{
    CachedDimensions, LUMINANCE_SHADER, REDUCTION_SHADER, aligned_bytes_per_row,
    read_buffer_async, strip_row_padding,
};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Format of every render target in the pipeline
pub const TARGET_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba32Uint;

/// Luminance pass uniforms
#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
struct LuminanceParams {
    cam_matrix: [f32; 16],
}

/// Reduction pass uniforms
#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
struct ReductionParams {
    source_size: [f32; 2],
    target_size: [f32; 2],
    axis: u32,
    _padding: [u32; 3],
}

/// Rendering context handed over by the owner of the camera stream
pub struct RenderSurfaceConfig {
    /// Analysis surface size
    pub width: u32,
    pub height: u32,
    pub device: Arc<wgpu::Device>,
    pub queue: Arc<wgpu::Queue>,
    /// Render target format; must be [`TARGET_FORMAT`]
    pub format: wgpu::TextureFormat,
    /// Camera texture (non-sRGB view) sampled by the luminance pass
    pub source: Arc<wgpu::TextureView>,
}

/// One render target and its view
pub struct RenderTarget {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub size: StepSize,
}

/// Allocates pyramid targets on a wgpu device
pub struct WgpuTargets {
    device: Arc<wgpu::Device>,
}

impl WgpuTargets {
    pub fn new(device: Arc<wgpu::Device>) -> Self {
        Self { device }
    }
}

impl TargetAllocator for WgpuTargets {
    type Target = RenderTarget;

    fn allocate(&mut self, size: StepSize, label: &str) -> Result<RenderTarget, SpectrumError> {
        let max = self.device.limits().max_texture_dimension_2d;
        if size.width == 0 || size.height == 0 || size.width > max || size.height > max {
            return Err(SpectrumError::InvalidDimensions {
                width: size.width,
                height: size.height,
            });
        }

        self.device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);
        self.device.push_error_scope(wgpu::ErrorFilter::Validation);

        let texture = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width: size.width,
                height: size.height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: TARGET_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT
                | wgpu::TextureUsages::TEXTURE_BINDING
                | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });

        let validation = pollster::block_on(self.device.pop_error_scope());
        let out_of_memory = pollster::block_on(self.device.pop_error_scope());
        if let Some(error) = validation.or(out_of_memory) {
            texture.destroy();
            return Err(SpectrumError::AllocationFailed {
                label: label.to_string(),
                reason: error.to_string(),
            });
        }

        debug!(label, width = size.width, height = size.height, "Render target allocated");

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Ok(RenderTarget {
            texture,
            view,
            size,
        })
    }

    fn destroy(&mut self, target: RenderTarget) {
        target.texture.destroy();
    }
}

/// Upload tightly packed RGBA8 pixels into a sampleable texture
pub fn upload_rgba_texture(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    rgba: &[u8],
    width: u32,
    height: u32,
) -> Result<wgpu::Texture, SpectrumError> {
    if width == 0 || height == 0 || rgba.len() != width as usize * height as usize * 4 {
        return Err(SpectrumError::InvalidDimensions { width, height });
    }

    let size = wgpu::Extent3d {
        width,
        height,
        depth_or_array_layers: 1,
    };
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("camera_frame_texture"),
        size,
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: wgpu::TextureFormat::Rgba8Unorm,
        usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        view_formats: &[],
    });

    queue.write_texture(
        wgpu::TexelCopyTextureInfo {
            texture: &texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        rgba,
        wgpu::TexelCopyBufferLayout {
            offset: 0,
            bytes_per_row: Some(width * 4),
            rows_per_image: Some(height),
        },
        size,
    );

    Ok(texture)
}

/// wgpu implementation of [`FrameReducer`]
pub struct GpuReducer {
    device: Arc<wgpu::Device>,
    queue: Arc<wgpu::Queue>,
    source: Arc<wgpu::TextureView>,
    width: u32,
    height: u32,
    model: LuminanceModel,
    luma_pipeline: wgpu::RenderPipeline,
    linear_pipeline: wgpu::RenderPipeline,
    luminance_layout: wgpu::BindGroupLayout,
    luminance_uniform: wgpu::Buffer,
    sampler: wgpu::Sampler,
    reduction_pipeline: wgpu::RenderPipeline,
    reduction_layout: wgpu::BindGroupLayout,
    // One uniform buffer per reduction step, sized with the pyramid
    reduction_uniforms: Vec<wgpu::Buffer>,
    pyramid: ReductionPyramid<WgpuTargets>,
    staging_buffer: Option<wgpu::Buffer>,
    staging_dims: CachedDimensions,
}

impl GpuReducer {
    pub fn new(config: RenderSurfaceConfig, model: LuminanceModel) -> Result<Self, SpectrumError> {
        if config.format != TARGET_FORMAT {
            return Err(SpectrumError::UnsupportedFormat(format!(
                "{:?} cannot hold the carry encoding, {:?} is required",
                config.format, TARGET_FORMAT
            )));
        }
        if config.width == 0 || config.height == 0 {
            return Err(SpectrumError::InvalidDimensions {
                width: config.width,
                height: config.height,
            });
        }

        info!(
            width = config.width,
            height = config.height,
            ?model,
            "Initializing GPU spectrum reducer"
        );

        let device = config.device;

        let luminance_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("luminance_shader"),
            source: wgpu::ShaderSource::Wgsl(LUMINANCE_SHADER.into()),
        });
        let reduction_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("reduction_shader"),
            source: wgpu::ShaderSource::Wgsl(REDUCTION_SHADER.into()),
        });

        let luminance_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("luminance_bind_group_layout"),
            entries: &[
                // Camera texture
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
                // Camera matrix, applied per vertex
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::VERTEX,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
            ],
        });

        let reduction_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("reduction_bind_group_layout"),
            entries: &[
                // Previous step, read with textureLoad
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Uint,
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
            ],
        });

        let luminance_pipeline_layout =
            device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("luminance_pipeline_layout"),
                bind_group_layouts: &[&luminance_layout],
                push_constant_ranges: &[],
            });
        let reduction_pipeline_layout =
            device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("reduction_pipeline_layout"),
                bind_group_layouts: &[&reduction_layout],
                push_constant_ranges: &[],
            });

        let luma_pipeline = create_pass_pipeline(
            &device,
            "luma_pipeline",
            &luminance_pipeline_layout,
            &luminance_shader,
            LuminanceModel::Luma.entry_point(),
        );
        let linear_pipeline = create_pass_pipeline(
            &device,
            "linear_luminance_pipeline",
            &luminance_pipeline_layout,
            &luminance_shader,
            LuminanceModel::Linear.entry_point(),
        );
        let reduction_pipeline = create_pass_pipeline(
            &device,
            "reduction_pipeline",
            &reduction_pipeline_layout,
            &reduction_shader,
            "fs_main",
        );

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("luminance_sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Nearest,
            min_filter: wgpu::FilterMode::Nearest,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        let luminance_uniform = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("luminance_uniform_buffer"),
            size: std::mem::size_of::<LuminanceParams>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let pyramid = ReductionPyramid::new(WgpuTargets::new(device.clone()));

        Ok(Self {
            device,
            queue: config.queue,
            source: config.source,
            width: config.width,
            height: config.height,
            model,
            luma_pipeline,
            linear_pipeline,
            luminance_layout,
            luminance_uniform,
            sampler,
            reduction_pipeline,
            reduction_layout,
            reduction_uniforms: Vec::new(),
            pyramid,
            staging_buffer: None,
            staging_dims: CachedDimensions::default(),
        })
    }

    pub fn set_model(&mut self, model: LuminanceModel) {
        self.model = model;
    }

    fn luminance_pipeline(&self) -> &wgpu::RenderPipeline {
        match self.model {
            LuminanceModel::Luma => &self.luma_pipeline,
            LuminanceModel::Linear => &self.linear_pipeline,
        }
    }

    fn ensure_staging_buffer(&mut self, size: StepSize) {
        if !self.staging_dims.needs_update(size.width, size.height) && self.staging_buffer.is_some()
        {
            return;
        }

        self.staging_buffer = Some(self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("spectrum_staging_buffer"),
            size: aligned_bytes_per_row(size.width, TARGET_BYTES_PER_TEXEL) as u64
                * size.height as u64,
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        }));
        self.staging_dims.update(size.width, size.height);
    }

    /// Run `f` inside a validation scope in debug builds and log what it catches
    fn validated<T>(&self, pass: &str, f: impl FnOnce() -> T) -> T {
        if !cfg!(debug_assertions) {
            return f();
        }

        self.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let result = f();
        if let Some(error) = pollster::block_on(self.device.pop_error_scope()) {
            warn!(pass, error = %error, "GPU validation error");
        }
        result
    }

    fn encode_luminance_pass(&self, encoder: &mut wgpu::CommandEncoder, frame: &FrameInput) {
        let Some(surface) = self.pyramid.surface() else {
            return;
        };

        let params = LuminanceParams {
            cam_matrix: frame.cam_matrix,
        };
        self.queue
            .write_buffer(&self.luminance_uniform, 0, bytemuck::bytes_of(&params));

        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("luminance_bind_group"),
            layout: &self.luminance_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&self.source),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&self.sampler),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: self.luminance_uniform.as_entire_binding(),
                },
            ],
        });

        let rect = scissor_rect(&frame.passepartout, self.width, self.height);

        let mut pass = begin_cleared_pass(encoder, "luminance_pass", &surface.view);
        if rect.is_empty() {
            return;
        }
        pass.set_pipeline(self.luminance_pipeline());
        pass.set_bind_group(0, &bind_group, &[]);
        pass.set_scissor_rect(rect.x, rect.y, rect.width, rect.height);
        pass.draw(0..4, 0..1);
    }

    fn encode_reduction_pass(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        plan: &ReductionPlan,
        index: usize,
    ) -> Result<(), SpectrumError> {
        let source = match index {
            0 => self.pyramid.surface(),
            _ => self.pyramid.step(index - 1),
        };
        let source = source.ok_or(SpectrumError::NotConfigured)?;
        let target = self.pyramid.step(index).ok_or(SpectrumError::NotConfigured)?;
        let uniform = self
            .reduction_uniforms
            .get(index)
            .ok_or(SpectrumError::NotConfigured)?;

        let params = ReductionParams {
            source_size: [source.size.width as f32, source.size.height as f32],
            target_size: [target.size.width as f32, target.size.height as f32],
            axis: plan.shader_axis(),
            _padding: [0; 3],
        };
        self.queue.write_buffer(uniform, 0, bytemuck::bytes_of(&params));

        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("reduction_bind_group"),
            layout: &self.reduction_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&source.view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: uniform.as_entire_binding(),
                },
            ],
        });

        let mut pass = begin_cleared_pass(encoder, "reduction_pass", &target.view);
        pass.set_pipeline(&self.reduction_pipeline);
        pass.set_bind_group(0, &bind_group, &[]);
        pass.draw(0..4, 0..1);
        Ok(())
    }
}

fn create_pass_pipeline(
    device: &wgpu::Device,
    label: &str,
    layout: &wgpu::PipelineLayout,
    shader: &wgpu::ShaderModule,
    fragment_entry: &str,
) -> wgpu::RenderPipeline {
    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(label),
        layout: Some(layout),
        vertex: wgpu::VertexState {
            module: shader,
            entry_point: Some("vs_main"),
            buffers: &[],
            compilation_options: Default::default(),
        },
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleStrip,
            ..Default::default()
        },
        depth_stencil: None,
        multisample: wgpu::MultisampleState {
            count: 1,
            mask: !0,
            alpha_to_coverage_enabled: false,
        },
        fragment: Some(wgpu::FragmentState {
            module: shader,
            entry_point: Some(fragment_entry),
            targets: &[Some(wgpu::ColorTargetState {
                format: TARGET_FORMAT,
                blend: None,
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: Default::default(),
        }),
        multiview: None,
        cache: None,
    })
}

fn begin_cleared_pass<'e>(
    encoder: &'e mut wgpu::CommandEncoder,
    label: &str,
    view: &wgpu::TextureView,
) -> wgpu::RenderPass<'e> {
    encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
        label: Some(label),
        color_attachments: &[Some(wgpu::RenderPassColorAttachment {
            view,
            depth_slice: None,
            resolve_target: None,
            ops: wgpu::Operations {
                load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                store: wgpu::StoreOp::Store,
            },
        })],
        depth_stencil_attachment: None,
        timestamp_writes: None,
        occlusion_query_set: None,
    })
}

impl FrameReducer for GpuReducer {
    fn surface_size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn configure(&mut self, plan: &ReductionPlan) -> Result<(), SpectrumError> {
        self.release();
        if plan.surface != StepSize::new(self.width, self.height) {
            return Err(SpectrumError::InvalidDimensions {
                width: plan.surface.width,
                height: plan.surface.height,
            });
        }

        self.pyramid.configure(plan)?;
        self.reduction_uniforms = (0..plan.step_count())
            .map(|_| {
                self.device.create_buffer(&wgpu::BufferDescriptor {
                    label: Some("reduction_uniform_buffer"),
                    size: std::mem::size_of::<ReductionParams>() as u64,
                    usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                    mapped_at_creation: false,
                })
            })
            .collect();
        self.ensure_staging_buffer(plan.final_step());

        info!(
            strategy = ?plan.strategy,
            dispersion = ?plan.dispersion,
            final_width = plan.final_step().width,
            final_height = plan.final_step().height,
            "GPU reducer configured"
        );
        Ok(())
    }

    fn reduce(
        &mut self,
        frame: &FrameInput,
        plan: &ReductionPlan,
    ) -> Result<ReducedFrame, SpectrumError> {
        if self.pyramid.plan() != Some(plan) {
            return Err(SpectrumError::NotConfigured);
        }

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("spectrum_encoder"),
            });

        self.validated("luminance", || {
            self.encode_luminance_pass(&mut encoder, frame)
        });
        for index in 0..plan.step_count() {
            self.validated("reduction", || {
                self.encode_reduction_pass(&mut encoder, plan, index)
            })?;
        }

        let size = plan.final_step();
        let last = self
            .pyramid
            .step(plan.step_count().saturating_sub(1))
            .ok_or(SpectrumError::NotConfigured)?;
        let staging = self
            .staging_buffer
            .as_ref()
            .ok_or(SpectrumError::NotConfigured)?;

        encoder.copy_texture_to_buffer(
            wgpu::TexelCopyTextureInfo {
                texture: &last.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::TexelCopyBufferInfo {
                buffer: staging,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(aligned_bytes_per_row(
                        size.width,
                        TARGET_BYTES_PER_TEXEL,
                    )),
                    rows_per_image: Some(size.height),
                },
            },
            wgpu::Extent3d {
                width: size.width,
                height: size.height,
                depth_or_array_layers: 1,
            },
        );

        self.validated("submit", || {
            self.queue.submit(std::iter::once(encoder.finish()));
        });

        let data = pollster::block_on(read_buffer_async(&self.device, staging))
            .map_err(SpectrumError::Readback)?;
        let packed = strip_row_padding(&data, size.width, size.height, TARGET_BYTES_PER_TEXEL);

        debug!(
            width = size.width,
            height = size.height,
            "GPU reduction complete"
        );

        Ok(ReducedFrame::from_rgba32(size.width, size.height, &packed))
    }

    fn release(&mut self) {
        self.pyramid.release();
        for buffer in self.reduction_uniforms.drain(..) {
            buffer.destroy();
        }
        if let Some(buffer) = self.staging_buffer.take() {
            buffer.destroy();
        }
        self.staging_dims = CachedDimensions::default();
    }
}
