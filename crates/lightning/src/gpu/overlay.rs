use wgpu::naga::ShaderStage;
use wgpu::util::DeviceExt;

use super::program::{create_module, QUAD_ATTRIBUTES, QUAD_VERTICES};
use crate::overlay::OverlayImage;
use crate::shader::{self, ShaderError, OVERLAY_FRAGMENT_SHADER_GLSL, OVERLAY_VERTEX_SHADER_GLSL};

/// Coverage texture currently bound for drawing.
struct Uploaded {
    texture: wgpu::Texture,
    bind_group: wgpu::BindGroup,
    size: (u32, u32),
}

/// Alpha-blended pass that tints an [`OverlayImage`] over the whole swapchain.
pub(crate) struct OverlayProgram {
    pipeline: wgpu::RenderPipeline,
    bind_group_layout: wgpu::BindGroupLayout,
    quad: wgpu::Buffer,
    sampler: wgpu::Sampler,
    tint: wgpu::Buffer,
    uploaded: Option<Uploaded>,
}

impl OverlayProgram {
    pub(crate) fn new(
        device: &wgpu::Device,
        format: wgpu::TextureFormat,
    ) -> Result<Self, ShaderError> {
        shader::check_glsl(ShaderStage::Vertex, OVERLAY_VERTEX_SHADER_GLSL)?;
        shader::check_glsl(ShaderStage::Fragment, OVERLAY_FRAGMENT_SHADER_GLSL)?;

        device.push_error_scope(wgpu::ErrorFilter::Validation);
        let vertex_module = create_module(
            device,
            "overlay vertex",
            OVERLAY_VERTEX_SHADER_GLSL,
            ShaderStage::Vertex,
        );
        let fragment_module = create_module(
            device,
            "overlay fragment",
            OVERLAY_FRAGMENT_SHADER_GLSL,
            ShaderStage::Fragment,
        );
        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("overlay layout"),
            entries: &[
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
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
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
        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("overlay pipeline layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });
        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("overlay pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &vertex_module,
                entry_point: Some("main"),
                buffers: &[wgpu::VertexBufferLayout {
                    array_stride: std::mem::size_of::<[f32; 2]>() as wgpu::BufferAddress,
                    step_mode: wgpu::VertexStepMode::Vertex,
                    attributes: &QUAD_ATTRIBUTES,
                }],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            },
            primitive: wgpu::PrimitiveState::default(),
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            fragment: Some(wgpu::FragmentState {
                module: &fragment_module,
                entry_point: Some("main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format,
                    blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            }),
            multiview: None,
            cache: None,
        });
        if let Some(err) = pollster::block_on(device.pop_error_scope()) {
            return Err(ShaderError::Link(err.to_string()));
        }

        let quad = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("overlay quad"),
            contents: bytemuck::cast_slice(&QUAD_VERTICES),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let tint = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("overlay tint"),
            size: std::mem::size_of::<[f32; 4]>() as wgpu::BufferAddress,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("overlay sampler"),
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        Ok(Self {
            pipeline,
            bind_group_layout,
            quad,
            sampler,
            tint,
            uploaded: None,
        })
    }

    /// Uploads `image`, or drops the texture when there is none.
    pub(crate) fn upload(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        image: Option<&OverlayImage>,
    ) {
        let Some(image) = image else {
            if let Some(previous) = self.uploaded.take() {
                previous.texture.destroy();
            }
            return;
        };

        let (width, height) = image.size();
        if self.uploaded.as_ref().map(|uploaded| uploaded.size) != Some((width, height)) {
            if let Some(previous) = self.uploaded.take() {
                previous.texture.destroy();
            }
            self.uploaded = Some(self.create_texture(device, width, height));
            tracing::debug!(width, height, "allocated overlay texture");
        }
        let Some(uploaded) = self.uploaded.as_ref() else {
            return;
        };

        queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &uploaded.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            image.coverage(),
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(width),
                rows_per_image: Some(height),
            },
            extent(width, height),
        );
        let [red, green, blue] = image.color();
        queue.write_buffer(&self.tint, 0, bytemuck::cast_slice(&[red, green, blue, 1.0]));
    }

    fn create_texture(&self, device: &wgpu::Device, width: u32, height: u32) -> Uploaded {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("overlay coverage"),
            size: extent(width, height),
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::R8Unorm,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("overlay bind group"),
            layout: &self.bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&self.sampler),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: self.tint.as_entire_binding(),
                },
            ],
        });
        Uploaded {
            texture,
            bind_group,
            size: (width, height),
        }
    }

    /// Blends the uploaded coverage over `view`, stretched across `size`. Does nothing
    /// until something has been uploaded.
    pub(crate) fn encode(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        view: &wgpu::TextureView,
        size: (u32, u32),
    ) {
        let Some(uploaded) = self.uploaded.as_ref() else {
            return;
        };
        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("overlay pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view,
                depth_slice: None,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Load,
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: None,
            occlusion_query_set: None,
            timestamp_writes: None,
        });
        pass.set_viewport(0.0, 0.0, size.0 as f32, size.1 as f32, 0.0, 1.0);
        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, &uploaded.bind_group, &[]);
        pass.set_vertex_buffer(0, self.quad.slice(..));
        pass.draw(0..QUAD_VERTICES.len() as u32, 0..1);
    }
}

impl Drop for OverlayProgram {
    fn drop(&mut self) {
        if let Some(uploaded) = self.uploaded.take() {
            uploaded.texture.destroy();
        }
        self.quad.destroy();
        self.tint.destroy();
    }
}

fn extent(width: u32, height: u32) -> wgpu::Extent3d {
    wgpu::Extent3d {
        width,
        height,
        depth_or_array_layers: 1,
    }
}
