use std::borrow::Cow;

use wgpu::naga::ShaderStage;
use wgpu::util::DeviceExt;

use crate::shader::{self, ShaderError, FRAGMENT_SHADER_GLSL, UNIFORM_BLOCK, VERTEX_SHADER_GLSL};
use crate::surface::Viewport;
use crate::uniforms::{LightningUniforms, UniformLayout};

/// Two triangles covering clip space.
pub(super) const QUAD_VERTICES: [[f32; 2]; 6] = [
    [-1.0, -1.0],
    [1.0, -1.0],
    [-1.0, 1.0],
    [-1.0, 1.0],
    [1.0, -1.0],
    [1.0, 1.0],
];

pub(super) const QUAD_ATTRIBUTES: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![0 => Float32x2];

/// Compiled lightning program plus the buffers it draws with.
///
/// Dropping the program destroys its buffers; modules, layouts and the pipeline are
/// released with their last handle.
pub(crate) struct ShaderProgram {
    pipeline: wgpu::RenderPipeline,
    quad: wgpu::Buffer,
    uniform_buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
    layout: UniformLayout,
    staging: Vec<u8>,
}

impl ShaderProgram {
    pub(crate) fn new(
        device: &wgpu::Device,
        format: wgpu::TextureFormat,
    ) -> Result<Self, ShaderError> {
        shader::check_glsl(ShaderStage::Vertex, VERTEX_SHADER_GLSL)?;
        let fragment_ir = shader::check_glsl(ShaderStage::Fragment, FRAGMENT_SHADER_GLSL)?;
        let layout = UniformLayout::reflect(&fragment_ir, UNIFORM_BLOCK).unwrap_or_else(|| {
            tracing::warn!("lightning shader declares no uniform block; uniforms are skipped");
            UniformLayout::empty()
        });
        let missing: Vec<&str> = crate::uniforms::UniformField::ALL
            .into_iter()
            .filter(|field| layout.offset(*field).is_none())
            .map(|field| field.member_name())
            .collect();
        if !missing.is_empty() {
            tracing::debug!(?missing, "uniforms absent from compiled program");
        }

        device.push_error_scope(wgpu::ErrorFilter::Validation);
        let vertex_module = create_module(device, "lightning vertex", VERTEX_SHADER_GLSL, ShaderStage::Vertex);
        let fragment_module =
            create_module(device, "lightning fragment", FRAGMENT_SHADER_GLSL, ShaderStage::Fragment);
        if let Some(err) = pollster::block_on(device.pop_error_scope()) {
            return Err(ShaderError::Compile {
                stage: "program",
                diagnostic: err.to_string(),
            });
        }

        device.push_error_scope(wgpu::ErrorFilter::Validation);
        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("lightning uniform layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });
        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("lightning pipeline layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });
        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("lightning pipeline"),
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
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None,
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            fragment: Some(wgpu::FragmentState {
                module: &fragment_module,
                entry_point: Some("main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format,
                    blend: Some(wgpu::BlendState::REPLACE),
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
            label: Some("lightning quad"),
            contents: bytemuck::cast_slice(&QUAD_VERTICES),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let buffer_size = layout.buffer_size();
        let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("lightning uniforms"),
            size: buffer_size,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("lightning uniform bind group"),
            layout: &bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
        });

        Ok(Self {
            pipeline,
            quad,
            uniform_buffer,
            bind_group,
            layout,
            staging: vec![0; buffer_size as usize],
        })
    }

    pub(crate) fn layout(&self) -> &UniformLayout {
        &self.layout
    }

    /// Stages every present uniform and queues the upload.
    pub(crate) fn write_uniforms(&mut self, queue: &wgpu::Queue, values: &LightningUniforms) {
        self.layout.write(values, &mut self.staging);
        queue.write_buffer(&self.uniform_buffer, 0, &self.staging);
    }

    /// Clears `view` and draws the quad once into `viewport`.
    pub(crate) fn encode(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        view: &wgpu::TextureView,
        viewport: Viewport,
    ) {
        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("lightning pass"),
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
            occlusion_query_set: None,
            timestamp_writes: None,
        });
        pass.set_viewport(
            0.0,
            0.0,
            viewport.width as f32,
            viewport.height as f32,
            0.0,
            1.0,
        );
        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, &self.bind_group, &[]);
        pass.set_vertex_buffer(0, self.quad.slice(..));
        pass.draw(0..QUAD_VERTICES.len() as u32, 0..1);
    }
}

impl Drop for ShaderProgram {
    fn drop(&mut self) {
        self.quad.destroy();
        self.uniform_buffer.destroy();
        tracing::trace!("released lightning program buffers");
    }
}

pub(super) fn create_module(
    device: &wgpu::Device,
    label: &str,
    source: &'static str,
    stage: ShaderStage,
) -> wgpu::ShaderModule {
    device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(label),
        source: wgpu::ShaderSource::Glsl {
            shader: Cow::Borrowed(source),
            stage,
            defines: &[],
        },
    })
}
