use crate::bloom::{fullscreen_pass, linear_sampler, post_pipeline};
use crate::shaders;
use bytemuck::{Pod, Zeroable};

#[repr(C)]
#[derive(Copy, Clone, Pod, Zeroable)]
struct FinalUniforms {
    exposure: f32,
    bloom_mix: f32,
    _pad: [f32; 2],
}

/// Adds the bloom target onto the final scene, tone maps, writes the surface.
pub struct FinalComposite {
    pipeline: wgpu::RenderPipeline,
    layout: wgpu::BindGroupLayout,
    sampler: wgpu::Sampler,
    buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
}

impl FinalComposite {
    pub fn new(
        device: &wgpu::Device,
        surface_format: wgpu::TextureFormat,
        base: &wgpu::TextureView,
        bloom: &wgpu::TextureView,
    ) -> Self {
        let texture = |binding| wgpu::BindGroupLayoutEntry {
            binding,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Texture {
                sample_type: wgpu::TextureSampleType::Float { filterable: true },
                view_dimension: wgpu::TextureViewDimension::D2,
                multisampled: false,
            },
            count: None,
        };
        let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("final_composite_layout"),
            entries: &[
                texture(0),
                texture(1),
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 3,
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
        let pipeline = post_pipeline(
            device,
            "final_composite",
            shaders::final_composite(),
            &layout,
            surface_format,
            wgpu::BlendState::REPLACE,
        );
        let sampler = linear_sampler(device, "final_sampler");
        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("final_uniforms"),
            size: std::mem::size_of::<FinalUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let bind_group = Self::bind(device, &layout, &sampler, &buffer, base, bloom);
        Self {
            pipeline,
            layout,
            sampler,
            buffer,
            bind_group,
        }
    }

    fn bind(
        device: &wgpu::Device,
        layout: &wgpu::BindGroupLayout,
        sampler: &wgpu::Sampler,
        buffer: &wgpu::Buffer,
        base: &wgpu::TextureView,
        bloom: &wgpu::TextureView,
    ) -> wgpu::BindGroup {
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("final_composite_group"),
            layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(base),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(bloom),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::Sampler(sampler),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: buffer.as_entire_binding(),
                },
            ],
        })
    }

    /// Point at new targets after a resize.
    pub fn rebind(&mut self, device: &wgpu::Device, base: &wgpu::TextureView, bloom: &wgpu::TextureView) {
        self.bind_group = Self::bind(device, &self.layout, &self.sampler, &self.buffer, base, bloom);
    }

    /// `bloom_mix` is 0 when the bloom target was not rendered this frame.
    pub fn encode(
        &self,
        queue: &wgpu::Queue,
        encoder: &mut wgpu::CommandEncoder,
        exposure: f32,
        bloom_mix: f32,
        target: &wgpu::TextureView,
    ) {
        queue.write_buffer(
            &self.buffer,
            0,
            bytemuck::bytes_of(&FinalUniforms {
                exposure,
                bloom_mix,
                _pad: [0.0; 2],
            }),
        );
        fullscreen_pass(
            encoder,
            "final_composite",
            target,
            wgpu::LoadOp::Clear(wgpu::Color::BLACK),
            &self.pipeline,
            &self.bind_group,
        );
    }
}
