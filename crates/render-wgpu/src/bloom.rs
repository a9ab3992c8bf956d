//! Five-level gaussian bloom: high pass, separable blur per mip, weighted
//! recombination added back onto the source target.

use crate::shaders;
use crate::targets::{HDR_FORMAT, color_texture};
use bloomwater_common::Viewport;
use bloomwater_compositor::BloomSettings;
use bytemuck::{Pod, Zeroable};
use wgpu::util::DeviceExt;

pub const MIP_COUNT: usize = 5;
pub const KERNEL_RADII: [u32; MIP_COUNT] = [3, 5, 7, 9, 11];
pub const BLOOM_FACTORS: [f32; MIP_COUNT] = [1.0, 0.8, 0.6, 0.4, 0.2];
const SMOOTH_WIDTH: f32 = 0.01;

/// Sizes of the blur chain: half the viewport, then halved per level.
pub fn mip_sizes(viewport: Viewport) -> [Viewport; MIP_COUNT] {
    let half = Viewport::new(
        (viewport.width as f32 / 2.0).round() as u32,
        (viewport.height as f32 / 2.0).round() as u32,
    );
    std::array::from_fn(|i| Viewport::new(half.width >> i, half.height >> i))
}

#[repr(C)]
#[derive(Copy, Clone, Pod, Zeroable)]
struct HighPassUniforms {
    threshold: f32,
    smooth_width: f32,
    _pad: [f32; 2],
}

#[repr(C)]
#[derive(Copy, Clone, Pod, Zeroable)]
struct BlurUniforms {
    inv_size: [f32; 2],
    direction: [f32; 2],
    kernel_radius: f32,
    _pad0: f32,
    _pad1: [f32; 2],
}

#[repr(C)]
#[derive(Copy, Clone, Pod, Zeroable)]
struct CompositeUniforms {
    factors0: [f32; 4],
    factors1: [f32; 4],
    strength: f32,
    radius: f32,
    _pad: [f32; 2],
}

/// Resources that depend on the viewport size.
struct ChainTargets {
    sizes: [Viewport; MIP_COUNT],
    bright: wgpu::TextureView,
    horizontal: Vec<wgpu::TextureView>,
    vertical: Vec<wgpu::TextureView>,
    high_pass_group: wgpu::BindGroup,
    /// (horizontal, vertical) per mip.
    blur_groups: Vec<(wgpu::BindGroup, wgpu::BindGroup)>,
    composite_group: wgpu::BindGroup,
}

pub struct BloomChain {
    high_pass_pipeline: wgpu::RenderPipeline,
    blur_pipeline: wgpu::RenderPipeline,
    composite_pipeline: wgpu::RenderPipeline,
    sampled_layout: wgpu::BindGroupLayout,
    composite_layout: wgpu::BindGroupLayout,
    sampler: wgpu::Sampler,
    high_pass_buffer: wgpu::Buffer,
    composite_buffer: wgpu::Buffer,
    targets: ChainTargets,
}

fn texture_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Texture {
            sample_type: wgpu::TextureSampleType::Float { filterable: true },
            view_dimension: wgpu::TextureViewDimension::D2,
            multisampled: false,
        },
        count: None,
    }
}

fn sampler_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
        count: None,
    }
}

fn uniform_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

pub(crate) fn linear_sampler(device: &wgpu::Device, label: &str) -> wgpu::Sampler {
    device.create_sampler(&wgpu::SamplerDescriptor {
        label: Some(label),
        address_mode_u: wgpu::AddressMode::ClampToEdge,
        address_mode_v: wgpu::AddressMode::ClampToEdge,
        mag_filter: wgpu::FilterMode::Linear,
        min_filter: wgpu::FilterMode::Linear,
        ..Default::default()
    })
}

/// Fullscreen pipeline with a single colour target.
pub(crate) fn post_pipeline(
    device: &wgpu::Device,
    label: &str,
    source: String,
    layout: &wgpu::BindGroupLayout,
    format: wgpu::TextureFormat,
    blend: wgpu::BlendState,
) -> wgpu::RenderPipeline {
    let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(label),
        source: wgpu::ShaderSource::Wgsl(source.into()),
    });
    let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some(label),
        bind_group_layouts: &[layout],
        push_constant_ranges: &[],
    });
    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(label),
        layout: Some(&pipeline_layout),
        vertex: wgpu::VertexState {
            module: &module,
            entry_point: Some("vs_fullscreen"),
            compilation_options: Default::default(),
            buffers: &[],
        },
        fragment: Some(wgpu::FragmentState {
            module: &module,
            entry_point: Some("fs_main"),
            compilation_options: Default::default(),
            targets: &[Some(wgpu::ColorTargetState {
                format,
                blend: Some(blend),
                write_mask: wgpu::ColorWrites::ALL,
            })],
        }),
        primitive: Default::default(),
        depth_stencil: None,
        multisample: Default::default(),
        multiview: None,
        cache: None,
    })
}

/// Run one fullscreen draw into `view`.
pub(crate) fn fullscreen_pass(
    encoder: &mut wgpu::CommandEncoder,
    label: &str,
    view: &wgpu::TextureView,
    load: wgpu::LoadOp<wgpu::Color>,
    pipeline: &wgpu::RenderPipeline,
    bind_group: &wgpu::BindGroup,
) {
    let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
        label: Some(label),
        color_attachments: &[Some(wgpu::RenderPassColorAttachment {
            view,
            resolve_target: None,
            ops: wgpu::Operations {
                load,
                store: wgpu::StoreOp::Store,
            },
        })],
        ..Default::default()
    });
    pass.set_pipeline(pipeline);
    pass.set_bind_group(0, bind_group, &[]);
    pass.draw(0..3, 0..1);
}

const ADDITIVE: wgpu::BlendState = wgpu::BlendState {
    color: wgpu::BlendComponent {
        src_factor: wgpu::BlendFactor::One,
        dst_factor: wgpu::BlendFactor::One,
        operation: wgpu::BlendOperation::Add,
    },
    alpha: wgpu::BlendComponent {
        src_factor: wgpu::BlendFactor::One,
        dst_factor: wgpu::BlendFactor::One,
        operation: wgpu::BlendOperation::Add,
    },
};

impl BloomChain {
    pub fn new(device: &wgpu::Device, source: &wgpu::TextureView, viewport: Viewport) -> Self {
        let sampled_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("bloom_sampled_layout"),
            entries: &[texture_entry(0), sampler_entry(1), uniform_entry(2)],
        });
        let mut composite_entries: Vec<_> = (0..MIP_COUNT as u32).map(texture_entry).collect();
        composite_entries.push(sampler_entry(5));
        composite_entries.push(uniform_entry(6));
        let composite_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("bloom_composite_layout"),
            entries: &composite_entries,
        });

        let high_pass_pipeline = post_pipeline(
            device,
            "bloom_high_pass",
            shaders::high_pass(),
            &sampled_layout,
            HDR_FORMAT,
            wgpu::BlendState::REPLACE,
        );
        let blur_pipeline = post_pipeline(
            device,
            "bloom_blur",
            shaders::blur(),
            &sampled_layout,
            HDR_FORMAT,
            wgpu::BlendState::REPLACE,
        );
        let composite_pipeline = post_pipeline(
            device,
            "bloom_composite",
            shaders::bloom_composite(),
            &composite_layout,
            HDR_FORMAT,
            ADDITIVE,
        );

        let high_pass_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("bloom_high_pass_uniforms"),
            size: std::mem::size_of::<HighPassUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let composite_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("bloom_composite_uniforms"),
            size: std::mem::size_of::<CompositeUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let sampler = linear_sampler(device, "bloom_sampler");

        let targets = Self::create_targets(
            device,
            &sampled_layout,
            &composite_layout,
            &sampler,
            &high_pass_buffer,
            &composite_buffer,
            source,
            viewport,
        );

        Self {
            high_pass_pipeline,
            blur_pipeline,
            composite_pipeline,
            sampled_layout,
            composite_layout,
            sampler,
            high_pass_buffer,
            composite_buffer,
            targets,
        }
    }

    pub fn resize(&mut self, device: &wgpu::Device, source: &wgpu::TextureView, viewport: Viewport) {
        self.targets = Self::create_targets(
            device,
            &self.sampled_layout,
            &self.composite_layout,
            &self.sampler,
            &self.high_pass_buffer,
            &self.composite_buffer,
            source,
            viewport,
        );
    }

    pub fn mip_sizes(&self) -> [Viewport; MIP_COUNT] {
        self.targets.sizes
    }

    #[allow(clippy::too_many_arguments)]
    fn create_targets(
        device: &wgpu::Device,
        sampled_layout: &wgpu::BindGroupLayout,
        composite_layout: &wgpu::BindGroupLayout,
        sampler: &wgpu::Sampler,
        high_pass_buffer: &wgpu::Buffer,
        composite_buffer: &wgpu::Buffer,
        source: &wgpu::TextureView,
        viewport: Viewport,
    ) -> ChainTargets {
        let sizes = mip_sizes(viewport);
        let bright = color_texture(device, "bloom_bright", sizes[0]);
        let horizontal: Vec<_> = sizes
            .iter()
            .enumerate()
            .map(|(i, size)| color_texture(device, &format!("bloom_h{i}"), *size))
            .collect();
        let vertical: Vec<_> = sizes
            .iter()
            .enumerate()
            .map(|(i, size)| color_texture(device, &format!("bloom_v{i}"), *size))
            .collect();

        let sampled_group = |label: &str, view: &wgpu::TextureView, buffer: &wgpu::Buffer| {
            device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some(label),
                layout: sampled_layout,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: wgpu::BindingResource::TextureView(view),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: wgpu::BindingResource::Sampler(sampler),
                    },
                    wgpu::BindGroupEntry {
                        binding: 2,
                        resource: buffer.as_entire_binding(),
                    },
                ],
            })
        };

        let high_pass_group = sampled_group("bloom_high_pass_group", source, high_pass_buffer);

        let mut blur_groups = Vec::with_capacity(MIP_COUNT);
        for (i, size) in sizes.iter().enumerate() {
            let inv_size = [1.0 / size.width as f32, 1.0 / size.height as f32];
            let uniforms = |direction: [f32; 2]| BlurUniforms {
                inv_size,
                direction,
                kernel_radius: KERNEL_RADII[i] as f32,
                _pad0: 0.0,
                _pad1: [0.0; 2],
            };
            let h_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(&format!("bloom_blur_h{i}")),
                contents: bytemuck::bytes_of(&uniforms([1.0, 0.0])),
                usage: wgpu::BufferUsages::UNIFORM,
            });
            let v_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(&format!("bloom_blur_v{i}")),
                contents: bytemuck::bytes_of(&uniforms([0.0, 1.0])),
                usage: wgpu::BufferUsages::UNIFORM,
            });
            let input = if i == 0 { &bright } else { &vertical[i - 1] };
            blur_groups.push((
                sampled_group(&format!("bloom_blur_h{i}_group"), input, &h_buffer),
                sampled_group(&format!("bloom_blur_v{i}_group"), &horizontal[i], &v_buffer),
            ));
        }

        let mut composite_entries: Vec<_> = vertical
            .iter()
            .enumerate()
            .map(|(i, view)| wgpu::BindGroupEntry {
                binding: i as u32,
                resource: wgpu::BindingResource::TextureView(view),
            })
            .collect();
        composite_entries.push(wgpu::BindGroupEntry {
            binding: 5,
            resource: wgpu::BindingResource::Sampler(sampler),
        });
        composite_entries.push(wgpu::BindGroupEntry {
            binding: 6,
            resource: composite_buffer.as_entire_binding(),
        });
        let composite_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("bloom_composite_group"),
            layout: composite_layout,
            entries: &composite_entries,
        });

        ChainTargets {
            sizes,
            bright,
            horizontal,
            vertical,
            high_pass_group,
            blur_groups,
            composite_group,
        }
    }

    /// Filter the source target and add the glow back onto `output`.
    ///
    /// `output` must be the view this chain was built with.
    pub fn encode(
        &self,
        queue: &wgpu::Queue,
        encoder: &mut wgpu::CommandEncoder,
        settings: &BloomSettings,
        output: &wgpu::TextureView,
    ) {
        queue.write_buffer(
            &self.high_pass_buffer,
            0,
            bytemuck::bytes_of(&HighPassUniforms {
                threshold: settings.threshold,
                smooth_width: SMOOTH_WIDTH,
                _pad: [0.0; 2],
            }),
        );
        let f = BLOOM_FACTORS;
        queue.write_buffer(
            &self.composite_buffer,
            0,
            bytemuck::bytes_of(&CompositeUniforms {
                factors0: [f[0], f[1], f[2], f[3]],
                factors1: [f[4], 0.0, 0.0, 0.0],
                strength: settings.strength,
                radius: settings.radius,
                _pad: [0.0; 2],
            }),
        );

        let t = &self.targets;
        let clear = wgpu::LoadOp::Clear(wgpu::Color::BLACK);
        fullscreen_pass(
            encoder,
            "bloom_high_pass",
            &t.bright,
            clear,
            &self.high_pass_pipeline,
            &t.high_pass_group,
        );
        for (i, (h_group, v_group)) in t.blur_groups.iter().enumerate() {
            fullscreen_pass(
                encoder,
                "bloom_blur_h",
                &t.horizontal[i],
                clear,
                &self.blur_pipeline,
                h_group,
            );
            fullscreen_pass(
                encoder,
                "bloom_blur_v",
                &t.vertical[i],
                clear,
                &self.blur_pipeline,
                v_group,
            );
        }
        fullscreen_pass(
            encoder,
            "bloom_composite",
            output,
            wgpu::LoadOp::Load,
            &self.composite_pipeline,
            &t.composite_group,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mip_chain_halves_from_half_resolution() {
        let sizes = mip_sizes(Viewport::new(1280, 720));
        assert_eq!(sizes[0], Viewport::new(640, 360));
        assert_eq!(sizes[1], Viewport::new(320, 180));
        assert_eq!(sizes[4], Viewport::new(40, 22));
    }

    #[test]
    fn tiny_viewport_mips_never_zero() {
        for size in mip_sizes(Viewport::new(3, 1)) {
            assert!(size.width >= 1 && size.height >= 1);
        }
    }

    #[test]
    fn wider_kernels_weigh_less() {
        assert!(KERNEL_RADII.windows(2).all(|w| w[0] < w[1]));
        assert!(BLOOM_FACTORS.windows(2).all(|w| w[0] > w[1]));
    }

    #[test]
    fn uniform_sizes_are_16_byte_multiples() {
        assert_eq!(std::mem::size_of::<HighPassUniforms>(), 16);
        assert_eq!(std::mem::size_of::<BlurUniforms>(), 32);
        assert_eq!(std::mem::size_of::<CompositeUniforms>(), 48);
    }
}
