use crate::mesh::{MeshData, Vertex};
use crate::shaders;
use crate::targets::{DEPTH_FORMAT, HDR_FORMAT, SceneTarget};
use bloomwater_common::ObjectId;
use bloomwater_compositor::FrameSettings;
use bloomwater_scene::{Light, Material, RenderKind, Renderable, Scene};
use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3, Vec4};
use std::collections::HashMap;
use wgpu::util::DeviceExt;

const MODE_STANDARD: f32 = 0.0;
const MODE_NORMAL: f32 = 1.0;
const MODE_BASIC: f32 = 2.0;

#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub(crate) struct Globals {
    view_proj: [[f32; 4]; 4],
    camera: [f32; 4],
    ambient: [f32; 4],
    light0_dir: [f32; 4],
    light0_color: [f32; 4],
    light1_dir: [f32; 4],
    light1_color: [f32; 4],
}

impl Globals {
    /// Ambient lights are summed; the first two directional lights are kept.
    pub(crate) fn new(scene: &Scene, settings: &FrameSettings) -> Self {
        let mut ambient = Vec3::ZERO;
        let mut directional = Vec::with_capacity(2);
        for light in scene.lights() {
            match *light {
                Light::Ambient { color, intensity } => ambient += color * intensity,
                Light::Directional {
                    color,
                    intensity,
                    position,
                } => {
                    if directional.len() < 2 {
                        directional.push((
                            position.normalize_or(Vec3::Y).extend(1.0),
                            (color * intensity).extend(1.0),
                        ));
                    } else {
                        tracing::trace!("ignoring directional light beyond the second");
                    }
                }
            }
        }
        let slot = |i: usize| directional.get(i).copied().unwrap_or((Vec4::ZERO, Vec4::ZERO));
        let (light0_dir, light0_color) = slot(0);
        let (light1_dir, light1_color) = slot(1);

        Self {
            view_proj: settings.view_proj.to_cols_array_2d(),
            camera: settings.camera_position.extend(settings.time).to_array(),
            ambient: ambient.extend(1.0).to_array(),
            light0_dir: light0_dir.to_array(),
            light0_color: light0_color.to_array(),
            light1_dir: light1_dir.to_array(),
            light1_color: light1_color.to_array(),
        }
    }
}

#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub(crate) struct ObjectUniforms {
    model: [[f32; 4]; 4],
    normal_matrix: [[f32; 4]; 4],
    color: [f32; 4],
    emissive: [f32; 4],
    surface: [f32; 4],
    flow: [f32; 4],
    config: [f32; 4],
}

impl ObjectUniforms {
    pub(crate) fn new(object: &Renderable) -> Self {
        let model = object.transform.matrix();
        let normal_matrix = if model.determinant().abs() > f32::EPSILON {
            model.inverse().transpose()
        } else {
            Mat4::IDENTITY
        };
        let mut uniforms = Self {
            model: model.to_cols_array_2d(),
            normal_matrix: normal_matrix.to_cols_array_2d(),
            ..Zeroable::zeroed()
        };
        match &object.material {
            Material::Standard {
                color,
                roughness,
                metalness,
                emissive,
            } => {
                uniforms.color = color.extend(1.0).to_array();
                uniforms.emissive = emissive.extend(MODE_STANDARD).to_array();
                uniforms.surface = [*roughness, *metalness, 0.0, 0.0];
            }
            Material::Normal => {
                uniforms.emissive = [0.0, 0.0, 0.0, MODE_NORMAL];
            }
            Material::Basic { color } => {
                uniforms.color = color.extend(1.0).to_array();
                uniforms.emissive = Vec3::ZERO.extend(MODE_BASIC).to_array();
            }
            Material::Water(water) => {
                uniforms.color = water.color.extend(1.0).to_array();
                uniforms.flow = water.flow_direction().extend(0.0).extend(0.0).to_array();
                uniforms.config = water.config().to_array();
            }
        }
        uniforms
    }
}

/// GPU copy of one renderable. Geometry is uploaded once; uniforms every pass.
struct GpuObject {
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    index_count: u32,
    uniform_buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
    kind: RenderKind,
}

/// Draws the scene into a [`SceneTarget`].
pub struct ScenePass {
    mesh_pipeline: wgpu::RenderPipeline,
    water_pipeline: wgpu::RenderPipeline,
    globals_buffer: wgpu::Buffer,
    globals_bind_group: wgpu::BindGroup,
    object_layout: wgpu::BindGroupLayout,
    objects: HashMap<ObjectId, GpuObject>,
}

fn uniform_layout(device: &wgpu::Device, label: &str) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some(label),
        entries: &[wgpu::BindGroupLayoutEntry {
            binding: 0,
            visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        }],
    })
}

impl ScenePass {
    pub fn new(device: &wgpu::Device) -> Self {
        let globals_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("scene_globals"),
            size: std::mem::size_of::<Globals>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let globals_layout = uniform_layout(device, "scene_globals_layout");
        let object_layout = uniform_layout(device, "scene_object_layout");
        let globals_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("scene_globals_bind_group"),
            layout: &globals_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: globals_buffer.as_entire_binding(),
            }],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("scene_pipeline_layout"),
            bind_group_layouts: &[&globals_layout, &object_layout],
            push_constant_ranges: &[],
        });
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("scene_shader"),
            source: wgpu::ShaderSource::Wgsl(shaders::SCENE_SHADER.into()),
        });

        let pipeline = |label: &str, fragment: &str, cull_mode: Option<wgpu::Face>| {
            device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some(label),
                layout: Some(&pipeline_layout),
                vertex: wgpu::VertexState {
                    module: &shader,
                    entry_point: Some("vs_main"),
                    compilation_options: Default::default(),
                    buffers: &[Vertex::LAYOUT],
                },
                fragment: Some(wgpu::FragmentState {
                    module: &shader,
                    entry_point: Some(fragment),
                    compilation_options: Default::default(),
                    targets: &[Some(wgpu::ColorTargetState {
                        format: HDR_FORMAT,
                        blend: Some(wgpu::BlendState::REPLACE),
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                }),
                primitive: wgpu::PrimitiveState {
                    topology: wgpu::PrimitiveTopology::TriangleList,
                    cull_mode,
                    ..Default::default()
                },
                depth_stencil: Some(wgpu::DepthStencilState {
                    format: DEPTH_FORMAT,
                    depth_write_enabled: true,
                    depth_compare: wgpu::CompareFunction::Less,
                    stencil: Default::default(),
                    bias: Default::default(),
                }),
                multisample: Default::default(),
                multiview: None,
                cache: None,
            })
        };
        let mesh_pipeline = pipeline("mesh_pipeline", "fs_mesh", Some(wgpu::Face::Back));
        // Visible from below as well.
        let water_pipeline = pipeline("water_pipeline", "fs_water", None);

        Self {
            mesh_pipeline,
            water_pipeline,
            globals_buffer,
            globals_bind_group,
            object_layout,
            objects: HashMap::new(),
        }
    }

    /// Upload geometry for new objects and drop buffers of removed ones.
    fn sync(&mut self, device: &wgpu::Device, scene: &Scene) {
        self.objects.retain(|id, _| scene.get(*id).is_some());
        for (id, object) in scene.objects() {
            if self.objects.contains_key(id) {
                continue;
            }
            let mesh = MeshData::from_geometry(&object.geometry);
            tracing::debug!(
                name = %object.name,
                vertices = mesh.vertices.len(),
                triangles = mesh.triangle_count(),
                "uploading mesh"
            );
            let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(&format!("{}_vertices", object.name)),
                contents: bytemuck::cast_slice(&mesh.vertices),
                usage: wgpu::BufferUsages::VERTEX,
            });
            let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(&format!("{}_indices", object.name)),
                contents: bytemuck::cast_slice(&mesh.indices),
                usage: wgpu::BufferUsages::INDEX,
            });
            let uniform_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(&format!("{}_uniforms", object.name)),
                contents: bytemuck::bytes_of(&ObjectUniforms::new(object)),
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            });
            let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some(&format!("{}_bind_group", object.name)),
                layout: &self.object_layout,
                entries: &[wgpu::BindGroupEntry {
                    binding: 0,
                    resource: uniform_buffer.as_entire_binding(),
                }],
            });
            self.objects.insert(
                *id,
                GpuObject {
                    vertex_buffer,
                    index_buffer,
                    index_count: mesh.indices.len() as u32,
                    uniform_buffer,
                    bind_group,
                    kind: object.kind,
                },
            );
        }
    }

    /// Record a pass drawing `scene` as it is right now into `target`.
    ///
    /// Uniform writes land at the next submit, so each encoded pass needs its
    /// own submit before the scene's materials change again.
    pub fn encode(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        encoder: &mut wgpu::CommandEncoder,
        scene: &Scene,
        settings: &FrameSettings,
        target: &SceneTarget,
        label: &str,
    ) {
        self.sync(device, scene);
        queue.write_buffer(
            &self.globals_buffer,
            0,
            bytemuck::bytes_of(&Globals::new(scene, settings)),
        );
        for (id, object) in scene.objects() {
            if let Some(gpu) = self.objects.get(id) {
                queue.write_buffer(
                    &gpu.uniform_buffer,
                    0,
                    bytemuck::bytes_of(&ObjectUniforms::new(object)),
                );
            }
        }

        let clear = settings.clear_color;
        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some(label),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: &target.color,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color {
                        r: clear.x as f64,
                        g: clear.y as f64,
                        b: clear.z as f64,
                        a: 1.0,
                    }),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: &target.depth,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            ..Default::default()
        });
        pass.set_bind_group(0, &self.globals_bind_group, &[]);

        // Opaque meshes first, then the water surface.
        for (kind, pipeline) in [
            (RenderKind::Mesh, &self.mesh_pipeline),
            (RenderKind::Water, &self.water_pipeline),
        ] {
            pass.set_pipeline(pipeline);
            for id in scene.objects().keys() {
                let Some(gpu) = self.objects.get(id) else {
                    continue;
                };
                if gpu.kind != kind {
                    continue;
                }
                pass.set_bind_group(1, &gpu.bind_group, &[]);
                pass.set_vertex_buffer(0, gpu.vertex_buffer.slice(..));
                pass.set_index_buffer(gpu.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
                pass.draw_indexed(0..gpu.index_count, 0, 0..1);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bloomwater_compositor::TunableParams;
    use bloomwater_scene::{Geometry, SceneBuilder};

    #[test]
    fn uniform_sizes_match_shader_layout() {
        assert_eq!(std::mem::size_of::<Globals>(), 160);
        assert_eq!(std::mem::size_of::<ObjectUniforms>(), 208);
    }

    #[test]
    fn globals_collect_demo_lights() {
        let scene = SceneBuilder::bloom_set();
        let settings = FrameSettings::new(&scene, &TunableParams::default(), 2.0);
        let globals = Globals::new(&scene, &settings);

        let ambient = Vec3::from_slice(&globals.ambient[..3]);
        assert!((ambient - Vec3::splat(0.8 * 0.4)).length() < 1e-5);
        assert_eq!(globals.light0_dir[3], 1.0);
        assert_eq!(globals.light1_dir[3], 0.0);
        let dir = Vec3::from_slice(&globals.light0_dir[..3]);
        assert!((dir - Vec3::new(-1.0, 1.0, 1.0).normalize()).length() < 1e-5);
        assert_eq!(globals.camera[3], 2.0);
    }

    #[test]
    fn material_modes_and_water_config() {
        let mut scene = SceneBuilder::bloom_set();
        let normal = scene.add(Renderable::mesh(
            "n",
            Geometry::plane(1.0, 1.0),
            Material::Normal,
        ));
        let dark = scene.add(Renderable::mesh(
            "d",
            Geometry::plane(1.0, 1.0),
            Material::DARK,
        ));
        assert_eq!(ObjectUniforms::new(scene.get(normal).unwrap()).emissive[3], MODE_NORMAL);
        let dark = ObjectUniforms::new(scene.get(dark).unwrap());
        assert_eq!(dark.emissive[3], MODE_BASIC);
        assert_eq!(&dark.color[..3], &[0.0, 0.0, 0.0]);

        let water_id = scene.water_id().unwrap();
        let water = scene.water().unwrap().clone();
        let uniforms = ObjectUniforms::new(scene.get(water_id).unwrap());
        assert_eq!(uniforms.config, water.config().to_array());
        assert_eq!(&uniforms.flow[..2], &water.flow_direction().to_array());
    }

    #[test]
    fn degenerate_transform_keeps_finite_normals() {
        let mut object = Renderable::mesh("flat", Geometry::plane(1.0, 1.0), Material::default());
        object.transform.scale = Vec3::ZERO;
        let uniforms = ObjectUniforms::new(&object);
        assert!(uniforms.normal_matrix.iter().flatten().all(|v| v.is_finite()));
    }
}
