pub mod camera;
mod gpu_mesh;
pub mod viewport;

pub use camera::{CameraStepper, OrbitControls, OrthographicCamera, PointerDrag};
pub use viewport::Viewport;

use crate::config::RendererConfig;
use crate::scene::{NodeId, SceneGraph, ShadowConfig};
use glam::{Mat4, Vec3};
use gpu_mesh::{collect_draws, DrawItem, GpuMesh, ObjectUniform, Vertex};
use std::collections::HashMap;
use std::sync::Arc;
use wgpu::util::DeviceExt;
use winit::window::Window;

const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("failed to create surface: {0}")]
    CreateSurface(#[from] wgpu::CreateSurfaceError),
    #[error("no compatible GPU adapter")]
    NoAdapter,
    #[error("failed to create device: {0}")]
    RequestDevice(#[from] wgpu::RequestDeviceError),
    #[error("surface reports no supported formats")]
    UnsupportedSurface,
    #[error("surface error: {0}")]
    Surface(#[from] wgpu::SurfaceError),
}

/// egui output for one frame, tessellated for the current surface.
pub struct UiFrame {
    pub clipped_primitives: Vec<egui::ClippedPrimitive>,
    pub textures_delta: egui::TexturesDelta,
    pub pixels_per_point: f32,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
struct GlobalsUniform {
    view_proj: [[f32; 4]; 4],
    light_view_proj: [[f32; 4]; 4],
    light_dir: [f32; 4],
    light_color: [f32; 4],
    ambient: [f32; 4],
    view_dir: [f32; 4],
}

/// View-projection of a directional light's orthographic shadow camera.
pub fn light_view_projection(position: Vec3, target: Vec3, shadow: &ShadowConfig) -> Mat4 {
    let direction = (target - position).normalize_or_zero();
    let up = if direction.cross(Vec3::Y).length_squared() < 1e-6 {
        Vec3::Z
    } else {
        Vec3::Y
    };
    let projection = Mat4::orthographic_rh(
        shadow.left,
        shadow.right,
        shadow.bottom,
        shadow.top,
        shadow.near,
        shadow.far,
    );
    projection * Mat4::look_at_rh(position, target, up)
}

fn globals_for(
    scene: &SceneGraph,
    camera: &OrthographicCamera,
    shadows_enabled: bool,
) -> (GlobalsUniform, Option<u32>) {
    let ambient = scene.ambient_light();
    let (light_view_proj, light_dir, light_color, shadow_map) = match scene.directional_light() {
        Some((light, position)) => {
            let toward = (position - light.target).normalize_or_zero();
            let casts = shadows_enabled && light.cast_shadow;
            let color = light.color.scaled(light.intensity);
            (
                light_view_projection(position, light.target, &light.shadow),
                [toward.x, toward.y, toward.z, if casts { 1.0 } else { 0.0 }],
                [color[0], color[1], color[2], 1.0],
                casts.then_some(light.shadow.map_size.max(1)),
            )
        }
        None => (Mat4::IDENTITY, [0.0, 1.0, 0.0, 0.0], [0.0; 4], None),
    };
    let forward = camera.forward();
    let texel = shadow_map.map_or(0.0, |size| 1.0 / size as f32);
    let globals = GlobalsUniform {
        view_proj: camera.view_projection().to_cols_array_2d(),
        light_view_proj: light_view_proj.to_cols_array_2d(),
        light_dir,
        light_color,
        ambient: [ambient[0], ambient[1], ambient[2], 1.0],
        view_dir: [forward.x, forward.y, forward.z, texel],
    };
    (globals, shadow_map)
}

struct ShadowTarget {
    size: u32,
    view: wgpu::TextureView,
    bind_group: wgpu::BindGroup,
}

/// Offscreen color and depth the scene is drawn into at the capped pixel
/// ratio, then stretched onto the window surface.
struct SceneTarget {
    size: [u32; 2],
    color_view: wgpu::TextureView,
    depth_view: wgpu::TextureView,
    blit_bind_group: wgpu::BindGroup,
}

/// wgpu forward renderer: directional shadow pass, lit solid and wireframe
/// meshes into an offscreen target, a blit to the window, then the egui
/// overlay at full display resolution.
pub struct RenderContext {
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    surface_config: wgpu::SurfaceConfiguration,
    scene_target: SceneTarget,
    blit_layout: wgpu::BindGroupLayout,
    blit_sampler: wgpu::Sampler,
    blit_pipeline: wgpu::RenderPipeline,
    globals_buffer: wgpu::Buffer,
    shadow_globals_buffer: wgpu::Buffer,
    shadow_globals_bind_group: wgpu::BindGroup,
    globals_layout: wgpu::BindGroupLayout,
    object_layout: wgpu::BindGroupLayout,
    shadow_sampler: wgpu::Sampler,
    shadow_target: ShadowTarget,
    solid_pipeline: wgpu::RenderPipeline,
    wire_pipeline: wgpu::RenderPipeline,
    shadow_pipeline: wgpu::RenderPipeline,
    meshes: HashMap<NodeId, GpuMesh>,
    egui_renderer: egui_wgpu::Renderer,
    clear_color: wgpu::Color,
    shadows_enabled: bool,
}

impl RenderContext {
    /// `surface_size` is the window in physical pixels; `render_size` is the
    /// capped size the scene is drawn at.
    pub fn new(
        window: Arc<Window>,
        surface_size: [u32; 2],
        render_size: [u32; 2],
        config: &RendererConfig,
    ) -> Result<Self, RenderError> {
        pollster::block_on(Self::new_async(window, surface_size, render_size, config))
    }

    async fn new_async(
        window: Arc<Window>,
        surface_size: [u32; 2],
        render_size: [u32; 2],
        config: &RendererConfig,
    ) -> Result<Self, RenderError> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor::default());
        let surface = instance.create_surface(window)?;
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .ok_or(RenderError::NoAdapter)?;
        log::info!("Using adapter {:?}", adapter.get_info().name);

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("orthoview device"),
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::default().using_resolution(adapter.limits()),
                    memory_hints: wgpu::MemoryHints::default(),
                },
                None,
            )
            .await?;

        let capabilities = surface.get_capabilities(&adapter);
        let format = capabilities
            .formats
            .iter()
            .copied()
            .find(|format| !format.is_srgb())
            .or_else(|| capabilities.formats.first().copied())
            .ok_or(RenderError::UnsupportedSurface)?;
        let surface_config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: surface_size[0].max(1),
            height: surface_size[1].max(1),
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode: capabilities
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &surface_config);

        let globals_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("globals layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Depth,
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Comparison),
                    count: None,
                },
            ],
        });
        let uniform_layout = |label: &str| {
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
        };
        let object_layout = uniform_layout("object layout");
        let shadow_globals_layout = uniform_layout("shadow globals layout");
        let blit_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("blit layout"),
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
            ],
        });
        let blit_sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("blit sampler"),
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });
        let scene_target =
            create_scene_target(&device, &blit_layout, &blit_sampler, format, render_size);

        let globals_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("globals"),
            size: std::mem::size_of::<GlobalsUniform>() as wgpu::BufferAddress,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let shadow_globals_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("shadow globals"),
            contents: bytemuck::cast_slice(&Mat4::IDENTITY.to_cols_array_2d()),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let shadow_globals_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("shadow globals"),
            layout: &shadow_globals_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: shadow_globals_buffer.as_entire_binding(),
            }],
        });
        let shadow_sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("shadow sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            compare: Some(wgpu::CompareFunction::LessEqual),
            ..Default::default()
        });
        let shadow_target = create_shadow_target(
            &device,
            &globals_layout,
            &globals_buffer,
            &shadow_sampler,
            1,
        );

        let scene_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("scene shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/scene.wgsl").into()),
        });
        let shadow_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("shadow shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/shadow.wgsl").into()),
        });
        let blit_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("blit shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/blit.wgsl").into()),
        });
        let scene_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("scene pipeline layout"),
            bind_group_layouts: &[&globals_layout, &object_layout],
            push_constant_ranges: &[],
        });
        let shadow_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("shadow pipeline layout"),
            bind_group_layouts: &[&shadow_globals_layout, &object_layout],
            push_constant_ranges: &[],
        });
        let blit_pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("blit pipeline layout"),
            bind_group_layouts: &[&blit_layout],
            push_constant_ranges: &[],
        });

        let solid_pipeline = create_scene_pipeline(
            &device,
            &scene_layout,
            &scene_shader,
            format,
            wgpu::PrimitiveTopology::TriangleList,
        );
        let wire_pipeline = create_scene_pipeline(
            &device,
            &scene_layout,
            &scene_shader,
            format,
            wgpu::PrimitiveTopology::LineList,
        );
        let shadow_pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("shadow pipeline"),
            layout: Some(&shadow_layout),
            vertex: wgpu::VertexState {
                module: &shadow_shader,
                entry_point: Some("vs_shadow"),
                compilation_options: Default::default(),
                buffers: &[Vertex::position_layout()],
            },
            fragment: None,
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                cull_mode: None,
                ..Default::default()
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: DEPTH_FORMAT,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::LessEqual,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState {
                    constant: 2,
                    slope_scale: 2.0,
                    clamp: 0.0,
                },
            }),
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        let blit_pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("blit pipeline"),
            layout: Some(&blit_pipeline_layout),
            vertex: wgpu::VertexState {
                module: &blit_shader,
                entry_point: Some("vs_blit"),
                compilation_options: Default::default(),
                buffers: &[],
            },
            fragment: Some(wgpu::FragmentState {
                module: &blit_shader,
                entry_point: Some("fs_blit"),
                compilation_options: Default::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            primitive: wgpu::PrimitiveState::default(),
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        let egui_renderer = egui_wgpu::Renderer::new(&device, format, None, 1, false);
        let [r, g, b] = config.clear_color;

        Ok(Self {
            surface,
            device,
            queue,
            surface_config,
            scene_target,
            blit_layout,
            blit_sampler,
            blit_pipeline,
            globals_buffer,
            shadow_globals_buffer,
            shadow_globals_bind_group,
            globals_layout,
            object_layout,
            shadow_sampler,
            shadow_target,
            solid_pipeline,
            wire_pipeline,
            shadow_pipeline,
            meshes: HashMap::new(),
            egui_renderer,
            clear_color: wgpu::Color {
                r: r as f64,
                g: g as f64,
                b: b as f64,
                a: 1.0,
            },
            shadows_enabled: config.shadows,
        })
    }

    pub fn size(&self) -> [u32; 2] {
        [self.surface_config.width, self.surface_config.height]
    }

    pub fn resize(&mut self, surface_size: [u32; 2], render_size: [u32; 2]) {
        let [width, height] = surface_size;
        if width == 0 || height == 0 || render_size.contains(&0) {
            return;
        }
        if surface_size != self.size() {
            self.surface_config.width = width;
            self.surface_config.height = height;
            self.reconfigure();
        }
        if render_size != self.scene_target.size {
            self.scene_target = create_scene_target(
                &self.device,
                &self.blit_layout,
                &self.blit_sampler,
                self.surface_config.format,
                render_size,
            );
        }
    }

    fn reconfigure(&mut self) {
        self.surface.configure(&self.device, &self.surface_config);
    }

    /// Uploads meshes for nodes seen for the first time and writes this
    /// frame's object uniforms.
    fn sync_meshes(&mut self, draws: &[DrawItem]) {
        for item in draws {
            let stale = self
                .meshes
                .get(&item.node)
                .is_some_and(|mesh| !mesh.matches(&item.geometry));
            if stale || !self.meshes.contains_key(&item.node) {
                let label = format!("mesh {}", item.node.index());
                let mesh = GpuMesh::new(&self.device, &self.object_layout, &item.geometry, &label);
                log::debug!(
                    "Uploaded {} ({} triangles)",
                    label,
                    item.geometry.triangle_count()
                );
                self.meshes.insert(item.node, mesh);
            }
            if let Some(mesh) = self.meshes.get(&item.node) {
                let uniform = ObjectUniform::new(item.world, &item.material, item.receive_shadow);
                mesh.write_uniform(&self.queue, &uniform);
            }
        }
    }

    fn ensure_shadow_target(&mut self, size: u32) {
        if self.shadow_target.size != size {
            self.shadow_target = create_shadow_target(
                &self.device,
                &self.globals_layout,
                &self.globals_buffer,
                &self.shadow_sampler,
                size,
            );
        }
    }

    pub fn render(
        &mut self,
        scene: &SceneGraph,
        camera: &OrthographicCamera,
        ui: &UiFrame,
    ) -> Result<(), RenderError> {
        let surface_texture = match self.surface.get_current_texture() {
            Ok(texture) => texture,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                log::debug!("Surface lost or outdated, reconfiguring");
                self.reconfigure();
                return Ok(());
            }
            Err(wgpu::SurfaceError::Timeout) => {
                log::warn!("Surface timed out, skipping frame");
                return Ok(());
            }
            Err(err) => return Err(err.into()),
        };
        let surface_view = surface_texture
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let draws = collect_draws(scene);
        self.sync_meshes(&draws);

        let (globals, shadow_map) = globals_for(scene, camera, self.shadows_enabled);
        if let Some(size) = shadow_map {
            self.ensure_shadow_target(size);
        }
        self.queue
            .write_buffer(&self.globals_buffer, 0, bytemuck::bytes_of(&globals));
        self.queue.write_buffer(
            &self.shadow_globals_buffer,
            0,
            bytemuck::cast_slice(&globals.light_view_proj),
        );

        for (id, image_delta) in &ui.textures_delta.set {
            self.egui_renderer
                .update_texture(&self.device, &self.queue, *id, image_delta);
        }
        let screen_descriptor = egui_wgpu::ScreenDescriptor {
            size_in_pixels: self.size(),
            pixels_per_point: ui.pixels_per_point,
        };

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("frame encoder"),
            });
        let ui_commands = self.egui_renderer.update_buffers(
            &self.device,
            &self.queue,
            &mut encoder,
            &ui.clipped_primitives,
            &screen_descriptor,
        );

        if shadow_map.is_some() {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("shadow pass"),
                color_attachments: &[],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.shadow_target.view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                ..Default::default()
            });
            pass.set_pipeline(&self.shadow_pipeline);
            pass.set_bind_group(0, &self.shadow_globals_bind_group, &[]);
            for item in draws.iter().filter(|item| item.cast_shadow) {
                if let Some(mesh) = self.meshes.get(&item.node) {
                    mesh.draw_triangles(&mut pass);
                }
            }
        }

        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("scene pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &self.scene_target.color_view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(self.clear_color),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.scene_target.depth_view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                ..Default::default()
            });
            pass.set_bind_group(0, &self.shadow_target.bind_group, &[]);
            for item in &draws {
                let Some(mesh) = self.meshes.get(&item.node) else {
                    continue;
                };
                if item.material.wireframe {
                    pass.set_pipeline(&self.wire_pipeline);
                    mesh.draw_edges(&mut pass);
                } else {
                    pass.set_pipeline(&self.solid_pipeline);
                    mesh.draw_triangles(&mut pass);
                }
            }
        }

        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("blit pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &surface_view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(self.clear_color),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                ..Default::default()
            });
            pass.set_pipeline(&self.blit_pipeline);
            pass.set_bind_group(0, &self.scene_target.blit_bind_group, &[]);
            pass.draw(0..3, 0..1);
        }

        {
            let pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("egui pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &surface_view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Load,
                        store: wgpu::StoreOp::Store,
                    },
                })],
                ..Default::default()
            });
            self.egui_renderer.render(
                &mut pass.forget_lifetime(),
                &ui.clipped_primitives,
                &screen_descriptor,
            );
        }

        self.queue
            .submit(ui_commands.into_iter().chain(std::iter::once(encoder.finish())));
        surface_texture.present();

        for id in &ui.textures_delta.free {
            self.egui_renderer.free_texture(id);
        }
        Ok(())
    }
}

fn create_scene_target(
    device: &wgpu::Device,
    blit_layout: &wgpu::BindGroupLayout,
    sampler: &wgpu::Sampler,
    format: wgpu::TextureFormat,
    size: [u32; 2],
) -> SceneTarget {
    let extent = wgpu::Extent3d {
        width: size[0].max(1),
        height: size[1].max(1),
        depth_or_array_layers: 1,
    };
    let texture = |label: &str, format: wgpu::TextureFormat, usage: wgpu::TextureUsages| {
        device
            .create_texture(&wgpu::TextureDescriptor {
                label: Some(label),
                size: extent,
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format,
                usage,
                view_formats: &[],
            })
            .create_view(&wgpu::TextureViewDescriptor::default())
    };
    let color_view = texture(
        "scene color",
        format,
        wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
    );
    let depth_view = texture("depth", DEPTH_FORMAT, wgpu::TextureUsages::RENDER_ATTACHMENT);
    let blit_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("blit"),
        layout: blit_layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::TextureView(&color_view),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::Sampler(sampler),
            },
        ],
    });
    log::debug!("Scene target {}x{}", extent.width, extent.height);
    SceneTarget {
        size,
        color_view,
        depth_view,
        blit_bind_group,
    }
}

fn create_shadow_target(
    device: &wgpu::Device,
    globals_layout: &wgpu::BindGroupLayout,
    globals_buffer: &wgpu::Buffer,
    sampler: &wgpu::Sampler,
    size: u32,
) -> ShadowTarget {
    let view = device
        .create_texture(&wgpu::TextureDescriptor {
            label: Some("shadow map"),
            size: wgpu::Extent3d {
                width: size,
                height: size,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        })
        .create_view(&wgpu::TextureViewDescriptor::default());
    let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("globals"),
        layout: globals_layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: globals_buffer.as_entire_binding(),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::TextureView(&view),
            },
            wgpu::BindGroupEntry {
                binding: 2,
                resource: wgpu::BindingResource::Sampler(sampler),
            },
        ],
    });
    ShadowTarget {
        size,
        view,
        bind_group,
    }
}

fn create_scene_pipeline(
    device: &wgpu::Device,
    layout: &wgpu::PipelineLayout,
    shader: &wgpu::ShaderModule,
    format: wgpu::TextureFormat,
    topology: wgpu::PrimitiveTopology,
) -> wgpu::RenderPipeline {
    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(match topology {
            wgpu::PrimitiveTopology::LineList => "wireframe pipeline",
            _ => "solid pipeline",
        }),
        layout: Some(layout),
        vertex: wgpu::VertexState {
            module: shader,
            entry_point: Some("vs_main"),
            compilation_options: Default::default(),
            buffers: &[Vertex::layout()],
        },
        fragment: Some(wgpu::FragmentState {
            module: shader,
            entry_point: Some("fs_main"),
            compilation_options: Default::default(),
            targets: &[Some(wgpu::ColorTargetState {
                format,
                blend: Some(wgpu::BlendState::REPLACE),
                write_mask: wgpu::ColorWrites::ALL,
            })],
        }),
        primitive: wgpu::PrimitiveState {
            topology,
            cull_mode: None,
            ..Default::default()
        },
        depth_stencil: Some(wgpu::DepthStencilState {
            format: DEPTH_FORMAT,
            depth_write_enabled: true,
            depth_compare: wgpu::CompareFunction::Less,
            stencil: wgpu::StencilState::default(),
            bias: wgpu::DepthBiasState::default(),
        }),
        multisample: wgpu::MultisampleState::default(),
        multiview: None,
        cache: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CameraConfig, SceneConfig};
    use crate::scene::assembly::assemble_scene;

    #[test]
    fn globals_match_shader_layout() {
        assert_eq!(std::mem::size_of::<GlobalsUniform>(), 192);
    }

    #[test]
    fn light_origin_projects_inside_shadow_volume() {
        let scene = assemble_scene(&SceneConfig::default());
        let (light, position) = scene.directional_light().unwrap();
        let matrix = light_view_projection(position, light.target, &light.shadow);

        let target = matrix.project_point3(light.target);
        assert!(target.x.abs() < 1e-5 && target.y.abs() < 1e-5);
        assert!(target.z > 0.0 && target.z < 1.0);

        let corner = matrix.project_point3(Vec3::new(3.0, 0.0, -3.0));
        assert!(corner.x.abs() <= 1.0 && corner.y.abs() <= 1.0);
    }

    #[test]
    fn vertical_light_still_builds_a_view() {
        let shadow = ShadowConfig {
            map_size: 512,
            near: 0.5,
            far: 20.0,
            left: -5.0,
            right: 5.0,
            top: 5.0,
            bottom: -5.0,
        };
        let matrix = light_view_projection(Vec3::new(0.0, 10.0, 0.0), Vec3::ZERO, &shadow);
        assert!(matrix.is_finite());
    }

    #[test]
    fn shadows_follow_renderer_flag() {
        let scene = assemble_scene(&SceneConfig::default());
        let camera = OrthographicCamera::from_config(&CameraConfig::default(), 4.0 / 3.0);

        let (globals, map) = globals_for(&scene, &camera, true);
        assert_eq!(map, Some(1024));
        assert_eq!(globals.light_dir[3], 1.0);
        assert!((globals.view_dir[3] - 1.0 / 1024.0).abs() < 1e-9);
        assert!((globals.ambient[0] - 0.8).abs() < 1e-6);

        let (globals, map) = globals_for(&scene, &camera, false);
        assert_eq!(map, None);
        assert_eq!(globals.light_dir[3], 0.0);
    }
}
