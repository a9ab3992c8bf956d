mod panel;

use anyhow::{Context as _, Result};
use bloomwater_common::Viewport;
use bloomwater_compositor::{DebugTextBackend, ParamOverrides};
use bloomwater_context::{ContextConfig, Demo, RenderContext};
use bloomwater_render_wgpu::{BloomRenderer, RenderError};
use clap::{Parser, ValueEnum};
use egui::Context as EguiContext;
use panel::PanelStatus;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;
use winit::application::ApplicationHandler;
use winit::dpi::PhysicalSize;
use winit::event::{DeviceEvent, ElementState, MouseButton, MouseScrollDelta, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::{Window, WindowId};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum DemoArg {
    BloomSet,
    TorusPool,
}

impl From<DemoArg> for Demo {
    fn from(arg: DemoArg) -> Self {
        match arg {
            DemoArg::BloomSet => Demo::BloomSet,
            DemoArg::TorusPool => Demo::TorusPool,
        }
    }
}

#[derive(Parser)]
#[command(name = "bloomwater-desktop", about = "Selective bloom over flowing water")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Which demo scene to run
    #[arg(long, value_enum, default_value = "bloom-set")]
    demo: DemoArg,

    /// Scene asset attached to the bloom-set demo
    #[arg(long, default_value = "assets/set.json")]
    asset: PathBuf,

    /// JSON file overriding the demo's initial parameters
    #[arg(long)]
    params: Option<PathBuf>,

    /// Render this many frames as text instead of opening a window
    #[arg(long)]
    headless_frames: Option<u32>,
}

const WINDOW_SIZE: Viewport = Viewport {
    width: 1280,
    height: 720,
};
const HEADLESS_STEP: Duration = Duration::from_millis(16);

/// Pixels of precise scrolling per wheel step.
const PIXELS_PER_LINE: f32 = 50.0;

/// GPU objects, created once the window exists.
struct Gpu {
    window: Arc<Window>,
    surface: wgpu::Surface<'static>,
    device: Arc<wgpu::Device>,
    queue: Arc<wgpu::Queue>,
    config: wgpu::SurfaceConfiguration,
    renderer: BloomRenderer,
    egui_winit: egui_winit::State,
    egui_renderer: egui_wgpu::Renderer,
}

struct GpuApp {
    ctx: RenderContext,
    gpu: Option<Gpu>,
    egui_ctx: EguiContext,
    orbiting: bool,
    last_frame: Instant,
}

impl GpuApp {
    fn new(ctx: RenderContext) -> Self {
        Self {
            ctx,
            gpu: None,
            egui_ctx: EguiContext::default(),
            orbiting: false,
            last_frame: Instant::now(),
        }
    }

    fn init_gpu(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let attrs = Window::default_attributes()
            .with_title("Bloom Water")
            .with_inner_size(PhysicalSize::new(WINDOW_SIZE.width, WINDOW_SIZE.height));
        let window = Arc::new(event_loop.create_window(attrs).context("create window")?);

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });
        let surface = instance
            .create_surface(window.clone())
            .context("create surface")?;

        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: Some(&surface),
            force_fallback_adapter: false,
        }))
        .context("no suitable GPU adapter")?;

        let (device, queue) = pollster::block_on(adapter.request_device(
            &wgpu::DeviceDescriptor {
                label: Some("bloomwater_device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
                memory_hints: Default::default(),
            },
            None,
        ))
        .context("create device")?;
        let device = Arc::new(device);
        let queue = Arc::new(queue);

        let size = window.inner_size();
        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .find(|f| f.is_srgb())
            .or_else(|| surface_caps.formats.first())
            .copied()
            .context("surface reports no formats")?;
        let alpha_mode = surface_caps
            .alpha_modes
            .first()
            .copied()
            .unwrap_or(wgpu::CompositeAlphaMode::Auto);

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        let viewport = Viewport::new(config.width, config.height);
        let mut renderer = BloomRenderer::new(
            Arc::clone(&device),
            Arc::clone(&queue),
            surface_format,
            viewport,
        )?;
        self.ctx.resize(&mut renderer, viewport.width, viewport.height);

        let egui_winit = egui_winit::State::new(
            self.egui_ctx.clone(),
            egui::ViewportId::ROOT,
            &window,
            Some(window.scale_factor() as f32),
            None,
            None,
        );
        let egui_renderer = egui_wgpu::Renderer::new(&device, surface_format, None, 1, false);

        tracing::info!(
            "GPU initialized with {} backend",
            adapter.get_info().backend.to_str()
        );
        self.gpu = Some(Gpu {
            window,
            surface,
            device,
            queue,
            config,
            renderer,
            egui_winit,
            egui_renderer,
        });
        Ok(())
    }

    fn resize(&mut self, width: u32, height: u32) {
        let Some(gpu) = &mut self.gpu else {
            return;
        };
        gpu.config.width = width.max(1);
        gpu.config.height = height.max(1);
        gpu.surface.configure(&gpu.device, &gpu.config);
        self.ctx
            .resize(&mut gpu.renderer, gpu.config.width, gpu.config.height);
        tracing::debug!(mips = ?gpu.renderer.bloom_mip_sizes(), "bloom chain resized");
    }

    /// Render one frame and the panel. Returns false when the app must stop.
    fn redraw(&mut self) -> bool {
        let now = Instant::now();
        let dt = now - self.last_frame;
        self.last_frame = now;

        let Some(gpu) = &mut self.gpu else {
            return true;
        };

        let output = match gpu.surface.get_current_texture() {
            Ok(t) => t,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                gpu.surface.configure(&gpu.device, &gpu.config);
                return true;
            }
            Err(e) => {
                tracing::error!("surface error: {e}");
                return true;
            }
        };
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        match self.ctx.frame(&mut gpu.renderer, &view, dt) {
            Ok(_) => {}
            Err(RenderError::DeviceLost) => {
                tracing::error!("GPU device lost, shutting down");
                return false;
            }
            Err(e) => {
                tracing::error!("frame failed: {e}");
                return false;
            }
        }

        let raw_input = gpu.egui_winit.take_egui_input(&gpu.window);
        let status = PanelStatus {
            timer: self.ctx.timer(),
            report: self.ctx.last_report(),
            asset_pending: self.ctx.asset_pending(),
        };
        let demo = self.ctx.demo();
        let params = self.ctx.params().clone();
        let mut changes = Vec::new();
        let full_output = self.egui_ctx.run(raw_input, |ctx| {
            changes = panel::draw(ctx, demo, &params, &status);
        });
        for change in changes {
            self.ctx.queue_change(change);
        }

        gpu.egui_winit
            .handle_platform_output(&gpu.window, full_output.platform_output);
        let paint_jobs = self
            .egui_ctx
            .tessellate(full_output.shapes, full_output.pixels_per_point);
        let screen_descriptor = egui_wgpu::ScreenDescriptor {
            size_in_pixels: [gpu.config.width, gpu.config.height],
            pixels_per_point: full_output.pixels_per_point,
        };

        for (id, image_delta) in &full_output.textures_delta.set {
            gpu.egui_renderer
                .update_texture(&gpu.device, &gpu.queue, *id, image_delta);
        }
        let mut encoder = gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("egui_encoder"),
            });
        gpu.egui_renderer.update_buffers(
            &gpu.device,
            &gpu.queue,
            &mut encoder,
            &paint_jobs,
            &screen_descriptor,
        );
        {
            let mut pass = encoder
                .begin_render_pass(&wgpu::RenderPassDescriptor {
                    label: Some("egui_pass"),
                    color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                        view: &view,
                        resolve_target: None,
                        ops: wgpu::Operations {
                            load: wgpu::LoadOp::Load,
                            store: wgpu::StoreOp::Store,
                        },
                    })],
                    depth_stencil_attachment: None,
                    ..Default::default()
                })
                .forget_lifetime();
            gpu.egui_renderer
                .render(&mut pass, &paint_jobs, &screen_descriptor);
        }
        gpu.queue.submit(std::iter::once(encoder.finish()));
        for id in &full_output.textures_delta.free {
            gpu.egui_renderer.free_texture(id);
        }

        output.present();
        true
    }
}

impl ApplicationHandler for GpuApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.gpu.is_some() {
            return;
        }
        if let Err(e) = self.init_gpu(event_loop) {
            tracing::error!("failed to initialize GPU: {e:#}");
            event_loop.exit();
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        if let Some(gpu) = &mut self.gpu {
            let response = gpu.egui_winit.on_window_event(&gpu.window, &event);
            if response.consumed {
                return;
            }
        }

        match event {
            WindowEvent::CloseRequested => {
                event_loop.exit();
            }
            WindowEvent::Resized(new_size) => {
                self.resize(new_size.width, new_size.height);
            }
            WindowEvent::MouseInput {
                button: MouseButton::Right,
                state,
                ..
            } => {
                self.orbiting = state == ElementState::Pressed;
            }
            WindowEvent::MouseWheel { delta, .. } => {
                let steps = match delta {
                    MouseScrollDelta::LineDelta(_, y) => y,
                    MouseScrollDelta::PixelDelta(p) => p.y as f32 / PIXELS_PER_LINE,
                };
                self.ctx.zoom_camera(steps);
            }
            WindowEvent::RedrawRequested => {
                if !self.redraw() {
                    event_loop.exit();
                }
            }
            _ => {}
        }
    }

    fn device_event(
        &mut self,
        _event_loop: &ActiveEventLoop,
        _device_id: winit::event::DeviceId,
        event: DeviceEvent,
    ) {
        if let DeviceEvent::MouseMotion { delta } = event {
            if self.orbiting {
                self.ctx.orbit_camera(delta.0 as f32, delta.1 as f32);
            }
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(gpu) = &self.gpu {
            gpu.window.request_redraw();
        }
    }
}

/// Render frames through the text backend and print every pass.
fn run_headless(config: ContextConfig, frames: u32) -> Result<()> {
    let viewport = config.viewport;
    let mut ctx = RenderContext::new(config);
    let mut backend = DebugTextBackend::new();
    ctx.resize(&mut backend, viewport.width, viewport.height);
    ctx.finish_asset_load();

    for _ in 0..frames {
        let report = ctx.frame(&mut backend, &(), HEADLESS_STEP)?;
        for pass in backend.take_passes() {
            print!("{pass}");
        }
        println!(
            "frame {}: masked={} restored={} glowing={}",
            report.frame, report.masked, report.restored, report.glowing
        );
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .init();

    let demo = Demo::from(cli.demo);
    let params = match &cli.params {
        Some(path) => {
            let overrides = ParamOverrides::load(path)
                .with_context(|| format!("reading parameters from {}", path.display()))?;
            Some(overrides.apply_to(demo.default_params()))
        }
        None => None,
    };
    let config = ContextConfig {
        demo,
        asset: Some(cli.asset),
        params,
        viewport: WINDOW_SIZE,
    };

    tracing::info!(?demo, "bloomwater-desktop starting");

    if let Some(frames) = cli.headless_frames {
        return run_headless(config, frames);
    }

    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = GpuApp::new(RenderContext::new(config));
    event_loop.run_app(&mut app)?;

    Ok(())
}
