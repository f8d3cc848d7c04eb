mod context;
mod egui_host;
mod input;
mod timing;

pub use context::ViewerContext;

use crate::config::{ConfigError, ViewerConfig};
use crate::render::{RenderContext, RenderError};
use egui_host::EguiHost;
use input::{wheel_steps, PointerState};

use std::sync::Arc;
use std::time::{Duration, Instant};
use winit::application::ApplicationHandler;
use winit::dpi::{LogicalSize, PhysicalSize};
use winit::event::{ElementState, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::{Window, WindowAttributes, WindowId};

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("config: {0}")]
    Config(#[from] ConfigError),
    #[error("event loop: {0}")]
    EventLoop(#[from] winit::error::EventLoopError),
    #[error("window creation failed: {0}")]
    Window(#[from] winit::error::OsError),
    #[error("renderer: {0}")]
    Render(#[from] RenderError),
}

pub struct App {
    config: ViewerConfig,
    window: Option<Arc<Window>>,
    viewer: Option<ViewerContext>,
    render: Option<RenderContext>,
    egui: Option<EguiHost>,
    pointer: PointerState,
    target_frame_duration: Duration,
    next_frame_time: Instant,
    fatal: Option<AppError>,
}

impl App {
    fn new(config: ViewerConfig) -> Self {
        Self {
            config,
            window: None,
            viewer: None,
            render: None,
            egui: None,
            pointer: PointerState::default(),
            target_frame_duration: Duration::from_millis(16),
            next_frame_time: Instant::now(),
            fatal: None,
        }
    }

    fn init(&mut self, event_loop: &ActiveEventLoop) -> Result<(), AppError> {
        let window_attrs = WindowAttributes::default()
            .with_title(self.config.window.title.clone())
            .with_inner_size(LogicalSize::new(
                self.config.window.width,
                self.config.window.height,
            ))
            .with_resizable(true);
        let window = Arc::new(event_loop.create_window(window_attrs)?);

        let scale_factor = window.scale_factor();
        let logical = window.inner_size().to_logical::<f32>(scale_factor);
        let mut viewer = ViewerContext::new(
            self.config.clone(),
            [logical.width, logical.height],
            scale_factor as f32,
            Instant::now(),
        );
        let render = RenderContext::new(
            Arc::clone(&window),
            viewer.viewport().surface_size(),
            viewer.viewport().render_size(),
            &self.config.renderer,
        )?;
        viewer.start_loading();

        self.egui = Some(EguiHost::new(&window));
        self.render = Some(render);
        self.viewer = Some(viewer);
        self.update_target_frame_duration(&window);
        self.window = Some(window);
        Ok(())
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, err: AppError) {
        log::error!("{}", err);
        self.fatal = Some(err);
        event_loop.exit();
    }

    fn handle_resize(&mut self, size: PhysicalSize<u32>, scale_factor: f64) {
        let (Some(viewer), Some(render)) = (self.viewer.as_mut(), self.render.as_mut()) else {
            return;
        };
        let logical = size.to_logical::<f32>(scale_factor);
        if viewer.handle_resize(logical.width, logical.height, scale_factor as f32) {
            let viewport = viewer.viewport();
            render.resize(viewport.surface_size(), viewport.render_size());
        }
    }

    fn update_target_frame_duration(&mut self, window: &Window) {
        let mut target = Duration::from_millis(16);
        if let Some(monitor) = window.current_monitor() {
            if let Some(millihz) = monitor.refresh_rate_millihertz() {
                let hz = millihz as f32 / 1000.0;
                if hz > 1.0 {
                    target = Duration::from_secs_f32(1.0 / hz);
                }
            }
        }
        self.target_frame_duration = target;
        self.next_frame_time = Instant::now() + self.target_frame_duration;
    }

    fn redraw(&mut self, event_loop: &ActiveEventLoop) {
        let (Some(window), Some(viewer), Some(render), Some(egui)) = (
            self.window.as_ref(),
            self.viewer.as_mut(),
            self.render.as_mut(),
            self.egui.as_mut(),
        ) else {
            return;
        };

        viewer.pump_loader();
        if let Some(title) = viewer.advance(Instant::now()) {
            window.set_title(&title);
        }

        let frame_start = Instant::now();
        let ui = egui.run_ui(window, |ctx| viewer.show_panel(ctx));
        let result = render.render(viewer.scene(), viewer.camera(), &ui);
        viewer.set_render_ms(frame_start.elapsed().as_secs_f32() * 1000.0);

        if let Err(err) = result {
            self.fail(event_loop, err.into());
        }
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }
        if let Err(err) = self.init(event_loop) {
            self.fail(event_loop, err);
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        let Some(window) = self.window.clone() else {
            return;
        };
        let (consumed, ui_wants_pointer) = match self.egui.as_mut() {
            Some(egui) => (egui.on_window_event(&window, &event), egui.wants_pointer_input()),
            None => (false, false),
        };

        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::KeyboardInput { event, .. } => {
                if event.physical_key == PhysicalKey::Code(KeyCode::Escape)
                    && event.state == ElementState::Pressed
                {
                    event_loop.exit();
                }
            }
            WindowEvent::Focused(false) | WindowEvent::CursorLeft { .. } => {
                self.pointer.release_all();
            }
            WindowEvent::Resized(size) => {
                self.handle_resize(size, window.scale_factor());
                self.update_target_frame_duration(&window);
            }
            WindowEvent::ScaleFactorChanged { scale_factor, .. } => {
                self.handle_resize(window.inner_size(), scale_factor);
            }
            WindowEvent::Moved(_) => self.update_target_frame_duration(&window),
            WindowEvent::MouseInput { state, button, .. } => {
                let pressed = state == ElementState::Pressed;
                if !pressed || !(consumed || ui_wants_pointer) {
                    self.pointer.handle_button(button, pressed);
                }
            }
            WindowEvent::CursorMoved { position, .. } => {
                let drag = self.pointer.handle_move(position.x as f32, position.y as f32);
                if let (Some(drag), Some(viewer)) = (drag, self.viewer.as_mut()) {
                    viewer.drag(drag);
                }
            }
            WindowEvent::MouseWheel { delta, .. } => {
                if consumed || ui_wants_pointer {
                    return;
                }
                if let Some(viewer) = self.viewer.as_mut() {
                    viewer.zoom(wheel_steps(delta));
                }
            }
            WindowEvent::RedrawRequested => self.redraw(event_loop),
            _ => {}
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        let now = Instant::now();
        if now >= self.next_frame_time {
            if let Some(window) = &self.window {
                window.request_redraw();
            }
            self.next_frame_time = now + self.target_frame_duration;
        }
        event_loop.set_control_flow(ControlFlow::WaitUntil(self.next_frame_time));
    }
}

pub fn run() -> Result<(), AppError> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let config = ViewerConfig::from_args(std::env::args())?;
    log::info!("Starting {}", config.window.title);
    log::info!("Drag to orbit, right-drag to pan, wheel to zoom, ESC to exit");

    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Wait);

    let mut app = App::new(config);
    event_loop.run_app(&mut app)?;

    if let Some(err) = app.fatal.take() {
        return Err(err);
    }
    log::info!("Goodbye");
    Ok(())
}
