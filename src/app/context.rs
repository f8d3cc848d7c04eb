use super::timing::FrameClock;
use crate::animation::Tweener;
use crate::assets::{AssetLoader, ImportedModel, LoadEvent};
use crate::config::ViewerConfig;
use crate::render::{CameraStepper, OrbitControls, OrthographicCamera, PointerDrag, Viewport};
use crate::scene::assembly::assemble_scene;
use crate::scene::{NodeId, SceneGraph, ShadowFlags};
use crate::ui::{spin_model, BindingError, DebugPanel, PanelAction};
use glam::Vec2;
use std::time::Instant;

/// Owns every piece of mutable viewer state. Window events and the frame
/// tick are methods on this type.
pub struct ViewerContext {
    config: ViewerConfig,
    scene: SceneGraph,
    camera: OrthographicCamera,
    controls: OrbitControls,
    stepper: CameraStepper,
    viewport: Viewport,
    panel: DebugPanel,
    tweener: Tweener,
    loader: Option<AssetLoader>,
    model: Option<NodeId>,
    clock: FrameClock,
}

impl ViewerContext {
    pub fn new(config: ViewerConfig, logical_size: [f32; 2], scale_factor: f32, now: Instant) -> Self {
        let viewport = Viewport::new(
            logical_size[0],
            logical_size[1],
            scale_factor,
            config.renderer.max_pixel_ratio,
        );
        let camera = OrthographicCamera::from_config(&config.camera, viewport.aspect());
        let controls = OrbitControls::from_config(&config.camera);
        let stepper = CameraStepper::from_config(&config.camera);
        let scene = assemble_scene(&config.scene);
        let clock = FrameClock::new(config.window.title.clone(), now);

        Self {
            config,
            scene,
            camera,
            controls,
            stepper,
            viewport,
            panel: DebugPanel::new(),
            tweener: Tweener::new(),
            loader: None,
            model: None,
            clock,
        }
    }

    pub fn scene(&self) -> &SceneGraph {
        &self.scene
    }

    pub fn camera(&self) -> &OrthographicCamera {
        &self.camera
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    #[cfg(test)]
    pub fn panel(&self) -> &DebugPanel {
        &self.panel
    }

    #[cfg(test)]
    pub fn model(&self) -> Option<NodeId> {
        self.model
    }

    pub fn set_render_ms(&mut self, render_ms: f32) {
        self.clock.set_render_ms(render_ms);
    }

    pub fn start_loading(&mut self) {
        let path = self.config.model.resolved_path();
        self.panel.set_status(format!("Loading {}", path.display()));
        self.loader = Some(AssetLoader::spawn(path));
    }

    #[cfg(test)]
    pub fn is_loading(&self) -> bool {
        self.loader.as_ref().is_some_and(|loader| !loader.is_finished())
    }

    /// Handles whatever the loader thread has produced since the last call.
    pub fn pump_loader(&mut self) {
        let Some(loader) = self.loader.as_mut() else {
            return;
        };
        let events = loader.poll();
        if loader.is_finished() {
            self.loader = None;
        }
        for event in events {
            self.handle_load_event(event);
        }
    }

    pub fn handle_load_event(&mut self, event: LoadEvent) {
        match event {
            LoadEvent::Progress(progress) => {
                if progress.total > 0 {
                    let percent = progress.loaded as f64 / progress.total as f64 * 100.0;
                    log::info!("Model {:.0}% loaded", percent);
                    self.panel.set_status(format!("Loading {:.0}%", percent));
                } else {
                    log::info!("Model {} bytes loaded", progress.loaded);
                }
            }
            LoadEvent::Loaded(model) => {
                self.install_model(model);
                self.panel.clear_status();
            }
            LoadEvent::Failed(err) => {
                log::error!("Failed to load model: {}", err);
                self.panel.set_status("Model failed to load");
            }
        }
    }

    fn install_model(&mut self, model: ImportedModel) -> NodeId {
        let (nodes, meshes) = (model.root.node_count(), model.mesh_count());
        let shadows = ShadowFlags {
            cast: self.config.model.cast_shadows,
            receive: self.config.model.receive_shadows,
        };
        let id = self.scene.attach_named(
            self.scene.root(),
            model.root,
            &self.config.model.name,
            shadows,
        );
        self.model = Some(id);
        log::info!(
            "Model '{}' added with {} nodes, {} meshes",
            self.config.model.name,
            nodes,
            meshes
        );

        let result = self.panel.register_model_bindings(
            &self.scene,
            id,
            self.config.model.material_target.as_deref(),
            &self.config.panel,
        );
        if let Err(err) = result {
            log::error!("Material bindings skipped: {}", err);
        }
        id
    }

    pub fn handle_resize(&mut self, width: f32, height: f32, scale_factor: f32) -> bool {
        self.viewport
            .resize(width, height, scale_factor, &mut self.camera)
    }

    pub fn drag(&mut self, drag: PointerDrag) {
        // Cursor deltas arrive in window pixels.
        let [width, height] = self.viewport.surface_size();
        match drag {
            PointerDrag::Rotate { dx, dy } => self.controls.rotate(dx, dy, height as f32),
            PointerDrag::Pan { dx, dy } => self.controls.pan(
                dx,
                dy,
                &self.camera,
                Vec2::new(width as f32, height as f32),
            ),
        }
    }

    pub fn zoom(&mut self, steps: f32) {
        self.controls.zoom(steps, &mut self.camera);
    }

    pub fn step_camera(&mut self) {
        self.stepper.step(&mut self.camera);
    }

    pub fn trigger(&mut self, action: PanelAction) {
        match action {
            PanelAction::StepCamera => self.step_camera(),
            PanelAction::Spin => {
                let Some(model) = self.model else {
                    let err = BindingError::ModelNotLoaded(self.config.model.name.clone());
                    log::warn!("{}", err);
                    return;
                };
                let result = spin_model(
                    &self.scene,
                    &mut self.tweener,
                    model,
                    self.config.panel.spin_duration_secs,
                );
                match result {
                    Ok(()) => log::debug!("Spinning '{}'", self.config.model.name),
                    Err(err) => log::error!("Spin failed: {}", err),
                }
            }
        }
    }

    /// Draws the panel and applies what it returned.
    pub fn show_panel(&mut self, ctx: &egui::Context) {
        for action in self.panel.show(ctx, &mut self.scene) {
            self.trigger(action);
        }
    }

    /// One frame of simulation: clock, orbit controls, tweens. Returns a
    /// window title when the FPS readout is due.
    pub fn advance(&mut self, now: Instant) -> Option<String> {
        let title = self.clock.tick(now);
        let dt = self.clock.frame_dt;
        self.controls.update(&mut self.camera, dt);
        self.tweener.update(dt, &mut self.scene);
        title
    }
}
