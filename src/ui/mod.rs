mod bindings;

pub use bindings::{
    spin_model, BindingError, BindingId, BindingKind, BindingValue, DebugPanel, PanelAction,
};

use crate::scene::SceneGraph;

impl DebugPanel {
    /// Draws the toolbar and the parameter window. Edits are written to
    /// `scene` immediately; triggered actions are returned to the caller.
    pub fn show(&mut self, ctx: &egui::Context, scene: &mut SceneGraph) -> Vec<PanelAction> {
        let mut actions = Vec::new();

        egui::TopBottomPanel::top("toolbar").show(ctx, |ui| {
            ui.horizontal(|ui| {
                if ui.button("Step camera").clicked() {
                    actions.push(PanelAction::StepCamera);
                }
                if let Some(status) = &self.status {
                    ui.separator();
                    ui.label(status.as_str());
                }
            });
        });

        if self.bindings().is_empty() {
            return actions;
        }

        egui::Window::new("Debug")
            .default_pos([12.0, 48.0])
            .resizable(false)
            .show(ctx, |ui| {
                for index in 0..self.bindings().len() {
                    self.show_binding(ui, scene, index, &mut actions);
                }
            });

        actions
    }

    fn show_binding(
        &mut self,
        ui: &mut egui::Ui,
        scene: &mut SceneGraph,
        index: usize,
        actions: &mut Vec<PanelAction>,
    ) {
        let binding = self.bindings()[index].clone();
        let id = BindingId::from_index(index);
        let Ok(value) = self.read(scene, id) else {
            return;
        };

        let edited = match (binding.kind, value) {
            (BindingKind::Position { range, .. }, BindingValue::Number(mut v)) => {
                let slider = egui::Slider::new(&mut v, range.min..=range.max)
                    .step_by(range.step as f64)
                    .text(binding.label.as_str());
                ui.add(slider).changed().then_some(BindingValue::Number(v))
            }
            (_, BindingValue::Bool(mut v)) => ui
                .checkbox(&mut v, binding.label.as_str())
                .changed()
                .then_some(BindingValue::Bool(v)),
            (_, BindingValue::Color(mut rgb)) => ui
                .horizontal(|ui| {
                    let changed = ui.color_edit_button_srgb(&mut rgb).changed();
                    ui.label(binding.label.as_str());
                    changed
                })
                .inner
                .then_some(BindingValue::Color(rgb)),
            (BindingKind::Action(action), BindingValue::Trigger) => {
                if ui.button(binding.label.as_str()).clicked() {
                    actions.push(action);
                }
                None
            }
            _ => None,
        };

        if let Some(value) = edited {
            if let Err(err) = self.write(scene, id, value) {
                log::warn!("Panel edit of '{}' failed: {}", binding.label, err);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PanelConfig;
    use crate::scene::{Color, FragmentNode, Geometry, Material, Mesh, ShadowFlags, Transform};
    use std::sync::Arc;

    fn scene_with_model() -> (SceneGraph, crate::scene::NodeId) {
        let mut scene = SceneGraph::new();
        let mut model = FragmentNode::group("model");
        model.children.push(FragmentNode {
            name: "Facade".to_string(),
            transform: Transform::default(),
            mesh: Some(Mesh {
                geometry: Arc::new(Geometry::plane(1.0, 1.0)),
                material: Material {
                    color: Color::new(0.5, 0.25, 0.125),
                    ..Material::default()
                },
            }),
            children: Vec::new(),
        });
        let id = scene.attach_fragment(scene.root(), model, ShadowFlags::default());
        (scene, id)
    }

    fn frame(
        ctx: &egui::Context,
        panel: &mut DebugPanel,
        scene: &mut SceneGraph,
        events: Vec<egui::Event>,
    ) -> Vec<PanelAction> {
        let input = egui::RawInput {
            screen_rect: Some(egui::Rect::from_min_size(
                egui::Pos2::ZERO,
                egui::vec2(1280.0, 720.0),
            )),
            events,
            ..Default::default()
        };
        let mut actions = Vec::new();
        let _ = ctx.run(input, |ctx| actions = panel.show(ctx, scene));
        actions
    }

    #[test]
    fn bound_panel_draws_without_touching_the_scene() {
        let (mut scene, model) = scene_with_model();
        let mut panel = DebugPanel::new();
        panel
            .register_model_bindings(&scene, model, None, &PanelConfig::default())
            .unwrap();
        let before = scene.node(model).unwrap().transform;
        let facade = scene.descendants(model)[0];
        let color_before = scene.node(facade).unwrap().mesh().unwrap().material.clone();

        let ctx = egui::Context::default();
        for _ in 0..3 {
            assert!(frame(&ctx, &mut panel, &mut scene, Vec::new()).is_empty());
        }
        assert_eq!(scene.node(model).unwrap().transform, before);
        assert!(scene.node(model).unwrap().visible);
        assert_eq!(scene.node(facade).unwrap().mesh().unwrap().material, color_before);
    }

    #[test]
    fn empty_panel_still_shows_the_toolbar() {
        let mut scene = SceneGraph::new();
        let mut panel = DebugPanel::new();
        panel.set_status("Loading 40%");
        let ctx = egui::Context::default();
        assert!(frame(&ctx, &mut panel, &mut scene, Vec::new()).is_empty());
        assert!(frame(&ctx, &mut panel, &mut scene, Vec::new()).is_empty());
    }

    #[test]
    fn toolbar_click_returns_step_camera() {
        let mut scene = SceneGraph::new();
        let mut panel = DebugPanel::new();
        let ctx = egui::Context::default();
        let pos = egui::pos2(24.0, 10.0);
        let button = |pressed| egui::Event::PointerButton {
            pos,
            button: egui::PointerButton::Primary,
            pressed,
            modifiers: egui::Modifiers::NONE,
        };

        frame(&ctx, &mut panel, &mut scene, Vec::new());
        frame(&ctx, &mut panel, &mut scene, vec![egui::Event::PointerMoved(pos)]);
        let pressed = frame(&ctx, &mut panel, &mut scene, vec![button(true)]);
        let released = frame(&ctx, &mut panel, &mut scene, vec![button(false)]);

        assert!(pressed.is_empty());
        assert_eq!(released, vec![PanelAction::StepCamera]);
    }
}
