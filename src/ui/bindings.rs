use crate::animation::{AnimatedProperty, Animator, Axis};
use crate::config::PanelConfig;
use crate::scene::{Color, NodeId, SceneGraph};

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum BindingError {
    #[error("no binding with id {0}")]
    UnknownBinding(usize),
    #[error("binding '{label}' does not accept that value")]
    TypeMismatch { label: String },
    #[error("bound node {0} no longer exists")]
    MissingNode(usize),
    #[error("node '{0}' has no material")]
    NotAMesh(String),
    #[error("no mesh under '{model}' matches material target {target:?}")]
    NoMaterialMesh {
        model: String,
        target: Option<String>,
    },
    #[error("model '{0}' is not loaded")]
    ModelNotLoaded(String),
}

pub type Result<T> = std::result::Result<T, BindingError>;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NumericRange {
    pub min: f32,
    pub max: f32,
    pub step: f32,
}

impl NumericRange {
    /// Snaps to the nearest step, then clamps into range.
    pub fn quantize(&self, value: f32) -> f32 {
        let snapped = if self.step > 0.0 {
            (value / self.step).round() * self.step
        } else {
            value
        };
        snapped.clamp(self.min, self.max)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanelAction {
    Spin,
    StepCamera,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BindingKind {
    Position {
        node: NodeId,
        axis: Axis,
        range: NumericRange,
    },
    Visible {
        node: NodeId,
    },
    Wireframe {
        node: NodeId,
    },
    Color {
        node: NodeId,
    },
    Action(PanelAction),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Binding {
    pub label: String,
    pub kind: BindingKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BindingId(usize);

impl BindingId {
    pub(super) fn from_index(index: usize) -> Self {
        Self(index)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BindingValue {
    Number(f32),
    Bool(bool),
    Color([u8; 3]),
    Trigger,
}

/// Values edited through the panel that have no direct home on a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DebugParams {
    /// sRGB bytes shown by the color picker.
    pub color: [u8; 3],
}

impl Default for DebugParams {
    fn default() -> Self {
        Self {
            color: [255, 255, 255],
        }
    }
}

/// Registry of live-tunable parameters.
#[derive(Debug, Default)]
pub struct DebugPanel {
    bindings: Vec<Binding>,
    params: DebugParams,
    pub(super) status: Option<String>,
}

impl DebugPanel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bindings(&self) -> &[Binding] {
        &self.bindings
    }

    #[cfg(test)]
    pub fn params(&self) -> DebugParams {
        self.params
    }

    pub fn set_status(&mut self, status: impl Into<String>) {
        self.status = Some(status.into());
    }

    pub fn clear_status(&mut self) {
        self.status = None;
    }

    pub fn register(&mut self, label: impl Into<String>, kind: BindingKind) -> BindingId {
        let id = BindingId(self.bindings.len());
        self.bindings.push(Binding {
            label: label.into(),
            kind,
        });
        id
    }

    #[cfg(test)]
    pub fn find(&self, label: &str) -> Option<BindingId> {
        self.bindings
            .iter()
            .position(|binding| binding.label == label)
            .map(BindingId)
    }

    fn binding(&self, id: BindingId) -> Result<&Binding> {
        self.bindings
            .get(id.0)
            .ok_or(BindingError::UnknownBinding(id.0))
    }

    /// Registers the bindings for a freshly loaded model: position, visibility
    /// and the spin action on its root, then wireframe and color on its
    /// material mesh. A missing material mesh is reported after the other
    /// bindings are in place.
    pub fn register_model_bindings(
        &mut self,
        scene: &SceneGraph,
        model: NodeId,
        material_target: Option<&str>,
        config: &PanelConfig,
    ) -> Result<()> {
        let root = scene
            .node(model)
            .ok_or(BindingError::MissingNode(model.index()))?;
        let range = NumericRange {
            min: config.position_min,
            max: config.position_max,
            step: config.position_step,
        };
        for (label, axis) in [("x", Axis::X), ("y", Axis::Y), ("z", Axis::Z)] {
            self.register(label, BindingKind::Position { node: model, axis, range });
        }
        self.register("visible", BindingKind::Visible { node: model });
        self.register("spin", BindingKind::Action(PanelAction::Spin));

        let Some(mesh_id) = find_material_mesh(scene, model, material_target) else {
            return Err(BindingError::NoMaterialMesh {
                model: root.name.clone(),
                target: material_target.map(str::to_string),
            });
        };
        if let Some(mesh) = scene.node(mesh_id).and_then(|node| node.mesh()) {
            self.params.color = mesh.material.color.to_srgb_bytes();
        }
        self.register("wireframe", BindingKind::Wireframe { node: mesh_id });
        self.register("color", BindingKind::Color { node: mesh_id });
        log::debug!("Registered {} panel bindings", self.bindings.len());
        Ok(())
    }

    pub fn read(&self, scene: &SceneGraph, id: BindingId) -> Result<BindingValue> {
        let binding = self.binding(id)?;
        let value = match binding.kind {
            BindingKind::Position { node, axis, .. } => BindingValue::Number(
                AnimatedProperty::Position(axis)
                    .read(scene, node)
                    .ok_or(BindingError::MissingNode(node.index()))?,
            ),
            BindingKind::Visible { node } => BindingValue::Bool(
                scene
                    .node(node)
                    .ok_or(BindingError::MissingNode(node.index()))?
                    .visible,
            ),
            BindingKind::Wireframe { node } => {
                let target = scene
                    .node(node)
                    .ok_or(BindingError::MissingNode(node.index()))?;
                let mesh = target
                    .mesh()
                    .ok_or_else(|| BindingError::NotAMesh(target.name.clone()))?;
                BindingValue::Bool(mesh.material.wireframe)
            }
            BindingKind::Color { .. } => BindingValue::Color(self.params.color),
            BindingKind::Action(_) => BindingValue::Trigger,
        };
        Ok(value)
    }

    /// Writes an edited value back to the bound property.
    pub fn write(&mut self, scene: &mut SceneGraph, id: BindingId, value: BindingValue) -> Result<()> {
        let binding = self.binding(id)?.clone();
        let mismatch = || BindingError::TypeMismatch {
            label: binding.label.clone(),
        };
        match (binding.kind, value) {
            (BindingKind::Position { node, axis, range }, BindingValue::Number(v)) => {
                if !AnimatedProperty::Position(axis).write(scene, node, range.quantize(v)) {
                    return Err(BindingError::MissingNode(node.index()));
                }
            }
            (BindingKind::Visible { node }, BindingValue::Bool(v)) => {
                scene
                    .node_mut(node)
                    .ok_or(BindingError::MissingNode(node.index()))?
                    .visible = v;
            }
            (BindingKind::Wireframe { node }, BindingValue::Bool(v)) => {
                let target = scene
                    .node_mut(node)
                    .ok_or(BindingError::MissingNode(node.index()))?;
                let name = target.name.clone();
                target
                    .material_mut()
                    .ok_or(BindingError::NotAMesh(name))?
                    .wireframe = v;
            }
            (BindingKind::Color { node }, BindingValue::Color(rgb)) => {
                let target = scene
                    .node_mut(node)
                    .ok_or(BindingError::MissingNode(node.index()))?;
                let name = target.name.clone();
                let material = target.material_mut().ok_or(BindingError::NotAMesh(name))?;
                self.params.color = rgb;
                material.color = Color::from_srgb_bytes(rgb);
            }
            _ => return Err(mismatch()),
        }
        Ok(())
    }

    #[cfg(test)]
    pub fn action(&self, id: BindingId) -> Result<PanelAction> {
        let binding = self.binding(id)?;
        match binding.kind {
            BindingKind::Action(action) => Ok(action),
            _ => Err(BindingError::TypeMismatch {
                label: binding.label.clone(),
            }),
        }
    }
}

/// Mesh whose material the panel edits: the descendant of `root` named
/// `target`, or the first mesh in depth-first order when no name is given.
pub fn find_material_mesh(scene: &SceneGraph, root: NodeId, target: Option<&str>) -> Option<NodeId> {
    std::iter::once(root)
        .chain(scene.descendants(root))
        .filter(|id| scene.node(*id).is_some_and(|node| node.mesh().is_some()))
        .find(|id| match target {
            Some(name) => scene.node(*id).is_some_and(|node| node.name == name),
            None => true,
        })
}

/// Adds one full turn about Y to the model root, starting from its current
/// rotation.
pub fn spin_model(
    scene: &SceneGraph,
    animator: &mut dyn Animator,
    model: NodeId,
    duration_secs: f32,
) -> Result<()> {
    let property = AnimatedProperty::Rotation(Axis::Y);
    let current = property
        .read(scene, model)
        .ok_or(BindingError::MissingNode(model.index()))?;
    animator.animate(
        model,
        property,
        current,
        current + std::f32::consts::TAU,
        duration_secs,
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animation::Tweener;
    use crate::scene::{FragmentNode, Geometry, Material, Mesh, ShadowFlags, Transform};
    use std::f32::consts::TAU;
    use std::sync::Arc;

    fn mesh_fragment(name: &str, color: Color) -> FragmentNode {
        FragmentNode {
            name: name.to_string(),
            transform: Transform::default(),
            mesh: Some(Mesh {
                geometry: Arc::new(Geometry::plane(1.0, 1.0)),
                material: Material {
                    name: format!("{name}Material"),
                    color,
                    ..Material::default()
                },
            }),
            children: Vec::new(),
        }
    }

    fn scene_with_model() -> (SceneGraph, NodeId) {
        let mut scene = SceneGraph::new();
        let mut model = FragmentNode::group("model");
        model.children.push(FragmentNode::group("Plinth"));
        model.children.push(mesh_fragment("Facade", Color::new(0.5, 0.25, 0.125)));
        model.children.push(mesh_fragment("Roof", Color::new(0.1, 0.1, 0.1)));
        let id = scene.attach_fragment(scene.root(), model, ShadowFlags::default());
        (scene, id)
    }

    fn bound_panel(scene: &SceneGraph, model: NodeId, target: Option<&str>) -> DebugPanel {
        let mut panel = DebugPanel::new();
        panel
            .register_model_bindings(scene, model, target, &PanelConfig::default())
            .unwrap();
        panel
    }

    #[derive(Default)]
    struct RecordingAnimator {
        calls: Vec<(NodeId, AnimatedProperty, f32, f32, f32)>,
    }

    impl Animator for RecordingAnimator {
        fn animate(&mut self, target: NodeId, property: AnimatedProperty, from: f32, to: f32, duration_secs: f32) {
            self.calls.push((target, property, from, to, duration_secs));
        }
    }

    #[test]
    fn numeric_edits_are_quantized_then_clamped() {
        let range = NumericRange {
            min: -3.0,
            max: 3.0,
            step: 0.01,
        };
        assert!((range.quantize(1.234) - 1.23).abs() < 1e-5);
        assert!((range.quantize(-2.016) + 2.02).abs() < 1e-5);
        assert_eq!(range.quantize(10.0), 3.0);
        assert_eq!(range.quantize(-7.5), -3.0);
    }

    #[test]
    fn position_binding_writes_through_to_node() {
        let (mut scene, model) = scene_with_model();
        let mut panel = bound_panel(&scene, model, None);
        let y = panel.find("y").unwrap();

        panel.write(&mut scene, y, BindingValue::Number(5.0)).unwrap();
        assert_eq!(scene.node(model).unwrap().transform.position.y, 3.0);
        assert_eq!(panel.read(&scene, y).unwrap(), BindingValue::Number(3.0));

        scene.node_mut(model).unwrap().transform.position.y = -1.5;
        assert_eq!(panel.read(&scene, y).unwrap(), BindingValue::Number(-1.5));
    }

    #[test]
    fn material_binds_to_first_mesh_by_default() {
        let (scene, model) = scene_with_model();
        let facade = scene.find_by_name("Facade").unwrap();
        assert_eq!(find_material_mesh(&scene, model, None), Some(facade));

        let roof = scene.find_by_name("Roof").unwrap();
        assert_eq!(find_material_mesh(&scene, model, Some("Roof")), Some(roof));
        assert_eq!(find_material_mesh(&scene, model, Some("Plinth")), None);
    }

    #[test]
    fn missing_material_mesh_keeps_other_bindings() {
        let (scene, model) = scene_with_model();
        let mut panel = DebugPanel::new();
        let err = panel
            .register_model_bindings(&scene, model, Some("Chimney"), &PanelConfig::default())
            .unwrap_err();
        assert!(matches!(err, BindingError::NoMaterialMesh { .. }));
        assert!(panel.find("x").is_some());
        assert!(panel.find("visible").is_some());
        assert!(panel.find("color").is_none());
        assert!(panel.find("wireframe").is_none());
    }

    #[test]
    fn color_edit_is_exact_and_isolated() {
        let (mut scene, model) = scene_with_model();
        let mut panel = bound_panel(&scene, model, Some("Facade"));
        let facade = scene.find_by_name("Facade").unwrap();
        let roof = scene.find_by_name("Roof").unwrap();
        let roof_before = scene.node(roof).unwrap().mesh().unwrap().material.clone();
        let facade_before = scene.node(facade).unwrap().mesh().unwrap().material.clone();
        let transform_before = scene.node(model).unwrap().transform;

        let color = panel.find("color").unwrap();
        panel.write(&mut scene, color, BindingValue::Color([12, 200, 99])).unwrap();

        let facade_after = &scene.node(facade).unwrap().mesh().unwrap().material;
        assert_eq!(facade_after.color, Color::from_srgb_bytes([12, 200, 99]));
        assert_eq!(facade_after.color.to_srgb_bytes(), [12, 200, 99]);
        assert_eq!(facade_after.metalness, facade_before.metalness);
        assert_eq!(facade_after.roughness, facade_before.roughness);
        assert_eq!(facade_after.wireframe, facade_before.wireframe);
        assert_eq!(scene.node(roof).unwrap().mesh().unwrap().material, roof_before);
        assert_eq!(scene.node(model).unwrap().transform, transform_before);
        assert_eq!(panel.params().color, [12, 200, 99]);
    }

    #[test]
    fn visibility_and_wireframe_toggle() {
        let (mut scene, model) = scene_with_model();
        let mut panel = bound_panel(&scene, model, None);
        let visible = panel.find("visible").unwrap();
        let wireframe = panel.find("wireframe").unwrap();

        panel.write(&mut scene, visible, BindingValue::Bool(false)).unwrap();
        panel.write(&mut scene, wireframe, BindingValue::Bool(true)).unwrap();
        assert!(!scene.node(model).unwrap().visible);
        let facade = scene.find_by_name("Facade").unwrap();
        assert!(scene.node(facade).unwrap().mesh().unwrap().material.wireframe);
    }

    #[test]
    fn mismatched_value_is_rejected() {
        let (mut scene, model) = scene_with_model();
        let mut panel = bound_panel(&scene, model, None);
        let x = panel.find("x").unwrap();
        let err = panel.write(&mut scene, x, BindingValue::Bool(true)).unwrap_err();
        assert_eq!(err, BindingError::TypeMismatch { label: "x".to_string() });
        assert_eq!(panel.action(panel.find("spin").unwrap()), Ok(PanelAction::Spin));
    }

    #[test]
    fn spin_of_missing_node_is_reported() {
        let (_, model) = scene_with_model();
        let empty = SceneGraph::new();
        let mut animator = RecordingAnimator::default();
        let err = spin_model(&empty, &mut animator, model, 4.0).unwrap_err();
        assert_eq!(err, BindingError::MissingNode(model.index()));
        assert!(animator.calls.is_empty());
    }

    #[test]
    fn each_spin_adds_a_full_turn() {
        let (mut scene, model) = scene_with_model();
        let mut animator = RecordingAnimator::default();

        spin_model(&scene, &mut animator, model, 4.0).unwrap();
        let (_, _, _, to, _) = animator.calls[0];
        AnimatedProperty::Rotation(Axis::Y).write(&mut scene, model, to);
        spin_model(&scene, &mut animator, model, 4.0).unwrap();

        assert_eq!(animator.calls.len(), 2);
        let (target, property, from, to, duration) = animator.calls[1];
        assert_eq!(target, model);
        assert_eq!(property, AnimatedProperty::Rotation(Axis::Y));
        assert!((from - TAU).abs() < 1e-6);
        assert!((to - 2.0 * TAU).abs() < 1e-6);
        assert_eq!(duration, 4.0);
    }

    #[test]
    fn two_completed_spins_end_two_turns_later() {
        let (mut scene, model) = scene_with_model();
        let mut tweener = Tweener::new();
        for _ in 0..2 {
            spin_model(&scene, &mut tweener, model, 1.0).unwrap();
            for _ in 0..90 {
                tweener.update(1.0 / 60.0, &mut scene);
            }
        }
        let rotation = scene.node(model).unwrap().transform.rotation.y;
        assert!((rotation - 2.0 * TAU).abs() < 1e-5);
    }
}
