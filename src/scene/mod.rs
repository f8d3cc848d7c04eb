pub mod assembly;
pub mod geometry;

pub use geometry::Geometry;

use glam::{EulerRot, Mat4, Quat, Vec3};
use std::collections::HashSet;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Linear RGB color.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Color {
    pub const WHITE: Color = Color {
        r: 1.0,
        g: 1.0,
        b: 1.0,
    };

    pub fn new(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }

    pub fn from_srgb_bytes(rgb: [u8; 3]) -> Self {
        Self {
            r: srgb_to_linear(rgb[0] as f32 / 255.0),
            g: srgb_to_linear(rgb[1] as f32 / 255.0),
            b: srgb_to_linear(rgb[2] as f32 / 255.0),
        }
    }

    pub fn from_srgb_hex(hex: u32) -> Self {
        Self::from_srgb_bytes([(hex >> 16) as u8, (hex >> 8) as u8, hex as u8])
    }

    pub fn to_srgb_bytes(self) -> [u8; 3] {
        let encode = |c: f32| (linear_to_srgb(c.clamp(0.0, 1.0)) * 255.0).round() as u8;
        [encode(self.r), encode(self.g), encode(self.b)]
    }

    pub fn scaled(self, factor: f32) -> [f32; 3] {
        [self.r * factor, self.g * factor, self.b * factor]
    }
}

fn srgb_to_linear(c: f32) -> f32 {
    if c <= 0.04045 {
        c / 12.92
    } else {
        ((c + 0.055) / 1.055).powf(2.4)
    }
}

fn linear_to_srgb(c: f32) -> f32 {
    if c <= 0.003_130_8 {
        c * 12.92
    } else {
        1.055 * c.powf(1.0 / 2.4) - 0.055
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Material {
    pub name: String,
    pub color: Color,
    pub metalness: f32,
    pub roughness: f32,
    pub wireframe: bool,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            name: String::new(),
            color: Color::WHITE,
            metalness: 0.0,
            roughness: 1.0,
            wireframe: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Mesh {
    pub geometry: Arc<Geometry>,
    pub material: Material,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AmbientLight {
    pub color: Color,
    pub intensity: f32,
}

/// Orthographic shadow camera bounds and map resolution, fixed at creation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShadowConfig {
    pub map_size: u32,
    pub near: f32,
    pub far: f32,
    pub left: f32,
    pub right: f32,
    pub top: f32,
    pub bottom: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DirectionalLight {
    pub color: Color,
    pub intensity: f32,
    pub target: Vec3,
    pub cast_shadow: bool,
    pub shadow: ShadowConfig,
}

#[derive(Debug, Clone)]
pub enum NodeKind {
    Group,
    Mesh(Mesh),
    AmbientLight(AmbientLight),
    DirectionalLight(DirectionalLight),
}

/// Position, XYZ Euler rotation in radians, scale.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Vec3,
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Vec3::ZERO,
            scale: Vec3::ONE,
        }
    }
}

impl Transform {
    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            ..Self::default()
        }
    }

    pub fn matrix(&self) -> Mat4 {
        let rotation = Quat::from_euler(
            EulerRot::XYZ,
            self.rotation.x,
            self.rotation.y,
            self.rotation.z,
        );
        Mat4::from_scale_rotation_translation(self.scale, rotation, self.position)
    }
}

#[derive(Debug, Clone)]
pub struct Node {
    pub name: String,
    pub transform: Transform,
    pub visible: bool,
    pub cast_shadow: bool,
    pub receive_shadow: bool,
    pub kind: NodeKind,
    children: Vec<NodeId>,
}

impl Node {
    pub fn new(name: impl Into<String>, kind: NodeKind) -> Self {
        Self {
            name: name.into(),
            transform: Transform::default(),
            visible: true,
            cast_shadow: false,
            receive_shadow: false,
            kind,
            children: Vec::new(),
        }
    }

    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.transform = transform;
        self
    }

    pub fn with_shadows(mut self, cast: bool, receive: bool) -> Self {
        self.cast_shadow = cast;
        self.receive_shadow = receive;
        self
    }

    pub fn mesh(&self) -> Option<&Mesh> {
        match &self.kind {
            NodeKind::Mesh(mesh) => Some(mesh),
            _ => None,
        }
    }

    pub fn material_mut(&mut self) -> Option<&mut Material> {
        match &mut self.kind {
            NodeKind::Mesh(mesh) => Some(&mut mesh.material),
            _ => None,
        }
    }
}

/// Detached subtree produced by an importer, attached with
/// [`SceneGraph::attach_fragment`].
#[derive(Debug, Clone)]
pub struct FragmentNode {
    pub name: String,
    pub transform: Transform,
    pub mesh: Option<Mesh>,
    pub children: Vec<FragmentNode>,
}

impl FragmentNode {
    pub fn group(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            transform: Transform::default(),
            mesh: None,
            children: Vec::new(),
        }
    }

    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(FragmentNode::node_count).sum::<usize>()
    }
}

/// Shadow flags applied to every mesh of an attached fragment.
#[derive(Debug, Clone, Copy, Default)]
pub struct ShadowFlags {
    pub cast: bool,
    pub receive: bool,
}

/// Node arena rooted at a single group. Nodes live as long as the graph.
#[derive(Debug, Clone)]
pub struct SceneGraph {
    nodes: Vec<Node>,
}

impl Default for SceneGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl SceneGraph {
    pub fn new() -> Self {
        Self {
            nodes: vec![Node::new("Scene", NodeKind::Group)],
        }
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0)
    }

    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id.0)
    }

    /// Inserts `node` under `parent`. An unknown parent falls back to the root.
    pub fn add_child(&mut self, parent: NodeId, mut node: Node) -> NodeId {
        let parent = if parent.0 < self.nodes.len() {
            parent
        } else {
            self.root()
        };
        let id = NodeId(self.nodes.len());
        node.children.clear();
        self.nodes.push(node);
        self.nodes[parent.0].children.push(id);
        id
    }

    pub fn add(&mut self, node: Node) -> NodeId {
        self.add_child(self.root(), node)
    }

    /// Attaches an imported subtree under `parent`, returning the id of its root.
    pub fn attach_fragment(
        &mut self,
        parent: NodeId,
        fragment: FragmentNode,
        shadows: ShadowFlags,
    ) -> NodeId {
        let FragmentNode {
            name,
            transform,
            mesh,
            children,
        } = fragment;
        let node = match mesh {
            Some(mesh) => {
                Node::new(name, NodeKind::Mesh(mesh)).with_shadows(shadows.cast, shadows.receive)
            }
            None => Node::new(name, NodeKind::Group),
        }
        .with_transform(transform);
        let id = self.add_child(parent, node);
        for child in children {
            self.attach_fragment(id, child, shadows);
        }
        id
    }

    /// Attaches `fragment` under `parent` with its root called `name`. Any
    /// other node already using `name`, inside the fragment or elsewhere in
    /// the scene, is renamed to the first free `name_N`.
    pub fn attach_named(
        &mut self,
        parent: NodeId,
        mut fragment: FragmentNode,
        name: &str,
        shadows: ShadowFlags,
    ) -> NodeId {
        fragment.name = name.to_string();
        let id = self.attach_fragment(parent, fragment, shadows);

        let mut taken: HashSet<String> = self.nodes.iter().map(|node| node.name.clone()).collect();
        let mut suffix = 0;
        for (index, node) in self.nodes.iter_mut().enumerate() {
            if index == id.0 || node.name != name {
                continue;
            }
            let renamed = loop {
                suffix += 1;
                let candidate = format!("{name}_{suffix}");
                if !taken.contains(&candidate) {
                    break candidate;
                }
            };
            log::warn!("Renamed node '{}' to '{}'", node.name, renamed);
            taken.insert(renamed.clone());
            node.name = renamed;
        }
        id
    }

    #[cfg(test)]
    pub fn find_by_name(&self, name: &str) -> Option<NodeId> {
        self.nodes
            .iter()
            .position(|node| node.name == name)
            .map(NodeId)
    }

    #[cfg(test)]
    pub fn count_named(&self, name: &str) -> usize {
        self.nodes.iter().filter(|node| node.name == name).count()
    }

    #[cfg(test)]
    pub fn parent_of(&self, id: NodeId) -> Option<NodeId> {
        self.nodes
            .iter()
            .position(|node| node.children.contains(&id))
            .map(NodeId)
    }

    #[cfg(test)]
    pub fn is_reachable(&self, id: NodeId) -> bool {
        id == self.root() || self.descendants(self.root()).contains(&id)
    }

    /// Depth-first descendants of `id`, excluding `id` itself.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = match self.node(id) {
            Some(node) => node.children.iter().rev().copied().collect(),
            None => return out,
        };
        while let Some(next) = stack.pop() {
            out.push(next);
            if let Some(node) = self.node(next) {
                stack.extend(node.children.iter().rev().copied());
            }
        }
        out
    }

    #[cfg(test)]
    pub fn world_matrix(&self, id: NodeId) -> Mat4 {
        let mut matrix = Mat4::IDENTITY;
        let mut current = Some(id);
        while let Some(node_id) = current {
            let Some(node) = self.node(node_id) else {
                break;
            };
            matrix = node.transform.matrix() * matrix;
            current = self.parent_of(node_id);
        }
        matrix
    }

    /// Visits every node whose ancestors are all visible, with its world matrix.
    pub fn visit_visible<F>(&self, mut visit: F)
    where
        F: FnMut(NodeId, &Node, Mat4),
    {
        let mut stack = vec![(self.root(), Mat4::IDENTITY)];
        while let Some((id, parent_matrix)) = stack.pop() {
            let Some(node) = self.node(id) else {
                continue;
            };
            if !node.visible {
                continue;
            }
            let world = parent_matrix * node.transform.matrix();
            visit(id, node, world);
            for child in node.children.iter().rev() {
                stack.push((*child, world));
            }
        }
    }

    pub fn ambient_light(&self) -> [f32; 3] {
        let mut total = [0.0; 3];
        self.visit_visible(|_, node, _| {
            if let NodeKind::AmbientLight(light) = &node.kind {
                let c = light.color.scaled(light.intensity);
                total = [total[0] + c[0], total[1] + c[1], total[2] + c[2]];
            }
        });
        total
    }

    /// First visible directional light with its world position.
    pub fn directional_light(&self) -> Option<(DirectionalLight, Vec3)> {
        let mut found = None;
        self.visit_visible(|_, node, world| {
            if found.is_some() {
                return;
            }
            if let NodeKind::DirectionalLight(light) = &node.kind {
                found = Some((*light, world.transform_point3(Vec3::ZERO)));
            }
        });
        found
    }
}
