//! Startup scene: floor, ambient light and a shadow-casting directional light.

use super::{
    AmbientLight, Color, DirectionalLight, Geometry, Material, Mesh, Node, NodeKind, SceneGraph,
    ShadowConfig, Transform,
};
use crate::config::SceneConfig;
use glam::Vec3;
use std::sync::Arc;

pub const FLOOR_NAME: &str = "Floor";
pub const AMBIENT_LIGHT_NAME: &str = "AmbientLight";
pub const DIRECTIONAL_LIGHT_NAME: &str = "DirectionalLight";

pub fn floor_node() -> Node {
    let mesh = Mesh {
        geometry: Arc::new(Geometry::plane(10.0, 10.0)),
        material: Material {
            name: "FloorMaterial".to_string(),
            color: Color::from_srgb_hex(0x444444),
            metalness: 0.0,
            roughness: 0.5,
            wireframe: false,
        },
    };
    Node::new(FLOOR_NAME, NodeKind::Mesh(mesh))
        .with_transform(Transform {
            rotation: Vec3::new(-std::f32::consts::FRAC_PI_2, 0.0, 0.0),
            ..Transform::default()
        })
        .with_shadows(false, true)
}

pub fn ambient_light_node() -> Node {
    Node::new(
        AMBIENT_LIGHT_NAME,
        NodeKind::AmbientLight(AmbientLight {
            color: Color::WHITE,
            intensity: 0.8,
        }),
    )
}

pub fn directional_light_node() -> Node {
    let light = DirectionalLight {
        color: Color::WHITE,
        intensity: 0.6,
        target: Vec3::ZERO,
        cast_shadow: true,
        shadow: ShadowConfig {
            map_size: 1024,
            near: 0.5,
            far: 15.0,
            left: -7.0,
            right: 7.0,
            top: 7.0,
            bottom: -7.0,
        },
    };
    Node::new(DIRECTIONAL_LIGHT_NAME, NodeKind::DirectionalLight(light))
        .with_transform(Transform::from_position(Vec3::new(5.0, 5.0, 5.0)))
}

pub fn assemble_scene(config: &SceneConfig) -> SceneGraph {
    let mut scene = SceneGraph::new();
    if config.show_floor {
        scene.add(floor_node());
    } else {
        log::debug!("Floor disabled by config");
    }
    scene.add(ambient_light_node());
    scene.add(directional_light_node());
    log::info!("Scene assembled with {} nodes", scene.len());
    scene
}
