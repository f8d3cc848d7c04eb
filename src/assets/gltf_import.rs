use super::AssetError;
use crate::scene::{geometry, Color, FragmentNode, Geometry, Material, Mesh, Transform};
use glam::{EulerRot, Quat, Vec3};
use std::path::Path;
use std::sync::Arc;

/// Decoded model: the glTF scene's top-level nodes under one group.
#[derive(Debug, Clone)]
pub struct ImportedModel {
    pub root: FragmentNode,
}

impl ImportedModel {
    pub fn mesh_count(&self) -> usize {
        fn count(node: &FragmentNode) -> usize {
            usize::from(node.mesh.is_some()) + node.children.iter().map(count).sum::<usize>()
        }
        count(&self.root)
    }
}

/// Decodes glTF JSON or GLB bytes. External buffers resolve against `base_dir`.
pub fn decode_gltf(bytes: &[u8], base_dir: Option<&Path>) -> Result<ImportedModel, AssetError> {
    let gltf::Gltf { document, blob } = gltf::Gltf::from_slice(bytes)?;
    let buffers = gltf::import_buffers(&document, base_dir, blob)?;
    let scene = document
        .default_scene()
        .or_else(|| document.scenes().next())
        .ok_or(AssetError::NoScene)?;

    let mut root = FragmentNode::group(scene.name().unwrap_or("Scene"));
    for node in scene.nodes() {
        root.children.push(convert_node(&node, &buffers)?);
    }
    Ok(ImportedModel { root })
}

fn convert_node(
    node: &gltf::Node,
    buffers: &[gltf::buffer::Data],
) -> Result<FragmentNode, AssetError> {
    let (translation, rotation, scale) = node.transform().decomposed();
    let (rx, ry, rz) = Quat::from_array(rotation).to_euler(EulerRot::XYZ);
    let name = node
        .name()
        .map(str::to_string)
        .unwrap_or_else(|| format!("node_{}", node.index()));

    let mut fragment = FragmentNode {
        name,
        transform: Transform {
            position: Vec3::from_array(translation),
            rotation: Vec3::new(rx, ry, rz),
            scale: Vec3::from_array(scale),
        },
        mesh: None,
        children: Vec::new(),
    };

    if let Some(mesh) = node.mesh() {
        let mesh_name = mesh
            .name()
            .map(str::to_string)
            .unwrap_or_else(|| format!("mesh_{}", mesh.index()));
        let mut meshes = Vec::new();
        for primitive in mesh.primitives() {
            if let Some(converted) = convert_primitive(&primitive, buffers, &mesh_name)? {
                meshes.push(converted);
            }
        }
        if meshes.len() == 1 {
            fragment.mesh = meshes.pop();
        } else {
            for (index, converted) in meshes.into_iter().enumerate() {
                fragment.children.push(FragmentNode {
                    name: format!("{}_{}", mesh_name, index),
                    transform: Transform::default(),
                    mesh: Some(converted),
                    children: Vec::new(),
                });
            }
        }
    }

    for child in node.children() {
        fragment.children.push(convert_node(&child, buffers)?);
    }
    Ok(fragment)
}

fn convert_primitive(
    primitive: &gltf::Primitive,
    buffers: &[gltf::buffer::Data],
    mesh_name: &str,
) -> Result<Option<Mesh>, AssetError> {
    if primitive.mode() != gltf::mesh::Mode::Triangles {
        log::warn!(
            "Skipping primitive {} of '{}': mode {:?} is not supported",
            primitive.index(),
            mesh_name,
            primitive.mode()
        );
        return Ok(None);
    }

    let reader = primitive.reader(|buffer| buffers.get(buffer.index()).map(|data| data.0.as_slice()));
    let positions: Vec<[f32; 3]> = reader
        .read_positions()
        .ok_or_else(|| AssetError::MissingPositions {
            mesh: mesh_name.to_string(),
        })?
        .collect();
    let indices: Vec<u32> = match reader.read_indices() {
        Some(indices) => indices.into_u32().collect(),
        None => (0..positions.len() as u32).collect(),
    };
    let normals: Vec<[f32; 3]> = match reader.read_normals() {
        Some(normals) => normals.collect(),
        None => geometry::compute_vertex_normals(&positions, &indices),
    };

    let material = primitive.material();
    let pbr = material.pbr_metallic_roughness();
    let [r, g, b, _a] = pbr.base_color_factor();

    Ok(Some(Mesh {
        geometry: Arc::new(Geometry {
            positions,
            normals,
            indices,
        }),
        material: Material {
            name: material.name().unwrap_or("default").to_string(),
            color: Color::new(r, g, b),
            metalness: pbr.metallic_factor(),
            roughness: pbr.roughness_factor(),
            wireframe: false,
        },
    }))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub const QUAD_GLTF: &str = include_str!("testdata/quad.gltf");

    #[test]
    fn decodes_embedded_quad() {
        let model = decode_gltf(QUAD_GLTF.as_bytes(), None).unwrap();
        assert_eq!(model.root.name, "Scene");
        assert_eq!(model.root.children.len(), 1);

        let building = &model.root.children[0];
        assert_eq!(building.name, "Building");
        assert_eq!(building.transform.position, Vec3::new(0.0, 0.5, 0.0));
        let names: Vec<&str> = building.children.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, ["Plinth", "Facade"]);
        assert_eq!(model.mesh_count(), 1);

        let facade = building.children[1].mesh.as_ref().unwrap();
        assert_eq!(facade.geometry.positions.len(), 4);
        assert_eq!(facade.geometry.indices, vec![0, 1, 2, 2, 1, 3]);
        assert_eq!(facade.geometry.normals.len(), 4);
        assert_eq!(facade.material.name, "Concrete");
        assert_eq!(facade.material.color, Color::new(0.5, 0.25, 0.125));
        assert!((facade.material.metalness - 0.1).abs() < 1e-6);
        assert!((facade.material.roughness - 0.8).abs() < 1e-6);
    }

    #[test]
    fn garbage_bytes_fail_to_decode() {
        let err = decode_gltf(b"not a model", None).unwrap_err();
        assert!(matches!(err, AssetError::Gltf(_)));
    }
}
