use crate::scene::{Geometry, Material, NodeId, SceneGraph};
use glam::Mat4;
use std::sync::Arc;
use wgpu::util::DeviceExt;

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
}

impl Vertex {
    const ATTRIBUTES: [wgpu::VertexAttribute; 2] =
        wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x3];
    const POSITION_ATTRIBUTES: [wgpu::VertexAttribute; 1] =
        wgpu::vertex_attr_array![0 => Float32x3];

    pub fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Vertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBUTES,
        }
    }

    /// Position only, for the depth-only shadow pass.
    pub fn position_layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Vertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::POSITION_ATTRIBUTES,
        }
    }
}

pub fn interleave(geometry: &Geometry) -> Vec<Vertex> {
    geometry
        .positions
        .iter()
        .enumerate()
        .map(|(index, position)| Vertex {
            position: *position,
            normal: geometry.normals.get(index).copied().unwrap_or([0.0, 1.0, 0.0]),
        })
        .collect()
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ObjectUniform {
    pub model: [[f32; 4]; 4],
    pub normal: [[f32; 4]; 4],
    pub color: [f32; 4],
    /// metalness, roughness, receive_shadow, unused
    pub params: [f32; 4],
}

impl ObjectUniform {
    pub fn new(world: Mat4, material: &Material, receive_shadow: bool) -> Self {
        let normal = if world.determinant().abs() > f32::EPSILON {
            world.inverse().transpose()
        } else {
            Mat4::IDENTITY
        };
        Self {
            model: world.to_cols_array_2d(),
            normal: normal.to_cols_array_2d(),
            color: [material.color.r, material.color.g, material.color.b, 1.0],
            params: [
                material.metalness,
                material.roughness,
                if receive_shadow { 1.0 } else { 0.0 },
                0.0,
            ],
        }
    }
}

/// A visible mesh node ready to draw this frame.
#[derive(Debug, Clone)]
pub struct DrawItem {
    pub node: NodeId,
    pub world: Mat4,
    pub geometry: Arc<Geometry>,
    pub material: Material,
    pub cast_shadow: bool,
    pub receive_shadow: bool,
}

pub fn collect_draws(scene: &SceneGraph) -> Vec<DrawItem> {
    let mut draws = Vec::new();
    scene.visit_visible(|id, node, world| {
        let Some(mesh) = node.mesh() else {
            return;
        };
        if mesh.geometry.indices.is_empty() {
            return;
        }
        draws.push(DrawItem {
            node: id,
            world,
            geometry: Arc::clone(&mesh.geometry),
            material: mesh.material.clone(),
            cast_shadow: node.cast_shadow,
            receive_shadow: node.receive_shadow,
        });
    });
    draws
}

/// GPU buffers for one scene node. Rebuilt when the node's geometry changes.
pub struct GpuMesh {
    source: Arc<Geometry>,
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    index_count: u32,
    edge_buffer: wgpu::Buffer,
    edge_count: u32,
    uniform_buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
}

impl GpuMesh {
    pub fn new(
        device: &wgpu::Device,
        object_layout: &wgpu::BindGroupLayout,
        geometry: &Arc<Geometry>,
        label: &str,
    ) -> Self {
        let vertices = interleave(geometry);
        let edges = geometry.edge_indices();
        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(label),
            contents: bytemuck::cast_slice(&vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(label),
            contents: bytemuck::cast_slice(&geometry.indices),
            usage: wgpu::BufferUsages::INDEX,
        });
        let edge_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(label),
            contents: bytemuck::cast_slice(&edges),
            usage: wgpu::BufferUsages::INDEX,
        });
        let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(label),
            size: std::mem::size_of::<ObjectUniform>() as wgpu::BufferAddress,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(label),
            layout: object_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
        });

        Self {
            source: Arc::clone(geometry),
            vertex_buffer,
            index_buffer,
            index_count: geometry.indices.len() as u32,
            edge_buffer,
            edge_count: edges.len() as u32,
            uniform_buffer,
            bind_group,
        }
    }

    pub fn matches(&self, geometry: &Arc<Geometry>) -> bool {
        Arc::ptr_eq(&self.source, geometry)
    }

    pub fn write_uniform(&self, queue: &wgpu::Queue, uniform: &ObjectUniform) {
        queue.write_buffer(&self.uniform_buffer, 0, bytemuck::bytes_of(uniform));
    }

    pub fn draw_triangles(&self, pass: &mut wgpu::RenderPass<'_>) {
        if self.index_count == 0 {
            return;
        }
        pass.set_bind_group(1, &self.bind_group, &[]);
        pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
        pass.set_index_buffer(self.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
        pass.draw_indexed(0..self.index_count, 0, 0..1);
    }

    pub fn draw_edges(&self, pass: &mut wgpu::RenderPass<'_>) {
        if self.edge_count == 0 {
            return;
        }
        pass.set_bind_group(1, &self.bind_group, &[]);
        pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
        pass.set_index_buffer(self.edge_buffer.slice(..), wgpu::IndexFormat::Uint32);
        pass.draw_indexed(0..self.edge_count, 0, 0..1);
    }
}
