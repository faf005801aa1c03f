//! CPU-side mesh representation used by loaders.

/// Vertex with position/normal/uv. Values are in object space.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct MeshVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
}

impl MeshVertex {
    pub fn new(position: [f32; 3], normal: [f32; 3], uv: [f32; 2]) -> Self {
        Self {
            position,
            normal,
            uv,
        }
    }
}

/// Indexed triangle mesh with deduplicated, tightly-packed vertices.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MeshData {
    pub vertices: Vec<MeshVertex>,
    pub indices: Vec<u32>,
}

impl MeshData {
    pub fn new(vertices: Vec<MeshVertex>, indices: Vec<u32>) -> Self {
        Self { vertices, indices }
    }

    /// Returns `true` if both buffers are non-empty and every index is in bounds.
    pub fn is_valid(&self) -> bool {
        !self.vertices.is_empty()
            && !self.indices.is_empty()
            && self
                .indices
                .iter()
                .all(|&i| (i as usize) < self.vertices.len())
    }
}

/// Non-indexed triangle mesh: one vertex per face corner, duplicates allowed.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FlatMeshData {
    pub vertices: Vec<MeshVertex>,
}

impl FlatMeshData {
    pub fn new(vertices: Vec<MeshVertex>) -> Self {
        Self { vertices }
    }

    /// Returns `true` if the buffer is non-empty and holds whole triangles.
    pub fn is_valid(&self) -> bool {
        !self.vertices.is_empty() && self.vertices.len() % 3 == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mesh_data_validity() {
        let data = MeshData::new(vec![MeshVertex::default()], vec![0]);
        assert!(data.is_valid());
    }

    #[test]
    fn mesh_data_rejects_out_of_bounds_index() {
        let data = MeshData::new(vec![MeshVertex::default()], vec![0, 1]);
        assert!(!data.is_valid());
    }

    #[test]
    fn flat_mesh_requires_whole_triangles() {
        let tri = FlatMeshData::new(vec![MeshVertex::default(); 3]);
        assert!(tri.is_valid());
        let partial = FlatMeshData::new(vec![MeshVertex::default(); 4]);
        assert!(!partial.is_valid());
        assert!(!FlatMeshData::default().is_valid());
    }
}
