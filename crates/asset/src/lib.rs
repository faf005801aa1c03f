//! Asset loading/parsers (meshes, textures).
//! Minimal OBJ mesh loaders producing CPU-friendly mesh data,
//! plus RGBA8 texture loading.

pub mod mesh;
pub mod obj;
pub mod texture;

pub use mesh::{FlatMeshData, MeshData, MeshVertex};
pub use obj::{FacePolicy, ObjError};
pub use texture::TextureData;
