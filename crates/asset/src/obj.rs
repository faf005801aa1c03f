//! Minimal OBJ parser and mesh builders.
//!
//! Parsing yields an intermediate [`ObjDocument`] (flat attribute arrays plus
//! per-face corner triples); the builders then emit either an indexed mesh
//! with bitwise vertex deduplication or a flat one-vertex-per-corner mesh.

use std::{
    collections::HashMap,
    fs::File,
    io::{self, BufRead, BufReader},
    path::{Path, PathBuf},
};

use thiserror::Error;

use crate::mesh::{FlatMeshData, MeshData, MeshVertex};

/// Normal applied to corners that carry no normal index.
const FALLBACK_NORMAL: [f32; 3] = [0.0, 0.0, 1.0];
/// Texture coordinate applied to corners that carry no texcoord index.
const FALLBACK_UV: [f32; 2] = [0.0, 0.0];

/// Errors produced while loading an OBJ document.
#[derive(Debug, Error)]
pub enum ObjError {
    #[error("failed to open OBJ file {}", path.display())]
    Io {
        path: PathBuf,
        source: io::Error,
    },
    #[error("failed to read line {line}")]
    Read {
        line: usize,
        source: io::Error,
    },
    #[error("line {line}: {message}")]
    Malformed { line: usize, message: String },
    #[error("non-triangle face with {corners} corners on line {line}")]
    NonTriangleFace { line: usize, corners: usize },
    #[error("OBJ contained no triangles")]
    NoTriangles,
    #[error("too many vertices in OBJ (more than {})", u32::MAX)]
    TooManyVertices,
}

/// How faces with a corner count other than 3 are treated.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FacePolicy {
    /// Any face that is not exactly a triangle is a hard failure.
    RequireTriangles,
    /// Fan-triangulate larger faces; skip degenerate ones (< 3 corners).
    Triangulate,
}

/// Load a deduplicated, indexed OBJ mesh from a file path.
pub fn load_obj_from_path(
    path: impl AsRef<Path>,
    policy: FacePolicy,
) -> Result<MeshData, ObjError> {
    load_obj_from_reader(open(path.as_ref())?, policy)
}

/// Load a deduplicated, indexed OBJ mesh from a [`BufRead`] implementation.
pub fn load_obj_from_reader<R: BufRead>(
    reader: R,
    policy: FacePolicy,
) -> Result<MeshData, ObjError> {
    build_indexed(&parse_obj(reader)?, policy)
}

/// Convenience helper to load an indexed mesh from an OBJ string literal.
pub fn load_obj_from_str(contents: &str, policy: FacePolicy) -> Result<MeshData, ObjError> {
    load_obj_from_reader(io::Cursor::new(contents), policy)
}

/// Load a flat (non-indexed, one vertex per corner) OBJ mesh from a file path.
pub fn load_flat_obj_from_path(
    path: impl AsRef<Path>,
    policy: FacePolicy,
) -> Result<FlatMeshData, ObjError> {
    load_flat_obj_from_reader(open(path.as_ref())?, policy)
}

/// Load a flat OBJ mesh from a [`BufRead`] implementation.
pub fn load_flat_obj_from_reader<R: BufRead>(
    reader: R,
    policy: FacePolicy,
) -> Result<FlatMeshData, ObjError> {
    build_flat(&parse_obj(reader)?, policy)
}

/// Convenience helper to load a flat mesh from an OBJ string literal.
pub fn load_flat_obj_from_str(
    contents: &str,
    policy: FacePolicy,
) -> Result<FlatMeshData, ObjError> {
    load_flat_obj_from_reader(io::Cursor::new(contents), policy)
}

fn open(path: &Path) -> Result<BufReader<File>, ObjError> {
    let file = File::open(path).map_err(|source| ObjError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(BufReader::new(file))
}

/// One face corner: resolved 0-based attribute indices.
#[derive(Clone, Copy, Debug)]
struct Corner {
    position: usize,
    texcoord: Option<usize>,
    normal: Option<usize>,
}

/// One `f` directive, with its source line for error reporting.
#[derive(Clone, Debug)]
struct Face {
    line: usize,
    corners: Vec<Corner>,
}

/// Parsed OBJ document: flat attribute arrays plus face corner triples.
#[derive(Clone, Debug, Default)]
struct ObjDocument {
    positions: Vec<[f32; 3]>,
    normals: Vec<[f32; 3]>,
    texcoords: Vec<[f32; 2]>,
    faces: Vec<Face>,
}

fn parse_obj<R: BufRead>(reader: R) -> Result<ObjDocument, ObjError> {
    let mut doc = ObjDocument::default();

    for (line_no, line) in reader.lines().enumerate() {
        let line_no = line_no + 1;
        let line = line.map_err(|source| ObjError::Read {
            line: line_no,
            source,
        })?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        let mut parts = trimmed.split_whitespace();
        let tag = parts.next().ok_or_else(|| ObjError::Malformed {
            line: line_no,
            message: format!("malformed line: '{trimmed}'"),
        })?;

        match tag {
            "v" => {
                let x = parse_f32(parts.next(), line_no, "x coordinate")?;
                let y = parse_f32(parts.next(), line_no, "y coordinate")?;
                let z = parse_f32(parts.next(), line_no, "z coordinate")?;
                doc.positions.push([x, y, z]);
            }
            "vt" => {
                let u = parse_f32(parts.next(), line_no, "u coordinate")?;
                let v = parse_f32(parts.next(), line_no, "v coordinate")?;
                doc.texcoords.push([u, v]);
            }
            "vn" => {
                let nx = parse_f32(parts.next(), line_no, "nx coordinate")?;
                let ny = parse_f32(parts.next(), line_no, "ny coordinate")?;
                let nz = parse_f32(parts.next(), line_no, "nz coordinate")?;
                doc.normals.push([nx, ny, nz]);
            }
            "f" => {
                let mut corners = Vec::new();
                for token in parts {
                    corners.push(parse_face_corner(token, &doc, line_no)?);
                }
                doc.faces.push(Face {
                    line: line_no,
                    corners,
                });
            }
            _ => {
                // Ignore other directives (o/g/s/usemtl/etc.)
            }
        }
    }

    Ok(doc)
}

fn parse_f32(value: Option<&str>, line: usize, what: &str) -> Result<f32, ObjError> {
    let token = value.ok_or_else(|| ObjError::Malformed {
        line,
        message: format!("missing {what}"),
    })?;
    token.parse::<f32>().map_err(|_| ObjError::Malformed {
        line,
        message: format!("failed to parse {what} from '{token}'"),
    })
}

/// Parse one face element (`v`, `v/vt`, `v//vn` or `v/vt/vn`), resolving
/// 1-based and negative indices against the attribute arrays seen so far.
fn parse_face_corner(token: &str, doc: &ObjDocument, line: usize) -> Result<Corner, ObjError> {
    let mut split = token.split('/');
    let pos = split.next().ok_or_else(|| ObjError::Malformed {
        line,
        message: format!("malformed face element '{token}'"),
    })?;
    let position = resolve_index(pos, doc.positions.len(), line)?;

    let texcoord = match split.next() {
        Some(value) if !value.is_empty() => Some(resolve_index(value, doc.texcoords.len(), line)?),
        _ => None,
    };

    let normal = match split.next() {
        Some(value) if !value.is_empty() => Some(resolve_index(value, doc.normals.len(), line)?),
        _ => None,
    };

    Ok(Corner {
        position,
        texcoord,
        normal,
    })
}

fn resolve_index(token: &str, len: usize, line: usize) -> Result<usize, ObjError> {
    let raw = token.parse::<i64>().map_err(|_| ObjError::Malformed {
        line,
        message: format!("invalid index '{token}'"),
    })?;
    if raw == 0 {
        return Err(ObjError::Malformed {
            line,
            message: "OBJ indices are 1-based; found 0".to_string(),
        });
    }

    let idx = if raw > 0 {
        raw - 1
    } else {
        len as i64 + raw
    };

    if idx < 0 || idx as usize >= len {
        return Err(ObjError::Malformed {
            line,
            message: format!("index {raw} resolved out of bounds (len={len})"),
        });
    }

    Ok(idx as usize)
}

/// Apply the face policy, yielding triangle corner triples.
fn triangulate(doc: &ObjDocument, policy: FacePolicy) -> Result<Vec<[Corner; 3]>, ObjError> {
    let mut triangles = Vec::new();
    for face in &doc.faces {
        let n = face.corners.len();
        match policy {
            FacePolicy::RequireTriangles => {
                if n != 3 {
                    return Err(ObjError::NonTriangleFace {
                        line: face.line,
                        corners: n,
                    });
                }
                triangles.push([face.corners[0], face.corners[1], face.corners[2]]);
            }
            FacePolicy::Triangulate => {
                if n < 3 {
                    continue;
                }
                // Triangulate fan
                for tri in 1..(n - 1) {
                    triangles.push([face.corners[0], face.corners[tri], face.corners[tri + 1]]);
                }
            }
        }
    }
    Ok(triangles)
}

/// Gather a corner's attributes, substituting fallbacks where it carries none.
fn resolve_corner(doc: &ObjDocument, corner: &Corner) -> MeshVertex {
    let position = doc.positions[corner.position];
    let normal = corner
        .normal
        .map(|i| doc.normals[i])
        .unwrap_or(FALLBACK_NORMAL);
    let uv = corner
        .texcoord
        .map(|i| doc.texcoords[i])
        .unwrap_or(FALLBACK_UV);
    MeshVertex::new(position, normal, uv)
}

/// Full bit pattern of a vertex. Interning on this makes dedup exact-bitwise:
/// `0.0`/`-0.0` stay distinct and a NaN pattern matches itself.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
struct VertexKey([u32; 8]);

impl VertexKey {
    fn of(v: &MeshVertex) -> Self {
        let [px, py, pz] = v.position;
        let [nx, ny, nz] = v.normal;
        let [tu, tv] = v.uv;
        Self([px, py, pz, nx, ny, nz, tu, tv].map(f32::to_bits))
    }
}

/// Build an indexed mesh, collapsing bitwise-identical vertices to one entry.
fn build_indexed(doc: &ObjDocument, policy: FacePolicy) -> Result<MeshData, ObjError> {
    let mut unique: HashMap<VertexKey, u32> = HashMap::new();
    let mut vertices: Vec<MeshVertex> = Vec::new();
    let mut indices: Vec<u32> = Vec::new();

    for triangle in triangulate(doc, policy)? {
        for corner in &triangle {
            let vertex = resolve_corner(doc, corner);
            let key = VertexKey::of(&vertex);
            let index = match unique.get(&key) {
                Some(&idx) => idx,
                None => {
                    let idx = u32::try_from(vertices.len())
                        .map_err(|_| ObjError::TooManyVertices)?;
                    vertices.push(vertex);
                    unique.insert(key, idx);
                    idx
                }
            };
            indices.push(index);
        }
    }

    if vertices.is_empty() || indices.is_empty() {
        return Err(ObjError::NoTriangles);
    }

    log::debug!(
        "OBJ indexed mesh: {} vertices, {} indices",
        vertices.len(),
        indices.len()
    );
    Ok(MeshData::new(vertices, indices))
}

/// Build a flat mesh: one vertex per corner, no index buffer.
fn build_flat(doc: &ObjDocument, policy: FacePolicy) -> Result<FlatMeshData, ObjError> {
    let mut vertices: Vec<MeshVertex> = Vec::new();

    for triangle in triangulate(doc, policy)? {
        for corner in &triangle {
            vertices.push(resolve_corner(doc, corner));
        }
    }

    if vertices.is_empty() {
        return Err(ObjError::NoTriangles);
    }

    log::debug!("OBJ flat mesh: {} vertices", vertices.len());
    Ok(FlatMeshData::new(vertices))
}

#[cfg(test)]
mod tests {
    use super::*;

    const CUBE: &str = r#"
        v -1.0 -1.0 -1.0
        v  1.0 -1.0 -1.0
        v  1.0  1.0 -1.0
        v -1.0  1.0 -1.0
        v -1.0 -1.0  1.0
        v  1.0 -1.0  1.0
        v  1.0  1.0  1.0
        v -1.0  1.0  1.0
        vn  0.0  0.0 -1.0
        vn  0.0  0.0  1.0
        vn  0.0 -1.0  0.0
        vn  0.0  1.0  0.0
        vn -1.0  0.0  0.0
        vn  1.0  0.0  0.0
        f 5//2 6//2 7//2
        f 5//2 7//2 8//2
        f 1//1 3//1 2//1
        f 1//1 4//1 3//1
        f 1//3 2//3 6//3
        f 1//3 6//3 5//3
        f 4//4 7//4 3//4
        f 4//4 8//4 7//4
        f 1//5 5//5 8//5
        f 1//5 8//5 4//5
        f 2//6 3//6 7//6
        f 2//6 7//6 6//6
    "#;

    #[test]
    fn parse_simple_triangle() {
        let src = r#"
            v 0.0 0.0 0.0
            v 1.0 0.0 0.0
            v 0.0 1.0 0.0
            vn 0.0 0.0 1.0
            vt 0.0 0.0
            vt 1.0 0.0
            vt 0.0 1.0
            f 1/1/1 2/2/1 3/3/1
        "#;
        let mesh = load_obj_from_str(src, FacePolicy::Triangulate).expect("parse triangle");
        assert_eq!(mesh.vertices.len(), 3);
        assert_eq!(mesh.indices.len(), 3);
        assert!(mesh.is_valid());
    }

    #[test]
    fn indexed_mesh_emits_three_indices_per_face() {
        let mesh = load_obj_from_str(CUBE, FacePolicy::Triangulate).expect("parse cube");
        assert_eq!(mesh.indices.len(), 3 * 12);
        assert!(
            mesh.indices
                .iter()
                .all(|&i| (i as usize) < mesh.vertices.len())
        );
    }

    #[test]
    fn identical_corners_collapse_to_one_vertex() {
        let src = r#"
            v 0.5 0.5 0.5
            vt 0.25 0.75
            vn 0.0 1.0 0.0
            f 1/1/1 1/1/1 1/1/1
            f 1/1/1 1/1/1 1/1/1
        "#;
        let mesh = load_obj_from_str(src, FacePolicy::Triangulate).expect("parse");
        assert_eq!(mesh.vertices.len(), 1);
        assert_eq!(mesh.indices.len(), 6);
        assert!(mesh.indices.iter().all(|&i| i == 0));
    }

    #[test]
    fn distinct_corners_do_not_collapse() {
        let src = r#"
            v 0.0 0.0 0.0
            v 1.0 0.0 0.0
            v 0.0 1.0 0.0
            v 2.0 0.0 0.0
            v 3.0 0.0 0.0
            v 2.0 1.0 0.0
            f 1 2 3
            f 4 5 6
        "#;
        let mesh = load_obj_from_str(src, FacePolicy::Triangulate).expect("parse");
        assert_eq!(mesh.vertices.len(), mesh.indices.len());
    }

    #[test]
    fn corners_without_attributes_use_fallbacks() {
        let src = r#"
            v 0.0 0.0 0.0
            v 1.0 0.0 0.0
            v 0.0 1.0 0.0
            f 1 2 3
        "#;
        let mesh = load_obj_from_str(src, FacePolicy::Triangulate).expect("parse");
        for vertex in &mesh.vertices {
            assert_eq!(vertex.normal, [0.0, 0.0, 1.0]);
            assert_eq!(vertex.uv, [0.0, 0.0]);
        }
    }

    #[test]
    fn quad_is_rejected_when_triangles_are_required() {
        let src = r#"
            v 0.0 0.0 0.0
            v 1.0 0.0 0.0
            v 1.0 1.0 0.0
            v 0.0 1.0 0.0
            f 1 2 3 4
        "#;
        let err = load_obj_from_str(src, FacePolicy::RequireTriangles).unwrap_err();
        assert!(matches!(
            err,
            ObjError::NonTriangleFace { corners: 4, line: 6 }
        ));
    }

    #[test]
    fn quad_is_fan_triangulated() {
        let src = r#"
            v 0.0 0.0 0.0
            v 1.0 0.0 0.0
            v 1.0 1.0 0.0
            v 0.0 1.0 0.0
            f 1 2 3 4
        "#;
        let mesh = load_obj_from_str(src, FacePolicy::Triangulate).expect("parse");
        assert_eq!(mesh.vertices.len(), 4);
        assert_eq!(mesh.indices, vec![0, 1, 2, 0, 2, 3]);
    }

    #[test]
    fn degenerate_face_fails_strict_policy() {
        let src = r#"
            v 0.0 0.0 0.0
            v 1.0 0.0 0.0
            f 1 2
        "#;
        let err = load_obj_from_str(src, FacePolicy::RequireTriangles).unwrap_err();
        assert!(matches!(err, ObjError::NonTriangleFace { corners: 2, .. }));
    }

    #[test]
    fn only_degenerate_faces_yield_no_triangles() {
        let src = r#"
            v 0.0 0.0 0.0
            v 1.0 0.0 0.0
            f 1 2
        "#;
        let err = load_obj_from_str(src, FacePolicy::Triangulate).unwrap_err();
        assert!(matches!(err, ObjError::NoTriangles));
    }

    #[test]
    fn cube_dedups_to_one_vertex_per_position_normal_pair() {
        let mesh = load_obj_from_str(CUBE, FacePolicy::Triangulate).expect("parse cube");
        // 8 positions x 3 incident face normals each.
        assert_eq!(mesh.vertices.len(), 24);
        assert_eq!(mesh.indices.len(), 36);
        assert!(mesh.is_valid());
    }

    #[test]
    fn flat_cube_keeps_one_vertex_per_corner() {
        let mesh = load_flat_obj_from_str(CUBE, FacePolicy::RequireTriangles).expect("parse cube");
        assert_eq!(mesh.vertices.len(), 36);
        assert!(mesh.is_valid());
    }

    #[test]
    fn flat_loader_applies_strict_policy() {
        let src = r#"
            v 0.0 0.0 0.0
            v 1.0 0.0 0.0
            v 1.0 1.0 0.0
            v 0.0 1.0 0.0
            f 1 2 3 4
        "#;
        let err = load_flat_obj_from_str(src, FacePolicy::RequireTriangles).unwrap_err();
        assert!(matches!(err, ObjError::NonTriangleFace { corners: 4, .. }));
    }

    #[test]
    fn negative_zero_does_not_collapse_with_positive_zero() {
        let src = r#"
            v 0.0 0.0 0.0
            v 1.0 0.0 0.0
            v 0.0 1.0 0.0
            v -0.0 0.0 0.0
            f 1 2 3
            f 4 2 3
        "#;
        let mesh = load_obj_from_str(src, FacePolicy::Triangulate).expect("parse");
        // Bitwise keying keeps 0.0 and -0.0 apart.
        assert_eq!(mesh.vertices.len(), 4);
        assert_eq!(mesh.indices.len(), 6);
    }

    #[test]
    fn negative_indices_resolve_relative_to_end() {
        let src = r#"
            v 0.0 0.0 0.0
            v 1.0 0.0 0.0
            v 0.0 1.0 0.0
            f -3 -2 -1
        "#;
        let mesh = load_obj_from_str(src, FacePolicy::Triangulate).expect("parse");
        assert_eq!(mesh.vertices.len(), 3);
        assert_eq!(mesh.vertices[0].position, [0.0, 0.0, 0.0]);
        assert_eq!(mesh.vertices[2].position, [0.0, 1.0, 0.0]);
    }

    #[test]
    fn zero_index_is_rejected() {
        let src = "v 0.0 0.0 0.0\nf 0 0 0\n";
        let err = load_obj_from_str(src, FacePolicy::Triangulate).unwrap_err();
        assert!(matches!(err, ObjError::Malformed { line: 2, .. }));
    }

    #[test]
    fn out_of_bounds_index_is_rejected() {
        let src = "v 0.0 0.0 0.0\nf 1 2 3\n";
        let err = load_obj_from_str(src, FacePolicy::Triangulate).unwrap_err();
        assert!(matches!(err, ObjError::Malformed { line: 2, .. }));
    }

    #[test]
    fn malformed_coordinate_is_rejected() {
        let src = "v 0.0 nope 0.0\n";
        let err = load_obj_from_str(src, FacePolicy::Triangulate).unwrap_err();
        assert!(matches!(err, ObjError::Malformed { line: 1, .. }));
    }

    #[test]
    fn missing_file_reports_io_error() {
        let err =
            load_obj_from_path("definitely/not/here.obj", FacePolicy::Triangulate).unwrap_err();
        assert!(matches!(err, ObjError::Io { .. }));
    }

    #[test]
    fn empty_document_yields_no_triangles() {
        let err = load_obj_from_str("# nothing here\n", FacePolicy::Triangulate).unwrap_err();
        assert!(matches!(err, ObjError::NoTriangles));
    }
}
