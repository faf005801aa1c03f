//! Entry point for the OBJ viewer.
//! Loads the model (and texture) up front, then hands off to the platform
//! event loop.

use anyhow::{Context, Result};

use asset::{FacePolicy, TextureData, obj};
use renderer::{Scene, SceneMesh};

const DEFAULT_MODEL: &str = "cube.obj";
const DEFAULT_TEXTURE: &str = "textures/texture.png";
const DEFAULT_WIDTH: u32 = 800;
const DEFAULT_HEIGHT: u32 = 600;

/// Base color of the flat (untextured) variant.
const FLAT_COLOR: [f32; 3] = [1.0, 0.5, 0.0];

/// Which of the two viewer variants to run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum DrawMode {
    /// Deduplicated vertices, indexed draw, diffuse texture. Non-triangle
    /// faces are fan-triangulated.
    Indexed,
    /// One vertex per corner, non-indexed draw, solid orange. Non-triangle
    /// faces are rejected.
    Flat,
}

fn parse_backend_arg() -> wgpu::Backends {
    // Accept: --gpu-backend=auto|vulkan|dx12|metal|gl
    let mut backends = wgpu::Backends::all(); // default = auto
    for arg in std::env::args() {
        if let Some(val) = arg.strip_prefix("--gpu-backend=") {
            backends = match val.to_ascii_lowercase().as_str() {
                "auto" => wgpu::Backends::all(),
                "vulkan" | "vk" => wgpu::Backends::VULKAN,
                "dx12" | "d3d12" => wgpu::Backends::DX12,
                "metal" | "mtl" => wgpu::Backends::METAL,
                "gl" | "opengl" | "gles" => wgpu::Backends::GL,
                other => {
                    eprintln!("[warn] Unknown backend '{}', falling back to auto.", other);
                    wgpu::Backends::all()
                }
            };
        }
    }
    backends
}

fn parse_draw_mode_arg() -> DrawMode {
    // --draw-mode=indexed|flat, default indexed
    for arg in std::env::args() {
        if let Some(val) = arg.strip_prefix("--draw-mode=") {
            return match val.to_ascii_lowercase().as_str() {
                "flat" => DrawMode::Flat,
                "indexed" => DrawMode::Indexed,
                other => {
                    eprintln!("[warn] Unknown draw mode '{}', using indexed.", other);
                    DrawMode::Indexed
                }
            };
        }
    }
    DrawMode::Indexed
}

fn parse_path_arg(prefix: &str, default: &str) -> String {
    for arg in std::env::args() {
        if let Some(val) = arg.strip_prefix(prefix) {
            if !val.is_empty() {
                return val.to_string();
            }
        }
    }
    default.to_string()
}

fn parse_size_args() -> (u32, u32) {
    let mut w: Option<u32> = None;
    let mut h: Option<u32> = None;

    for arg in std::env::args() {
        if let Some(v) = arg.strip_prefix("--size=") {
            if let Some((sw, sh)) = v.split_once('x').or_else(|| v.split_once('X')) {
                if let (Ok(pw), Ok(ph)) = (sw.parse::<u32>(), sh.parse::<u32>()) {
                    w = Some(pw);
                    h = Some(ph);
                }
            }
        } else if let Some(v) = arg.strip_prefix("--width=") {
            if let Ok(pw) = v.parse::<u32>() {
                w = Some(pw);
            }
        } else if let Some(v) = arg.strip_prefix("--height=") {
            if let Ok(ph) = v.parse::<u32>() {
                h = Some(ph);
            }
        }
    }

    let ww = w.unwrap_or(DEFAULT_WIDTH).max(1);
    let hh = h.unwrap_or(DEFAULT_HEIGHT).max(1);
    (ww, hh)
}

/// Load mesh and texture for the chosen variant. Blocks until complete; any
/// failure here aborts startup.
fn load_scene(mode: DrawMode, model_path: &str, texture_path: &str) -> Result<Scene> {
    match mode {
        DrawMode::Indexed => {
            let mesh = obj::load_obj_from_path(model_path, FacePolicy::Triangulate)
                .with_context(|| format!("Failed to load OBJ model '{model_path}'"))?;
            log::info!(
                "Loaded '{}': {} vertices, {} indices (deduplicated)",
                model_path,
                mesh.vertices.len(),
                mesh.indices.len()
            );
            let texture = TextureData::load_image(texture_path)
                .with_context(|| format!("Failed to load texture '{texture_path}'"))?;
            Ok(Scene {
                mesh: SceneMesh::Indexed(mesh),
                texture,
                base_color: [1.0, 1.0, 1.0],
            })
        }
        DrawMode::Flat => {
            let mesh = obj::load_flat_obj_from_path(model_path, FacePolicy::RequireTriangles)
                .with_context(|| format!("Failed to load OBJ model '{model_path}'"))?;
            log::info!(
                "Loaded '{}': {} vertices (flat, non-indexed)",
                model_path,
                mesh.vertices.len()
            );
            Ok(Scene {
                mesh: SceneMesh::Flat(mesh),
                texture: TextureData::solid_rgba8(1, 1, [255, 255, 255, 255]),
                base_color: FLAT_COLOR,
            })
        }
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let backends = parse_backend_arg();
    let mode = parse_draw_mode_arg();
    let model_path = parse_path_arg("--model=", DEFAULT_MODEL);
    let texture_path = parse_path_arg("--texture=", DEFAULT_TEXTURE);
    let (width, height) = parse_size_args();
    log::info!(
        "Starting OBJ viewer. Backend: {:?}, mode={:?}, model='{}', window_size={}x{}",
        backends,
        mode,
        model_path,
        width,
        height
    );

    let scene = load_scene(mode, &model_path, &texture_path)?;

    let title = match mode {
        DrawMode::Indexed => "OBJ Textured Viewer",
        DrawMode::Flat => "OBJ Viewer",
    };
    platform::run(backends, title, width, height, scene)?;

    log::info!("Graceful shutdown. Bye!");
    Ok(())
}
