//! Renderer: wgpu init + depth + one rotating mesh.
//! wgpu = 26.x, winit = 0.30.x

use std::num::NonZeroU64;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use bytemuck::{Pod, Zeroable};
use corelib::{Vec3, camera::Camera, transform::Transform, vec3};
use wgpu::{
    util::DeviceExt,
    BindGroup, BindGroupLayout, BindGroupLayoutDescriptor, BindGroupLayoutEntry, BindingType,
    BlendState, Buffer, BufferBindingType, BufferUsages, ColorTargetState, ColorWrites,
    CommandEncoderDescriptor, DepthBiasState, DepthStencilState, Device, DeviceDescriptor,
    Extent3d, Features, FragmentState, Instance, InstanceDescriptor, Limits, LoadOp, Operations,
    PipelineLayoutDescriptor, PowerPreference, PresentMode, Queue, RenderPassColorAttachment,
    RenderPassDescriptor, RenderPipeline, RenderPipelineDescriptor, ShaderModuleDescriptor,
    ShaderSource, ShaderStages, StoreOp, Surface, SurfaceConfiguration, SurfaceError,
    TextureDescriptor, TextureDimension, TextureFormat, TextureUsages, TextureView,
    TextureViewDescriptor, VertexBufferLayout, VertexState, VertexStepMode,
};

use winit::{dpi::PhysicalSize, window::Window};

use asset::{FlatMeshData, MeshData, MeshVertex, TextureData};

/// Vertex: position + normal + uv.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
}

impl Vertex {
    pub const LAYOUT: VertexBufferLayout<'static> = VertexBufferLayout {
        array_stride: std::mem::size_of::<Vertex>() as u64,
        step_mode: VertexStepMode::Vertex,
        attributes: &wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x3, 2 => Float32x2],
    };
}

impl From<MeshVertex> for Vertex {
    fn from(v: MeshVertex) -> Self {
        Self {
            position: v.position,
            normal: v.normal,
            uv: v.uv,
        }
    }
}

/// Scene UBO (16-byte aligned).
#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
struct SceneUniform {
    mvp: [[f32; 4]; 4],
    model: [[f32; 4]; 4],
    light_dir: [f32; 4],
    base_color: [f32; 4],
}

const DEPTH_FORMAT: TextureFormat = TextureFormat::Depth32Float;

/// Directional light, pointing down and slightly sideways.
const LIGHT_DIR: [f32; 3] = [0.5, -1.0, 0.0];

/// Angular speed of the mesh about the vertical axis, rad/s.
const SPIN_SPEED: f32 = 0.5;

/// Mesh geometry handed to the renderer.
#[derive(Clone, Debug)]
pub enum SceneMesh {
    /// Deduplicated vertices with a u32 index buffer (indexed draw).
    Indexed(MeshData),
    /// One vertex per face corner, drawn without indices.
    Flat(FlatMeshData),
}

impl SceneMesh {
    pub fn vertex_count(&self) -> usize {
        match self {
            SceneMesh::Indexed(mesh) => mesh.vertices.len(),
            SceneMesh::Flat(mesh) => mesh.vertices.len(),
        }
    }

    pub fn triangle_count(&self) -> usize {
        match self {
            SceneMesh::Indexed(mesh) => mesh.indices.len() / 3,
            SceneMesh::Flat(mesh) => mesh.vertices.len() / 3,
        }
    }
}

/// Everything the renderer needs to draw one mesh.
#[derive(Clone, Debug)]
pub struct Scene {
    pub mesh: SceneMesh,
    pub texture: TextureData,
    /// Multiplied with the diffuse sample in the fragment shader.
    pub base_color: [f32; 3],
}

enum DrawGeometry {
    Indexed { index_buf: Buffer, index_count: u32 },
    NonIndexed { vertex_count: u32 },
}

pub struct GpuState {
    // Surface
    surface: Surface<'static>,
    #[allow(dead_code)]
    surface_format: TextureFormat,
    surface_config: SurfaceConfiguration,

    // Device/queue
    device: Device,
    queue: Queue,

    // Pipeline & geometry
    pipeline: RenderPipeline,
    vertex_buf: Buffer,
    geometry: DrawGeometry,

    // Scene uniforms & texture
    #[allow(dead_code)]
    scene_bgl: BindGroupLayout,
    scene_bg: BindGroup,
    scene_buf: Buffer,
    #[allow(dead_code)]
    texture_bgl: BindGroupLayout,
    texture_bg: BindGroup,
    base_color: [f32; 3],

    // Animation & camera
    start: Instant,
    camera: Camera,

    // Depth
    depth_view: TextureView,

    // Size cache
    width: u32,
    height: u32,
}

impl GpuState {
    /// Create GPU state bound to an Arc<Window>, uploading the scene's mesh
    /// and texture.
    pub async fn new(window: Arc<Window>, backends: wgpu::Backends, scene: Scene) -> Result<Self> {
        let PhysicalSize { width, height } = window.inner_size();
        let width = width.max(1);
        let height = height.max(1);

        // Instance & surface
        let instance = Instance::new(&InstanceDescriptor {
            backends,
            ..Default::default()
        });
        let surface: Surface<'static> = instance
            .create_surface(window.clone())
            .context("Failed to create surface")?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .context("No suitable GPU adapter")?;

        let (device, queue) = adapter
            .request_device(&DeviceDescriptor {
                label: Some("Viewer Device"),
                required_features: Features::empty(),
                required_limits: Limits::downlevel_webgl2_defaults()
                    .using_resolution(adapter.limits()),
                memory_hints: Default::default(),
                trace: Default::default(),
            })
            .await
            .context("request_device failed")?;

        // Surface format (prefer sRGB)
        let caps = surface.get_capabilities(&adapter);
        let surface_format = caps
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .unwrap_or(caps.formats[0]);

        // Configure surface
        let surface_config = SurfaceConfiguration {
            usage: TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width,
            height,
            present_mode: PresentMode::AutoVsync,
            alpha_mode: caps.alpha_modes[0],
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &surface_config);

        // Depth texture
        let depth_view = create_depth_view(&device, &surface_config);

        // ==== Shaders ====
        let shader_src: &str = include_str!("shaders/mesh.wgsl");
        let shader = device.create_shader_module(ShaderModuleDescriptor {
            label: Some("Mesh WGSL"),
            source: ShaderSource::Wgsl(shader_src.into()),
        });

        // ==== Scene BGL/BG ====
        let scene_bgl = device.create_bind_group_layout(&BindGroupLayoutDescriptor {
            label: Some("Scene BGL"),
            entries: &[BindGroupLayoutEntry {
                binding: 0,
                visibility: ShaderStages::VERTEX | ShaderStages::FRAGMENT,
                ty: BindingType::Buffer {
                    ty: BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: NonZeroU64::new(std::mem::size_of::<SceneUniform>() as u64),
                },
                count: None,
            }],
        });

        // Initial uniform (identity transforms, replaced every frame).
        let scene_init = SceneUniform {
            mvp: glam::Mat4::IDENTITY.to_cols_array_2d(),
            model: glam::Mat4::IDENTITY.to_cols_array_2d(),
            light_dir: [LIGHT_DIR[0], LIGHT_DIR[1], LIGHT_DIR[2], 0.0],
            base_color: [
                scene.base_color[0],
                scene.base_color[1],
                scene.base_color[2],
                1.0,
            ],
        };
        let scene_buf = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Scene UBO"),
            contents: bytemuck::bytes_of(&scene_init),
            usage: BufferUsages::UNIFORM | BufferUsages::COPY_DST,
        });
        let scene_bg = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Scene BG"),
            layout: &scene_bgl,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: scene_buf.as_entire_binding(),
            }],
        });

        // ==== Diffuse texture BGL/BG ====
        let texture_bgl = device.create_bind_group_layout(&BindGroupLayoutDescriptor {
            label: Some("Texture BGL"),
            entries: &[
                BindGroupLayoutEntry {
                    binding: 0,
                    visibility: ShaderStages::FRAGMENT,
                    ty: BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                BindGroupLayoutEntry {
                    binding: 1,
                    visibility: ShaderStages::FRAGMENT,
                    ty: BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });
        let (texture_view, sampler) = upload_texture(&device, &queue, &scene.texture);
        let texture_bg = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Texture BG"),
            layout: &texture_bgl,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&texture_view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&sampler),
                },
            ],
        });

        // ==== Pipeline ====
        let pipeline_layout = device.create_pipeline_layout(&PipelineLayoutDescriptor {
            label: Some("Mesh PipelineLayout"),
            bind_group_layouts: &[&scene_bgl, &texture_bgl],
            push_constant_ranges: &[],
        });
        let pipeline = device.create_render_pipeline(&RenderPipelineDescriptor {
            label: Some("Mesh Pipeline"),
            layout: Some(&pipeline_layout),
            vertex: VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                buffers: &[Vertex::LAYOUT],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            },
            fragment: Some(FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                targets: &[Some(ColorTargetState {
                    format: surface_format,
                    blend: Some(BlendState::REPLACE),
                    write_mask: ColorWrites::ALL,
                })],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            }),
            // No culling: loaded OBJ winding is not guaranteed.
            primitive: wgpu::PrimitiveState::default(),
            depth_stencil: Some(DepthStencilState {
                format: DEPTH_FORMAT,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::LessEqual,
                stencil: wgpu::StencilState::default(),
                bias: DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        // ==== Geometry: loaded mesh ====
        let (vertex_buf, geometry) = upload_mesh(&device, &scene.mesh);
        log::info!(
            "Uploaded mesh: {} vertices, {} triangles",
            scene.mesh.vertex_count(),
            scene.mesh.triangle_count()
        );

        let camera = Camera::new_perspective(
            vec3(0.0, 0.0, 6.0),
            Vec3::ZERO,
            Vec3::Y,
            45f32.to_radians(),
            0.1,
            100.0,
            width as f32 / height as f32,
        );

        Ok(Self {
            surface,
            surface_format,
            surface_config,
            device,
            queue,
            pipeline,
            vertex_buf,
            geometry,
            scene_bgl,
            scene_bg,
            scene_buf,
            texture_bgl,
            texture_bg,
            base_color: scene.base_color,
            start: Instant::now(),
            camera,
            depth_view,
            width,
            height,
        })
    }

    /// Resize: reconfigure surface, recreate depth view, update camera aspect.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.width = width.max(1);
        self.height = height.max(1);
        self.surface_config.width = self.width;
        self.surface_config.height = self.height;
        self.surface.configure(&self.device, &self.surface_config);
        self.depth_view = create_depth_view(&self.device, &self.surface_config);
        self.camera = self
            .camera
            .with_aspect(self.width as f32 / self.height as f32);
    }

    /// Render one frame: update uniforms + clear + draw the mesh.
    pub fn render(&mut self) -> Result<(), SurfaceError> {
        // --- update MVP
        let t = self.start.elapsed().as_secs_f32();
        let model = Transform::spin_y(SPIN_SPEED * t).matrix();
        let mvp = self.camera.proj_view() * model;
        let uniform = SceneUniform {
            mvp: mvp.to_cols_array_2d(),
            model: model.to_cols_array_2d(),
            light_dir: [LIGHT_DIR[0], LIGHT_DIR[1], LIGHT_DIR[2], 0.0],
            base_color: [
                self.base_color[0],
                self.base_color[1],
                self.base_color[2],
                1.0,
            ],
        };
        self.queue
            .write_buffer(&self.scene_buf, 0, bytemuck::bytes_of(&uniform));

        // --- frame & pass
        let frame = self.surface.get_current_texture()?;
        let view = frame.texture.create_view(&Default::default());

        let mut encoder = self
            .device
            .create_command_encoder(&CommandEncoderDescriptor {
                label: Some("MainEncoder"),
            });

        {
            let mut rpass = encoder.begin_render_pass(&RenderPassDescriptor {
                label: Some("MainPass"),
                color_attachments: &[Some(RenderPassColorAttachment {
                    view: &view,
                    depth_slice: None,
                    resolve_target: None,
                    ops: Operations {
                        load: LoadOp::Clear(wgpu::Color {
                            r: 0.1,
                            g: 0.1,
                            b: 0.1,
                            a: 1.0,
                        }),
                        store: StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_view,
                    depth_ops: Some(Operations {
                        load: LoadOp::Clear(1.0),
                        store: StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                occlusion_query_set: None,
                timestamp_writes: None,
            });

            rpass.set_pipeline(&self.pipeline);
            rpass.set_bind_group(0, &self.scene_bg, &[]);
            rpass.set_bind_group(1, &self.texture_bg, &[]);
            rpass.set_vertex_buffer(0, self.vertex_buf.slice(..));
            match &self.geometry {
                DrawGeometry::Indexed {
                    index_buf,
                    index_count,
                } => {
                    rpass.set_index_buffer(index_buf.slice(..), wgpu::IndexFormat::Uint32);
                    rpass.draw_indexed(0..*index_count, 0, 0..1);
                }
                DrawGeometry::NonIndexed { vertex_count } => {
                    rpass.draw(0..*vertex_count, 0..1);
                }
            }
        }

        self.queue.submit(Some(encoder.finish()));
        frame.present();
        Ok(())
    }

    pub fn is_surface_lost(err: &SurfaceError) -> bool {
        matches!(err, SurfaceError::Lost | SurfaceError::Outdated)
    }

    pub fn recreate_surface(&mut self) {
        self.resize(self.width, self.height);
    }
}

/// Create a depth texture view matching the surface config.
fn create_depth_view(device: &Device, sc: &SurfaceConfiguration) -> TextureView {
    let tex = device.create_texture(&TextureDescriptor {
        label: Some("DepthTex"),
        size: Extent3d {
            width: sc.width.max(1),
            height: sc.height.max(1),
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: TextureDimension::D2,
        format: DEPTH_FORMAT,
        usage: TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    });
    tex.create_view(&TextureViewDescriptor::default())
}

/// Upload mesh data, producing the vertex buffer and draw geometry.
fn upload_mesh(device: &Device, mesh: &SceneMesh) -> (Buffer, DrawGeometry) {
    let vertices: Vec<Vertex> = match mesh {
        SceneMesh::Indexed(data) => data.vertices.iter().copied().map(Vertex::from).collect(),
        SceneMesh::Flat(data) => data.vertices.iter().copied().map(Vertex::from).collect(),
    };
    let vertex_buf = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some("Mesh VB"),
        contents: bytemuck::cast_slice(&vertices),
        usage: BufferUsages::VERTEX,
    });

    let geometry = match mesh {
        SceneMesh::Indexed(data) => {
            let index_buf = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Mesh IB"),
                contents: bytemuck::cast_slice(&data.indices),
                usage: BufferUsages::INDEX,
            });
            DrawGeometry::Indexed {
                index_buf,
                index_count: data.indices.len() as u32,
            }
        }
        SceneMesh::Flat(data) => DrawGeometry::NonIndexed {
            vertex_count: data.vertices.len() as u32,
        },
    };

    (vertex_buf, geometry)
}

/// Upload an RGBA8 texture and create its sampler (linear, repeat).
fn upload_texture(
    device: &Device,
    queue: &Queue,
    data: &TextureData,
) -> (TextureView, wgpu::Sampler) {
    let size = Extent3d {
        width: data.width,
        height: data.height,
        depth_or_array_layers: 1,
    };
    let texture = device.create_texture(&TextureDescriptor {
        label: Some("DiffuseTex"),
        size,
        mip_level_count: 1,
        sample_count: 1,
        dimension: TextureDimension::D2,
        format: TextureFormat::Rgba8UnormSrgb,
        usage: TextureUsages::TEXTURE_BINDING | TextureUsages::COPY_DST,
        view_formats: &[],
    });
    queue.write_texture(
        wgpu::TexelCopyTextureInfo {
            texture: &texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        &data.data,
        wgpu::TexelCopyBufferLayout {
            offset: 0,
            bytes_per_row: Some(data.width * data.bytes_per_pixel()),
            rows_per_image: Some(data.height),
        },
        size,
    );
    let view = texture.create_view(&TextureViewDescriptor::default());
    let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
        label: Some("DiffuseSampler"),
        address_mode_u: wgpu::AddressMode::Repeat,
        address_mode_v: wgpu::AddressMode::Repeat,
        address_mode_w: wgpu::AddressMode::Repeat,
        mag_filter: wgpu::FilterMode::Linear,
        min_filter: wgpu::FilterMode::Linear,
        ..Default::default()
    });
    (view, sampler)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vertex_layout_matches_struct() {
        assert_eq!(Vertex::LAYOUT.array_stride, 32);
        let attrs = Vertex::LAYOUT.attributes;
        assert_eq!(attrs.len(), 3);
        assert_eq!(attrs[0].offset, 0);
        assert_eq!(attrs[1].offset, 12);
        assert_eq!(attrs[2].offset, 24);
    }

    #[test]
    fn scene_uniform_is_16_byte_aligned() {
        assert_eq!(std::mem::size_of::<SceneUniform>() % 16, 0);
    }

    #[test]
    fn vertex_from_mesh_vertex_keeps_attributes() {
        let v = Vertex::from(MeshVertex::new(
            [1.0, 2.0, 3.0],
            [0.0, 1.0, 0.0],
            [0.5, 0.25],
        ));
        assert_eq!(v.position, [1.0, 2.0, 3.0]);
        assert_eq!(v.normal, [0.0, 1.0, 0.0]);
        assert_eq!(v.uv, [0.5, 0.25]);
    }

    #[test]
    fn scene_mesh_counts() {
        let indexed = SceneMesh::Indexed(MeshData::new(
            vec![MeshVertex::default(); 3],
            vec![0, 1, 2, 0, 2, 1],
        ));
        assert_eq!(indexed.vertex_count(), 3);
        assert_eq!(indexed.triangle_count(), 2);

        let flat = SceneMesh::Flat(FlatMeshData::new(vec![MeshVertex::default(); 6]));
        assert_eq!(flat.vertex_count(), 6);
        assert_eq!(flat.triangle_count(), 2);
    }
}
