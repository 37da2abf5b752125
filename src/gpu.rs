use std::sync::Arc;

use bytemuck::{Pod, Zeroable};
use wgpu::util::DeviceExt;
use winit::window::Window;

use crate::error::{BackgroundError, Result};
use crate::host::{MountTarget, Renderer};
use crate::scene::{Dirty, Scene};

const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth24Plus;

// ======================================
// === SHADER DATA STRUCTURES ===
// ======================================

#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable, PartialEq)]
pub struct Uniforms {
    view: [[f32; 4]; 4],
    proj: [[f32; 4]; 4],
    mesh_color: [f32; 4],
    fog_color: [f32; 4],
    fog_range: [f32; 4], // near, far, unused, unused
}

impl Uniforms {
    pub fn from_scene(scene: &Scene) -> Self {
        let camera = scene.camera();
        let fog = scene.fog();
        let [mr, mg, mb] = scene.mesh_color();
        let [fr, fg, fb] = fog.color;
        Self {
            view: camera.view_matrix().to_cols_array_2d(),
            proj: camera.projection_matrix().to_cols_array_2d(),
            mesh_color: [mr, mg, mb, 1.0],
            fog_color: [fr, fg, fb, 1.0],
            fog_range: [fog.near, fog.far, 0.0, 0.0],
        }
    }
}

fn vertex_desc() -> wgpu::VertexBufferLayout<'static> {
    wgpu::VertexBufferLayout {
        array_stride: std::mem::size_of::<[f32; 3]>() as wgpu::BufferAddress,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: &[wgpu::VertexAttribute {
            offset: 0,
            shader_location: 0,
            format: wgpu::VertexFormat::Float32x3,
        }],
    }
}

// Wireframe lines shaded flat, blended into the background by linear fog on view depth.
const TERRAIN_SHADER: &str = r#"
    struct Uniforms {
        view: mat4x4<f32>,
        proj: mat4x4<f32>,
        mesh_color: vec4<f32>,
        fog_color: vec4<f32>,
        fog_range: vec4<f32>,
    }

    struct VertexOutput {
        @builtin(position) clip_position: vec4<f32>,
        @location(0) view_depth: f32,
    }

    @group(0) @binding(0) var<uniform> uniforms: Uniforms;

    @vertex
    fn vs_main(@location(0) position: vec3<f32>) -> VertexOutput {
        var out: VertexOutput;
        let view_position = uniforms.view * vec4<f32>(position, 1.0);
        out.clip_position = uniforms.proj * view_position;
        out.view_depth = -view_position.z;
        return out;
    }

    @fragment
    fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
        let fog = smoothstep(uniforms.fog_range.x, uniforms.fog_range.y, in.view_depth);
        let color = mix(uniforms.mesh_color.rgb, uniforms.fog_color.rgb, fog);
        return vec4<f32>(color, 1.0);
    }
"#;

// ======================================
// === GPU CONTEXT ===
// ======================================

/// Device, queue and an unconfigured surface for one window.
pub struct GpuContext {
    pub surface: wgpu::Surface<'static>,
    pub adapter: wgpu::Adapter,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub window: Arc<Window>,
}

impl GpuContext {
    pub async fn new(window: Arc<Window>) -> Result<GpuContext> {
        cfg_if::cfg_if! {
            if #[cfg(target_arch = "wasm32")] {
                let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
                    backends: wgpu::Backends::BROWSER_WEBGPU,
                    ..Default::default()
                });
                let limits = wgpu::Limits::downlevel_webgl2_defaults();
            } else {
                let instance = wgpu::Instance::default();
                let limits = wgpu::Limits::default();
            }
        }

        let surface = instance.create_surface(window.clone())?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::LowPower,
                force_fallback_adapter: false,
                compatible_surface: Some(&surface),
            })
            .await?;

        let adapter_info = adapter.get_info();
        log::info!("Selected GPU: {} ({:?}, {:?})", adapter_info.name, adapter_info.device_type, adapter_info.backend);

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("Background Device"),
                required_features: wgpu::Features::empty(),
                required_limits: limits.using_resolution(adapter.limits()),
                memory_hints: wgpu::MemoryHints::default(),
                trace: Default::default(),
            })
            .await?;

        Ok(Self {
            surface,
            adapter,
            device,
            queue,
            window,
        })
    }
}

/// A GPU context waiting to be attached: the native window, or on the web a canvas
/// plus the container element it will be appended to.
pub struct GpuMount {
    context: GpuContext,
    #[cfg(target_arch = "wasm32")]
    container: web_sys::Element,
}

impl GpuMount {
    #[cfg(not(target_arch = "wasm32"))]
    pub fn new(context: GpuContext) -> Self {
        Self { context }
    }

    #[cfg(target_arch = "wasm32")]
    pub fn new(context: GpuContext, container: web_sys::Element) -> Self {
        Self { context, container }
    }

    #[cfg(target_arch = "wasm32")]
    fn attach_canvas(&self) -> Result<web_sys::HtmlCanvasElement> {
        use winit::platform::web::WindowExtWebSys;

        let canvas = self
            .context
            .window
            .canvas()
            .ok_or_else(|| BackgroundError::Dom("window has no canvas".into()))?;

        // Cover the whole viewport, behind page content.
        let style = canvas.style();
        for (property, value) in [
            ("position", "fixed"),
            ("top", "0"),
            ("left", "0"),
            ("width", "100%"),
            ("height", "100%"),
            ("z-index", "-1"),
        ] {
            style
                .set_property(property, value)
                .map_err(|e| BackgroundError::Dom(format!("failed to set {property}: {e:?}")))?;
        }

        self.container
            .append_child(&canvas)
            .map_err(|e| BackgroundError::Dom(format!("failed to append canvas: {e:?}")))?;
        Ok(canvas)
    }
}

impl MountTarget for GpuMount {
    type Renderer = GpuRenderer;

    fn attach(self, width: u32, height: u32, scene: &Scene) -> Result<GpuRenderer> {
        let caps = self.context.surface.get_capabilities(&self.context.adapter);
        let surface_format = caps.formats.first().copied().ok_or(BackgroundError::UnsupportedSurface)?;

        #[cfg(target_arch = "wasm32")]
        let canvas = self.attach_canvas()?;

        let GpuContext { surface, device, queue, window, .. } = self.context;

        let max_dimension = device.limits().max_texture_dimension_2d;
        let (width, height) = clamp_size(width, height, max_dimension);

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width,
            height,
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode: wgpu::CompositeAlphaMode::Auto,
            view_formats: vec![surface_format.add_srgb_suffix()],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        let (depth_texture, depth_view) = create_depth_texture(&device, &config);

        let uniform_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Terrain Uniform Buffer"),
            contents: bytemuck::cast_slice(&[Uniforms::from_scene(scene)]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Terrain Vertex Buffer"),
            contents: bytemuck::cast_slice(scene.mesh().positions()),
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
        });

        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Terrain Index Buffer"),
            contents: bytemuck::cast_slice(scene.mesh().line_indices()),
            usage: wgpu::BufferUsages::INDEX,
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Terrain Bind Group Layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Terrain Bind Group"),
            layout: &bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
        });

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Terrain Shader"),
            source: wgpu::ShaderSource::Wgsl(TERRAIN_SHADER.into()),
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Terrain Pipeline Layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Terrain Wireframe Pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                buffers: &[vertex_desc()],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: config.format.add_srgb_suffix(),
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::LineList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None,
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: DEPTH_FORMAT,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::Less,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState {
                count: 1,
                mask: !0,
                alpha_to_coverage_enabled: false,
            },
            multiview: None,
            cache: None,
        });

        let [r, g, b] = scene.clear_color();

        Ok(GpuRenderer {
            surface,
            device,
            queue,
            config,
            window,
            #[cfg(target_arch = "wasm32")]
            canvas,
            depth_texture,
            depth_view,
            pipeline,
            bind_group,
            uniform_buffer,
            vertex_buffer,
            index_buffer,
            num_indices: scene.mesh().line_indices().len() as u32,
            clear_color: wgpu::Color { r: r.into(), g: g.into(), b: b.into(), a: 1.0 },
            max_dimension,
        })
    }
}

// ======================================
// === RENDERER ===
// ======================================

pub struct GpuRenderer {
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    window: Arc<Window>,
    #[cfg(target_arch = "wasm32")]
    canvas: web_sys::HtmlCanvasElement,
    depth_texture: wgpu::Texture,
    depth_view: wgpu::TextureView,
    pipeline: wgpu::RenderPipeline,
    bind_group: wgpu::BindGroup,
    uniform_buffer: wgpu::Buffer,
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    num_indices: u32,
    clear_color: wgpu::Color,
    max_dimension: u32,
}

impl GpuRenderer {
    fn upload(&self, scene: &Scene) {
        let dirty = scene.dirty();
        if dirty.contains(Dirty::MESH) {
            self.queue
                .write_buffer(&self.vertex_buffer, 0, bytemuck::cast_slice(scene.mesh().positions()));
        }
        if dirty.intersects(Dirty::CAMERA | Dirty::PROJECTION) {
            self.queue
                .write_buffer(&self.uniform_buffer, 0, bytemuck::cast_slice(&[Uniforms::from_scene(scene)]));
        }
    }

    fn reconfigure(&mut self) {
        self.surface.configure(&self.device, &self.config);
        self.depth_texture.destroy();
        let (depth_texture, depth_view) = create_depth_texture(&self.device, &self.config);
        self.depth_texture = depth_texture;
        self.depth_view = depth_view;
    }
}

impl Renderer for GpuRenderer {
    fn resize(&mut self, width: u32, height: u32) {
        let (width, height) = clamp_size(width, height, self.max_dimension);
        if width == self.config.width && height == self.config.height {
            return;
        }
        self.config.width = width;
        self.config.height = height;
        self.reconfigure();
    }

    fn render(&mut self, scene: &Scene) -> Result<()> {
        self.upload(scene);

        let output = match self.surface.get_current_texture() {
            Ok(output) => output,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                log::warn!("Surface lost, reconfiguring...");
                self.reconfigure();
                return Ok(());
            }
            Err(e) => return Err(BackgroundError::Surface(e)),
        };

        let view = output.texture.create_view(&wgpu::TextureViewDescriptor {
            format: Some(self.config.format.add_srgb_suffix()),
            ..Default::default()
        });

        let mut encoder = self.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Terrain Encoder"),
        });

        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Terrain Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(self.clear_color),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            render_pass.set_pipeline(&self.pipeline);
            render_pass.set_bind_group(0, &self.bind_group, &[]);
            render_pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
            render_pass.set_index_buffer(self.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
            render_pass.draw_indexed(0..self.num_indices, 0, 0..1);
        }

        self.queue.submit([encoder.finish()]);
        self.window.pre_present_notify();
        output.present();

        Ok(())
    }

    fn release(self) {
        #[cfg(target_arch = "wasm32")]
        self.canvas.remove();

        self.vertex_buffer.destroy();
        self.index_buffer.destroy();
        self.uniform_buffer.destroy();
        self.depth_texture.destroy();
        log::debug!("Released terrain GPU resources");
    }
}

fn create_depth_texture(device: &wgpu::Device, config: &wgpu::SurfaceConfiguration) -> (wgpu::Texture, wgpu::TextureView) {
    let depth_texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("Depth Texture"),
        size: wgpu::Extent3d {
            width: config.width,
            height: config.height,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: DEPTH_FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    });

    let depth_view = depth_texture.create_view(&wgpu::TextureViewDescriptor::default());
    (depth_texture, depth_view)
}

/// Keeps a surface size inside `1..=max_dimension` on both axes.
pub fn clamp_size(width: u32, height: u32, max_dimension: u32) -> (u32, u32) {
    (width.clamp(1, max_dimension), height.clamp(1, max_dimension))
}
