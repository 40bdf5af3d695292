//! wgpu implementation of the tower's render surface. Floors are uploaded as
//! one texture each when the stack is built; a frame is the floor quads in
//! stack order plus the car outline, shifted by the camera translation.

use std::{borrow::Cow, path::PathBuf, sync::Arc};

use anyhow::{Context, Result};
use bytemuck::cast_slice;
use tower_core::{FloorId, FloorSpec, RenderSurface, ViewportStyle};
use wgpu::{SurfaceError, util::DeviceExt};
use winit::{dpi::PhysicalSize, window::Window};

use super::layout::{camera_uniform, tower_instances};
use super::shaders::{
    CameraUniform, QUAD_INDICES, QUAD_VERTICES, QuadInstance, QuadVertex, TOWER_SHADER_SOURCE,
};
use crate::texture::{
    FloorImage, car_frame_image, load_floor_image, placeholder_floor, prepare_rgba_upload,
};

const INITIAL_INSTANCE_CAPACITY: usize = 16;
const SHAFT_COLOR: wgpu::Color = wgpu::Color {
    r: 0.05,
    g: 0.05,
    b: 0.07,
    a: 1.0,
};

/// A background resident on the GPU.
struct FloorTexture {
    _texture: wgpu::Texture,
    bind_group: wgpu::BindGroup,
}

/// One row of the stack. Rows whose texture failed to upload are left
/// unpainted.
struct FloorSlot {
    id: FloorId,
    texture: Option<FloorTexture>,
}

pub struct GpuTower {
    window: Arc<Window>,
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    size: PhysicalSize<u32>,
    pipeline: wgpu::RenderPipeline,
    texture_layout: wgpu::BindGroupLayout,
    sampler: wgpu::Sampler,
    camera_buffer: wgpu::Buffer,
    camera_bind_group: wgpu::BindGroup,
    quad_vertex_buffer: wgpu::Buffer,
    quad_index_buffer: wgpu::Buffer,
    quad_index_count: u32,
    instance_buffer: wgpu::Buffer,
    instance_capacity: usize,
    floors: Vec<FloorSlot>,
    car: FloorTexture,
    asset_root: PathBuf,
    style: Option<ViewportStyle>,
    translation: f64,
}

impl GpuTower {
    pub async fn new(window: Arc<Window>, asset_root: PathBuf) -> Result<Self> {
        let size = window.inner_size();
        let instance = wgpu::Instance::default();
        let surface = instance
            .create_surface(window.clone())
            .context("creating wgpu surface")?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                force_fallback_adapter: false,
                compatible_surface: Some(&surface),
            })
            .await
            .context("requesting wgpu adapter")?;

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("tower-viewer-device"),
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::default(),
                },
                None,
            )
            .await
            .context("requesting wgpu device")?;

        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .copied()
            .find(|format| format.is_srgb())
            .or_else(|| surface_caps.formats.first().copied())
            .context("surface reports no texture formats")?;
        let present_mode = surface_caps
            .present_modes
            .iter()
            .copied()
            .find(|mode| *mode == wgpu::PresentMode::Mailbox)
            .unwrap_or(wgpu::PresentMode::Fifo);
        let alpha_mode = surface_caps
            .alpha_modes
            .first()
            .copied()
            .unwrap_or(wgpu::CompositeAlphaMode::Opaque);

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode,
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        let texture_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("floor-bind-group-layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        multisampled: false,
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });
        let camera_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("camera-bind-group-layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("floor-sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        let camera_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("camera-uniform-buffer"),
            contents: cast_slice(&[camera_uniform(size, window.scale_factor(), 0.0)]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let camera_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("camera-bind-group"),
            layout: &camera_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: camera_buffer.as_entire_binding(),
            }],
        });

        let pipeline = create_pipeline(&device, &texture_layout, &camera_layout, surface_format);

        let quad_vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("floor-quad-vertex-buffer"),
            contents: cast_slice(&QUAD_VERTICES),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let quad_index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("floor-quad-index-buffer"),
            contents: cast_slice(&QUAD_INDICES),
            usage: wgpu::BufferUsages::INDEX,
        });
        let instance_buffer = create_instance_buffer(&device, INITIAL_INSTANCE_CAPACITY);

        let car = upload_floor_texture(
            &device,
            &queue,
            &texture_layout,
            &sampler,
            &car_frame_image(),
        )
        .context("uploading car outline")?;

        Ok(Self {
            window,
            surface,
            device,
            queue,
            config,
            size,
            pipeline,
            texture_layout,
            sampler,
            camera_buffer,
            camera_bind_group,
            quad_vertex_buffer,
            quad_index_buffer,
            quad_index_count: QUAD_INDICES.len() as u32,
            instance_buffer,
            instance_capacity: INITIAL_INSTANCE_CAPACITY,
            floors: Vec::new(),
            car,
            asset_root,
            style: None,
            translation: 0.0,
        })
    }

    pub fn window(&self) -> &Window {
        &self.window
    }

    pub fn size(&self) -> PhysicalSize<u32> {
        self.size
    }

    pub fn floor_ids(&self) -> impl Iterator<Item = FloorId> + '_ {
        self.floors.iter().map(|floor| floor.id)
    }

    /// Reconfigure the swapchain for a new window size. Geometry is re-derived
    /// by the controller afterwards.
    pub fn resize_surface(&mut self, new_size: PhysicalSize<u32>) {
        if new_size.width == 0 || new_size.height == 0 {
            return;
        }
        self.size = new_size;
        self.config.width = new_size.width;
        self.config.height = new_size.height;
        self.surface.configure(&self.device, &self.config);
    }

    pub fn render(&mut self, car_row: Option<usize>) -> Result<(), SurfaceError> {
        let frame = self.surface.get_current_texture()?;
        let view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let scale = self.device_pixel_ratio();
        let uniform: CameraUniform = camera_uniform(self.size, scale, self.translation);
        self.queue
            .write_buffer(&self.camera_buffer, 0, cast_slice(&[uniform]));

        let instances = match self.style.as_ref() {
            Some(style) => tower_instances(style, uniform.viewport[0], self.floors.len(), car_row),
            None => Vec::new(),
        };
        self.ensure_instance_capacity(instances.len());
        if !instances.is_empty() {
            self.queue
                .write_buffer(&self.instance_buffer, 0, cast_slice(&instances));
        }

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("tower-viewer-encoder"),
            });
        {
            let mut rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("tower-viewer-pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(SHAFT_COLOR),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            rpass.set_pipeline(&self.pipeline);
            rpass.set_bind_group(1, &self.camera_bind_group, &[]);
            rpass.set_vertex_buffer(0, self.quad_vertex_buffer.slice(..));
            rpass.set_vertex_buffer(1, self.instance_buffer.slice(..));
            rpass.set_index_buffer(self.quad_index_buffer.slice(..), wgpu::IndexFormat::Uint16);

            let floor_draws = instances.len().min(self.floors.len());
            for (row, floor) in self.floors.iter().take(floor_draws).enumerate() {
                let Some(texture) = floor.texture.as_ref() else {
                    continue;
                };
                let slot = row as u32;
                rpass.set_bind_group(0, &texture.bind_group, &[]);
                rpass.draw_indexed(0..self.quad_index_count, 0, slot..slot + 1);
            }
            if instances.len() > floor_draws {
                let slot = floor_draws as u32;
                rpass.set_bind_group(0, &self.car.bind_group, &[]);
                rpass.draw_indexed(0..self.quad_index_count, 0, slot..slot + 1);
            }
        }

        self.queue.submit(std::iter::once(encoder.finish()));
        frame.present();
        Ok(())
    }

    fn ensure_instance_capacity(&mut self, required: usize) {
        if required <= self.instance_capacity {
            return;
        }
        let capacity = required.next_power_of_two();
        self.instance_buffer = create_instance_buffer(&self.device, capacity);
        self.instance_capacity = capacity;
    }

    fn upload_floor(&self, floor: &FloorSpec) -> Result<FloorTexture> {
        let image = match load_floor_image(&self.asset_root, floor) {
            Ok(image) => image,
            Err(warning) => {
                warning.report();
                placeholder_floor(floor.id)
            }
        };
        upload_floor_texture(
            &self.device,
            &self.queue,
            &self.texture_layout,
            &self.sampler,
            &image,
        )
    }
}

impl RenderSurface for GpuTower {
    type Node = usize;

    fn viewport_height(&self) -> f64 {
        f64::from(self.size.height) / self.device_pixel_ratio()
    }

    fn device_pixel_ratio(&self) -> f64 {
        self.window.scale_factor()
    }

    fn apply_style(&mut self, style: ViewportStyle) {
        log::debug!(
            "[viewer] style: viewport {}px, floor {}px, car {}px",
            style.viewport_height,
            style.floor_height,
            style.car_width
        );
        self.style = Some(style);
        self.window.request_redraw();
    }

    fn clear_floors(&mut self) {
        self.floors.clear();
    }

    fn create_floor_node(&mut self, floor: &FloorSpec) -> usize {
        let texture = match self.upload_floor(floor) {
            Ok(texture) => Some(texture),
            Err(err) => {
                log::error!("[viewer] floor {} texture upload failed: {err:#}", floor.id);
                None
            }
        };
        self.floors.push(FloorSlot {
            id: floor.id,
            texture,
        });
        self.floors.len() - 1
    }

    fn set_stack_translation(&mut self, translate_y: f64) {
        self.translation = translate_y;
        self.window.request_redraw();
    }
}

fn texture_extent(image: &FloorImage) -> wgpu::Extent3d {
    wgpu::Extent3d {
        width: image.width,
        height: image.height,
        depth_or_array_layers: 1,
    }
}

fn floor_texture_descriptor(extent: wgpu::Extent3d) -> wgpu::TextureDescriptor<'static> {
    wgpu::TextureDescriptor {
        label: Some("floor-texture"),
        size: extent,
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: wgpu::TextureFormat::Rgba8UnormSrgb,
        usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        view_formats: &[],
    }
}

fn floor_bind_group(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    sampler: &wgpu::Sampler,
    texture: &wgpu::Texture,
) -> wgpu::BindGroup {
    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("floor-bind-group"),
        layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::TextureView(&view),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::Sampler(sampler),
            },
        ],
    })
}

fn upload_floor_texture(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    layout: &wgpu::BindGroupLayout,
    sampler: &wgpu::Sampler,
    image: &FloorImage,
) -> Result<FloorTexture> {
    let upload = prepare_rgba_upload(image)?;
    let extent = texture_extent(image);
    let texture = device.create_texture(&floor_texture_descriptor(extent));
    queue.write_texture(
        wgpu::ImageCopyTexture {
            texture: &texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        upload.pixels(),
        wgpu::ImageDataLayout {
            offset: 0,
            bytes_per_row: Some(upload.bytes_per_row()),
            rows_per_image: Some(image.height),
        },
        extent,
    );
    let bind_group = floor_bind_group(device, layout, sampler, &texture);
    Ok(FloorTexture {
        _texture: texture,
        bind_group,
    })
}

fn create_instance_buffer(device: &wgpu::Device, capacity: usize) -> wgpu::Buffer {
    device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("tower-instance-buffer"),
        size: (capacity * std::mem::size_of::<QuadInstance>()) as u64,
        usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    })
}

fn create_pipeline(
    device: &wgpu::Device,
    texture_layout: &wgpu::BindGroupLayout,
    camera_layout: &wgpu::BindGroupLayout,
    surface_format: wgpu::TextureFormat,
) -> wgpu::RenderPipeline {
    let quad_vertex_layout = wgpu::VertexBufferLayout {
        array_stride: std::mem::size_of::<QuadVertex>() as u64,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: &wgpu::vertex_attr_array![0 => Float32x2, 1 => Float32x2],
    };
    let instance_layout = wgpu::VertexBufferLayout {
        array_stride: std::mem::size_of::<QuadInstance>() as u64,
        step_mode: wgpu::VertexStepMode::Instance,
        attributes: &wgpu::vertex_attr_array![2 => Float32x4],
    };

    let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some("tower-shader"),
        source: wgpu::ShaderSource::Wgsl(Cow::Borrowed(TOWER_SHADER_SOURCE)),
    });

    let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("tower-pipeline-layout"),
        bind_group_layouts: &[texture_layout, camera_layout],
        push_constant_ranges: &[],
    });

    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some("tower-pipeline"),
        layout: Some(&pipeline_layout),
        vertex: wgpu::VertexState {
            module: &shader,
            entry_point: "vs_main",
            buffers: &[quad_vertex_layout, instance_layout],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        },
        fragment: Some(wgpu::FragmentState {
            module: &shader,
            entry_point: "fs_main",
            targets: &[Some(wgpu::ColorTargetState {
                format: surface_format,
                blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        }),
        primitive: wgpu::PrimitiveState::default(),
        depth_stencil: None,
        multisample: wgpu::MultisampleState::default(),
        multiview: None,
    })
}
