//! WebGPU implementation of [`RenderContext`].
//!
//! Draw calls are recorded per destination and submitted as one render pass
//! whenever the bound destination changes, a clear restarts the pass, or the
//! frame ends. Each recorded draw owns its bind group and uniform buffer, so
//! nothing is overwritten between record and submit.

mod helpers;

use std::borrow::Cow;

use fnv::FnvHashMap;
use heat_core::{
    Capsule, FilterMode, HeatTrailPipeline, RenderContext, RenderError, RenderResult, ShaderKind,
    ShaderPass, ShaderSet, ShaderSource, TextureDesc, TextureId, TextureSlots, Uniform, UniformType,
    WrapMode,
};
use image::RgbaImage;
use web_sys as web;
use wgpu::util::DeviceExt;

/// Format of every offscreen target and uploaded texture.
const TARGET_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

#[repr(C)]
#[derive(Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
struct CapsuleUniforms {
    p0: [f32; 2],
    p1: [f32; 2],
    cap_radii: [f32; 2],
    half_width: f32,
    _pad: f32,
    color: [f32; 4],
}

type SamplerKey = (FilterMode, WrapMode);

struct GpuTexture {
    desc: TextureDesc,
    texture: wgpu::Texture,
    view: wgpu::TextureView,
}

struct Program {
    layout: wgpu::BindGroupLayout,
    pipelines: FnvHashMap<wgpu::TextureFormat, wgpu::RenderPipeline>,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum PipelineKey {
    Shader(ShaderKind),
    Capsule,
}

struct DrawOp {
    key: PipelineKey,
    bind_group: wgpu::BindGroup,
}

/// Pending work for one destination.
struct Recording {
    target: Option<TextureId>,
    clear: Option<wgpu::Color>,
    ops: Vec<DrawOp>,
}

pub struct WgpuContext {
    canvas: web::HtmlCanvasElement,
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    textures: TextureSlots<GpuTexture>,
    samplers: FnvHashMap<SamplerKey, wgpu::Sampler>,
    programs: FnvHashMap<ShaderKind, Program>,
    capsule: Program,
    bound: Option<TextureId>,
    recording: Option<Recording>,
    frame: Option<(wgpu::SurfaceTexture, wgpu::TextureView)>,
}

impl WgpuContext {
    pub async fn new(canvas: web::HtmlCanvasElement) -> anyhow::Result<Self> {
        let width = canvas.width().max(1);
        let height = canvas.height().max(1);

        let instance = wgpu::Instance::default();
        let surface = instance.create_surface(wgpu::SurfaceTarget::Canvas(canvas.clone()))?;
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .ok_or_else(|| anyhow::anyhow!("No WebGPU adapter"))?;
        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::default(),
                    memory_hints: wgpu::MemoryHints::Performance,
                    label: None,
                },
                None,
            )
            .await
            .map_err(|e| anyhow::anyhow!(format!("request_device error: {:?}", e)))?;
        device.on_uncaptured_error(Box::new(|e: wgpu::Error| {
            log::error!("[gpu] uncaptured error: {e}");
        }));

        // Heat values are written as-is; an sRGB swapchain would re-encode them.
        let caps = surface.get_capabilities(&adapter);
        let format = caps
            .formats
            .iter()
            .copied()
            .find(|f| {
                matches!(
                    f,
                    wgpu::TextureFormat::Bgra8Unorm | wgpu::TextureFormat::Rgba8Unorm
                )
            })
            .or_else(|| caps.formats.first().copied())
            .ok_or_else(|| anyhow::anyhow!("surface reports no formats"))?;
        let alpha_mode = caps
            .alpha_modes
            .first()
            .copied()
            .unwrap_or(wgpu::CompositeAlphaMode::Auto);
        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width,
            height,
            present_mode: wgpu::PresentMode::Fifo,
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);
        log::info!("[gpu] surface {width}x{height} {format:?}");

        let capsule = create_capsule_program(&device, format);

        Ok(Self {
            canvas,
            surface,
            device,
            queue,
            config,
            textures: TextureSlots::new(),
            samplers: FnvHashMap::default(),
            programs: FnvHashMap::default(),
            capsule,
            bound: None,
            recording: None,
            frame: None,
        })
    }

    /// Build the heat-trail pipeline, surfacing any GPU validation or
    /// allocation error raised while doing so.
    pub async fn create_pipeline(
        &mut self,
        shaders: &ShaderSet,
        heat_ramp: RgbaImage,
    ) -> anyhow::Result<HeatTrailPipeline> {
        self.device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);
        self.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let built = HeatTrailPipeline::new(self, shaders, heat_ramp);
        self.flush();
        let validation = self.device.pop_error_scope().await;
        let oom = self.device.pop_error_scope().await;
        let pipeline = built?;
        if let Some(e) = validation.or(oom) {
            anyhow::bail!("pipeline setup failed: {e}");
        }
        Ok(pipeline)
    }

    fn ensure_sampler(&mut self, key: SamplerKey) {
        if !self.samplers.contains_key(&key) {
            let sampler = helpers::create_sampler(&self.device, key.0, key.1);
            self.samplers.insert(key, sampler);
        }
    }

    fn gpu_texture(&self, id: TextureId) -> RenderResult<&GpuTexture> {
        self.textures
            .get(id)
            .ok_or(RenderError::UnknownTexture(id))
    }

    fn destination_format(&self, target: Option<TextureId>) -> wgpu::TextureFormat {
        match target {
            Some(_) => TARGET_FORMAT,
            None => self.config.format,
        }
    }

    fn reconfigure_if_needed(&mut self) {
        let (w, h) = (self.canvas.width().max(1), self.canvas.height().max(1));
        if w != self.config.width || h != self.config.height {
            self.config.width = w;
            self.config.height = h;
            self.surface.configure(&self.device, &self.config);
            log::info!("[gpu] surface reconfigured to {w}x{h}");
        }
    }

    /// The recording for the bound destination, starting one if needed.
    fn recording(&mut self) -> &mut Recording {
        if self
            .recording
            .as_ref()
            .is_some_and(|r| r.target != self.bound)
        {
            self.flush();
        }
        let target = self.bound;
        self.recording.get_or_insert_with(|| Recording {
            target,
            clear: None,
            ops: Vec::new(),
        })
    }

    /// Submit the pending recording as a single render pass.
    fn flush(&mut self) {
        let Some(rec) = self.recording.take() else {
            return;
        };
        if rec.clear.is_none() && rec.ops.is_empty() {
            return;
        }
        let view = match rec.target {
            Some(id) => match self.gpu_texture(id) {
                Ok(t) => &t.view,
                Err(e) => {
                    log::warn!("[gpu] dropping draws: {e}");
                    return;
                }
            },
            None => match &self.frame {
                Some((_, view)) => view,
                None => {
                    log::warn!("[gpu] dropping canvas draws outside a frame");
                    return;
                }
            },
        };
        let format = self.destination_format(rec.target);
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("heat_encoder"),
            });
        {
            let mut r = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("heat_pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: match rec.clear {
                            Some(c) => wgpu::LoadOp::Clear(c),
                            None => wgpu::LoadOp::Load,
                        },
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            for op in &rec.ops {
                let program = match op.key {
                    PipelineKey::Shader(kind) => self.programs.get(&kind),
                    PipelineKey::Capsule => Some(&self.capsule),
                };
                let Some(pipeline) = program.and_then(|p| p.pipelines.get(&format)) else {
                    log::warn!("[gpu] no pipeline for {format:?}");
                    continue;
                };
                r.set_pipeline(pipeline);
                r.set_bind_group(0, &op.bind_group, &[]);
                r.draw(0..3, 0..1);
            }
        }
        self.queue.submit(Some(encoder.finish()));
    }
}

fn create_capsule_program(device: &wgpu::Device, surface_format: wgpu::TextureFormat) -> Program {
    let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some("capsule"),
        source: wgpu::ShaderSource::Wgsl(Cow::Borrowed(include_str!("capsule.wgsl"))),
    });
    let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("capsule_bgl"),
        entries: &[helpers::uniform_entry(0)],
    });
    let pl = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("capsule_pl"),
        bind_group_layouts: &[&layout],
        push_constant_ranges: &[],
    });
    let pipelines = formats(surface_format)
        .map(|f| {
            let p = helpers::make_fullscreen_pipeline(
                device,
                "capsule",
                &pl,
                &module,
                f,
                Some(wgpu::BlendState::ALPHA_BLENDING),
            );
            (f, p)
        })
        .collect();
    Program { layout, pipelines }
}

fn formats(surface_format: wgpu::TextureFormat) -> impl Iterator<Item = wgpu::TextureFormat> {
    let mut list = vec![TARGET_FORMAT];
    if surface_format != TARGET_FORMAT {
        list.push(surface_format);
    }
    list.into_iter()
}

fn to_color(rgba: [f32; 4]) -> wgpu::Color {
    wgpu::Color {
        r: rgba[0] as f64,
        g: rgba[1] as f64,
        b: rgba[2] as f64,
        a: rgba[3] as f64,
    }
}

impl RenderContext for WgpuContext {
    fn canvas_size(&self) -> (u32, u32) {
        let rect = self.canvas.get_bounding_client_rect();
        (rect.width().round() as u32, rect.height().round() as u32)
    }

    fn pixel_density(&self) -> f32 {
        web::window()
            .map(|w| w.device_pixel_ratio() as f32)
            .unwrap_or(1.0)
    }

    /// The canvas backing store is already kept at CSS size times density.
    fn physical_size(&self) -> (u32, u32) {
        (self.canvas.width().max(1), self.canvas.height().max(1))
    }

    fn create_texture(&mut self, desc: &TextureDesc) -> RenderResult<TextureId> {
        let max = self.device.limits().max_texture_dimension_2d;
        if desc.width > max || desc.height > max {
            return Err(RenderError::OutOfMemory {
                label: desc.label.clone(),
                width: desc.width,
                height: desc.height,
            });
        }
        let (texture, view) = helpers::create_color_texture(&self.device, desc, TARGET_FORMAT);
        let id = self.textures.insert(GpuTexture {
            desc: desc.clone(),
            texture,
            view,
        });
        log::debug!("[gpu] texture {id:?} `{}` {}x{}", desc.label, desc.width, desc.height);
        Ok(id)
    }

    fn destroy_texture(&mut self, id: TextureId) {
        self.flush();
        match self.textures.remove(id) {
            Some(t) => t.texture.destroy(),
            None => log::warn!("[gpu] destroy of unknown texture {id:?}"),
        }
    }

    fn upload_texture(&mut self, id: TextureId, pixels: &RgbaImage) -> RenderResult<()> {
        let tex = self.gpu_texture(id)?;
        let (width, height) = pixels.dimensions();
        self.queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &tex.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            pixels.as_raw(),
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(4 * width),
                rows_per_image: Some(height),
            },
            wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
        );
        log::debug!("[gpu] uploaded {width}x{height} into {id:?}");
        Ok(())
    }

    fn compile_shader(&mut self, kind: ShaderKind, source: &ShaderSource) -> RenderResult<()> {
        source.check_interface(kind)?;
        let module = self
            .device
            .create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some(kind.name()),
                source: wgpu::ShaderSource::Wgsl(Cow::Owned(format!(
                    "{}\n{}",
                    source.vertex, source.fragment
                ))),
            });

        let mut entries = Vec::new();
        let mut binding = 0;
        let mut has_scalars = false;
        for &(_, ty) in kind.uniforms() {
            if ty == UniformType::Texture {
                entries.push(helpers::texture_entry(binding));
                entries.push(helpers::sampler_entry(binding + 1));
                binding += 2;
            } else {
                has_scalars = true;
            }
        }
        if has_scalars {
            entries.push(helpers::uniform_entry(binding));
        }
        let layout = self
            .device
            .create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some(kind.name()),
                entries: &entries,
            });
        let pl = self
            .device
            .create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some(kind.name()),
                bind_group_layouts: &[&layout],
                push_constant_ranges: &[],
            });
        let pipelines = formats(self.config.format)
            .map(|f| {
                let p = helpers::make_fullscreen_pipeline(
                    &self.device,
                    kind.name(),
                    &pl,
                    &module,
                    f,
                    None,
                );
                (f, p)
            })
            .collect();
        self.programs.insert(kind, Program { layout, pipelines });
        log::info!("[gpu] compiled shader `{kind}`");
        Ok(())
    }

    fn bind_target(&mut self, target: Option<TextureId>) {
        if target != self.bound {
            self.flush();
            self.bound = target;
        }
    }

    fn bound_target(&self) -> Option<TextureId> {
        self.bound
    }

    fn clear(&mut self, rgba: [f32; 4]) {
        // a clear discards anything recorded so far for this destination
        let rec = self.recording();
        rec.ops.clear();
        rec.clear = Some(to_color(rgba));
    }

    fn fill_capsule(&mut self, capsule: &Capsule, rgba: [f32; 4]) {
        let uniforms = CapsuleUniforms {
            p0: capsule.from.to_array(),
            p1: capsule.to.to_array(),
            cap_radii: capsule.cap_radii.to_array(),
            half_width: capsule.half_width,
            _pad: 0.0,
            color: rgba,
        };
        let buffer = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("capsule_uniforms"),
                contents: bytemuck::bytes_of(&uniforms),
                usage: wgpu::BufferUsages::UNIFORM,
            });
        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("capsule_bg"),
            layout: &self.capsule.layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.as_entire_binding(),
            }],
        });
        self.recording().ops.push(DrawOp {
            key: PipelineKey::Capsule,
            bind_group,
        });
    }

    fn draw_pass(&mut self, pass: &ShaderPass) -> RenderResult<()> {
        pass.check_complete()?;
        let kind = pass.kind();
        if !self.programs.contains_key(&kind) {
            return Err(RenderError::ShaderNotLoaded(kind));
        }
        if let Some(id) = self.bound {
            self.gpu_texture(id)?;
        }

        let mut textures = Vec::new();
        let mut scalars = Vec::new();
        for &(name, _) in kind.uniforms() {
            match pass.get(name) {
                Some(Uniform::Texture(id)) => {
                    let desc = &self.gpu_texture(id)?.desc;
                    let key = (desc.filter, desc.wrap);
                    self.ensure_sampler(key);
                    textures.push((id, key));
                }
                Some(v) => scalars.push(v),
                None => return Err(RenderError::MissingUniform { kind, name }),
            }
        }
        let buffer = (!scalars.is_empty()).then(|| {
            self.device
                .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some("pass_uniforms"),
                    contents: &helpers::pack_uniforms(&scalars),
                    usage: wgpu::BufferUsages::UNIFORM,
                })
        });

        let mut entries = Vec::with_capacity(textures.len() * 2 + 1);
        for (i, (id, key)) in textures.iter().enumerate() {
            let binding = 2 * i as u32;
            let sampler = self
                .samplers
                .get(key)
                .ok_or(RenderError::UnknownTexture(*id))?;
            entries.push(wgpu::BindGroupEntry {
                binding,
                resource: wgpu::BindingResource::TextureView(&self.gpu_texture(*id)?.view),
            });
            entries.push(wgpu::BindGroupEntry {
                binding: binding + 1,
                resource: wgpu::BindingResource::Sampler(sampler),
            });
        }
        if let Some(buffer) = &buffer {
            entries.push(wgpu::BindGroupEntry {
                binding: 2 * textures.len() as u32,
                resource: buffer.as_entire_binding(),
            });
        }
        let program = self
            .programs
            .get(&kind)
            .ok_or(RenderError::ShaderNotLoaded(kind))?;
        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(kind.name()),
            layout: &program.layout,
            entries: &entries,
        });
        self.recording().ops.push(DrawOp {
            key: PipelineKey::Shader(kind),
            bind_group,
        });
        Ok(())
    }

    fn begin_frame(&mut self) -> RenderResult<bool> {
        self.reconfigure_if_needed();
        match self.surface.get_current_texture() {
            Ok(frame) => {
                let view = frame
                    .texture
                    .create_view(&wgpu::TextureViewDescriptor::default());
                self.frame = Some((frame, view));
                Ok(true)
            }
            Err(wgpu::SurfaceError::OutOfMemory) => Err(RenderError::OutOfMemory {
                label: "surface".into(),
                width: self.config.width,
                height: self.config.height,
            }),
            Err(e @ (wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated)) => {
                log::warn!("[gpu] surface {e}; reconfiguring");
                self.surface.configure(&self.device, &self.config);
                Ok(false)
            }
            Err(e) => {
                log::warn!("[gpu] no surface texture: {e}");
                Ok(false)
            }
        }
    }

    fn end_frame(&mut self) -> RenderResult<()> {
        self.flush();
        if let Some((frame, _view)) = self.frame.take() {
            frame.present();
        }
        Ok(())
    }
}
