use std::cell::RefCell;
use std::rc::Rc;
use std::sync::{Arc, Mutex};

use bytemuck::{Pod, Zeroable};
use folio_gpu::frame_monitor::{FrameTimeMonitor, FrameTimingsReport};
use folio_gpu::lifecycle::{AdapterHooks, AdapterLifecycleState, LifecycleTracker, RendererAdapter};
use folio_gpu::section::{section_color_f32, PanelLayout, SectionFocus};
use folio_gpu::stats::RendererStats;
use folio_gpu::subscription::SubscriptionSet;
use folio_gpu::{RendererChoice, RendererConfig, RendererError};
use web_sys::{Event, HtmlCanvasElement, HtmlElement, MouseEvent};

use super::{dom, frame_loop, listeners};

const PANEL_SHADER: &str = r#"
struct Globals {
    time: f32,
    pad0: f32,
    pad1: f32,
    pad2: f32,
};

@group(0) @binding(0) var<uniform> globals: Globals;

struct Panel {
    // x, y, width, height in [0, 1] surface space, y down.
    @location(0) rect: vec4<f32>,
    // rgb, emphasis in w.
    @location(1) color: vec4<f32>,
};

struct VsOut {
    @builtin(position) position: vec4<f32>,
    @location(0) color: vec3<f32>,
    @location(1) emphasis: f32,
    @location(2) uv: vec2<f32>,
};

@vertex
fn vs_main(@builtin(vertex_index) vertex_index: u32, panel: Panel) -> VsOut {
    var corners = array<vec2<f32>, 6>(
        vec2<f32>(0.0, 0.0),
        vec2<f32>(1.0, 0.0),
        vec2<f32>(0.0, 1.0),
        vec2<f32>(0.0, 1.0),
        vec2<f32>(1.0, 0.0),
        vec2<f32>(1.0, 1.0),
    );
    let corner = corners[vertex_index];
    let p = panel.rect.xy + corner * panel.rect.zw;

    var out: VsOut;
    out.position = vec4<f32>(p.x * 2.0 - 1.0, 1.0 - p.y * 2.0, 0.0, 1.0);
    out.color = panel.color.rgb;
    out.emphasis = panel.color.w;
    out.uv = corner;
    return out;
}

@fragment
fn fs_main(input: VsOut) -> @location(0) vec4<f32> {
    let edge = min(min(input.uv.x, 1.0 - input.uv.x), min(input.uv.y, 1.0 - input.uv.y));
    let border = step(edge, 0.03) * input.emphasis;
    let pulse = 0.9 + 0.1 * sin(globals.time * 3.0);
    let base = input.color * mix(0.75, pulse, input.emphasis);
    return vec4<f32>(mix(base, vec3<f32>(1.0, 1.0, 1.0), border), 1.0);
}
"#;

const CLEAR_COLOR: wgpu::Color = wgpu::Color {
    r: 0.06,
    g: 0.09,
    b: 0.16,
    a: 1.0,
};

#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
struct Globals {
    time: f32,
    _pad: [f32; 3],
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
struct PanelInstance {
    rect: [f32; 4],
    color: [f32; 4],
}

/// First device failure reported by wgpu callbacks, picked up by the next
/// frame. The callbacks must be `Send`, hence the mutex.
#[derive(Debug, Clone, Default)]
struct DeviceFaults {
    first: Arc<Mutex<Option<RendererError>>>,
}

impl DeviceFaults {
    fn record(&self, error: RendererError) {
        if let Ok(mut slot) = self.first.lock() {
            slot.get_or_insert(error);
        }
    }

    /// `Destroyed` is our own teardown and not a failure.
    fn record_lost(&self, reason: wgpu::DeviceLostReason, message: &str) {
        if matches!(reason, wgpu::DeviceLostReason::Destroyed) {
            return;
        }
        self.record(RendererError::ContextLost(format!(
            "device lost ({reason:?}): {message}"
        )));
    }

    fn take(&self) -> Option<RendererError> {
        self.first.lock().ok().and_then(|mut slot| slot.take())
    }
}

const PANEL_ATTRIBUTES: [wgpu::VertexAttribute; 2] =
    wgpu::vertex_attr_array![0 => Float32x4, 1 => Float32x4];

/// wgpu renderer for the WebGPU tier (`BROWSER_WEBGPU`) and the WebGL tier
/// (`GL`, which wgpu maps to WebGL2 in the browser).
pub(crate) struct GpuAdapter {
    choice: RendererChoice,
    shared: Rc<RefCell<GpuState>>,
    stats: Rc<RendererStats>,
    timings: Rc<RefCell<Option<FrameTimingsReport>>>,
    mounted: bool,
}

struct GpuState {
    tracker: LifecycleTracker,
    focus: SectionFocus,
    layout: PanelLayout,
    monitor: FrameTimeMonitor,
    container: Option<HtmlElement>,
    canvas: Option<HtmlCanvasElement>,
    scene: Option<Scene>,
    needs_resize: bool,
    panels_dirty: bool,
    subscriptions: SubscriptionSet,
}

impl GpuAdapter {
    pub(crate) fn new(
        choice: RendererChoice,
        config: &RendererConfig,
        stats: Rc<RendererStats>,
        timings: Rc<RefCell<Option<FrameTimingsReport>>>,
    ) -> Self {
        let state = GpuState {
            tracker: LifecycleTracker::new(),
            focus: SectionFocus::new(0, config.section_count),
            layout: PanelLayout::new(config.section_count),
            monitor: FrameTimeMonitor::new(choice, config.slow_frame_ms),
            container: None,
            canvas: None,
            scene: None,
            needs_resize: false,
            panels_dirty: true,
            subscriptions: SubscriptionSet::new(),
        };
        Self {
            choice,
            shared: Rc::new(RefCell::new(state)),
            stats,
            timings,
            mounted: false,
        }
    }

    /// Synchronous part of mount: canvas and input listeners. The wgpu
    /// device is requested afterwards on a spawned task.
    fn attach(
        &self,
        container: &HtmlElement,
        initial_section: usize,
        hooks: &AdapterHooks,
    ) -> Result<HtmlCanvasElement, RendererError> {
        let canvas = dom::attach_canvas(container)?;
        {
            let mut state = self.shared.borrow_mut();
            state.focus = SectionFocus::new(initial_section, state.layout.section_count());
            state.container = Some(container.clone());
            state.canvas = Some(canvas.clone());
        }

        let resize = {
            let shared = self.shared.clone();
            listeners::listen(&dom::window()?, "resize", move |_: Event| {
                shared.borrow_mut().needs_resize = true;
            })?
        };

        let click = {
            let shared = self.shared.clone();
            let hooks = hooks.clone();
            listeners::listen(&canvas, "click", move |event: MouseEvent| {
                let hit = {
                    let state = shared.borrow();
                    state.canvas.as_ref().and_then(|canvas| {
                        let (x, y) =
                            dom::normalized_point(canvas, event.client_x(), event.client_y())?;
                        state.layout.hit_test(x, y, state.focus.target())
                    })
                };
                if let Some(index) = hit {
                    hooks.navigate(index);
                }
            })?
        };

        let context_lost = {
            let shared = self.shared.clone();
            let hooks = hooks.clone();
            listeners::listen(&canvas, "webglcontextlost", move |_: Event| {
                let failed = {
                    let mut state = shared.borrow_mut();
                    let failed = matches!(state.tracker.mark_failed(), Ok(true));
                    if failed {
                        state.release();
                    }
                    failed
                };
                if failed {
                    hooks.fail_runtime(RendererError::ContextLost("webglcontextlost".into()));
                }
            })?
        };

        let mut state = self.shared.borrow_mut();
        state.subscriptions.add(resize);
        state.subscriptions.add(click);
        state.subscriptions.add(context_lost);
        Ok(canvas)
    }

    fn fail_construction(&self, hooks: &AdapterHooks, err: RendererError) {
        {
            let mut state = self.shared.borrow_mut();
            let _ = state.tracker.mark_failed();
            state.release();
        }
        hooks.fail_construction(err);
    }
}

/// Async continuation of mount. Anything acquired after the adapter was
/// disposed is released on the spot.
async fn finish_mount(
    choice: RendererChoice,
    canvas: HtmlCanvasElement,
    shared: Rc<RefCell<GpuState>>,
    stats: Rc<RendererStats>,
    timings: Rc<RefCell<Option<FrameTimingsReport>>>,
    hooks: AdapterHooks,
) {
    let scene = Scene::new(choice, &canvas).await;

    let mut state = shared.borrow_mut();
    if !state.tracker.is_live() {
        if let Ok(scene) = scene {
            scene.destroy();
        }
        tracing::debug!("{} adapter disposed during setup", choice.as_str());
        return;
    }

    let scene = match scene {
        Ok(scene) => scene,
        Err(err) => {
            let _ = state.tracker.mark_failed();
            state.release();
            drop(state);
            hooks.fail_construction(err);
            return;
        }
    };
    tracing::info!("{} scene ready: {}", choice.as_str(), scene.adapter_name);
    state.scene = Some(scene);
    state.panels_dirty = true;
    drop(state);

    let frames = {
        let shared = shared.clone();
        let hooks = hooks.clone();
        frame_loop::start_animation_loop(move |timestamp| {
            let started = dom::now_ms();
            let outcome = {
                let Ok(mut state) = shared.try_borrow_mut() else {
                    return true;
                };
                if !state.tracker.is_live() {
                    return false;
                }
                match state.frame(timestamp, &stats) {
                    Ok(()) => {
                        state.monitor.record(dom::now_ms() - started);
                        *timings.borrow_mut() = state.monitor.report();
                        Ok(matches!(state.tracker.mark_running(), Ok(true)))
                    }
                    Err(err) => {
                        let _ = state.tracker.mark_failed();
                        state.release();
                        Err(err)
                    }
                }
            };
            match outcome {
                Ok(first_frame) => {
                    if first_frame {
                        hooks.first_frame();
                    }
                    true
                }
                Err(err) => {
                    hooks.fail_runtime(err);
                    false
                }
            }
        })
    };

    match frames {
        Ok(frames) => shared.borrow_mut().subscriptions.add(frames),
        Err(err) => {
            {
                let mut state = shared.borrow_mut();
                let _ = state.tracker.mark_failed();
                state.release();
            }
            hooks.fail_construction(err);
        }
    }
}

impl GpuState {
    fn release(&mut self) {
        self.subscriptions.dispose_all();
        if let Some(scene) = self.scene.take() {
            scene.destroy();
        }
        if let Some(canvas) = self.canvas.take() {
            canvas.remove();
        }
        self.container = None;
    }

    fn frame(&mut self, timestamp: f64, stats: &RendererStats) -> Result<(), RendererError> {
        let resize = if self.needs_resize {
            self.needs_resize = false;
            match (&self.canvas, &self.container) {
                (Some(canvas), Some(container)) => Some(dom::fit_canvas(canvas, container)),
                _ => None,
            }
        } else {
            None
        };
        if self.focus.take_for_frame().is_some() {
            self.panels_dirty = true;
        }

        let Some(scene) = self.scene.as_mut() else {
            return Ok(());
        };
        if let Some(err) = scene.take_device_error() {
            return Err(err);
        }
        if let Some((width, height)) = resize {
            scene.resize(width, height);
        }
        if self.panels_dirty {
            self.panels_dirty = false;
            scene.write_panels(&self.layout, self.focus.active());
        }
        scene.render((timestamp / 1000.0) as f32, stats)
    }
}

impl RendererAdapter for GpuAdapter {
    type Container = HtmlElement;

    fn choice(&self) -> RendererChoice {
        self.choice
    }

    fn mount(&mut self, container: &HtmlElement, initial_section: usize, hooks: AdapterHooks) {
        if self.shared.borrow().tracker.is_disposed() {
            hooks.fail_construction(RendererError::MountAfterDispose);
            return;
        }
        if self.mounted {
            hooks.fail_construction(RendererError::AlreadyMounted);
            return;
        }
        self.mounted = true;

        match self.attach(container, initial_section, &hooks) {
            Ok(canvas) => wasm_bindgen_futures::spawn_local(finish_mount(
                self.choice,
                canvas,
                self.shared.clone(),
                self.stats.clone(),
                self.timings.clone(),
                hooks,
            )),
            Err(err) => self.fail_construction(&hooks, err),
        }
    }

    fn set_active_section(&mut self, index: usize) {
        let mut state = self.shared.borrow_mut();
        if state.tracker.is_live() {
            state.focus.request(index);
        }
    }

    fn dispose(&mut self) {
        let mut state = self.shared.borrow_mut();
        if !state.tracker.mark_disposed() {
            return;
        }
        state.release();
    }

    fn lifecycle(&self) -> AdapterLifecycleState {
        self.shared.borrow().tracker.state()
    }
}

struct Scene {
    adapter_name: String,
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    pipeline: wgpu::RenderPipeline,
    globals_buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
    panel_buffer: wgpu::Buffer,
    panel_count: u32,
    faults: DeviceFaults,
}

impl Scene {
    async fn new(choice: RendererChoice, canvas: &HtmlCanvasElement) -> Result<Self, RendererError> {
        let backends = match choice {
            RendererChoice::TierA => wgpu::Backends::BROWSER_WEBGPU,
            // On wasm32, `wgpu`'s GL backend maps to WebGL2 when the `webgl`
            // feature is enabled.
            RendererChoice::TierB => wgpu::Backends::GL,
            other => return Err(RendererError::NoAdapter(other)),
        };

        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends,
            ..Default::default()
        });

        let surface = instance
            .create_surface(wgpu::SurfaceTarget::Canvas(canvas.clone()))
            .map_err(|err| RendererError::Surface(format!("failed to create wgpu surface: {err}")))?;

        let adapter = request_adapter_robust(&instance, &surface)
            .await
            .ok_or(RendererError::ContextUnavailable("no suitable GPU adapter"))?;

        // Keep limits conservative so the same scene runs on WebGL2.
        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("folio-gpu-wasm device"),
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::downlevel_webgl2_defaults(),
                },
                None,
            )
            .await
            .map_err(|err| RendererError::Backend(format!("failed to request device: {err}")))?;

        let faults = DeviceFaults::default();
        {
            let faults = faults.clone();
            device.on_uncaptured_error(Box::new(move |err| {
                faults.record(RendererError::Backend(err.to_string()));
            }));
        }
        {
            let faults = faults.clone();
            device.set_device_lost_callback(move |reason, message| {
                faults.record_lost(reason, &message);
            });
        }

        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = choose_surface_format(&surface_caps.formats);
        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: canvas.width().max(1),
            height: canvas.height().max(1),
            present_mode: choose_present_mode(&surface_caps.present_modes),
            alpha_mode: choose_alpha_mode(&surface_caps.alpha_modes),
            desired_maximum_frame_latency: 2,
            view_formats: vec![],
        };
        surface.configure(&device, &config);

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("folio-gpu-wasm.panels.bind_group_layout"),
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

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("folio-gpu-wasm.panels.pipeline_layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("folio-gpu-wasm.panels.shader"),
            source: wgpu::ShaderSource::Wgsl(PANEL_SHADER.into()),
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("folio-gpu-wasm.panels.pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: "vs_main",
                compilation_options: wgpu::PipelineCompilationOptions::default(),
                buffers: &[wgpu::VertexBufferLayout {
                    array_stride: std::mem::size_of::<PanelInstance>() as wgpu::BufferAddress,
                    step_mode: wgpu::VertexStepMode::Instance,
                    attributes: &PANEL_ATTRIBUTES,
                }],
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: "fs_main",
                compilation_options: wgpu::PipelineCompilationOptions::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format: surface_format,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None,
                unclipped_depth: false,
                polygon_mode: wgpu::PolygonMode::Fill,
                conservative: false,
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
        });

        let globals_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("folio-gpu-wasm.panels.globals"),
            size: std::mem::size_of::<Globals>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("folio-gpu-wasm.panels.bind_group"),
            layout: &bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: globals_buffer.as_entire_binding(),
            }],
        });

        let panel_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("folio-gpu-wasm.panels.instances"),
            size: std::mem::size_of::<PanelInstance>() as u64,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        Ok(Self {
            adapter_name: adapter.get_info().name,
            surface,
            device,
            queue,
            config,
            pipeline,
            globals_buffer,
            bind_group,
            panel_buffer,
            panel_count: 0,
            faults,
        })
    }

    fn take_device_error(&self) -> Option<RendererError> {
        self.faults.take()
    }

    fn resize(&mut self, width: u32, height: u32) {
        let width = width.max(1);
        let height = height.max(1);
        if (self.config.width, self.config.height) == (width, height) {
            return;
        }
        self.config.width = width;
        self.config.height = height;
        self.surface.configure(&self.device, &self.config);
    }

    /// Rewrites the instance buffer. The active panel goes last so it draws on
    /// top.
    fn write_panels(&mut self, layout: &PanelLayout, active: usize) {
        let count = layout.section_count();
        let panels: Vec<PanelInstance> = (0..count)
            .filter(|&i| i != active)
            .chain(std::iter::once(active))
            .map(|index| {
                let rect = layout.drawn_panel(index, active);
                let [r, g, b] = section_color_f32(index);
                let emphasis = if index == active { 1.0 } else { 0.0 };
                PanelInstance {
                    rect: [rect.x, rect.y, rect.width, rect.height],
                    color: [r, g, b, emphasis],
                }
            })
            .collect();

        let bytes: &[u8] = bytemuck::cast_slice(&panels);
        if self.panel_buffer.size() < bytes.len() as u64 {
            self.panel_buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
                label: Some("folio-gpu-wasm.panels.instances"),
                size: bytes.len() as u64,
                usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            });
        }
        self.queue.write_buffer(&self.panel_buffer, 0, bytes);
        self.panel_count = panels.len() as u32;
    }

    fn render(&mut self, time: f32, stats: &RendererStats) -> Result<(), RendererError> {
        let Some(frame) = acquire_surface_frame(&self.surface, &self.device, &self.config, stats)?
        else {
            return Ok(());
        };
        let view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        self.queue.write_buffer(
            &self.globals_buffer,
            0,
            bytemuck::bytes_of(&Globals {
                time,
                _pad: [0.0; 3],
            }),
        );

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("folio-gpu-wasm.panels.encoder"),
            });
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("folio-gpu-wasm.panels.pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(CLEAR_COLOR),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            if self.panel_count > 0 {
                pass.set_pipeline(&self.pipeline);
                pass.set_bind_group(0, &self.bind_group, &[]);
                pass.set_vertex_buffer(0, self.panel_buffer.slice(..));
                pass.draw(0..6, 0..self.panel_count);
            }
        }
        self.queue.submit(Some(encoder.finish()));
        frame.present();
        Ok(())
    }

    fn destroy(self) {
        self.device.destroy();
    }
}

async fn request_adapter_robust(
    instance: &wgpu::Instance,
    surface: &wgpu::Surface<'_>,
) -> Option<wgpu::Adapter> {
    for (power, fallback) in [
        (wgpu::PowerPreference::HighPerformance, false),
        (wgpu::PowerPreference::LowPower, false),
        (wgpu::PowerPreference::LowPower, true),
    ] {
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: power,
                compatible_surface: Some(surface),
                force_fallback_adapter: fallback,
            })
            .await;
        if adapter.is_some() {
            return adapter;
        }
    }
    None
}

/// `Ok(None)` means skip this frame.
fn acquire_surface_frame(
    surface: &wgpu::Surface<'static>,
    device: &wgpu::Device,
    config: &wgpu::SurfaceConfiguration,
    stats: &RendererStats,
) -> Result<Option<wgpu::SurfaceTexture>, RendererError> {
    match surface.get_current_texture() {
        Ok(frame) => Ok(Some(frame)),
        Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
            // Reconfigure and retry once.
            stats.inc_surface_reconfigures();
            surface.configure(device, config);
            surface.get_current_texture().map(Some).map_err(|err| {
                RendererError::Surface(format!("surface acquire failed after reconfigure: {err}"))
            })
        }
        Err(wgpu::SurfaceError::Timeout) => {
            tracing::debug!("surface acquire timed out; skipping frame");
            Ok(None)
        }
        Err(wgpu::SurfaceError::OutOfMemory) => {
            Err(RendererError::Surface("surface out of memory".to_string()))
        }
    }
}

fn choose_surface_format(formats: &[wgpu::TextureFormat]) -> wgpu::TextureFormat {
    formats
        .iter()
        .copied()
        .find(wgpu::TextureFormat::is_srgb)
        .or_else(|| formats.first().copied())
        .unwrap_or(wgpu::TextureFormat::Bgra8Unorm)
}

fn choose_alpha_mode(modes: &[wgpu::CompositeAlphaMode]) -> wgpu::CompositeAlphaMode {
    if modes.contains(&wgpu::CompositeAlphaMode::Opaque) {
        return wgpu::CompositeAlphaMode::Opaque;
    }
    modes
        .first()
        .copied()
        .unwrap_or(wgpu::CompositeAlphaMode::Opaque)
}

fn choose_present_mode(modes: &[wgpu::PresentMode]) -> wgpu::PresentMode {
    if modes.contains(&wgpu::PresentMode::Fifo) {
        return wgpu::PresentMode::Fifo;
    }
    modes.first().copied().unwrap_or(wgpu::PresentMode::Fifo)
}

#[cfg(test)]
mod tests {
    use super::*;
    use wasm_bindgen_test::*;

    wasm_bindgen_test_configure!(run_in_browser);

    #[wasm_bindgen_test]
    fn lost_device_surfaces_as_context_loss() {
        let faults = DeviceFaults::default();
        faults.record_lost(wgpu::DeviceLostReason::Unknown, "GPU process crashed");
        assert_eq!(
            faults.take(),
            Some(RendererError::ContextLost(
                "device lost (Unknown): GPU process crashed".to_string()
            ))
        );
        assert_eq!(faults.take(), None);
    }

    #[wasm_bindgen_test]
    fn destroying_our_own_device_is_not_a_fault() {
        let faults = DeviceFaults::default();
        faults.record_lost(wgpu::DeviceLostReason::Destroyed, "destroyed");
        assert_eq!(faults.take(), None);
    }

    #[wasm_bindgen_test]
    fn first_fault_wins_until_taken() {
        let faults = DeviceFaults::default();
        faults.record(RendererError::Backend("validation error".into()));
        faults.record_lost(wgpu::DeviceLostReason::Unknown, "later");
        assert_eq!(
            faults.take(),
            Some(RendererError::Backend("validation error".into()))
        );
    }
}
