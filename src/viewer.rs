//! Window, surface and event loop around a [`Scene`].
//!
//! The scene itself knows nothing about winit; this module turns window
//! events into scene calls and presents what the scene draws.

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use wgpu::{self, SurfaceError};
use winit::{
    application::ApplicationHandler,
    dpi::{PhysicalPosition, PhysicalSize},
    event::{ElementState, KeyEvent, MouseButton, WindowEvent},
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    keyboard::{Key, NamedKey},
    window::{Window, WindowAttributes},
};

use crate::command::CommandReceiver;
use crate::config::SceneConfig;
use crate::gpu::{Renderer, WgpuBackend};
use crate::scene::Scene;

/// Commands handled per frame; the rest wait for the next one.
const COMMANDS_PER_FRAME: usize = 64;

/// Wake-ups posted to the event loop from other threads.
#[derive(Debug)]
enum ViewerEvent {
    Cancelled,
    /// The shell queued commands; drain them on the next frame.
    CommandsQueued,
}

/// How the loop reacts when the surface cannot hand out a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Recovery {
    Reconfigure,
    SkipFrame,
    Close,
}

impl Recovery {
    fn for_error(err: &SurfaceError) -> Self {
        match err {
            SurfaceError::Outdated | SurfaceError::Lost | SurfaceError::Other => {
                Recovery::Reconfigure
            }
            SurfaceError::Timeout => Recovery::SkipFrame,
            SurfaceError::OutOfMemory => Recovery::Close,
        }
    }
}

struct ViewerApp {
    cfg: SceneConfig,
    cancel: CancellationToken,
    commands: CommandReceiver,
    window: Option<Arc<Window>>,
    surface: Option<wgpu::Surface<'static>>,
    surface_config: Option<wgpu::SurfaceConfiguration>,
    renderer: Option<Renderer<WgpuBackend>>,
    scene: Option<Scene>,
    cursor: PhysicalPosition<f64>,
    last_frame: Instant,
    pending_redraw: bool,
}

impl ViewerApp {
    fn new(cfg: SceneConfig, cancel: CancellationToken, commands: CommandReceiver) -> Self {
        Self {
            cfg,
            cancel,
            commands,
            window: None,
            surface: None,
            surface_config: None,
            renderer: None,
            scene: None,
            cursor: PhysicalPosition::new(0.0, 0.0),
            last_frame: Instant::now(),
            pending_redraw: false,
        }
    }

    fn ensure_window(&mut self, event_loop: &ActiveEventLoop) -> Option<Arc<Window>> {
        if let Some(window) = self.window.as_ref() {
            return Some(window.clone());
        }

        let attrs = WindowAttributes::default()
            .with_title(self.cfg.window.title.clone())
            .with_inner_size(PhysicalSize::new(self.cfg.window.width, self.cfg.window.height));
        match event_loop.create_window(attrs) {
            Ok(window) => {
                let window = Arc::new(window);
                self.window = Some(window.clone());
                Some(window)
            }
            Err(err) => {
                error!(error = %err, "failed to open field window");
                None
            }
        }
    }

    fn init_gpu(&mut self, window: Arc<Window>) -> Result<()> {
        let instance = wgpu::Instance::default();
        let surface = instance
            .create_surface(window.clone())
            .context("failed to create surface")?;
        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: Some(&surface),
            force_fallback_adapter: false,
        }))
        .context("failed to acquire GPU adapter")?;

        // Scene colors are display values; store them unencoded.
        let caps = surface.get_capabilities(&adapter);
        let format = caps
            .formats
            .iter()
            .copied()
            .find(|fmt| !fmt.is_srgb())
            .unwrap_or(caps.formats[0]);

        let limits = adapter.limits();
        let (device, queue) = pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor {
            label: Some("fieldview-device"),
            required_features: wgpu::Features::empty(),
            required_limits: limits,
            experimental_features: wgpu::ExperimentalFeatures::disabled(),
            memory_hints: wgpu::MemoryHints::default(),
            trace: wgpu::Trace::default(),
        }))
        .context("failed to acquire GPU device")?;

        let size = window.inner_size();
        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode: caps.alpha_modes[0],
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);
        info!(
            width = config.width,
            height = config.height,
            format = ?config.format,
            "field surface configured",
        );

        let backend =
            WgpuBackend::new(device, queue, format).context("failed to build GPU pipelines")?;
        let mut renderer = Renderer::new(backend);
        let scene = Scene::build(
            self.cfg.clone(),
            &mut renderer,
            f64::from(config.width),
            f64::from(config.height),
        )
        .context("failed to build scene")?;

        self.surface = Some(surface);
        self.surface_config = Some(config);
        self.renderer = Some(renderer);
        self.scene = Some(scene);
        self.last_frame = Instant::now();
        self.pending_redraw = true;
        Ok(())
    }

    fn handle_resize(&mut self, new_size: PhysicalSize<u32>) {
        let (Some(surface), Some(renderer), Some(config)) = (
            self.surface.as_ref(),
            self.renderer.as_ref(),
            self.surface_config.as_mut(),
        ) else {
            return;
        };

        config.width = new_size.width.max(1);
        config.height = new_size.height.max(1);
        surface.configure(renderer.backend().device(), config);
        debug!(
            width = config.width,
            height = config.height,
            "field surface resized; panels relaid out",
        );
        if let Some(scene) = self.scene.as_mut() {
            scene.resize(f64::from(config.width), f64::from(config.height));
        }

        self.request_redraw();
    }

    fn draw(&mut self, event_loop: &ActiveEventLoop) {
        let Some(window) = self.window.clone() else {
            return;
        };
        let (Some(surface), Some(renderer), Some(config), Some(scene)) = (
            self.surface.as_ref(),
            self.renderer.as_mut(),
            self.surface_config.as_ref(),
            self.scene.as_mut(),
        ) else {
            return;
        };

        self.commands
            .drain(COMMANDS_PER_FRAME, |command| scene.handle(renderer, command));
        if scene.quit_requested() {
            info!("quit requested");
            event_loop.exit();
            return;
        }

        let now = Instant::now();
        let dt = now.duration_since(self.last_frame).as_secs_f32();
        self.last_frame = now;
        if let Err(err) = scene.advance(renderer, dt) {
            warn!(error = ?err, "failed to advance fields");
        }

        let frame = match surface.get_current_texture() {
            Ok(frame) => frame,
            Err(err) => {
                match Recovery::for_error(&err) {
                    Recovery::Reconfigure => {
                        info!(error = %err, "field surface needs reconfiguring");
                        self.handle_resize(window.inner_size());
                    }
                    Recovery::SkipFrame => warn!(error = %err, "field surface skipped a frame"),
                    Recovery::Close => {
                        error!(error = %err, "field surface unusable; closing window");
                        event_loop.exit();
                    }
                }
                return;
            }
        };
        let view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        self.pending_redraw = false;
        renderer
            .backend_mut()
            .begin_frame(config.width, config.height);
        if let Err(err) = scene.draw(renderer) {
            error!(error = ?err, "failed to draw scene");
            event_loop.exit();
            return;
        }
        renderer.backend_mut().end_frame(&view);
        window.pre_present_notify();
        frame.present();
    }

    fn request_redraw(&mut self) {
        self.pending_redraw = true;
        if let Some(window) = self.window.as_ref() {
            window.request_redraw();
        }
    }

    fn handle_key(&mut self, event_loop: &ActiveEventLoop, event: &KeyEvent) {
        if event.state != ElementState::Pressed || event.repeat {
            return;
        }
        if matches!(event.logical_key, Key::Named(NamedKey::Escape)) {
            event_loop.exit();
            return;
        }
        let Key::Character(text) = &event.logical_key else {
            return;
        };
        let (Some(scene), Some(renderer)) = (self.scene.as_mut(), self.renderer.as_mut()) else {
            return;
        };
        match text.to_ascii_lowercase().as_str() {
            "i" => scene.cycle_interpolation(renderer),
            "g" => scene.toggle_grid(renderer),
            "l" => scene.toggle_light(renderer),
            "c" => scene.cycle_colormap(renderer),
            "q" => {
                event_loop.exit();
                return;
            }
            _ => return,
        }
        self.request_redraw();
    }

    fn handle_click(&mut self) {
        let (Some(scene), Some(config)) = (self.scene.as_mut(), self.surface_config.as_ref())
        else {
            return;
        };
        // Window coordinates grow downwards, the figure tree's upwards.
        let point = (self.cursor.x, f64::from(config.height) - self.cursor.y);
        if scene.click(point).is_none() {
            debug!(x = point.0, y = point.1, "click outside every panel");
        }
    }
}

impl ApplicationHandler<ViewerEvent> for ViewerApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.cancel.is_cancelled() {
            event_loop.exit();
            return;
        }

        let Some(window) = self.ensure_window(event_loop) else {
            event_loop.exit();
            return;
        };

        if self.renderer.is_none() {
            if let Err(err) = self.init_gpu(window) {
                error!(error = ?err, "failed to set up GPU rendering for the scene");
                event_loop.exit();
                return;
            }
        }

        self.request_redraw();
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        window_id: winit::window::WindowId,
        event: WindowEvent,
    ) {
        let Some(window) = self.window.as_ref() else {
            return;
        };
        if window.id() != window_id {
            return;
        }
        match event {
            WindowEvent::CloseRequested => {
                info!("field window closed");
                event_loop.exit();
            }
            WindowEvent::Resized(new_size) => {
                self.handle_resize(new_size);
            }
            WindowEvent::ScaleFactorChanged {
                mut inner_size_writer,
                ..
            } => {
                let size = window.inner_size();
                let _ = inner_size_writer.request_inner_size(size);
                self.handle_resize(size);
            }
            WindowEvent::KeyboardInput { event, .. } => {
                self.handle_key(event_loop, &event);
            }
            WindowEvent::CursorMoved { position, .. } => {
                self.cursor = position;
            }
            WindowEvent::MouseInput {
                state: ElementState::Pressed,
                button: MouseButton::Left,
                ..
            } => {
                self.handle_click();
            }
            WindowEvent::RedrawRequested => {
                self.draw(event_loop);
            }
            _ => {}
        }
    }

    /// Animated fields redraw every `redraw-interval`; static scenes only on
    /// input, resize or queued commands.
    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        let animated = self.scene.as_ref().is_some_and(Scene::is_animated);
        if animated {
            let interval = self.cfg.window.redraw_interval.max(Duration::from_millis(1));
            let due = self.last_frame + interval;
            if Instant::now() >= due {
                self.pending_redraw = true;
            } else {
                event_loop.set_control_flow(ControlFlow::WaitUntil(due));
            }
        }
        if self.pending_redraw {
            if let Some(window) = self.window.as_ref() {
                window.request_redraw();
            }
        }
    }

    fn user_event(&mut self, event_loop: &ActiveEventLoop, event: ViewerEvent) {
        match event {
            ViewerEvent::Cancelled => {
                info!("shutdown requested; closing field window");
                event_loop.exit();
            }
            ViewerEvent::CommandsQueued => {
                self.request_redraw();
            }
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        if let (Some(scene), Some(renderer)) = (self.scene.as_mut(), self.renderer.as_mut()) {
            scene.destroy(renderer);
        }
    }
}

/// Opens the window and renders `cfg` until it is closed or `cancel` fires.
pub fn run_windowed(
    cfg: SceneConfig,
    commands: CommandReceiver,
    cancel: CancellationToken,
) -> Result<()> {
    let event_loop = EventLoop::<ViewerEvent>::with_user_event()
        .build()
        .context("failed to build field event loop")?;
    let proxy = event_loop.create_proxy();

    // Wakes the loop on every enqueue.
    let waker = Mutex::new(proxy.clone());
    commands.set_waker(move || {
        let _ = waker.lock().send_event(ViewerEvent::CommandsQueued);
    });

    let cancel_task = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            cancel.cancelled().await;
            let _ = proxy.send_event(ViewerEvent::Cancelled);
        })
    };

    let mut app = ViewerApp::new(cfg, cancel, commands);
    let run_result = event_loop.run_app(&mut app);
    cancel_task.abort();

    run_result.context("field event loop failed")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_memory_exhaustion_closes_the_window() {
        assert_eq!(Recovery::for_error(&SurfaceError::Lost), Recovery::Reconfigure);
        assert_eq!(Recovery::for_error(&SurfaceError::Outdated), Recovery::Reconfigure);
        assert_eq!(Recovery::for_error(&SurfaceError::Other), Recovery::Reconfigure);
        assert_eq!(Recovery::for_error(&SurfaceError::Timeout), Recovery::SkipFrame);
        assert_eq!(Recovery::for_error(&SurfaceError::OutOfMemory), Recovery::Close);
    }
}
