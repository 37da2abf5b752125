use std::sync::Arc;

use rand::SeedableRng;
use rand::rngs::StdRng;
use winit::{
    application::ApplicationHandler,
    event::WindowEvent,
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop, EventLoopProxy},
    window::{Window, WindowId},
};

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

use crate::component::BackgroundAnimation;
use crate::config::AnimationConfig;
#[cfg(not(target_arch = "wasm32"))]
use crate::config::{DIMX, DIMY};
use crate::error::{BackgroundError, Result};
use crate::gpu::{GpuContext, GpuMount, GpuRenderer};
use crate::host::{FrameHandle, Host, ResizeSubscription};
use crate::timing::FrameStats;

pub enum AppEvent {
    /// GPU acquisition finished. Web targets get here asynchronously.
    GpuReady(Box<Result<GpuMount>>),
}

// ======================================
// === WINDOW HOST ===
// ======================================

/// [`Host`] backed by a winit window: frames are redraw requests, resizes are
/// `WindowEvent::Resized`.
pub struct WindowHost {
    window: Arc<Window>,
    next_id: u64,
    pending_frame: Option<FrameHandle>,
    resize_subscription: Option<u64>,
}

impl WindowHost {
    pub fn new(window: Arc<Window>) -> Self {
        Self {
            window,
            next_id: 0,
            pending_frame: None,
            resize_subscription: None,
        }
    }

    pub fn window_id(&self) -> WindowId {
        self.window.id()
    }

    /// The frame to run for this redraw, if one was requested.
    pub fn take_due_frame(&mut self) -> Option<FrameHandle> {
        self.pending_frame.take()
    }

    pub fn wants_resize(&self) -> bool {
        self.resize_subscription.is_some()
    }

    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }
}

impl Host for WindowHost {
    fn viewport_size(&self) -> (u32, u32) {
        #[cfg(target_arch = "wasm32")]
        if let Some(web_window) = web_sys::window() {
            let dpr = web_window.device_pixel_ratio();
            let width = web_window.inner_width().ok().and_then(|v| v.as_f64()).unwrap_or(0.0);
            let height = web_window.inner_height().ok().and_then(|v| v.as_f64()).unwrap_or(0.0);
            return ((width * dpr) as u32, (height * dpr) as u32);
        }

        let size = self.window.inner_size();
        (size.width, size.height)
    }

    fn request_frame(&mut self) -> FrameHandle {
        let handle = FrameHandle::new(self.next_id());
        self.pending_frame = Some(handle);
        self.window.request_redraw();
        handle
    }

    fn cancel_frame(&mut self, handle: FrameHandle) {
        if self.pending_frame == Some(handle) {
            self.pending_frame = None;
        }
    }

    fn subscribe_resize(&mut self) -> ResizeSubscription {
        let id = self.next_id();
        self.resize_subscription = Some(id);
        ResizeSubscription::new(id)
    }

    fn unsubscribe_resize(&mut self, subscription: ResizeSubscription) {
        if self.resize_subscription == Some(subscription.id()) {
            self.resize_subscription = None;
        }
    }
}

// ======================================
// === APPLICATION ===
// ======================================

pub struct BackgroundApp {
    config: AnimationConfig,
    proxy: EventLoopProxy<AppEvent>,
    rng: StdRng,
    host: Option<WindowHost>,
    background: Option<BackgroundAnimation<GpuRenderer>>,
    stats: FrameStats,
}

impl BackgroundApp {
    pub fn new(config: AnimationConfig, proxy: EventLoopProxy<AppEvent>) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            config,
            proxy,
            rng,
            host: None,
            background: None,
            stats: FrameStats::default(),
        }
    }

    fn mount(&mut self, target: Option<GpuMount>) {
        let Some(host) = self.host.as_mut() else {
            return;
        };
        match BackgroundAnimation::mount(target, host, &self.config, &mut self.rng) {
            Ok(background) => self.background = Some(background),
            Err(e) => log::error!("Failed to mount background: {e}"),
        }
    }

    fn teardown(&mut self) {
        if let (Some(background), Some(host)) = (self.background.take(), self.host.as_mut()) {
            background.unmount(host);
        }
    }

    fn redraw(&mut self, event_loop: &ActiveEventLoop) {
        let (Some(host), Some(background)) = (self.host.as_mut(), self.background.as_mut()) else {
            return;
        };
        let Some(handle) = host.take_due_frame() else {
            return;
        };

        self.stats.tick();

        match background.on_frame(host, handle) {
            Ok(()) => {}
            Err(BackgroundError::Surface(wgpu::SurfaceError::OutOfMemory)) => {
                log::error!("Out of memory, exiting");
                self.teardown();
                event_loop.exit();
            }
            Err(e) => log::error!("Render error: {e}"),
        }
    }

    fn create_window(&self, event_loop: &ActiveEventLoop) -> Result<Arc<Window>> {
        let attributes = Window::default_attributes().with_title(self.config.title.as_str());

        #[cfg(not(target_arch = "wasm32"))]
        let attributes = attributes.with_inner_size(winit::dpi::PhysicalSize::new(DIMX, DIMY));

        // The canvas goes into the configured container on attach, not into <body>.
        #[cfg(target_arch = "wasm32")]
        let attributes = {
            use winit::platform::web::WindowAttributesExtWebSys;
            attributes.with_append(false)
        };

        Ok(Arc::new(event_loop.create_window(attributes)?))
    }

    fn send_gpu_ready(proxy: &EventLoopProxy<AppEvent>, result: Result<GpuMount>) {
        if proxy.send_event(AppEvent::GpuReady(Box::new(result))).is_err() {
            log::warn!("Event loop closed before GPU initialization finished");
        }
    }
}

impl ApplicationHandler<AppEvent> for BackgroundApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.host.is_some() {
            return;
        }

        let window = match self.create_window(event_loop) {
            Ok(window) => window,
            Err(e) => {
                log::error!("{e}");
                event_loop.exit();
                return;
            }
        };
        self.host = Some(WindowHost::new(window.clone()));

        #[cfg(target_arch = "wasm32")]
        {
            let container = web_sys::window()
                .and_then(|w| w.document())
                .and_then(|d| d.get_element_by_id(&self.config.container_id));

            let Some(container) = container else {
                log::info!("No element with id '{}'", self.config.container_id);
                self.mount(None);
                return;
            };

            let proxy = self.proxy.clone();
            wasm_bindgen_futures::spawn_local(async move {
                let result = GpuContext::new(window)
                    .await
                    .map(|context| GpuMount::new(context, container));
                Self::send_gpu_ready(&proxy, result);
            });
        }

        #[cfg(not(target_arch = "wasm32"))]
        {
            let result = pollster::block_on(GpuContext::new(window)).map(GpuMount::new);
            Self::send_gpu_ready(&self.proxy, result);
        }
    }

    fn user_event(&mut self, _event_loop: &ActiveEventLoop, event: AppEvent) {
        match event {
            AppEvent::GpuReady(result) => match *result {
                Ok(target) => self.mount(Some(target)),
                Err(e) => {
                    log::error!("GPU initialization failed: {e}");
                    self.mount(None);
                }
            },
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, id: WindowId, event: WindowEvent) {
        let Some(host) = self.host.as_ref() else {
            return;
        };
        if host.window_id() != id {
            return;
        }

        match event {
            WindowEvent::Resized(size) => {
                if host.wants_resize() {
                    if let Some(background) = self.background.as_mut() {
                        background.on_resize(size.width, size.height);
                    }
                }
            }
            WindowEvent::RedrawRequested => self.redraw(event_loop),
            WindowEvent::CloseRequested => {
                log::info!("Close requested");
                self.teardown();
                event_loop.exit();
            }
            _ => {}
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        self.teardown();
    }
}

// ======================================
// === MAIN ENTRY POINT ===
// ======================================

/// Builds the event loop and runs the background until the window closes.
pub fn start(config: AnimationConfig) -> Result<()> {
    config.validate()?;

    let event_loop = EventLoop::<AppEvent>::with_user_event().build()?;
    event_loop.set_control_flow(ControlFlow::Wait);

    let app = BackgroundApp::new(config, event_loop.create_proxy());

    cfg_if::cfg_if! {
        if #[cfg(target_arch = "wasm32")] {
            use winit::platform::web::EventLoopExtWebSys;
            event_loop.spawn_app(app);
        } else {
            let mut app = app;
            event_loop.run_app(&mut app)?;
        }
    }

    Ok(())
}

#[cfg_attr(target_arch = "wasm32", wasm_bindgen(start))]
pub fn run() {
    cfg_if::cfg_if! {
        if #[cfg(target_arch = "wasm32")] {
            std::panic::set_hook(Box::new(console_error_panic_hook::hook));
            if console_log::init_with_level(log::Level::Info).is_err() {
                web_sys::console::warn_1(&"Logger already initialized".into());
            }
        } else {
            env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
        }
    }

    log::info!("Started wterrain v{}", env!("CARGO_PKG_VERSION"));

    if let Err(e) = start(AnimationConfig::from_env()) {
        log::error!("wterrain stopped: {e}");
    }
}
