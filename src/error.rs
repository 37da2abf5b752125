use thiserror::Error;

/// Everything that can go wrong while bringing the background up or drawing it.
#[derive(Debug, Error)]
pub enum BackgroundError {
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("invalid color '{0}', expected #rrggbb")]
    InvalidColor(String),

    #[error("failed to create surface: {0}")]
    CreateSurface(#[from] wgpu::CreateSurfaceError),

    #[error("no suitable GPU adapter: {0}")]
    RequestAdapter(#[from] wgpu::RequestAdapterError),

    #[error("failed to create device: {0}")]
    RequestDevice(#[from] wgpu::RequestDeviceError),

    #[error("surface is not supported by the selected adapter")]
    UnsupportedSurface,

    #[error("surface error: {0}")]
    Surface(#[from] wgpu::SurfaceError),

    #[error("event loop error: {0}")]
    EventLoop(#[from] winit::error::EventLoopError),

    #[error("failed to create window: {0}")]
    Window(#[from] winit::error::OsError),

    #[error("DOM error: {0}")]
    Dom(String),
}

pub type Result<T> = std::result::Result<T, BackgroundError>;
