//! Seams between the background and whatever environment it is mounted in.
//!
//! The host owns the display-refresh and resize primitives; the component only holds
//! the handles it was given and returns them on unmount.

use crate::error::Result;
use crate::scene::Scene;

/// A scheduled display-refresh callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameHandle(u64);

impl FrameHandle {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn id(&self) -> u64 {
        self.0
    }
}

/// An active registration for viewport resize notifications.
#[derive(Debug, PartialEq, Eq, Hash)]
pub struct ResizeSubscription(u64);

impl ResizeSubscription {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn id(&self) -> u64 {
        self.0
    }
}

pub trait Host {
    /// Current viewport size in physical pixels.
    fn viewport_size(&self) -> (u32, u32);

    /// Schedules one display-refresh callback.
    fn request_frame(&mut self) -> FrameHandle;

    fn cancel_frame(&mut self, handle: FrameHandle);

    fn subscribe_resize(&mut self) -> ResizeSubscription;

    fn unsubscribe_resize(&mut self, subscription: ResizeSubscription);
}

/// Draws a [`Scene`] onto an attached surface.
pub trait Renderer {
    fn resize(&mut self, width: u32, height: u32);

    fn render(&mut self, scene: &Scene) -> Result<()>;

    /// Detaches the surface and frees every graphics resource.
    fn release(self);
}

/// Where a rendering surface can be attached.
pub trait MountTarget {
    type Renderer: Renderer;

    fn attach(self, width: u32, height: u32, scene: &Scene) -> Result<Self::Renderer>;
}
