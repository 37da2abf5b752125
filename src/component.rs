use rand::Rng;

use crate::config::AnimationConfig;
use crate::error::Result;
use crate::host::{FrameHandle, Host, MountTarget, Renderer, ResizeSubscription};
use crate::scene::Scene;

/// The animated terrain background.
///
/// Mounted with a target it owns a scene, a renderer and the host handles that keep it
/// animating. Mounted without one it is inert: nothing is acquired, frames and resizes
/// are ignored and unmount does nothing.
pub struct BackgroundAnimation<R: Renderer> {
    active: Option<Mounted<R>>,
}

struct Mounted<R> {
    scene: Scene,
    renderer: R,
    pending_frame: Option<FrameHandle>,
    resize: ResizeSubscription,
    frames_rendered: u64,
}

impl<R: Renderer> BackgroundAnimation<R> {
    pub fn mount<T, H>(target: Option<T>, host: &mut H, config: &AnimationConfig, rng: &mut impl Rng) -> Result<Self>
    where
        T: MountTarget<Renderer = R>,
        H: Host,
    {
        config.validate()?;

        let Some(target) = target else {
            log::info!("No mount target, background disabled");
            return Ok(Self { active: None });
        };

        let (width, height) = host.viewport_size();
        let aspect = if width > 0 && height > 0 { width as f32 / height as f32 } else { 1.0 };

        let scene = Scene::new(config, aspect, rng)?;
        let renderer = target.attach(width, height, &scene)?;
        let resize = host.subscribe_resize();
        let pending_frame = Some(host.request_frame());

        log::info!("Background mounted at {width}x{height}");

        Ok(Self {
            active: Some(Mounted {
                scene,
                renderer,
                pending_frame,
                resize,
                frames_rendered: 0,
            }),
        })
    }

    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    pub fn scene(&self) -> Option<&Scene> {
        self.active.as_ref().map(|m| &m.scene)
    }

    pub fn frames_rendered(&self) -> u64 {
        self.active.as_ref().map_or(0, |m| m.frames_rendered)
    }

    pub fn pending_frame(&self) -> Option<FrameHandle> {
        self.active.as_ref().and_then(|m| m.pending_frame)
    }

    /// Runs the frame scheduled under `handle`. Handles other than the pending one are
    /// ignored. The next frame is scheduled before drawing, so a failed render does not
    /// stop the loop.
    pub fn on_frame<H: Host>(&mut self, host: &mut H, handle: FrameHandle) -> Result<()> {
        let Some(mounted) = self.active.as_mut() else {
            return Ok(());
        };
        if mounted.pending_frame != Some(handle) {
            log::trace!("Ignoring stale frame {}", handle.id());
            return Ok(());
        }

        mounted.pending_frame = Some(host.request_frame());
        mounted.scene.advance();
        mounted.renderer.render(&mounted.scene)?;
        mounted.scene.clear_dirty();
        mounted.frames_rendered += 1;
        Ok(())
    }

    pub fn on_resize(&mut self, width: u32, height: u32) {
        let Some(mounted) = self.active.as_mut() else {
            return;
        };
        if !mounted.scene.set_viewport(width, height) {
            return;
        }
        mounted.renderer.resize(width, height);
        log::debug!("Background resized to {width}x{height}");
    }

    /// Cancels the pending frame, drops the resize subscription and releases the renderer.
    pub fn unmount<H: Host>(self, host: &mut H) {
        let Some(mounted) = self.active else {
            return;
        };
        if let Some(handle) = mounted.pending_frame {
            host.cancel_frame(handle);
        }
        host.unsubscribe_resize(mounted.resize);
        mounted.renderer.release();
        log::info!("Background unmounted after {} frames", mounted.frames_rendered);
    }
}
