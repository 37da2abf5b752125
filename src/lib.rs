//! Animated wireframe terrain rendered behind page or window content.
//!
//! The animation model ([`Scene`], [`GroundMesh`], [`OrbitCamera`], [`WaveClock`]) is
//! independent of the GPU. [`BackgroundAnimation`] drives it through the [`Host`],
//! [`MountTarget`] and [`Renderer`] seams, and [`run`] wires those to winit and wgpu.

pub mod app;
pub mod camera;
pub mod component;
pub mod config;
pub mod error;
pub mod gpu;
pub mod host;
pub mod mesh;
pub mod scene;
pub mod timing;
pub mod wave;

pub use app::{run, start};
pub use camera::OrbitCamera;
pub use component::BackgroundAnimation;
pub use config::AnimationConfig;
pub use error::{BackgroundError, Result};
pub use host::{FrameHandle, Host, MountTarget, Renderer, ResizeSubscription};
pub use mesh::GroundMesh;
pub use scene::Scene;
pub use wave::{WaveClock, WaveTiming};
