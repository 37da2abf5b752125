use bitflags::bitflags;
use rand::Rng;

use crate::camera::OrbitCamera;
use crate::config::AnimationConfig;
use crate::error::Result;
use crate::mesh::GroundMesh;
use crate::wave::WaveClock;

bitflags! {
    /// Scene state that changed since the renderer last consumed it.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct Dirty: u8 {
        const CAMERA = 1 << 0;
        const PROJECTION = 1 << 1;
        const MESH = 1 << 2;
    }
}

/// Linear fog blending the wireframe into the background with view depth.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Fog {
    pub color: [f32; 3],
    pub near: f32,
    pub far: f32,
}

/// Everything drawn by the background: one ground-plane mesh seen through one camera.
#[derive(Debug, Clone)]
pub struct Scene {
    mesh: GroundMesh,
    camera: OrbitCamera,
    wave: WaveClock,
    fog: Fog,
    clear_color: [f32; 3],
    mesh_color: [f32; 3],
    rotation_speed: f32,
    orbit_drift: f32,
    frame_count: u64,
    dirty: Dirty,
}

impl Scene {
    pub fn new(config: &AnimationConfig, aspect: f32, rng: &mut impl Rng) -> Result<Self> {
        let background = config.background_rgb()?;
        let mesh_color = config.mesh_rgb()?;

        let mesh = GroundMesh::new(config.plane_definition, config.plane_size, config.vertex_height, rng)?;
        let camera = OrbitCamera::new(
            config.camera_start,
            config.camera_target,
            config.camera_fov,
            aspect,
            config.camera_near,
            config.camera_far,
        );
        let wave = WaveClock::new(config.wave_timing, config.wave_phase_scale, config.wave_amplitude);

        log::debug!(
            "Built ground mesh: {} vertices, {} line segments",
            mesh.vertex_count(),
            mesh.line_indices().len() / 2
        );

        Ok(Self {
            mesh,
            camera,
            wave,
            fog: Fog { color: background, near: config.fog_near, far: config.fog_far },
            clear_color: background,
            mesh_color,
            rotation_speed: config.rotation_speed,
            orbit_drift: config.orbit_drift,
            frame_count: 0,
            dirty: Dirty::all(),
        })
    }

    /// One animation step: orbit the camera, then replay the wave over the mesh.
    pub fn advance(&mut self) {
        self.camera.orbit_step(self.rotation_speed, self.orbit_drift);
        self.wave.apply(&mut self.mesh);
        self.frame_count += 1;
        self.dirty |= Dirty::CAMERA | Dirty::MESH;
    }

    pub fn set_viewport(&mut self, width: u32, height: u32) -> bool {
        let changed = self.camera.set_viewport(width, height);
        if changed {
            self.dirty |= Dirty::PROJECTION;
        }
        changed
    }

    pub fn mesh(&self) -> &GroundMesh {
        &self.mesh
    }

    pub fn camera(&self) -> &OrbitCamera {
        &self.camera
    }

    pub fn wave(&self) -> &WaveClock {
        &self.wave
    }

    pub fn fog(&self) -> Fog {
        self.fog
    }

    pub fn clear_color(&self) -> [f32; 3] {
        self.clear_color
    }

    pub fn mesh_color(&self) -> [f32; 3] {
        self.mesh_color
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    pub fn dirty(&self) -> Dirty {
        self.dirty
    }

    pub fn clear_dirty(&mut self) {
        self.dirty = Dirty::empty();
    }
}
