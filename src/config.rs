use crate::error::{BackgroundError, Result};
use crate::mesh::GroundMesh;
use crate::wave::WaveTiming;

// === CONSTANTS ===
pub const BACKGROUND_COLOR: &str = "#101213";
pub const MESH_COLOR: &str = "#303030";
pub const FOG_NEAR: f32 = 1.0;
pub const FOG_FAR: f32 = 300_000.0;
pub const CAMERA_FOV: f32 = 55.0; // Vertical, in degrees
pub const CAMERA_NEAR: f32 = 1.0;
pub const CAMERA_FAR: f32 = 400_000.0;
pub const CAMERA_START: [f32; 3] = [0.0, 10_000.0, 10_000.0];
pub const CAMERA_TARGET: [f32; 3] = [0.0, 8_000.0, 0.0];
pub const ROTATION_SPEED: f32 = 0.001; // Radians per frame
pub const ORBIT_DRIFT: f32 = -10.0;
pub const VERTEX_HEIGHT: f32 = 15_000.0;
pub const PLANE_DEFINITION: u32 = 100;
pub const PLANE_SIZE: f32 = 1_245_000.0;
pub const WAVE_PHASE_SCALE: f64 = 0.00002;
pub const WAVE_AMPLITUDE: f64 = 0.4;
pub const WAVE_COUNTER_STEP: f64 = 0.1;
pub const CONTAINER_ID: &str = "background";
pub const WINDOW_TITLE: &str = "wterrain";
pub const DIMX: u32 = 1080;
pub const DIMY: u32 = 720;

/// Tunables for the animated terrain. `Default` reproduces the stock look.
#[derive(Debug, Clone, PartialEq)]
pub struct AnimationConfig {
    pub background_color: String,
    pub mesh_color: String,
    pub fog_near: f32,
    pub fog_far: f32,
    pub camera_fov: f32,
    pub camera_near: f32,
    pub camera_far: f32,
    pub camera_start: [f32; 3],
    pub camera_target: [f32; 3],
    pub rotation_speed: f32,
    pub orbit_drift: f32,
    pub vertex_height: f32,
    pub plane_definition: u32,
    pub plane_size: f32,
    pub wave_phase_scale: f64,
    pub wave_amplitude: f64,
    pub wave_timing: WaveTiming,
    /// Fixed seed for the terrain displacement. `None` draws from entropy.
    pub seed: Option<u64>,
    pub container_id: String,
    pub title: String,
}

impl Default for AnimationConfig {
    fn default() -> Self {
        Self {
            background_color: BACKGROUND_COLOR.to_string(),
            mesh_color: MESH_COLOR.to_string(),
            fog_near: FOG_NEAR,
            fog_far: FOG_FAR,
            camera_fov: CAMERA_FOV,
            camera_near: CAMERA_NEAR,
            camera_far: CAMERA_FAR,
            camera_start: CAMERA_START,
            camera_target: CAMERA_TARGET,
            rotation_speed: ROTATION_SPEED,
            orbit_drift: ORBIT_DRIFT,
            vertex_height: VERTEX_HEIGHT,
            plane_definition: PLANE_DEFINITION,
            plane_size: PLANE_SIZE,
            wave_phase_scale: WAVE_PHASE_SCALE,
            wave_amplitude: WAVE_AMPLITUDE,
            wave_timing: WaveTiming::PerVertex { step: WAVE_COUNTER_STEP },
            seed: None,
            container_id: CONTAINER_ID.to_string(),
            title: WINDOW_TITLE.to_string(),
        }
    }
}

impl AnimationConfig {
    /// Defaults with `WTERRAIN_SEED` and `WTERRAIN_WAVE_TIMING` applied on top.
    /// Unparsable values are logged and ignored.
    #[cfg(not(target_arch = "wasm32"))]
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(raw) = std::env::var("WTERRAIN_SEED") {
            match raw.trim().parse::<u64>() {
                Ok(seed) => config.seed = Some(seed),
                Err(_) => log::warn!("ignoring WTERRAIN_SEED={raw:?}: not an unsigned integer"),
            }
        }

        if let Ok(raw) = std::env::var("WTERRAIN_WAVE_TIMING") {
            match raw.trim() {
                "per-vertex" => config.wave_timing = WaveTiming::PerVertex { step: WAVE_COUNTER_STEP },
                "per-frame" => config.wave_timing = WaveTiming::decoupled(),
                other => log::warn!("ignoring WTERRAIN_WAVE_TIMING={other:?}: expected per-vertex or per-frame"),
            }
        }

        config
    }

    #[cfg(target_arch = "wasm32")]
    pub fn from_env() -> Self {
        Self::default()
    }

    pub fn validate(&self) -> Result<()> {
        if self.plane_definition == 0 {
            return Err(BackgroundError::Config("plane_definition must be at least 1".into()));
        }
        self.check_buffer_sizes()?;

        let finite = [
            ("fog_near", self.fog_near),
            ("fog_far", self.fog_far),
            ("camera_fov", self.camera_fov),
            ("camera_near", self.camera_near),
            ("camera_far", self.camera_far),
            ("rotation_speed", self.rotation_speed),
            ("orbit_drift", self.orbit_drift),
            ("vertex_height", self.vertex_height),
            ("plane_size", self.plane_size),
        ];
        for (name, value) in finite {
            if !value.is_finite() {
                return Err(BackgroundError::Config(format!("{name} must be finite, got {value}")));
            }
        }
        if !self.wave_phase_scale.is_finite() || !self.wave_amplitude.is_finite() || !self.wave_timing.step().is_finite() {
            return Err(BackgroundError::Config("wave timing values must be finite".into()));
        }
        if self.camera_start.iter().chain(self.camera_target.iter()).any(|v| !v.is_finite()) {
            return Err(BackgroundError::Config("camera positions must be finite".into()));
        }

        if self.plane_size <= 0.0 {
            return Err(BackgroundError::Config("plane_size must be positive".into()));
        }
        if self.vertex_height <= 0.0 {
            return Err(BackgroundError::Config("vertex_height must be positive".into()));
        }
        if self.camera_near <= 0.0 || self.camera_near >= self.camera_far {
            return Err(BackgroundError::Config(format!(
                "camera clip range {}..{} is empty",
                self.camera_near, self.camera_far
            )));
        }
        if self.fog_near >= self.fog_far {
            return Err(BackgroundError::Config(format!(
                "fog range {}..{} is empty",
                self.fog_near, self.fog_far
            )));
        }
        if !(0.0..180.0).contains(&self.camera_fov) || self.camera_fov == 0.0 {
            return Err(BackgroundError::Config(format!("camera_fov {} out of range", self.camera_fov)));
        }

        parse_hex_color(&self.background_color)?;
        parse_hex_color(&self.mesh_color)?;
        Ok(())
    }

    /// The grid must index with `u32` and its buffers must fit the default device limits.
    fn check_buffer_sizes(&self) -> Result<()> {
        let definition = self.plane_definition;
        let (vertex_count, index_count) = GroundMesh::counts(definition).ok_or_else(|| {
            BackgroundError::Config(format!("plane_definition {definition} overflows u32 indices"))
        })?;

        let max_buffer_size = wgpu::Limits::default().max_buffer_size;
        let vertex_bytes = u64::from(vertex_count) * std::mem::size_of::<[f32; 3]>() as u64;
        let index_bytes = u64::from(index_count) * std::mem::size_of::<u32>() as u64;
        if vertex_bytes > max_buffer_size || index_bytes > max_buffer_size {
            return Err(BackgroundError::Config(format!(
                "plane_definition {definition} needs {} byte buffers, limit is {max_buffer_size}",
                vertex_bytes.max(index_bytes)
            )));
        }
        Ok(())
    }

    pub fn background_rgb(&self) -> Result<[f32; 3]> {
        parse_hex_color(&self.background_color).map(srgb_to_linear)
    }

    pub fn mesh_rgb(&self) -> Result<[f32; 3]> {
        parse_hex_color(&self.mesh_color).map(srgb_to_linear)
    }
}

/// Parses `#rrggbb` into sRGB components in `0.0..=1.0`.
pub fn parse_hex_color(hex: &str) -> Result<[f32; 3]> {
    let digits = hex
        .strip_prefix('#')
        .filter(|d| d.len() == 6 && d.chars().all(|c| c.is_ascii_hexdigit()))
        .ok_or_else(|| BackgroundError::InvalidColor(hex.to_string()))?;

    let mut rgb = [0.0; 3];
    for (i, channel) in rgb.iter_mut().enumerate() {
        let byte = u8::from_str_radix(&digits[i * 2..i * 2 + 2], 16)
            .map_err(|_| BackgroundError::InvalidColor(hex.to_string()))?;
        *channel = byte as f32 / 255.0;
    }
    Ok(rgb)
}

pub fn srgb_to_linear(rgb: [f32; 3]) -> [f32; 3] {
    rgb.map(|c| {
        if c <= 0.04045 {
            c / 12.92
        } else {
            ((c + 0.055) / 1.055).powf(2.4)
        }
    })
}
