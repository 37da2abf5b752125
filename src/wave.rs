//! Travelling-wave animation of the ground-plane mesh.
//!
//! Every frame each vertex elevation is recomputed from scratch as
//! `sin(index + counter * phase_scale) * baseline * amplitude`, so the surface is a pure
//! function of the baseline snapshot and the counter.

use crate::config::{WAVE_AMPLITUDE, WAVE_COUNTER_STEP, WAVE_PHASE_SCALE};
use crate::mesh::GroundMesh;

/// Vertex count of the stock 100-segment grid, the resolution the default speed was tuned at.
pub const REFERENCE_VERTEX_COUNT: u32 = 101 * 101;

/// How the wave counter advances.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum WaveTiming {
    /// Counter advances by `step` after every vertex, so a frame advances it by
    /// `step * vertex_count` and wave speed scales with mesh resolution.
    PerVertex { step: f64 },
    /// Counter is constant during a pass and advances by `step` once per frame.
    PerFrame { step: f64 },
}

impl WaveTiming {
    /// Per-frame timing that matches the stock speed at any mesh resolution.
    pub fn decoupled() -> Self {
        WaveTiming::PerFrame { step: WAVE_COUNTER_STEP * REFERENCE_VERTEX_COUNT as f64 }
    }

    pub fn step(&self) -> f64 {
        match *self {
            WaveTiming::PerVertex { step } | WaveTiming::PerFrame { step } => step,
        }
    }

    /// Counter advance produced by one pass over `vertex_count` vertices.
    pub fn advance_per_frame(&self, vertex_count: usize) -> f64 {
        match *self {
            WaveTiming::PerVertex { step } => step * vertex_count as f64,
            WaveTiming::PerFrame { step } => step,
        }
    }
}

#[derive(Debug, Clone)]
pub struct WaveClock {
    counter: f64,
    timing: WaveTiming,
    phase_scale: f64,
    amplitude: f64,
}

impl Default for WaveClock {
    fn default() -> Self {
        Self::new(WaveTiming::PerVertex { step: WAVE_COUNTER_STEP }, WAVE_PHASE_SCALE, WAVE_AMPLITUDE)
    }
}

impl WaveClock {
    pub fn new(timing: WaveTiming, phase_scale: f64, amplitude: f64) -> Self {
        Self {
            counter: 0.0,
            timing,
            phase_scale,
            amplitude,
        }
    }

    pub fn counter(&self) -> f64 {
        self.counter
    }

    pub fn timing(&self) -> WaveTiming {
        self.timing
    }

    /// Elevation of vertex `index` for a given counter value.
    #[inline(always)]
    pub fn elevation(&self, index: usize, counter: f64, baseline: f32) -> f32 {
        let phase = index as f64 + counter * self.phase_scale;
        (phase.sin() * (f64::from(baseline) * self.amplitude)) as f32
    }

    /// Rewrites every elevation of `mesh` and advances the counter.
    pub fn apply(&mut self, mesh: &mut GroundMesh) {
        match self.timing {
            WaveTiming::PerVertex { step } => {
                let mut counter = self.counter;
                for (index, (baseline, elevation)) in mesh.elevations_mut().enumerate() {
                    *elevation = self.elevation(index, counter, baseline);
                    counter += step;
                }
                self.counter = counter;
            }
            WaveTiming::PerFrame { step } => {
                let counter = self.counter;
                for (index, (baseline, elevation)) in mesh.elevations_mut().enumerate() {
                    *elevation = self.elevation(index, counter, baseline);
                }
                self.counter += step;
            }
        }
    }
}
