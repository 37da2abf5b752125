use rand::Rng;

use crate::error::{BackgroundError, Result};

/// Subdivided square grid lying in the XZ plane, centered on the origin, with Y up.
///
/// Vertex `row * (definition + 1) + col` sits at
/// `x = col * segment - size / 2`, `z = row * segment - size / 2`.
/// Each vertex keeps the randomly displaced elevation it was built with as its
/// baseline; only the live elevation (`position[1]`) changes afterwards.
#[derive(Debug, Clone)]
pub struct GroundMesh {
    definition: u32,
    size: f32,
    positions: Vec<[f32; 3]>,
    baseline: Vec<f32>,
    line_indices: Vec<u32>,
}

impl GroundMesh {
    /// Builds the grid and displaces every vertex by a uniform offset in
    /// `[-vertex_height, 0)`.
    pub fn new(definition: u32, size: f32, vertex_height: f32, rng: &mut impl Rng) -> Result<Self> {
        let (_, index_count) = Self::counts(definition)
            .ok_or_else(|| BackgroundError::Config(format!("plane_definition {definition} overflows u32 indices")))?;

        let columns = definition as usize + 1;
        let segment = size / definition as f32;
        let half = size / 2.0;

        let mut positions = Vec::with_capacity(columns * columns);
        let mut baseline = Vec::with_capacity(columns * columns);

        for row in 0..columns {
            let z = row as f32 * segment - half;
            for col in 0..columns {
                let x = col as f32 * segment - half;
                let elevation = rng.r#gen::<f32>() * vertex_height - vertex_height;
                positions.push([x, elevation, z]);
                baseline.push(elevation);
            }
        }

        Ok(Self {
            definition,
            size,
            positions,
            baseline,
            line_indices: Self::wireframe_indices(definition, index_count),
        })
    }

    /// Vertex and line-index counts of a grid with `definition` segments per side, or
    /// `None` when either does not fit in `u32`.
    pub fn counts(definition: u32) -> Option<(u32, u32)> {
        let columns = definition.checked_add(1)?;
        let vertices = columns.checked_mul(columns)?;
        let edges = definition
            .checked_mul(columns)?
            .checked_mul(2)?
            .checked_add(definition.checked_mul(definition)?)?;
        Some((vertices, edges.checked_mul(2)?))
    }

    /// Unique triangle edges of the grid as a line list.
    ///
    /// Cells are split along the diagonal from `(row + 1, col)` to `(row, col + 1)`.
    /// `index_count` comes from [`counts`](Self::counts), so every index fits in `u32`.
    fn wireframe_indices(definition: u32, index_count: u32) -> Vec<u32> {
        let n = definition;
        let columns = n + 1;
        let mut indices = Vec::with_capacity(index_count as usize);

        for row in 0..columns {
            for col in 0..columns {
                let i = row * columns + col;
                if col < n {
                    indices.extend_from_slice(&[i, i + 1]);
                }
                if row < n {
                    indices.extend_from_slice(&[i, i + columns]);
                }
                if row < n && col < n {
                    indices.extend_from_slice(&[i + columns, i + 1]);
                }
            }
        }

        indices
    }

    pub fn definition(&self) -> u32 {
        self.definition
    }

    pub fn size(&self) -> f32 {
        self.size
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn positions(&self) -> &[[f32; 3]] {
        &self.positions
    }

    pub fn baseline(&self) -> &[f32] {
        &self.baseline
    }

    pub fn line_indices(&self) -> &[u32] {
        &self.line_indices
    }

    pub fn elevations(&self) -> impl Iterator<Item = &f32> + '_ {
        self.positions.iter().map(|p| &p[1])
    }

    /// Baseline paired with a mutable handle on the live elevation, in vertex order.
    pub fn elevations_mut(&mut self) -> impl Iterator<Item = (f32, &mut f32)> + '_ {
        self.baseline
            .iter()
            .copied()
            .zip(self.positions.iter_mut().map(|p| &mut p[1]))
    }
}
