use crate::grid::{neighbor_indices, wrap_index, wrapped_cell_idx};
use physarum_common::wrap_coordinate;
use rayon::prelude::*;
use serde::Serialize;

/// The W x H pheromone grid.
///
/// Dimensions are fixed at construction. Every cell stays finite and
/// non-negative: deposits only add positive finite amounts, and the update
/// step is a convex blend followed by a scale in [0, 1].
#[derive(Debug)]
pub struct PheromoneField {
    width: usize,
    height: usize,
    diffusion_rate: f32,
    evaporation_rate: f32,
    /// Optional cap applied to a cell on deposit.
    ceiling: Option<f32>,

    // --- Ping-Pong Buffers ---
    // Current concentrations (read by sampling and as input to diffusion)
    cells: Vec<f32>,
    // Output of the next diffusion pass, swapped in afterwards
    scratch: Vec<f32>,
}

/// An owned copy of the grid for rendering or analysis.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldData {
    pub width: usize,
    pub height: usize,
    /// Row-major values.
    pub values: Vec<f32>,
}

impl FieldData {
    pub fn get(&self, x: usize, y: usize) -> f32 {
        self.values[y * self.width + x]
    }

    /// Iterates rows from y = 0 downwards.
    pub fn rows(&self) -> impl Iterator<Item = &[f32]> {
        self.values.chunks(self.width.max(1))
    }

    pub fn total(&self) -> f64 {
        self.values.iter().map(|&v| v as f64).sum()
    }

    pub fn max(&self) -> f32 {
        self.values.iter().copied().fold(0.0, f32::max)
    }
}

impl PheromoneField {
    /// Creates a zeroed field. Rates are clamped to [0, 1].
    /// Callers must pass non-zero dimensions.
    pub fn new(width: usize, height: usize, diffusion_rate: f32, evaporation_rate: f32) -> Self {
        let num_cells = width * height;
        let mut field = Self {
            width,
            height,
            diffusion_rate: 0.0,
            evaporation_rate: 0.0,
            ceiling: None,
            cells: vec![0.0; num_cells],
            scratch: vec![0.0; num_cells],
        };
        field.set_diffusion_rate(diffusion_rate);
        field.set_evaporation_rate(evaporation_rate);
        field
    }

    /// Caps every cell at `ceiling` when depositing. Non-positive or
    /// non-finite values disable the cap.
    pub fn with_ceiling(mut self, ceiling: Option<f32>) -> Self {
        self.ceiling = ceiling.filter(|c| c.is_finite() && *c > 0.0);
        self
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn diffusion_rate(&self) -> f32 {
        self.diffusion_rate
    }

    pub fn evaporation_rate(&self) -> f32 {
        self.evaporation_rate
    }

    /// Takes effect on the next `diffuse_and_evaporate`.
    pub fn set_diffusion_rate(&mut self, rate: f32) {
        self.diffusion_rate = clamp_rate(rate);
    }

    /// Takes effect on the next `diffuse_and_evaporate`.
    pub fn set_evaporation_rate(&mut self, rate: f32) {
        self.evaporation_rate = clamp_rate(rate);
    }

    /// Adds `amount` to the cell at `(x mod W, y mod H)`.
    pub fn deposit(&mut self, x: i64, y: i64, amount: f32) {
        if !(amount > 0.0) || !amount.is_finite() {
            return;
        }
        let idx = wrapped_cell_idx(x, y, self.width, self.height);
        let mut value = self.cells[idx] + amount;
        if let Some(ceiling) = self.ceiling {
            value = value.min(ceiling);
        }
        self.cells[idx] = value;
    }

    /// Concentration at an integer cell, wrapped onto the grid.
    pub fn value_at(&self, x: i64, y: i64) -> f32 {
        self.cells[wrapped_cell_idx(x, y, self.width, self.height)]
    }

    /// Bilinear lookup at a continuous position. Cell `i` sits at coordinate `i`,
    /// matching the rounding used for deposits; both axes wrap.
    pub fn sample(&self, x: f32, y: f32) -> f32 {
        let x = wrap_coordinate(x, self.width as f32);
        let y = wrap_coordinate(y, self.height as f32);
        let x0 = x.floor();
        let y0 = y.floor();
        let tx = x - x0;
        let ty = y - y0;

        let x0 = wrap_index(x0 as i64, self.width);
        let y0 = wrap_index(y0 as i64, self.height);
        let x1 = if x0 + 1 == self.width { 0 } else { x0 + 1 };
        let y1 = if y0 + 1 == self.height { 0 } else { y0 + 1 };

        let v00 = self.cells[y0 * self.width + x0];
        let v10 = self.cells[y0 * self.width + x1];
        let v01 = self.cells[y1 * self.width + x0];
        let v11 = self.cells[y1 * self.width + x1];

        let top = v00 + (v10 - v00) * tx;
        let bottom = v01 + (v11 - v01) * tx;
        (top + (bottom - top) * ty).max(0.0)
    }

    /// One diffusion and evaporation pass over the whole grid:
    /// `new = ((1 - d) * old + d * mean(4 neighbours)) * (1 - e)`.
    ///
    /// Reads only from the current buffer and writes into the scratch buffer,
    /// so the result is independent of the order cells are visited in.
    pub fn diffuse_and_evaporate(&mut self) {
        let width = self.width;
        let height = self.height;
        let keep = 1.0 - self.diffusion_rate;
        let spread = self.diffusion_rate * 0.25;
        let retain = 1.0 - self.evaporation_rate;
        let cells = &self.cells;

        self.scratch
            .par_chunks_mut(width)
            .enumerate()
            .for_each(|(y, row_out)| {
                for (x, out) in row_out.iter_mut().enumerate() {
                    let idx = y * width + x;
                    let neighbour_sum: f32 = neighbor_indices(x, y, width, height)
                        .iter()
                        .map(|&n| cells[n])
                        .sum();
                    *out = (keep * cells[idx] + spread * neighbour_sum) * retain;
                }
            });

        std::mem::swap(&mut self.cells, &mut self.scratch);
    }

    /// Sum of all cells.
    pub fn total(&self) -> f64 {
        self.cells.iter().map(|&v| v as f64).sum()
    }

    /// Owned copy of the grid; never aliases internal storage.
    pub fn data(&self) -> FieldData {
        FieldData {
            width: self.width,
            height: self.height,
            values: self.cells.clone(),
        }
    }
}

fn clamp_rate(rate: f32) -> f32 {
    if rate.is_nan() {
        log::warn!("Ignoring NaN pheromone rate, using 0.");
        0.0
    } else {
        rate.clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-5
    }

    #[test]
    fn deposit_wraps_and_ignores_non_positive_amounts() {
        let mut field = PheromoneField::new(10, 5, 0.0, 0.0);
        field.deposit(-1, 5, 2.0);
        assert_eq!(field.value_at(9, 0), 2.0);
        field.deposit(3, 3, 0.0);
        field.deposit(3, 3, -4.0);
        field.deposit(3, 3, f32::NAN);
        assert_eq!(field.value_at(3, 3), 0.0);
    }

    #[test]
    fn ceiling_caps_deposits() {
        let mut field = PheromoneField::new(4, 4, 0.0, 0.0).with_ceiling(Some(3.0));
        field.deposit(1, 1, 2.0);
        field.deposit(1, 1, 2.0);
        assert_eq!(field.value_at(1, 1), 3.0);
    }

    #[test]
    fn diffusion_spreads_to_four_neighbours_then_evaporates() {
        let mut field = PheromoneField::new(5, 5, 0.1, 0.05);
        field.deposit(2, 2, 5.0);
        field.diffuse_and_evaporate();

        assert!(approx(field.value_at(2, 2), 5.0 * 0.9 * 0.95));
        let neighbour = 0.1 * 5.0 / 4.0 * 0.95;
        for (x, y) in [(1, 2), (3, 2), (2, 1), (2, 3)] {
            assert!(approx(field.value_at(x, y), neighbour), "cell ({}, {})", x, y);
        }
        assert_eq!(field.value_at(1, 1), 0.0);
        assert!(approx(field.total() as f32, 5.0 * 0.95));
    }

    #[test]
    fn diffusion_is_symmetric_regardless_of_direction() {
        let mut field = PheromoneField::new(9, 9, 0.5, 0.0);
        field.deposit(4, 4, 8.0);
        for _ in 0..3 {
            field.diffuse_and_evaporate();
        }
        let data = field.data();
        for d in 1..4 {
            let left = data.get(4 - d, 4);
            assert!(left > 0.0);
            assert!(approx(left, data.get(4 + d, 4)));
            assert!(approx(left, data.get(4, 4 - d)));
            assert!(approx(left, data.get(4, 4 + d)));
        }
    }

    #[test]
    fn diffusion_wraps_across_edges() {
        let mut field = PheromoneField::new(4, 4, 0.4, 0.0);
        field.deposit(0, 0, 4.0);
        field.diffuse_and_evaporate();
        assert!(approx(field.value_at(3, 0), 0.4));
        assert!(approx(field.value_at(0, 3), 0.4));
    }

    #[test]
    fn rates_are_clamped_and_apply_on_next_pass() {
        let mut field = PheromoneField::new(3, 3, 2.0, -1.0);
        assert_eq!(field.diffusion_rate(), 1.0);
        assert_eq!(field.evaporation_rate(), 0.0);

        field.set_diffusion_rate(0.0);
        field.deposit(1, 1, 1.0);
        field.set_evaporation_rate(0.5);
        assert_eq!(field.value_at(1, 1), 1.0);
        field.diffuse_and_evaporate();
        assert!(approx(field.value_at(1, 1), 0.5));
    }

    #[test]
    fn full_evaporation_clears_the_grid() {
        let mut field = PheromoneField::new(6, 6, 0.3, 1.0);
        field.deposit(2, 3, 10.0);
        field.diffuse_and_evaporate();
        assert_eq!(field.total(), 0.0);
    }

    #[test]
    fn bilinear_sample_interpolates_and_wraps() {
        let mut field = PheromoneField::new(4, 4, 0.0, 0.0);
        field.deposit(1, 1, 4.0);
        assert!(approx(field.sample(1.0, 1.0), 4.0));
        assert!(approx(field.sample(1.5, 1.0), 2.0));
        assert!(approx(field.sample(0.5, 0.5), 1.0));
        assert!(approx(field.sample(5.0, -3.0), 4.0));

        field.deposit(3, 0, 2.0);
        // Halfway between x = 3 and the wrapped x = 0 column.
        assert!(approx(field.sample(3.5, 0.0), 1.0));
    }

    #[test]
    fn data_is_a_detached_copy() {
        let mut field = PheromoneField::new(3, 2, 0.0, 0.0);
        field.deposit(2, 1, 1.5);
        let mut data = field.data();
        data.values[5] = 100.0;
        assert_eq!(field.value_at(2, 1), 1.5);
        assert_eq!(data.rows().count(), 2);
        assert_eq!(field.data().max(), 1.5);
    }
}
