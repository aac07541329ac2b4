// Index arithmetic for the toroidal pheromone grid. Storage is row-major: `y * width + x`.

/// Wraps an integer coordinate onto `[0, extent)`.
#[inline(always)]
pub fn wrap_index(coord: i64, extent: usize) -> usize {
    coord.rem_euclid(extent as i64) as usize
}

/// Calculates the 1D cell index for integer coordinates, wrapping both axes.
#[inline(always)]
pub fn wrapped_cell_idx(x: i64, y: i64, width: usize, height: usize) -> usize {
    wrap_index(y, height) * width + wrap_index(x, width)
}

/// Indices of the four toroidal neighbours of `(x, y)`: left, right, up, down.
/// On a 1-wide (or 1-high) grid a cell is its own neighbour along that axis.
#[inline(always)]
pub fn neighbor_indices(x: usize, y: usize, width: usize, height: usize) -> [usize; 4] {
    let left = if x == 0 { width - 1 } else { x - 1 };
    let right = if x + 1 == width { 0 } else { x + 1 };
    let up = if y == 0 { height - 1 } else { y - 1 };
    let down = if y + 1 == height { 0 } else { y + 1 };
    [
        y * width + left,
        y * width + right,
        up * width + x,
        down * width + x,
    ]
}
