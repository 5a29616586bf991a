use crate::geo::Coord;
use std::collections::HashMap;

/// Spatial hash grid for O(1) region queries.
/// Divides the world into square cells of `cell_size` degrees.
pub struct SpatialGrid<T> {
    /// Grid cells indexed by (cell_x, cell_y), holding indices into `items`
    cells: HashMap<(i32, i32), Vec<usize>>,
    items: Vec<(Coord, T)>,
    cell_size: f64,
}

impl<T> SpatialGrid<T> {
    /// Create a new spatial grid with given cell size in degrees
    pub fn new(cell_size: f64) -> Self {
        Self {
            cells: HashMap::new(),
            items: Vec::new(),
            cell_size,
        }
    }

    /// Convert a coordinate to cell coordinates
    #[inline(always)]
    fn to_cell(&self, c: &Coord) -> (i32, i32) {
        let x = (c.lng / self.cell_size).floor() as i32;
        let y = (c.lat / self.cell_size).floor() as i32;
        (x, y)
    }

    /// Insert an item at a geographic position
    pub fn insert(&mut self, at: Coord, item: T) {
        let idx = self.items.len();
        let cell = self.to_cell(&at);
        self.items.push((at, item));
        self.cells.entry(cell).or_default().push(idx);
    }

    /// Items whose cell lies within `radius_degrees` of `at`.
    /// May include items slightly outside the radius; callers refine.
    pub fn query_radius(&self, at: &Coord, radius_degrees: f64) -> impl Iterator<Item = &(Coord, T)> {
        let center_cell = self.to_cell(at);
        let cell_radius = (radius_degrees / self.cell_size).ceil().min(1024.0) as i32;

        (-cell_radius..=cell_radius)
            .flat_map(move |dy| (-cell_radius..=cell_radius).map(move |dx| (center_cell.0 + dx, center_cell.1 + dy)))
            .filter_map(|cell| self.cells.get(&cell))
            .flatten()
            .map(|&idx| &self.items[idx])
    }

    /// Remove all items, keeping the cell size
    pub fn clear(&mut self) {
        self.cells.clear();
        self.items.clear();
    }

    /// Number of items
    #[inline(always)]
    #[allow(dead_code)]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[inline(always)]
    #[allow(dead_code)]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
