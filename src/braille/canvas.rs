use ratatui::style::Color;

/// One terminal cell: 8 braille dots plus the ink of the last dot drawn
#[derive(Clone, Copy, Default, PartialEq)]
struct Cell {
    dots: u8,
    ink: Option<Color>,
}

/// Braille Unicode canvas with per-cell color.
/// Each character cell represents a 2x4 pixel grid (8 dots).
/// Unicode Braille patterns: U+2800 to U+28FF
pub struct BrailleCanvas {
    width: usize,  // Characters
    height: usize, // Characters
    cells: Vec<Cell>,
    ink: Option<Color>,
}

impl BrailleCanvas {
    /// Create a new canvas with the given character dimensions.
    /// Effective pixel resolution: width*2 x height*4
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            cells: vec![Cell::default(); width * height],
            ink: None,
        }
    }

    /// Color used for subsequent dots
    pub fn set_ink(&mut self, color: Color) {
        self.ink = Some(color);
    }

    /// Set a pixel at the given coordinates.
    /// Braille dot layout per character:
    /// ```text
    /// (0,0) (1,0)   bits: 0x01 0x08
    /// (0,1) (1,1)   bits: 0x02 0x10
    /// (0,2) (1,2)   bits: 0x04 0x20
    /// (0,3) (1,3)   bits: 0x40 0x80
    /// ```
    pub fn set_pixel(&mut self, x: usize, y: usize) {
        let cx = x / 2;
        let cy = y / 4;

        if cx >= self.width || cy >= self.height {
            return;
        }

        let bit = match (x % 2, y % 4) {
            (0, 0) => 0x01,
            (1, 0) => 0x08,
            (0, 1) => 0x02,
            (1, 1) => 0x10,
            (0, 2) => 0x04,
            (1, 2) => 0x20,
            (0, 3) => 0x40,
            (1, 3) => 0x80,
            _ => 0,
        };

        let cell = &mut self.cells[cy * self.width + cx];
        cell.dots |= bit;
        if self.ink.is_some() {
            cell.ink = self.ink;
        }
    }

    /// Set a pixel using signed coordinates (ignores negative values)
    pub fn set_pixel_signed(&mut self, x: i32, y: i32) {
        if x >= 0 && y >= 0 {
            self.set_pixel(x as usize, y as usize);
        }
    }

    /// Non-empty cells as (column, row, glyph, color)
    pub fn cells(&self) -> impl Iterator<Item = (u16, u16, char, Option<Color>)> + '_ {
        self.cells.iter().enumerate().filter_map(move |(idx, cell)| {
            if cell.dots == 0 {
                return None;
            }
            let ch = char::from_u32(0x2800 + cell.dots as u32).unwrap_or(' ');
            Some(((idx % self.width) as u16, (idx / self.width) as u16, ch, cell.ink))
        })
    }

    /// Color of the cell holding pixel (x, y), if anything was drawn there
    #[cfg(test)]
    pub fn ink_at(&self, x: usize, y: usize) -> Option<Color> {
        let (cx, cy) = (x / 2, y / 4);
        if cx >= self.width || cy >= self.height {
            return None;
        }
        let cell = self.cells[cy * self.width + cx];
        if cell.dots == 0 {
            None
        } else {
            cell.ink
        }
    }

    /// Number of dots set across the canvas
    #[cfg(test)]
    pub fn dot_count(&self) -> u32 {
        self.cells.iter().map(|c| c.dots.count_ones()).sum()
    }

    /// Convert the canvas to a string of Braille characters
    #[cfg(test)]
    pub fn to_string(&self) -> String {
        self.cells
            .chunks(self.width.max(1))
            .map(|row| {
                row.iter()
                    .map(|c| char::from_u32(0x2800 + c.dots as u32).unwrap_or(' '))
                    .collect::<String>()
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_pixel() {
        let mut canvas = BrailleCanvas::new(1, 1);
        canvas.set_pixel(0, 0);
        assert_eq!(canvas.to_string(), "⠁"); // U+2801
    }

    #[test]
    fn test_all_dots() {
        let mut canvas = BrailleCanvas::new(1, 1);
        for x in 0..2 {
            for y in 0..4 {
                canvas.set_pixel(x, y);
            }
        }
        assert_eq!(canvas.to_string(), "⣿"); // U+28FF (all dots)
    }

    #[test]
    fn test_last_ink_wins() {
        let mut canvas = BrailleCanvas::new(2, 1);
        canvas.set_ink(Color::Green);
        canvas.set_pixel(0, 0);
        canvas.set_ink(Color::Red);
        canvas.set_pixel(1, 1);
        assert_eq!(canvas.ink_at(0, 0), Some(Color::Red));
        assert_eq!(canvas.ink_at(2, 0), None);

        let cells: Vec<_> = canvas.cells().collect();
        assert_eq!(cells, vec![(0, 0, '⠑', Some(Color::Red))]);
    }

    #[test]
    fn test_out_of_bounds_ignored() {
        let mut canvas = BrailleCanvas::new(1, 1);
        canvas.set_pixel(5, 0);
        canvas.set_pixel_signed(-1, 0);
        assert_eq!(canvas.dot_count(), 0);
    }
}
