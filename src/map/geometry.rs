use crate::braille::BrailleCanvas;

/// On/off run lengths in pixels for dashed strokes
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Dash {
    pub on: u32,
    pub off: u32,
}

/// Walk a line with Bresenham's algorithm, calling `plot` with the step index
fn bresenham(x0: i32, y0: i32, x1: i32, y1: i32, mut plot: impl FnMut(u32, i32, i32)) {
    let dx = (x1 - x0).abs();
    let dy = -(y1 - y0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;

    let mut x = x0;
    let mut y = y0;
    let mut step = 0u32;

    loop {
        plot(step, x, y);
        step += 1;

        if x == x1 && y == y1 {
            break;
        }

        let e2 = 2 * err;

        if e2 >= dy {
            if x == x1 {
                break;
            }
            err += dy;
            x += sx;
        }

        if e2 <= dx {
            if y == y1 {
                break;
            }
            err += dx;
            y += sy;
        }
    }
}

/// Draw a line using Bresenham's algorithm
pub fn draw_line(canvas: &mut BrailleCanvas, x0: i32, y0: i32, x1: i32, y1: i32) {
    bresenham(x0, y0, x1, y1, |_, x, y| canvas.set_pixel_signed(x, y));
}

/// Draw a dashed line; `phase` carries the pattern across polyline vertices
pub fn draw_dashed_line(
    canvas: &mut BrailleCanvas,
    (x0, y0): (i32, i32),
    (x1, y1): (i32, i32),
    dash: Dash,
    phase: &mut u32,
) {
    let period = (dash.on + dash.off).max(1);
    let start = *phase;
    let mut last = 0;
    bresenham(x0, y0, x1, y1, |step, x, y| {
        if (start + step) % period < dash.on {
            canvas.set_pixel_signed(x, y);
        }
        last = step;
    });
    *phase = (start + last) % period;
}

/// Stroke width in braille pixels for a line weight
pub fn stroke_width(weight: u8) -> i32 {
    if weight >= 4 {
        2
    } else {
        1
    }
}

/// Draw a line `width` pixels thick, optionally dashed
pub fn draw_stroke(
    canvas: &mut BrailleCanvas,
    from: (i32, i32),
    to: (i32, i32),
    width: i32,
    dash: Option<Dash>,
    phase: &mut u32,
) {
    let horizontal = (to.0 - from.0).abs() >= (to.1 - from.1).abs();
    let entry_phase = *phase;
    for offset in 0..width.max(1) {
        let (ox, oy) = if horizontal { (0, offset) } else { (offset, 0) };
        let a = (from.0 + ox, from.1 + oy);
        let b = (to.0 + ox, to.1 + oy);
        match dash {
            Some(d) => {
                *phase = entry_phase;
                draw_dashed_line(canvas, a, b, d, phase);
            }
            None => draw_line(canvas, a.0, a.1, b.0, b.1),
        }
    }
}

/// Offsets of a filled disc of the given radius
pub fn disc_offsets(radius: i32) -> impl Iterator<Item = (i32, i32)> {
    (-radius..=radius).flat_map(move |dy| {
        (-radius..=radius).filter_map(move |dx| (dx * dx + dy * dy <= radius * radius).then_some((dx, dy)))
    })
}

/// Draw a circle outline with the midpoint algorithm
pub fn draw_ring(canvas: &mut BrailleCanvas, cx: i32, cy: i32, radius: i32) {
    if radius <= 0 {
        canvas.set_pixel_signed(cx, cy);
        return;
    }
    let mut x = radius;
    let mut y = 0;
    let mut err = 1 - radius;
    while x >= y {
        for (dx, dy) in [(x, y), (y, x), (-y, x), (-x, y), (-x, -y), (-y, -x), (y, -x), (x, -y)] {
            canvas.set_pixel_signed(cx + dx, cy + dy);
        }
        y += 1;
        if err < 0 {
            err += 2 * y + 1;
        } else {
            x -= 1;
            err += 2 * (y - x) + 1;
        }
    }
}

/// Fill a disc with a regular stipple covering roughly `opacity` of its pixels
pub fn stipple_disc(canvas: &mut BrailleCanvas, cx: i32, cy: i32, radius: i32, opacity: f64) {
    if opacity <= 0.0 {
        return;
    }
    // 0.12 opacity -> one dot in every 3x3 block
    let step = ((1.0 / opacity).sqrt().round() as i32).max(1);
    let r2 = radius * radius;
    for dy in (-radius..=radius).filter(|dy| dy.rem_euclid(step) == 0) {
        for dx in (-radius..=radius).filter(|dx| dx.rem_euclid(step) == 0) {
            if dx * dx + dy * dy < r2 {
                canvas.set_pixel_signed(cx + dx, cy + dy);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_horizontal_line() {
        let mut canvas = BrailleCanvas::new(5, 1);
        draw_line(&mut canvas, 0, 0, 9, 0);
        assert_eq!(canvas.dot_count(), 10);
    }

    #[test]
    fn test_vertical_line() {
        let mut canvas = BrailleCanvas::new(1, 2);
        draw_line(&mut canvas, 0, 0, 0, 7);
        assert_eq!(canvas.dot_count(), 8);
    }

    #[test]
    fn test_dashed_line_leaves_gaps() {
        let mut solid = BrailleCanvas::new(20, 1);
        draw_line(&mut solid, 0, 0, 39, 0);

        let mut dashed = BrailleCanvas::new(20, 1);
        let mut phase = 0;
        draw_dashed_line(&mut dashed, (0, 0), (39, 0), Dash { on: 10, off: 10 }, &mut phase);

        assert_eq!(solid.dot_count(), 40);
        assert_eq!(dashed.dot_count(), 20);
    }

    #[test]
    fn test_disc_offsets_symmetric() {
        let offsets: Vec<_> = disc_offsets(2).collect();
        assert!(offsets.contains(&(0, 0)));
        assert!(offsets.contains(&(2, 0)));
        assert!(!offsets.contains(&(2, 2)));
        assert_eq!(offsets.len(), 13);
    }

    #[test]
    fn test_stipple_is_sparse() {
        let mut ring = BrailleCanvas::new(20, 10);
        stipple_disc(&mut ring, 20, 20, 12, 0.12);
        let dots = ring.dot_count() as f64;
        let area = std::f64::consts::PI * 144.0;
        assert!(dots > 0.0 && dots < area * 0.25);
    }
}
