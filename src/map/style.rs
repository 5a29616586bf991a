use crate::map::geometry::disc_offsets;
use crate::model::Zone;
use once_cell::unsync::OnceCell;
use ratatui::style::Color;
use std::rc::Rc;

/// Marker radius in braille pixels
const ICON_RADIUS: i32 = 2;

/// Pre-rasterized marker: a zone-colored disc inside a white ring
#[derive(Debug, PartialEq)]
pub struct ZoneIcon {
    pub glyph: char,
    pub fill: Color,
    pub border: Color,
    /// Pixel offsets from the anchor, fill first
    pub fill_stamp: Vec<(i32, i32)>,
    pub border_stamp: Vec<(i32, i32)>,
}

impl ZoneIcon {
    fn build(fill: Color) -> Self {
        let fill_stamp: Vec<_> = disc_offsets(ICON_RADIUS - 1).collect();
        let border_stamp = disc_offsets(ICON_RADIUS)
            .filter(|p| !fill_stamp.contains(p))
            .collect();
        Self {
            glyph: '●',
            fill,
            border: Color::White,
            fill_stamp,
            border_stamp,
        }
    }
}

/// Visual style of one zone
#[derive(Debug, Clone)]
pub struct ZoneStyle {
    pub color: Color,
    #[allow(dead_code)]
    pub hex: &'static str,
    pub label: &'static str,
    pub icon: Rc<ZoneIcon>,
}

struct Palette {
    hex: &'static str,
    rgb: (u8, u8, u8),
    label: &'static str,
}

const fn palette(zone: Zone) -> Palette {
    match zone {
        Zone::Safe => Palette { hex: "#22c55e", rgb: (0x22, 0xc5, 0x5e), label: "Safe Zone" },
        Zone::Moderate => Palette { hex: "#f97316", rgb: (0xf9, 0x73, 0x16), label: "Moderate Risk" },
        Zone::HighRisk => Palette { hex: "#ef4444", rgb: (0xef, 0x44, 0x44), label: "High Risk" },
        Zone::Unknown => Palette { hex: "#6b7280", rgb: (0x6b, 0x72, 0x80), label: "Unknown" },
    }
}

/// Zone -> color/label/icon lookup. Icons are built lazily, once per zone,
/// and shared for the lifetime of the registry.
#[derive(Default)]
pub struct ZoneStyleRegistry {
    icons: [OnceCell<Rc<ZoneIcon>>; 4],
}

impl ZoneStyleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Style for a wire zone id; unrecognized ids get the gray "Unknown" style
    #[allow(dead_code)]
    pub fn style_for(&self, zone_id: &str) -> ZoneStyle {
        self.style(Zone::from_id(zone_id))
    }

    pub fn style(&self, zone: Zone) -> ZoneStyle {
        let p = palette(zone);
        ZoneStyle {
            color: self.color(zone),
            hex: p.hex,
            label: p.label,
            icon: self.icon(zone),
        }
    }

    pub fn color(&self, zone: Zone) -> Color {
        let (r, g, b) = palette(zone).rgb;
        Color::Rgb(r, g, b)
    }

    pub fn icon(&self, zone: Zone) -> Rc<ZoneIcon> {
        self.icons[zone.index()]
            .get_or_init(|| Rc::new(ZoneIcon::build(self.color(zone))))
            .clone()
    }

    /// Legend rows for the classifiable zones
    pub fn legend(&self) -> Vec<(&'static str, Color)> {
        Zone::ALL.iter().map(|z| (palette(*z).label, self.color(*z))).collect()
    }

    /// Number of icons built so far
    #[cfg(test)]
    fn cached(&self) -> usize {
        self.icons.iter().filter(|c| c.get().is_some()).count()
    }
}
