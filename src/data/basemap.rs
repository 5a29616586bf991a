use crate::geo::Coord;
use crate::map::LineString;
use anyhow::Result;
use geojson::{GeoJson, Geometry, Value};
use std::fs;
use std::path::Path;

/// Load outlines (lines and polygon rings) from a GeoJSON file
pub fn load_basemap(path: &Path) -> Result<Vec<LineString>> {
    let content = fs::read_to_string(path)?;
    let geojson: GeoJson = content.parse()?;
    let mut lines = Vec::new();
    process_geojson_lines(&geojson, |line| lines.push(line));
    tracing::info!(path = %path.display(), outlines = lines.len(), "basemap loaded");
    Ok(lines)
}

/// Process GeoJSON and extract line features
fn process_geojson_lines<F>(geojson: &GeoJson, mut add_line: F)
where
    F: FnMut(LineString),
{
    match geojson {
        GeoJson::FeatureCollection(fc) => {
            for feature in &fc.features {
                if let Some(ref geometry) = feature.geometry {
                    process_geometry_lines(geometry, &mut add_line);
                }
            }
        }
        GeoJson::Feature(f) => {
            if let Some(ref geometry) = f.geometry {
                process_geometry_lines(geometry, &mut add_line);
            }
        }
        GeoJson::Geometry(geometry) => {
            process_geometry_lines(geometry, &mut add_line);
        }
    }
}

/// GeoJSON positions are [lng, lat]
fn to_line(positions: &[Vec<f64>]) -> LineString {
    positions
        .iter()
        .filter(|p| p.len() >= 2)
        .filter_map(|p| Coord::validated(p[1], p[0]))
        .collect()
}

fn process_geometry_lines<F>(geometry: &Geometry, add_line: &mut F)
where
    F: FnMut(LineString),
{
    match &geometry.value {
        Value::LineString(coords) => add_line(to_line(coords)),
        Value::MultiLineString(lines) => {
            for coords in lines {
                add_line(to_line(coords));
            }
        }
        Value::Polygon(rings) => {
            if let Some(exterior) = rings.first() {
                add_line(to_line(exterior));
            }
        }
        Value::MultiPolygon(polygons) => {
            for rings in polygons {
                if let Some(exterior) = rings.first() {
                    add_line(to_line(exterior));
                }
            }
        }
        Value::GeometryCollection(geometries) => {
            for g in geometries {
                process_geometry_lines(g, add_line);
            }
        }
        _ => {}
    }
}

/// Coarse outline of India for when no basemap file is available
pub fn india_outline() -> Vec<LineString> {
    let mainland: &[(f64, f64)] = &[
        (68.2, 23.7), (68.8, 22.3), (70.4, 20.9), (72.6, 21.1), (72.8, 19.0),
        (73.4, 16.0), (74.4, 14.0), (75.2, 12.0), (76.2, 10.0), (77.0, 8.3),
        (77.6, 8.1), (78.2, 9.0), (79.2, 10.3), (79.8, 11.5), (80.3, 13.3),
        (80.2, 15.2), (81.3, 16.4), (82.4, 17.0), (84.0, 18.3), (85.1, 19.5),
        (86.9, 20.8), (87.0, 21.6), (88.2, 21.7), (89.0, 22.0), (88.9, 24.3),
        (88.0, 24.6), (88.6, 26.4), (89.8, 26.0), (92.0, 25.2), (92.2, 23.7),
        (93.1, 22.6), (93.4, 24.1), (94.6, 25.3), (95.2, 26.6), (96.1, 27.3),
        (97.2, 28.1), (95.5, 29.0), (94.0, 28.6), (92.5, 27.8), (91.7, 26.8),
        (89.8, 26.8), (88.7, 27.3), (88.2, 26.7), (86.0, 26.6), (84.7, 27.2),
        (83.3, 27.4), (81.5, 28.5), (80.1, 28.8), (80.3, 30.1), (78.8, 31.2),
        (78.7, 32.6), (79.5, 32.9), (78.5, 34.6), (77.8, 35.5), (76.2, 35.9),
        (74.5, 34.8), (73.9, 34.0), (74.6, 32.8), (75.3, 32.2), (74.5, 31.0),
        (73.8, 30.1), (72.8, 28.9), (71.0, 27.9), (70.2, 26.5), (70.8, 25.2),
        (68.8, 24.3), (68.2, 23.7),
    ];
    vec![mainland.iter().map(|&(lng, lat)| Coord::new(lat, lng)).collect()]
}
