//! Well-known text output.
//!
//! Only the geometry kinds a footprint can take are covered. Numbers use
//! the shortest decimal form that round-trips, with `-0` written as `0`.

use std::fmt::Write;

use geo::{Coord, LineString, MultiLineString, MultiPolygon, Polygon};

/// Serialize a geometry as WKT.
pub trait ToWkt {
    /// Append the WKT text to `out`.
    fn write_wkt(&self, out: &mut String);

    fn to_wkt(&self) -> String {
        let mut out = String::new();
        self.write_wkt(&mut out);
        out
    }
}

impl ToWkt for Polygon {
    fn write_wkt(&self, out: &mut String) {
        out.push_str("POLYGON ");
        write_polygon_body(self, out);
    }
}

impl ToWkt for MultiPolygon {
    fn write_wkt(&self, out: &mut String) {
        out.push_str("MULTIPOLYGON ");
        if self.0.is_empty() {
            out.push_str("EMPTY");
            return;
        }
        out.push('(');
        for (i, polygon) in self.iter().enumerate() {
            if i > 0 {
                out.push_str(", ");
            }
            write_polygon_body(polygon, out);
        }
        out.push(')');
    }
}

impl ToWkt for LineString {
    fn write_wkt(&self, out: &mut String) {
        out.push_str("LINESTRING ");
        write_coord_list(self, out);
    }
}

impl ToWkt for MultiLineString {
    fn write_wkt(&self, out: &mut String) {
        out.push_str("MULTILINESTRING ");
        if self.0.is_empty() {
            out.push_str("EMPTY");
            return;
        }
        out.push('(');
        for (i, line) in self.iter().enumerate() {
            if i > 0 {
                out.push_str(", ");
            }
            write_coord_list(line, out);
        }
        out.push(')');
    }
}

fn write_polygon_body(polygon: &Polygon, out: &mut String) {
    if polygon.exterior().0.is_empty() {
        out.push_str("EMPTY");
        return;
    }
    out.push('(');
    write_coord_list(polygon.exterior(), out);
    for ring in polygon.interiors() {
        out.push_str(", ");
        write_coord_list(ring, out);
    }
    out.push(')');
}

fn write_coord_list(line: &LineString, out: &mut String) {
    if line.0.is_empty() {
        out.push_str("EMPTY");
        return;
    }
    out.push('(');
    for (i, coord) in line.0.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        write_coord(coord, out);
    }
    out.push(')');
}

fn write_coord(coord: &Coord, out: &mut String) {
    // Writing into a String cannot fail
    let _ = write!(out, "{} {}", format_number(coord.x), format_number(coord.y));
}

/// Shortest round-trip decimal form, without a negative zero.
pub fn format_number(value: f64) -> String {
    if value == 0.0 {
        "0".to_string()
    } else {
        value.to_string()
    }
}
