//! The `mpr:<series>:<orientation>:<position>` image id.
//!
//! Orientation is six comma-joined numbers (row cosines then column
//! cosines). Position is three comma-joined numbers, or `center` for the
//! geometric centre of the volume. Numbers are written the way a
//! JavaScript `Array.prototype.join` writes them, with the position
//! rounded to single precision first, so ids produced here match ids
//! produced by existing viewers.

use std::fmt;
use std::str::FromStr;

use crate::error::MprError;
use crate::math::{Vec3, vec3};

pub const MPR_SCHEME: &str = "mpr";
pub const CENTER: &str = "center";

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PositionSpec {
    /// Anchor the slice on the volume's geometric centre.
    Center,
    /// Top-left anchor in patient space.
    Explicit(Vec3),
}

#[derive(Clone, Debug, PartialEq)]
pub struct MprImageId {
    pub series_id: String,
    pub row_cosines: Vec3,
    pub column_cosines: Vec3,
    pub position: PositionSpec,
}

impl MprImageId {
    pub fn new(
        series_id: impl Into<String>,
        row_cosines: Vec3,
        column_cosines: Vec3,
        position: PositionSpec,
    ) -> Self {
        Self {
            series_id: series_id.into(),
            row_cosines,
            column_cosines,
            position,
        }
    }

    /// Whether `image_id` uses the MPR scheme at all.
    pub fn is_mpr(image_id: &str) -> bool {
        image_id
            .split_once(':')
            .is_some_and(|(scheme, _)| scheme == MPR_SCHEME)
    }
}

impl fmt::Display for MprImageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let orientation = format_orientation(&self.row_cosines, &self.column_cosines);
        let position = match &self.position {
            PositionSpec::Center => CENTER.to_string(),
            PositionSpec::Explicit(p) => format_position(p),
        };
        write!(f, "{MPR_SCHEME}:{}:{orientation}:{position}", self.series_id)
    }
}

impl FromStr for MprImageId {
    type Err = MprError;

    fn from_str(image_id: &str) -> Result<Self, Self::Err> {
        let invalid = || MprError::InvalidImageId(image_id.to_string());
        let parts: Vec<&str> = image_id.split(':').collect();
        let [scheme, series_id, orientation, position] = parts.as_slice() else {
            return Err(invalid());
        };
        if *scheme != MPR_SCHEME || series_id.is_empty() {
            return Err(invalid());
        }
        let orientation = parse_numbers::<6>(orientation).ok_or_else(invalid)?;
        let position = if *position == CENTER {
            PositionSpec::Center
        } else {
            let [x, y, z] = parse_numbers::<3>(position).ok_or_else(invalid)?;
            PositionSpec::Explicit(vec3(x, y, z))
        };
        Ok(Self {
            series_id: series_id.to_string(),
            row_cosines: vec3(orientation[0], orientation[1], orientation[2]),
            column_cosines: vec3(orientation[3], orientation[4], orientation[5]),
            position,
        })
    }
}

fn parse_numbers<const N: usize>(joined: &str) -> Option<[f64; N]> {
    let values: Vec<f64> = joined
        .split(',')
        .map(|v| v.trim().parse::<f64>().ok().filter(|v| v.is_finite()))
        .collect::<Option<_>>()?;
    values.try_into().ok()
}

pub fn format_orientation(row: &Vec3, column: &Vec3) -> String {
    row.iter()
        .chain(column.iter())
        .map(|&v| format_number(v))
        .collect::<Vec<_>>()
        .join(",")
}

/// Position components pass through single precision, as a `Float32Array`
/// join would.
pub fn format_position(position: &Vec3) -> String {
    position
        .iter()
        .map(|&v| format_number(v as f32 as f64))
        .collect::<Vec<_>>()
        .join(",")
}

/// Shortest round-trip decimal, with JavaScript's exponent rules.
pub fn format_number(value: f64) -> String {
    if value == 0.0 {
        return "0".to_string();
    }
    if value.is_nan() {
        return "NaN".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    let magnitude = value.abs();
    if (1e-6..1e21).contains(&magnitude) {
        return format!("{value}");
    }
    let exponential = format!("{value:e}");
    match exponential.split_once('e') {
        Some((mantissa, exponent)) if !exponent.starts_with('-') => {
            format!("{mantissa}e+{exponent}")
        }
        _ => exponential,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbers_follow_javascript_formatting() {
        assert_eq!(format_number(1.0), "1");
        assert_eq!(format_number(-0.0), "0");
        assert_eq!(format_number(0.5), "0.5");
        assert_eq!(format_number(-120.25), "-120.25");
        assert_eq!(format_number(0.000001), "0.000001");
        assert_eq!(format_number(1.5e-7), "1.5e-7");
        assert_eq!(format_number(1e21), "1e+21");
    }

    #[test]
    fn position_is_rounded_through_single_precision() {
        assert_eq!(format_position(&vec3(0.1, 1.0, -2.5)), "0.10000000149011612,1,-2.5");
    }

    #[test]
    fn formats_wire_id() {
        let id = MprImageId::new(
            "0",
            vec3(1.0, 0.0, 0.0),
            vec3(0.0, 1.0, 0.0),
            PositionSpec::Center,
        );
        assert_eq!(id.to_string(), "mpr:0:1,0,0,0,1,0:center");

        let id = MprImageId {
            position: PositionSpec::Explicit(vec3(-12.5, 4.0, 100.0)),
            ..id
        };
        assert_eq!(id.to_string(), "mpr:0:1,0,0,0,1,0:-12.5,4,100");
    }

    #[test]
    fn parses_what_it_formats() {
        let text = "mpr:3:0,1,0,0,0,-1:-12.5,4,100";
        let id: MprImageId = text.parse().unwrap();
        assert_eq!(id.series_id, "3");
        assert_eq!(id.column_cosines, vec3(0.0, 0.0, -1.0));
        assert_eq!(id.position, PositionSpec::Explicit(vec3(-12.5, 4.0, 100.0)));
        assert_eq!(id.to_string(), text);
    }

    #[test]
    fn rejects_malformed_ids() {
        for bad in [
            "wadouri:0:1,0,0,0,1,0:center",
            "mpr:0:1,0,0,0,1:center",
            "mpr:0:1,0,0,0,1,0:1,2",
            "mpr:0:1,0,0,0,1,0:center:extra",
            "mpr::1,0,0,0,1,0:center",
            "mpr:0:a,0,0,0,1,0:center",
        ] {
            assert!(bad.parse::<MprImageId>().is_err(), "{bad}");
        }
        assert!(MprImageId::is_mpr("mpr:0:1,0,0,0,1,0:center"));
        assert!(!MprImageId::is_mpr("wadouri:http://x/0/1"));
    }
}
