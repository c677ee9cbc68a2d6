// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Resection Planning Team

//! Plain-text point lists (`x y z` per line)

use anyhow::{bail, Context, Result};
use nalgebra::Point3;
use std::fmt::Write as _;
use std::path::Path;

/// Parse whitespace- or comma-separated coordinates, one point per line.
/// Blank lines and lines starting with `#` are ignored.
pub fn parse_points(text: &str) -> Result<Vec<Point3<f64>>> {
    let mut points = Vec::new();
    for (number, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let coords = line
            .split(|c: char| c.is_whitespace() || c == ',')
            .filter(|s| !s.is_empty())
            .map(|s| s.parse::<f64>())
            .collect::<Result<Vec<_>, _>>()
            .with_context(|| format!("Line {}: invalid number in {:?}", number + 1, line))?;
        match coords[..] {
            [x, y, z] => points.push(Point3::new(x, y, z)),
            _ => bail!("Line {}: expected 3 coordinates, found {}", number + 1, coords.len()),
        }
    }
    Ok(points)
}

pub fn read_points(path: impl AsRef<Path>) -> Result<Vec<Point3<f64>>> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path).with_context(|| format!("Failed to read points file: {:?}", path))?;
    parse_points(&text).with_context(|| format!("Failed to parse points file: {:?}", path))
}

pub fn write_points(points: &[Point3<f64>], path: impl AsRef<Path>) -> Result<()> {
    let mut text = String::new();
    for p in points {
        let _ = writeln!(text, "{} {} {}", p.x, p.y, p.z);
    }
    std::fs::write(path.as_ref(), text).with_context(|| format!("Failed to write points file: {:?}", path.as_ref()))
}

/// Parse a single `x,y,z` point, as given on the command line
pub fn parse_point(text: &str) -> Result<Point3<f64>> {
    let points = parse_points(text)?;
    match points[..] {
        [p] => Ok(p),
        _ => bail!("Expected a single point, got {:?}", text),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_points() -> Result<()> {
        let points = parse_points("# grid\n1 2 3\n\n4,5,6\n -1.5\t0 2e1 \n")?;
        assert_eq!(
            points,
            vec![
                Point3::new(1.0, 2.0, 3.0),
                Point3::new(4.0, 5.0, 6.0),
                Point3::new(-1.5, 0.0, 20.0)
            ]
        );
        Ok(())
    }

    #[test]
    fn test_bad_lines_are_errors() {
        assert!(parse_points("1 2").is_err());
        assert!(parse_points("1 2 x").is_err());
        assert!(parse_point("1,2,3\n4,5,6").is_err());
    }

    #[test]
    fn test_write_then_read() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("points.txt");
        let points = vec![Point3::new(0.1, -2.0, 3.25), Point3::new(100.0, 0.0, -7.0)];
        write_points(&points, &path)?;
        assert_eq!(read_points(&path)?, points);
        Ok(())
    }
}
