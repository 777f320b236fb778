//! Reading weighted points from a delimited text file: `.csv` (comma),
//! `.tsv` (tab), and `.txt`/extensionless (whitespace) are auto-detected
//! by extension; each non-blank, non-`#`-comment line is `x,y[,weight]`.

use std::fs;
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use glyphs_core::geom::Point;

/// A weighted input point before it enters the arena.
pub type WeightedPoint = (Point, u32);

/// Which delimiter to split fields on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Delimiter {
    Comma,
    Tab,
    Whitespace,
}

fn delimiter_for(path: &Path) -> Delimiter {
    match path.extension().and_then(|e| e.to_str()).map(str::to_ascii_lowercase).as_deref() {
        Some("csv") => Delimiter::Comma,
        Some("tsv") => Delimiter::Tab,
        _ => Delimiter::Whitespace,
    }
}

fn split_fields(line: &str, delim: Delimiter) -> Vec<&str> {
    match delim {
        Delimiter::Comma => line.split(',').map(str::trim).collect(),
        Delimiter::Tab => line.split('\t').map(str::trim).collect(),
        Delimiter::Whitespace => line.split_whitespace().collect(),
    }
}

/// Read weighted points from `path`, validating every field as it's
/// parsed. Blank lines and lines starting with `#` are skipped. A missing
/// weight field defaults to `1`.
pub fn read_points<P: AsRef<Path>>(path: P) -> Result<Vec<WeightedPoint>> {
    let path = path.as_ref();
    let delim = delimiter_for(path);
    let text = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;

    let mut out = Vec::new();
    for (lineno, raw) in text.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let fields = split_fields(line, delim);
        if fields.len() < 2 || fields.len() > 3 {
            return Err(anyhow!(
                "{}:{}: expected 2 or 3 fields (x, y[, weight]), got {}",
                path.display(),
                lineno + 1,
                fields.len()
            ));
        }
        let x: f64 = fields[0]
            .parse()
            .with_context(|| format!("{}:{}: invalid x coordinate", path.display(), lineno + 1))?;
        let y: f64 = fields[1]
            .parse()
            .with_context(|| format!("{}:{}: invalid y coordinate", path.display(), lineno + 1))?;
        let weight: u32 = match fields.get(2) {
            Some(w) => w
                .parse()
                .with_context(|| format!("{}:{}: invalid weight", path.display(), lineno + 1))?,
            None => 1,
        };
        if weight == 0 {
            return Err(anyhow!(
                "{}:{}: weight must be >= 1, got 0",
                path.display(),
                lineno + 1
            ));
        }
        if !x.is_finite() || !y.is_finite() {
            return Err(anyhow!(
                "{}:{}: coordinates must be finite, got ({x}, {y})",
                path.display(),
                lineno + 1
            ));
        }
        out.push((Point::new(x, y), weight));
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_tmp(name: &str, contents: &str) -> std::path::PathBuf {
        let path = std::env::temp_dir().join(name);
        let mut f = fs::File::create(&path).unwrap();
        f.write_all(contents.as_bytes()).unwrap();
        path
    }

    #[test]
    fn parses_csv_with_default_weight() {
        let path = write_tmp("glyphs_io_test_points.csv", "# comment\n1.0,2.0\n3.0,4.0,5\n");
        let pts = read_points(&path).unwrap();
        assert_eq!(pts, vec![(Point::new(1.0, 2.0), 1), (Point::new(3.0, 4.0), 5)]);
    }

    #[test]
    fn parses_whitespace_separated() {
        let path = write_tmp("glyphs_io_test_points.txt", "1 2 3\n4 5\n");
        let pts = read_points(&path).unwrap();
        assert_eq!(pts, vec![(Point::new(1.0, 2.0), 3), (Point::new(4.0, 5.0), 1)]);
    }

    #[test]
    fn rejects_zero_weight() {
        let path = write_tmp("glyphs_io_test_points_bad.csv", "1,2,0\n");
        assert!(read_points(&path).is_err());
    }
}
