//! Dendrogram serialization: JSON and CBOR, auto-detected by extension.
//! Unknown/missing extensions are rejected for reads and default to JSON
//! for writes, mirroring the read/write asymmetry of most serde-based CLIs.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use glyphs_core::dendrogram::{Dendrogram, DendroNode, NodeId};
use serde::{Deserialize, Serialize};

/// On-disk representation of a finished dendrogram.
#[derive(Debug, Serialize, Deserialize)]
pub struct DendrogramArtifact {
    /// Format version, for forward compatibility.
    pub version: u32,
    /// All nodes, in creation order.
    pub nodes: Vec<DendroNode>,
    /// The root node, if clustering converged to a single glyph.
    pub root: Option<NodeId>,
}

impl DendrogramArtifact {
    /// Snapshot a dendrogram into its serializable form.
    #[must_use]
    pub fn from_dendrogram(d: &Dendrogram) -> Self {
        Self {
            version: 1,
            nodes: d.nodes().to_vec(),
            root: d.root(),
        }
    }

    /// Rebuild a read-only dendrogram from this artifact.
    #[must_use]
    pub fn into_dendrogram(self) -> Dendrogram {
        Dendrogram::from_parts(self.nodes, self.root)
    }
}

fn ext_lower(path: &Path) -> Option<String> {
    path.extension().and_then(|e| e.to_str()).map(str::to_ascii_lowercase)
}

fn ensure_parent_dir(path: &Path) -> Result<()> {
    if let Some(dir) = path.parent() {
        if !dir.as_os_str().is_empty() {
            fs::create_dir_all(dir)
                .with_context(|| format!("creating parent directory {}", dir.display()))?;
        }
    }
    Ok(())
}

/// Write a dendrogram to `path`, auto-detecting JSON or CBOR by
/// extension (defaults to JSON).
pub fn write_dendrogram<P: AsRef<Path>>(path: P, d: &Dendrogram) -> Result<()> {
    let path = path.as_ref();
    ensure_parent_dir(path)?;
    let artifact = DendrogramArtifact::from_dendrogram(d);
    match ext_lower(path).as_deref() {
        Some("cbor") => {
            let f = File::create(path).with_context(|| format!("create {}", path.display()))?;
            let mut w = BufWriter::new(f);
            ciborium::ser::into_writer(&artifact, &mut w).with_context(|| "serialize CBOR dendrogram")?;
        }
        _ => {
            let f = File::create(path).with_context(|| format!("create {}", path.display()))?;
            let w = BufWriter::new(f);
            serde_json::to_writer_pretty(w, &artifact).with_context(|| "serialize JSON dendrogram")?;
        }
    }
    Ok(())
}

/// Read a dendrogram from `path`, auto-detecting JSON or CBOR by
/// extension. Unlike writes, an unrecognised extension is an error.
pub fn read_dendrogram<P: AsRef<Path>>(path: P) -> Result<Dendrogram> {
    let path = path.as_ref();
    let artifact: DendrogramArtifact = match ext_lower(path).as_deref() {
        Some("json") => {
            let f = File::open(path).with_context(|| format!("open {}", path.display()))?;
            serde_json::from_reader(BufReader::new(f)).with_context(|| "deserialize JSON dendrogram")?
        }
        Some("cbor") => {
            let f = File::open(path).with_context(|| format!("open {}", path.display()))?;
            ciborium::de::from_reader(BufReader::new(f)).with_context(|| "deserialize CBOR dendrogram")?
        }
        Some(other) => {
            return Err(anyhow!(
                "unsupported dendrogram extension: {other} (supported: .json, .cbor)"
            ))
        }
        None => return Err(anyhow!("path has no extension (expected .json or .cbor)")),
    };
    Ok(artifact.into_dendrogram())
}

#[cfg(test)]
mod tests {
    use super::*;
    use glyphs_core::Dendrogram as CoreDendrogram;

    #[test]
    fn json_round_trips_a_small_dendrogram() {
        let mut d = CoreDendrogram::new();
        d.touch_leaf(0, 1);
        d.touch_leaf(1, 1);
        d.merge(0, &[1], 3.5, 2);

        let path = std::env::temp_dir().join("glyphs_io_test_dendro.json");
        write_dendrogram(&path, &d).unwrap();
        let loaded = read_dendrogram(&path).unwrap();
        assert_eq!(loaded.root(), d.root());
        assert_eq!(loaded.node(loaded.root().unwrap()).at, 3.5);
    }

    #[test]
    fn cbor_round_trips_a_small_dendrogram() {
        let mut d = CoreDendrogram::new();
        d.touch_leaf(0, 1);
        d.touch_leaf(1, 1);
        d.merge(0, &[1], 2.0, 2);

        let path = std::env::temp_dir().join("glyphs_io_test_dendro.cbor");
        write_dendrogram(&path, &d).unwrap();
        let loaded = read_dendrogram(&path).unwrap();
        assert_eq!(loaded.node(loaded.root().unwrap()).glyph, 0);
    }
}
