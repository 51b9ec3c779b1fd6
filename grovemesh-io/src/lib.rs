//! I/O for grovemesh
//!
//! Frond templates are read from Wavefront OBJ files and built trees are
//! written back out as OBJ.

pub mod obj;
pub mod error;

pub use error::*;
pub use obj::{load_frond_set, read_templates, write_obj, ObjReader, ObjWriter};

use grovemesh_core::{FrondSet, Result, TreeMesh};
use std::path::Path;

/// Trait for reading frond template sets from files
pub trait FrondSetReader {
    fn read_frond_set<P: AsRef<Path>>(paths: &[P], scale_to_twig: f32) -> Result<FrondSet>;
}

/// Trait for writing built trees to files
pub trait MeshWriter {
    fn write_mesh<P: AsRef<Path>>(mesh: &TreeMesh, path: P) -> Result<()>;
}

/// Auto-detect format and write mesh
pub fn write_mesh<P: AsRef<Path>>(mesh: &TreeMesh, path: P) -> Result<()> {
    let path = path.as_ref();
    match path.extension().and_then(|s| s.to_str()) {
        Some("obj") => ObjWriter::write_mesh(mesh, path),
        _ => Err(IoError::InvalidFormat {
            format: format!("{:?}", path.extension()),
        }
        .into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use grovemesh_core::Error;

    #[test]
    fn test_unknown_extension_is_unsupported() {
        let result = write_mesh(&TreeMesh::new(), "tree.ply");
        assert!(matches!(result, Err(Error::UnsupportedFormat(f)) if f.contains("ply")));
    }
}
