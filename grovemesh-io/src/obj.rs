//! Wavefront OBJ support
//!
//! Every object of an OBJ file becomes one [`FrondTemplate`]. Vertices are
//! compacted per object, face corners keep their texture coordinates and
//! group materials are collected into a per-template name table that
//! [`FrondSet::add_template`] merges by name. Groups without a material use
//! [`DEFAULT_FROND_MATERIAL`].

use crate::error::IoError;
use crate::{FrondSetReader, MeshWriter};
use grovemesh_core::{
    Error, FrondSet, FrondTemplate, MaterialSlot, Point3f, Result, TreeMesh, Uv, DEFAULT_FROND_MATERIAL,
};
use log::{debug, warn};
use obj::{ObjData, ObjMaterial};
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

pub struct ObjReader;
pub struct ObjWriter;

impl FrondSetReader for ObjReader {
    fn read_frond_set<P: AsRef<Path>>(paths: &[P], scale_to_twig: f32) -> Result<FrondSet> {
        load_frond_set(paths, scale_to_twig)
    }
}

impl MeshWriter for ObjWriter {
    fn write_mesh<P: AsRef<Path>>(mesh: &TreeMesh, path: P) -> Result<()> {
        let file = File::create(path.as_ref()).map_err(IoError::from)?;
        write_obj(mesh, BufWriter::new(file))
    }
}

fn material_name(material: &ObjMaterial) -> &str {
    match material {
        ObjMaterial::Ref(name) => name,
        ObjMaterial::Mtl(mtl) => &mtl.name,
    }
}

/// Convert the objects of parsed OBJ data into templates, each paired with
/// the material names its ids index.
fn templates_from_data(data: &ObjData, scale_to_twig: f32) -> Result<Vec<(FrondTemplate, Vec<String>)>> {
    let mut templates = Vec::with_capacity(data.objects.len());

    for object in &data.objects {
        let mut remap: Vec<Option<usize>> = vec![None; data.position.len()];
        let mut vertices = Vec::new();
        let mut faces = Vec::new();
        let mut uvs = Vec::new();
        let mut material_ids = Vec::new();
        let mut materials: Vec<String> = Vec::new();

        for group in object.groups.iter().filter(|g| !g.polys.is_empty()) {
            let name = group
                .material
                .as_ref()
                .map_or(DEFAULT_FROND_MATERIAL, material_name);
            let id = match materials.iter().position(|m| m == name) {
                Some(id) => id,
                None => {
                    materials.push(name.to_string());
                    materials.len() - 1
                }
            };

            for poly in &group.polys {
                let mut face = Vec::with_capacity(poly.0.len());
                let mut corners: Vec<Uv> = Vec::with_capacity(poly.0.len());
                for tuple in &poly.0 {
                    let position = *data.position.get(tuple.0).ok_or_else(|| IoError::ParseError {
                        message: format!("object '{}': position index {} out of range", object.name, tuple.0),
                    })?;
                    let local = match remap[tuple.0] {
                        Some(local) => local,
                        None => {
                            vertices.push(Point3f::from(position));
                            remap[tuple.0] = Some(vertices.len() - 1);
                            vertices.len() - 1
                        }
                    };
                    face.push(local);
                    corners.push(tuple.1.and_then(|t| data.texture.get(t)).copied().unwrap_or([0.0, 0.0]));
                }
                faces.push(face);
                uvs.push(corners);
                material_ids.push(id as u32);
            }
        }

        if faces.is_empty() {
            warn!("object '{}' has no faces, skipping", object.name);
            continue;
        }

        let template = FrondTemplate::new(object.name.clone(), vertices, faces, uvs, material_ids)?.scaled(scale_to_twig);
        debug!(
            "loaded frond '{}': {} vertices, {} faces, length {:.3}",
            template.name,
            template.vertex_count(),
            template.face_count(),
            template.length()
        );
        templates.push((template, materials));
    }

    Ok(templates)
}

/// Parse OBJ text from `input`. `source` names the input in error messages.
pub fn read_templates<R: Read>(input: R, source: &str, scale_to_twig: f32) -> Result<Vec<(FrondTemplate, Vec<String>)>> {
    if !(scale_to_twig > 0.0) {
        return Err(Error::InvalidConfig(format!(
            "scale to twig must be positive, got {}",
            scale_to_twig
        )));
    }
    let data = ObjData::load_buf(input).map_err(|e| IoError::ParseError {
        message: format!("{}: {}", source, e),
    })?;
    templates_from_data(&data, scale_to_twig)
}

/// Load every object of every file in `paths` into one frond set.
pub fn load_frond_set<P: AsRef<Path>>(paths: &[P], scale_to_twig: f32) -> Result<FrondSet> {
    let mut set = FrondSet::new();
    for path in paths {
        let path = path.as_ref();
        if !path.exists() {
            return Err(IoError::FileNotFound {
                path: path.display().to_string(),
            }
            .into());
        }
        let file = File::open(path).map_err(IoError::from)?;
        for (template, materials) in read_templates(BufReader::new(file), &path.display().to_string(), scale_to_twig)? {
            set.add_template(template, &materials)?;
        }
    }

    if set.is_empty() {
        return Err(Error::InvalidData(String::from("no frond templates found")));
    }
    debug!("frond set: {} templates, {} materials", set.len(), set.material_names.len());
    Ok(set)
}

fn slot_name(slot: MaterialSlot) -> String {
    match slot {
        MaterialSlot::Bark => String::from("bark"),
        MaterialSlot::Twig => String::from("twig"),
        MaterialSlot::Frond(id) => format!("frond.{}", id),
    }
}

fn write_lines<W: Write>(mesh: &TreeMesh, mut writer: W) -> std::io::Result<()> {
    // shape-only builds carry positions and no topology
    let positions = if mesh.vertices.is_empty() { &mesh.shape } else { &mesh.vertices };
    for p in positions {
        writeln!(writer, "v {} {} {}", p.x, p.y, p.z)?;
    }
    for uv in &mesh.uvs {
        writeln!(writer, "vt {} {}", uv[0], uv[1])?;
    }

    let with_uvs = mesh.uvs.len() == mesh.corner_count();
    let mut corner = 0;
    let mut current = None;
    for (face, slot) in mesh.faces.iter().zip(&mesh.face_materials) {
        if current != Some(*slot) {
            writeln!(writer, "usemtl {}", slot_name(*slot))?;
            current = Some(*slot);
        }
        write!(writer, "f")?;
        for &v in face {
            corner += 1;
            if with_uvs {
                write!(writer, " {}/{}", v + 1, corner)?;
            } else {
                write!(writer, " {}", v + 1)?;
            }
        }
        writeln!(writer)?;
    }
    writer.flush()
}

/// Write positions, per-corner UVs and polygon faces of `mesh`.
pub fn write_obj<W: Write>(mesh: &TreeMesh, writer: W) -> Result<()> {
    write_lines(mesh, writer).map_err(|e| {
        IoError::WriteError {
            message: e.to_string(),
        }
        .into()
    })
}
