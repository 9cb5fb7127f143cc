//! Wavefront OBJ reader and writer (geometry subset: `v`, `vt`, `vn`, `f`)

use crate::types::ObjImport;
use meld_core::{Color, MeldError, MeshData, MeshVertex, Result, Vec3};
use std::collections::HashMap;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Statements that carry no geometry and are skipped without comment
const IGNORED: [&str; 6] = ["o", "g", "s", "usemtl", "mtllib", "l"];

/// One face corner: 0-based position, optional uv, optional normal
type Corner = (usize, Option<usize>, Option<usize>);

fn parse_error(line: usize, message: impl Into<String>) -> MeldError {
    MeldError::ParseError {
        line,
        message: message.into(),
    }
}

fn parse_floats<const N: usize>(
    parts: &mut std::str::SplitWhitespace<'_>,
    line: usize,
    required: usize,
    what: &str,
) -> Result<[f32; N]> {
    let mut out = [0.0; N];
    for (i, slot) in out.iter_mut().enumerate() {
        match parts.next() {
            Some(tok) => {
                *slot = tok
                    .parse()
                    .map_err(|_| parse_error(line, format!("bad {} component '{}'", what, tok)))?;
            }
            None if i < required => {
                return Err(parse_error(
                    line,
                    format!("{} needs at least {} components", what, required),
                ))
            }
            None => break,
        }
    }
    Ok(out)
}

/// Resolve a 1-based (or negative, relative) OBJ index against `count` elements
fn resolve_index(token: &str, count: usize, line: usize, what: &str) -> Result<usize> {
    let raw: i64 = token
        .parse()
        .map_err(|_| parse_error(line, format!("bad {} index '{}'", what, token)))?;
    let resolved = if raw > 0 {
        raw - 1
    } else if raw < 0 {
        count as i64 + raw
    } else {
        return Err(parse_error(line, format!("{} index 0 is not valid", what)));
    };
    if resolved < 0 || resolved as usize >= count {
        return Err(parse_error(
            line,
            format!("{} index {} out of range (have {})", what, raw, count),
        ));
    }
    Ok(resolved as usize)
}

fn parse_corner(token: &str, counts: [usize; 3], line: usize) -> Result<Corner> {
    let mut fields = token.split('/');
    let pos = match fields.next() {
        Some(p) if !p.is_empty() => resolve_index(p, counts[0], line, "position")?,
        _ => return Err(parse_error(line, format!("face corner '{}' has no position", token))),
    };
    let uv = match fields.next() {
        Some(t) if !t.is_empty() => Some(resolve_index(t, counts[1], line, "uv")?),
        _ => None,
    };
    let normal = match fields.next() {
        Some(n) if !n.is_empty() => Some(resolve_index(n, counts[2], line, "normal")?),
        _ => None,
    };
    Ok((pos, uv, normal))
}

/// Parse OBJ text into a mesh.
///
/// Corners sharing the same position/uv/normal triple become one vertex.
/// Polygons are split into triangle fans. If any corner lacks a normal, all
/// normals are recomputed from the faces.
pub fn parse_obj(text: &str, color: Color) -> Result<ObjImport> {
    let mut positions: Vec<Vec3> = Vec::new();
    let mut uvs: Vec<[f32; 2]> = Vec::new();
    let mut normals: Vec<Vec3> = Vec::new();

    let mut corner_ids: HashMap<Corner, u32> = HashMap::new();
    let mut corners: Vec<Corner> = Vec::new();
    let mut triangles: Vec<[u32; 3]> = Vec::new();
    let mut skipped_lines = 0usize;

    for (i, raw) in text.lines().enumerate() {
        let line_no = i + 1;
        let content = raw.split('#').next().unwrap_or("").trim();
        if content.is_empty() {
            continue;
        }
        let mut parts = content.split_whitespace();
        let Some(keyword) = parts.next() else {
            continue;
        };

        match keyword {
            "v" => {
                let [x, y, z] = parse_floats::<3>(&mut parts, line_no, 3, "vertex")?;
                positions.push(Vec3::new(x, y, z));
            }
            "vt" => {
                let [u, v] = parse_floats::<2>(&mut parts, line_no, 1, "texture coordinate")?;
                uvs.push([u, v]);
            }
            "vn" => {
                let [x, y, z] = parse_floats::<3>(&mut parts, line_no, 3, "normal")?;
                normals.push(Vec3::new(x, y, z));
            }
            "f" => {
                let counts = [positions.len(), uvs.len(), normals.len()];
                let mut face = Vec::with_capacity(4);
                for token in parts {
                    let corner = parse_corner(token, counts, line_no)?;
                    let next_id = corners.len() as u32;
                    let id = *corner_ids.entry(corner).or_insert_with(|| {
                        corners.push(corner);
                        next_id
                    });
                    face.push(id);
                }
                if face.len() < 3 {
                    return Err(parse_error(
                        line_no,
                        format!("face has {} corners, need at least 3", face.len()),
                    ));
                }
                for k in 1..face.len() - 1 {
                    triangles.push([face[0], face[k], face[k + 1]]);
                }
            }
            other if IGNORED.contains(&other) => {}
            other => {
                log::debug!("line {}: skipping unsupported statement '{}'", line_no, other);
                skipped_lines += 1;
            }
        }
    }

    let had_normals = !corners.is_empty() && corners.iter().all(|c| c.2.is_some());
    let vertices = corners
        .iter()
        .map(|&(p, _, n)| MeshVertex {
            position: positions[p],
            normal: n.map(|n| normals[n].normalized()).unwrap_or(Vec3::ZERO),
            color,
        })
        .collect();
    let vertex_uvs = corners
        .iter()
        .map(|&(_, t, _)| t.map(|t| uvs[t]).unwrap_or([0.0, 0.0]))
        .collect();

    let mut mesh = MeshData::from_parts(vertices, triangles)?;
    if !had_normals {
        mesh.recompute_normals();
    }

    Ok(ObjImport {
        mesh,
        uvs: vertex_uvs,
        had_normals,
        skipped_lines,
    })
}

/// Read and parse an OBJ file
pub fn load_obj<P: AsRef<Path>>(path: P, color: Color) -> Result<ObjImport> {
    let text = std::fs::read_to_string(path.as_ref())?;
    parse_obj(&text, color)
}

/// Write positions, normals, and faces. Indices are 1-based and every corner
/// uses the same index for its position and normal.
pub fn write_obj<W: Write>(mesh: &MeshData, out: &mut W) -> Result<()> {
    writeln!(
        out,
        "# {} vertices, {} triangles",
        mesh.vertex_count(),
        mesh.triangle_count()
    )?;
    for v in &mesh.vertices {
        writeln!(out, "v {} {} {}", v.position.x, v.position.y, v.position.z)?;
    }
    for v in &mesh.vertices {
        writeln!(out, "vn {} {} {}", v.normal.x, v.normal.y, v.normal.z)?;
    }
    for [a, b, c] in &mesh.triangles {
        let (a, b, c) = (a + 1, b + 1, c + 1);
        writeln!(out, "f {a}//{a} {b}//{b} {c}//{c}")?;
    }
    Ok(())
}

pub fn save_obj<P: AsRef<Path>>(mesh: &MeshData, path: P) -> Result<()> {
    let file = std::fs::File::create(path.as_ref())?;
    let mut out = BufWriter::new(file);
    write_obj(mesh, &mut out)?;
    out.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const QUAD: &str = "\
# unit quad
v 0 0 0
v 1 0 0
v 1 1 0
v 0 1 0
vt 0 0
vt 1 0
vt 1 1
vt 0 1
vn 0 0 1
f 1/1/1 2/2/1 3/3/1 4/4/1
";

    #[test]
    fn quad_is_fan_triangulated() {
        let import = parse_obj(QUAD, Color::WHITE).unwrap();
        assert_eq!(import.mesh.vertex_count(), 4);
        assert_eq!(import.mesh.triangles, vec![[0, 1, 2], [0, 2, 3]]);
        assert!(import.had_normals);
        assert_eq!(import.uvs[2], [1.0, 1.0]);
        assert_eq!(import.mesh.vertices[0].normal, Vec3::new(0.0, 0.0, 1.0));
    }

    #[test]
    fn shared_corners_are_deduplicated() {
        let text = "v 0 0 0\nv 1 0 0\nv 0 1 0\nv 1 1 0\nf 1 2 3\nf 2 4 3\n";
        let import = parse_obj(text, Color::WHITE).unwrap();
        assert_eq!(import.mesh.vertex_count(), 4);
        assert_eq!(import.mesh.triangle_count(), 2);
    }

    #[test]
    fn same_position_different_normal_splits() {
        let text = "v 0 0 0\nv 1 0 0\nv 0 1 0\nvn 0 0 1\nvn 0 0 -1\nf 1//1 2//1 3//1\nf 1//2 3//2 2//2\n";
        let import = parse_obj(text, Color::WHITE).unwrap();
        assert_eq!(import.mesh.vertex_count(), 6);
    }

    #[test]
    fn missing_normals_are_recomputed() {
        let text = "v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\n";
        let import = parse_obj(text, Color::WHITE).unwrap();
        assert!(!import.had_normals);
        for v in &import.mesh.vertices {
            assert!((v.normal.z - 1.0).abs() < 1e-6);
        }
    }

    #[test]
    fn negative_indices_are_relative() {
        let text = "v 0 0 0\nv 1 0 0\nv 0 1 0\nf -3 -2 -1\n";
        let import = parse_obj(text, Color::WHITE).unwrap();
        assert_eq!(import.mesh.triangles, vec![[0, 1, 2]]);
    }

    #[test]
    fn out_of_range_index_reports_line() {
        let text = "v 0 0 0\nv 1 0 0\n\nf 1 2 3\n";
        match parse_obj(text, Color::WHITE).unwrap_err() {
            MeldError::ParseError { line, .. } => assert_eq!(line, 4),
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn unknown_statements_are_counted() {
        let text = "mtllib x.mtl\no thing\nv 0 0 0\nv 1 0 0\nv 0 1 0\ncurv 1 2\nf 1 2 3 # tail comment\n";
        let import = parse_obj(text, Color::WHITE).unwrap();
        assert_eq!(import.skipped_lines, 1);
        assert_eq!(import.mesh.triangle_count(), 1);
    }

    #[test]
    fn short_vertex_is_an_error() {
        assert!(matches!(
            parse_obj("v 1 2\n", Color::WHITE),
            Err(MeldError::ParseError { line: 1, .. })
        ));
    }

    #[test]
    fn written_mesh_reads_back() {
        let original = parse_obj(QUAD, Color::WHITE).unwrap().mesh;
        let mut buf = Vec::new();
        write_obj(&original, &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.contains("f 1//1 2//2 3//3"));

        let reread = parse_obj(&text, Color::WHITE).unwrap().mesh;
        assert_eq!(reread.triangles, original.triangles);
        assert_eq!(reread.vertices, original.vertices);
    }
}
