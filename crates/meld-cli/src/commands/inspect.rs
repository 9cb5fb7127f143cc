//! OBJ statistics

use anyhow::{Context, Result};
use meld_core::Color;
use meld_import::load_obj;

pub fn run(path: &str, json: bool) -> Result<()> {
    let import = load_obj(path, Color::WHITE).with_context(|| format!("Failed to read '{}'", path))?;
    let stats = import.mesh.stats();

    if json {
        let report = serde_json::json!({
            "path": path,
            "stats": stats,
            "had_normals": import.had_normals,
            "skipped_lines": import.skipped_lines,
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("{}", path);
    println!("  vertices:  {}", stats.vertex_count);
    println!("  triangles: {}", stats.triangle_count);
    println!("  bounds:    {:?} .. {:?}", stats.bounds_min, stats.bounds_max);
    println!(
        "  normals:   {}",
        if import.had_normals { "from file" } else { "recomputed" }
    );
    if import.skipped_lines > 0 {
        println!("  skipped:   {} unsupported lines", import.skipped_lines);
    }
    Ok(())
}
