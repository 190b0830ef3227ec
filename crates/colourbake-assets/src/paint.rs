//! Paint submesh colours straight into the vertex colour channel.
//!
//! Only valid when each submesh owns a contiguous vertex range that no other
//! submesh touches. Topology and vertex count are left alone.

use colourbake_core::Color;
use tracing::debug;

use crate::error::AssetError;
use crate::mesh::MeshBuffers;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PaintStats {
    pub painted_submeshes: usize,
    pub painted_vertices: usize,
}

/// Overwrite each assigned submesh's vertex range with its colour.
///
/// A missing colour channel is created as white first. Submeshes that
/// `colour_of` returns `None` for keep their current colours.
pub fn paint<F>(mesh: &mut MeshBuffers, mut colour_of: F) -> Result<PaintStats, AssetError>
where
    F: FnMut(usize) -> Option<Color>,
{
    mesh.validate()?;
    mesh.validate_vertex_ranges()?;

    let vertex_count = mesh.vertex_count();
    let colors = mesh
        .colors
        .get_or_insert_with(|| vec![Color::WHITE; vertex_count]);

    let mut stats = PaintStats::default();
    for (submesh, sub) in mesh.submeshes.iter().enumerate() {
        let Some(colour) = colour_of(submesh) else {
            continue;
        };
        colors[sub.vertex_range()].fill(colour);
        stats.painted_submeshes += 1;
        stats.painted_vertices += sub.vertex_count;
    }

    debug!(
        "Painted {} vertices in {} submeshes of mesh '{}'",
        stats.painted_vertices, stats.painted_submeshes, mesh.name
    );

    Ok(stats)
}
