//! Resplit a mesh so that every vertex belongs to exactly one submesh.
//!
//! A submesh colour has to live in the per-vertex colour channel, but a vertex
//! can be shared by several submeshes with different colours. Resplitting
//! duplicates each vertex once per submesh that uses it, carries every other
//! vertex stream (and blend-shape deltas) along, and rewrites the indices so
//! each submesh addresses a private, contiguous vertex range.

use std::collections::hash_map::Entry;
use std::collections::HashMap;

use colourbake_core::Color;
use glam::{Vec2, Vec3, Vec4};
use tracing::debug;

use crate::error::AssetError;
use crate::mesh::{BoneWeight, MeshBuffers, SubMesh};

/// Vertex counts before and after a resplit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ResplitStats {
    pub original_vertices: usize,
    pub new_vertices: usize,
    pub submeshes: usize,
}

impl ResplitStats {
    /// Vertices added by duplicating shared ones (negative when unused
    /// vertices were dropped).
    pub fn added_vertices(&self) -> isize {
        self.new_vertices as isize - self.original_vertices as isize
    }
}

/// Streams being rebuilt for the new vertex layout.
struct Rebuild {
    positions: Vec<Vec3>,
    normals: Option<Vec<Vec3>>,
    tangents: Option<Vec<Vec4>>,
    uvs: Option<Vec<Vec2>>,
    colors: Vec<Color>,
    bone_weights: Option<Vec<BoneWeight>>,
    /// Per blend shape, per frame: (positions, normals, tangents).
    frames: Vec<Vec<[Vec<Vec3>; 3]>>,
}

impl Rebuild {
    fn for_mesh(mesh: &MeshBuffers) -> Self {
        let capacity = mesh.indices.len().min(mesh.vertex_count() * mesh.submeshes.len());
        Self {
            positions: Vec::with_capacity(capacity),
            normals: mesh.normals.as_ref().map(|_| Vec::with_capacity(capacity)),
            tangents: mesh.tangents.as_ref().map(|_| Vec::with_capacity(capacity)),
            uvs: mesh.uvs.as_ref().map(|_| Vec::with_capacity(capacity)),
            colors: Vec::with_capacity(capacity),
            bone_weights: mesh.bone_weights.as_ref().map(|_| Vec::with_capacity(capacity)),
            frames: mesh
                .blend_shapes
                .iter()
                .map(|shape| shape.frames.iter().map(|_| Default::default()).collect())
                .collect(),
        }
    }

    /// Append a copy of vertex `original` and return its new index.
    fn copy_vertex(
        &mut self,
        mesh: &MeshBuffers,
        original: usize,
        colour: Option<Color>,
    ) -> Result<u32, AssetError> {
        let new_index = u32::try_from(self.positions.len())
            .map_err(|_| AssetError::TooManyVertices(mesh.name.clone()))?;

        self.positions.push(mesh.positions[original]);
        copy_stream(&mut self.normals, &mesh.normals, original);
        copy_stream(&mut self.tangents, &mesh.tangents, original);
        copy_stream(&mut self.uvs, &mesh.uvs, original);
        copy_stream(&mut self.bone_weights, &mesh.bone_weights, original);

        let existing = mesh.colors.as_ref().map(|colors| colors[original]);
        self.colors
            .push(colour.or(existing).unwrap_or(Color::WHITE));

        for (shape, frames) in mesh.blend_shapes.iter().zip(&mut self.frames) {
            for (frame, [positions, normals, tangents]) in shape.frames.iter().zip(frames) {
                positions.push(frame.delta_positions[original]);
                normals.push(frame.delta_normals[original]);
                tangents.push(frame.delta_tangents[original]);
            }
        }

        Ok(new_index)
    }

    fn apply(self, mesh: &mut MeshBuffers) {
        mesh.positions = self.positions;
        mesh.normals = self.normals;
        mesh.tangents = self.tangents;
        mesh.uvs = self.uvs;
        mesh.colors = Some(self.colors);
        mesh.bone_weights = self.bone_weights;

        for (shape, frames) in mesh.blend_shapes.iter_mut().zip(self.frames) {
            for (frame, [positions, normals, tangents]) in shape.frames.iter_mut().zip(frames) {
                frame.delta_positions = positions;
                frame.delta_normals = normals;
                frame.delta_tangents = tangents;
            }
        }
    }
}

fn copy_stream<T: Copy>(target: &mut Option<Vec<T>>, source: &Option<Vec<T>>, original: usize) {
    if let (Some(target), Some(source)) = (target, source) {
        target.push(source[original]);
    }
}

/// Duplicate shared vertices per submesh and bake one colour per submesh.
///
/// `colour_of` maps a submesh index to its colour. Submeshes it returns
/// `None` for keep the colour already stored at each vertex, or white when
/// the mesh has no colour channel.
///
/// The mesh is validated first; on error it is left untouched.
pub fn resplit<F>(mesh: &mut MeshBuffers, mut colour_of: F) -> Result<ResplitStats, AssetError>
where
    F: FnMut(usize) -> Option<Color>,
{
    mesh.validate()?;

    let original_vertices = mesh.vertex_count();
    if original_vertices == 0 || mesh.submeshes.is_empty() {
        return Ok(ResplitStats {
            original_vertices,
            new_vertices: original_vertices,
            submeshes: mesh.submeshes.len(),
        });
    }

    let mut rebuild = Rebuild::for_mesh(mesh);
    let mut indices = Vec::with_capacity(mesh.indices.len());
    let mut submeshes = Vec::with_capacity(mesh.submeshes.len());

    for (submesh, sub) in mesh.submeshes.iter().enumerate() {
        let colour = colour_of(submesh);
        let first_vertex = rebuild.positions.len();
        let index_start = indices.len();
        let mut remap: HashMap<u32, u32> = HashMap::new();

        for &original in &mesh.indices[sub.index_range()] {
            let new_index = match remap.entry(original) {
                Entry::Occupied(entry) => *entry.get(),
                Entry::Vacant(entry) => {
                    *entry.insert(rebuild.copy_vertex(mesh, original as usize, colour)?)
                }
            };
            indices.push(new_index);
        }

        submeshes.push(SubMesh {
            index_start,
            index_count: sub.index_count,
            first_vertex,
            vertex_count: remap.len(),
        });
    }

    let stats = ResplitStats {
        original_vertices,
        new_vertices: rebuild.positions.len(),
        submeshes: submeshes.len(),
    };

    rebuild.apply(mesh);
    mesh.indices = indices;
    mesh.submeshes = submeshes;

    debug!(
        "Resplit mesh '{}': {} -> {} vertices across {} submeshes",
        mesh.name, stats.original_vertices, stats.new_vertices, stats.submeshes
    );

    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::tests::shared_quad;
    use crate::mesh::{BlendShape, BlendShapeFrame};
    use std::collections::HashSet;

    fn red_blue(submesh: usize) -> Option<Color> {
        match submesh {
            0 => Some(Color::RED),
            1 => Some(Color::BLUE),
            _ => None,
        }
    }

    /// Triangles as position triples, for comparing geometry across layouts.
    fn triangle_positions(mesh: &MeshBuffers) -> Vec<[Vec3; 3]> {
        mesh.indices
            .chunks(3)
            .map(|tri| {
                [
                    mesh.positions[tri[0] as usize],
                    mesh.positions[tri[1] as usize],
                    mesh.positions[tri[2] as usize],
                ]
            })
            .collect()
    }

    #[test]
    fn quad_split_into_two_colours() {
        let mut mesh = shared_quad();
        let stats = resplit(&mut mesh, red_blue).unwrap();

        assert_eq!(stats.original_vertices, 4);
        assert_eq!(stats.new_vertices, 6);
        assert_eq!(stats.added_vertices(), 2);
        assert_eq!(mesh.vertex_count(), 6);
        assert_eq!(mesh.indices, vec![0, 1, 2, 3, 4, 5]);

        let colors = mesh.colors.as_ref().unwrap();
        assert_eq!(&colors[0..3], &[Color::RED; 3]);
        assert_eq!(&colors[3..6], &[Color::BLUE; 3]);

        assert_eq!(mesh.submeshes[0].vertex_range(), 0..3);
        assert_eq!(mesh.submeshes[1].vertex_range(), 3..6);
        assert!(mesh.has_private_vertex_ranges());
        assert!(mesh.validate().is_ok());
    }

    #[test]
    fn geometry_is_preserved() {
        let original = shared_quad();
        let mut mesh = original.clone();
        resplit(&mut mesh, red_blue).unwrap();

        assert_eq!(triangle_positions(&mesh), triangle_positions(&original));

        let uvs = mesh.uvs.as_ref().unwrap();
        let original_uvs = original.uvs.as_ref().unwrap();
        for (new, old) in mesh.indices.iter().zip(&original.indices) {
            assert_eq!(uvs[*new as usize], original_uvs[*old as usize]);
            assert_eq!(
                mesh.normals.as_ref().unwrap()[*new as usize],
                original.normals.as_ref().unwrap()[*old as usize]
            );
            assert_eq!(
                mesh.tangents.as_ref().unwrap()[*new as usize],
                original.tangents.as_ref().unwrap()[*old as usize]
            );
        }
    }

    #[test]
    fn vertex_count_is_sum_of_distinct_indices_per_submesh() {
        let mut mesh = shared_quad();
        // Second submesh reuses vertex 0 twice within itself.
        mesh.indices = vec![0, 1, 2, 0, 2, 3, 0, 3, 1];
        mesh.submeshes[1].index_count = 6;

        let expected: usize = mesh
            .submeshes
            .iter()
            .map(|sub| {
                mesh.indices[sub.index_range()]
                    .iter()
                    .collect::<HashSet<_>>()
                    .len()
            })
            .sum();

        resplit(&mut mesh, red_blue).unwrap();
        assert_eq!(mesh.vertex_count(), expected);
        assert_eq!(expected, 7);
    }

    #[test]
    fn every_vertex_belongs_to_one_submesh() {
        let mut mesh = shared_quad();
        resplit(&mut mesh, red_blue).unwrap();

        let mut owner = vec![None; mesh.vertex_count()];
        for (submesh, sub) in mesh.submeshes.iter().enumerate() {
            for &index in &mesh.indices[sub.index_range()] {
                let slot = &mut owner[index as usize];
                assert!(slot.is_none() || *slot == Some(submesh));
                *slot = Some(submesh);
                assert_eq!(
                    Some(mesh.colors.as_ref().unwrap()[index as usize]),
                    red_blue(submesh)
                );
            }
        }
    }

    #[test]
    fn unassigned_submesh_keeps_existing_colour() {
        let mut mesh = shared_quad();
        let green = Color::GREEN;
        mesh.colors = Some(vec![green, Color::BLACK, green, Color::BLACK]);

        resplit(&mut mesh, |submesh| (submesh == 0).then_some(Color::RED)).unwrap();

        let colors = mesh.colors.as_ref().unwrap();
        assert_eq!(&colors[0..3], &[Color::RED; 3]);
        assert_eq!(&colors[3..6], &[green, green, Color::BLACK]);
    }

    #[test]
    fn unassigned_submesh_without_colours_is_white() {
        let mut mesh = shared_quad();
        resplit(&mut mesh, |_| None).unwrap();
        assert_eq!(mesh.colors, Some(vec![Color::WHITE; 6]));
    }

    #[test]
    fn blend_shape_deltas_follow_their_vertex() {
        let mut mesh = shared_quad();
        let deltas: Vec<Vec3> = (0..4).map(|i| Vec3::splat(i as f32)).collect();
        mesh.blend_shapes = vec![BlendShape {
            name: "Smile".into(),
            frames: vec![
                BlendShapeFrame {
                    weight: 100.0,
                    delta_positions: deltas.clone(),
                    delta_normals: deltas.iter().map(|d| *d * 2.0).collect(),
                    delta_tangents: deltas.iter().map(|d| *d * 3.0).collect(),
                },
                BlendShapeFrame::zeroed(50.0, 4),
            ],
        }];
        let original = mesh.clone();

        resplit(&mut mesh, red_blue).unwrap();

        for (shape, old_shape) in mesh.blend_shapes.iter().zip(&original.blend_shapes) {
            for (frame, old_frame) in shape.frames.iter().zip(&old_shape.frames) {
                assert_eq!(frame.weight, old_frame.weight);
                assert_eq!(frame.delta_positions.len(), mesh.vertex_count());
                assert_eq!(frame.delta_normals.len(), mesh.vertex_count());
                assert_eq!(frame.delta_tangents.len(), mesh.vertex_count());
                for (new, old) in mesh.indices.iter().zip(&original.indices) {
                    let (new, old) = (*new as usize, *old as usize);
                    assert_eq!(frame.delta_positions[new], old_frame.delta_positions[old]);
                    assert_eq!(frame.delta_normals[new], old_frame.delta_normals[old]);
                    assert_eq!(frame.delta_tangents[new], old_frame.delta_tangents[old]);
                }
            }
        }
    }

    #[test]
    fn bone_weights_are_carried() {
        let mut mesh = shared_quad();
        mesh.bone_weights = Some(
            (0..4u16)
                .map(|i| BoneWeight {
                    joints: [i, 0, 0, 0],
                    weights: [1.0, 0.0, 0.0, 0.0],
                })
                .collect(),
        );
        let original = mesh.clone();
        resplit(&mut mesh, red_blue).unwrap();

        let weights = mesh.bone_weights.as_ref().unwrap();
        let old_weights = original.bone_weights.as_ref().unwrap();
        for (new, old) in mesh.indices.iter().zip(&original.indices) {
            assert_eq!(weights[*new as usize], old_weights[*old as usize]);
        }
    }

    #[test]
    fn empty_submesh_contributes_nothing() {
        let mut mesh = shared_quad();
        mesh.submeshes.insert(
            1,
            SubMesh {
                index_start: 3,
                index_count: 0,
                first_vertex: 0,
                vertex_count: 0,
            },
        );
        resplit(&mut mesh, |_| Some(Color::GREEN)).unwrap();

        assert_eq!(mesh.vertex_count(), 6);
        assert_eq!(mesh.submeshes[1].index_count, 0);
        assert_eq!(mesh.submeshes[1].vertex_count, 0);
        assert_eq!(mesh.submeshes[2].index_range(), 3..6);
    }

    #[test]
    fn empty_mesh_is_a_no_op() {
        let mut mesh = MeshBuffers::new("Empty");
        let stats = resplit(&mut mesh, red_blue).unwrap();
        assert_eq!(stats.new_vertices, 0);
        assert_eq!(mesh, MeshBuffers::new("Empty"));

        let mut no_submeshes = shared_quad();
        no_submeshes.submeshes.clear();
        let before = no_submeshes.clone();
        resplit(&mut no_submeshes, red_blue).unwrap();
        assert_eq!(no_submeshes, before);
    }

    #[test]
    fn malformed_mesh_is_left_untouched() {
        let mut mesh = shared_quad();
        mesh.indices[5] = 42;
        let before = mesh.clone();

        assert!(matches!(
            resplit(&mut mesh, red_blue),
            Err(AssetError::VertexIndexOutOfBounds { .. })
        ));
        assert_eq!(mesh, before);
    }

    #[test]
    fn partial_submesh_cover_is_rejected() {
        let mut dropped = shared_quad();
        dropped.submeshes.truncate(1);
        let before = dropped.clone();
        assert!(matches!(
            resplit(&mut dropped, red_blue),
            Err(AssetError::SubmeshRangesInvalid { .. })
        ));
        assert_eq!(dropped, before);

        let mut doubled = shared_quad();
        doubled.submeshes[1].index_start = 0;
        let before = doubled.clone();
        assert!(matches!(
            resplit(&mut doubled, red_blue),
            Err(AssetError::SubmeshRangesInvalid { .. })
        ));
        assert_eq!(doubled, before);
    }

    #[test]
    fn frames_with_no_referenced_vertices_become_empty() {
        let mut mesh = shared_quad();
        mesh.indices.clear();
        for sub in &mut mesh.submeshes {
            *sub = SubMesh::default();
        }
        mesh.blend_shapes = vec![BlendShape {
            name: "Blink".into(),
            frames: vec![
                BlendShapeFrame::zeroed(50.0, 4),
                BlendShapeFrame::zeroed(100.0, 4),
            ],
        }];

        let stats = resplit(&mut mesh, red_blue).unwrap();

        assert_eq!(stats.original_vertices, 4);
        assert_eq!(stats.new_vertices, 0);
        assert_eq!(mesh.vertex_count(), 0);
        for frame in &mesh.blend_shapes[0].frames {
            assert!(frame.delta_positions.is_empty());
            assert!(frame.delta_normals.is_empty());
            assert!(frame.delta_tangents.is_empty());
        }
        assert_eq!(mesh.blend_shapes[0].frames[1].weight, 100.0);
        assert!(mesh.submeshes.iter().all(|sub| sub.vertex_range().is_empty()));
        assert!(mesh.validate().is_ok());
    }

    #[test]
    fn resplit_twice_is_stable() {
        let mut mesh = shared_quad();
        resplit(&mut mesh, red_blue).unwrap();
        let once = mesh.clone();
        resplit(&mut mesh, red_blue).unwrap();
        assert_eq!(mesh, once);
    }
}
