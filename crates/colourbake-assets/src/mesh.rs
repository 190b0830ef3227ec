use std::ops::Range;

use colourbake_core::Color;
use glam::{Vec2, Vec3, Vec4};
use serde::{Deserialize, Serialize};

use crate::error::AssetError;

/// A contiguous run of the triangle index list, rendered with one material.
///
/// `first_vertex..first_vertex + vertex_count` is the vertex range the
/// submesh's indices fall into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SubMesh {
    pub index_start: usize,
    pub index_count: usize,
    pub first_vertex: usize,
    pub vertex_count: usize,
}

impl SubMesh {
    pub fn index_range(&self) -> Range<usize> {
        self.index_start..self.index_start + self.index_count
    }

    pub fn vertex_range(&self) -> Range<usize> {
        self.first_vertex..self.first_vertex + self.vertex_count
    }
}

/// Up to four joint influences for a skinned vertex.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BoneWeight {
    pub joints: [u16; 4],
    pub weights: [f32; 4],
}

/// One weighted deformation target. Every delta list is indexed by vertex.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BlendShapeFrame {
    pub weight: f32,
    pub delta_positions: Vec<Vec3>,
    pub delta_normals: Vec<Vec3>,
    pub delta_tangents: Vec<Vec3>,
}

impl BlendShapeFrame {
    /// A frame with all-zero deltas for `vertex_count` vertices.
    pub fn zeroed(weight: f32, vertex_count: usize) -> Self {
        Self {
            weight,
            delta_positions: vec![Vec3::ZERO; vertex_count],
            delta_normals: vec![Vec3::ZERO; vertex_count],
            delta_tangents: vec![Vec3::ZERO; vertex_count],
        }
    }
}

/// A named blend shape made of one or more frames.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BlendShape {
    pub name: String,
    pub frames: Vec<BlendShapeFrame>,
}

/// Mutable geometry of a single mesh.
///
/// All per-vertex streams that are present have the same length as
/// `positions`. `indices` is a flat triangle list partitioned by `submeshes`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MeshBuffers {
    pub name: String,
    pub positions: Vec<Vec3>,
    pub normals: Option<Vec<Vec3>>,
    pub tangents: Option<Vec<Vec4>>,
    pub uvs: Option<Vec<Vec2>>,
    pub colors: Option<Vec<Color>>,
    pub bone_weights: Option<Vec<BoneWeight>>,
    pub indices: Vec<u32>,
    pub submeshes: Vec<SubMesh>,
    pub blend_shapes: Vec<BlendShape>,
}

impl MeshBuffers {
    /// An empty mesh with the given name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    /// Check the structural invariants the colour transforms rely on.
    pub fn validate(&self) -> Result<(), AssetError> {
        let expected = self.vertex_count();
        let check = |attribute: &'static str, actual: Option<usize>| match actual {
            Some(actual) if actual != expected => Err(AssetError::AttributeLengthMismatch {
                mesh: self.name.clone(),
                attribute,
                expected,
                actual,
            }),
            _ => Ok(()),
        };

        check("normals", self.normals.as_ref().map(Vec::len))?;
        check("tangents", self.tangents.as_ref().map(Vec::len))?;
        check("uvs", self.uvs.as_ref().map(Vec::len))?;
        check("colors", self.colors.as_ref().map(Vec::len))?;
        check("bone weights", self.bone_weights.as_ref().map(Vec::len))?;

        for shape in &self.blend_shapes {
            for frame in &shape.frames {
                check("blend shape position deltas", Some(frame.delta_positions.len()))?;
                check("blend shape normal deltas", Some(frame.delta_normals.len()))?;
                check("blend shape tangent deltas", Some(frame.delta_tangents.len()))?;
            }
        }

        for (submesh, sub) in self.submeshes.iter().enumerate() {
            let range = sub.index_range();
            if range.end > self.indices.len() {
                return Err(AssetError::SubmeshOutOfBounds {
                    mesh: self.name.clone(),
                    submesh,
                    start: range.start,
                    end: range.end,
                    len: self.indices.len(),
                });
            }
        }

        self.validate_index_partition()?;

        if let Some(&index) = self.indices.iter().find(|&&i| i as usize >= expected) {
            return Err(AssetError::VertexIndexOutOfBounds {
                mesh: self.name.clone(),
                index,
                len: expected,
            });
        }

        Ok(())
    }

    /// Check that the non-empty submesh index ranges tile the whole index
    /// list with no gap or overlap. A mesh without submeshes is exempt.
    fn validate_index_partition(&self) -> Result<(), AssetError> {
        if self.submeshes.is_empty() {
            return Ok(());
        }

        let mut ranges: Vec<Range<usize>> = self
            .submeshes
            .iter()
            .map(SubMesh::index_range)
            .filter(|range| !range.is_empty())
            .collect();
        ranges.sort_by_key(|range| range.start);

        let invalid = |offset| AssetError::SubmeshRangesInvalid {
            mesh: self.name.clone(),
            offset,
            len: self.indices.len(),
        };

        let mut covered = 0;
        for range in ranges {
            if range.start != covered {
                return Err(invalid(covered.min(range.start)));
            }
            covered = range.end;
        }
        if covered != self.indices.len() {
            return Err(invalid(covered));
        }
        Ok(())
    }

    /// Check that every submesh vertex range lies inside the vertex buffer.
    pub fn validate_vertex_ranges(&self) -> Result<(), AssetError> {
        let len = self.vertex_count();
        for (submesh, sub) in self.submeshes.iter().enumerate() {
            let range = sub.vertex_range();
            if range.end > len {
                return Err(AssetError::VertexRangeOutOfBounds {
                    mesh: self.name.clone(),
                    submesh,
                    start: range.start,
                    end: range.end,
                    len,
                });
            }
        }
        Ok(())
    }

    /// True when every submesh only touches its own vertex range and no two
    /// vertex ranges overlap, so colours can be painted per range.
    pub fn has_private_vertex_ranges(&self) -> bool {
        let mut ranges: Vec<Range<usize>> = self
            .submeshes
            .iter()
            .map(SubMesh::vertex_range)
            .filter(|range| !range.is_empty())
            .collect();
        ranges.sort_by_key(|range| range.start);
        if ranges.windows(2).any(|pair| pair[0].end > pair[1].start) {
            return false;
        }

        self.submeshes.iter().all(|sub| {
            let vertices = sub.vertex_range();
            self.indices
                .get(sub.index_range())
                .is_some_and(|indices| indices.iter().all(|&i| vertices.contains(&(i as usize))))
        })
    }
}
