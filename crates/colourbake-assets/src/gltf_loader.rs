use std::path::Path;

use colourbake_core::Color;
use glam::{Vec2, Vec3, Vec4};
use tracing::debug;

use crate::error::AssetError;
use crate::mesh::{BlendShape, BlendShapeFrame, BoneWeight, MeshBuffers, SubMesh};
use crate::model::{ImportedMesh, ImportedModel, MaterialBinding, MaterialInfo};

/// Frame weight given to each morph target, matching a fully applied shape.
const MORPH_TARGET_WEIGHT: f32 = 100.0;

/// Load a glTF 2.0 file (.gltf or .glb) as an importable model.
///
/// Each glTF mesh becomes one [`MeshBuffers`]; its triangle primitives become
/// submeshes sharing one vertex buffer, each bound to its source material.
pub fn load_gltf(path: &Path) -> Result<ImportedModel, AssetError> {
    if !path.exists() {
        return Err(AssetError::NotFound(path.to_path_buf()));
    }

    let (document, buffers, _images) = gltf::import(path)
        .map_err(|e| AssetError::GltfLoadFailed(path.to_path_buf(), e.to_string()))?;

    let mut meshes = Vec::new();

    for mesh in document.meshes() {
        let name = mesh
            .name()
            .map(str::to_string)
            .unwrap_or_else(|| format!("mesh_{}", mesh.index()));

        let mut buffers_out = MeshBuffers::new(name.clone());
        let mut materials = Vec::new();

        for primitive in mesh.primitives() {
            if primitive.mode() != gltf::mesh::Mode::Triangles {
                debug!(
                    "Skipping non-triangle primitive {} of mesh '{}'",
                    primitive.index(),
                    name
                );
                continue;
            }

            let reader = primitive.reader(|buffer| Some(&buffers[buffer.index()]));

            let positions: Vec<Vec3> = reader
                .read_positions()
                .map(|iter| iter.map(Vec3::from).collect())
                .unwrap_or_default();
            let vertex_count = positions.len();
            let vertex_offset = buffers_out.vertex_count();

            let normals: Option<Vec<Vec3>> = reader
                .read_normals()
                .map(|iter| iter.map(Vec3::from).collect());

            let tangents: Option<Vec<Vec4>> = reader
                .read_tangents()
                .map(|iter| iter.map(Vec4::from).collect());

            let uvs: Option<Vec<Vec2>> = reader
                .read_tex_coords(0)
                .map(|tc| tc.into_f32().map(Vec2::from).collect());

            let colors: Option<Vec<Color>> = reader
                .read_colors(0)
                .map(|c| c.into_rgba_f32().map(Color::from).collect());

            let bone_weights: Option<Vec<BoneWeight>> =
                match (reader.read_joints(0), reader.read_weights(0)) {
                    (Some(joints), Some(weights)) => Some(
                        joints
                            .into_u16()
                            .zip(weights.into_f32())
                            .map(|(joints, weights)| BoneWeight { joints, weights })
                            .collect(),
                    ),
                    _ => None,
                };

            let indices = offset_indices(
                &name,
                reader.read_indices().map(|idx| idx.into_u32()),
                vertex_offset,
                vertex_count,
            )?;

            for (target, (target_positions, target_normals, target_tangents)) in
                reader.read_morph_targets().enumerate()
            {
                if buffers_out.blend_shapes.len() <= target {
                    buffers_out.blend_shapes.push(BlendShape {
                        name: format!("{}.target_{}", name, target),
                        frames: vec![BlendShapeFrame::zeroed(MORPH_TARGET_WEIGHT, vertex_offset)],
                    });
                }
                let frame = &mut buffers_out.blend_shapes[target].frames[0];
                extend_deltas(&mut frame.delta_positions, vertex_offset, target_positions);
                extend_deltas(&mut frame.delta_normals, vertex_offset, target_normals);
                extend_deltas(&mut frame.delta_tangents, vertex_offset, target_tangents);
            }

            append(&mut buffers_out.normals, vertex_offset, normals, vertex_count, Vec3::ZERO);
            append(&mut buffers_out.tangents, vertex_offset, tangents, vertex_count, Vec4::ZERO);
            append(&mut buffers_out.uvs, vertex_offset, uvs, vertex_count, Vec2::ZERO);
            append(&mut buffers_out.colors, vertex_offset, colors, vertex_count, Color::WHITE);
            append(
                &mut buffers_out.bone_weights,
                vertex_offset,
                bone_weights,
                vertex_count,
                BoneWeight::default(),
            );
            buffers_out.positions.extend(positions);

            let total = buffers_out.vertex_count();
            for frame in buffers_out
                .blend_shapes
                .iter_mut()
                .flat_map(|shape| shape.frames.iter_mut())
            {
                frame.delta_positions.resize(total, Vec3::ZERO);
                frame.delta_normals.resize(total, Vec3::ZERO);
                frame.delta_tangents.resize(total, Vec3::ZERO);
            }

            buffers_out.submeshes.push(SubMesh {
                index_start: buffers_out.indices.len(),
                index_count: indices.len(),
                first_vertex: vertex_offset,
                vertex_count,
            });
            buffers_out.indices.extend(indices);

            let material = primitive.material();
            // glTF stores linear factors; importers hand out authored colours.
            let base_color =
                Color::from(material.pbr_metallic_roughness().base_color_factor()).to_gamma();
            materials.push(MaterialBinding::Source(MaterialInfo {
                name: material.name().unwrap_or("default").to_string(),
                base_color,
            }));
        }

        debug!(
            "Loaded mesh '{}' with {} vertices in {} submeshes",
            name,
            buffers_out.vertex_count(),
            buffers_out.submeshes.len()
        );
        meshes.push(ImportedMesh {
            mesh: buffers_out,
            materials,
        });
    }

    let model_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    debug!("glTF '{}': {} meshes", path.display(), meshes.len());

    Ok(ImportedModel {
        name: model_name,
        meshes,
    })
}

/// Shift a primitive's indices past the vertices of earlier primitives.
/// Unindexed primitives draw their vertices in order.
fn offset_indices<I>(
    mesh_name: &str,
    indices: Option<I>,
    vertex_offset: usize,
    vertex_count: usize,
) -> Result<Vec<u32>, AssetError>
where
    I: Iterator<Item = u32>,
{
    let too_many = || AssetError::TooManyVertices(mesh_name.to_string());
    let base = u32::try_from(vertex_offset).map_err(|_| too_many())?;
    let end = vertex_offset
        .checked_add(vertex_count)
        .and_then(|end| u32::try_from(end).ok())
        .ok_or_else(too_many)?;

    match indices {
        Some(indices) => indices
            .map(|i| i.checked_add(base).ok_or_else(too_many))
            .collect(),
        None => Ok((base..end).collect()),
    }
}

/// Append a primitive's stream, back-filling or padding with `default` when
/// only some primitives of the mesh carry the attribute.
fn append<T: Clone>(
    stream: &mut Option<Vec<T>>,
    filled: usize,
    values: Option<Vec<T>>,
    count: usize,
    default: T,
) {
    match values {
        Some(values) => stream
            .get_or_insert_with(|| vec![default; filled])
            .extend(values),
        None => {
            if let Some(stream) = stream {
                stream.extend(std::iter::repeat(default).take(count));
            }
        }
    }
}

fn extend_deltas<I>(deltas: &mut Vec<Vec3>, offset: usize, values: Option<I>)
where
    I: Iterator<Item = [f32; 3]>,
{
    deltas.resize(offset, Vec3::ZERO);
    if let Some(values) = values {
        deltas.extend(values.map(Vec3::from));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::PathBuf;

    /// Writes a quad whose two triangles are separate primitives sharing one
    /// position accessor, with a red and a blue material.
    fn write_quad_gltf(dir: &Path) -> PathBuf {
        let mut bin = Vec::new();
        for p in [
            [0.0f32, 0.0, 0.0],
            [1.0, 0.0, 0.0],
            [1.0, 1.0, 0.0],
            [0.0, 1.0, 0.0],
        ] {
            for c in p {
                bin.extend_from_slice(&c.to_le_bytes());
            }
        }
        for i in [0u16, 1, 2, 0, 2, 3] {
            bin.extend_from_slice(&i.to_le_bytes());
        }
        fs::write(dir.join("quad.bin"), &bin).unwrap();

        let json = r#"{
            "asset": {"version": "2.0"},
            "buffers": [{"uri": "quad.bin", "byteLength": 60}],
            "bufferViews": [
                {"buffer": 0, "byteOffset": 0, "byteLength": 48, "target": 34962},
                {"buffer": 0, "byteOffset": 48, "byteLength": 12, "target": 34963}
            ],
            "accessors": [
                {"bufferView": 0, "componentType": 5126, "count": 4, "type": "VEC3",
                 "min": [0.0, 0.0, 0.0], "max": [1.0, 1.0, 0.0]},
                {"bufferView": 1, "byteOffset": 0, "componentType": 5123, "count": 3, "type": "SCALAR"},
                {"bufferView": 1, "byteOffset": 6, "componentType": 5123, "count": 3, "type": "SCALAR"}
            ],
            "materials": [
                {"name": "Red", "pbrMetallicRoughness": {"baseColorFactor": [1.0, 0.0, 0.0, 1.0]}},
                {"name": "Blue", "pbrMetallicRoughness": {"baseColorFactor": [0.0, 0.0, 1.0, 1.0]}}
            ],
            "meshes": [{
                "name": "Quad",
                "primitives": [
                    {"attributes": {"POSITION": 0}, "indices": 1, "material": 0},
                    {"attributes": {"POSITION": 0}, "indices": 2, "material": 1}
                ]
            }],
            "nodes": [{"mesh": 0}],
            "scenes": [{"nodes": [0]}],
            "scene": 0
        }"#;
        let path = dir.join("quad.gltf");
        fs::write(&path, json).unwrap();
        path
    }

    fn temp_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("colourbake-{}-{}", name, std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn missing_file_returns_error() {
        match load_gltf(Path::new("/nonexistent/does_not_exist.glb")) {
            Err(AssetError::NotFound(_)) => {}
            other => panic!("expected NotFound, got: {:?}", other),
        }
    }

    #[test]
    fn primitives_become_submeshes() {
        let dir = temp_dir("gltf-quad");
        let path = write_quad_gltf(&dir);

        let model = load_gltf(&path).unwrap();
        assert_eq!(model.name, "quad.gltf");
        assert_eq!(model.meshes.len(), 1);

        let imported = &model.meshes[0];
        let mesh = &imported.mesh;
        assert_eq!(mesh.name, "Quad");
        // Each primitive brings its own copy of the shared accessor.
        assert_eq!(mesh.vertex_count(), 8);
        assert_eq!(mesh.indices, vec![0, 1, 2, 4, 6, 7]);
        assert_eq!(mesh.submeshes[1].vertex_range(), 4..8);
        assert!(mesh.normals.is_none());
        assert!(mesh.validate().is_ok());

        match &imported.materials[..] {
            [MaterialBinding::Source(red), MaterialBinding::Source(blue)] => {
                assert_eq!(red.name, "Red");
                assert_eq!(blue.name, "Blue");
                let close = |a: Color, b: Color| {
                    a.to_array()
                        .iter()
                        .zip(b.to_array())
                        .all(|(x, y)| (x - y).abs() < 1e-4)
                };
                assert!(close(red.base_color, Color::RED), "{:?}", red.base_color);
                assert!(close(blue.base_color, Color::BLUE), "{:?}", blue.base_color);
            }
            other => panic!("unexpected materials: {:?}", other),
        }

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn indices_are_offset_per_primitive() {
        let indexed = offset_indices("Quad", Some([0u32, 2, 1].into_iter()), 4, 3).unwrap();
        assert_eq!(indexed, vec![4, 6, 5]);

        let unindexed = offset_indices("Quad", None::<std::vec::IntoIter<u32>>, 3, 3).unwrap();
        assert_eq!(unindexed, vec![3, 4, 5]);
    }

    #[test]
    fn indices_past_u32_are_rejected() {
        let near_limit = u32::MAX as usize - 1;
        match offset_indices("Big", Some([0u32, 1, 2].into_iter()), near_limit, 3) {
            Err(AssetError::TooManyVertices(name)) => assert_eq!(name, "Big"),
            other => panic!("expected TooManyVertices, got: {:?}", other),
        }
        assert!(matches!(
            offset_indices("Big", None::<std::vec::IntoIter<u32>>, near_limit, 3),
            Err(AssetError::TooManyVertices(_))
        ));
        assert!(matches!(
            offset_indices("Big", Some([u32::MAX].into_iter()), 1, 1),
            Err(AssetError::TooManyVertices(_))
        ));
    }

    #[test]
    fn partial_streams_are_padded() {
        let mut stream: Option<Vec<u8>> = None;
        append(&mut stream, 0, None, 3, 0);
        assert_eq!(stream, None);

        append(&mut stream, 3, Some(vec![7, 7]), 2, 0);
        assert_eq!(stream, Some(vec![0, 0, 0, 7, 7]));

        append(&mut stream, 5, None, 2, 1);
        assert_eq!(stream, Some(vec![0, 0, 0, 7, 7, 1, 1]));
    }
}
