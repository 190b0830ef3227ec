use colourbake_core::Color;
use serde::{Deserialize, Serialize};

use crate::mesh::MeshBuffers;

/// A material as seen by the importer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaterialInfo {
    pub name: String,
    /// Base colour in authored (gamma) space.
    pub base_color: Color,
}

/// What a submesh is rendered with after import.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "material", rename_all = "snake_case")]
pub enum MaterialBinding {
    /// The material that came with the source file.
    Source(MaterialInfo),
    /// The project's shared fallback material.
    Fallback(String),
    /// No material; the source material import was disabled.
    Unassigned,
}

/// One mesh of an imported model with a material binding per submesh.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportedMesh {
    pub mesh: MeshBuffers,
    pub materials: Vec<MaterialBinding>,
}

/// A loaded model (renderer-agnostic), ready for post-processing.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ImportedModel {
    pub name: String,
    pub meshes: Vec<ImportedMesh>,
}
