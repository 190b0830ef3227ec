//! Per-asset colour metadata.
//!
//! Stored as JSON in a sidecar next to the model file, using the field layout
//! of the editor plugin that authors it:
//!
//! ```json
//! {
//!   "meshColors": [
//!     { "meshName": "Body", "materialIndex": 1,
//!       "color": { "r": 1.0, "g": 0.0, "b": 0.0, "a": 1.0 }, "valid": true }
//!   ],
//!   "importMaterialColors": { "hasValue": true, "value": false }
//! }
//! ```

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use colourbake_core::Color;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::AssetError;

/// Suffix appended to a model's file name to locate its metadata.
pub const SIDECAR_SUFFIX: &str = ".colours.json";

/// A colour authored for one submesh slot of a named mesh.
#[derive(Debug, Clone, PartialEq)]
pub struct SubmeshColour {
    pub mesh_name: String,
    pub submesh_index: usize,
    pub color: Color,
}

/// Colour overrides and import flags for one model asset.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "StoredMetadata", into = "StoredMetadata")]
pub struct ImportMetadata {
    colours: Vec<SubmeshColour>,
    import_material_colours: Option<bool>,
}

impl ImportMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse metadata JSON. Blank input means no metadata.
    pub fn from_json(json: &str) -> Result<Option<Self>, AssetError> {
        if json.trim().is_empty() {
            return Ok(None);
        }
        serde_json::from_str(json)
            .map(Some)
            .map_err(AssetError::MetadataParse)
    }

    pub fn to_json(&self) -> Result<String, AssetError> {
        serde_json::to_string_pretty(self).map_err(AssetError::MetadataSerialize)
    }

    /// Location of the metadata sidecar for `model`.
    pub fn sidecar_path(model: &Path) -> PathBuf {
        let mut name = model.file_name().unwrap_or_default().to_os_string();
        name.push(SIDECAR_SUFFIX);
        model.with_file_name(name)
    }

    /// Load the sidecar for `model`. A missing or blank sidecar is `None`.
    pub fn load_for(model: &Path) -> Result<Option<Self>, AssetError> {
        let path = Self::sidecar_path(model);
        let json = match fs::read_to_string(&path) {
            Ok(json) => json,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("No colour metadata at {}", path.display());
                return Ok(None);
            }
            Err(e) => return Err(AssetError::Io(path, e)),
        };
        Self::from_json(&json)
    }

    /// Write the sidecar for `model`, or remove it when there is nothing to store.
    pub fn save_for(&self, model: &Path) -> Result<PathBuf, AssetError> {
        let path = Self::sidecar_path(model);
        if self.is_empty() {
            match fs::remove_file(&path) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => return Err(AssetError::Io(path, e)),
            }
            return Ok(path);
        }
        fs::write(&path, self.to_json()?).map_err(|e| AssetError::Io(path.clone(), e))?;
        Ok(path)
    }

    /// No colours and no explicit material flag.
    pub fn is_empty(&self) -> bool {
        self.colours.is_empty() && self.import_material_colours.is_none()
    }

    pub fn has_mesh_colours(&self) -> bool {
        !self.colours.is_empty()
    }

    pub fn colours(&self) -> &[SubmeshColour] {
        &self.colours
    }

    /// Colours authored for the mesh called `mesh_name`.
    pub fn colours_for_mesh<'a>(
        &'a self,
        mesh_name: &'a str,
    ) -> impl Iterator<Item = &'a SubmeshColour> + 'a {
        self.colours.iter().filter(move |c| c.mesh_name == mesh_name)
    }

    pub fn mesh_colour(&self, mesh_name: &str, submesh_index: usize) -> Option<Color> {
        self.colours
            .iter()
            .find(|c| c.mesh_name == mesh_name && c.submesh_index == submesh_index)
            .map(|c| c.color)
    }

    /// Set the colour of a submesh slot, replacing any previous one.
    pub fn set_colour(&mut self, mesh_name: &str, submesh_index: usize, color: Color) {
        match self
            .colours
            .iter_mut()
            .find(|c| c.mesh_name == mesh_name && c.submesh_index == submesh_index)
        {
            Some(existing) => existing.color = color,
            None => self.colours.push(SubmeshColour {
                mesh_name: mesh_name.to_string(),
                submesh_index,
                color,
            }),
        }
    }

    /// Remove a submesh slot's colour. Returns whether one was present.
    pub fn remove_colour(&mut self, mesh_name: &str, submesh_index: usize) -> bool {
        let before = self.colours.len();
        self.colours
            .retain(|c| !(c.mesh_name == mesh_name && c.submesh_index == submesh_index));
        self.colours.len() != before
    }

    /// The explicit per-asset flag; `None` means "use the project default".
    pub fn import_material_colours(&self) -> Option<bool> {
        self.import_material_colours
    }

    pub fn set_import_material_colours(&mut self, value: Option<bool>) {
        self.import_material_colours = value;
    }

    /// Effective flag after falling back to the project default.
    pub fn should_import_material_colours(&self, project_default: bool) -> bool {
        self.import_material_colours.unwrap_or(project_default)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredMetadata {
    #[serde(default)]
    mesh_colors: Vec<StoredMeshColour>,
    #[serde(default)]
    import_material_colors: StoredNullableBool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredMeshColour {
    mesh_name: String,
    #[serde(default)]
    material_index: usize,
    color: Color,
    #[serde(default = "StoredMeshColour::default_valid")]
    valid: bool,
}

impl StoredMeshColour {
    fn default_valid() -> bool {
        true
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredNullableBool {
    #[serde(default)]
    has_value: bool,
    #[serde(default)]
    value: bool,
}

impl From<StoredMetadata> for ImportMetadata {
    fn from(stored: StoredMetadata) -> Self {
        let mut metadata = ImportMetadata {
            colours: Vec::with_capacity(stored.mesh_colors.len()),
            import_material_colours: stored
                .import_material_colors
                .has_value
                .then_some(stored.import_material_colors.value),
        };
        // Later duplicates of the same slot win.
        for entry in stored.mesh_colors.into_iter().filter(|e| e.valid) {
            metadata.set_colour(&entry.mesh_name, entry.material_index, entry.color);
        }
        metadata
    }
}

impl From<ImportMetadata> for StoredMetadata {
    fn from(metadata: ImportMetadata) -> Self {
        StoredMetadata {
            mesh_colors: metadata
                .colours
                .into_iter()
                .map(|c| StoredMeshColour {
                    mesh_name: c.mesh_name,
                    material_index: c.submesh_index,
                    color: c.color,
                    valid: true,
                })
                .collect(),
            import_material_colors: StoredNullableBool {
                has_value: metadata.import_material_colours.is_some(),
                value: metadata.import_material_colours.unwrap_or_default(),
            },
        }
    }
}
