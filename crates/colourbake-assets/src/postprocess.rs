//! Import callbacks that bake colours into imported meshes.
//!
//! The host drives an import in three steps: [`ModelPostprocessor::preprocess`]
//! decides whether to intervene, [`ModelPostprocessor::assign_material`] is
//! called once per submesh material in submesh order, and
//! [`ModelPostprocessor::postprocess`] rewrites the final meshes.
//! [`import_model`] runs all three for an already loaded model.

use std::collections::{BTreeMap, HashMap};

use colourbake_core::Color;
use tracing::{debug, info, warn};

use crate::error::AssetError;
use crate::mesh::MeshBuffers;
use crate::metadata::ImportMetadata;
use crate::model::{ImportedMesh, ImportedModel, MaterialBinding, MaterialInfo};
use crate::paint::{paint, PaintStats};
use crate::resplit::{resplit, ResplitStats};
use crate::settings::ImportSettings;

/// What happened to one mesh during post-processing.
#[derive(Debug)]
pub enum MeshOutcome {
    /// No colours applied to this mesh.
    Untouched,
    Baked {
        resplit: Option<ResplitStats>,
        paint: Option<PaintStats>,
    },
    /// The mesh violated a structural invariant and was left as imported.
    Failed(AssetError),
}

#[derive(Debug)]
pub struct MeshReport {
    pub name: String,
    pub outcome: MeshOutcome,
}

/// Summary of one model import.
#[derive(Debug, Default)]
pub struct ImportReport {
    /// Whether the importer intervened at all.
    pub processed: bool,
    pub meshes: Vec<MeshReport>,
}

impl ImportReport {
    pub fn baked_count(&self) -> usize {
        self.meshes
            .iter()
            .filter(|m| matches!(m.outcome, MeshOutcome::Baked { .. }))
            .count()
    }

    pub fn failures(&self) -> impl Iterator<Item = (&str, &AssetError)> {
        self.meshes.iter().filter_map(|m| match &m.outcome {
            MeshOutcome::Failed(e) => Some((m.name.as_str(), e)),
            _ => None,
        })
    }

    pub fn has_failures(&self) -> bool {
        self.failures().next().is_some()
    }
}

/// Per-import state shared between the import callbacks.
pub struct ModelPostprocessor<'a> {
    settings: &'a ImportSettings,
    metadata: Option<&'a ImportMetadata>,
    import_material_colours: bool,
    should_process: bool,
    material_colours: HashMap<usize, Vec<Option<Color>>>,
}

impl<'a> ModelPostprocessor<'a> {
    /// Decide whether this import bakes colours.
    pub fn preprocess(settings: &'a ImportSettings, metadata: Option<&'a ImportMetadata>) -> Self {
        let default = settings.import_material_colours_by_default;
        let (import_material_colours, has_mesh_colours) = match metadata {
            Some(metadata) => (
                metadata.should_import_material_colours(default),
                metadata.has_mesh_colours(),
            ),
            None => (default, false),
        };

        Self {
            settings,
            metadata,
            import_material_colours,
            should_process: has_mesh_colours || import_material_colours,
            material_colours: HashMap::new(),
        }
    }

    pub fn should_process(&self) -> bool {
        self.should_process
    }

    pub fn imports_material_colours(&self) -> bool {
        self.import_material_colours
    }

    /// Whether the host should keep the materials from the source file.
    /// Disabled whenever colours are baked.
    pub fn imports_source_materials(&self) -> bool {
        !self.should_process
    }

    /// Record the material of the next submesh of mesh `mesh_index`.
    pub fn assign_material(&mut self, mesh_index: usize, material: Option<&MaterialInfo>) {
        if !self.should_process {
            return;
        }
        self.material_colours
            .entry(mesh_index)
            .or_default()
            .push(material.map(|m| m.base_color));
    }

    /// Bake colours into every mesh of `model`.
    ///
    /// A mesh that fails validation is reported and left as imported; the
    /// remaining meshes are still processed.
    pub fn postprocess(&mut self, model: &mut ImportedModel) -> ImportReport {
        let mut report = ImportReport {
            processed: self.should_process,
            meshes: Vec::with_capacity(model.meshes.len()),
        };
        if !self.should_process {
            return report;
        }

        for (mesh_index, imported) in model.meshes.iter_mut().enumerate() {
            let outcome = self.postprocess_mesh(mesh_index, imported);
            if let MeshOutcome::Failed(e) = &outcome {
                warn!("Skipping mesh '{}' in '{}': {}", imported.mesh.name, model.name, e);
            }
            report.meshes.push(MeshReport {
                name: imported.mesh.name.clone(),
                outcome,
            });
        }

        info!(
            "Baked vertex colours for {} of {} meshes in '{}'",
            report.baked_count(),
            report.meshes.len(),
            model.name
        );

        report
    }

    fn postprocess_mesh(&self, mesh_index: usize, imported: &mut ImportedMesh) -> MeshOutcome {
        if imported.mesh.vertex_count() == 0 {
            return MeshOutcome::Untouched;
        }

        let material_colours: Option<Vec<Option<Color>>> = self.import_material_colours.then(|| {
            self.material_colours
                .get(&mesh_index)
                .map(|colours| {
                    colours
                        .iter()
                        .map(|c| c.map(|c| self.settings.bake_colour(c)))
                        .collect()
                })
                .unwrap_or_default()
        });

        let explicit: BTreeMap<usize, Color> = self
            .metadata
            .map(|metadata| {
                metadata
                    .colours_for_mesh(&imported.mesh.name)
                    .map(|c| (c.submesh_index, self.settings.bake_colour(c.color)))
                    .collect()
            })
            .unwrap_or_default();

        let outcome = if material_colours.is_none() && explicit.is_empty() {
            MeshOutcome::Untouched
        } else {
            let mut working = imported.mesh.clone();
            match bake(&mut working, material_colours.as_deref(), &explicit) {
                Ok((resplit, paint)) => {
                    imported.mesh = working;
                    MeshOutcome::Baked { resplit, paint }
                }
                Err(e) => return MeshOutcome::Failed(e),
            }
        };

        if let Some(fallback) = &self.settings.default_material {
            debug!(
                "Binding fallback material '{}' to mesh '{}'",
                fallback, imported.mesh.name
            );
            imported.materials =
                vec![MaterialBinding::Fallback(fallback.clone()); imported.mesh.submeshes.len()];
        }

        outcome
    }
}

/// Material colours resplit first, explicit colours painted on top.
fn bake(
    mesh: &mut MeshBuffers,
    material_colours: Option<&[Option<Color>]>,
    explicit: &BTreeMap<usize, Color>,
) -> Result<(Option<ResplitStats>, Option<PaintStats>), AssetError> {
    let mut resplit_stats = match material_colours {
        Some(colours) => Some(resplit(mesh, |i| colours.get(i).copied().flatten())?),
        None => None,
    };

    let mut paint_stats = None;
    if !explicit.is_empty() {
        if resplit_stats.is_none() && !mesh.has_private_vertex_ranges() {
            resplit_stats = Some(resplit(mesh, |_| None)?);
        }
        paint_stats = Some(paint(mesh, |i| explicit.get(&i).copied())?);
    }

    Ok((resplit_stats, paint_stats))
}

/// Run the full callback sequence against a loaded model.
pub fn import_model(
    model: &mut ImportedModel,
    metadata: Option<&ImportMetadata>,
    settings: &ImportSettings,
) -> ImportReport {
    let mut postprocessor = ModelPostprocessor::preprocess(settings, metadata);
    let keep_source_materials = postprocessor.imports_source_materials();

    for (mesh_index, imported) in model.meshes.iter_mut().enumerate() {
        for binding in &mut imported.materials {
            let material = match binding {
                MaterialBinding::Source(material) => Some(&*material),
                _ => None,
            };
            postprocessor.assign_material(mesh_index, material);
            if !keep_source_materials {
                *binding = MaterialBinding::Unassigned;
            }
        }
    }

    postprocessor.postprocess(model)
}
