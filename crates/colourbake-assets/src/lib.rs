//! Colourbake Assets - model import and vertex colour baking
//!
//! Loads glTF 2.0 models into renderer-agnostic mesh buffers, reads the
//! per-model colour sidecar, and bakes submesh colours into vertex data.

mod error;
mod gltf_loader;
mod mesh;
mod metadata;
mod model;
mod paint;
mod postprocess;
mod resplit;
mod scan;
mod settings;

pub use error::AssetError;
pub use gltf_loader::load_gltf;
pub use mesh::{BlendShape, BlendShapeFrame, BoneWeight, MeshBuffers, SubMesh};
pub use metadata::{ImportMetadata, SubmeshColour, SIDECAR_SUFFIX};
pub use model::{ImportedMesh, ImportedModel, MaterialBinding, MaterialInfo};
pub use paint::{paint, PaintStats};
pub use postprocess::{import_model, ImportReport, MeshOutcome, MeshReport, ModelPostprocessor};
pub use resplit::{resplit, ResplitStats};
pub use scan::{is_model_file, ScanEntry, ScanQueue, ScanStatus, MODEL_EXTENSIONS};
pub use settings::ImportSettings;
