use colourbake_core::{Color, ColorSpace};
use serde::{Deserialize, Serialize};

/// Project-wide import settings, passed into every import as a snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportSettings {
    /// Material bound to every submesh of a baked mesh. `None` keeps the
    /// bindings the import produced.
    pub default_material: Option<String>,
    /// Bake material colours for assets whose metadata leaves the flag unset.
    pub import_material_colours_by_default: bool,
    /// Colour space the baked vertex colours are stored in.
    pub color_space: ColorSpace,
}

impl Default for ImportSettings {
    fn default() -> Self {
        Self {
            default_material: None,
            import_material_colours_by_default: false,
            color_space: ColorSpace::Linear,
        }
    }
}

impl ImportSettings {
    /// Convert an authored colour to the value written into vertex data.
    pub fn bake_colour(&self, color: Color) -> Color {
        color.for_color_space(self.color_space)
    }
}
