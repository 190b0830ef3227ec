//! colourbake core - colour types shared by the import pipeline
//!
//! This crate provides the foundational types used throughout colourbake:
//! - RGBA colours with gamma/linear conversion and HSV helpers
//! - The project colour space setting
//! - Named colour strategies (fixed colours and random palettes)

mod error;
pub mod palette;
pub mod types;

pub use error::ColorError;
pub use palette::{ColourStrategy, Modifier, ModifierKind, Palette, RandomPalette, StrategyRegistry};
pub use types::{Color, ColorSpace};
