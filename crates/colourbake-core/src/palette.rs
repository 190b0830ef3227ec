//! Named colour strategies
//!
//! A strategy produces a colour for a submesh slot when the user does not pick
//! one by hand. Strategies are registered by name in a [`StrategyRegistry`],
//! usually loaded from the project settings file.

use std::collections::BTreeMap;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::ColorError;
use crate::types::Color;

/// Which HSV channel a [`Modifier`] jitters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModifierKind {
    Hue,
    Saturation,
    Value,
}

/// Random offset in `[-range, range]` applied to one HSV channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Modifier {
    pub kind: ModifierKind,
    #[serde(default = "Modifier::default_range")]
    pub range: f32,
}

impl Modifier {
    fn default_range() -> f32 {
        0.01
    }

    /// Apply the modifier. Hue wraps around, saturation and value clamp.
    pub fn apply<R: Rng + ?Sized>(&self, color: Color, rng: &mut R) -> Color {
        let (mut h, mut s, mut v) = color.to_hsv();
        let range = self.range.max(0.0);
        let offset = rng.gen_range(-range..=range);

        match self.kind {
            ModifierKind::Hue => h = (h + offset).rem_euclid(1.0),
            ModifierKind::Saturation => s = (s + offset).clamp(0.0, 1.0),
            ModifierKind::Value => v = (v + offset).clamp(0.0, 1.0),
        }

        Color::from_hsv(h, s, v).with_alpha(color.a)
    }
}

/// A weighted set of colours with per-palette modifiers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Palette {
    #[serde(default = "Palette::default_probability")]
    pub probability: f32,
    pub colors: Vec<Color>,
    #[serde(default)]
    pub modifiers: Vec<Modifier>,
}

impl Palette {
    fn default_probability() -> f32 {
        1.0
    }

    /// Pick one colour uniformly and run it through the palette's modifiers.
    pub fn pick<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<Color> {
        if self.colors.is_empty() {
            return None;
        }
        let color = self.colors[rng.gen_range(0..self.colors.len())];
        Some(
            self.modifiers
                .iter()
                .fold(color, |color, modifier| modifier.apply(color, rng)),
        )
    }
}

/// Chooses a palette by probability weight, then a colour from it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RandomPalette {
    pub palettes: Vec<Palette>,
    #[serde(default)]
    pub final_modifiers: Vec<Modifier>,
}

impl RandomPalette {
    pub fn pick<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<Color> {
        let total: f32 = self.palettes.iter().map(|p| p.probability.max(0.0)).sum();
        let mut remaining = rng.gen::<f32>() * total;

        let palette = self
            .palettes
            .iter()
            .find(|palette| {
                remaining -= palette.probability.max(0.0);
                remaining <= 0.0
            })
            .or_else(|| self.palettes.last())?;

        let color = palette.pick(rng)?;
        Some(
            self.final_modifiers
                .iter()
                .fold(color, |color, modifier| modifier.apply(color, rng)),
        )
    }
}

/// A colour-generation strategy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ColourStrategy {
    Fixed { color: Color },
    RandomPalette(RandomPalette),
}

impl ColourStrategy {
    /// Produce a colour. `None` when the strategy has nothing to offer.
    pub fn pick<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<Color> {
        match self {
            ColourStrategy::Fixed { color } => Some(*color),
            ColourStrategy::RandomPalette(palette) => palette.pick(rng),
        }
    }
}

/// Strategies addressable by name
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StrategyRegistry {
    strategies: BTreeMap<String, ColourStrategy>,
}

impl StrategyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a strategy, replacing any previous one with the same name.
    pub fn register(&mut self, name: impl Into<String>, strategy: ColourStrategy) {
        self.strategies.insert(name.into(), strategy);
    }

    pub fn get(&self, name: &str) -> Option<&ColourStrategy> {
        self.strategies.get(name)
    }

    /// Registered names in sorted order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.strategies.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }

    /// Pick a colour from the named strategy.
    pub fn pick<R: Rng + ?Sized>(
        &self,
        name: &str,
        rng: &mut R,
    ) -> Result<Option<Color>, ColorError> {
        let strategy = self
            .get(name)
            .ok_or_else(|| ColorError::UnknownStrategy(name.to_string()))?;
        Ok(strategy.pick(rng))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn rng() -> StdRng {
        StdRng::seed_from_u64(7)
    }

    #[test]
    fn fixed_strategy_returns_its_colour() {
        let strategy = ColourStrategy::Fixed { color: Color::BLUE };
        assert_eq!(strategy.pick(&mut rng()), Some(Color::BLUE));
    }

    #[test]
    fn palette_without_colours_yields_nothing() {
        let palette = RandomPalette {
            palettes: vec![Palette {
                probability: 1.0,
                colors: vec![],
                modifiers: vec![],
            }],
            final_modifiers: vec![],
        };
        assert_eq!(palette.pick(&mut rng()), None);
        assert_eq!(RandomPalette::default().pick(&mut rng()), None);
    }

    #[test]
    fn zero_weight_palettes_fall_back_to_first() {
        let palette = RandomPalette {
            palettes: vec![
                Palette {
                    probability: 0.0,
                    colors: vec![Color::RED],
                    modifiers: vec![],
                },
                Palette {
                    probability: 0.0,
                    colors: vec![Color::GREEN],
                    modifiers: vec![],
                },
            ],
            final_modifiers: vec![],
        };
        assert_eq!(palette.pick(&mut rng()), Some(Color::RED));
    }

    #[test]
    fn weighted_choice_never_picks_zero_weight_palette() {
        let palette = RandomPalette {
            palettes: vec![
                Palette {
                    probability: 1.0,
                    colors: vec![Color::RED],
                    modifiers: vec![],
                },
                Palette {
                    probability: 0.0,
                    colors: vec![Color::GREEN],
                    modifiers: vec![],
                },
            ],
            final_modifiers: vec![],
        };
        let mut rng = rng();
        for _ in 0..100 {
            assert_eq!(palette.pick(&mut rng), Some(Color::RED));
        }
    }

    #[test]
    fn value_modifier_stays_in_range() {
        let modifier = Modifier {
            kind: ModifierKind::Value,
            range: 0.5,
        };
        let mut rng = rng();
        for _ in 0..100 {
            let color = modifier.apply(Color::WHITE, &mut rng);
            let (_, _, v) = color.to_hsv();
            assert!((0.5 - 1e-4..=1.0 + 1e-4).contains(&v), "value {v}");
        }
    }

    #[test]
    fn hue_modifier_preserves_alpha() {
        let modifier = Modifier {
            kind: ModifierKind::Hue,
            range: 0.2,
        };
        let color = modifier.apply(Color::RED.with_alpha(0.25), &mut rng());
        assert_eq!(color.a, 0.25);
    }

    #[test]
    fn registry_lookup() {
        let mut registry = StrategyRegistry::new();
        registry.register("walls", ColourStrategy::Fixed { color: Color::GREEN });
        assert_eq!(registry.names().collect::<Vec<_>>(), vec!["walls"]);
        assert_eq!(
            registry.pick("walls", &mut rng()).unwrap(),
            Some(Color::GREEN)
        );
        assert!(matches!(
            registry.pick("roof", &mut rng()),
            Err(ColorError::UnknownStrategy(_))
        ));
    }
}
