//! Colourbake - bakes per-submesh colours into model vertex data
//!
//! Command line front end over `colourbake-assets`: edits the colour sidecar
//! next to a model, runs the import bake, and scans asset folders.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::{error, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use colourbake_assets::{
    import_model, load_gltf, ImportMetadata, MeshOutcome, ScanQueue, ScanStatus,
};
use colourbake_core::Color;

mod settings;

use settings::ProjectSettings;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Settings file. Defaults to `settings.toml` in the user config directory
    #[clap(short, long, global = true)]
    settings: Option<PathBuf>,

    /// Log debug output
    #[clap(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Import a model and bake its submesh colours into vertex colours
    Bake {
        model: PathBuf,
        /// Write the baked meshes as JSON
        #[clap(long)]
        dump: Option<PathBuf>,
    },
    /// Set the colour of one submesh
    SetColour {
        model: PathBuf,
        #[clap(long)]
        mesh: String,
        #[clap(long)]
        submesh: usize,
        /// Colour as #RRGGBB or #RRGGBBAA
        #[clap(long, conflicts_with = "strategy", required_unless_present = "strategy")]
        color: Option<Color>,
        /// Named strategy from the settings file
        #[clap(long)]
        strategy: Option<String>,
    },
    /// Remove the colour of one submesh
    RemoveColour {
        model: PathBuf,
        #[clap(long)]
        mesh: String,
        #[clap(long)]
        submesh: usize,
    },
    /// Control whether material colours are baked for a model
    MaterialColours {
        model: PathBuf,
        #[arg(value_enum)]
        mode: MaterialColoursMode,
    },
    /// List models under the given folders and their colour metadata
    Scan {
        #[clap(required = true)]
        roots: Vec<PathBuf>,
        /// Time slice per scan step
        #[clap(long, default_value_t = 16)]
        budget_ms: u64,
    },
    /// Print the effective settings
    Settings {
        /// Also write them to the settings file
        #[clap(long)]
        save: bool,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum MaterialColoursMode {
    Enable,
    Disable,
    /// Follow the project default
    Reset,
}

impl MaterialColoursMode {
    fn flag(self) -> Option<bool> {
        match self {
            MaterialColoursMode::Enable => Some(true),
            MaterialColoursMode::Disable => Some(false),
            MaterialColoursMode::Reset => None,
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_max_level(if args.verbose { Level::DEBUG } else { Level::INFO })
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("Failed to set subscriber");

    let settings = ProjectSettings::load(args.settings.as_deref());

    match args.command {
        Command::Bake { model, dump } => bake(&model, dump.as_deref(), &settings),
        Command::SetColour {
            model,
            mesh,
            submesh,
            color,
            strategy,
        } => {
            let color = match (color, strategy) {
                (Some(color), _) => color,
                (None, Some(name)) => settings
                    .strategies
                    .pick(&name, &mut rand::thread_rng())?
                    .with_context(|| format!("Strategy '{}' produced no colour", name))?,
                (None, None) => anyhow::bail!("Either --color or --strategy is required"),
            };
            edit_metadata(&model, |metadata| {
                metadata.set_colour(&mesh, submesh, color);
                info!("Set {}[{}] to {}", mesh, submesh, color);
            })
        }
        Command::RemoveColour {
            model,
            mesh,
            submesh,
        } => edit_metadata(&model, |metadata| {
            if metadata.remove_colour(&mesh, submesh) {
                info!("Removed colour of {}[{}]", mesh, submesh);
            } else {
                warn!("{}[{}] has no colour", mesh, submesh);
            }
        }),
        Command::MaterialColours { model, mode } => edit_metadata(&model, |metadata| {
            metadata.set_import_material_colours(mode.flag());
            info!("Material colour import for {}: {:?}", model.display(), mode);
        }),
        Command::Scan { roots, budget_ms } => {
            scan(roots, Duration::from_millis(budget_ms));
            Ok(())
        }
        Command::Settings { save } => {
            print!("{}", toml::to_string_pretty(&settings)?);
            if save {
                settings.save(args.settings.as_deref())?;
            }
            Ok(())
        }
    }
}

fn bake(path: &Path, dump: Option<&Path>, settings: &ProjectSettings) -> Result<()> {
    let mut model =
        load_gltf(path).with_context(|| format!("Failed to load model {}", path.display()))?;
    let metadata = ImportMetadata::load_for(path)
        .with_context(|| format!("Failed to read colour metadata for {}", path.display()))?;

    let report = import_model(&mut model, metadata.as_ref(), &settings.import);

    if !report.processed {
        info!("{}: nothing to bake", path.display());
    }
    for mesh in &report.meshes {
        match &mesh.outcome {
            MeshOutcome::Untouched => {}
            MeshOutcome::Baked { resplit, paint } => {
                if let Some(stats) = resplit {
                    info!(
                        "{}: split into {} vertices (+{})",
                        mesh.name,
                        stats.new_vertices,
                        stats.added_vertices()
                    );
                }
                if let Some(stats) = paint {
                    info!(
                        "{}: painted {} vertices in {} submeshes",
                        mesh.name, stats.painted_vertices, stats.painted_submeshes
                    );
                }
            }
            MeshOutcome::Failed(e) => error!("{}: {}", mesh.name, e),
        }
    }

    if let Some(dump) = dump {
        let json = serde_json::to_string_pretty(&model)?;
        fs::write(dump, json).with_context(|| format!("Failed to write {}", dump.display()))?;
        info!("Wrote baked meshes to {}", dump.display());
    }

    let failed = report.failures().count();
    if failed > 0 {
        anyhow::bail!("{} of {} meshes failed to bake", failed, report.meshes.len());
    }
    Ok(())
}

/// Load the sidecar for `model`, apply `edit`, and write it back.
fn edit_metadata<F>(model: &Path, edit: F) -> Result<()>
where
    F: FnOnce(&mut ImportMetadata),
{
    if !model.exists() {
        anyhow::bail!("Model {} does not exist", model.display());
    }

    let mut metadata = ImportMetadata::load_for(model)
        .with_context(|| format!("Failed to read colour metadata for {}", model.display()))?
        .unwrap_or_default();
    edit(&mut metadata);
    let path = metadata
        .save_for(model)
        .with_context(|| format!("Failed to write colour metadata for {}", model.display()))?;

    if metadata.is_empty() {
        info!("Removed empty sidecar {}", path.display());
    }
    Ok(())
}

fn scan(roots: Vec<PathBuf>, budget: Duration) {
    let mut queue = ScanQueue::new();
    queue.restart(roots);
    queue.run_to_completion(budget);

    for entry in queue.results() {
        let path = entry.path.display();
        match &entry.status {
            ScanStatus::NoMetadata => println!("{}  -", path),
            ScanStatus::Metadata {
                colour_count,
                import_material_colours,
            } => {
                let material = match import_material_colours {
                    Some(true) => "on",
                    Some(false) => "off",
                    None => "default",
                };
                println!("{}  colours={} material={}", path, colour_count, material);
            }
            ScanStatus::Invalid(reason) => println!("{}  invalid: {}", path, reason),
        }
    }
    info!("Scanned {} models", queue.results().len());
}
