//! Command line front end: run model passes and copy types between models.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

use typegraft::copier::copy_types;
use typegraft::logging;
use typegraft::passes::{registered_passes, run_pass};
use typegraft::{Abi, Binary, TypeDefinitionKey, TypeDefinitionKind, TypegraftConfig};

#[derive(Parser, Debug)]
#[command(name = "typegraft", version, about = "Type model passes and cross-model type copying")]
struct Cli {
    /// JSON configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Emit logs as JSON lines
    #[arg(long, global = true, default_value_t = false)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List registered model passes
    ListPasses,

    /// Run a model pass on a model file
    RunPass {
        /// Pass name, see `list-passes`
        name: String,

        /// Input model (JSON)
        #[arg(long)]
        model: PathBuf,

        /// Where to write the result (defaults to overwriting the input)
        #[arg(long)]
        output: Option<PathBuf>,

        /// Overrides the default ABI deduced from the model
        #[arg(long)]
        abi: Option<Abi>,
    },

    /// Copy a type definition, with everything it references, into another model
    CopyType {
        /// Source model (JSON)
        #[arg(long)]
        from: PathBuf,

        /// Destination model (JSON)
        #[arg(long)]
        into: PathBuf,

        /// ID of the definition in the source model
        #[arg(long)]
        id: u64,

        /// Kind of the definition, e.g. `struct` or `cabi-function`
        #[arg(long)]
        kind: TypeDefinitionKind,

        /// Where to write the destination (defaults to overwriting it)
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

fn load_model(path: &Path) -> Result<Binary> {
    Binary::load(path).with_context(|| format!("loading model {}", path.display()))
}

fn save_model(model: &Binary, path: &Path) -> Result<()> {
    model
        .save(path)
        .with_context(|| format!("writing model {}", path.display()))
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => TypegraftConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => TypegraftConfig::default(),
    };
    config.logging.json |= cli.log_json;
    logging::init_from_config(&config.logging);

    match cli.command {
        Command::ListPasses => {
            for pass in registered_passes() {
                println!("{:<36} {}", pass.name, pass.description);
            }
        }
        Command::RunPass {
            name,
            model,
            output,
            abi,
        } => {
            if abi.is_some() {
                config.passes.target_abi = abi;
            }
            let mut binary = load_model(&model)?;
            let summary = run_pass(&name, &mut binary, &config.passes)?;
            println!(
                "{}: converted {}, skipped {}{}",
                name,
                summary.converted,
                summary.skipped,
                if summary.input_valid { "" } else { " (input model invalid, unchanged)" }
            );
            save_model(&binary, output.as_deref().unwrap_or(&model))?;
        }
        Command::CopyType {
            from,
            into,
            id,
            kind,
            output,
        } => {
            let source = load_model(&from)?;
            let mut destination = load_model(&into)?;
            let root = TypeDefinitionKey::new(id, kind);

            let before = destination.type_definitions.len();
            let copied = copy_types(&source, &mut destination, &[root])
                .with_context(|| format!("copying {} from {}", root, from.display()))?;
            let copied_count = destination.type_definitions.len() - before;

            println!("{} -> {} ({} definitions copied)", root, copied[0], copied_count);
            save_model(&destination, output.as_deref().unwrap_or(&into))?;
        }
    }

    Ok(())
}
