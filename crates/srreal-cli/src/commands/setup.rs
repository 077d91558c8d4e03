use crate::cli::SetupArgs;
use crate::config::PartialSetupConfig;
use crate::error::{CliError, Result};
use srreal::core::snapshot::SnapshotError;
use srreal::engine::registries::ComponentRegistries;
use srreal::engine::setup::{CalculationSetup, SetupSnapshot};
use tracing::info;

pub fn run(args: SetupArgs) -> Result<()> {
    let partial_config = PartialSetupConfig::from_file(&args.config)?;
    info!("Merging configuration from file and CLI arguments...");
    let config = partial_config.merge_with_cli(&args)?;

    let registries = ComponentRegistries::with_builtins()?;
    let setup = CalculationSetup::from_config(&registries, &config)?;
    let snapshot = setup.snapshot().map_err(SnapshotError::from)?;
    let rendered = render(&snapshot)?;

    match &args.output {
        Some(path) => {
            info!("Writing setup snapshot to {:?}", path);
            std::fs::write(path, rendered)?;
        }
        None => print!("{}", rendered),
    }
    Ok(())
}

pub fn render(snapshot: &SetupSnapshot) -> Result<String> {
    toml::to_string(snapshot)
        .map_err(|e| CliError::Other(anyhow::anyhow!("Failed to serialize setup snapshot: {}", e)))
}
