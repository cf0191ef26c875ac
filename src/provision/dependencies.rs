//! Dependencies step: the requirements manifest installed into the hosted Python

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::{debug, info};

use super::manifest::{hash_file, normalize_name, requirement_names};
use super::runner::run_checked;
use super::{ProvisioningStep, StepContext, StepFailure, StepReport, to_wine_path, wine_invocation};
use crate::config::Configuration;

pub const NAME: &str = "dependencies";

/// Marker holding the manifest hash of the last successful install
pub const MARKER_FILE: &str = "dependencies.blake3";

#[derive(Debug, Clone, Copy, Default)]
pub struct DependenciesStep;

impl ProvisioningStep for DependenciesStep {
    fn name(&self) -> &'static str {
        NAME
    }

    fn is_already_satisfied(&self, ctx: &StepContext<'_>) -> bool {
        let manifest = &ctx.config.requirements_path;
        let Ok(hash) = hash_file(manifest) else {
            return false;
        };
        if read_marker(ctx.config).as_deref() != Some(hash.as_str()) {
            debug!("Requirements manifest changed since last install");
            return false;
        }

        let Ok(content) = fs::read_to_string(manifest) else {
            return false;
        };
        let wanted = requirement_names(&content);
        if wanted.is_empty() {
            return true;
        }

        let mut args = vec!["python", "-m", "pip", "show"];
        args.extend(wanted.iter().map(String::as_str));
        let Ok(output) = ctx.runner.run(&wine_invocation(ctx.config, args)) else {
            return false;
        };

        let shown = shown_packages(&output.stdout);
        let missing: Vec<&String> = wanted.iter().filter(|n| !shown.contains(*n)).collect();
        if !missing.is_empty() {
            debug!(?missing, "Requirements not installed");
        }
        missing.is_empty()
    }

    fn execute(&self, ctx: &StepContext<'_>) -> Result<StepReport, StepFailure> {
        let manifest = &ctx.config.requirements_path;
        let hash = hash_file(manifest).map_err(|e| {
            StepFailure::new(format!(
                "cannot read requirements manifest {}: {e}",
                manifest.display()
            ))
        })?;

        info!(manifest = %manifest.display(), "Installing requirements");
        let wine_manifest = to_wine_path(manifest);
        run_checked(
            ctx.runner,
            &wine_invocation(
                ctx.config,
                [
                    "python",
                    "-m",
                    "pip",
                    "install",
                    "--no-cache-dir",
                    "-r",
                    wine_manifest.as_str(),
                ],
            ),
        )?;

        write_marker(ctx.config, &hash).map_err(|e| {
            StepFailure::new(format!(
                "requirements installed but marker {} could not be written: {e}",
                marker_path(ctx.config).display()
            ))
        })?;

        Ok(StepReport::new(format!(
            "requirements from {} installed",
            manifest.display()
        )))
    }
}

pub fn marker_path(config: &Configuration) -> PathBuf {
    config.state_dir.join(MARKER_FILE)
}

fn read_marker(config: &Configuration) -> Option<String> {
    fs::read_to_string(marker_path(config))
        .ok()
        .map(|s| s.trim().to_string())
}

/// Replace the marker atomically so a crash never leaves a partial hash
fn write_marker(config: &Configuration, hash: &str) -> std::io::Result<()> {
    let dir: &Path = &config.state_dir;
    fs::create_dir_all(dir)?;

    let mut temp = NamedTempFile::new_in(dir)?;
    writeln!(temp, "{hash}")?;
    temp.as_file().sync_all()?;
    temp.persist(marker_path(config)).map_err(|e| e.error)?;
    Ok(())
}

/// Normalized names from `pip show` output (`Name: Flask` blocks)
fn shown_packages(stdout: &str) -> Vec<String> {
    stdout
        .lines()
        .filter_map(|line| line.strip_prefix("Name:"))
        .map(normalize_name)
        .collect()
}
