//! Compatibility layer step: Wine at the pinned version with an initialized prefix

use tracing::{debug, info};

use super::runner::run_checked;
use super::{
    Invocation, ProvisioningStep, StepContext, StepFailure, StepReport, wine_invocation,
};
use crate::config::Configuration;

pub const NAME: &str = "compat-layer";

/// Installs Wine if missing and initializes a 64-bit prefix with 32-bit support
///
/// The Wine version is pinned. A different installed version, or a different
/// version recorded by an earlier successful run, is a hard failure: drift
/// has to be accepted explicitly by resetting the step log.
#[derive(Debug, Clone, Copy, Default)]
pub struct CompatLayerStep;

impl ProvisioningStep for CompatLayerStep {
    fn name(&self) -> &'static str {
        NAME
    }

    fn is_already_satisfied(&self, ctx: &StepContext<'_>) -> bool {
        let pinned = &ctx.config.wine.version;
        // A recorded version off the pin must reach `execute` to fail there
        if ctx
            .history
            .last_version(NAME)
            .is_some_and(|recorded| recorded != pinned.as_str())
        {
            return false;
        }
        installed_version(ctx).as_ref() == Some(pinned) && prefix_initialized(ctx.config)
    }

    fn execute(&self, ctx: &StepContext<'_>) -> Result<StepReport, StepFailure> {
        let pinned = ctx.config.wine.version.as_str();

        if let Some(recorded) = ctx.history.last_version(NAME) {
            if recorded != pinned {
                return Err(StepFailure::new(format!(
                    "version drift: step log records Wine {recorded} but {pinned} is pinned; \
                     run `mt5-bootstrap reset` to accept the new version"
                )));
            }
        }

        match installed_version(ctx) {
            Some(found) if found != pinned => {
                return Err(StepFailure::new(format!(
                    "version drift: installed Wine {found} does not match pinned {pinned}"
                )));
            }
            Some(_) => debug!(version = pinned, "Wine already installed"),
            None => install(ctx)?,
        }

        if !prefix_initialized(ctx.config) {
            info!(prefix = %ctx.config.wine.prefix.display(), "Initializing Wine prefix");
            run_checked(ctx.runner, &wine_invocation(ctx.config, ["wineboot", "--init"]))?;

            if !prefix_initialized(ctx.config) {
                return Err(StepFailure::new(format!(
                    "wineboot finished but prefix {} is missing system.reg or syswow64",
                    ctx.config.wine.prefix.display()
                )));
            }
        }

        Ok(StepReport::new(format!(
            "Wine {pinned} ready with prefix {}",
            ctx.config.wine.prefix.display()
        ))
        .with_version(pinned))
    }
}

fn install(ctx: &StepContext<'_>) -> Result<(), StepFailure> {
    let pinned = ctx.config.wine.version.as_str();
    let Some((program, args)) = ctx.config.wine.install_command.split_first() else {
        return Err(StepFailure::new("no Wine install command configured"));
    };

    info!(version = pinned, command = %program, "Installing Wine");
    let invocation = Invocation::new(program)
        .args(args.iter().cloned())
        .env("DEBIAN_FRONTEND", "noninteractive");
    run_checked(ctx.runner, &invocation)?;

    match installed_version(ctx) {
        Some(found) if found == pinned => Ok(()),
        Some(found) => Err(StepFailure::new(format!(
            "version drift: installation produced Wine {found}, pinned {pinned}"
        ))),
        None => Err(StepFailure::new(format!(
            "Wine install command finished but `{} --version` still fails",
            ctx.config.wine.binary.display()
        ))),
    }
}

/// Version reported by `wine --version`, or `None` when Wine is unusable
fn installed_version(ctx: &StepContext<'_>) -> Option<String> {
    let output = ctx
        .runner
        .run(&Invocation::new(&ctx.config.wine.binary).arg("--version"))
        .ok()?;
    if !output.success() {
        return None;
    }
    parse_wine_version(&output.stdout)
}

/// `wine-9.0 (Staging)` -> `9.0`
pub fn parse_wine_version(output: &str) -> Option<String> {
    let line = output.lines().next()?.trim();
    let version = line.strip_prefix("wine-").unwrap_or(line);
    version
        .split_whitespace()
        .next()
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Prefix has a registry and the 32-bit system directory
fn prefix_initialized(config: &Configuration) -> bool {
    let prefix = &config.wine.prefix;
    prefix.join("system.reg").is_file() && prefix.join("drive_c/windows/syswow64").is_dir()
}
