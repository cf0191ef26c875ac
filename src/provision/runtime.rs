//! Hosted runtime step: Windows Python installed inside the Wine prefix

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use super::runner::run_checked;
use super::{Invocation, ProvisioningStep, StepContext, StepFailure, StepReport, wine_invocation};
use crate::config::Configuration;

pub const NAME: &str = "hosted-runtime";

/// Silent, machine-wide install with `python` on the PATH
const INSTALLER_ARGS: &[&str] = &["/quiet", "InstallAllUsers=1", "PrependPath=1", "Include_test=0"];

#[derive(Debug, Clone, Copy, Default)]
pub struct HostedRuntimeStep;

impl ProvisioningStep for HostedRuntimeStep {
    fn name(&self) -> &'static str {
        NAME
    }

    fn is_already_satisfied(&self, ctx: &StepContext<'_>) -> bool {
        installed_version(ctx).as_deref() == Some(ctx.config.runtime.python_version.as_str())
    }

    fn execute(&self, ctx: &StepContext<'_>) -> Result<StepReport, StepFailure> {
        let wanted = ctx.config.runtime.python_version.as_str();

        let installer = cached_installer(ctx)?;
        info!(version = wanted, installer = %installer.display(), "Installing Python in Wine");

        let mut args = vec![installer.display().to_string()];
        args.extend(INSTALLER_ARGS.iter().map(|a| a.to_string()));
        run_checked(ctx.runner, &wine_invocation(ctx.config, args))?;

        match installed_version(ctx) {
            Some(found) if found == wanted => Ok(StepReport::new(format!(
                "Python {wanted} installed in {}",
                ctx.config.wine.prefix.display()
            ))
            .with_version(wanted)),
            Some(found) => Err(StepFailure::new(format!(
                "installer finished but Wine reports Python {found}, expected {wanted}"
            ))),
            None => Err(StepFailure::new(
                "installer finished but `wine python --version` still fails",
            )),
        }
    }
}

/// Path of the installer in the download cache, fetching it when absent
fn cached_installer(ctx: &StepContext<'_>) -> Result<PathBuf, StepFailure> {
    let url = ctx.config.python_installer_url();
    let target = installer_path(ctx.config, &url);

    if target.is_file() {
        debug!(path = %target.display(), "Using cached installer");
        return Ok(target);
    }

    let dir = ctx.config.download_dir();
    fs::create_dir_all(&dir).map_err(|e| {
        StepFailure::new(format!("cannot create download cache {}: {e}", dir.display()))
    })?;

    let partial = target.with_extension("part");
    info!(url = %url, "Downloading Python installer");
    let download = Invocation::new("curl")
        .args(["-fsSL", "--retry", "3", "-o"])
        .arg(partial.display().to_string())
        .arg(url.as_str());
    if let Err(failure) = run_checked(ctx.runner, &download) {
        let _ = fs::remove_file(&partial);
        return Err(failure);
    }

    fs::rename(&partial, &target).map_err(|e| {
        StepFailure::new(format!(
            "downloaded installer missing at {}: {e}",
            partial.display()
        ))
    })?;
    Ok(target)
}

/// Cache location named after the last URL segment
fn installer_path(config: &Configuration, url: &str) -> PathBuf {
    let name = url
        .rsplit('/')
        .find(|segment| !segment.is_empty())
        .filter(|segment| !segment.contains(':'))
        .unwrap_or("python-installer.exe");
    config.download_dir().join(Path::new(name))
}

/// Version from `wine python --version`, or `None` when Python is unusable
fn installed_version(ctx: &StepContext<'_>) -> Option<String> {
    let output = ctx
        .runner
        .run(&wine_invocation(ctx.config, ["python", "--version"]))
        .ok()?;
    if !output.success() {
        return None;
    }
    // Python 2 printed its version on stderr
    parse_python_version(&output.stdout).or_else(|| parse_python_version(&output.stderr))
}

/// `Python 3.9.13` -> `3.9.13`
pub fn parse_python_version(output: &str) -> Option<String> {
    output
        .lines()
        .find_map(|line| line.trim().strip_prefix("Python "))
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
