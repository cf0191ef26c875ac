//! Gateway launcher
//!
//! Starts the HTTP gateway (`wine python <script>`) once provisioning has
//! completed and supervises it as the container's foreground process: the
//! bootstrap stays the parent, relays termination signals and exits with the
//! gateway's exit code. There are no restarts; the container runtime owns
//! the restart policy.

pub mod signals;

use std::net::TcpListener;
use std::process::{Command, Stdio};

use nix::errno::Errno;
use nix::sys::wait::{WaitStatus, waitpid};
use nix::unistd::Pid;
use tracing::{info, warn};

use crate::config::{Configuration, vars};
use crate::error::{self, Result};
use crate::orchestrator::Completed;
use crate::provision::to_wine_path;

use signals::SignalForwarder;

pub struct GatewayLauncher<'a> {
    config: &'a Configuration,
}

impl<'a> GatewayLauncher<'a> {
    pub fn new(config: &'a Configuration) -> Self {
        Self { config }
    }

    /// Fail early when the gateway address cannot be bound
    ///
    /// The probe listener is closed before the gateway starts, so another
    /// process can still take the port in between.
    pub fn probe_port(&self) -> Result<()> {
        let address = self.config.gateway_address();
        let listener = TcpListener::bind(address.as_str())
            .map_err(|e| error::gateway::port_bind(address.as_str(), e.to_string()))?;
        drop(listener);
        Ok(())
    }

    /// Environment the gateway reads its settings from
    pub fn gateway_env(&self) -> Vec<(String, String)> {
        let gateway = &self.config.gateway;
        let mut env = self.config.wine_env();
        env.extend([
            (vars::API_HOST.to_string(), gateway.host.clone()),
            (vars::API_PORT.to_string(), gateway.port.to_string()),
            (
                vars::RECONNECT_ATTEMPTS.to_string(),
                gateway.reconnect_attempts.to_string(),
            ),
            (
                vars::RECONNECT_BASE_DELAY.to_string(),
                gateway.reconnect_base_delay.to_string(),
            ),
            (
                vars::LOG_LEVEL.to_string(),
                self.config.logging.level.as_str().to_string(),
            ),
        ]);
        env
    }

    fn command(&self) -> Command {
        let script = &self.config.gateway.script;
        let mut command = Command::new(&self.config.wine.binary);
        command
            .arg("python")
            .arg(to_wine_path(script))
            .envs(self.gateway_env())
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit());
        if let Some(dir) = script.parent().filter(|d| d.is_dir()) {
            command.current_dir(dir);
        }
        command
    }

    /// Start the gateway and block until it exits, returning its exit code
    ///
    /// Requires the [`Completed`] token of a successful provisioning run.
    pub fn launch(&self, completed: &Completed) -> Result<i32> {
        self.probe_port()?;

        let program = self.config.wine.binary.display().to_string();
        let mut child = self
            .command()
            .spawn()
            .map_err(|e| error::gateway::spawn_failed(program.as_str(), e.to_string()))?;

        let pid = match child_pid(child.id()) {
            Ok(pid) => pid,
            Err(e) => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(error::gateway::spawn_failed(program, e));
            }
        };
        info!(
            pid = pid.as_raw(),
            address = %self.config.gateway_address(),
            attempt = completed.attempt(),
            "Gateway started"
        );

        let forwarder = match SignalForwarder::start(pid) {
            Ok(forwarder) => Some(forwarder),
            Err(e) => {
                warn!(error = %e, "Gateway runs without signal forwarding");
                None
            }
        };

        let status = wait_for(pid);
        if let Some(forwarder) = forwarder {
            forwarder.stop();
        }

        let code = exit_code(status?);
        info!(exit_code = code, "Gateway exited");
        Ok(code)
    }
}

/// Convert a std child id into a nix pid
fn child_pid(id: u32) -> std::result::Result<Pid, String> {
    i32::try_from(id)
        .map(Pid::from_raw)
        .map_err(|_| format!("child pid {id} is out of range"))
}

fn wait_for(pid: Pid) -> Result<WaitStatus> {
    loop {
        match waitpid(pid, None) {
            Ok(status @ (WaitStatus::Exited(..) | WaitStatus::Signaled(..))) => return Ok(status),
            Ok(_) | Err(Errno::EINTR) => continue,
            Err(e) => {
                return Err(error::io_error(format!(
                    "cannot wait for gateway {pid}: {e}"
                )));
            }
        }
    }
}

/// Shell convention: the exit code, or 128 + signal number
pub fn exit_code(status: WaitStatus) -> i32 {
    match status {
        WaitStatus::Exited(_, code) => code,
        WaitStatus::Signaled(_, signal, _) => 128 + signal as i32,
        _ => error::EXIT_GENERIC,
    }
}

#[cfg(all(test, unix))]
mod tests {
    use std::fs;
    use std::os::unix::fs::PermissionsExt;
    use std::path::Path;

    use nix::sys::signal::Signal;
    use serial_test::serial;
    use tempfile::TempDir;

    use super::*;
    use crate::provision::testing::test_config;

    /// Configuration whose Wine binary is a shell script with the given body
    fn config_with_fake_wine(root: &Path, body: &str) -> Configuration {
        let mut config = test_config(root);
        let wine = root.join("fake-wine");
        fs::write(&wine, format!("#!/bin/sh\n{body}\n")).unwrap();
        fs::set_permissions(&wine, fs::Permissions::from_mode(0o755)).unwrap();
        config.wine.binary = wine;
        config.gateway.host = "127.0.0.1".to_string();
        config.gateway.port = free_port();
        config
    }

    fn free_port() -> u16 {
        TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap()
            .port()
    }

    #[test]
    fn test_child_pid_conversion() {
        assert_eq!(child_pid(4242).unwrap(), Pid::from_raw(4242));
        assert!(child_pid(u32::MAX).unwrap_err().contains("out of range"));
    }

    #[test]
    fn test_exit_code_mapping() {
        let pid = Pid::from_raw(1);
        assert_eq!(exit_code(WaitStatus::Exited(pid, 0)), 0);
        assert_eq!(exit_code(WaitStatus::Exited(pid, 3)), 3);
        assert_eq!(
            exit_code(WaitStatus::Signaled(pid, Signal::SIGTERM, false)),
            143
        );
        assert_eq!(
            exit_code(WaitStatus::Signaled(pid, Signal::SIGKILL, false)),
            137
        );
    }

    #[test]
    fn test_probe_port_in_use() {
        let temp = TempDir::new().unwrap();
        let mut config = test_config(temp.path());
        let holder = TcpListener::bind("127.0.0.1:0").unwrap();
        config.gateway.host = "127.0.0.1".to_string();
        config.gateway.port = holder.local_addr().unwrap().port();

        let err = GatewayLauncher::new(&config).probe_port().unwrap_err();
        assert_eq!(err.exit_code(), error::EXIT_PORT_BIND);
    }

    #[test]
    fn test_gateway_env() {
        let temp = TempDir::new().unwrap();
        let config = test_config(temp.path());
        let env = GatewayLauncher::new(&config).gateway_env();
        let get = |key: &str| {
            env.iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.as_str())
        };

        assert_eq!(get("MT5_API_PORT"), Some("5001"));
        assert_eq!(get("MT5_API_HOST"), Some("0.0.0.0"));
        assert_eq!(get("MT5_RECONNECT_ATTEMPTS"), Some("3"));
        assert_eq!(get("MT5_RECONNECT_BASE_DELAY"), Some("1"));
        assert_eq!(get("LOG_LEVEL"), Some("INFO"));
        assert_eq!(get("WINEARCH"), Some("win64"));
        assert_eq!(get("PASSWORD"), None);
    }

    #[test]
    #[serial]
    fn test_launch_propagates_exit_code() {
        let temp = TempDir::new().unwrap();
        let config = config_with_fake_wine(temp.path(), "exit 7");

        let code = GatewayLauncher::new(&config)
            .launch(&Completed::for_tests())
            .unwrap();
        assert_eq!(code, 7);
    }

    #[test]
    #[serial]
    fn test_launch_passes_arguments_and_env() {
        let temp = TempDir::new().unwrap();
        let out = temp.path().join("gateway.out");
        let body = format!(
            "printf '%s %s port=%s prefix=%s' \"$1\" \"$2\" \"$MT5_API_PORT\" \"$WINEPREFIX\" > '{}'",
            out.display()
        );
        let config = config_with_fake_wine(temp.path(), &body);

        let code = GatewayLauncher::new(&config)
            .launch(&Completed::for_tests())
            .unwrap();

        assert_eq!(code, 0);
        let seen = fs::read_to_string(&out).unwrap();
        assert!(seen.starts_with("python Z:"));
        assert!(seen.contains(&format!("port={}", config.gateway.port)));
        assert!(seen.contains(&format!("prefix={}", config.wine.prefix.display())));
    }

    #[test]
    #[serial]
    fn test_launch_reports_signal_death() {
        let temp = TempDir::new().unwrap();
        let config = config_with_fake_wine(temp.path(), "kill -KILL $$");

        let code = GatewayLauncher::new(&config)
            .launch(&Completed::for_tests())
            .unwrap();
        assert_eq!(code, 137);
    }

    #[test]
    fn test_spawn_failure() {
        let temp = TempDir::new().unwrap();
        let mut config = test_config(temp.path());
        config.wine.binary = temp.path().join("no-such-wine");
        config.gateway.host = "127.0.0.1".to_string();
        config.gateway.port = free_port();

        let err = GatewayLauncher::new(&config)
            .launch(&Completed::for_tests())
            .unwrap_err();
        assert_eq!(err.exit_code(), error::EXIT_GATEWAY_SPAWN);
    }
}
