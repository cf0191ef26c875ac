//! Common test utilities for mt5-bootstrap integration tests
//!
//! A [`TestEnv`] is a temporary container root with shell-script fakes of
//! `wine` and the Wine install command. The fakes keep their state in marker
//! files under the root, so tests can arrange "already installed" or failing
//! situations by touching files.

#![allow(dead_code)]

use std::net::TcpListener;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use tempfile::TempDir;

const FAKE_WINE: &str = r#"#!/bin/sh
root="$FAKE_ROOT"
printf '%s\n' "wine $*" >> "$root/calls.log"
case "$1" in
  --version)
    [ -f "$root/wine.installed" ] || { echo "wine: command not found" >&2; exit 127; }
    echo "wine-$(cat "$root/wine.installed")"
    ;;
  wineboot)
    mkdir -p "$WINEPREFIX/drive_c/windows/syswow64"
    echo "WINE REGISTRY Version 2" > "$WINEPREFIX/system.reg"
    ;;
  *.exe)
    echo "3.9.13" > "$root/python.installed"
    ;;
  python)
    shift
    case "$1" in
      --version)
        [ -f "$root/python.installed" ] || { echo "python.exe not found" >&2; exit 1; }
        echo "Python $(cat "$root/python.installed")"
        ;;
      -m)
        shift 2
        cmd="$1"
        shift
        case "$cmd" in
          install)
            if [ -f "$root/pip.fail" ]; then
              echo "ERROR: No matching distribution found for MetaTrader5" >&2
              exit 1
            fi
            touch "$root/pip.installed"
            ;;
          show)
            [ -f "$root/pip.installed" ] || { echo "WARNING: Package(s) not found" >&2; exit 1; }
            for name in "$@"; do printf 'Name: %s\n---\n' "$name"; done
            ;;
        esac
        ;;
      *)
        printf '%s port=%s level=%s\n' "$1" "$MT5_API_PORT" "$LOG_LEVEL" >> "$root/gateway.log"
        if [ -n "$FAKE_GATEWAY_TRAP" ]; then
          trap 'exit 42' TERM
          touch "$root/gateway.ready"
          while :; do sleep 0.05; done
        fi
        exit "${FAKE_GATEWAY_EXIT:-0}"
        ;;
    esac
    ;;
  *)
    echo "unexpected wine call: $*" >&2
    exit 2
    ;;
esac
"#;

const FAKE_INSTALL_WINE: &str = r#"#!/bin/sh
printf '%s\n' "install-wine $*" >> "$FAKE_ROOT/calls.log"
echo "${FAKE_WINE_INSTALLS:-9.0}" > "$FAKE_ROOT/wine.installed"
"#;

/// A temporary container root for one test
pub struct TestEnv {
    pub temp: TempDir,
    pub root: PathBuf,
    pub port: u16,
}

impl TestEnv {
    pub fn new() -> Self {
        let temp = TempDir::new().expect("Failed to create temp directory");
        let root = temp.path().to_path_buf();
        let env = Self {
            temp,
            root,
            port: free_port(),
        };

        env.write_script("bin/wine", FAKE_WINE);
        env.write_script("bin/install-wine", FAKE_INSTALL_WINE);
        env.write_file("app/requirements.txt", "Flask==2.3.2\nMetaTrader5\n");
        env.write_file("app/app.py", "print('gateway')\n");
        // Pre-seeded download cache, no network in tests
        env.write_file("state/downloads/python-3.9.13-amd64.exe", "MZ");
        env
    }

    pub fn path(&self, relative: &str) -> PathBuf {
        self.root.join(relative)
    }

    pub fn state_dir(&self) -> PathBuf {
        self.path("state")
    }

    pub fn write_file(&self, relative: &str, content: &str) {
        let path = self.path(relative);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("Failed to create parent directory");
        }
        std::fs::write(&path, content).expect("Failed to write file");
    }

    fn write_script(&self, relative: &str, content: &str) {
        self.write_file(relative, content);
        std::fs::set_permissions(self.path(relative), std::fs::Permissions::from_mode(0o755))
            .expect("Failed to make script executable");
    }

    pub fn touch(&self, relative: &str) {
        self.write_file(relative, "");
    }

    pub fn read(&self, relative: &str) -> String {
        std::fs::read_to_string(self.path(relative)).unwrap_or_default()
    }

    pub fn exists(&self, relative: &str) -> bool {
        self.path(relative).exists()
    }

    /// Lines the fakes logged, one per call
    pub fn calls(&self) -> Vec<String> {
        self.read("calls.log").lines().map(str::to_string).collect()
    }

    pub fn clear_calls(&self) {
        let _ = std::fs::remove_file(self.path("calls.log"));
    }

    /// Complete, valid bootstrap environment pointing at the fakes
    pub fn vars(&self) -> Vec<(String, String)> {
        let path = |p: &str| self.path(p).display().to_string();
        vec![
            ("PATH".into(), std::env::var("PATH").unwrap_or_default()),
            ("FAKE_ROOT".into(), self.root.display().to_string()),
            ("CUSTOM_USER".into(), "trader".into()),
            ("PASSWORD".into(), "s3cret".into()),
            ("WINE_BIN".into(), path("bin/wine")),
            ("WINE_INSTALL_COMMAND".into(), path("bin/install-wine")),
            ("WINEPREFIX".into(), path("prefix")),
            ("MT5_BOOT_STATE_DIR".into(), path("state")),
            ("REQUIREMENTS_PATH".into(), path("app/requirements.txt")),
            ("GATEWAY_SCRIPT".into(), path("app/app.py")),
            ("MT5_API_HOST".into(), "127.0.0.1".into()),
            ("MT5_API_PORT".into(), self.port.to_string()),
        ]
    }

    /// Bootstrap command with only [`TestEnv::vars`] in its environment
    pub fn bootstrap(&self) -> Command {
        let mut cmd = bin();
        cmd.env_clear().envs(self.vars());
        cmd
    }

    /// Command for subcommands that only need the state directory
    pub fn cli(&self, args: &[&str]) -> Command {
        let mut cmd = bin();
        cmd.env_remove("MT5_BOOT_STATE_DIR")
            .args(args)
            .arg("--state-dir")
            .arg(self.state_dir());
        cmd
    }

    /// Parsed `status --all --json`
    pub fn status_json(&self) -> serde_json::Value {
        let output = self
            .cli(&["status", "--all", "--json"])
            .output()
            .expect("Failed to run status");
        serde_json::from_slice(&output.stdout).expect("status --json should print JSON")
    }

    /// `(stepName, outcome, message)` of one attempt from `status --json`
    pub fn attempt(&self, attempt: u64) -> Vec<(String, String, String)> {
        self.status_json()["records"]
            .as_array()
            .expect("records array")
            .iter()
            .filter(|r| r["attempt"].as_u64() == Some(attempt))
            .map(|r| {
                (
                    r["stepName"].as_str().unwrap_or_default().to_string(),
                    r["outcome"].as_str().unwrap_or_default().to_string(),
                    r["message"].as_str().unwrap_or_default().to_string(),
                )
            })
            .collect()
    }
}

#[allow(deprecated)]
pub fn bin() -> Command {
    Command::cargo_bin("mt5-bootstrap").expect("binary should be built")
}

pub fn bin_path() -> &'static Path {
    Path::new(env!("CARGO_BIN_EXE_mt5-bootstrap"))
}

pub fn free_port() -> u16 {
    TcpListener::bind("127.0.0.1:0")
        .expect("Failed to bind ephemeral port")
        .local_addr()
        .expect("local address")
        .port()
}
