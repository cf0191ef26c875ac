//! Test doubles shared by provisioning and orchestrator tests

#![allow(clippy::expect_used)]

use std::cell::RefCell;
use std::collections::HashMap;
use std::io;
use std::path::Path;

use super::{CommandOutput, CommandRunner, Invocation};
use crate::config::{self, Configuration, vars};

type Handler = Box<dyn Fn(&Invocation) -> io::Result<CommandOutput>>;

/// Runner that answers from a closure and remembers every call
pub(crate) struct ScriptedRunner {
    handler: Handler,
    calls: RefCell<Vec<Invocation>>,
}

impl ScriptedRunner {
    pub(crate) fn new(
        handler: impl Fn(&Invocation) -> io::Result<CommandOutput> + 'static,
    ) -> Self {
        Self {
            handler: Box::new(handler),
            calls: RefCell::new(Vec::new()),
        }
    }

    /// Command lines of every call, program path included
    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls.borrow().iter().map(Invocation::display).collect()
    }

    pub(crate) fn invocations(&self) -> Vec<Invocation> {
        self.calls.borrow().clone()
    }
}

impl CommandRunner for ScriptedRunner {
    fn run(&self, invocation: &Invocation) -> io::Result<CommandOutput> {
        self.calls.borrow_mut().push(invocation.clone());
        (self.handler)(invocation)
    }
}

pub(crate) fn ok(stdout: &str) -> io::Result<CommandOutput> {
    Ok(CommandOutput {
        status: Some(0),
        stdout: stdout.to_string(),
        stderr: String::new(),
    })
}

pub(crate) fn exit(code: i32, stderr: &str) -> io::Result<CommandOutput> {
    Ok(CommandOutput {
        status: Some(code),
        stdout: String::new(),
        stderr: stderr.to_string(),
    })
}

/// Arguments after the program, joined by spaces
pub(crate) fn args_of(invocation: &Invocation) -> String {
    invocation.args.join(" ")
}

/// Configuration rooted in a temporary directory, Wine binary named `wine`
pub(crate) fn test_config(root: &Path) -> Configuration {
    let prefix = root.join("prefix").display().to_string();
    let state = root.join("state").display().to_string();
    let requirements = root.join("requirements.txt").display().to_string();

    let env: HashMap<String, String> = [
        (vars::USER, "trader".to_string()),
        (vars::PASSWORD, "s3cret".to_string()),
        (vars::WINE_BIN, "wine".to_string()),
        (vars::WINE_PREFIX, prefix),
        (vars::STATE_DIR, state),
        (vars::REQUIREMENTS_PATH, requirements),
        (vars::WINE_INSTALL_COMMAND, "install-wine".to_string()),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v))
    .collect();

    config::resolve(&env).expect("test configuration should resolve")
}

/// Create the files `wineboot --init` leaves behind
pub(crate) fn init_prefix(config: &Configuration) {
    std::fs::create_dir_all(config.wine.prefix.join("drive_c/windows/syswow64"))
        .expect("create prefix");
    std::fs::write(config.wine.prefix.join("system.reg"), "WINE REGISTRY Version 2\n")
        .expect("write system.reg");
}
