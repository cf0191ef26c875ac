//! Gateway launch errors

use super::BootError;

/// Creates a port bind error
pub fn port_bind(address: impl Into<String>, reason: impl Into<String>) -> BootError {
    BootError::PortBind {
        address: address.into(),
        reason: reason.into(),
    }
}

/// Creates a gateway spawn failed error
pub fn spawn_failed(program: impl Into<String>, reason: impl Into<String>) -> BootError {
    BootError::GatewaySpawnFailed {
        program: program.into(),
        reason: reason.into(),
    }
}
