//! Forwarding termination signals to the gateway child
//!
//! The forwarded signals are blocked on the supervising thread and received
//! synchronously by a dedicated thread with `sigwait`, which relays each one
//! to the child with `kill`. Blocking happens after the child is spawned so
//! the gateway starts with a clean signal mask.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::thread::{self, JoinHandle};

use nix::sys::pthread::{Pthread, pthread_kill, pthread_self};
use nix::sys::signal::{SigSet, SigmaskHow, Signal, kill, pthread_sigmask};
use nix::unistd::Pid;
use tracing::{debug, info, warn};

use crate::error::{self, Result};

/// Signals relayed to the gateway
pub const FORWARDED: [Signal; 4] = [
    Signal::SIGTERM,
    Signal::SIGINT,
    Signal::SIGHUP,
    Signal::SIGQUIT,
];

pub fn forwarded_set() -> SigSet {
    let mut set = SigSet::empty();
    for signal in FORWARDED {
        set.add(signal);
    }
    set
}

/// Running forwarder; [`SignalForwarder::stop`] restores the signal mask
pub struct SignalForwarder {
    handle: JoinHandle<()>,
    thread: Pthread,
    done: Arc<AtomicBool>,
    previous: SigSet,
}

impl SignalForwarder {
    /// Block the forwarded signals on this thread and relay them to `child`
    pub fn start(child: Pid) -> Result<Self> {
        let set = forwarded_set();
        let mut previous = SigSet::empty();
        pthread_sigmask(SigmaskHow::SIG_BLOCK, Some(&set), Some(&mut previous))
            .map_err(|e| error::io_error(format!("cannot block signals: {e}")))?;

        let done = Arc::new(AtomicBool::new(false));
        let stopping = Arc::clone(&done);
        let (tx, rx) = mpsc::channel();

        let spawned = thread::Builder::new()
            .name("signal-forwarder".to_string())
            .spawn(move || {
                let _ = tx.send(pthread_self());
                relay(set, child, &stopping);
            });

        let handle = match spawned {
            Ok(handle) => handle,
            Err(e) => {
                restore(&previous);
                return Err(error::io_error(format!(
                    "cannot start signal forwarder: {e}"
                )));
            }
        };

        let thread = match rx.recv() {
            Ok(thread) => thread,
            Err(e) => {
                restore(&previous);
                return Err(error::io_error(format!(
                    "signal forwarder exited early: {e}"
                )));
            }
        };

        debug!(pid = child.as_raw(), "Forwarding termination signals");
        Ok(Self {
            handle,
            thread,
            done,
            previous,
        })
    }

    /// Wake the forwarding thread, join it and unblock the signals
    pub fn stop(self) {
        self.done.store(true, Ordering::SeqCst);
        if let Err(e) = pthread_kill(self.thread, Signal::SIGHUP) {
            warn!(error = %e, "Cannot wake signal forwarder");
        } else if self.handle.join().is_err() {
            warn!("Signal forwarder panicked");
        }
        restore(&self.previous);
    }
}

fn relay(set: SigSet, child: Pid, done: &AtomicBool) {
    loop {
        let signal = match set.wait() {
            Ok(signal) => signal,
            Err(e) => {
                warn!(error = %e, "sigwait failed, no longer forwarding signals");
                return;
            }
        };
        if done.load(Ordering::SeqCst) {
            return;
        }

        info!(signal = %signal, pid = child.as_raw(), "Forwarding signal to gateway");
        if let Err(e) = kill(child, signal) {
            warn!(signal = %signal, error = %e, "Cannot forward signal");
        }
    }
}

fn restore(previous: &SigSet) {
    if let Err(e) = pthread_sigmask(SigmaskHow::SIG_SETMASK, Some(previous), None) {
        warn!(error = %e, "Cannot restore signal mask");
    }
}
