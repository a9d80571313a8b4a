//! Shutdown Coordinator
//!
//! A one-way flag shared between the signal listener and the relay loop.
//! Signals are received on a dedicated thread running a small tokio runtime;
//! the relay thread only ever reads the flag.

use crate::error::{RelayError, RelayResult};
use log::{info, warn};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

/// Cooperative cancellation token, set at most once and never reset
#[derive(Debug, Clone, Default)]
pub struct ShutdownFlag(Arc<AtomicBool>);

impl ShutdownFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request shutdown. Returns true on the first call only.
    pub fn trigger(&self) -> bool {
        !self.0.swap(true, Ordering::SeqCst)
    }

    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Signals the bridge reacts to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalEvent {
    Interrupt,
    Terminate,
    BrokenPipe,
}

/// Apply the bridge's response to a delivered signal
pub fn handle_signal(event: SignalEvent, flag: &ShutdownFlag) {
    match event {
        SignalEvent::Interrupt | SignalEvent::Terminate => {
            if flag.trigger() {
                info!("{:?} received, shutting down", event);
            }
        }
        SignalEvent::BrokenPipe => warn!("SIGPIPE received"),
    }
}

/// Start the signal listener thread.
///
/// Handlers are registered before this returns, so a signal delivered right
/// after the call is not lost.
#[cfg(unix)]
pub fn install_signal_handlers(flag: ShutdownFlag) -> RelayResult<()> {
    use tokio::signal::unix::{SignalKind, signal};

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| RelayError::Signal(format!("cannot build runtime: {}", e)))?;

    let (mut interrupt, mut terminate, mut pipe) = {
        let _guard = runtime.enter();
        let listen = |kind: SignalKind| {
            signal(kind).map_err(|e| RelayError::Signal(format!("cannot register handler: {}", e)))
        };
        (
            listen(SignalKind::interrupt())?,
            listen(SignalKind::terminate())?,
            listen(SignalKind::pipe())?,
        )
    };

    thread::Builder::new()
        .name("bridge-signals".to_string())
        .spawn(move || {
            runtime.block_on(async move {
                loop {
                    let event = tokio::select! {
                        Some(()) = interrupt.recv() => SignalEvent::Interrupt,
                        Some(()) = terminate.recv() => SignalEvent::Terminate,
                        Some(()) = pipe.recv() => SignalEvent::BrokenPipe,
                        else => break,
                    };
                    handle_signal(event, &flag);
                }
            })
        })
        .map_err(|e| RelayError::Signal(format!("cannot spawn listener: {}", e)))?;
    Ok(())
}

/// Start the signal listener thread (Ctrl-C only on this platform)
#[cfg(not(unix))]
pub fn install_signal_handlers(flag: ShutdownFlag) -> RelayResult<()> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| RelayError::Signal(format!("cannot build runtime: {}", e)))?;

    thread::Builder::new()
        .name("bridge-signals".to_string())
        .spawn(move || {
            runtime.block_on(async move {
                while tokio::signal::ctrl_c().await.is_ok() {
                    handle_signal(SignalEvent::Interrupt, &flag);
                }
            })
        })
        .map_err(|e| RelayError::Signal(format!("cannot spawn listener: {}", e)))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flag_is_shared_and_one_way() {
        let flag = ShutdownFlag::new();
        let observer = flag.clone();
        assert!(!observer.is_set());

        assert!(flag.trigger());
        assert!(observer.is_set());

        // Idempotent
        assert!(!flag.trigger());
        assert!(observer.is_set());
    }

    #[test]
    fn test_termination_signals_set_the_flag() {
        for event in [SignalEvent::Interrupt, SignalEvent::Terminate] {
            let flag = ShutdownFlag::new();
            handle_signal(event, &flag);
            assert!(flag.is_set());
        }
    }

    #[test]
    fn test_broken_pipe_is_only_logged() {
        let _ = env_logger::try_init();
        let flag = ShutdownFlag::new();
        handle_signal(SignalEvent::BrokenPipe, &flag);
        assert!(!flag.is_set());
    }

    #[test]
    fn test_flag_visible_across_threads() {
        let flag = ShutdownFlag::new();
        let remote = flag.clone();
        thread::spawn(move || handle_signal(SignalEvent::Terminate, &remote))
            .join()
            .unwrap();
        assert!(flag.is_set());
    }
}
