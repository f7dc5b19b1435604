//! Cooperative cancellation.
//!
//! A `CancellationToken` is a shared flag. The coordinator owns an interrupt
//! token that the user (or a Ctrl+C handler) raises, and a separate stop
//! token that it raises itself to make the workers leave. Workers only ever
//! look at the stop token.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::warn;

use crate::error::{OptimizationError, Result};

#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    flag: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// Creates an interrupt token raised by Ctrl+C.
///
/// Only one handler can be installed per process.
pub fn install_ctrlc_handler() -> Result<CancellationToken> {
    let token = CancellationToken::new();
    ctrlc::set_handler({
        let token = token.clone();
        move || {
            warn!("Interrupt received, stopping all runs");
            token.cancel();
        }
    })
    .map_err(|err| {
        OptimizationError::Configuration(format!("Cannot set interruption handler: {}", err))
    })?;
    Ok(token)
}
