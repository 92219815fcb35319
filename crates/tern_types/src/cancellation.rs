//! Cooperative cancellation for long-running queries.
//!
//! The engine never blocks or waits on a cancellation signal: a query
//! polls its token at DNF-coclause boundaries (see [`crate::QueryCtx`])
//! and returns [`crate::Interrupted::Cancelled`] once the flag is up. A
//! shared atomic flag is all that takes. The host keeps the
//! [`CancellationSource`] and hands out one token per query it may want to
//! interrupt; tokens stay usable after the source is gone.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Owner side of the flag.
#[derive(Debug, Default)]
pub struct CancellationSource {
    flag: Arc<AtomicBool>,
}

impl CancellationSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raises the flag. Idempotent; a raised flag cannot be lowered again.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }

    /// A poll handle for one query.
    pub fn token(&self) -> CancellationToken {
        CancellationToken {
            flag: Arc::clone(&self.flag),
        }
    }
}

/// Poll side of the flag.
#[derive(Clone, Debug)]
pub struct CancellationToken {
    flag: Arc<AtomicBool>,
}

impl CancellationToken {
    /// Returns `true` once cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::CancellationSource;

    #[test]
    fn token_observes_cancel() {
        let source = CancellationSource::new();
        let token = source.token();
        assert!(!token.is_cancelled());
        source.cancel();
        assert!(token.is_cancelled());
        // Cancelling twice is a no-op.
        source.cancel();
        assert!(token.is_cancelled());
    }

    #[test]
    fn tokens_outlive_the_source() {
        let source = CancellationSource::new();
        let token = source.token();
        source.cancel();
        drop(source);
        assert!(token.is_cancelled());
    }
}
