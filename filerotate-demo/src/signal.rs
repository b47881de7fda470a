//! Ctrl+C handling so the demo can stop early and still close its writer.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Trait for checking shutdown status.
pub trait ShutdownCheck: Send + Sync {
    /// Returns true if shutdown has been requested.
    fn should_stop(&self) -> bool;
}

/// Set once SIGINT arrives.
#[derive(Debug, Clone)]
pub struct ShutdownFlag {
    flag: Arc<AtomicBool>,
}

impl Default for ShutdownFlag {
    fn default() -> Self {
        Self::new()
    }
}

impl ShutdownFlag {
    /// Create a flag and register it as the Ctrl+C handler.
    ///
    /// Registration can fail if a handler is already installed; the flag
    /// still works when triggered manually.
    pub fn new() -> Self {
        let flag = Self::manual();
        let handler_flag = Arc::clone(&flag.flag);
        let _ = ctrlc::set_handler(move || {
            handler_flag.store(true, Ordering::SeqCst);
        });
        flag
    }

    /// Create a flag without registering a handler.
    pub fn manual() -> Self {
        Self {
            flag: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Request shutdown.
    pub fn trigger(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }
}

impl ShutdownCheck for ShutdownFlag {
    fn should_stop(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// Never signals shutdown.
#[derive(Debug, Default, Clone, Copy)]
pub struct NeverShutdown;

impl ShutdownCheck for NeverShutdown {
    fn should_stop(&self) -> bool {
        false
    }
}

/// Always signals shutdown.
#[derive(Debug, Default, Clone, Copy)]
pub struct AlwaysShutdown;

impl ShutdownCheck for AlwaysShutdown {
    fn should_stop(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shutdown_flag_trigger() {
        let flag = ShutdownFlag::manual();
        assert!(!flag.should_stop());
        flag.trigger();
        assert!(flag.should_stop());
    }

    #[test]
    fn test_shutdown_flag_clone_shares_state() {
        let flag = ShutdownFlag::manual();
        let clone = flag.clone();
        flag.trigger();
        assert!(clone.should_stop());
    }

    #[test]
    fn test_shutdown_flag_new_does_not_panic() {
        // A second registration fails silently
        let first = ShutdownFlag::new();
        let second = ShutdownFlag::default();
        assert!(!first.should_stop());
        assert!(!second.should_stop());
    }

    #[test]
    fn test_fixed_checkers() {
        let checkers: Vec<Box<dyn ShutdownCheck>> =
            vec![Box::new(NeverShutdown), Box::new(AlwaysShutdown)];
        assert!(!checkers[0].should_stop());
        assert!(checkers[1].should_stop());
    }
}
