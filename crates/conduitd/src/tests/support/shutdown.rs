//! Shutdown signal double triggered directly by tests.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use crate::process::{ShutdownError, ShutdownSignal};

/// Captures the stop flag so a test can raise it in place of a signal.
#[derive(Clone, Default)]
pub struct TestShutdownSignal {
    flag: Arc<Mutex<Option<Arc<AtomicBool>>>>,
}

impl TestShutdownSignal {
    /// Raises the stop flag, returning whether the server had installed one.
    pub fn trigger(&self) -> bool {
        let flag = self.flag.lock().expect("shutdown mutex poisoned");
        flag.as_ref()
            .map(|stop| stop.store(true, Ordering::SeqCst))
            .is_some()
    }
}

impl ShutdownSignal for TestShutdownSignal {
    fn install(&self, stop: &Arc<AtomicBool>) -> Result<(), ShutdownError> {
        *self.flag.lock().expect("shutdown mutex poisoned") = Some(Arc::clone(stop));
        Ok(())
    }
}
