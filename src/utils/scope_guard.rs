/// Runs a cleanup closure exactly once: on `run`, or on drop if never run.
pub struct ScopeGuard<F: FnOnce()>(Option<F>);

impl<F: FnOnce()> ScopeGuard<F> {
    pub fn new(f: F) -> Self {
        Self(Some(f))
    }

    /// Run the cleanup now. Later calls and the drop are no-ops.
    pub fn run(&mut self) {
        if let Some(f) = self.0.take() {
            f();
        }
    }

    pub fn has_run(&self) -> bool {
        self.0.is_none()
    }
}

impl<F: FnOnce()> Drop for ScopeGuard<F> {
    fn drop(&mut self) {
        self.run();
    }
}
