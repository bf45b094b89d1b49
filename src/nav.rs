//! Navigation seam — route changes requested by the tour controller.

use std::sync::Mutex;

/// Router collaborator. Navigation is fire-and-forget: the engine never
/// waits for or verifies completion, and no error path exists.
pub trait Navigator: Send + Sync {
    fn navigate_to(&self, route: &str);
}

/// Navigator that drops every request. Useful when no UI is attached.
#[derive(Debug, Default)]
pub struct NoopNavigator;

impl Navigator for NoopNavigator {
    fn navigate_to(&self, _route: &str) {}
}

/// Test double that records requested routes in order.
#[derive(Debug, Default)]
pub struct RecordingNavigator {
    routes: Mutex<Vec<String>>,
}

impl RecordingNavigator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Routes requested so far, in call order.
    pub fn routes(&self) -> Vec<String> {
        self.routes.lock().unwrap().clone()
    }
}

impl Navigator for RecordingNavigator {
    fn navigate_to(&self, route: &str) {
        self.routes.lock().unwrap().push(route.to_string());
    }
}
