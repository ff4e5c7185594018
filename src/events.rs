//! Event sink
//! Fire-and-forget notifications from the rewrite engine; nothing here
//! feeds back into control flow

/// Collaborator interface for engine diagnostics. Injected per pass so
/// hosting code can route these wherever it wants; the default routes
/// through tracing.
pub trait EventSink {
    /// A resolved width exceeded the configured max and was clamped
    fn max_size_exceeded(&self, image_path: &str, width: u32, height: Option<u32>, max_width: u32);

    /// One reference failed mid-rewrite and was left unoptimized
    fn rewrite_error(&self, origin: &str, reference: &str, reason: &str);
}

/// Default sink: structured log lines, nothing else
pub struct TracingSink;

impl EventSink for TracingSink {
    fn max_size_exceeded(&self, image_path: &str, width: u32, height: Option<u32>, max_width: u32) {
        tracing::debug!(
            "Max size exceeded for {}: {}x{} clamped to max_width {}",
            image_path,
            width,
            height.map(|h| h.to_string()).unwrap_or_else(|| "?".to_string()),
            max_width
        );
    }

    fn rewrite_error(&self, origin: &str, reference: &str, reason: &str) {
        tracing::warn!("Rewrite failed ({}) for {}: {}", origin, reference, reason);
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::cell::{Cell, RefCell};

    use super::EventSink;

    /// Records every notification for assertion in tests
    #[derive(Default)]
    pub struct RecordingSink {
        pub max_size_events: Cell<usize>,
        pub errors: RefCell<Vec<String>>,
    }

    impl RecordingSink {
        pub fn new() -> Self {
            Self::default()
        }
    }

    impl EventSink for RecordingSink {
        fn max_size_exceeded(
            &self,
            _image_path: &str,
            _width: u32,
            _height: Option<u32>,
            _max_width: u32,
        ) {
            self.max_size_events.set(self.max_size_events.get() + 1);
        }

        fn rewrite_error(&self, origin: &str, reference: &str, reason: &str) {
            self.errors
                .borrow_mut()
                .push(format!("{}: {} ({})", origin, reference, reason));
        }
    }
}
