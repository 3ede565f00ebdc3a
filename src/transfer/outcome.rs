use serde::Serialize;

// -----------------------------------------------------------------------------
// ----- BulkOutcome -----------------------------------------------------------

/// Result accumulator for best-effort bulk operations.
///
/// One bad key never aborts a batch: each per-key failure or skip is counted
/// and described here instead of raised. Shared between the transfer engine
/// and snapshot import so both report skips the same way.
#[derive(Debug, Default, Clone, Serialize)]
pub struct BulkOutcome {
    pub success_count: usize,
    pub error_count: usize,
    pub skipped_count: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub details: Vec<String>,
}

impl BulkOutcome {
    pub fn record_success(&mut self, detail: String) {
        self.success_count += 1;
        self.details.push(detail);
    }

    pub fn record_error(&mut self, message: String) {
        self.error_count += 1;
        self.errors.push(message);
    }

    pub fn record_skip(&mut self, detail: String) {
        self.skipped_count += 1;
        self.details.push(detail);
    }

    /// True when every key went through; callers downgrade to a
    /// partial-success classification otherwise.
    pub fn is_clean(&self) -> bool {
        self.error_count == 0
    }
}

// -----------------------------------------------------------------------------
// -----------------------------------------------------------------------------
