use std::time::Duration;

use storage::{Deadline, PageRequest};

/// Tunables shared by the services.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServiceConfig {
    /// Time budget for one whole operation, reads and transaction included.
    pub operation_timeout: Duration,
    /// Page size used when a listing request does not supply a usable one.
    pub default_page_size: u32,
}

impl ServiceConfig {
    pub const DEFAULT_OPERATION_TIMEOUT: Duration = Duration::from_secs(5);

    /// Starts the clock for a new operation.
    pub fn deadline(&self) -> Deadline {
        Deadline::after(self.operation_timeout)
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            operation_timeout: Self::DEFAULT_OPERATION_TIMEOUT,
            default_page_size: PageRequest::DEFAULT_PAGE_SIZE,
        }
    }
}
