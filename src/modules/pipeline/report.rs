// Copyright © 2025 rustmailer.com
// Licensed under RustMailer License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

use serde::{Deserialize, Serialize};

/// Per-cycle accounting, logged at the end of every ingestion run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunReport {
    /// Message ids returned by the source listing.
    pub listed: usize,
    /// Already present locally; not fetched again.
    pub skipped: usize,
    /// Fetched, normalized and persisted.
    pub success: usize,
    /// Failed somewhere between fetch and persist.
    pub failed: usize,
    /// Records removed by the retention pass.
    pub reaped: usize,
    /// Attachments copied to object storage.
    pub archived: usize,
}

impl RunReport {
    /// Messages an ingestion was actually attempted for; skipped
    /// duplicates are excluded.
    pub fn processed(&self) -> usize {
        self.success + self.failed
    }
}
