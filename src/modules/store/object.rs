// Copyright © 2025 rustmailer.com
// Licensed under RustMailer License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

use std::future::Future;

use crate::modules::error::MailbotResult;

/// Durable blob storage addressed by a `{category}/{date}/{file_name}` path.
/// Uploads are idempotent: re-uploading a path overwrites instead of erroring.
pub trait ObjectStore: Send + Sync {
    fn upload(
        &self,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> impl Future<Output = MailbotResult<String>> + Send;
}
