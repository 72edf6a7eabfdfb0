// Copyright © 2025 rustmailer.com
// Licensed under RustMailer License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

use chrono::DateTime;
use tracing::{error, info};

use crate::days_to_millis;
use crate::modules::error::MailbotResult;
use crate::modules::gateway::MailSource;
use crate::modules::settings::cli::SETTINGS;
use crate::modules::store::attachment::AttachmentRecord;
use crate::modules::store::message::MessageRecord;
use crate::modules::store::object::ObjectStore;
use crate::utc_now;

/// Object key: `{category}/{YYYY-MM-DD of the parent's receipt}/{file name}`.
pub fn storage_path(message: &MessageRecord, file_name: &str) -> String {
    let day = DateTime::from_timestamp_millis(message.received_at)
        .unwrap_or_default()
        .format("%Y-%m-%d");
    format!("{}/{}/{}", message.category.as_label(), day, file_name)
}

/// Copies pending attachments to object storage. One bad attachment is
/// logged and left for the next cycle; the rest of the batch proceeds.
pub async fn archive_pending<S: MailSource, O: ObjectStore>(
    source: &S,
    store: &O,
) -> MailbotResult<usize> {
    let min_received_at = utc_now!() - days_to_millis!(SETTINGS.mailbot_retention_days);
    let pending = AttachmentRecord::list_unarchived(
        min_received_at,
        SETTINGS.mailbot_max_attachment_size,
        SETTINGS.mailbot_archive_batch_limit as usize,
    )
    .await?;
    let mut archived = 0usize;
    for (attachment, message) in pending {
        match archive_one(source, store, &attachment, &message).await {
            Ok(path) => {
                info!(
                    "archived '{}' ({} bytes) to {}",
                    attachment.file_name, attachment.size, path
                );
                archived += 1;
            }
            Err(e) => {
                error!(
                    "failed to archive '{}' of message {}: {:#?}",
                    attachment.file_name, message.external_id, e
                );
            }
        }
    }
    Ok(archived)
}

async fn archive_one<S: MailSource, O: ObjectStore>(
    source: &S,
    store: &O,
    attachment: &AttachmentRecord,
    message: &MessageRecord,
) -> MailbotResult<String> {
    let bytes = source
        .fetch_attachment(&message.external_id, &attachment.source_ref)
        .await?;
    let path = storage_path(message, &attachment.file_name);
    store
        .upload(&path, bytes, &attachment.content_type)
        .await?;
    AttachmentRecord::mark_archived(attachment.id, path.clone()).await?;
    Ok(path)
}
