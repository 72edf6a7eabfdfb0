// Copyright © 2025 rustmailer.com
// Licensed under RustMailer License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

use crate::modules::database::{
    filter_by_secondary_key_impl, insert_impl, list_all_impl, manager::DB_MANAGER, update_impl,
};
use crate::modules::error::{code::ErrorCode, MailbotResult};
use crate::modules::store::message::MessageRecord;
use crate::{raise_error, utc_now};
use native_db::*;
use native_model::{native_model, Model};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[native_model(id = 2, version = 1)]
#[native_db]
pub struct AttachmentRecord {
    /// Surrogate key derived from the parent's external id and `source_ref`
    /// (see `attachment_uid`).
    #[primary_key]
    pub id: u64,
    /// Owning `MessageRecord` id; cascade-deleted with the parent.
    #[secondary_key]
    pub message_id: u64,
    pub file_name: String,
    /// Provider-side attachment reference used to re-fetch the bytes later.
    pub source_ref: String,
    pub size: u64,
    pub content_type: String,
    /// Durable object-store path; `None` until the archiver uploads the bytes.
    /// Set at most once and never changed afterward.
    pub storage_path: Option<String>,
    pub created_at: i64,
}

impl AttachmentRecord {
    pub async fn save(&self) -> MailbotResult<()> {
        insert_impl(DB_MANAGER.meta_db(), self.clone()).await
    }

    pub async fn list_for_message(message_id: u64) -> MailbotResult<Vec<AttachmentRecord>> {
        filter_by_secondary_key_impl::<AttachmentRecord>(
            DB_MANAGER.meta_db(),
            AttachmentRecordKey::message_id,
            message_id,
        )
        .await
    }

    /// Archival backfill candidates: unarchived, re-fetchable, within the
    /// size ceiling, and owned by a message received at or after
    /// `min_received_at`. Capped at `limit`.
    pub async fn list_unarchived(
        min_received_at: i64,
        max_size: u64,
        limit: usize,
    ) -> MailbotResult<Vec<(AttachmentRecord, MessageRecord)>> {
        let all = list_all_impl::<AttachmentRecord>(DB_MANAGER.meta_db()).await?;
        let mut candidates = Vec::new();
        for attachment in all {
            if attachment.storage_path.is_some()
                || attachment.source_ref.is_empty()
                || attachment.size > max_size
            {
                continue;
            }
            let Some(parent) = MessageRecord::get(attachment.message_id).await? else {
                continue;
            };
            if parent.received_at < min_received_at {
                continue;
            }
            candidates.push((attachment, parent));
            if candidates.len() >= limit {
                break;
            }
        }
        Ok(candidates)
    }

    /// Records a successful upload. The transition is one-way: an attachment
    /// that already has a storage path is rejected.
    pub async fn mark_archived(id: u64, path: String) -> MailbotResult<()> {
        update_impl(
            DB_MANAGER.meta_db(),
            move |rw| {
                let current = rw
                    .get()
                    .primary::<AttachmentRecord>(id)
                    .map_err(|e| raise_error!(format!("{:#?}", e), ErrorCode::InternalError))?
                    .ok_or_else(|| {
                        raise_error!(
                            format!("The attachment record with id={id} that you want to archive was not found."),
                            ErrorCode::ResourceNotFound
                        )
                    })?;
                if current.storage_path.is_some() {
                    return Err(raise_error!(
                        format!("The attachment record with id={id} is already archived."),
                        ErrorCode::AlreadyExists
                    ));
                }
                Ok(current)
            },
            move |current| {
                let mut updated = current.clone();
                updated.storage_path = Some(path);
                Ok(updated)
            },
        )
        .await?;
        Ok(())
    }
}

/// Attachment metadata lifted from the message payload during normalization.
/// Bytes are never fetched on the ingestion path.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttachmentMeta {
    pub source_ref: String,
    pub file_name: String,
    pub size: u64,
    pub content_type: String,
}

impl AttachmentMeta {
    pub fn into_record(self, id: u64, message_id: u64) -> AttachmentRecord {
        AttachmentRecord {
            id,
            message_id,
            file_name: self.file_name,
            source_ref: self.source_ref,
            size: self.size,
            content_type: self.content_type,
            storage_path: None,
            created_at: utc_now!(),
        }
    }
}
