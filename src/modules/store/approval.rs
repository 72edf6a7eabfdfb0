// Copyright © 2025 rustmailer.com
// Licensed under RustMailer License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

use crate::modules::database::{filter_by_secondary_key_impl, insert_impl, manager::DB_MANAGER};
use crate::modules::error::MailbotResult;
use native_db::*;
use native_model::{native_model, Model};
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub enum ApprovalStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
}

/// A downstream approval decision attached to a message. The approval
/// workflow itself lives outside this pipeline; these rows only matter here
/// because they must be deleted before their parent during retention cleanup.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[native_model(id = 3, version = 1)]
#[native_db]
pub struct ApprovalRecord {
    #[primary_key]
    pub id: u64,
    /// Owning `MessageRecord` id; cascade-deleted with the parent.
    #[secondary_key]
    pub message_id: u64,
    /// Workflow stage: draft, review, approval, send.
    pub stage: String,
    pub approver: String,
    pub status: ApprovalStatus,
    pub comments: Option<String>,
    pub approved_at: Option<i64>,
    pub created_at: i64,
}

impl ApprovalRecord {
    pub async fn save(&self) -> MailbotResult<()> {
        insert_impl(DB_MANAGER.meta_db(), self.clone()).await
    }

    pub async fn list_for_message(message_id: u64) -> MailbotResult<Vec<ApprovalRecord>> {
        filter_by_secondary_key_impl::<ApprovalRecord>(
            DB_MANAGER.meta_db(),
            ApprovalRecordKey::message_id,
            message_id,
        )
        .await
    }
}
