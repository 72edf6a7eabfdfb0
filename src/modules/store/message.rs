// Copyright © 2025 rustmailer.com
// Licensed under RustMailer License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

use crate::modules::database::{
    async_find_impl, insert_impl, manager::DB_MANAGER, secondary_find_impl,
    take_while_secondary_impl, update_impl,
};
use crate::modules::error::{code::ErrorCode, MailbotResult};
use crate::modules::store::approval::{ApprovalRecord, ApprovalRecordKey};
use crate::modules::store::attachment::{AttachmentRecord, AttachmentRecordKey};
use crate::{raise_error, utc_now};
use native_db::*;
use native_model::{native_model, Model};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// The 8-category label set applied to incoming business mail.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub enum MessageCategory {
    /// 발주 — purchase order
    Order,
    /// 요청 — work or document request
    Request,
    /// 견적요청 — request for quotation
    Quote,
    /// 문의 — general inquiry
    Inquiry,
    /// 공지 — notice or announcement
    Notice,
    /// 미팅 — meeting or scheduling
    Meeting,
    /// 클레임 — complaint, defect, return
    Claim,
    /// 기타 — everything else
    #[default]
    Other,
}

impl MessageCategory {
    pub fn as_label(&self) -> &'static str {
        match self {
            MessageCategory::Order => "발주",
            MessageCategory::Request => "요청",
            MessageCategory::Quote => "견적요청",
            MessageCategory::Inquiry => "문의",
            MessageCategory::Notice => "공지",
            MessageCategory::Meeting => "미팅",
            MessageCategory::Claim => "클레임",
            MessageCategory::Other => "기타",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim() {
            "발주" => Some(MessageCategory::Order),
            "요청" => Some(MessageCategory::Request),
            "견적요청" => Some(MessageCategory::Quote),
            "문의" => Some(MessageCategory::Inquiry),
            "공지" => Some(MessageCategory::Notice),
            "미팅" => Some(MessageCategory::Meeting),
            "클레임" => Some(MessageCategory::Claim),
            "기타" => Some(MessageCategory::Other),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

impl Priority {
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_ascii_lowercase().as_str() {
            "low" => Some(Priority::Low),
            "medium" => Some(Priority::Medium),
            "high" => Some(Priority::High),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub enum MessageStatus {
    /// Newly ingested inbound mail awaiting review.
    #[default]
    Unread,
    Read,
    /// Self-originated mail; nothing to review.
    Sent,
}

#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[native_model(id = 1, version = 1)]
#[native_db]
pub struct MessageRecord {
    /// Deterministic surrogate key derived from `external_id` (see `message_uid`).
    #[primary_key]
    pub id: u64,
    /// The source-system message id. Unique; the idempotency key of the whole pipeline.
    #[secondary_key(unique)]
    pub external_id: String,
    /// When the source asserts the message was received, epoch millis.
    /// Falls back to the ingestion time when the source date is missing or unparsable.
    #[secondary_key]
    pub received_at: i64,
    pub subject: String,
    pub sender: String,
    pub recipient: String,
    pub body: String,
    pub body_html: Option<String>,
    pub category: MessageCategory,
    pub priority: Priority,
    pub status: MessageStatus,
    /// One-sentence AI summary; `None` until enrichment has run.
    pub ai_summary: Option<String>,
    /// 0–100 confidence reported by the classifier; 0 when enrichment fell back.
    pub ai_confidence: u8,
    pub draft_subject: Option<String>,
    pub draft_body: Option<String>,
    /// Ingestion time, set once at persist.
    pub processed_at: i64,
    pub created_at: i64,
}

impl MessageRecord {
    pub async fn save(&self) -> MailbotResult<()> {
        insert_impl(DB_MANAGER.meta_db(), self.clone()).await
    }

    pub async fn get(id: u64) -> MailbotResult<Option<MessageRecord>> {
        async_find_impl::<MessageRecord>(DB_MANAGER.meta_db(), id).await
    }

    pub async fn find_by_external_id(external_id: &str) -> MailbotResult<Option<MessageRecord>> {
        secondary_find_impl::<MessageRecord>(
            DB_MANAGER.meta_db(),
            MessageRecordKey::external_id,
            external_id.to_string(),
        )
        .await
    }

    /// The dedup index: a single unique-secondary point lookup, called once
    /// per candidate message per run.
    pub async fn exists(external_id: &str) -> MailbotResult<bool> {
        Ok(Self::find_by_external_id(external_id).await?.is_some())
    }

    /// Oldest-first slice of messages received strictly before `cutoff`,
    /// bounded to `limit` so a large backlog cannot stall a run.
    pub async fn list_received_before(
        cutoff: i64,
        limit: usize,
    ) -> MailbotResult<Vec<MessageRecord>> {
        take_while_secondary_impl(
            DB_MANAGER.meta_db(),
            MessageRecordKey::received_at,
            move |record: &MessageRecord| record.received_at < cutoff,
            limit,
        )
        .await
    }

    /// One-shot enrichment applied after the content classifier responds.
    pub async fn apply_classification(
        id: u64,
        category: MessageCategory,
        priority: Priority,
        summary: Option<String>,
        confidence: u8,
        draft_subject: Option<String>,
        draft_body: Option<String>,
    ) -> MailbotResult<()> {
        update_impl(
            DB_MANAGER.meta_db(),
            move |rw| {
                rw.get()
                    .primary::<MessageRecord>(id)
                    .map_err(|e| raise_error!(format!("{:#?}", e), ErrorCode::InternalError))?
                    .ok_or_else(|| {
                        raise_error!(
                            format!("The message record with id={id} that you want to enrich was not found."),
                            ErrorCode::ResourceNotFound
                        )
                    })
            },
            move |current| {
                let mut updated = current.clone();
                updated.category = category;
                updated.priority = priority;
                updated.ai_summary = summary;
                updated.ai_confidence = confidence.min(100);
                updated.draft_subject = draft_subject;
                updated.draft_body = draft_body;
                Ok(updated)
            },
        )
        .await?;
        Ok(())
    }

    /// Deletes the given messages together with their owned attachment and
    /// approval rows; children are removed before their parent. Each call is
    /// one transaction, so a batch either disappears completely or not at all.
    pub async fn delete_cascade(records: Vec<MessageRecord>) -> MailbotResult<usize> {
        let db = DB_MANAGER.meta_db().clone();
        tokio::task::spawn_blocking(move || {
            let rw = db
                .rw_transaction()
                .map_err(|e| raise_error!(format!("{:#?}", e), ErrorCode::InternalError))?;
            let mut deleted = 0usize;
            for record in records {
                // re-check inside the transaction; a concurrent reaper may
                // have taken the row already
                let Some(record) = rw
                    .get()
                    .primary::<MessageRecord>(record.id)
                    .map_err(|e| raise_error!(format!("{:#?}", e), ErrorCode::InternalError))?
                else {
                    continue;
                };
                let attachments: Vec<AttachmentRecord> = rw
                    .scan()
                    .secondary(AttachmentRecordKey::message_id)
                    .map_err(|e| raise_error!(format!("{:#?}", e), ErrorCode::InternalError))?
                    .range(record.id..=record.id)
                    .map_err(|e| raise_error!(format!("{:#?}", e), ErrorCode::InternalError))?
                    .collect::<Result<Vec<_>, _>>()
                    .map_err(|e| raise_error!(format!("{:#?}", e), ErrorCode::InternalError))?;
                for attachment in attachments {
                    rw.remove(attachment)
                        .map_err(|e| raise_error!(format!("{:#?}", e), ErrorCode::InternalError))?;
                }
                let approvals: Vec<ApprovalRecord> = rw
                    .scan()
                    .secondary(ApprovalRecordKey::message_id)
                    .map_err(|e| raise_error!(format!("{:#?}", e), ErrorCode::InternalError))?
                    .range(record.id..=record.id)
                    .map_err(|e| raise_error!(format!("{:#?}", e), ErrorCode::InternalError))?
                    .collect::<Result<Vec<_>, _>>()
                    .map_err(|e| raise_error!(format!("{:#?}", e), ErrorCode::InternalError))?;
                for approval in approvals {
                    rw.remove(approval)
                        .map_err(|e| raise_error!(format!("{:#?}", e), ErrorCode::InternalError))?;
                }
                rw.remove(record)
                    .map_err(|e| raise_error!(format!("{:#?}", e), ErrorCode::InternalError))?;
                deleted += 1;
            }
            rw.commit()
                .map_err(|e| raise_error!(format!("{:#?}", e), ErrorCode::InternalError))?;
            Ok(deleted)
        })
        .await
        .map_err(|e| raise_error!(format!("{:#?}", e), ErrorCode::InternalError))?
    }
}

/// Builder used by the ingestion pipeline; fills the set-once timestamps.
pub struct NewMessage {
    pub id: u64,
    pub external_id: String,
    pub subject: String,
    pub sender: String,
    pub recipient: String,
    pub body: String,
    pub body_html: Option<String>,
    pub received_at: i64,
    pub status: MessageStatus,
}

impl From<NewMessage> for MessageRecord {
    fn from(new: NewMessage) -> Self {
        let now = utc_now!();
        if new.received_at > now {
            warn!(
                "message {} carries a future received_at ({}); keeping as-is",
                new.external_id, new.received_at
            );
        }
        MessageRecord {
            id: new.id,
            external_id: new.external_id,
            received_at: new.received_at,
            subject: new.subject,
            sender: new.sender,
            recipient: new.recipient,
            body: new.body,
            body_html: new.body_html,
            category: MessageCategory::default(),
            priority: Priority::default(),
            status: new.status,
            ai_summary: None,
            ai_confidence: 0,
            draft_subject: None,
            draft_body: None,
            processed_at: now,
            created_at: now,
        }
    }
}
