// Copyright © 2025 rustmailer.com
// Licensed under RustMailer License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

use chrono::DateTime;
use tracing::warn;

use crate::modules::gateway::model::{FullMessage, MessagePart, PartBody};
use crate::modules::settings::cli::SETTINGS;
use crate::modules::store::attachment::AttachmentMeta;
use crate::modules::utils::decode_base64url;
use crate::utc_now;

pub const MISSING_SUBJECT: &str = "(제목 없음)";
pub const MISSING_SENDER: &str = "unknown";

/// Provider payload flattened into what the store persists. Attachment bytes
/// are NOT here; only their coordinates, so archival can fetch them later.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NormalizedMessage {
    pub external_id: String,
    pub subject: String,
    pub sender: String,
    pub recipient: String,
    pub body: String,
    pub body_html: Option<String>,
    pub received_at: i64,
    pub attachments: Vec<AttachmentMeta>,
}

pub fn normalize(full: &FullMessage) -> NormalizedMessage {
    let mut normalized = NormalizedMessage {
        external_id: full.id.clone(),
        subject: full
            .header("Subject")
            .filter(|s| !s.trim().is_empty())
            .unwrap_or(MISSING_SUBJECT)
            .to_string(),
        sender: full
            .header("From")
            .filter(|s| !s.trim().is_empty())
            .unwrap_or(MISSING_SENDER)
            .to_string(),
        recipient: full.header("To").unwrap_or_default().to_string(),
        received_at: received_at(full),
        ..Default::default()
    };
    walk_part(&full.payload, &mut normalized);
    normalized.body = truncate_chars(&normalized.body, SETTINGS.mailbot_max_body_length as usize);
    normalized
}

/// Depth-first over the MIME tree. First text/plain wins the body slot,
/// first text/html the html slot; named parts with an attachment id are
/// collected as metadata.
fn walk_part(part: &MessagePart, out: &mut NormalizedMessage) {
    if !part.filename.is_empty() {
        if let PartBody::Attachment { attachment_id, size } = &part.body {
            out.attachments.push(AttachmentMeta {
                source_ref: attachment_id.clone(),
                file_name: part.filename.clone(),
                size: *size,
                content_type: part.mime_type.clone(),
            });
            return;
        }
    }
    match part.mime_type.as_str() {
        "text/plain" if out.body.is_empty() => {
            if let PartBody::Body { data, .. } = &part.body {
                out.body = decode_text(data, &out.external_id);
            }
        }
        "text/html" if out.body_html.is_none() => {
            if let PartBody::Body { data, .. } = &part.body {
                out.body_html = Some(decode_text(data, &out.external_id));
            }
        }
        _ => {}
    }
    for child in &part.parts {
        walk_part(child, out);
    }
}

fn decode_text(data: &str, external_id: &str) -> String {
    match decode_base64url(data) {
        Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
        Err(e) => {
            warn!("undecodable body part in message {}: {:#?}", external_id, e);
            String::new()
        }
    }
}

/// Date header first, provider timestamp second, wall clock last. A bad or
/// absent date must not sink the message.
fn received_at(full: &FullMessage) -> i64 {
    if let Some(raw) = full.header("Date") {
        // RFC 5322 allows a trailing comment like `(KST)` that the parser
        // rejects; cut it off.
        let cleaned = raw.split(" (").next().unwrap_or(raw).trim();
        if let Ok(parsed) = DateTime::parse_from_rfc2822(cleaned) {
            return parsed.timestamp_millis();
        }
        warn!("unparsable Date header '{}' on message {}", raw, full.id);
    }
    if let Ok(millis) = full.internal_date.parse::<i64>() {
        if millis > 0 {
            return millis;
        }
    }
    utc_now!()
}

fn truncate_chars(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_string()
    } else {
        text.chars().take(max).collect()
    }
}
