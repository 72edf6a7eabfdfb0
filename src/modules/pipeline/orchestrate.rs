// Copyright © 2025 rustmailer.com
// Licensed under RustMailer License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

use std::time::Duration;

use tracing::{error, info, warn};

use crate::days_to_millis;
use crate::modules::classifier::{
    Classification, ClassifyOutcome, ClassifyRequest, ContentClassifier,
};
use crate::modules::common::parallel::join_settled;
use crate::modules::error::MailbotResult;
use crate::modules::gateway::{MailSource, MessageRef};
use crate::modules::pipeline::archive::archive_pending;
use crate::modules::pipeline::direction::Direction;
use crate::modules::pipeline::normalize::{normalize, NormalizedMessage};
use crate::modules::pipeline::report::RunReport;
use crate::modules::pipeline::retention::reap_expired;
use crate::modules::settings::cli::SETTINGS;
use crate::modules::store::message::{MessageRecord, MessageStatus, NewMessage};
use crate::modules::store::object::ObjectStore;
use crate::modules::utils::{attachment_uid, message_uid};

enum Outcome {
    Skipped,
    Stored,
}

/// Drives one ingestion cycle end to end: retention, listing, dedup, fetch,
/// normalize, classify, persist, archive. Everything behind the listing call
/// is per-item isolated; only a failed listing (typically a credential
/// problem) aborts the cycle.
pub struct Orchestrator<S, C, O> {
    source: S,
    classifier: C,
    object_store: O,
}

impl<S, C, O> Orchestrator<S, C, O>
where
    S: MailSource,
    C: ContentClassifier,
    O: ObjectStore,
{
    pub fn new(source: S, classifier: C, object_store: O) -> Self {
        Self {
            source,
            classifier,
            object_store,
        }
    }

    pub async fn run_once(&self) -> MailbotResult<RunReport> {
        let mut report = RunReport::default();

        match reap_expired().await {
            Ok(reaped) => report.reaped = reaped,
            Err(e) => error!("retention pass failed; continuing the cycle: {:#?}", e),
        }

        let query = SETTINGS.mailbot_mail_query.clone().unwrap_or_default();
        let lookback = Duration::from_millis(days_to_millis!(SETTINGS.mailbot_lookback_days) as u64);
        let refs = self.source.list_since(&query, lookback).await?;
        report.listed = refs.len();
        if refs.is_empty() {
            info!("nothing new at the mail source; reaped={}", report.reaped);
            return Ok(report);
        }

        for chunk in refs.chunks(SETTINGS.mailbot_ingest_batch_size as usize) {
            let outcomes = join_settled(chunk.iter().cloned(), |r| self.process_one(r)).await;
            for outcome in outcomes {
                match outcome {
                    Ok(Outcome::Skipped) => report.skipped += 1,
                    Ok(Outcome::Stored) => report.success += 1,
                    Err(e) => {
                        error!("message ingestion failed: {:#?}", e);
                        report.failed += 1;
                    }
                }
            }
        }

        match archive_pending(&self.source, &self.object_store).await {
            Ok(archived) => report.archived = archived,
            Err(e) => error!("attachment archival failed; continuing: {:#?}", e),
        }

        info!(
            "ingestion cycle done: listed={} skipped={} success={} failed={} reaped={} archived={}",
            report.listed, report.skipped, report.success, report.failed, report.reaped, report.archived
        );
        Ok(report)
    }

    async fn process_one(&self, message_ref: MessageRef) -> MailbotResult<Outcome> {
        if MessageRecord::exists(&message_ref.id).await? {
            return Ok(Outcome::Skipped);
        }

        let full = self.source.fetch_full(&message_ref.id).await?;
        let normalized = normalize(&full);
        let direction = Direction::of(&normalized.sender, &SETTINGS.mailbot_org_domain);
        let message_id = message_uid(&normalized.external_id);

        let status = match direction {
            Direction::Outbound => MessageStatus::Sent,
            Direction::Inbound => MessageStatus::Unread,
        };
        let record: MessageRecord = NewMessage {
            id: message_id,
            external_id: normalized.external_id.clone(),
            subject: normalized.subject.clone(),
            sender: normalized.sender.clone(),
            recipient: normalized.recipient.clone(),
            body: normalized.body.clone(),
            body_html: normalized.body_html.clone(),
            received_at: normalized.received_at,
            status,
        }
        .into();
        record.save().await?;

        for meta in &normalized.attachments {
            let attachment_id = attachment_uid(&normalized.external_id, &meta.source_ref);
            meta.clone().into_record(attachment_id, message_id).save().await?;
        }

        let classification = match direction {
            Direction::Outbound => Classification::self_sent(),
            Direction::Inbound => self.classify_or_fallback(&normalized.subject, &normalized).await,
        };
        let draft_subject = classification
            .draft_reply
            .as_ref()
            .map(|_| format!("Re: {}", normalized.subject));
        MessageRecord::apply_classification(
            message_id,
            classification.category,
            classification.priority,
            (!classification.summary.is_empty()).then(|| classification.summary),
            classification.confidence,
            draft_subject,
            classification.draft_reply,
        )
        .await?;

        Ok(Outcome::Stored)
    }

    /// Enrichment never fails a message. Backend errors and unparsable
    /// output both degrade to the fallback classification.
    async fn classify_or_fallback(
        &self,
        subject: &str,
        normalized: &NormalizedMessage,
    ) -> Classification {
        let request = ClassifyRequest {
            sender: normalized.sender.clone(),
            subject: normalized.subject.clone(),
            body: normalized.body.clone(),
            recipient: normalized.recipient.clone(),
        };
        match self.classifier.classify(&request).await {
            Ok(ClassifyOutcome::Classified(classification)) => classification,
            Ok(ClassifyOutcome::Unclassified { raw_text }) => {
                let preview: String = raw_text.chars().take(200).collect();
                warn!(
                    "classifier output for message {} was not valid JSON: {}",
                    normalized.external_id, preview
                );
                Classification::fallback(subject)
            }
            Err(e) => {
                warn!(
                    "classifier call for message {} failed: {:#?}",
                    normalized.external_id, e
                );
                Classification::fallback(subject)
            }
        }
    }
}
