// Copyright © 2025 rustmailer.com
// Licensed under RustMailer License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};

use crate::modules::classifier::{ClassifyOutcome, ClassifyRequest, ContentClassifier};
use crate::modules::error::{code::ErrorCode, MailbotResult};
use crate::modules::gateway::model::{FullMessage, Header, MessagePart, PartBody};
use crate::modules::gateway::{MailSource, MessageRef};
use crate::modules::pipeline::orchestrate::Orchestrator;
use crate::modules::pipeline::retention::reap_expired;
use crate::modules::store::attachment::AttachmentRecord;
use crate::modules::store::message::{
    MessageCategory, MessageRecord, MessageStatus, NewMessage, Priority,
};
use crate::modules::store::object::ObjectStore;
use crate::modules::utils::message_uid;
use crate::{days_to_millis, raise_error, utc_now};

#[derive(Default, Clone)]
struct ScriptedSource {
    refs: Vec<MessageRef>,
    messages: HashMap<String, FullMessage>,
    attachments: HashMap<(String, String), Vec<u8>>,
    fail_fetch: HashSet<String>,
    fail_list: bool,
}

impl ScriptedSource {
    fn with_message(mut self, full: FullMessage) -> Self {
        self.refs.push(MessageRef {
            id: full.id.clone(),
        });
        self.messages.insert(full.id.clone(), full);
        self
    }

    fn with_broken_message(mut self, id: &str) -> Self {
        self.refs.push(MessageRef { id: id.to_string() });
        self.fail_fetch.insert(id.to_string());
        self
    }

    fn with_attachment_bytes(mut self, message_id: &str, source_ref: &str, bytes: &[u8]) -> Self {
        self.attachments
            .insert((message_id.to_string(), source_ref.to_string()), bytes.to_vec());
        self
    }
}

impl MailSource for ScriptedSource {
    async fn list_since(&self, _query: &str, _lookback: Duration) -> MailbotResult<Vec<MessageRef>> {
        if self.fail_list {
            return Err(raise_error!(
                "token refresh rejected".into(),
                ErrorCode::CredentialRefreshFailed
            ));
        }
        Ok(self.refs.clone())
    }

    async fn fetch_full(&self, id: &str) -> MailbotResult<FullMessage> {
        if self.fail_fetch.contains(id) {
            return Err(raise_error!(
                format!("fetch of {id} failed"),
                ErrorCode::MailApiCallFailed
            ));
        }
        self.messages.get(id).cloned().ok_or_else(|| {
            raise_error!(format!("no such message {id}"), ErrorCode::ResourceNotFound)
        })
    }

    async fn fetch_attachment(&self, message_id: &str, attachment_id: &str) -> MailbotResult<Vec<u8>> {
        self.attachments
            .get(&(message_id.to_string(), attachment_id.to_string()))
            .cloned()
            .ok_or_else(|| {
                raise_error!(
                    format!("no attachment {attachment_id} on {message_id}"),
                    ErrorCode::ResourceNotFound
                )
            })
    }
}

#[derive(Clone)]
struct ScriptedClassifier {
    outcome: ClassifyOutcome,
    calls: Arc<AtomicUsize>,
}

impl ScriptedClassifier {
    fn returning(outcome: ClassifyOutcome) -> Self {
        Self {
            outcome,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }
}

impl ContentClassifier for ScriptedClassifier {
    async fn classify(&self, _request: &ClassifyRequest) -> MailbotResult<ClassifyOutcome> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.outcome.clone())
    }
}

#[derive(Default, Clone)]
struct RecordingStore {
    uploads: Arc<Mutex<Vec<String>>>,
}

impl ObjectStore for RecordingStore {
    async fn upload(&self, path: &str, _bytes: Vec<u8>, _content_type: &str) -> MailbotResult<String> {
        self.uploads.lock().unwrap().push(path.to_string());
        Ok(path.to_string())
    }
}

fn quote_outcome() -> ClassifyOutcome {
    ClassifyOutcome::Classified(crate::modules::classifier::Classification {
        category: MessageCategory::Quote,
        priority: Priority::High,
        summary: "단가표 요청".to_string(),
        confidence: 82,
        draft_reply: Some("안녕하세요, 견적서를 송부드리겠습니다.".to_string()),
    })
}

fn inbound_message(id: &str, subject: &str) -> FullMessage {
    message_from(id, subject, "buyer@partner.com")
}

fn message_from(id: &str, subject: &str, from: &str) -> FullMessage {
    FullMessage {
        id: id.to_string(),
        internal_date: utc_now!().to_string(),
        payload: MessagePart {
            mime_type: "text/plain".to_string(),
            headers: vec![
                Header {
                    name: "Subject".to_string(),
                    value: subject.to_string(),
                },
                Header {
                    name: "From".to_string(),
                    value: from.to_string(),
                },
                Header {
                    name: "To".to_string(),
                    value: "sales@kexim-trade.co.kr".to_string(),
                },
            ],
            body: PartBody::Body {
                data: URL_SAFE_NO_PAD.encode("본문입니다."),
                size: 16,
            },
            ..Default::default()
        },
        ..Default::default()
    }
}

fn with_attachment(mut full: FullMessage, filename: &str, source_ref: &str, size: u64) -> FullMessage {
    let mut body_part = std::mem::take(&mut full.payload);
    let headers = std::mem::take(&mut body_part.headers);
    full.payload = MessagePart {
        mime_type: "multipart/mixed".to_string(),
        headers,
        parts: vec![
            body_part,
            MessagePart {
                filename: filename.to_string(),
                mime_type: "application/pdf".to_string(),
                body: PartBody::Attachment {
                    attachment_id: source_ref.to_string(),
                    size,
                },
                ..Default::default()
            },
        ],
        ..Default::default()
    };
    full
}

async fn seed_existing(external_id: &str) {
    let record: MessageRecord = NewMessage {
        id: message_uid(external_id),
        external_id: external_id.to_string(),
        subject: "이미 저장됨".to_string(),
        sender: "buyer@partner.com".to_string(),
        recipient: "sales@kexim-trade.co.kr".to_string(),
        body: String::new(),
        body_html: None,
        received_at: utc_now!(),
        status: MessageStatus::Unread,
    }
    .into();
    record.save().await.unwrap();
}

#[tokio::test]
async fn one_bad_message_does_not_sink_its_batch() {
    seed_existing("pf-dup").await;
    let mut source = ScriptedSource::default()
        .with_message(inbound_message("pf-ok", "단가표 요청"))
        .with_broken_message("pf-bad");
    source.refs.insert(0, MessageRef { id: "pf-dup".to_string() });

    let orchestrator = Orchestrator::new(
        source,
        ScriptedClassifier::returning(quote_outcome()),
        RecordingStore::default(),
    );
    let report = orchestrator.run_once().await.unwrap();

    assert_eq!(report.listed, 3);
    assert_eq!(report.skipped, 1);
    assert_eq!(report.success, 1);
    assert_eq!(report.failed, 1);
    assert_eq!(report.processed(), report.success + report.failed);
    assert_eq!(report.listed, report.skipped + report.processed());

    let stored = MessageRecord::find_by_external_id("pf-ok").await.unwrap().unwrap();
    assert_eq!(stored.category, MessageCategory::Quote);
    assert_eq!(stored.priority, Priority::High);
    assert_eq!(stored.ai_confidence, 82);
    assert_eq!(stored.ai_summary.as_deref(), Some("단가표 요청"));
    assert_eq!(stored.draft_subject.as_deref(), Some("Re: 단가표 요청"));
    assert_eq!(stored.status, MessageStatus::Unread);
}

#[tokio::test]
async fn second_run_skips_already_ingested_messages() {
    let source = ScriptedSource::default()
        .with_message(inbound_message("idem-1", "문의드립니다"))
        .with_message(inbound_message("idem-2", "발주 관련"));
    let classifier = ScriptedClassifier::returning(quote_outcome());
    let orchestrator = Orchestrator::new(source, classifier.clone(), RecordingStore::default());

    let first = orchestrator.run_once().await.unwrap();
    assert_eq!(first.success, 2);
    assert_eq!(first.skipped, 0);

    let second = orchestrator.run_once().await.unwrap();
    assert_eq!(second.success, 0);
    assert_eq!(second.skipped, 2);
    // the classifier was only consulted on the first pass
    assert_eq!(classifier.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn outbound_mail_skips_the_classifier() {
    let source = ScriptedSource::default().with_message(message_from(
        "out-1",
        "RE: 견적서 송부",
        "\"김영수\" <kim@kexim-trade.co.kr>",
    ));
    let classifier = ScriptedClassifier::returning(quote_outcome());
    let orchestrator = Orchestrator::new(source, classifier.clone(), RecordingStore::default());

    let report = orchestrator.run_once().await.unwrap();
    assert_eq!(report.success, 1);
    assert_eq!(classifier.calls.load(Ordering::SeqCst), 0);

    let stored = MessageRecord::find_by_external_id("out-1").await.unwrap().unwrap();
    assert_eq!(stored.status, MessageStatus::Sent);
    assert_eq!(stored.category, MessageCategory::Other);
    assert_eq!(stored.ai_confidence, 100);
    assert_eq!(stored.draft_subject, None);
}

#[tokio::test]
async fn unparsable_classifier_output_degrades_to_fallback() {
    let source = ScriptedSource::default().with_message(inbound_message("fb-1", "긴급 문의"));
    let classifier = ScriptedClassifier::returning(ClassifyOutcome::Unclassified {
        raw_text: "죄송합니다, 분류할 수 없습니다.".to_string(),
    });
    let orchestrator = Orchestrator::new(source, classifier, RecordingStore::default());

    let report = orchestrator.run_once().await.unwrap();
    assert_eq!(report.success, 1);

    let stored = MessageRecord::find_by_external_id("fb-1").await.unwrap().unwrap();
    assert_eq!(stored.category, MessageCategory::Other);
    assert_eq!(stored.ai_confidence, 0);
    assert_eq!(stored.ai_summary.as_deref(), Some("긴급 문의"));
    assert_eq!(stored.draft_subject, None);
}

#[tokio::test]
async fn attachments_are_archived_under_category_and_day() {
    let full = with_attachment(
        inbound_message("arc-1", "견적 요청드립니다"),
        "견적요청서.pdf",
        "att-1",
        2048,
    );
    let source = ScriptedSource::default()
        .with_message(full)
        .with_attachment_bytes("arc-1", "att-1", b"%PDF-1.7");
    let store = RecordingStore::default();
    let orchestrator = Orchestrator::new(
        source,
        ScriptedClassifier::returning(quote_outcome()),
        store.clone(),
    );

    let report = orchestrator.run_once().await.unwrap();
    assert_eq!(report.success, 1);
    assert_eq!(report.archived, 1);

    let uploads = store.uploads.lock().unwrap().clone();
    assert_eq!(uploads.len(), 1);
    assert!(uploads[0].starts_with("견적요청/"));
    assert!(uploads[0].ends_with("/견적요청서.pdf"));

    let stored = MessageRecord::find_by_external_id("arc-1").await.unwrap().unwrap();
    let attachments = AttachmentRecord::list_for_message(stored.id).await.unwrap();
    assert_eq!(attachments.len(), 1);
    assert_eq!(attachments[0].storage_path.as_deref(), Some(uploads[0].as_str()));

    // nothing left pending, so the next cycle uploads nothing
    let second = orchestrator.run_once().await.unwrap();
    assert_eq!(second.archived, 0);
    assert_eq!(store.uploads.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn oversized_attachments_stay_unarchived() {
    let full = with_attachment(
        inbound_message("big-1", "대용량 도면 송부"),
        "도면.zip",
        "att-big",
        20 * 1024 * 1024,
    );
    let source = ScriptedSource::default()
        .with_message(full)
        .with_attachment_bytes("big-1", "att-big", b"zip");
    let store = RecordingStore::default();
    let orchestrator = Orchestrator::new(
        source,
        ScriptedClassifier::returning(quote_outcome()),
        store.clone(),
    );

    let report = orchestrator.run_once().await.unwrap();
    assert_eq!(report.success, 1);
    assert_eq!(report.archived, 0);
    assert!(store.uploads.lock().unwrap().is_empty());

    let stored = MessageRecord::find_by_external_id("big-1").await.unwrap().unwrap();
    let attachments = AttachmentRecord::list_for_message(stored.id).await.unwrap();
    assert_eq!(attachments.len(), 1);
    assert_eq!(attachments[0].storage_path, None);
}

#[tokio::test]
async fn retention_removes_expired_messages_and_children() {
    let external_id = "old-1";
    let record: MessageRecord = NewMessage {
        id: message_uid(external_id),
        external_id: external_id.to_string(),
        subject: "오래된 메일".to_string(),
        sender: "buyer@partner.com".to_string(),
        recipient: "sales@kexim-trade.co.kr".to_string(),
        body: String::new(),
        body_html: None,
        received_at: utc_now!() - days_to_millis!(40),
        status: MessageStatus::Read,
    }
    .into();
    let message_id = record.id;
    // child row first: the reaper only discovers work through the parent
    AttachmentRecord {
        id: crate::modules::utils::attachment_uid(external_id, "att-old"),
        message_id,
        file_name: "old.pdf".to_string(),
        source_ref: "att-old".to_string(),
        size: 100,
        content_type: "application/pdf".to_string(),
        storage_path: None,
        created_at: utc_now!(),
    }
    .save()
    .await
    .unwrap();
    record.save().await.unwrap();

    // a concurrently running cycle may reap the row first; only absence matters
    let _ = reap_expired().await;

    assert!(MessageRecord::find_by_external_id(external_id).await.unwrap().is_none());
    assert!(AttachmentRecord::list_for_message(message_id).await.unwrap().is_empty());
}

#[tokio::test]
async fn listing_failure_aborts_the_cycle() {
    let source = ScriptedSource {
        fail_list: true,
        ..Default::default()
    };
    let orchestrator = Orchestrator::new(
        source,
        ScriptedClassifier::returning(quote_outcome()),
        RecordingStore::default(),
    );
    let err = orchestrator.run_once().await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::CredentialRefreshFailed);
}
