// Copyright © 2025 rustmailer.com
// Licensed under RustMailer License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

use std::future::Future;

use serde::Deserialize;
use serde_json::json;
use tracing::warn;

use crate::modules::error::{code::ErrorCode, MailbotResult};
use crate::modules::gateway::HttpClient;
use crate::modules::settings::cli::SETTINGS;
use crate::modules::store::message::{MessageCategory, Priority};
use crate::raise_error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifyRequest {
    pub sender: String,
    pub subject: String,
    pub body: String,
    pub recipient: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub category: MessageCategory,
    pub priority: Priority,
    pub summary: String,
    /// 0–100.
    pub confidence: u8,
    pub draft_reply: Option<String>,
}

/// What came back from the generative backend. Parsing never throws: output
/// that cannot be read as the expected JSON object lands in `Unclassified`
/// with the raw text preserved for the logs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClassifyOutcome {
    Classified(Classification),
    Unclassified { raw_text: String },
}

impl Classification {
    /// Enrichment failure is never fatal to ingestion: this is what gets
    /// persisted when the backend is unreachable or unparsable.
    pub fn fallback(subject: &str) -> Classification {
        Classification {
            category: MessageCategory::Other,
            priority: Priority::Medium,
            summary: subject.to_string(),
            confidence: 0,
            draft_reply: None,
        }
    }

    /// Outbound mail is classified without an external call.
    pub fn self_sent() -> Classification {
        Classification {
            category: MessageCategory::Other,
            priority: Priority::Low,
            summary: String::new(),
            confidence: 100,
            draft_reply: None,
        }
    }
}

pub trait ContentClassifier: Send + Sync {
    fn classify(
        &self,
        request: &ClassifyRequest,
    ) -> impl Future<Output = MailbotResult<ClassifyOutcome>> + Send;
}

#[derive(Debug, Deserialize)]
struct RawClassification {
    category: String,
    #[serde(default)]
    priority: Option<String>,
    #[serde(default)]
    summary: Option<String>,
    #[serde(default)]
    confidence: Option<i64>,
    #[serde(default)]
    draft: Option<String>,
}

/// Strict parse with explicit fallback. Fenced code blocks are stripped, the
/// first `{..}` span is taken, and anything that fails `serde_json` becomes
/// `Unclassified` rather than an error.
pub fn parse_outcome(text: &str) -> ClassifyOutcome {
    let mut candidate = text;
    if let Some(fenced) = candidate.split("```json").nth(1) {
        candidate = fenced.split("```").next().unwrap_or(fenced);
    } else if let Some(fenced) = candidate.split("```").nth(1) {
        candidate = fenced;
    }

    let span = match (candidate.find('{'), candidate.rfind('}')) {
        (Some(start), Some(end)) if start < end => &candidate[start..=end],
        _ => {
            return ClassifyOutcome::Unclassified {
                raw_text: text.to_string(),
            }
        }
    };

    let raw: RawClassification = match serde_json::from_str(span) {
        Ok(raw) => raw,
        Err(_) => {
            return ClassifyOutcome::Unclassified {
                raw_text: text.to_string(),
            }
        }
    };

    let category = MessageCategory::from_label(&raw.category).unwrap_or_else(|| {
        warn!("classifier returned unknown category '{}'; using 기타", raw.category);
        MessageCategory::Other
    });
    let priority = raw
        .priority
        .as_deref()
        .and_then(Priority::from_label)
        .unwrap_or_default();
    let confidence = raw.confidence.unwrap_or(50).clamp(0, 100) as u8;

    ClassifyOutcome::Classified(Classification {
        category,
        priority,
        summary: raw.summary.unwrap_or_default(),
        confidence,
        draft_reply: raw.draft.filter(|d| !d.trim().is_empty()),
    })
}

/// The 8-category rubric prompt, asking for strict JSON plus a short reply
/// draft in Korean business style.
pub fn build_prompt(request: &ClassifyRequest) -> String {
    let content_preview: String = request.body.chars().take(800).collect();
    format!(
        r#"다음 이메일을 분석하여 정확히 JSON 형식으로만 응답해. 다른 설명은 절대 하지 마.

보낸사람: {}
받는사람: {}
제목: {}
내용: {}

분류 기준:
- 발주: 물품/부품/재료 주문, 구매 요청
- 요청: 업무 요청, 자료 요청, 작업 의뢰
- 견적요청: 견적서 요청, 가격 문의, 단가 확인
- 문의: 일반 문의, 질문, 확인 요청
- 공지: 공지사항, 안내, 통보
- 미팅: 회의, 미팅, 스케줄, 일정 조정
- 클레임: 불만, 클레임, 하자, 반품, 교환
- 기타: 위 카테고리에 해당하지 않는 것

답신 초안(draft)은 정중하고 전문적인 한국어 비즈니스 이메일 형식으로 200자 이내로 작성해.

JSON 형식:
{{"category": "위 8개 중 하나", "priority": "high/medium/low", "summary": "한 문장 요약", "confidence": 0부터100사이숫자, "draft": "답신 초안"}}"#,
        request.sender, request.recipient, request.subject, content_preview
    )
}

/// Chat-completions client for the classification backend.
pub struct LlmClassifier {
    endpoint: String,
    model: String,
    api_key: String,
}

impl LlmClassifier {
    pub fn from_settings() -> MailbotResult<Self> {
        let api_key = SETTINGS.mailbot_classifier_api_key.clone().ok_or_else(|| {
            raise_error!(
                "'mailbot_classifier_api_key' is not configured.".into(),
                ErrorCode::MissingConfiguration
            )
        })?;
        Ok(Self {
            endpoint: SETTINGS.mailbot_classifier_endpoint.clone(),
            model: SETTINGS.mailbot_classifier_model.clone(),
            api_key,
        })
    }
}

impl ContentClassifier for LlmClassifier {
    async fn classify(&self, request: &ClassifyRequest) -> MailbotResult<ClassifyOutcome> {
        let body = json!({
            "model": self.model,
            "messages": [{"role": "user", "content": build_prompt(request)}],
        });
        let client = HttpClient::new()?;
        let value = client.post_json(&self.endpoint, &self.api_key, &body).await?;
        let text = value
            .pointer("/choices/0/message/content")
            .and_then(|v| v.as_str())
            .ok_or_else(|| {
                raise_error!(
                    "Classification backend response carried no message content.".into(),
                    ErrorCode::HttpResponseError
                )
            })?;
        Ok(parse_outcome(text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_json_object() {
        let outcome = parse_outcome(
            r#"{"category": "견적요청", "priority": "high", "summary": "단가표 요청", "confidence": 82, "draft": "안녕하세요, 견적서를 송부드리겠습니다."}"#,
        );
        match outcome {
            ClassifyOutcome::Classified(c) => {
                assert_eq!(c.category, MessageCategory::Quote);
                assert_eq!(c.priority, Priority::High);
                assert_eq!(c.summary, "단가표 요청");
                assert_eq!(c.confidence, 82);
                assert!(c.draft_reply.is_some());
            }
            ClassifyOutcome::Unclassified { .. } => panic!("expected Classified"),
        }
    }

    #[test]
    fn parses_fenced_json_with_surrounding_chatter() {
        let outcome = parse_outcome(
            "분석 결과입니다:\n```json\n{\"category\": \"발주\", \"priority\": \"medium\", \"summary\": \"부품 발주\", \"confidence\": 90}\n```\n감사합니다.",
        );
        match outcome {
            ClassifyOutcome::Classified(c) => {
                assert_eq!(c.category, MessageCategory::Order);
                assert_eq!(c.confidence, 90);
                assert_eq!(c.draft_reply, None);
            }
            ClassifyOutcome::Unclassified { .. } => panic!("expected Classified"),
        }
    }

    #[test]
    fn unknown_category_degrades_to_other() {
        let outcome =
            parse_outcome(r#"{"category": "스팸", "priority": "low", "summary": "", "confidence": 10}"#);
        match outcome {
            ClassifyOutcome::Classified(c) => assert_eq!(c.category, MessageCategory::Other),
            ClassifyOutcome::Unclassified { .. } => panic!("expected Classified"),
        }
    }

    #[test]
    fn non_json_text_is_unclassified() {
        let outcome = parse_outcome("죄송합니다, 분류할 수 없습니다.");
        assert!(matches!(outcome, ClassifyOutcome::Unclassified { .. }));
    }

    #[test]
    fn confidence_is_clamped() {
        let outcome =
            parse_outcome(r#"{"category": "문의", "priority": "low", "summary": "s", "confidence": 400}"#);
        match outcome {
            ClassifyOutcome::Classified(c) => assert_eq!(c.confidence, 100),
            ClassifyOutcome::Unclassified { .. } => panic!("expected Classified"),
        }
    }

    #[test]
    fn truncated_json_is_unclassified() {
        let outcome = parse_outcome(r#"{"category": "문의", "priority":"#);
        assert!(matches!(outcome, ClassifyOutcome::Unclassified { .. }));
    }
}
