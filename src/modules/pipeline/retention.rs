// Copyright © 2025 rustmailer.com
// Licensed under RustMailer License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

use std::collections::HashSet;
use std::future::Future;

use tracing::{info, warn};

use crate::days_to_millis;
use crate::modules::error::MailbotResult;
use crate::modules::settings::cli::SETTINGS;
use crate::modules::store::message::MessageRecord;
use crate::utc_now;

/// Removes messages older than the retention window, with their attachment
/// and approval rows. Works in bounded batches so one oversized backlog
/// cannot hold a transaction open for the whole table.
pub async fn reap_expired() -> MailbotResult<usize> {
    let cutoff = utc_now!() - days_to_millis!(SETTINGS.mailbot_retention_days);
    let batch_size = SETTINGS.mailbot_reap_batch_size as usize;
    let mut reaped = 0usize;
    let mut stuck: HashSet<u64> = HashSet::new();
    loop {
        // widen the fetch by the stuck count so failed rows cannot shadow
        // the rest of the backlog
        let limit = batch_size + stuck.len();
        let batch = MessageRecord::list_received_before(cutoff, limit).await?;
        let fetched = batch.len();
        let pending: Vec<MessageRecord> = batch
            .into_iter()
            .filter(|record| !stuck.contains(&record.id))
            .collect();
        reaped += reap_records(pending, &mut stuck, |record| {
            MessageRecord::delete_cascade(vec![record])
        })
        .await;
        if fetched < limit {
            break;
        }
    }
    if reaped > 0 {
        info!(
            "retention pass removed {} messages older than {} days",
            reaped, SETTINGS.mailbot_retention_days
        );
    }
    if !stuck.is_empty() {
        warn!("retention pass left {} messages behind after delete failures", stuck.len());
    }
    Ok(reaped)
}

/// Deletes each record in its own cascade so one failure cannot abort the
/// pass; ids that fail are remembered in `stuck` and skipped thereafter.
async fn reap_records<F, Fut>(
    records: Vec<MessageRecord>,
    stuck: &mut HashSet<u64>,
    delete: F,
) -> usize
where
    F: Fn(MessageRecord) -> Fut,
    Fut: Future<Output = MailbotResult<usize>>,
{
    let mut reaped = 0usize;
    for record in records {
        let id = record.id;
        match delete(record).await {
            Ok(deleted) => reaped += deleted,
            Err(err) => {
                warn!("failed to reap expired message {}: {:#?}", id, err);
                stuck.insert(id);
            }
        }
    }
    reaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::error::code::ErrorCode;
    use crate::modules::store::message::{MessageCategory, MessageStatus, Priority};
    use crate::raise_error;

    fn expired(id: u64) -> MessageRecord {
        MessageRecord {
            id,
            external_id: format!("rt-{}", id),
            received_at: 0,
            subject: String::new(),
            sender: String::new(),
            recipient: String::new(),
            body: String::new(),
            body_html: None,
            category: MessageCategory::Other,
            priority: Priority::Medium,
            status: MessageStatus::Unread,
            ai_summary: None,
            ai_confidence: 0,
            draft_subject: None,
            draft_body: None,
            processed_at: 0,
            created_at: 0,
        }
    }

    #[tokio::test]
    async fn one_failed_cascade_does_not_stop_the_pass() {
        let mut stuck = HashSet::new();
        let reaped = reap_records(
            vec![expired(1), expired(2), expired(3)],
            &mut stuck,
            |record| async move {
                if record.id == 2 {
                    Err(raise_error!(
                        "store unavailable".to_string(),
                        ErrorCode::InternalError
                    ))
                } else {
                    Ok(1)
                }
            },
        )
        .await;
        assert_eq!(reaped, 2);
        assert_eq!(stuck.len(), 1);
        assert!(stuck.contains(&2));
    }

    #[tokio::test]
    async fn stuck_records_are_not_retried_within_a_pass() {
        let mut stuck = HashSet::from([7u64]);
        let records: Vec<MessageRecord> = vec![expired(7), expired(8)]
            .into_iter()
            .filter(|record| !stuck.contains(&record.id))
            .collect();
        let reaped = reap_records(records, &mut stuck, |_| async move { Ok(1) }).await;
        assert_eq!(reaped, 1);
    }
}
