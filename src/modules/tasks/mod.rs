// Copyright © 2025 rustmailer.com
// Licensed under RustMailer License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

use std::sync::Arc;
use std::time::Duration;

use tracing::error;

use crate::modules::classifier::LlmClassifier;
use crate::modules::context::MailbotTask;
use crate::modules::gateway::auth::OAuthTokenProvider;
use crate::modules::gateway::gmail::GmailGateway;
use crate::modules::gateway::object::HttpObjectStore;
use crate::modules::pipeline::orchestrate::Orchestrator;
use crate::modules::scheduler::PeriodicTask;
use crate::modules::settings::cli::SETTINGS;

/// The one recurring job: a full ingestion cycle every
/// `mailbot_ingest_interval_secs`, first run immediately at startup.
pub struct IngestTask;

impl MailbotTask for IngestTask {
    fn start() {
        let provider = match OAuthTokenProvider::from_settings() {
            Ok(provider) => provider,
            Err(e) => {
                error!("ingestion not started, mail source credentials missing: {:#?}", e);
                return;
            }
        };
        let classifier = match LlmClassifier::from_settings() {
            Ok(classifier) => classifier,
            Err(e) => {
                error!("ingestion not started, classifier not configured: {:#?}", e);
                return;
            }
        };
        let object_store = match HttpObjectStore::from_settings() {
            Ok(store) => store,
            Err(e) => {
                error!("ingestion not started, object store not configured: {:#?}", e);
                return;
            }
        };

        let source = GmailGateway::new(provider, SETTINGS.mailbot_mail_label.clone());
        let orchestrator = Arc::new(Orchestrator::new(source, classifier, object_store));

        let task = PeriodicTask::new("mail-ingest");
        task.start(
            move || {
                let orchestrator = orchestrator.clone();
                async move {
                    orchestrator.run_once().await?;
                    Ok(())
                }
            },
            Duration::from_secs(SETTINGS.mailbot_ingest_interval_secs),
            false,
            true,
        );
    }
}

pub struct PeriodicTasks;

impl PeriodicTasks {
    pub fn start_background_tasks() {
        IngestTask::start();
    }
}
