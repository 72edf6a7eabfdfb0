// Copyright © 2025 rustmailer.com
// Licensed under RustMailer License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

use mimalloc::MiMalloc;
use modules::{
    context::Initialize,
    error::MailbotResult,
    logger,
    tasks::PeriodicTasks,
};
use tracing::info;

use crate::modules::{
    common::signal::{SignalManager, SIGNAL_MANAGER},
    database::manager::DatabaseManager,
    settings::dir::DataDirManager,
};

mod modules;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

static LOGO: &str = r#"
  __  __       _ _ _           _
 |  \/  | __ _(_) | |__   ___ | |_
 | |\/| |/ _` | | | '_ \ / _ \| __|
 | |  | | (_| | | | |_) | (_) | |_
 |_|  |_|\__,_|_|_|_.__/ \___/ \__|

"#;
#[tokio::main]
async fn main() -> MailbotResult<()> {
    logger::initialize_logging();
    info!("{}", LOGO);
    info!("Starting mailbot");
    info!("Version:  {}", mailbot_version!());
    info!("Git:      [{}]", env!("GIT_HASH"));

    if let Err(error) = initialize().await {
        eprintln!("{:?}", error);
        return Err(error);
    }

    wait_for_shutdown().await;
    info!("mailbot stopped.");
    Ok(())
}

/// Initialize the system by validating settings and starting necessary tasks.
async fn initialize() -> MailbotResult<()> {
    SignalManager::initialize().await?;
    DataDirManager::initialize().await?;
    DatabaseManager::initialize().await?;
    PeriodicTasks::start_background_tasks();
    Ok(())
}

async fn wait_for_shutdown() {
    let mut shutdown = SIGNAL_MANAGER.subscribe();
    let _ = shutdown.recv().await;
}
