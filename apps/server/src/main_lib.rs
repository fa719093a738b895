use std::sync::Arc;

use crate::config::Config;
use crate::notifier::{LogNotifier, WebhookNotifier};
use billwise_core::{
    bills::BillRepositoryTrait,
    confirmations::ConfirmationService,
    notifications::{NotifierTrait, ReminderDispatcher},
    recurring::{RecurringService, RecurringServiceTrait},
    scheduler::{BillingTick, SchedulerSettings},
    utils::{Clock, SystemClock},
};
use billwise_storage_sqlite::{
    bills::BillRepository, channels::ChannelRepository, db, ledger::LedgerRepository,
    recurring::RecurringRepository,
};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

pub struct AppState {
    pub recurring_service: Arc<dyn RecurringServiceTrait + Send + Sync>,
    pub confirmation_service: Arc<ConfirmationService>,
    pub bill_repository: Arc<dyn BillRepositoryTrait>,
    pub channel_repository: Arc<ChannelRepository>,
    pub billing_tick: Arc<BillingTick>,
    pub db_path: String,
}

pub fn init_tracing() {
    let log_format = std::env::var("BILLWISE_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);

    if log_format.eq_ignore_ascii_case("json") {
        registry
            .with(fmt::layer().json().with_current_span(false))
            .init();
    } else {
        registry
            .with(fmt::layer().with_target(true).with_line_number(true))
            .init();
    }
}

pub async fn build_state(config: &Config) -> anyhow::Result<Arc<AppState>> {
    let db_path = db::init(&config.db_path)?;
    tracing::info!("Database path in use: {}", db_path);

    let pool = db::create_pool(&db_path)?;
    db::run_migrations(&pool)?;
    let writer = db::spawn_writer((*pool).clone());

    let recurring_repository = Arc::new(RecurringRepository::new(pool.clone(), writer.clone()));
    let bill_repository = Arc::new(BillRepository::new(pool.clone(), writer.clone()));
    let ledger_repository = Arc::new(LedgerRepository::new(pool.clone(), writer.clone()));
    let channel_repository = Arc::new(ChannelRepository::new(pool.clone(), writer.clone()));

    let notifier: Arc<dyn NotifierTrait> = match &config.notifier_url {
        Some(url) => {
            tracing::info!("Delivering reminders through {}", url);
            Arc::new(WebhookNotifier::new(
                url.clone(),
                config.notifier_timeout,
                config.notify_retries,
            )?)
        }
        None => {
            tracing::warn!("BILLWISE_NOTIFIER_URL not set, reminders will only be logged");
            Arc::new(LogNotifier)
        }
    };
    let dispatcher = Arc::new(ReminderDispatcher::new(
        notifier,
        channel_repository.clone(),
    ));

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    let recurring_service = Arc::new(RecurringService::new(
        recurring_repository.clone(),
        bill_repository.clone(),
        clock.clone(),
        config.default_timezone.clone(),
    ));
    let confirmation_service = Arc::new(ConfirmationService::new(
        recurring_repository.clone(),
        bill_repository.clone(),
        ledger_repository,
        clock.clone(),
    ));
    let billing_tick = Arc::new(BillingTick::new(
        recurring_repository,
        bill_repository.clone(),
        dispatcher,
        clock,
        SchedulerSettings {
            default_timezone: config.default_timezone.clone(),
        },
    ));

    Ok(Arc::new(AppState {
        recurring_service,
        confirmation_service,
        bill_repository,
        channel_repository,
        billing_tick,
        db_path,
    }))
}
