//! Background loop that drives the billing tick.

use std::sync::Arc;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info};

use crate::config::Config;
use crate::main_lib::AppState;

/// Starts the periodic billing tick: overdue sweep, follow-ups, then reminders.
pub fn start_billing_scheduler(state: Arc<AppState>, config: &Config) {
    let initial_delay = config.initial_delay;
    let period = config.tick_interval;

    tokio::spawn(async move {
        info!("Billing scheduler started ({}s interval)", period.as_secs());

        // Let the server finish starting before the first pass.
        tokio::time::sleep(initial_delay).await;

        let mut tick_interval = interval(period);
        tick_interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tick_interval.tick().await;
            run_scheduled_tick(&state).await;
        }
    });
}

async fn run_scheduled_tick(state: &Arc<AppState>) {
    // The tick logs its own summary.
    if state.billing_tick.run().await.is_none() {
        debug!("Scheduled billing tick skipped: previous tick still running");
    }
}
