use chrono::Duration;
use donate_engine::{db_types::Order, OrderFlowApi, SqliteDatabase};
use log::*;
use tokio::task::JoinHandle;

/// Starts the order expiry worker. Do not await the returned JoinHandle, as it will run indefinitely.
///
/// Every minute, pending orders older than `window` are cancelled along with their payment legs. The same
/// sweep also runs inline before checkout and the admin order list, so the worker exists to keep the database
/// tidy even when no requests arrive.
pub fn start_expiry_worker(db: SqliteDatabase, window: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut timer = tokio::time::interval(std::time::Duration::from_secs(60));
        let api = OrderFlowApi::new(db);
        info!("🕰️ Order expiry worker started. Pending orders expire after {} minutes.", window.num_minutes());
        loop {
            timer.tick().await;
            trace!("🕰️ Running order expiry job");
            match api.cancel_expired_orders(window).await {
                Ok(cancelled) if cancelled.is_empty() => {},
                Ok(cancelled) => {
                    info!("🕰️ {} orders expired", cancelled.len());
                    debug!("🕰️ Expired orders: {}", order_list(&cancelled));
                },
                Err(e) => {
                    error!("🕰️ Error running order expiry job: {e}");
                },
            }
        }
    })
}

fn order_list(orders: &[Order]) -> String {
    orders.iter().map(|o| format!("#{} ({})", o.id, o.nickname)).collect::<Vec<String>>().join(", ")
}
