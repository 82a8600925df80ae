use order_board::memory::{MemoryOrderStore, MemoryTables};
use order_board::{BoardConfig, Clock, Collaborators, ManualClock, init_logger_with_file};
use shared::models::DiningTable;
use shared::order::{LineItem, OrderChannel, OrderSnapshot, OrderStatus};
use rust_decimal::Decimal;
use std::sync::Arc;
use std::time::Duration;

/// Drive a board through a short service against the in-memory backend
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = BoardConfig::from_env();
    init_logger_with_file(Some(&config.log_level), config.log_dir.as_deref());

    tracing::info!(scope_id = %config.scope_id, "Order board demo starting");

    let clock = ManualClock::new(chrono::Utc::now().timestamp_millis());
    let start = clock.now_millis();
    let store = MemoryOrderStore::new();
    let tables = MemoryTables::new();
    tables.add(DiningTable::new("T7", "Terrace 7"));
    tables.occupy("T7", "A1");

    let mut a1 = OrderSnapshot::new("A1", "#101", OrderChannel::TableService, start).at_table("T7");
    a1.items.push(LineItem::new("Paella", 2, Decimal::new(1450, 2)));
    a1.totals.subtotal = Decimal::new(2900, 2);
    a1.totals.total = Decimal::new(2900, 2);
    store.insert(&config.scope_id, a1);
    store.insert(
        &config.scope_id,
        OrderSnapshot::new("B2", "#102", OrderChannel::Takeaway, start),
    );
    store.insert(
        &config.scope_id,
        OrderSnapshot::new("C3", "#103", OrderChannel::Delivery, start),
    );

    let collaborators = Collaborators::new(
        Arc::new(store.clone()),
        Arc::new(store.clone()),
        Arc::new(tables.clone()),
    )
    .with_clock(Arc::new(clock.clone()));
    let board = order_board::start(config.clone(), collaborators).await?;

    // kitchen picks up A1, serves it twelve minutes later
    board.request_transition("A1", OrderStatus::Preparing).await?;
    board.settled().await?;
    clock.advance(Duration::from_secs(12 * 60 + 34));
    board.request_transition("A1", OrderStatus::Delivered).await?;

    // takeaway B2 skips straight to ready; moving it back is rejected synchronously
    board.request_transition("B2", OrderStatus::Ready).await?;
    match board.request_transition("B2", OrderStatus::Preparing).await {
        Err(e) if e.is_validation() => {
            tracing::info!(code = %e.code(), "Rejected as expected: {}", e);
        }
        other => other?,
    }
    board.settled().await?;

    // another terminal updates B2
    let mut b2 = store.get("B2").unwrap_or_else(|| OrderSnapshot::new("B2", "#102", OrderChannel::Takeaway, start));
    b2.attendant_name = Some("Marta".to_string());
    store.replace(&config.scope_id, b2);

    // payment write fails and is reverted
    store.fail_next_writes(1);
    board.toggle_paid("C3").await?;

    // a new order from the capture flow
    let d4 = OrderSnapshot::new("D4", "#104", OrderChannel::Takeaway, clock.now_millis());
    store.insert(&config.scope_id, d4.clone());
    board.adopt(d4).await?;

    board.settled().await?;
    clock.advance(Duration::from_secs(25 * 60));
    tokio::time::sleep(config.tick_interval() * 2).await;

    println!("{}", serde_json::to_string_pretty(&board.view())?);
    board.shutdown().await;

    if let Some(a1) = store.get("A1") {
        println!(
            "A1 {} after {}s, table T7 free: {}",
            a1.status,
            a1.elapsed_seconds.unwrap_or_default(),
            tables.table("T7").is_some_and(|t| t.is_free())
        );
    }
    Ok(())
}
