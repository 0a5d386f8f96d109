//! End-to-end dispatch scenarios
//!
//! Runs on Tokio's paused clock: sleeping in the test lets completion
//! timers fire in deadline order without real waiting.

use std::sync::Arc;
use std::time::Duration;

use dispatch_core::domain::order::{NORMAL, PRIORITY, TOP_PRIORITY};
use dispatch_core::domain::{BotState, OrderId, OrderState};
use dispatch_core::port::time_provider::mocks::ManualClock;
use dispatch_core::{DispatchConfig, Dispatcher, PROCESSING_DURATION_MS};

struct Harness {
    dispatcher: Dispatcher,
    clock: Arc<ManualClock>,
}

impl Harness {
    fn new() -> Self {
        let clock = Arc::new(ManualClock::new(1_700_000_000_000));
        let dispatcher = Dispatcher::new(DispatchConfig::default(), clock.clone()).unwrap();
        Self { dispatcher, clock }
    }

    /// Submit with a distinct creation timestamp
    fn submit(&self, class: &str) -> OrderId {
        self.clock.advance(1);
        self.dispatcher.submit_item(class).unwrap()
    }

    /// Let exactly one round of processing finish
    async fn finish_round(&self) {
        tokio::time::sleep(Duration::from_millis(PROCESSING_DURATION_MS + 1)).await;
        self.clock.advance(PROCESSING_DURATION_MS as i64);
        self.dispatcher.check_invariants().unwrap();
    }

    fn pending(&self) -> Vec<OrderId> {
        self.dispatcher.list_pending().iter().map(|o| o.id).collect()
    }

    fn processing(&self) -> Vec<OrderId> {
        self.dispatcher.list_processing().iter().map(|o| o.id).collect()
    }

    fn complete(&self) -> Vec<OrderId> {
        self.dispatcher.list_complete().iter().map(|o| o.id).collect()
    }
}

#[tokio::test(start_paused = true)]
async fn test_scenario_a_single_order_single_bot() {
    let h = Harness::new();
    assert_eq!(h.submit(NORMAL), 1);
    let bot_id = h.dispatcher.add_worker().unwrap();

    let bots = h.dispatcher.list_workers();
    assert_eq!(bots.len(), 1);
    assert_eq!(bots[0].id, bot_id);
    assert_eq!(bots[0].state, BotState::Busy);
    assert_eq!(bots[0].current_order_id, Some(1));
    assert!(h.pending().is_empty());

    h.finish_round().await;
    assert_eq!(h.complete(), vec![1]);
    assert!(h.dispatcher.list_workers()[0].is_idle());
}

#[tokio::test(start_paused = true)]
async fn test_scenario_b_priority_served_first() {
    let h = Harness::new();
    h.submit(NORMAL);
    h.submit(PRIORITY);
    h.dispatcher.add_worker().unwrap();

    assert_eq!(h.dispatcher.list_workers()[0].current_order_id, Some(2));
    assert_eq!(h.pending(), vec![1]);
}

#[tokio::test(start_paused = true)]
async fn test_scenario_c_processing_order_across_completions() {
    let h = Harness::new();
    h.submit(NORMAL);
    h.submit(PRIORITY);
    h.submit(NORMAL);
    h.submit(TOP_PRIORITY);
    h.submit(PRIORITY);
    h.dispatcher.add_worker().unwrap();

    let mut started = Vec::new();
    for _ in 0..5 {
        let processing = h.processing();
        assert_eq!(processing.len(), 1);
        started.push(processing[0]);
        h.finish_round().await;
    }

    assert_eq!(started, vec![4, 2, 5, 1, 3]);
    assert_eq!(h.complete(), vec![4, 2, 5, 1, 3]);
    assert!(h.pending().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_scenario_d_one_order_two_bots() {
    let h = Harness::new();
    h.submit(NORMAL);
    h.dispatcher.add_worker().unwrap();
    h.dispatcher.add_worker().unwrap();

    let bots = h.dispatcher.list_workers();
    let holders: Vec<_> = bots.iter().filter(|b| b.current_order_id == Some(1)).collect();
    assert_eq!(holders.len(), 1);
    assert_eq!(holders[0].id, 1);
    assert!(bots[1].is_idle());

    // Second bot picks up the next order immediately
    h.submit(NORMAL);
    assert_eq!(h.dispatcher.list_workers()[1].current_order_id, Some(2));
}

#[tokio::test(start_paused = true)]
async fn test_scenario_e_remove_busy_bot_requeues_order() {
    let h = Harness::new();
    h.submit(NORMAL);
    h.dispatcher.add_worker().unwrap();
    let original = h.dispatcher.find_order(1).unwrap();

    let removal = h.dispatcher.remove_worker().unwrap().unwrap();
    assert_eq!(removal.bot_id, 1);
    assert_eq!(removal.requeued_order_id, Some(1));

    assert_eq!(h.pending(), vec![1]);
    assert!(h.dispatcher.list_workers().is_empty());

    // Several processing durations later, nothing completed
    h.finish_round().await;
    h.finish_round().await;
    assert!(h.complete().is_empty());

    let requeued = h.dispatcher.find_order(1).unwrap();
    assert_eq!(requeued.state, OrderState::Pending);
    assert_eq!(requeued.created_at, original.created_at);
    assert_eq!(requeued.class, original.class);
}

#[tokio::test(start_paused = true)]
async fn test_newer_high_priority_does_not_preempt() {
    let h = Harness::new();
    h.submit(NORMAL);
    h.dispatcher.add_worker().unwrap();
    h.submit(TOP_PRIORITY);

    assert_eq!(h.processing(), vec![1]);
    assert_eq!(h.pending(), vec![2]);

    h.finish_round().await;
    assert_eq!(h.complete(), vec![1]);
    assert_eq!(h.processing(), vec![2]);
}

#[tokio::test(start_paused = true)]
async fn test_remove_newest_even_when_idle() {
    let h = Harness::new();
    h.submit(NORMAL);
    h.dispatcher.add_worker().unwrap();
    h.dispatcher.add_worker().unwrap();

    // Bot 2 is idle, bot 1 busy; bot 2 goes
    let removal = h.dispatcher.remove_worker().unwrap().unwrap();
    assert_eq!(removal.bot_id, 2);
    assert_eq!(removal.requeued_order_id, None);
    assert!(!removal.cancelled_timer);
    assert_eq!(h.processing(), vec![1]);
}

#[tokio::test(start_paused = true)]
async fn test_requeued_order_goes_to_remaining_bot() {
    let h = Harness::new();
    h.submit(NORMAL);
    h.submit(PRIORITY);
    h.dispatcher.add_worker().unwrap();
    h.dispatcher.add_worker().unwrap();
    assert_eq!(h.processing(), vec![2, 1]);

    // Both finish at the same deadline
    h.finish_round().await;
    let mut done = h.complete();
    done.sort();
    assert_eq!(done, vec![1, 2]);

    h.submit(NORMAL);
    h.submit(NORMAL);
    assert_eq!(h.processing(), vec![3, 4]);

    let removal = h.dispatcher.remove_worker().unwrap().unwrap();
    assert_eq!(removal.requeued_order_id, Some(4));
    assert_eq!(h.pending(), vec![4]);

    h.finish_round().await;
    assert_eq!(h.complete().last(), Some(&3));
    assert_eq!(h.processing(), vec![4]);
    assert_eq!(h.dispatcher.list_workers()[0].current_order_id, Some(4));
}

#[tokio::test(start_paused = true)]
async fn test_rapid_remove_and_readd_ignores_stale_timer() {
    let h = Harness::new();
    h.submit(NORMAL);
    h.dispatcher.add_worker().unwrap();

    // Halfway through, bot 1 is replaced by a new bot 1 that restarts order 1
    tokio::time::sleep(Duration::from_millis(PROCESSING_DURATION_MS / 2)).await;
    h.dispatcher.remove_worker().unwrap();
    assert_eq!(h.dispatcher.add_worker().unwrap(), 1);
    assert_eq!(h.processing(), vec![1]);

    // The first timer's deadline passes without completing the order
    tokio::time::sleep(Duration::from_millis(PROCESSING_DURATION_MS / 2 + 1)).await;
    assert!(h.complete().is_empty());

    tokio::time::sleep(Duration::from_millis(PROCESSING_DURATION_MS / 2)).await;
    assert_eq!(h.complete(), vec![1]);
}

#[tokio::test(start_paused = true)]
async fn test_same_timestamp_falls_back_to_id() {
    let h = Harness::new();
    // No clock advance between submissions
    for _ in 0..3 {
        h.dispatcher.submit_item(NORMAL).unwrap();
    }
    h.dispatcher.submit_item(PRIORITY).unwrap();
    assert_eq!(h.pending(), vec![4, 1, 2, 3]);
}
