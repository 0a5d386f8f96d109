//! Dispatcher - reconciles the pending queue with the bot pool
//!
//! Every mutating operation (submit, add bot, remove bot, completion) takes
//! the store lock once, applies its change, and runs a full reconciliation
//! step before releasing it. Reconciliation pairs idle bots with the
//! highest-priority pending orders and arms one completion timer per
//! assignment. Timers are Tokio tasks; a timer whose bot was removed is
//! aborted, and a timer that still fires after losing its slot is rejected
//! by ticket.
//!
//! A mutation is committed before reconciliation runs. If reconciliation
//! hits an invariant violation it stops without touching the store, and the
//! caller gets the error while its own change stands.

use crate::application::store::{Assignment, BotRemoval, DispatchSnapshot, LifecycleStore, TimerTicket};
use crate::config::DispatchConfig;
use crate::domain::{Bot, BotId, DomainError, Order, OrderId, PriorityClass};
use crate::error::{AppError, Result};
use crate::port::TimeProvider;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use tokio::runtime::Handle;
use tracing::{debug, error, info, warn};

/// Cheap to clone; all clones share one store.
#[derive(Clone)]
pub struct Dispatcher {
    inner: Arc<Inner>,
}

struct Inner {
    store: Mutex<LifecycleStore>,
    config: DispatchConfig,
    time_provider: Arc<dyn TimeProvider>,
    runtime: Handle,
    shut_down: AtomicBool,
}

impl Drop for Inner {
    fn drop(&mut self) {
        let store = self
            .store
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner);
        let cancelled = store.cancel_all_timers();
        if cancelled > 0 {
            debug!(cancelled, "Dispatcher dropped, timers cancelled");
        }
    }
}

impl Dispatcher {
    /// Create a dispatcher on the current Tokio runtime
    pub fn new(config: DispatchConfig, time_provider: Arc<dyn TimeProvider>) -> Result<Self> {
        let runtime = Handle::try_current().map_err(|e| {
            AppError::Config(format!("dispatcher must be created inside a Tokio runtime: {}", e))
        })?;
        Ok(Self::with_runtime(config, time_provider, runtime))
    }

    /// Create a dispatcher whose timers run on `runtime`
    pub fn with_runtime(
        config: DispatchConfig,
        time_provider: Arc<dyn TimeProvider>,
        runtime: Handle,
    ) -> Self {
        info!(
            processing_duration_ms = config.processing_duration_ms(),
            classes = config.classes.len(),
            "Dispatcher created"
        );
        Self {
            inner: Arc::new(Inner {
                store: Mutex::new(LifecycleStore::new(config.classes.clone())),
                config,
                time_provider,
                runtime,
                shut_down: AtomicBool::new(false),
            }),
        }
    }

    pub fn config(&self) -> &DispatchConfig {
        &self.inner.config
    }

    /// Submit an order of the named class
    pub fn submit_item(&self, class_name: &str) -> Result<OrderId> {
        self.submit_order(class_name).map(|order| order.id)
    }

    /// Submit an order and return it as it stands once reconciliation ran,
    /// so its state is already `PROCESSING` if a bot was idle.
    pub fn submit_order(&self, class_name: &str) -> Result<Order> {
        let mut store = self.lock_store();
        // Read under the lock so ids and creation times share one order
        let now = self.inner.time_provider.now_millis();
        let order_id = store.submit(class_name, now).map_err(|e| {
            warn!(class = class_name, error = %e, "Order rejected");
            AppError::from(e)
        })?;
        self.reconcile(&mut store)?;
        store.find_order(order_id).ok_or_else(|| {
            AppError::from(DomainError::InvariantViolation(format!(
                "order {} missing right after submit",
                order_id
            )))
        })
    }

    /// Add an idle bot; it picks up pending work before this returns.
    ///
    /// Only fails if reconciliation detects an invariant violation. The bot
    /// is added either way.
    pub fn add_worker(&self) -> Result<BotId> {
        let mut store = self.lock_store();
        let bot_id = store.add_bot();
        self.reconcile(&mut store)?;
        Ok(bot_id)
    }

    /// Remove the newest bot. `Ok(None)` if there are no bots.
    ///
    /// A reconciliation error is returned after the removal took effect.
    pub fn remove_worker(&self) -> Result<Option<BotRemoval>> {
        let mut store = self.lock_store();
        let Some(removal) = store.remove_newest_bot() else {
            return Ok(None);
        };
        self.reconcile(&mut store)?;
        Ok(Some(removal))
    }

    /// Cancel all armed timers and stop assigning new work.
    ///
    /// Submissions and bot changes are still accepted and observable.
    pub fn shutdown(&self) -> usize {
        self.inner.shut_down.store(true, Ordering::SeqCst);
        let cancelled = self.lock_store().cancel_all_timers();
        info!(cancelled, "Dispatcher shut down");
        cancelled
    }

    pub fn is_shut_down(&self) -> bool {
        self.inner.shut_down.load(Ordering::SeqCst)
    }

    pub fn list_pending(&self) -> Vec<Order> {
        self.lock_store().pending()
    }

    pub fn list_processing(&self) -> Vec<Order> {
        self.lock_store().processing()
    }

    pub fn list_complete(&self) -> Vec<Order> {
        self.lock_store().completed()
    }

    pub fn list_workers(&self) -> Vec<Bot> {
        self.lock_store().bots()
    }

    pub fn busy_workers(&self) -> Vec<Bot> {
        self.lock_store().busy_bots()
    }

    pub fn find_order(&self, order_id: OrderId) -> Option<Order> {
        self.lock_store().find_order(order_id)
    }

    pub fn snapshot(&self) -> DispatchSnapshot {
        self.lock_store().snapshot()
    }

    /// Registered classes, highest rank first
    pub fn classes(&self) -> Vec<PriorityClass> {
        self.inner.config.classes.by_rank().into_iter().cloned().collect()
    }

    /// Check the store's cross-collection invariants
    pub fn check_invariants(&self) -> Result<()> {
        self.lock_store().check_invariants().map_err(AppError::from)
    }

    fn lock_store(&self) -> MutexGuard<'_, LifecycleStore> {
        self.inner
            .store
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// One reconciliation step: assign until no idle bot or no pending order
    fn reconcile(&self, store: &mut LifecycleStore) -> Result<usize> {
        if self.is_shut_down() {
            return Ok(0);
        }

        let mut started = 0;
        loop {
            let now = self.inner.time_provider.now_millis();
            match store.next_assignment(now) {
                Ok(Some(assignment)) => {
                    self.arm_timer(store, assignment);
                    started += 1;
                }
                Ok(None) => break,
                Err(e) => {
                    error!(error = %e, started, "Reconciliation aborted");
                    return Err(e.into());
                }
            }
        }
        if started > 0 {
            debug!(started, "Reconciliation step finished");
        }
        Ok(started)
    }

    fn arm_timer(&self, store: &mut LifecycleStore, assignment: Assignment) {
        let Assignment {
            bot_id,
            order_id,
            ticket,
        } = assignment;
        let deadline = tokio::time::Instant::now() + self.inner.config.processing_duration;
        let weak: Weak<Inner> = Arc::downgrade(&self.inner);

        let task = self.inner.runtime.spawn(async move {
            tokio::time::sleep_until(deadline).await;
            if let Some(inner) = weak.upgrade() {
                Dispatcher { inner }.on_timer_expired(bot_id, order_id, ticket);
            }
        });
        store.attach_timer(bot_id, ticket, task.abort_handle());
    }

    fn on_timer_expired(&self, bot_id: BotId, order_id: OrderId, ticket: TimerTicket) {
        let now = self.inner.time_provider.now_millis();
        let mut store = self.lock_store();
        match store.complete(bot_id, order_id, ticket, now) {
            Ok(true) => {
                if let Err(e) = self.reconcile(&mut store) {
                    error!(bot_id, error = %e, "Reconciliation after completion failed");
                }
            }
            Ok(false) => debug!(bot_id, order_id, ticket, "Stale timer ignored"),
            Err(e) => error!(bot_id, order_id, error = %e, "Completion failed"),
        }
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("config", &self.inner.config)
            .field("shut_down", &self.is_shut_down())
            .finish_non_exhaustive()
    }
}
