//! Lifecycle Store - the single owner of dispatch state
//!
//! Holds the pending queue, the processing and complete lists, the bot pool
//! and the registry of armed completion timers. Every state transition is a
//! method here; each either succeeds completely or leaves the store as it was.

use crate::domain::error::{DomainError, Result};
use crate::domain::{Bot, BotId, BotPool, ClassRegistry, Order, OrderId, OrderState, WorkQueue};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use tokio::task::AbortHandle;
use tracing::{debug, error, info};

/// Identifies one armed timer. Never reused within a store.
pub type TimerTicket = u64;

/// An order handed to a bot during reconciliation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Assignment {
    pub bot_id: BotId,
    pub order_id: OrderId,
    pub ticket: TimerTicket,
}

/// Outcome of removing the newest bot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BotRemoval {
    pub bot_id: BotId,
    pub requeued_order_id: Option<OrderId>,
    pub cancelled_timer: bool,
}

/// Consistent copy of all collections at one instant
#[derive(Debug, Clone, Serialize)]
pub struct DispatchSnapshot {
    pub pending: Vec<Order>,
    pub processing: Vec<Order>,
    pub complete: Vec<Order>,
    pub bots: Vec<Bot>,
}

#[derive(Debug)]
struct ArmedTimer {
    order_id: OrderId,
    ticket: TimerTicket,
    abort: Option<AbortHandle>,
}

impl ArmedTimer {
    fn cancel(self) -> bool {
        match self.abort {
            Some(handle) => {
                handle.abort();
                true
            }
            None => false,
        }
    }
}

#[derive(Debug)]
pub struct LifecycleStore {
    classes: ClassRegistry,
    pending: WorkQueue,
    processing: Vec<Order>,
    complete: Vec<Order>,
    bots: BotPool,
    timers: HashMap<BotId, ArmedTimer>,
    last_order_id: OrderId,
    last_ticket: TimerTicket,
}

impl LifecycleStore {
    pub fn new(classes: ClassRegistry) -> Self {
        Self {
            classes,
            pending: WorkQueue::new(),
            processing: Vec::new(),
            complete: Vec::new(),
            bots: BotPool::new(),
            timers: HashMap::new(),
            last_order_id: 0,
            last_ticket: 0,
        }
    }

    /// Create a pending order. Unknown classes are rejected before any mutation.
    pub fn submit(&mut self, class_name: &str, now_millis: i64) -> Result<OrderId> {
        let class = self.classes.lookup(class_name)?.clone();
        self.last_order_id += 1;
        let order = Order::new(self.last_order_id, class, now_millis);

        info!(
            order_id = order.id,
            class = %order.class.name,
            rank = order.rank(),
            "Order submitted"
        );
        self.pending.enqueue(order);
        Ok(self.last_order_id)
    }

    pub fn add_bot(&mut self) -> BotId {
        let bot_id = self.bots.create_worker();
        info!(bot_id, "Bot added");
        bot_id
    }

    /// Remove the newest bot. Its in-flight order goes back to pending and
    /// its timer is cancelled.
    pub fn remove_newest_bot(&mut self) -> Option<BotRemoval> {
        let Some(bot) = self.bots.remove_newest() else {
            debug!("Remove requested on empty bot pool");
            return None;
        };

        let cancelled_timer = self
            .timers
            .remove(&bot.id)
            .map(ArmedTimer::cancel)
            .unwrap_or(false);

        let requeued_order_id = bot
            .current_order_id
            .and_then(|order_id| self.requeue(order_id));

        info!(
            bot_id = bot.id,
            requeued_order_id = ?requeued_order_id,
            cancelled_timer,
            "Bot removed"
        );

        Some(BotRemoval {
            bot_id: bot.id,
            requeued_order_id,
            cancelled_timer,
        })
    }

    fn requeue(&mut self, order_id: OrderId) -> Option<OrderId> {
        let Some(pos) = self.processing.iter().position(|o| o.id == order_id) else {
            error!(order_id, "Removed bot held an order that is not processing");
            return None;
        };
        let mut order = self.processing.remove(pos);
        if let Err(e) = order.requeue() {
            error!(order_id, error = %e, "Failed to requeue order");
            self.processing.insert(pos, order);
            return None;
        }
        info!(order_id, created_at = order.created_at, "Order returned to pending");
        self.pending.enqueue(order);
        Some(order_id)
    }

    /// Pair the lowest-id idle bot with the highest-priority pending order.
    ///
    /// Returns `Ok(None)` when nothing is eligible. On error nothing has
    /// been mutated.
    pub fn next_assignment(&mut self, now_millis: i64) -> Result<Option<Assignment>> {
        let Some(bot_id) = self.bots.find_idle() else {
            return Ok(None);
        };
        let Some(next) = self.pending.peek_highest() else {
            return Ok(None);
        };
        if next.state != OrderState::Pending {
            return Err(DomainError::InvariantViolation(format!(
                "order {} is queued as pending but is {}",
                next.id, next.state
            )));
        }
        let order_id = next.id;

        self.bots.assign(bot_id, order_id, now_millis)?;

        let Some(mut order) = self.pending.dequeue_by_id(order_id) else {
            self.bots.release(bot_id)?;
            return Err(DomainError::InvariantViolation(format!(
                "order {} vanished from the pending queue",
                order_id
            )));
        };
        if let Err(e) = order.start(now_millis) {
            self.bots.release(bot_id)?;
            self.pending.enqueue(order);
            return Err(e);
        }
        self.processing.push(order);

        self.last_ticket += 1;
        let ticket = self.last_ticket;
        self.timers.insert(
            bot_id,
            ArmedTimer {
                order_id,
                ticket,
                abort: None,
            },
        );

        info!(order_id, bot_id, ticket, "Order assigned");
        Ok(Some(Assignment {
            bot_id,
            order_id,
            ticket,
        }))
    }

    /// Record the abort handle of the task backing `ticket`
    pub fn attach_timer(&mut self, bot_id: BotId, ticket: TimerTicket, handle: AbortHandle) {
        match self.timers.get_mut(&bot_id) {
            Some(timer) if timer.ticket == ticket => timer.abort = Some(handle),
            _ => {
                debug!(bot_id, ticket, "Timer no longer registered, aborting");
                handle.abort();
            }
        }
    }

    /// Finish an order whose timer fired.
    ///
    /// Returns `Ok(false)` if the timer is stale: the bot is gone, holds a
    /// different order, or a newer timer replaced this one.
    pub fn complete(
        &mut self,
        bot_id: BotId,
        order_id: OrderId,
        ticket: TimerTicket,
        now_millis: i64,
    ) -> Result<bool> {
        match self.timers.get(&bot_id) {
            Some(timer) if timer.order_id == order_id && timer.ticket == ticket => {}
            _ => return Ok(false),
        }
        if !self.bots.get(bot_id).is_some_and(|b| b.holds(order_id)) {
            return Ok(false);
        }

        let pos = self
            .processing
            .iter()
            .position(|o| o.id == order_id)
            .ok_or_else(|| {
                DomainError::InvariantViolation(format!(
                    "bot {} holds order {} which is not processing",
                    bot_id, order_id
                ))
            })?;

        self.processing[pos].complete(now_millis)?;
        let order = self.processing.remove(pos);
        self.complete.push(order);
        self.timers.remove(&bot_id);
        self.bots.release(bot_id)?;

        info!(order_id, bot_id, "Order completed");
        Ok(true)
    }

    /// Abort every armed timer. Returns how many were cancelled.
    pub fn cancel_all_timers(&mut self) -> usize {
        self.timers
            .drain()
            .map(|(_, timer)| timer.cancel())
            .filter(|cancelled| *cancelled)
            .count()
    }

    pub fn armed_timers(&self) -> usize {
        self.timers.len()
    }

    pub fn classes(&self) -> &ClassRegistry {
        &self.classes
    }

    /// Pending orders in dispatch order
    pub fn pending(&self) -> Vec<Order> {
        self.pending.iter().cloned().collect()
    }

    /// Processing orders in assignment order
    pub fn processing(&self) -> Vec<Order> {
        self.processing.clone()
    }

    /// Complete orders in completion order
    pub fn completed(&self) -> Vec<Order> {
        self.complete.clone()
    }

    /// Bots in ascending id order
    pub fn bots(&self) -> Vec<Bot> {
        self.bots.iter().cloned().collect()
    }

    pub fn busy_bots(&self) -> Vec<Bot> {
        self.bots.busy_workers().into_iter().cloned().collect()
    }

    pub fn find_order(&self, order_id: OrderId) -> Option<Order> {
        self.pending
            .find_by_id(order_id)
            .or_else(|| self.processing.iter().find(|o| o.id == order_id))
            .or_else(|| self.complete.iter().find(|o| o.id == order_id))
            .cloned()
    }

    pub fn snapshot(&self) -> DispatchSnapshot {
        DispatchSnapshot {
            pending: self.pending(),
            processing: self.processing(),
            complete: self.completed(),
            bots: self.bots(),
        }
    }

    /// Verify the cross-collection invariants:
    /// - every order id lives in exactly one collection, with a matching state
    /// - a bot is busy iff it holds an order, and that order is processing
    /// - every processing order is held by exactly one bot
    pub fn check_invariants(&self) -> Result<()> {
        let mut seen = HashSet::new();
        let collections = [
            (OrderState::Pending, self.pending.iter().collect::<Vec<_>>()),
            (OrderState::Processing, self.processing.iter().collect()),
            (OrderState::Complete, self.complete.iter().collect()),
        ];
        for (state, orders) in &collections {
            for order in orders {
                if !seen.insert(order.id) {
                    return Err(violation(format!("order {} is in two collections", order.id)));
                }
                if order.state != *state {
                    return Err(violation(format!(
                        "order {} is {} but stored as {}",
                        order.id, order.state, state
                    )));
                }
            }
        }

        let mut held = HashSet::new();
        for bot in self.bots.iter() {
            if bot.is_idle() != bot.current_order_id.is_none()
                || bot.current_order_id.is_some() != bot.started_at.is_some()
            {
                return Err(violation(format!("bot {} has inconsistent state", bot.id)));
            }
            if let Some(order_id) = bot.current_order_id {
                if !held.insert(order_id) {
                    return Err(violation(format!("order {} is held twice", order_id)));
                }
                if !self.processing.iter().any(|o| o.id == order_id) {
                    return Err(violation(format!(
                        "bot {} holds order {} which is not processing",
                        bot.id, order_id
                    )));
                }
            }
        }
        if held.len() != self.processing.len() {
            return Err(violation(format!(
                "{} processing orders but {} held by bots",
                self.processing.len(),
                held.len()
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
impl LifecycleStore {
    /// Place an order in the pending queue without any state checks
    pub(crate) fn insert_pending_unchecked(&mut self, order: Order) {
        self.pending.enqueue(order);
    }
}

fn violation(msg: String) -> DomainError {
    DomainError::InvariantViolation(msg)
}
