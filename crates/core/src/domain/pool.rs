// Bot Pool - identity and state machine for the set of bots

use crate::domain::bot::{Bot, BotId};
use crate::domain::error::{DomainError, Result};
use crate::domain::order::OrderId;
use std::collections::BTreeMap;

/// Bots keyed by id. Iteration is in ascending id order.
#[derive(Debug, Default, Clone)]
pub struct BotPool {
    bots: BTreeMap<BotId, Bot>,
}

impl BotPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a new idle bot with id `max(existing ids, 0) + 1`
    pub fn create_worker(&mut self) -> BotId {
        let id = self.bots.keys().next_back().copied().unwrap_or(0) + 1;
        self.bots.insert(id, Bot::new(id));
        id
    }

    /// Remove the most recently created bot, busy or not
    pub fn remove_newest(&mut self) -> Option<Bot> {
        self.bots.pop_last().map(|(_, bot)| bot)
    }

    /// Lowest-id idle bot
    pub fn find_idle(&self) -> Option<BotId> {
        self.bots.values().find(|b| b.is_idle()).map(|b| b.id)
    }

    pub fn assign(&mut self, bot_id: BotId, order_id: OrderId, now_millis: i64) -> Result<()> {
        if let Some(holder) = self.bots.values().find(|b| b.holds(order_id)) {
            return Err(DomainError::InvariantViolation(format!(
                "order {} is already held by bot {}",
                order_id, holder.id
            )));
        }
        self.get_mut(bot_id)?.assign(order_id, now_millis)
    }

    pub fn release(&mut self, bot_id: BotId) -> Result<()> {
        self.get_mut(bot_id)?.release();
        Ok(())
    }

    pub fn get(&self, bot_id: BotId) -> Option<&Bot> {
        self.bots.get(&bot_id)
    }

    /// Bots currently processing an order
    pub fn busy_workers(&self) -> Vec<&Bot> {
        self.bots.values().filter(|b| !b.is_idle()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Bot> {
        self.bots.values()
    }

    pub fn len(&self) -> usize {
        self.bots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bots.is_empty()
    }

    fn get_mut(&mut self, bot_id: BotId) -> Result<&mut Bot> {
        self.bots
            .get_mut(&bot_id)
            .ok_or_else(|| DomainError::InvariantViolation(format!("bot {} does not exist", bot_id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_follow_max_plus_one() {
        let mut pool = BotPool::new();
        assert_eq!(pool.create_worker(), 1);
        assert_eq!(pool.create_worker(), 2);
        assert_eq!(pool.create_worker(), 3);

        pool.remove_newest();
        assert_eq!(pool.create_worker(), 3);
    }

    #[test]
    fn test_remove_newest_takes_busy_bot() {
        let mut pool = BotPool::new();
        pool.create_worker();
        pool.create_worker();
        pool.assign(2, 10, 1000).unwrap();

        let removed = pool.remove_newest().unwrap();
        assert_eq!(removed.id, 2);
        assert!(removed.holds(10));
        assert_eq!(pool.len(), 1);
    }

    #[test]
    fn test_remove_from_empty_pool_is_noop() {
        let mut pool = BotPool::new();
        assert!(pool.remove_newest().is_none());
        assert!(pool.is_empty());
    }

    #[test]
    fn test_find_idle_prefers_lowest_id() {
        let mut pool = BotPool::new();
        pool.create_worker();
        pool.create_worker();
        pool.create_worker();
        assert_eq!(pool.find_idle(), Some(1));

        pool.assign(1, 1, 0).unwrap();
        assert_eq!(pool.find_idle(), Some(2));

        pool.assign(2, 2, 0).unwrap();
        pool.assign(3, 3, 0).unwrap();
        assert_eq!(pool.find_idle(), None);
        assert_eq!(pool.busy_workers().len(), 3);

        pool.release(2).unwrap();
        assert_eq!(pool.find_idle(), Some(2));
    }

    #[test]
    fn test_order_cannot_be_held_twice() {
        let mut pool = BotPool::new();
        pool.create_worker();
        pool.create_worker();
        pool.assign(1, 7, 0).unwrap();

        let err = pool.assign(2, 7, 0).unwrap_err();
        assert!(matches!(err, DomainError::InvariantViolation(_)));
        assert!(pool.get(2).unwrap().is_idle());
    }

    #[test]
    fn test_assign_unknown_bot_fails() {
        let mut pool = BotPool::new();
        assert!(pool.assign(5, 1, 0).is_err());
        assert!(pool.release(5).is_err());
    }
}
