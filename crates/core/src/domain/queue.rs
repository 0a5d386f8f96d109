//! Priority ordering and the pending work queue.
//!
//! Orders are served by class rank (highest first), then by creation time
//! (oldest first), then by id so that same-millisecond submissions still
//! have a deterministic order.

use crate::domain::order::{Order, OrderId};
use std::cmp::Ordering;

/// Total order used for dispatch: rank desc, created_at asc, id asc
pub fn priority_order(a: &Order, b: &Order) -> Ordering {
    b.rank()
        .cmp(&a.rank())
        .then_with(|| a.created_at.cmp(&b.created_at))
        .then_with(|| a.id.cmp(&b.id))
}

/// Sort orders in place by dispatch priority
pub fn sort_by_priority(orders: &mut [Order]) {
    orders.sort_by(priority_order);
}

/// Pending orders kept in dispatch order
#[derive(Debug, Default, Clone)]
pub struct WorkQueue {
    orders: Vec<Order>,
}

impl WorkQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an order at its priority position
    pub fn enqueue(&mut self, order: Order) {
        let pos = self
            .orders
            .partition_point(|queued| priority_order(queued, &order) == Ordering::Less);
        self.orders.insert(pos, order);
    }

    /// Remove an order by id. Missing ids are a no-op.
    pub fn dequeue_by_id(&mut self, id: OrderId) -> Option<Order> {
        let pos = self.orders.iter().position(|o| o.id == id)?;
        Some(self.orders.remove(pos))
    }

    /// The order that would be dispatched next
    pub fn peek_highest(&self) -> Option<&Order> {
        self.orders.first()
    }

    pub fn find_by_id(&self, id: OrderId) -> Option<&Order> {
        self.orders.iter().find(|o| o.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Order> {
        self.orders.iter()
    }

    pub fn len(&self) -> usize {
        self.orders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::order::{PriorityClass, NORMAL, PRIORITY, TOP_PRIORITY};

    fn order(id: OrderId, rank: u32, created_at: i64) -> Order {
        let name = match rank {
            1 => NORMAL,
            2 => PRIORITY,
            _ => TOP_PRIORITY,
        };
        Order::new(id, PriorityClass::new(name, name, rank), created_at)
    }

    fn ids(queue: &WorkQueue) -> Vec<OrderId> {
        queue.iter().map(|o| o.id).collect()
    }

    #[test]
    fn test_rank_beats_age() {
        let old_normal = order(1, 1, 100);
        let new_vip = order(2, 2, 200);
        assert_eq!(priority_order(&new_vip, &old_normal), Ordering::Less);
    }

    #[test]
    fn test_same_rank_is_fifo_then_by_id() {
        let mut orders = vec![order(3, 1, 200), order(2, 1, 100), order(1, 1, 200)];
        sort_by_priority(&mut orders);
        let sorted: Vec<OrderId> = orders.iter().map(|o| o.id).collect();
        assert_eq!(sorted, vec![2, 1, 3]);
    }

    #[test]
    fn test_enqueue_keeps_priority_order() {
        let mut queue = WorkQueue::new();
        queue.enqueue(order(1, 1, 10));
        queue.enqueue(order(2, 2, 20));
        queue.enqueue(order(3, 1, 30));
        queue.enqueue(order(4, 3, 40));
        queue.enqueue(order(5, 2, 50));

        assert_eq!(ids(&queue), vec![4, 2, 5, 1, 3]);
        assert_eq!(queue.peek_highest().map(|o| o.id), Some(4));
    }

    #[test]
    fn test_requeued_order_returns_to_original_slot() {
        let mut queue = WorkQueue::new();
        queue.enqueue(order(2, 1, 20));
        queue.enqueue(order(3, 1, 30));

        // Order 1 was created first and comes back after a bot was removed
        queue.enqueue(order(1, 1, 10));
        assert_eq!(ids(&queue), vec![1, 2, 3]);
    }

    #[test]
    fn test_dequeue_missing_is_noop() {
        let mut queue = WorkQueue::new();
        queue.enqueue(order(1, 1, 10));

        assert!(queue.dequeue_by_id(42).is_none());
        assert_eq!(queue.len(), 1);

        assert_eq!(queue.dequeue_by_id(1).map(|o| o.id), Some(1));
        assert!(queue.is_empty());
        assert!(queue.peek_highest().is_none());
    }

    #[test]
    fn test_sort_is_stable_under_repetition() {
        let mut orders = vec![order(1, 2, 5), order(2, 3, 5), order(3, 2, 5)];
        sort_by_priority(&mut orders);
        let first: Vec<OrderId> = orders.iter().map(|o| o.id).collect();
        sort_by_priority(&mut orders);
        let second: Vec<OrderId> = orders.iter().map(|o| o.id).collect();
        assert_eq!(first, second);
        assert_eq!(first, vec![2, 1, 3]);
    }
}
