// Order Domain Model

use crate::domain::error::{DomainError, Result};
use serde::{Deserialize, Serialize};

/// Order ID (monotonically increasing, never reused)
pub type OrderId = u64;

/// Class rank (higher number = served first)
pub type Rank = u32;

pub const NORMAL: &str = "NORMAL";
pub const PRIORITY: &str = "PRIORITY";
pub const TOP_PRIORITY: &str = "TOP_PRIORITY";

/// Order State
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderState {
    Pending,
    Processing,
    Complete,
}

impl std::fmt::Display for OrderState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderState::Pending => write!(f, "PENDING"),
            OrderState::Processing => write!(f, "PROCESSING"),
            OrderState::Complete => write!(f, "COMPLETE"),
        }
    }
}

/// Priority class an order is submitted under
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriorityClass {
    pub name: String,
    pub label: String,
    pub rank: Rank,
}

impl PriorityClass {
    pub fn new(name: impl Into<String>, label: impl Into<String>, rank: Rank) -> Self {
        Self {
            name: name.into(),
            label: label.into(),
            rank,
        }
    }
}

/// The set of classes accepted on submit.
///
/// Lookups are case-insensitive. Registering a class whose name already
/// exists replaces the previous definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassRegistry {
    classes: Vec<PriorityClass>,
}

impl Default for ClassRegistry {
    fn default() -> Self {
        Self::empty()
            .with_class(PriorityClass::new(NORMAL, "Normal", 1))
            .with_class(PriorityClass::new(PRIORITY, "Priority", 2))
            .with_class(PriorityClass::new(TOP_PRIORITY, "Top Priority", 3))
    }
}

impl ClassRegistry {
    pub fn empty() -> Self {
        Self {
            classes: Vec::new(),
        }
    }

    pub fn with_class(mut self, class: PriorityClass) -> Self {
        self.register(class);
        self
    }

    pub fn register(&mut self, class: PriorityClass) {
        match self
            .classes
            .iter_mut()
            .find(|c| c.name.eq_ignore_ascii_case(&class.name))
        {
            Some(existing) => *existing = class,
            None => self.classes.push(class),
        }
    }

    /// Resolve a class by name
    pub fn lookup(&self, name: &str) -> Result<&PriorityClass> {
        let wanted = name.trim();
        self.classes
            .iter()
            .find(|c| c.name.eq_ignore_ascii_case(wanted))
            .ok_or_else(|| DomainError::InvalidClass(name.to_string()))
    }

    /// Registered classes, highest rank first
    pub fn by_rank(&self) -> Vec<&PriorityClass> {
        let mut classes: Vec<&PriorityClass> = self.classes.iter().collect();
        classes.sort_by(|a, b| b.rank.cmp(&a.rank).then_with(|| a.name.cmp(&b.name)));
        classes
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}

/// Order Entity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub class: PriorityClass,
    pub state: OrderState,

    pub created_at: i64, // epoch ms, tie-breaker only
    pub started_at: Option<i64>,
    pub completed_at: Option<i64>,
}

impl Order {
    /// Create a pending order
    ///
    /// # Arguments
    ///
    /// * `id` - Unique order ID (injected by the store counter)
    /// * `class` - Resolved priority class
    /// * `created_at` - Creation timestamp in epoch ms (injected, not system time)
    pub fn new(id: OrderId, class: PriorityClass, created_at: i64) -> Self {
        Self {
            id,
            class,
            state: OrderState::Pending,
            created_at,
            started_at: None,
            completed_at: None,
        }
    }

    pub fn rank(&self) -> Rank {
        self.class.rank
    }

    /// Transition to Processing with explicit timestamp
    pub fn start(&mut self, now_millis: i64) -> Result<()> {
        self.transition(OrderState::Pending, OrderState::Processing)?;
        self.started_at = Some(now_millis);
        Ok(())
    }

    /// Transition to Complete with explicit timestamp
    pub fn complete(&mut self, now_millis: i64) -> Result<()> {
        self.transition(OrderState::Processing, OrderState::Complete)?;
        self.completed_at = Some(now_millis);
        Ok(())
    }

    /// Return a processing order to Pending. Class and `created_at` are kept.
    pub fn requeue(&mut self) -> Result<()> {
        self.transition(OrderState::Processing, OrderState::Pending)?;
        self.started_at = None;
        Ok(())
    }

    fn transition(&mut self, expected: OrderState, to: OrderState) -> Result<()> {
        if self.state != expected {
            return Err(DomainError::InvalidStateTransition {
                entity: format!("order {}", self.id),
                from: self.state.to_string(),
                to: to.to_string(),
            });
        }
        self.state = to;
        Ok(())
    }
}
