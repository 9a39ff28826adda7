use std::{collections::BTreeMap, sync::Arc};

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::{EntityId, VitalKind};

/// The direction a value should be going when crossing a threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThresholdDirection {
    /// The value drops to or below the threshold.
    Falling,
    /// The value rises to or above the threshold.
    Rising,
}

/// A boundary for a vital that something may want to react to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Threshold {
    /// The vital the threshold applies to.
    pub kind: VitalKind,
    /// The boundary value.
    pub value: f32,
    /// The direction the value should be going when crossing the threshold.
    pub direction: ThresholdDirection,
    /// The name of the threshold, like `starving`.
    pub name: String,
    /// A message for the entity whose vital crossed the threshold, if any.
    #[serde(default)]
    pub message: Option<String>,
}

impl Threshold {
    /// Creates a threshold for if a value decreases to the provided value.
    pub fn falling(kind: VitalKind, value: f32, name: impl Into<String>) -> Threshold {
        Threshold {
            kind,
            value,
            direction: ThresholdDirection::Falling,
            name: name.into(),
            message: None,
        }
    }

    /// Creates a threshold for if a value increases to the provided value.
    pub fn rising(kind: VitalKind, value: f32, name: impl Into<String>) -> Threshold {
        Threshold {
            kind,
            value,
            direction: ThresholdDirection::Rising,
            name: name.into(),
            message: None,
        }
    }

    /// Sets the message to send when this threshold is crossed.
    pub fn with_message(mut self, message: impl Into<String>) -> Threshold {
        self.message = Some(message.into());
        self
    }

    /// Determines whether going from `old_value` to `new_value` crosses this threshold.
    ///
    /// Only the change that passes the boundary counts; staying on the far side does not.
    pub fn is_crossed_by(&self, old_value: f32, new_value: f32) -> bool {
        match self.direction {
            ThresholdDirection::Falling => old_value > self.value && new_value <= self.value,
            ThresholdDirection::Rising => old_value < self.value && new_value >= self.value,
        }
    }
}

/// Raised when a change to a vital crosses a threshold.
#[derive(Debug, Clone, PartialEq)]
pub struct ThresholdCrossed {
    /// The entity whose vital changed.
    pub entity: EntityId,
    /// The threshold that was crossed.
    pub threshold: Threshold,
    /// The value before the change.
    pub old_value: f32,
    /// The value after the change.
    pub new_value: f32,
}

/// Which crossings a handler wants to hear about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ThresholdFilter {
    /// Every crossing.
    Any,
    /// Crossings of any threshold for one vital.
    Kind(VitalKind),
    /// Crossings of one specific threshold.
    Named { kind: VitalKind, name: String },
}

impl ThresholdFilter {
    fn matches(&self, crossed: &ThresholdCrossed) -> bool {
        match self {
            ThresholdFilter::Any => true,
            ThresholdFilter::Kind(kind) => *kind == crossed.threshold.kind,
            ThresholdFilter::Named { kind, name } => {
                *kind == crossed.threshold.kind && *name == crossed.threshold.name
            }
        }
    }
}

/// An identifier for a registered threshold handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ThresholdHandlerId(u64);

impl ThresholdHandlerId {
    /// Increments this handler ID's value.
    fn next(self) -> ThresholdHandlerId {
        ThresholdHandlerId(self.0 + 1)
    }
}

/// Signature of a function to handle threshold crossings.
pub type ThresholdHandleFn = Arc<dyn Fn(&ThresholdCrossed) + Send + Sync>;

struct Subscription {
    filter: ThresholdFilter,
    handle_fn: ThresholdHandleFn,
}

struct Subscriptions {
    /// The ID to be assigned to the next registered handler.
    next_id: ThresholdHandlerId,
    /// The handlers, keyed by their assigned IDs, in registration order.
    handlers: BTreeMap<ThresholdHandlerId, Subscription>,
}

/// The set of handlers interested in threshold crossings.
pub struct ThresholdSubscribers {
    subscriptions: RwLock<Subscriptions>,
}

impl Default for ThresholdSubscribers {
    fn default() -> Self {
        Self::new()
    }
}

impl ThresholdSubscribers {
    /// Creates a new, empty set of handlers.
    pub fn new() -> ThresholdSubscribers {
        ThresholdSubscribers {
            subscriptions: RwLock::new(Subscriptions {
                next_id: ThresholdHandlerId(0),
                handlers: BTreeMap::new(),
            }),
        }
    }

    /// Registers the provided handler function. Returns an ID that can be used to remove the handler later.
    pub fn add_handler<F>(&self, filter: ThresholdFilter, handle_fn: F) -> ThresholdHandlerId
    where
        F: Fn(&ThresholdCrossed) + Send + Sync + 'static,
    {
        let mut subscriptions = self.subscriptions.write();
        let id = subscriptions.next_id;
        subscriptions.handlers.insert(
            id,
            Subscription {
                filter,
                handle_fn: Arc::new(handle_fn),
            },
        );
        subscriptions.next_id = id.next();

        id
    }

    /// Removes the handler with the provided ID. Returns whether it was registered.
    pub fn remove_handler(&self, id: ThresholdHandlerId) -> bool {
        self.subscriptions.write().handlers.remove(&id).is_some()
    }

    /// Sends the crossing to every handler whose filter matches it, in registration order.
    ///
    /// Handlers are called without any lock held, so they may add or remove handlers themselves.
    pub fn dispatch(&self, crossed: &ThresholdCrossed) {
        let handle_fns = self
            .subscriptions
            .read()
            .handlers
            .values()
            .filter(|subscription| subscription.filter.matches(crossed))
            .map(|subscription| Arc::clone(&subscription.handle_fn))
            .collect::<Vec<_>>();

        for handle_fn in handle_fns {
            handle_fn(crossed);
        }
    }
}
