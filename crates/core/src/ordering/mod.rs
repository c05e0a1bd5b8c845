//! User-defined ordering of linked resources, shared between live views.
//!
//! Every [`ResultModel`](crate::model::ResultModel) with a client id holds an
//! [`OrderingSubscription`]. Subscriptions with the same client id are
//! siblings: when one writes a new order, the others are marked stale and
//! reload on their next poll.

pub mod store;

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::{Rc, Weak};

pub use store::{FileOrderStore, MemoryOrderStore, OrderStore, PersistError};

/// Scope key for orderings that do not depend on the current activity.
pub const ALL_ACTIVITIES_SCOPE: &str = "ForAllActivities";

/// `ForActivity-<id>` for a resolved current activity, otherwise
/// [`ALL_ACTIVITIES_SCOPE`].
pub fn scope_key(current_activity: Option<&str>) -> String {
    match current_activity {
        Some(id) => format!("ForActivity-{id}"),
        None => ALL_ACTIVITIES_SCOPE.to_string(),
    }
}

pub type SubscriptionId = u64;

struct Subscriber {
    client_id: String,
    stale: Rc<Cell<bool>>,
}

struct BrokerState {
    store: Box<dyn OrderStore>,
    subscribers: HashMap<SubscriptionId, Subscriber>,
    next_id: SubscriptionId,
}

/// Owner of the order store and registry of live subscriptions.
///
/// Cloning yields another handle to the same broker.
#[derive(Clone)]
pub struct OrderingBroker {
    state: Rc<RefCell<BrokerState>>,
}

impl OrderingBroker {
    pub fn new(store: impl OrderStore + 'static) -> Self {
        Self {
            state: Rc::new(RefCell::new(BrokerState {
                store: Box::new(store),
                subscribers: HashMap::new(),
                next_id: 1,
            })),
        }
    }

    pub fn in_memory() -> Self {
        Self::new(MemoryOrderStore::new())
    }

    /// Register a new live view for `client_id`.
    pub fn subscribe(&self, client_id: &str) -> OrderingSubscription {
        let mut state = self.state.borrow_mut();
        let id = state.next_id;
        state.next_id += 1;

        let stale = Rc::new(Cell::new(false));
        state
            .subscribers
            .insert(id, Subscriber { client_id: client_id.to_string(), stale: stale.clone() });

        OrderingSubscription {
            id,
            client_id: client_id.to_string(),
            stale,
            broker: Rc::downgrade(&self.state),
        }
    }

    /// Number of live subscriptions for `client_id`.
    pub fn subscriber_count(&self, client_id: &str) -> usize {
        self.state.borrow().subscribers.values().filter(|s| s.client_id == client_id).count()
    }
}

impl std::fmt::Debug for OrderingBroker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrderingBroker")
            .field("subscribers", &self.state.borrow().subscribers.len())
            .finish_non_exhaustive()
    }
}

/// One live view's handle on the broker. Unregisters on drop.
#[derive(Debug)]
pub struct OrderingSubscription {
    id: SubscriptionId,
    client_id: String,
    stale: Rc<Cell<bool>>,
    broker: Weak<RefCell<BrokerState>>,
}

impl OrderingSubscription {
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    fn broker(&self) -> Result<Rc<RefCell<BrokerState>>, PersistError> {
        self.broker.upgrade().ok_or(PersistError::BrokerGone)
    }

    /// The stored order for `scope`, if any.
    pub fn load(&self, scope: &str) -> Result<Option<Vec<String>>, PersistError> {
        let broker = self.broker()?;
        let state = broker.borrow();
        state.store.get(&self.client_id, scope)
    }

    /// Store `order` for `scope` and mark every sibling stale.
    pub fn store(&self, scope: &str, order: &[String]) -> Result<(), PersistError> {
        self.write(scope, order, true)
    }

    /// Store `order` for a scope that had none, leaving siblings alone.
    pub fn seed(&self, scope: &str, order: &[String]) -> Result<(), PersistError> {
        self.write(scope, order, false)
    }

    fn write(&self, scope: &str, order: &[String], notify: bool) -> Result<(), PersistError> {
        let broker = self.broker()?;
        let mut state = broker.borrow_mut();
        state.store.set(&self.client_id, scope, order)?;
        if !notify {
            return Ok(());
        }

        for (id, subscriber) in &state.subscribers {
            if *id != self.id && subscriber.client_id == self.client_id {
                subscriber.stale.set(true);
            }
        }
        Ok(())
    }

    /// Whether a sibling changed the order since the last call.
    pub fn take_stale(&self) -> bool {
        self.stale.replace(false)
    }
}

impl Drop for OrderingSubscription {
    fn drop(&mut self) {
        if let Some(broker) = self.broker.upgrade() {
            broker.borrow_mut().subscribers.remove(&self.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scope_key() {
        assert_eq!(scope_key(Some("a1")), "ForActivity-a1");
        assert_eq!(scope_key(None), "ForAllActivities");
    }

    #[test]
    fn test_siblings_are_marked_stale() {
        let broker = OrderingBroker::in_memory();
        let first = broker.subscribe("app");
        let second = broker.subscribe("app");
        let stranger = broker.subscribe("other");

        first.store(ALL_ACTIVITIES_SCOPE, &["/a".to_string()]).unwrap();

        assert!(!first.take_stale());
        assert!(second.take_stale());
        assert!(!second.take_stale());
        assert!(!stranger.take_stale());
        assert_eq!(second.load(ALL_ACTIVITIES_SCOPE).unwrap(), Some(vec!["/a".to_string()]));
    }

    #[test]
    fn test_seed_is_quiet() {
        let broker = OrderingBroker::in_memory();
        let first = broker.subscribe("app");
        let second = broker.subscribe("app");

        first.seed("ForActivity-a1", &["/a".to_string()]).unwrap();
        assert!(!second.take_stale());
        assert_eq!(second.load("ForActivity-a1").unwrap(), Some(vec!["/a".to_string()]));
    }

    #[test]
    fn test_drop_unregisters() {
        let broker = OrderingBroker::in_memory();
        let first = broker.subscribe("app");
        {
            let _second = broker.subscribe("app");
            assert_eq!(broker.subscriber_count("app"), 2);
        }
        assert_eq!(broker.subscriber_count("app"), 1);
        drop(first);
        assert_eq!(broker.subscriber_count("app"), 0);
    }

    #[test]
    fn test_broker_gone() {
        let subscription = OrderingBroker::in_memory().subscribe("app");
        assert!(matches!(subscription.load(ALL_ACTIVITIES_SCOPE), Err(PersistError::BrokerGone)));
    }
}
