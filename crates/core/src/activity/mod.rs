//! Current-activity tracking.
//!
//! Queries that use the `:current` activity need to know which activity is
//! active. The lookup never blocks: until the activity service has answered,
//! [`ActivityContext::current_activity`] returns `None` and callers wait for
//! a [`StatsEvent::CurrentActivityChanged`](crate::watcher::StatsEvent)
//! instead.

use std::cell::RefCell;
use std::rc::Rc;

/// Source of the activity that is current for this process.
pub trait ActivityContext {
    /// The current activity id, or `None` while it is not known yet.
    fn current_activity(&self) -> Option<String>;
}

/// In-process activity context, shared by cloning.
#[derive(Debug, Clone, Default)]
pub struct SharedActivity {
    current: Rc<RefCell<Option<String>>>,
}

impl SharedActivity {
    /// A context whose current activity is not known yet.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_current(activity: impl Into<String>) -> Self {
        let context = Self::new();
        context.set_current(Some(activity.into()));
        context
    }

    pub fn set_current(&self, activity: Option<String>) {
        *self.current.borrow_mut() = activity;
    }
}

impl ActivityContext for SharedActivity {
    fn current_activity(&self) -> Option<String> {
        self.current.borrow().clone()
    }
}
