//! Event bus for decoupled communication between the controller and the UI.
//!
//! The bus is single-threaded (WASM constraint) and uses interior mutability
//! via RefCell. Events are delivered synchronously to subscribers of the chat
//! they concern. While nobody is subscribed they are buffered instead, for
//! hosts that poll with `drain`; the buffer keeps the newest
//! [`MAX_BUFFERED`] events.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;
use chat_types::event::ChatEvent;

pub type SubscriptionId = u64;

pub const MAX_BUFFERED: usize = 256;

type Callback = Rc<dyn Fn(&ChatEvent)>;

struct Subscriber {
    id: SubscriptionId,
    /// `None` receives every event, notices included
    chat_id: Option<String>,
    callback: Callback,
}

#[derive(Default)]
struct Inner {
    queue: RefCell<VecDeque<ChatEvent>>,
    subscribers: RefCell<Vec<Subscriber>>,
    next_id: Cell<SubscriptionId>,
}

/// Shared event bus, clone-cheap via Rc.
#[derive(Clone, Default)]
pub struct EventBus {
    inner: Rc<Inner>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish an event to matching subscribers, or buffer it when there
    /// are none at all.
    pub fn emit(&self, event: ChatEvent) {
        let (targets, unobserved): (Vec<Callback>, bool) = {
            let subscribers = self.inner.subscribers.borrow();
            let targets = subscribers
                .iter()
                .filter(|s| match (&s.chat_id, event.chat_id()) {
                    (None, _) => true,
                    (Some(wanted), Some(actual)) => wanted == actual,
                    (Some(_), None) => false,
                })
                .map(|s| s.callback.clone())
                .collect();
            (targets, subscribers.is_empty())
        };

        if unobserved {
            let mut queue = self.inner.queue.borrow_mut();
            if queue.len() == MAX_BUFFERED {
                queue.pop_front();
            }
            queue.push_back(event);
            return;
        }

        // Callbacks run outside the borrow so they may (un)subscribe.
        for callback in targets {
            callback(&event);
        }
    }

    /// Drain buffered events. Called by polling consumers.
    pub fn drain(&self) -> Vec<ChatEvent> {
        self.inner.queue.borrow_mut().drain(..).collect()
    }

    pub fn has_pending(&self) -> bool {
        !self.inner.queue.borrow().is_empty()
    }

    /// Watch one chat's message range.
    pub fn subscribe(&self, chat_id: &str, callback: impl Fn(&ChatEvent) + 'static) -> SubscriptionId {
        self.add_subscriber(Some(chat_id.to_string()), Rc::new(callback))
    }

    /// Receive every event, including notices.
    pub fn subscribe_all(&self, callback: impl Fn(&ChatEvent) + 'static) -> SubscriptionId {
        self.add_subscriber(None, Rc::new(callback))
    }

    /// Returns false if `id` was not subscribed.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subscribers = self.inner.subscribers.borrow_mut();
        let before = subscribers.len();
        subscribers.retain(|s| s.id != id);
        subscribers.len() != before
    }

    fn add_subscriber(&self, chat_id: Option<String>, callback: Callback) -> SubscriptionId {
        let id = self.inner.next_id.get() + 1;
        self.inner.next_id.set(id);
        self.inner.subscribers.borrow_mut().push(Subscriber { id, chat_id, callback });
        id
    }
}
