//! Synchronous, type-indexed publish/subscribe
//!
//! Handlers run inside [`EventBus::publish`], in subscription order, before it
//! returns. Nothing is queued across frames. A handler gets the event and the
//! registry but not the bus, so it cannot change the handler list it is being
//! called from.
//!
//! Handlers registered inside [`EventBus::subscribe_for`] remember their owner
//! and can be dropped together with [`EventBus::unsubscribe_owner`].

use std::any::{type_name, Any, TypeId};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use anyhow::{Context, Result};

use super::Registry;

/// Marker trait for event payloads
pub trait Event: 'static {}

type Handler<E> = Box<dyn FnMut(&E, &mut Registry) -> Result<()>>;

struct Subscription<E: Event> {
    owner: Option<TypeId>,
    handler: Handler<E>,
}

struct HandlerList<E: Event> {
    subscriptions: Vec<Subscription<E>>,
}

/// Type-erased view of one event type's handler list.
trait Subscribers {
    fn len(&self) -> usize;
    /// Drops the handlers `owner` registered; returns how many went.
    fn drop_owner(&mut self, owner: TypeId) -> usize;
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<E: Event> Subscribers for HandlerList<E> {
    fn len(&self) -> usize {
        self.subscriptions.len()
    }

    fn drop_owner(&mut self, owner: TypeId) -> usize {
        let before = self.subscriptions.len();
        self.subscriptions
            .retain(|subscription| subscription.owner != Some(owner));
        before - self.subscriptions.len()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[derive(Default)]
pub struct EventBus {
    subscribers: HashMap<TypeId, Box<dyn Subscribers>>,
    /// Owner stamped on new subscriptions while inside `subscribe_for`.
    owner: Option<TypeId>,
}

impl EventBus {
    pub fn new() -> Self {
        log::debug!("event bus created");
        Self::default()
    }

    /// Appends a handler for `E`, creating `E`'s list on first use.
    pub fn subscribe<E, F>(&mut self, handler: F)
    where
        E: Event,
        F: FnMut(&E, &mut Registry) -> Result<()> + 'static,
    {
        let owner = self.owner;
        self.list_mut::<E>().subscriptions.push(Subscription {
            owner,
            handler: Box::new(handler),
        });
        log::trace!("subscribed handler to `{}`", type_name::<E>());
    }

    /// Binds a callback to shared owner state, the handler form systems with
    /// their own state use.
    pub fn subscribe_owned<E, O>(
        &mut self,
        owner: Rc<RefCell<O>>,
        callback: fn(&mut O, &E, &mut Registry) -> Result<()>,
    ) where
        E: Event,
        O: 'static,
    {
        self.subscribe::<E, _>(move |event, registry| {
            callback(&mut owner.borrow_mut(), event, registry)
        });
    }

    /// Runs `register` with every subscription it makes attributed to `owner`.
    pub fn subscribe_for<F>(&mut self, owner: TypeId, register: F)
    where
        F: FnOnce(&mut EventBus),
    {
        let previous = self.owner.replace(owner);
        register(self);
        self.owner = previous;
    }

    /// Drops every handler for `E`.
    pub fn unsubscribe<E: Event>(&mut self) {
        if let Some(list) = self.list_opt_mut::<E>() {
            log::trace!(
                "dropping {} handler(s) for `{}`",
                list.subscriptions.len(),
                type_name::<E>()
            );
            list.subscriptions.clear();
        }
    }

    /// Drops the handlers registered on behalf of `owner`, across all event
    /// types. Returns how many were removed.
    pub fn unsubscribe_owner(&mut self, owner: TypeId) -> usize {
        let removed = self
            .subscribers
            .values_mut()
            .map(|list| list.drop_owner(owner))
            .sum();
        log::trace!("dropped {removed} owned handler(s)");
        removed
    }

    /// Runs every `E` handler with `event`; returns how many ran.
    ///
    /// Stops at the first handler that fails and returns its error.
    pub fn publish<E: Event>(&mut self, registry: &mut Registry, event: E) -> Result<usize> {
        let Some(list) = self.list_opt_mut::<E>() else {
            return Ok(0);
        };
        for (index, subscription) in list.subscriptions.iter_mut().enumerate() {
            (subscription.handler)(&event, registry).with_context(|| {
                format!("handler #{index} for `{}` failed", type_name::<E>())
            })?;
        }
        Ok(list.subscriptions.len())
    }

    pub fn handler_count<E: Event>(&self) -> usize {
        self.subscribers
            .get(&TypeId::of::<E>())
            .map_or(0, |list| list.len())
    }

    /// Clears all subscriptions for every event type.
    pub fn reset(&mut self) {
        self.subscribers.clear();
    }

    fn list_opt_mut<E: Event>(&mut self) -> Option<&mut HandlerList<E>> {
        self.subscribers
            .get_mut(&TypeId::of::<E>())
            .and_then(|list| list.as_any_mut().downcast_mut::<HandlerList<E>>())
    }

    fn list_mut<E: Event>(&mut self) -> &mut HandlerList<E> {
        self.subscribers
            .entry(TypeId::of::<E>())
            .or_insert_with(|| {
                Box::new(HandlerList::<E> {
                    subscriptions: Vec::new(),
                })
            })
            .as_any_mut()
            .downcast_mut::<HandlerList<E>>()
            .expect("handler list stored under the wrong event type")
    }
}
