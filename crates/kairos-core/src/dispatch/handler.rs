use std::fmt;
use std::sync::Arc;

use arc_swap::ArcSwapOption;

use super::{Dispatcher, NodeEvent};
use crate::{Error, Result};

type Callback = Box<dyn Fn(&NodeEvent) + Send + Sync>;

/// A script callback together with the number of arguments it declares.
pub struct Handler {
    arity: usize,
    callback: Callback,
}

impl Handler {
    pub fn new(arity: usize, callback: impl Fn(&NodeEvent) + Send + Sync + 'static) -> Self {
        Self {
            arity,
            callback: Box::new(callback),
        }
    }

    pub fn arity(&self) -> usize {
        self.arity
    }

    pub fn call(&self, event: &NodeEvent) {
        (self.callback)(event)
    }
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handler").field("arity", &self.arity).finish()
    }
}

/// Atomically replaceable handler registration (`onBeat`, `onCount`, ...).
#[derive(Debug)]
pub struct HandlerSlot {
    name: &'static str,
    arity: usize,
    handler: ArcSwapOption<Handler>,
}

impl HandlerSlot {
    /// A slot accepting handlers that take exactly `arity` arguments.
    pub fn new(name: &'static str, arity: usize) -> Self {
        Self {
            name,
            arity,
            handler: ArcSwapOption::empty(),
        }
    }

    pub fn set(&self, handler: Handler) -> Result<()> {
        if handler.arity() != self.arity {
            return Err(Error::HandlerArity {
                handler: self.name,
                expected: self.arity,
                found: handler.arity(),
            });
        }
        self.handler.store(Some(Arc::new(handler)));
        Ok(())
    }

    pub fn clear(&self) {
        self.handler.store(None);
    }

    pub fn is_set(&self) -> bool {
        self.handler.load().is_some()
    }

    /// Queue `event` for the registered handler, if any (audio thread).
    pub fn notify(&self, dispatcher: &Dispatcher, event: NodeEvent) -> bool {
        match self.handler.load_full() {
            Some(handler) => dispatcher.dispatch(handler, event),
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::notification_channel;

    #[test]
    fn test_arity_checked_on_register() {
        let slot = HandlerSlot::new("beat", 1);
        let err = slot.set(Handler::new(2, |_| {})).unwrap_err();
        assert!(matches!(
            err,
            Error::HandlerArity {
                handler: "beat",
                expected: 1,
                found: 2
            }
        ));
        assert!(!slot.is_set());
        slot.set(Handler::new(1, |_| {})).unwrap();
        assert!(slot.is_set());
    }

    #[test]
    fn test_notify_without_handler_is_noop() {
        let (dispatcher, events) = notification_channel(4);
        let slot = HandlerSlot::new("count", 1);
        assert!(!slot.notify(&dispatcher, NodeEvent::Count { count: 1 }));
        assert_eq!(events.pending(), 0);
    }

    #[test]
    fn test_clear_releases_handler() {
        let slot = HandlerSlot::new("count", 1);
        slot.set(Handler::new(1, |_| {})).unwrap();
        slot.clear();
        assert!(!slot.is_set());
    }
}
