//! Synchronous publish/subscribe fan-out.
//!
//! A [`Publisher`] keeps an ordered list of listener handles. `notify` calls
//! each listener in subscription order on the caller's thread. There is no
//! queue: with no subscribers an event is dropped, and a slow listener stalls
//! the publisher.

use std::sync::{Arc, Mutex, PoisonError};

use crate::error::Error;

/// Receives named events from a [`Publisher`].
pub trait Listener<P: ?Sized>: Send + Sync {
    fn on_event(&self, name: &str, payload: &P) -> Result<(), Error>;
}

impl<P, F> Listener<P> for F
where
    P: ?Sized,
    F: Fn(&str, &P) -> Result<(), Error> + Send + Sync,
{
    fn on_event(&self, name: &str, payload: &P) -> Result<(), Error> {
        self(name, payload)
    }
}

/// Ordered, identity-deduplicated set of listeners.
pub struct Publisher<P: ?Sized> {
    listeners: Mutex<Vec<Arc<dyn Listener<P>>>>,
}

impl<P: ?Sized> Default for Publisher<P> {
    fn default() -> Self {
        Self {
            listeners: Mutex::new(Vec::new()),
        }
    }
}

impl<P: ?Sized> Publisher<P> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a listener. Returns false if this exact handle is already subscribed.
    pub fn subscribe(&self, listener: Arc<dyn Listener<P>>) -> bool {
        let mut listeners = self.listeners.lock().unwrap_or_else(PoisonError::into_inner);
        if listeners.iter().any(|l| same_listener(l, &listener)) {
            return false;
        }
        listeners.push(listener);
        true
    }

    /// Remove a listener by identity. Returns false if it wasn't subscribed.
    pub fn unsubscribe(&self, listener: &Arc<dyn Listener<P>>) -> bool {
        let mut listeners = self.listeners.lock().unwrap_or_else(PoisonError::into_inner);
        let before = listeners.len();
        listeners.retain(|l| !same_listener(l, listener));
        listeners.len() != before
    }

    pub fn len(&self) -> usize {
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Deliver `(name, payload)` to every listener in subscription order.
    ///
    /// The first listener error stops delivery and is returned; what to do
    /// with it is up to the caller.
    pub fn notify(&self, name: &str, payload: &P) -> Result<(), Error> {
        // Snapshot so listeners may subscribe/unsubscribe while being called.
        let listeners = self
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        for listener in &listeners {
            listener.on_event(name, payload)?;
        }
        Ok(())
    }
}

fn same_listener<P: ?Sized>(a: &Arc<dyn Listener<P>>, b: &Arc<dyn Listener<P>>) -> bool {
    std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
}

#[cfg(test)]
mod tests {
    use super::*;

    type Log = Arc<Mutex<Vec<String>>>;

    fn recorder(tag: &'static str, log: &Log) -> Arc<dyn Listener<str>> {
        let log = Arc::clone(log);
        Arc::new(move |name: &str, value: &str| -> Result<(), Error> {
            log.lock().unwrap().push(format!("{tag}:{name}={value}"));
            Ok(())
        })
    }

    #[test]
    fn notifies_in_subscription_order() {
        let log: Log = Arc::default();
        let publisher = Publisher::<str>::new();
        publisher.subscribe(recorder("a", &log));
        publisher.subscribe(recorder("b", &log));

        publisher.notify("action", "START").unwrap();

        assert_eq!(
            *log.lock().unwrap(),
            vec!["a:action=START".to_string(), "b:action=START".to_string()]
        );
    }

    #[test]
    fn subscribe_is_idempotent_by_identity() {
        let log: Log = Arc::default();
        let publisher = Publisher::<str>::new();
        let listener = recorder("a", &log);

        assert!(publisher.subscribe(Arc::clone(&listener)));
        assert!(!publisher.subscribe(Arc::clone(&listener)));
        assert_eq!(publisher.len(), 1);

        // A distinct handle with identical behaviour is a different listener.
        assert!(publisher.subscribe(recorder("a", &log)));
        assert_eq!(publisher.len(), 2);
    }

    #[test]
    fn unsubscribe_stops_delivery() {
        let log: Log = Arc::default();
        let publisher = Publisher::<str>::new();
        let listener = recorder("a", &log);
        publisher.subscribe(Arc::clone(&listener));

        assert!(publisher.unsubscribe(&listener));
        assert!(!publisher.unsubscribe(&listener));
        publisher.notify("program", "x.mpr").unwrap();

        assert!(log.lock().unwrap().is_empty());
        assert!(publisher.is_empty());
    }

    #[test]
    fn no_subscribers_drops_event() {
        let publisher = Publisher::<str>::new();
        assert!(publisher.notify("action", "END").is_ok());
    }

    #[test]
    fn failing_listener_stops_fan_out() {
        let log: Log = Arc::default();
        let publisher = Publisher::<str>::new();
        publisher.subscribe(Arc::new(|_: &str, _: &str| -> Result<(), Error> {
            Err(Error::UnknownMethod("boom".to_string()))
        }));
        publisher.subscribe(recorder("after", &log));

        assert!(publisher.notify("action", "START").is_err());
        assert!(log.lock().unwrap().is_empty());
    }
}
