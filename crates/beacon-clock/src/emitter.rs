use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc, Mutex, MutexGuard, PoisonError, Weak,
};

type Listener<T> = Arc<dyn Fn(T) + Send + Sync>;

/// Ordered list of listeners for one kind of event.
///
/// Dispatch iterates over a snapshot of the list, so a listener can subscribe or unsubscribe
/// (itself included) while it is being called. Changes apply to the next emission.
pub(crate) struct Emitter<T> {
    inner: Arc<Listeners<T>>,
}

struct Listeners<T> {
    next_id: AtomicU64,
    entries: Mutex<Vec<(u64, Listener<T>)>>,
}

trait Unsubscribe: Send + Sync {
    fn remove(&self, id: u64);
}

impl<T: Copy + Send + 'static> Emitter<T> {
    pub(crate) fn new() -> Self {
        Self {
            inner: Arc::new(Listeners {
                next_id: AtomicU64::new(0),
                entries: Mutex::new(Vec::new()),
            }),
        }
    }

    pub(crate) fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(T) + Send + Sync + 'static,
    {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        self.inner.entries().push((id, Arc::new(listener)));

        let registry: Arc<dyn Unsubscribe> = self.inner.clone();

        Subscription {
            id,
            registry: Arc::downgrade(&registry),
        }
    }

    pub(crate) fn emit(&self, value: T) {
        let snapshot: Vec<Listener<T>> = self
            .inner
            .entries()
            .iter()
            .map(|(_, listener)| listener.clone())
            .collect();

        for listener in snapshot {
            listener(value);
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.inner.entries().len()
    }
}

impl<T> Listeners<T> {
    fn entries(&self) -> MutexGuard<'_, Vec<(u64, Listener<T>)>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<T: Send + 'static> Unsubscribe for Listeners<T> {
    fn remove(&self, id: u64) {
        self.entries().retain(|(entry, _)| *entry != id);
    }
}

/// Registration of a listener on the [`ChainClock`](crate::ChainClock).
///
/// The listener is removed when the subscription is dropped.
#[must_use = "the listener is removed as soon as the subscription is dropped"]
pub struct Subscription {
    id: u64,
    registry: Weak<dyn Unsubscribe>,
}

impl Subscription {
    pub fn unsubscribe(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            registry.remove(self.id);
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;

    fn recorder() -> (Arc<Mutex<Vec<(&'static str, i64)>>>, impl Fn(&'static str) -> Box<dyn Fn(i64) + Send + Sync>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let handle = seen.clone();

        (seen, move |name| {
            let seen = handle.clone();
            Box::new(move |value| seen.lock().unwrap().push((name, value)))
        })
    }

    #[test]
    fn listeners_are_called_in_registration_order() {
        let emitter = Emitter::new();
        let (seen, listener) = recorder();

        let _first = emitter.subscribe(listener("first"));
        let _second = emitter.subscribe(listener("second"));

        emitter.emit(1);
        emitter.emit(2);

        assert_eq!(
            *seen.lock().unwrap(),
            vec![("first", 1), ("second", 1), ("first", 2), ("second", 2)]
        );
    }

    #[test]
    fn dropping_the_subscription_removes_the_listener() {
        let emitter = Emitter::new();
        let (seen, listener) = recorder();

        let first = emitter.subscribe(listener("first"));
        let _second = emitter.subscribe(listener("second"));
        assert_eq!(emitter.len(), 2);

        first.unsubscribe();
        assert_eq!(emitter.len(), 1);

        emitter.emit(7);
        assert_eq!(*seen.lock().unwrap(), vec![("second", 7)]);
    }

    #[test]
    fn listener_can_unsubscribe_itself_during_dispatch() {
        let emitter: Emitter<i64> = Emitter::new();
        let (seen, listener) = recorder();
        let slot: Arc<Mutex<Option<Subscription>>> = Arc::default();

        let own = slot.clone();
        let record = listener("once");
        *slot.lock().unwrap() = Some(emitter.subscribe(move |value| {
            record(value);
            own.lock().unwrap().take();
        }));
        let _other = emitter.subscribe(listener("other"));

        emitter.emit(1);
        emitter.emit(2);

        assert_eq!(emitter.len(), 1);
        assert_eq!(
            *seen.lock().unwrap(),
            vec![("once", 1), ("other", 1), ("other", 2)]
        );
    }

    #[test]
    fn listener_registered_during_dispatch_sees_next_emission_only() {
        let emitter: Arc<Emitter<i64>> = Arc::new(Emitter::new());
        let (seen, listener) = recorder();
        let late: Arc<Mutex<Vec<Subscription>>> = Arc::default();

        let registrar = emitter.clone();
        let keep = late.clone();
        let late_listener: Arc<dyn Fn(i64) + Send + Sync> = Arc::from(listener("late"));
        let _first = emitter.subscribe(move |_| {
            let late_listener = late_listener.clone();
            let mut keep = keep.lock().unwrap();
            if keep.is_empty() {
                keep.push(registrar.subscribe(move |value| late_listener(value)));
            }
        });

        emitter.emit(1);
        emitter.emit(2);

        assert_eq!(*seen.lock().unwrap(), vec![("late", 2)]);
    }

    #[test]
    fn subscription_outliving_emitter_is_harmless() {
        let emitter: Emitter<i64> = Emitter::new();
        let subscription = emitter.subscribe(|_| {});

        drop(emitter);
        drop(subscription);
    }
}
