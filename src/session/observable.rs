//! Change notification for session fields.
//!
//! Every editable field of a session is an [`Observable`]. Setting a value
//! notifies subscribers synchronously, in subscription order, before `set`
//! returns. All of this is single-threaded (`Rc`/`RefCell`); a session lives on
//! one task.

use std::{
    cell::{Cell, RefCell},
    fmt,
    rc::Rc,
};

/// Read/write access to one field of the parent state.
pub trait FieldAccess<T> {
    fn get(&self) -> T;
    fn set(&self, value: T);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Callback<T> = Rc<dyn Fn(&T)>;

struct NotifierInner<T> {
    next_id: Cell<u64>,
    subscribers: RefCell<Vec<(SubscriptionId, Callback<T>)>>,
}

/// A list of callbacks fired with a payload. Cloning yields another handle to
/// the same list.
pub struct Notifier<T> {
    inner: Rc<NotifierInner<T>>,
}

impl<T> Clone for Notifier<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T> Default for Notifier<T> {
    fn default() -> Self {
        Self {
            inner: Rc::new(NotifierInner {
                next_id: Cell::new(0),
                subscribers: RefCell::new(Vec::new()),
            }),
        }
    }
}

impl<T> fmt::Debug for Notifier<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Notifier")
            .field("subscribers", &self.inner.subscribers.borrow().len())
            .finish()
    }
}

impl<T> Notifier<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, callback: impl Fn(&T) + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.inner.next_id.get());
        self.inner.next_id.set(id.0 + 1);
        self.inner
            .subscribers
            .borrow_mut()
            .push((id, Rc::new(callback)));
        id
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subscribers = self.inner.subscribers.borrow_mut();
        let before = subscribers.len();
        subscribers.retain(|(sid, _)| *sid != id);
        subscribers.len() != before
    }

    pub fn emit(&self, value: &T) {
        // Snapshot so a callback may subscribe or unsubscribe while we iterate.
        let callbacks: Vec<Callback<T>> = self
            .inner
            .subscribers
            .borrow()
            .iter()
            .map(|(_, cb)| Rc::clone(cb))
            .collect();
        for callback in callbacks {
            callback(value);
        }
    }
}

struct ObservableInner<T> {
    value: RefCell<T>,
    changed: Notifier<T>,
}

/// A value cell that tells its subscribers whenever it changes.
///
/// Setting a value equal to the current one is a no-op.
pub struct Observable<T> {
    inner: Rc<ObservableInner<T>>,
}

impl<T> Clone for Observable<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Observable<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Observable")
            .field(&*self.inner.value.borrow())
            .finish()
    }
}

impl<T: Default + Clone + PartialEq + 'static> Default for Observable<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: Clone + PartialEq + 'static> Observable<T> {
    pub fn new(value: T) -> Self {
        Self {
            inner: Rc::new(ObservableInner {
                value: RefCell::new(value),
                changed: Notifier::new(),
            }),
        }
    }

    pub fn get(&self) -> T {
        self.inner.value.borrow().clone()
    }

    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.inner.value.borrow())
    }

    /// Replaces the value and notifies subscribers. Returns whether the value
    /// actually changed.
    pub fn set(&self, value: T) -> bool {
        {
            let mut current = self.inner.value.borrow_mut();
            if *current == value {
                return false;
            }
            *current = value.clone();
        }
        self.inner.changed.emit(&value);
        true
    }

    pub fn subscribe(&self, callback: impl Fn(&T) + 'static) -> SubscriptionId {
        self.inner.changed.subscribe(callback)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.inner.changed.unsubscribe(id)
    }

    /// An observable recomputed from this one on every change.
    pub fn map<U>(&self, f: impl Fn(&T) -> U + 'static) -> Observable<U>
    where
        U: Clone + PartialEq + 'static,
    {
        let derived = Observable::new(self.with(&f));
        let target = derived.clone();
        self.subscribe(move |value| {
            target.set(f(value));
        });
        derived
    }
}

impl<T: Clone + PartialEq + 'static> FieldAccess<T> for Observable<T> {
    fn get(&self) -> T {
        Observable::get(self)
    }

    fn set(&self, value: T) {
        Observable::set(self, value);
    }
}
