//! Trailing-edge debounce over a `tokio::sync::watch` channel.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;

type SettleHook<T> = Arc<dyn Fn(&T) + Send + Sync>;

/// Publishes the last pushed value once no new value has arrived for `delay`.
///
/// A push supersedes and cancels any pending one. Dropping the debouncer cancels its timer.
/// Outside a tokio runtime values settle immediately.
pub struct Debouncer<T> {
    delay: Duration,
    tx: Arc<watch::Sender<T>>,
    pending: Mutex<Option<JoinHandle<()>>>,
    on_settle: Option<SettleHook<T>>,
}

impl<T> Debouncer<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    pub fn new(initial: T, delay: Duration) -> Self {
        let (tx, _) = watch::channel(initial);
        Self {
            delay,
            tx: Arc::new(tx),
            pending: Mutex::new(None),
            on_settle: None,
        }
    }

    /// Call `hook` with every settled value that differs from the previous one.
    pub fn on_settle(mut self, hook: impl Fn(&T) + Send + Sync + 'static) -> Self {
        self.on_settle = Some(Arc::new(hook));
        self
    }

    fn pending(&self) -> MutexGuard<'_, Option<JoinHandle<()>>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn push(&self, value: T) {
        let mut pending = self.pending();
        if let Some(timer) = pending.take() {
            timer.abort();
        }

        match Handle::try_current() {
            Ok(runtime) => {
                let tx = Arc::clone(&self.tx);
                let hook = self.on_settle.clone();
                let delay = self.delay;
                *pending = Some(runtime.spawn(async move {
                    tokio::time::sleep(delay).await;
                    settle(&tx, hook.as_ref(), value);
                }));
            }
            Err(_) => settle(&self.tx, self.on_settle.as_ref(), value),
        }
    }

    /// Last settled value.
    pub fn settled(&self) -> T {
        self.tx.borrow().clone()
    }

    pub fn is_pending(&self) -> bool {
        self.pending()
            .as_ref()
            .is_some_and(|timer| !timer.is_finished())
    }

    pub fn subscribe(&self) -> watch::Receiver<T> {
        self.tx.subscribe()
    }

    /// Drop the pending value, if any.
    pub fn cancel(&self) {
        if let Some(timer) = self.pending().take() {
            timer.abort();
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }
}

fn settle<T: Clone + PartialEq>(tx: &watch::Sender<T>, hook: Option<&SettleHook<T>>, value: T) {
    let changed = tx.send_if_modified(|current| {
        if *current == value {
            return false;
        }
        *current = value.clone();
        true
    });
    if changed {
        if let Some(hook) = hook {
            hook(&value);
        }
    }
}

impl<T> Drop for Debouncer<T> {
    fn drop(&mut self) {
        if let Some(timer) = self
            .pending
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            timer.abort();
        }
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for Debouncer<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Debouncer")
            .field("delay", &self.delay)
            .field("settled", &*self.tx.borrow())
            .finish()
    }
}
