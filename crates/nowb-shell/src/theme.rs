//! Theme change broadcast
//!
//! Windows subscribe when they are created and unsubscribe when they close.
//! The registry is owned by the application and handed to windows, so a
//! window created after a change still picks up the current theme.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

/// The application-wide registry every window attaches to
pub type SharedThemeRegistry = Arc<Mutex<ThemeRegistry>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThemeMode {
    #[default]
    Light,
    Dark,
}

impl fmt::Display for ThemeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ThemeMode::Light => write!(f, "light"),
            ThemeMode::Dark => write!(f, "dark"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SubscriptionId(pub u64);

type ThemeCallback = Box<dyn FnMut(ThemeMode) + Send>;

#[derive(Default)]
pub struct ThemeRegistry {
    current: ThemeMode,
    subscribers: BTreeMap<SubscriptionId, ThemeCallback>,
    next_id: u64,
}

impl fmt::Debug for ThemeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ThemeRegistry")
            .field("current", &self.current)
            .field("subscribers", &self.subscribers.len())
            .finish()
    }
}

impl ThemeRegistry {
    pub fn new(initial: ThemeMode) -> Self {
        Self {
            current: initial,
            ..Self::default()
        }
    }

    pub fn current(&self) -> ThemeMode {
        self.current
    }

    pub fn subscribe<F>(&mut self, callback: F) -> SubscriptionId
    where
        F: FnMut(ThemeMode) + Send + 'static,
    {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.subscribers.insert(id, Box::new(callback));
        id
    }

    /// Returns false if the id was not registered
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.subscribers.remove(&id).is_some()
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    /// Set the theme and notify every subscriber. Returns how many were told.
    pub fn broadcast(&mut self, theme: ThemeMode) -> usize {
        self.current = theme;
        log::info!("Theme changed to {}", theme);
        for callback in self.subscribers.values_mut() {
            callback(theme);
        }
        self.subscribers.len()
    }
}

/// Lock, recovering from a poisoned lock
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// One window's attachment to the shared registry.
///
/// Attaching subscribes the window and dropping it unsubscribes, so the
/// registry only ever calls back into open windows.
pub struct WindowTheme {
    registry: SharedThemeRegistry,
    applied: Arc<Mutex<ThemeMode>>,
    subscription: SubscriptionId,
}

impl WindowTheme {
    pub fn attach(registry: &SharedThemeRegistry) -> Self {
        let mut guard = lock(registry);
        let applied = Arc::new(Mutex::new(guard.current()));

        let target = Arc::clone(&applied);
        let subscription = guard.subscribe(move |theme| *lock(&target) = theme);
        drop(guard);

        log::debug!("Window attached to theme registry as {:?}", subscription);
        Self {
            registry: Arc::clone(registry),
            applied,
            subscription,
        }
    }

    /// A fresh registry with only this window attached
    pub fn standalone() -> Self {
        Self::attach(&Arc::new(Mutex::new(ThemeRegistry::default())))
    }

    pub fn registry(&self) -> &SharedThemeRegistry {
        &self.registry
    }

    /// Theme this window is currently drawn with
    pub fn current(&self) -> ThemeMode {
        *lock(&self.applied)
    }

    /// Change the theme for every open window. Returns how many were told.
    pub fn set(&self, theme: ThemeMode) -> usize {
        lock(&self.registry).broadcast(theme)
    }
}

impl fmt::Debug for WindowTheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WindowTheme")
            .field("current", &self.current())
            .field("subscription", &self.subscription)
            .finish()
    }
}

impl Drop for WindowTheme {
    fn drop(&mut self) {
        lock(&self.registry).unsubscribe(self.subscription);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_broadcast_reaches_all_windows() {
        let mut registry = ThemeRegistry::new(ThemeMode::Light);
        let seen = Arc::new(Mutex::new(Vec::new()));

        for window in 0..2 {
            let seen = Arc::clone(&seen);
            registry.subscribe(move |theme| seen.lock().unwrap().push((window, theme)));
        }

        assert_eq!(registry.broadcast(ThemeMode::Dark), 2);
        assert_eq!(
            *seen.lock().unwrap(),
            vec![(0, ThemeMode::Dark), (1, ThemeMode::Dark)]
        );
    }

    #[test]
    fn test_unsubscribed_window_is_not_notified() {
        let mut registry = ThemeRegistry::default();
        let count = Arc::new(Mutex::new(0));
        let counter = Arc::clone(&count);
        let id = registry.subscribe(move |_| *counter.lock().unwrap() += 1);

        assert!(registry.unsubscribe(id));
        assert!(!registry.unsubscribe(id));
        registry.broadcast(ThemeMode::Dark);
        assert_eq!(*count.lock().unwrap(), 0);
    }

    #[test]
    fn test_late_window_reads_current_theme() {
        let mut registry = ThemeRegistry::default();
        registry.broadcast(ThemeMode::Dark);
        assert_eq!(registry.current(), ThemeMode::Dark);
        assert_eq!(registry.current().to_string(), "dark");
    }

    #[test]
    fn test_attached_windows_follow_broadcast() {
        let registry: SharedThemeRegistry = Arc::new(Mutex::new(ThemeRegistry::default()));
        let main = WindowTheme::attach(&registry);
        let second = WindowTheme::attach(&registry);

        assert_eq!(main.set(ThemeMode::Dark), 2);
        assert_eq!(main.current(), ThemeMode::Dark);
        assert_eq!(second.current(), ThemeMode::Dark);

        // a window opened after the change starts dark
        let late = WindowTheme::attach(&registry);
        assert_eq!(late.current(), ThemeMode::Dark);
    }

    #[test]
    fn test_dropped_window_detaches() {
        let registry: SharedThemeRegistry = Arc::new(Mutex::new(ThemeRegistry::default()));
        let main = WindowTheme::attach(&registry);
        let closing = WindowTheme::attach(&registry);
        assert_eq!(registry.lock().unwrap().subscriber_count(), 2);

        drop(closing);
        assert_eq!(registry.lock().unwrap().subscriber_count(), 1);
        assert_eq!(main.set(ThemeMode::Dark), 1);
    }
}
