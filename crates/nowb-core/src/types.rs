//! Common types used throughout NOWB

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique identifier for a tab
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TabId(pub u64);

/// Unique identifier for a tab group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TabGroupId(pub u64);

/// How the top-level window is currently shown
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowMode {
    #[default]
    Normal,
    Maximized,
    FullScreen,
}

/// Window size and position as reported by the host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowGeometry {
    pub width: u32,
    pub height: u32,
    pub x: i32,
    pub y: i32,
    #[serde(default)]
    pub mode: WindowMode,
}

impl WindowGeometry {
    /// Only a normal window's geometry is worth restoring
    pub fn is_restorable(&self) -> bool {
        self.mode == WindowMode::Normal
    }
}

impl TabId {
    pub fn new() -> Self {
        use std::sync::atomic::{AtomicU64, Ordering};
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for TabId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TabId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tab_{}", self.0)
    }
}

impl fmt::Display for TabGroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "group_{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tab_ids_are_unique() {
        let a = TabId::new();
        let b = TabId::new();
        assert_ne!(a, b);
    }

    #[test]
    fn test_geometry_restorable_only_when_normal() {
        let mut geometry = WindowGeometry {
            width: 1024,
            height: 768,
            x: 100,
            y: 100,
            mode: WindowMode::Normal,
        };
        assert!(geometry.is_restorable());

        geometry.mode = WindowMode::Maximized;
        assert!(!geometry.is_restorable());

        geometry.mode = WindowMode::FullScreen;
        assert!(!geometry.is_restorable());
    }

    #[test]
    fn test_display_ids() {
        assert_eq!(TabGroupId(0).to_string(), "group_0");
        assert_eq!(TabId(7).to_string(), "tab_7");
    }
}
