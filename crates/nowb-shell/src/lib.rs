//! Browser shell - tab strip, session restore, tab groups, theme broadcast

pub mod groups;
pub mod omnibox;
pub mod session;
pub mod tabs;
pub mod theme;

pub use groups::{TabGroup, TabGroups};
pub use omnibox::{resolve, Resolution};
pub use session::{LiveState, SessionReconciler, SessionUpdate, TabPlan};
pub use tabs::{MaterializeTicket, Tab, TabState, TabStrip, TabSummary, ViewFactory};
pub use theme::{SharedThemeRegistry, SubscriptionId, ThemeMode, ThemeRegistry, WindowTheme};
