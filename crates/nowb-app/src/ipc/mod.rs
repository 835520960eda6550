//! IPC (Inter-Process Communication) module for NOWB
//!
//! The GUI host talks to the core through tagged JSON messages, one per
//! line, and gets a tagged response back for each. A message may carry a
//! `window` id to address a private window; without one it goes to the
//! main window.

pub mod commands;

use nowb_core::types::TabId;
use nowb_history::HistoryOrder;
use nowb_settings::RawDocument;
use nowb_shell::{LiveState, ThemeMode};
use serde::{Deserialize, Serialize};

/// A message plus the window it is addressed to
#[derive(Debug, Clone, Deserialize)]
pub struct IpcRequest {
    #[serde(default)]
    pub window: Option<u64>,
    #[serde(flatten)]
    pub message: IpcMessage,
}

/// A tab as the host refers to it: the numeric id from a tab summary or
/// its `tab_N` display form
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum TabRef {
    Number(u64),
    Name(String),
}

impl TabRef {
    pub fn tab_id(&self) -> Option<TabId> {
        match self {
            TabRef::Number(id) => Some(TabId(*id)),
            TabRef::Name(name) => name
                .trim_start_matches("tab_")
                .parse::<u64>()
                .ok()
                .map(TabId),
        }
    }
}

/// IPC message from the host to the core
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "cmd", rename_all = "snake_case")]
pub enum IpcMessage {
    // Windows
    OpenPrivateWindow,
    /// Close the private window named by the request's `window`
    CloseWindow,
    GetStatus,
    CompleteFirstRun {
        home_url: Option<String>,
        search_engine: Option<String>,
    },

    // Session
    PlanSession,
    RestoreSession,
    CaptureSession {
        live: LiveState,
    },

    // Tab management
    MaterializeTab {
        id: TabRef,
    },
    ActivateTab {
        index: usize,
    },
    OpenTab {
        url: Option<String>,
    },
    CloseTab {
        index: usize,
    },
    GetTabs,

    // Settings document
    GetDocument,
    UpdateDocument {
        partial: RawDocument,
    },
    SetSearchEngine {
        name: String,
    },
    ResolveInput {
        text: String,
    },
    SetFocusMode {
        enabled: bool,
    },
    AddFavorite {
        name: String,
        url: String,
    },
    RemoveFavorite {
        name: String,
    },

    // History
    GetHistory {
        #[serde(default)]
        order: HistoryOrder,
        limit: Option<usize>,
    },
    RecordVisit {
        url: String,
        #[serde(default)]
        title: String,
        tab_id: Option<TabRef>,
    },
    ClearHistory,
    SearchHistory {
        query: String,
        limit: Option<usize>,
    },

    // Tab groups
    CreateTabGroup {
        name: String,
        urls: Option<Vec<String>>,
    },
    GetTabGroups,
    OpenTabGroup {
        id: u64,
    },
    RemoveTabGroup {
        id: u64,
    },

    // Shield
    CheckUrl {
        url: String,
    },
    SetAdblockEnabled {
        enabled: bool,
    },
    GetShieldStats,
    AddAdblockRule {
        rule: String,
    },
    RemoveAdblockRule {
        rule: String,
    },
    ReloadAdblockRules,

    // Theme
    SetTheme {
        theme: ThemeMode,
    },

    // Lifecycle
    TakeNotices,
    Save {
        live: Option<LiveState>,
    },
}

/// IPC response from the core to the host
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum IpcResponse {
    Success { data: serde_json::Value },
    Error { message: String },
}

impl IpcResponse {
    pub fn success<T: Serialize>(data: T) -> Self {
        IpcResponse::Success {
            data: serde_json::to_value(data).unwrap_or(serde_json::Value::Null),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        IpcResponse::Error {
            message: message.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, IpcResponse::Success { .. })
    }
}

/// Tab group information for IPC responses
#[derive(Debug, Clone, Serialize)]
pub struct TabGroupInfo {
    pub id: u64,
    pub name: String,
    pub tab_count: usize,
    pub urls: Vec<String>,
}

/// Views the host must create after a tab operation
#[derive(Debug, Clone, Serialize)]
pub struct ViewRequest {
    pub view: u64,
    pub url: String,
}
