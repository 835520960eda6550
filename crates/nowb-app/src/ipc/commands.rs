//! IPC command handlers
//!
//! One handler per message. Every handler locks the shared state, so all
//! mutations are serialized through the single owner.

use super::{IpcMessage, IpcRequest, IpcResponse, TabGroupInfo, TabRef, ViewRequest};
use crate::state::AppState;
use nowb_core::types::TabGroupId;
use nowb_history::HistoryOrder;
use nowb_settings::RawDocument;
use nowb_shell::{LiveState, ThemeMode};
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info, warn};

/// Results returned by history searches unless the host asks otherwise
const DEFAULT_SEARCH_LIMIT: usize = 10;

/// The main window plus the private windows opened from it
pub struct Windows {
    main: Arc<Mutex<AppState>>,
    private: BTreeMap<u64, Arc<Mutex<AppState>>>,
    next_id: u64,
}

impl Windows {
    pub fn new(main: AppState) -> Self {
        Self {
            main: Arc::new(Mutex::new(main)),
            private: BTreeMap::new(),
            next_id: 1,
        }
    }

    pub fn main(&self) -> &Arc<Mutex<AppState>> {
        &self.main
    }

    fn get(&self, window: Option<u64>) -> Option<&Arc<Mutex<AppState>>> {
        match window {
            None => Some(&self.main),
            Some(id) => self.private.get(&id),
        }
    }
}

/// Route a request to its window and handle it
pub fn handle_request(windows: &mut Windows, request: IpcRequest) -> IpcResponse {
    match request.message {
        IpcMessage::OpenPrivateWindow => handle_open_private_window(windows),
        IpcMessage::CloseWindow => handle_close_window(windows, request.window),
        message => match windows.get(request.window) {
            Some(state) => handle_message(state, message),
            None => IpcResponse::error(format!(
                "No window {}",
                request.window.unwrap_or_default()
            )),
        },
    }
}

/// Handle an IPC message for one window and return a response
pub fn handle_message(state: &Arc<Mutex<AppState>>, message: IpcMessage) -> IpcResponse {
    match message {
        // Window commands
        IpcMessage::OpenPrivateWindow | IpcMessage::CloseWindow => {
            IpcResponse::error("Window commands are handled by the window list")
        }
        IpcMessage::GetStatus => handle_get_status(state),
        IpcMessage::CompleteFirstRun {
            home_url,
            search_engine,
        } => handle_complete_first_run(state, home_url.as_deref(), search_engine.as_deref()),

        // Session commands
        IpcMessage::PlanSession => handle_plan_session(state),
        IpcMessage::RestoreSession => handle_restore_session(state),
        IpcMessage::CaptureSession { live } => handle_capture_session(state, &live),

        // Tab commands
        IpcMessage::MaterializeTab { id } => handle_materialize_tab(state, &id),
        IpcMessage::ActivateTab { index } => handle_activate_tab(state, index),
        IpcMessage::OpenTab { url } => handle_open_tab(state, url.as_deref()),
        IpcMessage::CloseTab { index } => handle_close_tab(state, index),
        IpcMessage::GetTabs => handle_get_tabs(state),

        // Settings commands
        IpcMessage::GetDocument => handle_get_document(state),
        IpcMessage::UpdateDocument { partial } => handle_update_document(state, partial),
        IpcMessage::SetSearchEngine { name } => handle_set_search_engine(state, &name),
        IpcMessage::ResolveInput { text } => handle_resolve_input(state, &text),
        IpcMessage::SetFocusMode { enabled } => handle_set_focus_mode(state, enabled),
        IpcMessage::AddFavorite { name, url } => handle_add_favorite(state, &name, &url),
        IpcMessage::RemoveFavorite { name } => handle_remove_favorite(state, &name),

        // History commands
        IpcMessage::GetHistory { order, limit } => handle_get_history(state, order, limit),
        IpcMessage::RecordVisit { url, title, tab_id } => {
            handle_record_visit(state, &url, &title, tab_id.as_ref())
        }
        IpcMessage::ClearHistory => handle_clear_history(state),
        IpcMessage::SearchHistory { query, limit } => handle_search_history(state, &query, limit),

        // Tab group commands
        IpcMessage::CreateTabGroup { name, urls } => handle_create_tab_group(state, &name, urls),
        IpcMessage::GetTabGroups => handle_get_tab_groups(state),
        IpcMessage::OpenTabGroup { id } => handle_open_tab_group(state, id),
        IpcMessage::RemoveTabGroup { id } => handle_remove_tab_group(state, id),

        // Shield commands
        IpcMessage::CheckUrl { url } => handle_check_url(state, &url),
        IpcMessage::SetAdblockEnabled { enabled } => handle_set_adblock_enabled(state, enabled),
        IpcMessage::GetShieldStats => handle_get_shield_stats(state),
        IpcMessage::AddAdblockRule { rule } => handle_add_adblock_rule(state, &rule),
        IpcMessage::RemoveAdblockRule { rule } => handle_remove_adblock_rule(state, &rule),
        IpcMessage::ReloadAdblockRules => handle_reload_adblock_rules(state),

        // Theme
        IpcMessage::SetTheme { theme } => handle_set_theme(state, theme),

        // Lifecycle
        IpcMessage::TakeNotices => handle_take_notices(state),
        IpcMessage::Save { live } => handle_save(state, live.as_ref()),
    }
}

/// Lock the state, recovering from a poisoned lock
fn lock(state: &Arc<Mutex<AppState>>) -> MutexGuard<'_, AppState> {
    match state.lock() {
        Ok(guard) => guard,
        Err(poisoned) => {
            warn!("App state lock was poisoned, recovering");
            poisoned.into_inner()
        }
    }
}

/// Views created by the last operation, for the host to instantiate
fn view_requests(state: &mut AppState) -> Vec<ViewRequest> {
    state
        .views
        .take_created()
        .into_iter()
        .map(|(view, url)| ViewRequest { view: view.0, url })
        .collect()
}

fn handle_open_private_window(windows: &mut Windows) -> IpcResponse {
    let mut private = lock(&windows.main).private_snapshot();
    if let Err(e) = private.restore_session() {
        return IpcResponse::error(format!("Failed to open private window: {}", e));
    }

    let id = windows.next_id;
    windows.next_id += 1;
    info!("Opened private window {}", id);

    let views = view_requests(&mut private);
    let response = IpcResponse::success(json!({
        "window": id,
        "tabs": private.tab_summaries(),
        "views": views,
    }));
    windows.private.insert(id, Arc::new(Mutex::new(private)));
    response
}

fn handle_close_window(windows: &mut Windows, window: Option<u64>) -> IpcResponse {
    let Some(id) = window else {
        return IpcResponse::error("The main window closes when the bridge stops");
    };
    match windows.private.remove(&id) {
        Some(_) => {
            info!("Closed private window {}", id);
            IpcResponse::success(json!({ "closed": id }))
        }
        None => IpcResponse::error(format!("No window {}", id)),
    }
}

fn handle_get_status(state: &Arc<Mutex<AppState>>) -> IpcResponse {
    let state = lock(state);
    IpcResponse::success(state.status())
}

fn handle_complete_first_run(
    state: &Arc<Mutex<AppState>>,
    home_url: Option<&str>,
    search_engine: Option<&str>,
) -> IpcResponse {
    let mut state = lock(state);
    match state.complete_first_run(home_url, search_engine) {
        Ok(()) => IpcResponse::success(state.status()),
        Err(e) => IpcResponse::error(e.to_string()),
    }
}

fn handle_plan_session(state: &Arc<Mutex<AppState>>) -> IpcResponse {
    let state = lock(state);
    IpcResponse::success(state.plan_session())
}

fn handle_restore_session(state: &Arc<Mutex<AppState>>) -> IpcResponse {
    let mut state = lock(state);
    let ids = match state.restore_session() {
        Ok(ids) => ids,
        Err(e) => return IpcResponse::error(e.to_string()),
    };
    info!("Restored session with {} tabs", ids.len());

    let views = view_requests(&mut state);
    IpcResponse::success(json!({
        "tabs": state.tab_summaries(),
        "views": views,
    }))
}

fn handle_capture_session(state: &Arc<Mutex<AppState>>, live: &LiveState) -> IpcResponse {
    let mut state = lock(state);
    IpcResponse::success(state.capture_session(live))
}

fn handle_materialize_tab(state: &Arc<Mutex<AppState>>, id: &TabRef) -> IpcResponse {
    let mut state = lock(state);

    let tab_id = match id.tab_id() {
        Some(tab_id) => tab_id,
        None => return IpcResponse::error("Invalid tab ID"),
    };

    match state.materialize_tab(tab_id) {
        Ok(converted) => {
            let views = view_requests(&mut state);
            IpcResponse::success(json!({ "materialized": converted, "views": views }))
        }
        Err(e) => IpcResponse::error(format!("Failed to materialize tab: {}", e)),
    }
}

fn handle_activate_tab(state: &Arc<Mutex<AppState>>, index: usize) -> IpcResponse {
    let mut state = lock(state);

    match state.activate_tab(index) {
        Ok(converted) => {
            debug!("Activated tab {} (materialized: {})", index, converted);
            let views = view_requests(&mut state);
            IpcResponse::success(json!({ "materialized": converted, "views": views }))
        }
        Err(e) => IpcResponse::error(format!("Failed to activate tab: {}", e)),
    }
}

fn handle_open_tab(state: &Arc<Mutex<AppState>>, url: Option<&str>) -> IpcResponse {
    let mut state = lock(state);

    match state.open_tab(url) {
        Ok(id) => {
            let views = view_requests(&mut state);
            IpcResponse::success(json!({ "id": id, "views": views }))
        }
        Err(e) => IpcResponse::error(format!("Failed to open tab: {}", e)),
    }
}

fn handle_close_tab(state: &Arc<Mutex<AppState>>, index: usize) -> IpcResponse {
    let mut state = lock(state);

    match state.close_tab(index) {
        Ok(id) => {
            info!("Closed tab {}", id);
            IpcResponse::success(json!({ "closed": id }))
        }
        Err(e) => IpcResponse::error(format!("Failed to close tab: {}", e)),
    }
}

fn handle_get_tabs(state: &Arc<Mutex<AppState>>) -> IpcResponse {
    let state = lock(state);
    IpcResponse::success(state.tab_summaries())
}

fn handle_get_document(state: &Arc<Mutex<AppState>>) -> IpcResponse {
    let state = lock(state);
    match state.get_document() {
        Ok(document) => IpcResponse::success(document),
        Err(e) => IpcResponse::error(format!("Failed to read settings: {}", e)),
    }
}

fn handle_update_document(state: &Arc<Mutex<AppState>>, partial: RawDocument) -> IpcResponse {
    let mut state = lock(state);
    let keys: Vec<String> = partial.keys().cloned().collect();

    match state.update_document(partial) {
        Ok(()) => {
            info!("Updated settings: {}", keys.join(", "));
            IpcResponse::success(json!({ "updated": keys }))
        }
        Err(e) => IpcResponse::error(e.to_string()),
    }
}

fn handle_set_search_engine(state: &Arc<Mutex<AppState>>, name: &str) -> IpcResponse {
    let mut state = lock(state);
    match state.set_search_engine(name) {
        Ok(url) => IpcResponse::success(json!({
            "name": state.document().search_engine_name(),
            "url": url,
        })),
        Err(e) => IpcResponse::error(e.to_string()),
    }
}

fn handle_add_favorite(state: &Arc<Mutex<AppState>>, name: &str, url: &str) -> IpcResponse {
    let mut state = lock(state);
    match state.add_favorite(name, url) {
        Ok(()) => IpcResponse::success(state.document().favorite_sites()),
        Err(e) => IpcResponse::error(e.to_string()),
    }
}

fn handle_remove_favorite(state: &Arc<Mutex<AppState>>, name: &str) -> IpcResponse {
    let mut state = lock(state);
    match state.remove_favorite(name) {
        Ok(removed) => IpcResponse::success(json!({ "removed": removed })),
        Err(e) => IpcResponse::error(e.to_string()),
    }
}

fn handle_resolve_input(state: &Arc<Mutex<AppState>>, text: &str) -> IpcResponse {
    let state = lock(state);
    match state.resolve_input(text) {
        Some(resolution) => IpcResponse::success(resolution),
        None => IpcResponse::error("Nothing to open"),
    }
}

fn handle_set_focus_mode(state: &Arc<Mutex<AppState>>, enabled: bool) -> IpcResponse {
    let mut state = lock(state);
    state.set_focus_mode(enabled);
    IpcResponse::success(json!({ "focus_mode": enabled }))
}

fn handle_get_history(
    state: &Arc<Mutex<AppState>>,
    order: HistoryOrder,
    limit: Option<usize>,
) -> IpcResponse {
    let state = lock(state);
    IpcResponse::success(state.history(order, limit))
}

fn handle_record_visit(
    state: &Arc<Mutex<AppState>>,
    url: &str,
    title: &str,
    tab_id: Option<&TabRef>,
) -> IpcResponse {
    let mut state = lock(state);

    if let Some(id) = tab_id {
        let Some(tab_id) = id.tab_id() else {
            return IpcResponse::error("Invalid tab ID");
        };
        let title = (!title.is_empty()).then_some(title);
        if let Err(e) = state.tabs.navigated(tab_id, url, title) {
            warn!("Navigation reported for unknown tab {}: {}", tab_id, e);
        }
    }

    let recorded = state.record_visit(title, url);
    IpcResponse::success(json!({ "recorded": recorded }))
}

fn handle_clear_history(state: &Arc<Mutex<AppState>>) -> IpcResponse {
    let mut state = lock(state);
    match state.clear_history() {
        Ok(()) => {
            info!("Cleared history");
            IpcResponse::success(json!({ "cleared": true }))
        }
        Err(e) => IpcResponse::error(format!("Failed to clear history: {}", e)),
    }
}

fn handle_search_history(
    state: &Arc<Mutex<AppState>>,
    query: &str,
    limit: Option<usize>,
) -> IpcResponse {
    let state = lock(state);
    IpcResponse::success(state.search_history(query, limit.unwrap_or(DEFAULT_SEARCH_LIMIT)))
}

fn handle_create_tab_group(
    state: &Arc<Mutex<AppState>>,
    name: &str,
    urls: Option<Vec<String>>,
) -> IpcResponse {
    let mut state = lock(state);
    match state.create_tab_group(name, urls) {
        Ok(id) => IpcResponse::success(json!({ "id": id.0 })),
        Err(e) => IpcResponse::error(format!("Failed to create tab group: {}", e)),
    }
}

fn handle_get_tab_groups(state: &Arc<Mutex<AppState>>) -> IpcResponse {
    let state = lock(state);
    let groups: Vec<TabGroupInfo> = state
        .groups
        .list()
        .into_iter()
        .map(|group| TabGroupInfo {
            id: group.id.0,
            name: group.name.clone(),
            tab_count: group.urls.len(),
            urls: group.urls.clone(),
        })
        .collect();
    IpcResponse::success(groups)
}

fn handle_open_tab_group(state: &Arc<Mutex<AppState>>, id: u64) -> IpcResponse {
    let mut state = lock(state);
    match state.open_tab_group(TabGroupId(id)) {
        Ok(ids) => {
            let views = view_requests(&mut state);
            IpcResponse::success(json!({ "opened": ids, "views": views }))
        }
        Err(e) => IpcResponse::error(format!("Failed to open tab group: {}", e)),
    }
}

fn handle_remove_tab_group(state: &Arc<Mutex<AppState>>, id: u64) -> IpcResponse {
    let mut state = lock(state);
    match state.remove_tab_group(TabGroupId(id)) {
        Ok(group) => IpcResponse::success(json!({ "removed": group.id.0, "name": group.name })),
        Err(e) => IpcResponse::error(format!("Failed to remove tab group: {}", e)),
    }
}

fn handle_check_url(state: &Arc<Mutex<AppState>>, url: &str) -> IpcResponse {
    let state = lock(state);
    IpcResponse::success(json!({ "blocked": state.check_url(url) }))
}

fn handle_set_adblock_enabled(state: &Arc<Mutex<AppState>>, enabled: bool) -> IpcResponse {
    let mut state = lock(state);
    state.set_adblock_enabled(enabled);
    IpcResponse::success(json!({ "enabled": enabled }))
}

fn handle_get_shield_stats(state: &Arc<Mutex<AppState>>) -> IpcResponse {
    let state = lock(state);
    IpcResponse::success(state.shield_stats())
}

fn handle_add_adblock_rule(state: &Arc<Mutex<AppState>>, rule: &str) -> IpcResponse {
    let mut state = lock(state);
    match state.add_adblock_rule(rule) {
        Ok(added) => IpcResponse::success(json!({ "added": added })),
        Err(e) => IpcResponse::error(format!("Failed to add rule: {}", e)),
    }
}

fn handle_remove_adblock_rule(state: &Arc<Mutex<AppState>>, rule: &str) -> IpcResponse {
    let mut state = lock(state);
    match state.remove_adblock_rule(rule) {
        Ok(removed) => IpcResponse::success(json!({ "removed": removed })),
        Err(e) => IpcResponse::error(format!("Failed to remove rule: {}", e)),
    }
}

fn handle_reload_adblock_rules(state: &Arc<Mutex<AppState>>) -> IpcResponse {
    let mut state = lock(state);
    let count = state.reload_adblock_rules();
    info!("Reloaded {} ad-block rules", count);
    IpcResponse::success(json!({ "rule_count": count }))
}

fn handle_set_theme(state: &Arc<Mutex<AppState>>, theme: ThemeMode) -> IpcResponse {
    let mut state = lock(state);
    let notified = state.set_theme(theme);
    IpcResponse::success(json!({ "theme": theme, "notified": notified }))
}

fn handle_take_notices(state: &Arc<Mutex<AppState>>) -> IpcResponse {
    let mut state = lock(state);
    IpcResponse::success(state.take_notices())
}

fn handle_save(state: &Arc<Mutex<AppState>>, live: Option<&LiveState>) -> IpcResponse {
    let mut state = lock(state);
    let result = match live {
        Some(live) => state.shutdown(live),
        None => state.save(),
    };
    match result {
        Ok(()) => IpcResponse::success(json!({ "saved": !state.is_private() })),
        Err(e) => IpcResponse::error(format!("Failed to save: {}", e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nowb_core::AppConfig;
    use tempfile::tempdir;

    fn send(state: &Arc<Mutex<AppState>>, raw: &str) -> serde_json::Value {
        let message: IpcMessage = serde_json::from_str(raw).unwrap();
        serde_json::to_value(handle_message(state, message)).unwrap()
    }

    fn new_state(dir: &std::path::Path) -> Arc<Mutex<AppState>> {
        Arc::new(Mutex::new(AppState::new(AppConfig::with_data_dir(dir))))
    }

    #[test]
    fn test_document_round_trip() {
        let dir = tempdir().unwrap();
        let state = new_state(dir.path());

        let updated = send(
            &state,
            r#"{"cmd":"update_document","partial":{"home_url":"https://start.example"}}"#,
        );
        assert_eq!(updated["type"], "success");

        let doc = send(&state, r#"{"cmd":"get_document"}"#);
        assert_eq!(doc["data"]["home_url"], "https://start.example");

        let rejected = send(
            &state,
            r#"{"cmd":"update_document","partial":{"window_size":"big"}}"#,
        );
        assert_eq!(rejected["type"], "error");
    }

    #[test]
    fn test_session_flow() {
        let dir = tempdir().unwrap();
        let state = new_state(dir.path());
        lock(&state).update_document(
            serde_json::from_str(
                r#"{"last_session":["https://a.example","https://b.example","https://c.example"]}"#,
            )
            .unwrap(),
        )
        .unwrap();

        let plan = send(&state, r#"{"cmd":"plan_session"}"#);
        assert_eq!(plan["data"][0]["state"], "materialized");
        assert_eq!(plan["data"][1]["state"], "placeholder");
        assert_eq!(plan["data"][2]["title"], "c.example");

        let restored = send(&state, r#"{"cmd":"restore_session"}"#);
        assert_eq!(restored["data"]["views"].as_array().unwrap().len(), 1);

        let first = send(&state, r#"{"cmd":"activate_tab","index":1}"#);
        assert_eq!(first["data"]["materialized"], true);
        let second = send(&state, r#"{"cmd":"activate_tab","index":1}"#);
        assert_eq!(second["data"]["materialized"], false);

        // the id from a tab summary goes straight back
        let id = &restored["data"]["tabs"][2]["id"];
        let by_id = send(
            &state,
            &json!({ "cmd": "materialize_tab", "id": id }).to_string(),
        );
        assert_eq!(by_id["data"]["materialized"], true);

        let again = send(&state, r#"{"cmd":"restore_session"}"#);
        assert_eq!(again["type"], "error");
    }

    #[test]
    fn test_record_visit_with_numeric_tab_id() {
        let dir = tempdir().unwrap();
        let state = new_state(dir.path());

        let opened = send(&state, r#"{"cmd":"open_tab","url":"https://a.example"}"#);
        let id = &opened["data"]["id"];
        let visit = send(
            &state,
            &json!({ "cmd": "record_visit", "url": "https://b.example", "title": "B", "tab_id": id })
                .to_string(),
        );
        assert_eq!(visit["data"]["recorded"], true);

        let tabs = send(&state, r#"{"cmd":"get_tabs"}"#);
        assert_eq!(tabs["data"][0]["url"], "https://b.example");
        assert_eq!(tabs["data"][0]["title"], "B");
    }

    #[test]
    fn test_history_commands() {
        let dir = tempdir().unwrap();
        let state = new_state(dir.path());

        send(&state, r#"{"cmd":"record_visit","url":"https://a.example","title":"A"}"#);
        let dup = send(&state, r#"{"cmd":"record_visit","url":"https://a.example","title":"A"}"#);
        assert_eq!(dup["data"]["recorded"], false);
        send(&state, r#"{"cmd":"record_visit","url":"https://b.example","title":"B"}"#);

        let history = send(&state, r#"{"cmd":"get_history"}"#);
        assert_eq!(history["data"][0]["url"], "https://b.example");
        assert_eq!(history["data"].as_array().unwrap().len(), 2);

        let found = send(&state, r#"{"cmd":"search_history","query":"b.ex"}"#);
        assert_eq!(found["data"][0]["title"], "B");

        send(&state, r#"{"cmd":"clear_history"}"#);
        let empty = send(&state, r#"{"cmd":"get_history"}"#);
        assert!(empty["data"].as_array().unwrap().is_empty());
    }

    #[test]
    fn test_tab_group_commands() {
        let dir = tempdir().unwrap();
        let state = new_state(dir.path());

        let created = send(
            &state,
            r#"{"cmd":"create_tab_group","name":"Reading","urls":["https://a.example"]}"#,
        );
        let id = created["data"]["id"].as_u64().unwrap();

        let groups = send(&state, r#"{"cmd":"get_tab_groups"}"#);
        assert_eq!(groups["data"][0]["name"], "Reading");

        let opened = send(&state, &format!(r#"{{"cmd":"open_tab_group","id":{}}}"#, id));
        assert_eq!(opened["data"]["opened"].as_array().unwrap().len(), 1);

        let missing = send(&state, r#"{"cmd":"open_tab_group","id":99}"#);
        assert_eq!(missing["type"], "error");

        let removed = send(&state, &format!(r#"{{"cmd":"remove_tab_group","id":{}}}"#, id));
        assert_eq!(removed["data"]["name"], "Reading");
        let groups = send(&state, r#"{"cmd":"get_tab_groups"}"#);
        assert!(groups["data"].as_array().unwrap().is_empty());
    }

    fn route(windows: &mut Windows, raw: &str) -> serde_json::Value {
        let request: IpcRequest = serde_json::from_str(raw).unwrap();
        serde_json::to_value(handle_request(windows, request)).unwrap()
    }

    #[test]
    fn test_private_window_routing() {
        let dir = tempdir().unwrap();
        let config = AppConfig::with_data_dir(dir.path());
        let mut windows = Windows::new(AppState::new(config.clone()));

        let opened = route(&mut windows, r#"{"cmd":"open_private_window"}"#);
        let window = opened["data"]["window"].as_u64().unwrap();
        assert_eq!(opened["data"]["tabs"][0]["title"], "Private Tab");
        assert_eq!(opened["data"]["views"].as_array().unwrap().len(), 1);

        let status = route(
            &mut windows,
            &format!(r#"{{"cmd":"get_status","window":{}}}"#, window),
        );
        assert_eq!(status["data"]["private"], true);

        // theme set from the main window reaches the private one
        let themed = route(&mut windows, r#"{"cmd":"set_theme","theme":"dark"}"#);
        assert_eq!(themed["data"]["notified"], 2);
        let status = route(
            &mut windows,
            &format!(r#"{{"cmd":"get_status","window":{}}}"#, window),
        );
        assert_eq!(status["data"]["theme"], "dark");

        let write = route(
            &mut windows,
            &format!(
                r#"{{"cmd":"add_favorite","name":"Secret","url":"https://secret.example","window":{}}}"#,
                window
            ),
        );
        assert_eq!(write["type"], "error");

        let closed = route(
            &mut windows,
            &format!(r#"{{"cmd":"close_window","window":{}}}"#, window),
        );
        assert_eq!(closed["data"]["closed"], window);
        let gone = route(
            &mut windows,
            &format!(r#"{{"cmd":"get_tabs","window":{}}}"#, window),
        );
        assert_eq!(gone["type"], "error");

        let themed = route(&mut windows, r#"{"cmd":"set_theme","theme":"light"}"#);
        assert_eq!(themed["data"]["notified"], 1);

        let main_close = route(&mut windows, r#"{"cmd":"close_window"}"#);
        assert_eq!(main_close["type"], "error");
        assert!(!config.settings_path().exists());
    }

    #[test]
    fn test_first_run_and_rule_commands() {
        let dir = tempdir().unwrap();
        let state = new_state(dir.path());

        let done = send(
            &state,
            r#"{"cmd":"complete_first_run","home_url":"https://start.example","search_engine":"Bing"}"#,
        );
        assert_eq!(done["data"]["first_run_completed"], true);
        assert_eq!(done["data"]["home_url"], "https://start.example");
        assert_eq!(done["data"]["search_engine_name"], "Bing");

        let favorites = send(
            &state,
            r#"{"cmd":"add_favorite","name":"Docs","url":"https://docs.rs"}"#,
        );
        assert_eq!(favorites["data"]["Docs"], "https://docs.rs");
        let removed = send(&state, r#"{"cmd":"remove_favorite","name":"Docs"}"#);
        assert_eq!(removed["data"]["removed"], true);

        let added = send(&state, r#"{"cmd":"add_adblock_rule","rule":"tracker.example"}"#);
        assert_eq!(added["data"]["added"], true);
        let blocked = send(&state, r#"{"cmd":"check_url","url":"https://tracker.example/p"}"#);
        assert_eq!(blocked["data"]["blocked"], true);

        let removed = send(&state, r#"{"cmd":"remove_adblock_rule","rule":"tracker.example"}"#);
        assert_eq!(removed["data"]["removed"], true);
        let reloaded = send(&state, r#"{"cmd":"reload_adblock_rules"}"#);
        assert_eq!(
            reloaded["data"]["rule_count"],
            nowb_shield::DEFAULT_RULES.len()
        );
    }

    #[test]
    fn test_shield_and_search_commands() {
        let dir = tempdir().unwrap();
        let state = new_state(dir.path());

        let blocked = send(&state, r#"{"cmd":"check_url","url":"https://doubleclick.net/x"}"#);
        assert_eq!(blocked["data"]["blocked"], true);
        send(&state, r#"{"cmd":"set_adblock_enabled","enabled":false}"#);
        let allowed = send(&state, r#"{"cmd":"check_url","url":"https://doubleclick.net/x"}"#);
        assert_eq!(allowed["data"]["blocked"], false);

        let engine = send(&state, r#"{"cmd":"set_search_engine","name":"Bing"}"#);
        assert_eq!(engine["data"]["name"], "Bing");
        let resolved = send(&state, r#"{"cmd":"resolve_input","text":"hello world"}"#);
        assert_eq!(resolved["data"]["kind"], "search");
        assert_eq!(
            resolved["data"]["url"],
            "https://www.bing.com/search?q=hello%20world"
        );
    }

    #[test]
    fn test_notices_and_save() {
        let dir = tempdir().unwrap();
        let state = new_state(dir.path());

        let notices = send(&state, r#"{"cmd":"take_notices"}"#);
        assert_eq!(notices["data"][0]["level"], "info");

        let saved = send(
            &state,
            r#"{"cmd":"save","live":{"tab_urls":["https://a.example"]}}"#,
        );
        assert_eq!(saved["data"]["saved"], true);
        assert!(AppConfig::with_data_dir(dir.path()).settings_path().exists());
    }
}
