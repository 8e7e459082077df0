use std::path::PathBuf;
use std::sync::Arc;

use log::{error, info};
use paste_ocr::clipboard::{self, ClipboardWriter};
use paste_ocr::{ClipboardEvent, ClipboardItem, Config, HttpRecognitionClient, PasteWorkflow, ViewState};
use serde::Serialize;
use tauri::{AppHandle, DragDropEvent, Emitter, Manager, WindowEvent};
use tauri_plugin_clipboard_manager::ClipboardExt;

const CONFIG_FILE: &str = "paste-ocr.toml";

struct AppState {
    workflow: PasteWorkflow,
}

/// Copy button target: the system clipboard behind the clipboard-manager plugin.
struct TauriClipboard(AppHandle);

impl ClipboardWriter for TauriClipboard {
    fn write_text(&self, text: &str) -> anyhow::Result<()> {
        self.0.clipboard().write_text(text.to_string())?;
        Ok(())
    }
}

#[derive(Clone, Serialize)]
struct ImageChanged {
    src: Option<String>,
    visible: bool,
}

#[derive(Serialize)]
struct LanguageOptions {
    options: Vec<String>,
    selected: String,
}

#[cfg_attr(mobile, tauri::mobile_entry_point)]
pub fn run() {
    tauri::Builder::default()
        .plugin(tauri_plugin_clipboard_manager::init())
        .setup(|app| {
            app.handle().plugin(
                tauri_plugin_log::Builder::default()
                    .level(log::LevelFilter::Info)
                    .build(),
            )?;

            let config_path = app.path().app_config_dir()?.join(CONFIG_FILE);
            let config = Config::load(config_path.exists().then_some(config_path.as_path()))?;

            let endpoint = Arc::new(HttpRecognitionClient::new(&config.endpoint)?);
            let writer = Arc::new(TauriClipboard(app.handle().clone()));
            let workflow = PasteWorkflow::new(&config, endpoint, writer);

            forward_updates(app.handle().clone(), &workflow);
            app.manage(AppState { workflow });
            Ok(())
        })
        .on_window_event(|window, event| {
            if let WindowEvent::DragDrop(DragDropEvent::Drop { paths, .. }) = event {
                if let Some(path) = paths.first().cloned() {
                    let state = window.state::<AppState>();
                    let workflow = state.workflow.clone();
                    tauri::async_runtime::spawn(async move { paste_from_path(&workflow, path).await });
                }
            }
        })
        .invoke_handler(tauri::generate_handler![
            handle_paste,
            paste_image_file,
            select_language,
            copy_result,
            get_view,
            get_languages
        ])
        .run(tauri::generate_context!())
        .expect("error while running tauri application");
}

/// Pushes every view and copy-label change to the page. The image preview
/// travels separately and only when its source changes.
fn forward_updates(app: AppHandle, workflow: &PasteWorkflow) {
    let mut views = workflow.subscribe();
    let mut labels = workflow.subscribe_copy_label();

    tauri::async_runtime::spawn(async move {
        let mut shown_src: Option<String> = None;
        loop {
            tokio::select! {
                changed = views.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let view: ViewState = views.borrow_and_update().clone();
                    if view.image_src != shown_src {
                        shown_src = view.image_src.clone();
                        emit(&app, "image-changed", ImageChanged { src: shown_src.clone(), visible: view.image_visible });
                    }
                    emit(&app, "view-changed", view);
                }
                changed = labels.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let label = labels.borrow_and_update().clone();
                    emit(&app, "copy-label-changed", label);
                }
            }
        }
        info!("View forwarding stopped");
    });
}

fn emit<S: Serialize + Clone>(app: &AppHandle, event: &str, payload: S) {
    if let Err(e) = app.emit(event, payload) {
        error!("Failed to emit {} event: {}", event, e);
    }
}

async fn paste_from_path(workflow: &PasteWorkflow, path: PathBuf) {
    match clipboard::event_from_file(&path).await {
        Ok(event) => {
            workflow.handle_paste(event);
        }
        Err(e) => workflow.fail_capture(e),
    }
}

#[tauri::command]
async fn handle_paste(items: Vec<ClipboardItem>, state: tauri::State<'_, AppState>) -> Result<(), String> {
    info!("Paste received with {} items", items.len());
    state.workflow.handle_paste(ClipboardEvent::new(items));
    Ok(())
}

#[tauri::command]
async fn paste_image_file(path: String, state: tauri::State<'_, AppState>) -> Result<(), String> {
    paste_from_path(&state.workflow, PathBuf::from(path)).await;
    Ok(())
}

#[tauri::command]
async fn select_language(code: String, state: tauri::State<'_, AppState>) -> Result<(), String> {
    state
        .workflow
        .select_language(&code)
        .map(|_| ())
        .map_err(|e| e.to_string())
}

#[tauri::command]
async fn copy_result(state: tauri::State<'_, AppState>) -> Result<(), String> {
    state.workflow.copy_result().map_err(|e| e.to_string())
}

#[tauri::command]
async fn get_view(state: tauri::State<'_, AppState>) -> Result<ViewState, String> {
    Ok(state.workflow.view())
}

#[tauri::command]
async fn get_languages(state: tauri::State<'_, AppState>) -> Result<LanguageOptions, String> {
    Ok(LanguageOptions {
        options: state.workflow.languages().to_vec(),
        selected: state.workflow.language().as_str().to_string(),
    })
}
