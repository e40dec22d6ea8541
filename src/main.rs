pub mod bridge;
pub mod config;
pub mod controller;
pub mod mapping;
pub mod persistence;
pub mod server;
pub mod ui;

use std::sync::Arc;

use color_eyre::{eyre::eyre, Result};
use eframe::egui;
use tokio::runtime::Handle;
use tokio::sync::{mpsc, watch};
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

use crate::bridge::EventBridge;
use crate::config::AppConfig;
use crate::controller::{ControllerHandle, ControllerSettings};
use crate::mapping::MappingEngineHandle;
use crate::persistence::library::FileLibrary;
use crate::persistence::settings_store::SettingsStore;
use crate::server::ContentServer;
use crate::ui::{ShellParts, StikFlashUI};

#[tokio::main]
async fn main() -> Result<()> {
    setup()?;

    let config = AppConfig::load();
    info!("Starting StikFlash with config: {:?}", config);

    let settings_store = SettingsStore::new(config.settings_path());
    let (settings_tx, settings_rx) = watch::channel(settings_store.load());

    let bridge = EventBridge::new();

    let (snapshot_tx, snapshot_rx) = mpsc::channel(1000);
    let mut controller_handle = ControllerHandle::spawn(
        Some(ControllerSettings::from(&config.controller)),
        snapshot_tx.clone(),
    )
    .map_err(|e| eyre!("Failed to spawn controller: {}", e))?;

    let mut engine = MappingEngineHandle::new(
        "keyboard".to_string(),
        settings_rx,
        Arc::new(bridge.clone()),
    );
    engine.start(snapshot_rx)?;

    let parts = ShellParts {
        server: ContentServer::new(config.server.clone(), bridge.clone(), Handle::current()),
        bridge,
        settings_store,
        settings_tx,
        snapshot_tx,
        library: FileLibrary::new(config.library_dir()),
        stick_press_threshold: config.controller.stick_press_threshold,
        open_player: config.server.open_on_start,
    };

    info!("Starting UI");
    let native_options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title("StikFlash")
            .with_inner_size([1024.0, 720.0])
            .with_drag_and_drop(true),
        ..Default::default()
    };

    let ui_result = eframe::run_native(
        "StikFlash",
        native_options,
        Box::new(|cc| Ok(Box::new(StikFlashUI::new(cc, parts)))),
    );

    controller_handle.stop();
    if let Err(e) = engine.shutdown().await {
        error!("Mapping engine shutdown failed: {}", e);
    }

    ui_result.map_err(|e| eyre!("UI terminated with error: {}", e))
}

fn setup() -> Result<()> {
    if std::env::var("RUST_LIB_BACKTRACE").is_err() {
        std::env::set_var("RUST_LIB_BACKTRACE", "0")
    }
    color_eyre::install()?;
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "info")
    }
    setup_logging_env();
    Ok(())
}

fn setup_logging_env() {
    FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .pretty()
        .init();
}
