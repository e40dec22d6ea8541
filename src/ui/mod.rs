//! # StikFlash User Interface
//!
//! egui presentation shell around the content server. Three areas share the
//! usual three-panel layout: a top navigation bar, the central area for the
//! active [`MenuState`] and a bottom status line.
//!
//! The shell owns the lifecycle of the loopback server and the settings:
//!
//! ```text
//! appear   ──► ContentServer::start, open player page, SettingsStore::load
//! change   ──► SettingsStore::save, watch<Settings> ──► mapping engine
//! teardown ──► space bar release, release all keys, server stop, save
//! ```
//!
//! Errors in any of these flows are logged and never shown to the user.

pub mod common;
pub mod controls;
pub mod library_menu;
pub mod settings_menu;

use std::path::PathBuf;
use std::time::Duration;

use eframe::egui::{self, Button, RichText, Vec2};
use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info, warn};

use crate::bridge::{ContentBridge, EventBridge};
use crate::controller::GamepadSnapshot;
use crate::mapping::{translator, KeyPhase};
use crate::persistence::library::{FileLibrary, ImportedFile};
use crate::persistence::settings_store::SettingsStore;
use crate::persistence::{LogicalControl, Settings};
use crate::server::ContentServer;

use self::common::{section_frame, MenuState};
use self::controls::{SpaceBar, VirtualController};
use self::library_menu::LibraryMenuData;
use self::settings_menu::SettingsMenuData;

/// Everything the shell needs from the rest of the application.
pub struct ShellParts {
    pub server: ContentServer,
    pub bridge: EventBridge,
    pub settings_store: SettingsStore,
    pub settings_tx: watch::Sender<Settings>,
    pub snapshot_tx: mpsc::Sender<GamepadSnapshot>,
    pub library: FileLibrary,
    pub stick_press_threshold: f32,
    pub open_player: bool,
}

pub struct StikFlashUI {
    menu_state: MenuState,

    server: ContentServer,

    bridge: EventBridge,

    settings_store: SettingsStore,

    /// Settings as edited by the UI this frame
    settings: Settings,

    /// Settings as last persisted and published
    saved_settings: Settings,

    settings_tx: watch::Sender<Settings>,

    /// On-screen controller feeds the same channel as the physical pad
    snapshot_tx: mpsc::Sender<GamepadSnapshot>,

    library_menu_data: LibraryMenuData,

    settings_menu_data: SettingsMenuData,

    virtual_controller: VirtualController,

    space_bar: SpaceBar,

    torn_down: bool,
}

impl StikFlashUI {
    pub fn new(cc: &eframe::CreationContext<'_>, parts: ShellParts) -> Self {
        cc.egui_ctx.set_theme(egui::Theme::Dark);

        let ShellParts {
            mut server,
            bridge,
            settings_store,
            settings_tx,
            snapshot_tx,
            library,
            stick_press_threshold,
            open_player,
        } = parts;

        match server.start() {
            Ok(addr) => {
                info!("Player page available at {} ({})", server.url(), addr);
                if open_player {
                    cc.egui_ctx.open_url(egui::OpenUrl::new_tab(server.url()));
                }
            }
            Err(e) => error!("Failed to start content server: {}", e),
        }

        let settings = settings_store.load();
        settings_tx.send_replace(settings.clone());

        Self {
            menu_state: MenuState::Player,
            server,
            bridge,
            settings_store,
            saved_settings: settings.clone(),
            settings,
            settings_tx,
            snapshot_tx,
            library_menu_data: LibraryMenuData::new(library),
            settings_menu_data: SettingsMenuData::default(),
            virtual_controller: VirtualController::new(stick_press_threshold),
            space_bar: SpaceBar::default(),
            torn_down: false,
        }
    }

    /// Saves and publishes settings if the UI changed them this frame.
    fn sync_settings(&mut self) {
        if self.settings == self.saved_settings {
            return;
        }
        debug!("Settings changed: {:?}", self.settings);

        if let Err(e) = self.settings_store.save(&self.settings) {
            error!("Failed to save settings: {}", e);
        }
        self.settings_tx.send_replace(self.settings.clone());
        self.saved_settings = self.settings.clone();
    }

    fn load_file(&mut self, file: ImportedFile) {
        info!("Selected {}", file.file_name());
        self.server.load_file(file.path());
        self.server.schedule_reload();
        self.menu_state = MenuState::Player;
    }

    fn send_space(&self, phase: KeyPhase) {
        let bindings = &self.settings.key_bindings;
        let intent = match phase {
            KeyPhase::Down => translator::press(bindings, LogicalControl::Space),
            KeyPhase::Up => translator::release(bindings, LogicalControl::Space),
        };
        if let Some(intent) = intent {
            self.bridge.dispatch_key(intent);
        }
    }

    fn send_snapshot(&self, snapshot: GamepadSnapshot) {
        if let Err(e) = self.snapshot_tx.try_send(snapshot) {
            warn!("Dropped on-screen controller snapshot: {}", e);
        }
    }

    fn import_dropped_files(&mut self, ctx: &egui::Context) {
        let dropped: Vec<PathBuf> = ctx.input(|i| {
            i.raw
                .dropped_files
                .iter()
                .filter_map(|file| file.path.clone())
                .collect()
        });
        if !dropped.is_empty() {
            info!("{} files dropped", dropped.len());
            self.library_menu_data.import_paths(&dropped);
            self.menu_state = MenuState::Library;
        }
    }

    fn render_player(&mut self, ui: &mut egui::Ui) {
        ui.vertical(|ui| {
            ui.heading("Player");

            section_frame().show(ui, |ui| {
                ui.set_min_width(ui.available_width());
                ui.horizontal(|ui| {
                    ui.label("Open in browser:");
                    let url = self.server.url();
                    ui.hyperlink_to(url.as_str(), url.as_str());
                });
                let loaded = match self.server.current_file() {
                    Some(path) => ImportedFile::new(path).display_name(),
                    None => "Nothing loaded, pick a file in the Library".to_string(),
                };
                ui.label(format!("Now playing: {}", loaded));
            });

            if !self.settings.show_controls {
                return;
            }

            ui.add_space((ui.available_height() - 260.0).max(0.0));
            ui.vertical_centered(|ui| {
                let binding = self
                    .settings
                    .key_bindings
                    .binding(LogicalControl::Space)
                    .unwrap_or("Space")
                    .to_string();
                if let Some(phase) = self.space_bar.render(ui, &binding) {
                    self.send_space(phase);
                }
            });
            ui.add_space(20.0);

            let use_direction_pad = self.settings.use_direction_pad;
            if let Some(snapshot) = self.virtual_controller.render(ui, use_direction_pad) {
                self.send_snapshot(snapshot);
            }
        });
    }

    /// Stops the server and lets go of every key. Runs once.
    fn teardown(&mut self) {
        if self.torn_down {
            return;
        }
        self.torn_down = true;
        info!("Tearing down player shell");

        // Releases go out while the page is still attached
        let releases = translator::release(&self.settings.key_bindings, LogicalControl::Space)
            .into_iter()
            .chain(translator::release_all(&self.settings));
        self.server.release_and_stop(releases);

        if let Err(e) = self.settings_store.save(&self.settings) {
            error!("Failed to save settings: {}", e);
        }
    }
}

impl eframe::App for StikFlashUI {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.import_dropped_files(ctx);

        egui::CentralPanel::default().show(ctx, |ui| {
            ui.ctx().request_repaint_after(Duration::from_millis(33));
            let width = ui.available_width() - 40.0;

            egui::TopBottomPanel::top("top_panel")
                .show_separator_line(false)
                .show_inside(ui, |ui| {
                    ui.horizontal_centered(|ui| {
                        for menu in MenuState::ALL {
                            let button = Button::new(menu.title())
                                .selected(self.menu_state == menu)
                                .min_size(Vec2 {
                                    x: width / 3.0,
                                    y: 20.0,
                                });
                            if ui.add(button).clicked() {
                                self.menu_state = menu;
                            }
                        }
                    });
                });

            egui::TopBottomPanel::bottom("bottom_panel")
                .show_separator_line(false)
                .show_inside(ui, |ui| {
                    ui.horizontal_centered(|ui| {
                        let status = if self.server.is_running() {
                            RichText::new("● Server").color(common::UiColors::ACTIVE)
                        } else {
                            RichText::new("● Server").color(common::UiColors::INACTIVE)
                        };
                        ui.label(status);
                        ui.label(self.server.url());
                        ui.label(format!("Pages: {}", self.bridge.page_count()));
                    });
                });

            egui::CentralPanel::default().show_inside(ui, |ui| match self.menu_state {
                MenuState::Player => self.render_player(ui),
                MenuState::Library => {
                    if let Some(file) = self.library_menu_data.render(ui) {
                        self.load_file(file);
                    }
                }
                MenuState::Settings => self.settings_menu_data.render(ui, &mut self.settings),
            });
        });

        if !self.settings.show_controls || self.menu_state != MenuState::Player {
            if let Some(snapshot) = self.virtual_controller.release() {
                self.send_snapshot(snapshot);
            }
            if let Some(phase) = self.space_bar.release() {
                self.send_space(phase);
            }
        }

        self.sync_settings();
    }

    fn on_exit(&mut self, _gl: Option<&eframe::glow::Context>) {
        self.teardown();
    }
}

impl Drop for StikFlashUI {
    fn drop(&mut self) {
        self.teardown();
    }
}
