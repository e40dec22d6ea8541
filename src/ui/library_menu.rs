use std::collections::HashSet;
use std::path::PathBuf;

use eframe::egui::{self, vec2, Label, RichText, ScrollArea, Sense, Stroke, TextEdit, Ui};
use tracing::{debug, error, info};

use super::common::{grid_columns, section_frame, UiColors};
use crate::persistence::library::{FileLibrary, FilesystemAccess, ImportedFile};

const TILE_HEIGHT: f32 = 90.0;

pub struct LibraryMenuData {
    library: FileLibrary,
    files: Vec<ImportedFile>,
    selecting: bool,
    selected: HashSet<ImportedFile>,
    import_path: String,
}

impl LibraryMenuData {
    pub fn new(library: FileLibrary) -> Self {
        let mut data = Self {
            library,
            files: Vec::new(),
            selecting: false,
            selected: HashSet::new(),
            import_path: String::new(),
        };
        data.refresh();
        data
    }

    /// Re-reads the library directory.
    pub fn refresh(&mut self) {
        match self.library.list() {
            Ok(files) => self.files = files,
            Err(e) => error!("Error loading imported files: {}", e),
        }
    }

    /// Imports dropped or typed paths and refreshes the listing.
    pub fn import_paths(&mut self, paths: &[PathBuf]) {
        if paths.is_empty() {
            return;
        }
        let imported = self
            .library
            .import_all(paths.iter().map(PathBuf::as_path), &FilesystemAccess);
        info!("Imported {} of {} files", imported.len(), paths.len());
        self.refresh();
    }

    pub fn toggle_selecting(&mut self) {
        self.selecting = !self.selecting;
        if !self.selecting {
            self.selected.clear();
        }
    }

    pub fn toggle_selection(&mut self, file: &ImportedFile) {
        if !self.selected.remove(file) {
            self.selected.insert(file.clone());
        }
    }

    /// Deletes the selection and leaves select mode.
    pub fn delete_selected(&mut self) {
        let deleted = self.library.delete_all(&self.selected);
        debug!("Deleted {} of {} selected files", deleted.len(), self.selected.len());
        self.files.retain(|file| !deleted.contains(file));
        self.selected.clear();
        self.selecting = false;
    }

    /// Renders the library. Returns the file the user picked to play.
    pub fn render(&mut self, ui: &mut Ui) -> Option<ImportedFile> {
        let mut picked = None;

        ui.vertical(|ui| {
            ui.horizontal(|ui| {
                ui.heading("Library");
                ui.add(
                    TextEdit::singleline(&mut self.import_path)
                        .hint_text("Path to .swf file (or drop files here)"),
                );
                if ui.button("Import").clicked() {
                    let path = PathBuf::from(self.import_path.trim());
                    self.import_paths(&[path]);
                    self.import_path.clear();
                }
                let select_label = if self.selecting { "Done" } else { "Select" };
                if ui.button(select_label).clicked() {
                    self.toggle_selecting();
                }
                if self.selecting
                    && ui
                        .add(egui::Button::new("Delete").fill(UiColors::INACTIVE))
                        .clicked()
                {
                    self.delete_selected();
                }
            });

            section_frame().show(ui, |ui| {
                ui.set_min_size(ui.available_size());
                if self.files.is_empty() {
                    ui.label("No imported files yet");
                    return;
                }

                let columns = grid_columns(ui.available_width());
                let tile_width = ui.available_width() / columns as f32 - 8.0;

                ScrollArea::vertical().show(ui, |ui| {
                    egui::Grid::new("library_grid")
                        .spacing(vec2(8.0, 8.0))
                        .show(ui, |ui| {
                            for (idx, file) in self.files.clone().iter().enumerate() {
                                if self.render_tile(ui, file, tile_width) {
                                    if self.selecting {
                                        self.toggle_selection(file);
                                    } else {
                                        picked = Some(file.clone());
                                    }
                                }
                                if (idx + 1) % columns == 0 {
                                    ui.end_row();
                                }
                            }
                        });
                });
            });
        });

        picked
    }

    /// Draws one tile; true when it was clicked.
    fn render_tile(&self, ui: &mut Ui, file: &ImportedFile, width: f32) -> bool {
        let stroke = if self.selected.contains(file) {
            Stroke::new(2.0, UiColors::ACTIVE)
        } else {
            Stroke::new(1.0, UiColors::BORDER)
        };

        egui::Frame::new()
            .stroke(stroke)
            .fill(UiColors::EXTREME_BG)
            .inner_margin(6)
            .corner_radius(8.0)
            .show(ui, |ui| {
                ui.set_min_size(vec2(width, TILE_HEIGHT));
                ui.vertical_centered(|ui| {
                    ui.label(RichText::new("🎮").size(32.0));
                    ui.add(Label::new(RichText::new(file.display_name()).size(11.0)).truncate());
                });
            })
            .response
            .interact(Sense::click())
            .clicked()
    }
}
