use eframe::egui::{self, Align2, Button, Ui};

use super::common::{section_frame, UiColors};
use crate::persistence::{LogicalControl, Settings, ThumbstickMapping, KEY_OPTIONS};

/// State of the settings area that is not itself a setting.
#[derive(Default)]
pub struct SettingsMenuData {
    confirm_reset: bool,
}

impl SettingsMenuData {
    /// Edits `settings` in place; the caller persists whatever changed.
    pub fn render(&mut self, ui: &mut Ui, settings: &mut Settings) {
        ui.vertical(|ui| {
            ui.heading("Settings");

            let section_spacing = 5.0;

            self.render_controls_section(ui, settings);
            ui.add_space(section_spacing);

            self.render_bindings_section(ui, settings);
            ui.add_space(section_spacing);

            self.render_reset_section(ui, settings);
            ui.add_space(section_spacing);

            render_credits(ui);
        });
    }

    fn render_controls_section(&mut self, ui: &mut Ui, settings: &mut Settings) {
        section_frame().show(ui, |ui| {
            ui.set_min_width(ui.available_width());
            ui.heading("Controls");

            ui.checkbox(&mut settings.show_controls, "Show on-screen controls");
            ui.checkbox(&mut settings.use_direction_pad, "Use direction pad");

            ui.horizontal(|ui| {
                ui.label("Thumbstick mapping:");
                egui::ComboBox::from_id_salt("thumbstick_mapping")
                    .selected_text(settings.thumbstick_mapping.as_str())
                    .show_ui(ui, |ui| {
                        for mapping in ThumbstickMapping::ALL {
                            ui.selectable_value(
                                &mut settings.thumbstick_mapping,
                                mapping,
                                mapping.as_str(),
                            );
                        }
                    });
            });
        });
    }

    fn render_bindings_section(&mut self, ui: &mut Ui, settings: &mut Settings) {
        section_frame().show(ui, |ui| {
            ui.set_min_width(ui.available_width());
            ui.heading("Key Bindings");

            egui::Grid::new("key_bindings")
                .num_columns(2)
                .spacing([20.0, 6.0])
                .show(ui, |ui| {
                    for control in LogicalControl::ALL {
                        ui.label(control.label());

                        let current = settings
                            .key_bindings
                            .binding(control)
                            .unwrap_or("None")
                            .to_string();
                        egui::ComboBox::from_id_salt(control.as_str())
                            .selected_text(current.as_str())
                            .show_ui(ui, |ui| {
                                for key in KEY_OPTIONS {
                                    if ui.selectable_label(current == key, key).clicked() {
                                        settings.key_bindings.set(control, key);
                                    }
                                }
                            });
                        ui.end_row();
                    }
                });
        });
    }

    fn render_reset_section(&mut self, ui: &mut Ui, settings: &mut Settings) {
        section_frame().show(ui, |ui| {
            ui.set_min_width(ui.available_width());
            if ui
                .add(Button::new("Reset to Default").fill(UiColors::INACTIVE))
                .clicked()
            {
                self.confirm_reset = true;
            }
        });

        if !self.confirm_reset {
            return;
        }

        egui::Window::new("Reset Settings")
            .collapsible(false)
            .resizable(false)
            .anchor(Align2::CENTER_CENTER, [0.0, 0.0])
            .show(ui.ctx(), |ui| {
                ui.label("Are you sure you want to reset all settings to default?");
                ui.horizontal(|ui| {
                    if ui.button("Cancel").clicked() {
                        self.confirm_reset = false;
                    }
                    if ui
                        .add(Button::new("Reset").fill(UiColors::INACTIVE))
                        .clicked()
                    {
                        settings.reset();
                        self.confirm_reset = false;
                    }
                });
            });
    }
}

fn render_credits(ui: &mut Ui) {
    section_frame().show(ui, |ui| {
        ui.set_min_width(ui.available_width());
        ui.heading("Credits");
        ui.label("App made by Stephen");
        ui.hyperlink_to("Flash code by Ruffle", "https://ruffle.rs");
    });
}
