use eframe::egui;

use crate::ui::state::LoginForm;

/// Returns true when the form was submitted.
pub fn render(ui: &mut egui::Ui, form: &mut LoginForm) -> bool {
    let mut submit = false;
    let title = if form.new_user { "Sign up" } else { "Log in" };

    ui.vertical_centered(|ui| {
        ui.add_space(24.0);
        ui.heading(title);
        ui.add_space(8.0);

        egui::Grid::new("login_form")
            .num_columns(2)
            .spacing([8.0, 6.0])
            .show(ui, |ui| {
                ui.label("Username");
                ui.text_edit_singleline(&mut form.username);
                ui.end_row();

                ui.label("Password");
                let response =
                    ui.add(egui::TextEdit::singleline(&mut form.password).password(true));
                if response.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter)) {
                    submit = true;
                }
                ui.end_row();
            });

        ui.add_space(8.0);
        ui.add_enabled_ui(!form.pending, |ui| {
            if ui.button(title).clicked() {
                submit = true;
            }
        });
        if form.pending {
            ui.spinner();
        }

        let toggle = if form.new_user {
            "Already have an account? Log in"
        } else {
            "New here? Create an account"
        };
        if ui.link(toggle).clicked() {
            form.new_user = !form.new_user;
        }
    });

    submit && !form.pending
}
