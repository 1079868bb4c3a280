use eframe::egui;

use crate::common::MAX_MESSAGE_CHARS;

/// Returns true when the user asked to send the current text.
pub fn render(ui: &mut egui::Ui, input_text: &mut String, error: Option<&str>) -> bool {
    let mut send = false;
    ui.horizontal(|ui| {
        let response = ui.add(
            egui::TextEdit::singleline(input_text)
                .hint_text("Say something")
                .char_limit(MAX_MESSAGE_CHARS),
        );
        if ui.button("Send").clicked() {
            send = true;
        }

        if response.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter)) {
            send = true;
            response.request_focus();
        }
    });

    ui.horizontal(|ui| {
        ui.small(format!(
            "{}/{}",
            input_text.chars().count(),
            MAX_MESSAGE_CHARS
        ));
        if let Some(error) = error {
            ui.colored_label(egui::Color32::LIGHT_RED, error);
        }
    });

    send
}
