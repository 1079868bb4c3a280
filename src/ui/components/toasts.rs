use eframe::egui;

use crate::ui::state::Toast;

pub fn render(ui: &mut egui::Ui, toasts: &[Toast]) {
    for toast in toasts {
        egui::Frame::group(ui.style())
            .fill(ui.visuals().faint_bg_color)
            .show(ui, |ui| {
                ui.strong(&toast.title);
                ui.label(&toast.message);
            });
    }
}
