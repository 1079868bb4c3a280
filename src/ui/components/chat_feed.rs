use eframe::egui;

use crate::common::{ChatMessage, ConnectionState};

pub enum FeedAction {
    Connect,
}

pub fn render(
    ui: &mut egui::Ui,
    connection: ConnectionState,
    messages: &[ChatMessage],
    own_name: &str,
) -> Option<FeedAction> {
    match connection {
        ConnectionState::Disconnected => {
            ui.vertical_centered(|ui| {
                ui.add_space(24.0);
                ui.label("You are not connected.");
                if ui.button("Connect").clicked() {
                    return Some(FeedAction::Connect);
                }
                None
            })
            .inner
        }
        ConnectionState::Connecting => {
            ui.horizontal(|ui| {
                ui.spinner();
                ui.label("Connecting...");
            });
            None
        }
        ConnectionState::Connected => {
            render_messages(ui, messages, own_name);
            None
        }
    }
}

fn render_messages(ui: &mut egui::Ui, messages: &[ChatMessage], own_name: &str) {
    let height = (ui.available_height() - 56.0).max(80.0);
    egui::ScrollArea::vertical()
        .max_height(height)
        .auto_shrink([false, false])
        .stick_to_bottom(true)
        .show(ui, |ui| {
            if messages.is_empty() {
                ui.weak("No messages yet.");
            }
            for message in messages {
                let color = if message.sender == own_name {
                    egui::Color32::LIGHT_BLUE
                } else {
                    egui::Color32::LIGHT_GREEN
                };
                ui.horizontal_wrapped(|ui| {
                    ui.weak(format!("[{}]", message.timestamp));
                    ui.colored_label(color, format!("{}:", message.sender));
                    ui.label(&message.payload);
                });
            }
        });
}
