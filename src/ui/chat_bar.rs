use crate::app::state::AppState;
use eframe::egui;

/// What the composer asked the app to do this frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComposerAction {
    Send,
    Upload,
}

pub fn draw_chat_bar(ui: &mut egui::Ui, state: &mut AppState) -> Option<ComposerAction> {
    let mut action = None;

    if let AppState::LoggedIn {
        draft,
        awaiting_reply,
        socket,
        last_error,
        ..
    } = state
    {
        ui.horizontal(|ui| {
            let response = ui.add_sized(
                [ui.available_width() - 140.0, 24.0],
                egui::TextEdit::singleline(draft).hint_text("Send a message"),
            );
            let enter_pressed =
                response.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter));

            let connected = socket.is_some();
            let can_send = !draft.is_empty() && connected;

            if ui.add_enabled(can_send, egui::Button::new("Send")).clicked()
                || (enter_pressed && can_send)
            {
                action = Some(ComposerAction::Send);
            }
            if ui
                .add_enabled(connected, egui::Button::new("Upload"))
                .clicked()
            {
                action = Some(ComposerAction::Upload);
            }
            if *awaiting_reply {
                ui.spinner();
            }
        });

        if let Some(error) = last_error {
            ui.colored_label(egui::Color32::RED, error.as_str());
        }
    }

    action
}
