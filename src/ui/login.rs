use crate::app::state::{AppState, AuthMode};
use eframe::egui::{self, Align, Color32, Key, Layout, TextEdit};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginAction {
    Login,
    Signup,
}

pub fn draw_signed_out(ctx: &egui::Context, state: &mut AppState) -> Option<LoginAction> {
    let mut action = None;

    if let AppState::SignedOut {
        mode,
        email_input,
        username_input,
        password_input,
        error,
        notice,
    } = state
    {
        egui::CentralPanel::default().show(ctx, |ui| {
            ui.with_layout(Layout::top_down(Align::Center), |ui| {
                ui.add_space(ui.available_height() * 0.15);
                ui.heading("Parlance");
                ui.label("A conversational assistant client");
                ui.add_space(24.0);

                ui.allocate_ui(egui::Vec2::new(280.0, 0.0), |ui| {
                    ui.label("Email");
                    ui.add(TextEdit::singleline(email_input).hint_text("john.doe@example.com"));

                    if *mode == AuthMode::Signup {
                        ui.label("Username");
                        ui.add(TextEdit::singleline(username_input).hint_text("johndoe"));
                    }

                    ui.label("Password");
                    let response = ui.add(TextEdit::singleline(password_input).password(true));
                    let enter_pressed =
                        response.lost_focus() && ctx.input(|i| i.key_pressed(Key::Enter));

                    ui.add_space(12.0);

                    let filled = !email_input.is_empty()
                        && !password_input.is_empty()
                        && (*mode == AuthMode::Login || !username_input.is_empty());
                    let can_submit = filled;

                    let label = match mode {
                        AuthMode::Login => "Log in",
                        AuthMode::Signup => "Sign up",
                    };
                    if ui.add_enabled(can_submit, egui::Button::new(label)).clicked()
                        || (enter_pressed && can_submit)
                    {
                        action = Some(match mode {
                            AuthMode::Login => LoginAction::Login,
                            AuthMode::Signup => LoginAction::Signup,
                        });
                    }

                    let switch_label = match mode {
                        AuthMode::Login => "New here? Create an account",
                        AuthMode::Signup => "Already have an account? Log in",
                    };
                    if ui.link(switch_label).clicked() {
                        *mode = match mode {
                            AuthMode::Login => AuthMode::Signup,
                            AuthMode::Signup => AuthMode::Login,
                        };
                        *error = None;
                    }

                    if let Some(err) = error {
                        ui.colored_label(Color32::RED, err.as_str());
                    }
                    if let Some(note) = notice {
                        ui.label(note.as_str());
                    }
                });
            });
        });
    }

    action
}
