use crate::core::chat::ChatSummary;
use crate::models::user::UserProfile;
use eframe::egui::{self, Image, RichText, ScrollArea, Vec2};

/// Actions the side menu can request from the app.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MenuAction {
    OpenChat(String),
    NewChat,
    ClearConversation,
    ToggleDarkMode,
    EditProfile,
    Logout,
}

pub fn draw_menu(
    ui: &mut egui::Ui,
    profile: &UserProfile,
    chats: &[ChatSummary],
    current_chat: &str,
    dark_mode: bool,
) -> Option<MenuAction> {
    let mut action = None;

    ui.horizontal(|ui| {
        if let Some(avatar) = &profile.avatar {
            ui.add(Image::new(avatar.as_str()).max_size(Vec2::new(28.0, 28.0)));
        }
        ui.heading(&profile.username);
    });
    ui.separator();

    if ui.button("New chat").clicked() {
        action = Some(MenuAction::NewChat);
    }
    if ui.button("Clear conversation").clicked() {
        action = Some(MenuAction::ClearConversation);
    }
    let mode_label = if dark_mode { "Light mode" } else { "Dark mode" };
    if ui.button(mode_label).clicked() {
        action = Some(MenuAction::ToggleDarkMode);
    }
    if ui.button("Edit profile").clicked() {
        action = Some(MenuAction::EditProfile);
    }
    if ui.button("Log out").clicked() {
        action = Some(MenuAction::Logout);
    }

    ui.separator();
    ui.label(RichText::new("Chats").strong());

    ScrollArea::vertical().auto_shrink([false, true]).show(ui, |ui| {
        for chat in chats {
            let selected = chat.uuid == current_chat;
            if ui.selectable_label(selected, &chat.name).clicked() && !selected {
                action = Some(MenuAction::OpenChat(chat.uuid.clone()));
            }
        }
    });

    action
}
