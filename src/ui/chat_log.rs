use crate::{
    app::{config::Config, state::AppState},
    models::message::{ChatMessage, FileRef, Segment},
    ui::reveal::{RevealLedger, SegmentView, visible_prefix},
};
use chrono::Local;
use eframe::egui::{self, Color32, RichText, ScrollArea};
use std::time::Instant;

/// Draws the message log. Returns true while any reveal or the skeleton
/// placeholder is animating, so the caller keeps repainting.
pub fn draw_chat_log(
    ui: &mut egui::Ui,
    state: &mut AppState,
    config: &Config,
    ledger: &mut RevealLedger,
) -> bool {
    let mut animating = false;

    if let AppState::LoggedIn {
        messages,
        awaiting_reply,
        ..
    } = state
    {
        let now = Instant::now();
        ScrollArea::vertical()
            .stick_to_bottom(true)
            .auto_shrink([false, false])
            .show(ui, |ui| {
                for message in messages.iter() {
                    draw_message(ui, message, config, ledger, now);
                    ui.add_space(10.0);
                }
                if *awaiting_reply {
                    draw_skeleton(ui);
                    animating = true;
                }
            });
        animating |= ledger.has_active_reveal();
    }

    animating
}

fn draw_message(
    ui: &mut egui::Ui,
    message: &ChatMessage,
    config: &Config,
    ledger: &mut RevealLedger,
    now: Instant,
) {
    ui.horizontal(|ui| {
        let (sender, color) = if message.is_user {
            ("You", Color32::from_gray(160))
        } else {
            ("Assistant", ui.visuals().strong_text_color())
        };
        ui.label(RichText::new(format!("{sender}:")).strong().color(color));

        if config.show_timestamps {
            if let Some(timestamp) = message.timestamp {
                let local = timestamp.with_timezone(&Local);
                ui.label(
                    RichText::new(local.format("%H:%M").to_string())
                        .weak()
                        .small(),
                );
            }
        }
    });

    let animate = message.is_new && !message.is_user;

    if animate {
        let views = ledger.advance_message(&message.id, &message.segments, now);
        for (segment, view) in message.segments.iter().zip(views) {
            match (segment, view) {
                (Segment::Code { language, code }, _) => {
                    draw_code_block(ui, language, code);
                }
                (Segment::Text(text), SegmentView::Text { visible_chars, .. }) => {
                    let shown = visible_prefix(text, visible_chars);
                    if !shown.is_empty() {
                        ui.label(shown);
                    }
                }
                _ => {}
            }
        }
    } else {
        for segment in &message.segments {
            match segment {
                Segment::Text(text) => {
                    if !text.is_empty() {
                        ui.label(text);
                    }
                }
                Segment::Code { language, code } => {
                    draw_code_block(ui, language, code);
                }
            }
        }
    }

    if let Some(file) = &message.file {
        draw_file_chip(ui, file);
    }
}

fn draw_code_block(ui: &mut egui::Ui, language: &str, code: &str) {
    egui::Frame::group(ui.style())
        .fill(ui.visuals().code_bg_color)
        .show(ui, |ui| {
            ui.vertical(|ui| {
                ui.label(RichText::new(language).small().weak());
                ui.label(RichText::new(code.trim_end()).monospace());
            });
        });
}

fn draw_file_chip(ui: &mut egui::Ui, file: &FileRef) {
    ui.horizontal(|ui| {
        ui.label(RichText::new("File:").strong());
        ui.label(&file.name);
        ui.label(RichText::new(format!("({})", file.mime)).weak());
    });
}

/// Looping placeholder shown until the first frame of a reply arrives.
fn draw_skeleton(ui: &mut egui::Ui) {
    let t = ui.input(|i| i.time);
    let dots = 1 + ((t / 0.4) as usize) % 3;
    ui.label(RichText::new(format!("Assistant is typing{}", ".".repeat(dots))).weak());
}
