use crate::{
    app::{
        config::{self, Config},
        reducer::{self, spawn_socket},
        state::{AppState, NEW_CHAT_ID, ProfileEdit},
    },
    core::{
        chat::ChatClient,
        profile::{ProfileClient, ProfileUpdate},
        session::{Session, SessionClient},
        socket::OutboundFrame,
    },
    events::app_event::AppEvent,
    models::message::ChatMessage,
    ui::{
        chat_bar::{self, ComposerAction},
        chat_log,
        login::{self, LoginAction},
        menu::{self, MenuAction},
        reveal::{CHAR_DELAY, RevealLedger},
    },
    utils::files::mime_for_name,
};
use eframe::egui::{self, Align, Layout, RichText, SidePanel, TopBottomPanel, Visuals};
use eyre::Context as _;
use tokio::sync::mpsc;
use url::Url;

pub struct App {
    state: AppState,
    event_rx: mpsc::Receiver<AppEvent>,
    event_tx: mpsc::Sender<AppEvent>,
    config: Config,
    reveal: RevealLedger,
    show_menu_panel: bool,
    show_settings_window: bool,
    startup_task_spawned: bool,
}

impl App {
    pub fn new(cc: &eframe::CreationContext<'_>) -> Self {
        egui_extras::install_image_loaders(&cc.egui_ctx);

        let (event_tx, event_rx) = mpsc::channel(100);

        Self {
            state: AppState::Startup,
            event_rx,
            event_tx,
            config: Config::default(),
            reveal: RevealLedger::default(),
            show_menu_panel: false,
            show_settings_window: false,
            startup_task_spawned: false,
        }
    }
}

impl eframe::App for App {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.apply_settings(ctx);

        while let Ok(event) = self.event_rx.try_recv() {
            reducer::reduce(
                &mut self.state,
                event,
                &mut self.config,
                self.event_tx.clone(),
            );
        }

        let mut login_action = None;
        let mut composer_action = None;
        let mut menu_action = None;

        match &mut self.state {
            AppState::Startup => {
                if !self.startup_task_spawned {
                    self.startup_task_spawned = true;
                    let tx = self.event_tx.clone();
                    tokio::spawn(async move {
                        let loaded = config::load().await;
                        let config = match loaded {
                            Ok(c) => {
                                tx.send(AppEvent::ConfigLoaded(Ok(c.clone()))).await.ok();
                                c
                            }
                            Err(e) => {
                                tx.send(AppEvent::ConfigLoaded(Err(e))).await.ok();
                                Config::default()
                            }
                        };

                        let result = silent_login(&config, tx.clone()).await;
                        tx.send(AppEvent::SilentLoginComplete(result)).await.ok();
                    });
                }
                self.draw_loading_ui(ctx, "Starting...");
            }
            AppState::SignedOut { .. } => {
                login_action = login::draw_signed_out(ctx, &mut self.state);
            }
            AppState::Authenticating { .. } => self.draw_authenticating_ui(ctx),
            AppState::LoggedIn { .. } => {
                (composer_action, menu_action) = self.draw_logged_in(ctx);
            }
        }

        if let Some(action) = login_action {
            self.handle_login_action(action);
        }
        match composer_action {
            Some(ComposerAction::Send) => self.send_message(),
            Some(ComposerAction::Upload) => self.pick_file(),
            None => {}
        }
        if let Some(action) = menu_action {
            self.handle_menu_action(action);
        }

        ctx.request_repaint_after(std::time::Duration::from_millis(100));
    }
}

impl App {
    fn apply_settings(&mut self, ctx: &egui::Context) {
        ctx.set_visuals(if self.config.dark_mode {
            Visuals::dark()
        } else {
            Visuals::light()
        });

        let mut style = (*ctx.style()).clone();
        style.text_styles.iter_mut().for_each(|(_, font_id)| {
            font_id.size = self.config.font_size;
        });
        ctx.set_style(style);
    }

    fn draw_loading_ui(&self, ctx: &egui::Context, message: &str) {
        egui::CentralPanel::default().show(ctx, |ui| {
            ui.centered_and_justified(|ui| {
                ui.with_layout(Layout::top_down(Align::Center), |ui| {
                    ui.heading(message);
                    ui.add_space(10.0);
                    ui.spinner();
                });
            });
        });
    }

    fn draw_authenticating_ui(&self, ctx: &egui::Context) {
        if let AppState::Authenticating { status_message, .. } = &self.state {
            egui::CentralPanel::default().show(ctx, |ui| {
                ui.centered_and_justified(|ui| {
                    ui.with_layout(Layout::top_down(Align::Center), |ui| {
                        ui.heading(status_message);
                        ui.add_space(10.0);
                        ui.spinner();
                    });
                });
            });
        }
    }

    fn draw_logged_in(&mut self, ctx: &egui::Context) -> (Option<ComposerAction>, Option<MenuAction>) {
        let mut composer_action = None;
        let mut menu_action = None;
        let dark_mode = self.config.dark_mode;

        if let AppState::LoggedIn {
            session,
            chats,
            current_chat,
            ..
        } = &mut self.state
        {
            TopBottomPanel::top("top_panel").show(ctx, |ui| {
                ui.horizontal(|ui| {
                    if ui.button("\u{2630}").clicked() {
                        self.show_menu_panel = !self.show_menu_panel;
                    }
                    ui.heading("Parlance");

                    let thread_name = if current_chat.as_str() == NEW_CHAT_ID {
                        "New chat"
                    } else {
                        chats
                            .iter()
                            .find(|c| c.uuid == *current_chat)
                            .map(|c| c.name.as_str())
                            .unwrap_or("Chat")
                    };
                    ui.label(RichText::new(thread_name).weak());

                    ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
                        if ui.button("Settings").clicked() {
                            self.show_settings_window = true;
                        }
                    });
                });
            });

            if self.show_menu_panel {
                SidePanel::left("menu_panel")
                    .min_width(180.0)
                    .default_width(220.0)
                    .show(ctx, |ui| {
                        menu_action =
                            menu::draw_menu(ui, &session.profile, chats, current_chat, dark_mode);
                    });
            }
        }

        TopBottomPanel::bottom("bottom_panel").show(ctx, |ui| {
            composer_action = chat_bar::draw_chat_bar(ui, &mut self.state);
            ui.label(
                RichText::new("The assistant may produce inaccurate information.")
                    .weak()
                    .small(),
            );
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            let animating =
                chat_log::draw_chat_log(ui, &mut self.state, &self.config, &mut self.reveal);
            if animating {
                ui.ctx().request_repaint_after(CHAR_DELAY);
            }
        });

        self.draw_settings_window(ctx);
        self.draw_profile_window(ctx);

        (composer_action, menu_action)
    }

    fn draw_settings_window(&mut self, ctx: &egui::Context) {
        let mut config_changed = false;

        egui::Window::new("Settings")
            .open(&mut self.show_settings_window)
            .show(ctx, |ui| {
                ui.heading("Appearance");

                config_changed |= ui
                    .add(egui::Slider::new(&mut self.config.font_size, 8.0..=24.0).text("Font Size"))
                    .changed();
                config_changed |= ui.checkbox(&mut self.config.dark_mode, "Dark mode").changed();
                config_changed |= ui
                    .checkbox(&mut self.config.show_timestamps, "Show timestamps")
                    .changed();

                ui.separator();
                ui.heading("Server");
                // Takes effect on the next login.
                config_changed |= ui
                    .text_edit_singleline(&mut self.config.server_url)
                    .changed();
            });

        if config_changed {
            self.save_config();
        }
    }

    fn draw_profile_window(&mut self, ctx: &egui::Context) {
        let mut submit = false;

        if let AppState::LoggedIn {
            api,
            profile_edit,
            show_profile_window,
            ..
        } = &mut self.state
        {
            if !*show_profile_window {
                return;
            }

            let mut open = true;
            egui::Window::new("Edit profile")
                .open(&mut open)
                .show(ctx, |ui| {
                    ui.label("Leave a field empty to keep its current value.");
                    ui.horizontal(|ui| {
                        ui.label("Username");
                        ui.text_edit_singleline(&mut profile_edit.username);
                    });
                    ui.horizontal(|ui| {
                        ui.label("Avatar URL");
                        ui.text_edit_singleline(&mut profile_edit.avatar);
                    });
                    ui.horizontal(|ui| {
                        ui.label("API Key");
                        ui.text_edit_singleline(&mut profile_edit.api_key);
                    });
                    if ui.button("Save").clicked() {
                        submit = true;
                    }
                });
            *show_profile_window = open;

            if submit {
                let update = ProfileUpdate {
                    username: non_empty(&profile_edit.username),
                    avatar: non_empty(&profile_edit.avatar),
                    api_key: non_empty(&profile_edit.api_key),
                };
                let client = ProfileClient::new(api.clone());
                let tx = self.event_tx.clone();
                tokio::spawn(async move {
                    let result = client.update(&update).await;
                    let _ = tx.send(AppEvent::ProfileUpdated(result)).await;
                });
            }
        }
    }

    fn handle_login_action(&mut self, action: LoginAction) {
        let base_url = match Url::parse(&self.config.server_url) {
            Ok(url) => url,
            Err(e) => {
                self.signed_out_error(format!("Invalid server URL: {e}"));
                return;
            }
        };

        let AppState::SignedOut {
            mode,
            email_input,
            username_input,
            password_input,
            ..
        } = &mut self.state
        else {
            return;
        };
        let email = email_input.trim().to_string();
        let username = username_input.trim().to_string();
        let password = password_input.clone();
        let return_mode = *mode;

        let client = match SessionClient::new(base_url, self.event_tx.clone()) {
            Ok(client) => client,
            Err(e) => {
                self.signed_out_error(format!("Initialization failed: {e}"));
                return;
            }
        };

        let status_message = match action {
            LoginAction::Login => "Logging in...",
            LoginAction::Signup => "Creating your account...",
        }
        .to_string();
        self.state = AppState::Authenticating {
            status_message,
            return_mode,
        };

        tokio::spawn(async move {
            match action {
                LoginAction::Login => client.login(email, password).await,
                LoginAction::Signup => client.signup(email, username, password).await,
            }
        });
    }

    fn signed_out_error(&mut self, message: String) {
        if let AppState::SignedOut { error, .. } = &mut self.state {
            *error = Some(message);
        }
    }

    fn handle_menu_action(&mut self, action: MenuAction) {
        match action {
            MenuAction::OpenChat(uuid) => self.open_chat(uuid),
            MenuAction::NewChat => self.open_chat(NEW_CHAT_ID.to_string()),
            MenuAction::ClearConversation => {
                if let AppState::LoggedIn {
                    messages,
                    awaiting_reply,
                    ..
                } = &mut self.state
                {
                    messages.clear();
                    *awaiting_reply = false;
                }
                self.reveal.clear();
            }
            MenuAction::ToggleDarkMode => {
                self.config.dark_mode = !self.config.dark_mode;
                self.save_config();
            }
            MenuAction::EditProfile => {
                if let AppState::LoggedIn {
                    profile_edit,
                    show_profile_window,
                    ..
                } = &mut self.state
                {
                    *profile_edit = ProfileEdit::default();
                    *show_profile_window = true;
                }
            }
            MenuAction::Logout => self.logout(),
        }
    }

    /// Tears the current thread down and opens another one: new socket,
    /// fresh reveal state, history fetched for persisted threads.
    fn open_chat(&mut self, uuid: String) {
        let base_url = match Url::parse(&self.config.server_url) {
            Ok(url) => url,
            Err(e) => {
                tracing::error!("Invalid server URL: {}", e);
                return;
            }
        };
        let tx = self.event_tx.clone();

        if let AppState::LoggedIn {
            api,
            current_chat,
            messages,
            awaiting_reply,
            socket,
            last_error,
            ..
        } = &mut self.state
        {
            if let Some(handle) = socket.take() {
                handle.shutdown();
            }
            messages.clear();
            *awaiting_reply = false;
            *last_error = None;
            *current_chat = uuid.clone();

            if uuid != NEW_CHAT_ID {
                let chat_client = ChatClient::new(api.clone());
                let history_tx = tx.clone();
                let chat_uuid = uuid.clone();
                tokio::spawn(async move {
                    let result = chat_client.fetch_history(&chat_uuid).await;
                    let _ = history_tx.send(AppEvent::HistoryLoaded(result)).await;
                });
            }

            *socket = Some(spawn_socket(&base_url, &uuid, api.access_token(), tx));
        }

        self.reveal.clear();
    }

    fn logout(&mut self) {
        if let AppState::LoggedIn { socket, .. } = &mut self.state {
            if let Some(handle) = socket.take() {
                handle.shutdown();
            }
        }
        self.reveal.clear();

        if let Ok(base_url) = Url::parse(&self.config.server_url) {
            match SessionClient::new(base_url, self.event_tx.clone()) {
                Ok(client) => {
                    tokio::spawn(async move {
                        client.clear_persisted().await;
                    });
                }
                Err(e) => {
                    tracing::error!("Failed to build session client: {}", e);
                }
            }
        }

        self.state = AppState::signed_out();
    }

    fn send_message(&mut self) {
        if let AppState::LoggedIn {
            draft,
            messages,
            awaiting_reply,
            socket,
            last_error,
            ..
        } = &mut self.state
        {
            let content = draft.trim().to_string();
            if content.is_empty() {
                return;
            }
            let Some(socket) = socket else {
                *last_error = Some("Not connected".to_string());
                return;
            };

            match socket.outbound_tx.try_send(OutboundFrame::text(content.clone())) {
                Ok(()) => {
                    messages.push(ChatMessage::user(content, None));
                    draft.clear();
                    *awaiting_reply = true;
                    *last_error = None;
                }
                Err(e) => {
                    *last_error = Some(format!("Failed to send: {e}"));
                }
            }
        }
    }

    fn pick_file(&mut self) {
        let tx = self.event_tx.clone();
        tokio::spawn(async move {
            let picked = rfd::AsyncFileDialog::new()
                .add_filter("attachments", &["pdf", "jpg", "jpeg", "png"])
                .pick_file()
                .await;
            let Some(handle) = picked else { return };

            let name = handle.file_name();
            let data = handle.read().await;
            let mime = mime_for_name(&name);
            let _ = tx.send(AppEvent::FilePicked { name, mime, data }).await;
        });
    }

    fn save_config(&self) {
        let config_to_save = self.config.clone();
        tokio::spawn(async move {
            if let Err(e) = config::save(&config_to_save).await {
                tracing::error!("Failed to save config: {}", e);
            }
        });
    }
}

async fn silent_login(
    config: &Config,
    tx: mpsc::Sender<AppEvent>,
) -> Result<Session, eyre::Report> {
    let base_url = Url::parse(&config.server_url).context("Invalid server URL")?;
    let client = SessionClient::new(base_url, tx)?;
    client.try_silent_login().await
}

fn non_empty(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
