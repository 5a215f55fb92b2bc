use super::state::{AppState, AuthMode, NEW_CHAT_ID, ProfileEdit, SocketHandle};
use crate::{
    app::config::Config,
    core::{
        api::ApiClient,
        chat::ChatClient,
        session::{AuthMessage, Session, SessionClient},
        socket::{FilePayload, OutboundFrame, SocketClient},
    },
    events::app_event::{AppEvent, ChatEvent},
    models::message::{ChatMessage, FileRef},
    utils::files::{mime_for_name, name_from_path},
};
use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64_STANDARD};
use tokio::sync::mpsc;
use url::Url;

pub fn reduce(
    state: &mut AppState,
    event: AppEvent,
    config: &mut Config,
    event_tx: mpsc::Sender<AppEvent>,
) {
    match event {
        AppEvent::ConfigLoaded(result) => {
            handle_config_loaded(result, config);
        }
        AppEvent::SilentLoginComplete(result) => {
            handle_silent_login_complete(state, result, config, event_tx);
        }
        AppEvent::Auth(auth_message) => {
            handle_auth_message(state, auth_message, config, event_tx);
        }
        AppEvent::Chat(chat_event) => {
            handle_chat_event(state, chat_event);
        }
        AppEvent::ChatsLoaded(result) => {
            handle_chats_loaded(state, result);
        }
        AppEvent::HistoryLoaded(result) => {
            handle_history_loaded(state, result);
        }
        AppEvent::FilePicked { name, mime, data } => {
            handle_file_picked(state, name, mime, data);
        }
        AppEvent::ProfileUpdated(result) => {
            handle_profile_updated(state, result, config, event_tx);
        }
    }
}

/// Spawns the transport task for one chat thread and hands back its
/// outbound channel. The previous thread's handle must be shut down first.
pub fn spawn_socket(
    server_url: &Url,
    chat_id: &str,
    access_token: String,
    event_tx: mpsc::Sender<AppEvent>,
) -> SocketHandle {
    let (outbound_tx, outbound_rx) = mpsc::channel(32);
    let client = SocketClient::new(
        server_url.clone(),
        chat_id.to_string(),
        access_token,
        event_tx,
    );
    let task = tokio::spawn(async move {
        if let Err(e) = client.run(outbound_rx).await {
            tracing::error!("Chat socket task failed: {}", e);
        }
    });
    SocketHandle { task, outbound_tx }
}

fn handle_config_loaded(result: Result<Config, eyre::Report>, config: &mut Config) {
    if let Ok(loaded_config) = result {
        *config = loaded_config;
    }
    // If config loading fails, the defaults stay in place and the silent
    // login will fail into the signed-out screen on its own.
}

fn handle_silent_login_complete(
    state: &mut AppState,
    result: Result<Session, eyre::Report>,
    config: &mut Config,
    event_tx: mpsc::Sender<AppEvent>,
) {
    match result {
        Ok(session) => {
            handle_successful_login(state, session, config, event_tx);
        }
        Err(e) => {
            tracing::info!("Silent login failed: {}. Showing the login screen.", e);
            *state = AppState::signed_out();
        }
    }
}

fn handle_auth_message(
    state: &mut AppState,
    msg: AuthMessage,
    config: &mut Config,
    event_tx: mpsc::Sender<AppEvent>,
) {
    if let AppState::Authenticating { return_mode, .. } = state {
        let return_mode = *return_mode;
        match msg {
            AuthMessage::Success(session) => {
                handle_successful_login(state, session, config, event_tx);
            }
            AuthMessage::SignupComplete(profile) => {
                *state = AppState::SignedOut {
                    mode: AuthMode::Login,
                    email_input: profile.email.unwrap_or_default(),
                    username_input: String::new(),
                    password_input: String::new(),
                    error: None,
                    notice: Some("Account created. Log in with your new credentials.".to_string()),
                };
            }
            AuthMessage::Error(err) => {
                *state = AppState::SignedOut {
                    mode: return_mode,
                    email_input: String::new(),
                    username_input: String::new(),
                    password_input: String::new(),
                    error: Some(err),
                    notice: None,
                };
            }
        }
    }
}

fn handle_successful_login(
    state: &mut AppState,
    session: Session,
    config: &mut Config,
    event_tx: mpsc::Sender<AppEvent>,
) {
    let base_url = match Url::parse(&config.server_url) {
        Ok(url) => url,
        Err(e) => {
            *state = AppState::SignedOut {
                mode: AuthMode::Login,
                email_input: String::new(),
                username_input: String::new(),
                password_input: String::new(),
                error: Some(format!("Invalid server URL {:?}: {}", config.server_url, e)),
                notice: None,
            };
            return;
        }
    };

    let api = match ApiClient::new(base_url.clone(), session.tokens.clone()) {
        Ok(api) => api,
        Err(e) => {
            tracing::error!("Failed to build API client: {}", e);
            *state = AppState::signed_out();
            return;
        }
    };

    // A fresh thread is open from the start; the backend mints its uuid.
    let socket = spawn_socket(
        &base_url,
        NEW_CHAT_ID,
        api.access_token(),
        event_tx.clone(),
    );

    let chat_client = ChatClient::new(api.clone());
    let tx = event_tx.clone();
    tokio::spawn(async move {
        let result = chat_client.list_chats().await;
        let _ = tx.send(AppEvent::ChatsLoaded(result)).await;
    });

    *state = AppState::LoggedIn {
        session,
        api,
        chats: Vec::new(),
        current_chat: NEW_CHAT_ID.to_string(),
        messages: Vec::new(),
        draft: String::new(),
        awaiting_reply: false,
        socket: Some(socket),
        last_error: None,
        profile_edit: ProfileEdit::default(),
        show_profile_window: false,
    };
}

fn handle_chat_event(state: &mut AppState, event: ChatEvent) {
    if let AppState::LoggedIn {
        messages,
        awaiting_reply,
        last_error,
        ..
    } = state
    {
        match event {
            ChatEvent::Connected => {
                tracing::info!("Chat socket connected");
            }
            ChatEvent::MessageReceived(inbound) => {
                let file = inbound.file.as_deref().map(|path| FileRef {
                    name: name_from_path(path),
                    mime: mime_for_name(path),
                });
                messages.push(ChatMessage::assistant(
                    inbound.uuid,
                    inbound.content,
                    file,
                    inbound.timestamp,
                ));
                *awaiting_reply = false;
            }
            ChatEvent::Disconnected(reason) => {
                *last_error = Some(format!("Chat connection closed: {reason}"));
                *awaiting_reply = false;
            }
            ChatEvent::SendError(err) => {
                *last_error = Some(format!("Failed to send: {err}"));
                *awaiting_reply = false;
            }
        }
    }
}

fn handle_chats_loaded(
    state: &mut AppState,
    result: Result<Vec<crate::core::chat::ChatSummary>, eyre::Report>,
) {
    if let AppState::LoggedIn {
        chats, last_error, ..
    } = state
    {
        match result {
            Ok(loaded) => {
                tracing::info!("Loaded {} chats", loaded.len());
                *chats = loaded;
            }
            Err(e) => {
                *last_error = Some(format!("Could not load chats: {e}"));
            }
        }
    }
}

fn handle_history_loaded(
    state: &mut AppState,
    result: Result<Vec<ChatMessage>, eyre::Report>,
) {
    if let AppState::LoggedIn {
        messages,
        last_error,
        ..
    } = state
    {
        match result {
            Ok(history) => {
                *messages = history;
            }
            Err(e) => {
                *last_error = Some(format!("Could not load messages: {e}"));
            }
        }
    }
}

fn handle_file_picked(state: &mut AppState, name: String, mime: String, data: Vec<u8>) {
    if let AppState::LoggedIn {
        messages,
        awaiting_reply,
        socket,
        last_error,
        ..
    } = state
    {
        let Some(socket) = socket else {
            *last_error = Some("Not connected".to_string());
            return;
        };

        let payload = FilePayload {
            name: name.clone(),
            mime: mime.clone(),
            data: BASE64_STANDARD.encode(&data),
        };
        match socket.outbound_tx.try_send(OutboundFrame::file(payload)) {
            Ok(()) => {
                messages.push(ChatMessage::user(
                    "Uploaded a file".to_string(),
                    Some(FileRef { name, mime }),
                ));
                *awaiting_reply = true;
            }
            Err(e) => {
                *last_error = Some(format!("Failed to send file: {e}"));
            }
        }
    }
}

fn handle_profile_updated(
    state: &mut AppState,
    result: Result<crate::models::user::UserProfile, eyre::Report>,
    config: &mut Config,
    event_tx: mpsc::Sender<AppEvent>,
) {
    if let AppState::LoggedIn {
        session,
        last_error,
        show_profile_window,
        ..
    } = state
    {
        match result {
            Ok(profile) => {
                session.profile = profile.clone();
                *show_profile_window = false;

                // Keep the persisted blob in sync, as the login flow does.
                if let Ok(base_url) = Url::parse(&config.server_url) {
                    match SessionClient::new(base_url, event_tx) {
                        Ok(client) => {
                            tokio::spawn(async move {
                                if let Err(e) = client.save_profile(&profile).await {
                                    tracing::error!("Failed to persist profile: {}", e);
                                }
                            });
                        }
                        Err(e) => {
                            tracing::error!("Failed to build session client: {}", e);
                        }
                    }
                }
            }
            Err(e) => {
                *last_error = Some(format!("Profile update failed: {e}"));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::api::SessionTokens;
    use crate::core::socket::InboundMessage;
    use crate::models::user::UserProfile;
    use pretty_assertions::assert_eq;

    fn logged_in_state() -> AppState {
        let tokens = SessionTokens {
            access: "a".to_string(),
            refresh: "r".to_string(),
        };
        let api = ApiClient::new(Url::parse("http://localhost:8000").unwrap(), tokens.clone())
            .unwrap();
        AppState::LoggedIn {
            session: Session {
                tokens,
                profile: UserProfile {
                    username: "ada".to_string(),
                    email: None,
                    avatar: None,
                    api_key: None,
                },
            },
            api,
            chats: Vec::new(),
            current_chat: NEW_CHAT_ID.to_string(),
            messages: Vec::new(),
            draft: String::new(),
            awaiting_reply: true,
            socket: None,
            last_error: None,
            profile_edit: ProfileEdit::default(),
            show_profile_window: false,
        }
    }

    #[test]
    fn an_inbound_frame_becomes_an_animated_assistant_message() {
        let mut state = logged_in_state();
        handle_chat_event(
            &mut state,
            ChatEvent::MessageReceived(InboundMessage {
                uuid: "m1".to_string(),
                content: "hello".to_string(),
                file: None,
                timestamp: None,
            }),
        );

        let AppState::LoggedIn {
            messages,
            awaiting_reply,
            ..
        } = &state
        else {
            panic!("expected logged-in state");
        };
        assert_eq!(messages.len(), 1);
        assert!(!messages[0].is_user);
        assert!(messages[0].is_new);
        assert!(!awaiting_reply);
    }

    #[test]
    fn a_disconnect_surfaces_as_a_notification_not_a_crash() {
        let mut state = logged_in_state();
        handle_chat_event(&mut state, ChatEvent::Disconnected("gone".to_string()));

        let AppState::LoggedIn { last_error, .. } = &state else {
            panic!("expected logged-in state");
        };
        assert_eq!(
            last_error.as_deref(),
            Some("Chat connection closed: gone")
        );
    }
}
