use crate::{
    core::{api::ApiClient, chat::ChatSummary, session::Session, socket::OutboundFrame},
    models::message::ChatMessage,
};
use tokio::{sync::mpsc, task::JoinHandle};

/// Chat id of a thread that has not been persisted yet; the backend mints
/// a real uuid on connect.
pub const NEW_CHAT_ID: &str = "new";

/// Which credential form the signed-out screen shows.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AuthMode {
    Login,
    Signup,
}

/// Fields of the profile-edit dialog.
#[derive(Clone, Debug, Default)]
pub struct ProfileEdit {
    pub username: String,
    pub avatar: String,
    pub api_key: String,
}

/// Handle to the running socket task for the current thread. Dropping the
/// outbound sender and aborting the task is the only teardown needed.
pub struct SocketHandle {
    pub task: JoinHandle<()>,
    pub outbound_tx: mpsc::Sender<OutboundFrame>,
}

impl SocketHandle {
    pub fn shutdown(self) {
        self.task.abort();
    }
}

/// Represents the various states of the application's lifecycle.
pub enum AppState {
    Startup,
    SignedOut {
        mode: AuthMode,
        email_input: String,
        username_input: String,
        password_input: String,
        error: Option<String>,
        notice: Option<String>,
    },
    Authenticating {
        status_message: String,
        return_mode: AuthMode,
    },
    LoggedIn {
        session: Session,
        api: ApiClient,
        chats: Vec<ChatSummary>,
        current_chat: String,
        messages: Vec<ChatMessage>,
        draft: String,
        awaiting_reply: bool,
        socket: Option<SocketHandle>,
        last_error: Option<String>,
        profile_edit: ProfileEdit,
        show_profile_window: bool,
    },
}

impl AppState {
    pub fn signed_out() -> Self {
        AppState::SignedOut {
            mode: AuthMode::Login,
            email_input: String::new(),
            username_input: String::new(),
            password_input: String::new(),
            error: None,
            notice: None,
        }
    }
}
