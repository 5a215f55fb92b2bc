use crate::{
    app::config::Config,
    core::{
        chat::ChatSummary,
        session::{AuthMessage, Session},
        socket::InboundMessage,
    },
    models::{message::ChatMessage, user::UserProfile},
};

#[derive(Debug)]
pub enum AppEvent {
    ConfigLoaded(Result<Config, eyre::Report>),
    SilentLoginComplete(Result<Session, eyre::Report>),
    Auth(AuthMessage),
    Chat(ChatEvent),
    ChatsLoaded(Result<Vec<ChatSummary>, eyre::Report>),
    HistoryLoaded(Result<Vec<ChatMessage>, eyre::Report>),
    FilePicked {
        name: String,
        mime: String,
        data: Vec<u8>,
    },
    ProfileUpdated(Result<UserProfile, eyre::Report>),
}

/// Observable transitions of the live transport, plus local send failures.
#[derive(Debug)]
pub enum ChatEvent {
    Connected,
    MessageReceived(InboundMessage),
    Disconnected(String),
    SendError(String),
}
