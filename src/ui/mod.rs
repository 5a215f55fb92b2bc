pub mod app_layout;
pub mod chat_bar;
pub mod chat_log;
pub mod login;
pub mod menu;
pub mod reveal;
