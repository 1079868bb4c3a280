pub mod chat_box;
pub mod chat_feed;
pub mod login_form;
pub mod toasts;
