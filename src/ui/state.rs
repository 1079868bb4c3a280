use std::time::{Duration, Instant};

use crate::account::AuthMode;
use crate::common::{
    ChatMessage, ConnectionState, Identity, NotificationKind, SessionEvent, validate_message,
};

/// How long a toast stays on screen.
const TOAST_TTL: Duration = Duration::from_secs(5);

#[derive(Debug, Clone)]
pub struct Toast {
    pub title: String,
    pub message: String,
    pub shown_at: Instant,
}

#[derive(Debug, Default)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
    pub new_user: bool,
    pub pending: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginAttempt {
    pub mode: AuthMode,
    pub username: String,
    pub password: String,
}

/// Local UI state.
pub struct AppState {
    pub identity: Identity,
    pub connection: ConnectionState,
    /// Last snapshot published by the session.
    pub messages: Vec<ChatMessage>,
    pub input_text: String,
    pub input_error: Option<String>,
    pub login: LoginForm,
    pub toasts: Vec<Toast>,
}

impl AppState {
    pub fn new(identity: Identity) -> Self {
        Self {
            identity,
            connection: ConnectionState::Disconnected,
            messages: Vec::new(),
            input_text: String::new(),
            input_error: None,
            login: LoginForm::default(),
            toasts: Vec::new(),
        }
    }

    /// Events queued by the session before a logout took effect may still
    /// arrive afterwards; while logged out only `Disconnected` is applied.
    pub fn apply_event(&mut self, event: SessionEvent) {
        let logged_in = self.identity.is_authenticated();
        match event {
            SessionEvent::MessagesUpdated(messages) if logged_in => self.messages = messages,
            SessionEvent::MessagesUpdated(messages) => {
                log::debug!("Ignoring {} messages published before logout", messages.len());
            }
            SessionEvent::ConnectionStateChanged(state)
                if logged_in || state == ConnectionState::Disconnected =>
            {
                self.connection = state
            }
            SessionEvent::ConnectionStateChanged(state) => {
                log::debug!("Ignoring connection state {state} reported before logout");
            }
            SessionEvent::Notification(notification) => {
                if notification.kind == NotificationKind::Unauthorized {
                    // Back to the login form.
                    self.identity = Identity::default();
                }
                self.push_toast(notification.title(), notification.message);
            }
        }
    }

    pub fn push_toast(&mut self, title: impl Into<String>, message: impl Into<String>) {
        self.toasts.push(Toast {
            title: title.into(),
            message: message.into(),
            shown_at: Instant::now(),
        });
    }

    pub fn expire_toasts(&mut self, now: Instant) {
        self.toasts
            .retain(|toast| now.saturating_duration_since(toast.shown_at) < TOAST_TTL);
    }

    /// Take the chat box content if it passes validation.
    pub fn take_outgoing(&mut self) -> Option<String> {
        match validate_message(&self.input_text) {
            Ok(_) => {
                self.input_error = None;
                Some(std::mem::take(&mut self.input_text))
            }
            Err(err) => {
                self.input_error = Some(err.to_string());
                None
            }
        }
    }

    /// Take the login form content if both fields are filled and no attempt
    /// is already running.
    pub fn take_login(&mut self) -> Option<LoginAttempt> {
        if self.login.pending {
            return None;
        }
        let username = self.login.username.trim();
        if username.is_empty() || self.login.password.is_empty() {
            self.push_toast("Missing Fields", "Enter a username and a password.");
            return None;
        }
        self.login.pending = true;
        Some(LoginAttempt {
            mode: if self.login.new_user {
                AuthMode::Signup
            } else {
                AuthMode::Login
            },
            username: username.to_string(),
            password: self.login.password.clone(),
        })
    }

    pub fn finish_login(&mut self, outcome: Result<Identity, String>) {
        self.login.pending = false;
        match outcome {
            Ok(identity) => {
                self.login.password.clear();
                self.identity = identity;
            }
            Err(message) => self.push_toast("Login Failed", message),
        }
    }

    pub fn logged_out(&mut self) {
        self.identity = Identity::default();
        self.connection = ConnectionState::Disconnected;
        self.messages.clear();
        self.input_text.clear();
        self.input_error = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::{MAX_MESSAGE_CHARS, Notification};

    fn logged_in() -> AppState {
        AppState::new(Identity::new("1", "bob", "tok1"))
    }

    #[test]
    fn snapshot_replaces_messages() {
        let mut state = logged_in();
        state.apply_event(SessionEvent::MessagesUpdated(vec![
            ChatMessage::new("a", "1", "t1"),
            ChatMessage::new("b", "2", "t2"),
        ]));
        state.apply_event(SessionEvent::MessagesUpdated(vec![ChatMessage::new(
            "c", "3", "t3",
        )]));
        assert_eq!(state.messages, vec![ChatMessage::new("c", "3", "t3")]);
    }

    #[test]
    fn unauthorized_returns_to_login_with_toast() {
        let mut state = logged_in();
        state.apply_event(SessionEvent::Notification(Notification::unauthorized()));
        assert!(!state.identity.is_authenticated());
        assert_eq!(state.toasts.len(), 1);
        assert_eq!(state.toasts[0].title, "Not Logged In");
    }

    #[test]
    fn not_connected_keeps_identity() {
        let mut state = logged_in();
        state.apply_event(SessionEvent::Notification(Notification::not_connected()));
        assert!(state.identity.is_authenticated());
        assert_eq!(state.toasts[0].title, "Not Connected");
    }

    #[test]
    fn toasts_expire() {
        let mut state = logged_in();
        state.push_toast("t", "m");
        let shown_at = state.toasts[0].shown_at;

        state.expire_toasts(shown_at + Duration::from_secs(1));
        assert_eq!(state.toasts.len(), 1);
        state.expire_toasts(shown_at + TOAST_TTL);
        assert!(state.toasts.is_empty());
    }

    #[test]
    fn outgoing_text_is_validated_and_cleared() {
        let mut state = logged_in();
        assert_eq!(state.take_outgoing(), None);
        assert!(state.input_error.is_some());

        state.input_text = "x".repeat(MAX_MESSAGE_CHARS + 1);
        assert_eq!(state.take_outgoing(), None);
        assert_eq!(state.input_text.len(), MAX_MESSAGE_CHARS + 1);

        state.input_text = "hello".to_string();
        assert_eq!(state.take_outgoing().as_deref(), Some("hello"));
        assert!(state.input_text.is_empty());
        assert!(state.input_error.is_none());
    }

    #[test]
    fn login_requires_both_fields_and_blocks_double_submit() {
        let mut state = AppState::new(Identity::default());
        state.login.username = "  bob ".to_string();
        assert_eq!(state.take_login(), None);

        state.login.password = "hunter2".to_string();
        state.login.new_user = true;
        assert_eq!(
            state.take_login(),
            Some(LoginAttempt {
                mode: AuthMode::Signup,
                username: "bob".to_string(),
                password: "hunter2".to_string(),
            })
        );
        assert_eq!(state.take_login(), None);

        state.finish_login(Ok(Identity::new("3", "bob", "tok9")));
        assert!(!state.login.pending);
        assert!(state.login.password.is_empty());
        assert_eq!(state.identity.username, "bob");
    }

    #[test]
    fn failed_login_shows_toast() {
        let mut state = AppState::new(Identity::default());
        state.login.pending = true;
        state.finish_login(Err("bad password".to_string()));
        assert!(!state.login.pending);
        assert!(!state.identity.is_authenticated());
        assert_eq!(state.toasts[0].message, "bad password");
    }

    #[test]
    fn events_queued_before_logout_do_not_leak_back() {
        let mut state = logged_in();
        state.logged_out();

        state.apply_event(SessionEvent::MessagesUpdated(vec![ChatMessage::new(
            "a", "stale", "t1",
        )]));
        state.apply_event(SessionEvent::ConnectionStateChanged(
            ConnectionState::Connected,
        ));
        assert!(state.messages.is_empty());
        assert_eq!(state.connection, ConnectionState::Disconnected);

        state.apply_event(SessionEvent::ConnectionStateChanged(
            ConnectionState::Disconnected,
        ));
        assert_eq!(state.connection, ConnectionState::Disconnected);

        state.finish_login(Ok(Identity::new("1", "bob", "tok2")));
        state.apply_event(SessionEvent::MessagesUpdated(vec![ChatMessage::new(
            "a", "fresh", "t2",
        )]));
        assert_eq!(state.messages.len(), 1);
    }

    #[test]
    fn logout_clears_session_view() {
        let mut state = logged_in();
        state.apply_event(SessionEvent::ConnectionStateChanged(
            ConnectionState::Connected,
        ));
        state.apply_event(SessionEvent::MessagesUpdated(vec![ChatMessage::new(
            "a", "1", "t1",
        )]));
        state.logged_out();
        assert!(state.messages.is_empty());
        assert_eq!(state.connection, ConnectionState::Disconnected);
        assert!(!state.identity.is_authenticated());
    }
}
