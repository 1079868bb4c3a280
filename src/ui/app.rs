use std::sync::Arc;
use std::time::{Duration, Instant};

use eframe::egui;
use tokio::runtime::Handle;
use tokio::sync::mpsc;

use crate::account;
use crate::common::{ConnectionState, Identity, SessionEvent};
use crate::network::ApiClient;
use crate::session::SessionHandle;
use crate::storage::{IdentityResolver, SessionDatabase};

use super::components::chat_feed::FeedAction;
use super::components::{chat_box, chat_feed, login_form, toasts};
use super::state::AppState;

type AuthOutcome = Result<Identity, String>;

pub struct ChatApp {
    state: AppState,
    session: SessionHandle,
    event_receiver: mpsc::Receiver<SessionEvent>,
    store: Arc<SessionDatabase>,
    api: Arc<ApiClient>,
    runtime: Handle,
    auth_sender: mpsc::UnboundedSender<AuthOutcome>,
    auth_receiver: mpsc::UnboundedReceiver<AuthOutcome>,
}

impl ChatApp {
    pub fn new(
        _cc: &eframe::CreationContext<'_>,
        session: SessionHandle,
        event_receiver: mpsc::Receiver<SessionEvent>,
        store: Arc<SessionDatabase>,
        api: Arc<ApiClient>,
        runtime: Handle,
    ) -> Self {
        let (auth_sender, auth_receiver) = mpsc::unbounded_channel();
        Self {
            state: AppState::new(store.resolve_identity()),
            session,
            event_receiver,
            store,
            api,
            runtime,
            auth_sender,
            auth_receiver,
        }
    }

    fn handle_session_events(&mut self) {
        while let Ok(event) = self.event_receiver.try_recv() {
            self.state.apply_event(event);
        }
    }

    fn handle_auth_outcomes(&mut self) {
        while let Ok(outcome) = self.auth_receiver.try_recv() {
            self.state.finish_login(outcome);
        }
    }

    fn submit_login(&mut self) {
        let Some(attempt) = self.state.take_login() else {
            return;
        };
        let api = Arc::clone(&self.api);
        let store = Arc::clone(&self.store);
        let outcomes = self.auth_sender.clone();

        self.runtime.spawn(async move {
            let outcome = account::sign_in(
                &api,
                &store,
                attempt.mode,
                &attempt.username,
                &attempt.password,
            )
            .await
            .map_err(|err| {
                log::warn!("{:?} as {} failed: {err}", attempt.mode, attempt.username);
                err.to_string()
            });
            let _ = outcomes.send(outcome);
        });
    }

    fn log_out(&mut self) {
        self.session.request_disconnect();
        if let Err(err) = account::sign_out(&self.store) {
            log::warn!("Failed to clear stored session: {err}");
            self.state.push_toast("Logout Failed", err.to_string());
            return;
        }
        self.state.logged_out();
    }

    fn render_header(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            ui.label(format!("Logged in as {}", self.state.identity.username));
            ui.separator();
            ui.label(self.state.connection.to_string());

            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                if ui.button("Log out").clicked() {
                    self.log_out();
                }
                if self.state.connection != ConnectionState::Disconnected
                    && ui.button("Disconnect").clicked()
                {
                    self.session.request_disconnect();
                }
            });
        });
    }
}

impl eframe::App for ChatApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.handle_session_events();
        self.handle_auth_outcomes();
        self.state.expire_toasts(Instant::now());

        if !self.state.toasts.is_empty() {
            egui::TopBottomPanel::top("toasts").show(ctx, |ui| {
                toasts::render(ui, &self.state.toasts);
            });
        }

        egui::CentralPanel::default().show(ctx, |ui| {
            ui.heading("mchat");
            ui.separator();

            if !self.state.identity.is_authenticated() {
                if login_form::render(ui, &mut self.state.login) {
                    self.submit_login();
                }
                return;
            }

            self.render_header(ui);
            ui.separator();

            let own_name = self.state.identity.username.clone();
            if let Some(FeedAction::Connect) =
                chat_feed::render(ui, self.state.connection, &self.state.messages, &own_name)
            {
                self.session.request_connect();
            }

            if self.state.connection == ConnectionState::Connected {
                ui.separator();
                let error = self.state.input_error.clone();
                if chat_box::render(ui, &mut self.state.input_text, error.as_deref()) {
                    if let Some(text) = self.state.take_outgoing() {
                        self.session.request_send(text);
                    }
                }
            }
        });

        // Session events arrive from another task.
        ctx.request_repaint_after(Duration::from_millis(200));
    }
}
