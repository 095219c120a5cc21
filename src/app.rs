use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;

use crate::form::FormState;
use crate::verify::{HealthStatus, RequestFailure, VerificationResult, Verifier};

type Outcome = Result<VerificationResult, RequestFailure>;

/// Seconds a status message stays on the info line
const STATUS_TIMEOUT_SECS: u64 = 3;

pub const SPINNER_FRAMES: [&str; 10] = ["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

pub struct App {
    pub form: FormState,
    pub show_help: bool,

    // Status message (shown in info line, auto-clears after timeout)
    pub status_message: Option<String>,
    pub status_message_time: Option<Instant>,

    // Service info for the info line
    pub server_url: String,
    pub health: Option<HealthStatus>,

    pub spinner_frame: usize,

    notifications: bool,
    verifier: Arc<dyn Verifier>,

    // The spawned request reports back here
    settled_tx: mpsc::UnboundedSender<Outcome>,
    settled_rx: mpsc::UnboundedReceiver<Outcome>,
}

impl App {
    pub fn new(verifier: Arc<dyn Verifier>, server_url: impl Into<String>, notifications: bool) -> Self {
        let (settled_tx, settled_rx) = mpsc::unbounded_channel();

        Self {
            form: FormState::default(),
            show_help: false,
            status_message: None,
            status_message_time: None,
            server_url: server_url.into(),
            health: None,
            spinner_frame: 0,
            notifications,
            verifier,
            settled_tx,
            settled_rx,
        }
    }

    /// Set a status message (auto-clears after 3 seconds)
    fn set_status(&mut self, msg: impl Into<String>) {
        self.status_message = Some(msg.into());
        self.status_message_time = Some(Instant::now());
    }

    pub fn handle_key(&mut self, key: KeyEvent) {
        if self.show_help {
            if matches!(key.code, KeyCode::Esc | KeyCode::Enter | KeyCode::F(1)) {
                self.show_help = false;
            }
            return;
        }

        match key.code {
            KeyCode::Enter => self.submit(),
            KeyCode::F(1) => self.show_help = true,
            KeyCode::Char('u') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.edit_query(|_| String::new());
            }
            KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.edit_query(|q| format!("{}{}", q, c));
            }
            KeyCode::Backspace => {
                self.edit_query(|q| {
                    let mut q = q.to_string();
                    q.pop();
                    q
                });
            }
            _ => {}
        }
    }

    /// Apply an edit to the query unless the input is disabled
    fn edit_query(&mut self, edit: impl FnOnce(&str) -> String) {
        if self.form.is_submitting() {
            return;
        }
        let text = edit(&self.form.query);
        self.form = std::mem::take(&mut self.form).update_query(text);
    }

    /// Start verifying the current query.
    ///
    /// Issues exactly one request; refused while an earlier one is still pending.
    pub fn submit(&mut self) {
        let (next, title) = match self.form.begin_submit() {
            Ok(started) => started,
            Err(e) => {
                tracing::debug!("Submit ignored: {}", e);
                self.set_status("Still verifying, please wait");
                return;
            }
        };
        self.form = next;
        self.spinner_frame = 0;

        tracing::info!("Verifying title {:?}", title);
        let verifier = Arc::clone(&self.verifier);
        let tx = self.settled_tx.clone();
        tokio::spawn(async move {
            let outcome = verifier.verify(&title).await;
            // Receiver is gone only if the app already quit
            let _ = tx.send(outcome);
        });
    }

    fn apply_settlement(&mut self, outcome: Outcome) {
        self.form = std::mem::take(&mut self.form).settle(outcome);

        if let Some(result) = &self.form.result {
            tracing::info!(
                "Verdict: verified={} probability={:.3}",
                result.verified,
                result.probability
            );
            if self.notifications {
                notify_verdict(result);
            }
        }
    }

    pub fn tick(&mut self) {
        while let Ok(outcome) = self.settled_rx.try_recv() {
            self.apply_settlement(outcome);
        }

        if self.form.is_submitting() {
            self.spinner_frame = (self.spinner_frame + 1) % SPINNER_FRAMES.len();
        }

        // Clear status message after timeout
        if let Some(time) = self.status_message_time {
            if time.elapsed().as_secs() >= STATUS_TIMEOUT_SECS {
                self.status_message = None;
                self.status_message_time = None;
            }
        }
    }

    /// Block until the pending request settles
    #[cfg(test)]
    async fn wait_for_settlement(&mut self) {
        if let Some(outcome) = self.settled_rx.recv().await {
            self.apply_settlement(outcome);
        }
    }
}

fn notify_verdict(result: &VerificationResult) {
    let summary = if result.verified { "Title verified" } else { "Verification failed" };
    let body = format!("{:.1}% · {}", result.probability * 100.0, result.reason);

    if let Err(e) = notify_rust::Notification::new()
        .summary(summary)
        .body(&body)
        .icon("dialog-information")
        .show()
    {
        tracing::warn!("Could not show notification: {}", e);
    }
}
