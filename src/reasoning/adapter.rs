//! Alert triggering and classifier selection
//!
//! The adapter decides WHEN to raise an alert (severity transitions plus a
//! sustained-red debounce) and WHICH classifier answers (remote with a
//! bounded timeout, rule-based otherwise). The tick loop is never blocked
//! past the timeout.

use std::time::Duration;

use ahash::AHashMap;

use crate::core::config::MonitorConfig;
use crate::core::types::Status;
use crate::reasoning::rules::RuleClassifier;
use crate::reasoning::{Alert, Classification, DriftBrief, RemoteClassifier};

pub struct ReasoningAdapter {
    remote: Option<RemoteClassifier>,
    rules: RuleClassifier,
    timeout: Duration,
    debounce: usize,
    last_status: AHashMap<String, Status>,
    last_alert_window: AHashMap<String, usize>,
}

impl ReasoningAdapter {
    /// Build an adapter. With skip_ai the remote is never consulted; without
    /// it the remote is used when the environment provides credentials.
    pub fn new(cfg: &MonitorConfig, skip_ai: bool) -> Self {
        let remote = if skip_ai {
            None
        } else {
            match RemoteClassifier::from_env() {
                Ok(c) => Some(c),
                Err(e) => {
                    tracing::warn!("remote reasoning unavailable, using rules: {}", e);
                    None
                }
            }
        };
        Self {
            remote,
            rules: RuleClassifier::new(),
            timeout: Duration::from_secs_f64(cfg.reasoning_timeout_secs),
            debounce: cfg.alert_debounce,
            last_status: AHashMap::new(),
            last_alert_window: AHashMap::new(),
        }
    }

    /// Whether a remote classifier is wired in
    pub fn has_remote(&self) -> bool {
        self.remote.is_some()
    }

    pub fn remote(&self) -> Option<&RemoteClassifier> {
        self.remote.as_ref()
    }

    /// The status this stand reported last window (green before window 0).
    pub fn previous_status(&self, stand: &str) -> Status {
        self.last_status
            .get(stand)
            .copied()
            .unwrap_or(Status::Green)
    }

    /// Decide whether this stand-window warrants an alert, and classify if so.
    ///
    /// Always updates the per-stand status memory, so it must be called for
    /// every stand every window, alert or not.
    pub async fn evaluate(&mut self, brief: DriftBrief) -> Option<Alert> {
        let prev = self.previous_status(&brief.stand);
        self.last_status
            .insert(brief.stand.clone(), brief.status);

        if !self.should_alert(&brief.stand, prev, brief.status, brief.window) {
            return None;
        }

        let classification = self.classify(&brief).await;
        self.last_alert_window
            .insert(brief.stand.clone(), brief.window);

        tracing::info!(
            stand = %brief.stand,
            window = brief.window,
            cause = ?classification.cause,
            "alert raised"
        );
        Some(Alert {
            stand: brief.stand,
            window: brief.window,
            window_label: brief.window_label,
            status: brief.status,
            cause: classification.cause,
            confidence: classification.confidence,
            alert_text: classification.alert_text,
            actions: classification.actions,
        })
    }

    /// A transition up in severity always alerts; sustained red re-alerts
    /// once per debounce interval; everything else stays quiet.
    fn should_alert(&self, stand: &str, prev: Status, current: Status, window: usize) -> bool {
        if current.severity() > prev.severity() {
            return true;
        }
        if current == Status::Red && prev == Status::Red {
            return match self.last_alert_window.get(stand) {
                Some(&last) => window.saturating_sub(last) >= self.debounce,
                None => true,
            };
        }
        false
    }

    async fn classify(&self, brief: &DriftBrief) -> Classification {
        if let Some(remote) = &self.remote {
            match tokio::time::timeout(self.timeout, remote.classify(brief)).await {
                Ok(Ok(classification)) => return classification,
                Ok(Err(e)) => {
                    tracing::warn!("remote classification failed, falling back: {}", e);
                }
                Err(_) => {
                    let err =
                        crate::core::error::RinksideError::ReasoningTimeout(self.timeout.as_secs_f64());
                    tracing::warn!("{}, falling back", err);
                }
            }
        }
        self.rules.classify(brief)
    }
}
