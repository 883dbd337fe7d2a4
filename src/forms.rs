// forms.rs - Draft state and submission lifecycle shared by every form.
//
//   idle ──submit──▶ submitting ──ok──▶ idle (draft reset, or close scheduled)
//                               └─err─▶ idle (draft kept, error message shown)
//
// Timers (message expiry, delayed close) are driven by `tick(now)` so the
// controller never owns a clock.

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::error::{ApiError, FormError, ValidationError};
use crate::models::{GameDraft, GamePayload, ReviewDraft, ReviewPayload};

/// A form's in-progress input and how to turn it into a request body.
pub trait Draft: Clone + Default {
    type Payload;

    fn validate(&self) -> Result<Self::Payload, ValidationError>;
}

impl Draft for GameDraft {
    type Payload = GamePayload;

    fn validate(&self) -> Result<GamePayload, ValidationError> {
        self.to_payload()
    }
}

impl Draft for ReviewDraft {
    type Payload = ReviewPayload;

    fn validate(&self) -> Result<ReviewPayload, ValidationError> {
        self.to_payload()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmitState {
    Idle,
    Submitting,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    Success,
    Error,
}

/// Inline message that disappears on its own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Feedback {
    pub text:       String,
    pub kind:       MessageKind,
    pub expires_at: Instant,
}

impl Feedback {
    pub fn new(text: impl Into<String>, kind: MessageKind, now: Instant, ttl: Duration) -> Self {
        Feedback { text: text.into(), kind, expires_at: now + ttl }
    }

    pub fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

/// What a successful submission does to the form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AfterSuccess {
    /// Create forms: clear the inputs for the next entry.
    ResetDraft,
    /// Edit/review overlays: keep the success message visible, then close.
    CloseAfterDelay,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormTiming {
    pub message_ttl: Duration,
    pub close_delay: Duration,
}

impl Default for FormTiming {
    fn default() -> Self {
        FormTiming {
            message_ttl: Duration::from_secs(4),
            close_delay: Duration::from_secs(1),
        }
    }
}

/// User-facing texts for one kind of submission.
#[derive(Debug, Clone, Copy)]
pub struct SubmitMessages {
    pub success: &'static str,
    /// Shown when the server gave no error text of its own.
    pub failure: &'static str,
}

#[derive(Debug, Clone)]
pub struct FormController<D> {
    draft:         D,
    state:         SubmitState,
    message:       Option<Feedback>,
    close_at:      Option<Instant>,
    after_success: AfterSuccess,
    timing:        FormTiming,
}

impl<D: Draft> FormController<D> {
    pub fn new(draft: D, after_success: AfterSuccess, timing: FormTiming) -> Self {
        FormController {
            draft,
            state: SubmitState::Idle,
            message: None,
            close_at: None,
            after_success,
            timing,
        }
    }

    pub fn draft(&self) -> &D {
        &self.draft
    }

    pub fn state(&self) -> SubmitState {
        self.state
    }

    /// Inputs and the submit button are disabled while this is true.
    pub fn is_submitting(&self) -> bool {
        self.state == SubmitState::Submitting
    }

    pub fn message(&self) -> Option<&Feedback> {
        self.message.as_ref()
    }

    pub fn close_at(&self) -> Option<Instant> {
        self.close_at
    }

    /// Change the draft. Rejected while submitting; clears any message.
    pub fn edit(&mut self, change: impl FnOnce(&mut D)) -> Result<(), FormError> {
        if self.is_submitting() {
            return Err(FormError::Busy);
        }
        change(&mut self.draft);
        self.message = None;
        Ok(())
    }

    /// Validate and enter `submitting`. The caller sends the payload and
    /// reports back through [`complete`](Self::complete).
    pub fn begin_submit(&mut self, now: Instant) -> Result<D::Payload, FormError> {
        if self.is_submitting() {
            return Err(FormError::Busy);
        }
        match self.draft.validate() {
            Ok(payload) => {
                self.state = SubmitState::Submitting;
                self.message = None;
                Ok(payload)
            }
            Err(e) => {
                self.show(e.to_string(), MessageKind::Error, now);
                Err(e.into())
            }
        }
    }

    /// Finish a submission started with `begin_submit`.
    pub fn complete<T>(
        &mut self,
        now: Instant,
        messages: SubmitMessages,
        result: Result<T, ApiError>,
    ) -> Result<T, FormError> {
        self.state = SubmitState::Idle;
        match result {
            Ok(value) => {
                self.show(messages.success, MessageKind::Success, now);
                match self.after_success {
                    AfterSuccess::ResetDraft => self.draft = D::default(),
                    AfterSuccess::CloseAfterDelay => {
                        self.close_at = Some(now + self.timing.close_delay);
                    }
                }
                Ok(value)
            }
            Err(e) => {
                log::warn!("form submission failed: {e}");
                self.show(e.user_message(messages.failure), MessageKind::Error, now);
                Err(e.into())
            }
        }
    }

    /// `begin_submit`, send, `complete` in one step.
    pub fn submit<T>(
        &mut self,
        now: Instant,
        messages: SubmitMessages,
        send: impl FnOnce(D::Payload) -> Result<T, ApiError>,
    ) -> Result<T, FormError> {
        let payload = self.begin_submit(now)?;
        let result = send(payload);
        self.complete(now, messages, result)
    }

    /// Advance timers. Returns true once, when a scheduled close is due.
    pub fn tick(&mut self, now: Instant) -> bool {
        if self.message.as_ref().is_some_and(|m| m.is_expired(now)) {
            self.message = None;
        }
        match self.close_at {
            Some(at) if now >= at => {
                self.close_at = None;
                true
            }
            _ => false,
        }
    }

    fn show(&mut self, text: impl Into<String>, kind: MessageKind, now: Instant) {
        self.message = Some(Feedback::new(text, kind, now, self.timing.message_ttl));
    }
}
