// commands.rs - Command handlers for the UI shell.
//
// These functions are the "API" of the crate as seen by whatever renders it
// (a webview, a TUI, a native toolkit). Each one locks the session, applies
// one user action, and returns a serializable `ViewSnapshot` describing
// everything the shell needs to draw the next frame.
//
// RUST NOTE: `AppState` is generic over the backend so tests can swap in an
// in-memory API. `AppState<HttpApi>` is what a real shell creates.
//
// Commands that talk to the backend never hold the session lock across the
// request: they lock, start the action, unlock, send, then lock again to
// apply the answer. Meanwhile other commands (`get_view`, `tick`, ...) run
// normally and see the initiating form as `submitting`.

use std::sync::Mutex;
use std::time::Instant;

use serde::Serialize;

use crate::api::{CollectionApi, HttpApi};
use crate::config::Config;
use crate::error::{ApiError, FormError, OverlayError};
use crate::filter::FilterCriteria;
use crate::forms::{Draft, Feedback, FormController, MessageKind};
use crate::models::{GameDraft, GameId, GameRecord, ReviewDraft, ReviewId, ReviewRecord};
use crate::overlay::{ClickRegion, OverlayKind};
use crate::session::Session;
use crate::stats::DashboardView;
use crate::store::LoadState;

/// RUST NOTE: This is our shared application state.
/// `Mutex<Session>` ensures only one action mutates the session at a time,
/// even if the shell dispatches commands from several threads.
pub struct AppState<A = HttpApi> {
    pub session: Mutex<Session<A>>,
}

impl<A> AppState<A> {
    pub fn new(session: Session<A>) -> Self {
        AppState { session: Mutex::new(session) }
    }
}

impl AppState<HttpApi> {
    pub fn from_config(config: Config) -> Self {
        let api = HttpApi::new(&config);
        AppState::new(Session::new(api, config))
    }
}

// ---------------------------------------------------------------------------
// Error handling
// ---------------------------------------------------------------------------

// Commands return errors as plain strings so a shell can show them or send
// them across an IPC boundary as JSON.

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct CommandError(pub String);

impl From<ApiError> for CommandError {
    fn from(e: ApiError) -> Self {
        CommandError(e.to_string())
    }
}

impl From<FormError> for CommandError {
    fn from(e: FormError) -> Self {
        CommandError(e.to_string())
    }
}

impl From<OverlayError> for CommandError {
    fn from(e: OverlayError) -> Self {
        CommandError(e.to_string())
    }
}

// Shorthand type alias - `CmdResult<T>` is `Result<T, CommandError>`
pub type CmdResult<T> = Result<T, CommandError>;

// Macro to lock the Mutex and propagate the error if poisoned
macro_rules! session {
    ($state:expr) => {
        $state
            .session
            .lock()
            .map_err(|e| CommandError(format!("session lock poisoned: {e}")))?
    };
}

// ---------------------------------------------------------------------------
// Snapshots
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MessageView {
    pub text: String,
    pub kind: MessageKind,
}

impl From<&Feedback> for MessageView {
    fn from(f: &Feedback) -> Self {
        MessageView { text: f.text.clone(), kind: f.kind }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FormView<D> {
    pub draft:      D,
    /// Inputs disabled, busy indicator on the submit button.
    pub submitting: bool,
    pub message:    Option<MessageView>,
}

impl<D: Draft> From<&FormController<D>> for FormView<D> {
    fn from(form: &FormController<D>) -> Self {
        FormView {
            draft: form.draft().clone(),
            submitting: form.is_submitting(),
            message: form.message().map(MessageView::from),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReviewsView {
    pub game_id:        GameId,
    pub load_state:     LoadState,
    pub reviews:        Vec<ReviewRecord>,
    /// Set while the delete confirmation dialog is showing.
    pub pending_delete: Option<ReviewId>,
    pub notice:         Option<MessageView>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NoticeView {
    pub game_id: GameId,
    pub message: MessageView,
}

/// Everything the shell draws.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ViewSnapshot {
    pub load_state:         LoadState,
    pub games:              Vec<GameRecord>,
    pub total_games:        usize,
    pub filters:            FilterCriteria,
    pub has_active_filters: bool,
    pub platform_options:   Vec<String>,
    pub genre_options:      Vec<String>,
    /// Open overlays, bottom first.
    pub overlays:           Vec<OverlayKind>,
    pub scroll_locked:      bool,
    pub detail:             Option<GameRecord>,
    pub reviews:            Option<ReviewsView>,
    pub create_form:        FormView<GameDraft>,
    pub edit_form:          Option<FormView<GameDraft>>,
    pub review_form:        Option<FormView<ReviewDraft>>,
    pub dashboard:          Option<DashboardView>,
    pub notice:             Option<NoticeView>,
    /// Games with a delete in flight; their delete buttons are disabled.
    pub deleting:           Vec<GameId>,
}

pub fn snapshot<A: CollectionApi>(session: &Session<A>) -> ViewSnapshot {
    let overlays = session.overlays();
    ViewSnapshot {
        load_state: session.load_state().clone(),
        games: session.visible_games().to_vec(),
        total_games: session.games().len(),
        filters: session.criteria().clone(),
        has_active_filters: session.criteria().has_active_filters(),
        platform_options: session.platform_options().to_vec(),
        genre_options: session.genre_options().to_vec(),
        overlays: overlays.open_kinds(),
        scroll_locked: overlays.scroll_lock().is_locked(),
        detail: overlays.detail_game().cloned(),
        reviews: session.reviews().map(|panel| ReviewsView {
            game_id: panel.game_id().clone(),
            load_state: panel.load_state().clone(),
            reviews: panel.reviews().to_vec(),
            pending_delete: panel.pending_delete().cloned(),
            notice: panel.notice().map(MessageView::from),
        }),
        create_form: FormView::from(session.create_form()),
        edit_form: session.edit_form().map(FormView::from),
        review_form: session.review_form().map(|f| FormView::from(&f.controller)),
        dashboard: overlays
            .is_open(OverlayKind::Dashboard)
            .then(|| session.dashboard_view()),
        notice: session.notice().map(|n| NoticeView {
            game_id: n.game_id.clone(),
            message: MessageView::from(&n.feedback),
        }),
        deleting: session.deleting_games().to_vec(),
    }
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

/// Initial load, and the "retry" button of the load error banner.
/// A failed load is not a command error: the snapshot carries the banner.
pub fn load_games<A: CollectionApi>(state: &AppState<A>) -> CmdResult<ViewSnapshot> {
    let api = {
        let mut session = session!(state);
        session.begin_load_games();
        session.api_handle()
    };
    let result = api.list_games();

    let mut session = session!(state);
    let _ = session.complete_load_games(result);
    Ok(snapshot(&session))
}

pub fn get_view<A: CollectionApi>(state: &AppState<A>) -> CmdResult<ViewSnapshot> {
    let session = session!(state);
    Ok(snapshot(&session))
}

// ---------------------------------------------------------------------------
// Search & filter
// ---------------------------------------------------------------------------

pub fn set_filters<A: CollectionApi>(state: &AppState<A>, filters: FilterCriteria) -> CmdResult<ViewSnapshot> {
    let mut session = session!(state);
    session.set_criteria(filters);
    Ok(snapshot(&session))
}

pub fn clear_filters<A: CollectionApi>(state: &AppState<A>) -> CmdResult<ViewSnapshot> {
    let mut session = session!(state);
    session.clear_filters();
    Ok(snapshot(&session))
}

// ---------------------------------------------------------------------------
// Overlays
// ---------------------------------------------------------------------------

/// Open the detail view and fetch its reviews.
/// A fetch that finishes after the user moved on is dropped by its ticket.
pub fn open_detail<A: CollectionApi>(state: &AppState<A>, id: GameId) -> CmdResult<ViewSnapshot> {
    let (api, ticket) = {
        let mut session = session!(state);
        let ticket = session.open_detail(&id)?;
        (session.api_handle(), ticket)
    };
    let result = api.list_reviews();

    let mut session = session!(state);
    session.commit_reviews(ticket, result);
    Ok(snapshot(&session))
}

/// Re-fetch reviews for the open detail view.
pub fn reload_reviews<A: CollectionApi>(state: &AppState<A>) -> CmdResult<ViewSnapshot> {
    let (api, ticket) = {
        let mut session = session!(state);
        match session.begin_review_load() {
            Some(ticket) => (session.api_handle(), ticket),
            None => return Ok(snapshot(&session)),
        }
    };
    let result = api.list_reviews();

    let mut session = session!(state);
    session.commit_reviews(ticket, result);
    Ok(snapshot(&session))
}

pub fn open_edit<A: CollectionApi>(state: &AppState<A>, id: GameId) -> CmdResult<ViewSnapshot> {
    let mut session = session!(state);
    session.open_edit(&id)?;
    Ok(snapshot(&session))
}

pub fn open_review_form<A: CollectionApi>(
    state: &AppState<A>,
    review_id: Option<ReviewId>,
) -> CmdResult<ViewSnapshot> {
    let mut session = session!(state);
    session.open_review_form(review_id.as_ref())?;
    Ok(snapshot(&session))
}

pub fn open_dashboard<A: CollectionApi>(state: &AppState<A>) -> CmdResult<ViewSnapshot> {
    let mut session = session!(state);
    session.open_dashboard();
    Ok(snapshot(&session))
}

pub fn close_overlay<A: CollectionApi>(state: &AppState<A>, kind: OverlayKind) -> CmdResult<ViewSnapshot> {
    let mut session = session!(state);
    session.close_overlay(kind);
    Ok(snapshot(&session))
}

pub fn press_escape<A: CollectionApi>(state: &AppState<A>) -> CmdResult<ViewSnapshot> {
    let mut session = session!(state);
    session.press_escape();
    Ok(snapshot(&session))
}

pub fn click_overlay<A: CollectionApi>(
    state: &AppState<A>,
    kind: OverlayKind,
    region: ClickRegion,
) -> CmdResult<ViewSnapshot> {
    let mut session = session!(state);
    session.click_overlay(kind, region);
    Ok(snapshot(&session))
}

// ---------------------------------------------------------------------------
// Forms
// ---------------------------------------------------------------------------
//
// Drafts are replaced whole: the shell sends the form contents as they are
// after each keystroke. Submission failures land in the form's message, so
// they are reported through the snapshot rather than as command errors. A
// submit while the form is already submitting is refused with `Busy`.

pub fn update_create_draft<A: CollectionApi>(state: &AppState<A>, draft: GameDraft) -> CmdResult<ViewSnapshot> {
    let mut session = session!(state);
    session.edit_create_draft(|d| *d = draft)?;
    Ok(snapshot(&session))
}

pub fn submit_create<A: CollectionApi>(state: &AppState<A>) -> CmdResult<ViewSnapshot> {
    let (api, payload) = {
        let mut session = session!(state);
        match session.begin_create(Instant::now()) {
            Ok(payload) => (session.api_handle(), payload),
            Err(FormError::Busy) => return Err(FormError::Busy.into()),
            Err(_) => return Ok(snapshot(&session)),
        }
    };
    let result = api.create_game(&payload);

    let mut session = session!(state);
    let _ = session.complete_create(Instant::now(), result);
    Ok(snapshot(&session))
}

pub fn update_edit_draft<A: CollectionApi>(state: &AppState<A>, draft: GameDraft) -> CmdResult<ViewSnapshot> {
    let mut session = session!(state);
    session.edit_edit_draft(|d| *d = draft)?;
    Ok(snapshot(&session))
}

pub fn submit_edit<A: CollectionApi>(state: &AppState<A>) -> CmdResult<ViewSnapshot> {
    let (api, submission) = {
        let mut session = session!(state);
        match session.begin_edit(Instant::now()) {
            Ok(submission) => (session.api_handle(), submission),
            Err(e @ (FormError::Busy | FormError::NotOpen)) => return Err(e.into()),
            Err(_) => return Ok(snapshot(&session)),
        }
    };
    let result = api.update_game(&submission.id, &submission.payload);

    let mut session = session!(state);
    let _ = session.complete_edit(&submission.id, Instant::now(), result);
    Ok(snapshot(&session))
}

pub fn update_review_draft<A: CollectionApi>(state: &AppState<A>, draft: ReviewDraft) -> CmdResult<ViewSnapshot> {
    let mut session = session!(state);
    session.edit_review_draft(|d| *d = draft)?;
    Ok(snapshot(&session))
}

pub fn submit_review<A: CollectionApi>(state: &AppState<A>) -> CmdResult<ViewSnapshot> {
    let (api, submission) = {
        let mut session = session!(state);
        match session.begin_review_submit(Instant::now()) {
            Ok(submission) => (session.api_handle(), submission),
            Err(e @ (FormError::Busy | FormError::NotOpen)) => return Err(e.into()),
            Err(_) => return Ok(snapshot(&session)),
        }
    };
    let result = submission.send(&*api);

    let mut session = session!(state);
    let _ = session.complete_review_submit(&submission, Instant::now(), result);
    Ok(snapshot(&session))
}

// ---------------------------------------------------------------------------
// Deletion
// ---------------------------------------------------------------------------

/// Delete a game. A backend failure shows up as the snapshot's `notice`.
/// A second delete of the same game while the first is in flight sends nothing.
pub fn delete_game<A: CollectionApi>(state: &AppState<A>, id: GameId) -> CmdResult<ViewSnapshot> {
    let api = {
        let mut session = session!(state);
        if !session.begin_game_delete(&id) {
            return Ok(snapshot(&session));
        }
        session.api_handle()
    };
    let result = api.delete_game(&id);

    let mut session = session!(state);
    let _ = session.complete_game_delete(&id, Instant::now(), result);
    Ok(snapshot(&session))
}

/// Ask for confirmation before deleting a review.
pub fn request_review_delete<A: CollectionApi>(state: &AppState<A>, id: ReviewId) -> CmdResult<ViewSnapshot> {
    let mut session = session!(state);
    session.request_review_delete(id)?;
    Ok(snapshot(&session))
}

pub fn cancel_review_delete<A: CollectionApi>(state: &AppState<A>) -> CmdResult<ViewSnapshot> {
    let mut session = session!(state);
    session.cancel_review_delete();
    Ok(snapshot(&session))
}

pub fn confirm_review_delete<A: CollectionApi>(state: &AppState<A>) -> CmdResult<ViewSnapshot> {
    let (api, delete) = {
        let mut session = session!(state);
        match session.begin_review_delete() {
            Some(delete) => (session.api_handle(), delete),
            None => return Ok(snapshot(&session)),
        }
    };
    let result = api.delete_review(&delete.id);

    let mut session = session!(state);
    let _ = session.complete_review_delete(&delete, Instant::now(), result);
    Ok(snapshot(&session))
}

// ---------------------------------------------------------------------------
// Timers
// ---------------------------------------------------------------------------

/// Called by the shell on a short interval to expire messages and run
/// delayed closes.
pub fn tick<A: CollectionApi>(state: &AppState<A>) -> CmdResult<ViewSnapshot> {
    let mut session = session!(state);
    session.tick(Instant::now());
    Ok(snapshot(&session))
}
