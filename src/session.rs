// session.rs - Root state of the tracker.
//
// The session owns the game cache and every piece of UI state around it.
// Derived views (filtered list, dropdown options, statistics) are stored
// alongside and recomputed explicitly by `rederive` / `refilter` after each
// change. Nothing recomputes behind the caller's back.
//
// Every mutation of the caches follows the same rule: send the request, wait
// for the server's answer, and only then touch local state.
//
// Each request-backed action comes as a `begin_*` / `complete_*` pair so a
// caller holding the session behind a lock can release it while the request
// is in flight. The one-step methods (`submit_edit`, `delete_game`, ...) run
// both halves back to back.

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;

use crate::api::CollectionApi;
use crate::config::Config;
use crate::error::{ApiError, FormError, OverlayError};
use crate::filter::{self, CompletionFilter, FilterCriteria, Selector};
use crate::forms::{AfterSuccess, Feedback, FormController, MessageKind, SubmitMessages};
use crate::models::{
    GameDraft, GameId, GamePayload, GameRecord, ReviewDraft, ReviewId, ReviewPayload, ReviewRecord,
};
use crate::overlay::{ClickRegion, Overlay, OverlayCoordinator, OverlayKind};
use crate::reviews::{LoadTicket, ReviewPanel};
use crate::stats::{self, DashboardView, StatisticsSummary};
use crate::store::{LoadState, RecordStore};

pub const GAMES_LOAD_FAILED: &str = "Could not load your games. Check your connection.";
pub const GAME_DELETE_FAILED: &str = "Could not delete the game.";

pub const CREATE_GAME: SubmitMessages = SubmitMessages {
    success: "Game added to your collection!",
    failure: "There was an error saving the game.",
};
pub const UPDATE_GAME: SubmitMessages = SubmitMessages {
    success: "Game updated successfully!",
    failure: "Error updating the game. Please try again.",
};
pub const CREATE_REVIEW: SubmitMessages = SubmitMessages {
    success: "Review added",
    failure: "Error saving the review. Please try again.",
};
pub const UPDATE_REVIEW: SubmitMessages = SubmitMessages {
    success: "Review updated",
    failure: "Error saving the review. Please try again.",
};

/// Review form plus the review it edits (`None` when creating).
#[derive(Debug, Clone)]
pub struct ReviewForm {
    pub controller: FormController<ReviewDraft>,
    pub editing:    Option<ReviewId>,
}

/// Transient message attached to one game card (failed delete).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameNotice {
    pub game_id:  GameId,
    pub feedback: Feedback,
}

/// An accepted edit, ready to send as `PUT /api/juegos/{id}`.
#[derive(Debug, Clone, PartialEq)]
pub struct EditSubmission {
    pub id:      GameId,
    pub payload: GamePayload,
}

/// An accepted review form, ready to send.
#[derive(Debug, Clone, PartialEq)]
pub struct ReviewSubmission {
    /// The review being updated; `None` creates a new one.
    pub editing: Option<ReviewId>,
    pub payload: ReviewPayload,
}

impl ReviewSubmission {
    pub fn send<A: CollectionApi>(&self, api: &A) -> Result<ReviewRecord, ApiError> {
        match &self.editing {
            Some(id) => api.update_review(id, &self.payload),
            None => api.create_review(&self.payload),
        }
    }

    fn messages(&self) -> SubmitMessages {
        match self.editing {
            Some(_) => UPDATE_REVIEW,
            None => CREATE_REVIEW,
        }
    }
}

/// A confirmed review delete. `ticket` names the panel that asked for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewDelete {
    pub ticket: LoadTicket,
    pub id:     ReviewId,
}

pub struct Session<A> {
    api:    Arc<A>,
    config: Config,

    games: RecordStore<GameRecord>,
    load:  LoadState,

    criteria:         FilterCriteria,
    visible:          Vec<GameRecord>,
    platform_options: Vec<String>,
    genre_options:    Vec<String>,
    stats:            StatisticsSummary,

    overlays:    OverlayCoordinator,
    create_form: FormController<GameDraft>,
    edit_form:   Option<FormController<GameDraft>>,
    review_form: Option<ReviewForm>,
    reviews:     Option<ReviewPanel>,
    generation:  u64,
    notice:      Option<GameNotice>,
    deleting:    Vec<GameId>,
}

impl<A: CollectionApi> Session<A> {
    pub fn new(api: A, config: Config) -> Self {
        let create_form = FormController::new(
            GameDraft::default(),
            AfterSuccess::ResetDraft,
            config.game_form_timing(),
        );
        Session {
            api: Arc::new(api),
            config,
            games: RecordStore::new(),
            load: LoadState::Loading,
            criteria: FilterCriteria::default(),
            visible: Vec::new(),
            platform_options: Vec::new(),
            genre_options: Vec::new(),
            stats: StatisticsSummary::default(),
            overlays: OverlayCoordinator::new(),
            create_form,
            edit_form: None,
            review_form: None,
            reviews: None,
            generation: 0,
            notice: None,
            deleting: Vec::new(),
        }
    }

    // -----------------------------------------------------------------------
    // Read side
    // -----------------------------------------------------------------------

    pub fn api(&self) -> &A {
        &self.api
    }

    /// A handle on the backend that outlives a borrow of the session.
    pub fn api_handle(&self) -> Arc<A> {
        Arc::clone(&self.api)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Every loaded game, most recent first.
    pub fn games(&self) -> &[GameRecord] {
        self.games.items()
    }

    /// The games that pass the current filters.
    pub fn visible_games(&self) -> &[GameRecord] {
        &self.visible
    }

    pub fn load_state(&self) -> &LoadState {
        &self.load
    }

    pub fn criteria(&self) -> &FilterCriteria {
        &self.criteria
    }

    pub fn platform_options(&self) -> &[String] {
        &self.platform_options
    }

    pub fn genre_options(&self) -> &[String] {
        &self.genre_options
    }

    pub fn statistics(&self) -> &StatisticsSummary {
        &self.stats
    }

    pub fn dashboard_view(&self) -> DashboardView {
        DashboardView::from_summary(self.stats.clone(), self.config.top_n)
    }

    pub fn overlays(&self) -> &OverlayCoordinator {
        &self.overlays
    }

    pub fn create_form(&self) -> &FormController<GameDraft> {
        &self.create_form
    }

    pub fn edit_form(&self) -> Option<&FormController<GameDraft>> {
        self.edit_form.as_ref()
    }

    pub fn review_form(&self) -> Option<&ReviewForm> {
        self.review_form.as_ref()
    }

    pub fn reviews(&self) -> Option<&ReviewPanel> {
        self.reviews.as_ref()
    }

    pub fn notice(&self) -> Option<&GameNotice> {
        self.notice.as_ref()
    }

    /// Games whose delete request is still in flight.
    pub fn deleting_games(&self) -> &[GameId] {
        &self.deleting
    }

    // -----------------------------------------------------------------------
    // Loading
    // -----------------------------------------------------------------------

    /// Fetch the whole collection. Also serves as the retry action after a
    /// failed load; existing data is kept if a retry fails.
    pub fn load_games(&mut self) -> Result<(), ApiError> {
        self.begin_load_games();
        let result = self.api.list_games();
        self.complete_load_games(result)
    }

    pub fn begin_load_games(&mut self) {
        self.load = LoadState::Loading;
    }

    pub fn complete_load_games(&mut self, result: Result<Vec<GameRecord>, ApiError>) -> Result<(), ApiError> {
        match result {
            Ok(games) => {
                log::info!("loaded {} games", games.len());
                self.games.replace_all(games);
                self.load = LoadState::Ready;
                self.rederive();
                Ok(())
            }
            Err(e) => {
                log::warn!("failed to load games: {e}");
                self.load = LoadState::Failed(GAMES_LOAD_FAILED.to_string());
                Err(e)
            }
        }
    }

    // -----------------------------------------------------------------------
    // Filters
    // -----------------------------------------------------------------------

    pub fn set_criteria(&mut self, criteria: FilterCriteria) {
        self.criteria = criteria;
        self.refilter();
    }

    pub fn set_query(&mut self, query: impl Into<String>) {
        self.criteria.query = query.into();
        self.refilter();
    }

    pub fn set_platform(&mut self, platform: Selector) {
        self.criteria.platform = platform;
        self.refilter();
    }

    pub fn set_genre(&mut self, genre: Selector) {
        self.criteria.genre = genre;
        self.refilter();
    }

    pub fn set_completion(&mut self, completion: CompletionFilter) {
        self.criteria.completion = completion;
        self.refilter();
    }

    pub fn clear_filters(&mut self) {
        self.criteria.clear();
        self.refilter();
    }

    // -----------------------------------------------------------------------
    // Overlays
    // -----------------------------------------------------------------------

    /// Open the detail view for a game and start a fresh review panel.
    /// The returned ticket identifies the review fetch for this opening.
    pub fn open_detail(&mut self, id: &GameId) -> Result<LoadTicket, OverlayError> {
        let game = self.find_game(id)?;
        let closed = self.overlays.open_detail(game);
        self.after_close(&closed);

        self.generation += 1;
        let panel = ReviewPanel::new(id.clone(), self.generation);
        let ticket = panel.ticket();
        self.reviews = Some(panel);
        Ok(ticket)
    }

    pub fn open_edit(&mut self, id: &GameId) -> Result<(), OverlayError> {
        let game = self.find_game(id)?;
        let draft = GameDraft::from_record(&game);
        let closed = self.overlays.open_edit(game);
        self.after_close(&closed);
        self.edit_form = Some(FormController::new(
            draft,
            AfterSuccess::CloseAfterDelay,
            self.config.game_form_timing(),
        ));
        Ok(())
    }

    /// Open the review form from the detail view: a blank form when
    /// `review_id` is `None`, otherwise pre-filled from that review.
    pub fn open_review_form(&mut self, review_id: Option<&ReviewId>) -> Result<(), OverlayError> {
        let game_id = self
            .overlays
            .detail_game()
            .map(|g| g.id.clone())
            .ok_or(OverlayError::DetailNotOpen)?;
        let existing = match review_id {
            Some(id) => Some(
                self.reviews
                    .as_ref()
                    .and_then(|panel| panel.get(id))
                    .cloned()
                    .ok_or_else(|| OverlayError::UnknownReview(id.0.clone()))?,
            ),
            None => None,
        };
        let draft = match &existing {
            Some(review) => ReviewDraft::from_review(review),
            None => ReviewDraft::for_game(game_id),
        };
        let editing = existing.as_ref().map(|r| r.id.clone());

        let closed = self.overlays.open_review_form(existing)?;
        self.after_close(&closed);
        self.review_form = Some(ReviewForm {
            controller: FormController::new(
                draft,
                AfterSuccess::CloseAfterDelay,
                self.config.review_form_timing(),
            ),
            editing,
        });
        Ok(())
    }

    pub fn open_dashboard(&mut self) {
        let closed = self.overlays.open_dashboard();
        self.after_close(&closed);
    }

    pub fn close_overlay(&mut self, kind: OverlayKind) -> Vec<OverlayKind> {
        let closed = self.overlays.close(kind);
        self.after_close(&closed);
        closed
    }

    pub fn press_escape(&mut self) -> Option<OverlayKind> {
        let closed = self.overlays.press_escape();
        if let Some(kind) = closed {
            self.after_close(&[kind]);
        }
        closed
    }

    pub fn click_overlay(&mut self, kind: OverlayKind, region: ClickRegion) -> Vec<OverlayKind> {
        let closed = self.overlays.click(kind, region);
        self.after_close(&closed);
        closed
    }

    // -----------------------------------------------------------------------
    // Reviews
    // -----------------------------------------------------------------------

    /// Fetch reviews for the open detail view. Returns whether the result
    /// was applied.
    pub fn load_reviews(&mut self) -> bool {
        let Some(ticket) = self.begin_review_load() else {
            return false;
        };
        let result = self.api.list_reviews();
        self.commit_reviews(ticket, result)
    }

    /// Put the review panel back into loading and return its ticket.
    pub fn begin_review_load(&mut self) -> Option<LoadTicket> {
        self.reviews.as_mut().map(ReviewPanel::begin_reload)
    }

    /// Apply a review fetch. Results for a panel that is no longer open are
    /// dropped.
    pub fn commit_reviews(
        &mut self,
        ticket: LoadTicket,
        result: Result<Vec<ReviewRecord>, ApiError>,
    ) -> bool {
        match self.reviews.as_mut() {
            Some(panel) => panel.commit(ticket, result),
            None => {
                log::debug!("discarding review fetch: detail view is closed");
                false
            }
        }
    }

    pub fn request_review_delete(&mut self, id: ReviewId) -> Result<(), OverlayError> {
        self.reviews
            .as_mut()
            .ok_or(OverlayError::DetailNotOpen)?
            .request_delete(id)
    }

    pub fn cancel_review_delete(&mut self) {
        if let Some(panel) = self.reviews.as_mut() {
            panel.cancel_delete();
        }
    }

    /// Delete the review awaiting confirmation, if any.
    pub fn confirm_review_delete(&mut self, now: Instant) -> Result<bool, ApiError> {
        let Some(delete) = self.begin_review_delete() else {
            return Ok(false);
        };
        let result = self.api.delete_review(&delete.id);
        self.complete_review_delete(&delete, now, result).map(|()| true)
    }

    /// Take the review awaiting confirmation. `None` when nothing is pending.
    pub fn begin_review_delete(&mut self) -> Option<ReviewDelete> {
        let panel = self.reviews.as_mut()?;
        let id = panel.take_pending_delete()?;
        Some(ReviewDelete { ticket: panel.ticket(), id })
    }

    /// Apply the answer to a review delete. Dropped when the panel that
    /// asked for it has been closed or replaced.
    pub fn complete_review_delete(
        &mut self,
        delete: &ReviewDelete,
        now: Instant,
        result: Result<(), ApiError>,
    ) -> Result<(), ApiError> {
        let ttl = self.config.review_form_timing().message_ttl;
        match self.reviews.as_mut().filter(|panel| panel.owns(delete.ticket)) {
            Some(panel) => panel.finish_delete(&delete.id, now, ttl, result),
            None => {
                log::debug!("review {} delete answered after its panel closed", delete.id);
                result
            }
        }
    }

    // -----------------------------------------------------------------------
    // Forms
    // -----------------------------------------------------------------------

    pub fn edit_create_draft(&mut self, change: impl FnOnce(&mut GameDraft)) -> Result<(), FormError> {
        self.create_form.edit(change)
    }

    pub fn edit_edit_draft(&mut self, change: impl FnOnce(&mut GameDraft)) -> Result<(), FormError> {
        self.edit_form.as_mut().ok_or(FormError::NotOpen)?.edit(change)
    }

    pub fn edit_review_draft(&mut self, change: impl FnOnce(&mut ReviewDraft)) -> Result<(), FormError> {
        self.review_form
            .as_mut()
            .ok_or(FormError::NotOpen)?
            .controller
            .edit(change)
    }

    /// Submit the create form and prepend the created game.
    pub fn submit_create(&mut self, now: Instant) -> Result<GameId, FormError> {
        let payload = self.create_form.begin_submit(now)?;
        let result = self.api.create_game(&payload);
        self.complete_create(now, result)
    }

    /// Second half of a create submission whose request was sent elsewhere
    /// (after `begin_create`).
    pub fn complete_create(
        &mut self,
        now: Instant,
        result: Result<GameRecord, ApiError>,
    ) -> Result<GameId, FormError> {
        let game = self.create_form.complete(now, CREATE_GAME, result)?;
        let id = game.id.clone();
        log::info!("added game {id}");
        self.games.add(game);
        self.rederive();
        Ok(id)
    }

    /// Validate the create form and mark it as submitting. Lets a shell run
    /// the request itself and report back with `complete_create`.
    pub fn begin_create(&mut self, now: Instant) -> Result<GamePayload, FormError> {
        self.create_form.begin_submit(now)
    }

    /// Submit the edit form; on success replace the game in place.
    pub fn submit_edit(&mut self, now: Instant) -> Result<(), FormError> {
        let submission = self.begin_edit(now)?;
        let result = self.api.update_game(&submission.id, &submission.payload);
        self.complete_edit(&submission.id, now, result)
    }

    /// Validate the edit form and mark it as submitting.
    pub fn begin_edit(&mut self, now: Instant) -> Result<EditSubmission, FormError> {
        let id = self.edit_target().ok_or(FormError::NotOpen)?;
        let form = self.edit_form.as_mut().ok_or(FormError::NotOpen)?;
        let payload = form.begin_submit(now)?;
        Ok(EditSubmission { id, payload })
    }

    /// Apply the answer to an edit of `id`. A confirmed update reaches the
    /// cache even when the edit overlay was closed in the meantime.
    pub fn complete_edit(
        &mut self,
        id: &GameId,
        now: Instant,
        result: Result<GameRecord, ApiError>,
    ) -> Result<(), FormError> {
        let showing = self.edit_target().as_ref() == Some(id);
        let updated = match self.edit_form.as_mut().filter(|f| showing && f.is_submitting()) {
            Some(form) => form.complete(now, UPDATE_GAME, result)?,
            None => result.map_err(|e| {
                log::warn!("update of game {id} failed after its form closed: {e}");
                e
            })?,
        };

        if let Err(e) = self.games.replace(updated.clone()) {
            log::warn!("game cache out of sync after update: {e}");
        }
        self.overlays.refresh_game(&updated);
        self.rederive();
        Ok(())
    }

    /// Submit the review form (create or update).
    pub fn submit_review(&mut self, now: Instant) -> Result<(), FormError> {
        let submission = self.begin_review_submit(now)?;
        let result = submission.send(&*self.api);
        self.complete_review_submit(&submission, now, result)
    }

    /// Validate the review form and mark it as submitting. Updates are
    /// stamped with the current time.
    pub fn begin_review_submit(&mut self, now: Instant) -> Result<ReviewSubmission, FormError> {
        let form = self.review_form.as_mut().ok_or(FormError::NotOpen)?;
        let mut payload = form.controller.begin_submit(now)?;
        if form.editing.is_some() {
            payload.updated_at = Some(Utc::now());
        }
        Ok(ReviewSubmission { editing: form.editing.clone(), payload })
    }

    /// Apply the answer to a review submission. The saved review lands in the
    /// open panel only if that panel shows the review's game.
    pub fn complete_review_submit(
        &mut self,
        submission: &ReviewSubmission,
        now: Instant,
        result: Result<ReviewRecord, ApiError>,
    ) -> Result<(), FormError> {
        let messages = submission.messages();
        let form = self
            .review_form
            .as_mut()
            .filter(|f| f.controller.is_submitting() && f.editing == submission.editing);
        let saved = match form {
            Some(form) => form.controller.complete(now, messages, result)?,
            None => result.map_err(|e| {
                log::warn!("review submission failed after its form closed: {e}");
                e
            })?,
        };

        if let Some(panel) = self.reviews.as_mut().filter(|p| p.game_id() == &saved.game_id) {
            if submission.editing.is_some() {
                panel.replace(saved);
            } else {
                panel.add(saved);
            }
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Deletion
    // -----------------------------------------------------------------------

    pub fn delete_game(&mut self, id: &GameId, now: Instant) -> Result<(), ApiError> {
        if !self.begin_game_delete(id) {
            return Ok(());
        }
        let result = self.api.delete_game(id);
        self.complete_game_delete(id, now, result)
    }

    /// Mark `id` as being deleted. False when a delete for it is already in
    /// flight, in which case no second request should be sent.
    pub fn begin_game_delete(&mut self, id: &GameId) -> bool {
        if self.deleting.contains(id) {
            log::debug!("delete of game {id} already in flight");
            return false;
        }
        self.deleting.push(id.clone());
        true
    }

    pub fn complete_game_delete(
        &mut self,
        id: &GameId,
        now: Instant,
        result: Result<(), ApiError>,
    ) -> Result<(), ApiError> {
        self.deleting.retain(|d| d != id);
        match result {
            Ok(()) => {
                log::info!("deleted game {id}");
                self.games.remove(id);
                let closed = self.overlays.close_for_game(id);
                self.after_close(&closed);
                if self.notice.as_ref().is_some_and(|n| &n.game_id == id) {
                    self.notice = None;
                }
                self.rederive();
                Ok(())
            }
            Err(e) => {
                log::warn!("failed to delete game {id}: {e}");
                self.notice = Some(GameNotice {
                    game_id: id.clone(),
                    feedback: Feedback::new(
                        e.user_message(GAME_DELETE_FAILED),
                        MessageKind::Error,
                        now,
                        self.config.game_form_timing().message_ttl,
                    ),
                });
                Err(e)
            }
        }
    }

    // -----------------------------------------------------------------------
    // Timers
    // -----------------------------------------------------------------------

    /// Expire messages and run scheduled overlay closes.
    pub fn tick(&mut self, now: Instant) {
        self.create_form.tick(now);

        let edit_due = self.edit_form.as_mut().is_some_and(|f| f.tick(now));
        let review_due = self.review_form.as_mut().is_some_and(|f| f.controller.tick(now));
        if review_due {
            self.close_overlay(OverlayKind::ReviewForm);
        }
        if edit_due {
            self.close_overlay(OverlayKind::Edit);
        }

        if let Some(panel) = self.reviews.as_mut() {
            panel.tick(now);
        }
        if self.notice.as_ref().is_some_and(|n| n.feedback.is_expired(now)) {
            self.notice = None;
        }
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    fn edit_target(&self) -> Option<GameId> {
        match self.overlays.get(OverlayKind::Edit) {
            Some(Overlay::Edit(game)) => Some(game.id.clone()),
            _ => None,
        }
    }

    fn find_game(&self, id: &GameId) -> Result<GameRecord, OverlayError> {
        self.games
            .get(id)
            .cloned()
            .ok_or_else(|| OverlayError::UnknownGame(id.0.clone()))
    }

    /// Drop the state that belonged to overlays which just closed.
    fn after_close(&mut self, closed: &[OverlayKind]) {
        for kind in closed {
            match kind {
                OverlayKind::Edit => self.edit_form = None,
                OverlayKind::ReviewForm => self.review_form = None,
                OverlayKind::Detail => self.reviews = None,
                OverlayKind::Dashboard => {}
            }
        }
    }

    /// Recompute everything derived from the game cache.
    fn rederive(&mut self) {
        let games = self.games.items();
        self.platform_options = filter::platform_options(games);
        self.genre_options = filter::genre_options(games);
        self.stats = stats::summarize(games);
        self.refilter();
    }

    /// Recompute the filtered list only.
    fn refilter(&mut self) {
        self.visible = filter::apply(self.games.items(), &self.criteria);
    }
}
