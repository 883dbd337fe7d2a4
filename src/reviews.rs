// reviews.rs - Reviews shown inside the detail overlay.
//
// Each time the detail overlay opens, a new panel is created for that game.
// The backend only lists *all* reviews, so the panel filters them by game id
// after the fetch.
//
// Fetches are matched to the panel that asked for them through a
// `LoadTicket`. A response that arrives after the user moved on to another
// game (or closed the overlay) carries a stale ticket and is dropped.

use std::time::{Duration, Instant};

use crate::error::{ApiError, OverlayError};
use crate::forms::{Feedback, MessageKind};
use crate::models::{GameId, ReviewId, ReviewRecord};
use crate::store::{LoadState, RecordStore};

pub const REVIEWS_LOAD_FAILED: &str = "Could not load the reviews.";
pub const REVIEW_DELETE_FAILED: &str = "Could not delete the review.";

/// Identifies one review fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadTicket {
    generation: u64,
}

/// Keep only the reviews that belong to `game_id`, in server order.
pub fn for_game(all: Vec<ReviewRecord>, game_id: &GameId) -> Vec<ReviewRecord> {
    all.into_iter().filter(|r| &r.game_id == game_id).collect()
}

#[derive(Debug, Clone)]
pub struct ReviewPanel {
    game_id:        GameId,
    generation:     u64,
    load:           LoadState,
    reviews:        RecordStore<ReviewRecord>,
    pending_delete: Option<ReviewId>,
    notice:         Option<Feedback>,
}

impl ReviewPanel {
    /// A fresh panel in the loading state. `generation` must be unique per
    /// panel for the lifetime of the session.
    pub fn new(game_id: GameId, generation: u64) -> Self {
        ReviewPanel {
            game_id,
            generation,
            load: LoadState::Loading,
            reviews: RecordStore::new(),
            pending_delete: None,
            notice: None,
        }
    }

    pub fn game_id(&self) -> &GameId {
        &self.game_id
    }

    pub fn reviews(&self) -> &[ReviewRecord] {
        self.reviews.items()
    }

    pub fn get(&self, id: &ReviewId) -> Option<&ReviewRecord> {
        self.reviews.get(id)
    }

    pub fn load_state(&self) -> &LoadState {
        &self.load
    }

    pub fn pending_delete(&self) -> Option<&ReviewId> {
        self.pending_delete.as_ref()
    }

    pub fn notice(&self) -> Option<&Feedback> {
        self.notice.as_ref()
    }

    pub fn ticket(&self) -> LoadTicket {
        LoadTicket { generation: self.generation }
    }

    pub fn owns(&self, ticket: LoadTicket) -> bool {
        ticket.generation == self.generation
    }

    /// Mark the panel as loading again (retry) and hand out its ticket.
    pub fn begin_reload(&mut self) -> LoadTicket {
        self.load = LoadState::Loading;
        self.ticket()
    }

    /// Apply a finished fetch. Returns false when the ticket is stale.
    pub fn commit(&mut self, ticket: LoadTicket, result: Result<Vec<ReviewRecord>, ApiError>) -> bool {
        if !self.owns(ticket) {
            log::debug!("discarding stale review fetch for game {}", self.game_id);
            return false;
        }
        match result {
            Ok(all) => {
                let mine = for_game(all, &self.game_id);
                log::info!("loaded {} reviews for game {}", mine.len(), self.game_id);
                self.reviews.replace_all(mine);
                self.load = LoadState::Ready;
            }
            Err(e) => {
                log::warn!("failed to load reviews for game {}: {e}", self.game_id);
                self.load = LoadState::Failed(e.user_message(REVIEWS_LOAD_FAILED));
            }
        }
        true
    }

    /// Store a review the server just created.
    pub fn add(&mut self, review: ReviewRecord) {
        self.reviews.add(review);
    }

    /// Store a review the server just updated.
    pub fn replace(&mut self, review: ReviewRecord) {
        if let Err(e) = self.reviews.replace(review) {
            log::warn!("review cache out of sync for game {}: {e}", self.game_id);
        }
    }

    /// First step of a delete: remember which review the user wants gone.
    pub fn request_delete(&mut self, id: ReviewId) -> Result<(), OverlayError> {
        if self.reviews.get(&id).is_none() {
            return Err(OverlayError::UnknownReview(id.0));
        }
        self.pending_delete = Some(id);
        Ok(())
    }

    pub fn cancel_delete(&mut self) {
        self.pending_delete = None;
    }

    /// Second step: the user confirmed. Sends the delete and removes the
    /// review once the server agrees. Returns `Ok(false)` when nothing was
    /// awaiting confirmation.
    pub fn confirm_delete(
        &mut self,
        now: Instant,
        notice_ttl: Duration,
        send: impl FnOnce(&ReviewId) -> Result<(), ApiError>,
    ) -> Result<bool, ApiError> {
        let Some(id) = self.take_pending_delete() else {
            return Ok(false);
        };
        let result = send(&id);
        self.finish_delete(&id, now, notice_ttl, result).map(|()| true)
    }

    /// The review awaiting confirmation, removed from the confirmation
    /// dialog. The caller sends the delete and reports back with
    /// [`finish_delete`](Self::finish_delete).
    pub fn take_pending_delete(&mut self) -> Option<ReviewId> {
        self.pending_delete.take()
    }

    /// Apply the server's answer to a delete of `id`.
    pub fn finish_delete(
        &mut self,
        id: &ReviewId,
        now: Instant,
        notice_ttl: Duration,
        result: Result<(), ApiError>,
    ) -> Result<(), ApiError> {
        match result {
            Ok(()) => {
                self.reviews.remove(id);
                Ok(())
            }
            Err(e) => {
                log::warn!("failed to delete review {id}: {e}");
                self.notice = Some(Feedback::new(
                    e.user_message(REVIEW_DELETE_FAILED),
                    MessageKind::Error,
                    now,
                    notice_ttl,
                ));
                Err(e)
            }
        }
    }

    pub fn tick(&mut self, now: Instant) {
        if self.notice.as_ref().is_some_and(|n| n.is_expired(now)) {
            self.notice = None;
        }
    }
}
