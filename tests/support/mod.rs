// In-memory backend shared by the integration tests.
#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use chrono::Utc;

use gametracker::models::{GamePayload, ReviewPayload};
use gametracker::{
    ApiError, CollectionApi, Config, Difficulty, GameId, GameRecord, ReleaseYear, ReviewId,
    ReviewRecord, Session,
};

pub const SERVER_ERROR: &str = "boom";

#[derive(Default)]
struct Backend {
    games:               Vec<GameRecord>,
    reviews:             Vec<ReviewRecord>,
    next_id:             u32,
    failing:             HashSet<&'static str>,
    calls:               Vec<&'static str>,
    last_review_payload: Option<ReviewPayload>,
}

/// The backend side of a held call.
struct HeldCall {
    entered: Sender<()>,
    release: Receiver<()>,
}

/// The test side of a held call: wait until the request is in flight, then
/// let it finish.
pub struct Gate {
    entered: Receiver<()>,
    release: Sender<()>,
}

impl Gate {
    pub fn wait_entered(&self) {
        self.entered
            .recv_timeout(Duration::from_secs(5))
            .expect("held call was never made");
    }

    pub fn release(&self) {
        self.release.send(()).unwrap();
    }
}

#[derive(Default)]
pub struct FakeApi {
    backend: Mutex<Backend>,
    held:    Mutex<HashMap<&'static str, HeldCall>>,
}

impl FakeApi {
    pub fn new(games: Vec<GameRecord>, reviews: Vec<ReviewRecord>) -> Self {
        FakeApi {
            backend: Mutex::new(Backend { games, reviews, next_id: 100, ..Backend::default() }),
            held: Mutex::new(HashMap::new()),
        }
    }

    /// Block the next call to `op` until the returned gate is released.
    pub fn hold(&self, op: &'static str) -> Gate {
        let (entered_tx, entered_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel();
        self.held
            .lock()
            .unwrap()
            .insert(op, HeldCall { entered: entered_tx, release: release_rx });
        Gate { entered: entered_rx, release: release_tx }
    }

    /// Make every call to `op` answer HTTP 500 until `recover(op)`.
    pub fn fail(&self, op: &'static str) {
        self.backend.lock().unwrap().failing.insert(op);
    }

    pub fn recover(&self, op: &'static str) {
        self.backend.lock().unwrap().failing.remove(op);
    }

    pub fn calls(&self, op: &str) -> usize {
        self.backend.lock().unwrap().calls.iter().filter(|c| **c == op).count()
    }

    pub fn stored_games(&self) -> Vec<GameRecord> {
        self.backend.lock().unwrap().games.clone()
    }

    pub fn last_review_payload(&self) -> Option<ReviewPayload> {
        self.backend.lock().unwrap().last_review_payload.clone()
    }

    fn enter(&self, op: &'static str) -> Result<MutexGuard<'_, Backend>, ApiError> {
        let held = self.held.lock().unwrap().remove(op);
        if let Some(call) = held {
            call.entered.send(()).unwrap();
            call.release.recv_timeout(Duration::from_secs(5)).unwrap();
        }
        let mut backend = self.backend.lock().unwrap();
        backend.calls.push(op);
        if backend.failing.contains(op) {
            return Err(ApiError::Status { status: 500, message: Some(SERVER_ERROR.into()) });
        }
        Ok(backend)
    }
}

fn not_found() -> ApiError {
    ApiError::Status { status: 404, message: Some("not found".into()) }
}

fn game_from_payload(id: GameId, payload: &GamePayload) -> GameRecord {
    GameRecord {
        id,
        title: payload.title.clone(),
        platform: payload.platform.clone(),
        genre: payload.genre.clone(),
        release_year: ReleaseYear::Year(payload.release_year),
        developer: payload.developer.clone(),
        cover_url: payload.cover_url.clone(),
        description: payload.description.clone(),
        completed: payload.completed,
    }
}

impl CollectionApi for FakeApi {
    fn list_games(&self) -> Result<Vec<GameRecord>, ApiError> {
        Ok(self.enter("list_games")?.games.clone())
    }

    fn create_game(&self, game: &GamePayload) -> Result<GameRecord, ApiError> {
        let mut backend = self.enter("create_game")?;
        backend.next_id += 1;
        let record = game_from_payload(GameId(format!("g{}", backend.next_id)), game);
        backend.games.insert(0, record.clone());
        Ok(record)
    }

    fn update_game(&self, id: &GameId, game: &GamePayload) -> Result<GameRecord, ApiError> {
        let mut backend = self.enter("update_game")?;
        let slot = backend.games.iter_mut().find(|g| &g.id == id).ok_or_else(not_found)?;
        *slot = game_from_payload(id.clone(), game);
        Ok(slot.clone())
    }

    fn delete_game(&self, id: &GameId) -> Result<(), ApiError> {
        let mut backend = self.enter("delete_game")?;
        backend.games.retain(|g| &g.id != id);
        Ok(())
    }

    fn list_reviews(&self) -> Result<Vec<ReviewRecord>, ApiError> {
        Ok(self.enter("list_reviews")?.reviews.clone())
    }

    fn create_review(&self, review: &ReviewPayload) -> Result<ReviewRecord, ApiError> {
        let mut backend = self.enter("create_review")?;
        backend.next_id += 1;
        let record = ReviewRecord {
            id: ReviewId(format!("r{}", backend.next_id)),
            game_id: review.game_id.clone(),
            rating: review.rating,
            body: Some(review.body.clone()),
            hours_played: review.hours_played,
            difficulty: review.difficulty,
            recommends: review.recommends,
            created_at: Utc::now(),
            updated_at: None,
        };
        backend.last_review_payload = Some(review.clone());
        backend.reviews.push(record.clone());
        Ok(record)
    }

    fn update_review(&self, id: &ReviewId, review: &ReviewPayload) -> Result<ReviewRecord, ApiError> {
        let mut backend = self.enter("update_review")?;
        backend.last_review_payload = Some(review.clone());
        let slot = backend.reviews.iter_mut().find(|r| &r.id == id).ok_or_else(not_found)?;
        slot.rating = review.rating;
        slot.body = Some(review.body.clone());
        slot.hours_played = review.hours_played;
        slot.difficulty = review.difficulty;
        slot.recommends = review.recommends;
        slot.updated_at = review.updated_at;
        Ok(slot.clone())
    }

    fn delete_review(&self, id: &ReviewId) -> Result<(), ApiError> {
        let mut backend = self.enter("delete_review")?;
        backend.reviews.retain(|r| &r.id != id);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

pub fn game(id: &str, title: &str, platform: &str, genre: &str, year: i32, completed: bool) -> GameRecord {
    GameRecord {
        id: GameId::from(id),
        title: title.into(),
        platform: platform.into(),
        genre: genre.into(),
        release_year: ReleaseYear::Year(year),
        developer: format!("{title} Studio"),
        cover_url: None,
        description: None,
        completed,
    }
}

pub fn review(id: &str, game_id: &str, rating: u8) -> ReviewRecord {
    ReviewRecord {
        id: ReviewId::from(id),
        game_id: GameId::from(game_id),
        rating,
        body: Some("Loved it".into()),
        hours_played: 20,
        difficulty: Difficulty::Normal,
        recommends: true,
        created_at: Utc::now(),
        updated_at: None,
    }
}

/// Zelda (Switch, done), Hades (PC, pending), Hollow Knight (Switch, done).
pub fn library() -> Vec<GameRecord> {
    vec![
        game("g1", "The Legend of Zelda", "Switch", "Adventure", 2017, true),
        game("g2", "Hades", "PC", "Roguelike", 2020, false),
        game("g3", "Hollow Knight", "Switch", "Metroidvania", 2017, true),
    ]
}

pub fn library_reviews() -> Vec<ReviewRecord> {
    vec![review("r1", "g1", 5), review("r2", "g2", 4), review("r3", "g1", 3)]
}

/// A session over `library()` with the collection already loaded.
pub fn loaded_session() -> Session<FakeApi> {
    let mut session = Session::new(FakeApi::new(library(), library_reviews()), Config::default());
    session.load_games().unwrap();
    session
}
