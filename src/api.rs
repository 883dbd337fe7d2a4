// api.rs - The REST backend, seen from the client.
//
// `CollectionApi` is the seam between the session and the network. The real
// implementation is `HttpApi`, a blocking `ureq` client; tests plug in an
// in-memory fake.
//
//   GET    /api/juegos          → Vec<GameRecord>
//   POST   /api/juegos          → GameRecord (id assigned)
//   PUT    /api/juegos/{id}     → GameRecord
//   DELETE /api/juegos/{id}     → 2xx, body ignored
//   ...and the same four for /api/reviews

use std::io::Read;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::error::ApiError;
use crate::models::{GameId, GamePayload, GameRecord, ReviewId, ReviewPayload, ReviewRecord};

pub trait CollectionApi {
    fn list_games(&self) -> Result<Vec<GameRecord>, ApiError>;
    fn create_game(&self, game: &GamePayload) -> Result<GameRecord, ApiError>;
    fn update_game(&self, id: &GameId, game: &GamePayload) -> Result<GameRecord, ApiError>;
    fn delete_game(&self, id: &GameId) -> Result<(), ApiError>;

    fn list_reviews(&self) -> Result<Vec<ReviewRecord>, ApiError>;
    fn create_review(&self, review: &ReviewPayload) -> Result<ReviewRecord, ApiError>;
    fn update_review(&self, id: &ReviewId, review: &ReviewPayload) -> Result<ReviewRecord, ApiError>;
    fn delete_review(&self, id: &ReviewId) -> Result<(), ApiError>;
}

/// Shape of an error body: `{"error": "..."}`.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: Option<String>,
}

/// Pull the human-readable message out of an error response body, if any.
pub fn error_message(body: &str) -> Option<String> {
    serde_json::from_str::<ErrorBody>(body).ok()?.error
}

pub struct HttpApi {
    agent:    ureq::Agent,
    base_url: String,
}

impl HttpApi {
    pub fn new(config: &Config) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(config.request_timeout())
            .build();
        HttpApi {
            agent,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Send one request and return the raw body of a 2xx response.
    fn send<B: Serialize>(&self, method: &str, path: &str, body: Option<&B>) -> Result<String, ApiError> {
        let url = self.url(path);
        log::debug!("{method} {url}");
        let body = body
            .map(serde_json::to_string)
            .transpose()
            .map_err(ApiError::Encode)?;

        let request = self
            .agent
            .request(method, &url)
            .set("Accept", "application/json");
        let response = match body {
            Some(body) => request
                .set("Content-Type", "application/json")
                .send_string(&body),
            None => request.call(),
        };

        match response {
            Ok(response) => {
                let mut text = String::new();
                response.into_reader().read_to_string(&mut text)?;
                Ok(text)
            }
            // RUST NOTE: ureq reports 4xx/5xx as an Err carrying the response,
            // so the error body can still be read.
            Err(ureq::Error::Status(status, response)) => {
                let message = response.into_string().ok().and_then(|b| error_message(&b));
                log::warn!("{method} {url} failed with HTTP {status}");
                Err(ApiError::Status { status, message })
            }
            Err(ureq::Error::Transport(e)) => {
                log::warn!("{method} {url} failed: {e}");
                Err(ApiError::Transport(e.to_string()))
            }
        }
    }

    fn json<T: DeserializeOwned, B: Serialize>(
        &self,
        method: &str,
        path: &str,
        body: Option<&B>,
    ) -> Result<T, ApiError> {
        let text = self.send(method, path, body)?;
        Ok(serde_json::from_str(&text)?)
    }
}

// `None::<&()>` spells "no body" for the generic `B`.
impl CollectionApi for HttpApi {
    fn list_games(&self) -> Result<Vec<GameRecord>, ApiError> {
        self.json("GET", "/api/juegos", None::<&()>)
    }

    fn create_game(&self, game: &GamePayload) -> Result<GameRecord, ApiError> {
        self.json("POST", "/api/juegos", Some(game))
    }

    fn update_game(&self, id: &GameId, game: &GamePayload) -> Result<GameRecord, ApiError> {
        self.json("PUT", &format!("/api/juegos/{id}"), Some(game))
    }

    fn delete_game(&self, id: &GameId) -> Result<(), ApiError> {
        self.send("DELETE", &format!("/api/juegos/{id}"), None::<&()>).map(drop)
    }

    fn list_reviews(&self) -> Result<Vec<ReviewRecord>, ApiError> {
        self.json("GET", "/api/reviews", None::<&()>)
    }

    fn create_review(&self, review: &ReviewPayload) -> Result<ReviewRecord, ApiError> {
        self.json("POST", "/api/reviews", Some(review))
    }

    fn update_review(&self, id: &ReviewId, review: &ReviewPayload) -> Result<ReviewRecord, ApiError> {
        self.json("PUT", &format!("/api/reviews/{id}"), Some(review))
    }

    fn delete_review(&self, id: &ReviewId) -> Result<(), ApiError> {
        self.send("DELETE", &format!("/api/reviews/{id}"), None::<&()>).map(drop)
    }
}
