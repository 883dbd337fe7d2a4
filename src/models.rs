// models.rs - All data types exchanged with the GameTracker backend.
//
// RUST NOTE: `derive` macros auto-generate trait implementations for us.
//   - `Serialize / Deserialize` (from serde) convert these structs to/from the
//     JSON the REST API speaks. `#[serde(rename = "...")]` maps our Rust field
//     names onto the backend's (Spanish) keys.
//   - `Debug`   lets you print them with `{:?}` for logging.
//   - `Clone`   lets you duplicate a value (Rust moves by default).

use std::fmt;

use chrono::{DateTime, Datelike, Local, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Oldest release year the game forms accept.
pub const MIN_RELEASE_YEAR: i32 = 1970;

// ---------------------------------------------------------------------------
// Identifiers
// ---------------------------------------------------------------------------

/// Server-assigned game identifier.
/// RUST NOTE: a "newtype" around String. `#[serde(transparent)]` makes it
/// (de)serialize exactly like the inner String, but the compiler will not let
/// us pass a ReviewId where a GameId is expected.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GameId(pub String);

/// Server-assigned review identifier.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReviewId(pub String);

impl fmt::Display for GameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for ReviewId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for GameId {
    fn from(s: &str) -> Self {
        GameId(s.to_string())
    }
}

impl From<&str> for ReviewId {
    fn from(s: &str) -> Self {
        ReviewId(s.to_string())
    }
}

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// How hard the reviewer found the game.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
pub enum Difficulty {
    #[serde(rename = "Fácil")]
    Easy,
    #[default]
    Normal,
    #[serde(rename = "Difícil")]
    Hard,
}

/// A release year as the backend stores it: usually a number, but older
/// records carry whatever text was typed into the form, and some carry `null`
/// or a float. A record never fails to load because of its year.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ReleaseYear {
    Year(i32),
    Text(String),
    /// Anything else (`null`, `2020.0`, ...), kept as sent.
    Other(serde_json::Value),
}

impl Default for ReleaseYear {
    fn default() -> Self {
        ReleaseYear::Text(String::new())
    }
}

impl ReleaseYear {
    /// The integer year, if one can be read.
    /// Text is read up to the first non-digit, so "2009 (GOTY)" gives 2009.
    pub fn as_year(&self) -> Option<i32> {
        match self {
            ReleaseYear::Year(y) => Some(*y),
            ReleaseYear::Text(s) => parse_leading_int(s),
            // Whole part of a float, like the form's integer parse would give.
            ReleaseYear::Other(value) => value
                .as_f64()
                .filter(|f| f.is_finite() && *f >= f64::from(i32::MIN) && *f <= f64::from(i32::MAX))
                .map(|f| f.trunc() as i32),
        }
    }
}

impl fmt::Display for ReleaseYear {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReleaseYear::Year(y) => write!(f, "{y}"),
            ReleaseYear::Text(s) => f.write_str(s),
            ReleaseYear::Other(_) => match self.as_year() {
                Some(y) => write!(f, "{y}"),
                None => Ok(()),
            },
        }
    }
}

fn parse_leading_int(s: &str) -> Option<i32> {
    let s = s.trim_start();
    let (sign, rest) = match s.strip_prefix('-') {
        Some(rest) => (-1, rest),
        None => (1, s.strip_prefix('+').unwrap_or(s)),
    };
    let digits: String = rest.chars().take_while(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return None;
    }
    digits.parse::<i32>().ok().map(|n| sign * n)
}

// ---------------------------------------------------------------------------
// Core records - returned by the backend
// ---------------------------------------------------------------------------

/// A game in the collection, including its server-assigned id.
/// RUST NOTE: `Option<T>` is Rust's null-safety type. `#[serde(default)]`
/// turns a missing JSON key into `None` (or `false` for the flag).
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct GameRecord {
    #[serde(rename = "_id")]
    pub id: GameId,
    #[serde(rename = "titulo")]
    pub title: String,
    #[serde(rename = "plataforma")]
    pub platform: String,
    #[serde(rename = "genero")]
    pub genre: String,
    #[serde(rename = "añoLanzamiento", default)]
    pub release_year: ReleaseYear,
    #[serde(rename = "desarrollador")]
    pub developer: String,
    #[serde(rename = "imagenPortada", default, skip_serializing_if = "Option::is_none")]
    pub cover_url: Option<String>,
    #[serde(rename = "descripcion", default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "completado", default)]
    pub completed: bool,
}

/// A review of one game. Many reviews may point at the same game.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ReviewRecord {
    #[serde(rename = "_id")]
    pub id: ReviewId,
    #[serde(rename = "juegoId")]
    pub game_id: GameId,
    #[serde(rename = "puntuacion")]
    pub rating: u8,                                   // 1 – 5
    #[serde(rename = "textoReseña", default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(rename = "horasJugadas", default)]
    pub hours_played: u32,
    #[serde(rename = "dificultad", default)]
    pub difficulty: Difficulty,
    #[serde(rename = "recomendaria", default = "default_true")]
    pub recommends: bool,
    #[serde(rename = "fechaCreacion")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "fechaActualizacion", default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

fn default_true() -> bool {
    true
}

// ---------------------------------------------------------------------------
// Drafts - form state as typed by the user
// ---------------------------------------------------------------------------

/// Game form contents. Every field is kept exactly as typed; conversion to
/// the wire payload happens on submit.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct GameDraft {
    pub title:        String,
    pub platform:     String,
    pub genre:        String,
    pub release_year: String,
    pub developer:    String,
    pub cover_url:    String,
    pub description:  String,
    pub completed:    bool,
}

impl GameDraft {
    /// Pre-fill an edit form from an existing record.
    pub fn from_record(game: &GameRecord) -> Self {
        GameDraft {
            title:        game.title.clone(),
            platform:     game.platform.clone(),
            genre:        game.genre.clone(),
            release_year: game.release_year.to_string(),
            developer:    game.developer.clone(),
            cover_url:    game.cover_url.clone().unwrap_or_default(),
            description:  game.description.clone().unwrap_or_default(),
            completed:    game.completed,
        }
    }

    /// Validate against an explicit upper year bound and build the payload.
    pub fn to_payload_until(&self, max_year: i32) -> Result<GamePayload, ValidationError> {
        let title = required(&self.title, "title")?;
        let platform = required(&self.platform, "platform")?;
        let genre = required(&self.genre, "genre")?;
        let year_text = required(&self.release_year, "release year")?;
        let developer = required(&self.developer, "developer")?;

        let release_year: i32 = year_text
            .parse()
            .map_err(|_| ValidationError::YearNotNumeric)?;
        if !(MIN_RELEASE_YEAR..=max_year).contains(&release_year) {
            return Err(ValidationError::YearOutOfRange { min: MIN_RELEASE_YEAR, max: max_year });
        }

        Ok(GamePayload {
            title,
            platform,
            genre,
            release_year,
            developer,
            cover_url: optional(&self.cover_url),
            description: optional(&self.description),
            completed: self.completed,
        })
    }

    /// Validate with the year bounded to next calendar year.
    pub fn to_payload(&self) -> Result<GamePayload, ValidationError> {
        self.to_payload_until(Local::now().year() + 1)
    }
}

/// Review form contents.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ReviewDraft {
    pub game_id:      GameId,
    pub rating:       u8,
    pub body:         String,
    pub hours_played: String,
    pub difficulty:   Difficulty,
    pub recommends:   bool,
}

impl Default for ReviewDraft {
    fn default() -> Self {
        ReviewDraft {
            game_id:      GameId::default(),
            rating:       3,
            body:         String::new(),
            hours_played: String::new(),
            difficulty:   Difficulty::Normal,
            recommends:   true,
        }
    }
}

impl ReviewDraft {
    pub fn for_game(game_id: GameId) -> Self {
        ReviewDraft { game_id, ..Default::default() }
    }

    pub fn from_review(review: &ReviewRecord) -> Self {
        ReviewDraft {
            game_id:      review.game_id.clone(),
            rating:       review.rating,
            body:         review.body.clone().unwrap_or_default(),
            hours_played: if review.hours_played > 0 {
                review.hours_played.to_string()
            } else {
                String::new()
            },
            difficulty:   review.difficulty,
            recommends:   review.recommends,
        }
    }

    pub fn to_payload(&self) -> Result<ReviewPayload, ValidationError> {
        if !(1..=5).contains(&self.rating) {
            return Err(ValidationError::RatingOutOfRange);
        }
        let hours = self.hours_played.trim();
        let hours_played = if hours.is_empty() {
            0
        } else {
            hours.parse::<u32>().map_err(|_| ValidationError::InvalidHours)?
        };
        Ok(ReviewPayload {
            game_id: self.game_id.clone(),
            rating: self.rating,
            body: self.body.clone(),
            hours_played,
            difficulty: self.difficulty,
            recommends: self.recommends,
            updated_at: None,
        })
    }
}

fn required(value: &str, field: &'static str) -> Result<String, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(ValidationError::Required(field))
    } else {
        Ok(trimmed.to_string())
    }
}

fn optional(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

// ---------------------------------------------------------------------------
// Payloads - request bodies (no id, no server timestamps)
// ---------------------------------------------------------------------------

/// Body of `POST /api/juegos` and `PUT /api/juegos/{id}`.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct GamePayload {
    #[serde(rename = "titulo")]
    pub title: String,
    #[serde(rename = "plataforma")]
    pub platform: String,
    #[serde(rename = "genero")]
    pub genre: String,
    #[serde(rename = "añoLanzamiento")]
    pub release_year: i32,
    #[serde(rename = "desarrollador")]
    pub developer: String,
    #[serde(rename = "imagenPortada", skip_serializing_if = "Option::is_none")]
    pub cover_url: Option<String>,
    #[serde(rename = "descripcion", skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "completado")]
    pub completed: bool,
}

/// Body of `POST /api/reviews` and `PUT /api/reviews/{id}`.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ReviewPayload {
    #[serde(rename = "juegoId")]
    pub game_id: GameId,
    #[serde(rename = "puntuacion")]
    pub rating: u8,
    #[serde(rename = "textoReseña")]
    pub body: String,
    #[serde(rename = "horasJugadas")]
    pub hours_played: u32,
    #[serde(rename = "dificultad")]
    pub difficulty: Difficulty,
    #[serde(rename = "recomendaria")]
    pub recommends: bool,
    /// Only sent on update.
    #[serde(rename = "fechaActualizacion", skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}
