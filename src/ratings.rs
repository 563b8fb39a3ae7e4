//! # Rating Validator
//!
//! Accepts a vote, enforces the field rules and the one-rating-per-day rule,
//! and appends it to the ratings record.
//!
//! The duplicate scan and the append run under the ratings writer lock, so
//! two racing submissions for the same identity cannot both get in.

use chrono::{DateTime, SecondsFormat, Utc};
use metrics::{counter, gauge};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info};

use crate::admin;
use crate::calendar::DayInfo;
use crate::config::SecretsHandle;
use crate::error::CanteenError;
use crate::metrics::{RATINGS_REJECTED, RATINGS_STORED, RATINGS_SUBMITTED};
use crate::model::{Rating, RatingIdentity};
use crate::store::{Record, RecordStore};

pub const MIN_SCORE: i64 = 1;
pub const MAX_SCORE: i64 = 10;

/// Submission body as sent by clients. Every field is optional at the wire
/// level so missing ones surface as validation errors, not decode errors.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Submission {
    pub day: Option<String>,
    pub meal_type: Option<String>,
    pub dish_name: Option<String>,
    pub score: Option<Value>,
    pub comment: Option<String>,
    pub is_mystery: Option<Value>,
    pub visitor_id: Option<String>,
    pub date_key: Option<String>,
}

impl Submission {
    /// Check required fields and score range; fill `dateKey` from `today`
    /// when the client left it out.
    fn validate(self, today: &DayInfo) -> Result<Validated, CanteenError> {
        let day = required(self.day, "day")?;
        let meal_type = required(self.meal_type, "mealType")?;
        let dish_name = required(self.dish_name, "dishName")?;
        let score = match self.score {
            None | Some(Value::Null) => return Err(CanteenError::validation("score is required")),
            Some(v) => parse_score(&v)?,
        };
        if !(MIN_SCORE..=MAX_SCORE).contains(&score) {
            return Err(CanteenError::validation(format!(
                "score must be between {MIN_SCORE} and {MAX_SCORE}"
            )));
        }

        Ok(Validated {
            day,
            meal_type,
            dish_name,
            score: score as u8,
            comment: self.comment.unwrap_or_default(),
            is_mystery: parse_flag(self.is_mystery.as_ref())?,
            visitor_id: self.visitor_id.unwrap_or_default(),
            date_key: self
                .date_key
                .filter(|k| !k.is_empty())
                .unwrap_or_else(|| today.day_key.clone()),
        })
    }
}

#[derive(Debug)]
struct Validated {
    day: String,
    meal_type: String,
    dish_name: String,
    score: u8,
    comment: String,
    is_mystery: bool,
    visitor_id: String,
    date_key: String,
}

impl Validated {
    fn identity(&self) -> RatingIdentity<'_> {
        RatingIdentity {
            visitor_id: &self.visitor_id,
            day: &self.day,
            meal_type: &self.meal_type,
            dish_name: &self.dish_name,
            date_key: &self.date_key,
        }
    }
}

fn required(field: Option<String>, name: &str) -> Result<String, CanteenError> {
    field
        .filter(|s| !s.is_empty())
        .ok_or_else(|| CanteenError::validation(format!("{name} is required")))
}

/// Integers, integral floats (`7.0`) and numeric strings (`"7"`) are accepted.
fn parse_score(v: &Value) -> Result<i64, CanteenError> {
    let not_numeric = || CanteenError::validation("score must be a whole number");
    match v {
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Ok(i)
            } else {
                match n.as_f64() {
                    Some(f) if f.fract() == 0.0 && f.is_finite() => Ok(f as i64),
                    _ => Err(not_numeric()),
                }
            }
        }
        Value::String(s) => s.trim().parse::<i64>().map_err(|_| not_numeric()),
        _ => Err(not_numeric()),
    }
}

/// `true`/`false`, `1`/`0` and their string forms. Missing or `null` is false.
fn parse_flag(v: Option<&Value>) -> Result<bool, CanteenError> {
    let not_flag = || CanteenError::validation("isMystery must be true or false");
    match v {
        None | Some(Value::Null) => Ok(false),
        Some(Value::Bool(b)) => Ok(*b),
        Some(Value::Number(n)) => match n.as_f64() {
            Some(f) if f == 0.0 => Ok(false),
            Some(f) if f == 1.0 => Ok(true),
            _ => Err(not_flag()),
        },
        Some(Value::String(s)) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "1" => Ok(true),
            "false" | "0" | "" => Ok(false),
            _ => Err(not_flag()),
        },
        Some(_) => Err(not_flag()),
    }
}

/// Store a rating stamped with the server's current time.
pub async fn submit(store: &RecordStore, submission: Submission) -> Result<Rating, CanteenError> {
    submit_at(store, submission, &DayInfo::today(), Utc::now()).await
}

/// Same as [`submit`] with an explicit clock.
pub async fn submit_at(
    store: &RecordStore,
    submission: Submission,
    today: &DayInfo,
    now: DateTime<Utc>,
) -> Result<Rating, CanteenError> {
    let valid = submission.validate(today).inspect_err(|_| reject("validation"))?;

    let _guard = store.lock(Record::Ratings).await;
    let mut ratings = store.ratings().await.inspect_err(|_| reject("storage"))?;

    if ratings.iter().any(|r| r.same_identity(&valid.identity())) {
        reject("duplicate");
        debug!(
            target: "ratings",
            visitor = %visitor_tag(&valid.visitor_id),
            dish = %valid.dish_name,
            date_key = %valid.date_key,
            "duplicate rating refused"
        );
        return Err(CanteenError::Duplicate);
    }

    let rating = Rating {
        id: next_id(&ratings, now),
        day: valid.day,
        date_key: valid.date_key,
        meal_type: valid.meal_type,
        dish_name: valid.dish_name,
        score: valid.score,
        comment: valid.comment,
        is_mystery: valid.is_mystery,
        visitor_id: valid.visitor_id,
        timestamp: now.to_rfc3339_opts(SecondsFormat::Millis, true),
    };
    ratings.push(rating.clone());
    let stored = ratings.len();
    store
        .write_ratings(ratings)
        .await
        .inspect_err(|_| reject("storage"))?;

    counter!(RATINGS_SUBMITTED, "mystery" => if rating.is_mystery { "true" } else { "false" })
        .increment(1);
    gauge!(RATINGS_STORED).set(stored as f64);
    info!(
        target: "ratings",
        id = %rating.id,
        visitor = %visitor_tag(&rating.visitor_id),
        day = %rating.day,
        meal = %rating.meal_type,
        dish = %rating.dish_name,
        score = rating.score,
        mystery = rating.is_mystery,
        "rating stored"
    );
    Ok(rating)
}

/// Every stored rating (admin only).
pub async fn all(
    store: &RecordStore,
    secrets: &SecretsHandle,
    admin_secret: &str,
) -> Result<Vec<Rating>, CanteenError> {
    admin::check(secrets, admin_secret)?;
    Ok(store.ratings().await?)
}

/// Drop every rating (admin only). The menu is not touched.
pub async fn clear(
    store: &RecordStore,
    secrets: &SecretsHandle,
    admin_secret: &str,
) -> Result<(), CanteenError> {
    admin::check(secrets, admin_secret)?;

    let _guard = store.lock(Record::Ratings).await;
    store.write_ratings(Vec::new()).await?;
    gauge!(RATINGS_STORED).set(0.0);
    info!(target: "ratings", "all ratings cleared");
    Ok(())
}

fn reject(reason: &'static str) {
    counter!(RATINGS_REJECTED, "reason" => reason).increment(1);
}

/// Millisecond timestamp, bumped past the largest numeric id already present.
fn next_id(existing: &[Rating], now: DateTime<Utc>) -> String {
    let now_ms = now.timestamp_millis().max(0) as u64;
    let last = existing
        .iter()
        .filter_map(|r| r.id.parse::<u64>().ok())
        .max();
    match last {
        Some(last) if last >= now_ms => (last + 1).to_string(),
        _ => now_ms.to_string(),
    }
}

/// Short stable tag for a visitor id; raw ids stay out of the logs.
pub(crate) fn visitor_tag(visitor_id: &str) -> String {
    use sha2::{Digest, Sha256};
    let digest = Sha256::digest(visitor_id.as_bytes());
    let mut out = String::with_capacity(12);
    for b in digest.iter().take(6) {
        use std::fmt::Write as _;
        let _ = write!(&mut out, "{:02x}", b);
    }
    out
}
