//! Persisted record shapes: menu, ratings list, config.
//!
//! Field names follow the JSON files on disk (camelCase), so records written
//! by earlier deployments keep loading.

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::warn;

/// Weekday labels in Monday..Friday order. Index `i` here is weekday `i + 1`.
pub const WEEKDAY_LABELS: [&str; 5] = ["周一", "周二", "周三", "周四", "周五"];

/// Meal slot labels: breakfast, lunch.
pub const MEAL_SLOTS: [&str; 2] = ["早餐", "午餐"];

/// Weight applied to a rating flagged as coming from a mystery reviewer.
pub const MYSTERY_WEIGHT: u32 = 3;

/// Built-in defaults written to `config.json` on first run.
pub const DEFAULT_ADMIN_PASSWORD: &str = "0111ll";
pub const DEFAULT_MYSTERY_CODE: &str = "8888";

/// One vote by one visitor for one dish on one day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rating {
    pub id: String,
    pub day: String,
    #[serde(default)]
    pub date_key: String,
    pub meal_type: String,
    pub dish_name: String,
    #[serde(deserialize_with = "stored_score")]
    pub score: u8,
    #[serde(default)]
    pub comment: String,
    #[serde(default)]
    pub is_mystery: bool,
    #[serde(default)]
    pub visitor_id: String,
    pub timestamp: String,
}

impl Rating {
    /// Aggregation weight of this vote.
    pub fn weight(&self) -> u32 {
        if self.is_mystery {
            MYSTERY_WEIGHT
        } else {
            1
        }
    }

    /// True when `self` occupies the same one-per-day slot as the given identity.
    pub fn same_identity(&self, id: &RatingIdentity<'_>) -> bool {
        self.visitor_id == id.visitor_id
            && self.day == id.day
            && self.meal_type == id.meal_type
            && self.dish_name == id.dish_name
            && self.date_key == id.date_key
    }
}

/// The five fields that make a rating unique.
#[derive(Debug, Clone, Copy)]
pub struct RatingIdentity<'a> {
    pub visitor_id: &'a str,
    pub day: &'a str,
    pub meal_type: &'a str,
    pub dish_name: &'a str,
    pub date_key: &'a str,
}

/// Older deployments stored whatever number passed the range check
/// (`7.5`, `"8"`). Round those to the nearest whole score and clamp to 1..=10.
fn stored_score<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u8, D::Error> {
    let raw = Value::deserialize(deserializer)?;
    let parsed = match &raw {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    match parsed {
        Some(f) if f.is_finite() => Ok(f.round().clamp(1.0, 10.0) as u8),
        _ => Err(D::Error::custom(format!("unusable score {raw}"))),
    }
}

/// `ratings.json`
///
/// Entries that cannot be read (e.g. `"score": null`) are skipped with a
/// warning instead of failing the whole record; they are dropped on the
/// next write.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RatingsDoc {
    pub ratings: Vec<Rating>,
}

impl<'de> Deserialize<'de> for RatingsDoc {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        struct Raw {
            #[serde(default)]
            ratings: Vec<Value>,
        }

        let raw = Raw::deserialize(deserializer)?;
        let ratings = raw
            .ratings
            .into_iter()
            .filter_map(|entry| match serde_json::from_value::<Rating>(entry) {
                Ok(r) => Some(r),
                Err(e) => {
                    warn!(target: "store", error = %e, "skipping unreadable rating");
                    None
                }
            })
            .collect();
        Ok(Self { ratings })
    }
}

/// One meal slot of a day with its dishes in display order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MealEntry {
    #[serde(rename = "type")]
    pub meal_type: String,
    #[serde(default)]
    pub dishes: Vec<String>,
}

/// One weekday of the plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayEntry {
    pub day: String,
    #[serde(default)]
    pub meals: Vec<MealEntry>,
}

/// `menu.json`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Menu {
    #[serde(default)]
    pub week_menu: Vec<DayEntry>,
}

/// `config.json`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigRecord {
    pub admin_password: String,
    pub mystery_code: String,
}

impl Default for ConfigRecord {
    fn default() -> Self {
        Self {
            admin_password: DEFAULT_ADMIN_PASSWORD.to_string(),
            mystery_code: DEFAULT_MYSTERY_CODE.to_string(),
        }
    }
}
