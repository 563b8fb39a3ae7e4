//! # Weighted Aggregator
//!
//! Lifetime per-dish summary of the ratings list. Groups by
//! `(day, mealType, dishName)` in first-seen order.
//!
//! average = Σ(score·weight) / Σ(weight), rounded to one decimal;
//! a mystery vote weighs 3, every other vote 1.

use serde::Serialize;
use std::collections::HashMap;

use crate::admin;
use crate::config::SecretsHandle;
use crate::error::CanteenError;
use crate::model::{Menu, Rating};
use crate::store::RecordStore;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryItem {
    pub day: String,
    pub meal_type: String,
    pub dish_name: String,
    pub weighted_total: u64,
    pub weighted_count: u64,
    pub average_score: f64,
    /// Number of submissions, unweighted.
    pub rating_count: usize,
    pub comments: Vec<SummaryComment>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryComment {
    pub comment: String,
    pub is_mystery: bool,
    pub time: String,
}

/// Best-rated dish of one meal slot.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TopDish {
    pub meal_type: String,
    pub dish_name: String,
    pub average_score: f64,
}

pub fn summarize(ratings: &[Rating]) -> Vec<SummaryItem> {
    let mut index: HashMap<(&str, &str, &str), usize> = HashMap::new();
    let mut items: Vec<SummaryItem> = Vec::new();

    for r in ratings {
        let key = (r.day.as_str(), r.meal_type.as_str(), r.dish_name.as_str());
        let slot = *index.entry(key).or_insert_with(|| {
            items.push(SummaryItem {
                day: r.day.clone(),
                meal_type: r.meal_type.clone(),
                dish_name: r.dish_name.clone(),
                weighted_total: 0,
                weighted_count: 0,
                average_score: 0.0,
                rating_count: 0,
                comments: Vec::new(),
            });
            items.len() - 1
        });

        let item = &mut items[slot];
        let w = u64::from(r.weight());
        item.weighted_total += u64::from(r.score) * w;
        item.weighted_count += w;
        item.rating_count += 1;
        if !r.comment.trim().is_empty() {
            item.comments.push(SummaryComment {
                comment: r.comment.clone(),
                is_mystery: r.is_mystery,
                time: r.timestamp.clone(),
            });
        }
    }

    for item in &mut items {
        item.average_score = weighted_average(item.weighted_total, item.weighted_count);
    }
    items
}

/// `0.0` when nothing was counted.
pub fn weighted_average(total: u64, count: u64) -> f64 {
    if count == 0 {
        return 0.0;
    }
    round1(total as f64 / count as f64)
}

pub fn round1(x: f64) -> f64 {
    (x * 10.0).round() / 10.0
}

/// Among the dishes planned for `day`/`meal_type`, the first one (menu
/// order) holding the highest average above zero. Later dishes with an
/// equal average do not displace it.
pub fn top_dish(
    menu: &Menu,
    summary: &[SummaryItem],
    day: &str,
    meal_type: &str,
) -> Option<TopDish> {
    let meal = menu
        .week_menu
        .iter()
        .find(|d| d.day == day)?
        .meals
        .iter()
        .find(|m| m.meal_type == meal_type)?;

    let mut best: Option<TopDish> = None;
    let mut best_score = 0.0;
    for dish in &meal.dishes {
        let Some(avg) = average_for(summary, day, meal_type, dish) else {
            continue;
        };
        if avg > best_score {
            best_score = avg;
            best = Some(TopDish {
                meal_type: meal_type.to_string(),
                dish_name: dish.clone(),
                average_score: avg,
            });
        }
    }
    best
}

/// Top dish of every meal slot planned for `day`, in menu order.
pub fn top_dishes_for_day(menu: &Menu, summary: &[SummaryItem], day: &str) -> Vec<TopDish> {
    let Some(entry) = menu.week_menu.iter().find(|d| d.day == day) else {
        return Vec::new();
    };
    entry
        .meals
        .iter()
        .filter_map(|m| top_dish(menu, summary, day, &m.meal_type))
        .collect()
}

fn average_for(summary: &[SummaryItem], day: &str, meal_type: &str, dish: &str) -> Option<f64> {
    summary
        .iter()
        .find(|s| s.day == day && s.meal_type == meal_type && s.dish_name == dish)
        .map(|s| s.average_score)
}

/// Admin view of the summary.
pub async fn summary(
    store: &RecordStore,
    secrets: &SecretsHandle,
    admin_secret: &str,
) -> Result<Vec<SummaryItem>, CanteenError> {
    admin::check(secrets, admin_secret)?;
    let ratings = store.ratings().await?;
    Ok(summarize(&ratings))
}
