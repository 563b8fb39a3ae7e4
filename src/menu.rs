//! # Menu Lookup
//!
//! Read, replace and clear the weekly plan, and map a day-of-week index to
//! its entry. Saves replace the whole plan; there is no per-dish update.

use tracing::info;

use crate::admin;
use crate::config::SecretsHandle;
use crate::error::CanteenError;
use crate::model::{DayEntry, MealEntry, Menu, MEAL_SLOTS, WEEKDAY_LABELS};
use crate::store::{Record, RecordStore};

/// 1..=5 map to the weekday labels in order; weekend and out-of-range
/// indices have no label.
pub fn weekday_label(weekday_index: u32) -> Option<&'static str> {
    match weekday_index {
        1..=5 => Some(WEEKDAY_LABELS[(weekday_index - 1) as usize]),
        _ => None,
    }
}

/// The plan entry for a day-of-week index (0 = Sunday). `None` on weekends
/// and when the plan has no entry for that weekday.
pub fn today_entry(menu: &Menu, weekday_index: u32) -> Option<&DayEntry> {
    let label = weekday_label(weekday_index)?;
    menu.week_menu.iter().find(|d| d.day == label)
}

/// Drop blank dish names; order of what remains is kept.
pub fn strip_blank_dishes(mut menu: Menu) -> Menu {
    for day in &mut menu.week_menu {
        for meal in &mut day.meals {
            meal.dishes.retain(|d| !d.trim().is_empty());
        }
    }
    menu
}

/// Starting point for editing an empty plan: every weekday, every meal
/// slot, one empty dish line.
pub fn blank_week() -> Menu {
    Menu {
        week_menu: WEEKDAY_LABELS
            .iter()
            .map(|day| DayEntry {
                day: (*day).to_string(),
                meals: MEAL_SLOTS
                    .iter()
                    .map(|slot| MealEntry {
                        meal_type: (*slot).to_string(),
                        dishes: vec![String::new()],
                    })
                    .collect(),
            })
            .collect(),
    }
}

pub async fn get(store: &RecordStore) -> Result<Menu, CanteenError> {
    Ok(store.menu().await?)
}

/// Replace the plan. Returns what was persisted.
pub async fn save(
    store: &RecordStore,
    secrets: &SecretsHandle,
    admin_secret: &str,
    menu: Menu,
) -> Result<Menu, CanteenError> {
    admin::check(secrets, admin_secret)?;
    let menu = strip_blank_dishes(menu);

    let _guard = store.lock(Record::Menu).await;
    store.write_menu(&menu).await?;
    info!(target: "menu", days = menu.week_menu.len(), "menu saved");
    Ok(menu)
}

pub async fn clear(
    store: &RecordStore,
    secrets: &SecretsHandle,
    admin_secret: &str,
) -> Result<(), CanteenError> {
    admin::check(secrets, admin_secret)?;

    let _guard = store.lock(Record::Menu).await;
    store.write_menu(&Menu::default()).await?;
    info!(target: "menu", "menu cleared");
    Ok(())
}
