use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

use crate::error::invalid;
use crate::model::{CategoryLabels, MonthlySettings};
use crate::store::{next_id, Collection, Store};
use crate::Result;

/// Stored shape of the contribution settings collection.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct SettingsBook {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    labels: Option<CategoryLabels>,
    #[serde(default)]
    months: BTreeMap<String, MonthlySettings>,
}

/// Where resolved settings came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase", tag = "kind", content = "month")]
pub enum SettingsSource {
    Exact,
    PreviousMonth(String),
    Default,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedSettings {
    pub month: String,
    pub settings: MonthlySettings,
    pub source: SettingsSource,
}

pub fn month_key(date: NaiveDate) -> String {
    format!("{:04}-{:02}", date.year(), date.month())
}

/// Parse a `YYYY-MM` key into the first day of that month.
pub fn parse_month_key(key: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(&format!("{}-01", key.trim()), "%Y-%m-%d")
        .map_err(|_| invalid(format!("Bulan '{}' harus berformat YYYY-MM", key)))
}

pub fn previous_month_key(key: &str) -> Result<String> {
    let first = parse_month_key(key)?;
    let prev = first
        .pred_opt()
        .ok_or_else(|| invalid(format!("Bulan '{}' di luar jangkauan", key)))?;
    Ok(month_key(prev))
}

/// Settings for `month`, falling back to the previous month, then to zeros.
pub fn monthly_settings(store: &Store, month: &str) -> Result<ResolvedSettings> {
    let month = month_key(parse_month_key(month)?);
    let book: SettingsBook = store.read(Collection::ContributionSettings)?;

    if let Some(s) = book.months.get(&month) {
        return Ok(ResolvedSettings {
            month,
            settings: s.clone(),
            source: SettingsSource::Exact,
        });
    }
    let prev = previous_month_key(&month)?;
    if let Some(s) = book.months.get(&prev) {
        tracing::debug!(%month, %prev, "using previous month's settings");
        return Ok(ResolvedSettings {
            month,
            settings: s.clone(),
            source: SettingsSource::PreviousMonth(prev),
        });
    }
    Ok(ResolvedSettings {
        month,
        settings: MonthlySettings::default(),
        source: SettingsSource::Default,
    })
}

pub fn save_monthly_settings(
    store: &Store,
    month: &str,
    mut settings: MonthlySettings,
) -> Result<MonthlySettings> {
    let month = month_key(parse_month_key(month)?);
    let fixed = [
        ("main", settings.main),
        ("cash", settings.cash),
        ("sick", settings.sick),
        ("bereavement", settings.bereavement),
    ];
    if let Some((name, _)) = fixed.iter().find(|(_, amount)| *amount < 0) {
        return Err(invalid(format!("Iuran '{}' tidak boleh negatif", name)));
    }

    let mut seen = HashSet::new();
    for i in 0..settings.others.len() {
        let other = &settings.others[i];
        if other.description.trim().is_empty() {
            return Err(invalid("Deskripsi iuran lainnya tidak boleh kosong"));
        }
        if other.amount < 0 {
            return Err(invalid(format!(
                "Iuran '{}' tidak boleh negatif",
                other.description
            )));
        }
        if other.id.trim().is_empty() {
            let id = next_id("other", settings.others.iter().map(|o| o.id.as_str()));
            settings.others[i].id = id;
        }
        let other = &mut settings.others[i];
        other.description = other.description.trim().to_string();
        if !seen.insert(other.id.clone()) {
            return Err(invalid(format!("Id iuran '{}' ganda", other.id)));
        }
    }

    let mut book: SettingsBook = store.read(Collection::ContributionSettings)?;
    book.months.insert(month.clone(), settings.clone());
    store.write(Collection::ContributionSettings, &book)?;
    tracing::info!(%month, total = settings.total(), "saved contribution settings");
    Ok(settings)
}

/// Category labels. Defaults are written on first read.
pub fn labels(store: &Store) -> Result<CategoryLabels> {
    let mut book: SettingsBook = store.read(Collection::ContributionSettings)?;
    match &book.labels {
        Some(l) => Ok(l.clone()),
        None => {
            let l = CategoryLabels::default();
            book.labels = Some(l.clone());
            store.write(Collection::ContributionSettings, &book)?;
            Ok(l)
        }
    }
}

pub fn save_labels(store: &Store, labels: CategoryLabels) -> Result<CategoryLabels> {
    let trimmed = CategoryLabels {
        main: labels.main.trim().to_string(),
        cash: labels.cash.trim().to_string(),
        sick: labels.sick.trim().to_string(),
        bereavement: labels.bereavement.trim().to_string(),
        other: labels.other.trim().to_string(),
    };
    for label in [
        &trimmed.main,
        &trimmed.cash,
        &trimmed.sick,
        &trimmed.bereavement,
        &trimmed.other,
    ] {
        if label.is_empty() {
            return Err(invalid("Label tidak boleh kosong"));
        }
    }
    let mut book: SettingsBook = store.read(Collection::ContributionSettings)?;
    book.labels = Some(trimmed.clone());
    store.write(Collection::ContributionSettings, &book)?;
    tracing::info!("saved category labels");
    Ok(trimmed)
}
