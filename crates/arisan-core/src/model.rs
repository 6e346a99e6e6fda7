use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

// --- Members ---

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default, schemars::JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    #[default]
    Whatsapp,
    Sms,
    Email,
    Call,
}

impl Channel {
    pub fn as_str(self) -> &'static str {
        match self {
            Channel::Whatsapp => "whatsapp",
            Channel::Sms => "sms",
            Channel::Email => "email",
            Channel::Call => "call",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CommunicationPreferences {
    #[serde(default)]
    pub channel: Channel,
    /// Preferred time of day, "HH:MM"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preferred_time: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Member {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub communication: CommunicationPreferences,
    pub joined_at: NaiveDate,
}

// --- Groups ---

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WinnerRecord {
    pub month: DateTime<Utc>,
    pub member_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Group {
    pub id: String,
    pub name: String,
    /// Monthly due per member, in rupiah.
    pub contribution_amount: i64,
    /// Cash contributions of the primary group fund the cash balance.
    #[serde(default)]
    pub primary: bool,
    #[serde(default)]
    pub member_ids: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_winner_id: Option<String>,
    #[serde(default)]
    pub winner_history: Vec<WinnerRecord>,
}

impl Group {
    pub fn has_member(&self, member_id: &str) -> bool {
        self.member_ids.iter().any(|m| m == member_id)
    }

    /// Winners of the rotation in progress, in draw order.
    ///
    /// A rotation closes once every member on the roster has won in it, and
    /// the next draw opens a new one. The history itself is never trimmed.
    pub fn rotation_winners(&self) -> Vec<&str> {
        let mut won: Vec<&str> = Vec::new();
        for record in &self.winner_history {
            if !won.contains(&record.member_id.as_str()) {
                won.push(&record.member_id);
            }
            let closed = !self.member_ids.is_empty()
                && self.member_ids.iter().all(|m| won.contains(&m.as_str()));
            if closed {
                won.clear();
            }
        }
        won
    }

    pub fn has_won(&self, member_id: &str) -> bool {
        self.rotation_winners().contains(&member_id)
    }
}

// --- Payments ---

/// A contribution category. Serialized as its string key so it can key a JSON map.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum Category {
    Main,
    Cash,
    Sick,
    Bereavement,
    Other(String),
}

impl Category {
    pub const FIXED: [Category; 4] = [
        Category::Main,
        Category::Cash,
        Category::Sick,
        Category::Bereavement,
    ];

    pub fn key(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Category::Main => f.write_str("main"),
            Category::Cash => f.write_str("cash"),
            Category::Sick => f.write_str("sick"),
            Category::Bereavement => f.write_str("bereavement"),
            Category::Other(id) => write!(f, "other:{}", id),
        }
    }
}

impl From<Category> for String {
    fn from(c: Category) -> String {
        c.to_string()
    }
}

impl TryFrom<String> for Category {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl std::str::FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "main" => Ok(Category::Main),
            "cash" => Ok(Category::Cash),
            "sick" => Ok(Category::Sick),
            "bereavement" => Ok(Category::Bereavement),
            other => match other.strip_prefix("other:") {
                Some(id) if !id.is_empty() => Ok(Category::Other(id.to_string())),
                _ => Err(format!("unknown contribution category: {s}")),
            },
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Contribution {
    pub amount: i64,
    #[serde(default)]
    pub paid: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paid_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum PaymentStatus {
    Paid,
    Unpaid,
    Late,
}

impl PaymentStatus {
    /// Indonesian label shown to members.
    pub fn label(self) -> &'static str {
        match self {
            PaymentStatus::Paid => "Lunas",
            PaymentStatus::Unpaid => "Belum Lunas",
            PaymentStatus::Late => "Terlambat",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    pub id: String,
    pub group_id: String,
    pub member_id: String,
    pub due_date: NaiveDate,
    #[serde(default)]
    pub contributions: BTreeMap<Category, Contribution>,
}

impl Payment {
    pub fn amount(&self) -> i64 {
        self.contributions.values().map(|c| c.amount).sum()
    }

    pub fn paid_amount(&self) -> i64 {
        self.contributions
            .values()
            .filter(|c| c.paid)
            .map(|c| c.amount)
            .sum()
    }

    pub fn is_paid(&self) -> bool {
        !self.contributions.is_empty() && self.contributions.values().all(|c| c.paid)
    }

    pub fn status(&self, today: NaiveDate) -> PaymentStatus {
        if self.is_paid() {
            PaymentStatus::Paid
        } else if self.due_date < today {
            PaymentStatus::Late
        } else {
            PaymentStatus::Unpaid
        }
    }
}

// --- Expenses ---

/// Expense category drawn from the cash balance.
pub const CASH_ADVANCE_CATEGORY: &str = "Talangan Kas";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Expense {
    pub id: String,
    pub description: String,
    pub category: String,
    pub amount: i64,
    pub date: NaiveDate,
}

// --- Announcements ---

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Announcement {
    pub id: String,
    pub title: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// --- Users ---

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub uid: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default)]
    pub is_admin: bool,
}

// --- Contribution settings ---

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct OtherContribution {
    /// Stable id; blank ids are assigned on save
    #[serde(default)]
    pub id: String,
    pub description: String,
    pub amount: i64,
}

/// Per-member dues for one month, in rupiah.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct MonthlySettings {
    #[serde(default)]
    pub main: i64,
    #[serde(default)]
    pub cash: i64,
    #[serde(default)]
    pub sick: i64,
    #[serde(default)]
    pub bereavement: i64,
    #[serde(default)]
    pub others: Vec<OtherContribution>,
}

impl MonthlySettings {
    pub fn total(&self) -> i64 {
        self.main
            + self.cash
            + self.sick
            + self.bereavement
            + self.others.iter().map(|o| o.amount).sum::<i64>()
    }

    /// Every category with its amount, fixed categories first.
    pub fn amounts(&self) -> Vec<(Category, i64)> {
        let mut out = vec![
            (Category::Main, self.main),
            (Category::Cash, self.cash),
            (Category::Sick, self.sick),
            (Category::Bereavement, self.bereavement),
        ];
        out.extend(
            self.others
                .iter()
                .map(|o| (Category::Other(o.id.clone()), o.amount)),
        );
        out
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CategoryLabels {
    pub main: String,
    pub cash: String,
    pub sick: String,
    pub bereavement: String,
    pub other: String,
}

impl Default for CategoryLabels {
    fn default() -> Self {
        Self {
            main: "Iuran Utama".to_string(),
            cash: "Iuran Kas".to_string(),
            sick: "Iuran Sakit".to_string(),
            bereavement: "Iuran Kemalangan".to_string(),
            other: "Lainnya".to_string(),
        }
    }
}

impl CategoryLabels {
    pub fn label(&self, category: &Category) -> String {
        match category {
            Category::Main => self.main.clone(),
            Category::Cash => self.cash.clone(),
            Category::Sick => self.sick.clone(),
            Category::Bereavement => self.bereavement.clone(),
            Category::Other(id) => format!("{} ({})", self.other, id),
        }
    }
}

/// Format rupiah the Indonesian way: `Rp 1.250.000`.
pub fn format_idr(amount: i64) -> String {
    let digits = amount.unsigned_abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(ch);
    }
    if amount < 0 {
        format!("-Rp {}", grouped)
    } else {
        format!("Rp {}", grouped)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn payment(paid: &[bool]) -> Payment {
        let mut contributions = BTreeMap::new();
        let cats = [Category::Main, Category::Cash, Category::Other("seragam".into())];
        for (cat, p) in cats.into_iter().zip(paid) {
            contributions.insert(
                cat,
                Contribution {
                    amount: 50_000,
                    paid: *p,
                    paid_at: None,
                },
            );
        }
        Payment {
            id: "payment-1".into(),
            group_id: "group-1".into(),
            member_id: "member-1".into(),
            due_date: date(2024, 5, 10),
            contributions,
        }
    }

    #[test]
    fn idr_formatting() {
        assert_eq!(format_idr(0), "Rp 0");
        assert_eq!(format_idr(950), "Rp 950");
        assert_eq!(format_idr(10_000), "Rp 10.000");
        assert_eq!(format_idr(1_250_000), "Rp 1.250.000");
        assert_eq!(format_idr(-20_000), "-Rp 20.000");
    }

    #[test]
    fn status_turns_late_after_due_date() {
        let p = payment(&[true, false]);
        assert_eq!(p.status(date(2024, 5, 10)), PaymentStatus::Unpaid);
        assert_eq!(p.status(date(2024, 5, 11)), PaymentStatus::Late);

        let p = payment(&[true, true]);
        assert_eq!(p.status(date(2024, 6, 1)), PaymentStatus::Paid);
    }

    #[test]
    fn payment_without_contributions_is_not_paid() {
        let p = payment(&[]);
        assert!(!p.is_paid());
        assert_eq!(p.amount(), 0);
    }

    #[test]
    fn categories_key_json_maps() {
        let p = payment(&[true, false, true]);
        let json = serde_json::to_value(&p).unwrap();
        let mut keys: Vec<&String> = json["contributions"].as_object().unwrap().keys().collect();
        keys.sort();
        assert_eq!(keys, vec!["cash", "main", "other:seragam"]);

        let back: Payment = serde_json::from_value(json).unwrap();
        assert_eq!(back, p);
        assert_eq!(back.paid_amount(), 100_000);
    }

    #[test]
    fn unknown_category_is_rejected() {
        assert!("arisan".parse::<Category>().is_err());
        assert!("other:".parse::<Category>().is_err());
        assert_eq!(
            "other:baju".parse::<Category>().unwrap(),
            Category::Other("baju".into())
        );
    }

    #[test]
    fn monthly_total_includes_others() {
        let s = MonthlySettings {
            main: 100_000,
            cash: 20_000,
            sick: 5_000,
            bereavement: 5_000,
            others: vec![OtherContribution {
                id: "other-1".into(),
                description: "Baju seragam".into(),
                amount: 75_000,
            }],
        };
        assert_eq!(s.total(), 205_000);
        assert_eq!(s.amounts().len(), 5);
    }
}
