use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

use crate::groups::{list_groups, primary_group};
use crate::model::{Category, Expense, Member, Payment, CASH_ADVANCE_CATEGORY};
use crate::settings::{month_key, parse_month_key};
use crate::store::{Collection, Store};
use crate::Result;

/// Paid cash dues of the primary group minus cash advances.
pub fn cash_balance(store: &Store) -> Result<i64> {
    let Some(primary) = primary_group(store)? else {
        return Ok(0);
    };
    let payments: Vec<Payment> = store.read(Collection::Payments)?;
    let income: i64 = payments
        .iter()
        .filter(|p| p.group_id == primary.id)
        .filter_map(|p| p.contributions.get(&Category::Cash))
        .filter(|c| c.paid)
        .map(|c| c.amount)
        .sum();
    let expenses: Vec<Expense> = store.read(Collection::Expenses)?;
    let spent: i64 = expenses
        .iter()
        .filter(|e| e.category == CASH_ADVANCE_CATEGORY)
        .map(|e| e.amount)
        .sum();
    Ok(income - spent)
}

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CategoryTotals {
    pub collected: i64,
    pub outstanding: i64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyReport {
    pub month: String,
    pub categories: BTreeMap<Category, CategoryTotals>,
    pub collected: i64,
    pub outstanding: i64,
    pub expenses: i64,
    pub net: i64,
    pub paid_count: usize,
    pub payment_count: usize,
}

/// Totals across all groups for payments due and expenses dated in `month`.
pub fn monthly_report(store: &Store, month: &str) -> Result<MonthlyReport> {
    let month = month_key(parse_month_key(month)?);
    let payments: Vec<Payment> = store.read(Collection::Payments)?;
    let expenses: Vec<Expense> = store.read(Collection::Expenses)?;

    let mut categories: BTreeMap<Category, CategoryTotals> = BTreeMap::new();
    let mut paid_count = 0;
    let mut payment_count = 0;
    for p in payments.iter().filter(|p| month_key(p.due_date) == month) {
        payment_count += 1;
        if p.is_paid() {
            paid_count += 1;
        }
        for (cat, c) in &p.contributions {
            let totals = categories.entry(cat.clone()).or_default();
            if c.paid {
                totals.collected += c.amount;
            } else {
                totals.outstanding += c.amount;
            }
        }
    }

    let collected: i64 = categories.values().map(|t| t.collected).sum();
    let outstanding: i64 = categories.values().map(|t| t.outstanding).sum();
    let spent: i64 = expenses
        .iter()
        .filter(|e| month_key(e.date) == month)
        .map(|e| e.amount)
        .sum();

    Ok(MonthlyReport {
        month,
        categories,
        collected,
        outstanding,
        expenses: spent,
        net: collected - spent,
        paid_count,
        payment_count,
    })
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WinnerRow {
    pub member_id: String,
    pub member_name: String,
    pub month: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GroupWinners {
    pub group_id: String,
    pub group_name: String,
    pub winners: Vec<WinnerRow>,
}

/// Winner history per group. Records of members that no longer exist are skipped.
pub fn winner_history(store: &Store) -> Result<Vec<GroupWinners>> {
    let members: Vec<Member> = store.read(Collection::Members)?;
    Ok(list_groups(store)?
        .into_iter()
        .map(|g| GroupWinners {
            winners: g
                .winner_history
                .iter()
                .filter_map(|w| {
                    let m = members.iter().find(|m| m.id == w.member_id)?;
                    Some(WinnerRow {
                        member_id: m.id.clone(),
                        member_name: m.name.clone(),
                        month: w.month,
                    })
                })
                .collect(),
            group_id: g.id,
            group_name: g.name,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expenses::{record_expense, NewExpense};
    use crate::groups::{add_group_member, create_group, NewGroup};
    use crate::lottery::set_winner;
    use crate::members::{register_member, remove_member, NewMember};
    use crate::model::MonthlySettings;
    use crate::payments::{open_cycle, set_contribution_paid, set_payment_paid};
    use crate::settings::save_monthly_settings;
    use chrono::{NaiveDate, TimeZone};

    fn d(m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, m, day).unwrap()
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 12, 10, 0, 0).unwrap()
    }

    fn setup() -> (tempfile::TempDir, Store) {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::open(dir.path()).unwrap();
        create_group(
            &store,
            NewGroup {
                name: "Arisan Utama".into(),
                contribution_amount: 100_000,
                primary: true,
            },
        )
        .unwrap();
        for name in ["Siti", "Budi", "Ani"] {
            let m = register_member(
                &store,
                NewMember {
                    name: name.into(),
                    ..Default::default()
                },
                d(1, 1),
            )
            .unwrap();
            add_group_member(&store, "group-1", &m.id).unwrap();
        }
        save_monthly_settings(
            &store,
            "2024-05",
            MonthlySettings {
                main: 100_000,
                cash: 20_000,
                ..Default::default()
            },
        )
        .unwrap();
        open_cycle(&store, "group-1", d(5, 10)).unwrap();
        (dir, store)
    }

    #[test]
    fn cash_balance_counts_paid_cash_minus_advances() {
        let (_dir, store) = setup();
        assert_eq!(cash_balance(&store).unwrap(), 0);

        set_payment_paid(&store, "payment-1", true, now()).unwrap();
        set_contribution_paid(&store, "payment-2", &Category::Cash, true, now()).unwrap();
        set_contribution_paid(&store, "payment-3", &Category::Main, true, now()).unwrap();
        assert_eq!(cash_balance(&store).unwrap(), 40_000);

        for (category, amount) in [(CASH_ADVANCE_CATEGORY, 15_000), ("Konsumsi", 99_000)] {
            record_expense(
                &store,
                NewExpense {
                    description: "Pengeluaran".into(),
                    category: category.into(),
                    amount,
                    date: d(5, 12),
                },
            )
            .unwrap();
        }
        assert_eq!(cash_balance(&store).unwrap(), 25_000);
    }

    #[test]
    fn no_primary_group_means_zero_balance() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::open(dir.path()).unwrap();
        assert_eq!(cash_balance(&store).unwrap(), 0);
    }

    #[test]
    fn monthly_report_splits_collected_and_outstanding() {
        let (_dir, store) = setup();
        set_payment_paid(&store, "payment-1", true, now()).unwrap();
        set_contribution_paid(&store, "payment-2", &Category::Main, true, now()).unwrap();
        record_expense(
            &store,
            NewExpense {
                description: "Sewa tenda".into(),
                category: "Acara".into(),
                amount: 50_000,
                date: d(5, 20),
            },
        )
        .unwrap();

        let r = monthly_report(&store, "2024-05").unwrap();
        assert_eq!(r.payment_count, 3);
        assert_eq!(r.paid_count, 1);
        assert_eq!(r.categories[&Category::Main].collected, 200_000);
        assert_eq!(r.categories[&Category::Main].outstanding, 100_000);
        assert_eq!(r.categories[&Category::Cash].collected, 20_000);
        assert_eq!(r.collected, 220_000);
        assert_eq!(r.outstanding, 140_000);
        assert_eq!(r.net, 170_000);

        let empty = monthly_report(&store, "2024-06").unwrap();
        assert_eq!(empty.payment_count, 0);
        assert!(empty.categories.is_empty());
    }

    #[test]
    fn winner_history_skips_removed_members() {
        let (_dir, store) = setup();
        set_winner(&store, "group-1", "member-1", now()).unwrap();
        set_winner(&store, "group-1", "member-2", now()).unwrap();
        remove_member(&store, "member-1").unwrap();

        let history = winner_history(&store).unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].group_name, "Arisan Utama");
        let names: Vec<&str> = history[0]
            .winners
            .iter()
            .map(|w| w.member_name.as_str())
            .collect();
        assert_eq!(names, vec!["Budi"]);
    }
}
