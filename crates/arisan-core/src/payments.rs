use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

use crate::error::{invalid, not_found};
use crate::groups::get_group;
use crate::model::{Category, Contribution, Member, Payment, PaymentStatus};
use crate::settings::{month_key, monthly_settings};
use crate::store::{Collection, Store};
use crate::Result;

/// One row of the payment checklist for a group.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRow {
    pub payment_id: String,
    pub member_id: String,
    pub member_name: String,
    pub due_date: NaiveDate,
    pub amount: i64,
    pub paid_amount: i64,
    pub status: PaymentStatus,
}

/// A past due of one member, as fed to the reminder advisor.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub group_id: String,
    pub due_date: NaiveDate,
    pub amount: i64,
    pub paid_amount: i64,
    pub status: PaymentStatus,
    /// Latest time any category was marked paid
    #[serde(skip_serializing_if = "Option::is_none")]
    pub paid_at: Option<DateTime<Utc>>,
}

pub fn list_payments(store: &Store) -> Result<Vec<Payment>> {
    store.read(Collection::Payments)
}

/// Create this month's payments for every group member that has none yet.
///
/// The primary group carries every category from the month's settings; other
/// groups carry only their flat contribution as `main`.
pub fn open_cycle(store: &Store, group_id: &str, due_date: NaiveDate) -> Result<Vec<Payment>> {
    let group = get_group(store, group_id)?;
    let month = month_key(due_date);

    let contributions: BTreeMap<Category, Contribution> = if group.primary {
        let resolved = monthly_settings(store, &month)?;
        resolved
            .settings
            .amounts()
            .into_iter()
            .filter(|(_, amount)| *amount > 0)
            .map(|(cat, amount)| {
                (
                    cat,
                    Contribution {
                        amount,
                        paid: false,
                        paid_at: None,
                    },
                )
            })
            .collect()
    } else {
        BTreeMap::from([(
            Category::Main,
            Contribution {
                amount: group.contribution_amount,
                paid: false,
                paid_at: None,
            },
        )])
    };
    if contributions.is_empty() {
        return Err(invalid(format!(
            "Belum ada ketetapan iuran untuk bulan {}",
            month
        )));
    }

    let mut payments = list_payments(store)?;
    let mut created = Vec::new();
    for member_id in &group.member_ids {
        let exists = payments.iter().any(|p| {
            p.group_id == group.id && &p.member_id == member_id && month_key(p.due_date) == month
        });
        if exists {
            continue;
        }
        let payment = Payment {
            id: store.allocate_id("payment", payments.iter().map(|p| p.id.as_str()))?,
            group_id: group.id.clone(),
            member_id: member_id.clone(),
            due_date,
            contributions: contributions.clone(),
        };
        payments.push(payment.clone());
        created.push(payment);
    }

    if !created.is_empty() {
        store.write(Collection::Payments, &payments)?;
    }
    tracing::info!(group = %group_id, %month, created = created.len(), "opened payment cycle");
    Ok(created)
}

fn update_payment(
    store: &Store,
    payment_id: &str,
    f: impl FnOnce(&mut Payment) -> Result<()>,
) -> Result<Payment> {
    let mut payments = list_payments(store)?;
    let payment = payments
        .iter_mut()
        .find(|p| p.id == payment_id)
        .ok_or_else(|| not_found("payment", payment_id))?;
    f(payment)?;
    let updated = payment.clone();
    store.write(Collection::Payments, &payments)?;
    Ok(updated)
}

fn mark(c: &mut Contribution, paid: bool, now: DateTime<Utc>) {
    if c.paid != paid {
        c.paid = paid;
        c.paid_at = paid.then_some(now);
    }
}

pub fn set_contribution_paid(
    store: &Store,
    payment_id: &str,
    category: &Category,
    paid: bool,
    now: DateTime<Utc>,
) -> Result<Payment> {
    let payment = update_payment(store, payment_id, |p| {
        let c = p.contributions.get_mut(category).ok_or_else(|| {
            invalid(format!(
                "Pembayaran '{}' tidak memiliki iuran '{}'",
                payment_id, category
            ))
        })?;
        mark(c, paid, now);
        Ok(())
    })?;
    tracing::info!(payment = %payment_id, %category, paid, "contribution updated");
    Ok(payment)
}

/// Tick or untick every category of a payment at once.
pub fn set_payment_paid(
    store: &Store,
    payment_id: &str,
    paid: bool,
    now: DateTime<Utc>,
) -> Result<Payment> {
    let payment = update_payment(store, payment_id, |p| {
        for c in p.contributions.values_mut() {
            mark(c, paid, now);
        }
        Ok(())
    })?;
    tracing::info!(payment = %payment_id, paid, "payment updated");
    Ok(payment)
}

fn member_name(members: &[Member], id: &str) -> String {
    members
        .iter()
        .find(|m| m.id == id)
        .map(|m| m.name.clone())
        .unwrap_or_else(|| "Anggota".to_string())
}

/// Payment checklist for a group, sorted by due date then member name.
pub fn payment_overview(store: &Store, group_id: &str, today: NaiveDate) -> Result<Vec<PaymentRow>> {
    get_group(store, group_id)?;
    let members: Vec<Member> = store.read(Collection::Members)?;
    let mut rows: Vec<PaymentRow> = list_payments(store)?
        .into_iter()
        .filter(|p| p.group_id == group_id)
        .map(|p| PaymentRow {
            member_name: member_name(&members, &p.member_id),
            amount: p.amount(),
            paid_amount: p.paid_amount(),
            status: p.status(today),
            due_date: p.due_date,
            member_id: p.member_id,
            payment_id: p.id,
        })
        .collect();
    rows.sort_by(|a, b| {
        a.due_date
            .cmp(&b.due_date)
            .then_with(|| a.member_name.cmp(&b.member_name))
    });
    Ok(rows)
}

/// Every due of a member across groups, oldest first.
pub fn member_payment_history(
    store: &Store,
    member_id: &str,
    today: NaiveDate,
) -> Result<Vec<HistoryEntry>> {
    let mut entries: Vec<HistoryEntry> = list_payments(store)?
        .into_iter()
        .filter(|p| p.member_id == member_id)
        .map(|p| HistoryEntry {
            paid_at: p.contributions.values().filter_map(|c| c.paid_at).max(),
            group_id: p.group_id.clone(),
            due_date: p.due_date,
            amount: p.amount(),
            paid_amount: p.paid_amount(),
            status: p.status(today),
        })
        .collect();
    entries.sort_by_key(|e| e.due_date);
    Ok(entries)
}
