use chrono::NaiveDate;
use serde::Deserialize;

use crate::error::{invalid, not_found};
use crate::model::Expense;
use crate::store::{Collection, Store};
use crate::Result;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewExpense {
    pub description: String,
    pub category: String,
    pub amount: i64,
    pub date: NaiveDate,
}

/// Expenses, newest first.
pub fn list_expenses(store: &Store) -> Result<Vec<Expense>> {
    let mut expenses: Vec<Expense> = store.read(Collection::Expenses)?;
    expenses.sort_by(|a, b| b.date.cmp(&a.date));
    Ok(expenses)
}

pub fn record_expense(store: &Store, new: NewExpense) -> Result<Expense> {
    let description = new.description.trim();
    if description.is_empty() {
        return Err(invalid("Keterangan pengeluaran tidak boleh kosong"));
    }
    if new.amount <= 0 {
        return Err(invalid("Jumlah pengeluaran harus lebih dari nol"));
    }
    let category = new.category.trim();
    if category.is_empty() {
        return Err(invalid("Kategori pengeluaran tidak boleh kosong"));
    }

    let mut expenses: Vec<Expense> = store.read(Collection::Expenses)?;
    let expense = Expense {
        id: store.allocate_id("expense", expenses.iter().map(|e| e.id.as_str()))?,
        description: description.to_string(),
        category: category.to_string(),
        amount: new.amount,
        date: new.date,
    };
    expenses.push(expense.clone());
    store.write(Collection::Expenses, &expenses)?;
    tracing::info!(expense = %expense.id, amount = expense.amount, "recorded expense");
    Ok(expense)
}

pub fn delete_expense(store: &Store, id: &str) -> Result<Expense> {
    let mut expenses: Vec<Expense> = store.read(Collection::Expenses)?;
    let pos = expenses
        .iter()
        .position(|e| e.id == id)
        .ok_or_else(|| not_found("expense", id))?;
    let removed = expenses.remove(pos);
    store.write(Collection::Expenses, &expenses)?;
    tracing::info!(expense = %id, "deleted expense");
    Ok(removed)
}
