pub mod engine;
mod parse;
mod prompt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use arisan_core::payments::{member_payment_history, HistoryEntry};
use arisan_core::{AiSettings, CommunicationPreferences, Store};

#[derive(Error, Debug)]
pub enum SuggestError {
    #[error("AI belum dikonfigurasi")]
    NotConfigured,

    #[error("Penyedia AI '{0}' tidak dikenal")]
    UnknownProvider(String),

    #[error("Gagal membuat jadwal pengingat ({0}). Silakan coba lagi nanti.")]
    Generation(String),

    #[error("Gagal membuat jadwal pengingat: tidak ada jawaban setelah {0} detik.")]
    Timeout(u64),

    #[error("Gagal membaca jadwal pengingat dari jawaban AI. Silakan coba lagi nanti.")]
    Unparseable,

    #[error(transparent)]
    Core(#[from] arisan_core::Error),
}

/// Everything the advisor needs to know about one member's upcoming due.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReminderRequest {
    pub member_id: String,
    pub member_name: String,
    pub communication: CommunicationPreferences,
    pub history: Vec<HistoryEntry>,
    pub due_date: NaiveDate,
    pub today: NaiveDate,
}

impl ReminderRequest {
    pub fn from_store(
        store: &Store,
        member_id: &str,
        due_date: NaiveDate,
        today: NaiveDate,
    ) -> Result<Self, SuggestError> {
        if due_date < today {
            return Err(arisan_core::Error::Validation(format!(
                "Tanggal jatuh tempo {} sudah lewat",
                due_date
            ))
            .into());
        }
        let member = arisan_core::members::get_member(store, member_id)?;
        let history = member_payment_history(store, member_id, today)?;
        Ok(Self {
            member_id: member.id,
            member_name: member.name,
            communication: member.communication,
            history,
            due_date,
            today,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Reminder {
    pub date: NaiveDate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
    pub channel: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ReminderPlan {
    pub reminders: Vec<Reminder>,
    pub reasoning: String,
}

/// Ask the configured LLM for a reminder schedule for one member.
pub async fn suggest_reminders(
    request: &ReminderRequest,
    settings: &AiSettings,
) -> Result<ReminderPlan, SuggestError> {
    if !arisan_core::ai_configured(settings) {
        return Err(SuggestError::NotConfigured);
    }

    let system = prompt::system_prompt();
    let user_msg = prompt::user_message(request);

    tracing::info!(
        provider = %settings.provider,
        model = %settings.model,
        member = %request.member_id,
        "requesting reminder schedule"
    );

    let raw = engine::generate(settings, &system, &user_msg)
        .await
        .inspect_err(|e| tracing::warn!(error = %e, "reminder generation failed"))?;
    tracing::debug!(%raw, "raw LLM output");

    let mut plan = parse::parse_llm_output(&raw, request.communication.channel.as_str())
        .ok_or(SuggestError::Unparseable)?;
    let dropped = keep_within_window(&mut plan, request.today, request.due_date);
    if dropped > 0 {
        tracing::warn!(dropped, "reminders outside today..due date dropped");
    }
    tracing::info!(reminders = plan.reminders.len(), "parsed reminder schedule");
    Ok(plan)
}

/// Drop reminders dated before `today` or after `due_date`. Returns how many went.
fn keep_within_window(plan: &mut ReminderPlan, today: NaiveDate, due_date: NaiveDate) -> usize {
    let before = plan.reminders.len();
    plan.reminders.retain(|r| r.date >= today && r.date <= due_date);
    before - plan.reminders.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use arisan_core::members::{register_member, NewMember};

    fn d(m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, m, day).unwrap()
    }

    #[test]
    fn request_from_store() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::open(dir.path()).unwrap();
        register_member(
            &store,
            NewMember {
                name: "Siti".into(),
                ..Default::default()
            },
            d(1, 1),
        )
        .unwrap();

        let req = ReminderRequest::from_store(&store, "member-1", d(5, 10), d(5, 1)).unwrap();
        assert_eq!(req.member_name, "Siti");
        assert!(req.history.is_empty());

        assert!(ReminderRequest::from_store(&store, "member-1", d(4, 30), d(5, 1)).is_err());
        assert!(matches!(
            ReminderRequest::from_store(&store, "member-9", d(5, 10), d(5, 1)),
            Err(SuggestError::Core(arisan_core::Error::NotFound { .. }))
        ));
    }

    #[test]
    fn reminders_outside_the_window_are_dropped() {
        let reminder = |day| Reminder {
            date: d(5, day),
            time: None,
            channel: "whatsapp".into(),
            message: "Pengingat iuran".into(),
        };
        let mut plan = ReminderPlan {
            reminders: vec![reminder(1), reminder(4), reminder(10), reminder(12)],
            reasoning: "Dua pengingat".into(),
        };
        // today = 2 May, due = 10 May
        let dropped = keep_within_window(&mut plan, d(5, 2), d(5, 10));
        assert_eq!(dropped, 2);
        let days: Vec<_> = plan.reminders.iter().map(|r| r.date).collect();
        assert_eq!(days, vec![d(5, 4), d(5, 10)]);
    }

    #[test]
    fn unconfigured_ai_is_refused() {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()
            .unwrap();
        let req = ReminderRequest {
            member_id: "member-1".into(),
            member_name: "Siti".into(),
            communication: CommunicationPreferences::default(),
            history: vec![],
            due_date: d(5, 10),
            today: d(5, 1),
        };
        let res = rt.block_on(suggest_reminders(&req, &AiSettings::default()));
        assert!(matches!(res, Err(SuggestError::NotConfigured)));
    }
}
