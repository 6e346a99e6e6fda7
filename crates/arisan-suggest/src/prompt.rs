use arisan_core::{format_idr, PaymentStatus};

use crate::ReminderRequest;

fn status_str(status: PaymentStatus) -> &'static str {
    match status {
        PaymentStatus::Paid => "paid",
        PaymentStatus::Unpaid => "unpaid",
        PaymentStatus::Late => "late",
    }
}

/// Compact text rendering of a reminder request for LLM consumption.
pub fn serialize_request(req: &ReminderRequest) -> String {
    let mut out = String::with_capacity(512);

    out.push_str("MEMBER: ");
    out.push_str(&req.member_id);
    out.push_str(" \"");
    out.push_str(&req.member_name);
    out.push_str("\" channel=");
    out.push_str(req.communication.channel.as_str());
    if let Some(time) = &req.communication.preferred_time {
        out.push_str(" time=");
        out.push_str(time);
    }
    out.push('\n');

    out.push_str("TODAY: ");
    out.push_str(&req.today.format("%Y-%m-%d").to_string());
    out.push('\n');
    out.push_str("DUE: ");
    out.push_str(&req.due_date.format("%Y-%m-%d").to_string());
    out.push('\n');

    if req.history.is_empty() {
        out.push_str("HISTORY: (none, new member)\n");
        return out;
    }

    let late = req
        .history
        .iter()
        .filter(|h| h.status == PaymentStatus::Late)
        .count();
    let paid_after_due = req
        .history
        .iter()
        .filter(|h| h.paid_at.is_some_and(|at| at.date_naive() > h.due_date))
        .count();
    out.push_str(&format!(
        "HISTORY ({} dues, {} still late, {} paid after due date):\n",
        req.history.len(),
        late,
        paid_after_due
    ));
    for h in &req.history {
        out.push_str("  ");
        out.push_str(&h.due_date.format("%Y-%m-%d").to_string());
        out.push(' ');
        out.push_str(&format_idr(h.amount));
        out.push_str(" paid=");
        out.push_str(&format_idr(h.paid_amount));
        out.push_str(" status=");
        out.push_str(status_str(h.status));
        if let Some(at) = h.paid_at {
            out.push_str(" paid_at=");
            out.push_str(&at.format("%Y-%m-%d").to_string());
        }
        out.push('\n');
    }

    out
}

pub fn system_prompt() -> String {
    format!(
        "You are an assistant that plans payment reminders for members of a family arisan \
(rotating savings group). All output text must be in Bahasa Indonesia.\n\n\
Given one member's payment history, communication preferences and the due date of the \
current cycle, decide when and how often to remind them so they pay on time.\n\n\
Consider:\n\
- How often and how late the member paid before\n\
- The member's preferred channel and time of day\n\
- The days left between today and the due date\n\n\
Do NOT:\n\
- Schedule reminders before today or after the due date\n\
- Use a channel other than the member's preferred one unless the history shows it failed\n\
- Write threatening or shaming messages\n\n\
Output ONLY a JSON object of this shape:\n\
{{\"reminderSchedule\":{{\"reminders\":[{{\"date\":\"YYYY-MM-DD\",\"time\":\"HH:MM\",\
\"channel\":\"whatsapp\",\"message\":\"Pengingat ramah bahwa iuran arisan Anda akan segera jatuh tempo.\"}}]}},\
\"reasoning\":\"<why this schedule should improve on-time payment>\"}}\n\n\
## Arisan Rules\n{}\n\n\
Output ONLY the JSON object, nothing else.",
        arisan_core::rules::RULES
    )
}

pub fn user_message(req: &ReminderRequest) -> String {
    serialize_request(req)
}
