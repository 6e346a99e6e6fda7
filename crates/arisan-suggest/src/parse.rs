use chrono::{NaiveDate, NaiveTime};
use serde_json::Value;

use crate::{Reminder, ReminderPlan};

#[derive(serde::Deserialize)]
struct LlmReminder {
    date: String,
    #[serde(default)]
    time: Option<String>,
    #[serde(default)]
    channel: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

/// Parse raw LLM output into a reminder plan.
///
/// Accepts `reminderSchedule` either as an object or as a JSON-encoded string.
/// Falls back to salvaging individual reminder objects when the JSON as a
/// whole is malformed. Returns `None` when nothing usable is found.
pub fn parse_llm_output(raw: &str, default_channel: &str) -> Option<ReminderPlan> {
    let json_str = extract_json_object(raw)?;

    let (llm_reminders, reasoning) = match serde_json::from_str::<Value>(json_str) {
        Ok(root) => from_value(&root),
        Err(_) => salvage(json_str),
    };

    let mut reminders: Vec<Reminder> = llm_reminders
        .into_iter()
        .filter_map(|lr| to_reminder(lr, default_channel))
        .collect();
    reminders.sort_by(|a, b| (a.date, &a.time).cmp(&(b.date, &b.time)));

    if reminders.is_empty() && reasoning.is_empty() {
        return None;
    }
    Some(ReminderPlan {
        reminders,
        reasoning,
    })
}

/// Extract the outermost JSON object substring from raw LLM output.
fn extract_json_object(raw: &str) -> Option<&str> {
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    if end <= start {
        return None;
    }
    Some(&raw[start..=end])
}

fn from_value(root: &Value) -> (Vec<LlmReminder>, String) {
    let reasoning = root
        .get("reasoning")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .trim()
        .to_string();

    let schedule = match root.get("reminderSchedule") {
        // The schedule sometimes arrives as a JSON document inside a string.
        Some(Value::String(s)) => match extract_json_object(s).or_else(|| extract_json_array(s)) {
            Some(inner) => serde_json::from_str::<Value>(inner).unwrap_or(Value::Null),
            None => Value::Null,
        },
        Some(v) => v.clone(),
        None => root.clone(),
    };

    let items = match &schedule {
        Value::Array(items) => items.clone(),
        Value::Object(_) => schedule
            .get("reminders")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default(),
        _ => Vec::new(),
    };

    let reminders = items
        .into_iter()
        .filter_map(|item| serde_json::from_value::<LlmReminder>(item).ok())
        .collect();
    (reminders, reasoning)
}

fn extract_json_array(raw: &str) -> Option<&str> {
    let start = raw.find('[')?;
    let end = raw.rfind(']')?;
    if end <= start {
        return None;
    }
    Some(&raw[start..=end])
}

/// Pull reminder objects and the reasoning string out of malformed JSON
/// (trailing commas, unescaped newlines and the like).
fn salvage(json_str: &str) -> (Vec<LlmReminder>, String) {
    let reminders = match json_str.find("\"reminders\"") {
        Some(pos) => balanced_objects(&json_str[pos..])
            .into_iter()
            .filter_map(|obj| serde_json::from_str::<LlmReminder>(&strip_trailing_commas(obj)).ok())
            .collect(),
        None => Vec::new(),
    };

    let reasoning = json_str
        .find("\"reasoning\"")
        .and_then(|pos| {
            let rest = &json_str[pos + "\"reasoning\"".len()..];
            let rest = rest.trim_start().strip_prefix(':')?.trim_start();
            serde_json::Deserializer::from_str(rest)
                .into_iter::<String>()
                .next()?
                .ok()
        })
        .unwrap_or_default();

    (reminders, reasoning.trim().to_string())
}

/// Top-level `{...}` spans inside the first array of `s`, ignoring braces in strings.
fn balanced_objects(s: &str) -> Vec<&str> {
    let Some(open) = s.find('[') else {
        return Vec::new();
    };
    let body = &s[open + 1..];

    let mut out = Vec::new();
    let mut depth = 0usize;
    let mut start = None;
    let mut in_string = false;
    let mut escaped = false;

    for (i, ch) in body.char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => {
                if depth == 0 {
                    start = Some(i);
                }
                depth += 1;
            }
            '}' if depth > 0 => {
                depth -= 1;
                if depth == 0 {
                    if let Some(st) = start.take() {
                        out.push(&body[st..=i]);
                    }
                }
            }
            ']' if depth == 0 => break,
            _ => {}
        }
    }
    out
}

fn strip_trailing_commas(obj: &str) -> String {
    let mut out = String::with_capacity(obj.len());
    let chars: Vec<char> = obj.chars().collect();
    let mut in_string = false;
    let mut escaped = false;
    for (i, &ch) in chars.iter().enumerate() {
        if in_string {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            out.push(ch);
            continue;
        }
        if ch == '"' {
            in_string = true;
        }
        if ch == ',' {
            let next = chars[i + 1..].iter().find(|c| !c.is_whitespace());
            if matches!(next, Some('}') | Some(']')) {
                continue;
            }
        }
        out.push(ch);
    }
    out
}

fn to_reminder(lr: LlmReminder, default_channel: &str) -> Option<Reminder> {
    let date = NaiveDate::parse_from_str(lr.date.trim(), "%Y-%m-%d").ok()?;
    let time = lr
        .time
        .as_deref()
        .map(str::trim)
        .filter(|t| NaiveTime::parse_from_str(t, "%H:%M").is_ok())
        .map(str::to_string);
    let channel = lr
        .channel
        .map(|c| c.trim().to_lowercase())
        .filter(|c| !c.is_empty())
        .unwrap_or_else(|| default_channel.to_string());
    Some(Reminder {
        date,
        time,
        channel,
        message: lr.message.unwrap_or_default().trim().to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn object_schedule() {
        let raw = r#"Berikut jadwalnya:
{"reminderSchedule":{"reminders":[
  {"date":"2024-05-08","time":"19:00","channel":"WhatsApp","message":"Iuran jatuh tempo 10 Mei."},
  {"date":"2024-05-03","time":"19:00","channel":"whatsapp","message":"Pengingat awal."}
]},"reasoning":"Budi sering terlambat."}"#;
        let plan = parse_llm_output(raw, "sms").unwrap();
        assert_eq!(plan.reminders.len(), 2);
        assert_eq!(plan.reminders[0].date.to_string(), "2024-05-03");
        assert_eq!(plan.reminders[1].channel, "whatsapp");
        assert_eq!(plan.reasoning, "Budi sering terlambat.");
    }

    #[test]
    fn string_encoded_schedule() {
        let raw = r#"{"reminderSchedule":"{\"reminders\":[{\"date\":\"2024-05-09\",\"time\":\"08:00\",\"channel\":\"sms\",\"message\":\"Besok jatuh tempo\"}]}","reasoning":"Satu pengingat cukup."}"#;
        let plan = parse_llm_output(raw, "whatsapp").unwrap();
        assert_eq!(plan.reminders.len(), 1);
        assert_eq!(plan.reminders[0].time.as_deref(), Some("08:00"));
    }

    #[test]
    fn trailing_commas_are_salvaged() {
        // Same trailing-comma style models copy from example schedules.
        let raw = r#"{
  "reminderSchedule": {
    "reminders": [
      {"date": "2024-05-05", "time": "HH:MM", "message": "Jangan lupa {iuran} ya",},
      {"date": "bulan depan", "channel": "sms", "message": "x",},
    ],
  },
  "reasoning": "Anggota ini biasanya membayar tepat waktu.",
}"#;
        let plan = parse_llm_output(raw, "whatsapp").unwrap();
        assert_eq!(plan.reminders.len(), 1);
        let r = &plan.reminders[0];
        assert_eq!(r.channel, "whatsapp");
        assert_eq!(r.time, None);
        assert_eq!(r.message, "Jangan lupa {iuran} ya");
        assert_eq!(plan.reasoning, "Anggota ini biasanya membayar tepat waktu.");
    }

    #[test]
    fn bare_array_schedule() {
        let raw = r#"{"reminderSchedule":[{"date":"2024-05-09","message":"Halo"}],"reasoning":""}"#;
        let plan = parse_llm_output(raw, "call").unwrap();
        assert_eq!(plan.reminders[0].channel, "call");
    }

    #[test]
    fn nothing_usable() {
        assert!(parse_llm_output("Maaf, saya tidak bisa membantu.", "sms").is_none());
        assert!(parse_llm_output(r#"{"foo": 1}"#, "sms").is_none());
    }
}
