use chrono::{DateTime, Utc};

use crate::error::{invalid, not_found};
use crate::model::Announcement;
use crate::store::{Collection, Store};
use crate::Result;

fn validate(title: &str, content: &str) -> Result<(String, String)> {
    let (title, content) = (title.trim(), content.trim());
    if title.is_empty() || content.is_empty() {
        return Err(invalid("Judul dan isi pengumuman harus diisi"));
    }
    Ok((title.to_string(), content.to_string()))
}

/// Announcements, most recently updated first.
pub fn list_announcements(store: &Store) -> Result<Vec<Announcement>> {
    let mut list: Vec<Announcement> = store.read(Collection::Announcements)?;
    list.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
    Ok(list)
}

pub fn create_announcement(
    store: &Store,
    title: &str,
    content: &str,
    now: DateTime<Utc>,
) -> Result<Announcement> {
    let (title, content) = validate(title, content)?;
    let mut list: Vec<Announcement> = store.read(Collection::Announcements)?;
    let announcement = Announcement {
        id: store.allocate_id("announcement", list.iter().map(|a| a.id.as_str()))?,
        title,
        content,
        created_at: now,
        updated_at: now,
    };
    list.push(announcement.clone());
    store.write(Collection::Announcements, &list)?;
    tracing::info!(announcement = %announcement.id, "created announcement");
    Ok(announcement)
}

pub fn update_announcement(
    store: &Store,
    id: &str,
    title: &str,
    content: &str,
    now: DateTime<Utc>,
) -> Result<Announcement> {
    let (title, content) = validate(title, content)?;
    let mut list: Vec<Announcement> = store.read(Collection::Announcements)?;
    let a = list
        .iter_mut()
        .find(|a| a.id == id)
        .ok_or_else(|| not_found("announcement", id))?;
    a.title = title;
    a.content = content;
    a.updated_at = now;
    let updated = a.clone();
    store.write(Collection::Announcements, &list)?;
    tracing::info!(announcement = %id, "updated announcement");
    Ok(updated)
}

pub fn delete_announcement(store: &Store, id: &str) -> Result<()> {
    let mut list: Vec<Announcement> = store.read(Collection::Announcements)?;
    let before = list.len();
    list.retain(|a| a.id != id);
    if list.len() == before {
        return Err(not_found("announcement", id));
    }
    store.write(Collection::Announcements, &list)?;
    tracing::info!(announcement = %id, "deleted announcement");
    Ok(())
}

/// Single-line ticker text: `title: content` joined by ` *** `.
pub fn marquee_text(list: &[Announcement]) -> String {
    list.iter()
        .map(|a| format!("{}: {}", a.title, a.content))
        .collect::<Vec<_>>()
        .join(" *** ")
}
