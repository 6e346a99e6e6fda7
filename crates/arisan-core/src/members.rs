use chrono::NaiveDate;
use serde::Deserialize;

use crate::error::{invalid, not_found};
use crate::model::{CommunicationPreferences, Group, Member, Payment};
use crate::store::{Collection, Store};
use crate::Result;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewMember {
    pub name: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub communication: CommunicationPreferences,
}

/// Fields to change on an existing member. `None` leaves a field as is; an
/// empty string clears an optional one.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberPatch {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub avatar_url: Option<String>,
    pub communication: Option<CommunicationPreferences>,
}

pub fn list_members(store: &Store) -> Result<Vec<Member>> {
    store.read(Collection::Members)
}

pub fn get_member(store: &Store, id: &str) -> Result<Member> {
    list_members(store)?
        .into_iter()
        .find(|m| m.id == id)
        .ok_or_else(|| not_found("member", id))
}

fn validate_name(name: &str, members: &[Member], except: Option<&str>) -> Result<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(invalid("Nama anggota tidak boleh kosong"));
    }
    let lower = name.to_lowercase();
    if members
        .iter()
        .any(|m| Some(m.id.as_str()) != except && m.name.to_lowercase() == lower)
    {
        return Err(invalid(format!("Anggota bernama '{}' sudah terdaftar", name)));
    }
    Ok(name.to_string())
}

fn validate_email(email: &Option<String>) -> Result<()> {
    match email {
        Some(e) if !e.contains('@') => Err(invalid(format!("Email '{}' tidak valid", e))),
        _ => Ok(()),
    }
}

/// Blank optional text reads as "not set".
fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn validate_time(prefs: &CommunicationPreferences) -> Result<()> {
    if let Some(t) = &prefs.preferred_time {
        if chrono::NaiveTime::parse_from_str(t, "%H:%M").is_err() {
            return Err(invalid(format!("Waktu '{}' harus berformat HH:MM", t)));
        }
    }
    Ok(())
}

pub fn register_member(store: &Store, new: NewMember, today: NaiveDate) -> Result<Member> {
    let mut members = list_members(store)?;
    let name = validate_name(&new.name, &members, None)?;
    let email = non_blank(new.email);
    validate_email(&email)?;
    let mut communication = new.communication;
    communication.preferred_time = non_blank(communication.preferred_time);
    validate_time(&communication)?;

    // Removed members live on in payments and winner history.
    let payments: Vec<Payment> = store.read(Collection::Payments)?;
    let groups: Vec<Group> = store.read(Collection::Groups)?;
    let referenced = members
        .iter()
        .map(|m| m.id.as_str())
        .chain(payments.iter().map(|p| p.member_id.as_str()))
        .chain(
            groups
                .iter()
                .flat_map(|g| g.winner_history.iter().map(|w| w.member_id.as_str())),
        );

    let member = Member {
        id: store.allocate_id("member", referenced)?,
        name,
        phone: non_blank(new.phone),
        email,
        avatar_url: non_blank(new.avatar_url),
        communication,
        joined_at: today,
    };
    members.push(member.clone());
    store.write(Collection::Members, &members)?;
    tracing::info!(member = %member.id, name = %member.name, "registered member");
    Ok(member)
}

pub fn update_member(store: &Store, id: &str, patch: MemberPatch) -> Result<Member> {
    let mut members = list_members(store)?;
    let name = match &patch.name {
        Some(n) => Some(validate_name(n, &members, Some(id))?),
        None => None,
    };
    validate_email(&non_blank(patch.email.clone()))?;
    let communication = patch.communication.map(|mut prefs| {
        prefs.preferred_time = non_blank(prefs.preferred_time);
        prefs
    });
    if let Some(prefs) = &communication {
        validate_time(prefs)?;
    }

    let member = members
        .iter_mut()
        .find(|m| m.id == id)
        .ok_or_else(|| not_found("member", id))?;
    if let Some(n) = name {
        member.name = n;
    }
    if patch.phone.is_some() {
        member.phone = non_blank(patch.phone);
    }
    if patch.email.is_some() {
        member.email = non_blank(patch.email);
    }
    if patch.avatar_url.is_some() {
        member.avatar_url = non_blank(patch.avatar_url);
    }
    if let Some(prefs) = communication {
        member.communication = prefs;
    }
    let updated = member.clone();
    store.write(Collection::Members, &members)?;
    tracing::info!(member = %id, "updated member");
    Ok(updated)
}

/// Remove a member and drop them from every group roster.
///
/// Winner history and payments stay: both are records of what happened.
pub fn remove_member(store: &Store, id: &str) -> Result<Member> {
    let mut members = list_members(store)?;
    let pos = members
        .iter()
        .position(|m| m.id == id)
        .ok_or_else(|| not_found("member", id))?;
    let removed = members.remove(pos);

    let mut groups: Vec<Group> = store.read(Collection::Groups)?;
    for group in &mut groups {
        group.member_ids.retain(|m| m != id);
        if group.current_winner_id.as_deref() == Some(id) {
            group.current_winner_id = None;
        }
    }

    store.write(Collection::Groups, &groups)?;
    store.write(Collection::Members, &members)?;
    tracing::info!(member = %id, "removed member");
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::groups::{add_group_member, create_group, get_group, NewGroup};
    use chrono::TimeZone;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, 1).unwrap()
    }

    fn named(name: &str) -> NewMember {
        NewMember {
            name: name.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn registration_assigns_sequential_ids() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::open(dir.path()).unwrap();
        let a = register_member(&store, named("  Siti "), today()).unwrap();
        let b = register_member(&store, named("Budi"), today()).unwrap();
        assert_eq!(a.id, "member-1");
        assert_eq!(a.name, "Siti");
        assert_eq!(b.id, "member-2");
        assert_eq!(list_members(&store).unwrap().len(), 2);
    }

    #[test]
    fn duplicate_and_blank_names_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::open(dir.path()).unwrap();
        register_member(&store, named("Siti"), today()).unwrap();
        assert!(register_member(&store, named("siti"), today()).is_err());
        assert!(register_member(&store, named("   "), today()).is_err());
    }

    #[test]
    fn bad_email_and_time_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::open(dir.path()).unwrap();
        let mut m = named("Siti");
        m.email = Some("siti.example.com".into());
        assert!(register_member(&store, m, today()).is_err());

        let mut m = named("Siti");
        m.communication.preferred_time = Some("jam 7".into());
        assert!(register_member(&store, m, today()).is_err());
    }

    #[test]
    fn update_keeps_unset_fields() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::open(dir.path()).unwrap();
        let mut m = named("Siti");
        m.phone = Some("0812".into());
        let m = register_member(&store, m, today()).unwrap();

        let patch = MemberPatch {
            name: Some("Siti Aminah".into()),
            ..Default::default()
        };
        let updated = update_member(&store, &m.id, patch).unwrap();
        assert_eq!(updated.name, "Siti Aminah");
        assert_eq!(updated.phone.as_deref(), Some("0812"));
    }

    #[test]
    fn empty_strings_clear_optional_fields() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::open(dir.path()).unwrap();
        let mut m = named("Siti");
        m.phone = Some("0812".into());
        m.email = Some("siti@gmail.com".into());
        m.communication.preferred_time = Some("19:00".into());
        let m = register_member(&store, m, today()).unwrap();

        let patch = MemberPatch {
            phone: Some(String::new()),
            email: Some("  ".into()),
            communication: Some(CommunicationPreferences {
                preferred_time: Some(String::new()),
                ..m.communication.clone()
            }),
            ..Default::default()
        };
        let updated = update_member(&store, &m.id, patch).unwrap();
        assert_eq!(updated.phone, None);
        assert_eq!(updated.email, None);
        assert_eq!(updated.communication.preferred_time, None);
        assert_eq!(get_member(&store, &m.id).unwrap().phone, None);
    }

    #[test]
    fn removed_member_ids_are_not_reused() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::open(dir.path()).unwrap();
        let g = create_group(
            &store,
            NewGroup {
                name: "Arisan Utama".into(),
                contribution_amount: 100_000,
                primary: true,
            },
        )
        .unwrap();
        let siti = register_member(&store, named("Siti"), today()).unwrap();
        add_group_member(&store, &g.id, &siti.id).unwrap();
        let now = chrono::Utc.with_ymd_and_hms(2024, 5, 15, 9, 0, 0).unwrap();
        crate::lottery::set_winner(&store, &g.id, &siti.id, now).unwrap();
        remove_member(&store, &siti.id).unwrap();

        let budi = register_member(&store, named("Budi"), today()).unwrap();
        assert_eq!(budi.id, "member-2");
        add_group_member(&store, &g.id, &budi.id).unwrap();
        let group = get_group(&store, &g.id).unwrap();
        assert_eq!(crate::lottery::eligible_members(&group), vec!["member-2"]);
        assert!(crate::reports::winner_history(&store).unwrap()[0].winners.is_empty());
    }

    #[test]
    fn ids_referenced_only_by_old_records_stay_taken() {
        // Data written before the id counter existed.
        let dir = tempfile::tempdir().unwrap();
        let store = Store::open(dir.path()).unwrap();
        let g = create_group(
            &store,
            NewGroup {
                name: "Arisan Utama".into(),
                contribution_amount: 100_000,
                primary: true,
            },
        )
        .unwrap();
        let mut groups: Vec<Group> = store.read(Collection::Groups).unwrap();
        groups[0].winner_history.push(crate::model::WinnerRecord {
            month: chrono::Utc.with_ymd_and_hms(2023, 12, 15, 9, 0, 0).unwrap(),
            member_id: "member-4".into(),
        });
        store.write(Collection::Groups, &groups).unwrap();
        assert_eq!(groups[0].id, g.id);

        let m = register_member(&store, named("Ani"), today()).unwrap();
        assert_eq!(m.id, "member-5");
    }

    #[test]
    fn renaming_to_own_name_is_allowed() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::open(dir.path()).unwrap();
        let m = register_member(&store, named("Siti"), today()).unwrap();
        let patch = MemberPatch {
            name: Some("SITI".into()),
            ..Default::default()
        };
        assert_eq!(update_member(&store, &m.id, patch).unwrap().name, "SITI");
    }

    #[test]
    fn removal_cleans_group_rosters() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::open(dir.path()).unwrap();
        let m = register_member(&store, named("Siti"), today()).unwrap();
        let g = create_group(
            &store,
            NewGroup {
                name: "Arisan Utama".into(),
                contribution_amount: 100_000,
                primary: true,
            },
        )
        .unwrap();
        add_group_member(&store, &g.id, &m.id).unwrap();

        remove_member(&store, &m.id).unwrap();
        assert!(get_group(&store, &g.id).unwrap().member_ids.is_empty());
        assert!(matches!(
            get_member(&store, &m.id),
            Err(crate::Error::NotFound { .. })
        ));
    }
}
