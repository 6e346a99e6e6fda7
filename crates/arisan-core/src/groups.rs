use serde::Deserialize;

use crate::error::{invalid, not_found};
use crate::members::get_member;
use crate::model::Group;
use crate::store::{Collection, Store};
use crate::{Error, Result};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewGroup {
    pub name: String,
    pub contribution_amount: i64,
    #[serde(default)]
    pub primary: bool,
}

pub fn list_groups(store: &Store) -> Result<Vec<Group>> {
    store.read(Collection::Groups)
}

pub fn get_group(store: &Store, id: &str) -> Result<Group> {
    list_groups(store)?
        .into_iter()
        .find(|g| g.id == id)
        .ok_or_else(|| not_found("group", id))
}

/// The group whose cash contributions fund the cash balance.
pub fn primary_group(store: &Store) -> Result<Option<Group>> {
    Ok(list_groups(store)?.into_iter().find(|g| g.primary))
}

pub fn create_group(store: &Store, new: NewGroup) -> Result<Group> {
    let mut groups = list_groups(store)?;
    let name = new.name.trim();
    if name.is_empty() {
        return Err(invalid("Nama grup tidak boleh kosong"));
    }
    if groups.iter().any(|g| g.name.eq_ignore_ascii_case(name)) {
        return Err(invalid(format!("Grup '{}' sudah ada", name)));
    }
    if new.contribution_amount < 0 {
        return Err(invalid("Jumlah iuran tidak boleh negatif"));
    }

    // The first group is primary until told otherwise.
    let primary = new.primary || !groups.iter().any(|g| g.primary);
    if primary {
        for g in &mut groups {
            g.primary = false;
        }
    }

    let group = Group {
        id: store.allocate_id("group", groups.iter().map(|g| g.id.as_str()))?,
        name: name.to_string(),
        contribution_amount: new.contribution_amount,
        primary,
        member_ids: Vec::new(),
        current_winner_id: None,
        winner_history: Vec::new(),
    };
    groups.push(group.clone());
    store.write(Collection::Groups, &groups)?;
    tracing::info!(group = %group.id, name = %group.name, primary, "created group");
    Ok(group)
}

pub fn set_primary_group(store: &Store, id: &str) -> Result<Group> {
    let mut groups = list_groups(store)?;
    if !groups.iter().any(|g| g.id == id) {
        return Err(not_found("group", id));
    }
    for g in &mut groups {
        g.primary = g.id == id;
    }
    store.write(Collection::Groups, &groups)?;
    get_group(store, id)
}

pub fn add_group_member(store: &Store, group_id: &str, member_id: &str) -> Result<Group> {
    get_member(store, member_id)?;
    let mut groups = list_groups(store)?;
    let group = groups
        .iter_mut()
        .find(|g| g.id == group_id)
        .ok_or_else(|| not_found("group", group_id))?;
    if group.has_member(member_id) {
        return Err(invalid(format!(
            "Anggota '{}' sudah ada di grup '{}'",
            member_id, group.name
        )));
    }
    group.member_ids.push(member_id.to_string());
    let updated = group.clone();
    store.write(Collection::Groups, &groups)?;
    tracing::info!(group = %group_id, member = %member_id, "added group member");
    Ok(updated)
}

pub fn remove_group_member(store: &Store, group_id: &str, member_id: &str) -> Result<Group> {
    let mut groups = list_groups(store)?;
    let group = groups
        .iter_mut()
        .find(|g| g.id == group_id)
        .ok_or_else(|| not_found("group", group_id))?;
    if !group.has_member(member_id) {
        return Err(Error::NotInGroup {
            member_id: member_id.to_string(),
            group_id: group_id.to_string(),
        });
    }
    group.member_ids.retain(|m| m != member_id);
    if group.current_winner_id.as_deref() == Some(member_id) {
        group.current_winner_id = None;
    }
    let updated = group.clone();
    store.write(Collection::Groups, &groups)?;
    tracing::info!(group = %group_id, member = %member_id, "removed group member");
    Ok(updated)
}
