//! Winner selection for a group's draw.
//!
//! Every member of a group wins exactly once per rotation. When the last
//! member has won, the next draw starts a new rotation with everyone eligible.
//! Winners are appended to the group's history and never removed from it;
//! clearing only resets the current winner shown for the period.

use chrono::{DateTime, Utc};
use rand::seq::SliceRandom;
use rand::Rng;

use crate::error::not_found;
use crate::model::{Group, WinnerRecord};
use crate::store::{Collection, Store};
use crate::{Error, Result};

/// Group members who have not won in the current rotation, in roster order.
pub fn eligible_members(group: &Group) -> Vec<String> {
    group
        .member_ids
        .iter()
        .filter(|m| !group.has_won(m))
        .cloned()
        .collect()
}

/// The last draw closed a rotation: everyone on the roster has had a turn.
pub fn cycle_complete(group: &Group) -> bool {
    !group.member_ids.is_empty()
        && !group.winner_history.is_empty()
        && group.rotation_winners().is_empty()
}

fn with_group<T>(
    store: &Store,
    group_id: &str,
    f: impl FnOnce(&mut Group) -> Result<T>,
) -> Result<T> {
    let mut groups: Vec<Group> = store.read(Collection::Groups)?;
    let group = groups
        .iter_mut()
        .find(|g| g.id == group_id)
        .ok_or_else(|| not_found("group", group_id))?;
    let out = f(group)?;
    store.write(Collection::Groups, &groups)?;
    Ok(out)
}

/// Make `member_id` the current winner and append it to the history.
pub fn set_winner(
    store: &Store,
    group_id: &str,
    member_id: &str,
    now: DateTime<Utc>,
) -> Result<Group> {
    let group = with_group(store, group_id, |group| {
        if !group.has_member(member_id) {
            return Err(Error::NotInGroup {
                member_id: member_id.to_string(),
                group_id: group_id.to_string(),
            });
        }
        if group.has_won(member_id) {
            return Err(Error::AlreadyWon {
                member_id: member_id.to_string(),
                group_id: group_id.to_string(),
            });
        }
        group.current_winner_id = Some(member_id.to_string());
        group.winner_history.push(WinnerRecord {
            month: now,
            member_id: member_id.to_string(),
        });
        Ok(group.clone())
    })?;
    tracing::info!(group = %group_id, member = %member_id, "winner set");
    Ok(group)
}

pub fn clear_winner(store: &Store, group_id: &str) -> Result<Group> {
    let group = with_group(store, group_id, |group| {
        group.current_winner_id = None;
        Ok(group.clone())
    })?;
    tracing::info!(group = %group_id, "winner cleared");
    Ok(group)
}

/// Draw a winner uniformly from the members who have not won in this rotation.
pub fn draw_winner<R: Rng + ?Sized>(
    store: &Store,
    group_id: &str,
    rng: &mut R,
    now: DateTime<Utc>,
) -> Result<Group> {
    let group = crate::groups::get_group(store, group_id)?;
    let eligible = eligible_members(&group);
    let winner = eligible
        .choose(rng)
        .ok_or_else(|| Error::NoEligibleMembers(group_id.to_string()))?;
    tracing::debug!(group = %group_id, pool = eligible.len(), "drawing winner");
    set_winner(store, group_id, winner, now)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::groups::{add_group_member, create_group, get_group, NewGroup};
    use crate::members::{register_member, NewMember};
    use chrono::{NaiveDate, TimeZone};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn setup(names: &[&str]) -> (tempfile::TempDir, Store, String) {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::open(dir.path()).unwrap();
        let today = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let g = create_group(
            &store,
            NewGroup {
                name: "Arisan Uang Kaget Rp. 20.000".into(),
                contribution_amount: 20_000,
                primary: false,
            },
        )
        .unwrap();
        for name in names {
            let m = register_member(
                &store,
                NewMember {
                    name: name.to_string(),
                    ..Default::default()
                },
                today,
            )
            .unwrap();
            add_group_member(&store, &g.id, &m.id).unwrap();
        }
        (dir, store, g.id)
    }

    fn at(month: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, month, 15, 9, 0, 0).unwrap()
    }

    #[test]
    fn winner_is_recorded_once() {
        let (_dir, store, gid) = setup(&["Siti", "Budi"]);
        let g = set_winner(&store, &gid, "member-1", at(1)).unwrap();
        assert_eq!(g.current_winner_id.as_deref(), Some("member-1"));
        assert_eq!(g.winner_history.len(), 1);

        assert!(matches!(
            set_winner(&store, &gid, "member-1", at(2)),
            Err(Error::AlreadyWon { .. })
        ));
        assert_eq!(eligible_members(&get_group(&store, &gid).unwrap()), vec!["member-2"]);
    }

    #[test]
    fn outsiders_cannot_win() {
        let (_dir, store, gid) = setup(&["Siti"]);
        assert!(matches!(
            set_winner(&store, &gid, "member-7", at(1)),
            Err(Error::NotInGroup { .. })
        ));
    }

    #[test]
    fn clearing_keeps_history() {
        let (_dir, store, gid) = setup(&["Siti", "Budi"]);
        set_winner(&store, &gid, "member-2", at(3)).unwrap();
        let g = clear_winner(&store, &gid).unwrap();
        assert!(g.current_winner_id.is_none());
        assert_eq!(g.winner_history[0].member_id, "member-2");
        assert_eq!(g.winner_history[0].month, at(3));
    }

    #[test]
    fn draws_run_in_rotations() {
        let (_dir, store, gid) = setup(&["Siti", "Budi", "Ani"]);
        let mut rng = StdRng::seed_from_u64(7);
        for month in 1..=3 {
            draw_winner(&store, &gid, &mut rng, at(month)).unwrap();
        }
        let g = get_group(&store, &gid).unwrap();
        assert!(cycle_complete(&g));
        assert_eq!(eligible_members(&g).len(), 3);

        let mut winners: Vec<_> = g.winner_history.iter().map(|w| w.member_id.clone()).collect();
        winners.sort();
        assert_eq!(winners, vec!["member-1", "member-2", "member-3"]);

        // A new rotation: last rotation's winners can win again, once.
        let g = draw_winner(&store, &gid, &mut rng, at(4)).unwrap();
        assert!(!cycle_complete(&g));
        assert_eq!(g.winner_history.len(), 4);
        let again = g.current_winner_id.clone().unwrap();
        assert_eq!(eligible_members(&g).len(), 2);
        assert!(!eligible_members(&g).contains(&again));
        assert!(matches!(
            set_winner(&store, &gid, &again, at(5)),
            Err(Error::AlreadyWon { .. })
        ));
    }

    #[test]
    fn empty_roster_has_no_one_to_draw() {
        let (_dir, store, gid) = setup(&[]);
        let mut rng = StdRng::seed_from_u64(1);
        assert!(matches!(
            draw_winner(&store, &gid, &mut rng, at(1)),
            Err(Error::NoEligibleMembers(_))
        ));
    }

    #[test]
    fn empty_group_is_not_complete() {
        let (_dir, store, gid) = setup(&[]);
        assert!(!cycle_complete(&get_group(&store, &gid).unwrap()));
    }
}
