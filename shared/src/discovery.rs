use std::collections::HashSet;

use tracing::debug;

use crate::cell::PlayerId;
use crate::grid::{CellPos, HexGrid};

/// Maximal connected set of cells sharing `seed`'s owner, seed first.
///
/// `owner_of` reports the owner of an in-bounds cell. An out-of-bounds or
/// unowned seed yields an empty component. Visitation order does not change
/// the resulting set.
pub fn discover<G, F>(grid: &G, owner_of: F, seed: CellPos) -> Vec<CellPos>
where
    G: HexGrid + ?Sized,
    F: Fn(CellPos) -> Option<PlayerId>,
{
    if !grid.contains(seed) {
        return Vec::new();
    }
    let Some(owner) = owner_of(seed) else {
        return Vec::new();
    };

    let mut frontier = vec![seed];
    let mut queued: HashSet<CellPos> = HashSet::from([seed]);
    let mut visited: HashSet<CellPos> = HashSet::new();
    let mut members = vec![seed];
    let mut member_set: HashSet<CellPos> = HashSet::from([seed]);

    while let Some(current) = frontier.pop() {
        queued.remove(&current);
        visited.insert(current);

        for neighbor in grid.neighbors_of(current).into_iter().flatten() {
            if owner_of(neighbor) != Some(owner) {
                continue;
            }
            if member_set.insert(neighbor) {
                members.push(neighbor);
            }
            if !visited.contains(&neighbor) && queued.insert(neighbor) {
                frontier.push(neighbor);
            }
        }
    }

    debug!(%seed, %owner, size = members.len(), "discovered component");
    members
}
