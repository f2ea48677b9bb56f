//
// compatibility.rs
// Copyright (C) 2019 Malcolm Ramsay <malramsay64@gmail.com>
// Distributed under terms of the MIT license.
//

use std::collections::HashSet;

use log::debug;

use crate::wyckoff::{Group, WyckoffPosition};

/// Whether a composition can be built from the Wyckoff positions of a group
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Compatibility {
    pub feasible: bool,
    /// At least one of the positions used can move continuously
    pub has_freedom: bool,
}

impl Compatibility {
    fn infeasible() -> Self {
        Self {
            feasible: false,
            has_freedom: false,
        }
    }
}

/// A Wyckoff position available to an entity, along with how many times it can be occupied
#[derive(Debug, Clone, Copy)]
struct Slot {
    index: usize,
    multiplicity: usize,
    free: bool,
    cap: usize,
}

/// The positions an entity can be placed on
///
/// A position with freedom can be occupied any number of times, so only one is needed for each
/// multiplicity. Positions without freedom are occupied at most once and are no longer available
/// after an earlier entity has used them.
///
fn available_slots<F>(group: &Group, count: usize, usable: F, used: &[bool]) -> Vec<Slot>
where
    F: Fn(&WyckoffPosition) -> bool,
{
    let mut free_multiplicities = HashSet::new();
    group
        .positions()
        .iter()
        .filter(|wp| usable(*wp))
        .filter_map(|wp| {
            let multiplicity = wp.multiplicity();
            if wp.has_freedom() {
                if free_multiplicities.insert(multiplicity) {
                    Some(Slot {
                        index: wp.index(),
                        multiplicity,
                        free: true,
                        cap: count / multiplicity,
                    })
                } else {
                    None
                }
            } else if !used[wp.index()] {
                Some(Slot {
                    index: wp.index(),
                    multiplicity,
                    free: false,
                    cap: if multiplicity <= count { 1 } else { 0 },
                })
            } else {
                None
            }
        })
        .filter(|slot| slot.cap > 0)
        .collect()
}

#[derive(Debug)]
struct Frame {
    slot: usize,
    remaining: usize,
    /// The number of occupations of this slot to try next
    next: Option<usize>,
}

impl Frame {
    fn new(slots: &[Slot], slot: usize, remaining: usize) -> Self {
        let next = usize::min(slots[slot].cap, remaining / slots[slot].multiplicity);
        Frame {
            slot,
            remaining,
            next: Some(next),
        }
    }
}

/// Find the number of occupations of each slot which sums exactly to the target
///
/// A depth first search trying the largest number of occupations first. States which are known
/// to fail are remembered, so each is only explored once.
///
fn search(slots: &[Slot], target: usize) -> Option<Vec<usize>> {
    if slots.is_empty() {
        return None;
    }
    let mut dead: HashSet<(usize, usize)> = HashSet::new();
    let mut chosen = vec![0; slots.len()];
    let mut stack = vec![Frame::new(slots, 0, target)];

    while let Some(frame) = stack.last_mut() {
        match frame.next.take() {
            Some(occupations) => {
                let (slot, remaining) = (frame.slot, frame.remaining);
                frame.next = occupations.checked_sub(1);
                chosen[slot] = occupations;

                let left = remaining - occupations * slots[slot].multiplicity;
                if left == 0 {
                    return Some(chosen);
                }
                if slot + 1 < slots.len() && !dead.contains(&(slot + 1, left)) {
                    stack.push(Frame::new(slots, slot + 1, left));
                }
            }
            None => {
                dead.insert((frame.slot, frame.remaining));
                chosen[frame.slot] = 0;
                stack.pop();
            }
        }
    }
    None
}

/// Check whether each count of the composition can be made from the positions of the group
///
/// The `usable` function decides which positions each entity can occupy, taking the index of the
/// entity within the composition. The check has no side effects, the same inputs always give the
/// same result.
///
/// ```
/// use crystal_generator::{check_composition, get_group, GroupName};
/// let group = get_group(GroupName::P2_12_12_1).unwrap();
/// assert!(check_composition(&group, &[4, 8], |_, _| true).feasible);
/// assert!(!check_composition(&group, &[2], |_, _| true).feasible);
/// ```
///
pub fn check_composition<F>(group: &Group, counts: &[usize], usable: F) -> Compatibility
where
    F: Fn(usize, &WyckoffPosition) -> bool,
{
    let mut used = vec![false; group.positions().len()];
    let mut has_freedom = false;

    for (entity, &count) in counts.iter().enumerate() {
        if count == 0 {
            return Compatibility::infeasible();
        }
        let slots = available_slots(group, count, |wp| usable(entity, wp), &used);
        let occupations = match search(&slots, count) {
            Some(o) => o,
            None => {
                debug!(
                    "No combination of positions in {} gives {} for entity {}",
                    group, count, entity
                );
                return Compatibility::infeasible();
            }
        };
        for (slot, &n) in slots.iter().zip(occupations.iter()) {
            if n == 0 {
                continue;
            }
            if slot.free {
                has_freedom = true;
            } else {
                used[slot.index] = true;
            }
        }
    }

    Compatibility {
        feasible: true,
        has_freedom,
    }
}
