//
// placement.rs
// Copyright (C) 2019 Malcolm Ramsay <malramsay64@gmail.com>
// Distributed under terms of the MIT license.
//

use std::fmt;

use log::trace;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::generator::Entity;
use crate::lattice::Lattice;
use crate::site::Site;
use crate::tolerance::ToleranceOracle;
use crate::wyckoff::{Group, WyckoffLabel};

/// The number of attempts allowed at each level of the search
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttemptBudget {
    pub lattice: usize,
    pub coordinates: usize,
    /// Steps of the orientation refinement, only used for molecules
    pub orientation: usize,
}

impl AttemptBudget {
    pub fn atomic(has_freedom: bool) -> Self {
        if has_freedom {
            Self {
                lattice: 40,
                coordinates: 10,
                orientation: 0,
            }
        } else {
            Self {
                lattice: 5,
                coordinates: 5,
                orientation: 0,
            }
        }
    }

    pub fn molecular(has_freedom: bool) -> Self {
        if has_freedom {
            Self {
                lattice: 40,
                coordinates: 30,
                orientation: 5,
            }
        } else {
            Self {
                lattice: 20,
                coordinates: 3,
                orientation: 1,
            }
        }
    }

    /// A lattice that can't be redrawn only gets a single lattice attempt
    pub fn fixed_lattice(self) -> Self {
        Self { lattice: 1, ..self }
    }
}

/// The number of Wyckoff positions to try for a single entity type
///
/// With pre-assigned sites this is twice the number of sites, otherwise it is twice the number of
/// general positions needed, with a minimum of 10 in both cases.
///
pub fn orbit_attempts(count: usize, sites: Option<&[WyckoffLabel]>, general: usize) -> usize {
    match sites {
        Some(sites) => usize::max(2 * sites.len(), 10),
        None => usize::max(2 * (count / general), 10),
    }
}

/// Why a single placement was rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// No usable Wyckoff position fits the remaining count
    NoPosition,
    /// The point couldn't be separated from its own images
    MergeFailed,
    /// Merging changed the multiplicity of a pre-assigned site
    MultiplicityChanged,
    /// No orientation of the molecule kept its images apart
    Orientation,
    /// The site is too close to one already placed
    Distance,
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let reason = match self {
            Rejection::NoPosition => "no position available",
            Rejection::MergeFailed => "merge failed",
            Rejection::MultiplicityChanged => "multiplicity changed on merge",
            Rejection::Orientation => "no valid orientation",
            Rejection::Distance => "too close to existing sites",
        };
        write!(f, "{}", reason)
    }
}

/// The outcome of a single placement attempt
#[derive(Debug, Clone)]
pub enum Trial<S> {
    Accepted(S),
    Rejected(Rejection),
}

/// The outcome of placing all the entities of one type
#[derive(Debug, Clone)]
pub enum Placement<S> {
    Complete(Vec<S>),
    Exhausted,
}

/// Counts of each decision made during a generation run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchStats {
    pub lattice_trials: usize,
    pub coordinate_trials: usize,
    pub accepted: usize,
    pub no_position: usize,
    pub merge_failed: usize,
    pub multiplicity_changed: usize,
    pub orientation_failed: usize,
    pub too_close: usize,
}

impl SearchStats {
    pub fn record<S>(&mut self, trial: &Trial<S>) {
        match trial {
            Trial::Accepted(_) => self.accepted += 1,
            Trial::Rejected(Rejection::NoPosition) => self.no_position += 1,
            Trial::Rejected(Rejection::MergeFailed) => self.merge_failed += 1,
            Trial::Rejected(Rejection::MultiplicityChanged) => self.multiplicity_changed += 1,
            Trial::Rejected(Rejection::Orientation) => self.orientation_failed += 1,
            Trial::Rejected(Rejection::Distance) => self.too_close += 1,
        }
    }

    /// The total number of placement attempts
    pub fn trials(&self) -> usize {
        self.accepted
            + self.no_position
            + self.merge_failed
            + self.multiplicity_changed
            + self.orientation_failed
            + self.too_close
    }
}

impl fmt::Display for SearchStats {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{} lattice trials, {} coordinate trials, {} placements ({} accepted, \
             {} without position, {} failed merge, {} changed multiplicity, \
             {} without orientation, {} too close)",
            self.lattice_trials,
            self.coordinate_trials,
            self.trials(),
            self.accepted,
            self.no_position,
            self.merge_failed,
            self.multiplicity_changed,
            self.orientation_failed,
            self.too_close,
        )
    }
}

/// The mutable state of one generation run, passed down through the search
pub struct SearchContext<'r, R: Rng + ?Sized> {
    pub rng: &'r mut R,
    pub budget: AttemptBudget,
    pub stats: SearchStats,
}

impl<'r, R: Rng + ?Sized> SearchContext<'r, R> {
    pub fn new(rng: &'r mut R, budget: AttemptBudget) -> Self {
        Self {
            rng,
            budget,
            stats: SearchStats::default(),
        }
    }
}

/// The fixed surroundings a site is placed into
#[derive(Debug, Clone, Copy)]
pub struct Environment<'a> {
    pub group: &'a Group,
    pub lattice: &'a Lattice,
    pub tolerance: &'a dyn ToleranceOracle,
}

/// Try to place a single site of the entity
fn attempt<E, R>(
    entity: &E,
    index: usize,
    remaining: usize,
    label: Option<&WyckoffLabel>,
    placed: &[E::Site],
    existing: &[E::Site],
    env: &Environment,
    ctx: &mut SearchContext<R>,
) -> Trial<E::Site>
where
    E: Entity,
    R: Rng + ?Sized,
{
    let position =
        match env
            .group
            .select_position(remaining, label, |wp| entity.usable(wp), &mut *ctx.rng)
        {
            Some(wp) => wp,
            None => return Trial::Rejected(Rejection::NoPosition),
        };

    let point = env.lattice.generate_point(&mut *ctx.rng);
    let tolerance = entity.merge_tolerance(env.tolerance);
    let (mut point, merged) =
        match env
            .group
            .merge(&point, position, env.lattice, tolerance, |wp| entity.usable(wp))
        {
            Some(m) => m,
            None => return Trial::Rejected(Rejection::MergeFailed),
        };
    if env.lattice.periodicity().is_planar() {
        point.z = 0.;
    }

    // A pre-assigned site has to keep the multiplicity it was chosen with
    if label.is_some() && merged.multiplicity() != position.multiplicity() {
        return Trial::Rejected(Rejection::MultiplicityChanged);
    }

    let site = match entity.build_site(index, merged, point, env, ctx) {
        Trial::Accepted(site) => site,
        rejected => return rejected,
    };

    if placed
        .iter()
        .chain(existing.iter())
        .all(|other| site.check_with(other, env.lattice, env.tolerance))
    {
        Trial::Accepted(site)
    } else {
        Trial::Rejected(Rejection::Distance)
    }
}

/// Place every entity of a single type
///
/// Sites are added one at a time until their multiplicities sum exactly to `count`. Pre-assigned
/// sites are used in order, each only being consumed once a site has been accepted on it. Every
/// new site is checked against the sites of this call and the `existing` sites of the entity
/// types already placed. Running out of attempts discards everything placed by this call.
///
pub fn place<E, R>(
    entity: &E,
    index: usize,
    count: usize,
    sites: Option<&[WyckoffLabel]>,
    existing: &[E::Site],
    env: &Environment,
    ctx: &mut SearchContext<R>,
) -> Placement<E::Site>
where
    E: Entity,
    R: Rng + ?Sized,
{
    let attempts = orbit_attempts(count, sites, env.group.general_position().multiplicity());
    let mut placed: Vec<E::Site> = Vec::new();
    let mut total = 0;
    let mut next_label = 0;

    for _ in 0..attempts {
        let label = sites.and_then(|s| s.get(next_label));
        let trial = attempt(
            entity,
            index,
            count - total,
            label,
            &placed,
            existing,
            env,
            ctx,
        );
        ctx.stats.record(&trial);

        match trial {
            Trial::Accepted(site) => {
                trace!("Accepted {}", site);
                if label.is_some() {
                    next_label += 1;
                }
                total += site.multiplicity();
                placed.push(site);
                if total == count {
                    return Placement::Complete(placed);
                }
            }
            Trial::Rejected(reason) => trace!("Rejected {} site: {}", entity.name(), reason),
        }
    }
    Placement::Exhausted
}
