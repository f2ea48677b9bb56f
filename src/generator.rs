//
// generator.rs
// Copyright (C) 2019 Malcolm Ramsay <malramsay64@gmail.com>
// Distributed under terms of the MIT license.
//

use std::f64::consts::PI;
use std::fmt;
use std::sync::Arc;

use log::{debug, info, trace, warn};
use nalgebra::Point3;
use rand::Rng;

use crate::compatibility::{check_composition, Compatibility};
use crate::element::Element;
use crate::error::{Error, Result};
use crate::lattice::{Lattice, Periodicity};
use crate::molecule::{Molecule, Orientation};
use crate::orientation;
use crate::placement::{
    place, AttemptBudget, Environment, Placement, Rejection, SearchContext, SearchStats, Trial,
};
use crate::site::{AtomSite, MolSite, Site};
use crate::structure::Structure;
use crate::tolerance::{Prototype, TolMatrix, ToleranceOracle};
use crate::wyckoff::{Group, WyckoffLabel, WyckoffPosition};

/// A kind of entity which can be placed on the Wyckoff positions of a group
///
/// This is what differs between generating atomic and molecular crystals, everything else about
/// the search is shared.
///
pub trait Entity: fmt::Debug + Send + Sync {
    type Site: Site;

    fn name(&self) -> &str;

    /// Whether the entity can occupy the position at all
    fn usable(&self, position: &WyckoffPosition) -> bool;

    /// The distance below which the symmetry images of a point are merged
    fn merge_tolerance(&self, tolerance: &dyn ToleranceOracle) -> f64;

    /// An estimate of the volume taken up by a single entity
    fn volume<R: Rng + ?Sized>(&self, rng: &mut R) -> f64;

    fn budget(has_freedom: bool) -> AttemptBudget;

    /// Create a site from a point which has already been merged onto the position
    fn build_site<R: Rng + ?Sized>(
        &self,
        index: usize,
        position: &WyckoffPosition,
        point: Point3<f64>,
        env: &Environment,
        ctx: &mut SearchContext<R>,
    ) -> Trial<Self::Site>;
}

/// A single atom of an element
#[derive(Debug, Clone)]
pub struct AtomEntity {
    element: Element,
}

impl AtomEntity {
    pub fn new(symbol: &str) -> Result<Self> {
        Ok(Self {
            element: Element::from_symbol(symbol)?,
        })
    }

    pub fn element(&self) -> &Element {
        &self.element
    }
}

impl Entity for AtomEntity {
    type Site = AtomSite;

    fn name(&self) -> &str {
        self.element.symbol
    }

    fn usable(&self, _: &WyckoffPosition) -> bool {
        true
    }

    fn merge_tolerance(&self, tolerance: &dyn ToleranceOracle) -> f64 {
        tolerance.min_separation(self.element.symbol, self.element.symbol)
    }

    /// The volume of a sphere with a radius between the covalent and van der Waals radii
    fn volume<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        let low = f64::min(self.element.covalent_radius, self.element.vdw_radius);
        let high = f64::max(self.element.covalent_radius, self.element.vdw_radius);
        let radius = rng.gen_range(low..=high);
        4. / 3. * PI * radius.powi(3)
    }

    fn budget(has_freedom: bool) -> AttemptBudget {
        AttemptBudget::atomic(has_freedom)
    }

    fn build_site<R: Rng + ?Sized>(
        &self,
        index: usize,
        position: &WyckoffPosition,
        point: Point3<f64>,
        _: &Environment,
        _: &mut SearchContext<R>,
    ) -> Trial<AtomSite> {
        Trial::Accepted(AtomSite {
            entity: index,
            species: self.element.symbol.to_string(),
            wyckoff: position.clone(),
            position: point,
        })
    }
}

/// A rigid molecule, along with the orientations it can take on each position of a group
#[derive(Debug, Clone)]
pub struct MolEntity {
    molecule: Arc<Molecule>,
    /// Indexed by the position within the group
    orientations: Vec<Vec<Orientation>>,
}

impl MolEntity {
    pub fn new(molecule: Arc<Molecule>, group: &Group, allow_inversion: bool) -> Self {
        let orientations: Vec<Vec<Orientation>> = group
            .positions()
            .iter()
            .map(|wp| molecule.allowed_orientations(group, wp, allow_inversion))
            .collect();
        for (wp, o) in group.positions().iter().zip(orientations.iter()) {
            trace!(
                "{} has {} orientations on {}",
                molecule.name,
                o.len(),
                wp.label()
            );
        }
        Self {
            molecule,
            orientations,
        }
    }

    pub fn molecule(&self) -> &Arc<Molecule> {
        &self.molecule
    }

    pub fn orientations(&self, position: &WyckoffPosition) -> &[Orientation] {
        self.orientations
            .get(position.index())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

impl Entity for MolEntity {
    type Site = MolSite;

    fn name(&self) -> &str {
        &self.molecule.name
    }

    fn usable(&self, position: &WyckoffPosition) -> bool {
        !self.orientations(position).is_empty()
    }

    fn merge_tolerance(&self, _: &dyn ToleranceOracle) -> f64 {
        0.5 * self.molecule.radius()
    }

    fn volume<R: Rng + ?Sized>(&self, _: &mut R) -> f64 {
        self.molecule.volume()
    }

    fn budget(has_freedom: bool) -> AttemptBudget {
        AttemptBudget::molecular(has_freedom)
    }

    fn build_site<R: Rng + ?Sized>(
        &self,
        index: usize,
        position: &WyckoffPosition,
        point: Point3<f64>,
        env: &Environment,
        ctx: &mut SearchContext<R>,
    ) -> Trial<MolSite> {
        match orientation::refine(
            &self.molecule,
            index,
            position,
            point,
            self.orientations(position),
            env,
            ctx,
        ) {
            Some(site) => Trial::Accepted(site),
            None => Trial::Rejected(Rejection::Orientation),
        }
    }
}

/// The result of a single generation run
///
/// Not finding a structure is an expected result of the random search, so it is not an error.
/// The statistics of the search are kept either way.
///
#[derive(Debug, Clone)]
pub enum Outcome<S> {
    Generated(Structure<S>),
    NotGenerated(SearchStats),
}

impl<S> Outcome<S> {
    pub fn is_generated(&self) -> bool {
        matches!(self, Outcome::Generated(_))
    }

    pub fn structure(&self) -> Option<&Structure<S>> {
        match self {
            Outcome::Generated(s) => Some(s),
            Outcome::NotGenerated(_) => None,
        }
    }

    pub fn into_structure(self) -> Option<Structure<S>> {
        match self {
            Outcome::Generated(s) => Some(s),
            Outcome::NotGenerated(_) => None,
        }
    }

    pub fn stats(&self) -> &SearchStats {
        match self {
            Outcome::Generated(s) => &s.stats,
            Outcome::NotGenerated(stats) => stats,
        }
    }
}

/// The settings shared by every generation run
///
/// ```
/// use crystal_generator::{get_group, BuildGenerator, GroupName};
/// let group = get_group(GroupName::P2_12_12_1).unwrap();
/// let generator = BuildGenerator::default()
///     .factor(1.5)
///     .atomic(&group, &["C"], &[8])
///     .unwrap();
/// assert_eq!(generator.counts(), &[8]);
/// ```
///
#[derive(Debug, Clone)]
pub struct BuildGenerator {
    factor: f64,
    conventional: bool,
    allow_inversion: bool,
    tolerance: Option<Arc<dyn ToleranceOracle>>,
    lattice: Option<Lattice>,
    thickness: Option<f64>,
    area: Option<f64>,
    sites: Option<Vec<Vec<String>>>,
}

impl Default for BuildGenerator {
    fn default() -> Self {
        Self {
            factor: 1.1,
            conventional: true,
            allow_inversion: true,
            tolerance: None,
            lattice: None,
            thickness: None,
            area: None,
            sites: None,
        }
    }
}

impl BuildGenerator {
    /// The ratio of the cell volume to the volume of its contents
    pub fn factor(&mut self, factor: f64) -> &mut Self {
        self.factor = factor;
        self
    }

    /// When false the counts are given per primitive cell and scaled by the centring
    pub fn conventional(&mut self, conventional: bool) -> &mut Self {
        self.conventional = conventional;
        self
    }

    /// Whether molecules may take orientations which change their handedness
    pub fn allow_inversion(&mut self, allow_inversion: bool) -> &mut Self {
        self.allow_inversion = allow_inversion;
        self
    }

    pub fn tolerance(&mut self, tolerance: Arc<dyn ToleranceOracle>) -> &mut Self {
        self.tolerance = Some(tolerance);
        self
    }

    /// Use a fixed lattice instead of drawing one at random
    pub fn lattice(&mut self, lattice: Lattice) -> &mut Self {
        self.lattice = Some(lattice);
        self
    }

    pub fn thickness(&mut self, thickness: Option<f64>) -> &mut Self {
        self.thickness = thickness;
        self
    }

    pub fn area(&mut self, area: Option<f64>) -> &mut Self {
        self.area = area;
        self
    }

    /// Pre-assign Wyckoff positions, one list of labels for each entity type
    ///
    /// An empty list leaves the positions of that type to be chosen at random.
    ///
    pub fn sites(&mut self, sites: Vec<Vec<String>>) -> &mut Self {
        self.sites = Some(sites);
        self
    }

    /// Set up the generation of an atomic crystal from element symbols
    pub fn atomic(
        &self,
        group: &Group,
        species: &[&str],
        counts: &[usize],
    ) -> Result<Generator<AtomEntity>> {
        let entities = species
            .iter()
            .map(|s| AtomEntity::new(s))
            .collect::<Result<Vec<_>>>()?;
        self.build(group, entities, counts, Prototype::Atomic)
    }

    /// Set up the generation of a molecular crystal
    pub fn molecular(
        &self,
        group: &Group,
        molecules: Vec<Arc<Molecule>>,
        counts: &[usize],
    ) -> Result<Generator<MolEntity>> {
        let entities = molecules
            .into_iter()
            .map(|m| MolEntity::new(m, group, self.allow_inversion))
            .collect();
        self.build(group, entities, counts, Prototype::Molecular)
    }

    fn build<E: Entity>(
        &self,
        group: &Group,
        entities: Vec<E>,
        counts: &[usize],
        prototype: Prototype,
    ) -> Result<Generator<E>> {
        if counts.len() != entities.len() {
            return Err(Error::CompositionLength {
                expected: entities.len(),
                found: counts.len(),
            });
        }
        if !(self.factor > 0.) {
            return Err(Error::InvalidFactor(self.factor));
        }
        if let Some((index, &count)) = counts.iter().enumerate().find(|&(_, &c)| c == 0) {
            return Err(Error::InvalidCount { index, count });
        }
        let counts: Vec<usize> = if self.conventional {
            counts.to_vec()
        } else {
            counts.iter().map(|c| c * group.cell_size()).collect()
        };

        let sites = self.parse_sites(group, &counts)?;

        let compatibility =
            check_composition(group, &counts, |index, wp| entities[index].usable(wp));
        if !compatibility.feasible {
            return Err(Error::Incompatible {
                composition: counts,
                group: group.name.clone(),
            });
        }
        debug!(
            "Composition {:?} is compatible with {}, freedom: {}",
            counts, group, compatibility.has_freedom
        );

        let tolerance = match &self.tolerance {
            Some(t) => Arc::clone(t),
            None if group.dimension == 0 => Arc::new(TolMatrix::cluster(prototype)),
            None => Arc::new(TolMatrix::new(prototype)),
        };

        let periodicity = match group.dimension {
            2 => Periodicity::layer(self.thickness),
            1 => Periodicity::rod(self.area),
            d => Periodicity::from_dimension(d),
        };

        let lattice = self.lattice.as_ref().map(|lattice| {
            let mut lattice = lattice.clone();
            if lattice.periodicity() != &periodicity {
                warn!(
                    "Changing the periodicity of the lattice from {:?} to {:?} to match {}",
                    lattice.periodicity().pbc,
                    periodicity.pbc,
                    group
                );
                lattice.set_periodicity(periodicity);
            }
            lattice
        });

        Ok(Generator {
            group: group.clone(),
            entities,
            counts,
            sites,
            factor: self.factor,
            periodicity,
            lattice,
            tolerance,
            compatibility,
        })
    }

    /// Check the pre-assigned labels exist and add up to the requested counts
    fn parse_sites(
        &self,
        group: &Group,
        counts: &[usize],
    ) -> Result<Vec<Option<Vec<WyckoffLabel>>>> {
        let sites = match &self.sites {
            None => return Ok(vec![None; counts.len()]),
            Some(sites) => sites,
        };
        if sites.len() != counts.len() {
            return Err(Error::CompositionLength {
                expected: counts.len(),
                found: sites.len(),
            });
        }

        sites
            .iter()
            .zip(counts.iter())
            .map(|(labels, &count)| -> Result<Option<Vec<WyckoffLabel>>> {
                if labels.is_empty() {
                    return Ok(None);
                }
                let parsed = labels
                    .iter()
                    .map(|l| l.parse::<WyckoffLabel>())
                    .collect::<Result<Vec<_>>>()?;
                let mut total = 0;
                for label in parsed.iter() {
                    total += group.find(label)?.multiplicity();
                }
                if total != count {
                    return Err(Error::InconsistentSites {
                        sites: labels.clone(),
                        expected: count,
                        found: total,
                    });
                }
                Ok(Some(parsed))
            })
            .collect()
    }
}

/// Generates random structures for a fixed group and composition
///
/// A generator holds only validated inputs, so [`Generator::generate`] can be called any number
/// of times, including from multiple threads with their own random sources.
///
#[derive(Debug, Clone)]
pub struct Generator<E> {
    group: Group,
    entities: Vec<E>,
    counts: Vec<usize>,
    sites: Vec<Option<Vec<WyckoffLabel>>>,
    factor: f64,
    periodicity: Periodicity,
    lattice: Option<Lattice>,
    tolerance: Arc<dyn ToleranceOracle>,
    compatibility: Compatibility,
}

impl<E: Entity> Generator<E> {
    pub fn group(&self) -> &Group {
        &self.group
    }

    pub fn entities(&self) -> &[E] {
        &self.entities
    }

    /// The number of each entity in the cell, after scaling to the conventional cell
    pub fn counts(&self) -> &[usize] {
        &self.counts
    }

    pub fn compatibility(&self) -> Compatibility {
        self.compatibility
    }

    pub fn tolerance(&self) -> &dyn ToleranceOracle {
        &*self.tolerance
    }

    /// The volume of a cell holding the composition, with a fresh draw for each call
    pub fn estimate_volume<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        let total: f64 = self
            .entities
            .iter()
            .zip(self.counts.iter())
            .map(|(entity, &count)| count as f64 * entity.volume(&mut *rng))
            .sum();
        self.factor * total
    }

    /// Run a single attempt at generating a structure
    ///
    /// The lattice is redrawn for each lattice trial, and each lattice gets a number of
    /// coordinate trials in which every entity type is placed in turn. A failure to place any
    /// type discards the whole coordinate trial. A lattice which can't be drawn for the estimated
    /// volume only uses up its lattice trial, the next trial starts from a fresh estimate.
    ///
    pub fn generate<R: Rng + ?Sized>(&self, rng: &mut R) -> Outcome<E::Site> {
        let mut budget = E::budget(self.compatibility.has_freedom);
        if let Some(lattice) = &self.lattice {
            if !lattice.allow_volume_reset() {
                budget = budget.fixed_lattice();
            }
        }
        let mut ctx = SearchContext::new(rng, budget);
        let mut lattice: Option<Lattice> = None;

        for cycle in 0..budget.lattice {
            ctx.stats.lattice_trials += 1;
            let current = match self.next_lattice(lattice.take(), &mut *ctx.rng) {
                Ok(next) => lattice.insert(next),
                Err(e) => {
                    warn!("Lattice trial {} failed: {}", cycle, e);
                    continue;
                }
            };
            debug!("Lattice trial {}: {}", cycle, current);

            let env = Environment {
                group: &self.group,
                lattice: &*current,
                tolerance: &*self.tolerance,
            };
            for _ in 0..budget.coordinates {
                ctx.stats.coordinate_trials += 1;
                if let Some(sites) = self.place_all(&env, &mut ctx) {
                    info!(
                        "Generated {} in {} after {}",
                        self.formula(),
                        self.group,
                        ctx.stats
                    );
                    return Outcome::Generated(Structure::new(
                        self.group.clone(),
                        current.clone(),
                        sites,
                        ctx.stats,
                    ));
                }
            }
        }

        info!(
            "Unable to generate {} in {} after {}",
            self.formula(),
            self.group,
            ctx.stats
        );
        Outcome::NotGenerated(ctx.stats)
    }

    /// The lattice for the next lattice trial
    ///
    /// The previous lattice has its shape redrawn. Without one, the supplied lattice is used or
    /// a new lattice is drawn from a fresh volume estimate.
    ///
    fn next_lattice<R: Rng + ?Sized>(
        &self,
        previous: Option<Lattice>,
        rng: &mut R,
    ) -> Result<Lattice> {
        match (previous, &self.lattice) {
            (Some(mut lattice), _) => {
                lattice.reset_matrix(&mut *rng)?;
                Ok(lattice)
            }
            (None, Some(lattice)) => Ok(lattice.clone()),
            (None, None) => {
                let volume = self.estimate_volume(&mut *rng);
                debug!("Estimated cell volume {:.3}", volume);
                Lattice::from_volume(self.group.lattice_type, volume, self.periodicity, rng)
            }
        }
    }

    /// Place every entity type in order, with later types checked against earlier ones
    fn place_all<R: Rng + ?Sized>(
        &self,
        env: &Environment,
        ctx: &mut SearchContext<R>,
    ) -> Option<Vec<E::Site>> {
        let mut sites: Vec<E::Site> = Vec::new();
        for (index, (entity, &count)) in self.entities.iter().zip(self.counts.iter()).enumerate()
        {
            let labels = self.sites[index].as_deref();
            match place(entity, index, count, labels, &sites, env, ctx) {
                Placement::Complete(placed) => sites.extend(placed),
                Placement::Exhausted => {
                    debug!("Unable to place {} {}", count, entity.name());
                    return None;
                }
            }
        }
        Some(sites)
    }

    fn formula(&self) -> String {
        self.entities
            .iter()
            .zip(self.counts.iter())
            .map(|(e, c)| format!("{}{}", e.name(), c))
            .collect()
    }
}
