//
// lib.rs
// Copyright (C) 2019 Malcolm Ramsay <malramsay64@gmail.com>
// Distributed under terms of the MIT license.
//

//! Generate random crystal structures which are consistent with a symmetry group
//!
//! Entities (atoms or rigid molecules) are placed on the Wyckoff positions of a group so that
//! their multiplicities sum exactly to the requested composition, and no two atoms are closer
//! than the tolerance for their species. The search is randomised, so a single run can fail to
//! find a structure, which is reported through [`Outcome::NotGenerated`] rather than an error.
//!
//! ```
//! use rand::SeedableRng;
//! use rand_pcg::Pcg64Mcg;
//! use crystal_generator::{get_group, BuildGenerator, GroupName};
//!
//! let group = get_group(GroupName::P2_12_12_1).unwrap();
//! let generator = BuildGenerator::default()
//!     .atomic(&group, &["Na", "Cl"], &[4, 4])
//!     .unwrap();
//! let mut rng = Pcg64Mcg::seed_from_u64(0);
//! if let Some(structure) = generator.generate(&mut rng).structure() {
//!     assert_eq!(structure.composition(), vec![4, 4]);
//! }
//! ```

#[macro_use]
mod ops_macros;

pub mod compatibility;
pub mod element;
pub mod error;
pub mod generator;
pub mod groups;
pub mod lattice;
pub mod molecule;
pub mod orientation;
pub mod placement;
pub mod site;
pub mod structure;
pub mod tolerance;
pub mod transform;
pub mod wyckoff;

pub use crate::compatibility::{check_composition, Compatibility};
pub use crate::element::Element;
pub use crate::error::{Error, Result};
pub use crate::generator::{AtomEntity, BuildGenerator, Entity, Generator, MolEntity, Outcome};
pub use crate::groups::{get_group, GroupName};
pub use crate::lattice::{Lattice, LatticeType, Periodicity};
pub use crate::molecule::{MolAtom, Molecule, MoleculeName, Orientation};
pub use crate::placement::{AttemptBudget, SearchStats};
pub use crate::site::{AtomSite, MolSite, Site};
pub use crate::structure::Structure;
pub use crate::tolerance::{Prototype, TolMatrix, ToleranceOracle};
pub use crate::transform::Transform3;
pub use crate::wyckoff::{Group, WyckoffLabel, WyckoffPosition};
