//
// error.rs
// Copyright (C) 2019 Malcolm Ramsay <malramsay64@gmail.com>
// Distributed under terms of the MIT license.
//

use thiserror::Error;

/// Fatal errors raised while setting up a generation run
///
/// Running out of attempts during the randomised search is not an error, it is reported through
/// [`Outcome::NotGenerated`](crate::Outcome). Everything here is a property of the inputs, so
/// retrying with a different random source will never help.
///
#[derive(Debug, Error)]
pub enum Error {
    #[error("Composition must contain positive integers, found {count} for entry {index}")]
    InvalidCount { index: usize, count: usize },

    #[error("Expected {expected} counts to match the number of entities, found {found}")]
    CompositionLength { expected: usize, found: usize },

    #[error("Volume factor must be positive, found {0}")]
    InvalidFactor(f64),

    #[error("Unknown element: '{0}'")]
    UnknownElement(String),

    #[error("Invalid Wyckoff label '{label}': {reason}")]
    InvalidLabel { label: String, reason: String },

    #[error("Wyckoff position '{label}' does not exist in group {group}")]
    UnknownSite { label: String, group: String },

    #[error(
        "The requested number of entities is inconsistent with {sites:?}: \
         {expected} from the composition, {found} from the Wyckoff list"
    )]
    InconsistentSites {
        sites: Vec<String>,
        expected: usize,
        found: usize,
    },

    #[error("Composition {composition:?} not compatible with symmetry group {group}")]
    Incompatible {
        composition: Vec<usize>,
        group: String,
    },

    #[error("Invalid symmetry operation '{operation}': {reason}")]
    InvalidOperation { operation: String, reason: String },

    #[error("Invalid group {group}: {reason}")]
    InvalidGroup { group: String, reason: String },

    #[error("Unable to construct lattice: {0}")]
    Lattice(String),

    #[error("Invalid molecule {name}: {reason}")]
    Molecule { name: String, reason: String },
}

pub type Result<T> = std::result::Result<T, Error>;
