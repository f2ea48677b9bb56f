//
// generation.rs
// Copyright (C) 2019 Malcolm Ramsay <malramsay64@gmail.com>
// Distributed under terms of the MIT license.
//

use std::sync::Arc;

use itertools::iproduct;
use nalgebra::{Point3, Vector3};
use rand::SeedableRng;
use rand_pcg::Pcg64Mcg;

use crystal_generator::{
    check_composition, get_group, AtomSite, BuildGenerator, Error, Group, GroupName, Lattice,
    LatticeType, Periodicity, Prototype, Site, Structure, TolMatrix, ToleranceOracle,
};

/// A group with a general position 4a and a two fold axis 2b
fn axis_group() -> Group {
    Group::new(
        "P222-axis",
        16,
        LatticeType::Orthorhombic,
        3,
        vec![
            ('a', vec!["x,y,z", "-x,-y,z", "-x,y,-z", "x,-y,-z"]),
            ('b', vec!["0,0,z", "0,0,-z"]),
        ],
    )
    .unwrap()
}

fn cubic(length: f64) -> Lattice {
    Lattice::from_parameters(
        LatticeType::Cubic,
        [length; 3],
        [90.; 3],
        Periodicity::bulk(),
    )
    .unwrap()
}

/// Run the generator with consecutive seeds, keeping every structure found
fn generate_all(
    generator: &crystal_generator::Generator<crystal_generator::AtomEntity>,
    runs: u64,
) -> Vec<Structure<AtomSite>> {
    (0..runs)
        .filter_map(|seed| {
            let mut rng = Pcg64Mcg::seed_from_u64(seed);
            generator.generate(&mut rng).into_structure()
        })
        .collect()
}

/// The shortest distance between two points over the periodic images, computed directly
fn brute_force_distance(lattice: &Lattice, a: &Point3<f64>, b: &Point3<f64>, same: bool) -> f64 {
    let pbc = lattice.periodicity().pbc;
    let range = |axis: usize| if pbc[axis] { -2..=2 } else { 0..=0 };
    let mut difference = b - a;
    for axis in 0..3 {
        if pbc[axis] {
            difference[axis] -= difference[axis].round();
        }
    }
    iproduct!(range(0), range(1), range(2))
        .filter(|&(x, y, z)| !(same && x == 0 && y == 0 && z == 0))
        .map(|(x, y, z)| {
            let shifted = difference + Vector3::new(x as f64, y as f64, z as f64);
            (lattice.matrix() * shifted).norm()
        })
        .fold(f64::INFINITY, f64::min)
}

fn check_separations(structure: &Structure<AtomSite>, tolerance: &dyn ToleranceOracle) {
    let atoms = structure.fractional_coordinates();
    for (i, (sa, pa)) in atoms.iter().enumerate() {
        for (sb, pb) in atoms.iter().skip(i) {
            let same = std::ptr::eq(pa, pb);
            let distance = brute_force_distance(&structure.lattice, pa, pb, same);
            assert!(
                distance >= tolerance.min_separation(sa, sb) - 1e-8,
                "{} and {} are {:.3} apart",
                sa,
                sb,
                distance
            );
        }
    }
}

#[test]
fn single_general_orbit() {
    let group = get_group(GroupName::P2_12_12_1).unwrap();
    let generator = BuildGenerator::default()
        .atomic(&group, &["C"], &[4])
        .unwrap();

    let structures = generate_all(&generator, 5);
    assert!(!structures.is_empty());
    for structure in structures.iter() {
        assert_eq!(structure.sites.len(), 1);
        assert_eq!(structure.sites[0].multiplicity(), 4);
    }
}

#[test]
fn counts_without_small_orbits_rejected() {
    let group = Group::new(
        "P222-even",
        16,
        LatticeType::Orthorhombic,
        3,
        vec![
            ('u', vec!["x,y,z", "-x,-y,z", "-x,y,-z", "x,-y,-z"]),
            ('q', vec!["0,0,z", "0,0,-z"]),
        ],
    )
    .unwrap();
    assert!(!check_composition(&group, &[3], |_, _| true).feasible);

    let error = BuildGenerator::default()
        .atomic(&group, &["C"], &[3])
        .unwrap_err();
    assert!(matches!(error, Error::Incompatible { .. }));
    let message = error.to_string();
    assert!(message.contains("[3]"));
    assert!(message.contains("P222-even"));
}

#[test]
fn exact_composition() {
    let group = get_group(GroupName::P2_m).unwrap();
    let generator = BuildGenerator::default()
        .atomic(&group, &["C", "O"], &[4, 6])
        .unwrap();

    let structures = generate_all(&generator, 10);
    assert!(!structures.is_empty());
    for structure in structures.iter() {
        assert_eq!(structure.composition(), vec![4, 6]);
        assert_eq!(structure.total_atoms(), 10);
        assert!(structure.sites.iter().all(|s| s.entity < 2));
    }
}

#[test]
fn separations_verified_independently() {
    let group = get_group(GroupName::P222).unwrap();
    let generator = BuildGenerator::default()
        .factor(1.5)
        .atomic(&group, &["Si", "O"], &[4, 8])
        .unwrap();
    let tolerance = TolMatrix::new(Prototype::Atomic);

    let structures = generate_all(&generator, 10);
    assert!(!structures.is_empty());
    for structure in structures.iter() {
        check_separations(structure, &tolerance);
    }
}

#[test]
fn layer_separations() {
    let group = get_group(GroupName::layer_pbar1).unwrap();
    let generator = BuildGenerator::default()
        .thickness(Some(3.))
        .atomic(&group, &["C"], &[6])
        .unwrap();
    let tolerance = TolMatrix::new(Prototype::Atomic);

    let structures = generate_all(&generator, 10);
    assert!(!structures.is_empty());
    for structure in structures.iter() {
        assert_eq!(structure.lattice.periodicity().pbc, [true, true, false]);
        check_separations(structure, &tolerance);
    }
}

#[test]
fn cluster_inside_sphere() {
    let group = get_group(GroupName::C2v).unwrap();
    let generator = BuildGenerator::default()
        .atomic(&group, &["C"], &[5])
        .unwrap();

    let structures = generate_all(&generator, 10);
    assert!(!structures.is_empty());
    for structure in structures.iter() {
        assert_eq!(structure.composition(), vec![5]);
        assert!(structure
            .fractional_coordinates()
            .iter()
            .all(|(_, p)| p.coords.norm() <= 0.5 + 1e-8));
        check_separations(structure, &TolMatrix::cluster(Prototype::Atomic));
    }
}

#[test]
fn preassigned_labels_consumed_in_order() {
    let group = axis_group();
    let generator = BuildGenerator::default()
        .sites(vec![vec![String::from("4a"), String::from("2b")]])
        .atomic(&group, &["C"], &[6])
        .unwrap();

    let structures = generate_all(&generator, 20);
    assert!(!structures.is_empty());
    for structure in structures.iter() {
        let labels: Vec<String> = structure
            .sites
            .iter()
            .map(|s| s.wyckoff.label().to_string())
            .collect();
        assert_eq!(labels, vec!["4a", "2b"]);
    }
}

#[test]
fn merged_preassigned_sites_rejected() {
    let group = axis_group();
    // Most points on the general position are too close to their images, and are merged onto
    // the axis, which changes the multiplicity.
    let mut tolerance = TolMatrix::new(Prototype::Atomic);
    tolerance.set("C", "C", 4.);
    let generator = BuildGenerator::default()
        .lattice(cubic(10.))
        .tolerance(Arc::new(tolerance))
        .sites(vec![vec![String::from("4a")]])
        .atomic(&group, &["C"], &[4])
        .unwrap();

    let mut changed = 0;
    for seed in 0..5 {
        let mut rng = Pcg64Mcg::seed_from_u64(seed);
        let outcome = generator.generate(&mut rng);
        changed += outcome.stats().multiplicity_changed;
        if let Some(structure) = outcome.structure() {
            assert_eq!(structure.sites.len(), 1);
            assert_eq!(structure.sites[0].multiplicity(), 4);
        }
    }
    assert!(changed > 0);
}

#[test]
fn inconsistent_labels_rejected() {
    let group = axis_group();
    let result = BuildGenerator::default()
        .sites(vec![vec![String::from("4a")]])
        .atomic(&group, &["C"], &[6]);
    match result {
        Err(Error::InconsistentSites {
            sites,
            expected,
            found,
        }) => {
            assert_eq!(sites, vec!["4a"]);
            assert_eq!(expected, 6);
            assert_eq!(found, 4);
        }
        other => panic!("Expected inconsistent sites, found {:?}", other.map(|_| ())),
    }
}

#[test]
fn zero_count_rejected() {
    let group = get_group(GroupName::P1).unwrap();
    let result = BuildGenerator::default().atomic(&group, &["C"], &[0]);
    assert!(matches!(result, Err(Error::InvalidCount { index: 0, count: 0 })));
}

#[test]
fn impossible_tolerance_exhausts_search() {
    let group = get_group(GroupName::P2_12_12_1).unwrap();
    let mut tolerance = TolMatrix::new(Prototype::Atomic);
    tolerance.set("C", "C", 1000.);
    let generator = BuildGenerator::default()
        .tolerance(Arc::new(tolerance))
        .atomic(&group, &["C"], &[4])
        .unwrap();

    let mut rng = Pcg64Mcg::seed_from_u64(0);
    let outcome = generator.generate(&mut rng);
    assert!(!outcome.is_generated());
    assert_eq!(outcome.stats().lattice_trials, 40);
    assert_eq!(outcome.stats().accepted, 0);
}

#[test]
fn second_type_collides_with_first() {
    let group = get_group(GroupName::P1).unwrap();
    let mut tolerance = TolMatrix::new(Prototype::Atomic);
    tolerance.set("Na", "Cl", 1000.);
    let generator = BuildGenerator::default()
        .lattice(cubic(10.))
        .tolerance(Arc::new(tolerance))
        .atomic(&group, &["Na", "Cl"], &[1, 1])
        .unwrap();

    for seed in 0..3 {
        let mut rng = Pcg64Mcg::seed_from_u64(seed);
        let outcome = generator.generate(&mut rng);
        assert!(!outcome.is_generated());
        let stats = outcome.stats();
        assert_eq!(stats.lattice_trials, 1);
        assert_eq!(stats.coordinate_trials, 10);
        // Sodium is always placed, every chlorine is rejected
        assert_eq!(stats.accepted, 10);
        assert_eq!(stats.too_close, 100);
    }
}

#[test]
fn generation_is_reproducible() {
    let group = get_group(GroupName::P2).unwrap();
    let generator = BuildGenerator::default()
        .atomic(&group, &["Na", "Cl"], &[2, 2])
        .unwrap();

    let run = || {
        let mut rng = Pcg64Mcg::seed_from_u64(7);
        generator
            .generate(&mut rng)
            .into_structure()
            .map(|s| serde_json::to_string(&s).unwrap())
    };
    assert_eq!(run(), run());
}
