//
// molecular.rs
// Copyright (C) 2019 Malcolm Ramsay <malramsay64@gmail.com>
// Distributed under terms of the MIT license.
//

use std::sync::Arc;

use rand::SeedableRng;
use rand_pcg::Pcg64Mcg;

use crystal_generator::{
    get_group, BuildGenerator, Error, GroupName, MolSite, Molecule, MoleculeName, Prototype,
    Site, Structure, TolMatrix, ToleranceOracle,
};

fn molecule(name: MoleculeName) -> Arc<Molecule> {
    Arc::new(Molecule::from_name(name).unwrap())
}

fn generate_all(
    generator: &crystal_generator::Generator<crystal_generator::MolEntity>,
    runs: u64,
) -> Vec<Structure<MolSite>> {
    (0..runs)
        .filter_map(|seed| {
            let mut rng = Pcg64Mcg::seed_from_u64(seed);
            generator.generate(&mut rng).into_structure()
        })
        .collect()
}

/// Every atom is far enough from every atom of a different molecule, and from the periodic
/// copies of its own molecule
fn check_intermolecular(structure: &Structure<MolSite>, tolerance: &dyn ToleranceOracle) {
    // Label each atom with the site and image it belongs to
    let atoms: Vec<(usize, &str, nalgebra::Point3<f64>)> = structure
        .sites
        .iter()
        .enumerate()
        .flat_map(|(index, site)| {
            let size = site.molecule.len();
            site.atoms(&structure.lattice)
                .into_iter()
                .enumerate()
                .map(move |(i, (species, p))| (index * 1000 + i / size, species, p))
        })
        .collect();

    for (i, (ma, sa, pa)) in atoms.iter().enumerate() {
        for (mb, sb, pb) in atoms.iter().skip(i) {
            // Atoms of one molecule keep their bonded offsets, so only copies in other cells count
            let distance = if ma == mb {
                structure.lattice.separation(pa, pb, false)
            } else {
                structure.lattice.distance(pa, pb)
            };
            assert!(distance >= tolerance.min_separation(sa, sb) - 1e-8);
        }
    }
}

#[test]
fn carbon_dioxide_general_position() {
    let group = get_group(GroupName::P2_12_12_1).unwrap();
    let generator = BuildGenerator::default()
        .molecular(&group, vec![molecule(MoleculeName::CO2)], &[4])
        .unwrap();
    let tolerance = TolMatrix::new(Prototype::Molecular);

    let structures = generate_all(&generator, 10);
    assert!(!structures.is_empty());
    for structure in structures.iter() {
        assert_eq!(structure.composition(), vec![4]);
        assert_eq!(structure.total_atoms(), 12);
        assert_eq!(structure.formula(), "(CO2)4");
        check_intermolecular(structure, &tolerance);
    }
}

#[test]
fn two_molecule_types() {
    let group = get_group(GroupName::P2).unwrap();
    let generator = BuildGenerator::default()
        .factor(1.5)
        .molecular(
            &group,
            vec![molecule(MoleculeName::H2O), molecule(MoleculeName::CH4)],
            &[2, 2],
        )
        .unwrap();
    let tolerance = TolMatrix::new(Prototype::Molecular);

    let structures = generate_all(&generator, 10);
    assert!(!structures.is_empty());
    for structure in structures.iter() {
        assert_eq!(structure.composition(), vec![2, 2]);
        check_intermolecular(structure, &tolerance);
    }
}

#[test]
fn carbon_dioxide_cluster() {
    let group = get_group(GroupName::C2).unwrap();
    let generator = BuildGenerator::default()
        .molecular(&group, vec![molecule(MoleculeName::CO2)], &[2])
        .unwrap();
    let tolerance = TolMatrix::cluster(Prototype::Molecular);
    assert_eq!(
        generator.tolerance().min_separation("C", "O"),
        tolerance.min_separation("C", "O")
    );

    let structures = generate_all(&generator, 10);
    assert!(!structures.is_empty());
    for structure in structures.iter() {
        assert_eq!(structure.composition(), vec![2]);
        check_intermolecular(structure, &tolerance);
    }
}

#[test]
fn polar_molecule_excluded_from_inversion_centres() {
    let group = get_group(GroupName::P2_m).unwrap();
    let result =
        BuildGenerator::default().molecular(&group, vec![molecule(MoleculeName::H2O)], &[1]);
    assert!(matches!(result, Err(Error::Incompatible { .. })));

    // Nitrogen is centrosymmetric, so it can sit on an inversion centre
    let generator = BuildGenerator::default()
        .molecular(&group, vec![molecule(MoleculeName::N2)], &[1])
        .unwrap();
    assert!(!generator.compatibility().has_freedom);
}

#[test]
fn user_molecule_from_json() {
    let json = r#"{
        "name": "HCl",
        "atoms": [
            {"species": "H", "position": [0.0, 0.0, 1.27]},
            {"species": "Cl", "position": [0.0, 0.0, 0.0]}
        ]
    }"#;
    let hcl = Arc::new(Molecule::from_json(json).unwrap());
    assert_eq!(hcl.len(), 2);

    let group = get_group(GroupName::P1).unwrap();
    let generator = BuildGenerator::default()
        .molecular(&group, vec![hcl], &[2])
        .unwrap();
    let structures = generate_all(&generator, 10);
    assert!(!structures.is_empty());
    for structure in structures.iter() {
        assert_eq!(structure.composition(), vec![2]);
        check_intermolecular(structure, &TolMatrix::new(Prototype::Molecular));
    }
}

#[test]
fn serialised_structure() {
    let group = get_group(GroupName::P1).unwrap();
    let generator = BuildGenerator::default()
        .molecular(&group, vec![molecule(MoleculeName::N2)], &[1])
        .unwrap();
    let structure = generate_all(&generator, 10)
        .into_iter()
        .next()
        .expect("No structure generated");
    let json = serde_json::to_string(&structure).unwrap();
    let back: Structure<MolSite> = serde_json::from_str(&json).unwrap();
    assert_eq!(back.sites.len(), 1);
    assert_eq!(back.sites[0].molecule.name, "N2");
}
