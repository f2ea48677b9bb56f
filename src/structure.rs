//
// structure.rs
// Copyright (C) 2019 Malcolm Ramsay <malramsay64@gmail.com>
// Distributed under terms of the MIT license.
//

use std::fmt;
use std::fmt::Write;

use nalgebra::Point3;
use serde::{Deserialize, Serialize};

use crate::lattice::Lattice;
use crate::placement::SearchStats;
use crate::site::Site;
use crate::wyckoff::Group;

/// A complete structure, with every requested entity placed
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Structure<S> {
    pub group: Group,
    pub lattice: Lattice,
    pub sites: Vec<S>,
    pub stats: SearchStats,
}

impl<S> Structure<S> {
    pub fn new(group: Group, lattice: Lattice, sites: Vec<S>, stats: SearchStats) -> Self {
        Self {
            group,
            lattice,
            sites,
            stats,
        }
    }
}

impl<S: Site> Structure<S> {
    /// The number of each entity type in the cell, ordered by entity index
    pub fn composition(&self) -> Vec<usize> {
        let types = self.sites.iter().map(Site::entity).max().map_or(0, |m| m + 1);
        let mut counts = vec![0; types];
        for site in self.sites.iter() {
            counts[site.entity()] += site.multiplicity();
        }
        counts
    }

    /// The chemical formula of the cell, like `C4O8` or `(H2O)4`
    pub fn formula(&self) -> String {
        self.write_formula().unwrap_or_default()
    }

    fn write_formula(&self) -> Result<String, fmt::Error> {
        let composition = self.composition();
        let mut formula = String::new();
        for (index, count) in composition.iter().enumerate() {
            if let Some(site) = self.sites.iter().find(|s| s.entity() == index) {
                let species = site.species();
                let compound = species.chars().filter(|c| c.is_ascii_uppercase()).count() > 1
                    || species.chars().any(|c| c.is_ascii_digit());
                match (*count, compound) {
                    (1, _) => formula.push_str(species),
                    (n, true) => write!(&mut formula, "({}){}", species, n)?,
                    (n, false) => write!(&mut formula, "{}{}", species, n)?,
                }
            }
        }
        Ok(formula)
    }

    /// The species and fractional coordinates of every atom in the cell
    pub fn fractional_coordinates(&self) -> Vec<(&str, Point3<f64>)> {
        self.sites
            .iter()
            .flat_map(|site| site.atoms(&self.lattice))
            .collect()
    }

    /// The species and Cartesian coordinates in Angstroms of every atom in the cell
    pub fn cartesian_coordinates(&self) -> Vec<(&str, Point3<f64>)> {
        self.fractional_coordinates()
            .into_iter()
            .map(|(species, p)| (species, self.lattice.to_cartesian(&p)))
            .collect()
    }

    pub fn total_atoms(&self) -> usize {
        self.fractional_coordinates().len()
    }

    /// A plain text description of the cell and every atom within it
    pub fn as_positions(&self) -> Result<String, fmt::Error> {
        let mut output = String::new();
        writeln!(&mut output, "{}", self.lattice)?;
        writeln!(&mut output, "Positions")?;

        for (species, position) in self.cartesian_coordinates() {
            writeln!(
                &mut output,
                "{:<3} {:>12.6} {:>12.6} {:>12.6}",
                species, position.x, position.y, position.z
            )?;
        }
        Ok(output)
    }
}

impl<S: Site> fmt::Display for Structure<S> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "{} in {}", self.formula(), self.group)?;
        writeln!(f, "{}", self.lattice)?;
        for site in self.sites.iter() {
            writeln!(f, "  {}", site)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use approx::assert_abs_diff_eq;

    use super::*;
    use crate::groups::{get_group, GroupName};
    use crate::lattice::{LatticeType, Periodicity};
    use crate::site::AtomSite;

    fn structure() -> Structure<AtomSite> {
        let group = get_group(GroupName::P2).unwrap();
        let lattice = Lattice::from_parameters(
            LatticeType::Monoclinic,
            [4., 5., 6.],
            [90.; 3],
            Periodicity::bulk(),
        )
        .unwrap();
        let sites = vec![
            AtomSite {
                entity: 0,
                species: String::from("Na"),
                wyckoff: group.general_position().clone(),
                position: Point3::new(0.1, 0.2, 0.3),
            },
            AtomSite {
                entity: 1,
                species: String::from("Cl"),
                wyckoff: group.position(1).clone(),
                position: group.position(1).project(&Point3::new(0.5, 0.5, 0.5), &lattice),
            },
            AtomSite {
                entity: 1,
                species: String::from("Cl"),
                wyckoff: group.position(1).clone(),
                position: group.position(1).project(&Point3::new(0.5, 0.1, 0.5), &lattice),
            },
        ];
        Structure::new(group, lattice, sites, SearchStats::default())
    }

    #[test]
    fn composition() {
        let s = structure();
        assert_eq!(s.composition(), vec![2, 2]);
        assert_eq!(s.formula(), "Na2Cl2");
        assert_eq!(s.total_atoms(), 4);
    }

    #[test]
    fn cartesian() {
        let s = structure();
        let coords = s.cartesian_coordinates();
        assert_eq!(coords[0].0, "Na");
        assert_abs_diff_eq!(coords[0].1, Point3::new(0.4, 1.0, 1.8), epsilon = 1e-8);
    }

    #[test]
    fn positions_output() {
        let s = structure();
        let output = s.as_positions().unwrap();
        assert_eq!(output.lines().filter(|l| l.starts_with("Cl")).count(), 2);
        assert!(output.contains("Positions"));
    }

    #[test]
    fn serialise() {
        let s = structure();
        let json = serde_json::to_string(&s).unwrap();
        let back: Structure<AtomSite> = serde_json::from_str(&json).unwrap();
        assert_eq!(back.composition(), s.composition());
    }
}
