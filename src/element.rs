//
// element.rs
// Copyright (C) 2019 Malcolm Ramsay <malramsay64@gmail.com>
// Distributed under terms of the MIT license.
//

use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// The size of a chemical element
///
/// Radii are in Angstroms, covalent radii from Cordero et al. (2008) and van der Waals radii from
/// Bondi (1964) where available.
///
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Element {
    pub symbol: &'static str,
    pub number: u8,
    pub covalent_radius: f64,
    pub vdw_radius: f64,
}

#[rustfmt::skip]
static ELEMENTS: &[Element] = &[
    Element { symbol: "H", number: 1, covalent_radius: 0.31, vdw_radius: 1.20 },
    Element { symbol: "He", number: 2, covalent_radius: 0.28, vdw_radius: 1.40 },
    Element { symbol: "Li", number: 3, covalent_radius: 1.28, vdw_radius: 1.82 },
    Element { symbol: "Be", number: 4, covalent_radius: 0.96, vdw_radius: 1.53 },
    Element { symbol: "B", number: 5, covalent_radius: 0.84, vdw_radius: 1.92 },
    Element { symbol: "C", number: 6, covalent_radius: 0.76, vdw_radius: 1.70 },
    Element { symbol: "N", number: 7, covalent_radius: 0.71, vdw_radius: 1.55 },
    Element { symbol: "O", number: 8, covalent_radius: 0.66, vdw_radius: 1.52 },
    Element { symbol: "F", number: 9, covalent_radius: 0.57, vdw_radius: 1.47 },
    Element { symbol: "Ne", number: 10, covalent_radius: 0.58, vdw_radius: 1.54 },
    Element { symbol: "Na", number: 11, covalent_radius: 1.66, vdw_radius: 2.27 },
    Element { symbol: "Mg", number: 12, covalent_radius: 1.41, vdw_radius: 1.73 },
    Element { symbol: "Al", number: 13, covalent_radius: 1.21, vdw_radius: 1.84 },
    Element { symbol: "Si", number: 14, covalent_radius: 1.11, vdw_radius: 2.10 },
    Element { symbol: "P", number: 15, covalent_radius: 1.07, vdw_radius: 1.80 },
    Element { symbol: "S", number: 16, covalent_radius: 1.05, vdw_radius: 1.80 },
    Element { symbol: "Cl", number: 17, covalent_radius: 1.02, vdw_radius: 1.75 },
    Element { symbol: "Ar", number: 18, covalent_radius: 1.06, vdw_radius: 1.88 },
    Element { symbol: "K", number: 19, covalent_radius: 2.03, vdw_radius: 2.75 },
    Element { symbol: "Ca", number: 20, covalent_radius: 1.76, vdw_radius: 2.31 },
    Element { symbol: "Ti", number: 22, covalent_radius: 1.60, vdw_radius: 2.11 },
    Element { symbol: "V", number: 23, covalent_radius: 1.53, vdw_radius: 2.07 },
    Element { symbol: "Cr", number: 24, covalent_radius: 1.39, vdw_radius: 2.06 },
    Element { symbol: "Mn", number: 25, covalent_radius: 1.39, vdw_radius: 2.05 },
    Element { symbol: "Fe", number: 26, covalent_radius: 1.32, vdw_radius: 2.04 },
    Element { symbol: "Co", number: 27, covalent_radius: 1.26, vdw_radius: 2.00 },
    Element { symbol: "Ni", number: 28, covalent_radius: 1.24, vdw_radius: 1.63 },
    Element { symbol: "Cu", number: 29, covalent_radius: 1.32, vdw_radius: 1.40 },
    Element { symbol: "Zn", number: 30, covalent_radius: 1.22, vdw_radius: 1.39 },
    Element { symbol: "Ga", number: 31, covalent_radius: 1.22, vdw_radius: 1.87 },
    Element { symbol: "Ge", number: 32, covalent_radius: 1.20, vdw_radius: 2.11 },
    Element { symbol: "As", number: 33, covalent_radius: 1.19, vdw_radius: 1.85 },
    Element { symbol: "Se", number: 34, covalent_radius: 1.20, vdw_radius: 1.90 },
    Element { symbol: "Br", number: 35, covalent_radius: 1.20, vdw_radius: 1.85 },
    Element { symbol: "Kr", number: 36, covalent_radius: 1.16, vdw_radius: 2.02 },
    Element { symbol: "Rb", number: 37, covalent_radius: 2.20, vdw_radius: 3.03 },
    Element { symbol: "Sr", number: 38, covalent_radius: 1.95, vdw_radius: 2.49 },
    Element { symbol: "Zr", number: 40, covalent_radius: 1.75, vdw_radius: 2.23 },
    Element { symbol: "Mo", number: 42, covalent_radius: 1.54, vdw_radius: 2.17 },
    Element { symbol: "Ag", number: 47, covalent_radius: 1.45, vdw_radius: 1.72 },
    Element { symbol: "Cd", number: 48, covalent_radius: 1.44, vdw_radius: 1.58 },
    Element { symbol: "In", number: 49, covalent_radius: 1.42, vdw_radius: 1.93 },
    Element { symbol: "Sn", number: 50, covalent_radius: 1.39, vdw_radius: 2.17 },
    Element { symbol: "Sb", number: 51, covalent_radius: 1.39, vdw_radius: 2.06 },
    Element { symbol: "Te", number: 52, covalent_radius: 1.38, vdw_radius: 2.06 },
    Element { symbol: "I", number: 53, covalent_radius: 1.39, vdw_radius: 1.98 },
    Element { symbol: "Xe", number: 54, covalent_radius: 1.40, vdw_radius: 2.16 },
    Element { symbol: "Cs", number: 55, covalent_radius: 2.44, vdw_radius: 3.43 },
    Element { symbol: "Ba", number: 56, covalent_radius: 2.15, vdw_radius: 2.68 },
    Element { symbol: "La", number: 57, covalent_radius: 2.07, vdw_radius: 2.43 },
    Element { symbol: "W", number: 74, covalent_radius: 1.62, vdw_radius: 2.18 },
    Element { symbol: "Pt", number: 78, covalent_radius: 1.36, vdw_radius: 1.75 },
    Element { symbol: "Au", number: 79, covalent_radius: 1.36, vdw_radius: 1.66 },
    Element { symbol: "Hg", number: 80, covalent_radius: 1.32, vdw_radius: 1.55 },
    Element { symbol: "Tl", number: 81, covalent_radius: 1.45, vdw_radius: 1.96 },
    Element { symbol: "Pb", number: 82, covalent_radius: 1.46, vdw_radius: 2.02 },
];

impl Element {
    pub fn from_symbol(symbol: &str) -> Result<Element> {
        let symbol = symbol.trim();
        ELEMENTS
            .iter()
            .find(|e| e.symbol == symbol)
            .copied()
            .ok_or_else(|| Error::UnknownElement(symbol.to_string()))
    }
}

impl FromStr for Element {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Element::from_symbol(s)
    }
}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.symbol)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn lookup() {
        let carbon: Element = "C".parse().unwrap();
        assert_eq!(carbon.number, 6);
        assert!(carbon.covalent_radius < carbon.vdw_radius);
        assert_eq!(Element::from_symbol(" Cl ").unwrap().symbol, "Cl");
    }

    #[test]
    fn unknown() {
        assert!(Element::from_symbol("Xx").is_err());
        assert!(Element::from_symbol("c").is_err());
    }

    #[test]
    fn table_is_ordered() {
        for pair in ELEMENTS.windows(2) {
            assert!(pair[0].number < pair[1].number);
        }
    }
}
