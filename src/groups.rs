//
// groups.rs
// Copyright (C) 2019 Malcolm Ramsay <malramsay64@gmail.com>
// Distributed under terms of the MIT license.
//

use clap::arg_enum;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::lattice::LatticeType;
use crate::wyckoff::Group;

arg_enum! {
    #[allow(non_camel_case_types)]
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
    pub enum GroupName {
        P1,
        Pbar1,
        P2,
        Pm,
        P2_m,
        P222,
        P2_12_12_1,
        P4,
        P6,
        layer_p1,
        layer_pbar1,
        rod_p1,
        C1,
        Ci,
        C2,
        C2v,
    }
}

/// The table of Wyckoff positions for each of the built-in groups
///
/// Bulk groups are listed with the ITA numbering, layer and rod groups with the numbering of their
/// own tables and point groups with 0.
///
pub fn get_group(name: GroupName) -> Result<Group> {
    match name {
        GroupName::P1 => Group::new("P1", 1, LatticeType::Triclinic, 3, vec![('a', vec!["x,y,z"])]),
        GroupName::Pbar1 => Group::new(
            "P-1",
            2,
            LatticeType::Triclinic,
            3,
            vec![
                ('i', vec!["x,y,z", "-x,-y,-z"]),
                ('h', vec!["1/2,1/2,1/2"]),
                ('g', vec!["0,1/2,1/2"]),
                ('f', vec!["1/2,0,1/2"]),
                ('e', vec!["1/2,1/2,0"]),
                ('d', vec!["1/2,0,0"]),
                ('c', vec!["0,1/2,0"]),
                ('b', vec!["0,0,1/2"]),
                ('a', vec!["0,0,0"]),
            ],
        ),
        GroupName::P2 => Group::new(
            "P2",
            3,
            LatticeType::Monoclinic,
            3,
            vec![
                ('e', vec!["x,y,z", "-x,y,-z"]),
                ('d', vec!["1/2,y,1/2"]),
                ('c', vec!["1/2,y,0"]),
                ('b', vec!["0,y,1/2"]),
                ('a', vec!["0,y,0"]),
            ],
        ),
        GroupName::Pm => Group::new(
            "Pm",
            6,
            LatticeType::Monoclinic,
            3,
            vec![
                ('c', vec!["x,y,z", "x,-y,z"]),
                ('b', vec!["x,1/2,z"]),
                ('a', vec!["x,0,z"]),
            ],
        ),
        GroupName::P2_m => Group::new(
            "P2/m",
            10,
            LatticeType::Monoclinic,
            3,
            vec![
                ('o', vec!["x,y,z", "-x,y,-z", "-x,-y,-z", "x,-y,z"]),
                ('n', vec!["x,1/2,z", "-x,1/2,-z"]),
                ('m', vec!["x,0,z", "-x,0,-z"]),
                ('l', vec!["1/2,y,1/2", "1/2,-y,1/2"]),
                ('k', vec!["0,y,1/2", "0,-y,1/2"]),
                ('j', vec!["1/2,y,0", "1/2,-y,0"]),
                ('i', vec!["0,y,0", "0,-y,0"]),
                ('h', vec!["1/2,1/2,1/2"]),
                ('g', vec!["1/2,0,1/2"]),
                ('f', vec!["0,1/2,1/2"]),
                ('e', vec!["1/2,1/2,0"]),
                ('d', vec!["1/2,0,0"]),
                ('c', vec!["0,0,1/2"]),
                ('b', vec!["0,1/2,0"]),
                ('a', vec!["0,0,0"]),
            ],
        ),
        GroupName::P222 => Group::new(
            "P222",
            16,
            LatticeType::Orthorhombic,
            3,
            vec![
                ('u', vec!["x,y,z", "-x,-y,z", "-x,y,-z", "x,-y,-z"]),
                ('t', vec!["1/2,1/2,z", "1/2,1/2,-z"]),
                ('s', vec!["0,1/2,z", "0,1/2,-z"]),
                ('r', vec!["1/2,0,z", "1/2,0,-z"]),
                ('q', vec!["0,0,z", "0,0,-z"]),
                ('p', vec!["1/2,y,1/2", "1/2,-y,1/2"]),
                ('o', vec!["1/2,y,0", "1/2,-y,0"]),
                ('n', vec!["0,y,1/2", "0,-y,1/2"]),
                ('m', vec!["0,y,0", "0,-y,0"]),
                ('l', vec!["x,1/2,1/2", "-x,1/2,1/2"]),
                ('k', vec!["x,1/2,0", "-x,1/2,0"]),
                ('j', vec!["x,0,1/2", "-x,0,1/2"]),
                ('i', vec!["x,0,0", "-x,0,0"]),
                ('h', vec!["1/2,1/2,1/2"]),
                ('g', vec!["0,1/2,1/2"]),
                ('f', vec!["1/2,0,1/2"]),
                ('e', vec!["1/2,1/2,0"]),
                ('d', vec!["0,0,1/2"]),
                ('c', vec!["0,1/2,0"]),
                ('b', vec!["1/2,0,0"]),
                ('a', vec!["0,0,0"]),
            ],
        ),
        GroupName::P2_12_12_1 => Group::new(
            "P2_12_12_1",
            19,
            LatticeType::Orthorhombic,
            3,
            vec![(
                'a',
                vec![
                    "x,y,z",
                    "-x+1/2,-y,z+1/2",
                    "-x,y+1/2,-z+1/2",
                    "x+1/2,-y+1/2,-z",
                ],
            )],
        ),
        GroupName::P4 => Group::new(
            "P4",
            75,
            LatticeType::Tetragonal,
            3,
            vec![
                ('d', vec!["x,y,z", "-x,-y,z", "-y,x,z", "y,-x,z"]),
                ('c', vec!["0,1/2,z", "1/2,0,z"]),
                ('b', vec!["1/2,1/2,z"]),
                ('a', vec!["0,0,z"]),
            ],
        ),
        GroupName::P6 => Group::new(
            "P6",
            168,
            LatticeType::Hexagonal,
            3,
            vec![
                (
                    'd',
                    vec![
                        "x,y,z",
                        "-y,x-y,z",
                        "-x+y,-x,z",
                        "-x,-y,z",
                        "y,-x+y,z",
                        "x-y,x,z",
                    ],
                ),
                ('c', vec!["1/2,0,z", "0,1/2,z", "1/2,1/2,z"]),
                ('b', vec!["1/3,2/3,z", "2/3,1/3,z"]),
                ('a', vec!["0,0,z"]),
            ],
        ),
        GroupName::layer_p1 => {
            Group::new("p1", 1, LatticeType::Triclinic, 2, vec![('a', vec!["x,y,z"])])
        }
        GroupName::layer_pbar1 => Group::new(
            "p-1",
            2,
            LatticeType::Triclinic,
            2,
            vec![
                ('e', vec!["x,y,z", "-x,-y,-z"]),
                ('d', vec!["1/2,1/2,0"]),
                ('c', vec!["1/2,0,0"]),
                ('b', vec!["0,1/2,0"]),
                ('a', vec!["0,0,0"]),
            ],
        ),
        GroupName::rod_p1 => {
            Group::new("p1", 1, LatticeType::Triclinic, 1, vec![('a', vec!["x,y,z"])])
        }
        GroupName::C1 => Group::new("C1", 0, LatticeType::Spherical, 0, vec![('a', vec!["x,y,z"])]),
        GroupName::Ci => Group::new(
            "Ci",
            0,
            LatticeType::Spherical,
            0,
            vec![('b', vec!["x,y,z", "-x,-y,-z"]), ('a', vec!["0,0,0"])],
        ),
        GroupName::C2 => Group::new(
            "C2",
            0,
            LatticeType::Spherical,
            0,
            vec![('b', vec!["x,y,z", "-x,-y,z"]), ('a', vec!["0,0,z"])],
        ),
        GroupName::C2v => Group::new(
            "C2v",
            0,
            LatticeType::Spherical,
            0,
            vec![
                ('d', vec!["x,y,z", "-x,-y,z", "x,-y,z", "-x,y,z"]),
                ('c', vec!["0,y,z", "0,-y,z"]),
                ('b', vec!["x,0,z", "-x,0,z"]),
                ('a', vec!["0,0,z"]),
            ],
        ),
    }
}
