//
// main.rs
// Copyright (C) 2019 Malcolm Ramsay <malramsay64@gmail.com>
// Distributed under terms of the MIT license.
//

use std::fs::File;
use std::io::prelude::*;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Error};
use log::{debug, info, LevelFilter};
use rand::prelude::*;
use rand_pcg::Pcg64Mcg;
use rayon::prelude::*;
use structopt::StructOpt;

use crystal_generator::{
    get_group, BuildGenerator, Entity, Generator, GroupName, Molecule, MoleculeName, Structure,
};

#[derive(Debug, StructOpt)]
#[structopt(name = "crystal-gen")]
struct Args {
    /// Pass many times for more log output
    ///
    /// By default, it'll only report info. Passing `-v` one time also prints
    /// debug messages and `-vv` enables trace logging.
    #[structopt(long, short, parse(from_occurrences))]
    verbosity: u8,

    /// The symmetry group of the structure
    #[structopt(possible_values = &GroupName::variants(), case_insensitive = true)]
    group: GroupName,

    #[structopt(subcommand)]
    entities: Entities,

    /// The ratio of the cell volume to the volume of the entities within it
    #[structopt(long, default_value = "1.1")]
    factor: f64,

    /// Wyckoff positions for each entity type as comma separated labels, like `4a,2b`. An empty
    /// value leaves the positions of that type to be chosen at random.
    #[structopt(long, number_of_values = 1)]
    sites: Vec<String>,

    /// The thickness of the cell along the non-periodic axis of a layer
    #[structopt(long)]
    thickness: Option<f64>,

    /// The cross-sectional area of the cell for a rod
    #[structopt(long)]
    area: Option<f64>,

    /// Counts are given for the primitive cell rather than the conventional cell
    #[structopt(long)]
    primitive: bool,

    /// The seed of the first run, each subsequent run increments the seed by one
    #[structopt(long)]
    seed: Option<u64>,

    /// The number of independent generation runs
    #[structopt(long, default_value = "1")]
    replications: u64,

    /// Where to save the generated structure
    #[structopt(long, parse(from_os_str))]
    outfile: Option<PathBuf>,
}

#[derive(Debug, StructOpt)]
enum Entities {
    #[structopt(name = "atoms")]
    Atoms {
        /// The element symbols of each type
        #[structopt(short, long, required = true)]
        species: Vec<String>,
        /// The number of atoms of each type within the cell
        #[structopt(short, long, required = true)]
        counts: Vec<usize>,
    },
    #[structopt(name = "molecules")]
    Molecules {
        /// Either the name of a built in molecule or the path to a JSON description
        #[structopt(short, long, required = true)]
        molecules: Vec<String>,
        /// The number of molecules of each type within the cell
        #[structopt(short, long, required = true)]
        counts: Vec<usize>,
        /// Only allow orientations which keep the handedness of the molecules
        #[structopt(long)]
        no_inversion: bool,
    },
}

fn load_molecule(name: &str) -> Result<Molecule, Error> {
    if let Ok(builtin) = name.parse::<MoleculeName>() {
        return Ok(Molecule::from_name(builtin)?);
    }
    let path = Path::new(name);
    if !path.exists() {
        bail!(
            "'{}' is neither a known molecule ({}) nor a file",
            name,
            MoleculeName::variants().join(", ")
        );
    }
    let mut contents = String::new();
    File::open(path)?.read_to_string(&mut contents)?;
    let molecule =
        Molecule::from_json(&contents).with_context(|| format!("Reading molecule {}", name))?;
    Ok(molecule)
}

fn parse_sites(sites: &[String]) -> Vec<Vec<String>> {
    sites
        .iter()
        .map(|s| {
            s.split(',')
                .map(str::trim)
                .filter(|l| !l.is_empty())
                .map(String::from)
                .collect()
        })
        .collect()
}

fn save_structure<S>(outfile: &Path, structure: &Structure<S>) -> Result<(), Error>
where
    S: crystal_generator::Site,
{
    let serialised = serde_json::to_string(structure)?;
    File::create(outfile.with_extension("json"))?.write_all(serialised.as_bytes())?;
    let positions = structure.as_positions()?;
    File::create(outfile.with_extension("txt"))?.write_all(positions.as_bytes())?;
    Ok(())
}

fn run<E: Entity>(generator: &Generator<E>, args: &Args) -> Result<(), Error> {
    let seed = match args.seed {
        None => Pcg64Mcg::from_entropy().gen(),
        Some(x) => x,
    };
    debug!("Base seed: {}", seed);

    let outcomes = (0..args.replications)
        .into_par_iter()
        .map(|index| {
            let mut rng = Pcg64Mcg::seed_from_u64(seed.wrapping_add(index));
            generator.generate(&mut rng)
        })
        .collect::<Vec<_>>();

    let generated = outcomes.iter().filter(|o| o.is_generated()).count();
    info!(
        "Generated structures in {} of {} runs",
        generated, args.replications
    );

    let structure = outcomes
        .into_iter()
        .find_map(|o| o.into_structure())
        .ok_or_else(|| anyhow!("No structure found in {} runs", args.replications))?;

    println!("{}", structure);

    if let Some(outfile) = &args.outfile {
        save_structure(outfile, &structure)?;
    }
    Ok(())
}

#[paw::main]
fn main(args: Args) -> Result<(), Error> {
    let log_level = match args.verbosity {
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    env_logger::Builder::new().filter_level(log_level).init();

    debug!("Logging Level: {}", log_level);

    if args.replications == 0 {
        bail!("At least one replication is required");
    }

    let group = get_group(args.group)?;
    let mut builder = BuildGenerator::default();
    builder
        .factor(args.factor)
        .conventional(!args.primitive)
        .thickness(args.thickness)
        .area(args.area);
    if !args.sites.is_empty() {
        builder.sites(parse_sites(&args.sites));
    }

    match &args.entities {
        Entities::Atoms { species, counts } => {
            let species: Vec<&str> = species.iter().map(String::as_str).collect();
            let generator = builder.atomic(&group, &species, counts)?;
            run(&generator, &args)
        }
        Entities::Molecules {
            molecules,
            counts,
            no_inversion,
        } => {
            let molecules = molecules
                .iter()
                .map(|m| load_molecule(m).map(Arc::new))
                .collect::<Result<Vec<_>, _>>()?;
            let generator = builder
                .allow_inversion(!no_inversion)
                .molecular(&group, molecules, counts)?;
            run(&generator, &args)
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn sites_split_on_commas() {
        let sites = parse_sites(&[String::from("4a, 2b"), String::new()]);
        assert_eq!(sites[0], vec!["4a", "2b"]);
        assert!(sites[1].is_empty());
    }

    #[test]
    fn builtin_molecules() {
        assert_eq!(load_molecule("H2O").unwrap().len(), 3);
        assert!(load_molecule("not-a-molecule").is_err());
    }
}
