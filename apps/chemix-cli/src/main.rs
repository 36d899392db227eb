use anyhow::{Context, Result};
use chemix_catalog::ReagentCatalog;
use chemix_common::FixedPoint2;
use chemix_kernel::Solution;
use chemix_persist::SolutionStore;
use chemix_tools::SolutionInspector;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "chemix-cli", about = "CLI tool for reagent mixtures")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print version and crate info
    Info,
    /// List the reagents of a catalog
    Catalog {
        /// Catalog file (.json, .yml, .yaml); the stock catalog when omitted
        #[arg(short, long)]
        path: Option<PathBuf>,
    },
    /// Build a mixture, optionally split it, and print the result
    Mix {
        /// Reagent to add as ID=QUANTITY, in order (repeatable)
        #[arg(short, long = "reagent", value_parser = parse_reagent, required = true)]
        reagents: Vec<(String, FixedPoint2)>,
        /// Temperature (kelvin) of the added reagents
        #[arg(short, long)]
        temperature: Option<f32>,
        /// Quantity to split off into a second container
        #[arg(short, long)]
        split: Option<FixedPoint2>,
        /// Catalog file; the stock catalog when omitted
        #[arg(short, long)]
        catalog: Option<PathBuf>,
        /// Store directory to save the resulting solutions into
        #[arg(long)]
        save: Option<PathBuf>,
    },
    /// Verify a store and print one of its snapshots
    Inspect {
        /// Store directory
        #[arg(short, long)]
        store: PathBuf,
        /// Snapshot index; the latest when omitted
        #[arg(short, long)]
        index: Option<u32>,
        /// Catalog file; the stock catalog when omitted
        #[arg(short, long)]
        catalog: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .init();

    match cli.command {
        Commands::Info => {
            println!("chemix-cli v{}", env!("CARGO_PKG_VERSION"));
            println!("catalog: {}", chemix_catalog::crate_info());
            println!("persist: {}", chemix_persist::crate_info());
            println!("tools: {}", chemix_tools::crate_info());
        }
        Commands::Catalog { path } => {
            let catalog = load_catalog(path.as_deref())?;
            println!("{} reagents", catalog.len());
            for proto in catalog.iter() {
                println!(
                    "{:<16} {:<16} c={:<6.2} {}",
                    proto.id,
                    proto.display_name(),
                    proto.specific_heat,
                    proto.color
                );
            }
        }
        Commands::Mix {
            reagents,
            temperature,
            split,
            catalog,
            save,
        } => {
            let catalog = load_catalog(catalog.as_deref())?;
            let mut solution = Solution::new();
            for (id, quantity) in &reagents {
                if !catalog.contains(id) {
                    tracing::warn!(reagent = %id, "reagent not in catalog, using placeholder properties");
                }
                solution.add_reagent(&catalog, id, *quantity, temperature);
            }
            print_solution("mixture", &solution, &catalog);

            let extract = split.map(|quantity| {
                let extract = solution.split_solution(quantity);
                print_solution("remainder", &solution, &catalog);
                print_solution("extract", &extract, &catalog);
                extract
            });

            if let Some(dir) = save {
                let mut store = SolutionStore::open(&dir)
                    .with_context(|| format!("opening store {}", dir.display()))?;
                let index = store.save("mixture", &solution)?;
                println!("saved mixture as snapshot {index}");
                if let Some(extract) = &extract {
                    let index = store.save("extract", extract)?;
                    println!("saved extract as snapshot {index}");
                }
                tracing::info!(store = %dir.display(), "solutions saved");
            }
        }
        Commands::Inspect {
            store,
            index,
            catalog,
        } => {
            let catalog = load_catalog(catalog.as_deref())?;
            let store = SolutionStore::open(&store)
                .with_context(|| format!("opening store {}", store.display()))?;
            store.verify_integrity().context("store integrity check")?;
            let snapshot = match index {
                Some(index) => store.load_snapshot(index)?,
                None => store.load_latest()?,
            };
            println!(
                "store: {} snapshots, integrity OK",
                store.meta().snapshot_count
            );
            print_solution(&snapshot.label, &snapshot.solution, &catalog);
        }
    }

    Ok(())
}

fn load_catalog(path: Option<&Path>) -> Result<ReagentCatalog> {
    match path {
        Some(path) => ReagentCatalog::load(path)
            .with_context(|| format!("loading catalog {}", path.display())),
        None => Ok(ReagentCatalog::with_defaults()),
    }
}

fn print_solution(title: &str, solution: &Solution, catalog: &ReagentCatalog) {
    println!("== {title}");
    println!("{}", SolutionInspector::summary(solution, catalog));
    for row in SolutionInspector::breakdown(solution, catalog) {
        println!("  {row}");
    }
}

fn parse_reagent(arg: &str) -> Result<(String, FixedPoint2), String> {
    let (id, quantity) = arg
        .split_once('=')
        .ok_or_else(|| format!("expected ID=QUANTITY, got {arg:?}"))?;
    let id = id.trim();
    if id.is_empty() {
        return Err(format!("missing reagent id in {arg:?}"));
    }
    let quantity: FixedPoint2 = quantity.parse().map_err(|e| format!("{e}"))?;
    Ok((id.to_string(), quantity))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parse_reagent_pairs() {
        assert_eq!(
            parse_reagent("water=10").unwrap(),
            ("water".to_string(), FixedPoint2::from_int(10))
        );
        assert_eq!(parse_reagent(" iron = 2.5").unwrap().1, FixedPoint2::new(2.5));
        assert!(parse_reagent("water").is_err());
        assert!(parse_reagent("=3").is_err());
        assert!(parse_reagent("water=lots").is_err());
    }

    #[test]
    fn mix_arguments_parse() {
        let cli = Cli::try_parse_from([
            "chemix-cli",
            "mix",
            "-r",
            "water=10",
            "-r",
            "iron=5",
            "--split",
            "6",
        ])
        .unwrap();
        match cli.command {
            Commands::Mix {
                reagents, split, ..
            } => {
                assert_eq!(reagents.len(), 2);
                assert_eq!(split, Some(FixedPoint2::from_int(6)));
            }
            _ => panic!("expected mix command"),
        }
    }
}
