use clap::Parser;
use indices::{CardDistribution, CardDistributionTable, CountRange, Rule};
use indices_drivers::{
    estimate_card_distributions, parse_config_from_file, render_report, resolve_config_path,
};
use log::info;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::error::Error;
use std::fs;
use std::path::PathBuf;

const DEFAULT_CONFIG_PATH: &str = "~/.indices.yml";

#[derive(Debug, Parser)]
#[command(author, about, long_about = None)]
struct CommandLineArgs {
    /// The path of the config file
    #[arg(short, long, default_value_t = String::from(DEFAULT_CONFIG_PATH))]
    config: String,

    /// Samples per count bucket, overriding the config file
    #[arg(short, long)]
    trials: Option<u64>,

    /// Write the report to this file instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Skip sampling and use the full-shoe composition in every bucket
    #[arg(long)]
    flat: bool,
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = CommandLineArgs::parse();
    let config_path = resolve_config_path(&args.config)?;
    let mut config = parse_config_from_file(&config_path)?;
    if let Some(trials) = args.trials {
        config.sampler.trials = trials;
    }
    info!("loaded config from {}", config_path.display());

    let rule: Rule = config.rule.clone().try_into()?;
    let cards = if args.flat {
        config.sampler.validate()?;
        CardDistributionTable::flat(
            CountRange::symmetric(config.sampler.count_cap),
            CardDistribution::for_game(rule.game, config.sampler.number_of_decks),
        )?
    } else {
        let mut rng = match config.sampler.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        estimate_card_distributions(rule.game, &config.sampler, &mut rng)?
    };

    let tables = indices::solve(&cards, &rule)?;
    let report = render_report(&tables, config.sampler.buckets_per_count)?;

    match args.output {
        Some(path) => {
            fs::write(&path, report)?;
            info!("wrote report to {}", path.display());
        }
        None => print!("{}", report),
    }
    Ok(())
}
