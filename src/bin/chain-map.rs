use std::process::ExitCode;

use chain_map::compare::{HarnessConfig, DEFAULT_SEED, MAX_ITEM_COUNT};
use clap::{Parser, Subcommand};
use env_logger::Builder;
use log::{error, LevelFilter};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Time ChainedMap against hashbrown::HashMap on a seeded workload.
    Compare {
        #[arg(short, long, default_value_t = 1000)]
        item_count: usize,

        #[arg(short, long, default_value_t = DEFAULT_SEED)]
        seed: u64,
    },
    /// Walk through insert, lookup, iteration and removal.
    Demo,
}

fn initialize_logger() {
    let mut builder = Builder::new();
    builder
        .filter_level(LevelFilter::Info)
        .format_timestamp_millis()
        .parse_default_env();
    let _ = builder.try_init();
}

fn main() -> ExitCode {
    initialize_logger();
    let args = Args::parse();

    match args.command {
        Command::Compare { item_count, seed } => {
            let config = HarnessConfig {
                seed,
                max_item_count: MAX_ITEM_COUNT,
            };
            match config.compare(item_count) {
                Ok(result) => {
                    print!("{result}");
                    ExitCode::SUCCESS
                }
                Err(err) => {
                    error!("{err}");
                    ExitCode::FAILURE
                }
            }
        }
        Command::Demo => {
            println!("{}", chain_map::demo::run());
            ExitCode::SUCCESS
        }
    }
}
