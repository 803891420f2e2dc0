// src/main.rs - CLI entry point

use anyhow::{bail, Context, Result};
use clap::Parser;
use log::info;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::sync::Arc;

use tabsim::cli::{Cli, Commands};
use tabsim::config;
use tabsim::report;
use tabsim::scheduler::Scheduler;

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let mut cfg = config::load(&cli.config)?;

    match cli.command {
        Commands::Run {
            algorithm,
            seed,
            json,
            events,
            dump_tree,
        } => {
            if let Some(a) = algorithm {
                cfg.consensus.algorithm = a.parse().map_err(anyhow::Error::msg)?;
            }
            if let Some(s) = seed {
                cfg.sim.seed = s;
            }

            let cfg = Arc::new(cfg);
            let mut scheduler = Scheduler::new(cfg.clone())?;

            let mut event_sink = match &events {
                Some(path) => Some(BufWriter::new(
                    File::create(path).with_context(|| format!("creating {}", path))?,
                )),
                None => None,
            };
            let mut sink_err = None;
            scheduler.run(|event| {
                if let Some(out) = event_sink.as_mut() {
                    let line = serde_json::to_string(event).expect("serializable event");
                    if let Err(e) = writeln!(out, "{}", line) {
                        sink_err.get_or_insert(e);
                    }
                }
            });
            if let Some(e) = sink_err {
                return Err(e).context("writing head events");
            }

            info!("RESULTS algorithm={}", cfg.consensus.algorithm);
            for miner in scheduler.miners() {
                let summary = report::summarize(miner, &cfg);
                if json {
                    println!("{}", serde_json::to_string(&summary)?);
                } else {
                    println!("{}\n", summary);
                }
            }

            if let Some(i) = dump_tree {
                match scheduler.miners().get(i) {
                    Some(m) => print!("{}", m.tree),
                    None => bail!("no miner at index {}", i),
                }
            }
        }
    }

    Ok(())
}
