//! Minimal CLI driving one backtest run of [`SmaCrossover`] against a
//! secmaster catalog.
//!
//! Usage: `run-backtest <catalog.db> [runs.db]`

use std::path::PathBuf;
use tidemark_core::model::BarPeriod;
use tidemark_strategy::Strategy;
use tidemark_trader::strategies::SmaCrossover;
use tidemark_trader::{Orchestrator, OrchestratorConfig};

fn main() {
    tracing_subscriber::fmt::init();

    let mut args = std::env::args().skip(1);
    let catalog_path = match args.next() {
        Some(path) => PathBuf::from(path),
        None => {
            eprintln!("usage: run-backtest <catalog.db> [runs.db]");
            std::process::exit(2);
        }
    };
    let runs_db_path = args.next().map(PathBuf::from).unwrap_or_else(|| PathBuf::from("runs.db"));

    let strategy: Box<dyn Strategy> = Box::new(SmaCrossover::new(vec!["AAPL".into()], BarPeriod::Minute));
    let config = OrchestratorConfig { catalog_path, runs_db_path, ..Default::default() };
    let mut orchestrator = Orchestrator::new(vec![strategy], config);

    if let Err(err) = orchestrator.run() {
        tracing::error!(%err, "backtest run failed");
        std::process::exit(1);
    }
}
