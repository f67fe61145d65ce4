//! The orchestrator: wires bus, recorder, broker, strategies, and
//! datafeed together and drives one backtest run start to finish.

use crate::error::OrchestratorError;
use indexmap::IndexMap;
use std::path::PathBuf;
use std::sync::Arc;
use tidemark_core::bus::EventBus;
use tidemark_core::clock::now_ns;
use tidemark_core::ids::RunId;
use tidemark_core::model::BarPeriod;
use tidemark_core::subscriber::SubscriberWorker;
use tidemark_data::{Catalog, SimulatedDatafeed};
use tidemark_execution::SimulatedBroker;
use tidemark_indicators::bar::{Close, High, Low, Open, Volume};
use tidemark_recorder::RunRecorder;
use tidemark_strategy::runtime::StrategyRuntime;
use tidemark_strategy::{OhlcvHandles, Strategy};

/// Tunables an [`Orchestrator`] needs beyond the strategy list itself.
///
/// Mirrors the class attributes the original orchestrator exposed
/// (`db_path`, `mode`, `start_date`, `end_date`), plus the commission
/// schedule the simulated broker charges.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Path to the read-only secmaster database the datafeed streams from.
    pub catalog_path: PathBuf,
    /// Path to the append-only runs database the recorder writes to.
    pub runs_db_path: PathBuf,
    pub mode: String,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub commission_per_unit: f64,
    pub minimum_commission_per_order: f64,
}

impl Default for OrchestratorConfig {
    /// Reads `DB_PATH_RUNS` / `DB_PATH_CATALOG` from the environment,
    /// falling back to `runs.db` / `secmaster.db` when unset.
    fn default() -> Self {
        let runs_db_path = std::env::var("DB_PATH_RUNS").map(PathBuf::from).unwrap_or_else(|_| PathBuf::from("runs.db"));
        let catalog_path =
            std::env::var("DB_PATH_CATALOG").map(PathBuf::from).unwrap_or_else(|_| PathBuf::from("secmaster.db"));
        Self {
            catalog_path,
            runs_db_path,
            mode: "backtest".to_string(),
            start_date: None,
            end_date: None,
            commission_per_unit: 0.0,
            minimum_commission_per_order: 0.0,
        }
    }
}

fn ohlcv_handles() -> OhlcvHandles {
    OhlcvHandles {
        open: Arc::new(Open::default()),
        high: Arc::new(High::default()),
        low: Arc::new(Low::default()),
        close: Arc::new(Close::default()),
        volume: Arc::new(Volume::default()),
    }
}

/// Owns one backtest run's lifecycle: construct every component wired to
/// a shared [`EventBus`], let the datafeed drain the catalog to
/// completion, then tear everything down in reverse order.
///
/// A strategy never touches the bus directly (see
/// [`tidemark_strategy::strategy::Strategy`]), so building a
/// heterogeneous fleet of them means holding each as
/// `StrategyRuntime<Box<dyn Strategy>>` via the blanket `Strategy` impl
/// on `Box<dyn Strategy>` — the orchestrator captures each strategy's
/// name/symbols/bar period before handing ownership to its runtime,
/// since those are needed for the run id and datafeed subscriptions but
/// the runtime's constructor consumes the strategy.
pub struct Orchestrator {
    strategies: Vec<Box<dyn Strategy>>,
    config: OrchestratorConfig,
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator").field("strategy_count", &self.strategies.len()).finish_non_exhaustive()
    }
}

impl Orchestrator {
    pub fn new(strategies: Vec<Box<dyn Strategy>>, config: OrchestratorConfig) -> Self {
        Self { strategies, config }
    }

    fn generate_run_id(&self) -> RunId {
        let timestamp = chrono::Utc::now().format("%Y-%m-%d_%H-%M-%S");
        let strategy_names: Vec<&str> = self.strategies.iter().map(|s| s.name()).collect();
        RunId::new(format!("{timestamp}_{}", strategy_names.join("_")))
    }

    fn collect_symbols(&self) -> Vec<String> {
        let mut symbols: Vec<String> = self
            .strategies
            .iter()
            .flat_map(|s| s.symbols().iter().map(|s| s.to_string()))
            .collect();
        symbols.sort();
        symbols.dedup();
        symbols
    }

    /// Run the backtest to completion, recording `"completed"` on success
    /// or `"failed"` (with the failure re-raised) on error. Every
    /// component is torn down in reverse-construction order regardless
    /// of outcome.
    pub fn run(&mut self) -> Result<(), OrchestratorError> {
        if self.strategies.is_empty() {
            return Err(OrchestratorError::NoStrategies);
        }

        let run_id = self.generate_run_id();
        let bus = EventBus::new();

        let strategy_names: Vec<&str> = self.strategies.iter().map(|s| s.name()).collect();
        let config_json = serde_json::json!({
            "mode": self.config.mode,
            "symbols": self.collect_symbols(),
            "strategies": strategy_names,
            "start_date": self.config.start_date,
            "end_date": self.config.end_date,
        });

        let recorder = RunRecorder::new(
            &self.config.runs_db_path,
            run_id.clone(),
            strategy_names.join("_"),
            Some(config_json),
            None,
            now_ns(),
        )?;
        let recorder_worker = SubscriberWorker::spawn(recorder.clone());
        let recorder_id = bus.subscribe(recorder_worker.clone(), tidemark_recorder::recorder::SUBSCRIBED_EVENT_KINDS);
        recorder_worker.register_with_bus(bus.clone(), recorder_id);

        let broker = SimulatedBroker::with_commission(
            bus.clone(),
            self.config.commission_per_unit,
            self.config.minimum_commission_per_order,
        );
        broker.connect();
        let broker_worker = SubscriberWorker::spawn(broker);
        let broker_id = bus.subscribe(broker_worker.clone(), tidemark_execution::broker::SUBSCRIBED_EVENT_KINDS);
        broker_worker.register_with_bus(bus.clone(), broker_id);

        let mut subscriptions: IndexMap<BarPeriod, Vec<smol_str::SmolStr>> = IndexMap::new();
        let mut strategy_workers = Vec::with_capacity(self.strategies.len());
        for strategy in self.strategies.drain(..) {
            let bar_period = strategy.bar_period();
            subscriptions.entry(bar_period).or_default().extend(strategy.symbols().iter().cloned());

            let runtime = StrategyRuntime::new(bus.clone(), strategy, ohlcv_handles());
            let worker = SubscriberWorker::spawn(runtime);
            let worker_id = bus.subscribe(worker.clone(), tidemark_strategy::runtime::SUBSCRIBED_EVENT_KINDS);
            worker.register_with_bus(bus.clone(), worker_id);
            strategy_workers.push(worker);
        }

        let catalog = Catalog::open(&self.config.catalog_path)?;
        let mut datafeed = SimulatedDatafeed::new(bus.clone(), catalog);
        datafeed.connect()?;
        for (bar_period, symbols) in subscriptions {
            let mut deduped = symbols;
            deduped.sort();
            deduped.dedup();
            datafeed.subscribe(deduped, bar_period);
        }

        let run_result = datafeed.wait_until_complete();
        let outcome = match &run_result {
            Ok(()) => {
                bus.wait_until_system_idle();
                recorder.update_run_status("completed", now_ns())
            }
            Err(_) => recorder.update_run_status("failed", now_ns()),
        };

        datafeed.disconnect();
        broker_worker.shutdown();
        for worker in &strategy_workers {
            worker.shutdown();
        }
        recorder_worker.shutdown();

        run_result?;
        outcome?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use smol_str::SmolStr;
    use tidemark_core::events::BarReceived;
    use tidemark_strategy::StrategyContext;

    struct NoopStrategy {
        symbols: Vec<SmolStr>,
    }

    impl Strategy for NoopStrategy {
        fn name(&self) -> &str {
            "Noop"
        }

        fn symbols(&self) -> &[SmolStr] {
            &self.symbols
        }

        fn bar_period(&self) -> BarPeriod {
            BarPeriod::Minute
        }

        fn on_bar(&mut self, _ctx: &mut StrategyContext<'_>, _event: &BarReceived) {}
    }

    fn seeded_catalog_at(path: &std::path::Path) {
        let catalog = Catalog::open(path).unwrap();
        let publisher_id = catalog.insert_publisher("DATABENTO", "XNAS.ITCH", None).unwrap();
        let instrument_id = catalog.insert_instrument(publisher_id, "AAPL").unwrap();
        catalog.insert_bar_unscaled(instrument_id, BarPeriod::Minute, 1, 10.0, 10.0, 10.0, 10.0, None).unwrap();
        catalog.insert_bar_unscaled(instrument_id, BarPeriod::Minute, 2, 10.0, 10.0, 10.0, 10.0, None).unwrap();
    }

    #[test]
    fn empty_strategy_list_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let config = OrchestratorConfig {
            catalog_path: dir.path().join("catalog.db"),
            runs_db_path: dir.path().join("runs.db"),
            ..Default::default()
        };
        let mut orchestrator = Orchestrator::new(Vec::new(), config);
        assert!(matches!(orchestrator.run(), Err(OrchestratorError::NoStrategies)));
    }

    #[test]
    fn a_full_run_completes_and_marks_the_run_row_completed() {
        let dir = tempfile::tempdir().unwrap();
        let catalog_path = dir.path().join("catalog.db");
        seeded_catalog_at(&catalog_path);

        let runs_db_path = dir.path().join("runs.db");
        let config = OrchestratorConfig { catalog_path, runs_db_path: runs_db_path.clone(), ..Default::default() };

        let strategy: Box<dyn Strategy> = Box::new(NoopStrategy { symbols: vec!["AAPL".into()] });
        let mut orchestrator = Orchestrator::new(vec![strategy], config);
        orchestrator.run().unwrap();

        let conn = rusqlite::Connection::open(&runs_db_path).unwrap();
        let status: String = conn.query_row("SELECT status FROM runs LIMIT 1", [], |row| row.get(0)).unwrap();
        assert_eq!(status, "completed");
    }
}
