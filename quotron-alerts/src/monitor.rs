//! Baseline price monitor (spec.md §4.8): establishes a per-symbol baseline,
//! re-fetches on a tick, and emits an [`Alert`] when the move exceeds a
//! threshold, resetting the baseline on trigger.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use quotron::FailoverChain;
use quotron_core::{QuotronError, StreamBus, StreamName, TaskHandle};
use quotron_types::{Alert, AlertDirection};
use rust_decimal::Decimal;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

/// Add or remove a watched symbol, applied atomically on the monitor's
/// single-writer loop (spec.md §5: no lock, channel hand-off).
#[derive(Debug, Clone)]
pub enum Command {
    /// Start watching a symbol; its baseline is established on the next tick.
    AddSymbol(String),
    /// Stop watching a symbol, dropping its baseline immediately.
    RemoveSymbol(String),
}

/// Tunables for one monitor instance.
pub struct MonitorConfig {
    /// Symbols watched from startup.
    pub symbols: Vec<String>,
    /// Percent move (absolute) that triggers an alert.
    pub threshold_percent: Decimal,
    /// How often the watch list is re-fetched.
    pub tick_interval: Duration,
}

/// A `(sender, handle)` pair: send [`Command`]s on the sender, wait on the
/// handle for graceful shutdown.
pub struct Monitor {
    commands: mpsc::UnboundedSender<Command>,
    handle: TaskHandle,
}

impl Monitor {
    /// Send a command to the running monitor loop.
    ///
    /// # Errors
    /// Returns an error if the monitor loop has already stopped.
    pub fn send(&self, command: Command) -> Result<(), QuotronError> {
        self.commands
            .send(command)
            .map_err(|_| QuotronError::Other("alert monitor loop has stopped".to_string()))
    }

    /// Request graceful shutdown and await completion.
    pub async fn stop(self) {
        self.handle.stop().await;
    }

    /// Spawn the monitor loop as a background task.
    #[must_use]
    pub fn spawn(chain: Arc<FailoverChain>, stream: Arc<dyn StreamBus>, config: MonitorConfig) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let (stop_tx, stop_rx) = oneshot::channel();

        let mut baselines = HashMap::new();
        for symbol in config.symbols {
            baselines.insert(symbol, None);
        }

        let loop_state = MonitorLoop {
            chain,
            stream,
            baselines,
            threshold_percent: config.threshold_percent,
            tick_interval: config.tick_interval,
            commands: cmd_rx,
        };

        let join = tokio::spawn(loop_state.run(stop_rx));
        Self {
            commands: cmd_tx,
            handle: TaskHandle::new(join, stop_tx),
        }
    }
}

struct MonitorLoop {
    chain: Arc<FailoverChain>,
    stream: Arc<dyn StreamBus>,
    /// `None` means the baseline still needs to be established.
    baselines: HashMap<String, Option<Decimal>>,
    threshold_percent: Decimal,
    tick_interval: Duration,
    commands: mpsc::UnboundedReceiver<Command>,
}

impl MonitorLoop {
    async fn run(mut self, mut stop_rx: oneshot::Receiver<()>) {
        let mut interval = tokio::time::interval(self.tick_interval);
        interval.tick().await; // first tick fires immediately; consume it up front

        loop {
            tokio::select! {
                _ = interval.tick() => self.tick().await,
                cmd = self.commands.recv() => match cmd {
                    Some(c) => self.apply(c),
                    None => break,
                },
                _ = &mut stop_rx => break,
            }
        }
    }

    fn apply(&mut self, command: Command) {
        match command {
            Command::AddSymbol(symbol) => {
                self.baselines.entry(symbol).or_insert(None);
            }
            Command::RemoveSymbol(symbol) => {
                self.baselines.remove(&symbol);
            }
        }
    }

    async fn tick(&mut self) {
        let symbols: Vec<String> = self.baselines.keys().cloned().collect();
        for symbol in symbols {
            let quote = match self.chain.get_stock_quote(&symbol).await {
                Ok(q) => q,
                Err(err) => {
                    warn!(symbol, error = %err, "alert monitor fetch failed");
                    continue;
                }
            };

            let Some(baseline) = self.baselines.get(&symbol).copied().flatten() else {
                debug!(symbol, price = %quote.price, "baseline established");
                self.baselines.insert(symbol, Some(quote.price));
                continue;
            };

            if baseline.is_zero() {
                continue;
            }
            let percent_change = (quote.price - baseline) / baseline * Decimal::ONE_HUNDRED;
            if percent_change.abs() < self.threshold_percent {
                continue;
            }

            let direction = if quote.price >= baseline {
                AlertDirection::Increased
            } else {
                AlertDirection::Decreased
            };
            let alert = Alert {
                symbol: symbol.clone(),
                price: quote.price,
                previous_price: baseline,
                percent_change,
                volume: quote.volume,
                timestamp: quote.timestamp,
                direction,
            };

            match serde_json::to_string(&alert) {
                Ok(payload) => {
                    if let Err(e) = self.stream.publish(StreamName::Alerts, payload).await {
                        warn!(symbol, error = %e, "failed to publish alert");
                    } else {
                        info!(symbol, percent_change = %percent_change, "alert emitted");
                    }
                }
                Err(e) => warn!(symbol, error = %e, "failed to serialize alert"),
            }

            self.baselines.insert(symbol, Some(quote.price));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quotron_mock::{Canned, MockProvider};

    fn chain_with(price: &str) -> Arc<FailoverChain> {
        let provider = MockProvider::always_ok("mock").with_override(
            "AAPL",
            Canned::Price(price.parse().unwrap()),
        );
        Arc::new(FailoverChain::new(vec![Arc::new(provider)]))
    }

    #[tokio::test]
    async fn first_tick_establishes_baseline_without_alerting() {
        let chain = chain_with("100.00");
        let bus: Arc<dyn StreamBus> = Arc::new(quotron_mock::FakeStreamBus::default());
        let mut state = MonitorLoop {
            chain,
            stream: Arc::clone(&bus),
            baselines: HashMap::from([("AAPL".to_string(), None)]),
            threshold_percent: Decimal::new(500, 2),
            tick_interval: Duration::from_secs(60),
            commands: mpsc::unbounded_channel().1,
        };
        state.tick().await;
        assert_eq!(state.baselines["AAPL"], Some("100.00".parse().unwrap()));
        assert_eq!(bus.len(StreamName::Alerts).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn move_past_threshold_emits_alert_and_resets_baseline() {
        let chain = chain_with("110.00");
        let bus: Arc<dyn StreamBus> = Arc::new(quotron_mock::FakeStreamBus::default());
        let mut state = MonitorLoop {
            chain,
            stream: Arc::clone(&bus),
            baselines: HashMap::from([("AAPL".to_string(), Some("100.00".parse().unwrap()))]),
            threshold_percent: Decimal::new(500, 2),
            tick_interval: Duration::from_secs(60),
            commands: mpsc::unbounded_channel().1,
        };
        state.tick().await;
        assert_eq!(state.baselines["AAPL"], Some("110.00".parse().unwrap()));
        assert_eq!(bus.len(StreamName::Alerts).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn move_within_threshold_does_not_alert() {
        let chain = chain_with("101.00");
        let bus: Arc<dyn StreamBus> = Arc::new(quotron_mock::FakeStreamBus::default());
        let mut state = MonitorLoop {
            chain,
            stream: Arc::clone(&bus),
            baselines: HashMap::from([("AAPL".to_string(), Some("100.00".parse().unwrap()))]),
            threshold_percent: Decimal::new(500, 2),
            tick_interval: Duration::from_secs(60),
            commands: mpsc::unbounded_channel().1,
        };
        state.tick().await;
        assert_eq!(state.baselines["AAPL"], Some("100.00".parse().unwrap()));
        assert_eq!(bus.len(StreamName::Alerts).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn remove_command_drops_baseline() {
        let chain = chain_with("100.00");
        let mut state = MonitorLoop {
            chain,
            stream: Arc::new(quotron_mock::FakeStreamBus::default()),
            baselines: HashMap::from([("AAPL".to_string(), Some("100.00".parse().unwrap()))]),
            threshold_percent: Decimal::new(500, 2),
            tick_interval: Duration::from_secs(60),
            commands: mpsc::unbounded_channel().1,
        };
        state.apply(Command::RemoveSymbol("AAPL".to_string()));
        assert!(!state.baselines.contains_key("AAPL"));
    }
}
