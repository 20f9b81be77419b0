//! Run loop: sample, alert, rank, render, wait.
//!
//! Cancellation is checked only between ticks, so a tick is never left half
//! finished. While waiting, a renderer can ask for a re-rank of the current
//! table without a new sample.
//!
//! Side channels hang off the loop as options: webhook posts for fired
//! alerts, CSV rows per tick, and a config watch that swaps alert settings
//! in before a tick when the file changed.

use std::fs::File;
use std::time::{Duration, Instant, SystemTime};

use anyhow::Result;
use log::{debug, info, warn};

use crate::alert::{Alert, AlertWatcher};
use crate::config::{AlertConfig, ConfigWatch};
use crate::notify::WebhookNotifier;
use crate::procfs::CounterSource;
use crate::render::{Control, CsvExporter, Renderer, Snapshot};
use crate::sampling::{Ranker, Sampler, TickSummary};
use crate::shutdown::CancellationToken;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonitorSettings {
    pub interval: Duration,
    /// Stop after this many ticks; `None` runs until cancelled
    pub iterations: Option<u64>,
}

pub struct Monitor<S, R> {
    sampler: Sampler<S>,
    ranker: Ranker,
    renderer: R,
    alerts: Option<AlertWatcher>,
    notifier: Option<WebhookNotifier>,
    export: Option<CsvExporter<File>>,
    reload: Option<Reload>,
    settings: MonitorSettings,
    cpu_count: usize,
}

struct Reload {
    watch: ConfigWatch,
    /// Alerts stay on even if the reloaded file disables them
    force_alerts: bool,
}

impl<S: CounterSource, R: Renderer> Monitor<S, R> {
    pub fn new(sampler: Sampler<S>, ranker: Ranker, renderer: R, settings: MonitorSettings) -> Self {
        let cpu_count = sampler.source().online_cpu_count();
        Self {
            sampler,
            ranker,
            renderer,
            alerts: None,
            notifier: None,
            export: None,
            reload: None,
            settings,
            cpu_count,
        }
    }

    #[must_use]
    pub fn with_alerts(mut self, watcher: AlertWatcher) -> Self {
        self.alerts = Some(watcher);
        self
    }

    /// Post every fired alert to a webhook
    #[must_use]
    pub fn with_notifier(mut self, notifier: WebhookNotifier) -> Self {
        self.notifier = Some(notifier);
        self
    }

    /// Append each tick's processes as CSV rows
    #[must_use]
    pub fn with_export(mut self, exporter: CsvExporter<File>) -> Self {
        self.export = Some(exporter);
        self
    }

    /// Re-read alert settings from the watched file when it changes.
    /// With `force_alerts`, a file that disables alerts only changes
    /// thresholds.
    #[must_use]
    pub fn with_config_watch(mut self, watch: ConfigWatch, force_alerts: bool) -> Self {
        self.reload = Some(Reload { watch, force_alerts });
        self
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn sampler(&self) -> &Sampler<S> {
        &self.sampler
    }

    /// Tick until cancelled or the iteration limit is reached.
    ///
    /// Returns the number of completed ticks.
    ///
    /// # Errors
    /// A fatal `SampleError`, or a renderer failure.
    pub fn run(&mut self, token: &CancellationToken) -> Result<u64> {
        let mut ticks = 0u64;
        while !token.is_cancelled() {
            self.reload_config();
            let started = Instant::now();
            let summary = self.sampler.tick()?;
            let fired = match &mut self.alerts {
                Some(watcher) => watcher.check(self.sampler.table(), Instant::now()),
                None => Vec::new(),
            };
            self.notify(&fired);
            self.export_tick();
            self.publish(&summary, &fired)?;
            ticks += 1;

            if self.settings.iterations.is_some_and(|limit| ticks >= limit) {
                debug!("Iteration limit reached after {ticks} ticks");
                break;
            }
            self.wait_for_next_tick(started, &summary, token)?;
        }
        info!("Monitor stopped after {ticks} ticks");
        Ok(ticks)
    }

    fn reload_config(&mut self) {
        let Some(reload) = self.reload.as_mut() else {
            return;
        };
        let force_alerts = reload.force_alerts;
        let config = match reload.watch.poll() {
            Ok(Some(config)) => config,
            Ok(None) => return,
            Err(e) => {
                warn!("Keeping previous settings: {e}");
                return;
            }
        };
        info!("Reloaded {}", reload.watch.path().display());
        self.apply_alert_config(&config.alerts, force_alerts);
    }

    fn apply_alert_config(&mut self, alerts: &AlertConfig, force_alerts: bool) {
        if alerts.enabled || force_alerts {
            let thresholds = alerts.thresholds();
            match &mut self.alerts {
                Some(watcher) => watcher.set_thresholds(thresholds),
                None => self.alerts = Some(AlertWatcher::new(thresholds)),
            }
        } else {
            self.alerts = None;
        }
        self.notifier = WebhookNotifier::from_config(alerts);
    }

    fn notify(&self, fired: &[Alert]) {
        let Some(notifier) = &self.notifier else {
            return;
        };
        for alert in fired {
            if let Err(e) = notifier.send(alert) {
                warn!("Alert for pid {} not delivered: {e}", alert.pid.0);
            }
        }
    }

    fn export_tick(&mut self) {
        let Some(exporter) = &mut self.export else {
            return;
        };
        let clock_ticks = self.sampler.source().clock_ticks_per_second();
        if let Err(e) = exporter.write_tick(SystemTime::now(), self.sampler.table(), clock_ticks) {
            warn!("{e:#}");
        }
    }

    fn wait_for_next_tick(
        &mut self,
        started: Instant,
        summary: &TickSummary,
        token: &CancellationToken,
    ) -> Result<()> {
        let deadline = started + self.settings.interval;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.renderer.wait(remaining, token)? {
                Control::Tick => return Ok(()),
                Control::Rerank(settings) => {
                    debug!("Re-ranking: {settings:?}");
                    self.ranker.apply(settings);
                    self.publish(summary, &[])?;
                }
            }
        }
    }

    fn publish(&mut self, summary: &TickSummary, alerts: &[Alert]) -> Result<()> {
        let rows = self.ranker.rank(self.sampler.table());
        let snapshot = Snapshot {
            summary,
            rows: &rows,
            order: self.ranker.order(),
            filter: self.ranker.filter(),
            tracked: self.sampler.table().len(),
            display_budget: self.ranker.display_budget(),
            clock_ticks: self.sampler.source().clock_ticks_per_second(),
            cpu_count: self.cpu_count,
            alerts,
        };
        self.renderer.render(&snapshot)?;
        self.sampler.mark_rendered();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alert::AlertThresholds;
    use crate::procfs::ProcFs;
    use crate::render::SilentRenderer;
    use crate::sampling::{RankSettings, SortColumn, SortOrder};
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    fn settings(iterations: Option<u64>) -> MonitorSettings {
        MonitorSettings { interval: Duration::from_millis(1), iterations }
    }

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    /// Proc tree with 1000 kB of memory and two processes, pid 7 holding
    /// 80% of it
    fn fake_proc() -> TempDir {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        write(root, "stat", "cpu  500 0 500 0 0 0 0 0 0 0\n");
        write(root, "meminfo", "MemTotal:       1000 kB\n");
        write(root, "loadavg", "0.10 0.20 0.30 1/50 99\n");
        write(root, "uptime", "100.00 200.00\n");
        write(root, "1/stat", "1 (init) S 0 1 1 0 -1 0 0 0 0 0 5 5 0 0 20 0 1 0 1 4096000 2\n");
        write(root, "7/stat", "7 (hog) R 1 7 7 0 -1 0 0 0 0 0 50 50 0 0 20 0 1 0 9 8192000 200\n");
        dir
    }

    fn sampler_for(dir: &TempDir) -> Sampler<ProcFs> {
        Sampler::new(ProcFs::with_root(dir.path()).page_size(4096))
    }

    #[test]
    fn test_iteration_limit() {
        let proc = fake_proc();
        let mut monitor =
            Monitor::new(sampler_for(&proc), Ranker::new(5), SilentRenderer::new(), settings(Some(3)));
        let ticks = monitor.run(&CancellationToken::new()).unwrap();
        assert_eq!(ticks, 3);
        assert_eq!(monitor.renderer().frames(), 3);
        assert_eq!(monitor.sampler().table().len(), 2);
    }

    #[test]
    fn test_cancelled_before_start_runs_no_tick() {
        let token = CancellationToken::new();
        token.cancel();
        let proc = fake_proc();
        let mut monitor =
            Monitor::new(sampler_for(&proc), Ranker::new(5), SilentRenderer::new(), settings(None));
        assert_eq!(monitor.run(&token).unwrap(), 0);
        assert_eq!(monitor.renderer().frames(), 0);
        assert!(monitor.sampler().table().is_empty());
    }

    /// Asks for one re-rank, then cancels on the following wait
    struct RerankOnce {
        waits: u32,
        orders: Vec<SortOrder>,
    }

    impl Renderer for RerankOnce {
        fn render(&mut self, snapshot: &Snapshot<'_>) -> Result<()> {
            self.orders.push(snapshot.order);
            Ok(())
        }

        fn wait(&mut self, _timeout: Duration, token: &CancellationToken) -> Result<Control> {
            self.waits += 1;
            if self.waits == 1 {
                return Ok(Control::Rerank(RankSettings {
                    order: SortOrder::descending(SortColumn::Pid),
                    filter: None,
                }));
            }
            token.cancel();
            Ok(Control::Tick)
        }
    }

    #[test]
    fn test_rerank_renders_without_new_tick() {
        let proc = fake_proc();
        let renderer = RerankOnce { waits: 0, orders: Vec::new() };
        let mut monitor = Monitor::new(sampler_for(&proc), Ranker::new(5), renderer, settings(None));

        let ticks = monitor.run(&CancellationToken::new()).unwrap();
        assert_eq!(ticks, 1);
        assert_eq!(
            monitor.renderer().orders,
            vec![SortOrder::default(), SortOrder::descending(SortColumn::Pid)]
        );
    }

    /// Records alerts per frame; rewrites the config file on the first wait
    struct EditConfigOnWait {
        config: std::path::PathBuf,
        edit: &'static str,
        alerts_per_frame: Vec<usize>,
    }

    impl Renderer for EditConfigOnWait {
        fn render(&mut self, snapshot: &Snapshot<'_>) -> Result<()> {
            self.alerts_per_frame.push(snapshot.alerts.len());
            Ok(())
        }

        fn wait(&mut self, _timeout: Duration, _token: &CancellationToken) -> Result<Control> {
            if self.alerts_per_frame.len() == 1 {
                fs::write(&self.config, self.edit).unwrap();
                File::options()
                    .write(true)
                    .open(&self.config)
                    .unwrap()
                    .set_modified(SystemTime::now() + Duration::from_secs(5))
                    .unwrap();
            }
            Ok(Control::Tick)
        }
    }

    fn run_with_edit(
        initial: &str,
        edit: &'static str,
        force_alerts: bool,
        watcher: Option<AlertWatcher>,
    ) -> Vec<usize> {
        let proc = fake_proc();
        let dir = TempDir::new().unwrap();
        let config = dir.path().join("config.json");
        fs::write(&config, initial).unwrap();

        let renderer = EditConfigOnWait { config: config.clone(), edit, alerts_per_frame: Vec::new() };
        let mut monitor = Monitor::new(sampler_for(&proc), Ranker::new(5), renderer, settings(Some(2)))
            .with_config_watch(ConfigWatch::new(&config), force_alerts);
        if let Some(watcher) = watcher {
            monitor = monitor.with_alerts(watcher);
        }
        monitor.run(&CancellationToken::new()).unwrap();
        monitor.renderer().alerts_per_frame.clone()
    }

    #[test]
    fn test_config_edit_enables_alerts_next_tick() {
        let frames = run_with_edit(
            r#"{"alerts": {"enabled": false}}"#,
            r#"{"alerts": {"enabled": true, "mem_threshold": 50}}"#,
            false,
            None,
        );
        assert_eq!(frames, vec![0, 1]);
    }

    #[test]
    fn test_config_edit_disables_alerts_unless_forced() {
        let strict =
            || Some(AlertWatcher::new(AlertThresholds { memory_percent: 99.0, ..AlertThresholds::default() }));
        let edit = r#"{"alerts": {"enabled": false, "mem_threshold": 50}}"#;

        assert_eq!(run_with_edit("{}", edit, false, strict()), vec![0, 0]);
        assert_eq!(run_with_edit("{}", edit, true, strict()), vec![0, 1]);
    }

    #[test]
    fn test_broken_config_edit_keeps_settings() {
        let watcher = AlertWatcher::new(AlertThresholds {
            memory_percent: 50.0,
            cooldown: Duration::ZERO,
            ..AlertThresholds::default()
        });
        let frames = run_with_edit("{}", "{ broken", false, Some(watcher));
        assert_eq!(frames, vec![1, 1]);
    }

    #[test]
    fn test_export_writes_rows_each_tick() {
        let proc = fake_proc();
        let out = TempDir::new().unwrap();
        let path = out.path().join("ticks.csv");

        let mut monitor =
            Monitor::new(sampler_for(&proc), Ranker::new(5), SilentRenderer::new(), settings(Some(2)))
                .with_export(CsvExporter::append_to(&path).unwrap());
        monitor.run(&CancellationToken::new()).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 5);
        assert!(lines[0].starts_with("timestamp_ms,pid,"));
        assert_eq!(lines[2].split(',').nth(1), Some("7"));
        assert!(lines[2].contains(",hog,"), "{}", lines[2]);
    }
}
