#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Arc;

    use tsgrid_core::{MasterOperation, Operation, Quality, ResultMatrix, SeriesData, TimeSeries};

    use crate::registry::Registry;
    use crate::scheduler::progress::ProgressReporter;
    use crate::scheduler::runner::Scheduler;
    use crate::scheduler::task::{ComputeError, MasterOutput, SchedulerError, SharedComputation};
    use crate::scheduler::types::{RunRequest, SchedulerConfig};
    use crate::catalog::CatalogError;

    /// Mock computation counting its evaluations.
    struct Counting {
        outputs: Vec<String>,
        calls: Arc<AtomicUsize>,
    }

    impl SharedComputation for Counting {
        fn name(&self) -> &str { "counting" }
        fn outputs(&self) -> &[String] { &self.outputs }

        fn evaluate(&self, series: &[f64]) -> Result<MasterOutput, ComputeError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            std::thread::sleep(std::time::Duration::from_millis(2));
            let first = series.first().copied().unwrap_or_default();
            Ok(MasterOutput::from_values((0..self.outputs.len()).map(|i| first + i as f64)))
        }
    }

    /// Mock computation that fails while its switch is on.
    struct Flaky {
        outputs: Vec<String>,
        failing: Arc<AtomicBool>,
    }

    impl SharedComputation for Flaky {
        fn name(&self) -> &str { "flaky" }
        fn outputs(&self) -> &[String] { &self.outputs }

        fn evaluate(&self, _series: &[f64]) -> Result<MasterOutput, ComputeError> {
            if self.failing.load(Ordering::SeqCst) {
                return Err(ComputeError::Failed("switched off".into()));
            }
            Ok(MasterOutput::from_values([7.0]))
        }
    }

    /// Mock computation that raises the cancellation flag when evaluated.
    struct Trip {
        outputs: Vec<String>,
        flag: Arc<AtomicBool>,
    }

    impl SharedComputation for Trip {
        fn name(&self) -> &str { "trip" }
        fn outputs(&self) -> &[String] { &self.outputs }

        fn evaluate(&self, _series: &[f64]) -> Result<MasterOutput, ComputeError> {
            self.flag.store(true, Ordering::SeqCst);
            Ok(MasterOutput::from_values([1.0]))
        }
    }

    struct Fixture {
        registry: Registry,
        calls: Arc<AtomicUsize>,
        failing: Arc<AtomicBool>,
    }

    impl Fixture {
        fn new() -> Self {
            let calls = Arc::new(AtomicUsize::new(0));
            let failing = Arc::new(AtomicBool::new(false));
            let mut registry = Registry::with_builtins();
            let c = Arc::clone(&calls);
            registry.register("counting", "counting()", "test", move |_| {
                Ok(Arc::new(Counting {
                    outputs: (0..5).map(|i| format!("f{}", i)).collect(),
                    calls: Arc::clone(&c),
                }))
            });
            let f = Arc::clone(&failing);
            registry.register("flaky", "flaky()", "test", move |_| {
                Ok(Arc::new(Flaky {
                    outputs: vec!["v".to_string()],
                    failing: Arc::clone(&f),
                }))
            });
            Self { registry, calls, failing }
        }

        /// Masters: counting (5 outputs), flaky, distribution.
        /// Columns: 0-4 counting, 5 flaky, 6-7 distribution.
        fn catalog(&self) -> (Vec<Operation>, Vec<MasterOperation>) {
            let masters = vec![
                MasterOperation { id: 1, label: "CNT".into(), code: "counting(x)".into() },
                MasterOperation { id: 2, label: "FLK".into(), code: "flaky".into() },
                MasterOperation { id: 3, label: "DN".into(), code: "distribution(x)".into() },
            ];
            let mut ops: Vec<Operation> = (0..5)
                .map(|i| op(10 + i, 1, &format!("CNT.f{}", i)))
                .collect();
            ops.push(op(20, 2, "FLK"));
            ops.push(op(30, 3, "DN.mean"));
            ops.push(op(31, 3, "DN.cv"));
            (ops, masters)
        }

        fn scheduler(&self, config: SchedulerConfig) -> Scheduler {
            let (ops, masters) = self.catalog();
            Scheduler::from_catalog(config, &ops, &masters, &self.registry).unwrap()
        }
    }

    fn op(id: u64, master_id: u64, code: &str) -> Operation {
        Operation {
            id,
            name: code.to_lowercase(),
            keywords: vec![],
            master_id,
            code: code.to_string(),
        }
    }

    fn series() -> Vec<TimeSeries> {
        vec![
            TimeSeries::new(100, "ramp", vec![1.0, 2.0, 3.0, 4.0]),
            TimeSeries::new(101, "balanced", vec![-1.0, 1.0, -1.0, 1.0]),
            TimeSeries::new(102, "short", vec![5.0, 6.0]),
        ]
    }

    fn run(
        scheduler: &Scheduler,
        series: &[TimeSeries],
        request: &RunRequest,
        results: &mut ResultMatrix,
    ) -> crate::scheduler::types::RunSummary {
        let mut reporter = ProgressReporter::new(true);
        scheduler
            .run(series, request, results, &mut reporter, |_| Ok(()))
            .unwrap()
    }

    #[test]
    fn every_selected_cell_gets_a_quality() {
        let fx = Fixture::new();
        let scheduler = fx.scheduler(SchedulerConfig::default());
        let series = series();
        let mut results = ResultMatrix::new(3, 8);

        let summary = run(&scheduler, &series, &RunRequest::all(), &mut results);

        assert_eq!(summary.rows_processed, 3);
        assert_eq!(summary.cells_written(), 24);
        assert_eq!(results.quality_counts().never_computed, 0);
        assert!(results.quality.iter().all(|q| q.is_some_and(|q| q.code() <= 5)));
        // zero-mean series: cv is +inf
        assert_eq!(results.quality.get(1, 7), Some(&Some(Quality::PosInfinity)));
        assert_eq!(results.values.get(1, 7), Some(&Some(0.0)));
        assert_eq!(results.values.get(0, 6), Some(&Some(2.5)));
    }

    #[test]
    fn shared_master_runs_once_per_row_with_identical_times() {
        let fx = Fixture::new();
        let scheduler = fx.scheduler(SchedulerConfig::default());
        let series = vec![TimeSeries::new(1, "one", vec![3.0, 1.0, 2.0])];
        let mut results = ResultMatrix::new(1, 8);

        run(&scheduler, &series, &RunRequest::all(), &mut results);

        assert_eq!(fx.calls.load(Ordering::SeqCst), 1);
        let times: Vec<f64> = (0..5)
            .map(|c| results.calc_times.get(0, c).copied().flatten().unwrap())
            .collect();
        assert!(times[0] > 0.0);
        assert!(times.iter().all(|t| *t == times[0]));
        let values: Vec<f64> = (0..5)
            .map(|c| results.values.get(0, c).copied().flatten().unwrap())
            .collect();
        assert_eq!(values, vec![3.0, 4.0, 5.0, 6.0, 7.0]);
    }

    #[test]
    fn second_run_over_complete_matrix_selects_nothing() {
        let fx = Fixture::new();
        let scheduler = fx.scheduler(SchedulerConfig::default());
        let series = series();
        let mut results = ResultMatrix::new(3, 8);

        run(&scheduler, &series, &RunRequest::all(), &mut results);
        let snapshot = results.clone();
        let calls_after_first = fx.calls.load(Ordering::SeqCst);

        let summary = run(&scheduler, &series, &RunRequest::all(), &mut results);

        assert_eq!(summary.cells_selected, 0);
        assert_eq!(summary.rows_selected, 0);
        assert_eq!(fx.calls.load(Ordering::SeqCst), calls_after_first);
        assert_eq!(results, snapshot);
    }

    #[test]
    fn failed_cells_are_retried() {
        let fx = Fixture::new();
        let scheduler = fx.scheduler(SchedulerConfig::default());
        let series = series();
        let mut results = ResultMatrix::new(3, 8);

        fx.failing.store(true, Ordering::SeqCst);
        let first = run(&scheduler, &series, &RunRequest::all(), &mut results);
        assert_eq!(first.counts.errors(), 3);
        assert_eq!(results.quality.get(0, 5), Some(&Some(Quality::Fatal)));
        assert_eq!(results.values.get(0, 5), Some(&Some(0.0)));

        fx.failing.store(false, Ordering::SeqCst);
        let second = run(&scheduler, &series, &RunRequest::all(), &mut results);
        assert_eq!(second.cells_selected, 3);
        assert_eq!(second.counts.good(), 3);
        assert_eq!(results.quality.get(0, 5), Some(&Some(Quality::Good)));
        assert_eq!(results.values.get(0, 5), Some(&Some(7.0)));
    }

    #[test]
    fn failing_master_leaves_unrelated_cells_good() {
        let fx = Fixture::new();
        fx.failing.store(true, Ordering::SeqCst);
        let scheduler = fx.scheduler(SchedulerConfig::default());
        let series = vec![TimeSeries::new(1, "ramp", vec![1.0, 2.0, 3.0])];
        let mut results = ResultMatrix::new(1, 8);

        run(&scheduler, &series, &RunRequest::all(), &mut results);

        assert_eq!(results.quality.get(0, 5), Some(&Some(Quality::Fatal)));
        for col in [0, 1, 2, 3, 4, 6, 7] {
            assert_eq!(results.quality.get(0, col), Some(&Some(Quality::Good)), "col {col}");
        }
    }

    #[test]
    fn transposed_rows_are_corrected_and_matrices_are_skipped() {
        let fx = Fixture::new();
        let scheduler = fx.scheduler(SchedulerConfig::default());
        let mut series = series();
        series[0].data = SeriesData::Nested(vec![vec![1.0, 2.0, 3.0, 4.0]]);
        series[1].data = SeriesData::Nested(vec![vec![1.0, 2.0], vec![3.0, 4.0]]);
        let mut results = ResultMatrix::new(3, 8);

        let summary = run(&scheduler, &series, &RunRequest::all(), &mut results);

        assert_eq!(summary.rows_processed, 2);
        assert_eq!(summary.rows_skipped, vec![101]);
        assert_eq!(results.values.get(0, 6), Some(&Some(2.5)));
        assert!(results.quality.row(1).iter().all(Option::is_none));
        assert!(results.calc_times.row(1).iter().all(Option::is_none));
        assert!(results.quality.row(2).iter().all(Option::is_some));
    }

    #[test]
    fn missing_master_aborts_before_any_write() {
        let fx = Fixture::new();
        let (mut ops, masters) = fx.catalog();
        ops.push(op(99, 42, "GONE.x"));

        let err = Scheduler::from_catalog(SchedulerConfig::default(), &ops, &masters, &fx.registry)
            .err()
            .unwrap();
        assert!(matches!(
            err,
            SchedulerError::Catalog(CatalogError::MissingMaster {
                operation_id: 99,
                master_id: 42
            })
        ));
        assert_eq!(fx.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn matrix_shape_must_match_catalog() {
        let fx = Fixture::new();
        let scheduler = fx.scheduler(SchedulerConfig::default());
        let mut results = ResultMatrix::new(3, 7);
        let mut reporter = ProgressReporter::new(false);
        let err = scheduler
            .run(&series(), &RunRequest::all(), &mut results, &mut reporter, |_| Ok(()))
            .unwrap_err();
        assert!(matches!(err, SchedulerError::Grid(_)));
        assert_eq!(results.quality_counts().never_computed, 21);
    }

    #[test]
    fn request_limits_rows_and_columns() {
        let fx = Fixture::new();
        let scheduler = fx.scheduler(SchedulerConfig::default());
        let mut results = ResultMatrix::new(3, 8);
        let request = RunRequest {
            series_ids: vec![102, 555],
            operation_ids: vec![30, 10],
        };

        let summary = run(&scheduler, &series(), &request, &mut results);

        assert_eq!(summary.cells_selected, 2);
        assert_eq!(results.quality_counts().computed(), 2);
        assert!(results.quality.get(2, 0).copied().flatten().is_some());
        assert!(results.quality.get(2, 6).copied().flatten().is_some());
        assert!(results.quality.get(2, 1).copied().flatten().is_none());
    }

    #[test]
    fn parallel_and_sequential_agree() {
        let fx = Fixture::new();
        let series = series();
        let sequential = fx.scheduler(SchedulerConfig::default());
        let parallel = fx.scheduler(SchedulerConfig {
            parallel: true,
            worker_threads: 3,
            ..SchedulerConfig::default()
        });

        let mut a = ResultMatrix::new(3, 8);
        let mut b = ResultMatrix::new(3, 8);
        run(&sequential, &series, &RunRequest::all(), &mut a);
        run(&parallel, &series, &RunRequest::all(), &mut b);

        assert_eq!(a.values, b.values);
        assert_eq!(a.quality, b.quality);
    }

    #[test]
    fn cancellation_stops_between_rows() {
        let flag = Arc::new(AtomicBool::new(false));
        let mut registry = Registry::new();
        let f = Arc::clone(&flag);
        registry.register("trip", "trip()", "test", move |_| {
            Ok(Arc::new(Trip {
                outputs: vec!["v".to_string()],
                flag: Arc::clone(&f),
            }))
        });
        let masters = vec![MasterOperation { id: 1, label: "T".into(), code: "trip".into() }];
        let ops = vec![op(1, 1, "T")];
        let mut scheduler = Scheduler::from_catalog(SchedulerConfig::default(), &ops, &masters, &registry).unwrap();
        scheduler.shutdown = flag;

        let series = series();
        let mut results = ResultMatrix::new(3, 1);
        let summary = run(&scheduler, &series, &RunRequest::all(), &mut results);

        assert!(summary.cancelled);
        assert_eq!(summary.rows_processed, 1);
        assert_eq!(results.quality.get(0, 0), Some(&Some(Quality::Good)));
        assert_eq!(results.quality.get(1, 0), Some(&None));
        assert_eq!(results.quality.get(2, 0), Some(&None));
    }

    #[test]
    fn shutdown_before_run_processes_nothing() {
        let fx = Fixture::new();
        let scheduler = fx.scheduler(SchedulerConfig::default());
        scheduler.shutdown();
        assert!(scheduler.shutdown_signal().load(Ordering::Relaxed));

        let mut results = ResultMatrix::new(3, 8);
        let summary = run(&scheduler, &series(), &RunRequest::all(), &mut results);
        assert!(summary.cancelled);
        assert_eq!(summary.rows_processed, 0);
        assert_eq!(results.quality_counts().never_computed, 24);
    }

    #[test]
    fn checkpoints_fire_between_rows_and_failures_do_not_abort() {
        let fx = Fixture::new();
        let scheduler = fx.scheduler(SchedulerConfig {
            checkpoint_every: 1,
            ..SchedulerConfig::default()
        });
        let mut results = ResultMatrix::new(3, 8);
        let mut reporter = ProgressReporter::new(false);
        let mut seen = Vec::new();

        let summary = scheduler
            .run(&series(), &RunRequest::all(), &mut results, &mut reporter, |m| {
                seen.push(m.quality_counts().computed());
                anyhow::bail!("disk full")
            })
            .unwrap();

        assert_eq!(seen, vec![8, 16]);
        assert_eq!(summary.rows_processed, 3);
    }
}
