//! Evaluation tests through the engine
//!
//! These use in-memory classifiers and datasets so the scoring, splitting
//! and caching behavior can be checked without real model artifacts.

#[cfg(test)]
mod engine_evaluation_tests {
    use crate::evaluation::{
        CsvDataset, Dataset, DatasetSource, EvaluationConfig, MetricsSnapshot, SnapshotOrigin,
    };
    use crate::models::CANONICAL_FEATURES;
    use crate::predictor::{
        Classifier, EngineConfig, LoadedResources, ModelArtifact, ModelKind, PredictorEngine,
        StandardScaler,
    };
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use tempfile::TempDir;

    /// Serves a fixed dataset and counts how often it was read
    struct CountingSource {
        dataset: Option<Dataset>,
        reads: Arc<AtomicUsize>,
    }

    impl DatasetSource for CountingSource {
        fn describe(&self) -> String {
            "memory".to_string()
        }

        fn is_available(&self) -> bool {
            true
        }

        fn load(&self) -> anyhow::Result<Dataset> {
            self.reads.fetch_add(1, Ordering::SeqCst);
            self.dataset
                .clone()
                .ok_or_else(|| anyhow::anyhow!("dataset is corrupt"))
        }
    }

    /// Predicts 1 when the named input column exceeds a cut-off
    struct Cutoff {
        column: usize,
        cutoff: f32,
        rows_seen: Arc<Mutex<usize>>,
    }

    impl Classifier for Cutoff {
        fn predict(&self, rows: &[Vec<f32>]) -> anyhow::Result<Vec<f32>> {
            *self.rows_seen.lock().unwrap() += rows.len();
            Ok(rows
                .iter()
                .map(|r| if r[self.column] > self.cutoff { 1.0 } else { 0.0 })
                .collect())
        }

        fn supports_probability(&self) -> bool {
            true
        }

        fn predict_proba(&self, rows: &[Vec<f32>]) -> anyhow::Result<Vec<f32>> {
            Ok(rows
                .iter()
                .map(|r| (r[self.column] / 200.0).clamp(0.0, 1.0))
                .collect())
        }
    }

    /// Emits a fixed sequence of continuous scores
    struct Scores(Vec<f32>);

    impl Classifier for Scores {
        fn predict(&self, rows: &[Vec<f32>]) -> anyhow::Result<Vec<f32>> {
            Ok(self.0.iter().copied().cycle().take(rows.len()).collect())
        }
    }

    /// Always predicts the same class
    struct Constant(f32);

    impl Classifier for Constant {
        fn predict(&self, rows: &[Vec<f32>]) -> anyhow::Result<Vec<f32>> {
            Ok(vec![self.0; rows.len()])
        }
    }

    fn ap_hi_index() -> usize {
        CANONICAL_FEATURES.iter().position(|f| *f == "ap_hi").unwrap()
    }

    fn cutoff_model(kind: ModelKind, cutoff: f32) -> (ModelArtifact, Arc<Mutex<usize>>) {
        let rows_seen = Arc::new(Mutex::new(0));
        let handle = Cutoff {
            column: ap_hi_index(),
            cutoff,
            rows_seen: Arc::clone(&rows_seen),
        };
        (ModelArtifact::new(kind, Box::new(handle)), rows_seen)
    }

    /// Dataset in the reference layout (no BMI column), labels driven by ap_hi
    fn cardio_dataset(n: usize) -> Dataset {
        let mut columns: Vec<String> = CANONICAL_FEATURES[..11]
            .iter()
            .map(|s| s.to_string())
            .collect();
        columns.push("cardio".to_string());
        let rows = (0..n)
            .map(|i| {
                let ap_hi = 100.0 + ((i * 37) % 80) as f32;
                // Mostly follows ap_hi, with every seventh row flipped
                let mut label = if ap_hi > 140.0 { 1.0 } else { 0.0 };
                if i % 7 == 0 {
                    label = 1.0 - label;
                }
                vec![
                    18_000.0 + (i % 5000) as f32,
                    (1 + i % 2) as f32,
                    150.0 + (i % 40) as f32,
                    50.0 + (i % 50) as f32,
                    ap_hi,
                    70.0 + (i % 30) as f32,
                    (1 + i % 3) as f32,
                    (1 + i % 3) as f32,
                    (i % 2) as f32,
                    (i % 2) as f32,
                    ((i + 1) % 2) as f32,
                    label,
                ]
            })
            .collect();
        Dataset::new(columns, rows).unwrap()
    }

    fn engine_with(
        models: Vec<ModelArtifact>,
        scaler: Option<StandardScaler>,
        dataset: Option<Dataset>,
    ) -> (PredictorEngine, Arc<AtomicUsize>) {
        let reads = Arc::new(AtomicUsize::new(0));
        let source = CountingSource {
            dataset,
            reads: Arc::clone(&reads),
        };
        let engine = PredictorEngine::from_parts(
            LoadedResources::new(models, scaler),
            Some(Box::new(source)),
            EvaluationConfig::default(),
        );
        (engine, reads)
    }

    #[test]
    fn test_no_models_returns_illustrative_defaults() {
        let (engine, reads) = engine_with(Vec::new(), None, Some(cardio_dataset(100)));

        let first = engine.evaluate();
        let second = engine.evaluate();

        assert_eq!(*first, MetricsSnapshot::illustrative());
        assert_eq!(*second, MetricsSnapshot::illustrative());
        assert_eq!(first.stats.main_model, "Random Forest (Demo)");
        assert_eq!(first.stats.accuracy, 73.1);
        assert_eq!(first.stats.roc_auc, 0.79);
        assert_eq!(first.comparison.len(), 5);
        assert_eq!(reads.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_measured_snapshot_is_cached() {
        let (model, _) = cutoff_model(ModelKind::RandomForest, 140.0);
        let (engine, reads) = engine_with(vec![model], None, Some(cardio_dataset(500)));

        let first = engine.evaluate();
        let second = engine.evaluate();

        assert_eq!(first.origin, SnapshotOrigin::Measured);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(reads.load(Ordering::SeqCst), 1);
        assert_eq!(engine.stats().dataset_reads, 1);
        assert_eq!(engine.stats().evaluation_runs, 1);
    }

    #[test]
    fn test_failed_evaluation_is_not_cached() {
        let (model, _) = cutoff_model(ModelKind::RandomForest, 140.0);
        let (engine, reads) = engine_with(vec![model], None, None);

        assert_eq!(*engine.evaluate(), MetricsSnapshot::illustrative());
        assert_eq!(*engine.evaluate(), MetricsSnapshot::illustrative());
        assert_eq!(reads.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_small_dataset_uses_every_row() {
        let (model, rows_seen) = cutoff_model(ModelKind::RandomForest, 140.0);
        let (engine, _) = engine_with(vec![model], None, Some(cardio_dataset(500)));

        let snapshot = engine.evaluate();

        assert_eq!(*rows_seen.lock().unwrap(), 500);
        assert_eq!(snapshot.stats.dataset_size, "500");
        assert_eq!(snapshot.stats.features, 12);
        assert_eq!(snapshot.stats.main_model, "Random Forest");
    }

    #[test]
    fn test_large_dataset_uses_seeded_holdout() {
        let run = || {
            let (model, rows_seen) = cutoff_model(ModelKind::RandomForest, 140.0);
            let (engine, _) = engine_with(vec![model], None, Some(cardio_dataset(12_000)));
            let snapshot = engine.evaluate();
            let seen = *rows_seen.lock().unwrap();
            (snapshot, seen)
        };

        let (first, seen) = run();
        let (second, _) = run();

        assert_eq!(seen, 2_400);
        assert_eq!(first.stats.dataset_size, "12,000");
        assert!(first.is_measured());
        assert_eq!(first.stats.accuracy, second.stats.accuracy);
        assert_eq!(first.stats.roc_auc, second.stats.roc_auc);
        assert_eq!(first.comparison, second.comparison);
    }

    #[test]
    fn test_regression_output_thresholded_before_scoring() {
        let columns: Vec<String> = CANONICAL_FEATURES[..11]
            .iter()
            .map(|s| s.to_string())
            .chain(std::iter::once("cardio".to_string()))
            .collect();
        let rows = [0.0, 1.0, 0.0, 1.0]
            .iter()
            .map(|&label| {
                let mut row = vec![
                    18_000.0, 1.0, 170.0, 70.0, 120.0, 80.0, 1.0, 1.0, 0.0, 0.0, 1.0,
                ];
                row.push(label);
                row
            })
            .collect();
        let dataset = Dataset::new(columns, rows).unwrap();

        let model = ModelArtifact::new(
            ModelKind::LinearRegression,
            Box::new(Scores(vec![0.2, 0.81, 0.49, 0.95])),
        );
        let (engine, _) = engine_with(vec![model], None, Some(dataset));
        let snapshot = engine.evaluate();

        assert!(snapshot.is_measured());
        let row = &snapshot.comparison[0];
        assert_eq!(row.name, "Linear Regression");
        assert_eq!(row.accuracy, 100.0);
        assert_eq!(row.precision, 1.0);
        assert_eq!(row.recall, 1.0);
        assert_eq!(row.f1, 1.0);
        // Raw scores stand in for probabilities
        assert_eq!(snapshot.stats.roc_auc, 1.0);
    }

    #[test]
    fn test_comparison_sorted_by_accuracy_stable() {
        // Constant models tie with each other; the cut-off model beats both
        let tree = ModelArtifact::new(ModelKind::DecisionTree, Box::new(Constant(0.0)));
        let bayes = ModelArtifact::new(ModelKind::NaiveBayes, Box::new(Constant(0.0)));
        let (forest, _) = cutoff_model(ModelKind::RandomForest, 140.0);
        let (engine, _) = engine_with(vec![tree, bayes, forest], None, Some(cardio_dataset(700)));

        let snapshot = engine.evaluate();
        let names: Vec<_> = snapshot.comparison.iter().map(|r| r.name.as_str()).collect();

        assert_eq!(names, vec!["Random Forest", "Decision Tree", "Naive Bayes"]);
        assert_eq!(snapshot.comparison[1].accuracy, snapshot.comparison[2].accuracy);
        // Primary is the first loaded model, not the best one
        assert_eq!(snapshot.stats.main_model, "Decision Tree");
    }

    #[test]
    fn test_primary_stats_prefer_gradient_boosting() {
        let (forest, _) = cutoff_model(ModelKind::RandomForest, 140.0);
        let (boosting, _) = cutoff_model(ModelKind::GradientBoosting, 150.0);
        let (engine, _) = engine_with(vec![forest, boosting], None, Some(cardio_dataset(300)));
        assert_eq!(engine.evaluate().stats.main_model, "Gradient Boosting");
    }

    #[test]
    fn test_declared_features_projected_on_dataset() {
        let rows_seen = Arc::new(Mutex::new(0));
        let handle = Cutoff {
            column: 1,
            cutoff: 140.0,
            rows_seen: Arc::clone(&rows_seen),
        };
        let model = ModelArtifact::new(ModelKind::RandomForest, Box::new(handle))
            .with_declared_features(vec!["BMI".to_string(), "ap_hi".to_string()]);
        let (engine, _) = engine_with(vec![model], None, Some(cardio_dataset(300)));

        let snapshot = engine.evaluate();
        assert!(snapshot.is_measured());
        assert_eq!(*rows_seen.lock().unwrap(), 300);
    }

    #[test]
    fn test_missing_declared_feature_falls_back_to_illustrative() {
        let (model, _) = cutoff_model(ModelKind::RandomForest, 140.0);
        let model = model.with_declared_features(vec!["waist".to_string()]);
        let (engine, _) = engine_with(vec![model], None, Some(cardio_dataset(300)));
        assert_eq!(*engine.evaluate(), MetricsSnapshot::illustrative());
    }

    #[test]
    fn test_scaler_applied_to_evaluation_slice() {
        // Standardized ap_hi > 0 is the same decision as raw ap_hi > 140
        let (raw_model, _) = cutoff_model(ModelKind::RandomForest, 140.0);
        let (raw_engine, _) = engine_with(vec![raw_model], None, Some(cardio_dataset(400)));

        let mut mean = vec![0.0; 12];
        let mut scale = vec![1.0; 12];
        mean[ap_hi_index()] = 140.0;
        scale[ap_hi_index()] = 10.0;
        let scaler = StandardScaler::new(mean, scale).unwrap();
        let (scaled_model, _) = cutoff_model(ModelKind::RandomForest, 0.0);
        let (scaled_engine, _) =
            engine_with(vec![scaled_model], Some(scaler), Some(cardio_dataset(400)));

        assert_eq!(
            raw_engine.evaluate().comparison,
            scaled_engine.evaluate().comparison
        );
    }

    #[test]
    fn test_scaler_width_mismatch_falls_back() {
        let (model, _) = cutoff_model(ModelKind::RandomForest, 140.0);
        let scaler = StandardScaler::new(vec![0.0; 3], vec![1.0; 3]).unwrap();
        let (engine, _) = engine_with(vec![model], Some(scaler), Some(cardio_dataset(100)));
        assert_eq!(engine.evaluate().origin, SnapshotOrigin::Illustrative);
    }

    #[test]
    fn test_single_class_dataset_falls_back() {
        let columns = vec!["ap_hi".to_string(), "cardio".to_string()];
        let rows = vec![vec![120.0, 1.0], vec![150.0, 1.0]];
        let model = ModelArtifact::new(ModelKind::RandomForest, Box::new(Constant(1.0)))
            .with_declared_features(vec!["ap_hi".to_string()]);
        let dataset = Dataset::new(columns, rows).unwrap();
        let (engine, _) = engine_with(vec![model], None, Some(dataset));
        assert_eq!(engine.evaluate().origin, SnapshotOrigin::Illustrative);
    }

    #[test]
    fn test_concurrent_first_calls_compute_once() {
        let (model, _) = cutoff_model(ModelKind::RandomForest, 140.0);
        let (engine, reads) = engine_with(vec![model], None, Some(cardio_dataset(2_000)));
        let engine = Arc::new(engine);

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let engine = Arc::clone(&engine);
                std::thread::spawn(move || engine.evaluate())
            })
            .collect();
        let snapshots: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        assert_eq!(reads.load(Ordering::SeqCst), 1);
        assert!(snapshots.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
    }

    #[test]
    fn test_csv_file_end_to_end() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("final_cardio_train_data.csv");
        let mut csv = String::from(
            "age,gender,height,weight,ap_hi,ap_lo,cholesterol,gluc,smoke,alco,active,cardio\n",
        );
        for (ap_hi, label) in [(120, 0), (150, 1), (110, 0), (160, 1), (135, 0), (145, 1)] {
            csv.push_str(&format!("18000,1,170,70,{},80,1,1,0,0,1,{}\n", ap_hi, label));
        }
        std::fs::write(&path, csv).unwrap();

        let (model, _) = cutoff_model(ModelKind::RandomForest, 140.0);
        let engine = PredictorEngine::from_parts(
            LoadedResources::new(vec![model], None),
            Some(Box::new(CsvDataset::new(&path))),
            EvaluationConfig::default(),
        );

        let snapshot = engine.evaluate();
        assert!(snapshot.is_measured());
        assert_eq!(snapshot.stats.accuracy, 100.0);
        assert_eq!(snapshot.stats.roc_auc, 1.0);
        assert_eq!(snapshot.stats.dataset_size, "6");
        assert_eq!(snapshot.stats.features, 12);
    }

    #[test]
    fn test_nan_cells_in_csv_fall_back_to_illustrative() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("final_cardio_train_data.csv");
        let mut csv = String::from("age,cardio\n");
        for i in 0..2_000 {
            let age = if i % 3 == 0 {
                "NaN".to_string()
            } else {
                (18_000 + i).to_string()
            };
            csv.push_str(&format!("{},{}\n", age, i % 2));
        }
        std::fs::write(&path, csv).unwrap();

        let model = ModelArtifact::new(ModelKind::RandomForest, Box::new(Constant(1.0)))
            .with_declared_features(vec!["age".to_string()]);
        let engine = PredictorEngine::from_parts(
            LoadedResources::new(vec![model], None),
            Some(Box::new(CsvDataset::new(&path))),
            EvaluationConfig::default(),
        );

        assert_eq!(engine.evaluate().origin, SnapshotOrigin::Illustrative);
        // Not cached: the next call reads the file again
        engine.evaluate();
        assert_eq!(engine.stats().dataset_reads, 2);
    }

    #[test]
    fn test_non_finite_model_output_falls_back() {
        let scores = Scores(vec![0.2, f32::NAN]);
        let model = ModelArtifact::new(ModelKind::RandomForest, Box::new(scores));
        let (engine, _) = engine_with(vec![model], None, Some(cardio_dataset(100)));
        assert_eq!(engine.evaluate().origin, SnapshotOrigin::Illustrative);
    }

    #[test]
    fn test_configured_delimiter_is_used() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("cardio.csv");
        let mut csv = String::from("ap_hi;cardio\n");
        for (ap_hi, label) in [(120, 0), (150, 1), (110, 0), (160, 1)] {
            csv.push_str(&format!("{};{}\n", ap_hi, label));
        }
        std::fs::write(&path, csv).unwrap();

        let config = EvaluationConfig {
            dataset_path: path,
            delimiter: ';',
            ..EvaluationConfig::default()
        };
        let dataset = config.csv_source().unwrap().load().unwrap();
        assert_eq!(dataset.columns(), ["ap_hi".to_string()]);
        assert_eq!(dataset.len(), 4);
    }

    /// Model directory with the two-input ONNX classifier and a matching CSV
    fn onnx_model_dir() -> TempDir {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(
            temp_dir.path().join("naive_bayes.onnx"),
            include_bytes!("../../tests/fixtures/softmax_classifier.onnx"),
        )
        .unwrap();
        std::fs::write(
            temp_dir.path().join("naive_bayes.features.json"),
            br#"["ap_lo", "ap_hi"]"#,
        )
        .unwrap();
        let mut csv = String::from("ap_lo,ap_hi,cardio\n");
        for (ap_lo, ap_hi, label) in [(80, 150, 1), (100, 90, 0), (70, 140, 1), (95, 60, 0)] {
            csv.push_str(&format!("{},{},{}\n", ap_lo, ap_hi, label));
        }
        std::fs::write(temp_dir.path().join("final_cardio_train_data.csv"), csv).unwrap();
        temp_dir
    }

    #[test]
    fn test_onnx_model_evaluated_from_disk() {
        let temp_dir = onnx_model_dir();
        let engine = PredictorEngine::new(EngineConfig::with_model_dir(temp_dir.path()));

        let snapshot = engine.evaluate();
        assert!(snapshot.is_measured());
        assert_eq!(snapshot.stats.accuracy, 100.0);
        assert_eq!(snapshot.stats.roc_auc, 1.0);
    }

    #[test]
    fn test_non_ascii_delimiter_is_rejected() {
        let temp_dir = onnx_model_dir();
        // U+012C truncates to ',' as a byte
        let config = EngineConfig {
            evaluation: EvaluationConfig {
                delimiter: '\u{12C}',
                ..EngineConfig::with_model_dir(temp_dir.path()).evaluation
            },
            ..EngineConfig::with_model_dir(temp_dir.path())
        };
        let err = config.evaluation.csv_source().unwrap_err();
        assert!(err.to_string().contains("not an ASCII character"), "{}", err);

        let engine = PredictorEngine::new(config);
        assert_eq!(engine.models().len(), 1);
        assert_eq!(*engine.evaluate(), MetricsSnapshot::illustrative());
        assert_eq!(engine.stats().dataset_reads, 0);
    }

    #[test]
    fn test_missing_csv_file_is_illustrative() {
        let temp_dir = TempDir::new().unwrap();
        let (model, _) = cutoff_model(ModelKind::RandomForest, 140.0);
        let engine = PredictorEngine::from_parts(
            LoadedResources::new(vec![model], None),
            Some(Box::new(CsvDataset::new(temp_dir.path().join("absent.csv")))),
            EvaluationConfig::default(),
        );
        assert_eq!(*engine.evaluate(), MetricsSnapshot::illustrative());
        assert_eq!(engine.stats().dataset_reads, 0);
    }
}
