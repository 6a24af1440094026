//! Integration tests for loading a cohort and binning its features.

use fairlens_data::{BinKind, BinningConfig, Dataset, DatasetConfig, DataError, FeatureBinning};
use std::path::PathBuf;

fn write_cohort(tag: &str) -> PathBuf {
    let path = std::env::temp_dir().join(format!(
        "fairlens-{}-{}.csv",
        tag,
        std::process::id()
    ));
    let mut csv = String::from("label,logistic,boosted,sex,age,income\n");
    for i in 0..40 {
        let sex = if i % 3 == 0 { "female" } else { "male" };
        let age = 18 + (i * 7) % 60;
        let income = 20_000 + i * 1_500;
        let label = i % 2;
        let logistic = if i % 4 == 0 { 1 - label } else { label };
        let boosted = if i % 5 == 0 { 0.35 } else { 0.4 + 0.5 * label as f64 };
        csv.push_str(&format!(
            "{},{},{},{},{},{}\n",
            label, logistic, boosted, sex, age, income
        ));
    }
    std::fs::write(&path, csv).unwrap();
    path
}

#[test]
fn test_load_and_bin_every_feature() {
    let path = write_cohort("cohort");
    let config = DatasetConfig::new("label", ["logistic", "boosted"]);
    let dataset = Dataset::from_csv_path(&path, &config).unwrap();
    std::fs::remove_file(&path).ok();

    assert!(dataset.name().starts_with("fairlens-cohort-"));
    assert_eq!(dataset.row_count(), 40);
    assert_eq!(dataset.model_count(), 2);
    assert_eq!(dataset.feature_count(), 3);

    let binning_config = BinningConfig::default();
    let binnings: Vec<FeatureBinning> = dataset
        .features()
        .iter()
        .map(|feature| FeatureBinning::build(feature, &binning_config).unwrap())
        .collect();

    assert_eq!(binnings[0].feature_name, "sex");
    assert_eq!(binnings[0].kind, BinKind::Categorical);
    assert_eq!(binnings[0].group_counts(), vec![14, 26]);

    for binning in &binnings[1..] {
        assert_eq!(binning.kind, BinKind::Interval);
        assert_eq!(binning.group_count(), 5);
        assert!(binning.labels[4].ends_with(']'));
    }
    assert_eq!(binnings[2].labels[0], "[20000, 31700)");

    for binning in &binnings {
        assert_eq!(binning.bin_vector.len(), dataset.row_count());
        assert_eq!(
            binning.group_counts().iter().sum::<usize>(),
            dataset.row_count()
        );
    }
}

#[test]
fn test_rebinning_changes_groups() {
    let path = write_cohort("rebin");
    let config = DatasetConfig::new("label", ["logistic"]).with_features(["age"]);
    let dataset = Dataset::from_csv_path(&path, &config).unwrap();
    std::fs::remove_file(&path).ok();

    let age = &dataset.features()[0];
    let coarse = FeatureBinning::build(age, &BinningConfig::with_bin_count(2)).unwrap();
    let fine = FeatureBinning::build(age, &BinningConfig::with_bin_count(8)).unwrap();

    assert_eq!(coarse.group_count(), 2);
    assert_eq!(fine.group_count(), 8);
    assert_ne!(coarse.bin_vector, fine.bin_vector);
}

#[test]
fn test_missing_file() {
    let config = DatasetConfig::new("label", ["logistic"]);
    assert!(matches!(
        Dataset::from_csv_path("/nonexistent/fairlens/cohort.csv", &config),
        Err(DataError::Io(_))
    ));
}

#[test]
fn test_ragged_rows_rejected() {
    let csv = "label,model,sex\n1,1,female\n0,1\n";
    let config = DatasetConfig::new("label", ["model"]);
    assert!(matches!(
        Dataset::from_reader(csv.as_bytes(), &config),
        Err(DataError::Csv(_))
    ));
}
