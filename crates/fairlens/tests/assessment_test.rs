//! Integration tests for assessments over an in-memory cohort.

use approx::assert_relative_eq;
use fairlens::data::{Feature, FeatureValues, ModelPredictions};
use fairlens::{
    AssessmentError, BinningConfig, Dataset, FairnessAssessment, ParityMode, PrecomputedMetrics,
};
use rstest::rstest;
use std::sync::Mutex;

/// Eight rows, two models, two features that both split rows 0-3 from 4-7.
///
/// `fair` predicts every label; `skewed` predicts positive for the first
/// half only.
fn cohort() -> Dataset {
    let labels = vec![1.0, 0.0, 1.0, 0.0, 1.0, 0.0, 1.0, 0.0];
    let models = vec![
        ModelPredictions::new("fair", labels.clone()),
        ModelPredictions::new("skewed", vec![1.0, 1.0, 1.0, 1.0, 0.0, 0.0, 0.0, 0.0]),
    ];
    let sex = ["female", "female", "female", "female", "male", "male", "male", "male"];
    let features = vec![
        Feature::new(
            "sex",
            FeatureValues::Categorical(sex.iter().map(ToString::to_string).collect()),
        ),
        Feature::new(
            "age",
            FeatureValues::Numeric(vec![20.0, 25.0, 30.0, 35.0, 40.0, 45.0, 50.0, 60.0]),
        ),
    ];
    Dataset::new("cohort", labels, models, features).unwrap()
}

fn binning_config() -> BinningConfig {
    BinningConfig::with_bin_count(2)
}

#[tokio::test]
async fn test_evaluate_with_local_scoring() {
    let assessment = FairnessAssessment::local(cohort(), &binning_config()).unwrap();

    let evaluations = assessment
        .evaluate(0, "accuracy_score", "demographic_parity_difference")
        .await
        .unwrap();

    assert_eq!(evaluations.len(), 2);
    assert_eq!(evaluations[0].model, "fair");
    assert_eq!(evaluations[0].performance.as_ref().unwrap().global, Some(1.0));
    assert_relative_eq!(evaluations[0].fairness, 0.0);

    let skewed = &evaluations[1];
    assert_eq!(skewed.model_index, 1);
    assert_eq!(
        skewed.performance.as_ref().unwrap().bins,
        Some(vec![Some(0.5), Some(0.5)])
    );
    assert_relative_eq!(skewed.fairness, 1.0);
}

#[rstest]
#[case("demographic_parity_difference", 1.0)]
#[case("demographic_parity_ratio", 0.0)]
#[case("equal_opportunity_difference", 1.0)]
#[case("error_rate_ratio", 1.0)]
#[tokio::test]
async fn test_skewed_model_fairness(#[case] fairness_key: &str, #[case] expected: f64) {
    let assessment = FairnessAssessment::local(cohort(), &binning_config()).unwrap();

    let evaluations = assessment
        .evaluate(0, "accuracy_score", fairness_key)
        .await
        .unwrap();
    assert_relative_eq!(evaluations[1].fairness, expected);
}

#[tokio::test]
async fn test_equalized_odds_combines_base_metrics() {
    let assessment = FairnessAssessment::local(cohort(), &binning_config()).unwrap();

    let evaluations = assessment
        .evaluate(1, "recall_score", "equalized_odds_difference")
        .await
        .unwrap();

    assert_relative_eq!(evaluations[0].fairness, 0.0);
    assert_relative_eq!(evaluations[1].fairness, 1.0);
    assert!(
        assessment
            .cache()
            .contains(1, 1, "false_positive_rate")
            .await
    );
}

#[tokio::test]
async fn test_report_ranks_models() {
    let assessment = FairnessAssessment::local(cohort(), &binning_config()).unwrap();

    let report = assessment
        .report(0, "selection_rate", "demographic_parity_ratio")
        .await
        .unwrap();

    assert_eq!(report.dataset, "cohort");
    assert_eq!(report.feature, "sex");
    assert_eq!(report.bin_labels, vec!["female", "male"]);
    assert_eq!(
        report.best_by_fairness(ParityMode::Ratio).unwrap().model,
        "fair"
    );
    assert_eq!(report.models[1].performance_bins, vec![Some(1.0), Some(0.0)]);
}

#[tokio::test]
async fn test_repeated_evaluation_hits_cache() {
    let assessment = FairnessAssessment::local(cohort(), &binning_config()).unwrap();

    assessment
        .evaluate(0, "accuracy_score", "demographic_parity_difference")
        .await
        .unwrap();
    // accuracy and selection rate for two models
    assert_eq!(assessment.cache().stats().fetches, 4);

    assessment
        .evaluate(0, "accuracy_score", "demographic_parity_difference")
        .await
        .unwrap();
    let stats = assessment.cache().stats();
    assert_eq!(stats.fetches, 4);
    assert_eq!(stats.hits, 4);
}

#[tokio::test]
async fn test_rebin_clears_only_that_feature() {
    let mut assessment = FairnessAssessment::local(cohort(), &binning_config()).unwrap();
    for feature_index in 0..2 {
        assessment
            .evaluate(feature_index, "accuracy_score", "accuracy_score_difference")
            .await
            .unwrap();
    }
    assert_eq!(assessment.cache().stats().fetches, 4);

    assessment
        .rebin_feature(1, &BinningConfig::with_bin_count(4))
        .await
        .unwrap();

    assert_eq!(assessment.binning(1).unwrap().group_count(), 4);
    assert!(!assessment.cache().contains(1, 0, "accuracy_score").await);
    assert!(assessment.cache().contains(0, 0, "accuracy_score").await);

    let evaluations = assessment
        .evaluate(1, "accuracy_score", "accuracy_score_difference")
        .await
        .unwrap();
    assert_eq!(
        evaluations[0].performance.as_ref().unwrap().group_count(),
        4
    );
    assert_eq!(assessment.cache().stats().fetches, 6);
}

#[tokio::test]
async fn test_precompute_then_serve_without_fetcher() {
    let assessment = FairnessAssessment::local(cohort(), &binning_config()).unwrap();

    let calls = Mutex::new(Vec::new());
    let progress: &(dyn Fn(usize, usize) + Sync) = &|done: usize, total: usize| {
        calls.lock().unwrap().push((done, total));
    };
    let grid = assessment
        .precompute(&["accuracy_score", "selection_rate"], Some(progress))
        .await
        .unwrap();

    assert_eq!(grid.feature_count(), 2);
    assert_eq!(grid.model_count(), 2);
    assert_eq!(grid.len(), 8);
    let calls = calls.into_inner().unwrap();
    assert_eq!(calls.len(), 4);
    assert_eq!(calls.last(), Some(&(8, 8)));

    let offline =
        FairnessAssessment::with_precomputed(cohort(), &binning_config(), grid, None).unwrap();
    let evaluations = offline
        .evaluate(0, "accuracy_score", "demographic_parity_difference")
        .await
        .unwrap();
    assert_relative_eq!(evaluations[1].fairness, 1.0);

    let missing = offline
        .evaluate(0, "recall_score", "equal_opportunity_difference")
        .await
        .unwrap();
    assert!(missing[0].performance.is_none());
    assert!(missing[0].fairness.is_nan());
    assert_eq!(offline.cache().stats().fetches, 0);
}

#[tokio::test]
async fn test_precomputed_shape_must_match() {
    let result = FairnessAssessment::with_precomputed(
        cohort(),
        &binning_config(),
        PrecomputedMetrics::empty(1, 2),
        None,
    );
    assert!(matches!(
        result,
        Err(AssessmentError::ShapeMismatch {
            expected: (2, 2),
            actual: (1, 2)
        })
    ));
}

#[tokio::test]
async fn test_invalid_requests() {
    let assessment = FairnessAssessment::local(cohort(), &binning_config()).unwrap();

    assert!(matches!(
        assessment
            .evaluate(0, "no_such_metric", "demographic_parity_difference")
            .await,
        Err(AssessmentError::UnknownMetric(_))
    ));
    assert!(matches!(
        assessment
            .evaluate(0, "accuracy_score", "accuracy_score")
            .await,
        Err(AssessmentError::UnknownFairnessMetric(_))
    ));
    assert!(matches!(
        assessment
            .evaluate(2, "accuracy_score", "demographic_parity_difference")
            .await,
        Err(AssessmentError::FeatureOutOfRange { index: 2, count: 2 })
    ));
    assert!(matches!(
        assessment.precompute(&["no_such_metric"], None).await,
        Err(AssessmentError::UnknownMetric(_))
    ));
}
