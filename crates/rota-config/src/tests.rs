use super::*;

#[test]
fn defaults_are_valid() {
    let settings = SearchSettings::default();
    settings.validate().unwrap();
    assert_eq!(settings.thread_count, 1);
    assert_eq!(settings.block_sizes, vec![1, 2, 3, 4, 5, 6, 7]);
    assert_eq!(settings.selection_policy, SelectionPolicy::FirstImproving);
    assert_eq!(
        settings.insertion_strategy,
        InsertionStrategy::ReplaceInWorstSet
    );
    assert!(settings.time_limit().is_none());
}

#[test]
fn toml_round_trip() {
    let settings = SearchSettings::default()
        .with_thread_count(4)
        .with_random_seed(7)
        .with_time_limit_secs(120);
    let text = toml::to_string(&settings).unwrap();
    let parsed = SearchSettings::from_toml_str(&text).unwrap();
    assert_eq!(parsed.thread_count, 4);
    assert_eq!(parsed.random_seed, Some(7));
    assert_eq!(parsed.time_limit(), Some(Duration::from_secs(120)));
}

#[test]
fn partial_toml_fills_defaults() {
    let settings = SearchSettings::from_toml_str(
        r#"
        max_iterations = 500
        insertion_strategy = "replace_one_of_worst"
    "#,
    )
    .unwrap();
    assert_eq!(settings.max_iterations, Some(500));
    assert_eq!(
        settings.insertion_strategy,
        InsertionStrategy::ReplaceOneOfWorst
    );
    assert_eq!(settings.restart_iterations, 60);
    assert!((settings.worse_acceptance_rate - 0.05).abs() < 1e-9);
}

#[test]
fn yaml_parses_nested_trace() {
    let settings = SearchSettings::from_yaml_str(
        r#"
        thread_count: 2
        selection_policy: best_improving
        trace:
          record_best_found: true
          record_period_millis: 250
    "#,
    )
    .unwrap();
    assert_eq!(settings.thread_count, 2);
    assert_eq!(settings.selection_policy, SelectionPolicy::BestImproving);
    assert!(settings.trace.record_best_found);
    assert_eq!(settings.trace.record_period(), Duration::from_millis(250));
}

#[test]
fn validate_rejects_out_of_range_values() {
    let mut settings = SearchSettings::default();
    settings.thread_count = 0;
    assert!(settings.validate().is_err());

    let mut settings = SearchSettings::default();
    settings.worse_acceptance_rate = 1.5;
    assert!(settings.validate().is_err());

    let mut settings = SearchSettings::default();
    settings.perturbation_strength = -0.1;
    assert!(settings.validate().is_err());

    let mut settings = SearchSettings::default();
    settings.population_size = 0;
    assert!(settings.validate().is_err());

    let mut settings = SearchSettings::default();
    settings.block_sizes = vec![1, 0];
    assert!(settings.validate().is_err());

    let mut settings = SearchSettings::default();
    settings.crossover_block_sizes = vec![];
    assert!(settings.validate().is_err());
}

#[test]
fn missing_file_surfaces_io_error() {
    let err = SearchSettings::load("does-not-exist.toml").unwrap_err();
    assert!(matches!(err, ConfigError::Io(_)));
}
