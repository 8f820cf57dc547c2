//! Tests for configuration validation.
//!
//! Builder methods reject invalid values with a panic; `validate` reports
//! the same problems for configurations read from a file.

use alm_gibbs::{
    Config, ConfigError, CosmicVariance, Preconditioner, SkyFractionPlacement, DEFAULT_BATCH_SIZE,
};

// =============================================================================
// DEFAULTS
// =============================================================================

#[test]
fn defaults_are_valid() {
    let config = Config::default();
    assert_eq!(config.n_samples, 100);
    assert_eq!(config.tolerance, 1e-5);
    assert_eq!(config.max_iterations, 15_000);
    assert_eq!(config.data_seed, 10);
    assert_eq!(config.prior_seed, 20);
    assert_eq!(config.batch_size, DEFAULT_BATCH_SIZE);
    assert_eq!(config.preconditioner, Preconditioner::None);
    assert!(config.pin_monopole);
    assert!(!config.prior.cosmic_variance.is_enabled());
    assert!(config.validate().is_ok());
}

#[test]
fn quick_is_valid() {
    let config = Config::quick();
    assert_eq!(config.n_samples, 10);
    assert!(config.validate().is_ok());
}

// =============================================================================
// BUILDER PANICS
// =============================================================================

#[test]
#[should_panic(expected = "n_samples must be > 0")]
fn n_samples_zero_panics() {
    let _ = Config::new().n_samples(0);
}

#[test]
#[should_panic(expected = "tolerance must be in (0, 1)")]
fn tolerance_zero_panics() {
    let _ = Config::new().tolerance(0.0);
}

#[test]
#[should_panic(expected = "tolerance must be in (0, 1)")]
fn tolerance_one_panics() {
    let _ = Config::new().tolerance(1.0);
}

#[test]
#[should_panic(expected = "max_iterations must be > 0")]
fn max_iterations_zero_panics() {
    let _ = Config::new().max_iterations(0);
}

#[test]
#[should_panic(expected = "batch_size must be > 0")]
fn batch_size_zero_panics() {
    let _ = Config::new().batch_size(0);
}

#[test]
#[should_panic(expected = "n_nights must be > 0")]
fn n_nights_zero_panics() {
    let _ = Config::new().n_nights(0);
}

#[test]
#[should_panic(expected = "f_sky must be in (0, 1]")]
fn f_sky_zero_panics() {
    let _ = Config::new().sky_fraction(0.0, SkyFractionPlacement::Scale);
}

#[test]
#[should_panic(expected = "f_sky must be in (0, 1]")]
fn f_sky_above_one_panics() {
    let _ = Config::new().sky_fraction(1.5, SkyFractionPlacement::InverseSqrt);
}

// =============================================================================
// BUILDER VALUES
// =============================================================================

#[test]
fn builders_set_fields() {
    let config = Config::new()
        .job_id(7)
        .data_seed(11)
        .prior_seed(12)
        .n_samples(3)
        .tolerance(1e-8)
        .max_iterations(50)
        .preconditioner(Preconditioner::Jacobi)
        .pin_monopole(false)
        .include_autos(true)
        .n_nights(4)
        .batch_size(2);

    assert_eq!(config.job_id, 7);
    assert_eq!(config.data_seed, 11);
    assert_eq!(config.prior_seed, 12);
    assert_eq!(config.n_samples, 3);
    assert_eq!(config.tolerance, 1e-8);
    assert_eq!(config.max_iterations, 50);
    assert!(!config.pin_monopole);
    assert!(config.radiometer.include_autos);
    assert_eq!(config.radiometer.n_nights, 4);
    assert_eq!(config.batch_size, 2);

    let chain = config.chain_config();
    assert_eq!(chain.job_id, 7);
    assert_eq!(chain.n_samples, 3);
    assert!(!chain.pin_monopole);
    assert_eq!(chain.solver.tolerance, 1e-8);
    assert_eq!(chain.solver.max_iterations, 50);
    assert_eq!(chain.solver.preconditioner, Preconditioner::Jacobi);
}

#[test]
fn cosmic_variance_toggle() {
    let on = Config::new().cosmic_variance(true);
    assert_eq!(on.prior.cosmic_variance, CosmicVariance::full_sky());

    let off = on.cosmic_variance(false);
    assert_eq!(off.prior.cosmic_variance, CosmicVariance::Disabled);
}

#[test]
fn enabling_keeps_partial_sky_settings() {
    let partial = Config::new().sky_fraction(0.4, SkyFractionPlacement::InverseSqrt);
    let before = partial.prior.cosmic_variance;

    let again = partial.cosmic_variance(true);
    assert_eq!(again.prior.cosmic_variance, before);

    let from_json: Config = serde_json::from_str(
        r#"{ "prior": { "cosmic_variance": { "mode": "enabled", "fraction": 0.2, "f_sky": 0.3, "placement": "scale" } } }"#,
    )
    .unwrap();
    let toggled = from_json.clone().cosmic_variance(true);
    assert_eq!(toggled.prior.cosmic_variance, from_json.prior.cosmic_variance);
}

#[test]
fn sky_fraction_enables_cosmic_variance() {
    let config = Config::new().sky_fraction(0.3, SkyFractionPlacement::InverseSqrt);
    match config.prior.cosmic_variance {
        CosmicVariance::Enabled {
            f_sky, placement, ..
        } => {
            assert_eq!(f_sky, 0.3);
            assert_eq!(placement, SkyFractionPlacement::InverseSqrt);
        }
        CosmicVariance::Disabled => panic!("sky_fraction should enable cosmic variance"),
    }
    assert!(config.validate().is_ok());
}

// =============================================================================
// VALIDATE
// =============================================================================

#[test]
fn validate_rejects_zero_counts() {
    let mut config = Config::default();
    config.n_samples = 0;
    assert_eq!(config.validate(), Err(ConfigError::Zero("n_samples")));

    let mut config = Config::default();
    config.batch_size = 0;
    assert_eq!(config.validate(), Err(ConfigError::Zero("batch_size")));
}

#[test]
fn validate_rejects_bad_tolerance() {
    let mut config = Config::default();
    config.tolerance = f64::NAN;
    assert!(matches!(
        config.validate(),
        Err(ConfigError::OutOfRange {
            field: "tolerance",
            ..
        })
    ));
}

#[test]
fn validate_rejects_non_positive_integration() {
    let mut config = Config::default();
    config.radiometer.delta_time = 0.0;
    assert!(matches!(
        config.validate(),
        Err(ConfigError::OutOfRange {
            field: "delta_time",
            ..
        })
    ));
}

#[test]
fn validate_rejects_bad_f_sky() {
    let mut config = Config::default();
    config.prior.cosmic_variance = CosmicVariance::Enabled {
        fraction: 0.1,
        f_sky: 2.0,
        placement: SkyFractionPlacement::Scale,
    };
    assert!(matches!(
        config.validate(),
        Err(ConfigError::OutOfRange { field: "f_sky", .. })
    ));
}

#[test]
fn config_error_messages() {
    assert_eq!(
        ConfigError::Zero("batch_size").to_string(),
        "batch_size must be > 0"
    );
    let err = ConfigError::OutOfRange {
        field: "tolerance",
        value: 2.0,
        range: "(0, 1)",
    };
    assert_eq!(err.to_string(), "tolerance must be in (0, 1), got 2");
}

// =============================================================================
// SERIALIZATION
// =============================================================================

#[test]
fn partial_json_fills_defaults() {
    let config: Config =
        serde_json::from_str(r#"{ "job_id": 4, "n_samples": 25, "preconditioner": "jacobi" }"#)
            .unwrap();
    assert_eq!(config.job_id, 4);
    assert_eq!(config.n_samples, 25);
    assert_eq!(config.preconditioner, Preconditioner::Jacobi);
    assert_eq!(config.tolerance, 1e-5);
    assert!(config.validate().is_ok());
}

#[test]
fn json_preserves_config() {
    let config = Config::quick()
        .job_id(2)
        .sky_fraction(0.5, SkyFractionPlacement::Scale)
        .pin_monopole(true);
    let json = serde_json::to_string(&config).unwrap();
    let back: Config = serde_json::from_str(&json).unwrap();
    assert_eq!(back, config);
}
