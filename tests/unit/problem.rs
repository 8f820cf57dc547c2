//! Tests for problem files and the synthetic problem generator.

use alm_gibbs::{Problem, RadiometerParams, ResponseBlocks, SamplerError};

fn small() -> Problem {
    Problem::synthetic(2, 3, 4, &RadiometerParams::default(), 5)
}

#[test]
fn synthetic_shapes() {
    let params = RadiometerParams::default();
    let problem = Problem::synthetic(3, 4, 5, &params, 1);
    let n_coeff = (3 + 1) * (3 + 1);

    assert_eq!(problem.true_sky.len(), n_coeff);
    assert_eq!(problem.true_sky[0], 100.0);
    assert_eq!(problem.response.n_rows(), 6 * 5);
    assert_eq!(problem.response.n_cols(), n_coeff);
    assert_eq!(problem.auto_response.n_rows(), 4 * 5);
    assert!(problem.auto_response.imag.iter().flatten().all(|&x| x == 0.0));
    assert!(problem.data.is_none());
    assert!(problem.validate().is_ok());
}

#[test]
fn synthetic_with_autos_has_more_rows() {
    let params = RadiometerParams {
        include_autos: true,
        ..RadiometerParams::default()
    };
    let problem = Problem::synthetic(2, 4, 3, &params, 1);
    assert_eq!(problem.response.n_rows(), 10 * 3);
}

#[test]
fn synthetic_is_deterministic() {
    let params = RadiometerParams::default();
    assert_eq!(
        Problem::synthetic(2, 3, 4, &params, 9),
        Problem::synthetic(2, 3, 4, &params, 9)
    );
    assert_ne!(
        Problem::synthetic(2, 3, 4, &params, 9).true_sky,
        Problem::synthetic(2, 3, 4, &params, 10).true_sky
    );
}

#[test]
fn save_then_load() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("problem.json");
    let problem = small();

    problem.save(&path).unwrap();
    let loaded = Problem::load(&path).unwrap();
    assert_eq!(loaded, problem);
}

#[test]
fn load_rejects_inconsistent_problem() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("problem.json");
    let mut problem = small();
    problem.true_sky.pop();
    problem.save(&path).unwrap();

    match Problem::load(&path) {
        Err(SamplerError::InvalidProblem(msg)) => assert!(msg.contains("true_sky")),
        other => panic!("expected InvalidProblem, got {:?}", other),
    }
}

#[test]
fn load_reports_malformed_json() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("problem.json");
    std::fs::write(&path, "{ not json").unwrap();
    assert!(matches!(Problem::load(&path), Err(SamplerError::Json(_))));
}

#[test]
fn validate_rejects_wrong_column_count() {
    let mut problem = small();
    for row in problem.response.real.iter_mut() {
        row.push(0.0);
    }
    assert!(matches!(
        problem.validate(),
        Err(SamplerError::InvalidProblem(_))
    ));
}

#[test]
fn validate_rejects_autos_not_divisible_by_antennas() {
    let mut problem = small();
    problem.n_antennas = 5;
    assert!(matches!(
        problem.validate(),
        Err(SamplerError::InvalidProblem(_))
    ));
}

#[test]
fn validate_rejects_short_data() {
    let mut problem = small();
    let n = problem.response.n_rows();
    problem.data = Some(alm_gibbs::ObservedData {
        real: vec![0.0; n],
        imag: vec![0.0; n - 1],
    });
    assert!(matches!(
        problem.validate(),
        Err(SamplerError::InvalidProblem(_))
    ));
}

#[test]
fn ragged_rows_are_rejected() {
    let blocks = ResponseBlocks {
        real: vec![vec![1.0, 2.0], vec![3.0]],
        imag: vec![vec![0.0, 0.0], vec![0.0, 0.0]],
    };
    assert!(matches!(blocks.to_operator(), Err(SamplerError::Gibbs(_))));
}

#[test]
fn response_blocks_survive_operator_conversion() {
    let blocks = ResponseBlocks {
        real: vec![vec![1.0, 2.0], vec![3.0, 4.0], vec![5.0, 6.0]],
        imag: vec![vec![0.5, 0.0], vec![0.0, -0.5], vec![1.0, 1.0]],
    };
    let op = blocks.to_operator().unwrap();
    assert_eq!(op.n_vis(), 3);
    assert_eq!(op.n_coeff(), 2);
    assert_eq!(ResponseBlocks::from_operator(&op), blocks);
}

#[test]
fn supplied_data_is_used() {
    let mut problem = small();
    let n = problem.response.n_rows();
    problem.data = Some(alm_gibbs::ObservedData {
        real: (0..n).map(|i| i as f64).collect(),
        imag: vec![1.0; n],
    });
    let data = problem.observed().unwrap().unwrap();
    assert_eq!(data.len(), n);
    assert_eq!(data.real[2], 2.0);
    assert_eq!(data.imag[0], 1.0);
}
