use num_traits::Num;
use crate::{PenaltyWeights, QpSettings};

/// Smoother parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct SmootherParam
{
    /// Weight of the deviation from the finite-element position estimate.
    pub weight_fem_pos_deviation: f64,
    /// Weight of the path length.
    pub weight_path_length: f64,
    /// Weight of the deviation from the reference points.
    pub weight_ref_deviation: f64,
    /// Weight of the curvature constraint slack variables.
    pub weight_curvature_constraint_slack_var: f64,
    /// Maximum curvature in 1/m. `f64::INFINITY` disables the curvature constraint.
    pub curvature_constraint: f64,

    /// Settings of each QP solve.
    pub qp: QpSettings,

    /// Max number of QP solves, the first one included.
    pub sqp_max_iter: usize,
    /// Tolerance of the relative objective change.
    pub sqp_jtol: f64,
    /// Tolerance of the absolute objective change, used when the previous objective is zero.
    pub sqp_jtol_abs: f64,
    /// Refreshes the warm start by the latest iterate on every outer iteration.
    pub refresh_warm_start: bool,
}

impl Default for SmootherParam
{
    fn default() -> Self
    {
        SmootherParam {
            weight_fem_pos_deviation: 1e2,
            weight_path_length: 1.,
            weight_ref_deviation: 1.,
            weight_curvature_constraint_slack_var: 1e2,
            curvature_constraint: 0.2,

            qp: QpSettings::default(),

            sqp_max_iter: 100,
            sqp_jtol: 1e-4,
            sqp_jtol_abs: 1e-9,
            refresh_warm_start: false,
        }
    }
}

impl SmootherParam
{
    pub fn weights(&self) -> PenaltyWeights
    {
        PenaltyWeights {
            fem_pos_deviation: self.weight_fem_pos_deviation,
            path_length: self.weight_path_length,
            ref_deviation: self.weight_ref_deviation,
            curvature_slack: self.weight_curvature_constraint_slack_var,
        }
    }
}

//

/// Parses an environment variable `e` as a decimal number.
///
/// Returns `None` if `e` is unset or unparsable.
pub fn num_by_env<N: Num + std::fmt::Display>(e: &str) -> Option<N>
{
    if let Some(v) = std::env::var(e).ok()
                     .and_then(|s| {N::from_str_radix(s.trim(), 10).ok()}) {
        log::info!("{}: {}", e, v);
        Some(v)
    }
    else {
        None
    }
}

/// Overrides parameters by environment variables.
///
/// `SQP_MAX_ITER`, `SQP_JTOL`, `QP_MAX_ITER`, `QP_EPS_ACC`, `QP_TIME_LIMIT` and `CURVATURE_CONSTRAINT`
/// are read if set.
pub fn set_par_by_env(p: &mut SmootherParam)
{
    p.sqp_max_iter = num_by_env("SQP_MAX_ITER").unwrap_or(p.sqp_max_iter);
    p.sqp_jtol = num_by_env("SQP_JTOL").unwrap_or(p.sqp_jtol);
    p.qp.max_iter = num_by_env("QP_MAX_ITER").or(p.qp.max_iter);
    p.qp.eps_acc = num_by_env("QP_EPS_ACC").unwrap_or(p.qp.eps_acc);
    p.qp.time_limit = num_by_env("QP_TIME_LIMIT").unwrap_or(p.qp.time_limit);
    p.curvature_constraint = num_by_env("CURVATURE_CONSTRAINT").unwrap_or(p.curvature_constraint);
}

//

#[test]
fn test_set_par_by_env()
{
    let _ = env_logger::builder().is_test(true).try_init();

    std::env::set_var("SQP_MAX_ITER", "7");
    std::env::set_var("QP_MAX_ITER", "1234");
    std::env::set_var("SQP_JTOL", "bad");

    let mut p = SmootherParam::default();
    set_par_by_env(&mut p);

    std::env::remove_var("SQP_MAX_ITER");
    std::env::remove_var("QP_MAX_ITER");
    std::env::remove_var("SQP_JTOL");

    assert_eq!(p.sqp_max_iter, 7);
    assert_eq!(p.qp.max_iter, Some(1234));
    assert_eq!(p.sqp_jtol, SmootherParam::default().sqp_jtol);
    assert_eq!(p.weights().fem_pos_deviation, 1e2);
}
