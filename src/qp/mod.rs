//! QP capability
//!
//! <script src="https://polyfill.io/v3/polyfill.min.js?features=es6"></script>
//! <script id="MathJax-script" async src="https://cdn.jsdelivr.net/npm/mathjax@3/es5/tex-mml-chtml.js"></script>
//!
//! The problem is
//! \\[
//! \begin{array}{ll}
//! {\rm minimize} & {1 \over 2} x^T P x + q^T x \\\\
//! {\rm subject \ to} & l \preceq A x \preceq u,
//! \end{array}
//! \\]
//! where \\(P\\) is stored as its upper triangle.
//! Bounds of magnitude [`crate::QP_INFTY`] or more are absent.

mod prob;
mod backend;

pub use prob::*;
pub use backend::*;

use crate::{CscMat, QP_INFTY};

//

/// QP status, numbered as OSQP does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QpStatus
{
    Solved,
    SolvedInaccurate,
    MaxIterReached,
    PrimalInfeasible,
    DualInfeasible,
    TimeLimitReached,
    NonConvex,
    Unsolved,
    SolverFailure,
    /// Problem data or an update rejected before solving.
    InvalidData,
}

impl QpStatus
{
    /// Status code; negative values are hard failures.
    pub fn code(&self) -> i32
    {
        match self {
            QpStatus::Solved           => 1,
            QpStatus::SolvedInaccurate => 2,
            QpStatus::MaxIterReached   => -2,
            QpStatus::PrimalInfeasible => -3,
            QpStatus::DualInfeasible   => -4,
            QpStatus::TimeLimitReached => -6,
            QpStatus::NonConvex        => -7,
            QpStatus::Unsolved         => -10,
            QpStatus::SolverFailure    => -11,
            QpStatus::InvalidData      => -12,
        }
    }

    /// Checks if the primal solution is usable.
    pub fn is_success(&self) -> bool
    {
        matches!(self, QpStatus::Solved | QpStatus::SolvedInaccurate)
    }
}

impl core::fmt::Display for QpStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{} ({})", match &self {
            QpStatus::Solved           => "solved",
            QpStatus::SolvedInaccurate => "solved inaccurate",
            QpStatus::MaxIterReached   => "maximum iterations reached",
            QpStatus::PrimalInfeasible => "primal infeasible",
            QpStatus::DualInfeasible   => "dual infeasible",
            QpStatus::TimeLimitReached => "run time limit reached",
            QpStatus::NonConvex        => "problem non convex",
            QpStatus::Unsolved         => "unsolved",
            QpStatus::SolverFailure    => "solver failure",
            QpStatus::InvalidData      => "invalid data",
        }, self.code())
    }
}

//

/// QP solver settings.
#[derive(Debug, Clone, PartialEq)]
pub struct QpSettings
{
    /// Max iteration number of each solve. `None` means no upper limit.
    pub max_iter: Option<usize>,
    /// Wall-clock limit of each solve in seconds. Zero disables.
    pub time_limit: f64,
    /// Outputs solver progress log.
    pub verbose: bool,
    /// Termination checks on equilibrated constraint rows.
    pub scaled_termination: bool,
    /// Starts each solve from the supplied primal warm start.
    pub warm_start: bool,
    /// Tolerance of the primal residual, dual residual and duality gap.
    pub eps_acc: f64,
    /// Tolerance of the unboundness and infeasibility.
    pub eps_inf: f64,
    /// Tolerance of small positive value to avoid division by zero.
    pub eps_zero: f64,
}

impl Default for QpSettings
{
    fn default() -> Self
    {
        QpSettings {
            max_iter: Some(100_000),
            time_limit: 0.,
            verbose: false,
            scaled_termination: true,
            warm_start: true,
            eps_acc: 1e-6,
            eps_inf: 1e-6,
            eps_zero: 1e-12,
        }
    }
}

//

/// QP data handed to [`QpBackend::setup`].
#[derive(Debug, Clone)]
pub struct QpData
{
    /// \\(P\\), upper triangle.
    pub mat_p: CscMat,
    pub vec_q: Vec<f64>,
    pub mat_a: CscMat,
    pub lower: Vec<f64>,
    pub upper: Vec<f64>,
}

impl QpData
{
    /// Number of variables and constraints.
    pub fn dim(&self) -> (usize, usize)
    {
        (self.vec_q.len(), self.lower.len())
    }

    /// Checks shapes, the upper-triangular storage of \\(P\\) and \\(l \preceq u\\).
    pub fn check(&self) -> Result<(), QpStatus>
    {
        let (n, m) = self.dim();

        if self.mat_p.size() != (n, n) || !self.mat_p.is_upper() {
            log::error!("P shall be {0} x {0} upper triangular, got {1:?}", n, self.mat_p.size());
            return Err(QpStatus::InvalidData);
        }
        if self.mat_a.size() != (m, n) || self.upper.len() != m {
            log::error!("A shall be {} x {}, got {:?}", m, n, self.mat_a.size());
            return Err(QpStatus::InvalidData);
        }
        check_bounds(&self.lower, &self.upper)
    }
}

fn check_bounds(lower: &[f64], upper: &[f64]) -> Result<(), QpStatus>
{
    if lower.len() != upper.len() {
        log::error!("bounds length mismatch: {} and {}", lower.len(), upper.len());
        return Err(QpStatus::InvalidData);
    }
    for (i, (l, u)) in lower.iter().zip(upper).enumerate() {
        if !(l <= u) || l.is_nan() || *l >= QP_INFTY || *u <= -QP_INFTY {
            log::error!("invalid bounds at row {}: [{}, {}]", i, l, u);
            return Err(QpStatus::InvalidData);
        }
    }
    Ok(())
}

/// Information of one solve.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QpInfo
{
    pub status: QpStatus,
    /// \\({1 \over 2} x^T P x + q^T x\\); infinite unless solved.
    pub obj_val: f64,
}

//

/// QP solver capability
pub trait QpBackend
{
    /// Solver-owned state of one problem, released on drop.
    type Workspace: QpWorkspace;

    /// Sets up a workspace with problem data and settings.
    fn setup(&self, data: QpData, settings: &QpSettings) -> Result<Self::Workspace, QpStatus>;
}

/// QP workspace
///
/// The sparsity pattern of \\(A\\) is fixed by [`QpBackend::setup`].
pub trait QpWorkspace
{
    /// Sets the primal warm start, of length \\(n\\).
    fn warm_start_x(&mut self, x: &[f64]) -> Result<(), QpStatus>;

    /// Replaces the values of \\(A\\) in storage order.
    fn update_a_values(&mut self, a_data: &[f64]) -> Result<(), QpStatus>;

    /// Replaces \\(l\\) and \\(u\\).
    fn update_bounds(&mut self, lower: &[f64], upper: &[f64]) -> Result<(), QpStatus>;

    /// Solves the current problem.
    fn solve(&mut self) -> QpInfo;

    /// Primal solution of the last successful solve.
    fn solution(&self) -> &[f64];
}

//

#[test]
fn test_status_codes()
{
    assert!(QpStatus::Solved.is_success());
    assert!(QpStatus::SolvedInaccurate.is_success());
    assert!(!QpStatus::Unsolved.is_success());
    assert!(!QpStatus::MaxIterReached.is_success());
    assert_eq!(QpStatus::Solved.code(), 1);
    assert_eq!(QpStatus::SolvedInaccurate.code(), 2);
    assert!(QpStatus::PrimalInfeasible.code() < 0);
    assert_eq!(format!("{}", QpStatus::TimeLimitReached), "run time limit reached (-6)");
}

#[test]
fn test_check_bounds()
{
    assert!(check_bounds(&[0., -QP_INFTY], &[1., 2.]).is_ok());
    assert_eq!(check_bounds(&[1.], &[0.]), Err(QpStatus::InvalidData));
    assert_eq!(check_bounds(&[f64::NAN], &[0.]), Err(QpStatus::InvalidData));
    assert_eq!(check_bounds(&[0.], &[0., 1.]), Err(QpStatus::InvalidData));
}
