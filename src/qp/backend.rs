use std::marker::PhantomData;
use std::time::Instant;
use totsu::MatBuild;
use totsu_core::solver::{Solver, SolverError};
use totsu_core::{LinAlgEx, FloatGeneric};
use crate::{QP_INFTY, CscMat, QpBackend, QpWorkspace, QpData, QpSettings, QpInfo, QpStatus, ProbBoxQP, sym_p_sqrt};
use super::check_bounds;

//

/// [`QpBackend`] by the [`totsu_core`] first-order conic solver.
#[derive(Debug, Clone, Copy)]
pub struct TotsuBackend<L: LinAlgEx<F = f64> = FloatGeneric<f64>>
{
    ph_l: PhantomData<L>,
}

impl<L: LinAlgEx<F = f64>> TotsuBackend<L>
{
    pub fn new() -> Self
    {
        TotsuBackend {
            ph_l: PhantomData,
        }
    }
}

impl<L: LinAlgEx<F = f64>> Default for TotsuBackend<L>
{
    fn default() -> Self
    {
        Self::new()
    }
}

impl<L: LinAlgEx<F = f64>> QpBackend for TotsuBackend<L>
{
    type Workspace = TotsuWorkspace<L>;

    fn setup(&self, data: QpData, settings: &QpSettings) -> Result<Self::Workspace, QpStatus>
    {
        data.check()?;

        let (n, m) = data.dim();
        log::trace!("setup: {} variables, {} constraints, nnz(A) = {}", n, m, data.mat_a.nnz());

        let cost_scale = cost_scale(&data.mat_p);
        log::trace!("cost scale: {:.3e}", cost_scale);
        let sym_p_sqrt = sym_p_sqrt(&data.mat_p, cost_scale, settings.eps_zero);

        Ok(TotsuWorkspace {
            data,
            settings: settings.clone(),
            cost_scale,
            sym_p_sqrt,
            warm_start: None,
            x: vec![0.; n],
        })
    }
}

/// Reciprocal of the largest diagonal element of \\(P\\), or one if there is none.
fn cost_scale(mat_p: &CscMat) -> f64
{
    let n = mat_p.size().0;

    let max_diag = (0.. n).map(|i| mat_p.get(i, i)).fold(0., f64::max);

    if max_diag.is_normal() {
        max_diag.recip()
    }
    else {
        1.
    }
}

//

/// Workspace of [`TotsuBackend`]
///
/// Warm start is realized by solving for the displacement \\(\delta = x - x_0\\)
/// from the warm start \\(x_0\\):
/// \\(q\\) becomes \\(q + P x_0\\) and the bounds become \\(l - A x_0, u - A x_0\\).
///
/// The solver sees the cost \\(\alpha ({1 \over 2} x^T P x + q^T x)\\)
/// with \\(\alpha\\) the reciprocal of the largest diagonal element of \\(P\\).
/// The reported objective is unscaled.
pub struct TotsuWorkspace<L: LinAlgEx<F = f64>>
{
    data: QpData,
    settings: QpSettings,
    cost_scale: f64,
    sym_p_sqrt: MatBuild<L>,
    warm_start: Option<Vec<f64>>,
    x: Vec<f64>,
}

impl<L: LinAlgEx<F = f64>> TotsuWorkspace<L>
{
    fn shifted(&self, x0: &[f64]) -> (Vec<f64>, Vec<f64>, Vec<f64>)
    {
        let (n, m) = self.data.dim();

        let mut q = self.data.vec_q.clone();
        let mut px0 = vec![0.; n];
        self.data.mat_p.sym_upper_mul_vec(x0, &mut px0);
        for (e, v) in q.iter_mut().zip(&px0) {
            *e += v;
        }

        let mut ax0 = vec![0.; m];
        self.data.mat_a.mul_vec(1., x0, 0., &mut ax0);

        let shift = |b: &[f64]| -> Vec<f64> {
            b.iter().zip(&ax0).map(|(&v, &a)| {
                if v.abs() >= QP_INFTY {
                    v
                }
                else {
                    v - a
                }
            }).collect()
        };
        let lower = shift(&self.data.lower);
        let upper = shift(&self.data.upper);

        (q, lower, upper)
    }

    fn solve_core(&mut self) -> QpStatus
    {
        let n = self.data.dim().0;

        let x0 = match (&self.warm_start, self.settings.warm_start) {
            (Some(x0), true) => Some(x0.clone()),
            _ => None,
        };
        let (mut q, lower, upper) = match &x0 {
            Some(x0) => self.shifted(x0),
            None => (self.data.vec_q.clone(), self.data.lower.clone(), self.data.upper.clone()),
        };
        for e in q.iter_mut() {
            *e *= self.cost_scale;
        }

        let settings = &self.settings;
        let s = Solver::<L>::new().par(|p| {
            p.max_iter = settings.max_iter;
            p.eps_acc = settings.eps_acc;
            p.eps_inf = settings.eps_inf;
            p.eps_zero = settings.eps_zero;
            if settings.verbose {
                p.log_period = 100;
            }
        });

        let mut prob = ProbBoxQP::new(
            &self.sym_p_sqrt, &q,
            &self.data.mat_a, &lower, &upper,
            settings.scaled_termination
        );
        log::trace!("conic rows: {}", 2 + n + prob.num_bound_rows());

        let rslt = s.solve(prob.problem());

        match rslt {
            Ok((x, _)) => {
                self.x.copy_from_slice(&x[0.. n]);
                if let Some(x0) = &x0 {
                    for (e, v) in self.x.iter_mut().zip(x0) {
                        *e += v;
                    }
                }
                QpStatus::Solved
            },
            Err(e) => {
                log::warn!("{}", e);
                match e {
                    SolverError::ExcessIter => QpStatus::MaxIterReached,
                    SolverError::Infeasible => QpStatus::PrimalInfeasible,
                    SolverError::Unbounded => QpStatus::DualInfeasible,
                    SolverError::InvalidOp | SolverError::WorkShortage | SolverError::ConeFailure => QpStatus::SolverFailure,
                }
            },
        }
    }
}

impl<L: LinAlgEx<F = f64>> QpWorkspace for TotsuWorkspace<L>
{
    fn warm_start_x(&mut self, x: &[f64]) -> Result<(), QpStatus>
    {
        if x.len() != self.data.dim().0 || !x.iter().all(|v| v.is_finite()) {
            log::error!("invalid warm start of length {}", x.len());
            return Err(QpStatus::InvalidData);
        }

        match &mut self.warm_start {
            Some(ws) => ws.copy_from_slice(x),
            None => self.warm_start = Some(x.to_vec()),
        }
        Ok(())
    }

    fn update_a_values(&mut self, a_data: &[f64]) -> Result<(), QpStatus>
    {
        self.data.mat_a.set_data(a_data).map_err(|_| {
            log::error!("{} values given for nnz(A) = {}", a_data.len(), self.data.mat_a.nnz());
            QpStatus::InvalidData
        })
    }

    fn update_bounds(&mut self, lower: &[f64], upper: &[f64]) -> Result<(), QpStatus>
    {
        if lower.len() != self.data.dim().1 {
            log::error!("{} bounds given for {} constraints", lower.len(), self.data.dim().1);
            return Err(QpStatus::InvalidData);
        }
        check_bounds(lower, upper)?;

        self.data.lower.copy_from_slice(lower);
        self.data.upper.copy_from_slice(upper);
        Ok(())
    }

    fn solve(&mut self) -> QpInfo
    {
        let start = Instant::now();
        let mut status = self.solve_core();

        let elapsed = start.elapsed().as_secs_f64();
        log::trace!("solve: {} in {:.3e} s", status, elapsed);

        if self.settings.time_limit > 0. && elapsed > self.settings.time_limit {
            log::warn!("time limit {} s exceeded: {:.3e} s", self.settings.time_limit, elapsed);
            status = QpStatus::TimeLimitReached;
        }

        let obj_val = if status.is_success() {
            0.5 * self.data.mat_p.quad_form_upper(&self.x)
            + self.data.vec_q.iter().zip(&self.x).map(|(q, x)| q * x).sum::<f64>()
        }
        else {
            f64::INFINITY
        };

        QpInfo {
            status,
            obj_val,
        }
    }

    fn solution(&self) -> &[f64]
    {
        &self.x
    }
}

impl<L: LinAlgEx<F = f64>> Drop for TotsuWorkspace<L>
{
    fn drop(&mut self)
    {
        log::trace!("workspace released");
    }
}

//

#[test]
fn test_totsu_backend_box_qp()
{
    use float_eq::assert_float_eq;

    let _ = env_logger::builder().is_test(true).try_init();

    // minimize (1/2)(x0^2 + x1^2) - x0 - 4 x1  s.t. x0 + x1 <= 2, -1 <= x0 <= 1
    let data = QpData {
        mat_p: CscMat::from_columns(2, &[
            vec![(0, 1.)],
            vec![(1, 1.)],
        ]),
        vec_q: vec![-1., -4.],
        mat_a: CscMat::from_columns(2, &[
            vec![(0, 1.), (1, 1.)],
            vec![(1, 1.)],
        ]),
        lower: vec![-1., -QP_INFTY],
        upper: vec![1., 2.],
    };
    let settings = QpSettings::default();

    let backend = TotsuBackend::<FloatGeneric<f64>>::new();
    let mut ws = backend.setup(data, &settings).unwrap();

    let info = ws.solve();
    assert_eq!(info.status, QpStatus::Solved);
    // projection of (1, 4) onto x0 + x1 <= 2
    assert_float_eq!(ws.solution(), [-0.5, 2.5].as_ref(), abs_all <= 1e-3);
    assert_float_eq!(info.obj_val, 0.5 * (0.25 + 6.25) + 0.5 - 10., abs <= 1e-3);

    // warm start does not move the optimum
    ws.warm_start_x(&[0., 2.]).unwrap();
    let info = ws.solve();
    assert_eq!(info.status, QpStatus::Solved);
    assert_float_eq!(ws.solution(), [-0.5, 2.5].as_ref(), abs_all <= 1e-3);

    // x0 >= 0 now
    ws.update_bounds(&[0., -QP_INFTY], &[1., 2.]).unwrap();
    let info = ws.solve();
    assert_eq!(info.status, QpStatus::Solved);
    assert_float_eq!(ws.solution(), [0., 2.].as_ref(), abs_all <= 1e-3);

    assert_eq!(ws.update_a_values(&[1., 1.]), Err(QpStatus::InvalidData));
    assert_eq!(ws.update_bounds(&[2., 0.], &[1., 2.]), Err(QpStatus::InvalidData));
    assert_eq!(ws.warm_start_x(&[0.]), Err(QpStatus::InvalidData));
}

#[test]
fn test_totsu_backend_reject()
{
    let backend = TotsuBackend::<FloatGeneric<f64>>::new();

    // lower triangle in P
    let data = QpData {
        mat_p: CscMat::from_columns(2, &[
            vec![(0, 1.), (1, 1.)],
            vec![(1, 1.)],
        ]),
        vec_q: vec![0., 0.],
        mat_a: CscMat::from_columns(0, &[vec![], vec![]]),
        lower: vec![],
        upper: vec![],
    };
    assert!(matches!(backend.setup(data, &QpSettings::default()), Err(QpStatus::InvalidData)));
}

#[test]
fn test_totsu_backend_heavy_cost()
{
    use float_eq::assert_float_eq;

    let _ = env_logger::builder().is_test(true).try_init();

    // minimize (1/2) w (x0 - x1)^2 + (1/2)(x0^2 + x1^2) - 2 w x0 - w x1  s.t. 0 <= x0 <= 1, 0 <= x1 <= 0.5
    let w = 1e3;
    let data = QpData {
        mat_p: CscMat::from_columns(2, &[
            vec![(0, w + 1.)],
            vec![(0, -w), (1, w + 1.)],
        ]),
        vec_q: vec![-2. * w, -w],
        mat_a: CscMat::from_columns(2, &[
            vec![(0, 1.)],
            vec![(1, 1.)],
        ]),
        lower: vec![0., 0.],
        upper: vec![1., 0.5],
    };
    assert_float_eq!(cost_scale(&data.mat_p), 1. / (w + 1.), rmax <= 1e-12);

    let backend = TotsuBackend::<FloatGeneric<f64>>::new();
    let mut ws = backend.setup(data, &QpSettings::default()).unwrap();
    ws.warm_start_x(&[0., 0.]).unwrap();

    let info = ws.solve();
    assert_eq!(info.status, QpStatus::Solved);
    // both upper bounds active
    assert_float_eq!(ws.solution(), [1., 0.5].as_ref(), abs_all <= 1e-3);
    // reported unscaled
    let obj = 0.5 * (w * 0.25 + 1.25) - 2.5 * w;
    assert_float_eq!(info.obj_val, obj, rmax <= 1e-5);
}
