use crate::{SmootherError, SmootherParam, ProblemDims, QpBackend, QpWorkspace, QpData, TotsuBackend};
use crate::{calc_kernel, calc_offset, curvature_bound_sqr, AffineConstraint, PrimalWarmStart};

//

/// Smoothed path.
#[derive(Debug, Clone, PartialEq)]
pub struct SmoothedPath
{
    pub x: Vec<f64>,
    pub y: Vec<f64>,
    /// Curvature slack of each interior point.
    pub slack: Vec<f64>,
    /// QP objective of the last solve.
    pub objective: f64,
    /// Number of QP solves, the first one included.
    pub sqp_iterations: usize,
}

impl SmoothedPath
{
    /// Point sequence of the path.
    pub fn points(&self) -> impl Iterator<Item=(f64, f64)> + '_
    {
        self.x.iter().copied().zip(self.y.iter().copied())
    }
}

fn extract_points(dims: &ProblemDims, x: &[f64]) -> Vec<(f64, f64)>
{
    assert!(x.len() >= dims.num_pos_vars);

    x[0.. dims.num_pos_vars].chunks_exact(2)
        .map(|c| (c[0], c[1]))
        .collect()
}

//

/// FEM position deviation smoother with an SQP curvature loop
///
/// <script src="https://polyfill.io/v3/polyfill.min.js?features=es6"></script>
/// <script id="MathJax-script" async src="https://cdn.jsdelivr.net/npm/mathjax@3/es5/tex-mml-chtml.js"></script>
///
/// The first QP is linearized around the reference points.
/// Each outer iteration re-linearizes the curvature rows around the latest solution,
/// updates \\(A, l, u\\) of the same QP workspace and solves again,
/// until the relative objective change falls below [`SmootherParam::sqp_jtol`].
pub struct FemPosSqpSmoother<B: QpBackend = TotsuBackend>
{
    /// smoother parameters.
    pub par: SmootherParam,
    backend: B,
}

impl FemPosSqpSmoother
{
    /// Creates an instance with [`TotsuBackend`].
    ///
    /// Returns [`FemPosSqpSmoother`] instance.
    pub fn new() -> Self
    {
        Self::with_backend(TotsuBackend::new())
    }
}

impl Default for FemPosSqpSmoother
{
    fn default() -> Self
    {
        Self::new()
    }
}

impl<B: QpBackend> FemPosSqpSmoother<B>
{
    /// Creates an instance with a given QP backend.
    pub fn with_backend(backend: B) -> Self
    {
        FemPosSqpSmoother {
            par: SmootherParam::default(),
            backend,
        }
    }

    /// Changes smoother parameters.
    ///
    /// Returns [`FemPosSqpSmoother`] with its parameters changed.
    /// * `f` is a function to change parameters given by its argument.
    pub fn par<P>(mut self, f: P) -> Self
    where P: FnOnce(&mut SmootherParam)
    {
        f(&mut self.par);
        self
    }

    pub fn backend(&self) -> &B
    {
        &self.backend
    }

    fn validate(&self, ref_points: &[(f64, f64)], bounds: &[f64]) -> Result<ProblemDims, SmootherError>
    {
        if ref_points.is_empty() {
            log::error!("reference points empty");
            return Err(SmootherError::EmptyInput);
        }
        if ref_points.len() != bounds.len() {
            log::error!("{} reference points but {} bounds", ref_points.len(), bounds.len());
            return Err(SmootherError::SizeMismatch {
                points: ref_points.len(),
                bounds: bounds.len(),
            });
        }

        let dims = ProblemDims::new(ref_points.len()).map_err(|e| {
            log::error!("{}", e);
            e
        })?;

        if !self.par.weights().is_valid() {
            log::error!("invalid weights: {:?}", self.par.weights());
            return Err(SmootherError::InvalidInput);
        }
        if self.par.curvature_constraint.is_nan() || self.par.curvature_constraint <= 0. {
            log::error!("invalid curvature constraint: {}", self.par.curvature_constraint);
            return Err(SmootherError::InvalidInput);
        }
        if let Some(i) = bounds.iter().position(|b| !(b.is_finite() && *b >= 0.)) {
            log::error!("invalid bound at {}: {}", i, bounds[i]);
            return Err(SmootherError::InvalidInput);
        }
        if let Some(i) = ref_points.iter().position(|p| !(p.0.is_finite() && p.1.is_finite())) {
            log::error!("invalid reference point at {}: {:?}", i, ref_points[i]);
            return Err(SmootherError::InvalidInput);
        }

        Ok(dims)
    }

    fn objective_change(&self, prev: f64, obj: f64) -> f64
    {
        let diff = (prev - obj).abs();

        if prev.abs() <= self.par.sqp_jtol_abs {
            if diff <= self.par.sqp_jtol_abs {
                0.
            }
            else {
                f64::INFINITY
            }
        }
        else {
            diff / prev.abs()
        }
    }

    /// Smooths reference points.
    ///
    /// Returns `Ok` with a [`SmoothedPath`] or `Err` with [`SmootherError`] type.
    /// * `ref_points` is the reference point sequence, at least 3 points.
    /// * `bounds` is the half-width of the box around each reference point
    ///   within which the smoothed point lies.
    ///
    /// Input errors are detected before any QP workspace is set up.
    pub fn try_solve(&self, ref_points: &[(f64, f64)], bounds: &[f64]) -> Result<SmoothedPath, SmootherError>
    {
        let dims = self.validate(ref_points, bounds)?;
        log::trace!("{:?}", dims);

        let w = self.par.weights();
        let curvature_sqr = curvature_bound_sqr(ref_points, self.par.curvature_constraint);

        let mat_p = calc_kernel(&dims, &w);
        let vec_q = calc_offset(&dims, ref_points, &w);
        let mut cons = AffineConstraint::new(&dims, ref_points, bounds, curvature_sqr);
        let mut warm_start = PrimalWarmStart::new(&dims, ref_points);

        let data = QpData {
            mat_p,
            vec_q,
            mat_a: cons.mat_a.clone(),
            lower: cons.lower.clone(),
            upper: cons.upper.clone(),
        };

        let setup_err = |status| {
            log::error!("QP setup failed: {}", status);
            SmootherError::Setup(status)
        };
        let mut ws = self.backend.setup(data, &self.par.qp).map_err(setup_err)?;
        ws.warm_start_x(warm_start.as_slice()).map_err(setup_err)?;

        let info = ws.solve();
        if !info.status.is_success() {
            log::error!("initial QP solve failed: {}", info.status);
            return Err(SmootherError::InitialSolveFailed(info.status));
        }
        let mut points = extract_points(&dims, ws.solution());
        let mut prev_obj = info.obj_val;
        log::debug!("SQP iteration 0: objective {:.6e}", prev_obj);

        let mut eps = 1.;

        for itr in 1.. self.par.sqp_max_iter {
            let iter_err = |status| {
                log::error!("QP update failed at SQP iteration {}: {}", itr, status);
                SmootherError::IterativeSolveFailed {
                    iteration: itr,
                    status,
                }
            };

            cons.update(&dims, &points, curvature_sqr);
            ws.update_a_values(cons.mat_a.data()).map_err(iter_err)?;
            ws.update_bounds(&cons.lower, &cons.upper).map_err(iter_err)?;

            if self.par.refresh_warm_start {
                warm_start.update(&points);
                ws.warm_start_x(warm_start.as_slice()).map_err(iter_err)?;
            }

            let info = ws.solve();
            if !info.status.is_success() {
                log::error!("QP solve failed at SQP iteration {}: {}", itr, info.status);
                return Err(SmootherError::IterativeSolveFailed {
                    iteration: itr,
                    status: info.status,
                });
            }
            points = extract_points(&dims, ws.solution());

            eps = self.objective_change(prev_obj, info.obj_val);
            log::debug!("SQP iteration {}: objective {:.6e}, eps {:.3e}", itr, info.obj_val, eps);

            if eps < self.par.sqp_jtol {
                log::debug!("SQP converged in {} iterations", itr + 1);

                let (x, y) = points.into_iter().unzip();
                return Ok(SmoothedPath {
                    x,
                    y,
                    slack: ws.solution()[dims.num_pos_vars.. dims.num_vars].to_vec(),
                    objective: info.obj_val,
                    sqp_iterations: itr + 1,
                });
            }

            prev_obj = info.obj_val;
        }

        log::error!("SQP not converged in {} iterations: eps {:.3e}", self.par.sqp_max_iter, eps);
        Err(SmootherError::NotConverged(eps))
    }
}

//

/// Stateful interface of [`FemPosSqpSmoother`]
///
/// Set the reference points and bounds, invoke [`FemPosSqpInterface::solve`],
/// then read [`FemPosSqpInterface::x`] and [`FemPosSqpInterface::y`].
/// A failed solve leaves the previous result as it is.
pub struct FemPosSqpInterface<B: QpBackend = TotsuBackend>
{
    smoother: FemPosSqpSmoother<B>,
    ref_points: Vec<(f64, f64)>,
    bounds_around_refs: Vec<f64>,
    x: Vec<f64>,
    y: Vec<f64>,
}

impl FemPosSqpInterface
{
    pub fn new() -> Self
    {
        Self::with_smoother(FemPosSqpSmoother::new())
    }
}

impl Default for FemPosSqpInterface
{
    fn default() -> Self
    {
        Self::new()
    }
}

impl<B: QpBackend> FemPosSqpInterface<B>
{
    pub fn with_smoother(smoother: FemPosSqpSmoother<B>) -> Self
    {
        FemPosSqpInterface {
            smoother,
            ref_points: Vec::new(),
            bounds_around_refs: Vec::new(),
            x: Vec::new(),
            y: Vec::new(),
        }
    }

    pub fn par_mut(&mut self) -> &mut SmootherParam
    {
        &mut self.smoother.par
    }

    pub fn set_ref_points(&mut self, ref_points: Vec<(f64, f64)>)
    {
        self.ref_points = ref_points;
    }

    pub fn set_bounds_around_refs(&mut self, bounds_around_refs: Vec<f64>)
    {
        self.bounds_around_refs = bounds_around_refs;
    }

    /// Runs [`FemPosSqpSmoother::try_solve`].
    ///
    /// Returns `true` on success, `false` otherwise (the reason is logged).
    pub fn solve(&mut self) -> bool
    {
        match self.smoother.try_solve(&self.ref_points, &self.bounds_around_refs) {
            Ok(path) => {
                self.x = path.x;
                self.y = path.y;
                true
            },
            Err(e) => {
                log::debug!("solve failed: {}", e);
                false
            },
        }
    }

    pub fn x(&self) -> &[f64]
    {
        &self.x
    }

    pub fn y(&self) -> &[f64]
    {
        &self.y
    }
}

//

#[test]
fn test_objective_change()
{
    let s = FemPosSqpSmoother::new();

    assert_eq!(s.objective_change(-2., -1.), 0.5);
    assert_eq!(s.objective_change(0., 0.), 0.);
    assert_eq!(s.objective_change(0., 1e-12), 0.);
    assert_eq!(s.objective_change(0., 1.), f64::INFINITY);
    assert_eq!(s.objective_change(1e-300, 2e-300), 0.);
    assert_eq!(s.objective_change(1e-300, 1e-3), f64::INFINITY);
}

#[test]
fn test_extract_points()
{
    let dims = ProblemDims::new(3).unwrap();
    let pts = extract_points(&dims, &[1., 2., 3., 4., 5., 6., 0.5]);
    assert_eq!(pts, vec![(1., 2.), (3., 4.), (5., 6.)]);
}
