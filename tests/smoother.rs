use std::cell::Cell;
use std::rc::Rc;
use float_eq::assert_float_eq;
use fempos_sqp::*;

//

/// Backend replaying given statuses, counting setups and solves.
struct MockBackend
{
    setups: Cell<usize>,
    solves: Rc<Cell<usize>>,
    statuses: Vec<QpStatus>,
    drifting: bool,
    reject: bool,
}

impl MockBackend
{
    fn new(statuses: &[QpStatus]) -> Self
    {
        MockBackend {
            setups: Cell::new(0),
            solves: Rc::new(Cell::new(0)),
            statuses: statuses.to_vec(),
            drifting: false,
            reject: false,
        }
    }
}

struct MockWorkspace
{
    solves: Rc<Cell<usize>>,
    statuses: Vec<QpStatus>,
    drifting: bool,
    x: Vec<f64>,
}

impl QpBackend for MockBackend
{
    type Workspace = MockWorkspace;

    fn setup(&self, data: QpData, _settings: &QpSettings) -> Result<MockWorkspace, QpStatus>
    {
        self.setups.set(self.setups.get() + 1);

        if self.reject {
            return Err(QpStatus::InvalidData);
        }

        Ok(MockWorkspace {
            solves: self.solves.clone(),
            statuses: self.statuses.clone(),
            drifting: self.drifting,
            x: vec![0.; data.dim().0],
        })
    }
}

impl QpWorkspace for MockWorkspace
{
    fn warm_start_x(&mut self, x: &[f64]) -> Result<(), QpStatus>
    {
        self.x.copy_from_slice(x);
        Ok(())
    }

    fn update_a_values(&mut self, _a_data: &[f64]) -> Result<(), QpStatus>
    {
        Ok(())
    }

    fn update_bounds(&mut self, _lower: &[f64], _upper: &[f64]) -> Result<(), QpStatus>
    {
        Ok(())
    }

    fn solve(&mut self) -> QpInfo
    {
        let k = self.solves.get();
        self.solves.set(k + 1);

        let status = self.statuses[k.min(self.statuses.len() - 1)];
        let obj_val = if self.drifting {
            1. / (k + 1) as f64
        }
        else {
            -1.
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

fn line(n: usize) -> Vec<(f64, f64)>
{
    (0.. n).map(|i| (i as f64, 0.5 * i as f64)).collect()
}

//

#[test]
fn test_validation_never_reaches_backend()
{
    let _ = env_logger::builder().is_test(true).try_init();

    let s = FemPosSqpSmoother::with_backend(MockBackend::new(&[QpStatus::Solved]));

    assert_eq!(s.try_solve(&[], &[]), Err(SmootherError::EmptyInput));
    assert_eq!(s.try_solve(&line(4), &[1.; 3]), Err(SmootherError::SizeMismatch {points: 4, bounds: 3}));
    assert_eq!(s.try_solve(&line(2), &[1.; 2]), Err(SmootherError::TooFewPoints(2)));
    assert_eq!(s.try_solve(&line(1), &[1.; 1]), Err(SmootherError::TooFewPoints(1)));
    assert_eq!(s.try_solve(&line(4), &[1., -1., 1., 1.]), Err(SmootherError::InvalidInput));
    assert_eq!(s.try_solve(&line(4), &[1., f64::NAN, 1., 1.]), Err(SmootherError::InvalidInput));
    assert_eq!(s.try_solve(&[(0., 0.), (1., f64::INFINITY), (2., 0.)], &[1.; 3]), Err(SmootherError::InvalidInput));

    let s = s.par(|p| p.weight_path_length = -1.);
    assert_eq!(s.try_solve(&line(4), &[1.; 4]), Err(SmootherError::InvalidInput));

    let s = s.par(|p| {
        p.weight_path_length = 1.;
        p.weight_fem_pos_deviation = f64::NAN;
    });
    assert_eq!(s.try_solve(&line(4), &[1.; 4]), Err(SmootherError::InvalidInput));

    let s = s.par(|p| {
        p.weight_fem_pos_deviation = 1.;
        p.curvature_constraint = -0.1;
    });
    assert_eq!(s.try_solve(&line(4), &[1.; 4]), Err(SmootherError::InvalidInput));

    assert_eq!(s.backend().setups.get(), 0);
    assert_eq!(s.backend().solves.get(), 0);
}

#[test]
fn test_status_handling()
{
    let _ = env_logger::builder().is_test(true).try_init();

    let refs = line(5);
    let bounds = [0.5; 5];

    // converged on the first re-solve
    let s = FemPosSqpSmoother::with_backend(MockBackend::new(&[QpStatus::Solved]));
    let rslt = s.try_solve(&refs, &bounds).unwrap();
    assert_eq!(rslt.sqp_iterations, 2);
    assert_eq!(rslt.x, refs.iter().map(|p| p.0).collect::<Vec<_>>());
    assert_eq!(rslt.y, refs.iter().map(|p| p.1).collect::<Vec<_>>());
    assert_eq!(rslt.objective, -1.);
    assert_eq!(s.backend().setups.get(), 1);
    assert_eq!(s.backend().solves.get(), 2);

    // inaccurate is still usable
    let s = FemPosSqpSmoother::with_backend(MockBackend::new(&[QpStatus::SolvedInaccurate]));
    assert!(s.try_solve(&refs, &bounds).is_ok());

    let s = FemPosSqpSmoother::with_backend(MockBackend::new(&[QpStatus::PrimalInfeasible]));
    assert_eq!(s.try_solve(&refs, &bounds), Err(SmootherError::InitialSolveFailed(QpStatus::PrimalInfeasible)));
    assert_eq!(s.backend().solves.get(), 1);

    let s = FemPosSqpSmoother::with_backend(MockBackend::new(&[QpStatus::Solved, QpStatus::MaxIterReached]));
    assert_eq!(s.try_solve(&refs, &bounds), Err(SmootherError::IterativeSolveFailed {
        iteration: 1,
        status: QpStatus::MaxIterReached,
    }));

    let s = FemPosSqpSmoother::with_backend(MockBackend::new(&[QpStatus::Solved, QpStatus::Solved, QpStatus::Unsolved]));
    let s = s.par(|p| p.sqp_jtol = -1.);
    assert_eq!(s.try_solve(&refs, &bounds), Err(SmootherError::IterativeSolveFailed {
        iteration: 2,
        status: QpStatus::Unsolved,
    }));

    let mut backend = MockBackend::new(&[QpStatus::Solved]);
    backend.reject = true;
    let s = FemPosSqpSmoother::with_backend(backend);
    assert_eq!(s.try_solve(&refs, &bounds), Err(SmootherError::Setup(QpStatus::InvalidData)));
    assert_eq!(s.backend().solves.get(), 0);
}

#[test]
fn test_not_converged()
{
    let _ = env_logger::builder().is_test(true).try_init();

    let refs = line(5);
    let bounds = [0.5; 5];

    // objective 1/k on the k-th solve
    let mut backend = MockBackend::new(&[QpStatus::Solved]);
    backend.drifting = true;
    let s = FemPosSqpSmoother::with_backend(backend).par(|p| p.sqp_max_iter = 5);

    match s.try_solve(&refs, &bounds) {
        Err(SmootherError::NotConverged(eps)) => assert_float_eq!(eps, 0.2, abs <= 1e-12),
        r => panic!("{:?}", r),
    }
    assert_eq!(s.backend().solves.get(), 5);

    // no outer iteration
    let s = FemPosSqpSmoother::with_backend(MockBackend::new(&[QpStatus::Solved])).par(|p| p.sqp_max_iter = 1);
    assert_eq!(s.try_solve(&refs, &bounds), Err(SmootherError::NotConverged(1.)));
}

#[test]
fn test_interface_keeps_prior_result()
{
    let _ = env_logger::builder().is_test(true).try_init();

    let mut itf = FemPosSqpInterface::with_smoother(
        FemPosSqpSmoother::with_backend(MockBackend::new(&[QpStatus::Solved]))
    );

    itf.set_ref_points(line(3));
    itf.set_bounds_around_refs(vec![0.1; 3]);
    assert!(itf.solve());
    assert_eq!(itf.x(), &[0., 1., 2.]);
    assert_eq!(itf.y(), &[0., 0.5, 1.]);

    itf.set_ref_points(line(2));
    itf.set_bounds_around_refs(vec![0.1; 2]);
    assert!(!itf.solve());
    assert_eq!(itf.x(), &[0., 1., 2.]);
    assert_eq!(itf.y(), &[0., 0.5, 1.]);
}

//

fn check_box(refs: &[(f64, f64)], bounds: &[f64], rslt: &SmoothedPath, tol: f64)
{
    assert_eq!(rslt.x.len(), refs.len());
    assert_eq!(rslt.y.len(), refs.len());

    for (i, (p, r)) in rslt.points().zip(refs).enumerate() {
        assert!((p.0 - r.0).abs() <= bounds[i] + tol, "x[{}] = {} out of box", i, p.0);
        assert!((p.1 - r.1).abs() <= bounds[i] + tol, "y[{}] = {} out of box", i, p.1);
    }
}

#[test]
fn test_smooth_collinear()
{
    let _ = env_logger::builder().is_test(true).try_init();

    let refs: Vec<(f64, f64)> = (0.. 5).map(|i| (i as f64, i as f64)).collect();
    let bounds = [1.; 5];

    let s = FemPosSqpSmoother::new().par(|p| {
        p.weight_fem_pos_deviation = 10.;
        p.weight_path_length = 1e-3;
        p.weight_ref_deviation = 1.;
        p.sqp_max_iter = 20;
        p.sqp_jtol = 1e-3;
        p.qp.max_iter = Some(200_000);
    });
    let rslt = s.try_solve(&refs, &bounds).unwrap();

    check_box(&refs, &bounds, &rslt, 1e-3);
    for (p, r) in rslt.points().zip(&refs) {
        assert_float_eq!(p.0, r.0, abs <= 1e-2);
        assert_float_eq!(p.1, r.1, abs <= 1e-2);
    }
}

#[test]
fn test_smooth_perturbed()
{
    let _ = env_logger::builder().is_test(true).try_init();

    let refs = [(0., 0.), (1., 0.), (2., 5.), (3., 0.), (4., 0.)];
    let bounds = [0.5; 5];

    let s = FemPosSqpSmoother::new().par(|p| {
        p.weight_fem_pos_deviation = 10.;
        p.curvature_constraint = f64::INFINITY;
        p.sqp_max_iter = 20;
        p.sqp_jtol = 1e-3;
        p.qp.max_iter = Some(200_000);
    });
    let rslt = s.try_solve(&refs, &bounds).unwrap();

    check_box(&refs, &bounds, &rslt, 1e-3);

    // pulled down to the edge of its box, neighbours lifted
    assert_float_eq!(rslt.y[2], 4.5, abs <= 1e-2);
    assert!(rslt.y[1] > 0.);
    assert!(rslt.y[3] > 0.);
    assert_float_eq!(rslt.y[1], rslt.y[3], abs <= 1e-2);
}

#[test]
fn test_smooth_curvature_loop()
{
    let _ = env_logger::builder().is_test(true).try_init();

    let refs = [(0., 0.), (1., 0.1), (2., -0.1), (3., 0.1), (4., -0.1), (5., 0.)];
    let bounds = [0.3; 6];

    let s = FemPosSqpSmoother::new().par(|p| {
        p.sqp_max_iter = 50;
        p.sqp_jtol = 1e-3;
        p.refresh_warm_start = true;
        p.qp.max_iter = Some(200_000);
    });
    let rslt = s.try_solve(&refs, &bounds).unwrap();

    check_box(&refs, &bounds, &rslt, 1e-3);
    assert!(rslt.sqp_iterations >= 2);
    assert!(rslt.objective.is_finite());

    // smoother than the zigzag
    let roughness = |y: &[f64]| -> f64 {
        (1.. y.len() - 1).map(|i| (y[i - 1] - 2. * y[i] + y[i + 1]).powi(2)).sum()
    };
    let ref_y: Vec<f64> = refs.iter().map(|p| p.1).collect();
    assert!(roughness(&rslt.y) < roughness(&ref_y));
}

#[test]
fn test_smooth_three_points()
{
    let _ = env_logger::builder().is_test(true).try_init();

    let refs = [(0., 0.), (1., 0.5), (2., 0.)];
    let bounds = [0.2; 3];

    // default weights and curvature limit
    let s = FemPosSqpSmoother::new();
    let rslt = s.try_solve(&refs, &bounds).unwrap();

    check_box(&refs, &bounds, &rslt, 1e-3);
    assert_float_eq!(rslt.y.as_slice(), [0.2, 0.3, 0.2].as_ref(), abs_all <= 1e-2);
    assert_eq!(rslt.slack.len(), 1);
}

#[test]
fn test_smooth_default_curvature_active()
{
    let _ = env_logger::builder().is_test(true).try_init();

    let refs = [(0., 0.), (1., 0.), (2., 5.), (3., 0.), (4., 0.)];
    let bounds = [0.5; 5];

    let s = FemPosSqpSmoother::new();
    let rslt = s.try_solve(&refs, &bounds).unwrap();

    check_box(&refs, &bounds, &rslt, 1e-3);
    assert_float_eq!(rslt.y[2], 4.5, abs <= 1e-2);
    assert!(rslt.y[1] > 0.);
    assert!(rslt.y[3] > 0.);

    // the peak cannot meet the limit, so every slack is in use and covers the excess
    let kappa_sqr = curvature_bound_sqr(&refs, s.par.curvature_constraint);
    let pts: Vec<(f64, f64)> = rslt.points().collect();
    assert_eq!(rslt.slack.len(), 3);
    for i in 1.. 4 {
        let dx = pts[i - 1].0 - 2. * pts[i].0 + pts[i + 1].0;
        let dy = pts[i - 1].1 - 2. * pts[i].1 + pts[i + 1].1;
        let dd = dx * dx + dy * dy;
        let s_i = rslt.slack[i - 1];

        assert!(dd > kappa_sqr, "d[{}] = {} within the limit {}", i, dd, kappa_sqr);
        assert!(s_i > 0.);
        assert!(dd <= kappa_sqr + s_i + 1e-2 * (1. + kappa_sqr + s_i), "d[{}] = {} over {} + {}", i, dd, kappa_sqr, s_i);
    }
}

#[test]
fn test_smooth_idempotent()
{
    let _ = env_logger::builder().is_test(true).try_init();

    let refs = [(0., 0.), (1., 0.2), (2., 0.1), (3., 0.3), (4., 0.)];
    let bounds = [0.25; 5];

    let mut itf = FemPosSqpInterface::new();
    itf.par_mut().sqp_max_iter = 20;
    itf.par_mut().sqp_jtol = 1e-3;
    itf.par_mut().qp.max_iter = Some(200_000);

    itf.set_ref_points(refs.to_vec());
    itf.set_bounds_around_refs(bounds.to_vec());

    assert!(itf.solve());
    let (x1, y1) = (itf.x().to_vec(), itf.y().to_vec());

    assert!(itf.solve());
    assert_eq!(itf.x(), x1.as_slice());
    assert_eq!(itf.y(), y1.as_slice());
}

#[test]
fn test_smooth_env_par()
{
    let _ = env_logger::builder().is_test(true).try_init();

    let refs = line(4);
    let bounds = [0.1; 4];

    // no variables set: defaults stay
    let s = FemPosSqpSmoother::new().par(set_par_by_env).par(|p| p.qp.max_iter = Some(200_000));
    let rslt = s.try_solve(&refs, &bounds).unwrap();

    check_box(&refs, &bounds, &rslt, 1e-3);
}
