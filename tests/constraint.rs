use float_eq::assert_float_eq;
use fempos_sqp::*;

fn flatten(dims: &ProblemDims, pts: &[(f64, f64)], slack: f64) -> Vec<f64>
{
    let mut x = vec![slack; dims.num_vars];
    for (i, p) in pts.iter().enumerate() {
        x[2 * i] = p.0;
        x[2 * i + 1] = p.1;
    }
    x
}

//

#[test]
fn test_constraint_layout()
{
    let _ = env_logger::builder().is_test(true).try_init();

    let refs = [(0., 0.), (1., 0.1), (2., -0.1), (3., 0.)];
    let bounds = [0.1, 0.2, 0.3, 0.4];
    let dims = ProblemDims::new(refs.len()).unwrap();
    let kappa_sqr = curvature_bound_sqr(&refs, 0.2);

    let c = AffineConstraint::new(&dims, &refs, &bounds, kappa_sqr);

    assert_eq!(c.mat_a.size(), (dims.num_constraints, dims.num_vars));
    assert_eq!(c.lower.len(), dims.num_constraints);
    assert_eq!(c.upper.len(), dims.num_constraints);

    for (i, (&(x, y), &b)) in refs.iter().zip(&bounds).enumerate() {
        assert_float_eq!(c.lower[2 * i], x - b, abs <= 1e-12);
        assert_float_eq!(c.upper[2 * i], x + b, abs <= 1e-12);
        assert_float_eq!(c.lower[2 * i + 1], y - b, abs <= 1e-12);
        assert_float_eq!(c.upper[2 * i + 1], y + b, abs <= 1e-12);
    }
    for r in dims.slack_rows() {
        assert_eq!(c.lower[r], 0.);
        assert_eq!(c.upper[r], QP_INFTY);
    }
    for r in dims.curvature_rows() {
        assert_eq!(c.lower[r], -QP_INFTY);
        assert!(c.upper[r] < QP_INFTY);
    }

    // identity over every variable
    for v in 0.. dims.num_vars {
        assert_eq!(c.mat_a.get(v, v), 1.);
    }
    // slack enters its own curvature row only
    for i in 1.. refs.len() - 1 {
        let col = dims.slack_col(i);
        assert_eq!(c.mat_a.get(dims.curvature_row(i), col), -1.);
        assert_eq!(c.mat_a.col(col).count(), 2);
    }
    // first and last points touch one stencil, the others more
    assert_eq!(c.mat_a.col(0).count(), 2);
    assert_eq!(c.mat_a.col(2).count(), 3);
    assert_eq!(c.mat_a.col(4).count(), 3);
    assert_eq!(c.mat_a.col(6).count(), 2);
}

#[test]
fn test_constraint_linearization()
{
    let _ = env_logger::builder().is_test(true).try_init();

    let refs = [(0., 0.), (1., 0.), (2., 0.), (3., 0.), (4., 0.)];
    let bounds = [0.5; 5];
    let dims = ProblemDims::new(refs.len()).unwrap();
    let kappa_sqr = curvature_bound_sqr(&refs, 0.2);
    assert_float_eq!(kappa_sqr, 0.04, abs <= 1e-12);

    let mut c = AffineConstraint::new(&dims, &refs, &bounds, kappa_sqr);
    let indptr = c.mat_a.indptr().to_vec();
    let indices = c.mat_a.indices().to_vec();

    // straight line: zero gradient
    for r in dims.curvature_rows() {
        assert_float_eq!(c.upper[r], kappa_sqr, abs <= 1e-12);
    }

    let iterate = [(0., 0.), (1., 0.2), (2., -0.1), (3., 0.3), (4., 0.)];
    c.update(&dims, &iterate, kappa_sqr);

    assert_eq!(c.mat_a.indptr(), indptr.as_slice());
    assert_eq!(c.mat_a.indices(), indices.as_slice());

    // at the iterate, row minus upper bound equals |d|^2 - kappa^2
    let x = flatten(&dims, &iterate, 0.);
    let mut ax = vec![0.; dims.num_constraints];
    c.mat_a.mul_vec(1., &x, 0., &mut ax);

    for i in 1.. iterate.len() - 1 {
        let dx = iterate[i - 1].0 - 2. * iterate[i].0 + iterate[i + 1].0;
        let dy = iterate[i - 1].1 - 2. * iterate[i].1 + iterate[i + 1].1;
        let r = dims.curvature_row(i);

        assert_float_eq!(ax[r] - c.upper[r], dx * dx + dy * dy - kappa_sqr, abs <= 1e-12);
    }

    // a unit of slack relaxes its row by one
    let xs = flatten(&dims, &iterate, 1.);
    let mut axs = vec![0.; dims.num_constraints];
    c.mat_a.mul_vec(1., &xs, 0., &mut axs);
    for r in dims.curvature_rows() {
        assert_float_eq!(axs[r], ax[r] - 1., abs <= 1e-12);
    }

    // box rows stay
    for (i, &(x, _)) in refs.iter().enumerate() {
        assert_float_eq!(c.lower[2 * i], x - 0.5, abs <= 1e-12);
    }
}

#[test]
fn test_constraint_unbounded_curvature()
{
    let _ = env_logger::builder().is_test(true).try_init();

    let refs = [(0., 0.), (1., 1.), (2., 0.)];
    let dims = ProblemDims::new(refs.len()).unwrap();
    let kappa_sqr = curvature_bound_sqr(&refs, f64::INFINITY);
    assert!(kappa_sqr.is_infinite());

    let c = AffineConstraint::new(&dims, &refs, &[1.; 3], kappa_sqr);
    assert_eq!(c.upper[dims.curvature_row(1)], QP_INFTY);
}

#[test]
fn test_warm_start_layout()
{
    let _ = env_logger::builder().is_test(true).try_init();

    let refs = [(0., 1.), (2., 3.), (4., 5.), (6., 7.)];
    let dims = ProblemDims::new(refs.len()).unwrap();

    let ws = PrimalWarmStart::new(&dims, &refs);
    assert_eq!(ws.as_slice(), flatten(&dims, &refs, 0.).as_slice());
}
