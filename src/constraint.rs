use crate::{CscMat, ProblemDims};

/// Bound magnitude treated as unbounded.
pub const QP_INFTY: f64 = 1e20;

//

/// First-order expansion of \\(\\| p_{i-1} - 2 p_i + p_{i+1} \\|^2\\) around an iterate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FemPosLinearization
{
    /// Gradient for `x_{i-1}, y_{i-1}, x_i, y_i, x_{i+1}, y_{i+1}`.
    pub grad: [f64; 6],
    /// Value minus gradient dot iterate.
    pub constant: f64,
}

impl FemPosLinearization
{
    /// Linearizes around `points[index - 1..= index + 1]`.
    pub fn new(points: &[(f64, f64)], index: usize) -> Self
    {
        assert!(index >= 1 && index + 1 < points.len());

        let (x_f, y_f) = points[index - 1];
        let (x_m, y_m) = points[index];
        let (x_l, y_l) = points[index + 1];

        let d_x = x_f - 2. * x_m + x_l;
        let d_y = y_f - 2. * y_m + y_l;

        let grad = [
            2. * d_x, 2. * d_y,
            -4. * d_x, -4. * d_y,
            2. * d_x, 2. * d_y,
        ];
        let value = d_x * d_x + d_y * d_y;
        let dot = grad[0] * x_f + grad[1] * y_f
                + grad[2] * x_m + grad[3] * y_m
                + grad[4] * x_l + grad[5] * y_l;

        FemPosLinearization {
            grad,
            constant: value - dot,
        }
    }
}

/// Squared curvature bound \\(\kappa^2\\) with \\(\kappa = \bar{L}^2 \kappa_{max}\\),
/// \\(\bar{L}\\) the mean segment length of `ref_points`.
///
/// Returns `f64::INFINITY` if `curvature_constraint` is not finite.
pub fn curvature_bound_sqr(ref_points: &[(f64, f64)], curvature_constraint: f64) -> f64
{
    if !curvature_constraint.is_finite() || ref_points.len() < 2 {
        return f64::INFINITY;
    }

    let total: f64 = ref_points.windows(2)
        .map(|w| (w[1].0 - w[0].0).hypot(w[1].1 - w[0].1))
        .sum();
    let mean = total / (ref_points.len() - 1) as f64;
    let kappa = mean * mean * curvature_constraint;

    kappa * kappa
}

//

/// Affine constraints \\(l \le A x \le u\\)
///
/// Rows are laid out in three contiguous ranges (see [`ProblemDims`]):
/// position boxes, slack bounds, linearized curvature.
/// The pattern of \\(A\\) never changes after [`AffineConstraint::new`].
#[derive(Debug, Clone)]
pub struct AffineConstraint
{
    pub mat_a: CscMat,
    pub lower: Vec<f64>,
    pub upper: Vec<f64>,
}

impl AffineConstraint
{
    /// Builds constraints linearized around the reference points.
    ///
    /// * `bounds` holds the box half-width around each reference point.
    /// * `curvature_sqr` is from [`curvature_bound_sqr`].
    pub fn new(dims: &ProblemDims, ref_points: &[(f64, f64)], bounds: &[f64], curvature_sqr: f64) -> Self
    {
        assert_eq!(ref_points.len(), dims.num_points);
        assert_eq!(bounds.len(), dims.num_points);

        let lin = Self::linearize(dims, ref_points);
        let mat_a = CscMat::from_columns(dims.num_constraints, &Self::columns(dims, &lin));

        let mut lower = vec![0.; dims.num_constraints];
        let mut upper = vec![0.; dims.num_constraints];

        for (i, (&(x, y), &b)) in ref_points.iter().zip(bounds).enumerate() {
            lower[2 * i] = x - b;
            upper[2 * i] = x + b;
            lower[2 * i + 1] = y - b;
            upper[2 * i + 1] = y + b;
        }
        for r in dims.slack_rows() {
            lower[r] = 0.;
            upper[r] = QP_INFTY;
        }

        let mut c = AffineConstraint {
            mat_a,
            lower,
            upper,
        };
        c.set_curvature_bounds(dims, &lin, curvature_sqr);
        c
    }

    /// Re-linearizes the curvature rows around `points`.
    ///
    /// Only values of \\(A\\) and the curvature row bounds change.
    pub fn update(&mut self, dims: &ProblemDims, points: &[(f64, f64)], curvature_sqr: f64)
    {
        assert_eq!(points.len(), dims.num_points);

        let lin = Self::linearize(dims, points);
        self.mat_a.set_values_by_columns(&Self::columns(dims, &lin));
        self.set_curvature_bounds(dims, &lin, curvature_sqr);
    }

    fn linearize(dims: &ProblemDims, points: &[(f64, f64)]) -> Vec<FemPosLinearization>
    {
        (1.. dims.num_points - 1)
            .map(|i| FemPosLinearization::new(points, i))
            .collect()
    }

    // grad(p) - s_i <= kappa^2 - constant
    fn set_curvature_bounds(&mut self, dims: &ProblemDims, lin: &[FemPosLinearization], curvature_sqr: f64)
    {
        for (r, l) in dims.curvature_rows().zip(lin) {
            self.lower[r] = -QP_INFTY;
            self.upper[r] = (curvature_sqr - l.constant).min(QP_INFTY);
        }
    }

    fn columns(dims: &ProblemDims, lin: &[FemPosLinearization]) -> Vec<Vec<(usize, f64)>>
    {
        let n = dims.num_points;
        let mut columns = vec![Vec::new(); dims.num_vars];

        for j in 0.. n {
            for k in 0.. 2 {
                let col = &mut columns[2 * j + k];
                col.push((2 * j + k, 1.));

                // interior points whose stencil touches point j, ascending
                let lo = j.max(2) - 1;
                let hi = (j + 1).min(n - 2);
                for i in lo..= hi {
                    let pos = j + 1 - i; // 0: first, 1: middle, 2: last of the stencil
                    col.push((dims.curvature_row(i), lin[i - 1].grad[2 * pos + k]));
                }
            }
        }

        for i in 1.. n - 1 {
            let c = dims.slack_col(i);
            columns[c].push((c, 1.));
            columns[c].push((dims.curvature_row(i), -1.));
        }

        columns
    }
}

//

#[test]
fn test_linearization_exact_at_iterate()
{
    use float_eq::assert_float_eq;

    let pts = [(0., 0.), (1., 0.5), (2., 0.)];
    let l = FemPosLinearization::new(&pts, 1);

    // d = (0, -1), |d|^2 = 1
    assert_float_eq!(l.grad.as_slice(), [0., -2., 0., 4., 0., -2.].as_ref(), abs_all <= 1e-12);

    let lin_val = l.grad[3] * 0.5 + l.constant;
    assert_float_eq!(lin_val, 1., abs <= 1e-12);
    assert_float_eq!(l.constant, -1., abs <= 1e-12);
}
