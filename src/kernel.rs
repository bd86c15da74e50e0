use crate::{CscMat, ProblemDims};

/// Penalty weights of the smoothing cost.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PenaltyWeights
{
    /// Deviation of each point from the finite-element estimate by its neighbours.
    pub fem_pos_deviation: f64,
    /// Squared segment lengths.
    pub path_length: f64,
    /// Squared deviation from the reference points.
    pub ref_deviation: f64,
    /// Linear cost of curvature slack variables.
    pub curvature_slack: f64,
}

impl PenaltyWeights
{
    /// Checks if every weight is finite and nonnegative.
    pub fn is_valid(&self) -> bool
    {
        [self.fem_pos_deviation, self.path_length, self.ref_deviation, self.curvature_slack]
            .iter()
            .all(|w| w.is_finite() && *w >= 0.)
    }
}

//

/// Band of one coordinate's cost, indexed by point:
/// `[j][0]` diagonal, `[j][1]` coupling to `j+1`, `[j][2]` coupling to `j+2`.
fn kernel_band(n: usize, w: &PenaltyWeights) -> Vec<[f64; 3]>
{
    let mut band = vec![[0.; 3]; n];

    // finite element estimate: p_{i-1} - 2 p_i + p_{i+1}
    let stencil = [1., -2., 1.];
    for mid in 1.. n - 1 {
        for a in 0.. 3 {
            for b in a.. 3 {
                band[mid - 1 + a][b - a] += w.fem_pos_deviation * stencil[a] * stencil[b];
            }
        }
    }

    // segment: p_{i+1} - p_i
    for i in 0.. n - 1 {
        band[i][0] += w.path_length;
        band[i + 1][0] += w.path_length;
        band[i][1] -= w.path_length;
    }

    for b in band.iter_mut() {
        b[0] += w.ref_deviation;
    }

    band
}

/// Calculates the quadratic cost matrix \\(P\\), upper triangle only.
///
/// With \\(X, Y, Z\\) the fem-position, path-length and reference weights times a
/// \\(2 \times 2\\) identity, six points give the position block
/// ```text
/// | X+Y+Z  -2X-Y    X       0       0       0     |
/// |        5X+2Y+Z  -4X-Y   X       0       0     |
/// |                 6X+2Y+Z -4X-Y   X       0     |
/// |                         6X+2Y+Z -4X-Y   X     |
/// |                                 5X+2Y+Z -2X-Y |
/// |                                         X+Y+Z |
/// ```
/// Entries are accumulated stencil by stencil, which also covers three or four points.
/// Values are doubled for the \\({1 \over 2} x^T P x\\) objective convention.
/// Slack columns are empty.
pub fn calc_kernel(dims: &ProblemDims, w: &PenaltyWeights) -> CscMat
{
    let n = dims.num_points;
    let band = kernel_band(n, w);

    let mut columns = vec![Vec::new(); dims.num_vars];

    for j in 0.. n {
        for k in 0.. 2 {
            let col = &mut columns[2 * j + k];
            if j >= 2 {
                col.push((2 * (j - 2) + k, 2. * band[j - 2][2]));
            }
            if j >= 1 {
                col.push((2 * (j - 1) + k, 2. * band[j - 1][1]));
            }
            col.push((2 * j + k, 2. * band[j][0]));
        }
    }

    CscMat::from_columns(dims.num_vars, &columns)
}

/// Calculates the linear cost vector \\(q\\).
///
/// Positions get \\(-2 w_r r\\), slack variables the slack weight.
pub fn calc_offset(dims: &ProblemDims, ref_points: &[(f64, f64)], w: &PenaltyWeights) -> Vec<f64>
{
    assert_eq!(ref_points.len(), dims.num_points);

    let mut q = vec![0.; dims.num_vars];

    for (i, &(x, y)) in ref_points.iter().enumerate() {
        q[2 * i] = -2. * w.ref_deviation * x;
        q[2 * i + 1] = -2. * w.ref_deviation * y;
    }
    for e in q[dims.num_pos_vars..].iter_mut() {
        *e = w.curvature_slack;
    }

    q
}

//

#[test]
fn test_kernel_six_points()
{
    use float_eq::assert_float_eq;

    let w = PenaltyWeights {
        fem_pos_deviation: 1.,
        path_length: 10.,
        ref_deviation: 100.,
        curvature_slack: 0.,
    };
    let dims = ProblemDims::new(6).unwrap();
    let p = calc_kernel(&dims, &w);

    let (x, y, z) = (w.fem_pos_deviation, w.path_length, w.ref_deviation);
    let diag = [x + y + z, 5. * x + 2. * y + z, 6. * x + 2. * y + z, 6. * x + 2. * y + z, 5. * x + 2. * y + z, x + y + z];
    let off1 = [-2. * x - y, -4. * x - y, -4. * x - y, -4. * x - y, -2. * x - y];

    for j in 0.. 6 {
        for k in 0.. 2 {
            let c = 2 * j + k;
            assert_float_eq!(p.get(c, c), 2. * diag[j], abs <= 1e-9);
            if j >= 1 {
                assert_float_eq!(p.get(c - 2, c), 2. * off1[j - 1], abs <= 1e-9);
            }
            if j >= 2 {
                assert_float_eq!(p.get(c - 4, c), 2. * x, abs <= 1e-9);
            }
        }
    }
}
