use std::marker::PhantomData;
use num_traits::{Zero, One};
use totsu::MatBuild;
use totsu_core::solver::{Solver, SliceLike, Operator, Cone};
use totsu_core::{LinAlgEx, MatOp, MatType, ConeRotSOC, ConeRPos, splitm, splitm_mut};
use crate::{CscMat, QP_INFTY};

//

/// Rows of a [`CscMat`] picked with coefficients
///
/// Row \\(k\\) of the operator is \\(c_k\\) times row \\(r_k\\) of the matrix.
pub struct RowPickOp<'a, L: LinAlgEx<F = f64>>
{
    ph_l: PhantomData<L>,
    mat: &'a CscMat,
    picks: &'a [(usize, f64)],
    row_picks: &'a [Vec<usize>],
    row_abssum: &'a [f64],
}

impl<'a, L: LinAlgEx<F = f64>> Operator<L> for RowPickOp<'a, L>
{
    fn size(&self) -> (usize, usize)
    {
        (self.picks.len(), self.mat.size().1)
    }

    fn op(&self, alpha: f64, x: &L::Sl, beta: f64, y: &mut L::Sl)
    {
        let x = x.get_ref();
        let y = y.get_mut();

        for e in y.iter_mut() {
            *e = beta * *e;
        }
        for (c, &xc) in x.iter().enumerate() {
            for (r, v) in self.mat.col(c) {
                for &k in &self.row_picks[r] {
                    y[k] += alpha * self.picks[k].1 * v * xc;
                }
            }
        }
    }

    fn trans_op(&self, alpha: f64, x: &L::Sl, beta: f64, y: &mut L::Sl)
    {
        let x = x.get_ref();
        let y = y.get_mut();

        for (c, e) in y.iter_mut().enumerate() {
            let mut dot = 0.;
            for (r, v) in self.mat.col(c) {
                for &k in &self.row_picks[r] {
                    dot += self.picks[k].1 * v * x[k];
                }
            }
            *e = beta * *e + alpha * dot;
        }
    }

    fn absadd_cols(&self, tau: &mut L::Sl)
    {
        let tau = tau.get_mut();

        for (c, e) in tau.iter_mut().enumerate() {
            for (r, v) in self.mat.col(c) {
                for &k in &self.row_picks[r] {
                    *e += (self.picks[k].1 * v).abs();
                }
            }
        }
    }

    fn absadd_rows(&self, sigma: &mut L::Sl)
    {
        let sigma = sigma.get_mut();

        for (e, &(r, coef)) in sigma.iter_mut().zip(self.picks) {
            *e += coef.abs() * self.row_abssum[r];
        }
    }
}

//

pub struct ProbBoxQPOpC<L: LinAlgEx<F = f64>>
{
    ph_l: PhantomData<L>,
    n: usize,
}

impl<L: LinAlgEx<F = f64>> Operator<L> for ProbBoxQPOpC<L>
{
    fn size(&self) -> (usize, usize)
    {
        (self.n + 1, 1)
    }

    fn op(&self, alpha: f64, x: &L::Sl, beta: f64, y: &mut L::Sl)
    {
        let n = self.n;

        splitm_mut!(y, (y_n; n), (y_t; 1));

        // y_n = 0*x + b*y_n;
        L::scale(beta, &mut y_n);

        // y_t = a*1*x + b*y_t;
        L::scale(beta, &mut y_t);
        L::add(alpha, x, &mut y_t);
    }

    fn trans_op(&self, alpha: f64, x: &L::Sl, beta: f64, y: &mut L::Sl)
    {
        let n = self.n;

        splitm!(x, (_x_n; n), (x_t; 1));

        // y = 0*x_n + a*1*x_t + b*y;
        L::scale(beta, y);
        L::add(alpha, &x_t, y);
    }

    fn absadd_cols(&self, tau: &mut L::Sl)
    {
        let val_tau = tau.get(0) + f64::one();
        tau.set(0, val_tau);
    }

    fn absadd_rows(&self, sigma: &mut L::Sl)
    {
        let n = self.n;

        splitm_mut!(sigma, (_sigma_n; n), (sigma_t; 1));

        let val_sigma_t = sigma_t.get(0) + f64::one();
        sigma_t.set(0, val_sigma_t);
    }
}

//

pub struct ProbBoxQPOpA<'a, L: LinAlgEx<F = f64>>
{
    sym_p_sqrt: MatOp<'a, L>,
    vec_q: MatOp<'a, L>,
    mat_g: RowPickOp<'a, L>,
}

impl<'a, L: LinAlgEx<F = f64>> ProbBoxQPOpA<'a, L>
{
    fn dim(&self) -> (usize, usize)
    {
        let (n, n_) = self.sym_p_sqrt.size();
        assert_eq!(n, n_);
        let (m, n_) = self.mat_g.size();
        assert_eq!(n, n_);

        (n, m)
    }
}

impl<'a, L: LinAlgEx<F = f64>> Operator<L> for ProbBoxQPOpA<'a, L>
{
    fn size(&self) -> (usize, usize)
    {
        let (n, m) = self.dim();

        ((2 + n) + m, n + 1)
    }

    fn op(&self, alpha: f64, x: &L::Sl, beta: f64, y: &mut L::Sl)
    {
        let (n, m) = self.dim();

        splitm!(x, (x_n; n), (x_t; 1));
        splitm_mut!(y, (y_r; 1), (y_s; 1), (y_n; n), (y_m; m));

        // y_r = 0*x_n + 0*x_t + b*y_r
        L::scale(beta, &mut y_r);

        // y_s = a*vec_q^T*x_n + a*-1*x_t + b*y_s
        self.vec_q.trans_op(alpha, &x_n, beta, &mut y_s);
        L::add(-alpha, &x_t, &mut y_s);

        // y_n = a*-sym_p_sqrt*x_n + 0*x_t + b*y_n
        self.sym_p_sqrt.op(-alpha, &x_n, beta, &mut y_n);

        // y_m = a*mat_g*x_n + 0*x_t + b*y_m
        self.mat_g.op(alpha, &x_n, beta, &mut y_m);
    }

    fn trans_op(&self, alpha: f64, x: &L::Sl, beta: f64, y: &mut L::Sl)
    {
        let (n, m) = self.dim();

        splitm!(x, (_x_r; 1), (x_s; 1), (x_n; n), (x_m; m));
        splitm_mut!(y, (y_n; n), (y_t; 1));

        let f1 = f64::one();

        // y_n = 0*x_r + a*vec_q*x_s + a*-sym_p_sqrt*x_n + a*mat_g^T*x_m + b*y_n
        self.vec_q.op(alpha, &x_s, beta, &mut y_n);
        self.sym_p_sqrt.op(-alpha, &x_n, f1, &mut y_n);
        self.mat_g.trans_op(alpha, &x_m, f1, &mut y_n);

        // y_t = 0*x_r + a*-1*x_s + 0*x_n + 0*x_m + b*y_t
        L::scale(beta, &mut y_t);
        L::add(-alpha, &x_s, &mut y_t);
    }

    fn absadd_cols(&self, tau: &mut L::Sl)
    {
        let (n, _m) = self.dim();

        splitm_mut!(tau, (tau_n; n), (tau_t; 1));

        self.vec_q.absadd_rows(&mut tau_n);
        self.sym_p_sqrt.absadd_cols(&mut tau_n);
        self.mat_g.absadd_cols(&mut tau_n);

        let val_tau_t = tau_t.get(0) + f64::one();
        tau_t.set(0, val_tau_t);
    }

    fn absadd_rows(&self, sigma: &mut L::Sl)
    {
        let (n, m) = self.dim();

        splitm_mut!(sigma, (_sigma_r; 1), (sigma_s; 1), (sigma_n; n), (sigma_m; m));

        self.vec_q.absadd_cols(&mut sigma_s);
        let val_sigma_s = sigma_s.get(0) + f64::one();
        sigma_s.set(0, val_sigma_s);
        self.sym_p_sqrt.absadd_rows(&mut sigma_n);
        self.mat_g.absadd_rows(&mut sigma_m);
    }
}

//

pub struct ProbBoxQPOpB<'a, L: LinAlgEx<F = f64>>
{
    n: usize,
    vec_h: MatOp<'a, L>,
}

impl<'a, L: LinAlgEx<F = f64>> ProbBoxQPOpB<'a, L>
{
    fn dim(&self) -> (usize, usize)
    {
        let (m, one) = self.vec_h.size();
        assert_eq!(one, 1);

        (self.n, m)
    }
}

impl<'a, L: LinAlgEx<F = f64>> Operator<L> for ProbBoxQPOpB<'a, L>
{
    fn size(&self) -> (usize, usize)
    {
        let (n, m) = self.dim();

        ((2 + n) + m, 1)
    }

    fn op(&self, alpha: f64, x: &L::Sl, beta: f64, y: &mut L::Sl)
    {
        let (n, m) = self.dim();

        splitm_mut!(y, (y_r; 1), (y_sn; 1 + n), (y_m; m));

        // y_r = a*1*x + b*y_r
        L::scale(beta, &mut y_r);
        L::add(alpha, x, &mut y_r);

        // y_sn = 0*x + b*y_sn
        L::scale(beta, &mut y_sn);

        // y_m = a*vec_h*x + b*y_m
        self.vec_h.op(alpha, x, beta, &mut y_m);
    }

    fn trans_op(&self, alpha: f64, x: &L::Sl, beta: f64, y: &mut L::Sl)
    {
        let (n, m) = self.dim();

        splitm!(x, (x_r; 1), (_x_sn; 1 + n), (x_m; m));

        // y = a*1*x_r + 0*x_sn + a*vec_h^T*x_m + b*y
        self.vec_h.trans_op(alpha, &x_m, beta, y);
        L::add(alpha, &x_r, y);
    }

    fn absadd_cols(&self, tau: &mut L::Sl)
    {
        let val_tau = tau.get(0) + f64::one();
        tau.set(0, val_tau);
        self.vec_h.absadd_cols(tau);
    }

    fn absadd_rows(&self, sigma: &mut L::Sl)
    {
        let (n, m) = self.dim();

        splitm_mut!(sigma, (sigma_r; 1), (_sigma_sn; 1 + n), (sigma_m; m));

        let val_sigma_r = sigma_r.get(0) + f64::one();
        sigma_r.set(0, val_sigma_r);
        self.vec_h.absadd_rows(&mut sigma_m);
    }
}

//

pub struct ProbBoxQPCone<L: LinAlgEx<F = f64>>
{
    n: usize,
    m: usize,
    cone_rotsoc: ConeRotSOC<L>,
    cone_rpos: ConeRPos<L>,
}

impl<L: LinAlgEx<F = f64>> Cone<L> for ProbBoxQPCone<L>
{
    fn proj(&mut self, dual_cone: bool, x: &mut L::Sl) -> Result<(), ()>
    {
        let (n, m) = (self.n, self.m);

        splitm_mut!(x, (x_rsn; 2 + n), (x_m; m));

        self.cone_rotsoc.proj(dual_cone, &mut x_rsn)?;
        self.cone_rpos.proj(dual_cone, &mut x_m)?;
        Ok(())
    }

    fn product_group<G: Fn(&mut L::Sl) + Copy>(&self, dp_tau: &mut L::Sl, group: G)
    {
        let (n, m) = (self.n, self.m);

        splitm_mut!(dp_tau, (t_rsn; 2 + n), (t_m; m));

        self.cone_rotsoc.product_group(&mut t_rsn, group);
        self.cone_rpos.product_group(&mut t_m, group);
    }
}

//

/// Box-constrained quadratic program
///
/// <script src="https://polyfill.io/v3/polyfill.min.js?features=es6"></script>
/// <script id="MathJax-script" async src="https://cdn.jsdelivr.net/npm/mathjax@3/es5/tex-svg.js"></script>
///
/// The problem is
/// \\[
/// \begin{array}{ll}
/// {\rm minimize} & {1 \over 2} x^T P x + q^T x \\\\
/// {\rm subject \ to} & l \preceq A x \preceq u.
/// \end{array}
/// \\]
///
/// Every finite bound becomes one row of \\(G x \preceq h\\):
/// \\(\sigma_i A_i x \le \sigma_i u_i\\) and \\(-\sigma_i A_i x \le -\sigma_i l_i\\),
/// where \\(\sigma_i\\) is one, or the reciprocal of the largest magnitude of row \\(A_i\\)
/// when equilibrated.
///
/// The representation as a conic linear program is as follows:
/// \\[
/// \begin{array}{ll}
/// {\rm minimize} & t \\\\
/// {\rm subject \ to} &
///   \left[ \begin{array}{ccc}
///   0 & 0 \\\\
///   q^T & -1 \\\\
///   -P^{1 \over 2} & 0 \\\\
///   G & 0
///   \end{array} \right]
///   \left[ \begin{array}{c}
///   x \\\\ t
///   \end{array} \right]
///   + s =
///   \left[ \begin{array}{c}
///   1 \\\\ 0 \\\\ 0 \\\\ h
///   \end{array} \right] \\\\
/// & s \in \mathcal{Q}_r^{2 + n} \times \mathbb{R}\_+^m.
/// \end{array}
/// \\]
///
/// This is the embedding of [`totsu::ProbQP`] without its equality block,
/// with \\(G\\) evaluated as a [`RowPickOp`] on the sparse \\(A\\).
pub struct ProbBoxQP<'a, L: LinAlgEx<F = f64>>
{
    sym_p_sqrt: &'a MatBuild<L>,
    mat_a: &'a CscMat,

    vec_q: MatBuild<L>,
    vec_h: MatBuild<L>,

    picks: Vec<(usize, f64)>,
    row_picks: Vec<Vec<usize>>,
    row_abssum: Vec<f64>,

    w_solver: Vec<f64>,
}

impl<'a, L: LinAlgEx<F = f64>> ProbBoxQP<'a, L>
{
    /// Creates a box-constrained QP with given data.
    ///
    /// Returns a [`ProbBoxQP`] instance.
    /// * `sym_p_sqrt` is \\(P^{1 \over 2}\\) (see [`sym_p_sqrt`]).
    /// * `vec_q` is \\(q\\).
    /// * `mat_a` is \\(A\\).
    /// * `lower` and `upper` are \\(l\\) and \\(u\\).
    /// * `equilibrate` scales each bound row by the largest magnitude of its row.
    pub fn new(
        sym_p_sqrt: &'a MatBuild<L>, vec_q: &[f64],
        mat_a: &'a CscMat, lower: &[f64], upper: &[f64],
        equilibrate: bool) -> Self
    {
        let n = vec_q.len();
        let (m, n_) = mat_a.size();

        assert!(sym_p_sqrt.is_sympack());
        assert_eq!(sym_p_sqrt.size(), (n, n));
        assert_eq!(n, n_);
        assert_eq!(lower.len(), m);
        assert_eq!(upper.len(), m);

        let mut row_abssum = vec![0.; m];
        let mut row_absmax = vec![0_f64; m];
        for c in 0.. n {
            for (r, v) in mat_a.col(c) {
                row_abssum[r] += v.abs();
                row_absmax[r] = row_absmax[r].max(v.abs());
            }
        }

        let mut picks = Vec::new();
        let mut row_picks = vec![Vec::new(); m];
        let mut h = Vec::new();

        for r in 0.. m {
            let sigma = if equilibrate && row_absmax[r] > 0. {
                1. / row_absmax[r]
            }
            else {
                1.
            };

            if upper[r] < QP_INFTY {
                row_picks[r].push(picks.len());
                picks.push((r, sigma));
                h.push(sigma * upper[r]);
            }
            if lower[r] > -QP_INFTY {
                row_picks[r].push(picks.len());
                picks.push((r, -sigma));
                h.push(-sigma * lower[r]);
            }
        }

        let vec_q = MatBuild::new(MatType::General(n, 1))
                    .iter_colmaj(vec_q);
        let vec_h = MatBuild::new(MatType::General(h.len(), 1))
                    .iter_colmaj(&h);

        ProbBoxQP {
            sym_p_sqrt,
            mat_a,
            vec_q,
            vec_h,
            picks,
            row_picks,
            row_abssum,
            w_solver: Vec::new(),
        }
    }

    /// Number of finite bound rows.
    pub fn num_bound_rows(&self) -> usize
    {
        self.picks.len()
    }

    /// Generates the problem data structures to be fed to [`Solver::solve`].
    ///
    /// Returns a tuple of operators, a cone and a work slice.
    pub fn problem(&mut self) -> (ProbBoxQPOpC<L>, ProbBoxQPOpA<'_, L>, ProbBoxQPOpB<'_, L>, ProbBoxQPCone<L>, &mut[f64])
    {
        let n = self.vec_q.size().0;
        let m = self.picks.len();

        let op_c = ProbBoxQPOpC {
            ph_l: PhantomData,
            n,
        };
        let op_a = ProbBoxQPOpA {
            sym_p_sqrt: self.sym_p_sqrt.as_op(),
            vec_q: self.vec_q.as_op(),
            mat_g: RowPickOp {
                ph_l: PhantomData,
                mat: self.mat_a,
                picks: &self.picks,
                row_picks: &self.row_picks,
                row_abssum: &self.row_abssum,
            },
        };
        let op_b = ProbBoxQPOpB {
            n,
            vec_h: self.vec_h.as_op(),
        };

        let cone = ProbBoxQPCone {
            n, m,
            cone_rotsoc: ConeRotSOC::new(),
            cone_rpos: ConeRPos::new(),
        };

        self.w_solver.resize(Solver::<L>::query_worklen(op_a.size()), f64::zero());

        (op_c, op_a, op_b, cone, self.w_solver.as_mut())
    }
}

/// Calculates \\((\alpha P)^{1 \over 2}\\) from the upper triangle of \\(P\\).
///
/// * `alpha` is a nonnegative scale of \\(P\\).
/// * `eps_zero` should be the same value as [`totsu_core::solver::SolverParam::eps_zero`].
pub fn sym_p_sqrt<L: LinAlgEx<F = f64>>(mat_p: &CscMat, alpha: f64, eps_zero: f64) -> MatBuild<L>
{
    let (n, n_) = mat_p.size();
    assert_eq!(n, n_);

    let mut sym_p = MatBuild::new(MatType::SymPack(n));
    for c in 0.. n {
        for (r, v) in mat_p.col(c) {
            sym_p[(r, c)] = v;
        }
    }

    sym_p.scale(alpha).sqrt(eps_zero)
}

//

#[test]
fn test_row_pick_op()
{
    use float_eq::assert_float_eq;
    use totsu_core::FloatGeneric;

    type L = FloatGeneric<f64>;

    // | 1 0 |
    // | 2 4 |
    let a = CscMat::from_columns(2, &[
        vec![(0, 1.), (1, 2.)],
        vec![(1, 4.)],
    ]);
    let sym_p = CscMat::from_columns(2, &[
        vec![(0, 1.)],
        vec![(1, 1.)],
    ]);
    let p_sqrt = sym_p_sqrt::<L>(&sym_p, 1., 1e-12);

    // row 0 both sides, row 1 upper only
    let prob = ProbBoxQP::<L>::new(&p_sqrt, &[0., 0.], &a, &[-1., -QP_INFTY], &[1., 3.], true);
    assert_eq!(prob.num_bound_rows(), 3);
    assert_eq!(prob.picks, vec![(0, 1.), (0, -1.), (1, 0.25)]);

    let op = RowPickOp::<L> {
        ph_l: PhantomData,
        mat: &a,
        picks: &prob.picks,
        row_picks: &prob.row_picks,
        row_abssum: &prob.row_abssum,
    };

    let x = vec![1., 1.];
    let mut y = vec![0.; 3];
    op.op(1., &x, 0., &mut y);
    assert_float_eq!(y.as_slice(), [1., -1., 1.5].as_ref(), abs_all <= 1e-12);

    let z = vec![1., 2., 4.];
    let mut w = vec![0.; 2];
    op.trans_op(1., &z, 0., &mut w);
    assert_float_eq!(w.as_slice(), [1. - 2. + 2., 4.].as_ref(), abs_all <= 1e-12);

    let mut tau = vec![0.; 2];
    op.absadd_cols(&mut tau);
    assert_float_eq!(tau.as_slice(), [2.5, 1.].as_ref(), abs_all <= 1e-12);

    let mut sigma = vec![0.; 3];
    op.absadd_rows(&mut sigma);
    assert_float_eq!(sigma.as_slice(), [1., 1., 1.5].as_ref(), abs_all <= 1e-12);
}
