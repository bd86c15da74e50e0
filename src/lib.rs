/*!
Reference-line smoothing by **finite-element position deviation** with a
sequential-quadratic-programming (SQP) curvature loop, solved by [`totsu_core`].

<script src="https://polyfill.io/v3/polyfill.min.js?features=es6"></script>
<script id="MathJax-script" async src="https://cdn.jsdelivr.net/npm/mathjax@3/es5/tex-mml-chtml.js"></script>

Given reference points \\(r_0, \ldots, r_{n-1} \in \mathbb{R}^2\\) and bound radii \\(b_i \ge 0\\),
the smoothed points \\(p_i\\) minimize
\\[
w_f \sum_{i=1}^{n-2} \\| p_{i-1} - 2 p_i + p_{i+1} \\|^2
+ w_l \sum_{i=0}^{n-2} \\| p_{i+1} - p_i \\|^2
+ w_r \sum_{i=0}^{n-1} \\| p_i - r_i \\|^2
+ w_s \sum_{i=1}^{n-2} s_i
\\]
subject to \\( r_i - b_i \preceq p_i \preceq r_i + b_i \\), \\( s_i \ge 0 \\) and a curvature limit
\\( \\| p_{i-1} - 2 p_i + p_{i+1} \\|^2 \le \kappa^2 + s_i \\) that is re-linearized around
the latest iterate on every outer iteration.

# General usage

1. Create a [`FemPosSqpSmoother`] instance and optionally set its parameters through
   [`FemPosSqpSmoother::par`].
1. Invoke [`FemPosSqpSmoother::try_solve`] with the reference points and bound radii.
1. Read the smoothed sequences from the resulted [`SmoothedPath`].

[`FemPosSqpInterface`] wraps the same procedure behind a stateful `solve() -> bool` interface.

# Examples

```
use fempos_sqp::prelude::*;

//env_logger::init(); // Use any logger crate as `fempos_sqp` uses `log` crate.

let ref_points = [(0., 0.), (1., 0.05), (2., -0.05), (3., 0.05), (4., 0.)];
let bounds = [0.2; 5];

let s = FemPosSqpSmoother::new().par(|p| {
    p.weight_fem_pos_deviation = 10.;
    p.qp.max_iter = Some(200_000);
});
let rslt = s.try_solve(&ref_points, &bounds).unwrap();

assert_eq!(rslt.x.len(), ref_points.len());
for (i, &(rx, ry)) in ref_points.iter().enumerate() {
    assert!((rslt.x[i] - rx).abs() <= 0.2 + 1e-3);
    assert!((rslt.y[i] - ry).abs() <= 0.2 + 1e-3);
}
```
*/

mod error;

pub use error::*;

//

mod dims;

pub use dims::*;

//

mod cscmat;

pub use cscmat::*;

//

mod kernel;

pub use kernel::*;

//

mod constraint;

pub use constraint::*;

//

mod warmstart;

pub use warmstart::*;

//

mod qp;

pub use qp::*;

//

mod param;

pub use param::*;

//

mod smoother;

pub use smoother::*;

//

/// Prelude
pub mod prelude
{
    pub use crate::{FemPosSqpSmoother, FemPosSqpInterface, SmootherParam, SmoothedPath, SmootherError, set_par_by_env};
    pub use crate::{QpSettings, QpStatus};
    pub use totsu_core::FloatGeneric;
}
