use crate::ProblemDims;

/// Primal warm start
///
/// Positions take the given points, slack variables stay zero.
#[derive(Debug, Clone, PartialEq)]
pub struct PrimalWarmStart
{
    x: Vec<f64>,
}

impl PrimalWarmStart
{
    /// Creates an instance from the reference points.
    pub fn new(dims: &ProblemDims, ref_points: &[(f64, f64)]) -> Self
    {
        let mut ws = PrimalWarmStart {
            x: vec![0.; dims.num_vars],
        };
        ws.update(ref_points);
        ws
    }

    /// Overwrites positions by `points`.
    pub fn update(&mut self, points: &[(f64, f64)])
    {
        assert!(2 * points.len() <= self.x.len());

        for (i, &(x, y)) in points.iter().enumerate() {
            self.x[2 * i] = x;
            self.x[2 * i + 1] = y;
        }
    }

    pub fn as_slice(&self) -> &[f64]
    {
        &self.x
    }
}

//

#[test]
fn test_warm_start()
{
    let dims = ProblemDims::new(3).unwrap();
    let mut ws = PrimalWarmStart::new(&dims, &[(1., 2.), (3., 4.), (5., 6.)]);
    assert_eq!(ws.as_slice(), &[1., 2., 3., 4., 5., 6., 0.]);

    ws.update(&[(0., 0.), (1., 1.), (2., 2.)]);
    assert_eq!(ws.as_slice(), &[0., 0., 1., 1., 2., 2., 0.]);
}
