use core::ops::Range;
use crate::SmootherError;

/// Largest row or column count the QP index type can address.
pub const MAX_QP_INDEX: usize = i32::MAX as usize;

/// Problem dimensions
///
/// Derived from a number of reference points.
/// Positions are interleaved as `x0, y0, x1, y1, ...`,
/// followed by one slack variable per interior point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProblemDims
{
    pub num_points: usize,
    pub num_pos_vars: usize,
    pub num_slack_vars: usize,
    pub num_vars: usize,
    pub num_constraints: usize,
}

impl ProblemDims
{
    /// Derives dimensions.
    ///
    /// Returns [`SmootherError::TooFewPoints`] below 3 points,
    /// or [`SmootherError::Overflow`] if any count leaves the index range.
    pub fn new(num_points: usize) -> Result<Self, SmootherError>
    {
        if num_points < 3 {
            return Err(SmootherError::TooFewPoints(num_points));
        }

        let overflow = SmootherError::Overflow(num_points);

        let num_pos_vars = num_points.checked_mul(2).ok_or(overflow)?;
        let num_slack_vars = num_points - 2;
        let num_vars = num_pos_vars.checked_add(num_slack_vars).ok_or(overflow)?;
        let num_constraints = num_vars.checked_add(num_slack_vars).ok_or(overflow)?;

        if num_constraints > MAX_QP_INDEX {
            return Err(overflow);
        }

        Ok(ProblemDims {
            num_points,
            num_pos_vars,
            num_slack_vars,
            num_vars,
            num_constraints,
        })
    }

    /// Box constraint rows, one per position variable.
    pub fn pos_rows(&self) -> Range<usize>
    {
        0.. self.num_pos_vars
    }

    /// Slack bound rows, one per slack variable.
    pub fn slack_rows(&self) -> Range<usize>
    {
        self.num_pos_vars.. self.num_vars
    }

    /// Linearized curvature rows, one per interior point.
    pub fn curvature_rows(&self) -> Range<usize>
    {
        self.num_vars.. self.num_constraints
    }

    /// Column of the slack variable of interior point `point` (`1..=num_points-2`).
    pub fn slack_col(&self, point: usize) -> usize
    {
        assert!(point >= 1 && point + 1 < self.num_points);
        self.num_pos_vars + point - 1
    }

    /// Curvature row of interior point `point` (`1..=num_points-2`).
    pub fn curvature_row(&self, point: usize) -> usize
    {
        assert!(point >= 1 && point + 1 < self.num_points);
        self.num_vars + point - 1
    }
}

//

#[test]
fn test_dims_minimal()
{
    let d = ProblemDims::new(3).unwrap();
    assert_eq!(d.num_pos_vars, 6);
    assert_eq!(d.num_slack_vars, 1);
    assert_eq!(d.num_vars, 7);
    assert_eq!(d.num_constraints, 8);
    assert_eq!(d.slack_col(1), 6);
    assert_eq!(d.curvature_row(1), 7);
    assert_eq!(d.slack_rows(), 6.. 7);
    assert_eq!(d.curvature_rows(), 7.. 8);
}

#[test]
fn test_dims_rejects()
{
    assert_eq!(ProblemDims::new(2), Err(SmootherError::TooFewPoints(2)));
    assert_eq!(ProblemDims::new(0), Err(SmootherError::TooFewPoints(0)));
    assert_eq!(ProblemDims::new(usize::MAX), Err(SmootherError::Overflow(usize::MAX)));
    assert_eq!(ProblemDims::new(600_000_000), Err(SmootherError::Overflow(600_000_000)));
}
