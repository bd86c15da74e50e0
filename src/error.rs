use crate::QpStatus;

/// Smoother errors.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SmootherError
{
    /// No reference points.
    EmptyInput,
    /// Numbers of reference points and bound radii differ.
    SizeMismatch {
        points: usize,
        bounds: usize,
    },
    /// Fewer than 3 reference points.
    TooFewPoints(usize),
    /// Problem dimensions exceed the solver index range.
    Overflow(usize),
    /// Negative or non-finite penalty weight or bound radius.
    InvalidInput,

    /// QP data rejected by the backend.
    Setup(QpStatus),
    /// The first QP solve failed.
    InitialSolveFailed(QpStatus),
    /// A QP solve failed in the outer loop.
    IterativeSolveFailed {
        iteration: usize,
        status: QpStatus,
    },
    /// Outer iterations exhausted; carries the last relative objective change.
    NotConverged(f64),
}

impl core::fmt::Display for SmootherError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match &self {
            SmootherError::EmptyInput =>
                write!(f, "EmptyInput: reference points empty"),
            SmootherError::SizeMismatch {points, bounds} =>
                write!(f, "SizeMismatch: {} reference points but {} bounds", points, bounds),
            SmootherError::TooFewPoints(n) =>
                write!(f, "TooFewPoints: {} reference points, at least 3 required", n),
            SmootherError::Overflow(n) =>
                write!(f, "Overflow: {} reference points exceed the solver index range", n),
            SmootherError::InvalidInput =>
                write!(f, "InvalidInput: negative or non-finite weight or bound"),
            SmootherError::Setup(st) =>
                write!(f, "Setup: QP data rejected ({})", st),
            SmootherError::InitialSolveFailed(st) =>
                write!(f, "InitialSolveFailed: {}", st),
            SmootherError::IterativeSolveFailed {iteration, status} =>
                write!(f, "IterativeSolveFailed: iteration {} ({})", iteration, status),
            SmootherError::NotConverged(eps) =>
                write!(f, "NotConverged: objective change {:.3e} at the iteration limit", eps),
        }
    }
}

impl std::error::Error for SmootherError {}

//

#[test]
fn test_error_display()
{
    let e = SmootherError::IterativeSolveFailed {
        iteration: 3,
        status: QpStatus::MaxIterReached,
    };
    let s = format!("{}", e);
    assert!(s.starts_with("IterativeSolveFailed: iteration 3"));

    let e = SmootherError::SizeMismatch {points: 5, bounds: 4};
    assert_eq!(format!("{}", e), "SizeMismatch: 5 reference points but 4 bounds");
}
