use std::{
    error::Error,
    fmt::{self, Display},
    io,
};

/// The result type used in the entire reinforcement learning core.
pub type Result<T> = std::result::Result<T, RlErr>;

/// The reinforcement learning core's error type.
#[derive(Debug)]
pub enum RlErr {
    /// Two operands (or an operand and the shape it is folded into) disagree.
    ShapeMismatch {
        what: &'static str,
        got: Vec<usize>,
        expected: Vec<usize>,
    },
    OutOfBounds {
        what: &'static str,
        index: usize,
        len: usize,
    },
    FrozenTrajectory,
    /// A transition's start state was read before its trajectory's references were filled.
    UnlinkedTransition {
        index: usize,
    },
    MissingDistribution,
    InvalidDistribution(String),
    WeightsLength {
        got: usize,
        expected: usize,
    },
    WorkerPanicked {
        worker_id: usize,
    },
    Io(io::Error),
}

impl RlErr {
    /// Shorthand for a mismatch between two flat lengths.
    pub(crate) fn len_mismatch(what: &'static str, got: usize, expected: usize) -> Self {
        Self::ShapeMismatch {
            what,
            got: vec![got],
            expected: vec![expected],
        }
    }
}

impl Display for RlErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RlErr::ShapeMismatch {
                what,
                got,
                expected,
            } => write!(
                f,
                "shape mismatch for {what}: got {got:?}, expected {expected:?}"
            ),
            RlErr::OutOfBounds { what, index, len } => {
                write!(f, "index {index} out of bounds for {what} of length {len}")
            }
            RlErr::FrozenTrajectory => {
                write!(f, "tried to append a transition to a frozen trajectory")
            }
            RlErr::UnlinkedTransition { index } => write!(
                f,
                "transition {index} has no start state reference, fill_reference was not called"
            ),
            RlErr::MissingDistribution => write!(
                f,
                "the action was not sampled from a distribution, no importance ratio can be computed"
            ),
            RlErr::InvalidDistribution(msg) => write!(f, "invalid distribution: {msg}"),
            RlErr::WeightsLength { got, expected } => write!(
                f,
                "weights length mismatch: got {got} bytes, expected {expected} bytes"
            ),
            RlErr::WorkerPanicked { worker_id } => {
                write!(f, "worker {worker_id} panicked during the rollout")
            }
            RlErr::Io(e) => write!(f, "io error: {e}"),
        }
    }
}

impl Error for RlErr {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            RlErr::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for RlErr {
    fn from(value: io::Error) -> Self {
        Self::Io(value)
    }
}
