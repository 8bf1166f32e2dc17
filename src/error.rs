use thiserror::Error;

use crate::graph::{BlockId, NodeId};

macro_rules! malformed_error {
    // Single string version
    ($msg:expr) => {
        crate::Error::Malformed {
            message: $msg.to_string(),
            file: file!(),
            line: line!(),
        }
    };

    // Format string with arguments version
    ($fmt:expr, $($arg:tt)*) => {
        crate::Error::Malformed {
            message: format!($fmt, $($arg)*),
            file: file!(),
            line: line!(),
        }
    };
}

/// The generic Error type, which provides coverage for all errors this library can potentially
/// return.
///
/// Almost every variant describes *malformed graph usage*: a pass or a translator drove the
/// builder in a way that violates the graph invariants. Those errors are fatal to the unit being
/// compiled, and the scheduler discards the unit's graph wholesale. The one exception is
/// [`Error::BlockTerminated`], which is a control signal rather than a failure.
///
/// # Error Categories
///
/// ## Graph Shape Errors
/// - [`Error::UnresolvedLabel`] - A block label was dereferenced before its block was sealed
/// - [`Error::LabelAlreadyResolved`] - A block label was bound a second time
/// - [`Error::IndexOutOfBounds`] - An edge or successor index exceeded the node's arity
/// - [`Error::InvalidNode`] - A node id does not refer to a node in the session arena
/// - [`Error::NotAValue`] / [`Error::NotTriable`] - An operand has the wrong node category
///
/// ## Builder State Errors
/// - [`Error::NoCurrentBlock`] - Append attempted while no block is open
/// - [`Error::BlockInProgress`] - A block was begun or the unit finished while another block is open
/// - [`Error::IncompleteUnit`] - The unit was finished with unresolved successor labels
/// - [`Error::NoDelegate`] - A builder without a delegate did not implement an operation
///
/// ## Program Reference Errors
/// - [`Error::UnresolvedReference`] - A symbolic member reference reached the base builder
/// - [`Error::BlockTerminated`] - The current block was terminated early by a rewriting pass
///
/// # Examples
///
/// ```rust
/// use aotgraph::{graph::BlockLabel, Error};
///
/// let label = BlockLabel::new();
/// match label.target() {
///     Err(Error::UnresolvedLabel(_)) => println!("label not bound yet"),
///     Ok(block) => println!("bound to {}", block),
///     Err(e) => eprintln!("Other error: {}", e),
/// }
/// ```
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// A block label was dereferenced before the block it names was sealed.
    ///
    /// Labels are forward references; they are only bound when the terminator of
    /// the block they name is appended.
    #[error("Block label {0} has not been resolved")]
    UnresolvedLabel(u64),

    /// A block label was resolved a second time.
    ///
    /// Every label names exactly one block. Re-binding indicates that a translator
    /// began two blocks with the same label.
    #[error("Block label {0} is already resolved")]
    LabelAlreadyResolved(u64),

    /// An edge, successor or argument index was outside the node's arity.
    #[error("Index {index} is out of bounds (count {count})")]
    IndexOutOfBounds {
        /// The requested index
        index: usize,
        /// The number of available entries
        count: usize,
    },

    /// The node id does not refer to any node of the session arena.
    #[error("Invalid node - {0}")]
    InvalidNode(NodeId),

    /// An operand was expected to produce a value but is an action, terminator or block entry.
    #[error("Node {0} does not produce a value")]
    NotAValue(NodeId),

    /// A `try` terminator was asked to wrap an operation that cannot raise an exception,
    /// or an operation that is not the head of the current ordering chain.
    #[error("Node {0} is not a triable operation at the head of the current block")]
    NotTriable(NodeId),

    /// A node append was attempted while no block is under construction.
    ///
    /// This happens after a terminator sealed the current block and before the next
    /// `begin`.
    #[error("No block is under construction")]
    NoCurrentBlock,

    /// A block was begun, or the unit finished, while another block is still open.
    #[error("Block {0} is still under construction")]
    BlockInProgress(u64),

    /// The current block was terminated early (for example by a synthesized throw of a
    /// linkage error). The remaining instructions of the source block must not be built.
    ///
    /// The associated [`BlockId`] is the block that was sealed.
    #[error("Block {0} was terminated early")]
    BlockTerminated(BlockId),

    /// A symbolic member reference reached a builder that cannot resolve it.
    #[error("Unresolved program reference - {0}")]
    UnresolvedReference(String),

    /// A builder without a delegate was asked to perform an operation it does not implement.
    #[error("Builder has no delegate to perform `{0}`")]
    NoDelegate(&'static str),

    /// The unit was finished while some successor labels were never resolved.
    #[error("Compilation unit is incomplete - {0}")]
    IncompleteUnit(String),

    /// The worker pool for parallel unit compilation could not be created.
    #[error("Failed to create worker pool - {0}")]
    ThreadPool(String),

    /// Internal invariant violation.
    ///
    /// # Fields
    ///
    /// * `message` - Detailed description of what was malformed
    /// * `file` - Source file where the error was detected
    /// * `line` - Source line where the error was detected
    #[error("Malformed - {file}:{line}: {message}")]
    Malformed {
        /// The message to be printed for the Malformed error
        message: String,
        /// The source file in which this error occured
        file: &'static str,
        /// The source line in which this error occured
        line: u32,
    },
}

impl Error {
    /// Returns `true` if this error is the early-termination signal rather than a failure.
    #[must_use]
    pub fn is_block_terminated(&self) -> bool {
        matches!(self, Self::BlockTerminated(_))
    }
}
