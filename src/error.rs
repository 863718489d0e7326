//! Unified error handling.
//!
//! Consolidates the domain-specific errors from the compiler, the
//! program validator, the interpreter, and the kernel layer into one
//! type that embedding hosts can match on, with a coarse
//! categorization for handling decisions.

use crate::compiler::CompileError;
use crate::program::ValidateError;
use crate::tensor::TensorError;
use crate::vm::{ExecError, KernelError};
use std::fmt;

/// Unified error type.
#[derive(Debug, thiserror::Error)]
pub enum FlowVmError {
    /// Malformed or cyclic input graph.
    #[error(transparent)]
    Compile(#[from] CompileError),

    /// Structurally invalid program. Indicates a compiler bug or a
    /// corrupted serialized program, never bad runtime data.
    #[error(transparent)]
    Validate(#[from] ValidateError),

    /// Execution failure.
    #[error(transparent)]
    Exec(#[from] ExecError),

    /// Kernel failure outside of program execution.
    #[error(transparent)]
    Kernel(#[from] KernelError),

    /// Tensor construction or typed-access failure.
    #[error(transparent)]
    Tensor(#[from] TensorError),

    /// File I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Graph or program (de)serialization error.
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    /// Internal error (indicates a bug).
    #[error("internal error: {0}")]
    Internal(String),
}

/// Coarse error category for handling decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Invalid input, configuration, or data supplied by the caller.
    User,
    /// Malformed or cyclic input graph.
    Compile,
    /// A kernel or type contract failed at run time.
    Execution,
    /// A bug: malformed program, broken invariant.
    Internal,
    /// File or serialization problem.
    Io,
}

impl FlowVmError {
    /// Categorize the error.
    ///
    /// Undefined operands and missing outputs are classed as internal:
    /// a correct lowering pass never produces a program that triggers
    /// them, so they indicate a bug rather than a data problem.
    pub fn category(&self) -> ErrorCategory {
        match self {
            FlowVmError::Compile(_) => ErrorCategory::Compile,
            FlowVmError::Validate(_) => ErrorCategory::Internal,
            FlowVmError::Exec(err) => match err {
                ExecError::UndefinedOperand { .. } | ExecError::MissingOutput { .. } => {
                    ErrorCategory::Internal
                }
                ExecError::KernelExecution { .. }
                | ExecError::TypeMismatch { .. }
                | ExecError::OutputArity { .. } => ErrorCategory::Execution,
                ExecError::UnknownOpcode { .. }
                | ExecError::MissingInput(_)
                | ExecError::UnknownInput(_)
                | ExecError::InvalidState { .. } => ErrorCategory::User,
            },
            FlowVmError::Kernel(_) => ErrorCategory::Execution,
            FlowVmError::Tensor(_) => ErrorCategory::User,
            FlowVmError::Io(_) | FlowVmError::Serde(_) => ErrorCategory::Io,
            FlowVmError::Internal(_) => ErrorCategory::Internal,
        }
    }

    /// True for errors indicating a bug rather than bad input.
    pub fn is_internal_error(&self) -> bool {
        self.category() == ErrorCategory::Internal
    }

    /// True for errors the caller can fix by changing their input.
    pub fn is_user_error(&self) -> bool {
        matches!(self.category(), ErrorCategory::User | ErrorCategory::Compile)
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorCategory::User => write!(f, "User"),
            ErrorCategory::Compile => write!(f, "Compile"),
            ErrorCategory::Execution => write!(f, "Execution"),
            ErrorCategory::Internal => write!(f, "Internal"),
            ErrorCategory::Io => write!(f, "Io"),
        }
    }
}

/// Result alias using [`FlowVmError`].
pub type FlowResult<T> = std::result::Result<T, FlowVmError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::program::OperandId;

    #[test]
    fn test_compile_errors_categorized() {
        let err = FlowVmError::from(CompileError::UndefinedGraphOutput("y".into()));
        assert_eq!(err.category(), ErrorCategory::Compile);
        assert!(err.is_user_error());
    }

    #[test]
    fn test_undefined_operand_is_internal() {
        let err = FlowVmError::from(ExecError::UndefinedOperand {
            pc: 2,
            opcode: "Add".into(),
            operand: OperandId(7),
        });
        assert_eq!(err.category(), ErrorCategory::Internal);
        assert!(err.is_internal_error());
    }

    #[test]
    fn test_kernel_failure_is_execution() {
        let err = FlowVmError::from(ExecError::KernelExecution {
            pc: 0,
            opcode: "Add".into(),
            source: KernelError::Other("boom".into()),
        });
        assert_eq!(err.category(), ErrorCategory::Execution);
        assert!(!err.is_internal_error());
    }

    #[test]
    fn test_unknown_opcode_is_user() {
        let err = FlowVmError::from(ExecError::UnknownOpcode {
            pc: 1,
            opcode: "Nope".into(),
        });
        assert_eq!(err.category(), ErrorCategory::User);
    }

    #[test]
    fn test_display_carries_context() {
        let err = FlowVmError::from(ExecError::UndefinedOperand {
            pc: 2,
            opcode: "Add".into(),
            operand: OperandId(7),
        });
        let text = err.to_string();
        assert!(text.contains("instruction 2"));
        assert!(text.contains("Add"));
        assert!(text.contains("%7"));
    }

    #[test]
    fn test_category_display() {
        assert_eq!(ErrorCategory::Execution.to_string(), "Execution");
        assert_eq!(ErrorCategory::Internal.to_string(), "Internal");
    }
}
