//! Error types of the compiler, the stack machine, evaluation and settings documents.
//! Rewrite rules never fail and have no error type.
use thiserror::Error;

/// Failure to lower a tree into instructions.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CompileError {
    #[error("variable `{0}` is not bound to an argument slot")]
    UnboundVariable(String),
    #[error("variable `{0}` is declared more than once")]
    DuplicateVariable(String),
    #[error("node `{0}` cannot be compiled")]
    UnsupportedNode(String),
}

/// Failure while running a compiled function.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CallError {
    #[error("expected {expected} arguments, got {found}")]
    Arity { expected: usize, found: usize },
    /// The instruction sequence left the stack at the wrong depth. Indicates a compiler defect.
    #[error("stack holds {depth} values at the end of the program, expected exactly 1")]
    StackImbalance { depth: usize },
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvalError {
    #[error("expression `{0}` has free variables or calculus nodes")]
    NotEvaluable(String),
    #[error(transparent)]
    Compile(#[from] CompileError),
    #[error(transparent)]
    Call(#[from] CallError),
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SettingsError {
    #[error("cannot parse settings document: {0}")]
    Parse(String),
    #[error("invalid value `{value}` for `{key}`")]
    InvalidValue { key: String, value: String },
}
