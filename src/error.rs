//! Error types (ambient, spec §7).
//!
//! A single `PrismError` grouping the five fatal error classes the spec
//! names, each a plain enum with a hand-written `Display`, mirroring
//! Cordy's `vm/error.rs` (`RuntimeErrorType` + manual formatting) rather
//! than pulling in an external error-derive crate. Every error is fatal:
//! there is no recovery path, only propagation via `?`.

use std::fmt;

#[derive(Debug, Clone)]
pub enum PrismError {
    Compilation(CompilationError),
    OpcodeArity(OpcodeArityError),
    RuntimeType(RuntimeTypeError),
    Stack(StackError),
    EvaluatorInvariant(EvaluatorInvariantError),
}

#[derive(Debug, Clone)]
pub enum CompilationError {
    ParseError { message: String, line: usize },
    UnexpectedToken { expected: String, found: String, line: usize },
    UnsupportedNode(String),
    UnsupportedBinaryOp(String),
    UnsupportedCompareOp(String),
    UnknownBuiltin(String),
}

#[derive(Debug, Clone)]
pub enum OpcodeArityError {
    MissingRelabelTarget(String),
    DuplicateLabel(String),
    UndefinedLabel(String),
}

#[derive(Debug, Clone)]
pub enum RuntimeTypeError {
    BinaryOpTypeMismatch { op: &'static str, lhs: &'static str, rhs: &'static str },
    CompareTypeMismatch { op: &'static str, lhs: &'static str, rhs: &'static str },
    NotIterable(&'static str),
    NotCallable(&'static str),
    NotATuple(&'static str),
    ConditionNotInteger(&'static str),
    ArityMismatch { name: String, expected: usize, got: usize },
    NameNotFound(String),
    Aborted(String),
}

#[derive(Debug, Clone)]
pub enum StackError {
    Underflow { op: &'static str },
    NonSingletonAtReturn(usize),
    RanPastEnd,
}

#[derive(Debug, Clone)]
pub enum EvaluatorInvariantError {
    StoreGreenWithoutGreenValue(String),
    UnrollOnRedValue,
    GetIterOnRedValueWithoutUnroll,
    UnrollTargetNotGreenName(String),
    BackBranchNotFound(String),
}

impl fmt::Display for PrismError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PrismError::Compilation(e) => write!(f, "compilation error: {}", e),
            PrismError::OpcodeArity(e) => write!(f, "opcode arity error: {}", e),
            PrismError::RuntimeType(e) => write!(f, "runtime type error: {}", e),
            PrismError::Stack(e) => write!(f, "stack error: {}", e),
            PrismError::EvaluatorInvariant(e) => write!(f, "evaluator invariant error: {}", e),
        }
    }
}

impl fmt::Display for CompilationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompilationError::ParseError { message, line } => write!(f, "{} (line {})", message, line),
            CompilationError::UnexpectedToken { expected, found, line } => {
                write!(f, "expected {}, found {} (line {})", expected, found, line)
            }
            CompilationError::UnsupportedNode(n) => write!(f, "unsupported syntax: {}", n),
            CompilationError::UnsupportedBinaryOp(op) => write!(f, "unsupported binary operator: {}", op),
            CompilationError::UnsupportedCompareOp(op) => write!(f, "unsupported comparison operator: {}", op),
            CompilationError::UnknownBuiltin(name) => write!(f, "unknown builtin: {}", name),
        }
    }
}

impl fmt::Display for OpcodeArityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OpcodeArityError::MissingRelabelTarget(l) => write!(f, "relabel map has no entry for {}", l),
            OpcodeArityError::DuplicateLabel(l) => write!(f, "duplicate label: {}", l),
            OpcodeArityError::UndefinedLabel(l) => write!(f, "branch to undefined label: {}", l),
        }
    }
}

impl fmt::Display for RuntimeTypeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuntimeTypeError::BinaryOpTypeMismatch { op, lhs, rhs } => {
                write!(f, "unsupported operand types for {}: {} and {}", op, lhs, rhs)
            }
            RuntimeTypeError::CompareTypeMismatch { op, lhs, rhs } => {
                write!(f, "unsupported operand types for {}: {} and {}", op, lhs, rhs)
            }
            RuntimeTypeError::NotIterable(t) => write!(f, "{} is not iterable", t),
            RuntimeTypeError::NotCallable(t) => write!(f, "{} is not callable", t),
            RuntimeTypeError::NotATuple(t) => write!(f, "{} is not a tuple", t),
            RuntimeTypeError::ConditionNotInteger(t) => write!(f, "branch condition must be an integer, got {}", t),
            RuntimeTypeError::ArityMismatch { name, expected, got } => {
                write!(f, "{} takes {} argument(s), got {}", name, expected, got)
            }
            RuntimeTypeError::NameNotFound(n) => write!(f, "name not found: {}", n),
            RuntimeTypeError::Aborted(msg) => write!(f, "ABORT: {}", msg),
        }
    }
}

impl fmt::Display for StackError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StackError::Underflow { op } => write!(f, "operand stack underflow executing {}", op),
            StackError::NonSingletonAtReturn(n) => {
                write!(f, "frame stack must hold exactly one value at return, found {}", n)
            }
            StackError::RanPastEnd => write!(f, "frame ran past the end of its code without returning"),
        }
    }
}

impl fmt::Display for EvaluatorInvariantError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EvaluatorInvariantError::StoreGreenWithoutGreenValue(n) => {
                write!(f, "store_local_green {} with no green value on the stack", n)
            }
            EvaluatorInvariantError::UnrollOnRedValue => write!(f, "unroll requires a green tuple"),
            EvaluatorInvariantError::GetIterOnRedValueWithoutUnroll => {
                write!(f, "get_iter over a red tuple that was never unrolled")
            }
            EvaluatorInvariantError::UnrollTargetNotGreenName(n) => {
                write!(f, "unrolled loop target {} is not a green-cased name", n)
            }
            EvaluatorInvariantError::BackBranchNotFound(l) => {
                write!(f, "expected br {} immediately before the loop's endfor label", l)
            }
        }
    }
}

impl std::error::Error for PrismError {}
