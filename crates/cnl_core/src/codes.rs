//! The fixed set of diagnostic codes the checkers can emit.
//!
//! Every checker picks its codes from this enum rather than formatting a
//! free-form string, so a caller can match on `code` without parsing
//! `message`.

use std::fmt;

use cnl_base::Severity;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    UndefinedVariable,
    TypeMismatch,
    ReturnTypeMismatch,
    IfBranchMismatch,
    MatchBranchMismatch,
    NotCallArity,
    AwaitType,
    TypevarInconsistent,

    EffMissingIo,

    CapabilityInferMissingIo,
    CapabilityInferMissingCpu,
    EffCapMissing,
    EffCapSuperfluous,
    WorkflowMissingIoEffect,
    WorkflowUndeclaredCapability,
    CompensateNewCapability,

    PiiAssignDowngrade,
    PiiImplicitUplevel,
    PiiArgViolation,
    PiiSinkUnknown,
    PiiSinkUnsanitized,

    AsyncStartNotWaited,
    AsyncWaitNotStarted,
    AsyncDuplicateStart,
    AsyncDuplicateWait,
}

impl ErrorCode {
    /// The stable wire name, as it would appear in a diagnostic's `code`
    /// field — `SCREAMING_SNAKE_CASE`, matching the checker names it is
    /// drawn from.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::UndefinedVariable => "UNDEFINED_VARIABLE",
            ErrorCode::TypeMismatch => "TYPE_MISMATCH",
            ErrorCode::ReturnTypeMismatch => "RETURN_TYPE_MISMATCH",
            ErrorCode::IfBranchMismatch => "IF_BRANCH_MISMATCH",
            ErrorCode::MatchBranchMismatch => "MATCH_BRANCH_MISMATCH",
            ErrorCode::NotCallArity => "NOT_CALL_ARITY",
            ErrorCode::AwaitType => "AWAIT_TYPE",
            ErrorCode::TypevarInconsistent => "TYPEVAR_INCONSISTENT",
            ErrorCode::EffMissingIo => "EFF_MISSING_IO",
            ErrorCode::CapabilityInferMissingIo => "CAPABILITY_INFER_MISSING_IO",
            ErrorCode::CapabilityInferMissingCpu => "CAPABILITY_INFER_MISSING_CPU",
            ErrorCode::EffCapMissing => "EFF_CAP_MISSING",
            ErrorCode::EffCapSuperfluous => "EFF_CAP_SUPERFLUOUS",
            ErrorCode::WorkflowMissingIoEffect => "WORKFLOW_MISSING_IO_EFFECT",
            ErrorCode::WorkflowUndeclaredCapability => "WORKFLOW_UNDECLARED_CAPABILITY",
            ErrorCode::CompensateNewCapability => "COMPENSATE_NEW_CAPABILITY",
            ErrorCode::PiiAssignDowngrade => "PII_ASSIGN_DOWNGRADE",
            ErrorCode::PiiImplicitUplevel => "PII_IMPLICIT_UPLEVEL",
            ErrorCode::PiiArgViolation => "PII_ARG_VIOLATION",
            ErrorCode::PiiSinkUnknown => "PII_SINK_UNKNOWN",
            ErrorCode::PiiSinkUnsanitized => "PII_SINK_UNSANITIZED",
            ErrorCode::AsyncStartNotWaited => "ASYNC_START_NOT_WAITED",
            ErrorCode::AsyncWaitNotStarted => "ASYNC_WAIT_NOT_STARTED",
            ErrorCode::AsyncDuplicateStart => "ASYNC_DUPLICATE_START",
            ErrorCode::AsyncDuplicateWait => "ASYNC_DUPLICATE_WAIT",
        }
    }

    /// Whether a diagnostic of this code blocks a clean compile, or is
    /// merely advisory.
    pub fn severity(&self) -> Severity {
        match self {
            ErrorCode::AsyncDuplicateWait | ErrorCode::EffCapSuperfluous => Severity::Warning,
            _ => Severity::Error,
        }
    }

    /// Builds an empty [`cnl_base::Diagnostic`] at this code's fixed
    /// severity; callers fill in the message and attach a span.
    pub fn diagnostic(&self, message: impl Into<String>) -> cnl_base::Diagnostic {
        cnl_base::Diagnostic::new(self.severity(), self.as_str(), message)
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn as_str_round_trips_to_screaming_snake_case() {
        assert_eq!(ErrorCode::EffMissingIo.as_str(), "EFF_MISSING_IO");
        assert_eq!(ErrorCode::PiiSinkUnsanitized.as_str(), "PII_SINK_UNSANITIZED");
    }

    #[test]
    fn duplicate_wait_is_a_warning_not_an_error() {
        assert_eq!(ErrorCode::AsyncDuplicateWait.severity(), Severity::Warning);
        assert_eq!(ErrorCode::AsyncStartNotWaited.severity(), Severity::Error);
    }
}
