use thiserror::Error;

/// Errors raised while turning a configuration delta into remote mutations.
///
/// Every variant except [`ReconcileError::NotDeletable`] is scoped to the
/// attribute group that produced it; the driver records it and moves on to
/// the next group.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ReconcileError {
    #[error("{attribute} can only grow: planned {plan} is below current {state}")]
    GrowViolation {
        attribute: String,
        state: u64,
        plan: u64,
    },

    #[error("{attribute} must grow by at least {minimum}, got {delta}")]
    MinimumStepViolation {
        attribute: String,
        delta: u64,
        minimum: u64,
    },

    #[error("cannot shrink cluster: role '{role}' would go from {old} to {new} instances")]
    ShrinkViolation { role: String, old: u32, new: u32 },

    #[error("scaling adds {total} instances in one pass, at most {cap} allowed")]
    ScaleCapExceeded { total: u64, cap: u32 },

    #[error("{attribute} has no prior baseline and cannot be added after creation")]
    UnexpectedEntry { attribute: String },

    #[error("layout '{descriptor}' does not declare required role '{role}'")]
    MissingRole { role: String, descriptor: String },

    #[error("invalid version '{value}': {reason}")]
    VersionParse { value: String, reason: String },

    #[error("invalid layout '{descriptor}': {reason}")]
    LayoutParse { descriptor: String, reason: String },

    #[error("{operation} failed: {message}")]
    Remote { operation: String, message: String },

    #[error("order {order_id} cannot be deleted right now, resolve it manually at {url}")]
    NotDeletable { order_id: String, url: String },

    #[error("changing {attribute} requires replacing the resource")]
    ReplaceRequired { attribute: String },
}

impl ReconcileError {
    pub fn grow_violation(attribute: impl Into<String>, state: u64, plan: u64) -> Self {
        Self::GrowViolation {
            attribute: attribute.into(),
            state,
            plan,
        }
    }

    pub fn minimum_step(attribute: impl Into<String>, delta: u64, minimum: u64) -> Self {
        Self::MinimumStepViolation {
            attribute: attribute.into(),
            delta,
            minimum,
        }
    }

    pub fn shrink(role: impl Into<String>, old: u32, new: u32) -> Self {
        Self::ShrinkViolation {
            role: role.into(),
            old,
            new,
        }
    }

    pub fn unexpected_entry(attribute: impl Into<String>) -> Self {
        Self::UnexpectedEntry {
            attribute: attribute.into(),
        }
    }

    pub fn version_parse(value: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::VersionParse {
            value: value.into(),
            reason: reason.into(),
        }
    }

    pub fn layout_parse(descriptor: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::LayoutParse {
            descriptor: descriptor.into(),
            reason: reason.into(),
        }
    }

    /// Wraps a collaborator failure; `message` is kept verbatim.
    pub fn remote(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Remote {
            operation: operation.into(),
            message: message.into(),
        }
    }

    pub fn not_deletable(order_id: impl Into<String>, url: impl Into<String>) -> Self {
        Self::NotDeletable {
            order_id: order_id.into(),
            url: url.into(),
        }
    }

    pub fn replace_required(attribute: impl Into<String>) -> Self {
        Self::ReplaceRequired {
            attribute: attribute.into(),
        }
    }

    /// Whether this error ends the whole pass instead of a single group.
    pub fn is_pass_fatal(&self) -> bool {
        matches!(self, Self::NotDeletable { .. })
    }

    /// Get error category for logging/monitoring
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::GrowViolation { .. }
            | Self::MinimumStepViolation { .. }
            | Self::ShrinkViolation { .. }
            | Self::ScaleCapExceeded { .. }
            | Self::UnexpectedEntry { .. }
            | Self::MissingRole { .. }
            | Self::ReplaceRequired { .. } => ErrorCategory::Validation,
            Self::VersionParse { .. } | Self::LayoutParse { .. } => ErrorCategory::Parse,
            Self::Remote { .. } => ErrorCategory::Remote,
            Self::NotDeletable { .. } => ErrorCategory::NotDeletable,
        }
    }
}

/// Error categories for monitoring and classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Local rule violated, no remote call made.
    Validation,
    /// Malformed version or layout string.
    Parse,
    /// Transport or remote-side failure.
    Remote,
    /// Remote object refuses deletion.
    NotDeletable,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation => write!(f, "validation"),
            Self::Parse => write!(f, "parse"),
            Self::Remote => write!(f, "remote"),
            Self::NotDeletable => write!(f, "not_deletable"),
        }
    }
}

/// Convenience result type for reconciliation steps
pub type Result<T> = std::result::Result<T, ReconcileError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grow_violation_message() {
        let err = ReconcileError::grow_violation("mount_points[\"/data\"]", 50, 40);
        assert_eq!(
            err.to_string(),
            "mount_points[\"/data\"] can only grow: planned 40 is below current 50"
        );
        assert_eq!(err.category(), ErrorCategory::Validation);
        assert!(!err.is_pass_fatal());
    }

    #[test]
    fn test_remote_message_is_verbatim() {
        let err = ReconcileError::remote("change_flavor", "409: order is locked by another action");
        assert_eq!(
            err.to_string(),
            "change_flavor failed: 409: order is locked by another action"
        );
        assert_eq!(err.category(), ErrorCategory::Remote);
    }

    #[test]
    fn test_not_deletable_is_pass_fatal() {
        let err = ReconcileError::not_deletable("ord-1", "https://portal.example/orders/ord-1");
        assert!(err.is_pass_fatal());
        assert_eq!(err.category(), ErrorCategory::NotDeletable);
        assert!(err.to_string().contains("https://portal.example/orders/ord-1"));
    }

    #[test]
    fn test_parse_categories() {
        assert_eq!(
            ReconcileError::version_parse("x.y", "bad").category(),
            ErrorCategory::Parse
        );
        assert_eq!(
            ReconcileError::layout_parse("worker-", "bad").category(),
            ErrorCategory::Parse
        );
    }

    #[test]
    fn test_error_categories_display() {
        assert_eq!(ErrorCategory::Validation.to_string(), "validation");
        assert_eq!(ErrorCategory::Parse.to_string(), "parse");
        assert_eq!(ErrorCategory::Remote.to_string(), "remote");
        assert_eq!(ErrorCategory::NotDeletable.to_string(), "not_deletable");
    }
}
