use std::fmt;

/// Store operation a failure happened in; only used to build messages.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Operation {
    Get,
    Set,
    Update,
    List,
    Delete,
    Configure,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let verb = match self {
            Operation::Get => "get object",
            Operation::Set => "set object",
            Operation::Update => "update object",
            Operation::List => "list keys",
            Operation::Delete => "delete object",
            Operation::Configure => "configure",
        };
        f.write_str(verb)
    }
}

/// Why a terminal failure happened.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TerminalKind {
    /// Lookup came back empty or the server answered 404.
    NotFound,
    /// Response body was not the JSON we expected.
    Parse,
    /// Non-2xx response.
    Http(u16),
    /// Extra attributes not allowed for the resource type.
    InvalidAttributes,
    /// Key cannot address a single object (no id).
    InvalidKey,
    /// Backend was built with unusable parameters.
    Config,
    Other,
}

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum StoreBackendError {
    #[error("Unable to {op} in cloud store backend: {message}")]
    Terminal {
        op: Operation,
        kind: TerminalKind,
        message: String,
    },

    #[error("Unable to {op} in cloud store backend: {message}")]
    Transient { op: Operation, message: String },
}

impl StoreBackendError {
    pub fn terminal(op: Operation, kind: TerminalKind, message: impl Into<String>) -> Self {
        Self::Terminal {
            op,
            kind,
            message: message.into(),
        }
    }

    pub fn timeout(op: Operation) -> Self {
        Self::Transient {
            op,
            message: "This is likely a transient error. Please try again.".to_string(),
        }
    }

    pub fn not_found(op: Operation) -> Self {
        Self::terminal(op, TerminalKind::NotFound, "Object does not exist.")
    }

    /// Identifies failures a caller may retry.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient { .. })
    }

    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::Terminal {
                kind: TerminalKind::NotFound,
                ..
            }
        )
    }

    pub fn kind(&self) -> Option<&TerminalKind> {
        match self {
            Self::Terminal { kind, .. } => Some(kind),
            Self::Transient { .. } => None,
        }
    }
}

pub type Result<T, E = StoreBackendError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_operation() {
        let err = StoreBackendError::not_found(Operation::Get);
        assert_eq!(
            err.to_string(),
            "Unable to get object in cloud store backend: Object does not exist."
        );
        assert!(err.is_not_found());
        assert!(!err.is_transient());
    }

    #[test]
    fn timeouts_are_transient() {
        let err = StoreBackendError::timeout(Operation::Delete);
        assert!(err.is_transient());
        assert!(err.kind().is_none());
        assert!(err.to_string().contains("delete object"));
    }
}
