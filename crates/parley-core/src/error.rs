use std::fmt;

/// Machine-readable error codes shared by the library and the CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    DatabaseMissing,
    ConfigParseError,
    IndexParseError,
    MalformedDatabase,
    UnresolvedReference,
    NodeNotFound,
    ChoiceNotOffered,
    CyclicGraph,
    OverlayUnavailable,
    OverlayAuthFailed,
    InternalUnexpected,
}

impl ErrorCode {
    /// Stable code identifier (`E####`) for machine parsing.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::DatabaseMissing => "E1001",
            Self::ConfigParseError => "E1002",
            Self::IndexParseError => "E1003",
            Self::MalformedDatabase => "E2001",
            Self::UnresolvedReference => "E2002",
            Self::NodeNotFound => "E3001",
            Self::ChoiceNotOffered => "E3002",
            Self::CyclicGraph => "E3003",
            Self::OverlayUnavailable => "E4001",
            Self::OverlayAuthFailed => "E4002",
            Self::InternalUnexpected => "E9001",
        }
    }

    /// Short human-facing summary for logs and terminal output.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::DatabaseMissing => "Dialogue database not found",
            Self::ConfigParseError => "Config file parse error",
            Self::IndexParseError => "Translation index parse error",
            Self::MalformedDatabase => "Malformed dialogue database",
            Self::UnresolvedReference => "Unresolved node or string reference",
            Self::NodeNotFound => "Node not found",
            Self::ChoiceNotOffered => "Node is not one of the offered choices",
            Self::CyclicGraph => "Cycle in dialogue graph",
            Self::OverlayUnavailable => "Translation service unavailable",
            Self::OverlayAuthFailed => "Translation service rejected the token",
            Self::InternalUnexpected => "Internal unexpected error",
        }
    }

    /// Optional remediation hint that can be surfaced to operators.
    #[must_use]
    pub const fn hint(self) -> Option<&'static str> {
        match self {
            Self::DatabaseMissing => {
                Some("Pass --db <path> or set data.database in .parley/config.toml.")
            }
            Self::ConfigParseError => Some("Fix syntax in .parley/config.toml and retry."),
            Self::IndexParseError => {
                Some("Each CSV line must be `key,unit_id,position` with numeric fields.")
            }
            Self::MalformedDatabase => Some("Re-export the database from the game files."),
            Self::UnresolvedReference => {
                Some("The database and string table are out of sync; re-export both.")
            }
            Self::NodeNotFound => Some("Use the full GUID or its first 8 hex characters."),
            Self::ChoiceNotOffered => Some("Pick one of the numbered choices shown last."),
            Self::CyclicGraph => Some("Run `parley check` to list the nodes in the cycle."),
            Self::OverlayUnavailable => None,
            Self::OverlayAuthFailed => {
                Some("Set weblate.token via `parley config set` or PARLEY_WEBLATE_TOKEN.")
            }
            Self::InternalUnexpected => Some("Retry once. If persistent, report a bug with logs."),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::ErrorCode;
    use std::collections::HashSet;

    const ALL: [ErrorCode; 11] = [
        ErrorCode::DatabaseMissing,
        ErrorCode::ConfigParseError,
        ErrorCode::IndexParseError,
        ErrorCode::MalformedDatabase,
        ErrorCode::UnresolvedReference,
        ErrorCode::NodeNotFound,
        ErrorCode::ChoiceNotOffered,
        ErrorCode::CyclicGraph,
        ErrorCode::OverlayUnavailable,
        ErrorCode::OverlayAuthFailed,
        ErrorCode::InternalUnexpected,
    ];

    #[test]
    fn all_codes_are_unique() {
        let mut seen = HashSet::new();
        for code in ALL {
            assert!(seen.insert(code.code()), "duplicate code {}", code.code());
        }
    }

    #[test]
    fn code_format_is_machine_friendly() {
        for code in ALL {
            let raw = code.code();
            assert_eq!(raw.len(), 5);
            assert!(raw.starts_with('E'));
            assert!(raw.chars().skip(1).all(|c| c.is_ascii_digit()));
        }
    }

    #[test]
    fn display_matches_code() {
        assert_eq!(ErrorCode::CyclicGraph.to_string(), "E3003");
    }
}
