use thiserror::Error;

/// Errors surfaced by the dashboard model.
///
/// None of these are fatal: selection errors leave the session untouched,
/// degenerate aggregates are only raised when a caller insists on a number,
/// and unknown enum values travel inside the derived snapshot as substitutions.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DashboardError {
    #[error("invalid selection for {field}: {value:?}")]
    InvalidSelection { field: &'static str, value: String },

    #[error("degenerate aggregate: {metric} has a zero denominator")]
    DegenerateAggregate { metric: &'static str },

    #[error("unknown {kind} value: {value:?}")]
    UnknownEnumValue { kind: &'static str, value: String },

    #[error("failed to load record sets: {0}")]
    RecordLoad(String),
}

impl DashboardError {
    pub fn invalid_selection(field: &'static str, value: impl Into<String>) -> Self {
        Self::InvalidSelection {
            field,
            value: value.into(),
        }
    }

    pub fn unknown_enum(kind: &'static str, value: impl Into<String>) -> Self {
        Self::UnknownEnumValue {
            kind,
            value: value.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, DashboardError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages_name_the_field() {
        let err = DashboardError::invalid_selection("view", "overview");
        assert_eq!(err.to_string(), "invalid selection for view: \"overview\"");

        let err = DashboardError::DegenerateAggregate { metric: "roi_rate" };
        assert!(err.to_string().contains("roi_rate"));
    }
}
