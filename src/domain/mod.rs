//! Backend-agnostic types shared by the synchronizer and its transports.

use std::fmt;

/// A single equality filter restricting which rows are counted and watched.
///
/// Rendered as a PostgREST query parameter (`column=eq.value`) for count
/// queries and as a realtime filter string for channel topics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filter {
    column: String,
    value: String,
}

impl Filter {
    /// Create an equality filter on `column`.
    pub fn eq(column: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            value: value.into(),
        }
    }

    pub fn column(&self) -> &str {
        &self.column
    }

    /// The operator-prefixed value as PostgREST expects it (`eq.value`).
    pub fn operator_value(&self) -> String {
        format!("eq.{}", self.value)
    }

    /// The `column=eq.value` form used in realtime channel topics.
    pub fn realtime_expr(&self) -> String {
        format!("{}=eq.{}", self.column, self.value)
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.realtime_expr())
    }
}

/// Discriminator for a change notification.
///
/// The synchronizer never applies deltas, so the kind only matters for
/// logging; anything unrecognized still triggers a refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
    Other,
}

impl ChangeKind {
    /// Parse a realtime event name (`INSERT`, `UPDATE`, `DELETE`).
    pub fn from_event_name(name: &str) -> Self {
        match name {
            "INSERT" => ChangeKind::Insert,
            "UPDATE" => ChangeKind::Update,
            "DELETE" => ChangeKind::Delete,
            _ => ChangeKind::Other,
        }
    }
}

/// A change notification delivered on a watched table's channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    pub kind: ChangeKind,
}

impl ChangeEvent {
    pub fn new(kind: ChangeKind) -> Self {
        Self { kind }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_renders_postgrest_operator() {
        let filter = Filter::eq("therapist_id", "42");
        assert_eq!(filter.column(), "therapist_id");
        assert_eq!(filter.operator_value(), "eq.42");
    }

    #[test]
    fn test_filter_renders_realtime_expr() {
        let filter = Filter::eq("user_id", "abc");
        assert_eq!(filter.realtime_expr(), "user_id=eq.abc");
        assert_eq!(filter.to_string(), "user_id=eq.abc");
    }

    #[test]
    fn test_change_kind_from_event_name() {
        assert_eq!(ChangeKind::from_event_name("INSERT"), ChangeKind::Insert);
        assert_eq!(ChangeKind::from_event_name("UPDATE"), ChangeKind::Update);
        assert_eq!(ChangeKind::from_event_name("DELETE"), ChangeKind::Delete);
        assert_eq!(ChangeKind::from_event_name("TRUNCATE"), ChangeKind::Other);
        assert_eq!(ChangeKind::from_event_name(""), ChangeKind::Other);
    }
}
