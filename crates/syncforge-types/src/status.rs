use serde::{Deserialize, Serialize};

/// The canonical status lingua franca the mapper translates every
/// system-native status token through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CanonicalStatus {
    Pending,
    InProgress,
    Completed,
    Failed,
    Cancelled,
}

impl CanonicalStatus {
    pub const ALL: [CanonicalStatus; 5] = [
        CanonicalStatus::Pending,
        CanonicalStatus::InProgress,
        CanonicalStatus::Completed,
        CanonicalStatus::Failed,
        CanonicalStatus::Cancelled,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            CanonicalStatus::Pending => "pending",
            CanonicalStatus::InProgress => "in_progress",
            CanonicalStatus::Completed => "completed",
            CanonicalStatus::Failed => "failed",
            CanonicalStatus::Cancelled => "cancelled",
        }
    }

    pub fn from_str_opt(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.as_str() == s)
    }

    /// The canonical transition graph from spec.md §4.3(2): the set of
    /// statuses reachable in one hop from `self`.
    pub fn allowed_transitions(self) -> &'static [CanonicalStatus] {
        use CanonicalStatus::{Cancelled, Completed, Failed, InProgress, Pending};
        match self {
            Pending => &[InProgress, Cancelled],
            InProgress => &[Completed, Failed, Pending, Cancelled],
            Completed => &[Pending],
            Failed => &[Pending, InProgress],
            Cancelled => &[Pending],
        }
    }

    /// Whether `self -> next` is a legal canonical transition.
    pub fn can_transition_to(self, next: CanonicalStatus) -> bool {
        self.allowed_transitions().contains(&next)
    }
}

impl std::fmt::Display for CanonicalStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(CanonicalStatus::Pending, CanonicalStatus::InProgress, true)]
    #[test_case(CanonicalStatus::Pending, CanonicalStatus::Completed, false)]
    #[test_case(CanonicalStatus::Completed, CanonicalStatus::Pending, true)]
    #[test_case(CanonicalStatus::Cancelled, CanonicalStatus::Failed, false)]
    #[test_case(CanonicalStatus::Failed, CanonicalStatus::InProgress, true)]
    fn transition_matrix(from: CanonicalStatus, to: CanonicalStatus, allowed: bool) {
        assert_eq!(from.can_transition_to(to), allowed);
    }

    #[test]
    fn round_trips_through_str() {
        for s in CanonicalStatus::ALL {
            assert_eq!(CanonicalStatus::from_str_opt(s.as_str()), Some(s));
        }
    }
}
