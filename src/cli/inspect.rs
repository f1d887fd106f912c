//! Human-readable view of a persisted snapshot

use crate::session::{Migrator, VersionedSession};
use std::fmt;

/// What `inspect` reports about a snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSummary {
    pub version: i64,
    pub shape: &'static str,
    pub restorable: bool,
    pub app_version: Option<String>,
    pub age_seconds: Option<i64>,
    pub windows: Option<usize>,
    pub tabs: Option<usize>,
    pub dirty_tabs: Option<usize>,
}

impl SessionSummary {
    pub fn from_session(session: &VersionedSession, now: i64) -> Self {
        let (app_version, windows, tabs, dirty_tabs) = match session {
            VersionedSession::V1(s) => (
                Some(s.app_version.clone()),
                Some(s.windows.len()),
                Some(s.windows.iter().map(|w| w.tabs.len()).sum()),
                Some(
                    s.windows
                        .iter()
                        .flat_map(|w| &w.tabs)
                        .filter(|t| t.document.is_dirty)
                        .count(),
                ),
            ),
            VersionedSession::V2(s) => (
                Some(s.app_version.clone()),
                Some(s.windows.len()),
                Some(s.tab_count()),
                Some(s.dirty_tab_count()),
            ),
            VersionedSession::Unrecognized { .. } => (None, None, None, None),
        };

        Self {
            version: session.declared_version(),
            shape: session.shape_name(),
            restorable: Migrator::current().can_migrate(session.version()),
            app_version,
            age_seconds: session.timestamp().map(|ts| now.saturating_sub(ts)),
            windows,
            tabs,
            dirty_tabs,
        }
    }
}

fn or_unknown<T: fmt::Display>(value: &Option<T>) -> String {
    value
        .as_ref()
        .map(|v| v.to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

impl fmt::Display for SessionSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Session snapshot")?;
        writeln!(
            f,
            "  Version:     {} ({}{})",
            self.version,
            self.shape,
            if self.restorable { "" } else { ", not restorable" }
        )?;
        writeln!(f, "  App version: {}", or_unknown(&self.app_version))?;
        match self.age_seconds {
            Some(age) => writeln!(f, "  Age:         {}", format_age(age))?,
            None => writeln!(f, "  Age:         unknown")?,
        }
        writeln!(f, "  Windows:     {}", or_unknown(&self.windows))?;
        writeln!(f, "  Tabs:        {}", or_unknown(&self.tabs))?;
        write!(f, "  Dirty tabs:  {}", or_unknown(&self.dirty_tabs))
    }
}

fn format_age(seconds: i64) -> String {
    let seconds = seconds.max(0);
    match seconds {
        s if s < 60 => format!("{}s", s),
        s if s < 3600 => format!("{}m", s / 60),
        s if s < 86_400 => format!("{}h {}m", s / 3600, (s % 3600) / 60),
        s => format!("{}d {}h", s / 86_400, (s % 86_400) / 3600),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::SessionData;

    #[test]
    fn test_summary_of_current_session() {
        let mut session = SessionData::new("1.0.0");
        session.timestamp = 1_000;
        let summary = SessionSummary::from_session(&session.into(), 1_090);

        assert_eq!(summary.shape, "v2");
        assert!(summary.restorable);
        assert_eq!(summary.age_seconds, Some(90));
        assert_eq!(summary.windows, Some(0));
        assert!(summary.to_string().contains("1m"));
    }

    #[test]
    fn test_summary_of_unrecognized_session() {
        let session =
            VersionedSession::from_value(serde_json::json!({ "version": 42 })).unwrap();
        let summary = SessionSummary::from_session(&session, 0);

        assert!(!summary.restorable);
        assert_eq!(summary.tabs, None);
        assert!(summary.to_string().contains("not restorable"));
    }

    #[test]
    fn test_summary_with_minimum_timestamp() {
        let mut session = SessionData::new("1.0.0");
        session.timestamp = i64::MIN;
        let summary = SessionSummary::from_session(&session.into(), 1_700_000_000);

        assert_eq!(summary.age_seconds, Some(i64::MAX));
        assert!(summary.to_string().contains(&format_age(i64::MAX)));
    }

    #[test]
    fn test_format_age() {
        assert_eq!(format_age(5), "5s");
        assert_eq!(format_age(3 * 86_400 + 7200), "3d 2h");
    }
}
