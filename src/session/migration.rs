//! Schema migration for hot exit snapshots.
//!
//! Migration strategy:
//! - Snapshots at the current version pass through unchanged
//! - Older snapshots are migrated one version at a time (v1 -> v2 -> ... -> current)
//! - A version with no registered step inside the supported range only has its
//!   number bumped, which covers schema-compatible point releases
//! - Future versions and version 0 are rejected

use super::types::{MIN_SUPPORTED_VERSION, SCHEMA_VERSION, SessionData};
use super::versions::{SessionDataV2, VersionedSession};
use crate::error::MigrationError;
use std::collections::BTreeMap;
use tracing::{debug, info};

/// One upgrade step from version `n` to `n + 1`.
pub type MigrationStep = fn(VersionedSession) -> Result<VersionedSession, MigrationError>;

/// Registry of step functions keyed by source version.
#[derive(Debug, Clone)]
pub struct Migrator {
    min_version: u32,
    target_version: u32,
    steps: BTreeMap<u32, MigrationStep>,
}

impl Migrator {
    /// Migrator for this build's schema.
    pub fn current() -> Self {
        Self::new(MIN_SUPPORTED_VERSION, SCHEMA_VERSION).with_step(1, migrate_v1_to_v2)
    }

    /// Empty registry for an arbitrary version range.
    pub fn new(min_version: u32, target_version: u32) -> Self {
        Self {
            min_version,
            target_version,
            steps: BTreeMap::new(),
        }
    }

    pub fn with_step(mut self, from_version: u32, step: MigrationStep) -> Self {
        self.steps.insert(from_version, step);
        self
    }

    pub fn target_version(&self) -> u32 {
        self.target_version
    }

    pub fn can_migrate(&self, version: u32) -> bool {
        self.min_version <= version && version <= self.target_version
    }

    pub fn needs_migration(&self, version: u32) -> bool {
        version < self.target_version
    }

    /// Walk the registry until the snapshot reaches the target version.
    pub fn migrate(&self, session: VersionedSession) -> Result<VersionedSession, MigrationError> {
        let version = session.version();
        if !self.can_migrate(version) {
            return Err(MigrationError::UnsupportedVersion {
                version,
                min: self.min_version,
                max: self.target_version,
            });
        }

        if version == self.target_version {
            return Ok(session);
        }

        info!(
            "Migrating session from v{} to v{}",
            version, self.target_version
        );

        let mut current = session;
        while current.version() < self.target_version {
            let from = current.version();
            current = match self.steps.get(&from) {
                Some(step) => step(current)?,
                None => {
                    debug!("No step registered for v{}, bumping version only", from);
                    current.with_version(from + 1)
                }
            };

            // Steps must move forward, otherwise the loop would never end.
            if current.version() <= from {
                return Err(MigrationError::MissingStep(from));
            }
        }

        if current.version() != self.target_version {
            return Err(MigrationError::MissingStep(current.version()));
        }

        Ok(current)
    }
}

impl Default for Migrator {
    fn default() -> Self {
        Self::current()
    }
}

/// Check if a snapshot version can be migrated to the current schema.
pub fn can_migrate(version: u32) -> bool {
    (MIN_SUPPORTED_VERSION..=SCHEMA_VERSION).contains(&version)
}

/// Check if a snapshot is older than the current schema.
pub fn needs_migration(session: &VersionedSession) -> bool {
    session.version() < SCHEMA_VERSION
}

/// Migrate a snapshot to the current schema and unwrap it.
pub fn migrate_session(session: VersionedSession) -> Result<SessionData, MigrationError> {
    Migrator::current().migrate(session)?.into_current()
}

/// v1 -> v2: documents gain undo/redo history, initialized empty.
fn migrate_v1_to_v2(session: VersionedSession) -> Result<VersionedSession, MigrationError> {
    match session {
        VersionedSession::V1(v1) => Ok(VersionedSession::V2(SessionDataV2::from(v1))),
        other => Err(MigrationError::ShapeMismatch {
            version: other.version(),
            shape: other.shape_name(),
        }),
    }
}
