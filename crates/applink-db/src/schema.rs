//! Schema definitions and migration runner for SurrealDB.
//!
//! All table definitions use SCHEMAFULL mode for data integrity.
//! UUIDs are stored as strings. Enums are stored as strings with
//! ASSERT constraints for validation.

use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tracing::info;

use crate::error::DbError;

// -----------------------------------------------------------------------
// Migration tracking
// -----------------------------------------------------------------------

const MIGRATION_TABLE_DDL: &str = "\
DEFINE TABLE IF NOT EXISTS _migration SCHEMAFULL;
DEFINE FIELD IF NOT EXISTS version ON TABLE _migration TYPE int;
DEFINE FIELD IF NOT EXISTS name ON TABLE _migration TYPE string;
DEFINE FIELD IF NOT EXISTS applied_at ON TABLE _migration TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX IF NOT EXISTS idx_migration_version ON TABLE _migration \
    COLUMNS version UNIQUE;
";

#[derive(Debug, SurrealValue)]
struct MigrationRecord {
    version: u32,
    #[allow(dead_code)]
    name: String,
}

struct Migration {
    version: u32,
    name: &'static str,
    sql: &'static str,
}

static MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    name: "initial_schema",
    sql: SCHEMA_V1,
}];

// -----------------------------------------------------------------------
// Schema v1 — initial table definitions
// -----------------------------------------------------------------------

const SCHEMA_V1: &str = "\
-- =======================================================================
-- Accounts (one per tenant user that authorized the application)
-- =======================================================================
DEFINE TABLE account SCHEMAFULL;
DEFINE FIELD member_id ON TABLE account TYPE string;
DEFINE FIELD tenant_user_id ON TABLE account TYPE int;
DEFINE FIELD is_tenant_user_admin ON TABLE account TYPE bool \
    DEFAULT false;
DEFINE FIELD domain_url ON TABLE account TYPE string;
DEFINE FIELD status ON TABLE account TYPE string \
    ASSERT $value IN ['New', 'Active', 'Blocked', 'Deleted'];
DEFINE FIELD access_token ON TABLE account TYPE string;
DEFINE FIELD refresh_token ON TABLE account TYPE string;
DEFINE FIELD token_expires_at ON TABLE account TYPE datetime;
DEFINE FIELD application_token ON TABLE account TYPE option<string>;
DEFINE FIELD application_version ON TABLE account TYPE int;
DEFINE FIELD application_scope ON TABLE account TYPE array DEFAULT [];
DEFINE FIELD application_scope.* ON TABLE account TYPE string;
DEFINE FIELD comment ON TABLE account TYPE option<string>;
DEFINE FIELD created_at ON TABLE account TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE account TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_account_member ON TABLE account COLUMNS member_id;
DEFINE INDEX idx_account_member_user ON TABLE account \
    COLUMNS member_id, tenant_user_id;
DEFINE INDEX idx_account_domain ON TABLE account COLUMNS domain_url;
DEFINE INDEX idx_account_app_token ON TABLE account \
    COLUMNS application_token;

-- =======================================================================
-- Installations (one per account, tenant-wide app placement)
-- =======================================================================
DEFINE TABLE installation SCHEMAFULL;
DEFINE FIELD account_id ON TABLE installation TYPE string;
DEFINE FIELD status ON TABLE installation TYPE string \
    ASSERT $value IN ['New', 'Active', 'Deleted'];
DEFINE FIELD application_status ON TABLE installation TYPE string \
    ASSERT $value IN ['Free', 'Demo', 'Trial', 'Paid', 'Local', \
    'Subscription'];
DEFINE FIELD license_family ON TABLE installation TYPE string \
    ASSERT $value IN ['Free', 'Basic', 'Standard', 'Professional', \
    'Enterprise'];
DEFINE FIELD users_count ON TABLE installation TYPE option<int>;
DEFINE FIELD contact_person_id ON TABLE installation \
    TYPE option<string>;
DEFINE FIELD partner_contact_person_id ON TABLE installation \
    TYPE option<string>;
DEFINE FIELD partner_id ON TABLE installation TYPE option<string>;
DEFINE FIELD external_id ON TABLE installation TYPE option<string>;
DEFINE FIELD application_token ON TABLE installation \
    TYPE option<string>;
DEFINE FIELD comment ON TABLE installation TYPE option<string>;
DEFINE FIELD created_at ON TABLE installation TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE installation TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_installation_account ON TABLE installation \
    COLUMNS account_id;
DEFINE INDEX idx_installation_external ON TABLE installation \
    COLUMNS external_id;
DEFINE INDEX idx_installation_app_token ON TABLE installation \
    COLUMNS application_token;
";

// -----------------------------------------------------------------------
// Public API
// -----------------------------------------------------------------------

/// Run all pending migrations against the given SurrealDB client.
///
/// Creates a `_migration` tracking table on first run, then applies
/// each migration whose version exceeds the current maximum.
/// All DEFINE statements are idempotent so re-running is safe.
pub async fn run_migrations<C: Connection>(db: &Surreal<C>) -> Result<(), DbError> {
    // Ensure migration tracking table exists (idempotent).
    db.query(MIGRATION_TABLE_DDL)
        .await?
        .check()
        .map_err(|e| DbError::Migration(e.to_string()))?;

    // Determine current schema version.
    let mut result = db
        .query("SELECT * FROM _migration ORDER BY version DESC LIMIT 1")
        .await?;
    let records: Vec<MigrationRecord> = result.take(0)?;
    let current_version = records.first().map(|m| m.version).unwrap_or(0);

    for migration in MIGRATIONS {
        if migration.version > current_version {
            info!(
                version = migration.version,
                name = migration.name,
                "Applying migration"
            );
            db.query(migration.sql).await?.check().map_err(|e| {
                DbError::Migration(format!(
                    "Migration v{} '{}' failed: {}",
                    migration.version, migration.name, e,
                ))
            })?;

            // Record the applied migration.
            db.query(
                "CREATE _migration SET version = $version, \
                 name = $name",
            )
            .bind(("version", migration.version))
            .bind(("name", migration.name))
            .await?
            .check()
            .map_err(|e| {
                DbError::Migration(format!(
                    "Failed to record migration v{}: {}",
                    migration.version, e,
                ))
            })?;

            info!(
                version = migration.version,
                "Migration applied successfully"
            );
        }
    }

    Ok(())
}

/// Returns the raw schema DDL for version 1.
///
/// Exposed for testing with in-memory SurrealDB instances that
/// bypass the migration runner.
pub fn schema_v1() -> &'static str {
    SCHEMA_V1
}
