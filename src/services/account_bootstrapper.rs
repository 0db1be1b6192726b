//! Account Bootstrapper (§4.6): once per cluster lifetime, creates the root user and the
//! application user/database. Detected via `admin_users_exist`, not a local flag alone,
//! so a process restart does not re-run it against an already-bootstrapped set.

use tracing::{info, warn};

use crate::config::Config;
use crate::domain::NodeEndpoint;
use crate::error::BootstrapError;
use crate::ports::MongoAdmin;

pub struct AccountBootstrapper;

impl AccountBootstrapper {
    /// Runs the bootstrap steps against `primary` if no admin users exist yet. A no-op
    /// (returns `Ok(false)`) once bootstrap has already happened. Failure is logged and
    /// left for the next cycle to retry (§7: `BootstrapError` is never fatal).
    pub async fn run(
        primary: NodeEndpoint,
        admin: &dyn MongoAdmin,
        config: &Config,
    ) -> Result<bool, BootstrapError> {
        if admin.admin_users_exist(primary).await? {
            return Ok(false);
        }

        admin
            .create_root_user(primary, &config.mongo_root_username, &config.mongo_root_password)
            .await?;
        info!(%primary, "root user created");

        admin
            .create_application_account(
                primary,
                &config.initdb_database,
                &config.initdb_user,
                &config.initdb_password,
            )
            .await?;
        info!(%primary, database = %config.initdb_database, "application account seeded");

        Ok(true)
    }

    /// Wraps `run`, logging and swallowing failures so a bootstrap hiccup never aborts the
    /// cycle; the next cycle detects the same pre-bootstrap state and retries.
    pub async fn run_best_effort(primary: NodeEndpoint, admin: &dyn MongoAdmin, config: &Config) -> bool {
        match Self::run(primary, admin, config).await {
            Ok(ran) => ran,
            Err(err) => {
                warn!(%primary, error = %err, "account bootstrap failed, will retry next cycle");
                false
            }
        }
    }
}
