//! MongoDB admin adapter for the `MongoAdmin` port (§4.2/§4.5/§4.6/§6): issues `hello`,
//! `replSetGetStatus`/`replSetGetConfig`, `replSetInitiate`, `replSetReconfig`, and the
//! bootstrap account commands via `run_command`, the way the replica-set agent in this
//! codebase's reference material talks to `admin`/`test`.

use bson::{doc, Bson, Document};
use mongodb::options::ClientOptions;
use mongodb::Client;
use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;

use crate::domain::{NodeEndpoint, ReplicaSetConfig};
use crate::error::{AdminError, BootstrapError, ProbeError};
use crate::ports::{HelloResponse, MongoAdmin, ProbeOutcome};

pub struct MongoAdminClient {
    connect_timeout: Duration,
}

impl MongoAdminClient {
    pub fn new(connect_timeout: Duration) -> Self {
        Self { connect_timeout }
    }

    async fn client_for(&self, endpoint: NodeEndpoint) -> Result<Client, String> {
        let uri = format!("mongodb://{}/?directConnection=true", endpoint.host());
        let mut options = ClientOptions::parse(&uri).await.map_err(|e| e.to_string())?;
        options.connect_timeout = Some(self.connect_timeout);
        options.server_selection_timeout = Some(self.connect_timeout);
        Client::with_options(options).map_err(|e| e.to_string())
    }

    fn config_to_document(config: &ReplicaSetConfig) -> Document {
        let members: Vec<Bson> = config
            .members
            .iter()
            .map(|m| {
                let mut member = doc! { "_id": m.id as i32, "host": m.host.clone() };
                if let Some(priority) = m.priority {
                    member.insert("priority", priority);
                }
                if let Some(votes) = m.votes {
                    member.insert("votes", votes as i32);
                }
                Bson::Document(member)
            })
            .collect();

        doc! {
            "_id": config.name.clone(),
            "version": config.version as i64,
            "members": members,
        }
    }
}

fn admin_error_from(message: &str) -> AdminError {
    let lower = message.to_lowercase();
    if lower.contains("not master") || lower.contains("notprimary") || lower.contains("not primary") {
        AdminError::NotPrimary(message.to_string())
    } else if lower.contains("election") {
        AdminError::ElectionInProgress(message.to_string())
    } else if lower.contains("auth") || lower.contains("unauthorized") {
        AdminError::AuthenticationFailed(message.to_string())
    } else if lower.contains("timed out") || lower.contains("timeout") || lower.contains("connection") {
        AdminError::Transient(message.to_string())
    } else {
        AdminError::Rejected(message.to_string())
    }
}

#[async_trait]
impl MongoAdmin for MongoAdminClient {
    async fn hello(&self, endpoint: NodeEndpoint) -> Result<HelloResponse, ProbeError> {
        let client = self
            .client_for(endpoint)
            .await
            .map_err(|reason| ProbeError::ConnectionFailed { endpoint, reason })?;

        let response = client
            .database("admin")
            .run_command(doc! { "hello": 1 })
            .await
            .map_err(|e| ProbeError::ConnectionFailed {
                endpoint,
                reason: e.to_string(),
            })?;

        let is_writable_primary = response
            .get_bool("isWritablePrimary")
            .or_else(|_| response.get_bool("ismaster"))
            .unwrap_or(false);

        Ok(HelloResponse { is_writable_primary })
    }

    async fn probe_replica_set(&self, endpoint: NodeEndpoint) -> Result<ProbeOutcome, ProbeError> {
        let client = self
            .client_for(endpoint)
            .await
            .map_err(|reason| ProbeError::ConnectionFailed { endpoint, reason })?;

        let status = client
            .database("admin")
            .run_command(doc! { "replSetGetStatus": 1 })
            .await;

        let status = match status {
            Ok(doc) => doc,
            Err(e) => {
                let message = e.to_string();
                let lower = message.to_lowercase();
                if lower.contains("notyetinitialized") || lower.contains("no replset config") {
                    return Ok(ProbeOutcome::Uninitialized);
                }
                if lower.contains("starting up") || lower.contains("node is not in the set") {
                    return Ok(ProbeOutcome::Transient(message));
                }
                return Err(ProbeError::ConnectionFailed { endpoint, reason: message });
            }
        };

        let is_primary = status
            .get_str("myState")
            .map(|s| s == "1")
            .unwrap_or(false);

        let config = client
            .database("admin")
            .run_command(doc! { "replSetGetConfig": 1 })
            .await
            .map_err(|e| ProbeError::ConnectionFailed {
                endpoint,
                reason: e.to_string(),
            })?;

        let rs_config = config
            .get_document("config")
            .map_err(|e| ProbeError::ConnectionFailed {
                endpoint,
                reason: e.to_string(),
            })?;

        let rs_name = rs_config.get_str("_id").unwrap_or_default().to_string();
        let config_version = rs_config.get_i64("version").unwrap_or(1) as u64;
        let configured_members: BTreeMap<String, u32> = rs_config
            .get_array("members")
            .map(|members| {
                members
                    .iter()
                    .filter_map(|m| m.as_document())
                    .filter_map(|m| Some((m.get_str("host").ok()?.to_string(), m.get_i32("_id").ok()? as u32)))
                    .collect()
            })
            .unwrap_or_default();

        Ok(ProbeOutcome::Member {
            rs_name,
            config_version,
            configured_members,
            is_primary,
        })
    }

    async fn repl_set_initiate(&self, endpoint: NodeEndpoint, config: &ReplicaSetConfig) -> Result<(), AdminError> {
        let client = self
            .client_for(endpoint)
            .await
            .map_err(|e| AdminError::Transient(e))?;

        client
            .database("admin")
            .run_command(doc! { "replSetInitiate": Self::config_to_document(config) })
            .await
            .map(|_| ())
            .map_err(|e| admin_error_from(&e.to_string()))
    }

    async fn repl_set_reconfig(&self, endpoint: NodeEndpoint, config: &ReplicaSetConfig, force: bool) -> Result<(), AdminError> {
        let client = self
            .client_for(endpoint)
            .await
            .map_err(|e| AdminError::Transient(e))?;

        client
            .database("admin")
            .run_command(doc! {
                "replSetReconfig": Self::config_to_document(config),
                "force": force,
            })
            .await
            .map(|_| ())
            .map_err(|e| admin_error_from(&e.to_string()))
    }

    async fn admin_users_exist(&self, endpoint: NodeEndpoint) -> Result<bool, BootstrapError> {
        let client = self
            .client_for(endpoint)
            .await
            .map_err(BootstrapError::ConnectionFailed)?;

        let result = client
            .database("admin")
            .run_command(doc! { "usersInfo": 1 })
            .await
            .map_err(|e| BootstrapError::ConnectionFailed(e.to_string()))?;

        Ok(result
            .get_array("users")
            .map(|users| !users.is_empty())
            .unwrap_or(false))
    }

    async fn create_root_user(&self, endpoint: NodeEndpoint, username: &str, password: &str) -> Result<(), BootstrapError> {
        let client = self
            .client_for(endpoint)
            .await
            .map_err(BootstrapError::ConnectionFailed)?;

        client
            .database("admin")
            .run_command(doc! {
                "createUser": username,
                "pwd": password,
                "roles": ["root"],
            })
            .await
            .map(|_| ())
            .map_err(|e| BootstrapError::RootUserCreationFailed(e.to_string()))
    }

    async fn create_application_account(
        &self,
        endpoint: NodeEndpoint,
        database: &str,
        username: &str,
        password: &str,
    ) -> Result<(), BootstrapError> {
        let client = self
            .client_for(endpoint)
            .await
            .map_err(BootstrapError::ConnectionFailed)?;

        let app_db = client.database(database);

        app_db
            .run_command(doc! {
                "createCollection": "_init_sentinel",
            })
            .await
            .ok();

        app_db
            .run_command(doc! {
                "createUser": username,
                "pwd": password,
                "roles": [{ "role": "readWrite", "db": database }],
            })
            .await
            .map(|_| ())
            .map_err(|e| BootstrapError::ApplicationSeedFailed(e.to_string()))
    }
}
