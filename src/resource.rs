// src/resource.rs

//! Addressable compute targets and how to open a session on one.

use serde::Serialize;
use uuid::Uuid;

use crate::catalog::Catalog;
use crate::config::ResourceConfig;
use crate::errors::Result;
use crate::session::Session;

/// Name of the implicit resource for the invoking host.
pub const LOCAL_RESOURCE: &str = "local";

/// A configured compute target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Resource {
    pub id: String,
    pub name: String,
    /// Transport type, e.g. `shell` or `ssh`.
    #[serde(rename = "type")]
    pub kind: String,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub user: Option<String>,
    pub key_filename: Option<String>,
}

impl Resource {
    pub fn from_config(name: &str, cfg: &ResourceConfig) -> Self {
        Self {
            id: cfg.id.clone().unwrap_or_else(|| derived_id(name)),
            name: name.to_string(),
            kind: cfg.kind.clone(),
            host: cfg.host.clone(),
            port: cfg.port,
            user: cfg.user.clone(),
            key_filename: cfg.key_filename.clone(),
        }
    }

    /// The invoking host, reached through a local shell.
    pub fn local() -> Self {
        Self {
            id: derived_id(LOCAL_RESOURCE),
            name: LOCAL_RESOURCE.to_string(),
            kind: "shell".to_string(),
            host: None,
            port: None,
            user: None,
            key_filename: None,
        }
    }

    /// Open a fresh (not yet opened) session using the transport registered
    /// for this resource's type.
    pub fn get_session(&self, catalog: &Catalog) -> Result<Session> {
        let factory = catalog.transport(&self.kind)?;
        Ok(Session::new(factory(self)?))
    }
}

/// Stable id for a resource configured without one.
fn derived_id(name: &str) -> String {
    Uuid::new_v5(&Uuid::NAMESPACE_OID, format!("jobhop-resource:{name}").as_bytes()).to_string()
}
