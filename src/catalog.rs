// src/catalog.rs

//! Name → constructor tables for transports, submitters and orchestrator
//! variants.
//!
//! A [`Catalog`] is built once at startup (usually [`Catalog::builtin`]) and
//! handed to whatever needs to turn a name from a config file, job spec or
//! job record into a concrete implementation. Unknown names are a typed
//! error rather than a panic.

use std::collections::BTreeMap;

use anyhow::anyhow;

use crate::errors::{JobhopError, Result};
use crate::orchestrator::{dataset, plain, JobSpec, Variant};
use crate::resource::Resource;
use crate::session::{LocalTransport, SshTransport, Transport};
use crate::submitter::{CondorBackend, LocalBackend, PbsBackend, SlurmBackend, SubmitterBackend};

pub type TransportFactory = fn(&Resource) -> Result<Box<dyn Transport>>;
pub type SubmitterFactory = fn() -> Box<dyn SubmitterBackend>;
pub type OrchestratorFactory = fn(&Resource, &JobSpec) -> Result<Variant>;

#[derive(Debug, Clone, Default)]
pub struct Catalog {
    transports: BTreeMap<&'static str, TransportFactory>,
    submitters: BTreeMap<&'static str, SubmitterFactory>,
    orchestrators: BTreeMap<&'static str, OrchestratorFactory>,
}

impl Catalog {
    /// Everything jobhop ships with.
    pub fn builtin() -> Self {
        let mut catalog = Self::default();
        catalog
            .register_transport("shell", shell_transport)
            .register_transport("ssh", ssh_transport)
            .register_submitter("local", || Box::new(LocalBackend))
            .register_submitter("pbs", || Box::new(PbsBackend))
            .register_submitter("condor", || Box::new(CondorBackend))
            .register_submitter("slurm", || Box::new(SlurmBackend))
            .register_orchestrator("plain", plain::build)
            .register_orchestrator("dataset", dataset::build);
        catalog
    }

    pub fn register_transport(&mut self, kind: &'static str, factory: TransportFactory) -> &mut Self {
        self.transports.insert(kind, factory);
        self
    }

    pub fn register_submitter(&mut self, name: &'static str, factory: SubmitterFactory) -> &mut Self {
        self.submitters.insert(name, factory);
        self
    }

    pub fn register_orchestrator(
        &mut self,
        name: &'static str,
        factory: OrchestratorFactory,
    ) -> &mut Self {
        self.orchestrators.insert(name, factory);
        self
    }

    pub fn transport(&self, kind: &str) -> Result<TransportFactory> {
        lookup(&self.transports, "resource type", kind)
    }

    pub fn submitter(&self, name: &str) -> Result<Box<dyn SubmitterBackend>> {
        lookup(&self.submitters, "submitter", name).map(|factory| factory())
    }

    pub fn orchestrator(&self, name: &str) -> Result<OrchestratorFactory> {
        lookup(&self.orchestrators, "orchestrator", name)
    }

    pub fn submitter_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.submitters.keys().copied()
    }

    pub fn orchestrator_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.orchestrators.keys().copied()
    }
}

fn lookup<F: Copy>(table: &BTreeMap<&'static str, F>, kind: &'static str, name: &str) -> Result<F> {
    table.get(name).copied().ok_or_else(|| JobhopError::UnknownName {
        kind,
        name: name.to_string(),
        known: table.keys().copied().collect::<Vec<_>>().join(", "),
    })
}

fn shell_transport(_resource: &Resource) -> Result<Box<dyn Transport>> {
    Ok(Box::new(LocalTransport::new()))
}

fn ssh_transport(resource: &Resource) -> Result<Box<dyn Transport>> {
    let host = resource
        .host
        .clone()
        .ok_or_else(|| anyhow!("ssh resource '{}' has no host", resource.name))?;
    Ok(Box::new(
        SshTransport::new(host)
            .with_port(resource.port)
            .with_user(resource.user.clone())
            .with_key_filename(resource.key_filename.clone()),
    ))
}
