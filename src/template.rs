// src/template.rs

//! Rendering of run scripts and submission scripts.
//!
//! Templates are embedded at build time and looked up as `<kind>/<name>`.
//! Rendering is strict: referencing a parameter the job spec doesn't provide
//! is an error, so a spec/template mismatch is caught before anything is
//! uploaded to a resource. Optional parameters are guarded with
//! `{% if name is defined %}`.
//!
//! The only helper exposed to templates is the `shlex_quote` filter.

use std::fmt;

use minijinja::{Environment, Error, ErrorKind, UndefinedBehavior, Value};
use serde::Serialize;

use crate::errors::Result;
use crate::session::quote;

/// Which directory a template lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateKind {
    /// The wrapper that runs the job's command on the resource.
    Runscript,
    /// The script (or description file) handed to a submitter.
    Submission,
    /// Batch-system directive headers included by submission templates.
    Cluster,
}

impl TemplateKind {
    pub fn dir(self) -> &'static str {
        match self {
            TemplateKind::Runscript => "runscript",
            TemplateKind::Submission => "submission",
            TemplateKind::Cluster => "cluster",
        }
    }
}

impl fmt::Display for TemplateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.dir())
    }
}

const BUILTIN: &[(&str, &str)] = &[
    ("runscript/base", include_str!("../templates/runscript/base.sh")),
    ("submission/local", include_str!("../templates/submission/local.sh")),
    ("submission/pbs", include_str!("../templates/submission/pbs.sh")),
    ("submission/slurm", include_str!("../templates/submission/slurm.sh")),
    ("submission/condor", include_str!("../templates/submission/condor.sub")),
    ("cluster/pbs", include_str!("../templates/cluster/pbs")),
    ("cluster/slurm", include_str!("../templates/cluster/slurm")),
];

/// The set of known templates plus the strict rendering environment.
#[derive(Debug)]
pub struct Templates {
    env: Environment<'static>,
}

impl Templates {
    /// Environment with every builtin template registered.
    pub fn builtin() -> Result<Self> {
        let mut env = Environment::new();
        env.set_undefined_behavior(UndefinedBehavior::Strict);
        env.set_keep_trailing_newline(true);
        env.add_filter("shlex_quote", shlex_quote);
        for &(name, source) in BUILTIN {
            env.add_template(name, source)?;
        }
        Ok(Self { env })
    }

    /// Whether `<kind>/<name>` exists.
    pub fn has(&self, kind: TemplateKind, name: &str) -> bool {
        self.env
            .get_template(&format!("{}/{}", kind.dir(), name))
            .is_ok()
    }

    /// Render `<kind>/<name>` with `params` as the template context.
    pub fn render<S: Serialize>(&self, kind: TemplateKind, name: &str, params: &S) -> Result<String> {
        let template = self.env.get_template(&format!("{}/{}", kind.dir(), name))?;
        Ok(template.render(Value::from_serialize(params))?)
    }
}

/// Render a builtin template.
pub fn render<S: Serialize>(kind: TemplateKind, name: &str, params: &S) -> Result<String> {
    Templates::builtin()?.render(kind, name, params)
}

fn shlex_quote(value: Value) -> std::result::Result<String, Error> {
    if value.is_undefined() {
        return Err(Error::new(
            ErrorKind::UndefinedError,
            "shlex_quote applied to an undefined value",
        ));
    }
    Ok(quote(&value.to_string()))
}
