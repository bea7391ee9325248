//! Operation surface
//!
//! The operation set exposed to the schema layer. Each call is one blocking
//! sequence for its caller: validate locally, synthesize a script, execute
//! it as a job, decode or classify the result. Independent calls may run
//! concurrently; the session is the only shared state and is read-only.

use crate::decode;
use crate::error::{Classifier, Error, Result};
use crate::fields::{sanitize, Fields};
use crate::platform::engine;
use crate::platform::process::Process;
use crate::platform::session::Session;
use crate::resource::{ListingMode, Locator, Resource};
use crate::script::params::NamedParameter;
use crate::script::synth::{self, CompositeSpec};
use std::collections::BTreeMap;

/// The adapter: an authenticated session plus the failure classifier.
/// Cheap to clone; safe to share across concurrent calls.
#[derive(Clone)]
pub struct Adapter {
    session: Session,
    classifier: std::sync::Arc<Classifier>,
}

impl Adapter {
    pub fn new(session: Session) -> Self {
        Self {
            session,
            classifier: std::sync::Arc::new(Classifier::default()),
        }
    }

    /// Replace the failure classifier, e.g. to add rules for new platform
    /// phrasings.
    pub fn with_classifier(mut self, classifier: Classifier) -> Self {
        self.classifier = std::sync::Arc::new(classifier);
        self
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Refresh a single object by href.
    pub async fn get(&self, locator: &Locator) -> Result<Resource> {
        let href = locator.require_href("get")?;
        let script = synth::get(&locator.namespace, href, &locator.action_params);
        let process = engine::execute(&self.session, &self.classifier, &script, &[]).await?;
        decode::single_resource(&process, &locator.namespace, href)
    }

    /// List objects: nested (locator href + link name) or root (locator
    /// type). Filters merge with the locator's action params into one
    /// options object; key collisions are a caller error.
    pub async fn list(
        &self,
        locator: &Locator,
        link: Option<&str>,
        filters: &Fields,
    ) -> Result<Vec<Resource>> {
        let mode = locator.listing_mode(link)?;
        let options = synth::merge_options(&locator.action_params, filters)?;
        let script = match mode {
            ListingMode::Nested { href, link } => {
                synth::list_nested(&locator.namespace, href, link, &options)
            }
            ListingMode::Root { rtype } => synth::list_root(&locator.namespace, rtype, &options),
        };
        let process = engine::execute(&self.session, &self.classifier, &script, &[]).await?;
        decode::resource_list(&process, &locator.namespace)
    }

    /// Provision a new object. The platform assigns the href.
    pub async fn create(&self, namespace: &str, rtype: &str, fields: &Fields) -> Result<Resource> {
        if namespace.is_empty() {
            return Err(Error::Validation("create requires a namespace".into()));
        }
        if rtype.is_empty() {
            return Err(Error::Validation("create requires a type".into()));
        }
        let payload = sanitize(fields);
        let script = synth::create(namespace, rtype, &payload);
        let process = engine::execute(&self.session, &self.classifier, &script, &[]).await?;
        decode::created_resource(&process, namespace, rtype)
    }

    /// Provision, launch, wait and tag in one transaction. When the
    /// post-create steps fail, a best-effort delete of the partially
    /// created object runs before the primary error is returned;
    /// compensation failures are logged, never propagated - a secondary
    /// failure during rollback must not mask the primary one.
    pub async fn create_composite(&self, spec: &CompositeSpec) -> Result<Resource> {
        if spec.namespace.is_empty() || spec.rtype.is_empty() {
            return Err(Error::Validation(
                "composite create requires a namespace and a type".into(),
            ));
        }
        let spec = CompositeSpec {
            namespace: spec.namespace.clone(),
            rtype: spec.rtype.clone(),
            fields: sanitize(&spec.fields),
            tags: sanitize(&spec.tags),
        };
        let script = synth::create_composite(&spec);
        let outcome =
            engine::execute_lenient(&self.session, &self.classifier, &script, &[]).await?;

        match outcome.failure {
            None => decode::created_resource(&outcome.process, &spec.namespace, &spec.rtype),
            Some(primary) => {
                self.compensate_partial_create(&spec.namespace, &outcome.process)
                    .await;
                Err(primary)
            }
        }
    }

    async fn compensate_partial_create(&self, namespace: &str, process: &Process) {
        let Some(href) = process.outputs.get(synth::OUT_HREF).filter(|h| !h.is_empty()) else {
            return;
        };
        tracing::info!(%href, "rolling back partially created object");
        let locator = Locator::new(namespace).with_href(href.clone());
        if let Err(err) = self.delete(&locator).await {
            tracing::warn!(%href, %err, "rollback delete failed; object may need manual cleanup");
        }
    }

    /// Overwrite the supplied fields on an existing object. Empty-valued
    /// fields are stripped before submission; the platform rejects them.
    pub async fn update(&self, locator: &Locator, fields: &Fields) -> Result<()> {
        let href = locator.require_href("update")?;
        let payload = sanitize(fields);
        let script = synth::update(&locator.namespace, href, &payload);
        engine::execute(&self.session, &self.classifier, &script, &[]).await?;
        Ok(())
    }

    /// Destroy an object by href.
    pub async fn delete(&self, locator: &Locator) -> Result<()> {
        let href = locator.require_href("delete")?;
        let script = synth::delete(&locator.namespace, href);
        engine::execute(&self.session, &self.classifier, &script, &[]).await?;
        Ok(())
    }

    /// Run a caller-supplied script. The source must open with a
    /// well-formed entry-point definition; its `return` clause (if any)
    /// names the outputs to wait for. Returns the raw outputs map.
    pub async fn run_script(
        &self,
        source: &str,
        params: &[NamedParameter],
    ) -> Result<BTreeMap<String, String>> {
        let script = synth::custom(source)?;
        let process = engine::execute(&self.session, &self.classifier, &script, params).await?;
        Ok(process.outputs)
    }

    /// Re-fetch a job by href.
    pub async fn get_job(&self, href: &str) -> Result<Process> {
        if href.is_empty() {
            return Err(Error::Validation("get_job requires an href".into()));
        }
        engine::fetch_process(&self.session, href).await
    }

    /// Delete a job record by href.
    pub async fn delete_job(&self, href: &str) -> Result<()> {
        if href.is_empty() {
            return Err(Error::Validation("delete_job requires an href".into()));
        }
        engine::delete_process(&self.session, href).await
    }

    /// Identity of the authenticated caller, as an opaque map.
    pub async fn caller_identity(&self) -> Result<Fields> {
        self.session.caller_identity().await
    }
}
