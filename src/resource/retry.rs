//! Bounded retry loops
//!
//! Two eventual-consistency races get dedicated pollers. Discovery: an
//! object created out-of-band exists in the cloud before the platform's
//! background inventory scan has seen it, so a filtered List can be empty
//! for a while. Deletion: a composite object's children may still be
//! tearing down, making the platform reject the delete with a transient
//! conflict. Both loops run on a fixed cadence to a hard ceiling; nothing
//! here retries forever.

use crate::error::{Error, Result};
use crate::fields::Fields;
use crate::resource::{Adapter, Locator, Resource};
use std::time::Duration;
use tokio::time::Instant;

/// Fixed cadence shared by both retry loops
pub const RETRY_INTERVAL: Duration = Duration::from_secs(10);
/// Upper bound a caller may ask discovery to wait
pub const DISCOVERY_CEILING_MAX: Duration = Duration::from_secs(1200);
/// Reference ceiling for deletion-dependency retry
pub const DELETION_CEILING: Duration = Duration::from_secs(5 * 60);

impl Adapter {
    /// List until the filtered result is non-empty or the ceiling elapses.
    /// Used when the caller's filters name a cloud-native identifier that
    /// the platform may not have inventoried yet. Ceilings above
    /// [`DISCOVERY_CEILING_MAX`] are rejected upfront.
    pub async fn list_until_discovered(
        &self,
        locator: &Locator,
        link: Option<&str>,
        filters: &Fields,
        ceiling: Duration,
    ) -> Result<Vec<Resource>> {
        if ceiling > DISCOVERY_CEILING_MAX {
            return Err(Error::Validation(format!(
                "discovery ceiling {:?} exceeds the maximum {:?}",
                ceiling, DISCOVERY_CEILING_MAX
            )));
        }
        self.discover_at(locator, link, filters, ceiling, RETRY_INTERVAL)
            .await
    }

    pub(crate) async fn discover_at(
        &self,
        locator: &Locator,
        link: Option<&str>,
        filters: &Fields,
        ceiling: Duration,
        interval: Duration,
    ) -> Result<Vec<Resource>> {
        let started = Instant::now();
        loop {
            let resources = self.list(locator, link, filters).await?;
            if !resources.is_empty() {
                return Ok(resources);
            }
            if started.elapsed() >= ceiling {
                let rtype = locator.rtype.as_deref().unwrap_or("object");
                return Err(Error::Timeout {
                    waiting_for: format!("{} to be discovered by the platform", rtype),
                    limit: ceiling,
                });
            }
            tracing::debug!(
                namespace = %locator.namespace,
                "inventory still empty; retrying discovery"
            );
            tokio::time::sleep(interval).await;
        }
    }

    /// Delete, retrying while the platform reports children still tearing
    /// down. At the ceiling one final attempt runs and its result is
    /// returned as-is. Any other failure kind returns immediately.
    pub async fn delete_with_retry(&self, locator: &Locator, ceiling: Duration) -> Result<()> {
        self.delete_with_retry_at(locator, ceiling, RETRY_INTERVAL)
            .await
    }

    pub(crate) async fn delete_with_retry_at(
        &self,
        locator: &Locator,
        ceiling: Duration,
        interval: Duration,
    ) -> Result<()> {
        let started = Instant::now();
        loop {
            match self.delete(locator).await {
                Ok(()) => return Ok(()),
                Err(err) if err.is_dependency_conflict() => {
                    if started.elapsed() >= ceiling {
                        tracing::debug!("deletion ceiling reached; final attempt");
                        return self.delete(locator).await;
                    }
                    tracing::debug!(%err, "dependents still releasing; retrying delete");
                    tokio::time::sleep(interval).await;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ResolvedConfig;
    use crate::platform::session::Session;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn adapter_for(host: &str) -> Adapter {
        let session = Session::new(&ResolvedConfig {
            host: host.into(),
            user: "ops".into(),
            secret: "s".into(),
            tenant: "acme".into(),
            email: "ops@acme".into(),
        })
        .expect("host parses");
        Adapter::new(session)
    }

    async fn mount_submit(server: &MockServer) {
        Mock::given(method("POST"))
            .and(path("/api/processes"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "href": "/api/processes/1" })),
            )
            .mount(server)
            .await;
    }

    fn conflict_body() -> serde_json::Value {
        json!({
            "status": "failed",
            "outputs": [],
            "tasks": [ { "error": {
                "message": "Deployment 'web' has active member resources"
            } } ],
        })
    }

    fn completed_body(outputs: serde_json::Value) -> serde_json::Value {
        json!({ "status": "completed", "outputs": outputs, "tasks": [] })
    }

    fn list_outputs(hrefs: &str, details: &str) -> serde_json::Value {
        json!([
            { "name": "hrefs", "value": hrefs },
            { "name": "details", "value": details },
            { "name": "type", "value": "machine" },
        ])
    }

    #[tokio::test]
    async fn discovery_rejects_oversized_ceiling() {
        let adapter = adapter_for("https://flow.invalid");
        let locator = Locator::new("cloud").with_type("machine");
        let err = adapter
            .list_until_discovered(&locator, None, &Fields::new(), Duration::from_secs(1201))
            .await
            .expect_err("ceiling above the maximum");
        assert!(matches!(err, Error::Validation(_)));
    }

    #[tokio::test]
    async fn discovery_returns_first_non_empty_result() {
        let server = MockServer::start().await;
        mount_submit(&server).await;
        Mock::given(method("GET"))
            .and(path("/api/processes/1"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(completed_body(list_outputs("[]", "[]"))),
            )
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/processes/1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(completed_body(list_outputs(
                r#"["/m/1"]"#,
                r#"[{"instance_id":"i-123"}]"#,
            ))))
            .mount(&server)
            .await;

        let adapter = adapter_for(&server.uri());
        let locator = Locator::new("cloud").with_type("machine");
        let mut filters = Fields::new();
        filters.insert("instance_id".into(), json!("i-123"));

        let resources = adapter
            .discover_at(
                &locator,
                None,
                &filters,
                Duration::from_secs(5),
                Duration::from_millis(10),
            )
            .await
            .expect("inventory catches up");
        assert_eq!(resources.len(), 1);
        assert_eq!(resources[0].locator.href.as_deref(), Some("/m/1"));
    }

    #[tokio::test]
    async fn discovery_times_out_naming_the_type_and_ceiling() {
        let server = MockServer::start().await;
        mount_submit(&server).await;
        Mock::given(method("GET"))
            .and(path("/api/processes/1"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(completed_body(list_outputs("[]", "[]"))),
            )
            .mount(&server)
            .await;

        let adapter = adapter_for(&server.uri());
        let locator = Locator::new("cloud").with_type("machine");

        let err = adapter
            .discover_at(
                &locator,
                None,
                &Fields::new(),
                Duration::from_millis(100),
                Duration::from_millis(20),
            )
            .await
            .expect_err("inventory never catches up");
        match err {
            Error::Timeout { waiting_for, limit } => {
                assert!(waiting_for.contains("machine"));
                assert_eq!(limit, Duration::from_millis(100));
            }
            other => panic!("expected Timeout, got {:?}", other),
        }

        // One List per tick: several attempts, not a tight spin.
        let submits = server
            .received_requests()
            .await
            .expect("requests recorded")
            .iter()
            .filter(|r| r.method == wiremock::http::Method::POST)
            .count();
        assert!((2..=8).contains(&submits), "unexpected attempt count {}", submits);
    }

    #[tokio::test]
    async fn delete_retry_survives_transient_conflicts() {
        let server = MockServer::start().await;
        mount_submit(&server).await;
        Mock::given(method("GET"))
            .and(path("/api/processes/1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(conflict_body()))
            .up_to_n_times(2)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/processes/1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(completed_body(json!([]))))
            .mount(&server)
            .await;

        let adapter = adapter_for(&server.uri());
        let locator = Locator::new("cloud").with_href("/deployments/9");

        adapter
            .delete_with_retry_at(&locator, Duration::from_secs(5), Duration::from_millis(10))
            .await
            .expect("teardown finishes before the ceiling");

        let submits = server
            .received_requests()
            .await
            .expect("requests recorded")
            .iter()
            .filter(|r| r.method == wiremock::http::Method::POST)
            .count();
        assert_eq!(submits, 3, "two conflicted attempts then success");
    }

    #[tokio::test]
    async fn delete_retry_makes_one_final_attempt_at_the_ceiling() {
        let server = MockServer::start().await;
        mount_submit(&server).await;
        Mock::given(method("GET"))
            .and(path("/api/processes/1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(conflict_body()))
            .mount(&server)
            .await;

        let adapter = adapter_for(&server.uri());
        let locator = Locator::new("cloud").with_href("/deployments/9");

        let err = adapter
            .delete_with_retry_at(&locator, Duration::from_millis(25), Duration::from_millis(10))
            .await
            .expect_err("children never finish tearing down");
        assert!(err.is_dependency_conflict());
    }

    #[tokio::test]
    async fn delete_retry_gives_up_immediately_on_other_errors() {
        let server = MockServer::start().await;
        mount_submit(&server).await;
        Mock::given(method("GET"))
            .and(path("/api/processes/1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "failed",
                "outputs": [],
                "tasks": [ { "error": { "message": "quota exceeded for tenant acme" } } ],
            })))
            .mount(&server)
            .await;

        let adapter = adapter_for(&server.uri());
        let locator = Locator::new("cloud").with_href("/deployments/9");

        let err = adapter
            .delete_with_retry_at(&locator, Duration::from_secs(5), Duration::from_millis(10))
            .await
            .expect_err("unclassified failures are fatal");
        assert!(matches!(err, Error::Platform(_)));

        let submits = server
            .received_requests()
            .await
            .expect("requests recorded")
            .iter()
            .filter(|r| r.method == wiremock::http::Method::POST)
            .count();
        assert_eq!(submits, 1, "no retry on non-conflict failures");
    }
}
