//! Operation synthesis
//!
//! Builds the script for each logical operation. Every synthesized script
//! wraps its work in the standard `main` + bounded-timeout template;
//! composite creation is the one shape that emits auxiliary definitions.
//! Caller-supplied sources are validated against the entry-point grammar
//! before anything is submitted.

use crate::error::{Error, Result};
use crate::fields::Fields;
use crate::script::builder::{json_literal, quote, Definition, Script, Stmt};
use regex::Regex;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::OnceLock;

/// Output names bound by synthesized scripts.
pub const OUT_DETAILS: &str = "details";
pub const OUT_HREFS: &str = "hrefs";
pub const OUT_HREF: &str = "href";
pub const OUT_TYPE: &str = "type";

/// Source ready for submission, together with what the engine needs to know
/// about it: where execution starts and which outputs to wait for.
#[derive(Debug, Clone)]
pub struct SynthesizedScript {
    pub source: String,
    pub entry_point: String,
    pub outputs: Vec<String>,
}

impl SynthesizedScript {
    fn main(source: String, outputs: &[&str]) -> Self {
        Self {
            source,
            entry_point: "main".into(),
            outputs: outputs.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Whether the engine should expect the outputs channel to fill.
    pub fn expects_outputs(&self) -> bool {
        !self.outputs.is_empty()
    }
}

/// Inputs for a composite create: provision, launch, wait for the launch to
/// settle, then tag - one transaction from the caller's point of view.
#[derive(Debug, Clone)]
pub struct CompositeSpec {
    pub namespace: String,
    pub rtype: String,
    pub fields: Fields,
    pub tags: Fields,
}

fn params_literal(action_params: &BTreeMap<String, String>) -> String {
    let map: serde_json::Map<String, Value> = action_params
        .iter()
        .map(|(k, v)| (k.clone(), Value::String(v.clone())))
        .collect();
    json_literal(&Value::Object(map))
}

/// Merge action params with caller filters into the single options object a
/// listing handle takes. Key collisions are a caller error, never silently
/// resolved.
pub fn merge_options(action_params: &BTreeMap<String, String>, filters: &Fields) -> Result<Fields> {
    let mut merged = Fields::new();
    for (k, v) in action_params {
        merged.insert(k.clone(), Value::String(v.clone()));
    }
    for (k, v) in filters {
        if merged.contains_key(k) {
            return Err(Error::Validation(format!(
                "filter key '{}' collides with an action parameter",
                k
            )));
        }
        merged.insert(k.clone(), v.clone());
    }
    Ok(merged)
}

/// Get: acquire by href, export a single-element details array plus the
/// resolved type name.
pub fn get(
    namespace: &str,
    href: &str,
    action_params: &BTreeMap<String, String>,
) -> SynthesizedScript {
    let handle = if action_params.is_empty() {
        format!("{}.get({})", namespace, quote(href))
    } else {
        format!(
            "{}.get({}, {})",
            namespace,
            quote(href),
            params_literal(action_params)
        )
    };
    let source = Script::main([
        Stmt::assign("target", handle),
        Stmt::assign("record", "target.details"),
        Stmt::export(OUT_DETAILS, "json([record])"),
        Stmt::export(OUT_TYPE, "target.type"),
    ])
    .render();
    SynthesizedScript::main(source, &[OUT_DETAILS, OUT_TYPE])
}

fn list_exports(handle: String) -> SynthesizedScript {
    let source = Script::main([
        Stmt::assign("listing", handle),
        Stmt::export(OUT_HREFS, "json(listing.hrefs)"),
        Stmt::export(OUT_DETAILS, "json(listing.details)"),
        Stmt::export(OUT_TYPE, "listing.type"),
    ])
    .render();
    SynthesizedScript::main(source, &[OUT_HREFS, OUT_DETAILS, OUT_TYPE])
}

/// Nested listing: follow a named link off an existing object.
pub fn list_nested(namespace: &str, href: &str, link: &str, options: &Fields) -> SynthesizedScript {
    list_exports(format!(
        "{}.get({}).link({}, {})",
        namespace,
        quote(href),
        quote(link),
        json_literal(&Value::Object(options.clone()))
    ))
}

/// Root listing: query a type directly.
pub fn list_root(namespace: &str, rtype: &str, options: &Fields) -> SynthesizedScript {
    list_exports(format!(
        "{}.{}.get({})",
        namespace,
        rtype,
        json_literal(&Value::Object(options.clone()))
    ))
}

/// Update: acquire by href and apply the (already sanitized) fields. No
/// outputs are requested.
pub fn update(namespace: &str, href: &str, fields: &Fields) -> SynthesizedScript {
    let source = Script::main([
        Stmt::assign("target", format!("{}.get({})", namespace, quote(href))),
        Stmt::call(format!(
            "target.update({})",
            json_literal(&Value::Object(fields.clone()))
        )),
    ])
    .render();
    SynthesizedScript::main(source, &[])
}

fn provision_envelope(namespace: &str, rtype: &str, fields: &Fields) -> String {
    let envelope = serde_json::json!({
        "namespace": namespace,
        "type": rtype,
        "fields": fields,
    });
    format!("provision({})", json_literal(&envelope))
}

/// Create: provision from a `{namespace, type, fields}` envelope, export the
/// assigned href and a single details object.
pub fn create(namespace: &str, rtype: &str, fields: &Fields) -> SynthesizedScript {
    let source = Script::main([
        Stmt::assign("created", provision_envelope(namespace, rtype, fields)),
        Stmt::export(OUT_HREF, "created.href"),
        Stmt::export(OUT_DETAILS, "json(created.details)"),
    ])
    .render();
    SynthesizedScript::main(source, &[OUT_HREF, OUT_DETAILS])
}

/// Composite create: provision, launch, wait for a terminal launch state,
/// tag. `main` only sequences the steps; each one lives in an auxiliary
/// definition, and the wait carries its own error handler so a launch
/// failure surfaces as a described error instead of a silent rollback.
pub fn create_composite(spec: &CompositeSpec) -> SynthesizedScript {
    let main = Script::main([
        Stmt::assign("created", "provision_target()"),
        Stmt::call("created.invoke(\"launch\")"),
        Stmt::call("await_ready(created)"),
        Stmt::call("apply_tags(created)"),
        Stmt::export(OUT_HREF, "created.href"),
        Stmt::export(OUT_DETAILS, "json(created.details)"),
    ]);

    let source = main
        .aux(
            Definition::new("provision_target")
                .returns(["created"])
                .stmt(Stmt::assign(
                    "created",
                    provision_envelope(&spec.namespace, &spec.rtype, &spec.fields),
                )),
        )
        .aux(
            Definition::new("await_ready")
                .param("target")
                .on_error([Stmt::raise(
                    "\"launch did not reach a ready state: \" + launch_failure(target)",
                )])
                .stmt(Stmt::call("target.await_state(\"READY\")")),
        )
        .aux(
            Definition::new("apply_tags").param("target").stmt(Stmt::call(format!(
                "target.tag({})",
                json_literal(&Value::Object(spec.tags.clone()))
            ))),
        )
        .aux(
            Definition::new("launch_failure")
                .param("target")
                .returns(["message"])
                .stmt(Stmt::assign(
                    "message",
                    "target.status + \": \" + target.status_detail",
                )),
        )
        .render();

    SynthesizedScript::main(source, &[OUT_HREF, OUT_DETAILS])
}

/// Delete: acquire by href and destroy. No outputs.
pub fn delete(namespace: &str, href: &str) -> SynthesizedScript {
    let source = Script::main([
        Stmt::assign("target", format!("{}.get({})", namespace, quote(href))),
        Stmt::call("target.destroy()"),
    ])
    .render();
    SynthesizedScript::main(source, &[])
}

fn entry_point_grammar() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?s)^define\s+([A-Za-z_][A-Za-z0-9_]*)\s*\(\s*([A-Za-z_][A-Za-z0-9_]*(?:\s*,\s*[A-Za-z_][A-Za-z0-9_]*)*)?\s*\)\s*(?:return\s+([A-Za-z_][A-Za-z0-9_]*(?:\s*,\s*[A-Za-z_][A-Za-z0-9_]*)*)\s+)?do\b",
        )
        .expect("entry point grammar compiles")
    })
}

/// Validate a caller-supplied script and extract its entry point. The
/// source must open with a well-formed definition: name, parenthesized
/// parameter list, optional `return` list, `do`. Malformed sources fail
/// here, before any network call; the `return` clause is what marks the
/// script as output-bearing.
pub fn custom(source: &str) -> Result<SynthesizedScript> {
    let trimmed = source.trim_start();
    let captures = entry_point_grammar().captures(trimmed).ok_or_else(|| {
        Error::Validation(
            "custom script must open with a well-formed entry point: \
             define name(params) [return outputs] do"
                .into(),
        )
    })?;

    let entry_point = captures[1].to_string();
    let outputs = captures
        .get(3)
        .map(|m| {
            m.as_str()
                .split(',')
                .map(|s| s.trim().to_string())
                .collect()
        })
        .unwrap_or_default();

    Ok(SynthesizedScript {
        source: source.to_string(),
        entry_point,
        outputs,
    })
}
