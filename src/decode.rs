//! Output decoding
//!
//! The job protocol's output channel only carries name/value pairs whose
//! values are strings (structured data is JSON-encoded by the script before
//! being bound to an output name). Decoding is therefore two-stage: pull the
//! raw text for a name, then JSON-decode it into the target shape. A missing
//! name or undecodable text is a contract mismatch between synthesizer and
//! engine and always surfaces as an error.

use crate::error::{Error, Result};
use crate::fields::Fields;
use crate::platform::process::Process;
use crate::resource::{Locator, Resource};
use crate::script::synth::{OUT_DETAILS, OUT_HREF, OUT_HREFS, OUT_TYPE};
use serde::de::DeserializeOwned;

/// Raw text bound to an output name.
pub fn raw_output<'a>(process: &'a Process, name: &str) -> Result<&'a str> {
    process.outputs.get(name).map(String::as_str).ok_or_else(|| {
        Error::MalformedResponse(format!(
            "job {} is missing expected output '{}'",
            process.href, name
        ))
    })
}

/// JSON-decode the text bound to an output name into `T`.
pub fn decode_output<T: DeserializeOwned>(process: &Process, name: &str) -> Result<T> {
    let raw = raw_output(process, name)?;
    serde_json::from_str(raw).map_err(|e| {
        Error::MalformedResponse(format!(
            "job {} output '{}' does not decode: {}",
            process.href, name, e
        ))
    })
}

/// Decode a Get result: a single-element details array plus the resolved
/// type, paired with the href the caller asked for.
pub fn single_resource(process: &Process, namespace: &str, href: &str) -> Result<Resource> {
    let mut details: Vec<Fields> = decode_output(process, OUT_DETAILS)?;
    if details.len() != 1 {
        return Err(Error::MalformedResponse(format!(
            "job {} returned {} detail records for a single object",
            process.href,
            details.len()
        )));
    }
    let rtype: String = raw_output(process, OUT_TYPE)?.to_string();

    Ok(Resource {
        locator: Locator::new(namespace).with_type(rtype).with_href(href),
        fields: details.remove(0),
    })
}

/// Decode a List result: parallel href and detail arrays zipped
/// index-for-index, all sharing the namespace and the job's resolved type.
pub fn resource_list(process: &Process, namespace: &str) -> Result<Vec<Resource>> {
    let hrefs: Vec<String> = decode_output(process, OUT_HREFS)?;
    let details: Vec<Fields> = decode_output(process, OUT_DETAILS)?;
    if hrefs.len() != details.len() {
        return Err(Error::MalformedResponse(format!(
            "job {} returned {} hrefs but {} detail records",
            process.href,
            hrefs.len(),
            details.len()
        )));
    }
    let rtype = raw_output(process, OUT_TYPE)?.to_string();

    Ok(hrefs
        .into_iter()
        .zip(details)
        .map(|(href, fields)| Resource {
            locator: Locator::new(namespace).with_type(&rtype).with_href(href),
            fields,
        })
        .collect())
}

/// Decode a Create result: the platform-assigned href plus a single
/// JSON-encoded details object.
pub fn created_resource(process: &Process, namespace: &str, rtype: &str) -> Result<Resource> {
    let href = raw_output(process, OUT_HREF)?.to_string();
    let fields: Fields = decode_output(process, OUT_DETAILS)?;

    Ok(Resource {
        locator: Locator::new(namespace).with_type(rtype).with_href(href),
        fields,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::process::ProcessStatus;
    use serde_json::json;
    use std::collections::BTreeMap;

    fn process(outputs: &[(&str, &str)]) -> Process {
        Process {
            href: "/api/processes/1".into(),
            status: ProcessStatus::Completed,
            outputs: outputs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect::<BTreeMap<_, _>>(),
            error: None,
        }
    }

    #[test]
    fn zips_hrefs_and_details_by_index() {
        let p = process(&[
            ("hrefs", r#"["/x/1","/x/2"]"#),
            ("details", r#"[{"a":1},{"a":2}]"#),
            ("type", "machine"),
        ]);
        let resources = resource_list(&p, "cloud").expect("decodes");
        assert_eq!(resources.len(), 2);
        assert_eq!(resources[0].locator.href.as_deref(), Some("/x/1"));
        assert_eq!(resources[0].fields["a"], json!(1));
        assert_eq!(resources[1].locator.href.as_deref(), Some("/x/2"));
        assert_eq!(resources[1].fields["a"], json!(2));
        assert_eq!(resources[0].locator.rtype.as_deref(), Some("machine"));
    }

    #[test]
    fn length_mismatch_is_malformed() {
        let p = process(&[
            ("hrefs", r#"["/x/1"]"#),
            ("details", r#"[{"a":1},{"a":2}]"#),
            ("type", "machine"),
        ]);
        assert!(matches!(
            resource_list(&p, "cloud"),
            Err(Error::MalformedResponse(_))
        ));
    }

    #[test]
    fn single_resource_requires_one_element() {
        let p = process(&[("details", r#"[{"a":1},{"a":2}]"#), ("type", "machine")]);
        assert!(single_resource(&p, "cloud", "/x/1").is_err());

        let p = process(&[("details", r#"[{"a":1}]"#), ("type", "machine")]);
        let resource = single_resource(&p, "cloud", "/x/1").expect("decodes");
        assert_eq!(resource.locator.href.as_deref(), Some("/x/1"));
        assert_eq!(resource.fields["a"], json!(1));
    }

    #[test]
    fn missing_output_names_the_gap() {
        let p = process(&[("type", "machine")]);
        let err = raw_output(&p, "details").expect_err("missing output");
        assert!(err.to_string().contains("details"));
    }

    #[test]
    fn created_resource_pairs_href_with_details() {
        let p = process(&[("href", "/x/9"), ("details", r#"{"name":"web"}"#)]);
        let resource = created_resource(&p, "cloud", "machine").expect("decodes");
        assert_eq!(resource.locator.href.as_deref(), Some("/x/9"));
        assert_eq!(resource.fields["name"], json!("web"));
    }

    #[test]
    fn undecodable_output_is_malformed() {
        let p = process(&[("details", "not json"), ("type", "machine")]);
        assert!(matches!(
            decode_output::<Vec<Fields>>(&p, "details"),
            Err(Error::MalformedResponse(_))
        ));
    }
}
