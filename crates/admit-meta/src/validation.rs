//! Validation of the metadata envelope
//!
//! Common checks every resource type gets regardless of its own rules:
//! identity syntax on the new object, and immutability of system-assigned
//! fields across an update.

use crate::field::{ErrorList, FieldError, FieldPath};
use crate::meta::ObjectMeta;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::collections::HashSet;

/// Maximum length of a DNS-1123 label
pub const DNS1123_LABEL_MAX_LEN: usize = 63;

/// Maximum length of a DNS-1123 subdomain
pub const DNS1123_SUBDOMAIN_MAX_LEN: usize = 253;

/// Maximum length of the name part of a qualified name
pub const QUALIFIED_NAME_MAX_LEN: usize = 63;

/// Maximum length of a label value
pub const LABEL_VALUE_MAX_LEN: usize = 63;

/// Maximum combined size of all annotation keys and values
pub const TOTAL_ANNOTATION_SIZE_LIMIT: usize = 256 * 1024;

static DNS1123_LABEL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z0-9]([-a-z0-9]*[a-z0-9])?$").expect("static regex"));

static DNS1123_SUBDOMAIN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-z0-9]([-a-z0-9]*[a-z0-9])?(\.[a-z0-9]([-a-z0-9]*[a-z0-9])?)*$")
        .expect("static regex")
});

static QUALIFIED_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([A-Za-z0-9][-A-Za-z0-9_.]*)?[A-Za-z0-9]$").expect("static regex"));

/// Name validator used for `metadata.name`
///
/// `prefix` is true when validating `generateName`, which may end in a
/// partial token. Returns human-readable reasons, empty when valid.
pub type ValidateNameFn = fn(name: &str, prefix: bool) -> Vec<String>;

/// Names usable as a single path segment
pub fn validate_path_segment_name(name: &str, prefix: bool) -> Vec<String> {
    let mut errs = Vec::new();
    if !prefix && (name == "." || name == "..") {
        errs.push(format!("may not be '{name}'"));
    }
    for illegal in ["/", "%"] {
        if name.contains(illegal) {
            errs.push(format!("may not contain '{illegal}'"));
        }
    }
    errs
}

/// Names that must be valid DNS-1123 subdomains
pub fn validate_dns1123_subdomain_name(name: &str, prefix: bool) -> Vec<String> {
    let name = if prefix { mask_trailing_dash(name) } else { name.to_string() };
    is_dns1123_subdomain(&name)
}

/// Check DNS-1123 label syntax
#[must_use]
pub fn is_dns1123_label(value: &str) -> Vec<String> {
    let mut errs = Vec::new();
    if value.len() > DNS1123_LABEL_MAX_LEN {
        errs.push(format!("must be no more than {DNS1123_LABEL_MAX_LEN} characters"));
    }
    if !DNS1123_LABEL.is_match(value) {
        errs.push(
            "a lowercase RFC 1123 label must consist of lower case alphanumeric characters or '-', \
             and must start and end with an alphanumeric character"
                .to_string(),
        );
    }
    errs
}

/// Check DNS-1123 subdomain syntax
#[must_use]
pub fn is_dns1123_subdomain(value: &str) -> Vec<String> {
    let mut errs = Vec::new();
    if value.len() > DNS1123_SUBDOMAIN_MAX_LEN {
        errs.push(format!("must be no more than {DNS1123_SUBDOMAIN_MAX_LEN} characters"));
    }
    if !DNS1123_SUBDOMAIN.is_match(value) {
        errs.push(
            "a lowercase RFC 1123 subdomain must consist of lower case alphanumeric characters, \
             '-' or '.', and must start and end with an alphanumeric character"
                .to_string(),
        );
    }
    errs
}

/// Check `[prefix/]name` syntax used for label, annotation and finalizer keys
#[must_use]
pub fn is_qualified_name(value: &str) -> Vec<String> {
    let mut errs = Vec::new();
    let name = match value.split_once('/') {
        None => value,
        Some((prefix, name)) => {
            if prefix.is_empty() {
                errs.push("prefix part must be non-empty".to_string());
            } else {
                errs.extend(is_dns1123_subdomain(prefix).into_iter().map(|e| format!("prefix part {e}")));
            }
            if name.contains('/') {
                errs.push("a qualified name must have at most one '/'".to_string());
                return errs;
            }
            name
        }
    };

    if name.is_empty() {
        errs.push("name part must be non-empty".to_string());
    } else if name.len() > QUALIFIED_NAME_MAX_LEN {
        errs.push(format!("name part must be no more than {QUALIFIED_NAME_MAX_LEN} characters"));
    }
    if !name.is_empty() && !QUALIFIED_NAME.is_match(name) {
        errs.push(
            "name part must consist of alphanumeric characters, '-', '_' or '.', \
             and must start and end with an alphanumeric character"
                .to_string(),
        );
    }
    errs
}

/// Check label value syntax; the empty string is allowed
#[must_use]
pub fn is_label_value(value: &str) -> Vec<String> {
    let mut errs = Vec::new();
    if value.len() > LABEL_VALUE_MAX_LEN {
        errs.push(format!("must be no more than {LABEL_VALUE_MAX_LEN} characters"));
    }
    if !value.is_empty() && !QUALIFIED_NAME.is_match(value) {
        errs.push(
            "a valid label must be an empty string or consist of alphanumeric characters, \
             '-', '_' or '.', and must start and end with an alphanumeric character"
                .to_string(),
        );
    }
    errs
}

fn mask_trailing_dash(name: &str) -> String {
    match name.strip_suffix('-') {
        Some(stripped) if !stripped.is_empty() => format!("{stripped}a"),
        _ => name.to_string(),
    }
}

fn push_all(errs: &mut ErrorList, path: &FieldPath, value: &str, reasons: Vec<String>) {
    errs.extend(reasons.into_iter().map(|r| FieldError::invalid(path, value, r)));
}

/// Validate label keys and values
#[must_use]
pub fn validate_labels<'a>(
    labels: impl IntoIterator<Item = (&'a String, &'a String)>,
    path: &FieldPath,
) -> ErrorList {
    let mut errs = ErrorList::new();
    for (key, value) in labels {
        push_all(&mut errs, path, key, is_qualified_name(key));
        push_all(&mut errs, &path.key(key.as_str()), value, is_label_value(value));
    }
    errs
}

/// Validate annotation keys and their combined size
#[must_use]
pub fn validate_annotations<'a>(
    annotations: impl IntoIterator<Item = (&'a String, &'a String)>,
    path: &FieldPath,
) -> ErrorList {
    let mut errs = ErrorList::new();
    let mut total = 0usize;
    for (key, value) in annotations {
        push_all(&mut errs, path, key, is_qualified_name(&key.to_lowercase()));
        total += key.len() + value.len();
    }
    if total > TOTAL_ANNOTATION_SIZE_LIMIT {
        errs.push(FieldError::too_long(path, TOTAL_ANNOTATION_SIZE_LIMIT));
    }
    errs
}

/// Validate finalizer names and reject duplicates
#[must_use]
pub fn validate_finalizers(finalizers: &[String], path: &FieldPath) -> ErrorList {
    let mut errs = ErrorList::new();
    let mut seen = HashSet::new();
    for (i, finalizer) in finalizers.iter().enumerate() {
        push_all(&mut errs, &path.index(i), finalizer, is_qualified_name(finalizer));
        if !seen.insert(finalizer.as_str()) {
            errs.push(FieldError::duplicate(&path.index(i), finalizer));
        }
    }
    errs
}

/// Reject any change between old and new values
#[must_use]
pub fn validate_immutable_field<T>(new: &T, old: &T, path: &FieldPath) -> ErrorList
where
    T: PartialEq + Serialize,
{
    let mut errs = ErrorList::new();
    if new != old {
        errs.push(FieldError::invalid(path, new, "field is immutable"));
    }
    errs
}

/// Syntax checks on a single object's metadata
///
/// Namespaced types must carry a valid namespace; cluster-scoped types must
/// not carry one at all.
#[must_use]
pub fn validate_object_meta(
    meta: &ObjectMeta,
    namespace_scoped: bool,
    name_fn: ValidateNameFn,
    path: &FieldPath,
) -> ErrorList {
    let mut errs = ErrorList::new();

    if !meta.generate_name.is_empty() {
        let gen_path = path.child("generateName");
        push_all(&mut errs, &gen_path, &meta.generate_name, name_fn(&meta.generate_name, true));
    }

    let name_path = path.child("name");
    if meta.name.is_empty() {
        if meta.generate_name.is_empty() {
            errs.push(FieldError::required(&name_path, "name or generateName is required"));
        }
    } else {
        push_all(&mut errs, &name_path, &meta.name, name_fn(&meta.name, false));
    }

    let ns_path = path.child("namespace");
    if namespace_scoped {
        if meta.namespace.is_empty() {
            errs.push(FieldError::required(&ns_path, ""));
        } else {
            push_all(&mut errs, &ns_path, &meta.namespace, is_dns1123_label(&meta.namespace));
        }
    } else if !meta.namespace.is_empty() {
        errs.push(FieldError::forbidden(&ns_path, "not allowed on this type"));
    }

    if meta.generation < 0 {
        errs.push(FieldError::invalid(
            &path.child("generation"),
            meta.generation,
            "must be greater than or equal to 0",
        ));
    }

    errs.append(validate_labels(&meta.labels, &path.child("labels")));
    errs.append(validate_annotations(&meta.annotations, &path.child("annotations")));
    errs.append(validate_finalizers(&meta.finalizers, &path.child("finalizers")));
    errs
}

/// Immutability checks between the incoming and prior metadata
#[must_use]
pub fn validate_object_meta_update(new: &ObjectMeta, old: &ObjectMeta, path: &FieldPath) -> ErrorList {
    let mut errs = ErrorList::new();

    if old.is_deleting() {
        let existing: HashSet<&str> = old.finalizers.iter().map(String::as_str).collect();
        for (i, finalizer) in new.finalizers.iter().enumerate() {
            if !existing.contains(finalizer.as_str()) {
                errs.push(FieldError::forbidden(
                    &path.child("finalizers").index(i),
                    format!("no new finalizers can be added if the object is being deleted, found new finalizer {finalizer:?}"),
                ));
            }
        }
    }

    if new.resource_version.is_empty() {
        errs.push(FieldError::invalid(
            &path.child("resourceVersion"),
            &new.resource_version,
            "must be specified for an update",
        ));
    }

    if new.generation < old.generation {
        errs.push(FieldError::invalid(
            &path.child("generation"),
            new.generation,
            "must not be decremented",
        ));
    }

    errs.append(validate_immutable_field(&new.name, &old.name, &path.child("name")));
    errs.append(validate_immutable_field(&new.namespace, &old.namespace, &path.child("namespace")));
    errs.append(validate_immutable_field(&new.uid, &old.uid, &path.child("uid")));
    errs.append(validate_immutable_field(
        &new.creation_timestamp,
        &old.creation_timestamp,
        &path.child("creationTimestamp"),
    ));
    errs.append(validate_immutable_field(
        &new.deletion_timestamp,
        &old.deletion_timestamp,
        &path.child("deletionTimestamp"),
    ));
    errs.append(validate_immutable_field(
        &new.deletion_grace_period_seconds,
        &old.deletion_grace_period_seconds,
        &path.child("deletionGracePeriodSeconds"),
    ));
    errs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::ErrorType;
    use crate::meta::Time;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn meta_path() -> FieldPath {
        FieldPath::new("metadata")
    }

    fn valid() -> ObjectMeta {
        ObjectMeta::named("ns-a", "web")
            .with_uid("u1")
            .with_resource_version("1")
    }

    fn fields(errs: &ErrorList) -> Vec<String> {
        errs.iter().map(|e| e.field.to_string()).collect()
    }

    #[test]
    fn path_segment_name_rules() {
        assert!(validate_path_segment_name("web", false).is_empty());
        assert_eq!(validate_path_segment_name("..", false).len(), 1);
        assert!(validate_path_segment_name("..", true).is_empty());
        assert_eq!(validate_path_segment_name("a/b%c", false).len(), 2);
    }

    #[test]
    fn dns_label_and_subdomain() {
        assert!(is_dns1123_label("ns-a").is_empty());
        assert!(!is_dns1123_label("NS").is_empty());
        assert!(!is_dns1123_label(&"a".repeat(64)).is_empty());
        assert!(is_dns1123_subdomain("example.com").is_empty());
        assert!(!is_dns1123_subdomain("-bad.com").is_empty());
        assert!(validate_dns1123_subdomain_name("web-", true).is_empty());
    }

    #[test]
    fn qualified_names() {
        assert!(is_qualified_name("app").is_empty());
        assert!(is_qualified_name("example.com/app").is_empty());
        assert!(!is_qualified_name("/app").is_empty());
        assert!(!is_qualified_name("a/b/c").is_empty());
        assert!(!is_qualified_name("-app").is_empty());
    }

    #[test]
    fn label_values() {
        assert!(is_label_value("").is_empty());
        assert!(is_label_value("v1.2_x").is_empty());
        assert!(!is_label_value("bad value").is_empty());
    }

    #[test]
    fn valid_meta_has_no_errors() {
        let errs = validate_object_meta(&valid(), true, validate_path_segment_name, &meta_path());
        assert!(errs.is_empty(), "{errs}");
    }

    #[test]
    fn missing_name_required() {
        let mut meta = valid();
        meta.name.clear();
        let errs = validate_object_meta(&meta, true, validate_path_segment_name, &meta_path());
        assert_eq!(fields(&errs), vec!["metadata.name"]);
        assert_eq!(errs.as_slice()[0].error_type, ErrorType::Required);

        meta.generate_name = "web-".to_string();
        let errs = validate_object_meta(&meta, true, validate_path_segment_name, &meta_path());
        assert!(errs.is_empty(), "{errs}");
    }

    #[test]
    fn namespace_scope_rules() {
        let mut meta = valid();
        meta.namespace.clear();
        let errs = validate_object_meta(&meta, true, validate_path_segment_name, &meta_path());
        assert_eq!(fields(&errs), vec!["metadata.namespace"]);

        let errs = validate_object_meta(&valid(), false, validate_path_segment_name, &meta_path());
        assert_eq!(errs.as_slice()[0].error_type, ErrorType::Forbidden);
    }

    #[test]
    fn negative_generation_rejected() {
        let meta = valid().with_generation(-1);
        let errs = validate_object_meta(&meta, true, validate_path_segment_name, &meta_path());
        assert_eq!(fields(&errs), vec!["metadata.generation"]);
    }

    #[test]
    fn bad_labels_and_duplicate_finalizers() {
        let mut meta = valid().with_label("app", "bad value");
        meta.finalizers = vec!["example.com/f".into(), "example.com/f".into()];
        let errs = validate_object_meta(&meta, true, validate_path_segment_name, &meta_path());
        assert_eq!(
            fields(&errs),
            vec!["metadata.labels[app]", "metadata.finalizers[1]"]
        );
    }

    #[test]
    fn oversized_annotations_rejected() {
        let mut meta = valid();
        meta.annotations
            .insert("big".into(), "x".repeat(TOTAL_ANNOTATION_SIZE_LIMIT));
        let errs = validate_object_meta(&meta, true, validate_path_segment_name, &meta_path());
        assert_eq!(errs.as_slice()[0].error_type, ErrorType::TooLong);
    }

    #[test]
    fn update_identical_is_clean() {
        let errs = validate_object_meta_update(&valid(), &valid(), &meta_path());
        assert!(errs.is_empty(), "{errs}");
    }

    #[test]
    fn update_detects_immutable_changes() {
        let old = valid().with_creation_timestamp(Time::from_unix(10));
        let mut new = old.clone();
        new.uid = "u2".into();
        new.name = "other".into();
        new.creation_timestamp = Some(Time::from_unix(20));

        let errs = validate_object_meta_update(&new, &old, &meta_path());
        assert_eq!(
            fields(&errs),
            vec!["metadata.name", "metadata.uid", "metadata.creationTimestamp"]
        );
    }

    #[test]
    fn update_requires_resource_version() {
        let mut new = valid();
        new.resource_version.clear();
        let errs = validate_object_meta_update(&new, &valid(), &meta_path());
        assert_eq!(fields(&errs), vec!["metadata.resourceVersion"]);
    }

    #[test]
    fn update_rejects_generation_decrement() {
        let old = valid().with_generation(4);
        let new = valid().with_generation(3);
        let errs = validate_object_meta_update(&new, &old, &meta_path());
        assert_eq!(fields(&errs), vec!["metadata.generation"]);
    }

    #[test]
    fn no_new_finalizers_while_deleting() {
        let mut old = valid();
        old.deletion_timestamp = Some(Time::from_unix(5));
        let mut new = old.clone();
        new.finalizers.push("example.com/late".into());

        let errs = validate_object_meta_update(&new, &old, &meta_path());
        assert_eq!(fields(&errs), vec!["metadata.finalizers[0]"]);
        assert_eq!(errs.as_slice()[0].error_type, ErrorType::Forbidden);
    }

    proptest! {
        #[test]
        fn generated_labels_are_accepted(label in "[a-z0-9]([-a-z0-9]{0,61}[a-z0-9])?") {
            prop_assert!(is_dns1123_label(&label).is_empty());
            prop_assert!(is_dns1123_subdomain(&label).is_empty());
        }

        #[test]
        fn overlong_labels_are_rejected(label in "[a-z]{64,100}") {
            prop_assert!(!is_dns1123_label(&label).is_empty());
        }

        #[test]
        fn path_segment_names_reject_separators(
            head in ".*",
            sep in "[/%]",
            tail in ".*",
            prefix in any::<bool>(),
        ) {
            let name = format!("{head}{sep}{tail}");
            prop_assert!(!validate_path_segment_name(&name, prefix).is_empty());
        }

        #[test]
        fn path_segment_names_without_separators_pass(name in "[a-zA-Z0-9_.:-]{3,40}") {
            prop_assert!(validate_path_segment_name(&name, false).is_empty());
        }

        #[test]
        fn qualified_names_with_prefix_are_accepted(
            prefix in "[a-z0-9]{1,10}(\\.[a-z0-9]{1,10}){0,2}",
            name in "[A-Za-z0-9]([-A-Za-z0-9_.]{0,40}[A-Za-z0-9])?",
        ) {
            let qualified = format!("{prefix}/{name}");
            prop_assert!(is_qualified_name(&qualified).is_empty());
            prop_assert!(is_qualified_name(&name).is_empty());
        }

        #[test]
        fn qualified_names_with_two_slashes_are_rejected(a in "[a-z]{1,8}", b in "[a-z]{1,8}", c in "[a-z]{1,8}") {
            let value = format!("{a}/{b}/{c}");
            prop_assert!(!is_qualified_name(&value).is_empty());
        }
    }
}
