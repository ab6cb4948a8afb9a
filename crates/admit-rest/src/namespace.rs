//! Namespace resolution for scoped and cluster-wide resources

use crate::errors::StatusError;
use admit_meta::ObjectMeta;

/// Namespace an object of the given scope must carry for this request
///
/// Cluster-scoped objects never carry a namespace, whatever the request
/// resolved to.
#[inline]
#[must_use]
pub fn expected_namespace_for_scope(request_namespace: &str, namespace_scoped: bool) -> &str {
    if namespace_scoped {
        request_namespace
    } else {
        ""
    }
}

/// Check the object's namespace against the expected one
///
/// An object without a namespace adopts the expected namespace. Any other
/// difference is a [`StatusError::NamespaceConflict`] and the object is left
/// untouched.
pub fn ensure_object_namespace_matches_request_namespace(
    expected: &str,
    meta: &mut ObjectMeta,
) -> Result<(), StatusError> {
    if meta.namespace == expected {
        return Ok(());
    }
    if meta.namespace.is_empty() {
        meta.namespace = expected.to_string();
        return Ok(());
    }
    Err(StatusError::NamespaceConflict {
        object: meta.namespace.clone(),
        request: expected.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scope_decides_expected_namespace() {
        assert_eq!(expected_namespace_for_scope("ns-a", true), "ns-a");
        assert_eq!(expected_namespace_for_scope("ns-a", false), "");
    }

    #[test]
    fn matching_namespace_passes() {
        let mut meta = ObjectMeta::named("ns-a", "x");
        assert!(ensure_object_namespace_matches_request_namespace("ns-a", &mut meta).is_ok());
    }

    #[test]
    fn empty_namespace_adopts_expected() {
        let mut meta = ObjectMeta::named("", "x");
        ensure_object_namespace_matches_request_namespace("ns-a", &mut meta).unwrap();
        assert_eq!(meta.namespace, "ns-a");
    }

    #[test]
    fn mismatch_is_rejected_unmodified() {
        let mut meta = ObjectMeta::named("ns-b", "x");
        let err = ensure_object_namespace_matches_request_namespace("ns-a", &mut meta).unwrap_err();
        assert!(matches!(
            err,
            StatusError::NamespaceConflict { ref object, ref request } if object == "ns-b" && request == "ns-a"
        ));
        assert_eq!(meta.namespace, "ns-b");
    }

    #[test]
    fn cluster_scoped_object_with_namespace_is_rejected() {
        let mut meta = ObjectMeta::named("ns-a", "node-1");
        let expected = expected_namespace_for_scope("ns-a", false);
        assert!(ensure_object_namespace_matches_request_namespace(expected, &mut meta).is_err());
    }
}
