//! Supporting records referenced by a claim payload

use crate::api::{ResourceKind, ResourceRegistry};
use futures::future::join_all;
use serde_json::Value;

/// Make sure the patient, provider and practitioner a payload refers to
/// exist before the claim is submitted.
///
/// Calls run concurrently. Individual failures are logged and tolerated.
/// Returns how many resources were ensured.
pub async fn ensure_related(registry: &dyn ResourceRegistry, payload: &Value) -> usize {
    let pending = ResourceKind::ALL.into_iter().filter_map(|kind| {
        payload
            .get(kind.payload_key())
            .filter(|resource| resource.is_object())
            .map(|resource| async move { (kind, registry.ensure_resource(kind, resource).await) })
    });

    let mut ensured = 0;
    for (kind, result) in join_all(pending).await {
        match result {
            Ok(()) => ensured += 1,
            Err(e) => tracing::warn!("Could not ensure {} resource: {}", kind, e),
        }
    }

    ensured
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedApi;
    use serde_json::json;

    #[tokio::test]
    async fn test_ensures_present_resources() {
        let api = ScriptedApi::new();
        let payload = json!({
            "patient": {"id": "pat-1"},
            "provider": {"id": "org-1"},
            "practitioner": "not an object",
            "total": 10
        });

        assert_eq!(ensure_related(&api, &payload).await, 2);

        let kinds: Vec<_> = api.resources().into_iter().map(|(k, _)| k).collect();
        assert!(kinds.contains(&ResourceKind::Patient));
        assert!(kinds.contains(&ResourceKind::Organization));
        assert!(!kinds.contains(&ResourceKind::Practitioner));
    }

    #[tokio::test]
    async fn test_tolerates_individual_failures() {
        let api = ScriptedApi::new();
        api.fail_resource(ResourceKind::Patient);
        let payload = json!({
            "patient": {"id": "pat-1"},
            "provider": {"id": "org-1"},
            "practitioner": {"id": "pr-1"}
        });

        assert_eq!(ensure_related(&api, &payload).await, 2);
        assert_eq!(api.resources().len(), 2);
    }
}
