//! `find`: entity queries answered from the cache.

use std::sync::Arc;

use serde_json::{json, Value};

use crate::cache::{Cache, CacheError, Entity, FindQuery};
use crate::rpc::{Fault, MethodHandler, Outcome, Params, PassthroughSignal};

/// Fault code reported when the cache backend itself fails.
pub const CACHE_FAULT_CODE: i64 = 102;

pub struct FindHandler {
    cache: Arc<dyn Cache>,
}

impl FindHandler {
    pub fn new(cache: Arc<dyn Cache>) -> Self {
        Self { cache }
    }
}

impl MethodHandler for FindHandler {
    fn call(&self, params: &Params) -> Outcome {
        let query = match FindQuery::from_params(params) {
            Ok(query) => query,
            Err(e) => return declined(e, params),
        };

        let rows = match self.cache.find(&query) {
            Ok(rows) => rows,
            Err(e) => return declined(e, params),
        };

        let entity_count = rows.len();
        let skip = (query.page - 1).saturating_mul(query.per_page);
        let entities: Vec<Value> = rows
            .into_iter()
            .skip(skip)
            .take(query.per_page)
            .map(|row| Value::Object(project(row, &query.return_fields)))
            .collect();

        let mut result = Params::new();
        result.insert("entities".into(), Value::Array(entities));
        result.insert(
            "paging_info".into(),
            json!({
                "entity_count": entity_count,
                "current_page": query.page,
                "entities_per_page": query.per_page,
            }),
        );
        Outcome::Success(result)
    }
}

fn declined(error: CacheError, params: &Params) -> Outcome {
    match error {
        CacheError::Miss(reason) => PassthroughSignal::with_kind("CacheMiss", reason, params).into(),
        CacheError::Unsupported(reason) => {
            PassthroughSignal::with_kind("Unsupported", reason, params).into()
        }
        CacheError::Backend(reason) => Fault::with_kind("CacheFault", CACHE_FAULT_CODE, reason).into(),
    }
}

/// Keep `type`, `id` and the requested fields; unknown fields come back as null.
fn project(mut row: Entity, fields: &[String]) -> Entity {
    let mut out = Entity::new();
    for key in ["type", "id"] {
        if let Some(value) = row.remove(key) {
            out.insert(key.to_string(), value);
        }
    }
    for field in fields {
        if out.contains_key(field) {
            continue;
        }
        let value = row.remove(field).unwrap_or(Value::Null);
        out.insert(field.clone(), value);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{MemoryCache, NullCache};

    struct BrokenCache;

    impl Cache for BrokenCache {
        fn find(&self, _query: &FindQuery) -> Result<Vec<Entity>, CacheError> {
            Err(CacheError::Backend("store offline".into()))
        }
    }

    fn params(value: Value) -> Params {
        match value {
            Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    fn handler() -> FindHandler {
        let cache = MemoryCache::from_json(
            r#"{"Shot": [
                {"id": 1, "code": "sh010", "description": "first"},
                {"id": 2, "code": "sh020", "description": "second"},
                {"id": 3, "code": "sh030", "description": "third"}
            ]}"#,
        )
        .unwrap();
        FindHandler::new(Arc::new(cache))
    }

    #[test]
    fn test_find_projects_fields() {
        let outcome = handler().call(&params(json!({
            "type": "Shot",
            "filters": {"conditions": [{"path": "code", "relation": "is", "values": ["sh020"]}]},
            "return_fields": ["code", "missing"]
        })));

        let result = match outcome {
            Outcome::Success(result) => result,
            other => panic!("expected success, got {other:?}"),
        };
        assert_eq!(
            result["entities"],
            json!([{"type": "Shot", "id": 2, "code": "sh020", "missing": null}])
        );
        assert_eq!(result["paging_info"]["entity_count"], 1);
    }

    #[test]
    fn test_find_pages() {
        let outcome = handler().call(&params(json!({
            "type": "Shot",
            "paging": {"current_page": 2, "entities_per_page": 2}
        })));

        let result = match outcome {
            Outcome::Success(result) => result,
            other => panic!("expected success, got {other:?}"),
        };
        assert_eq!(result["entities"], json!([{"type": "Shot", "id": 3}]));
        assert_eq!(result["paging_info"]["entity_count"], 3);
    }

    #[test]
    fn test_miss_and_unsupported_pass_through() {
        let miss = FindHandler::new(Arc::new(NullCache)).call(&params(json!({"type": "Shot"})));
        match miss {
            Outcome::Forward(signal) => {
                assert_eq!(signal.kind, "CacheMiss");
                assert_eq!(signal.method_params["type"], "Shot");
            }
            other => panic!("expected passthrough, got {other:?}"),
        }

        let unsupported = handler().call(&params(json!({
            "type": "Shot",
            "filters": {"conditions": [{"path": "code", "relation": "starts_with", "values": ["sh"]}]}
        })));
        assert!(matches!(unsupported, Outcome::Forward(ref s) if s.kind == "Unsupported"));
    }

    #[test]
    fn test_backend_failure_is_a_fault() {
        let outcome = FindHandler::new(Arc::new(BrokenCache)).call(&params(json!({"type": "Shot"})));
        match outcome {
            Outcome::Fault(fault) => {
                assert_eq!(fault.code, CACHE_FAULT_CODE);
                assert_eq!(fault.message, "store offline");
            }
            other => panic!("expected fault, got {other:?}"),
        }
    }
}
