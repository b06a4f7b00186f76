//! Typed view of `find` method params.

use serde::Deserialize;
use serde_json::Value;

use crate::cache::CacheError;
use crate::rpc::Params;

/// Page size used when the caller does not send one.
pub const DEFAULT_ENTITIES_PER_PAGE: usize = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogicalOperator {
    #[default]
    And,
    Or,
}

/// A single `{path, relation, values}` filter.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Condition {
    pub path: String,
    pub relation: String,
    #[serde(default)]
    pub values: Vec<Value>,
}

#[derive(Debug, Default, Deserialize)]
struct RawFilters {
    #[serde(default)]
    logical_operator: LogicalOperator,
    #[serde(default)]
    conditions: Vec<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct RawPaging {
    current_page: usize,
    entities_per_page: usize,
}

impl Default for RawPaging {
    fn default() -> Self {
        Self {
            current_page: 1,
            entities_per_page: DEFAULT_ENTITIES_PER_PAGE,
        }
    }
}

/// A flat `find` request the cache can evaluate.
#[derive(Debug, Clone, PartialEq)]
pub struct FindQuery {
    pub entity_type: String,
    pub operator: LogicalOperator,
    pub conditions: Vec<Condition>,
    pub return_fields: Vec<String>,
    /// 1-based page number.
    pub page: usize,
    pub per_page: usize,
}

impl FindQuery {
    /// Build a query from raw method params.
    ///
    /// Shapes the cache does not model (nested filter groups, sorts,
    /// retired-only searches) are reported as `Unsupported`.
    pub fn from_params(params: &Params) -> Result<Self, CacheError> {
        let entity_type = params
            .get("type")
            .and_then(Value::as_str)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| CacheError::Unsupported("missing entity type".into()))?
            .to_string();

        if params
            .get("sorts")
            .and_then(Value::as_array)
            .is_some_and(|sorts| !sorts.is_empty())
        {
            return Err(CacheError::Unsupported("sorts".into()));
        }

        if let Some(return_only) = params.get("return_only").and_then(Value::as_str) {
            if return_only != "active" {
                return Err(CacheError::Unsupported(format!("return_only={return_only}")));
            }
        }

        let filters: RawFilters = parse_field(params, "filters")?;
        let conditions = filters
            .conditions
            .into_iter()
            .map(|raw| {
                if raw.get("conditions").is_some() {
                    return Err(CacheError::Unsupported("nested filter group".into()));
                }
                serde_json::from_value::<Condition>(raw)
                    .map_err(|e| CacheError::Unsupported(format!("filter shape: {e}")))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let return_fields: Vec<String> = parse_field(params, "return_fields")?;
        let paging: RawPaging = parse_field(params, "paging")?;

        Ok(Self {
            entity_type,
            operator: filters.logical_operator,
            conditions,
            return_fields,
            page: paging.current_page.max(1),
            per_page: paging.entities_per_page.max(1),
        })
    }
}

fn parse_field<T>(params: &Params, key: &str) -> Result<T, CacheError>
where
    T: Default + for<'de> Deserialize<'de>,
{
    match params.get(key) {
        None | Some(Value::Null) => Ok(T::default()),
        Some(value) => serde_json::from_value(value.clone())
            .map_err(|e| CacheError::Unsupported(format!("{key}: {e}"))),
    }
}
