//! In-process cache implementations.

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::RwLock;

use serde_json::Value;

use crate::cache::query::{Condition, FindQuery, LogicalOperator};
use crate::cache::{Cache, CacheError, Entity};

/// Cache that never has anything; every lookup is a miss.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullCache;

impl Cache for NullCache {
    fn find(&self, query: &FindQuery) -> Result<Vec<Entity>, CacheError> {
        Err(CacheError::Miss(format!("no local data for {}", query.entity_type)))
    }
}

/// Entity rows held in memory, grouped by entity type and sorted by id.
#[derive(Debug, Default)]
pub struct MemoryCache {
    entities: RwLock<HashMap<String, Vec<Entity>>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed from `{"Shot": [{...}, ...], "Asset": [...]}`.
    pub fn from_json(json: &str) -> Result<Self, CacheError> {
        let seed: HashMap<String, Vec<Entity>> = serde_json::from_str(json)
            .map_err(|e| CacheError::Backend(format!("invalid seed: {e}")))?;

        let cache = Self::new();
        for (entity_type, rows) in seed {
            for mut row in rows {
                row.entry("type")
                    .or_insert_with(|| Value::String(entity_type.clone()));
                cache.insert(row)?;
            }
        }
        Ok(cache)
    }

    /// Seed from a JSON file on disk.
    pub fn load(path: &Path) -> Result<Self, CacheError> {
        let json = fs::read_to_string(path)
            .map_err(|e| CacheError::Backend(format!("{}: {e}", path.display())))?;
        Self::from_json(&json)
    }

    /// Insert or replace one entity. It must carry a string `type` and an integer `id`.
    pub fn insert(&self, entity: Entity) -> Result<(), CacheError> {
        let entity_type = entity
            .get("type")
            .and_then(Value::as_str)
            .ok_or_else(|| CacheError::Backend("entity without a type".into()))?
            .to_string();
        let id = entity_id(&entity)
            .ok_or_else(|| CacheError::Backend(format!("{entity_type} without an integer id")))?;

        let mut entities = self
            .entities
            .write()
            .map_err(|_| CacheError::Backend("cache lock poisoned".into()))?;
        let rows = entities.entry(entity_type).or_default();
        match rows.binary_search_by_key(&id, |row| entity_id(row).unwrap_or_default()) {
            Ok(pos) => rows[pos] = entity,
            Err(pos) => rows.insert(pos, entity),
        }
        Ok(())
    }

    /// Number of cached entities across all types.
    pub fn len(&self) -> usize {
        self.entities
            .read()
            .map(|entities| entities.values().map(Vec::len).sum())
            .unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Cache for MemoryCache {
    fn find(&self, query: &FindQuery) -> Result<Vec<Entity>, CacheError> {
        for condition in &query.conditions {
            check_supported(condition)?;
        }

        let entities = self
            .entities
            .read()
            .map_err(|_| CacheError::Backend("cache lock poisoned".into()))?;
        let rows = entities
            .get(&query.entity_type)
            .ok_or_else(|| CacheError::Miss(format!("no cached {} rows", query.entity_type)))?;

        let matches = rows
            .iter()
            .filter(|row| {
                let mut results = query.conditions.iter().map(|c| condition_matches(row, c));
                match query.operator {
                    LogicalOperator::And => results.all(|hit| hit),
                    LogicalOperator::Or => query.conditions.is_empty() || results.any(|hit| hit),
                }
            })
            .cloned()
            .collect();
        Ok(matches)
    }
}

fn entity_id(entity: &Entity) -> Option<i64> {
    entity.get("id").and_then(Value::as_i64)
}

fn check_supported(condition: &Condition) -> Result<(), CacheError> {
    if condition.path.contains('.') {
        return Err(CacheError::Unsupported(format!(
            "deep filter on {}",
            condition.path
        )));
    }
    match condition.relation.as_str() {
        "is" | "is_not" | "in" | "not_in" => Ok(()),
        other => Err(CacheError::Unsupported(format!("relation {other:?}"))),
    }
}

fn condition_matches(row: &Entity, condition: &Condition) -> bool {
    let field = row.get(&condition.path).unwrap_or(&Value::Null);
    let hit = condition.values.iter().any(|value| values_equal(field, value));
    match condition.relation.as_str() {
        "is" | "in" => hit,
        _ => !hit,
    }
}

/// Entity links compare by type and id; everything else by value.
fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Object(a), Value::Object(b)) if a.contains_key("id") && b.contains_key("id") => {
            a.get("type") == b.get("type") && a.get("id") == b.get("id")
        }
        _ => a == b,
    }
}
