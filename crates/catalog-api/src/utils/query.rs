//! Query strings with repeated keys
//!
//! `Query<T>` cannot collect `?tags=a&tags=b` into a struct field, so listing handlers
//! take the raw pairs and pick values out with [`QueryParams`].

use catalog_core::models::RelationFilter;
use catalog_core::AppError;
use uuid::Uuid;

#[derive(Debug, Clone, Default)]
pub struct QueryParams(Vec<(String, String)>);

impl From<Vec<(String, String)>> for QueryParams {
    fn from(pairs: Vec<(String, String)>) -> Self {
        QueryParams(pairs)
    }
}

impl QueryParams {
    /// First non-blank value, trimmed
    pub fn get(&self, key: &str) -> Option<String> {
        self.0
            .iter()
            .filter(|(k, _)| k == key)
            .map(|(_, v)| v.trim())
            .find(|v| !v.is_empty())
            .map(str::to_string)
    }

    pub fn flag(&self, key: &str) -> bool {
        self.get(key)
            .is_some_and(|v| matches!(v.to_lowercase().as_str(), "true" | "1" | "on"))
    }

    pub fn int(&self, key: &str) -> Result<Option<i64>, AppError> {
        self.get(key)
            .map(|v| {
                v.parse::<i64>()
                    .map_err(|_| AppError::InvalidInput(format!("Invalid {}: {}", key, v)))
            })
            .transpose()
    }

    pub fn uuid(&self, key: &str) -> Result<Option<Uuid>, AppError> {
        self.get(key).map(|v| parse_uuid(key, &v)).transpose()
    }

    /// Every value of a repeated id parameter; blank values are skipped
    pub fn uuids(&self, key: &str) -> Result<Vec<Uuid>, AppError> {
        self.0
            .iter()
            .filter(|(k, _)| k == key)
            .map(|(_, v)| v.trim())
            .filter(|v| !v.is_empty())
            .map(|v| parse_uuid(key, v))
            .collect()
    }

    /// `none` selects rows without the relation, an id selects that one
    pub fn relation(&self, key: &str) -> Result<RelationFilter, AppError> {
        match self.get(key) {
            None => Ok(RelationFilter::Any),
            Some(v) if v.eq_ignore_ascii_case("none") => Ok(RelationFilter::Missing),
            Some(v) => parse_uuid(key, &v).map(RelationFilter::Is),
        }
    }
}

fn parse_uuid(key: &str, value: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(value).map_err(|_| AppError::InvalidInput(format!("Invalid {}: {}", key, value)))
}
