use std::cmp::Ordering;
use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset};
use database_adapter::db::{DbError, Repository, SortKind, SortOrder, json_field_text};
use rust_decimal::Decimal;
use serde::Serialize;
use tokio::sync::RwLock;

/// Process-local repository. Rows keep insertion order, and field lookups
/// go through the item's JSON form so they behave like the Postgres adapter.
#[derive(Debug)]
pub struct InMemoryRepo<T, Id> {
    storage: RwLock<Vec<(Id, T)>>,
    unique_key: Vec<&'static str>,
}

impl<T, Id> InMemoryRepo<T, Id> {
    #[must_use]
    pub fn new() -> Self {
        Self::with_unique_key(&[])
    }

    /// Rows may not share the same (non-null) values for all of `unique_key`.
    #[must_use]
    pub fn with_unique_key(unique_key: &[&'static str]) -> Self {
        Self {
            storage: RwLock::new(Vec::new()),
            unique_key: unique_key.to_vec(),
        }
    }
}

impl<T, Id> Default for InMemoryRepo<T, Id> {
    fn default() -> Self {
        Self::new()
    }
}

fn field_values(item: &impl Serialize, fields: &[&str]) -> Result<Vec<Option<String>>, DbError> {
    let document = serde_json::to_value(item)?;
    Ok(fields
        .iter()
        .map(|field| json_field_text(&document, field))
        .collect())
}

fn compare_field(a: Option<&str>, b: Option<&str>, kind: SortKind) -> Ordering {
    fn nulls_last<V: Ord>(a: Option<V>, b: Option<V>) -> Ordering {
        match (a, b) {
            (Some(a), Some(b)) => a.cmp(&b),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        }
    }

    match kind {
        SortKind::Text => nulls_last(a, b),
        SortKind::Numeric => nulls_last(
            a.and_then(|v| Decimal::from_str(v).ok()),
            b.and_then(|v| Decimal::from_str(v).ok()),
        ),
        SortKind::Timestamp => nulls_last(
            a.and_then(|v| DateTime::<FixedOffset>::parse_from_rfc3339(v).ok()),
            b.and_then(|v| DateTime::<FixedOffset>::parse_from_rfc3339(v).ok()),
        ),
    }
}

impl<T, Id> InMemoryRepo<T, Id>
where
    T: Serialize,
    Id: PartialEq,
{
    fn check_unique(&self, rows: &[(Id, T)], id: &Id, item: &T) -> Result<(), DbError> {
        if self.unique_key.is_empty() {
            return Ok(());
        }
        let key = field_values(item, &self.unique_key)?;
        if key.iter().any(Option::is_none) {
            return Ok(());
        }
        for (other_id, other) in rows {
            if other_id != id && field_values(other, &self.unique_key)? == key {
                return Err(DbError::UniqueViolation(
                    self.unique_key.iter().map(ToString::to_string).collect(),
                ));
            }
        }
        Ok(())
    }
}

#[async_trait]
impl<T, Id> Repository<T, Id> for InMemoryRepo<T, Id>
where
    T: Serialize + Clone + Send + Sync + 'static,
    Id: Clone + PartialEq + ToString + Send + Sync + 'static,
{
    async fn insert(&self, id: Id, item: T) -> Result<(), DbError> {
        let mut rows = self.storage.write().await;
        if rows.iter().any(|(existing, _)| *existing == id) {
            return Err(DbError::UniqueViolation(vec!["id".to_string()]));
        }
        self.check_unique(&rows, &id, &item)?;
        rows.push((id, item));
        Ok(())
    }

    async fn update(&self, id: Id, item: T) -> Result<(), DbError> {
        let mut rows = self.storage.write().await;
        let Some(index) = rows.iter().position(|(existing, _)| *existing == id) else {
            return Err(DbError::NotFound(id.to_string()));
        };
        self.check_unique(&rows, &id, &item)?;
        rows[index].1 = item;
        Ok(())
    }

    async fn remove(&self, id: Id) -> Result<(), DbError> {
        let mut rows = self.storage.write().await;
        let Some(index) = rows.iter().position(|(existing, _)| *existing == id) else {
            return Err(DbError::NotFound(id.to_string()));
        };
        rows.remove(index);
        Ok(())
    }

    async fn get(&self, id: &Id) -> Result<Option<T>, DbError> {
        let rows = self.storage.read().await;
        Ok(rows
            .iter()
            .find(|(existing, _)| existing == id)
            .map(|(_, item)| item.clone()))
    }

    async fn len(&self) -> Result<usize, DbError> {
        Ok(self.storage.read().await.len())
    }

    async fn find_by_fields(&self, filters: &[(&str, &str)]) -> Result<Option<(Id, T)>, DbError> {
        let fields: Vec<&str> = filters.iter().map(|(field, _)| *field).collect();
        let rows = self.storage.read().await;
        for (id, item) in rows.iter() {
            let values = field_values(item, &fields)?;
            let matches = values
                .iter()
                .zip(filters)
                .all(|(actual, (_, expected))| actual.as_deref() == Some(*expected));
            if matches {
                return Ok(Some((id.clone(), item.clone())));
            }
        }
        Ok(None)
    }

    async fn find_all_by_field(
        &self,
        field: &str,
        value: &str,
        sort: Option<&SortOrder>,
    ) -> Result<Vec<(Id, T)>, DbError> {
        let sort_field = sort.map(|s| s.field);
        let rows = self.storage.read().await;

        let mut matches = Vec::new();
        for (id, item) in rows.iter() {
            let document = serde_json::to_value(item)?;
            if json_field_text(&document, field).as_deref() != Some(value) {
                continue;
            }
            let sort_value = sort_field.and_then(|f| json_field_text(&document, f));
            matches.push((sort_value, id.clone(), item.clone()));
        }

        if let Some(sort) = sort {
            // stable: ties keep insertion order
            matches.sort_by(|(a, _, _), (b, _, _)| {
                let ordering = compare_field(a.as_deref(), b.as_deref(), sort.kind);
                match sort.direction {
                    database_adapter::db::SortDirection::Asc => ordering,
                    database_adapter::db::SortDirection::Desc => ordering.reverse(),
                }
            });
        }

        Ok(matches
            .into_iter()
            .map(|(_, id, item)| (id, item))
            .collect())
    }

    async fn remove_all_by_field(&self, field: &str, value: &str) -> Result<u64, DbError> {
        let mut rows = self.storage.write().await;
        let doomed = rows
            .iter()
            .map(|(_, item)| -> Result<bool, DbError> {
                let document = serde_json::to_value(item)?;
                Ok(json_field_text(&document, field).as_deref() == Some(value))
            })
            .collect::<Result<Vec<bool>, DbError>>()?;

        let mut flags = doomed.iter();
        rows.retain(|_| !flags.next().copied().unwrap_or(false));
        Ok(doomed.iter().filter(|d| **d).count() as u64)
    }
}
