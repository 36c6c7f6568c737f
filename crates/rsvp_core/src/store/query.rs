//! Query options accepted by entity store reads.
//!
//! Column names are written by the caller as plain SQL identifiers. The store
//! qualifies its own selected columns with the entity table, so filters and
//! orderings only need qualifying when a join introduces a clash.

use crate::model::entity::Entity;
use rusqlite::types::Value;

/// Row predicate rendered into a `WHERE` clause with positional parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    sql: String,
    params: Vec<Value>,
}

impl Filter {
    /// `column = value`
    pub fn eq(column: &str, value: impl Into<Value>) -> Self {
        Self {
            sql: format!("{column} = ?"),
            params: vec![value.into()],
        }
    }

    /// Case-insensitive equality for text columns.
    pub fn eq_ignore_case(column: &str, value: impl Into<String>) -> Self {
        Self {
            sql: format!("{column} = ? COLLATE NOCASE"),
            params: vec![Value::Text(value.into())],
        }
    }

    pub fn is_null(column: &str) -> Self {
        Self {
            sql: format!("{column} IS NULL"),
            params: Vec::new(),
        }
    }

    pub fn is_not_null(column: &str) -> Self {
        Self {
            sql: format!("{column} IS NOT NULL"),
            params: Vec::new(),
        }
    }

    /// Arbitrary SQL predicate using `?` placeholders bound from `params`.
    pub fn raw(sql: impl Into<String>, params: Vec<Value>) -> Self {
        Self {
            sql: sql.into(),
            params,
        }
    }

    pub fn and(mut self, other: Filter) -> Self {
        self.sql = format!("({}) AND ({})", self.sql, other.sql);
        self.params.extend(other.params);
        self
    }

    pub fn or(mut self, other: Filter) -> Self {
        self.sql = format!("({}) OR ({})", self.sql, other.sql);
        self.params.extend(other.params);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

impl Direction {
    fn as_sql(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBy {
    pub column: String,
    pub direction: Direction,
}

/// Related table brought into a read, e.g.
/// `LEFT JOIN responses AS companion ON companion.id = responses.plus_one_id`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Include {
    clause: String,
}

impl Include {
    pub fn new(clause: impl Into<String>) -> Self {
        Self {
            clause: clause.into(),
        }
    }
}

/// Options for [`EntityStore::find`](super::EntityStore::find) and
/// [`EntityStore::list`](super::EntityStore::list).
///
/// The default lists every row in store order and overlays this session's
/// staged changes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListOptions {
    pub filter: Option<Filter>,
    pub order_by: Vec<OrderBy>,
    pub includes: Vec<Include>,
    /// Read committed state only, ignoring staged changes.
    pub no_tracking: bool,
    pub distinct: bool,
}

impl ListOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn order_by(mut self, column: impl Into<String>, direction: Direction) -> Self {
        self.order_by.push(OrderBy {
            column: column.into(),
            direction,
        });
        self
    }

    pub fn include(mut self, include: Include) -> Self {
        self.includes.push(include);
        self
    }

    pub fn no_tracking(mut self) -> Self {
        self.no_tracking = true;
        self
    }

    pub fn distinct(mut self) -> Self {
        self.distinct = true;
        self
    }
}

/// Renders a `SELECT` for `T` and returns it with its bound parameters.
pub(crate) fn select_sql<T: Entity>(
    options: &ListOptions,
    limit: Option<u32>,
) -> (String, Vec<Value>) {
    let columns = T::COLUMNS
        .iter()
        .map(|column| format!("{}.{column}", T::TABLE))
        .collect::<Vec<_>>()
        .join(", ");

    let mut sql = String::from("SELECT ");
    if options.distinct {
        sql.push_str("DISTINCT ");
    }
    sql.push_str(&columns);
    sql.push_str(" FROM ");
    sql.push_str(T::TABLE);

    for include in &options.includes {
        sql.push(' ');
        sql.push_str(&include.clause);
    }

    let mut params = Vec::new();
    if let Some(filter) = options.filter.as_ref() {
        sql.push_str(" WHERE ");
        sql.push_str(&filter.sql);
        params.extend(filter.params.iter().cloned());
    }

    if !options.order_by.is_empty() {
        let ordering = options
            .order_by
            .iter()
            .map(|order| format!("{} {}", order.column, order.direction.as_sql()))
            .collect::<Vec<_>>()
            .join(", ");
        sql.push_str(" ORDER BY ");
        sql.push_str(&ordering);
    }

    if let Some(limit) = limit {
        sql.push_str(" LIMIT ?");
        params.push(Value::Integer(i64::from(limit)));
    }

    (sql, params)
}

#[cfg(test)]
mod tests {
    use super::{select_sql, Direction, Filter, Include, ListOptions};
    use crate::model::response::Response;
    use rusqlite::types::Value;

    #[test]
    fn default_options_select_every_column_without_clauses() {
        let (sql, params) = select_sql::<Response>(&ListOptions::default(), None);
        assert!(sql.starts_with("SELECT responses.id, responses.first_name"));
        assert!(sql.ends_with("FROM responses"));
        assert!(params.is_empty());
    }

    #[test]
    fn clauses_render_in_sql_order() {
        let options = ListOptions::new()
            .filter(Filter::eq("responses.is_attending", true).and(Filter::is_null("note")))
            .include(Include::new(
                "LEFT JOIN responses AS companion ON companion.id = responses.plus_one_id",
            ))
            .order_by("last_name", Direction::Asc)
            .order_by("created_at", Direction::Desc)
            .distinct();

        let (sql, params) = select_sql::<Response>(&options, Some(1));
        assert!(sql.starts_with("SELECT DISTINCT "));
        let join = sql.find("LEFT JOIN").expect("join clause");
        let filter = sql
            .find(" WHERE (responses.is_attending = ?) AND (note IS NULL)")
            .expect("where clause");
        let order = sql
            .find(" ORDER BY last_name ASC, created_at DESC")
            .expect("order clause");
        assert!(join < filter && filter < order);
        assert!(sql.ends_with(" LIMIT ?"));
        assert_eq!(params, vec![Value::Integer(1), Value::Integer(1)]);
    }

    #[test]
    fn or_keeps_parameter_order() {
        let filter = Filter::eq("email", "a@example.com".to_string())
            .or(Filter::eq_ignore_case("last_name", "smith"));
        let (sql, params) = select_sql::<Response>(&ListOptions::new().filter(filter), None);
        assert!(sql.contains("(email = ?) OR (last_name = ? COLLATE NOCASE)"));
        assert_eq!(
            params,
            vec![
                Value::Text("a@example.com".to_string()),
                Value::Text("smith".to_string())
            ]
        );
    }
}
