//! List scopes: equality filters plus pagination, rendered as parameterized SELECT and COUNT.

use crate::error::DbError;
use crate::middleware::Pagination;
use regex::Regex;
use serde_json::Value;
use std::sync::OnceLock;

fn identifier_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*(\.[A-Za-z_][A-Za-z0-9_]*)?$").expect("identifier pattern is valid")
    })
}

/// Quote a (possibly schema-qualified) identifier after checking it is a plain name.
pub fn quote_identifier(name: &str) -> Result<String, DbError> {
    if !identifier_re().is_match(name) {
        return Err(DbError::InvalidIdentifier(name.to_string()));
    }
    Ok(name
        .split('.')
        .map(|part| format!("\"{}\"", part))
        .collect::<Vec<_>>()
        .join("."))
}

/// SQL text plus positional parameters ($1, $2, ...).
#[derive(Clone, Debug, PartialEq)]
pub struct QueryBuf {
    pub sql: String,
    pub params: Vec<Value>,
}

impl QueryBuf {
    fn new() -> Self {
        QueryBuf {
            sql: String::new(),
            params: Vec::new(),
        }
    }

    fn push_param(&mut self, v: Value) -> u32 {
        let n = self.params.len() as u32 + 1;
        self.params.push(v);
        n
    }
}

#[derive(Clone, Debug)]
struct Filter {
    column: String,
    value: Value,
    /// Postgres type the text parameter is cast to.
    cast: Option<&'static str>,
}

/// Equality filters and pagination over one table.
#[derive(Clone, Debug)]
pub struct ListScope {
    table: String,
    filters: Vec<Filter>,
    order_by: Option<String>,
    pagination: Option<Pagination>,
}

impl ListScope {
    pub fn new(table: impl Into<String>) -> Self {
        ListScope {
            table: table.into(),
            filters: Vec::new(),
            order_by: None,
            pagination: None,
        }
    }

    pub fn filter(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filters.push(Filter {
            column: column.into(),
            value: value.into(),
            cast: None,
        });
        self
    }

    /// Equality filter on a `uuid` column; the id is sent as text and cast in SQL.
    pub fn filter_uuid(mut self, column: impl Into<String>, id: uuid::Uuid) -> Self {
        self.filters.push(Filter {
            column: column.into(),
            value: Value::String(id.to_string()),
            cast: Some("uuid"),
        });
        self
    }

    /// Add every key/value pair as an equality filter. Keys are applied in sorted order.
    pub fn filters<I, K>(mut self, pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        let mut pairs: Vec<(String, Value)> = pairs.into_iter().map(|(k, v)| (k.into(), v)).collect();
        pairs.sort_by(|a, b| a.0.cmp(&b.0));
        for (column, value) in pairs {
            self = self.filter(column, value);
        }
        self
    }

    pub fn order_by(mut self, column: impl Into<String>) -> Self {
        self.order_by = Some(column.into());
        self
    }

    pub fn paginate(mut self, pagination: Pagination) -> Self {
        self.pagination = Some(pagination);
        self
    }

    pub fn pagination(&self) -> Option<Pagination> {
        self.pagination
    }

    fn where_clause(&self, q: &mut QueryBuf) -> Result<String, DbError> {
        let mut clause = String::from(" WHERE 1=1");
        for f in &self.filters {
            let column = quote_identifier(&f.column)?;
            let n = q.push_param(f.value.clone());
            match f.cast {
                Some(ty) => clause.push_str(&format!(" AND {} = ${}::{}", column, n, ty)),
                None => clause.push_str(&format!(" AND {} = ${}", column, n)),
            }
        }
        Ok(clause)
    }

    /// `SELECT * ... WHERE 1=1 AND ... [ORDER BY ...] [LIMIT n OFFSET n]`.
    pub fn select(&self) -> Result<QueryBuf, DbError> {
        let mut q = QueryBuf::new();
        let table = quote_identifier(&self.table)?;
        let where_clause = self.where_clause(&mut q)?;
        let order_clause = match &self.order_by {
            Some(col) => format!(" ORDER BY {}", quote_identifier(col)?),
            None => String::new(),
        };
        let page_clause = self
            .pagination
            .map(|p| format!(" LIMIT {} OFFSET {}", p.limit, p.offset))
            .unwrap_or_default();
        q.sql = format!("SELECT * FROM {}{}{}{}", table, where_clause, order_clause, page_clause);
        Ok(q)
    }

    /// `SELECT COUNT(*)` over the same filters, ignoring pagination.
    pub fn count(&self) -> Result<QueryBuf, DbError> {
        let mut q = QueryBuf::new();
        let table = quote_identifier(&self.table)?;
        let where_clause = self.where_clause(&mut q)?;
        q.sql = format!("SELECT COUNT(*) FROM {}{}", table, where_clause);
        Ok(q)
    }
}
