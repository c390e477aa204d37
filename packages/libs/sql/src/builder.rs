//! CRUD statement builders
//!
//! Each builder takes a table name and a projection and produces a
//! [`Statement`] whose `$n` placeholders line up with its bound values.
//! Table names are emitted as given so schema-qualified names keep working;
//! column names always go through [`quote_ident`].

use tk_core::{Error, Filter, IdKey, Operation, Page, Payload, Result, Value};

use crate::codec::{encode, placeholder, quote_ident};
use crate::statement::Statement;

/// Projection used when a table has no explicit column list
pub const DEFAULT_PROJECTION: &str = "*";

/// SELECT builder
pub struct SelectBuilder<'a> {
    table: &'a str,
    projection: &'a str,
}

impl<'a> SelectBuilder<'a> {
    pub fn new(table: &'a str, projection: &'a str) -> Self {
        Self { table, projection }
    }

    /// `select <projection> from <table>` with an optional page window
    pub fn all(&self, page: Option<Page>) -> Statement {
        let mut sql = self.base();
        push_page(&mut sql, page);
        Statement::text(sql)
    }

    /// Filtered select.
    ///
    /// Null-valued fields compile to `is null` and bind nothing; the remaining
    /// fields are renumbered so placeholders stay contiguous. An empty filter
    /// is the unfiltered select.
    pub fn filtered(&self, filter: &Filter, page: Option<Page>) -> Statement {
        let encoded = encode(filter);
        if encoded.is_empty() {
            return self.all(page);
        }

        let mut clauses = Vec::with_capacity(encoded.len());
        let mut params = Vec::with_capacity(encoded.len());
        for (column, value) in encoded.columns.iter().zip(encoded.values) {
            if value.is_null() {
                clauses.push(format!("{} is null", column));
            } else {
                clauses.push(format!("{} = {}", column, placeholder(params.len() + 1)));
                params.push(value);
            }
        }

        let mut sql = format!("{} where {}", self.base(), clauses.join(" and "));
        push_page(&mut sql, page);
        Statement::new(sql, params)
    }

    /// Caller-supplied predicate, for shapes the filter compiler cannot
    /// express (ranges, `in`, `or`). Values are bound as given.
    pub fn raw_where(&self, where_clause: &str, values: Vec<Value>) -> Statement {
        Statement::new(format!("{} where {}", self.base(), where_clause), values)
    }

    fn base(&self) -> String {
        format!("select {} from {}", self.projection, self.table)
    }
}

/// INSERT builder
pub struct InsertBuilder<'a> {
    table: &'a str,
    projection: &'a str,
}

impl<'a> InsertBuilder<'a> {
    pub fn new(table: &'a str, projection: &'a str) -> Self {
        Self { table, projection }
    }

    /// `insert into <table> (<columns>) values (<placeholders>) returning <projection>`
    pub fn build(&self, payload: &Payload) -> Result<Statement> {
        let encoded = encode(payload);
        if encoded.is_empty() {
            return Err(Error::EmptyPayload {
                table: self.table.to_string(),
                operation: Operation::Insert,
            });
        }

        let sql = format!(
            "insert into {} ({}) values ({}) returning {}",
            self.table,
            encoded.columns.join(","),
            encoded.placeholders.join(","),
            self.projection
        );
        Ok(Statement::new(sql, encoded.values))
    }
}

/// UPDATE builder
pub struct UpdateBuilder<'a> {
    table: &'a str,
    projection: &'a str,
}

impl<'a> UpdateBuilder<'a> {
    pub fn new(table: &'a str, projection: &'a str) -> Self {
        Self { table, projection }
    }

    /// `update <table> set "a" = $1, ... where <key> = $n returning <projection>`
    ///
    /// The key value is always the last bound parameter.
    pub fn build(&self, key: &IdKey, payload: &Payload) -> Result<Statement> {
        let encoded = encode(payload);
        if encoded.is_empty() {
            return Err(Error::EmptyPayload {
                table: self.table.to_string(),
                operation: Operation::Update,
            });
        }

        let assignments = encoded
            .columns
            .iter()
            .zip(&encoded.placeholders)
            .map(|(column, bind)| format!("{} = {}", column, bind))
            .collect::<Vec<_>>()
            .join(", ");

        let mut params = encoded.values;
        params.push(key.value.clone());

        let sql = format!(
            "update {} set {} where {} = {} returning {}",
            self.table,
            assignments,
            quote_ident(&key.column),
            placeholder(params.len()),
            self.projection
        );
        Ok(Statement::new(sql, params))
    }
}

/// DELETE builder
pub struct DeleteBuilder<'a> {
    table: &'a str,
}

impl<'a> DeleteBuilder<'a> {
    pub fn new(table: &'a str) -> Self {
        Self { table }
    }

    /// `delete from <table> where <key> = $1`
    pub fn build(&self, key: &IdKey) -> Statement {
        let sql = format!(
            "delete from {} where {} = {}",
            self.table,
            quote_ident(&key.column),
            placeholder(1)
        );
        Statement::new(sql, vec![key.value.clone()])
    }
}

fn push_page(sql: &mut String, page: Option<Page>) {
    if let Some(page) = page.filter(Page::is_active) {
        sql.push_str(&format!(" offset {} limit {}", page.offset(), page.limit()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tk_core::{payload, Identifier};

    #[test]
    fn test_select_all() {
        let stmt = SelectBuilder::new("test", DEFAULT_PROJECTION).all(None);
        assert_eq!(stmt.sql, "select * from test");
        assert!(stmt.params.is_empty());
    }

    #[test]
    fn test_select_all_paged() {
        let builder = SelectBuilder::new("test", DEFAULT_PROJECTION);

        let stmt = builder.all(Some(Page::new(10, 2)));
        assert_eq!(stmt.sql, "select * from test offset 10 limit 10");

        let stmt = builder.all(Some(Page::new(10, 1)));
        assert_eq!(stmt.sql, "select * from test offset 0 limit 10");

        let stmt = builder.all(Some(Page::new(10, 0)));
        assert_eq!(stmt.sql, "select * from test");
    }

    #[test]
    fn test_select_filter_null_only() {
        let stmt = SelectBuilder::new("test", "*").filtered(&payload! { "stringCol" => Value::Null }, None);
        assert_eq!(stmt.sql, "select * from test where \"stringCol\" is null");
        assert!(stmt.params.is_empty());
    }

    #[test]
    fn test_select_filter_renumbers_around_nulls() {
        let filter = payload! {
            "a" => 1,
            "stringCol" => Value::Null,
            "b" => "",
            "integerCol" => 2,
        };
        let stmt = SelectBuilder::new("test", "*").filtered(&filter, Some(Page::new(5, 3)));

        assert_eq!(
            stmt.sql,
            "select * from test where \"a\" = $1 and \"stringCol\" is null and \"b\" is null \
             and \"integerCol\" = $2 offset 10 limit 5"
        );
        assert_eq!(stmt.params, vec![Value::Int(1), Value::Int(2)]);
    }

    #[test]
    fn test_select_empty_filter_is_unfiltered() {
        let stmt = SelectBuilder::new("test", "*").filtered(&Payload::new(), Some(Page::new(2, 2)));
        assert_eq!(stmt.sql, "select * from test offset 2 limit 2");
    }

    #[test]
    fn test_select_raw_where() {
        let stmt = SelectBuilder::new("test", "\"id\"")
            .raw_where("\"integerCol\" > $1 or \"stringCol\" = $2", vec![Value::Int(1), "x".into()]);
        assert_eq!(
            stmt.sql,
            "select \"id\" from test where \"integerCol\" > $1 or \"stringCol\" = $2"
        );
        assert_eq!(stmt.params.len(), 2);
    }

    #[test]
    fn test_insert() {
        let stmt = InsertBuilder::new("timestamps", "*")
            .build(&payload! { "id" => 10, "validFrom" => f64::INFINITY, "label" => "" })
            .unwrap();

        assert_eq!(
            stmt.sql,
            "insert into timestamps (\"id\",\"validFrom\",\"label\") \
             values ($1,$2,$3) returning *"
        );
        assert_eq!(stmt.params, vec![Value::Int(10), Value::Infinity, Value::Null]);
    }

    #[test]
    fn test_insert_empty_payload_rejected() {
        let err = InsertBuilder::new("test", "*").build(&Payload::new()).unwrap_err();
        assert!(matches!(
            err,
            Error::EmptyPayload {
                operation: Operation::Insert,
                ..
            }
        ));
    }

    #[test]
    fn test_update_binds_key_last() {
        let key = Identifier::from(7).resolve().unwrap();
        let stmt = UpdateBuilder::new("test", "*")
            .build(&key, &payload! { "stringCol" => "x", "integerCol" => 3 })
            .unwrap();

        assert_eq!(
            stmt.sql,
            "update test set \"stringCol\" = $1, \"integerCol\" = $2 where \"id\" = $3 returning *"
        );
        assert_eq!(
            stmt.params,
            vec![Value::Text("x".to_string()), Value::Int(3), Value::Int(7)]
        );
    }

    #[test]
    fn test_update_with_keyed_identifier() {
        let key = Identifier::from(payload! { "code" => "k1" }).resolve().unwrap();
        let stmt = UpdateBuilder::new("items", "\"code\"")
            .build(&key, &payload! { "qty" => 1 })
            .unwrap();
        assert_eq!(
            stmt.sql,
            "update items set \"qty\" = $1 where \"code\" = $2 returning \"code\""
        );
    }

    #[test]
    fn test_update_empty_payload_rejected() {
        let key = Identifier::from(1).resolve().unwrap();
        let err = UpdateBuilder::new("test", "*").build(&key, &Payload::new()).unwrap_err();
        assert_eq!(err.code(), "EMPTY_PAYLOAD");
    }

    #[test]
    fn test_delete_scalar_and_keyed_resolve_identically() {
        let builder = DeleteBuilder::new("timestamps");

        let by_scalar = builder.build(&Identifier::from(1).resolve().unwrap());
        let by_keyed = builder.build(
            &Identifier::from(payload! { "id" => 1, "test" => 3 })
                .resolve()
                .unwrap(),
        );

        assert_eq!(by_scalar.sql, "delete from timestamps where \"id\" = $1");
        assert_eq!(by_scalar, by_keyed);
    }
}
