//! Table factories
//!
//! A [`Context`](crate::Context) builds its table handles through a factory,
//! so swapping the factory is how specialized handles get wired in.

use std::collections::HashMap;
use std::sync::Arc;

use crate::connection::Connection;
use crate::table::Table;

pub trait TableFactory: Send + Sync {
    fn create(&self, table_name: &str, connection: Arc<dyn Connection>) -> Table;
}

/// Plain handles: default projection, no converters.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultTableFactory;

impl TableFactory for DefaultTableFactory {
    fn create(&self, table_name: &str, connection: Arc<dyn Connection>) -> Table {
        Table::new(table_name, connection)
    }
}

type Customizer = Arc<dyn Fn(Table) -> Table + Send + Sync>;

/// Default handles, customized per table name.
///
/// ```ignore
/// let factory = CustomTableFactory::new()
///     .with_table("orders", |t| t.with_inbound(ModifiedAtStamp::default()));
/// ```
#[derive(Clone, Default)]
pub struct CustomTableFactory {
    customizers: HashMap<String, Customizer>,
}

impl CustomTableFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_table(
        mut self,
        table_name: impl Into<String>,
        customize: impl Fn(Table) -> Table + Send + Sync + 'static,
    ) -> Self {
        self.customizers.insert(table_name.into(), Arc::new(customize));
        self
    }
}

impl TableFactory for CustomTableFactory {
    fn create(&self, table_name: &str, connection: Arc<dyn Connection>) -> Table {
        let table = Table::new(table_name, connection);
        match self.customizers.get(table_name) {
            Some(customize) => customize(table),
            None => table,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::converter::ModifiedAtStamp;
    use crate::testing::{record, MockConnection};
    use serde_json::json;
    use tk_core::{payload, Value};

    #[tokio::test]
    async fn test_custom_factory_applies_per_table() {
        let conn = MockConnection::new().with_rows(vec![record(json!({ "id": 1 }))]);
        let factory = CustomTableFactory::new()
            .with_table("orders", |t| t.with_inbound(ModifiedAtStamp::default()));

        let orders = factory.create("orders", Arc::new(conn.clone()));
        orders.update(1, payload! { "qty" => 2 }, true).await.unwrap();
        let stmt = conn.last_statement();
        assert_eq!(
            stmt.sql,
            "update orders set \"qty\" = $1, \"modifiedAt\" = $2 where \"id\" = $3 returning *"
        );
        assert!(matches!(stmt.params[1], Value::Timestamp(_)));

        let items = factory.create("items", Arc::new(conn.clone()));
        items.update(1, payload! { "qty" => 2 }, true).await.unwrap();
        assert_eq!(
            conn.last_statement().sql,
            "update items set \"qty\" = $1 where \"id\" = $2 returning *"
        );
    }

    #[test]
    fn test_default_factory() {
        let table = DefaultTableFactory.create("test", Arc::new(MockConnection::new()));
        assert_eq!(table.name(), "test");
        assert_eq!(table.projection(), "*");
    }
}
