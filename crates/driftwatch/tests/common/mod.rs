//! In-memory catalog for exercising the differ without a database.

#![allow(dead_code)]

use driftwatch::{
    CatalogOperation, CatalogReader, ColumnDescriptor, Error, IndexDescriptor, Result, Side,
};

#[derive(Debug, Clone)]
pub struct FakeTable {
    pub name: String,
    pub columns: Vec<ColumnDescriptor>,
    pub indexes: Vec<IndexDescriptor>,
}

impl FakeTable {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            columns: Vec::new(),
            indexes: Vec::new(),
        }
    }

    pub fn column(mut self, column: ColumnDescriptor) -> Self {
        self.columns.push(column);
        self
    }

    pub fn index(mut self, columns: &[&str], name: &str) -> Self {
        self.indexes
            .push(IndexDescriptor::new(self.name.clone(), name, columns.iter().copied()));
        self
    }

    pub fn unique_index(mut self, columns: &[&str], name: &str) -> Self {
        let index = IndexDescriptor::new(self.name.clone(), name, columns.iter().copied());
        self.indexes.push(index.unique());
        self
    }

    pub fn ddl(&self) -> String {
        let columns: Vec<String> = self
            .columns
            .iter()
            .map(|c| format!("  `{}` {}", c.name, c.column_type))
            .collect();
        format!("CREATE TABLE `{}` (\n{}\n)", self.name, columns.join(",\n"))
    }
}

/// A catalog backed by a list of tables, recording every call it receives.
#[derive(Debug, Clone)]
pub struct FakeCatalog {
    pub side: Side,
    pub tables: Vec<FakeTable>,
    /// Operation that fails when reached.
    pub fail_on: Option<CatalogOperation>,
    pub calls: Vec<CatalogOperation>,
}

impl FakeCatalog {
    pub fn reference(tables: Vec<FakeTable>) -> Self {
        Self::new(Side::Reference, tables)
    }

    pub fn target(tables: Vec<FakeTable>) -> Self {
        Self::new(Side::Target, tables)
    }

    pub fn new(side: Side, tables: Vec<FakeTable>) -> Self {
        Self {
            side,
            tables,
            fail_on: None,
            calls: Vec::new(),
        }
    }

    pub fn failing_on(mut self, operation: CatalogOperation) -> Self {
        self.fail_on = Some(operation);
        self
    }

    fn enter(&mut self, operation: CatalogOperation) -> Result<()> {
        self.calls.push(operation.clone());
        if self.fail_on.as_ref() == Some(&operation) {
            return Err(Error::CatalogQuery {
                side: self.side,
                operation,
                source: sqlx::Error::Protocol("injected failure".to_string()),
            });
        }
        Ok(())
    }

    fn table(&self, name: &str, operation: CatalogOperation) -> Result<&FakeTable> {
        self.tables
            .iter()
            .find(|t| t.name == name)
            .ok_or(Error::CatalogQuery {
                side: self.side,
                operation,
                source: sqlx::Error::RowNotFound,
            })
    }
}

impl CatalogReader for FakeCatalog {
    fn side(&self) -> Side {
        self.side
    }

    async fn list_tables(&mut self) -> Result<Vec<String>> {
        self.enter(CatalogOperation::ListTables)?;
        let mut names: Vec<String> = self.tables.iter().map(|t| t.name.clone()).collect();
        names.sort();
        Ok(names)
    }

    async fn create_statement(&mut self, table: &str) -> Result<String> {
        let operation = CatalogOperation::CreateStatement {
            table: table.to_string(),
        };
        self.enter(operation.clone())?;
        Ok(self.table(table, operation)?.ddl())
    }

    async fn columns(&mut self, table: &str) -> Result<Vec<ColumnDescriptor>> {
        let operation = CatalogOperation::Columns {
            table: table.to_string(),
        };
        self.enter(operation.clone())?;
        Ok(self.table(table, operation)?.columns.clone())
    }

    async fn indexes(&mut self, table: &str) -> Result<Vec<IndexDescriptor>> {
        let operation = CatalogOperation::Indexes {
            table: table.to_string(),
        };
        self.enter(operation.clone())?;
        Ok(self.table(table, operation)?.indexes.clone())
    }
}

pub fn users() -> FakeTable {
    FakeTable::new("users")
        .column(
            ColumnDescriptor::new("id", "bigint")
                .not_null()
                .with_extra("auto_increment"),
        )
        .column(ColumnDescriptor::new("email", "varchar(255)").not_null())
        .column(ColumnDescriptor::new("age", "int(11)").not_null().with_default("0"))
        .unique_index(&["email"], "ux_email")
}

pub fn orders() -> FakeTable {
    FakeTable::new("orders")
        .column(ColumnDescriptor::new("id", "bigint").not_null())
        .column(ColumnDescriptor::new("user_id", "bigint").not_null())
        .column(ColumnDescriptor::new("created_at", "datetime"))
        .index(&["user_id", "created_at"], "ix_user_created")
}
