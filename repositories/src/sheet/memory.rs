use crate::sheet::{GatewayError, GatewayResult, Row, SheetGateway, Table};
use error_stack::Report;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// A sheet kept in process memory. Used when no sheet service is configured and in tests.
#[derive(Debug, Clone, Default)]
pub struct MemorySheet {
    tables: Arc<RwLock<HashMap<Table, Vec<Row>>>>,
}

impl MemorySheet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append raw rows, bypassing any encoding. Handy for loading rows written by other tools.
    pub async fn seed<I>(&self, table: Table, rows: I)
    where
        I: IntoIterator<Item = Row>,
    {
        self.tables
            .write()
            .await
            .entry(table)
            .or_default()
            .extend(rows);
    }

    pub async fn snapshot(&self, table: Table) -> Vec<Row> {
        self.tables
            .read()
            .await
            .get(&table)
            .cloned()
            .unwrap_or_default()
    }
}

fn out_of_range(table: Table, row: usize) -> Report<GatewayError> {
    Report::new(GatewayError::Rejected).attach(format!("row {row} does not exist in '{table}'"))
}

impl SheetGateway for MemorySheet {
    async fn read_rows(&self, table: Table) -> GatewayResult<Vec<Row>> {
        Ok(self.snapshot(table).await)
    }

    async fn append_row(&self, table: Table, row: Row) -> GatewayResult<()> {
        self.tables.write().await.entry(table).or_default().push(row);
        Ok(())
    }

    async fn update_cell(
        &self,
        table: Table,
        row: usize,
        column: usize,
        value: String,
    ) -> GatewayResult<()> {
        let mut tables = self.tables.write().await;
        let cells = tables
            .get_mut(&table)
            .and_then(|rows| rows.get_mut(row))
            .ok_or_else(|| out_of_range(table, row))?;

        // sheets grow rows on demand when a cell past the end is written
        if cells.len() <= column {
            cells.resize(column + 1, String::new());
        }
        cells[column] = value;
        Ok(())
    }

    async fn delete_row(&self, table: Table, row: usize) -> GatewayResult<()> {
        let mut tables = self.tables.write().await;
        let rows = tables
            .get_mut(&table)
            .filter(|rows| row < rows.len())
            .ok_or_else(|| out_of_range(table, row))?;
        rows.remove(row);
        Ok(())
    }
}
