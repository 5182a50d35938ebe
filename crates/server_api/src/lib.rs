use std::{fmt, sync::Arc};

use chrono::NaiveDate;
use shared::{
    domain::{OrderInput, OrderRow, RowIndex, Table, COLUMNS},
    error::SyncError,
    protocol::OrderForm,
};
use storage::TableStore;
use tracing::{debug, error, info, warn};

pub const EMPTY_TABLE_MESSAGE: &str = "No orders have been entered yet.";

#[derive(Clone)]
pub struct SyncContext {
    pub store: Arc<dyn TableStore>,
}

impl SyncContext {
    pub fn new(store: Arc<dyn TableStore>) -> Self {
        Self { store }
    }
}

/// The mutation a single interaction asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Append(OrderForm),
    Delete(RowIndex),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleState {
    Idle,
    Loading,
    LoadError,
    Loaded,
    Appending,
    Deleting,
    Reloading,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    Saved { item: String },
    Deleted { index: RowIndex },
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Saved { item } => write!(f, "{item} order saved"),
            Self::Deleted { index } => write!(f, "Row {} deleted", index.0),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// The table could not be read; nothing else happened this cycle.
    LoadFailed { error: SyncError },
    /// No mutation was written. `warning` and `form` are set when the
    /// interaction was rejected by validation.
    Rendered {
        table: Table,
        warning: Option<SyncError>,
        form: Option<OrderForm>,
    },
    /// The store accepted the overwrite. The caller must reload from the
    /// store before showing the table again.
    Mutated { notice: Notice },
    /// The store rejected the overwrite. `table` is the snapshot loaded at
    /// the start of the cycle.
    WriteFailed {
        table: Table,
        error: SyncError,
        form: Option<OrderForm>,
    },
}

impl CycleOutcome {
    pub fn final_state(&self) -> CycleState {
        match self {
            Self::LoadFailed { .. } => CycleState::LoadError,
            Self::Mutated { .. } => CycleState::Reloading,
            Self::Rendered { .. } | Self::WriteFailed { .. } => CycleState::Idle,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowView {
    pub index: RowIndex,
    pub cells: [String; 9],
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableView {
    Empty {
        message: &'static str,
    },
    Rows {
        columns: [&'static str; 9],
        rows: Vec<RowView>,
        /// Options for the delete selector, re-derived on every render.
        selectable: Vec<RowIndex>,
    },
}

pub async fn load(ctx: &SyncContext) -> Result<Table, SyncError> {
    match ctx.store.read().await {
        Ok(table) => {
            debug!(rows = table.len(), "loaded orders");
            Ok(table)
        }
        Err(err) => {
            error!(error = %format!("{err:#}"), "failed to load orders");
            Err(SyncError::connection(format!("{err:#}")))
        }
    }
}

/// Builds the table that results from appending `input`, dated `today`.
pub fn append_row(
    table: &Table,
    input: OrderInput,
    today: NaiveDate,
) -> Result<Table, SyncError> {
    if !input.missing_required().is_empty() {
        return Err(SyncError::validation(
            "Site name and item are required fields.",
        ));
    }
    Ok(table.appended(OrderRow::from_input(input, today)))
}

pub fn delete_row(table: &Table, index: RowIndex) -> Result<Table, SyncError> {
    table.without(index).ok_or_else(|| {
        SyncError::validation(format!(
            "Row {} no longer exists; the table has {} rows.",
            index.0,
            table.len()
        ))
    })
}

pub async fn append(
    ctx: &SyncContext,
    table: &Table,
    input: OrderInput,
    today: NaiveDate,
) -> Result<Notice, SyncError> {
    let item = input.item.trim().to_string();
    let updated = append_row(table, input, today)?;
    overwrite(ctx, &updated).await?;
    info!(%item, rows = updated.len(), "appended order");
    Ok(Notice::Saved { item })
}

pub async fn delete(
    ctx: &SyncContext,
    table: &Table,
    index: RowIndex,
) -> Result<Notice, SyncError> {
    let updated = delete_row(table, index)?;
    overwrite(ctx, &updated).await?;
    info!(index = index.0, rows = updated.len(), "deleted order");
    Ok(Notice::Deleted { index })
}

async fn overwrite(ctx: &SyncContext, table: &Table) -> Result<(), SyncError> {
    ctx.store.update(table).await.map_err(|err| {
        error!(error = %format!("{err:#}"), rows = table.len(), "failed to overwrite orders");
        SyncError::write(format!("{err:#}"))
    })
}

pub fn render(table: &Table) -> TableView {
    if table.is_empty() {
        return TableView::Empty {
            message: EMPTY_TABLE_MESSAGE,
        };
    }
    TableView::Rows {
        columns: COLUMNS,
        rows: table
            .rows()
            .iter()
            .enumerate()
            .map(|(index, row)| RowView {
                index: RowIndex(index),
                cells: row.to_cells(),
            })
            .collect(),
        selectable: table.indices().map(RowIndex).collect(),
    }
}

fn transition(from: CycleState, to: CycleState) -> CycleState {
    debug!(?from, ?to, "cycle transition");
    to
}

/// Runs one interaction: load, then at most one mutation.
///
/// A failed load ends the cycle before `action` is looked at.
pub async fn run_cycle(
    ctx: &SyncContext,
    action: Option<Action>,
    today: NaiveDate,
) -> CycleOutcome {
    let state = transition(CycleState::Idle, CycleState::Loading);
    let table = match load(ctx).await {
        Ok(table) => table,
        Err(error) => {
            transition(state, CycleState::LoadError);
            return CycleOutcome::LoadFailed { error };
        }
    };
    let state = transition(state, CycleState::Loaded);

    let Some(action) = action else {
        transition(state, CycleState::Idle);
        return CycleOutcome::Rendered {
            table,
            warning: None,
            form: None,
        };
    };

    let (state, result, form) = match action {
        Action::Append(form) => {
            let state = transition(state, CycleState::Appending);
            let result = match form.to_input(today) {
                Ok(input) => append(ctx, &table, input, today).await,
                Err(err) => Err(err),
            };
            (state, result, Some(form))
        }
        Action::Delete(index) => {
            let state = transition(state, CycleState::Deleting);
            (state, delete(ctx, &table, index).await, None)
        }
    };

    match result {
        Ok(notice) => {
            transition(state, CycleState::Reloading);
            CycleOutcome::Mutated { notice }
        }
        Err(warning @ SyncError::Validation { .. }) => {
            warn!(code = ?warning.code(), %warning, "interaction rejected");
            transition(state, CycleState::Idle);
            CycleOutcome::Rendered {
                table,
                warning: Some(warning),
                form,
            }
        }
        Err(error) => {
            warn!(code = ?error.code(), %error, "interaction failed");
            transition(state, CycleState::Idle);
            CycleOutcome::WriteFailed { table, error, form }
        }
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
