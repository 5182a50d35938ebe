use std::ops::Range;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::RowDecodeError;

/// Dates cross every store boundary in this format.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

pub const COLUMNS: [&str; 9] = [
    "order_date",
    "site_name",
    "address",
    "company",
    "manager",
    "phone",
    "item",
    "quantity",
    "delivery_date",
];

pub const MIN_QUANTITY: u32 = 1;

/// Zero-based position of a row in the table it was rendered from.
///
/// Not a stable identifier: it is only meaningful against the table that was
/// loaded in the same cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RowIndex(pub usize);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderInput {
    pub site_name: String,
    pub address: String,
    pub company: String,
    pub manager: String,
    pub phone: String,
    pub item: String,
    pub quantity: u32,
    pub delivery_date: NaiveDate,
}

impl OrderInput {
    pub fn new(
        site_name: impl Into<String>,
        item: impl Into<String>,
        delivery_date: NaiveDate,
    ) -> Self {
        Self {
            site_name: site_name.into(),
            address: String::new(),
            company: String::new(),
            manager: String::new(),
            phone: String::new(),
            item: item.into(),
            quantity: MIN_QUANTITY,
            delivery_date,
        }
    }

    /// Names of the required fields that are blank.
    pub fn missing_required(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.site_name.trim().is_empty() {
            missing.push("site_name");
        }
        if self.item.trim().is_empty() {
            missing.push("item");
        }
        missing
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderRow {
    pub order_date: NaiveDate,
    pub site_name: String,
    pub address: String,
    pub company: String,
    pub manager: String,
    pub phone: String,
    pub item: String,
    pub quantity: u32,
    pub delivery_date: NaiveDate,
}

impl OrderRow {
    pub fn from_input(input: OrderInput, order_date: NaiveDate) -> Self {
        Self {
            order_date,
            site_name: input.site_name,
            address: input.address,
            company: input.company,
            manager: input.manager,
            phone: input.phone,
            item: input.item,
            quantity: input.quantity,
            delivery_date: input.delivery_date,
        }
    }

    /// Cells in `COLUMNS` order, dates formatted with `DATE_FORMAT`.
    pub fn to_cells(&self) -> [String; 9] {
        [
            format_date(self.order_date),
            self.site_name.clone(),
            self.address.clone(),
            self.company.clone(),
            self.manager.clone(),
            self.phone.clone(),
            self.item.clone(),
            self.quantity.to_string(),
            format_date(self.delivery_date),
        ]
    }

    /// Decodes one stored row. `row` is the zero-based table position and is
    /// only used for error reporting. Missing trailing cells read as empty.
    pub fn from_cells<S: AsRef<str>>(row: usize, cells: &[S]) -> Result<Self, RowDecodeError> {
        let cell = |column: usize| -> String {
            cells
                .get(column)
                .map(|value| value.as_ref().trim().to_string())
                .unwrap_or_default()
        };

        Ok(Self {
            order_date: decode_date(row, COLUMNS[0], &cell(0))?,
            site_name: cell(1),
            address: cell(2),
            company: cell(3),
            manager: cell(4),
            phone: cell(5),
            item: cell(6),
            quantity: decode_quantity(row, &cell(7))?,
            delivery_date: decode_date(row, COLUMNS[8], &cell(8))?,
        })
    }
}

/// The full ordered set of order rows, as read from or written to a store.
///
/// Mutations return a new table and leave `self` untouched, so the loaded
/// snapshot stays available if the write that follows fails.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Table {
    rows: Vec<OrderRow>,
}

impl Table {
    pub fn new(rows: Vec<OrderRow>) -> Self {
        Self { rows }
    }

    pub fn rows(&self) -> &[OrderRow] {
        &self.rows
    }

    pub fn into_rows(self) -> Vec<OrderRow> {
        self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Valid row indices for this snapshot.
    pub fn indices(&self) -> Range<usize> {
        0..self.rows.len()
    }

    pub fn appended(&self, row: OrderRow) -> Self {
        let mut rows = Vec::with_capacity(self.rows.len() + 1);
        rows.extend_from_slice(&self.rows);
        rows.push(row);
        Self { rows }
    }

    /// `None` when `index` is outside `indices()`.
    pub fn without(&self, index: RowIndex) -> Option<Self> {
        if index.0 >= self.rows.len() {
            return None;
        }
        let rows = self
            .rows
            .iter()
            .enumerate()
            .filter(|(position, _)| *position != index.0)
            .map(|(_, row)| row.clone())
            .collect();
        Some(Self { rows })
    }
}

pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// Lenient parse for stored cells; use `parse_date_strict` for user input.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    // Spreadsheets sometimes hand dates back with a midnight time attached.
    let date_part = raw.split_whitespace().next().unwrap_or(raw);
    NaiveDate::parse_from_str(date_part, DATE_FORMAT).ok()
}

pub fn parse_date_strict(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), DATE_FORMAT).ok()
}

fn decode_date(row: usize, column: &'static str, raw: &str) -> Result<NaiveDate, RowDecodeError> {
    parse_date(raw).ok_or_else(|| RowDecodeError::new(row, column, raw))
}

fn decode_quantity(row: usize, raw: &str) -> Result<u32, RowDecodeError> {
    let invalid = || RowDecodeError::new(row, "quantity", raw);
    let quantity = match raw.parse::<u32>() {
        Ok(value) => value,
        Err(_) => {
            let value = raw.parse::<f64>().map_err(|_| invalid())?;
            if value.fract() != 0.0 || value < 0.0 || value > f64::from(u32::MAX) {
                return Err(invalid());
            }
            value as u32
        }
    };
    if quantity < MIN_QUANTITY {
        return Err(invalid());
    }
    Ok(quantity)
}

#[cfg(test)]
#[path = "tests/domain_tests.rs"]
mod tests;
