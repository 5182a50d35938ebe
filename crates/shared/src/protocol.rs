use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::{
    domain::{format_date, parse_date_strict, OrderInput, MIN_QUANTITY},
    error::SyncError,
};

/// Order form as posted by the browser. Every field arrives as text so that
/// a blank or malformed value becomes a validation warning instead of a
/// rejected request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrderForm {
    pub site_name: String,
    pub address: String,
    pub company: String,
    pub manager: String,
    pub phone: String,
    pub item: String,
    pub quantity: String,
    pub delivery_date: String,
}

impl OrderForm {
    /// Empty form with the default quantity and delivery date filled in.
    pub fn blank(today: NaiveDate) -> Self {
        Self {
            quantity: MIN_QUANTITY.to_string(),
            delivery_date: format_date(today),
            ..Self::default()
        }
    }

    /// Converts the posted text into an `OrderInput`. Required fields are not
    /// checked here; that belongs to the append operation.
    pub fn to_input(&self, today: NaiveDate) -> Result<OrderInput, SyncError> {
        let quantity = match self.quantity.trim() {
            "" => MIN_QUANTITY,
            raw => raw
                .parse::<u32>()
                .ok()
                .filter(|quantity| *quantity >= MIN_QUANTITY)
                .ok_or_else(|| {
                    SyncError::validation(format!(
                        "quantity must be a whole number of at least {MIN_QUANTITY}"
                    ))
                })?,
        };
        let delivery_date = match self.delivery_date.trim() {
            "" => today,
            raw => parse_date_strict(raw).ok_or_else(|| {
                SyncError::validation("delivery date must be formatted as YYYY-MM-DD")
            })?,
        };

        Ok(OrderInput {
            site_name: self.site_name.trim().to_string(),
            address: self.address.trim().to_string(),
            company: self.company.trim().to_string(),
            manager: self.manager.trim().to_string(),
            phone: self.phone.trim().to_string(),
            item: self.item.trim().to_string(),
            quantity,
            delivery_date,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteForm {
    pub row_index: usize,
}
