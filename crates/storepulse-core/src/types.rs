//! Domain records served by the dashboard API
//!
//! Monetary and quantity fields are kept as [`Numeric`] exactly as they came
//! over the wire and are only turned into numbers through [`to_number`].

use crate::numeric::{Numeric, to_number};
use crate::record::Record;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Calendar day taken from the leading `YYYY-MM-DD` of a date or datetime
/// string. The record's own date component is used as-is; no timezone
/// conversion is applied, so late-evening records never shift a day.
pub fn calendar_day(value: &str) -> Option<NaiveDate> {
    let head = value.get(..10)?;
    NaiveDate::parse_from_str(head, "%Y-%m-%d").ok()
}

/// A sale as listed by `GET /sales`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sale {
    pub sale_id: i64,
    /// ISO date or datetime of issue
    pub issued_at: String,
    pub branch_id: String,
    #[serde(default)]
    pub register_id: String,
    #[serde(default)]
    pub subtotal: Option<Numeric>,
    #[serde(default)]
    pub tax: Option<Numeric>,
    #[serde(default)]
    pub total: Option<Numeric>,
    #[serde(default)]
    pub cancelled: bool,
    /// Payment split, e.g. `"CASH:100.00,TRF:50.00"`
    #[serde(default)]
    pub payments_summary: Option<String>,
}

impl Sale {
    pub fn total_amount(&self) -> f64 {
        to_number(self.total.as_ref(), "total")
    }

    pub fn day(&self) -> Option<NaiveDate> {
        calendar_day(&self.issued_at)
    }

    /// Amounts per payment method code (lower-cased), summed within this sale
    pub fn payments(&self) -> Vec<(String, f64)> {
        let Some(summary) = self.payments_summary.as_deref() else {
            return Vec::new();
        };

        let mut methods: Vec<(String, f64)> = Vec::new();
        for part in summary.split(',') {
            let Some((method, amount)) = part.trim().split_once(':') else {
                continue;
            };
            let method = method.trim().to_lowercase();
            if method.is_empty() || amount.trim().is_empty() {
                continue;
            }
            let amount = to_number(Some(&Numeric::Text(amount.to_string())), "payments_summary");
            match methods.iter_mut().find(|(m, _)| *m == method) {
                Some((_, total)) => *total += amount,
                None => methods.push((method, amount)),
            }
        }
        methods
    }
}

impl Record for Sale {
    type Key = i64;
    const COLLECTION: &'static str = "/sales";

    fn natural_key(&self) -> i64 {
        self.sale_id
    }

    fn validate(&self) -> Result<(), String> {
        if self.sale_id <= 0 {
            return Err(format!("sale_id must be positive, got {}", self.sale_id));
        }
        if self.day().is_none() {
            return Err(format!("issued_at '{}' has no calendar date", self.issued_at));
        }
        if self.branch_id.trim().is_empty() {
            return Err("branch_id is empty".to_string());
        }
        Ok(())
    }
}

/// Stock of one SKU in one warehouse, from `GET /inventory`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryLine {
    pub sku: String,
    pub warehouse: String,
    #[serde(default)]
    pub on_hand: Option<Numeric>,
    #[serde(default)]
    pub updated_at: String,
}

impl InventoryLine {
    pub fn quantity(&self) -> f64 {
        to_number(self.on_hand.as_ref(), "on_hand")
    }
}

impl Record for InventoryLine {
    type Key = (String, String);
    const COLLECTION: &'static str = "/inventory";

    fn natural_key(&self) -> (String, String) {
        (self.sku.clone(), self.warehouse.clone())
    }

    fn validate(&self) -> Result<(), String> {
        if self.sku.trim().is_empty() || self.warehouse.trim().is_empty() {
            return Err("inventory line needs both sku and warehouse".to_string());
        }
        Ok(())
    }
}

/// Catalog product, from `GET /products`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub sku: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub brand: Option<String>,
    #[serde(default)]
    pub line: Option<String>,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default)]
    pub price: Option<Numeric>,
}

impl Product {
    pub fn unit_price(&self) -> f64 {
        to_number(self.price.as_ref(), "price")
    }
}

impl Record for Product {
    type Key = String;
    const COLLECTION: &'static str = "/products";

    fn natural_key(&self) -> String {
        self.sku.clone()
    }

    fn validate(&self) -> Result<(), String> {
        if self.sku.trim().is_empty() {
            return Err("product sku is empty".to_string());
        }
        Ok(())
    }
}

/// Branch (point of sale), from `GET /branches`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Branch {
    pub code: String,
    pub name: String,
    #[serde(default = "default_true")]
    pub active: bool,
}

impl Record for Branch {
    type Key = String;
    const COLLECTION: &'static str = "/branches";

    fn natural_key(&self) -> String {
        self.code.clone()
    }

    fn validate(&self) -> Result<(), String> {
        if self.code.trim().is_empty() {
            return Err("branch code is empty".to_string());
        }
        Ok(())
    }
}

/// Stock location, from `GET /warehouses`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Warehouse {
    pub id: String,
    pub name: String,
    #[serde(default = "default_true")]
    pub active: bool,
}

impl Record for Warehouse {
    type Key = String;
    const COLLECTION: &'static str = "/warehouses";

    fn natural_key(&self) -> String {
        self.id.clone()
    }

    fn validate(&self) -> Result<(), String> {
        if self.id.trim().is_empty() {
            return Err("warehouse id is empty".to_string());
        }
        Ok(())
    }
}

fn default_true() -> bool {
    true
}
