//! Catalog seeding input shared by both backends.
//!
//! Product management is owned elsewhere; stores only need a way to put rows
//! in place for demos and tests.

use common::Money;

/// A product to seed into a store's catalog.
#[derive(Debug, Clone)]
pub struct NewProduct {
    pub sku: String,
    pub name: String,
    pub price: Money,
    pub stock: u32,
}

impl NewProduct {
    pub fn new(sku: impl Into<String>, name: impl Into<String>, price: i64, stock: u32) -> Self {
        Self {
            sku: sku.into(),
            name: name.into(),
            price: Money::from_minor(price),
            stock,
        }
    }
}
