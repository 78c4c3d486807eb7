//! Collection sources behind the dashboard views

use std::sync::Arc;
use storepulse_core::CollectionSource;
use storepulse_core::types::{Branch, InventoryLine, Product, Sale, Warehouse};
use storepulse_egress::HttpCollection;

/// One source per record type
#[derive(Clone)]
pub struct Sources {
    pub sales: Arc<dyn CollectionSource<Sale>>,
    pub inventory: Arc<dyn CollectionSource<InventoryLine>>,
    pub products: Arc<dyn CollectionSource<Product>>,
    pub branches: Arc<dyn CollectionSource<Branch>>,
    pub warehouses: Arc<dyn CollectionSource<Warehouse>>,
}

impl Sources {
    /// Every collection served by one HTTP client
    pub fn http(collection: HttpCollection) -> Self {
        let collection = Arc::new(collection);
        Self {
            sales: collection.clone(),
            inventory: collection.clone(),
            products: collection.clone(),
            branches: collection.clone(),
            warehouses: collection,
        }
    }
}
