use crate::dashboard::Dashboard;
use crate::sources::Sources;
use std::sync::Arc;
use storepulse_cache::QueryStore;
use storepulse_core::types::{Branch, InventoryLine, Product, Sale, Warehouse};
use storepulse_core::{CollectionSource, CompositeCursor, Error};
use storepulse_traversal::testing::{MemoryCollection, ScriptedSource};

pub fn sale(id: i64, day: &str, branch: &str, total: &str, cancelled: bool) -> Sale {
    Sale {
        sale_id: id,
        issued_at: format!("{}T10:00:00", day),
        branch_id: branch.to_string(),
        register_id: "r1".to_string(),
        subtotal: None,
        tax: None,
        total: Some(total.into()),
        cancelled,
        payments_summary: None,
    }
}

pub fn product(sku: &str, brand: Option<&str>, line: Option<&str>, price: &str) -> Product {
    Product {
        sku: sku.to_string(),
        description: None,
        brand: brand.map(str::to_string),
        line: line.map(str::to_string),
        unit: None,
        price: Some(price.into()),
    }
}

pub fn inventory_line(sku: &str, warehouse: &str, on_hand: &str) -> InventoryLine {
    InventoryLine {
        sku: sku.to_string(),
        warehouse: warehouse.to_string(),
        on_hand: Some(on_hand.into()),
        updated_at: "2025-01-01T00:00:00".to_string(),
    }
}

fn sale_cursor(sale: &Sale) -> CompositeCursor {
    CompositeCursor::new(sale.issued_at.clone(), sale.sale_id)
}

fn line_cursor(line: &InventoryLine) -> CompositeCursor {
    CompositeCursor::new(line.sku.clone(), line.warehouse.as_str())
}

fn product_cursor(product: &Product) -> CompositeCursor {
    CompositeCursor::new(product.sku.clone(), product.sku.as_str())
}

fn branch_cursor(branch: &Branch) -> CompositeCursor {
    CompositeCursor::new(branch.code.clone(), branch.code.as_str())
}

fn warehouse_cursor(warehouse: &Warehouse) -> CompositeCursor {
    CompositeCursor::new(warehouse.id.clone(), warehouse.id.as_str())
}

/// In-memory collections for every record type
pub struct TestSources {
    sales: Arc<MemoryCollection<Sale>>,
    inventory: Arc<MemoryCollection<InventoryLine>>,
    products: Arc<MemoryCollection<Product>>,
    products_override: Option<Arc<dyn CollectionSource<Product>>>,
    branches: Option<Arc<MemoryCollection<Branch>>>,
    warehouses: Arc<MemoryCollection<Warehouse>>,
}

impl TestSources {
    pub fn new() -> Self {
        Self {
            sales: Arc::new(MemoryCollection::new(Vec::new(), sale_cursor)),
            inventory: Arc::new(MemoryCollection::new(Vec::new(), line_cursor)),
            products: Arc::new(MemoryCollection::new(Vec::new(), product_cursor)),
            products_override: None,
            branches: Some(Arc::new(MemoryCollection::new(Vec::new(), branch_cursor))),
            warehouses: Arc::new(MemoryCollection::new(Vec::new(), warehouse_cursor)),
        }
    }

    pub fn sales(mut self, sales: Vec<Sale>) -> Self {
        self.sales = Arc::new(MemoryCollection::new(sales, sale_cursor));
        self
    }

    pub fn inventory(mut self, lines: Vec<InventoryLine>) -> Self {
        self.inventory = Arc::new(MemoryCollection::new(lines, line_cursor));
        self
    }

    pub fn products(mut self, products: Vec<Product>) -> Self {
        self.products = Arc::new(MemoryCollection::new(products, product_cursor));
        self
    }

    /// Serve products from an arbitrary source, e.g. a scripted failure
    pub fn products_from(mut self, source: Arc<dyn CollectionSource<Product>>) -> Self {
        self.products_override = Some(source);
        self
    }

    pub fn branches(mut self, branches: Vec<Branch>) -> Self {
        self.branches = Some(Arc::new(MemoryCollection::new(branches, branch_cursor)));
        self
    }

    /// Branch catalog answering 503
    pub fn failing_branches(mut self) -> Self {
        self.branches = None;
        self
    }

    pub fn warehouses(mut self, warehouses: Vec<Warehouse>) -> Self {
        self.warehouses = Arc::new(MemoryCollection::new(warehouses, warehouse_cursor));
        self
    }

    pub fn sales_source(&self) -> Arc<MemoryCollection<Sale>> {
        self.sales.clone()
    }

    pub fn inventory_source(&self) -> Arc<MemoryCollection<InventoryLine>> {
        self.inventory.clone()
    }

    pub fn products_source(&self) -> Arc<MemoryCollection<Product>> {
        self.products.clone()
    }

    pub fn dashboard(self) -> Dashboard {
        let products: Arc<dyn CollectionSource<Product>> = match self.products_override {
            Some(source) => source,
            None => self.products,
        };
        let branches: Arc<dyn CollectionSource<Branch>> = match self.branches {
            Some(branches) => branches,
            None => Arc::new(ScriptedSource::<Branch>::new().with_response(Err(Error::Http {
                status: 503,
                message: "unavailable".into(),
            }))),
        };
        let sources = Sources {
            sales: self.sales,
            inventory: self.inventory,
            products,
            branches,
            warehouses: self.warehouses,
        };
        Dashboard::new(sources, QueryStore::new())
    }
}

pub fn dashboard_with_sales(sales: Vec<Sale>) -> (Dashboard, Arc<MemoryCollection<Sale>>) {
    let sources = TestSources::new().sales(sales);
    let source = sources.sales_source();
    (sources.dashboard(), source)
}
