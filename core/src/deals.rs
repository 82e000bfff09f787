//! Best-deal scan and "load more" pagination over a result set.

use crate::types::Product;

pub const DEFAULT_PAGE_SIZE: usize = 10;

/// Lowest price in `products`, or `None` when there are none.
pub fn best_price(products: &[Product]) -> Option<f64> {
    products
        .iter()
        .map(|p| p.price)
        .filter(|price| !price.is_nan())
        .reduce(f64::min)
}

/// Every product sharing the lowest price.
pub fn best_deals(products: &[Product]) -> Vec<&Product> {
    match best_price(products) {
        Some(best) => products.iter().filter(|p| p.price == best).collect(),
        None => Vec::new(),
    }
}

/// Cumulative pagination: page `n` shows the first `n * page_size` items.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pager {
    page_size: usize,
    page: usize,
}

impl Default for Pager {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_SIZE)
    }
}

impl Pager {
    /// A zero page size is bumped to one.
    pub fn new(page_size: usize) -> Self {
        Self {
            page_size: page_size.max(1),
            page: 1,
        }
    }

    pub fn page(&self) -> usize {
        self.page
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Number of items shown out of `total`.
    pub fn shown(&self, total: usize) -> usize {
        self.page.saturating_mul(self.page_size).min(total)
    }

    pub fn visible<'a, T>(&self, items: &'a [T]) -> &'a [T] {
        &items[..self.shown(items.len())]
    }

    pub fn has_more(&self, total: usize) -> bool {
        self.shown(total) < total
    }

    pub fn load_more(&mut self) {
        self.page += 1;
    }

    pub fn reset(&mut self) {
        self.page = 1;
    }
}
