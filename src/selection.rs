use serde::Serialize;

use crate::catalog::Product;
use crate::storage::{load_selection, save_selection, KeyValueStore};

/// A product card as currently drawn, with its highlight state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProductCard {
    pub product: Product,
    pub selected: bool,
}

/// The user's chosen products, ordered by time of selection and unique by name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionSet {
    products: Vec<Product>,
}

impl SelectionSet {
    /// Restores the persisted snapshot, dropping any duplicate names it may contain.
    pub fn restore(store: &dyn KeyValueStore) -> Self {
        let mut set = Self::default();
        for product in load_selection(store) {
            if !set.contains(&product.name) {
                set.products.push(product);
            }
        }
        set
    }

    pub fn contains(&self, name: &str) -> bool {
        self.products.iter().any(|p| p.name == name)
    }

    /// Adds the product, or removes it when one with the same name is already
    /// selected. Returns whether it is selected afterwards.
    pub fn toggle(&mut self, product: &Product, store: &mut dyn KeyValueStore) -> bool {
        let selected = match self.products.iter().position(|p| p.name == product.name) {
            Some(index) => {
                self.products.remove(index);
                false
            }
            None => {
                self.products.push(product.clone());
                true
            }
        };
        save_selection(store, &self.products);
        selected
    }

    /// Returns whether anything was removed.
    pub fn remove(&mut self, name: &str, store: &mut dyn KeyValueStore) -> bool {
        let before = self.products.len();
        self.products.retain(|p| p.name != name);
        let removed = self.products.len() != before;
        if removed {
            save_selection(store, &self.products);
        }
        removed
    }

    pub fn clear(&mut self, store: &mut dyn KeyValueStore) {
        self.products.clear();
        save_selection(store, &self.products);
    }

    /// Re-applies highlight state to freshly drawn cards.
    pub fn reconcile(&self, visible: &[Product]) -> Vec<ProductCard> {
        visible
            .iter()
            .map(|product| ProductCard {
                product: product.clone(),
                selected: self.contains(&product.name),
            })
            .collect()
    }

    pub fn products(&self) -> &[Product] {
        &self.products
    }

    pub fn names(&self) -> Vec<&str> {
        self.products.iter().map(|p| p.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.products.len()
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }
}
