use crate::catalog::{Catalog, Product};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterQuery {
    pub category: Option<String>,
    pub search: String,
}

impl FilterQuery {
    fn category_filter(&self) -> Option<&str> {
        self.category
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty() && !c.eq_ignore_ascii_case("all"))
    }

    fn search_term(&self) -> Option<String> {
        let term = self.search.trim();
        (!term.is_empty()).then(|| term.to_lowercase())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterOutcome {
    /// Nothing chosen yet; the view shows a prompt to pick a category.
    Placeholder,
    /// A filter is active but matched nothing.
    NoResults,
    Products(Vec<Product>),
}

impl FilterOutcome {
    pub fn visible(&self) -> &[Product] {
        match self {
            FilterOutcome::Products(products) => products,
            _ => &[],
        }
    }
}

pub fn apply(catalog: &Catalog, query: &FilterQuery) -> FilterOutcome {
    let category = query.category_filter();
    let term = query.search_term();
    if category.is_none() && term.is_none() {
        return FilterOutcome::Placeholder;
    }

    let matches: Vec<Product> = catalog
        .products()
        .iter()
        .filter(|p| category.map_or(true, |c| p.category == c))
        .filter(|p| term.as_deref().map_or(true, |t| matches_term(p, t)))
        .cloned()
        .collect();

    if matches.is_empty() {
        FilterOutcome::NoResults
    } else {
        FilterOutcome::Products(matches)
    }
}

fn matches_term(product: &Product, term: &str) -> bool {
    product.name.to_lowercase().contains(term)
        || product.brand.to_lowercase().contains(term)
        || product
            .description
            .as_deref()
            .is_some_and(|d| d.to_lowercase().contains(term))
}
