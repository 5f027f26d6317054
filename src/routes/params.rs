use rust_decimal::Decimal;
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};

use crate::{
    models::OrderStatus,
    repository::{OrderFilter, PageRequest, ProductFilter, ProductSort},
};

const DEFAULT_PER_PAGE: u64 = 10;

fn page_request(page: Option<u64>, per_page: Option<u64>) -> PageRequest {
    PageRequest::new(page.unwrap_or(1), per_page.unwrap_or(DEFAULT_PER_PAGE))
}

#[derive(Debug, Clone, Copy, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    pub fn is_ascending(&self) -> bool {
        matches!(self, SortOrder::Asc)
    }
}

#[derive(Debug, Clone, Copy, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ProductSortField {
    CreatedAt,
    Sales,
    Price,
}

// Page fields are spelled out rather than flattened: serde's flatten breaks
// numeric parsing in query strings.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct OrderPageQuery {
    pub page: Option<u64>,
    pub per_page: Option<u64>,
    pub user_id: Option<i64>,
    pub id: Option<i64>,
    pub status: Option<i32>,
    pub farmer_id: Option<i64>,
}

impl OrderPageQuery {
    pub fn page_request(&self) -> PageRequest {
        page_request(self.page, self.per_page)
    }

    /// Filter without the farmer constraint; that one needs a product lookup first.
    pub fn base_filter(&self) -> OrderFilter {
        OrderFilter {
            user_id: self.user_id,
            id: self.id,
            status: self.status.map(OrderStatus),
            product_ids: None,
        }
    }
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ProductPageQuery {
    pub page: Option<u64>,
    pub per_page: Option<u64>,
    pub name: Option<String>,
    pub category_id: Option<i64>,
    pub farmer_id: Option<i64>,
    pub status: Option<i32>,
    #[param(value_type = Option<String>)]
    pub min_price: Option<Decimal>,
    #[param(value_type = Option<String>)]
    pub max_price: Option<Decimal>,
    pub sort_field: Option<ProductSortField>,
    pub sort_order: Option<SortOrder>,
}

impl ProductPageQuery {
    pub fn page_request(&self) -> PageRequest {
        page_request(self.page, self.per_page)
    }

    pub fn filter(&self) -> ProductFilter {
        let ascending = self.sort_order.is_some_and(|order| order.is_ascending());
        let sort = match self.sort_field {
            Some(ProductSortField::Sales) => ProductSort::Sales { ascending },
            Some(ProductSortField::Price) => ProductSort::EffectivePrice { ascending },
            Some(ProductSortField::CreatedAt) | None => ProductSort::CreatedAtDesc,
        };
        ProductFilter {
            name: self.name.clone().filter(|name| !name.trim().is_empty()),
            category_id: self.category_id,
            farmer_id: self.farmer_id,
            status: self.status,
            min_price: self.min_price,
            max_price: self.max_price,
            sort,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn product_query_maps_sorting() {
        let query = ProductPageQuery {
            sort_field: Some(ProductSortField::Price),
            sort_order: Some(SortOrder::Asc),
            ..Default::default()
        };
        assert_eq!(
            query.filter().sort,
            ProductSort::EffectivePrice { ascending: true }
        );

        let query = ProductPageQuery {
            sort_field: Some(ProductSortField::Sales),
            ..Default::default()
        };
        assert_eq!(query.filter().sort, ProductSort::Sales { ascending: false });
        assert_eq!(ProductPageQuery::default().filter().sort, ProductSort::CreatedAtDesc);
    }

    #[test]
    fn blank_name_is_ignored_and_paging_defaults_apply() {
        let query = ProductPageQuery {
            name: Some("   ".into()),
            ..Default::default()
        };
        assert_eq!(query.filter().name, None);
        assert_eq!(query.page_request(), PageRequest::new(1, 10));
    }
}
