#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::Arc;

use farm_market_api::{
    dto::orders::CreateOrderRequest,
    models::{Category, NewProduct, Order, Product, User},
    payment::{HmacSha256Signer, PagePayGateway, sign_check_content},
    repository::{InMemoryStore, OrderRepository, ProductRepository},
    state::{AppState, PaymentWiring},
};
use rust_decimal::Decimal;

pub const SIGN_KEY: &[u8] = b"test-merchant-key";
pub const NOTIFY_URL: &str = "https://market.example/api/alipay/notify";

pub struct Fixture {
    pub store: InMemoryStore,
    pub state: AppState,
    pub signer: HmacSha256Signer,
    pub farmer: User,
    pub buyer: User,
    pub category: Category,
}

pub async fn fixture() -> Fixture {
    let store = InMemoryStore::new();
    let farmer = store.add_user("farmer_li", "farmer").await;
    let buyer = store.add_user("buyer_chen", "buyer").await;
    let category = store.add_category("Vegetables").await;

    let signer = HmacSha256Signer::new(SIGN_KEY).expect("signing key");
    let gateway = PagePayGateway::new(
        "https://gateway.example/gateway.do".into(),
        "2021000000000000".into(),
        signer.clone(),
    );
    let state = AppState::from_store(
        Arc::new(store.clone()),
        Arc::new(store.clone()),
        PaymentWiring {
            gateway: Arc::new(gateway),
            verifier: Arc::new(signer.clone()),
            notify_url: NOTIFY_URL.into(),
            return_url: "http://localhost:8080/orders".into(),
        },
    );

    Fixture {
        store,
        state,
        signer,
        farmer,
        buyer,
        category,
    }
}

impl Fixture {
    pub async fn add_product(&self, name: &str, price: Decimal, stock: i32) -> Product {
        self.add_product_for(self.farmer.id, name, price, stock).await
    }

    pub async fn add_product_for(
        &self,
        farmer_id: i64,
        name: &str,
        price: Decimal,
        stock: i32,
    ) -> Product {
        ProductRepository::insert(
            &self.store,
            NewProduct {
                farmer_id,
                category_id: self.category.id,
                name: name.into(),
                description: None,
                price,
                discount_price: None,
                is_discount: false,
                stock,
                status: 1,
                image_url: None,
            },
        )
        .await
        .expect("insert product")
    }

    pub async fn place_order(&self, product: &Product, quantity: i32) -> Order {
        self.state
            .orders
            .create_order(CreateOrderRequest {
                user_id: self.buyer.id,
                product_id: product.id,
                quantity,
                price: product.price,
                recv_address: Some("12 Orchard Lane".into()),
                recv_phone: Some("13800000000".into()),
            })
            .await
            .expect("create order")
            .data
            .expect("order data")
    }

    pub async fn product(&self, id: i64) -> Product {
        ProductRepository::get(&self.store, id)
            .await
            .expect("load product")
            .expect("product exists")
    }

    pub async fn order(&self, id: i64) -> Order {
        OrderRepository::get(&self.store, id)
            .await
            .expect("load order")
            .expect("order exists")
    }

    /// Notification parameters signed with the merchant key.
    pub fn signed_notify(&self, pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        let mut params: BTreeMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        params.insert("sign_type".into(), "HMAC-SHA256".into());
        let sign = self.signer.sign(&sign_check_content(&params));
        params.insert("sign".into(), sign);
        params
    }
}
