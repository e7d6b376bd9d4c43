//! Order endpoints

use super::{ClientError, ShopClient};
use crate::types::{NewOrder, OrderQuery, OrderStatusUpdate, Page};
use reqwest::Method;
use shopfront_core::{Order, OrderStatus};

impl ShopClient {
    /// All orders, for staff
    pub async fn list_orders(&self, query: &OrderQuery) -> Result<Page<Order>, ClientError> {
        let request = self.request(Method::GET, "/orders").query(query);
        self.execute(request).await
    }

    /// The signed-in customer's own orders
    pub async fn my_orders(&self) -> Result<Vec<Order>, ClientError> {
        let request = self.request(Method::GET, "/orders/my");
        self.execute(request).await
    }

    pub async fn get_order(&self, id: &str) -> Result<Order, ClientError> {
        let request = self.request_at(Method::GET, &["orders", id]);
        self.execute(request).await
    }

    pub async fn place_order(&self, order: &NewOrder) -> Result<Order, ClientError> {
        let request = self.request(Method::POST, "/orders").json(order);
        self.execute(request).await
    }

    pub async fn update_order_status(
        &self,
        id: &str,
        status: OrderStatus,
    ) -> Result<Order, ClientError> {
        let request = self
            .request_at(Method::PATCH, &["orders", id, "status"])
            .json(&OrderStatusUpdate { status });
        self.execute(request).await
    }

    pub async fn cancel_order(&self, id: &str) -> Result<Order, ClientError> {
        let request = self.request_at(Method::POST, &["orders", id, "cancel"]);
        self.execute(request).await
    }
}
