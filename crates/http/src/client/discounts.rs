//! Discount code endpoints

use super::{ClientError, ShopClient};
use crate::types::{DiscountCodeQuery, DiscountInput, DiscountPatch, Page, PageQuery};
use reqwest::Method;
use shopfront_core::Discount;

impl ShopClient {
    pub async fn list_discounts(&self, query: &PageQuery) -> Result<Page<Discount>, ClientError> {
        let request = self.request(Method::GET, "/discounts").query(query);
        self.execute(request).await
    }

    /// Look up a code at checkout; unknown or expired codes come back as errors
    pub async fn validate_discount(&self, code: &str) -> Result<Discount, ClientError> {
        let request = self
            .request(Method::GET, "/discounts/validate")
            .query(&DiscountCodeQuery { code });
        self.execute(request).await
    }

    pub async fn create_discount(&self, discount: &DiscountInput) -> Result<Discount, ClientError> {
        let request = self.request(Method::POST, "/discounts").json(discount);
        self.execute(request).await
    }

    pub async fn update_discount(
        &self,
        id: &str,
        patch: &DiscountPatch,
    ) -> Result<Discount, ClientError> {
        let request = self
            .request_at(Method::PATCH, &["discounts", id])
            .json(patch);
        self.execute(request).await
    }

    pub async fn delete_discount(&self, id: &str) -> Result<(), ClientError> {
        let request = self.request_at(Method::DELETE, &["discounts", id]);
        self.execute_empty(request).await
    }
}
