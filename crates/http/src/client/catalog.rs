//! Product and category endpoints

use super::{ClientError, ShopClient};
use crate::types::{CategoryInput, CategoryPatch, Page, ProductInput, ProductPatch, ProductQuery};
use reqwest::Method;
use shopfront_core::{Category, Product};

impl ShopClient {
    pub async fn list_products(&self, query: &ProductQuery) -> Result<Page<Product>, ClientError> {
        let request = self.request(Method::GET, "/products").query(query);
        self.execute(request).await
    }

    pub async fn get_product(&self, id: &str) -> Result<Product, ClientError> {
        let request = self.request_at(Method::GET, &["products", id]);
        self.execute(request).await
    }

    pub async fn create_product(&self, product: &ProductInput) -> Result<Product, ClientError> {
        let request = self.request(Method::POST, "/products").json(product);
        self.execute(request).await
    }

    pub async fn update_product(
        &self,
        id: &str,
        patch: &ProductPatch,
    ) -> Result<Product, ClientError> {
        let request = self
            .request_at(Method::PATCH, &["products", id])
            .json(patch);
        self.execute(request).await
    }

    pub async fn delete_product(&self, id: &str) -> Result<(), ClientError> {
        let request = self.request_at(Method::DELETE, &["products", id]);
        self.execute_empty(request).await
    }

    pub async fn list_categories(&self) -> Result<Vec<Category>, ClientError> {
        let request = self.request(Method::GET, "/categories");
        self.execute(request).await
    }

    pub async fn get_category(&self, id: &str) -> Result<Category, ClientError> {
        let request = self.request_at(Method::GET, &["categories", id]);
        self.execute(request).await
    }

    pub async fn create_category(&self, category: &CategoryInput) -> Result<Category, ClientError> {
        let request = self.request(Method::POST, "/categories").json(category);
        self.execute(request).await
    }

    pub async fn update_category(
        &self,
        id: &str,
        patch: &CategoryPatch,
    ) -> Result<Category, ClientError> {
        let request = self
            .request_at(Method::PATCH, &["categories", id])
            .json(patch);
        self.execute(request).await
    }

    pub async fn delete_category(&self, id: &str) -> Result<(), ClientError> {
        let request = self.request_at(Method::DELETE, &["categories", id]);
        self.execute_empty(request).await
    }
}
