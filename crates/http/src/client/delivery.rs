//! Delivery service endpoints

use super::{ClientError, ShopClient};
use crate::types::{DeliveryServiceInput, DeliveryServicePatch};
use reqwest::Method;
use shopfront_core::DeliveryService;

impl ShopClient {
    pub async fn list_delivery_services(&self) -> Result<Vec<DeliveryService>, ClientError> {
        let request = self.request(Method::GET, "/delivery-services");
        self.execute(request).await
    }

    pub async fn create_delivery_service(
        &self,
        service: &DeliveryServiceInput,
    ) -> Result<DeliveryService, ClientError> {
        let request = self.request(Method::POST, "/delivery-services").json(service);
        self.execute(request).await
    }

    pub async fn update_delivery_service(
        &self,
        id: &str,
        patch: &DeliveryServicePatch,
    ) -> Result<DeliveryService, ClientError> {
        let request = self
            .request_at(Method::PATCH, &["delivery-services", id])
            .json(patch);
        self.execute(request).await
    }

    pub async fn delete_delivery_service(&self, id: &str) -> Result<(), ClientError> {
        let request = self.request_at(Method::DELETE, &["delivery-services", id]);
        self.execute_empty(request).await
    }
}
