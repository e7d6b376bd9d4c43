//! User account endpoints

use super::{ClientError, ShopClient};
use crate::types::{Page, ProfilePatch, UserPatch, UserQuery};
use reqwest::Method;
use shopfront_core::UserProfile;

impl ShopClient {
    pub async fn list_users(&self, query: &UserQuery) -> Result<Page<UserProfile>, ClientError> {
        let request = self.request(Method::GET, "/users").query(query);
        self.execute(request).await
    }

    /// Get current user info (requires authentication)
    pub async fn current_user(&self) -> Result<UserProfile, ClientError> {
        let request = self.request(Method::GET, "/users/me");
        self.execute(request).await
    }

    pub async fn update_profile(&self, patch: &ProfilePatch) -> Result<UserProfile, ClientError> {
        let request = self.request(Method::PATCH, "/users/me").json(patch);
        self.execute(request).await
    }

    pub async fn get_user(&self, id: &str) -> Result<UserProfile, ClientError> {
        let request = self.request_at(Method::GET, &["users", id]);
        self.execute(request).await
    }

    pub async fn update_user(
        &self,
        id: &str,
        patch: &UserPatch,
    ) -> Result<UserProfile, ClientError> {
        let request = self.request_at(Method::PATCH, &["users", id]).json(patch);
        self.execute(request).await
    }

    pub async fn delete_user(&self, id: &str) -> Result<(), ClientError> {
        let request = self.request_at(Method::DELETE, &["users", id]);
        self.execute_empty(request).await
    }
}
