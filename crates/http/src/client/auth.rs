//! Session endpoints: login, registration, refresh and logout

use super::{ClientError, SessionEvent, ShopClient};
use crate::types::{AuthResponse, LoginRequest, RefreshResponse, RegisterRequest};
use reqwest::Method;
use shopfront_core::UserProfile;
use tracing::{info, warn};

impl ShopClient {
    /// Sign in and store the returned user and access token
    pub async fn login(
        &self,
        email: impl Into<String>,
        password: impl Into<String>,
    ) -> Result<UserProfile, ClientError> {
        let login = LoginRequest {
            email: email.into(),
            password: password.into(),
        };
        let request = self
            .request(Method::POST, &self.endpoints().login)
            .json(&login);
        let response: AuthResponse = self.execute(request).await?;
        self.start_session(response)
    }

    /// Create an account; the new user is signed in straight away
    pub async fn register(&self, account: &RegisterRequest) -> Result<UserProfile, ClientError> {
        let request = self.request(Method::POST, "/auth/register").json(account);
        let response: AuthResponse = self.execute(request).await?;
        self.start_session(response)
    }

    /// Call the refresh endpoint directly
    ///
    /// The session is left untouched; a 401 here is returned as is.
    pub async fn refresh_session(&self) -> Result<RefreshResponse, ClientError> {
        let request = self.request(Method::POST, &self.endpoints().refresh);
        self.execute(request).await
    }

    /// Revoke the refresh token and forget the local session
    ///
    /// The local session is cleared even when the logout call fails.
    pub async fn logout(&self) -> Result<(), ClientError> {
        let request = self.request(Method::POST, &self.endpoints().logout);
        let result = self.execute_empty(request).await;

        if let Err(e) = self.session().logout() {
            warn!("Failed to clear stored session: {e}");
        }
        self.notify(SessionEvent::LoggedOut);
        info!("Signed out");
        result
    }

    fn start_session(&self, response: AuthResponse) -> Result<UserProfile, ClientError> {
        let AuthResponse { access_token, user } = response;
        self.session().login(user.clone(), access_token)?;
        info!(user_id = %user.id, "Signed in");
        self.notify(SessionEvent::LoggedIn {
            user_id: user.id.clone(),
        });
        Ok(user)
    }
}
