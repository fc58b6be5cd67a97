//! Paid account subscriptions and the auto-renewal sweep.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use chrono::{DateTime, Months, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::announcements::RepositoryError;
use super::users::{authenticate, AuthError, Principal, UserDirectory, UserId};

/// Identifier of a subscription row.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct SubscriptionId(pub u64);

static SUBSCRIPTION_SEQUENCE: AtomicU64 = AtomicU64::new(1);

pub fn next_subscription_id() -> SubscriptionId {
    SubscriptionId(SUBSCRIPTION_SEQUENCE.fetch_add(1, Ordering::Relaxed))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SubscriptionTier {
    Common,
    Lux,
}

impl SubscriptionTier {
    pub fn monthly_sum(self) -> u64 {
        match self {
            Self::Common => 100,
            Self::Lux => 250,
        }
    }
}

/// One user's paid subscription. `expire_date` moves forward a month at
/// a time while `auto_pay` stays on.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserSubscription {
    pub id: SubscriptionId,
    pub user: UserId,
    pub tier: SubscriptionTier,
    pub sum: u64,
    pub expire_date: DateTime<Utc>,
    pub auto_pay: bool,
}

/// Storage abstraction over subscriptions. One active row per user.
pub trait SubscriptionRepository: Send + Sync {
    fn insert(&self, subscription: UserSubscription) -> Result<(), RepositoryError>;
    fn update(&self, subscription: UserSubscription) -> Result<(), RepositoryError>;
    fn by_user(&self, user: UserId) -> Result<Option<UserSubscription>, RepositoryError>;
    fn list(&self) -> Result<Vec<UserSubscription>, RepositoryError>;
}

#[derive(Debug, Clone, Deserialize)]
pub struct SubscribePayload {
    pub tier: SubscriptionTier,
    #[serde(default)]
    pub auto_pay: bool,
}

pub struct SubscriptionService<S> {
    subscriptions: Arc<S>,
}

#[derive(Debug, thiserror::Error)]
pub enum SubscriptionServiceError {
    #[error("user already has a subscription")]
    AlreadySubscribed,
    #[error("no active subscription")]
    NotSubscribed,
    #[error("storage failed: {0}")]
    Repository(#[from] RepositoryError),
}

impl<S> SubscriptionService<S>
where
    S: SubscriptionRepository,
{
    pub fn new(subscriptions: Arc<S>) -> Self {
        Self { subscriptions }
    }

    pub fn subscribe(
        &self,
        principal: &Principal,
        payload: SubscribePayload,
    ) -> Result<UserSubscription, SubscriptionServiceError> {
        if self.subscriptions.by_user(principal.user_id)?.is_some() {
            return Err(SubscriptionServiceError::AlreadySubscribed);
        }
        let subscription = UserSubscription {
            id: next_subscription_id(),
            user: principal.user_id,
            tier: payload.tier,
            sum: payload.tier.monthly_sum(),
            expire_date: Utc::now() + Months::new(1),
            auto_pay: payload.auto_pay,
        };
        self.subscriptions.insert(subscription.clone())?;
        Ok(subscription)
    }

    pub fn my_subscription(
        &self,
        principal: &Principal,
    ) -> Result<UserSubscription, SubscriptionServiceError> {
        self.subscriptions
            .by_user(principal.user_id)?
            .ok_or(SubscriptionServiceError::NotSubscribed)
    }

    pub fn cancel_auto_pay(
        &self,
        principal: &Principal,
    ) -> Result<UserSubscription, SubscriptionServiceError> {
        let mut subscription = self.my_subscription(principal)?;
        subscription.auto_pay = false;
        self.subscriptions.update(subscription.clone())?;
        Ok(subscription)
    }

    /// Renewal sweep: every expired subscription with auto-pay on is
    /// pushed one month forward and charged again. Returns how many
    /// rows were renewed.
    pub fn renew_expired(&self, now: DateTime<Utc>) -> Result<usize, SubscriptionServiceError> {
        let mut renewed = 0;
        for mut subscription in self.subscriptions.list()? {
            if subscription.auto_pay && subscription.expire_date <= now {
                subscription.expire_date = subscription.expire_date + Months::new(1);
                subscription.sum = subscription.tier.monthly_sum();
                self.subscriptions.update(subscription.clone())?;
                tracing::info!(
                    user = subscription.user.0,
                    until = %subscription.expire_date,
                    "subscription renewed"
                );
                renewed += 1;
            }
        }
        Ok(renewed)
    }
}

/// Shared state for subscription endpoints.
pub struct SubscriptionRoutes<S> {
    pub service: Arc<SubscriptionService<S>>,
    pub users: Arc<dyn UserDirectory>,
}

impl<S> Clone for SubscriptionRoutes<S> {
    fn clone(&self) -> Self {
        Self {
            service: Arc::clone(&self.service),
            users: Arc::clone(&self.users),
        }
    }
}

/// Router builder for subscription management.
pub fn subscription_router<S>(
    service: Arc<SubscriptionService<S>>,
    users: Arc<dyn UserDirectory>,
) -> Router
where
    S: SubscriptionRepository + 'static,
{
    let state = SubscriptionRoutes { service, users };
    Router::new()
        .route(
            "/api/v1/subscriptions/my",
            get(my_subscription_handler::<S>).post(subscribe_handler::<S>),
        )
        .route(
            "/api/v1/subscriptions/my/auto-pay",
            axum::routing::delete(cancel_auto_pay_handler::<S>),
        )
        .with_state(state)
}

fn auth_failure(error: AuthError) -> Response {
    let payload = json!({ "error": error.to_string() });
    (StatusCode::UNAUTHORIZED, axum::Json(payload)).into_response()
}

fn failure(error: SubscriptionServiceError) -> Response {
    let status = match &error {
        SubscriptionServiceError::AlreadySubscribed => StatusCode::CONFLICT,
        SubscriptionServiceError::NotSubscribed => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    let payload = json!({ "error": error.to_string() });
    (status, axum::Json(payload)).into_response()
}

pub(crate) async fn subscribe_handler<S>(
    State(state): State<SubscriptionRoutes<S>>,
    headers: HeaderMap,
    axum::Json(payload): axum::Json<SubscribePayload>,
) -> Response
where
    S: SubscriptionRepository + 'static,
{
    let principal = match authenticate(state.users.as_ref(), &headers) {
        Ok(principal) => principal,
        Err(error) => return auth_failure(error),
    };
    match state.service.subscribe(&principal, payload) {
        Ok(subscription) => (StatusCode::CREATED, axum::Json(subscription)).into_response(),
        Err(error) => failure(error),
    }
}

pub(crate) async fn my_subscription_handler<S>(
    State(state): State<SubscriptionRoutes<S>>,
    headers: HeaderMap,
) -> Response
where
    S: SubscriptionRepository + 'static,
{
    let principal = match authenticate(state.users.as_ref(), &headers) {
        Ok(principal) => principal,
        Err(error) => return auth_failure(error),
    };
    match state.service.my_subscription(&principal) {
        Ok(subscription) => (StatusCode::OK, axum::Json(subscription)).into_response(),
        Err(error) => failure(error),
    }
}

pub(crate) async fn cancel_auto_pay_handler<S>(
    State(state): State<SubscriptionRoutes<S>>,
    headers: HeaderMap,
) -> Response
where
    S: SubscriptionRepository + 'static,
{
    let principal = match authenticate(state.users.as_ref(), &headers) {
        Ok(principal) => principal,
        Err(error) => return auth_failure(error),
    };
    match state.service.cancel_auto_pay(&principal) {
        Ok(subscription) => (StatusCode::OK, axum::Json(subscription)).into_response(),
        Err(error) => failure(error),
    }
}
