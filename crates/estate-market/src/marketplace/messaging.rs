//! Direct messages between marketplace users.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::announcements::RepositoryError;
use super::users::{authenticate, AuthError, Principal, UserDirectory, UserId, UserView};

/// Identifier of a message.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct MessageId(pub u64);

static MESSAGE_SEQUENCE: AtomicU64 = AtomicU64::new(1);

pub fn next_message_id() -> MessageId {
    MessageId(MESSAGE_SEQUENCE.fetch_add(1, Ordering::Relaxed))
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub sender: UserId,
    pub recipient: UserId,
    pub text: String,
    pub sent_at: DateTime<Utc>,
}

/// Storage abstraction over the message log.
pub trait MessageRepository: Send + Sync {
    fn insert(&self, message: Message) -> Result<(), RepositoryError>;
    /// Both directions of the (a, b) exchange, unordered.
    fn conversation(&self, a: UserId, b: UserId) -> Result<Vec<Message>, RepositoryError>;
}

#[derive(Debug, Clone, Deserialize)]
pub struct MessagePayload {
    pub recipient: UserId,
    pub text: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct MessageView {
    pub id: MessageId,
    pub sender: UserView,
    pub recipient: UserView,
    pub text: String,
    pub sent_at: DateTime<Utc>,
}

pub struct MessagingService<M> {
    messages: Arc<M>,
    users: Arc<dyn UserDirectory>,
}

#[derive(Debug, thiserror::Error)]
pub enum MessagingServiceError {
    #[error("{field}: {message}")]
    Validation {
        field: &'static str,
        message: String,
    },
    #[error("{0} does not exist")]
    MissingEntity(&'static str),
    #[error("storage failed: {0}")]
    Repository(#[from] RepositoryError),
}

impl<M> MessagingService<M>
where
    M: MessageRepository,
{
    pub fn new(messages: Arc<M>, users: Arc<dyn UserDirectory>) -> Self {
        Self { messages, users }
    }

    pub fn send(
        &self,
        principal: &Principal,
        payload: MessagePayload,
    ) -> Result<MessageView, MessagingServiceError> {
        if payload.text.trim().is_empty() {
            return Err(MessagingServiceError::Validation {
                field: "text",
                message: "message text must not be empty".into(),
            });
        }
        if payload.recipient == principal.user_id {
            return Err(MessagingServiceError::Validation {
                field: "recipient",
                message: "cannot message yourself".into(),
            });
        }
        let recipient = self
            .users
            .fetch(payload.recipient)
            .ok_or(MessagingServiceError::MissingEntity("recipient"))?;
        let sender = self
            .users
            .fetch(principal.user_id)
            .ok_or(MessagingServiceError::MissingEntity("sender"))?;
        let message = Message {
            id: next_message_id(),
            sender: principal.user_id,
            recipient: recipient.id,
            text: payload.text,
            sent_at: Utc::now(),
        };
        self.messages.insert(message.clone())?;
        Ok(MessageView {
            id: message.id,
            sender: UserView::from(&sender),
            recipient: UserView::from(&recipient),
            text: message.text,
            sent_at: message.sent_at,
        })
    }

    /// Conversation between the caller and `peer`, oldest first.
    pub fn conversation(
        &self,
        principal: &Principal,
        peer: UserId,
    ) -> Result<Vec<MessageView>, MessagingServiceError> {
        let peer_user = self
            .users
            .fetch(peer)
            .ok_or(MessagingServiceError::MissingEntity("peer"))?;
        let me = self
            .users
            .fetch(principal.user_id)
            .ok_or(MessagingServiceError::MissingEntity("sender"))?;
        let mut messages = self.messages.conversation(principal.user_id, peer)?;
        messages.sort_by_key(|message| message.sent_at);
        Ok(messages
            .into_iter()
            .map(|message| {
                let (sender, recipient) = if message.sender == me.id {
                    (&me, &peer_user)
                } else {
                    (&peer_user, &me)
                };
                MessageView {
                    id: message.id,
                    sender: UserView::from(sender),
                    recipient: UserView::from(recipient),
                    text: message.text,
                    sent_at: message.sent_at,
                }
            })
            .collect())
    }
}

/// Shared state for messaging endpoints.
pub struct MessagingRoutes<M> {
    pub service: Arc<MessagingService<M>>,
    pub users: Arc<dyn UserDirectory>,
}

impl<M> Clone for MessagingRoutes<M> {
    fn clone(&self) -> Self {
        Self {
            service: Arc::clone(&self.service),
            users: Arc::clone(&self.users),
        }
    }
}

/// Router builder for direct messages.
pub fn messaging_router<M>(
    service: Arc<MessagingService<M>>,
    users: Arc<dyn UserDirectory>,
) -> Router
where
    M: MessageRepository + 'static,
{
    let state = MessagingRoutes { service, users };
    Router::new()
        .route(
            "/api/v1/messages",
            get(conversation_handler::<M>).post(send_handler::<M>),
        )
        .with_state(state)
}

fn auth_failure(error: AuthError) -> Response {
    let payload = json!({ "error": error.to_string() });
    (StatusCode::UNAUTHORIZED, axum::Json(payload)).into_response()
}

fn failure(error: MessagingServiceError) -> Response {
    let status = match &error {
        MessagingServiceError::Validation { .. } => StatusCode::BAD_REQUEST,
        MessagingServiceError::MissingEntity(_) => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    let payload = json!({ "error": error.to_string() });
    (status, axum::Json(payload)).into_response()
}

#[derive(Debug, Clone, Deserialize)]
pub struct ConversationQuery {
    pub peer: u64,
}

pub(crate) async fn send_handler<M>(
    State(state): State<MessagingRoutes<M>>,
    headers: HeaderMap,
    axum::Json(payload): axum::Json<MessagePayload>,
) -> Response
where
    M: MessageRepository + 'static,
{
    let principal = match authenticate(state.users.as_ref(), &headers) {
        Ok(principal) => principal,
        Err(error) => return auth_failure(error),
    };
    match state.service.send(&principal, payload) {
        Ok(view) => (StatusCode::CREATED, axum::Json(view)).into_response(),
        Err(error) => failure(error),
    }
}

pub(crate) async fn conversation_handler<M>(
    State(state): State<MessagingRoutes<M>>,
    headers: HeaderMap,
    Query(query): Query<ConversationQuery>,
) -> Response
where
    M: MessageRepository + 'static,
{
    let principal = match authenticate(state.users.as_ref(), &headers) {
        Ok(principal) => principal,
        Err(error) => return auth_failure(error),
    };
    match state.service.conversation(&principal, UserId(query.peer)) {
        Ok(views) => (StatusCode::OK, axum::Json(views)).into_response(),
        Err(error) => failure(error),
    }
}
