use std::collections::HashMap;

use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, StatusCode},
    middleware::Next,
    response::Response,
};

use crate::config::AdminUser;
use crate::http::server::AppState;
use crate::inbound::OwnerId;

/// The authenticated administrator, attached to request extensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Caller {
    pub owner: OwnerId,
}

/// API key → owner lookup, swapped wholesale on config reload.
#[derive(Debug, Default)]
pub struct AdminDirectory {
    keys: HashMap<String, OwnerId>,
}

impl AdminDirectory {
    pub fn from_users(users: &[AdminUser]) -> Self {
        Self {
            keys: users
                .iter()
                .map(|u| (u.api_key.clone(), u.owner_id))
                .collect(),
        }
    }

    pub fn owner_for(&self, api_key: &str) -> Option<OwnerId> {
        self.keys.get(api_key).copied()
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

pub async fn admin_auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let owner = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .and_then(|key| state.admins.load().owner_for(key));

    match owner {
        Some(owner) => {
            request.extensions_mut().insert(Caller { owner });
            Ok(next.run(request).await)
        }
        None => {
            tracing::warn!(
                path = %request.uri().path(),
                "Rejected admin request without valid API key"
            );
            Err(StatusCode::UNAUTHORIZED)
        }
    }
}
