use std::net::SocketAddr;

use axum::{
    RequestPartsExt,
    extract::{ConnectInfo, FromRequestParts},
    http::request::Parts,
};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Bearer},
};
use uuid::Uuid;

use crate::{
    adapters::http::app_state::AppState,
    app_error::AppError,
    application::jwt::{self, ADMIN_ROLE},
};

/// Address of the caller as the gateway should see it.
#[derive(Debug, Clone)]
pub struct ClientIp(pub String);

impl FromRequestParts<AppState> for ClientIp {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        app_state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let connect_ip = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip().to_string());

        // Only trust forwarded headers if explicitly configured (when behind a reverse proxy)
        let ip = if app_state.config.trust_proxy {
            forwarded_ip(parts).or(connect_ip)
        } else {
            connect_ip
        };

        tracing::debug!(
            trust_proxy = app_state.config.trust_proxy,
            forwarded_ip = ?forwarded_ip(parts),
            using_ip = ?ip,
            "Resolved client address"
        );

        ip.map(ClientIp)
            .ok_or_else(|| AppError::Internal("client address unavailable".into()))
    }
}

fn forwarded_ip(parts: &Parts) -> Option<String> {
    // Extract IP from X-Forwarded-For or X-Real-IP headers
    if let Some(forwarded) = parts.headers.get("x-forwarded-for")
        && let Ok(val) = forwarded.to_str()
        && let Some(first) = val.split(',').next()
    {
        let trimmed = first.trim();
        if !trimmed.is_empty() {
            return Some(trimmed.to_string());
        }
    }
    if let Some(real) = parts.headers.get("x-real-ip")
        && let Ok(val) = real.to_str()
        && !val.trim().is_empty()
    {
        return Some(val.trim().to_string());
    }
    None
}

/// A caller holding a valid token with the admin role.
#[derive(Debug, Clone, Copy)]
pub struct AdminUser {
    pub user_id: Uuid,
}

impl FromRequestParts<AppState> for AdminUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        app_state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(bearer)) = parts
            .extract::<TypedHeader<Authorization<Bearer>>>()
            .await
            .map_err(|_| AppError::InvalidCredentials)?;

        let claims = jwt::verify(bearer.token(), &app_state.config.admin_jwt_secret)?;
        let user_id = claims.user_id()?;

        if !claims.has_role(ADMIN_ROLE) {
            tracing::warn!(%user_id, "Non-admin token used on admin route");
            return Err(AppError::Forbidden);
        }

        Ok(AdminUser { user_id })
    }
}
