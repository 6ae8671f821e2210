//! Actor extraction. Authentication happens upstream; the gateway forwards the
//! authenticated user in `X-User-Id` and an optional `X-User-Role`.

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use uuid::Uuid;

use crate::domain::{Actor, ActorRole};
use crate::error::AppError;

pub const USER_ID_HEADER: &str = "X-User-Id";
pub const USER_ROLE_HEADER: &str = "X-User-Role";

#[async_trait]
impl<S> FromRequestParts<S> for Actor
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user_id = parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|h| h.to_str().ok())
            .ok_or_else(|| AppError::Unauthorized(format!("missing {} header", USER_ID_HEADER)))?;
        let user_id = Uuid::parse_str(user_id.trim())
            .map_err(|_| AppError::Unauthorized(format!("malformed {} header", USER_ID_HEADER)))?;

        let role = match parts
            .headers
            .get(USER_ROLE_HEADER)
            .and_then(|h| h.to_str().ok())
        {
            Some(role) if role.eq_ignore_ascii_case("admin") => ActorRole::Admin,
            _ => ActorRole::Member,
        };

        Ok(Actor { user_id, role })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    async fn extract(request: Request<()>) -> Result<Actor, AppError> {
        let (mut parts, _) = request.into_parts();
        Actor::from_request_parts(&mut parts, &()).await
    }

    #[tokio::test]
    async fn reads_member_actor() {
        let id = Uuid::new_v4();
        let request = Request::builder()
            .header(USER_ID_HEADER, id.to_string())
            .body(())
            .unwrap();
        let actor = extract(request).await.unwrap();
        assert_eq!(actor, Actor::member(id));
    }

    #[tokio::test]
    async fn reads_admin_role() {
        let id = Uuid::new_v4();
        let request = Request::builder()
            .header(USER_ID_HEADER, id.to_string())
            .header(USER_ROLE_HEADER, "Admin")
            .body(())
            .unwrap();
        assert!(extract(request).await.unwrap().is_elevated());
    }

    #[tokio::test]
    async fn rejects_missing_or_malformed_id() {
        let missing = Request::builder().body(()).unwrap();
        assert!(matches!(extract(missing).await, Err(AppError::Unauthorized(_))));

        let malformed = Request::builder()
            .header(USER_ID_HEADER, "not-a-uuid")
            .body(())
            .unwrap();
        assert!(matches!(extract(malformed).await, Err(AppError::Unauthorized(_))));
    }
}
