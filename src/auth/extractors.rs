use actix_web::dev::Payload;
use actix_web::{web, Error as ActixError, FromRequest, HttpRequest};
use futures::future::LocalBoxFuture;

use super::credentials::extract_token;
use super::guard::{resolve_principal, Principal};
use crate::error::AppError;
use crate::state::AppState;

/// Resolves the authenticated caller for a handler.
///
/// Reads the session token (Bearer header first, then the `access_token` cookie),
/// verifies it and loads the account. Any failure short-circuits the request with
/// the matching `AppError` response before the handler body runs.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub Principal);

impl FromRequest for AuthenticatedUser {
    type Error = ActixError; // AppError will be converted into ActixError via ResponseError
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let state = req.app_data::<web::Data<AppState>>().cloned();
        let token = extract_token(req);

        Box::pin(async move {
            let state = state.ok_or_else(|| {
                AppError::InternalServerError("application state is not configured".into())
            })?;
            let principal =
                resolve_principal(&state.tokens, state.users.as_ref(), token.as_deref()).await?;
            Ok::<_, ActixError>(AuthenticatedUser(principal))
        })
    }
}
