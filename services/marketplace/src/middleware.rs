use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::Response,
    Json,
};

use tutorfind_common::{ApiResponse, AppError, UserId, UserRole};

use crate::profiles::TutorService;
use crate::state::AppState;

/// The caller's resolved identity. Authentication and token verification
/// happen upstream; the gateway forwards the authenticated account id in the
/// `X-User-Id` header and this middleware resolves it against the directory.
#[derive(Debug, Clone, Copy)]
pub struct AuthContext {
    pub user_id: UserId,
    pub role: UserRole,
}

pub async fn identity_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, (StatusCode, Json<ApiResponse<()>>)> {
    let user_id = request
        .headers()
        .get("x-user-id")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.parse::<i64>().ok())
        .map(UserId);

    let user_id = match user_id {
        Some(id) => id,
        None => {
            return Err((
                StatusCode::UNAUTHORIZED,
                Json(ApiResponse::error(
                    "Missing or invalid X-User-Id header".to_string(),
                )),
            ));
        }
    };

    let user = match TutorService::new(&state).get_user(user_id).await {
        Ok(user) => user,
        Err(_) => {
            return Err((
                StatusCode::UNAUTHORIZED,
                Json(ApiResponse::error("Unknown user".to_string())),
            ));
        }
    };

    if !user.is_active {
        return Err((
            StatusCode::FORBIDDEN,
            Json(ApiResponse::error("Account is deactivated".to_string())),
        ));
    }

    request.extensions_mut().insert(AuthContext {
        user_id: user.id,
        role: user.role,
    });

    Ok(next.run(request).await)
}

pub fn require_role(ctx: &AuthContext, role: UserRole) -> Result<(), AppError> {
    if ctx.role != role {
        return Err(AppError::Authorization(format!(
            "{:?} role required",
            role
        )));
    }
    Ok(())
}
