use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    Extension, Json,
};
use uuid::Uuid;

use crate::{
    errors::{AppError, AppResult},
    models::{
        AddBookRequest, BookResponse, BorrowReceipt, BorrowRequest, LoginRequest, LoginResponse,
        LogoutRequest, MessageResponse, RegisterRequest, ReturnReceipt, ReturnRequest,
        TitleQuery, TokenResponse, UserResponse,
    },
    utils::create_jwt_tokens,
    AppState,
};

/// Health check endpoint.
#[must_use]
#[allow(clippy::unused_async)]
pub async fn health_check() -> &'static str {
    "OK"
}

/// Register a new member.
///
/// # Errors
/// Returns validation, duplicate-email, or store errors.
pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<RegisterRequest>,
) -> AppResult<(StatusCode, Json<UserResponse>)> {
    let user = state
        .directory
        .register(&payload.email, &payload.full_name, &payload.password)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(UserResponse {
            id: user.id,
            email: user.email.clone(),
            full_name: user.full_name,
            message: format!("user {} has been successfully registered", user.email),
        }),
    ))
}

/// Open a session and issue JWT tokens.
///
/// # Errors
/// Returns not-found, invalid credentials, already-logged-in, or store errors.
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<LoginRequest>,
) -> AppResult<(StatusCode, Json<LoginResponse>)> {
    let user = state
        .directory
        .login(&payload.email, &payload.password)
        .await?;

    let (access, refresh) = create_jwt_tokens(user.id, &state.config)?;
    Ok((
        StatusCode::OK,
        Json(LoginResponse {
            message: format!("{} successfully logged in", user.full_name),
            tokens: TokenResponse {
                access_token: access,
                refresh_token: refresh,
            },
        }),
    ))
}

/// Refresh JWT tokens using a refresh token.
///
/// # Errors
/// Returns unauthorized errors or token decoding errors.
#[allow(clippy::unused_async)]
pub async fn refresh_token(
    State(state): State<Arc<AppState>>,
    Json(body): Json<TokenResponse>,
) -> AppResult<Json<TokenResponse>> {
    let claims = crate::utils::decode_jwt(&body.refresh_token, &state.config)?;
    if !claims.refresh {
        return Err(AppError::Unauthorized("refresh token required".into()));
    }
    let (access, refresh) = create_jwt_tokens(claims.sub, &state.config)?;
    Ok(Json(TokenResponse {
        access_token: access,
        refresh_token: refresh,
    }))
}

/// Close a session.
///
/// # Errors
/// Returns not-found, not-logged-in, or store errors.
pub async fn logout(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<LogoutRequest>,
) -> AppResult<Json<MessageResponse>> {
    state.directory.logout(&payload.email).await?;
    Ok(Json(MessageResponse {
        message: "you have been logged out".into(),
    }))
}

/// Delete the authenticated member's account. Refused while any active loan
/// remains.
///
/// # Errors
/// Returns not-found, unauthorized, conflict, or store errors.
pub async fn delete_account(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
) -> AppResult<Json<MessageResponse>> {
    let user = state
        .directory
        .find_by_id(user_id)
        .await?
        .ok_or(AppError::NotFound("user"))?;

    state.workflow.deregister(&user.email).await?;
    Ok(Json(MessageResponse {
        message: format!("account for {} has been successfully deleted", user.full_name),
    }))
}

/// Add a new book to the catalog.
///
/// # Errors
/// Returns validation, duplicate, or store errors.
pub async fn add_book(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<AddBookRequest>,
) -> AppResult<(StatusCode, Json<BookResponse>)> {
    let book = state
        .catalog
        .add(
            &payload.title,
            &payload.author,
            payload.year,
            &payload.publisher,
        )
        .await?;

    Ok((StatusCode::CREATED, Json(book.into())))
}

/// List books currently available for borrowing.
///
/// # Errors
/// Returns store errors.
pub async fn list_available_books(
    State(state): State<Arc<AppState>>,
) -> AppResult<Json<Vec<BookResponse>>> {
    let books = state.catalog.list_available().await?;
    Ok(Json(books.into_iter().map(Into::into).collect()))
}

/// List every book in the catalog, borrowed or not.
///
/// # Errors
/// Returns store errors.
pub async fn list_all_books(
    State(state): State<Arc<AppState>>,
) -> AppResult<Json<Vec<BookResponse>>> {
    let books = state.catalog.list_all().await?;
    Ok(Json(books.into_iter().map(Into::into).collect()))
}

/// Search the catalog by exact title, case-insensitively.
///
/// # Errors
/// Returns store errors.
pub async fn search_books(
    State(state): State<Arc<AppState>>,
    Query(query): Query<TitleQuery>,
) -> AppResult<Json<Vec<BookResponse>>> {
    let books = state.catalog.find_by_title(&query.title).await?;
    Ok(Json(books.into_iter().map(Into::into).collect()))
}

/// Borrow a book for the authenticated member.
///
/// # Errors
/// Returns not-found, conflict, unauthorized, limit, or store errors.
pub async fn borrow_book(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Json(body): Json<BorrowRequest>,
) -> AppResult<(StatusCode, Json<BorrowReceipt>)> {
    let receipt = state.workflow.borrow(user_id, body.book_id).await?;
    Ok((StatusCode::CREATED, Json(receipt)))
}

/// Return a borrowed book for the authenticated member.
///
/// # Errors
/// Returns not-found, no-active-loan, or store errors.
pub async fn return_book(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Json(body): Json<ReturnRequest>,
) -> AppResult<Json<ReturnReceipt>> {
    let receipt = state.workflow.return_book(user_id, body.book_id).await?;
    Ok(Json(receipt))
}

/// Books currently held by the authenticated member, derived from the
/// ledger.
///
/// # Errors
/// Returns not-found or store errors.
pub async fn borrowed_books(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
) -> AppResult<Json<Vec<BookResponse>>> {
    let books = state.workflow.borrowed_books(user_id).await?;
    Ok(Json(books.into_iter().map(Into::into).collect()))
}
