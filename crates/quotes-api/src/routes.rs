use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{DefaultBodyLimit, Path, Query, Request, State};
use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::routing::{get, patch, post};
use axum::{Extension, Form, Json, Router};
use chrono::Utc;
use quotes_core::auth::{
    AuthError, AuthSession, NoSessionPersistence, PasswordAuthenticator, SignUpOutcome,
    SupabaseAuthClient, TokenVerifier,
};
use quotes_core::controller::{self, ProfileForm, QuoteForm};
use quotes_core::db::SqliteStore;
use quotes_core::query::RawListQuery;
use quotes_core::render::{
    join_share_card, render_social_card_png, spawn_share_card, ShareCard, SocialCard,
};
use quotes_core::sitemap::{render_sitemap, sitemap_entries};
use quotes_core::storage::{AvatarStorage, SupabaseStorage, MAX_AVATAR_BYTES};
use quotes_core::store::{
    PostgrestConfig, PostgrestStore, ProfileStore, QuoteStore, MAX_INDEX_ENTRIES,
};
use quotes_core::{ListParams, Profile, Quote, QuoteId, QuotePage};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::auth::{
    cleared_session_cookie, extract_access_token, request_session, session_cookie,
    user_fingerprint, AuthenticatedUser, IdentityResolver,
};
use crate::config::{AppConfig, StoreBackend};
use crate::error::AppError;
use crate::pages::{self, AccountForm, ListOutcome, ListView};
use crate::rate_limit::{EndpointRateLimiter, ProtectedEndpoint, RateLimitMetricsSnapshot};

const OG_FAILURE_MESSAGE: &str = "Failed to generate the image";
const CONFIRM_EMAIL_MESSAGE: &str = "Check your email to confirm your account, then log in.";

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    quotes: Arc<dyn QuoteStore>,
    profiles: Arc<dyn ProfileStore>,
    avatars: Option<Arc<dyn AvatarStorage>>,
    identity: IdentityResolver,
    authenticator: Option<Arc<dyn PasswordAuthenticator>>,
    endpoint_rate_limiter: Arc<EndpointRateLimiter>,
}

impl AppState {
    /// Wire the configured store backend and the Supabase services.
    pub fn from_config(config: Arc<AppConfig>) -> Result<Self, quotes_core::Error> {
        // Each browser carries its own token, so the client keeps no session.
        let auth_client = match &config.supabase {
            Some(project) => Some(Arc::new(SupabaseAuthClient::new(
                &project.url,
                project.anon_key.clone(),
                NoSessionPersistence,
            )?)),
            None => None,
        };
        let verifier = auth_client
            .clone()
            .map(|client| client as Arc<dyn TokenVerifier>);
        let authenticator = auth_client.map(|client| client as Arc<dyn PasswordAuthenticator>);
        let avatars: Option<Arc<dyn AvatarStorage>> = match &config.supabase {
            Some(project) => Some(Arc::new(SupabaseStorage::new(
                &project.url,
                project.anon_key.clone(),
            )?)),
            None => None,
        };

        let (quotes, profiles): (Arc<dyn QuoteStore>, Arc<dyn ProfileStore>) = match &config.store
        {
            StoreBackend::Supabase => {
                let project = config.supabase.as_ref().ok_or_else(|| {
                    quotes_core::Error::Config("Supabase store needs SUPABASE_URL".to_string())
                })?;
                let store = Arc::new(PostgrestStore::new(&PostgrestConfig::new(
                    &project.url,
                    project.anon_key.clone(),
                )?)?);
                (store.clone(), store)
            }
            StoreBackend::Sqlite(path) => {
                let store = Arc::new(SqliteStore::open(path)?);
                (store.clone(), store)
            }
        };

        Ok(Self::new(
            config,
            quotes,
            profiles,
            avatars,
            IdentityResolver::new(verifier),
            authenticator,
        ))
    }

    pub fn new(
        config: Arc<AppConfig>,
        quotes: Arc<dyn QuoteStore>,
        profiles: Arc<dyn ProfileStore>,
        avatars: Option<Arc<dyn AvatarStorage>>,
        identity: IdentityResolver,
        authenticator: Option<Arc<dyn PasswordAuthenticator>>,
    ) -> Self {
        Self {
            endpoint_rate_limiter: Arc::new(EndpointRateLimiter::from_config(config.as_ref())),
            config,
            quotes,
            profiles,
            avatars,
            identity,
            authenticator,
        }
    }
}

pub fn app_router(state: AppState) -> Router {
    let protected_routes = Router::new()
        .route("/api/quotes", post(create_quote))
        .route(
            "/api/quotes/{id}",
            patch(update_quote).delete(delete_quote),
        )
        .route("/api/profile", get(get_profile).put(put_profile))
        .route(
            "/api/profile/avatar",
            post(upload_avatar).layer(DefaultBodyLimit::max(MAX_AVATAR_BYTES + 1024)),
        )
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .route("/", get(list_page))
        .route("/login", get(login_page).post(login))
        .route("/signup", get(signup_page).post(signup))
        .route("/logout", post(logout))
        .route("/quotes", post(add_quote_form))
        .route("/quote/{id}", get(quote_page))
        .route("/quote/{id}/edit", get(edit_page).post(edit_quote_form))
        .route("/quote/{id}/delete", post(delete_quote_form))
        .route("/quote/{id}/image.png", get(share_image))
        .route("/api/og", get(og_image))
        .route("/sitemap.xml", get(sitemap))
        .route("/healthz", get(healthz))
        .route("/api/quotes", get(list_quotes))
        .route("/api/quotes/{id}", get(get_quote))
        .route("/api/categories", get(list_categories))
        .merge(protected_routes)
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_headers(Any)
                .allow_methods(Any),
        )
        .with_state(state)
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    timestamp: i64,
    rate_limit: RateLimitMetricsSnapshot,
}

async fn healthz(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        timestamp: Utc::now().timestamp(),
        rate_limit: state.endpoint_rate_limiter.metrics_snapshot(),
    })
}

async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let user = state.identity.require(request.headers()).await?;
    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}

fn parse_id(raw: &str) -> Result<QuoteId, AppError> {
    raw.parse::<QuoteId>().map_err(AppError::from)
}

async fn find_quote(state: &AppState, raw_id: &str) -> Result<Option<Quote>, AppError> {
    let id = parse_id(raw_id)?;
    Ok(state.quotes.get_quote(&id).await?)
}

// HTML pages

async fn list_page(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(raw): Query<RawListQuery>,
) -> Html<String> {
    let user = state.identity.optional(&headers).await;
    let params = ListParams::from_query(&raw);
    Html(render_list(&state, &params, user.as_ref(), None, None).await)
}

async fn render_list(
    state: &AppState,
    params: &ListParams,
    user: Option<&AuthenticatedUser>,
    form: Option<&QuoteForm>,
    message: Option<&str>,
) -> String {
    let user_id = user.map(|user| user.user_id.as_str());
    let outcome = match QuotePage::fetch(state.quotes.as_ref(), params, user_id).await {
        Ok(page) => ListOutcome::Page(page),
        Err(error) => {
            tracing::warn!("Failed to load quotes: {}", error);
            ListOutcome::Failed(error.user_message())
        }
    };
    let categories = state.quotes.list_categories().await.unwrap_or_else(|error| {
        tracing::warn!("Failed to load categories: {}", error);
        Vec::new()
    });

    pages::render_list_page(&ListView {
        params,
        outcome,
        categories: &categories,
        user_id,
        form,
        message,
    })
}

async fn add_quote_form(
    State(state): State<AppState>,
    headers: HeaderMap,
    Form(form): Form<QuoteForm>,
) -> Response {
    let user = state.identity.optional(&headers).await;
    let result = match &user {
        Some(user) => match state
            .endpoint_rate_limiter
            .check(ProtectedEndpoint::QuoteWrite, &user.user_id)
            .await
        {
            Ok(()) => submit(&state, user, &form).await,
            Err(error) => Err(error),
        },
        None => {
            let session = request_session(None);
            controller::submit_quote(state.quotes.as_ref(), &session, &form)
                .await
                .map_err(AppError::from)
        }
    };

    match result {
        Ok(_) => Redirect::to("/").into_response(),
        Err(error) => {
            let message = error.message().to_string();
            let html = render_list(
                &state,
                &ListParams::default(),
                user.as_ref(),
                Some(&form),
                Some(&message),
            )
            .await;
            (error.status(), Html(html)).into_response()
        }
    }
}

async fn submit(
    state: &AppState,
    user: &AuthenticatedUser,
    form: &QuoteForm,
) -> Result<Quote, AppError> {
    let quote = controller::submit_quote(state.quotes.as_ref(), &user.session(), form).await?;
    tracing::info!(
        endpoint = "quote_create",
        user = user_fingerprint(&user.user_id),
        content_len = quote.content.len(),
        "Created quote"
    );
    Ok(quote)
}

async fn quote_page(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Response {
    match find_quote(&state, &id).await {
        Ok(Some(quote)) => {
            let user = state.identity.optional(&headers).await;
            let user_id = user.as_ref().map(|user| user.user_id.as_str());
            Html(pages::render_quote_page(
                &quote,
                &state.config.public_base_url,
                user_id,
            ))
            .into_response()
        }
        Ok(None) => not_found_page(),
        Err(error) => {
            tracing::warn!("Failed to load quote page: {}", error);
            if error.status() == StatusCode::BAD_REQUEST {
                not_found_page()
            } else {
                error.into_response()
            }
        }
    }
}

fn not_found_page() -> Response {
    (StatusCode::NOT_FOUND, Html(pages::render_not_found_page())).into_response()
}

async fn edit_page(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    let Some(quote) = find_quote(&state, &id).await? else {
        return Ok(not_found_page());
    };
    let user = state.identity.optional(&headers).await;
    if !controller::can_edit(&quote, user.as_ref().map(|user| user.user_id.as_str())) {
        return Ok(Redirect::to(&quote_path(&quote.id)).into_response());
    }
    let form = QuoteForm::from_quote(&quote);
    Ok(Html(pages::render_edit_page(&quote, &form, None)).into_response())
}

async fn edit_quote_form(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Form(form): Form<QuoteForm>,
) -> Result<Response, AppError> {
    let Some(quote) = find_quote(&state, &id).await? else {
        return Ok(not_found_page());
    };
    let user = state.identity.optional(&headers).await;
    let result = edit(&state, user.as_ref(), &quote.id, &form).await;

    Ok(match result {
        Ok(updated) => Redirect::to(&quote_path(&updated.id)).into_response(),
        Err(error) => {
            let message = error.message().to_string();
            (
                error.status(),
                Html(pages::render_edit_page(&quote, &form, Some(&message))),
            )
                .into_response()
        }
    })
}

async fn edit(
    state: &AppState,
    user: Option<&AuthenticatedUser>,
    id: &QuoteId,
    form: &QuoteForm,
) -> Result<Quote, AppError> {
    if let Some(user) = user {
        state
            .endpoint_rate_limiter
            .check(ProtectedEndpoint::QuoteWrite, &user.user_id)
            .await?;
    }
    let quote =
        controller::save_quote_edit(state.quotes.as_ref(), &request_session(user), id, form)
            .await?;
    if let Some(user) = user {
        tracing::info!(
            endpoint = "quote_update",
            user = user_fingerprint(&user.user_id),
            "Updated quote"
        );
    }
    Ok(quote)
}

async fn delete_quote_form(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    let id = parse_id(&id)?;
    let user = state.identity.optional(&headers).await;
    match remove(&state, user.as_ref(), &id).await {
        Ok(()) => Ok(Redirect::to("/").into_response()),
        Err(error) => {
            let message = error.message().to_string();
            let html = render_list(
                &state,
                &ListParams::default(),
                user.as_ref(),
                None,
                Some(&message),
            )
            .await;
            Ok((error.status(), Html(html)).into_response())
        }
    }
}

async fn remove(
    state: &AppState,
    user: Option<&AuthenticatedUser>,
    id: &QuoteId,
) -> Result<(), AppError> {
    if let Some(user) = user {
        state
            .endpoint_rate_limiter
            .check(ProtectedEndpoint::QuoteWrite, &user.user_id)
            .await?;
    }
    controller::remove_quote(state.quotes.as_ref(), &request_session(user), id).await?;
    if let Some(user) = user {
        tracing::info!(
            endpoint = "quote_delete",
            user = user_fingerprint(&user.user_id),
            "Deleted quote"
        );
    }
    Ok(())
}

fn quote_path(id: &QuoteId) -> String {
    format!("/quote/{}", urlencoding::encode(id.as_str()))
}

// Accounts

#[derive(Debug, Default, Deserialize)]
struct Credentials {
    #[serde(default)]
    email: String,
    #[serde(default)]
    password: String,
}

async fn login_page() -> Html<String> {
    Html(pages::render_account_page(AccountForm::Login, "", None, None))
}

async fn signup_page() -> Html<String> {
    Html(pages::render_account_page(AccountForm::SignUp, "", None, None))
}

async fn login(State(state): State<AppState>, Form(credentials): Form<Credentials>) -> Response {
    let email = credentials.email.trim();
    let result = match authenticator(&state) {
        Ok(client) => client
            .sign_in(email, &credentials.password)
            .await
            .map_err(account_error),
        Err(error) => Err(error),
    };

    match result.and_then(|session| signed_in_redirect(&state, &session)) {
        Ok(response) => response,
        Err(error) => account_form_error(AccountForm::Login, email, &error),
    }
}

async fn signup(State(state): State<AppState>, Form(credentials): Form<Credentials>) -> Response {
    let email = credentials.email.trim();
    let result = match authenticator(&state) {
        Ok(client) => client
            .sign_up(email, &credentials.password)
            .await
            .map_err(account_error),
        Err(error) => Err(error),
    };

    match result {
        Ok(SignUpOutcome::SignedIn(session)) => signed_in_redirect(&state, &session)
            .unwrap_or_else(|error| account_form_error(AccountForm::SignUp, email, &error)),
        Ok(SignUpOutcome::ConfirmationRequired) => {
            tracing::info!(endpoint = "signup", "Sign-up awaits email confirmation");
            Html(pages::render_account_page(
                AccountForm::Login,
                email,
                None,
                Some(CONFIRM_EMAIL_MESSAGE),
            ))
            .into_response()
        }
        Err(error) => account_form_error(AccountForm::SignUp, email, &error),
    }
}

async fn logout(State(state): State<AppState>, headers: HeaderMap) -> Result<Response, AppError> {
    let token = extract_access_token(&headers).ok().flatten();
    if let (Some(token), Some(client)) = (token, state.authenticator.as_ref()) {
        if let Err(error) = client.sign_out(token).await {
            tracing::warn!("Sign-out request failed: {}", error);
        }
    }
    with_cookie(
        Redirect::to("/").into_response(),
        &cleared_session_cookie(secure_cookies(&state)),
    )
}

fn authenticator(state: &AppState) -> Result<&Arc<dyn PasswordAuthenticator>, AppError> {
    state
        .authenticator
        .as_ref()
        .ok_or_else(|| AppError::Config("Sign-in is not configured on this server".to_string()))
}

/// Provider rejections are shown to the visitor as-is.
fn account_error(error: AuthError) -> AppError {
    match error {
        AuthError::Api(message) => AppError::unauthorized(message),
        other => other.into(),
    }
}

fn account_form_error(form: AccountForm, email: &str, error: &AppError) -> Response {
    if error.status().is_server_error() {
        tracing::warn!("Account request failed: {}", error);
    }
    (
        error.status(),
        Html(pages::render_account_page(form, email, Some(error.message()), None)),
    )
        .into_response()
}

fn signed_in_redirect(state: &AppState, session: &AuthSession) -> Result<Response, AppError> {
    tracing::info!(
        endpoint = "login",
        user = user_fingerprint(&session.user.id),
        "Signed in"
    );
    let max_age = session.expires_at.saturating_sub(Utc::now().timestamp());
    with_cookie(
        Redirect::to("/").into_response(),
        &session_cookie(&session.access_token, max_age, secure_cookies(state)),
    )
}

fn secure_cookies(state: &AppState) -> bool {
    state.config.public_base_url.starts_with("https://")
}

fn with_cookie(mut response: Response, cookie: &str) -> Result<Response, AppError> {
    let value = HeaderValue::from_str(cookie)
        .map_err(|_| AppError::Internal("Session cookie is not a valid header".to_string()))?;
    response.headers_mut().append(header::SET_COOKIE, value);
    Ok(response)
}

// Images and indexes

#[derive(Debug, Default, Deserialize)]
struct OgQuery {
    quote: Option<String>,
    author: Option<String>,
}

async fn og_image(Query(query): Query<OgQuery>) -> Response {
    let card = SocialCard::from_params(query.quote.as_deref(), query.author.as_deref());
    match render_social_card_png(card).await {
        Ok(png) => png_response(png, None),
        Err(error) => {
            tracing::error!("Social image rendering failed: {}", error);
            (StatusCode::INTERNAL_SERVER_ERROR, OG_FAILURE_MESSAGE).into_response()
        }
    }
}

async fn share_image(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    let quote = find_quote(&state, &id)
        .await?
        .ok_or_else(|| AppError::not_found("Quote not found"))?;
    let handle = spawn_share_card(
        ShareCard::from(&quote),
        state.config.share_image_pixel_budget,
    );
    let image = join_share_card(handle).await?;
    tracing::debug!(
        width = image.width,
        height = image.height,
        bytes = image.png.len(),
        "Rendered share card"
    );
    Ok(png_response(image.png, Some(&image.file_name)))
}

fn png_response(png: Vec<u8>, file_name: Option<&str>) -> Response {
    let mut response = (
        [
            (header::CONTENT_TYPE, "image/png"),
            (header::CACHE_CONTROL, "public, max-age=86400"),
        ],
        png,
    )
        .into_response();
    if let Some(value) = file_name
        .and_then(|name| HeaderValue::from_str(&format!("inline; filename=\"{name}\"")).ok())
    {
        response
            .headers_mut()
            .insert(header::CONTENT_DISPOSITION, value);
    }
    response
}

async fn sitemap(State(state): State<AppState>) -> Result<Response, AppError> {
    let categories = state.quotes.list_categories().await?;
    let quotes = state.quotes.list_index_entries(MAX_INDEX_ENTRIES).await?;
    let entries = sitemap_entries(
        &state.config.public_base_url,
        &categories,
        &quotes,
        Utc::now(),
    );
    tracing::debug!(entries = entries.len(), "Rendered sitemap");
    Ok((
        [(header::CONTENT_TYPE, "application/xml; charset=utf-8")],
        render_sitemap(&entries),
    )
        .into_response())
}

// JSON API

async fn list_quotes(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(raw): Query<RawListQuery>,
) -> Result<Json<QuotePage>, AppError> {
    let user = state.identity.optional(&headers).await;
    let params = ListParams::from_query(&raw);
    let page = QuotePage::fetch(
        state.quotes.as_ref(),
        &params,
        user.as_ref().map(|user| user.user_id.as_str()),
    )
    .await?;
    Ok(Json(page))
}

async fn get_quote(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Quote>, AppError> {
    find_quote(&state, &id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::not_found("Quote not found"))
}

async fn list_categories(State(state): State<AppState>) -> Result<Json<Vec<String>>, AppError> {
    Ok(Json(state.quotes.list_categories().await?))
}

async fn create_quote(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Json(form): Json<QuoteForm>,
) -> Result<(StatusCode, Json<Quote>), AppError> {
    state
        .endpoint_rate_limiter
        .check(ProtectedEndpoint::QuoteWrite, &user.user_id)
        .await?;
    let quote = submit(&state, &user, &form).await?;
    Ok((StatusCode::CREATED, Json(quote)))
}

async fn update_quote(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<String>,
    Json(form): Json<QuoteForm>,
) -> Result<Json<Quote>, AppError> {
    let id = parse_id(&id)?;
    Ok(Json(edit(&state, Some(&user), &id, &form).await?))
}

async fn delete_quote(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    let id = parse_id(&id)?;
    remove(&state, Some(&user), &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn get_profile(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
) -> Result<Json<Profile>, AppError> {
    let profile = controller::load_profile(state.profiles.as_ref(), &user.session()).await?;
    Ok(Json(profile))
}

async fn put_profile(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Json(form): Json<ProfileForm>,
) -> Result<Json<Profile>, AppError> {
    let profile = controller::save_profile(state.profiles.as_ref(), &user.session(), form).await?;
    tracing::info!(
        endpoint = "profile_update",
        user = user_fingerprint(&user.user_id),
        has_avatar = profile.avatar_url.is_some(),
        "Saved profile"
    );
    Ok(Json(profile))
}

#[derive(Debug, Deserialize)]
struct AvatarQuery {
    file_name: String,
}

#[derive(Debug, Serialize)]
struct AvatarResponse {
    avatar_url: String,
}

async fn upload_avatar(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Query(query): Query<AvatarQuery>,
    body: Bytes,
) -> Result<Json<AvatarResponse>, AppError> {
    state
        .endpoint_rate_limiter
        .check(ProtectedEndpoint::AvatarUpload, &user.user_id)
        .await?;

    let storage = state.avatars.as_ref().ok_or_else(|| {
        AppError::Config("Avatar storage is not configured on this server".to_string())
    })?;
    let avatar_url = controller::upload_avatar(
        storage.as_ref(),
        &user.session(),
        &query.file_name,
        body.to_vec(),
    )
    .await?;
    tracing::info!(
        endpoint = "avatar_upload",
        user = user_fingerprint(&user.user_id),
        bytes = body.len(),
        "Uploaded avatar"
    );
    Ok(Json(AvatarResponse { avatar_url }))
}
