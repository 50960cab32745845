use std::convert::Infallible;

use serde::de::DeserializeOwned;
use warp::{
    http::{
        header::{
            HeaderMap, HeaderValue, ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS,
            ACCESS_CONTROL_ALLOW_ORIGIN, AUTHORIZATION,
        },
        Method,
    },
    hyper::{body::Bytes, StatusCode},
    path,
    reject::{LengthRequired, MethodNotAllowed, PayloadTooLarge},
    Filter, Rejection, Reply,
};

use crate::{
    auth::Auth,
    error::{ApiError, AuthError},
    handlers,
    repository::EmployeeRepository,
    types::{EmployeeDetails, ErrorResponse, LoginRequest, Subject},
};

/// Largest request body accepted by any route.
pub const MAX_BODY_BYTES: u64 = 16 * 1024;

/// The complete service: CORS preflight, the public login route, and the
/// bearer-protected employee routes, with every rejection rendered as JSON.
pub fn build_routes(
    auth: &Auth,
    repo: EmployeeRepository,
) -> impl Filter<Extract = impl Reply, Error = Infallible> + Clone {
    let login = path!("login")
        .and(warp::post())
        .and(decode_body::<LoginRequest>(|_| ApiError::InvalidRequestBody))
        .and(with_state(auth.clone()))
        .and_then(handlers::login);

    preflight()
        .or(login)
        .or(employee_routes(auth, repo))
        .recover(handle_rejection)
        .with(warp::reply::with::headers(cors_headers()))
        .with(warp::trace::request())
}

pub fn employee_routes(
    auth: &Auth,
    repo: EmployeeRepository,
) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    // method filters run before the gate so only the matching route authenticates
    let list = path!("api" / "employees")
        .and(warp::get())
        .and(with_auth(auth))
        .and(with_state(repo.clone()))
        .and_then(handlers::list_employees);

    let get = path!("api" / "employees" / String)
        .and(warp::get())
        .and(with_auth(auth))
        .and(with_state(repo.clone()))
        .and_then(handlers::get_employee);

    let create = path!("api" / "employees")
        .and(warp::post())
        .and(with_auth(auth))
        .and(json_body::<EmployeeDetails>())
        .and(with_state(repo.clone()))
        .and_then(handlers::create_employee);

    let update = path!("api" / "employees" / String)
        .and(warp::put())
        .and(with_auth(auth))
        .and(json_body::<EmployeeDetails>())
        .and(with_state(repo.clone()))
        .and_then(handlers::update_employee);

    let delete = path!("api" / "employees" / String)
        .and(warp::delete())
        .and(with_auth(auth))
        .and(with_state(repo))
        .and_then(handlers::delete_employee);

    list.or(get).or(create).or(update).or(delete)
}

/// Admit requests carrying a valid bearer token, extracting its subject.
pub fn with_auth(auth: &Auth) -> impl Filter<Extract = (Subject,), Error = Rejection> + Clone {
    warp::header::headers_cloned()
        .and(with_state(auth.clone()))
        .and_then(user_auth_check)
}

pub async fn handle_rejection(err: Rejection) -> Result<impl Reply, Infallible> {
    let (status, message) = if let Some(auth_error) = err.find::<AuthError>() {
        (auth_error.status(), auth_error.to_string())
    } else if let Some(api_error) = err.find::<ApiError>() {
        (api_error.status(), api_error.public_message())
    } else if err.is_not_found() {
        (StatusCode::NOT_FOUND, "Not Found".to_string())
    } else if err.find::<PayloadTooLarge>().is_some() {
        (
            StatusCode::PAYLOAD_TOO_LARGE,
            "Request body is too large".to_string(),
        )
    } else if err.find::<LengthRequired>().is_some() {
        (
            StatusCode::LENGTH_REQUIRED,
            "Content-Length header is required".to_string(),
        )
    } else if err.find::<MethodNotAllowed>().is_some() {
        (
            StatusCode::METHOD_NOT_ALLOWED,
            "Method Not Allowed".to_string(),
        )
    } else {
        tracing::error!(rejection = ?err, "unhandled rejection");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            "internal server error".to_string(),
        )
    };

    Ok(warp::reply::with_status(
        warp::reply::json(&ErrorResponse { error: message }),
        status,
    ))
}

fn cors_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
    headers.insert(
        ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static("GET, POST, PUT, DELETE, OPTIONS"),
    );
    headers.insert(
        ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static("Content-Type, Authorization"),
    );
    headers
}

// Answers OPTIONS on any path; every other method falls through as not-found
// so it does not mask the real routes' rejections.
fn preflight() -> impl Filter<Extract = (StatusCode,), Error = Rejection> + Clone {
    warp::method().and_then(|method: Method| async move {
        if method == Method::OPTIONS {
            Ok(StatusCode::NO_CONTENT)
        } else {
            Err(warp::reject::not_found())
        }
    })
}

fn json_body<T>() -> impl Filter<Extract = (T,), Error = Rejection> + Clone
where
    T: DeserializeOwned + Send,
{
    decode_body(|err| ApiError::InvalidBody(format!("Invalid request body: {err}")))
}

fn decode_body<T>(
    on_error: fn(serde_json::Error) -> ApiError,
) -> impl Filter<Extract = (T,), Error = Rejection> + Clone
where
    T: DeserializeOwned + Send,
{
    warp::body::content_length_limit(MAX_BODY_BYTES)
        .and(warp::body::bytes())
        .and_then(move |body: Bytes| async move {
            serde_json::from_slice::<T>(&body).map_err(|err| warp::reject::custom(on_error(err)))
        })
}

// Unwrap the bearer token and validate it
async fn user_auth_check(headers: HeaderMap, auth: Auth) -> Result<Subject, Rejection> {
    let header = headers
        .get(AUTHORIZATION)
        .map(|value| value.to_str().map_err(|_| AuthError::MalformedHeader))
        .transpose();

    header
        .and_then(|header| auth.authenticate(header))
        .map_err(|err| {
            tracing::debug!(reason = %err, "request rejected by auth gate");
            warp::reject::custom(err)
        })
}

// functor that adds a clone of shared state into the filter chain
fn with_state<T>(state: T) -> impl Filter<Extract = (T,), Error = Infallible> + Clone
where
    T: Clone + Send,
{
    warp::any().map(move || state.clone())
}
