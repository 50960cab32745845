use validator::Validate;
use warp::{hyper::StatusCode, reply, Rejection, Reply};

use crate::{
    auth::Auth,
    error::{ApiError, AuthError},
    object_id::ObjectId,
    repository::EmployeeRepository,
    types::{EmployeeDetails, LoginRequest, LoginResponse, MessageResponse, Subject},
};

pub(crate) async fn login(input: LoginRequest, auth: Auth) -> Result<impl Reply, Rejection> {
    if input.username.is_empty() || input.password.is_empty() {
        Err(ApiError::InvalidRequestBody)?;
    }

    let token = match auth.login(&input) {
        Ok(token) => token,
        Err(err @ AuthError::LoginFailed) => {
            tracing::warn!("login rejected");
            Err(err)?
        }
        Err(err) => {
            tracing::error!(error = ?err, "token signing failed");
            Err(err)?
        }
    };

    tracing::info!(subject = %input.username, "login succeeded");

    Ok(reply::json(&LoginResponse { token }))
}

pub(crate) async fn list_employees(
    subject: Subject,
    repo: EmployeeRepository,
) -> Result<impl Reply, Rejection> {
    let employees = repo.list().await?;

    tracing::debug!(subject = %subject.0, count = employees.len(), "listed employees");

    Ok(reply::json(&employees))
}

pub(crate) async fn get_employee(
    id: String,
    _subject: Subject,
    repo: EmployeeRepository,
) -> Result<impl Reply, Rejection> {
    let id = parse_id(&id)?;
    let employee = repo.get(&id).await?;

    Ok(reply::json(&employee))
}

pub(crate) async fn create_employee(
    subject: Subject,
    details: EmployeeDetails,
    repo: EmployeeRepository,
) -> Result<impl Reply, Rejection> {
    validate(&details)?;
    let employee = repo.create(details).await?;

    tracing::info!(subject = %subject.0, id = %employee.id, "employee created");

    Ok(reply::with_status(
        reply::json(&employee),
        StatusCode::CREATED,
    ))
}

pub(crate) async fn update_employee(
    id: String,
    subject: Subject,
    details: EmployeeDetails,
    repo: EmployeeRepository,
) -> Result<impl Reply, Rejection> {
    let id = parse_id(&id)?;
    validate(&details)?;
    let employee = repo.update(&id, details).await?;

    tracing::info!(subject = %subject.0, %id, "employee updated");

    Ok(reply::json(&employee))
}

pub(crate) async fn delete_employee(
    id: String,
    subject: Subject,
    repo: EmployeeRepository,
) -> Result<impl Reply, Rejection> {
    let id = parse_id(&id)?;
    repo.delete(&id).await?;

    tracing::info!(subject = %subject.0, %id, "employee deleted");

    Ok(reply::json(&MessageResponse {
        message: "Employee deleted successfully".to_string(),
    }))
}

fn parse_id(raw: &str) -> Result<ObjectId, ApiError> {
    raw.parse::<ObjectId>().map_err(|_| ApiError::InvalidId)
}

fn validate(details: &EmployeeDetails) -> Result<(), ApiError> {
    details.validate().map_err(|errors| {
        let mut fields: Vec<_> = errors
            .field_errors()
            .into_keys()
            .map(|field| field.into_owned())
            .collect();
        fields.sort();
        ApiError::InvalidBody(format!("invalid or missing fields: {}", fields.join(", ")))
    })
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;

    fn details() -> EmployeeDetails {
        EmployeeDetails {
            first_name: "John".into(),
            last_name: "Doe".into(),
            email: "john.doe@example.com".into(),
            phone: "1234567890".into(),
            position: "Developer".into(),
            department: "Engineering".into(),
            hire_date: Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap(),
        }
    }

    #[test]
    fn ids_must_be_24_hex_characters() {
        assert!(parse_id("65f1c0ffee0123456789abcd").is_ok());
        assert!(matches!(parse_id("123"), Err(ApiError::InvalidId)));
        assert!(matches!(
            parse_id("65f1c0ffee0123456789abcg"),
            Err(ApiError::InvalidId)
        ));
    }

    #[test]
    fn validation_names_every_bad_field_in_order() {
        let mut bad = details();
        bad.position.clear();
        bad.email = "john.doe".into();
        bad.phone.clear();

        match validate(&bad) {
            Err(ApiError::InvalidBody(message)) => assert_eq!(
                message,
                "invalid or missing fields: email, phone, position"
            ),
            other => panic!("unexpected result {other:?}"),
        }
        assert!(validate(&details()).is_ok());
    }
}
