//! User directory endpoints. All of them sit behind `auth_middleware`.

use axum::{
    Extension, Json,
    extract::{Path, State},
};
use serde_json::{Map, Value};
use tracing::{debug, info};
use userhub_core::{
    AuthenticatedIdentity, Row,
    database::{execute_on, fetch_rows},
};

use crate::{
    AppState,
    api_types::{ApiResponse, CreatedUser},
    errors::{AppError, AppResult},
};

/// Soft-deleted rows keep this status.
pub const STATUS_DELETED: i64 = 7;

/// Columns a client may write, in the order they appear in generated SQL.
const WRITABLE_COLUMNS: [&str; 4] = ["name", "email", "mobile", "userid"];
const REQUIRED_ON_CREATE: [&str; 3] = ["name", "email", "userid"];
const MAX_TEXT_LEN: usize = 50;

const LIST_ACTIVE_USERS: &str = "SELECT id, name FROM users WHERE status = 1";
const SELECT_USER_BY_ID: &str = "SELECT * FROM users WHERE id = ?";
const LOCK_USER_BY_ID: &str = "SELECT id FROM users WHERE id = ? FOR UPDATE";
const SOFT_DELETE_USER: &str = "UPDATE users SET status = ? WHERE id = ?";

pub async fn list_users(
    State(state): State<AppState>,
    Extension(identity): Extension<AuthenticatedIdentity>,
) -> AppResult<Json<ApiResponse<Vec<Row>>>> {
    let users = state.executor.query(LIST_ACTIVE_USERS, &[]).await?;
    debug!(
        requested_by = identity.subject_id,
        count = users.len(),
        "listed users"
    );
    Ok(Json(ApiResponse::success(users).with_message("user list loaded")))
}

pub async fn get_user(
    State(state): State<AppState>,
    Extension(identity): Extension<AuthenticatedIdentity>,
    Path(user_id): Path<i64>,
) -> AppResult<Json<ApiResponse<Row>>> {
    let user = state
        .executor
        .query_one(SELECT_USER_BY_ID, &[Value::from(user_id)])
        .await?
        .ok_or_else(|| AppError::not_found("user not found"))?;
    debug!(user_id, requested_by = identity.subject_id, "loaded user");
    Ok(Json(ApiResponse::success(user).with_message("user loaded")))
}

pub async fn add_user(
    State(state): State<AppState>,
    Extension(identity): Extension<AuthenticatedIdentity>,
    Json(body): Json<Map<String, Value>>,
) -> AppResult<Json<ApiResponse<CreatedUser>>> {
    let fields = validate_fields(&body, &REQUIRED_ON_CREATE)?;
    let (columns, params): (Vec<&str>, Vec<Value>) = fields.into_iter().unzip();

    let sql = format!(
        "INSERT INTO users ({}) VALUES ({})",
        columns.join(", "),
        vec!["?"; columns.len()].join(", ")
    );
    let result = state.executor.execute(&sql, &params).await?;
    if result.affected_rows == 0 {
        return Err(AppError::internal("user was not created"));
    }

    info!(
        user_id = result.last_insert_id,
        created_by = identity.subject_id,
        "user created"
    );
    Ok(Json(
        ApiResponse::success(CreatedUser {
            id: result.last_insert_id,
        })
        .with_message("user created"),
    ))
}

/// Existence check and update run in one transaction, with the row locked.
pub async fn update_user(
    State(state): State<AppState>,
    Extension(identity): Extension<AuthenticatedIdentity>,
    Path(user_id): Path<i64>,
    Json(body): Json<Map<String, Value>>,
) -> AppResult<Json<ApiResponse<()>>> {
    let fields = validate_fields(&body, &[])?;
    let (columns, mut params): (Vec<&str>, Vec<Value>) =
        fields.into_iter().unzip();
    params.push(Value::from(user_id));

    let assignments: Vec<String> =
        columns.iter().map(|column| format!("{column} = ?")).collect();
    let sql = format!(
        "UPDATE users SET {} WHERE id = ?",
        assignments.join(", ")
    );

    let updated = state
        .executor
        .transaction(move |conn| {
            Box::pin(async move {
                let existing =
                    fetch_rows(conn, LOCK_USER_BY_ID, &[Value::from(user_id)])
                        .await?;
                if existing.is_empty() {
                    return Ok(None);
                }
                execute_on(conn, &sql, &params).await.map(Some)
            })
        })
        .await?;

    match updated {
        None => Err(AppError::not_found("user not found")),
        Some(result) if result.affected_rows == 0 => {
            Err(AppError::internal("user was not updated"))
        }
        Some(_) => {
            info!(user_id, updated_by = identity.subject_id, "user updated");
            Ok(Json(ApiResponse::ok("user updated")))
        }
    }
}

/// Marks the user deleted (`status = 7`); the row itself is kept.
pub async fn delete_user(
    State(state): State<AppState>,
    Extension(identity): Extension<AuthenticatedIdentity>,
    Path(user_id): Path<i64>,
) -> AppResult<Json<ApiResponse<()>>> {
    let deleted = state
        .executor
        .transaction(move |conn| {
            Box::pin(async move {
                let id = Value::from(user_id);
                let existing =
                    fetch_rows(conn, LOCK_USER_BY_ID, &[id.clone()]).await?;
                if existing.is_empty() {
                    return Ok(None);
                }
                execute_on(
                    conn,
                    SOFT_DELETE_USER,
                    &[Value::from(STATUS_DELETED), id],
                )
                .await
                .map(Some)
            })
        })
        .await?;

    match deleted {
        None => Err(AppError::not_found("user not found")),
        Some(result) if result.affected_rows == 0 => {
            Err(AppError::internal("user was not deleted"))
        }
        Some(_) => {
            info!(user_id, deleted_by = identity.subject_id, "user deleted");
            Ok(Json(ApiResponse::ok("user deleted")))
        }
    }
}

/// Check a request body against the writable columns.
///
/// Returns `(column, value)` pairs in [`WRITABLE_COLUMNS`] order; column
/// names in generated SQL only ever come from that list.
fn validate_fields(
    body: &Map<String, Value>,
    required: &[&str],
) -> Result<Vec<(&'static str, Value)>, AppError> {
    if body.is_empty() {
        return Err(AppError::bad_request("no data provided"));
    }
    if let Some(unknown) =
        body.keys().find(|key| !WRITABLE_COLUMNS.contains(&key.as_str()))
    {
        return Err(AppError::bad_request(format!("unknown field `{unknown}`")));
    }
    if let Some(missing) = required.iter().find(|key| !body.contains_key(**key))
    {
        return Err(AppError::bad_request(format!(
            "missing required field `{missing}`"
        )));
    }

    let mut fields = Vec::with_capacity(body.len());
    for column in WRITABLE_COLUMNS {
        let Some(value) = body.get(column) else {
            continue;
        };
        check_value(column, value).map_err(|reason| {
            AppError::bad_request(format!("invalid `{column}`: {reason}"))
        })?;
        fields.push((column, value.clone()));
    }
    Ok(fields)
}

fn check_value(column: &str, value: &Value) -> Result<(), &'static str> {
    if column == "mobile" && value.is_null() {
        return Ok(());
    }
    let Some(text) = value.as_str() else {
        return Err("must be a string");
    };
    let len = text.chars().count();
    match column {
        "mobile" => {
            if text.is_empty() || !text.chars().all(|c| c.is_ascii_digit()) {
                return Err("must contain only digits");
            }
        }
        "email" => {
            if !looks_like_email(text) {
                return Err("must be an email address");
            }
        }
        _ => {}
    }
    if len == 0 || len > MAX_TEXT_LEN {
        return Err("must be 1-50 characters");
    }
    Ok(())
}

fn looks_like_email(text: &str) -> bool {
    match text.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn body(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            other => panic!("expected object, got {other}"),
        }
    }

    #[test]
    fn create_fields_come_back_in_column_order() {
        let fields = validate_fields(
            &body(json!({
                "userid": "u-1",
                "email": "ann@example.com",
                "name": "ann",
            })),
            &REQUIRED_ON_CREATE,
        )
        .unwrap();

        let columns: Vec<&str> = fields.iter().map(|(c, _)| *c).collect();
        assert_eq!(columns, ["name", "email", "userid"]);
    }

    #[test]
    fn unknown_columns_are_rejected() {
        let err = validate_fields(
            &body(json!({"name": "ann", "status": 1})),
            &[],
        )
        .unwrap_err();
        assert!(err.message.contains("status"));
    }

    #[test]
    fn injection_through_keys_is_impossible() {
        let err = validate_fields(
            &body(json!({"name = 'x', status": "1"})),
            &[],
        )
        .unwrap_err();
        assert!(err.message.starts_with("unknown field"));
    }

    #[test]
    fn missing_required_field_is_named() {
        let err = validate_fields(
            &body(json!({"name": "ann", "email": "ann@example.com"})),
            &REQUIRED_ON_CREATE,
        )
        .unwrap_err();
        assert!(err.message.contains("userid"));
    }

    #[test]
    fn empty_body_is_rejected() {
        assert!(validate_fields(&Map::new(), &[]).is_err());
    }

    #[test]
    fn field_rules() {
        assert!(check_value("mobile", &json!("13800138000")).is_ok());
        assert!(check_value("mobile", &Value::Null).is_ok());
        assert!(check_value("mobile", &json!("+86 138")).is_err());
        assert!(check_value("email", &json!("ann@example.com")).is_ok());
        assert!(check_value("email", &json!("ann@localhost")).is_err());
        assert!(check_value("email", &json!("@example.com")).is_err());
        assert!(check_value("name", &json!("")).is_err());
        assert!(check_value("name", &json!("x".repeat(51))).is_err());
        assert!(check_value("name", &json!(42)).is_err());
        assert!(check_value("userid", &Value::Null).is_err());
    }
}
