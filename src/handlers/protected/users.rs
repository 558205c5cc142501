use axum::extract::{Extension, Path, Query};
use serde::Deserialize;
use serde_json::json;

use crate::access::{RequestContext, Role};
use crate::audit::{self, AuditAction};
use crate::auth::password;
use crate::database::{models::User, Database, Repository};
use crate::error::ApiError;
use crate::filter::{ListParams, Pagination};
use crate::middleware::{ApiResponse, ApiResult};

const USER_COLUMNS: &[&str] = &["email", "name", "role", "created_at"];

static USERS: Repository<User> = Repository::new("users", USER_COLUMNS);

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateUser {
    pub email: String,
    pub password: String,
    pub name: String,
    pub role: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUser {
    pub email: Option<String>,
    pub password: Option<String>,
    pub name: Option<String>,
}

fn snapshot(user: &User) -> serde_json::Value {
    // Never put credential material in the audit log.
    json!({
        "id": user.id,
        "email": user.email,
        "name": user.name,
        "role": user.role,
    })
}

/// True when `user_id` is a manager of the owner's company.
async fn is_company_manager(company_id: i64, user_id: i64) -> Result<bool, ApiError> {
    let pool = Database::pool().await?;
    let found = sqlx::query_scalar::<_, i64>(
        "SELECT user_id FROM manager_profiles WHERE company_id = $1 AND user_id = $2",
    )
    .bind(company_id)
    .bind(user_id)
    .fetch_optional(&pool)
    .await?;
    Ok(found.is_some())
}

fn owner_company(ctx: &RequestContext) -> Result<i64, ApiError> {
    ctx.scope
        .company_id
        .ok_or_else(|| ApiError::forbidden("No company scope resolved for this account"))
}

/// GET /api/users - admin lists everyone; an owner lists the manager
/// accounts of their own company.
pub async fn list(
    Extension(ctx): Extension<RequestContext>,
    Query(params): Query<ListParams>,
) -> ApiResult<Vec<User>> {
    ctx.require_role(&[Role::Admin, Role::Owner])?;

    let pool = Database::pool().await?;
    let mut query = USERS.query()?;
    if !ctx.is_admin() {
        query = query.and_raw(
            "\"id\" IN (SELECT user_id FROM manager_profiles WHERE company_id = $?)",
            json!(owner_company(&ctx)?),
        );
    }

    let (users, total) = USERS.page(&pool, query, &params).await?;
    Ok(ApiResponse::paginated(users, Pagination::new(&params, total)))
}

/// GET /api/users/:id
pub async fn get(
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<i64>,
) -> ApiResult<User> {
    ctx.require_role(&[Role::Admin, Role::Owner])?;

    if !ctx.is_admin() && id != ctx.user.id && !is_company_manager(owner_company(&ctx)?, id).await?
    {
        return Err(ApiError::forbidden("Not a manager of your company"));
    }

    let pool = Database::pool().await?;
    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
        .bind(id)
        .fetch_optional(&pool)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    Ok(ApiResponse::success(user))
}

/// POST /api/users - admin creates any account; an owner creates manager
/// accounts for their own company (the manager profile row rides along).
pub async fn create(
    Extension(ctx): Extension<RequestContext>,
    axum::Json(payload): axum::Json<CreateUser>,
) -> ApiResult<User> {
    ctx.require_role(&[Role::Admin, Role::Owner])?;

    let role: Role = payload
        .role
        .parse()
        .map_err(|e: String| ApiError::bad_request(e))?;

    if !ctx.is_admin() && role != Role::Manager {
        return Err(ApiError::forbidden("Owners may only create manager accounts"));
    }

    let pool = Database::pool().await?;
    let password_hash = password::hash_password(&payload.password);

    let user = sqlx::query_as::<_, User>(
        r#"
        INSERT INTO users (email, password_hash, name, role)
        VALUES ($1, $2, $3, $4)
        RETURNING *
        "#,
    )
    .bind(&payload.email)
    .bind(&password_hash)
    .bind(&payload.name)
    .bind(role.as_str())
    .fetch_one(&pool)
    .await?;

    if role == Role::Manager {
        let company_id = if ctx.is_admin() {
            ctx.admin_mode.map(|m| m.company_id)
        } else {
            Some(owner_company(&ctx)?)
        };
        if let Some(company_id) = company_id {
            sqlx::query("INSERT INTO manager_profiles (user_id, company_id) VALUES ($1, $2)")
                .bind(user.id)
                .bind(company_id)
                .execute(&pool)
                .await?;
        }
    }

    audit::record(
        &ctx,
        AuditAction::Create,
        "user",
        Some(user.id.to_string()),
        None,
        Some(snapshot(&user)),
    );

    Ok(ApiResponse::created(user))
}

/// PUT /api/users/:id
pub async fn update(
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<i64>,
    axum::Json(payload): axum::Json<UpdateUser>,
) -> ApiResult<User> {
    ctx.require_role(&[Role::Admin, Role::Owner])?;

    if !ctx.is_admin() && !is_company_manager(owner_company(&ctx)?, id).await? {
        return Err(ApiError::forbidden("Not a manager of your company"));
    }

    let pool = Database::pool().await?;
    let before = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
        .bind(id)
        .fetch_optional(&pool)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    let password_hash = payload.password.as_deref().map(password::hash_password);

    let user = sqlx::query_as::<_, User>(
        r#"
        UPDATE users SET
            email = COALESCE($2, email),
            name = COALESCE($3, name),
            password_hash = COALESCE($4, password_hash)
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(payload.email.as_deref())
    .bind(payload.name.as_deref())
    .bind(password_hash.as_deref())
    .fetch_one(&pool)
    .await?;

    audit::record(
        &ctx,
        AuditAction::Update,
        "user",
        Some(id.to_string()),
        Some(snapshot(&before)),
        Some(snapshot(&user)),
    );

    Ok(ApiResponse::success(user))
}

/// DELETE /api/users/:id
pub async fn delete(
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<i64>,
) -> ApiResult<serde_json::Value> {
    ctx.require_role(&[Role::Admin, Role::Owner])?;

    if !ctx.is_admin() && !is_company_manager(owner_company(&ctx)?, id).await? {
        return Err(ApiError::forbidden("Not a manager of your company"));
    }

    let pool = Database::pool().await?;
    let before = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
        .bind(id)
        .fetch_optional(&pool)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    sqlx::query("DELETE FROM users WHERE id = $1")
        .bind(id)
        .execute(&pool)
        .await?;

    audit::record(
        &ctx,
        AuditAction::Delete,
        "user",
        Some(id.to_string()),
        Some(snapshot(&before)),
        None,
    );

    Ok(ApiResponse::success(json!({ "deleted": id })))
}
