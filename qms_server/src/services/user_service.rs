//! Sign-in, current user lookup and admin provisioning.

use chrono::Utc;
use diesel::prelude::*;
use diesel_async::{AsyncPgConnection, RunQueryDsl};

use crate::auth::password::{hash_password, verify_password};
use crate::auth::rbac::Role;
use crate::auth::token;
use crate::config::QmsConfig;
use crate::error::Rejection;
use crate::models::user::{NewQmsUser, QmsUser, SignInRequest, SignInResponse, UserView};
use crate::schema::qms_users;

/// Outcome of a credential check that did not produce a session.
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
#[error("Invalid email or password")]
pub struct InvalidCredentials;

/// Check credentials and issue a session token.
///
/// Unknown emails, inactive users and wrong passwords all yield
/// [`InvalidCredentials`].
pub async fn sign_in(
    conn: &mut AsyncPgConnection,
    config: &QmsConfig,
    req: SignInRequest,
) -> anyhow::Result<SignInResponse> {
    let email = req.email.trim().to_lowercase();
    let user: Option<QmsUser> = qms_users::table
        .filter(qms_users::email.eq(&email))
        .filter(qms_users::active.eq(true))
        .select(QmsUser::as_select())
        .first(conn)
        .await
        .optional()?;

    let Some(user) = user.filter(|u| verify_password(&req.password, &u.password_hash)) else {
        crate::metrics::sign_in("rejected");
        tracing::info!(email = %email, "Sign-in rejected");
        return Err(InvalidCredentials.into());
    };

    let role: Role = user
        .role
        .parse()
        .map_err(|e: String| anyhow::anyhow!("user {} has {e}", user.id))?;
    let token = token::issue(&config.auth_secret, user.id, role, config.session_ttl(), Utc::now())?;

    crate::metrics::sign_in("accepted");
    tracing::info!(user_id = user.id, role = %role, "Signed in");

    Ok(SignInResponse {
        token,
        user: user.into(),
    })
}

/// Load the active user behind a session.
pub async fn find(conn: &mut AsyncPgConnection, user_id: i64) -> anyhow::Result<UserView> {
    let user: Option<QmsUser> = qms_users::table
        .find(user_id)
        .filter(qms_users::active.eq(true))
        .select(QmsUser::as_select())
        .first(conn)
        .await
        .optional()?;
    user.map(UserView::from)
        .ok_or_else(|| Rejection::NotFound("User not found".to_string()).into())
}

/// Display name of a user, falling back to their email.
pub async fn display_name(conn: &mut AsyncPgConnection, user_id: i64) -> anyhow::Result<String> {
    let user = find(conn, user_id).await?;
    Ok(if user.name.trim().is_empty() {
        user.email
    } else {
        user.name
    })
}

/// Create an admin account, or reset the password and role of an existing one.
pub async fn upsert_admin(
    conn: &mut AsyncPgConnection,
    email: &str,
    name: &str,
    password: &str,
) -> anyhow::Result<UserView> {
    let email = email.trim().to_lowercase();
    if !crate::models::email_is_valid(&email) {
        anyhow::bail!("'{email}' is not a valid email address");
    }
    let new_user = NewQmsUser {
        email,
        name: name.trim().to_string(),
        password_hash: hash_password(password)?,
        role: Role::Admin.as_str().to_string(),
    };

    let user: QmsUser = diesel::insert_into(qms_users::table)
        .values(&new_user)
        .on_conflict(qms_users::email)
        .do_update()
        .set((
            qms_users::name.eq(&new_user.name),
            qms_users::password_hash.eq(&new_user.password_hash),
            qms_users::role.eq(&new_user.role),
            qms_users::active.eq(true),
            qms_users::write_date.eq(Utc::now()),
        ))
        .returning(QmsUser::as_returning())
        .get_result(conn)
        .await?;

    tracing::info!(user_id = user.id, email = %user.email, "Admin user provisioned");
    Ok(user.into())
}
