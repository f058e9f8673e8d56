use tracing::{debug, info, instrument};

use crate::auth::jwt::generate_access_token;
use crate::auth::password::{hash_password, verify_password};
use crate::error::AppError;
use crate::store::Store;

/// Check the admin's password and issue an access token.
#[instrument(name = "admin_login", skip(store, password, secret))]
pub async fn admin_login(
    store: &dyn Store,
    username: &str,
    password: &str,
    secret: &str,
    ttl: usize,
) -> Result<String, AppError> {
    let Some(admin) = store.find_admin(username).await? else {
        info!("Invalid credentials: admin not found");
        return Err(AppError::InvalidCredentials);
    };

    debug!("Verifying password");
    if let Err(e) = verify_password(password, &admin.password_hash) {
        info!(error = %e, "Invalid credentials: password mismatch");
        return Err(AppError::InvalidCredentials);
    }

    let token = generate_access_token(admin.id, admin.username, secret, ttl).map_err(AppError::internal)?;
    info!(admin_id = admin.id, "Login successful");
    Ok(token)
}

/// Create the admin, or reset the password of an existing one.
#[instrument(skip(store, password))]
pub async fn add_admin(store: &dyn Store, username: &str, password: &str) -> Result<(), AppError> {
    let username = username.trim();
    if username.is_empty() || password.is_empty() {
        return Err(AppError::validation("Username and password must not be empty"));
    }

    let hash = hash_password(password).map_err(AppError::internal)?;
    store.upsert_admin(username, &hash).await?;
    info!("Admin saved");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::jwt::verify_token;
    use crate::store::MemoryStore;

    #[actix_web::test]
    async fn login_issues_a_verifiable_token() {
        let store = MemoryStore::new();
        add_admin(&store, "root", "hunter2").await.unwrap();

        let token = admin_login(&store, "root", "hunter2", "secret", 60).await.unwrap();
        let claims = verify_token(&token, "secret").unwrap();
        assert_eq!(claims.sub, "root");
    }

    #[actix_web::test]
    async fn wrong_password_and_unknown_admin_look_the_same() {
        let store = MemoryStore::new();
        add_admin(&store, "root", "hunter2").await.unwrap();

        let wrong = admin_login(&store, "root", "nope", "secret", 60).await.unwrap_err();
        let unknown = admin_login(&store, "ghost", "hunter2", "secret", 60).await.unwrap_err();
        assert_eq!(wrong.to_string(), "Invalid credentials");
        assert_eq!(unknown.to_string(), "Invalid credentials");
    }

    #[actix_web::test]
    async fn re_adding_resets_the_password() {
        let store = MemoryStore::new();
        add_admin(&store, "root", "old").await.unwrap();
        add_admin(&store, "root", "new").await.unwrap();

        assert!(admin_login(&store, "root", "old", "s", 60).await.is_err());
        assert!(admin_login(&store, "root", "new", "s", 60).await.is_ok());
    }
}
