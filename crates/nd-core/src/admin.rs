use anyhow::{anyhow, Result};
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use rand_core::OsRng;
use sqlx::{Pool, Postgres};
use uuid::Uuid;

/// Creates the first admin account. Returns false if one already exists.
pub async fn bootstrap_admin(pool: &Pool<Postgres>, email: &str, password: &str) -> Result<bool> {
    if email.trim().is_empty() {
        return Err(anyhow!("email is required"));
    }
    if password.is_empty() {
        return Err(anyhow!("password is required"));
    }

    let mut tx = pool.begin().await?;
    let existing = sqlx::query_scalar::<_, String>("SELECT id FROM admins LIMIT 1")
        .fetch_optional(&mut *tx)
        .await?;

    if existing.is_some() {
        tx.rollback().await?;
        return Ok(false);
    }

    let admin_id = Uuid::new_v4().to_string();
    let password_hash = hash_password(password)?;

    sqlx::query("INSERT INTO admins (id, email, password_hash) VALUES ($1, $2, $3)")
        .bind(&admin_id)
        .bind(email)
        .bind(&password_hash)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    Ok(true)
}

pub async fn reset_admin_password(
    pool: &Pool<Postgres>,
    email: &str,
    password: &str,
) -> Result<()> {
    if email.trim().is_empty() {
        return Err(anyhow!("email is required"));
    }
    if password.is_empty() {
        return Err(anyhow!("password is required"));
    }

    let password_hash = hash_password(password)?;

    let result = sqlx::query("UPDATE admins SET password_hash = $1 WHERE email = $2")
        .bind(password_hash)
        .bind(email)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(anyhow!("admin not found"));
    }

    Ok(())
}

pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|err| anyhow!("argon2 hash failed: {}", err))?
        .to_string();
    Ok(hash)
}

pub fn verify_password(password: &str, password_hash: &str) -> Result<bool> {
    let parsed =
        PasswordHash::new(password_hash).map_err(|err| anyhow!("invalid password hash: {}", err))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_then_verify_roundtrip() {
        let hash = hash_password("correct horse").unwrap();
        assert!(verify_password("correct horse", &hash).unwrap());
    }

    #[test]
    fn verify_rejects_wrong_password() {
        let hash = hash_password("correct horse").unwrap();
        assert!(!verify_password("battery staple", &hash).unwrap());
    }

    #[test]
    fn hashes_are_salted() {
        let first = hash_password("same input").unwrap();
        let second = hash_password("same input").unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn verify_rejects_garbage_hash() {
        assert!(verify_password("anything", "not-a-phc-string").is_err());
    }
}
