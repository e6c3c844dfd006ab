use crate::models::{Claims, TokenType};
use jsonwebtoken::{DecodingKey, Validation, decode};

pub fn verify_token(token: &str, secret: &str) -> Result<Claims, String> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|e| e.to_string())
}

/// Only access tokens may call the API; refresh tokens are for the auth service.
pub fn verify_access_token(token: &str, secret: &str) -> Result<Claims, String> {
    let claims = verify_token(token, secret)?;
    if claims.token_type != TokenType::Access {
        return Err("Refresh token cannot be used here".to_string());
    }
    Ok(claims)
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{EncodingKey, Header, encode};
    use std::time::{SystemTime, UNIX_EPOCH};

    fn token(token_type: TokenType, secret: &str) -> String {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_secs() as usize;
        let claims = Claims {
            user_id: 1,
            sub: "hr.user".into(),
            role: 2,
            exp: now + 600,
            jti: "test-jti".into(),
            token_type,
            employee_id: Some("EMP001".into()),
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    #[test]
    fn access_token_verifies() {
        let claims = verify_access_token(&token(TokenType::Access, "s3cret"), "s3cret").unwrap();
        assert_eq!(claims.sub, "hr.user");
        assert_eq!(claims.employee_id.as_deref(), Some("EMP001"));
    }

    #[test]
    fn refresh_token_is_refused() {
        assert!(verify_access_token(&token(TokenType::Refresh, "s3cret"), "s3cret").is_err());
    }

    #[test]
    fn wrong_secret_is_refused() {
        assert!(verify_token(&token(TokenType::Access, "s3cret"), "other").is_err());
    }
}
