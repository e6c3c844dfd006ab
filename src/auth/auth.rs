use crate::auth::jwt::verify_access_token;
use crate::config::Config;
use crate::model::role::Role;
use crate::models::Claims;
use actix_web::{
    FromRequest, HttpMessage, HttpRequest,
    dev::Payload,
    error::{ErrorInternalServerError, ErrorUnauthorized},
    http::header::{AUTHORIZATION, HeaderMap},
    web::Data,
};
use futures::future::{Ready, ready};
use tracing::debug;

#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: u64,
    pub username: String,
    pub role: Role,

    /// Present only if this user is linked to an employee record
    pub employee_id: Option<String>,
}

impl AuthUser {
    pub fn from_claims(claims: Claims) -> Option<Self> {
        Some(AuthUser {
            user_id: claims.user_id,
            username: claims.sub,
            role: Role::from_id(claims.role)?,
            employee_id: claims.employee_id,
        })
    }
}

/// Why a request failed authentication. The message is safe to return.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthRejection {
    MissingHeader,
    MalformedHeader,
    InvalidToken,
    UnknownRole,
}

impl AuthRejection {
    pub fn message(self) -> &'static str {
        match self {
            AuthRejection::MissingHeader => "Missing Authorization header",
            AuthRejection::MalformedHeader => "Authorization header must be 'Bearer <token>'",
            AuthRejection::InvalidToken => "Invalid or expired token",
            AuthRejection::UnknownRole => "Invalid role",
        }
    }
}

/// Resolves the caller from a `Bearer` access token.
pub fn authenticate(headers: &HeaderMap, jwt_secret: &str) -> Result<AuthUser, AuthRejection> {
    let header = headers
        .get(AUTHORIZATION)
        .ok_or(AuthRejection::MissingHeader)?;
    let token = header
        .to_str()
        .ok()
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or(AuthRejection::MalformedHeader)?;

    let claims = verify_access_token(token, jwt_secret).map_err(|e| {
        debug!(error = %e, "Rejected bearer token");
        AuthRejection::InvalidToken
    })?;

    AuthUser::from_claims(claims).ok_or(AuthRejection::UnknownRole)
}

impl FromRequest for AuthUser {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        // already verified by auth_middleware
        if let Some(user) = req.extensions().get::<AuthUser>() {
            return ready(Ok(user.clone()));
        }

        let Some(config) = req.app_data::<Data<Config>>() else {
            return ready(Err(ErrorInternalServerError("Config missing")));
        };

        ready(
            authenticate(req.headers(), &config.jwt_secret)
                .map_err(|rejection| ErrorUnauthorized(rejection.message())),
        )
    }
}

impl AuthUser {
    pub fn require_hr_or_admin(&self) -> actix_web::Result<()> {
        if self.role.manages_payroll() {
            Ok(())
        } else {
            Err(actix_web::error::ErrorForbidden("HR/Admin only"))
        }
    }

    /// HR and Admin see everyone; an employee sees only their own records.
    pub fn require_self_or_hr(&self, employee_id: &str) -> actix_web::Result<()> {
        if self.role.manages_payroll() {
            return Ok(());
        }
        if self.is_employee() && self.employee_id.as_deref() == Some(employee_id.trim()) {
            return Ok(());
        }
        Err(actix_web::error::ErrorForbidden("Not allowed to view this employee"))
    }

    /// Returns true if the user is an employee
    pub fn is_employee(&self) -> bool {
        self.role == Role::Employee
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::http::header::HeaderValue;

    fn user(role: Role, employee_id: Option<&str>) -> AuthUser {
        AuthUser {
            user_id: 9,
            username: "someone".into(),
            role,
            employee_id: employee_id.map(str::to_string),
        }
    }

    fn headers(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    fn signed(role: u8, employee_id: Option<&str>) -> String {
        use crate::models::TokenType;
        use jsonwebtoken::{EncodingKey, Header, encode};

        let claims = Claims {
            user_id: 4,
            sub: "emp.user".into(),
            role,
            exp: 4_000_000_000,
            jti: "jti".into(),
            token_type: TokenType::Access,
            employee_id: employee_id.map(str::to_string),
        };
        encode(&Header::default(), &claims, &EncodingKey::from_secret(b"secret")).unwrap()
    }

    #[test]
    fn bearer_token_resolves_to_user() {
        let token = signed(3, Some("EMP004"));
        let user = authenticate(&headers(&format!("Bearer {token}")), "secret").unwrap();
        assert_eq!(user.role, Role::Employee);
        assert_eq!(user.employee_id.as_deref(), Some("EMP004"));
    }

    #[test]
    fn rejections_are_classified() {
        let token = signed(3, None);
        assert_eq!(
            authenticate(&HeaderMap::new(), "secret").unwrap_err(),
            AuthRejection::MissingHeader
        );
        assert_eq!(
            authenticate(&headers(&format!("Token {token}")), "secret").unwrap_err(),
            AuthRejection::MalformedHeader
        );
        assert_eq!(
            authenticate(&headers("Bearer "), "secret").unwrap_err(),
            AuthRejection::MalformedHeader
        );
        assert_eq!(
            authenticate(&headers(&format!("Bearer {token}")), "other").unwrap_err(),
            AuthRejection::InvalidToken
        );
        assert_eq!(
            authenticate(&headers(&format!("Bearer {}", signed(9, None))), "secret").unwrap_err(),
            AuthRejection::UnknownRole
        );
    }

    #[test]
    fn hr_and_admin_pass_every_check() {
        for role in [Role::Admin, Role::Hr] {
            assert!(user(role, None).require_hr_or_admin().is_ok());
            assert!(user(role, None).require_self_or_hr("EMP004").is_ok());
        }
    }

    #[test]
    fn employee_sees_only_own_records() {
        let emp = user(Role::Employee, Some("EMP004"));
        assert!(emp.require_hr_or_admin().is_err());
        assert!(emp.require_self_or_hr("EMP004").is_ok());
        assert!(emp.require_self_or_hr("EMP005").is_err());
        assert!(user(Role::Employee, None).require_self_or_hr("EMP004").is_err());
        assert!(user(Role::ApiUser, Some("EMP004")).require_self_or_hr("EMP004").is_err());
    }
}
