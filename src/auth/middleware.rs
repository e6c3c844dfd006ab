use crate::auth::auth::authenticate;
use crate::config::Config;
use actix_web::middleware::Next;
use actix_web::{
    Error, HttpMessage, HttpResponse,
    body::BoxBody,
    dev::{ServiceRequest, ServiceResponse},
    error::ErrorInternalServerError,
    web::Data,
};
use serde_json::json;

/// Authenticates every request in the protected scope and stores the
/// resulting `AuthUser` for the handlers' extractor.
pub async fn auth_middleware(
    req: ServiceRequest,
    next: Next<BoxBody>,
) -> Result<ServiceResponse<BoxBody>, Error> {
    let config = req
        .app_data::<Data<Config>>()
        .ok_or_else(|| ErrorInternalServerError("App config missing"))?;

    match authenticate(req.headers(), &config.jwt_secret) {
        Ok(user) => {
            req.extensions_mut().insert(user);
            next.call(req).await
        }
        Err(rejection) => {
            let resp = HttpResponse::Unauthorized().json(json!({
                "error": "unauthorized",
                "message": rejection.message(),
            }));
            Ok(req.into_response(resp.map_into_boxed_body()))
        }
    }
}
