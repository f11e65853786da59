use actix_web::body::MessageBody;
use actix_web::dev::ServiceRequest;
use actix_web::dev::ServiceResponse;
use actix_web::error::InternalError;
use actix_web::http::header::WWW_AUTHENTICATE;
use actix_web::web::Data;
use actix_web::HttpResponse;
use actix_web_lab::middleware::Next;

use super::basic_authentication;
use super::validate_credentials;
use super::AuthError;
use crate::configuration::AdminSettings;
use crate::utils::error_500;

fn unauthorized(e: anyhow::Error) -> actix_web::Error {
    let resp = HttpResponse::Unauthorized()
        .insert_header((WWW_AUTHENTICATE, r#"Basic realm="admin""#))
        .finish();
    InternalError::from_response(e, resp).into()
}

/// Guards the `/admin` scope: every request must carry valid Basic
/// credentials for the configured admin account.
///
/// For more details, refer to the documentation for
/// `actix_web_lab::middleware::from_fn`
pub async fn reject_unauthorized_admins(
    req: ServiceRequest,
    next: Next<impl MessageBody>,
) -> Result<ServiceResponse<impl MessageBody>, actix_web::Error> {
    let admin = req
        .app_data::<Data<AdminSettings>>()
        .cloned()
        .ok_or_else(|| error_500("Admin settings were not registered"))?;

    let creds = basic_authentication(req.headers()).map_err(unauthorized)?;

    match validate_credentials(creds, &admin).await {
        Ok(()) => next.call(req).await,
        Err(AuthError::InvalidCredentials(e)) => Err(unauthorized(e)),
        Err(AuthError::UnexpectedError(e)) => Err(error_500(e)),
    }
}
