use crate::auth::jwt::verify_token;
use crate::config::Config;
use crate::model::role::{Capability, Role};
use crate::models::TokenType;
use actix_web::{
    FromRequest, HttpMessage, HttpRequest,
    dev::Payload,
    error::{ErrorForbidden, ErrorInternalServerError, ErrorUnauthorized},
    web::Data,
};
use futures::future::{Ready, ready};

#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: u64,
    pub username: String,
    pub role: Role,

    /// Present only if this user is linked to an employee record
    pub employee_id: Option<u64>,
}

impl AuthUser {
    /// Decodes a bearer token into the caller identity.
    pub fn from_token(token: &str, secret: &str) -> Result<Self, String> {
        let claims = verify_token(token, secret)?;

        if claims.token_type != TokenType::Access {
            return Err("not an access token".to_string());
        }

        let role = Role::from_id(claims.role).ok_or_else(|| "Invalid role".to_string())?;

        Ok(AuthUser {
            user_id: claims.user_id,
            username: claims.sub,
            role,
            employee_id: claims.employee_id,
        })
    }

    pub fn require(&self, capability: Capability) -> actix_web::Result<()> {
        if self.role.can(capability) {
            Ok(())
        } else {
            tracing::info!(
                user_id = self.user_id,
                username = %self.username,
                ?capability,
                "Capability check failed"
            );
            Err(ErrorForbidden("Insufficient permissions"))
        }
    }

    /// Callers may always act on their own employee record.
    pub fn require_self_or(&self, employee_id: u64, capability: Capability) -> actix_web::Result<()> {
        if self.employee_id == Some(employee_id) {
            Ok(())
        } else {
            self.require(capability)
        }
    }

    pub fn employee_id(&self) -> actix_web::Result<u64> {
        self.employee_id
            .ok_or_else(|| ErrorForbidden("No employee profile"))
    }
}

impl FromRequest for AuthUser {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        // set by auth_middleware on protected scopes
        if let Some(user) = req.extensions().get::<AuthUser>() {
            return ready(Ok(user.clone()));
        }

        let token = match req
            .headers()
            .get("Authorization")
            .and_then(|h| h.to_str().ok())
            .and_then(|h| h.strip_prefix("Bearer "))
        {
            Some(t) => t,
            None => return ready(Err(ErrorUnauthorized("Missing token"))),
        };

        let config = match req.app_data::<Data<Config>>() {
            Some(c) => c,
            None => return ready(Err(ErrorInternalServerError("Config missing"))),
        };

        ready(
            AuthUser::from_token(token, &config.jwt_secret)
                .map_err(|_| ErrorUnauthorized("Invalid token")),
        )
    }
}
