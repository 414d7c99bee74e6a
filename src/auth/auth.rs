use crate::config::Config;
use crate::model::role::{Capability, Role};
use crate::models::Claims;
use actix_web::{FromRequest, HttpRequest, dev::Payload, error::ErrorUnauthorized, web::Data};
use futures::future::{Ready, ready};
use jsonwebtoken::decode;
use jsonwebtoken::{DecodingKey, Validation};

pub struct AuthUser {
    pub user_id: String,
    pub pin: String,
    pub role: Role,

    /// Tenant key; None only for the super admin.
    pub college_code: Option<String>,
}

impl FromRequest for AuthUser {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
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
            None => {
                return ready(Err(actix_web::error::ErrorInternalServerError(
                    "Config missing",
                )));
            }
        };

        let data = match decode::<Claims>(
            token,
            &DecodingKey::from_secret(config.jwt_secret.as_bytes()),
            &Validation::default(),
        ) {
            Ok(d) => d,
            Err(_) => return ready(Err(ErrorUnauthorized("Invalid token"))),
        };

        let role = match Role::from_id(data.claims.role) {
            Some(r) => r,
            None => return ready(Err(ErrorUnauthorized("Invalid role"))),
        };

        ready(Ok(AuthUser {
            user_id: data.claims.user_id,
            pin: data.claims.sub,
            role,
            college_code: data.claims.college_code,
        }))
    }
}

impl AuthUser {
    /// Single capability gate used by every protected handler.
    pub fn require(&self, cap: Capability) -> actix_web::Result<()> {
        if self.role.can(cap) {
            Ok(())
        } else {
            Err(actix_web::error::ErrorForbidden("Insufficient role"))
        }
    }

    /// Tenancy rule: the super admin sees every college; everyone else
    /// only their own.
    pub fn can_access_college(&self, college_code: Option<&str>) -> bool {
        match (self.role, self.college_code.as_deref()) {
            (Role::SuperAdmin, _) => true,
            (_, Some(own)) => college_code == Some(own),
            (_, None) => false,
        }
    }

    pub fn is_super_admin(&self) -> bool {
        self.role == Role::SuperAdmin
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(role: Role, college: Option<&str>) -> AuthUser {
        AuthUser {
            user_id: "u1".into(),
            pin: "PIN-01".into(),
            role,
            college_code: college.map(str::to_string),
        }
    }

    #[test]
    fn super_admin_crosses_tenants() {
        let su = user(Role::SuperAdmin, None);
        assert!(su.can_access_college(Some("210")));
        assert!(su.can_access_college(None));
    }

    #[test]
    fn principal_is_fenced_to_own_college() {
        let p = user(Role::Principal, Some("210"));
        assert!(p.can_access_college(Some("210")));
        assert!(!p.can_access_college(Some("002")));
        assert!(!p.can_access_college(None));
    }

    #[test]
    fn require_maps_to_capability_table() {
        assert!(user(Role::Principal, Some("210"))
            .require(Capability::ManageUsers)
            .is_ok());
        assert!(user(Role::Faculty, Some("210"))
            .require(Capability::ManageUsers)
            .is_err());
    }
}
