use std::{sync::Arc, time::Duration};

use actix_web::{
    dev::Payload,
    http::header::{HeaderMap, AUTHORIZATION},
    web, FromRequest, HttpRequest,
};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
    error::{Error, UploadError},
    error_code::ErrorCode,
};

#[derive(Debug, thiserror::Error)]
pub(crate) enum AuthError {
    #[error("Missing or malformed bearer token")]
    Unauthenticated,

    #[error("Invalid bearer token")]
    InvalidCredentials(#[source] jsonwebtoken::errors::Error),

    #[error("Token subject is not an owner id")]
    InvalidSubject(#[source] uuid::Error),

    #[error("Failed to sign token")]
    Sign(#[source] jsonwebtoken::errors::Error),
}

impl AuthError {
    pub(crate) const fn error_code(&self) -> ErrorCode {
        match self {
            Self::Unauthenticated => ErrorCode::MISSING_CREDENTIALS,
            Self::InvalidCredentials(_) | Self::InvalidSubject(_) => {
                ErrorCode::INVALID_CREDENTIALS
            }
            Self::Sign(_) => ErrorCode::UNKNOWN_ERROR,
        }
    }
}

#[derive(Debug, serde::Deserialize, serde::Serialize)]
struct Claims {
    iss: String,
    sub: String,
    iat: i64,
    exp: i64,
}

/// Pull the token out of an `Authorization: Bearer <token>` header
pub(crate) fn bearer_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or(AuthError::Unauthenticated)
}

pub(crate) fn validate_jwt(token: &str, secret: &str, issuer: &str) -> Result<Uuid, AuthError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_issuer(&[issuer]);
    validation.set_required_spec_claims(&["exp", "sub", "iss"]);

    let data = jsonwebtoken::decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map_err(AuthError::InvalidCredentials)?;

    Uuid::parse_str(&data.claims.sub).map_err(AuthError::InvalidSubject)
}

pub(crate) fn make_jwt(
    owner: Uuid,
    secret: &str,
    issuer: &str,
    ttl: Duration,
) -> Result<String, AuthError> {
    let now = OffsetDateTime::now_utc().unix_timestamp();

    let claims = Claims {
        iss: issuer.to_string(),
        sub: owner.to_string(),
        iat: now,
        exp: now.saturating_add(i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX)),
    };

    jsonwebtoken::encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(AuthError::Sign)
}

#[derive(Clone)]
pub(crate) struct Verifier {
    secret: Arc<str>,
    issuer: Arc<str>,
}

impl std::fmt::Debug for Verifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Verifier")
            .field("issuer", &self.issuer)
            .finish_non_exhaustive()
    }
}

impl Verifier {
    pub(crate) fn new(secret: &str, issuer: &str) -> Self {
        Verifier {
            secret: Arc::from(secret),
            issuer: Arc::from(issuer),
        }
    }

    pub(crate) fn verify(&self, headers: &HeaderMap) -> Result<Uuid, AuthError> {
        let token = bearer_token(headers)?;

        validate_jwt(token, &self.secret, &self.issuer)
    }

    pub(crate) fn issue(&self, owner: Uuid, ttl: Duration) -> Result<String, AuthError> {
        make_jwt(owner, &self.secret, &self.issuer, ttl)
    }
}

/// The owner id of a request carrying a valid bearer token
#[derive(Clone, Copy, Debug)]
pub(crate) struct Authenticated(pub(crate) Uuid);

impl FromRequest for Authenticated {
    type Error = Error;
    type Future = std::future::Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        let res = match req.app_data::<web::Data<Verifier>>() {
            Some(verifier) => verifier.verify(req.headers()).map(Authenticated).map_err(|e| {
                tracing::debug!("Rejected credentials: {e}");
                Error::from(e)
            }),
            None => Err(UploadError::MissingAppData("token verifier").into()),
        };

        std::future::ready(res)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use actix_web::test::TestRequest;
    use jsonwebtoken::{EncodingKey, Header};
    use uuid::Uuid;

    use super::{AuthError, Claims, Verifier};

    const SECRET: &str = "correct horse battery staple";
    const ISSUER: &str = "tubely-access";

    fn headers(value: &str) -> actix_web::http::header::HeaderMap {
        TestRequest::default()
            .insert_header(("Authorization", value))
            .to_http_request()
            .headers()
            .clone()
    }

    #[test]
    fn issued_tokens_verify() {
        let owner = Uuid::new_v4();
        let token = super::make_jwt(owner, SECRET, ISSUER, Duration::from_secs(60))
            .expect("Signed token");

        let verified = Verifier::new(SECRET, ISSUER)
            .verify(&headers(&format!("Bearer {token}")))
            .expect("Valid token");

        assert_eq!(verified, owner);
    }

    #[test]
    fn missing_or_malformed_header() {
        let verifier = Verifier::new(SECRET, ISSUER);

        let empty = TestRequest::default().to_http_request();
        assert!(matches!(
            verifier.verify(empty.headers()),
            Err(AuthError::Unauthenticated)
        ));

        for value in ["Basic abc", "Bearer ", "bearer abc", "abc"] {
            assert!(
                matches!(verifier.verify(&headers(value)), Err(AuthError::Unauthenticated)),
                "{value}"
            );
        }
    }

    #[test]
    fn wrong_secret_or_issuer() {
        let owner = Uuid::new_v4();
        let token = super::make_jwt(owner, "another secret", ISSUER, Duration::from_secs(60))
            .expect("Signed token");

        assert!(matches!(
            super::validate_jwt(&token, SECRET, ISSUER),
            Err(AuthError::InvalidCredentials(_))
        ));

        let token = super::make_jwt(owner, SECRET, "someone-else", Duration::from_secs(60))
            .expect("Signed token");

        assert!(matches!(
            super::validate_jwt(&token, SECRET, ISSUER),
            Err(AuthError::InvalidCredentials(_))
        ));
    }

    #[test]
    fn expired_tokens_are_rejected() {
        let now = time::OffsetDateTime::now_utc().unix_timestamp();
        let claims = Claims {
            iss: ISSUER.to_string(),
            sub: Uuid::new_v4().to_string(),
            iat: now - 7200,
            exp: now - 3600,
        };
        let token = jsonwebtoken::encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .expect("Signed token");

        assert!(matches!(
            super::validate_jwt(&token, SECRET, ISSUER),
            Err(AuthError::InvalidCredentials(_))
        ));
    }

    #[test]
    fn subject_must_be_an_owner_id() {
        let now = time::OffsetDateTime::now_utc().unix_timestamp();
        let claims = Claims {
            iss: ISSUER.to_string(),
            sub: String::from("42"),
            iat: now,
            exp: now + 60,
        };
        let token = jsonwebtoken::encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .expect("Signed token");

        assert!(matches!(
            super::validate_jwt(&token, SECRET, ISSUER),
            Err(AuthError::InvalidSubject(_))
        ));
    }
}
