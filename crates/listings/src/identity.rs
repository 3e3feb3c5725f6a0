//! Identity collaborator: turns a bearer credential into a verified subject.

use axum::http::{header, HeaderMap};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

/// Caller identity as asserted by the identity provider. The subject is the stable account key;
/// the remaining attributes only seed first-time registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifiedIdentity {
    pub subject: String,
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub picture: Option<String>,
}

pub trait IdentityVerifier: Send + Sync {
    fn verify(&self, credential: &str) -> Result<VerifiedIdentity, IdentityError>;
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdentityError {
    #[error("missing bearer credential")]
    MissingCredential,
    #[error("authorization header is not a bearer credential")]
    MalformedHeader,
    #[error("credential rejected: {0}")]
    Rejected(String),
}

/// Extracts the token from an `Authorization: Bearer <token>` header.
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, IdentityError> {
    let value = headers
        .get(header::AUTHORIZATION)
        .ok_or(IdentityError::MissingCredential)?
        .to_str()
        .map_err(|_| IdentityError::MalformedHeader)?;

    let token = value
        .strip_prefix("Bearer ")
        .or_else(|| value.strip_prefix("bearer "))
        .ok_or(IdentityError::MalformedHeader)?
        .trim();

    if token.is_empty() {
        return Err(IdentityError::MissingCredential);
    }
    Ok(token)
}

/// Verifies the `Authorization` header of a request in one step.
pub fn authenticate(
    verifier: &dyn IdentityVerifier,
    headers: &HeaderMap,
) -> Result<VerifiedIdentity, IdentityError> {
    verifier.verify(bearer_token(headers)?)
}

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String,
    exp: i64,
    iat: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    iss: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    picture: Option<String>,
}

/// HS256 verifier for tokens minted by the identity provider's shared secret.
#[derive(Clone)]
pub struct JwtIdentityVerifier {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    issuer: Option<String>,
}

impl JwtIdentityVerifier {
    pub fn new(secret: &str, issuer: Option<String>) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            issuer,
        }
    }

    /// Mints a token for `identity`. Used by the development CLI and tests.
    pub fn issue(
        &self,
        identity: &VerifiedIdentity,
        ttl: Duration,
    ) -> Result<String, IdentityError> {
        let now = Utc::now();
        let claims = Claims {
            sub: identity.subject.clone(),
            exp: (now + ttl).timestamp(),
            iat: now.timestamp(),
            iss: self.issuer.clone(),
            name: identity.name.clone(),
            email: identity.email.clone(),
            phone: identity.phone.clone(),
            picture: identity.picture.clone(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|err| IdentityError::Rejected(err.to_string()))
    }
}

impl IdentityVerifier for JwtIdentityVerifier {
    fn verify(&self, credential: &str) -> Result<VerifiedIdentity, IdentityError> {
        let mut validation = Validation::new(Algorithm::HS256);
        if let Some(issuer) = &self.issuer {
            validation.set_issuer(&[issuer]);
        }

        let claims = decode::<Claims>(credential, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|err| IdentityError::Rejected(err.to_string()))?;

        if claims.sub.trim().is_empty() {
            return Err(IdentityError::Rejected("token has an empty subject".into()));
        }

        Ok(VerifiedIdentity {
            subject: claims.sub,
            name: claims.name,
            email: claims.email,
            phone: claims.phone,
            picture: claims.picture,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn identity() -> VerifiedIdentity {
        VerifiedIdentity {
            subject: "firebase|42".to_string(),
            name: Some("Nadia Rahman".to_string()),
            email: Some("nadia@example.com".to_string()),
            phone: None,
            picture: None,
        }
    }

    #[test]
    fn issued_token_verifies_with_profile_claims() {
        let verifier = JwtIdentityVerifier::new("test-secret", Some("urban-nest".to_string()));
        let token = verifier
            .issue(&identity(), Duration::minutes(5))
            .expect("token issued");

        let verified = verifier.verify(&token).expect("token verifies");
        assert_eq!(verified, identity());
    }

    #[test]
    fn token_signed_with_other_secret_is_rejected() {
        let issuer = JwtIdentityVerifier::new("secret-a", None);
        let verifier = JwtIdentityVerifier::new("secret-b", None);
        let token = issuer
            .issue(&identity(), Duration::minutes(5))
            .expect("token issued");

        assert!(matches!(
            verifier.verify(&token),
            Err(IdentityError::Rejected(_))
        ));
    }

    #[test]
    fn issuer_mismatch_is_rejected() {
        let minted = JwtIdentityVerifier::new("shared", Some("someone-else".to_string()));
        let verifier = JwtIdentityVerifier::new("shared", Some("urban-nest".to_string()));
        let token = minted
            .issue(&identity(), Duration::minutes(5))
            .expect("token issued");

        assert!(verifier.verify(&token).is_err());
    }

    #[test]
    fn bearer_token_requires_scheme() {
        let mut headers = HeaderMap::new();
        assert_eq!(
            bearer_token(&headers),
            Err(IdentityError::MissingCredential)
        );

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic abc"));
        assert_eq!(bearer_token(&headers), Err(IdentityError::MalformedHeader));

        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_static("Bearer abc.def"),
        );
        assert_eq!(bearer_token(&headers), Ok("abc.def"));
    }
}
