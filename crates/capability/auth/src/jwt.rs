use crate::AuthError;
use domain::Principal;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

const ACCESS_TOKEN_TYPE: &str = "access";

#[derive(Debug, Serialize, Deserialize)]
struct AccessClaims {
    sub: String,
    iat: u64,
    exp: u64,
    token_type: String,
}

/// access token 签发与校验（HS256）。
///
/// 密钥与校验规则在构造时准备好，每个请求只做一次解码。
pub struct JwtManager {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    access_ttl_seconds: u64,
}

impl JwtManager {
    pub fn new(secret: String, access_ttl_seconds: u64) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_required_spec_claims(&["exp", "sub"]);
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            access_ttl_seconds,
        }
    }

    /// 为指定用户签发 access token。
    pub fn issue_access_token(&self, user_id: &str) -> Result<String, AuthError> {
        let iat = epoch_seconds();
        let claims = AccessClaims {
            sub: user_id.to_string(),
            iat,
            exp: iat.saturating_add(self.access_ttl_seconds),
            token_type: ACCESS_TOKEN_TYPE.to_string(),
        };
        jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|err| AuthError::Internal(err.to_string()))
    }

    /// 解析 access token，返回请求主体。
    pub fn decode_access(&self, token: &str) -> Result<Principal, AuthError> {
        let claims = jsonwebtoken::decode::<AccessClaims>(token, &self.decoding, &self.validation)
            .map_err(|err| match err.kind() {
                ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                _ => AuthError::TokenInvalid,
            })?
            .claims;
        if claims.token_type != ACCESS_TOKEN_TYPE || claims.sub.is_empty() {
            return Err(AuthError::TokenInvalid);
        }
        Ok(Principal::new(claims.sub))
    }
}

fn epoch_seconds() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
