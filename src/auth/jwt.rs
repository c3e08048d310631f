use std::time::Duration;

use axum::extract::FromRef;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use time::{Duration as TimeDuration, OffsetDateTime};
use tracing::debug;
use uuid::Uuid;

use crate::{auth::claims::Claims, config::JwtConfig, state::AppState};

/// HS256 signing and verification keys derived from the server secret.
#[derive(Clone)]
pub struct JwtKeys {
    pub encoding: EncodingKey,
    pub decoding: DecodingKey,
    pub ttl: Duration,
}

impl FromRef<AppState> for JwtKeys {
    fn from_ref(state: &AppState) -> Self {
        Self::from_config(&state.config.jwt)
    }
}

impl JwtKeys {
    pub fn new(secret: &[u8], ttl: Duration) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            ttl,
        }
    }

    pub fn from_config(cfg: &JwtConfig) -> Self {
        let minutes = cfg.ttl_minutes.max(0) as u64;
        Self::new(cfg.secret.as_bytes(), Duration::from_secs(minutes * 60))
    }

    /// Signs `{id, email}` with an expiry `ttl` after now.
    pub fn issue(&self, user_id: Uuid, email: &str) -> jsonwebtoken::errors::Result<String> {
        let now = OffsetDateTime::now_utc();
        let exp = now + TimeDuration::seconds(self.ttl.as_secs() as i64);
        let claims = Claims {
            id: user_id,
            email: email.to_string(),
            iat: now.unix_timestamp() as usize,
            exp: exp.unix_timestamp() as usize,
        };
        let token = encode(&Header::default(), &claims, &self.encoding)?;
        debug!(user_id = %user_id, exp = claims.exp, "jwt signed");
        Ok(token)
    }

    pub fn verify(&self, token: &str) -> jsonwebtoken::errors::Result<Claims> {
        let data = decode::<Claims>(token, &self.decoding, &Validation::default())?;
        debug!(user_id = %data.claims.id, "jwt verified");
        Ok(data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::errors::ErrorKind;

    const HOUR: Duration = Duration::from_secs(60 * 60);

    fn make_keys(secret: &str) -> JwtKeys {
        JwtKeys::new(secret.as_bytes(), HOUR)
    }

    fn now() -> usize {
        OffsetDateTime::now_utc().unix_timestamp() as usize
    }

    #[test]
    fn issued_token_carries_id_email_and_one_hour_expiry() {
        let keys = make_keys("dev-secret");
        let user_id = Uuid::new_v4();
        let before = now();
        let token = keys.issue(user_id, "a@x.com").expect("issue");
        let after = now();

        let claims = keys.verify(&token).expect("verify");
        assert_eq!(claims.id, user_id);
        assert_eq!(claims.email, "a@x.com");
        assert_eq!(claims.exp - claims.iat, 3600);
        assert!(claims.exp >= before + 3600 && claims.exp <= after + 3600);
    }

    #[test]
    fn ttl_follows_config() {
        let keys = JwtKeys::from_config(&JwtConfig {
            secret: "dev-secret".into(),
            ttl_minutes: 5,
        });
        let token = keys.issue(Uuid::new_v4(), "a@x.com").expect("issue");
        let claims = keys.verify(&token).expect("verify");
        assert_eq!(claims.exp - claims.iat, 300);
    }

    #[test]
    fn verify_rejects_token_signed_with_other_secret() {
        let token = make_keys("attacker").issue(Uuid::new_v4(), "a@x.com").expect("issue");
        let err = make_keys("dev-secret").verify(&token).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::InvalidSignature));
    }

    #[test]
    fn verify_rejects_swapped_payload() {
        let keys = make_keys("dev-secret");
        let victim = keys.issue(Uuid::new_v4(), "a@x.com").expect("issue victim");
        let other = keys.issue(Uuid::new_v4(), "b@x.com").expect("issue other");

        let v: Vec<&str> = victim.split('.').collect();
        let o: Vec<&str> = other.split('.').collect();
        let forged = format!("{}.{}.{}", v[0], o[1], v[2]);

        let err = keys.verify(&forged).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::InvalidSignature));
    }

    #[test]
    fn verify_rejects_altered_signature() {
        let keys = make_keys("dev-secret");
        let token = keys.issue(Uuid::new_v4(), "a@x.com").expect("issue");
        let (head, sig) = token.rsplit_once('.').expect("three segments");
        let flipped = if sig.starts_with('A') { "B" } else { "A" };
        let forged = format!("{head}.{flipped}{}", &sig[1..]);

        assert!(keys.verify(&forged).is_err());
    }

    #[test]
    fn verify_rejects_expired_token() {
        let keys = make_keys("dev-secret");
        let issued = now() - 2 * 3600;
        let claims = Claims {
            id: Uuid::new_v4(),
            email: "a@x.com".into(),
            iat: issued,
            exp: issued + 3600,
        };
        let token = encode(&Header::default(), &claims, &keys.encoding).expect("encode");

        let err = keys.verify(&token).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::ExpiredSignature));
    }
}
