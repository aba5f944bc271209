//! Checkout throttling over fixed Redis windows.
//!
//! Every checkout attempt is counted against the client address and, when
//! present, the buyer email. Both counters move in a single script call.

use async_trait::async_trait;
use redis::{Script, aio::ConnectionManager};

use super::InfraError;
use crate::app_error::{AppError, AppResult};

#[async_trait]
pub trait RateLimiterTrait: Send + Sync {
    /// Count one checkout attempt. `Err(AppError::RateLimited)` once any
    /// counter is past its allowance for the current window.
    async fn check(&self, ip: &str, email: Option<&str>) -> AppResult<()>;
}

/// What a checkout attempt is counted against.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum LimitKey {
    ClientIp(String),
    /// Trimmed and lowercased, so case variants share a counter.
    BuyerEmail(String),
}

impl LimitKey {
    pub fn client_ip(ip: &str) -> Self {
        LimitKey::ClientIp(ip.to_string())
    }

    pub fn buyer_email(email: &str) -> Self {
        LimitKey::BuyerEmail(email.trim().to_lowercase())
    }

    pub fn redis_key(&self) -> String {
        match self {
            LimitKey::ClientIp(ip) => format!("checkout:attempts:ip:{ip}"),
            LimitKey::BuyerEmail(email) => format!("checkout:attempts:email:{email}"),
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            LimitKey::ClientIp(_) => "client_ip",
            LimitKey::BuyerEmail(_) => "buyer_email",
        }
    }
}

/// The keys one attempt touches, each with its allowance.
fn attempt_keys(
    ip: &str,
    email: Option<&str>,
    max_per_ip: u64,
    max_per_email: u64,
) -> Vec<(LimitKey, u64)> {
    let mut keys = vec![(LimitKey::client_ip(ip), max_per_ip)];
    if let Some(email) = email {
        keys.push((LimitKey::buyer_email(email), max_per_email));
    }
    keys
}

/// First key whose post-increment count is past its allowance.
fn first_exceeded<'a>(
    keys: &'a [(LimitKey, u64)],
    counts: &[u64],
) -> Option<(&'a LimitKey, u64)> {
    keys.iter()
        .zip(counts)
        .find(|((_, max), count)| **count > *max)
        .map(|((key, _), count)| (key, *count))
}

/// Increments every key and returns the counts in key order. A counter
/// without an expiry gets the window as TTL.
const COUNT_ATTEMPTS_SCRIPT: &str = r#"
local counts = {}
for i, key in ipairs(KEYS) do
    local n = redis.call('INCR', key)
    if n == 1 or redis.call('TTL', key) < 0 then
        redis.call('EXPIRE', key, ARGV[1])
    end
    counts[i] = n
end
return counts
"#;

#[derive(Clone)]
pub struct RedisRateLimiter {
    manager: ConnectionManager,
    window_secs: u64,
    max_per_ip: u64,
    max_per_email: u64,
    script: Script,
}

impl RedisRateLimiter {
    pub async fn new(
        redis_url: &str,
        window_secs: u64,
        max_per_ip: u64,
        max_per_email: u64,
    ) -> Result<Self, InfraError> {
        let client = redis::Client::open(redis_url).map_err(InfraError::RedisConnection)?;
        let manager = ConnectionManager::new(client)
            .await
            .map_err(InfraError::RedisConnection)?;
        Ok(Self {
            manager,
            window_secs,
            max_per_ip,
            max_per_email,
            script: Script::new(COUNT_ATTEMPTS_SCRIPT),
        })
    }

    async fn count_attempts(&self, keys: &[(LimitKey, u64)]) -> AppResult<Vec<u64>> {
        let mut invocation = self.script.prepare_invoke();
        for (key, _) in keys {
            invocation.key(key.redis_key());
        }
        invocation.arg(self.window_secs);

        let mut conn = self.manager.clone();
        invocation
            .invoke_async(&mut conn)
            .await
            .map_err(|e| AppError::Internal(format!("rate limiter unavailable: {e}")))
    }
}

#[async_trait]
impl RateLimiterTrait for RedisRateLimiter {
    async fn check(&self, ip: &str, email: Option<&str>) -> AppResult<()> {
        let keys = attempt_keys(ip, email, self.max_per_ip, self.max_per_email);
        let counts = self.count_attempts(&keys).await?;

        match first_exceeded(&keys, &counts) {
            Some((key, count)) => {
                tracing::warn!(
                    limit = key.kind(),
                    count,
                    window_secs = self.window_secs,
                    "Checkout throttled"
                );
                Err(AppError::RateLimited)
            }
            None => Ok(()),
        }
    }
}
