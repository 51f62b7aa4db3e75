use std::net::{IpAddr, SocketAddr};
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::extract::{ConnectInfo, Request, State};
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::Response;
use dashmap::DashMap;
use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};

use crate::models;
use crate::state::AppState;

type DirectLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Per-client request limiter.
///
/// One direct limiter per client address, created on first contact and
/// dropped again once the address has been idle for a full window, so the
/// map only ever holds recently seen clients. The quota admits a full
/// burst of `max_requests` and then refills evenly across the window,
/// which approximates a sliding window without keeping per-request
/// timestamps.
pub struct ClientRateLimiter {
    limiters: DashMap<IpAddr, ClientEntry>,
    quota: Quota,
    window: Duration,
}

struct ClientEntry {
    limiter: Arc<DirectLimiter>,
    last_seen: Instant,
}

impl ClientRateLimiter {
    pub fn new(max_requests: u32, window: Duration) -> Self {
        let burst = NonZeroU32::new(max_requests.max(1)).expect("burst must be > 0");
        // Configured windows can be zero; the refill period must not be.
        let period = (window / max_requests.max(1)).max(Duration::from_millis(1));
        let quota = Quota::with_period(period)
            .expect("period must be > 0")
            .allow_burst(burst);
        Self {
            limiters: DashMap::new(),
            quota,
            window,
        }
    }

    /// Whether `client` may make a request right now.
    pub fn check(&self, client: IpAddr) -> bool {
        // Forget clients idle for a full window.
        self.limiters
            .retain(|_, entry| entry.last_seen.elapsed() <= self.window);

        let limiter = {
            let mut entry = self.limiters.entry(client).or_insert_with(|| ClientEntry {
                limiter: Arc::new(DirectLimiter::direct(self.quota)),
                last_seen: Instant::now(),
            });
            entry.last_seen = Instant::now();
            entry.limiter.clone()
        };
        limiter.check().is_ok()
    }
}

/// Middleware applied to every route. Requests over the cap are rejected
/// up front and never reach a handler.
pub async fn require_quota(
    State(state): State<Arc<AppState>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    request: Request,
    next: Next,
) -> Response {
    if state.rate_limiter.check(addr.ip()) {
        next.run(request).await
    } else {
        tracing::warn!(client = %addr.ip(), "rate limit exceeded");
        models::error(
            StatusCode::TOO_MANY_REQUESTS,
            "Rate limit exceeded. Try again later.",
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(last_octet: u8) -> IpAddr {
        IpAddr::V4(std::net::Ipv4Addr::new(10, 0, 0, last_octet))
    }

    #[test]
    fn allows_up_to_the_cap_then_rejects() {
        let limiter = ClientRateLimiter::new(3, Duration::from_secs(60));
        let ip = client(1);
        assert!(limiter.check(ip));
        assert!(limiter.check(ip));
        assert!(limiter.check(ip));
        assert!(!limiter.check(ip), "fourth request within the window");
    }

    #[test]
    fn clients_are_limited_independently() {
        let limiter = ClientRateLimiter::new(1, Duration::from_secs(60));
        assert!(limiter.check(client(1)));
        assert!(!limiter.check(client(1)));
        assert!(limiter.check(client(2)), "a different client has its own quota");
    }

    #[test]
    fn window_expiry_readmits() {
        let limiter = ClientRateLimiter::new(2, Duration::from_millis(200));
        let ip = client(1);
        assert!(limiter.check(ip));
        assert!(limiter.check(ip));
        assert!(!limiter.check(ip));

        std::thread::sleep(Duration::from_millis(300));
        assert!(limiter.check(ip), "quota refills after the window passes");
    }

    #[test]
    fn idle_clients_are_forgotten() {
        let limiter = ClientRateLimiter::new(5, Duration::from_millis(100));
        assert!(limiter.check(client(1)));
        assert_eq!(limiter.limiters.len(), 1);

        std::thread::sleep(Duration::from_millis(200));
        assert!(limiter.check(client(2)));
        assert_eq!(limiter.limiters.len(), 1, "the idle client's entry is dropped");
        assert!(limiter.limiters.contains_key(&client(2)));
    }

    #[test]
    fn zero_window_still_admits_requests() {
        let limiter = ClientRateLimiter::new(5, Duration::ZERO);
        assert!(limiter.check(client(1)));
    }
}
