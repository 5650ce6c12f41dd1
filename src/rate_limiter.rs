//! Per-client sliding-window admission control
//!
//! Each client keeps the timestamps of its accepted requests. A request is
//! admitted while fewer than `limit` timestamps are younger than `window`.
//! Purge, check and insert happen under one lock so concurrent requests from
//! the same client cannot both take the last slot.

use crate::config::RateLimitConfig;
use std::{
    collections::{HashMap, VecDeque},
    net::IpAddr,
    time::{Duration, Instant},
};
use tokio::sync::Mutex;

struct ClientTable {
    windows: HashMap<IpAddr, VecDeque<Instant>>,
    last_sweep: Instant,
}

impl ClientTable {
    /// Drop clients with no request younger than `window`
    fn sweep_idle(&mut self, now: Instant, window: Duration) -> usize {
        let before = self.windows.len();
        self.windows.retain(|_, stamps| {
            stamps
                .back()
                .is_some_and(|newest| now.saturating_duration_since(*newest) < window)
        });
        self.last_sweep = now;
        before - self.windows.len()
    }

    /// Make room for one more client
    fn make_room(&mut self, now: Instant, window: Duration, max_clients: usize) {
        if self.windows.len() < max_clients {
            return;
        }
        let swept = self.sweep_idle(now, window);
        if swept > 0 {
            tracing::debug!(swept, "Swept idle rate-limit entries to admit a new client");
        }
        while self.windows.len() >= max_clients {
            // Client whose most recent request is the oldest
            let victim = self
                .windows
                .iter()
                .min_by_key(|(_, stamps)| stamps.back().copied())
                .map(|(ip, _)| *ip);
            match victim {
                Some(ip) => {
                    self.windows.remove(&ip);
                    tracing::debug!(client = %ip, "Evicted rate-limit entry, table full");
                }
                None => break,
            }
        }
    }
}

/// Sliding-window rate limiter keyed by client address
pub struct RateLimiter {
    clients: Mutex<ClientTable>,
    config: RateLimitConfig,
}

impl RateLimiter {
    /// Create a new rate limiter from configuration
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            clients: Mutex::new(ClientTable {
                windows: HashMap::new(),
                last_sweep: Instant::now(),
            }),
            config,
        }
    }

    /// The configuration this limiter enforces
    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }

    /// Check if an IP address is exempt from rate limiting
    pub fn is_exempt(&self, ip: &IpAddr) -> bool {
        self.config.exempt_ips.contains(ip)
    }

    /// Admit or reject one request with an explicit limit and window
    pub async fn admit(&self, client: IpAddr, limit: u32, window: Duration) -> bool {
        self.admit_at(client, limit, window, Instant::now())
            .await
            .is_none()
    }

    /// Admit or reject one request using the configured limit and window
    ///
    /// Returns `None` when admitted, or the number of seconds until the client's
    /// oldest counted request leaves the window (at least 1).
    pub async fn check(&self, client: IpAddr) -> Option<u64> {
        if !self.config.enabled {
            return None;
        }
        self.admit_at(client, self.config.requests, self.config.window, Instant::now())
            .await
    }

    /// Drop clients whose newest request is older than the configured window
    pub async fn sweep_idle(&self) -> usize {
        let mut table = self.clients.lock().await;
        table.sweep_idle(Instant::now(), self.config.window)
    }

    /// Number of clients currently tracked
    pub async fn tracked_clients(&self) -> usize {
        self.clients.lock().await.windows.len()
    }

    pub(crate) async fn admit_at(
        &self,
        client: IpAddr,
        limit: u32,
        window: Duration,
        now: Instant,
    ) -> Option<u64> {
        let mut table = self.clients.lock().await;

        if now.saturating_duration_since(table.last_sweep) >= self.config.sweep_interval {
            let swept = table.sweep_idle(now, window);
            if swept > 0 {
                tracing::debug!(swept, "Swept idle rate-limit entries");
            }
        }

        let count = match table.windows.get_mut(&client) {
            Some(stamps) => {
                while stamps
                    .front()
                    .is_some_and(|t| now.saturating_duration_since(*t) >= window)
                {
                    stamps.pop_front();
                }
                stamps.len()
            }
            None => 0,
        };

        if count >= limit as usize {
            let oldest = table.windows.get(&client).and_then(|s| s.front().copied());
            let remaining = match oldest {
                Some(t) => window.saturating_sub(now.saturating_duration_since(t)),
                None => window,
            };
            let mut secs = remaining.as_secs();
            if remaining.subsec_nanos() > 0 {
                secs += 1;
            }
            tracing::debug!(client = %client, count, limit, "Rate limit exceeded");
            return Some(secs.max(1));
        }

        if !table.windows.contains_key(&client) {
            table.make_room(now, window, self.config.max_tracked_clients);
        }
        table.windows.entry(client).or_default().push_back(now);
        None
    }
}
