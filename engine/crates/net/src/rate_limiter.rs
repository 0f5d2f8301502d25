use std::collections::BTreeMap;
use std::net::IpAddr;
use std::sync::{Arc, Mutex};

/// Connection admission limits.
#[derive(Debug, Clone)]
pub struct ConnectionLimits {
    pub max_connections_total: usize,
    pub max_connections_per_ip: usize,
}

impl Default for ConnectionLimits {
    fn default() -> Self {
        Self {
            max_connections_total: 1000,
            max_connections_per_ip: 16,
        }
    }
}

/// Reason a connection was rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RateLimitRejection {
    TotalLimitReached,
    IpLimitReached,
}

impl std::fmt::Display for RateLimitRejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TotalLimitReached => write!(f, "server at max connections"),
            Self::IpLimitReached => write!(f, "too many connections from this IP"),
        }
    }
}

/// Limiter shared between the acceptor and the connection tasks.
pub type SharedLimiter = Arc<Mutex<ConnectionLimiter>>;

/// Tracks connection counts per IP and total.
#[derive(Debug)]
pub struct ConnectionLimiter {
    limits: ConnectionLimits,
    total: usize,
    per_ip: BTreeMap<IpAddr, usize>,
}

impl ConnectionLimiter {
    pub fn new(limits: ConnectionLimits) -> Self {
        Self {
            limits,
            total: 0,
            per_ip: BTreeMap::new(),
        }
    }

    pub fn shared(limits: ConnectionLimits) -> SharedLimiter {
        Arc::new(Mutex::new(Self::new(limits)))
    }

    /// Try to admit a new connection. Returns Ok(()) on success.
    pub fn try_admit(&mut self, ip: IpAddr) -> Result<(), RateLimitRejection> {
        if self.total >= self.limits.max_connections_total {
            return Err(RateLimitRejection::TotalLimitReached);
        }
        let count = self.per_ip.entry(ip).or_insert(0);
        if *count >= self.limits.max_connections_per_ip {
            return Err(RateLimitRejection::IpLimitReached);
        }
        *count += 1;
        self.total += 1;
        Ok(())
    }

    /// Release a connection slot when a client disconnects.
    pub fn release(&mut self, ip: IpAddr) {
        if let Some(count) = self.per_ip.get_mut(&ip) {
            *count = count.saturating_sub(1);
            if *count == 0 {
                self.per_ip.remove(&ip);
            }
        }
        self.total = self.total.saturating_sub(1);
    }

    pub fn total_connections(&self) -> usize {
        self.total
    }

    /// Admit through a shared limiter, returning a permit that releases the
    /// slot when dropped.
    pub fn admit(limiter: &SharedLimiter, ip: IpAddr) -> Result<AdmissionPermit, RateLimitRejection> {
        let mut guard = match limiter.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        guard.try_admit(ip)?;
        Ok(AdmissionPermit {
            limiter: Arc::clone(limiter),
            ip,
        })
    }
}

/// Held by a connection task for as long as its socket is alive.
#[derive(Debug)]
pub struct AdmissionPermit {
    limiter: SharedLimiter,
    ip: IpAddr,
}

impl Drop for AdmissionPermit {
    fn drop(&mut self) {
        let mut guard = match self.limiter.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        guard.release(self.ip);
    }
}
