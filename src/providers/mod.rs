//! External price sources. Each provider is best-effort and rate-limited
//! upstream, so every fetch goes through a time-bounded cache.

pub mod coingecko;
pub mod dexscreener;
pub mod metals;
