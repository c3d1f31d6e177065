//! Pagination version tokens.

use chrono::{DateTime, Utc};
use std::fmt::{self, Display};
use std::num::ParseIntError;
use std::str::FromStr;
use std::sync::atomic::{AtomicI64, Ordering};

static LAST_MINTED: AtomicI64 = AtomicI64::new(0);

/// Opaque, monotonically increasing invalidation token.
///
/// The value is the wall-clock time of minting in microseconds since the Unix
/// epoch. Tokens minted by one process strictly increase even if the clock
/// stalls or steps back, so a freshly minted token always differs from the one
/// it replaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VersionToken(i64);

impl VersionToken {
    /// Mints a new token.
    #[must_use]
    pub fn mint() -> Self {
        let now = Utc::now().timestamp_micros();
        let previous = LAST_MINTED
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| Some(now.max(last + 1)))
            .unwrap_or_else(|last| last);
        Self(now.max(previous + 1))
    }

    #[must_use]
    pub const fn from_micros(micros: i64) -> Self {
        Self(micros)
    }

    #[must_use]
    pub const fn as_micros(self) -> i64 {
        self.0
    }

    /// The instant the token was minted.
    ///
    /// Pages cached under this token are computed as of this instant.
    #[must_use]
    pub fn minted_at(self) -> DateTime<Utc> {
        let secs = self.0.div_euclid(1_000_000);
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let nanos = (self.0.rem_euclid(1_000_000) * 1_000) as u32;
        DateTime::from_timestamp(secs, nanos).unwrap_or_else(Utc::now)
    }
}

impl Display for VersionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for VersionToken {
    type Err = ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(Self)
    }
}
