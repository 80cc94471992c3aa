use std::{
    fmt,
    str::FromStr,
    time::{Duration, Instant},
};

use dashmap::DashMap;
use strum::{Display, EnumString};
use uuid::Uuid;

use crate::error::ConfigError;

const ARGUMENT_SEPARATOR: &str = "_";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumString, Display)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE", ascii_case_insensitive)]
pub enum TimeUnit {
    Nanoseconds,
    Microseconds,
    Milliseconds,
    Seconds,
    Minutes,
    Hours,
    Days,
}

impl TimeUnit {
    pub fn duration(&self, amount: u64) -> Option<Duration> {
        match self {
            TimeUnit::Nanoseconds => Some(Duration::from_nanos(amount)),
            TimeUnit::Microseconds => Some(Duration::from_micros(amount)),
            TimeUnit::Milliseconds => Some(Duration::from_millis(amount)),
            TimeUnit::Seconds => Some(Duration::from_secs(amount)),
            TimeUnit::Minutes => amount.checked_mul(60).map(Duration::from_secs),
            TimeUnit::Hours => amount.checked_mul(60 * 60).map(Duration::from_secs),
            TimeUnit::Days => amount.checked_mul(24 * 60 * 60).map(Duration::from_secs),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CachePolicy {
    #[default]
    Disabled,
    /// Never expires; every requester shares one bucket.
    Static,
    /// Entries expire `ttl` after they were written, per requester.
    TimeBoxed { amount: u64, unit: TimeUnit, ttl: Duration },
}

impl CachePolicy {
    pub fn time_boxed(amount: u64, unit: TimeUnit) -> Result<Self, ConfigError> {
        let ttl = unit
            .duration(amount)
            .filter(|ttl| Instant::now().checked_add(*ttl).is_some())
            .ok_or_else(|| ConfigError::DurationOverflow(format!("{amount} {unit}")))?;
        Ok(CachePolicy::TimeBoxed { amount, unit, ttl })
    }

    pub fn is_enabled(&self) -> bool {
        !matches!(self, CachePolicy::Disabled)
    }

    pub fn ttl(&self) -> Option<Duration> {
        match self {
            CachePolicy::TimeBoxed { ttl, .. } => Some(*ttl),
            _ => None,
        }
    }
}

impl FromStr for CachePolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once(' ') {
            Some((amount, unit)) => {
                let amount = amount
                    .parse::<u64>()
                    .map_err(|_| ConfigError::InvalidDuration(s.to_string()))?;
                let unit = unit
                    .parse::<TimeUnit>()
                    .map_err(|_| ConfigError::UnknownUnit(unit.to_string()))?;

                // A zero duration has always meant "cache forever".
                if amount == 0 {
                    Ok(CachePolicy::Static)
                } else {
                    CachePolicy::time_boxed(amount, unit)
                }
            }
            None if s == "STATIC" => Ok(CachePolicy::Static),
            None => Err(ConfigError::Malformed(s.to_string())),
        }
    }
}

impl fmt::Display for CachePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CachePolicy::Disabled => write!(f, "disabled"),
            CachePolicy::Static => write!(f, "STATIC"),
            CachePolicy::TimeBoxed { amount, unit, .. } => write!(f, "{amount} {unit}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequesterKey {
    /// Shared by every anonymous caller and by every caller under a static policy.
    Shared,
    Requester(Uuid),
}

impl RequesterKey {
    pub fn resolve(policy: &CachePolicy, requester: Option<Uuid>) -> Self {
        match (policy, requester) {
            (CachePolicy::TimeBoxed { .. }, Some(id)) => RequesterKey::Requester(id),
            _ => RequesterKey::Shared,
        }
    }
}

/// Joins `args` into a single cache key.
///
/// No arguments and a single empty argument both give `""`, so the two calls
/// share an entry.
pub fn argument_key(args: &[String]) -> String {
    args.join(ARGUMENT_SEPARATOR)
}

#[derive(Debug, Clone)]
struct CacheEntry {
    value: String,
    expires_at: Option<Instant>,
}

impl CacheEntry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| now >= at)
    }
}

type Bucket = DashMap<String, CacheEntry>;

/// Two-level memo: requester → argument key → result.
///
/// Buckets are only allocated for enabled policies. Both levels are
/// concurrent maps, so callers never lock.
#[derive(Debug, Default)]
pub struct ResultCache {
    policy: CachePolicy,
    buckets: Option<DashMap<RequesterKey, Bucket>>,
}

impl ResultCache {
    pub fn new(policy: CachePolicy) -> Self {
        Self {
            policy,
            buckets: policy.is_enabled().then(DashMap::new),
        }
    }

    pub fn configure(spec: &str) -> Result<Self, ConfigError> {
        Ok(Self::new(spec.parse()?))
    }

    pub fn policy(&self) -> &CachePolicy {
        &self.policy
    }

    pub fn is_allocated(&self) -> bool {
        self.buckets.is_some()
    }

    pub fn lookup(&self, requester: &RequesterKey, arg_key: &str) -> Option<String> {
        self.lookup_at(requester, arg_key, Instant::now())
    }

    fn lookup_at(&self, requester: &RequesterKey, arg_key: &str, now: Instant) -> Option<String> {
        let bucket = self.buckets.as_ref()?.get(requester)?;

        let expired = match bucket.get(arg_key) {
            Some(entry) if !entry.is_expired(now) => return Some(entry.value.clone()),
            Some(_) => true,
            None => false,
        };

        if expired {
            bucket.remove_if(arg_key, |_, entry| entry.is_expired(now));
        }

        None
    }

    /// Inserts or overwrites. The requester bucket is created if missing, and a
    /// time-boxed entry's clock starts now.
    pub fn store(&self, requester: RequesterKey, arg_key: impl Into<String>, value: impl Into<String>) {
        let Some(buckets) = &self.buckets else {
            return;
        };

        let expires_at = match requester {
            RequesterKey::Shared => None,
            RequesterKey::Requester(_) => self.policy.ttl().and_then(|ttl| Instant::now().checked_add(ttl)),
        };

        buckets.entry(requester).or_default().insert(
            arg_key.into(),
            CacheEntry {
                value: value.into(),
                expires_at,
            },
        );
    }

    /// Drops expired entries and the requester buckets they leave empty.
    /// Returns the number of entries removed.
    pub fn purge_expired(&self) -> usize {
        self.purge_expired_at(Instant::now())
    }

    fn purge_expired_at(&self, now: Instant) -> usize {
        let Some(buckets) = &self.buckets else {
            return 0;
        };

        let mut removed = 0;
        buckets.retain(|_, bucket| {
            let before = bucket.len();
            bucket.retain(|_, entry| !entry.is_expired(now));
            removed += before - bucket.len();
            !bucket.is_empty()
        });
        removed
    }

    pub fn len(&self) -> usize {
        self.buckets
            .as_ref()
            .map(|buckets| buckets.iter().map(|bucket| bucket.len()).sum())
            .unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        if let Some(buckets) = &self.buckets {
            buckets.clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, thread};

    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case::static_("STATIC", Ok(CachePolicy::Static))]
    #[case::seconds("10 seconds", CachePolicy::time_boxed(10, TimeUnit::Seconds))]
    #[case::upper_minutes("5 MINUTES", CachePolicy::time_boxed(5, TimeUnit::Minutes))]
    #[case::mixed_case_days("1 Days", CachePolicy::time_boxed(1, TimeUnit::Days))]
    #[case::zero_is_static("0 seconds", Ok(CachePolicy::Static))]
    #[case::static_forever("STATIC FOREVER", Err(ConfigError::InvalidDuration("STATIC FOREVER".to_string())))]
    #[case::unknown_unit("10 fortnights", Err(ConfigError::UnknownUnit("fortnights".to_string())))]
    #[case::negative("-1 seconds", Err(ConfigError::InvalidDuration("-1 seconds".to_string())))]
    #[case::lowercase_static("static", Err(ConfigError::Malformed("static".to_string())))]
    #[case::empty("", Err(ConfigError::Malformed("".to_string())))]
    #[case::overflow(
        "18446744073709551615 days",
        Err(ConfigError::DurationOverflow("18446744073709551615 DAYS".to_string()))
    )]
    #[case::instant_overflow(
        "18446744073709551615 SECONDS",
        Err(ConfigError::DurationOverflow("18446744073709551615 SECONDS".to_string()))
    )]
    fn test_parse_policy(#[case] input: &str, #[case] expected: Result<CachePolicy, ConfigError>) {
        assert_eq!(input.parse::<CachePolicy>(), expected);
    }

    #[test]
    fn test_policy_display_round_trips() {
        let policy = CachePolicy::time_boxed(3, TimeUnit::Hours).unwrap();
        assert_eq!(policy.to_string(), "3 HOURS");
        assert_eq!(policy.to_string().parse::<CachePolicy>().unwrap(), policy);
    }

    #[rstest]
    #[case::disabled(CachePolicy::Disabled, false)]
    #[case::static_(CachePolicy::Static, true)]
    #[case::time_boxed(CachePolicy::time_boxed(1, TimeUnit::Seconds).unwrap(), true)]
    fn test_allocation_follows_policy(#[case] policy: CachePolicy, #[case] allocated: bool) {
        assert_eq!(ResultCache::new(policy).is_allocated(), allocated);
    }

    #[test]
    fn test_disabled_never_stores() {
        let cache = ResultCache::new(CachePolicy::Disabled);
        cache.store(RequesterKey::Shared, "", "x");
        assert_eq!(cache.lookup(&RequesterKey::Shared, ""), None);
    }

    #[test]
    fn test_requester_key_resolution() {
        let id = Uuid::new_v4();
        let boxed = CachePolicy::time_boxed(1, TimeUnit::Seconds).unwrap();

        assert_eq!(RequesterKey::resolve(&CachePolicy::Static, Some(id)), RequesterKey::Shared);
        assert_eq!(RequesterKey::resolve(&boxed, None), RequesterKey::Shared);
        assert_eq!(RequesterKey::resolve(&boxed, Some(id)), RequesterKey::Requester(id));
    }

    #[test]
    fn test_argument_key_collision() {
        assert_eq!(argument_key(&[]), argument_key(&[String::new()]));
        assert_eq!(argument_key(&["a".to_string(), "b".to_string()]), "a_b");
    }

    #[test]
    fn test_store_creates_missing_bucket() {
        let cache = ResultCache::new(CachePolicy::time_boxed(1, TimeUnit::Minutes).unwrap());
        let requester = RequesterKey::Requester(Uuid::new_v4());

        assert_eq!(cache.lookup(&requester, "k"), None);
        cache.store(requester, "k", "v");
        assert_eq!(cache.lookup(&requester, "k").as_deref(), Some("v"));
    }

    #[test]
    fn test_time_boxed_entry_expires_after_write() {
        let cache = ResultCache::new(CachePolicy::time_boxed(1, TimeUnit::Seconds).unwrap());
        let requester = RequesterKey::Requester(Uuid::new_v4());
        let written = Instant::now();
        cache.store(requester, "", "v");

        assert_eq!(cache.lookup_at(&requester, "", written).as_deref(), Some("v"));
        assert_eq!(cache.lookup_at(&requester, "", written + Duration::from_secs(2)), None);
        assert_eq!(cache.len(), 0);
    }

    #[test]
    fn test_unrepresentable_expiry_never_expires() {
        let cache = ResultCache::new(CachePolicy::TimeBoxed {
            amount: u64::MAX,
            unit: TimeUnit::Seconds,
            ttl: Duration::from_secs(u64::MAX),
        });
        let requester = RequesterKey::Requester(Uuid::new_v4());
        cache.store(requester, "", "v");

        assert_eq!(cache.lookup(&requester, "").as_deref(), Some("v"));
    }

    #[test]
    fn test_shared_bucket_never_expires() {
        let cache = ResultCache::new(CachePolicy::time_boxed(1, TimeUnit::Seconds).unwrap());
        cache.store(RequesterKey::Shared, "", "v");

        let later = Instant::now() + Duration::from_secs(3600);
        assert_eq!(cache.lookup_at(&RequesterKey::Shared, "", later).as_deref(), Some("v"));
    }

    #[test]
    fn test_purge_expired_drops_empty_buckets() {
        let cache = ResultCache::new(CachePolicy::time_boxed(1, TimeUnit::Seconds).unwrap());
        cache.store(RequesterKey::Requester(Uuid::new_v4()), "a", "1");
        cache.store(RequesterKey::Requester(Uuid::new_v4()), "b", "2");
        cache.store(RequesterKey::Shared, "c", "3");

        assert_eq!(cache.purge_expired_at(Instant::now() + Duration::from_secs(2)), 2);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.buckets.as_ref().unwrap().len(), 1);
    }

    #[test]
    fn test_concurrent_requesters_are_isolated() {
        let cache = Arc::new(ResultCache::new(CachePolicy::time_boxed(1, TimeUnit::Minutes).unwrap()));
        let ids = (0..8).map(|_| Uuid::new_v4()).collect::<Vec<_>>();

        thread::scope(|s| {
            for id in &ids {
                let cache = Arc::clone(&cache);
                s.spawn(move || {
                    for n in 0..100 {
                        cache.store(RequesterKey::Requester(*id), n.to_string(), format!("{id}-{n}"));
                    }
                });
            }
        });

        for id in &ids {
            assert_eq!(
                cache.lookup(&RequesterKey::Requester(*id), "42"),
                Some(format!("{id}-42"))
            );
        }
        assert_eq!(cache.len(), 800);
    }
}
