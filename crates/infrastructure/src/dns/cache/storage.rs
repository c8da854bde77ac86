use super::{cache_key, CacheMetrics};
use crate::dns::message::{is_empty_response, reply_to};
use dashmap::DashMap;
use hickory_proto::op::Message;
use hickory_proto::rr::Record;
use rustc_hash::FxBuildHasher;
use std::sync::atomic::Ordering;
use std::time::{Duration, Instant};
use tracing::debug;

const INITIAL_CAPACITY: usize = 4096;
const SHARD_AMOUNT: usize = 64;

struct CacheEntry {
    answers: Vec<Record>,
    name_servers: Vec<Record>,
    additionals: Vec<Record>,
    stored_at: Instant,
}

/// Answer cache shared by every resolver of a generation.
///
/// Entries are partitioned by resolver name. Writers and readers on
/// different keys only contend on their own shard. Record TTLs are counted
/// down on read but never cause eviction; [`DnsCache::sweep`] does that on a
/// fixed schedule.
pub struct DnsCache {
    entries: DashMap<String, CacheEntry, FxBuildHasher>,
    metrics: CacheMetrics,
}

impl DnsCache {
    pub fn new() -> Self {
        Self {
            entries: DashMap::with_capacity_and_hasher_and_shard_amount(
                INITIAL_CAPACITY,
                FxBuildHasher,
                SHARD_AMOUNT,
            ),
            metrics: CacheMetrics::default(),
        }
    }

    /// Keep a deep copy of `response`'s sections under the request's
    /// questions. Empty and truncated responses are refused.
    pub fn store(&self, partition: &str, request: &Message, response: &Message) -> bool {
        let Some(key) = cache_key(partition, request) else {
            return false;
        };

        if response.truncated() || is_empty_response(Some(response)) {
            self.metrics.rejected.fetch_add(1, Ordering::Relaxed);
            return false;
        }

        self.entries.insert(
            key,
            CacheEntry {
                answers: response.answers().to_vec(),
                name_servers: response.name_servers().to_vec(),
                additionals: response.additionals().to_vec(),
                stored_at: Instant::now(),
            },
        );
        self.metrics.inserts.fetch_add(1, Ordering::Relaxed);
        true
    }

    /// A fresh reply to `request` carrying copies of the cached sections,
    /// with TTLs reduced by the whole seconds spent in the cache.
    pub fn query(&self, partition: &str, request: &Message) -> Option<Message> {
        let key = cache_key(partition, request)?;

        let Some(entry) = self.entries.get(&key) else {
            self.metrics.misses.fetch_add(1, Ordering::Relaxed);
            return None;
        };

        let elapsed = entry.stored_at.elapsed().as_secs().min(u32::MAX as u64) as u32;
        let mut response = reply_to(request);
        response.add_answers(aged(&entry.answers, elapsed));
        response.add_name_servers(aged(&entry.name_servers, elapsed));
        response.add_additionals(aged(&entry.additionals, elapsed));
        drop(entry);

        self.metrics.hits.fetch_add(1, Ordering::Relaxed);
        Some(response)
    }

    /// Drop entries stored more than `max_age` ago. Returns how many went.
    pub fn sweep(&self, max_age: Duration) -> usize {
        let before = self.entries.len();
        self.entries
            .retain(|_, entry| entry.stored_at.elapsed() <= max_age);
        let removed = before.saturating_sub(self.entries.len());

        if removed > 0 {
            self.metrics
                .evictions
                .fetch_add(removed as u64, Ordering::Relaxed);
            debug!(removed, remaining = self.entries.len(), "Cache sweep");
        }
        removed
    }

    pub fn clear(&self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn metrics(&self) -> &CacheMetrics {
        &self.metrics
    }
}

impl Default for DnsCache {
    fn default() -> Self {
        Self::new()
    }
}

fn aged(records: &[Record], elapsed: u32) -> Vec<Record> {
    records
        .iter()
        .map(|record| {
            let mut copy = record.clone();
            copy.set_ttl(record.ttl().saturating_sub(elapsed));
            copy
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use hickory_proto::op::Query;
    use hickory_proto::rr::rdata::A;
    use hickory_proto::rr::{Name, RData, RecordType};
    use std::net::Ipv4Addr;
    use std::str::FromStr;

    fn request(name: &str, id: u16) -> Message {
        let mut message = Message::new();
        message.set_id(id);
        message.add_query(Query::query(Name::from_str(name).unwrap(), RecordType::A));
        message
    }

    fn answer_for(req: &Message, ip: Ipv4Addr) -> Message {
        let mut response = reply_to(req);
        response.add_answer(Record::from_rdata(
            req.queries()[0].name().clone(),
            300,
            RData::A(A(ip)),
        ));
        response
    }

    #[test]
    fn test_round_trip_uses_callers_id() {
        let cache = DnsCache::new();
        let req = request("example.com.", 1);
        let resp = answer_for(&req, Ipv4Addr::new(93, 184, 216, 34));

        assert!(cache.store("default", &req, &resp));

        let cached = cache.query("default", &request("EXAMPLE.com.", 99)).unwrap();
        assert_eq!(cached.id(), 99);
        assert_eq!(cached.answers(), resp.answers());
        assert_eq!(cached.name_servers(), resp.name_servers());
        assert_eq!(cached.additionals(), resp.additionals());
    }

    #[test]
    fn test_cached_copy_is_not_aliased() {
        let cache = DnsCache::new();
        let req = request("example.com.", 1);
        let mut resp = answer_for(&req, Ipv4Addr::new(1, 1, 1, 1));
        cache.store("default", &req, &resp);

        // mutate the live message after storing
        resp.take_answers();

        let mut first = cache.query("default", &req).unwrap();
        first.take_answers();

        let second = cache.query("default", &req).unwrap();
        assert_eq!(second.answers().len(), 1);
    }

    #[test]
    fn test_refuses_empty_and_truncated() {
        let cache = DnsCache::new();
        let req = request("example.com.", 1);

        assert!(!cache.store("default", &req, &reply_to(&req)));

        let mut truncated = answer_for(&req, Ipv4Addr::new(1, 1, 1, 1));
        truncated.set_truncated(true);
        assert!(!cache.store("default", &req, &truncated));

        assert!(cache.is_empty());
        assert_eq!(cache.metrics().rejected.load(Ordering::Relaxed), 2);
    }

    #[test]
    fn test_partitions_are_isolated() {
        let cache = DnsCache::new();
        let req = request("example.com.", 1);
        cache.store("lan", &req, &answer_for(&req, Ipv4Addr::new(10, 0, 0, 1)));

        assert!(cache.query("lan", &req).is_some());
        assert!(cache.query("default", &req).is_none());
    }

    #[test]
    fn test_sweep_removes_old_entries() {
        let cache = DnsCache::new();
        let req = request("example.com.", 1);
        cache.store("default", &req, &answer_for(&req, Ipv4Addr::new(1, 1, 1, 1)));

        assert_eq!(cache.sweep(Duration::from_secs(3600)), 0);
        assert_eq!(cache.len(), 1);

        std::thread::sleep(Duration::from_millis(5));
        assert_eq!(cache.sweep(Duration::ZERO), 1);
        assert!(cache.is_empty());
    }
}
