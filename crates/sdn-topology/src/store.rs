// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Link state store for topology discovery.
//!
//! One canonical `Link -> last verified` map plus two cleanup indices
//! (by switch id, by switch port). All three live behind a single lock so a
//! reader never sees an index disagree with the canonical map.

use crate::types::{Link, LinkRecord, SwitchId, SwitchPortRef};
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};
use std::time::{Duration, Instant};

/// Result of recording a verified link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upsert {
    /// First sighting; routing must be told.
    Inserted,
    /// Already known; only the timestamp moved.
    Refreshed,
}

/// Index disagreement detected by [`LinkStateStore::check_consistency`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConsistencyError {
    #[error("link {0} missing from switch index of {1:#x}")]
    MissingSwitchEntry(Link, SwitchId),

    #[error("link {0} missing from port index of {1}")]
    MissingPortEntry(Link, SwitchPortRef),

    #[error("switch index of {1:#x} holds unknown or unrelated link {0}")]
    StaleSwitchEntry(Link, SwitchId),

    #[error("port index of {1} holds unknown or unrelated link {0}")]
    StalePortEntry(Link, SwitchPortRef),

    #[error("empty index bucket left behind for {0}")]
    EmptyBucket(String),
}

#[derive(Debug, Default)]
struct Indices {
    /// Link -> time it was last verified
    links: HashMap<Link, Instant>,

    /// Switch id -> links with an endpoint on that switch
    switch_links: HashMap<SwitchId, HashSet<Link>>,

    /// Switch port -> links with that exact endpoint
    port_links: HashMap<SwitchPortRef, HashSet<Link>>,
}

impl Indices {
    fn index(&mut self, link: Link) {
        for switch_id in [link.source.switch_id, link.destination.switch_id] {
            self.switch_links.entry(switch_id).or_default().insert(link);
        }
        for port in [link.source, link.destination] {
            self.port_links.entry(port).or_default().insert(link);
        }
    }

    fn unindex(&mut self, link: &Link) {
        for switch_id in [link.source.switch_id, link.destination.switch_id] {
            if let Some(bucket) = self.switch_links.get_mut(&switch_id) {
                bucket.remove(link);
                if bucket.is_empty() {
                    self.switch_links.remove(&switch_id);
                }
            }
        }
        for port in [link.source, link.destination] {
            if let Some(bucket) = self.port_links.get_mut(&port) {
                bucket.remove(link);
                if bucket.is_empty() {
                    self.port_links.remove(&port);
                }
            }
        }
    }

    fn remove_all(&mut self, doomed: Vec<Link>) -> Vec<Link> {
        let mut removed = Vec::with_capacity(doomed.len());
        for link in doomed {
            if self.links.remove(&link).is_some() {
                self.unindex(&link);
                removed.push(link);
            }
        }
        removed.sort();
        removed
    }

    fn check(&self) -> Result<(), ConsistencyError> {
        for link in self.links.keys() {
            for switch_id in [link.source.switch_id, link.destination.switch_id] {
                let present = self
                    .switch_links
                    .get(&switch_id)
                    .is_some_and(|bucket| bucket.contains(link));
                if !present {
                    return Err(ConsistencyError::MissingSwitchEntry(*link, switch_id));
                }
            }
            for port in [link.source, link.destination] {
                let present = self
                    .port_links
                    .get(&port)
                    .is_some_and(|bucket| bucket.contains(link));
                if !present {
                    return Err(ConsistencyError::MissingPortEntry(*link, port));
                }
            }
        }

        for (switch_id, bucket) in &self.switch_links {
            if bucket.is_empty() {
                return Err(ConsistencyError::EmptyBucket(format!("switch {:#x}", switch_id)));
            }
            for link in bucket {
                if !self.links.contains_key(link) || !link.touches_switch(*switch_id) {
                    return Err(ConsistencyError::StaleSwitchEntry(*link, *switch_id));
                }
            }
        }

        for (port, bucket) in &self.port_links {
            if bucket.is_empty() {
                return Err(ConsistencyError::EmptyBucket(format!("port {}", port)));
            }
            for link in bucket {
                if !self.links.contains_key(link) || !link.touches_port(port) {
                    return Err(ConsistencyError::StalePortEntry(*link, *port));
                }
            }
        }

        Ok(())
    }
}

/// Authoritative table of currently known links.
#[derive(Debug, Default)]
pub struct LinkStateStore {
    inner: RwLock<Indices>,
}

impl LinkStateStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a verified link, inserting it or refreshing its timestamp.
    pub fn upsert(&self, link: Link) -> Upsert {
        self.upsert_at(link, Instant::now())
    }

    /// Same as [`upsert`](Self::upsert) with an explicit verification time.
    pub fn upsert_at(&self, link: Link, verified: Instant) -> Upsert {
        let mut inner = self.inner.write();
        let outcome = match inner.links.insert(link, verified) {
            Some(_) => Upsert::Refreshed,
            None => {
                inner.index(link);
                Upsert::Inserted
            }
        };
        debug_assert_eq!(inner.check(), Ok(()));
        outcome
    }

    /// Remove one link. Returns whether it was present.
    pub fn remove(&self, link: &Link) -> bool {
        let mut inner = self.inner.write();
        let removed = inner.remove_all(vec![*link]);
        debug_assert_eq!(inner.check(), Ok(()));
        !removed.is_empty()
    }

    /// Remove every link with `port` as source or destination.
    pub fn remove_port(&self, port: SwitchPortRef) -> Vec<Link> {
        let mut inner = self.inner.write();
        let doomed: Vec<Link> = inner
            .port_links
            .get(&port)
            .map(|bucket| bucket.iter().copied().collect())
            .unwrap_or_default();
        let removed = inner.remove_all(doomed);
        debug_assert_eq!(inner.check(), Ok(()));
        removed
    }

    /// Remove every link with an endpoint on `switch_id`.
    pub fn remove_switch(&self, switch_id: SwitchId) -> Vec<Link> {
        let mut inner = self.inner.write();
        let doomed: Vec<Link> = inner
            .switch_links
            .get(&switch_id)
            .map(|bucket| bucket.iter().copied().collect())
            .unwrap_or_default();
        let removed = inner.remove_all(doomed);
        debug_assert_eq!(inner.check(), Ok(()));
        removed
    }

    /// Remove links not verified within `max_age` of `now`.
    pub fn remove_stale(&self, max_age: Duration, now: Instant) -> Vec<Link> {
        let mut inner = self.inner.write();
        let doomed: Vec<Link> = inner
            .links
            .iter()
            .filter(|(_, verified)| now.saturating_duration_since(**verified) > max_age)
            .map(|(link, _)| *link)
            .collect();
        let removed = inner.remove_all(doomed);
        debug_assert_eq!(inner.check(), Ok(()));
        removed
    }

    /// Point-in-time copy of every link, ordered by link.
    pub fn snapshot(&self) -> Vec<LinkRecord> {
        let inner = self.inner.read();
        let mut records: Vec<LinkRecord> = inner
            .links
            .iter()
            .map(|(link, verified)| LinkRecord {
                link: *link,
                last_verified: *verified,
            })
            .collect();
        records.sort_by_key(|r| r.link);
        records
    }

    /// Links with an endpoint on `switch_id`.
    pub fn links_for_switch(&self, switch_id: SwitchId) -> Vec<Link> {
        let inner = self.inner.read();
        let mut links: Vec<Link> = inner
            .switch_links
            .get(&switch_id)
            .map(|bucket| bucket.iter().copied().collect())
            .unwrap_or_default();
        links.sort();
        links
    }

    /// Links with `port` as an endpoint.
    pub fn links_for_port(&self, port: SwitchPortRef) -> Vec<Link> {
        let inner = self.inner.read();
        let mut links: Vec<Link> = inner
            .port_links
            .get(&port)
            .map(|bucket| bucket.iter().copied().collect())
            .unwrap_or_default();
        links.sort();
        links
    }

    /// Whether `port` is an endpoint of any known link.
    pub fn is_internal(&self, port: SwitchPortRef) -> bool {
        self.inner.read().port_links.contains_key(&port)
    }

    /// Last verification time of `link`, if known.
    pub fn last_verified(&self, link: &Link) -> Option<Instant> {
        self.inner.read().links.get(link).copied()
    }

    pub fn contains(&self, link: &Link) -> bool {
        self.inner.read().links.contains_key(link)
    }

    /// Get link count.
    pub fn len(&self) -> usize {
        self.inner.read().links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().links.is_empty()
    }

    /// Verify the canonical map and both indices agree.
    pub fn check_consistency(&self) -> Result<(), ConsistencyError> {
        self.inner.read().check()
    }

    /// Drop every link. Returns what was removed.
    pub fn clear(&self) -> Vec<Link> {
        let mut inner = self.inner.write();
        let mut removed: Vec<Link> = inner.links.keys().copied().collect();
        removed.sort();
        *inner = Indices::default();
        removed
    }
}
