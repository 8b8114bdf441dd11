//! In-memory partitioned broker with consumer groups.
//!
//! Behaves like a small Kafka: topics have a fixed number of partitions,
//! publishes are spread round-robin, each group assigns every partition to
//! exactly one member and rebalances on join and leave. A member that picks up
//! a partition resumes from the group's last committed offset, so anything
//! read but not committed before a rebalance is delivered again.

use hotel_booking_core::event_bus::{
    ConsumerGroup, Delivery, EventBus, EventBusError, GroupMember,
};
use std::collections::{BTreeSet, HashMap};
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;

#[derive(Debug, Default)]
struct GroupState {
    members: BTreeSet<usize>,
    assignment: HashMap<usize, Vec<i32>>,
    committed: HashMap<i32, i64>,
    generation: u64,
}

impl GroupState {
    fn rebalance(&mut self, partitions: usize) {
        let members: Vec<usize> = self.members.iter().copied().collect();
        self.assignment.clear();
        if !members.is_empty() {
            for partition in 0..partitions {
                let owner = members[partition % members.len()];
                let partition = i32::try_from(partition).unwrap_or(i32::MAX);
                self.assignment.entry(owner).or_default().push(partition);
            }
        }
        self.generation += 1;
    }
}

#[derive(Debug, Default)]
struct Inner {
    topics: HashMap<String, Vec<Vec<Vec<u8>>>>,
    cursors: HashMap<String, usize>,
    groups: HashMap<(String, String), GroupState>,
    fail_publishes: bool,
}

impl Inner {
    fn partitions_of(&mut self, topic: &str, default: usize) -> &mut Vec<Vec<Vec<u8>>> {
        self.topics
            .entry(topic.to_string())
            .or_insert_with(|| vec![Vec::new(); default.max(1)])
    }
}

#[derive(Debug)]
struct Shared {
    inner: Mutex<Inner>,
    arrivals: Notify,
    partitions: usize,
}

/// In-memory broker implementing both [`EventBus`] and [`ConsumerGroup`].
///
/// Clones share the same topics and groups.
///
/// # Example
///
/// ```
/// use hotel_booking_testing::InMemoryBroker;
///
/// let broker = InMemoryBroker::new(3);
/// broker.publish_raw("booking-created", b"{}".to_vec());
/// assert_eq!(broker.published("booking-created").len(), 1);
/// ```
#[derive(Clone, Debug)]
pub struct InMemoryBroker {
    shared: Arc<Shared>,
}

impl InMemoryBroker {
    /// Create a broker whose topics have `partitions` partitions.
    #[must_use]
    pub fn new(partitions: usize) -> Self {
        Self {
            shared: Arc::new(Shared {
                inner: Mutex::new(Inner::default()),
                arrivals: Notify::new(),
                partitions: partitions.max(1),
            }),
        }
    }

    /// Reject every publish, as during a broker outage.
    pub fn fail_publishes(&self, fail: bool) {
        self.shared.inner.lock().unwrap().fail_publishes = fail;
    }

    /// Append `payload` to `topic`, bypassing failure injection.
    pub fn publish_raw(&self, topic: &str, payload: Vec<u8>) {
        let mut inner = self.shared.inner.lock().unwrap();
        let cursor = inner.cursors.entry(topic.to_string()).or_default();
        let partition = *cursor % self.shared.partitions;
        *cursor += 1;
        inner.partitions_of(topic, self.shared.partitions)[partition].push(payload);
        drop(inner);
        self.shared.arrivals.notify_waiters();
    }

    /// Every payload on `topic`, partition by partition.
    #[must_use]
    pub fn published(&self, topic: &str) -> Vec<Vec<u8>> {
        self.shared
            .inner
            .lock()
            .unwrap()
            .topics
            .get(topic)
            .map(|partitions| partitions.iter().flatten().cloned().collect())
            .unwrap_or_default()
    }

    /// Next offset `group` will read from `partition`, if it committed anything.
    #[must_use]
    pub fn committed_offset(&self, group_id: &str, topic: &str, partition: i32) -> Option<i64> {
        self.shared
            .inner
            .lock()
            .unwrap()
            .groups
            .get(&(group_id.to_string(), topic.to_string()))
            .and_then(|group| group.committed.get(&partition).copied())
    }

    /// Sum of committed positions across all partitions of `topic` for `group_id`.
    #[must_use]
    pub fn committed_total(&self, group_id: &str, topic: &str) -> i64 {
        self.shared
            .inner
            .lock()
            .unwrap()
            .groups
            .get(&(group_id.to_string(), topic.to_string()))
            .map(|group| group.committed.values().sum())
            .unwrap_or_default()
    }

    /// Members currently in `group_id` on `topic`.
    #[must_use]
    pub fn member_count(&self, group_id: &str, topic: &str) -> usize {
        self.shared
            .inner
            .lock()
            .unwrap()
            .groups
            .get(&(group_id.to_string(), topic.to_string()))
            .map_or(0, |group| group.members.len())
    }

    /// Partitions currently assigned to `member`.
    #[must_use]
    pub fn assignment(&self, group_id: &str, topic: &str, member: usize) -> Vec<i32> {
        self.shared
            .inner
            .lock()
            .unwrap()
            .groups
            .get(&(group_id.to_string(), topic.to_string()))
            .and_then(|group| group.assignment.get(&member).cloned())
            .unwrap_or_default()
    }
}

impl EventBus for InMemoryBroker {
    fn publish(
        &self,
        topic: &str,
        payload: &[u8],
    ) -> Pin<Box<dyn Future<Output = Result<(), EventBusError>> + Send + '_>> {
        let topic = topic.to_string();
        let payload = payload.to_vec();
        Box::pin(async move {
            if self.shared.inner.lock().unwrap().fail_publishes {
                return Err(EventBusError::PublishFailed {
                    topic,
                    reason: "broker unavailable".into(),
                });
            }
            self.publish_raw(&topic, payload);
            Ok(())
        })
    }
}

impl ConsumerGroup for InMemoryBroker {
    fn join(
        &self,
        group_id: &str,
        topic: &str,
        member: usize,
    ) -> Pin<Box<dyn Future<Output = Result<Box<dyn GroupMember>, EventBusError>> + Send + '_>>
    {
        let key = (group_id.to_string(), topic.to_string());
        Box::pin(async move {
            let mut inner = self.shared.inner.lock().unwrap();
            let partitions = inner.partitions_of(&key.1, self.shared.partitions).len();
            let group = inner.groups.entry(key.clone()).or_default();
            if !group.members.insert(member) {
                return Err(EventBusError::SubscriptionFailed {
                    topic: key.1,
                    reason: format!("member {member} already joined {}", key.0),
                });
            }
            group.rebalance(partitions);
            drop(inner);
            self.shared.arrivals.notify_waiters();

            Ok(Box::new(InMemoryGroupMember {
                shared: Arc::clone(&self.shared),
                key,
                member,
                generation: None,
                positions: HashMap::new(),
                left: false,
            }) as Box<dyn GroupMember>)
        })
    }
}

/// A member handle returned by [`InMemoryBroker`]. Leaves the group on drop.
#[derive(Debug)]
pub struct InMemoryGroupMember {
    shared: Arc<Shared>,
    key: (String, String),
    member: usize,
    generation: Option<u64>,
    positions: HashMap<i32, i64>,
    left: bool,
}

impl InMemoryGroupMember {
    /// Take the next message on an assigned partition, if any.
    fn try_next(&mut self) -> Option<Delivery> {
        let inner = self.shared.inner.lock().unwrap();
        let group = inner.groups.get(&self.key)?;
        let assigned = group.assignment.get(&self.member).cloned().unwrap_or_default();

        if self.generation != Some(group.generation) {
            self.generation = Some(group.generation);
            self.positions = assigned
                .iter()
                .map(|p| (*p, group.committed.get(p).copied().unwrap_or(0)))
                .collect();
        }

        let partitions = inner.topics.get(&self.key.1)?;
        for partition in assigned {
            let index = usize::try_from(partition).ok()?;
            let log = partitions.get(index)?;
            let position = self.positions.get(&partition).copied().unwrap_or(0);
            let offset = usize::try_from(position).ok()?;
            if let Some(payload) = log.get(offset) {
                self.positions.insert(partition, position + 1);
                return Some(Delivery {
                    topic: self.key.1.clone(),
                    partition,
                    offset: position,
                    payload: payload.clone(),
                });
            }
        }
        None
    }
}

impl GroupMember for InMemoryGroupMember {
    fn poll(
        &mut self,
        timeout: Duration,
    ) -> Pin<Box<dyn Future<Output = Result<Option<Delivery>, EventBusError>> + Send + '_>> {
        Box::pin(async move {
            if self.left {
                return Err(EventBusError::TransportError("member has left the group".into()));
            }
            let deadline = tokio::time::Instant::now() + timeout;
            let shared = Arc::clone(&self.shared);
            loop {
                let arrival = shared.arrivals.notified();
                tokio::pin!(arrival);
                arrival.as_mut().enable();

                if let Some(delivery) = self.try_next() {
                    return Ok(Some(delivery));
                }
                if tokio::time::timeout_at(deadline, arrival).await.is_err() {
                    return Ok(None);
                }
            }
        })
    }

    fn commit(&mut self, delivery: &Delivery) -> Result<(), EventBusError> {
        let mut inner = self.shared.inner.lock().unwrap();
        let group = inner.groups.get_mut(&self.key).ok_or_else(|| EventBusError::CommitFailed {
            topic: delivery.topic.clone(),
            partition: delivery.partition,
            offset: delivery.offset,
            reason: "group no longer exists".into(),
        })?;
        let next = delivery.offset + 1;
        let committed = group.committed.entry(delivery.partition).or_insert(0);
        if next > *committed {
            *committed = next;
        }
        Ok(())
    }

    fn leave(&mut self) {
        if self.left {
            return;
        }
        self.left = true;
        let mut inner = self.shared.inner.lock().unwrap();
        let partitions = inner
            .topics
            .get(&self.key.1)
            .map_or(self.shared.partitions, Vec::len);
        if let Some(group) = inner.groups.get_mut(&self.key) {
            group.members.remove(&self.member);
            group.rebalance(partitions);
        }
        drop(inner);
        self.shared.arrivals.notify_waiters();
    }
}

impl Drop for InMemoryGroupMember {
    fn drop(&mut self) {
        self.leave();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOPIC: &str = "booking-created";
    const GROUP: &str = "notification-service-group";

    #[tokio::test]
    async fn each_partition_has_one_owner() {
        let broker = InMemoryBroker::new(3);
        let _a = broker.join(GROUP, TOPIC, 0).await.unwrap();
        let _b = broker.join(GROUP, TOPIC, 1).await.unwrap();

        let mut owned: Vec<i32> = broker.assignment(GROUP, TOPIC, 0);
        owned.extend(broker.assignment(GROUP, TOPIC, 1));
        owned.sort_unstable();
        assert_eq!(owned, [0, 1, 2]);
    }

    #[tokio::test]
    async fn poll_times_out_when_idle() {
        let broker = InMemoryBroker::new(1);
        let mut member = broker.join(GROUP, TOPIC, 0).await.unwrap();

        let polled = member.poll(Duration::from_millis(20)).await.unwrap();
        assert!(polled.is_none());
    }

    #[tokio::test]
    async fn poll_wakes_on_publish() {
        let broker = InMemoryBroker::new(1);
        let mut member = broker.join(GROUP, TOPIC, 0).await.unwrap();

        let publisher = broker.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            publisher.publish(TOPIC, b"hello").await.unwrap();
        });

        let delivery = member.poll(Duration::from_secs(5)).await.unwrap().unwrap();
        assert_eq!(delivery.payload, b"hello");
        assert_eq!(delivery.offset, 0);
    }

    #[tokio::test]
    async fn uncommitted_messages_are_redelivered_after_rebalance() {
        let broker = InMemoryBroker::new(1);
        broker.publish_raw(TOPIC, b"first".to_vec());
        broker.publish_raw(TOPIC, b"second".to_vec());

        let mut first = broker.join(GROUP, TOPIC, 0).await.unwrap();
        let delivery = first.poll(Duration::from_millis(50)).await.unwrap().unwrap();
        first.commit(&delivery).unwrap();
        let unacked = first.poll(Duration::from_millis(50)).await.unwrap().unwrap();
        assert_eq!(unacked.payload, b"second");
        first.leave();

        let mut second = broker.join(GROUP, TOPIC, 1).await.unwrap();
        let redelivered = second.poll(Duration::from_millis(50)).await.unwrap().unwrap();
        assert_eq!(redelivered.payload, b"second");
        assert_eq!(broker.committed_offset(GROUP, TOPIC, 0), Some(1));
    }

    #[tokio::test]
    async fn publish_failure_is_reported() {
        let broker = InMemoryBroker::new(1);
        broker.fail_publishes(true);

        let result = broker.publish(TOPIC, b"lost").await;
        assert!(matches!(result, Err(EventBusError::PublishFailed { .. })));
        assert!(broker.published(TOPIC).is_empty());
    }
}
