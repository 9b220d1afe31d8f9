//! Record-store operation vocabulary, per-packet batches, and store backends.
//!
//! Every write a monitor performs is expressed as a [`StoreOp`] appended to a
//! [`Batch`]. A batch belongs to exactly one packet and is submitted exactly
//! once; the Redis backend translates it into a single non-transactional
//! pipeline so related fields for one packet land in a known local order.
//! Individual operations from different monitor processes interleave freely —
//! cross-process safety comes from every write being idempotent or
//! commutative, not from locking.

use crate::config::RedisConfig;
use crate::error::{NetmondError, Result};
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use tracing::debug;

/// A single operation against the shared record store.
///
/// This is the complete vocabulary the packet pipeline consumes; any
/// hash-map/set store implementing these suffices as a backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreOp {
    /// Unconditional multi-field overwrite on a hash record.
    HSet {
        key: String,
        fields: Vec<(String, Vec<u8>)>,
    },
    /// Write a field only if it does not already exist (first-writer-wins).
    HSetNx {
        key: String,
        field: String,
        value: Vec<u8>,
    },
    /// Numeric counter increment, creating the field at `delta` if absent.
    HIncrBy {
        key: String,
        field: String,
        delta: i64,
    },
    /// Idempotent set membership addition.
    SAdd { key: String, member: Vec<u8> },
    /// Attach/refresh a time-to-live on a record.
    Expire { key: String, ttl_secs: i64 },
}

/// An ordered, append-only sequence of store operations for one packet.
///
/// Owned exclusively by the record writer processing that packet; consumed by
/// a single terminal [`RecordStore::submit`], after which it is gone.
#[derive(Debug, Default)]
pub struct Batch {
    ops: Vec<StoreOp>,
}

impl Batch {
    /// Creates an empty batch.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the accumulated operations in append order.
    pub fn ops(&self) -> &[StoreOp] {
        &self.ops
    }

    /// Consumes the batch, yielding its operations.
    pub fn into_ops(self) -> Vec<StoreOp> {
        self.ops
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    /// Appends a multi-field overwrite.
    pub fn hset(&mut self, key: impl Into<String>, fields: Vec<(String, Vec<u8>)>) {
        self.ops.push(StoreOp::HSet {
            key: key.into(),
            fields,
        });
    }

    /// Appends a set-if-absent field write.
    pub fn hset_nx(
        &mut self,
        key: impl Into<String>,
        field: impl Into<String>,
        value: impl Into<Vec<u8>>,
    ) {
        self.ops.push(StoreOp::HSetNx {
            key: key.into(),
            field: field.into(),
            value: value.into(),
        });
    }

    /// Appends a counter increment.
    pub fn hincr_by(&mut self, key: impl Into<String>, field: impl Into<String>, delta: i64) {
        self.ops.push(StoreOp::HIncrBy {
            key: key.into(),
            field: field.into(),
            delta,
        });
    }

    /// Appends a set-membership addition.
    pub fn sadd(&mut self, key: impl Into<String>, member: impl Into<Vec<u8>>) {
        self.ops.push(StoreOp::SAdd {
            key: key.into(),
            member: member.into(),
        });
    }

    /// Appends a TTL attach/refresh.
    pub fn expire(&mut self, key: impl Into<String>, ttl_secs: i64) {
        self.ops.push(StoreOp::Expire {
            key: key.into(),
            ttl_secs,
        });
    }
}

/// A backend that can execute one packet's batch of store operations.
///
/// Submission failure is reported as a single error; the caller decides how
/// to isolate it. No retry is ever performed — a failed packet is simply
/// dropped from the store and may be re-recorded by a later retransmission.
#[async_trait]
pub trait RecordStore: Send {
    /// Flushes the accumulated batch. Exactly one call per packet.
    async fn submit(&mut self, batch: Batch) -> Result<()>;
}

/// Redis-backed record store.
///
/// Each batch becomes one non-transactional `redis::Pipeline` executed over a
/// managed connection.
pub struct RedisStore {
    conn: ConnectionManager,
}

impl RedisStore {
    /// Connects to the configured Redis database.
    pub async fn connect(config: &RedisConfig) -> Result<Self> {
        let uri = config.uri();
        debug!(host = %config.host, port = config.port, db = config.db, "connecting to record store");
        let client = redis::Client::open(uri)?;
        let conn = ConnectionManager::new(client).await?;
        Ok(Self { conn })
    }

    fn build_pipeline(batch: &Batch) -> redis::Pipeline {
        let mut pipe = redis::pipe();
        for op in batch.ops() {
            match op {
                StoreOp::HSet { key, fields } => {
                    pipe.hset_multiple(key, fields);
                }
                StoreOp::HSetNx { key, field, value } => {
                    pipe.hset_nx(key, field, value);
                }
                StoreOp::HIncrBy { key, field, delta } => {
                    pipe.hincr(key, field, *delta);
                }
                StoreOp::SAdd { key, member } => {
                    pipe.sadd(key, member);
                }
                StoreOp::Expire { key, ttl_secs } => {
                    pipe.expire(key, *ttl_secs);
                }
            }
        }
        pipe
    }
}

#[async_trait]
impl RecordStore for RedisStore {
    async fn submit(&mut self, batch: Batch) -> Result<()> {
        let count = batch.len();
        let pipe = Self::build_pipeline(&batch);
        let _: () = pipe.query_async(&mut self.conn).await?;
        debug!(ops = count, "submitted batch");
        Ok(())
    }
}

/// In-process record store that logs every submitted batch.
///
/// Used by the test suites to assert on the exact operation sequence a packet
/// produces, and to inject submission failures.
#[derive(Debug, Default)]
pub struct MemoryStore {
    /// Every successfully submitted batch, in submission order.
    pub batches: Vec<Vec<StoreOp>>,
    /// Total submit calls, including failed ones.
    pub submissions: usize,
    fail_next: bool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next submit call fail with a submission error.
    pub fn fail_next_submit(&mut self) {
        self.fail_next = true;
    }

    /// Operations of the most recently submitted batch.
    pub fn last_batch(&self) -> &[StoreOp] {
        self.batches.last().map(Vec::as_slice).unwrap_or(&[])
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn submit(&mut self, batch: Batch) -> Result<()> {
        self.submissions += 1;
        if self.fail_next {
            self.fail_next = false;
            return Err(NetmondError::Submit("injected failure".to_string()));
        }
        self.batches.push(batch.into_ops());
        Ok(())
    }
}
