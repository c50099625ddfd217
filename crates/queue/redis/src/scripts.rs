//! Lua scripts keeping multi-key queue transitions atomic.
//!
//! Key layout (all under the configured prefix):
//! - `ready`      LIST of job ids awaiting delivery
//! - `delayed`    ZSET job id -> ready-at (unix ms)
//! - `processing` ZSET job id -> visibility deadline (unix ms)
//! - `data`       HASH job id -> job JSON
//! - `completed`  LIST of finished job JSON, trimmed to retention
//! - `dead`       LIST of dead-letter JSON, trimmed to retention

/// Promote due work onto the ready list.
///
/// KEYS: delayed, ready, processing
/// ARGV: now_ms
///
/// Moves delayed jobs whose ready-at has passed, and reclaims
/// processing entries whose visibility deadline has expired (their
/// consumer died without settling).
pub const PROMOTE: &str = r"
local due = redis.call('ZRANGEBYSCORE', KEYS[1], '-inf', ARGV[1])
for _, id in ipairs(due) do
    redis.call('ZREM', KEYS[1], id)
    redis.call('RPUSH', KEYS[2], id)
end
local expired = redis.call('ZRANGEBYSCORE', KEYS[3], '-inf', ARGV[1])
for _, id in ipairs(expired) do
    redis.call('ZREM', KEYS[3], id)
    redis.call('RPUSH', KEYS[2], id)
end
return #due + #expired
";

/// Pop one ready job into the processing set.
///
/// KEYS: ready, processing, data
/// ARGV: visibility_deadline_ms
///
/// Returns the job JSON, or false when the ready list is empty. A job
/// id whose data is missing (already settled by a racing consumer) is
/// skipped.
pub const DEQUEUE: &str = r"
while true do
    local id = redis.call('LPOP', KEYS[1])
    if not id then
        return false
    end
    local payload = redis.call('HGET', KEYS[3], id)
    if payload then
        redis.call('ZADD', KEYS[2], ARGV[1], id)
        return payload
    end
end
";

/// Settle a delivery as processed.
///
/// KEYS: processing, data, completed
/// ARGV: job_id, job_json, max_completed, completed_ttl_ms
///
/// Returns 1 if the job was still in flight, 0 otherwise.
pub const ACK: &str = r"
local removed = redis.call('ZREM', KEYS[1], ARGV[1])
if removed == 0 then
    return 0
end
redis.call('HDEL', KEYS[2], ARGV[1])
redis.call('RPUSH', KEYS[3], ARGV[2])
redis.call('LTRIM', KEYS[3], -tonumber(ARGV[3]), -1)
redis.call('PEXPIRE', KEYS[3], ARGV[4])
return 1
";

/// Settle a delivery as failed and reschedule it.
///
/// KEYS: processing, data, delayed
/// ARGV: job_id, updated_job_json, retry_at_ms
///
/// Returns 1 if the job was still in flight, 0 otherwise.
pub const NACK_RETRY: &str = r"
local removed = redis.call('ZREM', KEYS[1], ARGV[1])
if removed == 0 then
    return 0
end
redis.call('HSET', KEYS[2], ARGV[1], ARGV[2])
redis.call('ZADD', KEYS[3], ARGV[3], ARGV[1])
return 1
";

/// Settle a delivery as permanently failed.
///
/// KEYS: processing, data, dead
/// ARGV: job_id, dead_letter_json, max_failed
///
/// Returns 1 if the job was still in flight, 0 otherwise.
pub const NACK_DEAD: &str = r"
local removed = redis.call('ZREM', KEYS[1], ARGV[1])
if removed == 0 then
    return 0
end
redis.call('HDEL', KEYS[2], ARGV[1])
redis.call('RPUSH', KEYS[3], ARGV[2])
redis.call('LTRIM', KEYS[3], -tonumber(ARGV[3]), -1)
return 1
";
