//! SQL schema for the Cahoot SQLite event store.
//!
//! Executed once at connection startup via `PRAGMA user_version`. Future
//! migrations will be gated on that version number.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;

-- One row per participant edge of one message. Strictly append-only; the
-- only delete path is purging a whole mailbox.
CREATE TABLE IF NOT EXISTS events (
    mailbox_id   TEXT    NOT NULL,
    message_id   TEXT    NOT NULL,
    direction    TEXT    NOT NULL,   -- 'outgoing' | 'incoming'
    sender       TEXT    NOT NULL,
    address      TEXT    NOT NULL,
    field        TEXT    NOT NULL,   -- 'to' | 'cc' | 'bcc'
    timestamp_ms INTEGER NOT NULL    -- epoch milliseconds, UTC
);

CREATE INDEX IF NOT EXISTS events_address_idx ON events(mailbox_id, direction, address);
CREATE INDEX IF NOT EXISTS events_sender_idx  ON events(mailbox_id, direction, sender);
CREATE INDEX IF NOT EXISTS events_message_idx ON events(mailbox_id, message_id);

PRAGMA user_version = 1;
";
