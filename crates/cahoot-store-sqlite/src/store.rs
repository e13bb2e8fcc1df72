//! [`SqliteStore`] — the SQLite implementation of [`EventStore`].

use std::path::Path;

use uuid::Uuid;

use cahoot_core::{
  event::{Event, EventDirection},
  store::{
    AddressCount, AggregateRequest, EventCountRequest, EventStore, MatchClause,
    MessageMatch,
  },
};

use crate::{
  Error, Result,
  encode::{
    SqlValue, encode_affinity_field, encode_direction, encode_field,
    encode_ts, encode_uuid,
  },
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Cahoot event store backed by a single SQLite file.
///
/// Cloning is cheap — the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store — useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}

// ─── Query assembly ──────────────────────────────────────────────────────────

/// One clause as a message-id subquery. Pushes its parameters onto `values`
/// in the order the `?` placeholders appear.
fn clause_sql(
  mailbox: &str,
  direction: &str,
  clause: &MatchClause,
  cutoff_ms: Option<i64>,
  values: &mut Vec<SqlValue>,
) -> String {
  let mut sql = String::from(
    "SELECT message_id FROM events WHERE mailbox_id = ? AND direction = ?",
  );
  values.push(SqlValue::Text(mailbox.to_owned()));
  values.push(SqlValue::Text(direction.to_owned()));

  match clause {
    MatchClause::RecipientIs { address } => {
      sql.push_str(" AND address = ?");
      values.push(SqlValue::Text(address.clone()));
    }
    MatchClause::RecipientInField { address, field } => {
      sql.push_str(" AND address = ? AND field = ?");
      values.push(SqlValue::Text(address.clone()));
      values.push(SqlValue::Text(encode_field(*field).to_owned()));
    }
    MatchClause::SenderIs { address } => {
      sql.push_str(" AND sender = ?");
      values.push(SqlValue::Text(address.clone()));
    }
  }

  if let Some(ms) = cutoff_ms {
    sql.push_str(" AND timestamp_ms >= ?");
    values.push(SqlValue::Int(ms));
  }
  sql
}

/// One conjunctive alternative: the INTERSECT of its clause subqueries.
///
/// SQLite's compound operators are left-associative with equal precedence, so
/// multi-clause INTERSECT chains are wrapped in a derived table before being
/// UNIONed with the other alternatives.
fn alternative_sql(
  mailbox: &str,
  direction: &str,
  alternative: &MessageMatch,
  cutoff_ms: Option<i64>,
  values: &mut Vec<SqlValue>,
) -> String {
  // An empty conjunction is vacuously true: every message of the mailbox in
  // this direction qualifies, matching the in-memory evaluation.
  if alternative.all.is_empty() {
    let mut sql = String::from(
      "SELECT message_id FROM events WHERE mailbox_id = ? AND direction = ?",
    );
    values.push(SqlValue::Text(mailbox.to_owned()));
    values.push(SqlValue::Text(direction.to_owned()));
    if let Some(ms) = cutoff_ms {
      sql.push_str(" AND timestamp_ms >= ?");
      values.push(SqlValue::Int(ms));
    }
    return sql;
  }

  let subqueries: Vec<String> = alternative
    .all
    .iter()
    .map(|clause| clause_sql(mailbox, direction, clause, cutoff_ms, values))
    .collect();

  if subqueries.len() == 1 {
    subqueries.into_iter().next().unwrap_or_default()
  } else {
    format!(
      "SELECT message_id FROM ({})",
      subqueries.join(" INTERSECT ")
    )
  }
}

/// The full aggregate: a count-group-by over events co-occurring with the
/// qualifying message set.
fn aggregate_sql(req: &AggregateRequest) -> (String, Vec<SqlValue>) {
  let mailbox = encode_uuid(req.mailbox_id);
  let direction = encode_direction(req.direction);
  let cutoff_ms = req.cutoff.map(encode_ts);
  let mut values = Vec::new();

  let mut sql = String::from(
    "SELECT address, COUNT(*) AS cnt FROM events \
     WHERE mailbox_id = ? AND direction = ?",
  );
  values.push(SqlValue::Text(mailbox.clone()));
  values.push(SqlValue::Text(direction.to_owned()));

  if let Some(field) = encode_affinity_field(req.result_field) {
    sql.push_str(" AND field = ?");
    values.push(SqlValue::Text(field.to_owned()));
  }
  if let Some(ms) = cutoff_ms {
    sql.push_str(" AND timestamp_ms >= ?");
    values.push(SqlValue::Int(ms));
  }

  sql.push_str(" AND message_id IN (");
  let alternatives: Vec<String> = req
    .predicate
    .any
    .iter()
    .map(|alt| alternative_sql(&mailbox, direction, alt, cutoff_ms, &mut values))
    .collect();
  sql.push_str(&alternatives.join(" UNION "));
  sql.push_str(") GROUP BY address ORDER BY cnt DESC, address ASC");

  (sql, values)
}

// ─── EventStore impl ─────────────────────────────────────────────────────────

impl EventStore for SqliteStore {
  type Error = Error;

  async fn append(&self, events: &[Event]) -> Result<()> {
    let rows: Vec<(String, String, String, String, String, String, i64)> =
      events
        .iter()
        .map(|e| {
          (
            encode_uuid(e.mailbox_id),
            encode_uuid(e.message_id),
            encode_direction(e.direction).to_owned(),
            e.sender.clone(),
            e.address.clone(),
            encode_field(e.field).to_owned(),
            encode_ts(e.timestamp),
          )
        })
        .collect();

    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        {
          let mut stmt = tx.prepare(
            "INSERT INTO events
               (mailbox_id, message_id, direction, sender, address, field, timestamp_ms)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
          )?;
          for row in &rows {
            stmt.execute(rusqlite::params![
              row.0, row.1, row.2, row.3, row.4, row.5, row.6,
            ])?;
          }
        }
        tx.commit()?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn aggregate(&self, req: &AggregateRequest) -> Result<Vec<AddressCount>> {
    // An empty disjunction matches no message.
    if req.predicate.any.is_empty() {
      return Ok(Vec::new());
    }

    let (sql, values) = aggregate_sql(req);

    let rows = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params_from_iter(values.iter()), |row| {
            Ok(AddressCount {
              address: row.get(0)?,
              count:   row.get::<_, i64>(1)? as u64,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    Ok(rows)
  }

  async fn count_events(&self, req: &EventCountRequest) -> Result<u64> {
    let mut sql = String::from(
      "SELECT COUNT(DISTINCT message_id) FROM events WHERE mailbox_id = ?",
    );
    let mut values = vec![SqlValue::Text(encode_uuid(req.mailbox_id))];

    // A contact participates as a recipient on outgoing mail and as the
    // sender on incoming mail.
    let outgoing = encode_direction(EventDirection::Outgoing);
    let incoming = encode_direction(EventDirection::Incoming);
    match req.direction {
      Some(EventDirection::Outgoing) => {
        sql.push_str(" AND direction = ? AND address = ?");
        values.push(SqlValue::Text(outgoing.to_owned()));
        values.push(SqlValue::Text(req.address.clone()));
      }
      Some(EventDirection::Incoming) => {
        sql.push_str(" AND direction = ? AND sender = ?");
        values.push(SqlValue::Text(incoming.to_owned()));
        values.push(SqlValue::Text(req.address.clone()));
      }
      None => {
        sql.push_str(
          " AND ((direction = ? AND address = ?) OR (direction = ? AND sender = ?))",
        );
        values.push(SqlValue::Text(outgoing.to_owned()));
        values.push(SqlValue::Text(req.address.clone()));
        values.push(SqlValue::Text(incoming.to_owned()));
        values.push(SqlValue::Text(req.address.clone()));
      }
    }

    if let Some(since) = req.since {
      sql.push_str(" AND timestamp_ms >= ?");
      values.push(SqlValue::Int(encode_ts(since)));
    }

    let count: i64 = self
      .conn
      .call(move |conn| {
        Ok(conn.query_row(
          &sql,
          rusqlite::params_from_iter(values.iter()),
          |row| row.get(0),
        )?)
      })
      .await?;
    Ok(count as u64)
  }

  async fn delete_mailbox_events(&self, mailbox_id: Uuid) -> Result<()> {
    let mailbox = encode_uuid(mailbox_id);
    self
      .conn
      .call(move |conn| {
        conn.execute(
          "DELETE FROM events WHERE mailbox_id = ?1",
          rusqlite::params![mailbox],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}
