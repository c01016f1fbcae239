//! SQLite-backed record store
//!
//! Holds tickets, unit baselines, leads and audit items in a single SQLite
//! database. The connection is guarded by a mutex; no lock is held across an
//! `.await` because every method here is synchronous and short.

use crate::storage::error::{StorageError, StorageResult};
use crate::storage::types::{
    AuditItem, ChatMessage, Lead, NewAuditItem, NewLead, NewTicket, Priority, RiskLevel, Ticket,
    TicketDetails, TicketStatus, UnitBaseline,
};
use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OpenFlags, OptionalExtension, Row};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS tickets (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    phone TEXT NOT NULL,
    postal_code TEXT NOT NULL,
    unit_id TEXT,
    category TEXT,
    priority TEXT,
    status TEXT NOT NULL DEFAULT 'Open',
    risk_level TEXT NOT NULL DEFAULT 'Green',
    summary TEXT,
    contact_info TEXT,
    issue_title TEXT,
    issue_description TEXT,
    ai_estimated_cost TEXT,
    ai_diagnosis TEXT,
    ai_recommended_action TEXT,
    conversation_history TEXT NOT NULL DEFAULT '[]',
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_tickets_status ON tickets(status);

CREATE TABLE IF NOT EXISTS unit_baselines (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    unit_id TEXT NOT NULL UNIQUE,
    move_in_video_summary TEXT,
    baseline_json TEXT,
    last_audit_date TEXT NOT NULL,
    last_updated TEXT NOT NULL,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS leads (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    phone TEXT NOT NULL,
    postal_code TEXT NOT NULL,
    issue_category TEXT,
    ai_estimated_cost TEXT,
    timestamp TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS audit_items (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    unit_id TEXT NOT NULL,
    item TEXT NOT NULL,
    room TEXT NOT NULL,
    condition TEXT NOT NULL,
    is_new INTEGER NOT NULL,
    estimated_cost TEXT,
    timestamp TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_audit_items_unit ON audit_items(unit_id);
";

const TICKET_COLUMNS: &str = "id, name, phone, postal_code, unit_id, category, priority, status,
    risk_level, summary, contact_info, issue_title, issue_description, ai_estimated_cost,
    ai_diagnosis, ai_recommended_action, conversation_history, created_at, updated_at";

const BASELINE_COLUMNS: &str =
    "id, unit_id, move_in_video_summary, baseline_json, last_audit_date, last_updated, created_at";

/// Record store for the maintenance backend
pub struct Store {
    conn: Mutex<Connection>,
    path: Option<PathBuf>,
}

impl Store {
    /// Open (or create) a database file
    pub fn open(path: &Path) -> StorageResult<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_CREATE
                | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            ",
        )?;

        Self::init(conn, Some(path.to_path_buf()))
    }

    /// Open a private in-memory database
    pub fn open_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init(conn, None)
    }

    /// Open from a `DATABASE_URL`-style string
    ///
    /// Accepts `sqlite://path`, `sqlite:path`, `sqlite::memory:` or a bare
    /// file path. Server databases (`postgres://`...) are rejected.
    pub fn from_database_url(url: &str) -> StorageResult<Self> {
        let url = url.trim();

        if url == "sqlite::memory:" || url == ":memory:" {
            return Self::open_in_memory();
        }

        if url.contains("://") && !url.starts_with("sqlite://") {
            return Err(StorageError::Config(format!(
                "Unsupported database URL '{}': only SQLite is supported",
                url
            )));
        }

        let path = url
            .strip_prefix("sqlite://")
            .or_else(|| url.strip_prefix("sqlite:"))
            .unwrap_or(url);

        if path.is_empty() {
            return Err(StorageError::Config("Empty database path".to_string()));
        }

        Self::open(Path::new(path))
    }

    fn init(conn: Connection, path: Option<PathBuf>) -> StorageResult<Self> {
        conn.execute_batch(SCHEMA)?;
        tracing::debug!(path = ?path, "Database schema ready");

        Ok(Self {
            conn: Mutex::new(conn),
            path,
        })
    }

    /// Database file path, `None` for in-memory stores
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn conn(&self) -> StorageResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| StorageError::Lock(e.to_string()))
    }

    /// Cheap liveness query
    pub fn ping(&self) -> bool {
        match self.conn() {
            Ok(conn) => conn
                .query_row("SELECT 1", [], |row| row.get::<_, i64>(0))
                .is_ok(),
            Err(_) => false,
        }
    }

    // ============================================
    // Tickets
    // ============================================

    /// Open a new ticket with an empty conversation
    pub fn create_ticket(&self, new: &NewTicket) -> StorageResult<Ticket> {
        let conn = self.conn()?;
        let now = Utc::now().to_rfc3339();

        conn.execute(
            "INSERT INTO tickets (name, phone, postal_code, status, risk_level,
                conversation_history, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, '[]', ?6, ?6)",
            params![
                new.name,
                new.phone,
                new.postal_code,
                TicketStatus::Open.as_str(),
                RiskLevel::Green.as_str(),
                now
            ],
        )?;

        let id = conn.last_insert_rowid();
        fetch_ticket(&conn, id)?
            .ok_or_else(|| StorageError::NotFound(format!("ticket {}", id)))
    }

    pub fn get_ticket(&self, id: i64) -> StorageResult<Option<Ticket>> {
        let conn = self.conn()?;
        fetch_ticket(&conn, id)
    }

    /// List tickets, newest first, optionally filtered by status
    pub fn list_tickets(&self, status: Option<TicketStatus>) -> StorageResult<Vec<Ticket>> {
        let conn = self.conn()?;

        let tickets = match status {
            Some(status) => {
                let mut stmt = conn.prepare_cached(&format!(
                    "SELECT {} FROM tickets WHERE status = ?1 ORDER BY id DESC",
                    TICKET_COLUMNS
                ))?;
                let rows = stmt.query_map(params![status.as_str()], ticket_from_row)?;
                rows.collect::<Result<Vec<_>, _>>()?
            }
            None => {
                let mut stmt = conn.prepare_cached(&format!(
                    "SELECT {} FROM tickets ORDER BY id DESC",
                    TICKET_COLUMNS
                ))?;
                let rows = stmt.query_map([], ticket_from_row)?;
                rows.collect::<Result<Vec<_>, _>>()?
            }
        };

        Ok(tickets)
    }

    /// Persist a chat turn: replace the history, optionally bump risk and status
    pub fn record_chat_turn(
        &self,
        id: i64,
        history: &[ChatMessage],
        risk: Option<RiskLevel>,
        status: Option<TicketStatus>,
    ) -> StorageResult<()> {
        let conn = self.conn()?;
        let history_json = serde_json::to_string(history)?;

        let changed = conn.execute(
            "UPDATE tickets
             SET conversation_history = ?1,
                 risk_level = COALESCE(?2, risk_level),
                 status = COALESCE(?3, status),
                 updated_at = ?4
             WHERE id = ?5",
            params![
                history_json,
                risk.map(|r| r.as_str()),
                status.map(|s| s.as_str()),
                Utc::now().to_rfc3339(),
                id
            ],
        )?;

        if changed == 0 {
            return Err(StorageError::NotFound(format!("ticket {}", id)));
        }
        Ok(())
    }

    /// Copy confirmed slot data onto a ticket; `None` fields are left untouched
    pub fn apply_ticket_details(&self, id: i64, details: &TicketDetails) -> StorageResult<()> {
        let conn = self.conn()?;
        let contact_json = details
            .contact_info
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;

        let changed = conn.execute(
            "UPDATE tickets
             SET name = COALESCE(?1, name),
                 phone = COALESCE(?2, phone),
                 unit_id = COALESCE(?3, unit_id),
                 category = COALESCE(?4, category),
                 priority = COALESCE(?5, priority),
                 summary = COALESCE(?6, summary),
                 issue_title = COALESCE(?7, issue_title),
                 issue_description = COALESCE(?8, issue_description),
                 contact_info = COALESCE(?9, contact_info),
                 updated_at = ?10
             WHERE id = ?11",
            params![
                details.name,
                details.phone,
                details.unit_id,
                details.category,
                details.priority.map(|p| p.as_str()),
                details.summary,
                details.issue_title,
                details.issue_description,
                contact_json,
                Utc::now().to_rfc3339(),
                id
            ],
        )?;

        if changed == 0 {
            return Err(StorageError::NotFound(format!("ticket {}", id)));
        }
        Ok(())
    }

    // ============================================
    // Unit baselines
    // ============================================

    /// Insert or overwrite the move-in baseline for a unit
    pub fn upsert_baseline(
        &self,
        unit_id: &str,
        summary: &str,
        baseline_json: Option<&serde_json::Value>,
    ) -> StorageResult<UnitBaseline> {
        let conn = self.conn()?;
        let json = baseline_json.map(serde_json::to_string).transpose()?;

        write_baseline(&conn, unit_id, summary, json.as_deref(), &Utc::now().to_rfc3339())?;
        fetch_baseline(&conn, unit_id)?
            .ok_or_else(|| StorageError::NotFound(format!("unit {}", unit_id)))
    }

    /// Overwrite a unit's baseline and swap its move-in room items in one
    /// transaction; move-out damage rows are kept
    pub fn replace_move_in(
        &self,
        unit_id: &str,
        summary: &str,
        baseline_json: Option<&serde_json::Value>,
        rooms: &[NewAuditItem],
    ) -> StorageResult<UnitBaseline> {
        let mut conn = self.conn()?;
        let json = baseline_json.map(serde_json::to_string).transpose()?;
        let now = Utc::now().to_rfc3339();
        let tx = conn.transaction()?;

        write_baseline(&tx, unit_id, summary, json.as_deref(), &now)?;
        tx.execute(
            "DELETE FROM audit_items WHERE unit_id = ?1 AND is_new = 0",
            params![unit_id],
        )?;
        write_audit_items(&tx, unit_id, rooms, &now)?;

        let baseline = fetch_baseline(&tx, unit_id)?
            .ok_or_else(|| StorageError::NotFound(format!("unit {}", unit_id)))?;
        tx.commit()?;
        Ok(baseline)
    }

    pub fn get_baseline(&self, unit_id: &str) -> StorageResult<Option<UnitBaseline>> {
        let conn = self.conn()?;
        fetch_baseline(&conn, unit_id)
    }

    /// All units with a baseline, most recently audited first
    pub fn list_baselines(&self) -> StorageResult<Vec<UnitBaseline>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare_cached(&format!(
            "SELECT {} FROM unit_baselines ORDER BY last_updated DESC, id DESC",
            BASELINE_COLUMNS
        ))?;
        let rows = stmt.query_map([], baseline_from_row)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    // ============================================
    // Leads
    // ============================================

    pub fn create_lead(&self, new: &NewLead) -> StorageResult<Lead> {
        let conn = self.conn()?;
        let now = Utc::now();

        conn.execute(
            "INSERT INTO leads (name, phone, postal_code, issue_category, ai_estimated_cost, timestamp)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                new.name,
                new.phone,
                new.postal_code,
                new.issue_category,
                new.ai_estimated_cost,
                now.to_rfc3339()
            ],
        )?;

        Ok(Lead {
            id: conn.last_insert_rowid(),
            name: new.name.clone(),
            phone: new.phone.clone(),
            postal_code: new.postal_code.clone(),
            issue_category: new.issue_category.clone(),
            ai_estimated_cost: new.ai_estimated_cost.clone(),
            timestamp: now,
        })
    }

    /// All leads, newest first
    pub fn list_leads(&self) -> StorageResult<Vec<Lead>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare_cached(
            "SELECT id, name, phone, postal_code, issue_category, ai_estimated_cost, timestamp
             FROM leads ORDER BY id DESC",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(Lead {
                id: row.get(0)?,
                name: row.get(1)?,
                phone: row.get(2)?,
                postal_code: row.get(3)?,
                issue_category: row.get(4)?,
                ai_estimated_cost: row.get(5)?,
                timestamp: parse_timestamp(row, 6)?,
            })
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    // ============================================
    // Audit items
    // ============================================

    /// Insert a batch of audit items in one transaction
    pub fn insert_audit_items(&self, unit_id: &str, items: &[NewAuditItem]) -> StorageResult<usize> {
        if items.is_empty() {
            return Ok(0);
        }

        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        write_audit_items(&tx, unit_id, items, &Utc::now().to_rfc3339())?;
        tx.commit()?;
        Ok(items.len())
    }

    /// Audit items for a unit in insertion order
    pub fn list_audit_items(&self, unit_id: &str) -> StorageResult<Vec<AuditItem>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare_cached(
            "SELECT id, unit_id, item, room, condition, is_new, estimated_cost, timestamp
             FROM audit_items WHERE unit_id = ?1 ORDER BY id",
        )?;
        let rows = stmt.query_map(params![unit_id], |row| {
            Ok(AuditItem {
                id: row.get(0)?,
                unit_id: row.get(1)?,
                item: row.get(2)?,
                room: row.get(3)?,
                condition: row.get(4)?,
                is_new: row.get(5)?,
                estimated_cost: row.get(6)?,
                timestamp: parse_timestamp(row, 7)?,
            })
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }
}

fn write_baseline(
    conn: &Connection,
    unit_id: &str,
    summary: &str,
    baseline_json: Option<&str>,
    now: &str,
) -> StorageResult<()> {
    conn.execute(
        "INSERT INTO unit_baselines
            (unit_id, move_in_video_summary, baseline_json, last_audit_date, last_updated, created_at)
         VALUES (?1, ?2, ?3, ?4, ?4, ?4)
         ON CONFLICT(unit_id) DO UPDATE SET
            move_in_video_summary = excluded.move_in_video_summary,
            baseline_json = excluded.baseline_json,
            last_audit_date = excluded.last_audit_date,
            last_updated = excluded.last_updated",
        params![unit_id, summary, baseline_json, now],
    )?;
    Ok(())
}

fn write_audit_items(
    conn: &Connection,
    unit_id: &str,
    items: &[NewAuditItem],
    now: &str,
) -> StorageResult<()> {
    let mut stmt = conn.prepare_cached(
        "INSERT INTO audit_items (unit_id, item, room, condition, is_new, estimated_cost, timestamp)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
    )?;
    for item in items {
        stmt.execute(params![
            unit_id,
            item.item,
            item.room,
            item.condition,
            item.is_new,
            item.estimated_cost,
            now
        ])?;
    }
    Ok(())
}

fn fetch_ticket(conn: &Connection, id: i64) -> StorageResult<Option<Ticket>> {
    let mut stmt = conn.prepare_cached(&format!(
        "SELECT {} FROM tickets WHERE id = ?1",
        TICKET_COLUMNS
    ))?;
    Ok(stmt.query_row(params![id], ticket_from_row).optional()?)
}

fn fetch_baseline(conn: &Connection, unit_id: &str) -> StorageResult<Option<UnitBaseline>> {
    let mut stmt = conn.prepare_cached(&format!(
        "SELECT {} FROM unit_baselines WHERE unit_id = ?1",
        BASELINE_COLUMNS
    ))?;
    Ok(stmt.query_row(params![unit_id], baseline_from_row).optional()?)
}

fn ticket_from_row(row: &Row<'_>) -> rusqlite::Result<Ticket> {
    let priority: Option<String> = row.get(6)?;
    let status: String = row.get(7)?;
    let risk: String = row.get(8)?;
    let contact_info: Option<String> = row.get(10)?;
    let history: String = row.get(16)?;

    Ok(Ticket {
        id: row.get(0)?,
        name: row.get(1)?,
        phone: row.get(2)?,
        postal_code: row.get(3)?,
        unit_id: row.get(4)?,
        category: row.get(5)?,
        priority: priority
            .map(|p| p.parse::<Priority>())
            .transpose()
            .map_err(|e| conversion_error(6, e))?,
        status: status
            .parse::<TicketStatus>()
            .map_err(|e| conversion_error(7, e))?,
        risk_level: risk.parse::<RiskLevel>().map_err(|e| conversion_error(8, e))?,
        summary: row.get(9)?,
        contact_info: contact_info
            .map(|c| serde_json::from_str(&c))
            .transpose()
            .map_err(|e| conversion_error(10, e.to_string()))?,
        issue_title: row.get(11)?,
        issue_description: row.get(12)?,
        ai_estimated_cost: row.get(13)?,
        ai_diagnosis: row.get(14)?,
        ai_recommended_action: row.get(15)?,
        conversation_history: serde_json::from_str(&history)
            .map_err(|e| conversion_error(16, e.to_string()))?,
        created_at: parse_timestamp(row, 17)?,
        updated_at: parse_timestamp(row, 18)?,
    })
}

fn baseline_from_row(row: &Row<'_>) -> rusqlite::Result<UnitBaseline> {
    let json: Option<String> = row.get(3)?;

    Ok(UnitBaseline {
        id: row.get(0)?,
        unit_id: row.get(1)?,
        move_in_video_summary: row.get(2)?,
        baseline_json: json
            .map(|j| serde_json::from_str(&j))
            .transpose()
            .map_err(|e| conversion_error(3, e.to_string()))?,
        last_audit_date: parse_timestamp(row, 4)?,
        last_updated: parse_timestamp(row, 5)?,
        created_at: parse_timestamp(row, 6)?,
    })
}

fn parse_timestamp(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| conversion_error(idx, e.to_string()))
}

fn conversion_error(idx: usize, message: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, message.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_create_and_get_ticket() {
        let store = Store::open_in_memory().unwrap();
        let ticket = store.create_ticket(&NewTicket::widget_session()).unwrap();

        assert_eq!(ticket.name, "Widget User");
        assert_eq!(ticket.status, TicketStatus::Open);
        assert_eq!(ticket.risk_level, RiskLevel::Green);
        assert!(ticket.conversation_history.is_empty());

        let fetched = store.get_ticket(ticket.id).unwrap().unwrap();
        assert_eq!(fetched.id, ticket.id);
        assert!(store.get_ticket(ticket.id + 100).unwrap().is_none());
    }

    #[test]
    fn test_record_chat_turn_keeps_unset_fields() {
        let store = Store::open_in_memory().unwrap();
        let ticket = store.create_ticket(&NewTicket::widget_session()).unwrap();

        let history = vec![
            ChatMessage::user("There is water under my sink"),
            ChatMessage::assistant("Which unit are you in?"),
        ];
        store
            .record_chat_turn(ticket.id, &history, Some(RiskLevel::Yellow), None)
            .unwrap();

        let updated = store.get_ticket(ticket.id).unwrap().unwrap();
        assert_eq!(updated.conversation_history, history);
        assert_eq!(updated.risk_level, RiskLevel::Yellow);
        assert_eq!(updated.status, TicketStatus::Open);

        store
            .record_chat_turn(ticket.id, &history, None, Some(TicketStatus::Escalated))
            .unwrap();
        let updated = store.get_ticket(ticket.id).unwrap().unwrap();
        assert_eq!(updated.risk_level, RiskLevel::Yellow);
        assert_eq!(updated.status, TicketStatus::Escalated);
    }

    #[test]
    fn test_record_chat_turn_missing_ticket() {
        let store = Store::open_in_memory().unwrap();
        let err = store.record_chat_turn(42, &[], None, None).unwrap_err();
        assert!(matches!(err, StorageError::NotFound(_)));
    }

    #[test]
    fn test_apply_ticket_details() {
        let store = Store::open_in_memory().unwrap();
        let ticket = store.create_ticket(&NewTicket::widget_session()).unwrap();

        let details = TicketDetails {
            name: Some("Sarah Johnson".to_string()),
            phone: Some("555-987-6543".to_string()),
            unit_id: Some("12B".to_string()),
            category: Some("Plumbing".to_string()),
            priority: Some(Priority::Medium),
            summary: Some("Kitchen faucet dripping".to_string()),
            contact_info: Some(serde_json::json!({"phone": "555-987-6543"})),
            ..Default::default()
        };
        store.apply_ticket_details(ticket.id, &details).unwrap();

        let updated = store.get_ticket(ticket.id).unwrap().unwrap();
        assert_eq!(updated.name, "Sarah Johnson");
        assert_eq!(updated.postal_code, "N/A");
        assert_eq!(updated.unit_id.as_deref(), Some("12B"));
        assert_eq!(updated.priority, Some(Priority::Medium));
        assert_eq!(
            updated.contact_info,
            Some(serde_json::json!({"phone": "555-987-6543"}))
        );
    }

    #[test]
    fn test_list_tickets_by_status() {
        let store = Store::open_in_memory().unwrap();
        let a = store.create_ticket(&NewTicket::widget_session()).unwrap();
        let _b = store.create_ticket(&NewTicket::widget_session()).unwrap();
        store
            .record_chat_turn(a.id, &[], None, Some(TicketStatus::Escalated))
            .unwrap();

        assert_eq!(store.list_tickets(None).unwrap().len(), 2);
        let escalated = store.list_tickets(Some(TicketStatus::Escalated)).unwrap();
        assert_eq!(escalated.len(), 1);
        assert_eq!(escalated[0].id, a.id);
    }

    #[test]
    fn test_upsert_baseline_overwrites() {
        let store = Store::open_in_memory().unwrap();

        let first = store.upsert_baseline("101", "Freshly painted", None).unwrap();
        let second = store
            .upsert_baseline("101", "Scuffed hallway", Some(&serde_json::json!({"rooms": []})))
            .unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(second.move_in_video_summary.as_deref(), Some("Scuffed hallway"));
        assert!(second.baseline_json.is_some());
        assert_eq!(store.list_baselines().unwrap().len(), 1);
        assert!(store.get_baseline("202").unwrap().is_none());
    }

    #[test]
    fn test_leads() {
        let store = Store::open_in_memory().unwrap();
        let lead = store
            .create_lead(&NewLead {
                name: "Pat".to_string(),
                phone: "555-0100".to_string(),
                postal_code: "M5V 2T6".to_string(),
                issue_category: Some("Roofing".to_string()),
                ai_estimated_cost: Some("$300-$800".to_string()),
            })
            .unwrap();

        let leads = store.list_leads().unwrap();
        assert_eq!(leads.len(), 1);
        assert_eq!(leads[0].id, lead.id);
        assert_eq!(leads[0].issue_category.as_deref(), Some("Roofing"));
    }

    #[test]
    fn test_audit_items_by_unit() {
        let store = Store::open_in_memory().unwrap();
        let items = vec![
            NewAuditItem {
                item: "Wall dent".to_string(),
                room: "Living Room".to_string(),
                condition: "Moderate".to_string(),
                is_new: true,
                estimated_cost: Some("$120".to_string()),
            },
            NewAuditItem {
                item: "Kitchen".to_string(),
                room: "Kitchen".to_string(),
                condition: "Good".to_string(),
                is_new: false,
                estimated_cost: None,
            },
        ];

        assert_eq!(store.insert_audit_items("101", &items).unwrap(), 2);
        assert_eq!(store.insert_audit_items("101", &[]).unwrap(), 0);

        let listed = store.list_audit_items("101").unwrap();
        assert_eq!(listed.len(), 2);
        assert!(listed[0].is_new);
        assert!(!listed[1].is_new);
        assert!(store.list_audit_items("999").unwrap().is_empty());
    }

    #[test]
    fn test_replace_move_in_swaps_room_items_only() {
        let store = Store::open_in_memory().unwrap();
        let room = |name: &str| NewAuditItem {
            item: name.to_string(),
            room: name.to_string(),
            condition: "Good".to_string(),
            is_new: false,
            estimated_cost: None,
        };

        store
            .replace_move_in("101", "First walkthrough", None, &[room("Kitchen"), room("Bath")])
            .unwrap();
        store
            .insert_audit_items(
                "101",
                &[NewAuditItem {
                    item: "Wall dent".to_string(),
                    room: "Hall".to_string(),
                    condition: "Moderate".to_string(),
                    is_new: true,
                    estimated_cost: Some("$80".to_string()),
                }],
            )
            .unwrap();

        let baseline = store
            .replace_move_in("101", "Second walkthrough", None, &[room("Bedroom")])
            .unwrap();
        assert_eq!(baseline.move_in_video_summary.as_deref(), Some("Second walkthrough"));

        let items = store.list_audit_items("101").unwrap();
        let rooms: Vec<_> = items.iter().filter(|i| !i.is_new).map(|i| i.item.as_str()).collect();
        assert_eq!(rooms, vec!["Bedroom"]);
        assert_eq!(items.iter().filter(|i| i.is_new).count(), 1);
    }

    #[test]
    fn test_database_url_forms() {
        assert!(Store::from_database_url("sqlite::memory:").is_ok());
        assert!(matches!(
            Store::from_database_url("postgres://user@host/db"),
            Err(StorageError::Config(_))
        ));

        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("fixit.db");
        let url = format!("sqlite://{}", path.display());
        let store = Store::from_database_url(&url).unwrap();
        assert!(store.ping());
        assert_eq!(store.path(), Some(path.as_path()));
    }

    #[test]
    fn test_reopen_persists_records() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("fixit.db");

        let id = {
            let store = Store::open(&path).unwrap();
            store.create_ticket(&NewTicket::widget_session()).unwrap().id
        };

        let store = Store::open(&path).unwrap();
        assert!(store.get_ticket(id).unwrap().is_some());
    }
}
