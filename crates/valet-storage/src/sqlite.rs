//! SQLite-backed store implementation.

use crate::records::{
    BotRecord, BotSnapshot, ConversationRecord, ConversationSnapshot, MemoryRecord,
    MessageRecord, MessageSnapshot, ToolCallRecord,
};
use crate::store::{AssistantStore, StoreError};
use chrono::{DateTime, Utc};
use log::{debug, info};
use parking_lot::Mutex;
use rusqlite::{Connection, params};
use std::path::Path;
use uuid::Uuid;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS bots (
    id          TEXT PRIMARY KEY,
    name        TEXT NOT NULL,
    permissions INTEGER NOT NULL,
    created_at  TEXT NOT NULL,
    deleted_at  TEXT
);
CREATE TABLE IF NOT EXISTS memories (
    id               TEXT PRIMARY KEY,
    bot_id           TEXT NOT NULL,
    timezone         TEXT NOT NULL,
    city             TEXT NOT NULL,
    temperature_unit TEXT NOT NULL,
    deleted_at       TEXT
);
CREATE TABLE IF NOT EXISTS conversations (
    id         TEXT PRIMARY KEY,
    bot_id     TEXT NOT NULL,
    name       TEXT NOT NULL,
    created_at TEXT NOT NULL,
    deleted_at TEXT
);
CREATE TABLE IF NOT EXISTS messages (
    id              TEXT PRIMARY KEY,
    conversation_id TEXT NOT NULL,
    idx             INTEGER NOT NULL,
    role            TEXT NOT NULL,
    name            TEXT,
    content         TEXT NOT NULL,
    tool_call_id    TEXT,
    created_at      TEXT NOT NULL,
    deleted_at      TEXT
);
CREATE TABLE IF NOT EXISTS tool_calls (
    id         TEXT NOT NULL,
    message_id TEXT NOT NULL,
    kind       TEXT NOT NULL,
    function   TEXT NOT NULL,
    arguments  TEXT NOT NULL,
    deleted_at TEXT,
    PRIMARY KEY (id, message_id)
);
";

/// `AssistantStore` backed by a single SQLite database file.
pub struct SqliteStore {
    /// Serialize access to the connection.
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (or create) the database at `path` and run migrations.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        info!("opening sqlite store (path={})", path.display());
        let conn = Connection::open(path)?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Open a throwaway in-memory database.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn load_memory(conn: &Connection, bot_id: Uuid) -> Result<MemoryRecord, StoreError> {
        let mut stmt = conn.prepare(
            "SELECT id, timezone, city, temperature_unit FROM memories \
             WHERE bot_id = ?1 AND deleted_at IS NULL",
        )?;
        let mut rows = stmt.query(params![bot_id.to_string()])?;
        let row = rows.next()?.ok_or(StoreError::MissingMemory(bot_id))?;
        Ok(MemoryRecord {
            id: parse_uuid(row.get::<_, String>(0)?)?,
            bot_id,
            timezone: row.get(1)?,
            city: row.get(2)?,
            temperature_unit: row.get(3)?,
        })
    }

    fn load_conversations(
        conn: &Connection,
        bot_id: Uuid,
    ) -> Result<Vec<ConversationSnapshot>, StoreError> {
        let mut stmt = conn.prepare(
            "SELECT id, name, created_at FROM conversations \
             WHERE bot_id = ?1 AND deleted_at IS NULL ORDER BY created_at",
        )?;
        let records = stmt
            .query_map(params![bot_id.to_string()], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, DateTime<Utc>>(2)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut conversations = Vec::with_capacity(records.len());
        for (id, name, created_at) in records {
            let id = parse_uuid(id)?;
            let messages = Self::load_messages(conn, id)?;
            conversations.push(ConversationSnapshot {
                conversation: ConversationRecord {
                    id,
                    bot_id,
                    name,
                    created_at,
                },
                messages,
            });
        }
        Ok(conversations)
    }

    fn load_messages(
        conn: &Connection,
        conversation_id: Uuid,
    ) -> Result<Vec<MessageSnapshot>, StoreError> {
        let mut stmt = conn.prepare(
            "SELECT id, idx, role, name, content, tool_call_id, created_at FROM messages \
             WHERE conversation_id = ?1 AND deleted_at IS NULL ORDER BY idx",
        )?;
        let records = stmt
            .query_map(params![conversation_id.to_string()], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, u32>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, Option<String>>(3)?,
                    row.get::<_, String>(4)?,
                    row.get::<_, Option<String>>(5)?,
                    row.get::<_, DateTime<Utc>>(6)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut messages = Vec::with_capacity(records.len());
        for (id, idx, role, name, content, tool_call_id, created_at) in records {
            let id = parse_uuid(id)?;
            let tool_calls = Self::load_tool_calls(conn, id)?;
            messages.push(MessageSnapshot {
                message: MessageRecord {
                    id,
                    conversation_id,
                    idx,
                    role,
                    name,
                    content,
                    tool_call_id,
                    created_at,
                },
                tool_calls,
            });
        }
        Ok(messages)
    }

    fn load_tool_calls(
        conn: &Connection,
        message_id: Uuid,
    ) -> Result<Vec<ToolCallRecord>, StoreError> {
        let mut stmt = conn.prepare(
            "SELECT id, kind, function, arguments FROM tool_calls \
             WHERE message_id = ?1 AND deleted_at IS NULL",
        )?;
        let calls = stmt
            .query_map(params![message_id.to_string()], |row| {
                Ok(ToolCallRecord {
                    id: row.get(0)?,
                    message_id,
                    kind: row.get(1)?,
                    function: row.get(2)?,
                    arguments: row.get(3)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(calls)
    }
}

impl AssistantStore for SqliteStore {
    fn create_bot(&self, bot: &BotRecord, memory: &MemoryRecord) -> Result<(), StoreError> {
        let conn = self.conn.lock();
        let live: u32 = conn.query_row(
            "SELECT COUNT(*) FROM bots WHERE name = ?1 AND deleted_at IS NULL",
            params![bot.name],
            |row| row.get(0),
        )?;
        if live > 0 {
            return Err(StoreError::BotExists(bot.name.clone()));
        }
        info!("creating bot (bot_id={}, name={})", bot.id, bot.name);
        conn.execute(
            "INSERT INTO bots (id, name, permissions, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![bot.id.to_string(), bot.name, bot.permissions, bot.created_at],
        )?;
        conn.execute(
            "INSERT INTO memories (id, bot_id, timezone, city, temperature_unit) \
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                memory.id.to_string(),
                memory.bot_id.to_string(),
                memory.timezone,
                memory.city,
                memory.temperature_unit
            ],
        )?;
        Ok(())
    }

    fn save_memory(&self, memory: &MemoryRecord) -> Result<(), StoreError> {
        debug!("saving memory (bot_id={})", memory.bot_id);
        self.conn.lock().execute(
            "UPDATE memories SET timezone = ?2, city = ?3, temperature_unit = ?4 WHERE id = ?1",
            params![
                memory.id.to_string(),
                memory.timezone,
                memory.city,
                memory.temperature_unit
            ],
        )?;
        Ok(())
    }

    fn create_conversation(&self, conversation: &ConversationRecord) -> Result<(), StoreError> {
        info!(
            "creating conversation (conversation_id={}, key={})",
            conversation.id, conversation.name
        );
        self.conn.lock().execute(
            "INSERT INTO conversations (id, bot_id, name, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![
                conversation.id.to_string(),
                conversation.bot_id.to_string(),
                conversation.name,
                conversation.created_at
            ],
        )?;
        Ok(())
    }

    fn delete_conversation(&self, conversation_id: Uuid) -> Result<(), StoreError> {
        info!("deleting conversation (conversation_id={})", conversation_id);
        let conn = self.conn.lock();
        let now = Utc::now();
        let id = conversation_id.to_string();
        conn.execute(
            "UPDATE tool_calls SET deleted_at = ?2 WHERE deleted_at IS NULL AND message_id IN \
             (SELECT id FROM messages WHERE conversation_id = ?1)",
            params![id, now],
        )?;
        conn.execute(
            "UPDATE messages SET deleted_at = ?2 WHERE conversation_id = ?1 AND deleted_at IS NULL",
            params![id, now],
        )?;
        conn.execute(
            "UPDATE conversations SET deleted_at = ?2 WHERE id = ?1 AND deleted_at IS NULL",
            params![id, now],
        )?;
        Ok(())
    }

    fn append_message(
        &self,
        message: &MessageRecord,
        tool_calls: &[ToolCallRecord],
    ) -> Result<(), StoreError> {
        debug!(
            "appending message (conversation_id={}, idx={}, role={}, tool_calls={})",
            message.conversation_id,
            message.idx,
            message.role,
            tool_calls.len()
        );
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO messages (id, conversation_id, idx, role, name, content, tool_call_id, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                message.id.to_string(),
                message.conversation_id.to_string(),
                message.idx,
                message.role,
                message.name,
                message.content,
                message.tool_call_id,
                message.created_at
            ],
        )?;
        for call in tool_calls {
            conn.execute(
                "INSERT INTO tool_calls (id, message_id, kind, function, arguments) \
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    call.id,
                    call.message_id.to_string(),
                    call.kind,
                    call.function,
                    call.arguments
                ],
            )?;
        }
        Ok(())
    }

    fn truncate_tool_calls(&self, message_id: Uuid, keep_call_id: &str) -> Result<(), StoreError> {
        debug!(
            "truncating tool calls (message_id={}, keep={})",
            message_id, keep_call_id
        );
        self.conn.lock().execute(
            "UPDATE tool_calls SET deleted_at = ?3 \
             WHERE message_id = ?1 AND id != ?2 AND deleted_at IS NULL",
            params![message_id.to_string(), keep_call_id, Utc::now()],
        )?;
        Ok(())
    }

    fn load_bots(&self) -> Result<Vec<BotSnapshot>, StoreError> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT id, name, permissions, created_at FROM bots \
             WHERE deleted_at IS NULL ORDER BY created_at",
        )?;
        let records = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, u8>(2)?,
                    row.get::<_, DateTime<Utc>>(3)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut snapshots = Vec::with_capacity(records.len());
        for (id, name, permissions, created_at) in records {
            let id = parse_uuid(id)?;
            let memory = Self::load_memory(&conn, id)?;
            let conversations = Self::load_conversations(&conn, id)?;
            snapshots.push(BotSnapshot {
                bot: BotRecord {
                    id,
                    name,
                    permissions,
                    created_at,
                },
                memory,
                conversations,
            });
        }
        Ok(snapshots)
    }
}

fn parse_uuid(raw: String) -> Result<Uuid, StoreError> {
    Uuid::parse_str(&raw).map_err(|err| StoreError::Corrupt(format!("bad uuid {raw}: {err}")))
}
