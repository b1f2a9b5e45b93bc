//! SQLite-backed video store implementation.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, Connection, OptionalExtension, ToSql};

use super::{CompletedVideo, NewVideo, VideoError, VideoRecord, VideoStatus, VideoStore};

const SELECT_COLUMNS: &str = "video_id, title, channel_name, channel_id, duration_seconds, upload_date, description, is_favorite, status, file_size_bytes, created_at, error_message";

/// SQLite-backed video store.
pub struct SqliteVideoStore {
    conn: Mutex<Connection>,
}

impl SqliteVideoStore {
    /// Create a new SQLite video store, creating the database file and tables if needed.
    pub fn new(path: &Path) -> Result<Self, VideoError> {
        let conn = Connection::open(path)?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory SQLite video store (useful for testing).
    pub fn in_memory() -> Result<Self, VideoError> {
        let conn = Connection::open_in_memory()?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn initialize_schema(conn: &Connection) -> Result<(), VideoError> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS videos (
                video_id TEXT PRIMARY KEY,
                title TEXT NOT NULL,
                channel_name TEXT NOT NULL,
                channel_id TEXT,
                duration_seconds INTEGER,
                upload_date TEXT,
                description TEXT,
                is_favorite INTEGER NOT NULL DEFAULT 0,
                status TEXT NOT NULL DEFAULT 'pending',
                file_size_bytes INTEGER,
                created_at TEXT NOT NULL,
                error_message TEXT
            );

            CREATE INDEX IF NOT EXISTS idx_channel_name ON videos(channel_name);
            CREATE INDEX IF NOT EXISTS idx_is_favorite ON videos(is_favorite);
            CREATE INDEX IF NOT EXISTS idx_status ON videos(status);
            "#,
        )?;
        Ok(())
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, VideoError> {
        self.conn
            .lock()
            .map_err(|_| VideoError::Database("connection mutex poisoned".to_string()))
    }

    fn row_to_video(row: &rusqlite::Row) -> rusqlite::Result<VideoRecord> {
        let upload_date: Option<String> = row.get(5)?;
        let status: String = row.get(8)?;
        let file_size_bytes: Option<i64> = row.get(9)?;
        let created_at: String = row.get(10)?;

        Ok(VideoRecord {
            video_id: row.get(0)?,
            title: row.get(1)?,
            channel_name: row.get(2)?,
            channel_id: row.get(3)?,
            duration_seconds: row.get(4)?,
            upload_date: upload_date
                .and_then(|d| NaiveDate::parse_from_str(&d, "%Y-%m-%d").ok()),
            description: row.get(6)?,
            is_favorite: row.get(7)?,
            // Only this module writes the column, so an unknown value means a
            // hand-edited row; surface it as failed rather than hiding it.
            status: status.parse().unwrap_or(VideoStatus::Failed),
            file_size_bytes: file_size_bytes.map(|n| n.max(0) as u64),
            created_at: DateTime::parse_from_rfc3339(&created_at)
                .map(|dt| dt.with_timezone(&Utc))
                .unwrap_or_else(|_| Utc::now()),
            error_message: row.get(11)?,
        })
    }

    fn current_status(conn: &Connection, video_id: &str) -> Result<Option<VideoStatus>, VideoError> {
        let status: Option<String> = conn
            .query_row(
                "SELECT status FROM videos WHERE video_id = ?",
                params![video_id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(status.map(|s| s.parse().unwrap_or(VideoStatus::Failed)))
    }

    /// Apply `assignments` and move to `to`, but only from a status that the
    /// state machine allows. `values` bind the placeholders in `assignments`.
    fn guarded_update(
        conn: &Connection,
        video_id: &str,
        to: VideoStatus,
        assignments: &str,
        values: &[&dyn ToSql],
    ) -> Result<(), VideoError> {
        let sources = VideoStatus::sources_of(to)
            .iter()
            .map(|s| format!("'{}'", s.as_str()))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "UPDATE videos SET status = '{}'{} WHERE video_id = ? AND status IN ({})",
            to.as_str(),
            assignments,
            sources
        );

        let mut bound: Vec<&dyn ToSql> = values.to_vec();
        bound.push(&video_id);

        let changed = conn.execute(&sql, bound.as_slice())?;
        if changed == 1 {
            return Ok(());
        }

        match Self::current_status(conn, video_id)? {
            None => Err(VideoError::NotFound(video_id.to_string())),
            Some(from) => Err(VideoError::InvalidTransition {
                video_id: video_id.to_string(),
                from,
                to,
            }),
        }
    }
}

impl VideoStore for SqliteVideoStore {
    fn create(&self, video: NewVideo) -> Result<VideoRecord, VideoError> {
        let conn = self.conn()?;
        let now = Utc::now();

        let result = conn.execute(
            "INSERT INTO videos (video_id, title, channel_name, channel_id, duration_seconds, is_favorite, status, created_at) VALUES (?, ?, ?, ?, ?, 0, 'pending', ?)",
            params![
                video.video_id,
                video.title,
                video.channel_name,
                video.channel_id,
                video.duration_seconds,
                now.to_rfc3339(),
            ],
        );

        match result {
            Ok(_) => {}
            Err(rusqlite::Error::SqliteFailure(err, _))
                if err.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                return Err(VideoError::AlreadyExists(video.video_id));
            }
            Err(e) => return Err(e.into()),
        }

        Ok(VideoRecord {
            video_id: video.video_id,
            title: video.title,
            channel_name: video.channel_name,
            channel_id: video.channel_id,
            duration_seconds: video.duration_seconds,
            upload_date: None,
            description: None,
            is_favorite: false,
            status: VideoStatus::Pending,
            file_size_bytes: None,
            created_at: now,
            error_message: None,
        })
    }

    fn get(&self, video_id: &str) -> Result<Option<VideoRecord>, VideoError> {
        let conn = self.conn()?;
        let sql = format!("SELECT {} FROM videos WHERE video_id = ?", SELECT_COLUMNS);
        let record = conn
            .query_row(&sql, params![video_id], Self::row_to_video)
            .optional()?;
        Ok(record)
    }

    fn begin_download(&self, video_id: &str) -> Result<(), VideoError> {
        let conn = self.conn()?;
        Self::guarded_update(&conn, video_id, VideoStatus::Downloading, "", &[])
    }

    fn complete(&self, video_id: &str, completed: CompletedVideo) -> Result<(), VideoError> {
        let conn = self.conn()?;
        let upload_date = completed
            .upload_date
            .map(|d| d.format("%Y-%m-%d").to_string());
        let size = completed.file_size_bytes as i64;
        Self::guarded_update(
            &conn,
            video_id,
            VideoStatus::Complete,
            ", title = ?, channel_name = ?, channel_id = ?, duration_seconds = ?, upload_date = ?, description = ?, file_size_bytes = ?, error_message = NULL",
            &[
                &completed.title,
                &completed.channel_name,
                &completed.channel_id,
                &completed.duration_seconds,
                &upload_date,
                &completed.description,
                &size,
            ],
        )
    }

    fn fail(&self, video_id: &str, message: &str) -> Result<(), VideoError> {
        let conn = self.conn()?;
        Self::guarded_update(
            &conn,
            video_id,
            VideoStatus::Failed,
            ", error_message = ?",
            &[&message],
        )
    }

    fn cancel(&self, video_id: &str, message: &str) -> Result<bool, VideoError> {
        let conn = self.conn()?;
        match Self::guarded_update(
            &conn,
            video_id,
            VideoStatus::Cancelled,
            ", error_message = ?",
            &[&message],
        ) {
            Ok(()) => Ok(true),
            Err(VideoError::InvalidTransition {
                from: VideoStatus::Cancelled,
                ..
            }) => Ok(false),
            Err(e) => Err(e),
        }
    }

    fn retry(&self, video_id: &str) -> Result<(), VideoError> {
        let conn = self.conn()?;
        Self::guarded_update(
            &conn,
            video_id,
            VideoStatus::Pending,
            ", error_message = NULL",
            &[],
        )
    }

    fn set_favorite(&self, video_id: &str, favorite: bool) -> Result<(), VideoError> {
        let conn = self.conn()?;
        let changed = conn.execute(
            "UPDATE videos SET is_favorite = ? WHERE video_id = ?",
            params![favorite, video_id],
        )?;
        if changed == 0 {
            return Err(VideoError::NotFound(video_id.to_string()));
        }
        Ok(())
    }

    fn count_by_status(&self, status: VideoStatus) -> Result<i64, VideoError> {
        let conn = self.conn()?;
        let count = conn.query_row(
            "SELECT COUNT(*) FROM videos WHERE status = ?",
            params![status.as_str()],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    fn ping(&self) -> Result<String, VideoError> {
        let conn = self.conn()?;
        let version: String = conn.query_row("SELECT sqlite_version()", [], |row| row.get(0))?;
        Ok(format!("SQLite {}", version))
    }
}
