//! SQLite implementation of the persistence collaborator
//!
//! One database file holds posts, taxonomies, authors and the settings
//! table that carries the menu document. Uniqueness of (type, slug) is
//! enforced by the schema; violations surface as
//! [`StoreError::Constraint`].

use std::fs;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use rusqlite::types::{Type, Value};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};

use crate::domain::{
    Author, Menu, Post, PostStatus, PostType, Role, Taxonomy, TaxonomyInput, TaxonomyKind,
};
use super::store::{
    NewPost, PostCriteria, PostPatch, PostStore, SortDir, SortField, StatusCounts, StoreError,
};

const POST_COLUMNS: &str = "id, type, status, title, slug, md, md_draft, html, excerpt, \
     cover_image, cover_image_width, cover_image_height, featured, reading_time, author_id, \
     created_at, updated_at, published_at";

/// SQLite-backed post store
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Schema version - bump when the schema changes to force rebuild
    const SCHEMA_VERSION: i32 = 1;

    /// Creates or opens the store at the given path
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| StoreError::Corrupt(format!("cannot create {}: {e}", parent.display())))?;
        }

        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;

        let store = Self {
            conn: Mutex::new(conn),
        };
        store.ensure_schema()?;
        Ok(store)
    }

    /// Opens an in-memory store; used by tests and `--ephemeral` runs
    pub fn in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.ensure_schema()?;
        Ok(store)
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn ensure_schema(&self) -> Result<(), StoreError> {
        let conn = self.conn();

        let version: i32 = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;
        if version == Self::SCHEMA_VERSION {
            return Ok(());
        }

        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS posts (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                type TEXT NOT NULL,
                status TEXT NOT NULL,
                title TEXT NOT NULL,
                slug TEXT NOT NULL,
                md TEXT NOT NULL,
                md_draft TEXT,
                html TEXT NOT NULL,
                excerpt TEXT NOT NULL DEFAULT '',
                cover_image TEXT,
                cover_image_width INTEGER NOT NULL DEFAULT 0,
                cover_image_height INTEGER NOT NULL DEFAULT 0,
                featured INTEGER NOT NULL DEFAULT 0,
                reading_time TEXT NOT NULL DEFAULT '1 min read',
                author_id INTEGER NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                published_at TEXT,
                UNIQUE (type, slug)
            );

            CREATE TABLE IF NOT EXISTS taxonomies (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                kind TEXT NOT NULL,
                name TEXT NOT NULL,
                slug TEXT NOT NULL,
                description TEXT NOT NULL DEFAULT '',
                UNIQUE (kind, name)
            );

            CREATE TABLE IF NOT EXISTS post_taxonomies (
                post_id INTEGER NOT NULL,
                taxonomy_id INTEGER NOT NULL,
                PRIMARY KEY (post_id, taxonomy_id)
            );

            CREATE TABLE IF NOT EXISTS authors (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                avatar TEXT NOT NULL DEFAULT '',
                role TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS settings (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_posts_status ON posts(status);
            CREATE INDEX IF NOT EXISTS idx_posts_type ON posts(type);
            CREATE INDEX IF NOT EXISTS idx_pt_taxonomy ON post_taxonomies(taxonomy_id);
            ",
        )?;

        conn.execute(&format!("PRAGMA user_version = {}", Self::SCHEMA_VERSION), [])?;

        Ok(())
    }
}

fn bool_value(b: bool) -> Value {
    Value::Integer(i64::from(b))
}

/// Builds the WHERE clause and its parameters for a criteria set.
///
/// Unset fragments contribute nothing, so "no tag filter" means no tag
/// restriction at all, not an empty result.
fn where_clause(c: &PostCriteria) -> (String, Vec<Value>) {
    let mut clauses: Vec<&'static str> = Vec::new();
    let mut values: Vec<Value> = Vec::new();

    if let Some(id) = c.id {
        clauses.push("id = ?");
        values.push(Value::Integer(id));
    }
    if let Some(slug) = &c.slug {
        clauses.push("slug = ?");
        values.push(Value::Text(slug.clone()));
    }
    if let Some(status) = c.status {
        clauses.push("status = ?");
        values.push(Value::Text(status.as_str().to_string()));
    }
    if let Some(post_type) = c.post_type {
        clauses.push("type = ?");
        values.push(Value::Text(post_type.as_str().to_string()));
    }
    if let Some(featured) = c.featured {
        clauses.push("featured = ?");
        values.push(bool_value(featured));
    }
    if let Some(author_id) = c.author_id {
        clauses.push("author_id = ?");
        values.push(Value::Integer(author_id));
    }
    if let Some(tag_slug) = &c.tag_slug {
        clauses.push(
            "id IN (SELECT pt.post_id FROM post_taxonomies pt \
             JOIN taxonomies t ON t.id = pt.taxonomy_id WHERE t.slug = ?)",
        );
        values.push(Value::Text(tag_slug.clone()));
    }
    if let Some(term) = &c.search_term {
        clauses.push("title LIKE ?");
        values.push(Value::Text(format!("%{}%", term)));
    }
    if let Some(before) = c.id_before {
        clauses.push("id < ?");
        values.push(Value::Integer(before));
    }
    if let Some(after) = c.id_after {
        clauses.push("id > ?");
        values.push(Value::Integer(after));
    }

    let sql = if clauses.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", clauses.join(" AND "))
    };

    (sql, values)
}

/// ORDER BY / LIMIT / OFFSET tail for a criteria set
fn tail_clause(c: &PostCriteria) -> String {
    let (field, dir) = c.order.unwrap_or((SortField::Id, SortDir::Asc));
    let mut tail = format!(" ORDER BY {} {}", field.column(), dir.keyword());

    match (c.limit, c.offset) {
        (Some(limit), Some(offset)) => tail.push_str(&format!(" LIMIT {} OFFSET {}", limit, offset)),
        (Some(limit), None) => tail.push_str(&format!(" LIMIT {}", limit)),
        (None, Some(offset)) => tail.push_str(&format!(" LIMIT -1 OFFSET {}", offset)),
        (None, None) => {}
    }

    tail
}

fn parse_timestamp(idx: usize, raw: String) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn post_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Post> {
    let post_type: String = row.get(1)?;
    let status: String = row.get(2)?;
    let published_at: Option<String> = row.get(17)?;

    Ok(Post {
        id: row.get(0)?,
        post_type: post_type
            .parse::<PostType>()
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(1, Type::Text, Box::new(e)))?,
        status: status
            .parse::<PostStatus>()
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(2, Type::Text, Box::new(e)))?,
        title: row.get(3)?,
        slug: row.get(4)?,
        md: row.get(5)?,
        md_draft: row.get(6)?,
        html: row.get(7)?,
        excerpt: row.get(8)?,
        cover_image: row.get(9)?,
        cover_image_width: row.get(10)?,
        cover_image_height: row.get(11)?,
        featured: row.get(12)?,
        reading_time: row.get(13)?,
        author_id: row.get(14)?,
        created_at: parse_timestamp(15, row.get(15)?)?,
        updated_at: parse_timestamp(16, row.get(16)?)?,
        published_at: published_at.map(|raw| parse_timestamp(17, raw)).transpose()?,
    })
}

fn taxonomy_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Taxonomy> {
    let kind: String = row.get(1)?;
    Ok(Taxonomy {
        id: row.get(0)?,
        kind: kind
            .parse::<TaxonomyKind>()
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(1, Type::Text, Box::new(e)))?,
        name: row.get(2)?,
        slug: row.get(3)?,
        description: row.get(4)?,
        post_count: row.get(5)?,
    })
}

fn map_constraint(err: rusqlite::Error, field: &'static str) -> StoreError {
    if let rusqlite::Error::SqliteFailure(e, _) = &err {
        if e.code == rusqlite::ErrorCode::ConstraintViolation {
            return StoreError::Constraint { field };
        }
    }
    StoreError::Sqlite(err)
}

impl PostStore for SqliteStore {
    fn find_one(&self, criteria: &PostCriteria) -> Result<Option<Post>, StoreError> {
        let mut limited = criteria.clone();
        limited.limit = Some(1);
        Ok(self.find_all(&limited)?.into_iter().next())
    }

    fn find_all(&self, criteria: &PostCriteria) -> Result<Vec<Post>, StoreError> {
        let (where_sql, values) = where_clause(criteria);
        let sql = format!(
            "SELECT {} FROM posts{}{}",
            POST_COLUMNS,
            where_sql,
            tail_clause(criteria)
        );

        let conn = self.conn();
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params_from_iter(values), post_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(rows)
    }

    fn count(&self, criteria: &PostCriteria) -> Result<u64, StoreError> {
        let (where_sql, values) = where_clause(criteria);
        let sql = format!("SELECT COUNT(*) FROM posts{}", where_sql);

        let conn = self.conn();
        let count: i64 = conn.query_row(&sql, params_from_iter(values), |row| row.get(0))?;
        Ok(count as u64)
    }

    fn create(&self, post: &NewPost) -> Result<Post, StoreError> {
        let now = Utc::now();
        let id = {
            let conn = self.conn();
            conn.execute(
                "INSERT INTO posts (type, status, title, slug, md, html, excerpt, cover_image, \
                 cover_image_width, cover_image_height, featured, reading_time, author_id, \
                 created_at, updated_at, published_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)",
                params![
                    post.post_type.as_str(),
                    post.status.as_str(),
                    post.title,
                    post.slug,
                    post.md,
                    post.html,
                    post.excerpt,
                    post.cover_image,
                    post.cover_image_width,
                    post.cover_image_height,
                    post.featured,
                    post.reading_time,
                    post.author_id,
                    now.to_rfc3339(),
                    now.to_rfc3339(),
                    post.published_at.map(|t| t.to_rfc3339()),
                ],
            )
            .map_err(|e| map_constraint(e, "slug"))?;
            conn.last_insert_rowid()
        };

        self.find_one(&PostCriteria::by_id(id))?
            .ok_or(StoreError::NotFound)
    }

    fn update(&self, id: i64, patch: &PostPatch) -> Result<Post, StoreError> {
        let mut sets: Vec<&'static str> = Vec::new();
        let mut values: Vec<Value> = Vec::new();

        if let Some(title) = &patch.title {
            sets.push("title = ?");
            values.push(Value::Text(title.clone()));
        }
        if let Some(slug) = &patch.slug {
            sets.push("slug = ?");
            values.push(Value::Text(slug.clone()));
        }
        if let Some(featured) = patch.featured {
            sets.push("featured = ?");
            values.push(bool_value(featured));
        }
        if let Some(status) = patch.status {
            sets.push("status = ?");
            values.push(Value::Text(status.as_str().to_string()));
        }
        if let Some(published_at) = patch.published_at {
            sets.push("published_at = ?");
            values.push(Value::Text(published_at.to_rfc3339()));
        }
        if let Some(cover_image) = &patch.cover_image {
            sets.push("cover_image = ?");
            values.push(Value::Text(cover_image.clone()));
        }
        if let Some(width) = patch.cover_image_width {
            sets.push("cover_image_width = ?");
            values.push(Value::Integer(i64::from(width)));
        }
        if let Some(height) = patch.cover_image_height {
            sets.push("cover_image_height = ?");
            values.push(Value::Integer(i64::from(height)));
        }
        if let Some(reading_time) = &patch.reading_time {
            sets.push("reading_time = ?");
            values.push(Value::Text(reading_time.clone()));
        }
        if let Some(md) = &patch.md {
            sets.push("md = ?");
            values.push(Value::Text(md.clone()));
        }
        if let Some(md_draft) = &patch.md_draft {
            sets.push("md_draft = ?");
            values.push(match md_draft {
                Some(draft) => Value::Text(draft.clone()),
                None => Value::Null,
            });
        }
        if let Some(html) = &patch.html {
            sets.push("html = ?");
            values.push(Value::Text(html.clone()));
        }
        if let Some(excerpt) = &patch.excerpt {
            sets.push("excerpt = ?");
            values.push(Value::Text(excerpt.clone()));
        }

        sets.push("updated_at = ?");
        values.push(Value::Text(Utc::now().to_rfc3339()));
        values.push(Value::Integer(id));

        let sql = format!("UPDATE posts SET {} WHERE id = ?", sets.join(", "));
        let changed = {
            let conn = self.conn();
            conn.execute(&sql, params_from_iter(values))
                .map_err(|e| map_constraint(e, "slug"))?
        };
        if changed == 0 {
            return Err(StoreError::NotFound);
        }

        self.find_one(&PostCriteria::by_id(id))?
            .ok_or(StoreError::NotFound)
    }

    fn delete(&self, id: i64) -> Result<(), StoreError> {
        let conn = self.conn();
        let changed = conn.execute("DELETE FROM posts WHERE id = ?1", params![id])?;
        conn.execute("DELETE FROM post_taxonomies WHERE post_id = ?1", params![id])?;
        if changed == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    fn taxonomies_for_post(&self, post_id: i64) -> Result<Vec<Taxonomy>, StoreError> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT t.id, t.kind, t.name, t.slug, t.description,
                    (SELECT COUNT(*) FROM post_taxonomies p2 WHERE p2.taxonomy_id = t.id)
             FROM taxonomies t
             JOIN post_taxonomies pt ON pt.taxonomy_id = t.id
             WHERE pt.post_id = ?1
             ORDER BY t.id",
        )?;

        let rows = stmt
            .query_map(params![post_id], taxonomy_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    fn find_taxonomy(
        &self,
        kind: TaxonomyKind,
        name: &str,
    ) -> Result<Option<Taxonomy>, StoreError> {
        let conn = self.conn();
        let row = conn
            .query_row(
                "SELECT t.id, t.kind, t.name, t.slug, t.description,
                        (SELECT COUNT(*) FROM post_taxonomies p2 WHERE p2.taxonomy_id = t.id)
                 FROM taxonomies t WHERE t.kind = ?1 AND t.name = ?2",
                params![kind.as_str(), name],
                taxonomy_from_row,
            )
            .optional()?;
        Ok(row)
    }

    fn create_taxonomy(&self, input: &TaxonomyInput) -> Result<Taxonomy, StoreError> {
        let conn = self.conn();
        conn.execute(
            "INSERT INTO taxonomies (kind, name, slug) VALUES (?1, ?2, ?3)",
            params![input.kind.as_str(), input.name, input.resolved_slug()],
        )
        .map_err(|e| map_constraint(e, "name"))?;

        Ok(Taxonomy {
            id: conn.last_insert_rowid(),
            kind: input.kind,
            name: input.name.clone(),
            slug: input.resolved_slug(),
            description: String::new(),
            post_count: 0,
        })
    }

    fn attach_taxonomy(&self, post_id: i64, taxonomy_id: i64) -> Result<(), StoreError> {
        let conn = self.conn();
        conn.execute(
            "INSERT OR IGNORE INTO post_taxonomies (post_id, taxonomy_id) VALUES (?1, ?2)",
            params![post_id, taxonomy_id],
        )?;
        Ok(())
    }

    fn detach_taxonomy(&self, post_id: i64, taxonomy_id: i64) -> Result<(), StoreError> {
        let conn = self.conn();
        conn.execute(
            "DELETE FROM post_taxonomies WHERE post_id = ?1 AND taxonomy_id = ?2",
            params![post_id, taxonomy_id],
        )?;
        Ok(())
    }

    fn menu(&self) -> Result<Menu, StoreError> {
        let conn = self.conn();
        let raw: Option<String> = conn
            .query_row(
                "SELECT value FROM settings WHERE key = 'menu'",
                [],
                |row| row.get(0),
            )
            .optional()?;

        match raw {
            Some(json) => Ok(serde_json::from_str(&json)?),
            None => Ok(Menu::default()),
        }
    }

    fn save_menu(&self, menu: &Menu) -> Result<(), StoreError> {
        let json = serde_json::to_string(menu)?;
        let conn = self.conn();
        conn.execute(
            "INSERT OR REPLACE INTO settings (key, value) VALUES ('menu', ?1)",
            params![json],
        )?;
        Ok(())
    }

    fn author(&self, id: i64) -> Result<Option<Author>, StoreError> {
        let conn = self.conn();
        let row = conn
            .query_row(
                "SELECT id, name, avatar, role FROM authors WHERE id = ?1",
                params![id],
                |row| {
                    let role: String = row.get(3)?;
                    Ok(Author {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        avatar: row.get(2)?,
                        role: match role.as_str() {
                            "admin" => Role::Admin,
                            "author" => Role::Author,
                            _ => Role::Reader,
                        },
                    })
                },
            )
            .optional()?;
        Ok(row)
    }

    fn create_author(&self, name: &str, role: Role) -> Result<Author, StoreError> {
        let conn = self.conn();
        conn.execute(
            "INSERT INTO authors (name, role) VALUES (?1, ?2)",
            params![name, role.as_str()],
        )?;

        Ok(Author {
            id: conn.last_insert_rowid(),
            name: name.to_string(),
            avatar: String::new(),
            role,
        })
    }

    fn status_counts(&self, post_type: PostType) -> Result<StatusCounts, StoreError> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT status, COUNT(*) FROM posts WHERE type = ?1 GROUP BY status",
        )?;

        let mut counts = StatusCounts::default();
        let rows = stmt.query_map(params![post_type.as_str()], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
        })?;

        for row in rows {
            let (status, count) = row?;
            match status.as_str() {
                "draft" => counts.draft = count as u64,
                "publish" => counts.publish = count as u64,
                "trash" => counts.trash = count as u64,
                _ => {}
            }
        }

        Ok(counts)
    }
}
