use crate::models::{CommentRow, GroupRow, MediaRow, PostRow, UserRow};
use crate::Database;
use anyhow::Result;
use rusqlite::Connection;

const POST_SELECT: &str = "SELECT p.id, p.author_id, u.username, p.group_id, g.title, g.slug, g.description, p.text, p.image_id, p.created_at
 FROM posts p
 JOIN users u ON p.author_id = u.id
 LEFT JOIN groups g ON p.group_id = g.id";

const POST_ORDER: &str = "ORDER BY p.created_at DESC, p.id DESC";

impl Database {
    // -- Users --

    /// Insert a user. Returns false when the username is already taken,
    /// even under two concurrent registrations: the UNIQUE index on
    /// username decides, not a prior read.
    pub fn create_user(&self, id: &str, username: &str, password_hash: &str) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let inserted = conn.execute(
                "INSERT OR IGNORE INTO users (id, username, password) VALUES (?1, ?2, ?3)",
                (id, username, password_hash),
            )?;
            Ok(inserted > 0)
        })
    }

    pub fn get_user_by_username(&self, username: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user_by_username(conn, username))
    }

    pub fn get_user_by_id(&self, id: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user_by_id(conn, id))
    }

    // -- Groups --

    pub fn create_group(&self, title: &str, slug: &str, description: Option<&str>) -> Result<i64> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO groups (title, slug, description) VALUES (?1, ?2, ?3)",
                rusqlite::params![title, slug, description],
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    pub fn get_group_by_slug(&self, slug: &str) -> Result<Option<GroupRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn
                .prepare("SELECT id, title, slug, description FROM groups WHERE slug = ?1")?;
            let row = stmt.query_row([slug], map_group_row).optional()?;
            Ok(row)
        })
    }

    pub fn get_group_by_id(&self, id: i64) -> Result<Option<GroupRow>> {
        self.with_conn(|conn| {
            let mut stmt =
                conn.prepare("SELECT id, title, slug, description FROM groups WHERE id = ?1")?;
            let row = stmt.query_row([id], map_group_row).optional()?;
            Ok(row)
        })
    }

    pub fn list_groups(&self) -> Result<Vec<GroupRow>> {
        self.with_conn(|conn| {
            let mut stmt =
                conn.prepare("SELECT id, title, slug, description FROM groups ORDER BY title ASC")?;
            let rows = stmt
                .query_map([], map_group_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    // -- Posts --

    pub fn insert_post(
        &self,
        author_id: &str,
        text: &str,
        group_id: Option<i64>,
        image_id: Option<&str>,
    ) -> Result<i64> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO posts (author_id, group_id, text, image_id) VALUES (?1, ?2, ?3, ?4)",
                rusqlite::params![author_id, group_id, text, image_id],
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    /// Rewrites the mutable fields of a post. `created_at` is set once at
    /// insert and never touched again.
    pub fn update_post(
        &self,
        post_id: i64,
        text: &str,
        group_id: Option<i64>,
        image_id: Option<&str>,
    ) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "UPDATE posts SET text = ?1, group_id = ?2, image_id = ?3 WHERE id = ?4",
                rusqlite::params![text, group_id, image_id, post_id],
            )?;
            Ok(())
        })
    }

    /// Comments go with the post via ON DELETE CASCADE.
    pub fn delete_post(&self, post_id: i64) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute("DELETE FROM posts WHERE id = ?1", [post_id])?;
            Ok(())
        })
    }

    pub fn get_post(&self, post_id: i64) -> Result<Option<PostRow>> {
        self.with_conn(|conn| {
            let sql = format!("{POST_SELECT} WHERE p.id = ?1");
            let mut stmt = conn.prepare(&sql)?;
            let row = stmt.query_row([post_id], map_post_row).optional()?;
            Ok(row)
        })
    }

    pub fn count_posts(&self) -> Result<u64> {
        self.with_conn(|conn| count(conn, "SELECT COUNT(*) FROM posts", []))
    }

    pub fn list_posts(&self, limit: u32, offset: u64) -> Result<Vec<PostRow>> {
        self.with_conn(|conn| {
            let sql = format!("{POST_SELECT} {POST_ORDER} LIMIT ?1 OFFSET ?2");
            collect_posts(conn, &sql, rusqlite::params![limit, offset as i64])
        })
    }

    pub fn count_posts_by_group(&self, group_id: i64) -> Result<u64> {
        self.with_conn(|conn| {
            count(conn, "SELECT COUNT(*) FROM posts WHERE group_id = ?1", [group_id])
        })
    }

    pub fn list_posts_by_group(&self, group_id: i64, limit: u32, offset: u64) -> Result<Vec<PostRow>> {
        self.with_conn(|conn| {
            let sql = format!("{POST_SELECT} WHERE p.group_id = ?1 {POST_ORDER} LIMIT ?2 OFFSET ?3");
            collect_posts(conn, &sql, rusqlite::params![group_id, limit, offset as i64])
        })
    }

    pub fn count_posts_by_author(&self, author_id: &str) -> Result<u64> {
        self.with_conn(|conn| {
            count(conn, "SELECT COUNT(*) FROM posts WHERE author_id = ?1", [author_id])
        })
    }

    pub fn list_posts_by_author(&self, author_id: &str, limit: u32, offset: u64) -> Result<Vec<PostRow>> {
        self.with_conn(|conn| {
            let sql = format!("{POST_SELECT} WHERE p.author_id = ?1 {POST_ORDER} LIMIT ?2 OFFSET ?3");
            collect_posts(conn, &sql, rusqlite::params![author_id, limit, offset as i64])
        })
    }

    pub fn count_posts_by_followed(&self, follower_id: &str) -> Result<u64> {
        self.with_conn(|conn| {
            count(
                conn,
                "SELECT COUNT(*) FROM posts WHERE author_id IN
                 (SELECT author_id FROM follows WHERE follower_id = ?1)",
                [follower_id],
            )
        })
    }

    pub fn list_posts_by_followed(
        &self,
        follower_id: &str,
        limit: u32,
        offset: u64,
    ) -> Result<Vec<PostRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "{POST_SELECT} WHERE p.author_id IN
                 (SELECT author_id FROM follows WHERE follower_id = ?1)
                 {POST_ORDER} LIMIT ?2 OFFSET ?3"
            );
            collect_posts(conn, &sql, rusqlite::params![follower_id, limit, offset as i64])
        })
    }

    // -- Comments --

    pub fn insert_comment(&self, post_id: i64, author_id: &str, text: &str) -> Result<i64> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO comments (post_id, author_id, text) VALUES (?1, ?2, ?3)",
                rusqlite::params![post_id, author_id, text],
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    /// Oldest-first, so a thread reads like a conversation. This is the
    /// one listing that does not use feed ordering.
    pub fn list_comments(&self, post_id: i64) -> Result<Vec<CommentRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT c.id, c.post_id, c.author_id, u.username, c.text, c.created_at
                 FROM comments c
                 JOIN users u ON c.author_id = u.id
                 WHERE c.post_id = ?1
                 ORDER BY c.created_at ASC, c.id ASC",
            )?;
            let rows = stmt
                .query_map([post_id], |row| {
                    Ok(CommentRow {
                        id: row.get(0)?,
                        post_id: row.get(1)?,
                        author_id: row.get(2)?,
                        author_username: row.get(3)?,
                        text: row.get(4)?,
                        created_at: row.get(5)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    // -- Follows --

    /// Create a follow edge. Returns true when a new edge was written.
    /// Self-follows and existing edges are absorbed as no-ops; a racing
    /// duplicate insert loses to the unique (follower, author) index.
    pub fn follow(&self, follower_id: &str, author_id: &str) -> Result<bool> {
        if follower_id == author_id {
            return Ok(false);
        }
        self.with_conn_mut(|conn| {
            let inserted = conn.execute(
                "INSERT OR IGNORE INTO follows (follower_id, author_id) VALUES (?1, ?2)",
                (follower_id, author_id),
            )?;
            Ok(inserted > 0)
        })
    }

    /// Remove a follow edge. Deleting a missing edge is a no-op.
    pub fn unfollow(&self, follower_id: &str, author_id: &str) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let deleted = conn.execute(
                "DELETE FROM follows WHERE follower_id = ?1 AND author_id = ?2",
                (follower_id, author_id),
            )?;
            Ok(deleted > 0)
        })
    }

    pub fn is_following(&self, follower_id: &str, author_id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let n: i64 = conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM follows WHERE follower_id = ?1 AND author_id = ?2)",
                (follower_id, author_id),
                |row| row.get(0),
            )?;
            Ok(n != 0)
        })
    }

    // -- Media --

    pub fn insert_media(&self, id: &str, owner_id: &str, content_type: &str, size: i64) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO media (id, owner_id, content_type, size) VALUES (?1, ?2, ?3, ?4)",
                rusqlite::params![id, owner_id, content_type, size],
            )?;
            Ok(())
        })
    }

    pub fn get_media(&self, id: &str) -> Result<Option<MediaRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, owner_id, content_type, size, created_at FROM media WHERE id = ?1",
            )?;
            let row = stmt
                .query_row([id], |row| {
                    Ok(MediaRow {
                        id: row.get(0)?,
                        owner_id: row.get(1)?,
                        content_type: row.get(2)?,
                        size: row.get(3)?,
                        created_at: row.get(4)?,
                    })
                })
                .optional()?;
            Ok(row)
        })
    }
}

fn query_user_by_username(conn: &Connection, username: &str) -> Result<Option<UserRow>> {
    let mut stmt =
        conn.prepare("SELECT id, username, password, created_at FROM users WHERE username = ?1")?;

    let row = stmt
        .query_row([username], |row| {
            Ok(UserRow {
                id: row.get(0)?,
                username: row.get(1)?,
                password: row.get(2)?,
                created_at: row.get(3)?,
            })
        })
        .optional()?;

    Ok(row)
}

fn query_user_by_id(conn: &Connection, id: &str) -> Result<Option<UserRow>> {
    let mut stmt =
        conn.prepare("SELECT id, username, password, created_at FROM users WHERE id = ?1")?;

    let row = stmt
        .query_row([id], |row| {
            Ok(UserRow {
                id: row.get(0)?,
                username: row.get(1)?,
                password: row.get(2)?,
                created_at: row.get(3)?,
            })
        })
        .optional()?;

    Ok(row)
}

fn map_group_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<GroupRow> {
    Ok(GroupRow {
        id: row.get(0)?,
        title: row.get(1)?,
        slug: row.get(2)?,
        description: row.get(3)?,
    })
}

fn map_post_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<PostRow> {
    Ok(PostRow {
        id: row.get(0)?,
        author_id: row.get(1)?,
        author_username: row.get(2)?,
        group_id: row.get(3)?,
        group_title: row.get(4)?,
        group_slug: row.get(5)?,
        group_description: row.get(6)?,
        text: row.get(7)?,
        image_id: row.get(8)?,
        created_at: row.get(9)?,
    })
}

fn collect_posts<P: rusqlite::Params>(conn: &Connection, sql: &str, params: P) -> Result<Vec<PostRow>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map(params, map_post_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

fn count<P: rusqlite::Params>(conn: &Connection, sql: &str, params: P) -> Result<u64> {
    let n: i64 = conn.query_row(sql, params, |row| row.get(0))?;
    Ok(n as u64)
}

/// Extension trait for optional query results
trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn db() -> Database {
        Database::open_in_memory().unwrap()
    }

    fn add_user(db: &Database, username: &str) -> String {
        let id = Uuid::new_v4().to_string();
        db.create_user(&id, username, "hash").unwrap();
        id
    }

    fn edge_count(db: &Database) -> i64 {
        db.with_conn(|conn| {
            let n = conn.query_row("SELECT COUNT(*) FROM follows", [], |row| row.get(0))?;
            Ok(n)
        })
        .unwrap()
    }

    #[test]
    fn second_user_with_same_username_is_not_inserted() {
        let db = db();
        assert!(db.create_user("id-1", "nikita", "hash-1").unwrap());
        assert!(!db.create_user("id-2", "nikita", "hash-2").unwrap());

        let user = db.get_user_by_username("nikita").unwrap().unwrap();
        assert_eq!(user.id, "id-1");
    }

    #[test]
    fn follow_twice_leaves_one_edge() {
        let db = db();
        let a = add_user(&db, "a");
        let b = add_user(&db, "b");

        assert!(db.follow(&a, &b).unwrap());
        assert!(!db.follow(&a, &b).unwrap());
        assert_eq!(edge_count(&db), 1);
        assert!(db.is_following(&a, &b).unwrap());
        assert!(!db.is_following(&b, &a).unwrap());
    }

    #[test]
    fn unfollow_twice_leaves_zero_edges() {
        let db = db();
        let a = add_user(&db, "a");
        let b = add_user(&db, "b");

        db.follow(&a, &b).unwrap();
        assert!(db.unfollow(&a, &b).unwrap());
        assert!(!db.unfollow(&a, &b).unwrap());
        assert_eq!(edge_count(&db), 0);
    }

    #[test]
    fn self_follow_never_creates_edge() {
        let db = db();
        let a = add_user(&db, "a");

        assert!(!db.follow(&a, &a).unwrap());
        assert_eq!(edge_count(&db), 0);
        assert!(!db.is_following(&a, &a).unwrap());
    }

    #[test]
    fn follow_feed_is_union_of_followed_authors() {
        let db = db();
        let viewer = add_user(&db, "viewer");
        let b = add_user(&db, "b");
        let c = add_user(&db, "c");
        let stranger = add_user(&db, "stranger");

        db.insert_post(&b, "from b", None, None).unwrap();
        db.insert_post(&c, "from c", None, None).unwrap();
        db.insert_post(&stranger, "from stranger", None, None).unwrap();

        db.follow(&viewer, &b).unwrap();
        db.follow(&viewer, &c).unwrap();

        let feed = db.list_posts_by_followed(&viewer, 10, 0).unwrap();
        let texts: Vec<&str> = feed.iter().map(|p| p.text.as_str()).collect();
        assert_eq!(texts, vec!["from c", "from b"]);
        assert_eq!(db.count_posts_by_followed(&viewer).unwrap(), 2);
        assert_eq!(db.count_posts_by_followed(&stranger).unwrap(), 0);
    }

    #[test]
    fn feed_orders_newest_first_with_id_tiebreak() {
        let db = db();
        let a = add_user(&db, "a");

        // Same-second inserts: created_at ties, id decides.
        let first = db.insert_post(&a, "one", None, None).unwrap();
        let second = db.insert_post(&a, "two", None, None).unwrap();
        let third = db.insert_post(&a, "three", None, None).unwrap();

        let feed = db.list_posts(10, 0).unwrap();
        let ids: Vec<i64> = feed.iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![third, second, first]);
    }

    #[test]
    fn deleting_post_removes_comments() {
        let db = db();
        let a = add_user(&db, "a");
        let post_id = db.insert_post(&a, "post", None, None).unwrap();
        db.insert_comment(post_id, &a, "first").unwrap();
        db.insert_comment(post_id, &a, "second").unwrap();

        db.delete_post(post_id).unwrap();

        assert!(db.get_post(post_id).unwrap().is_none());
        assert!(db.list_comments(post_id).unwrap().is_empty());
    }

    #[test]
    fn comments_list_oldest_first() {
        let db = db();
        let a = add_user(&db, "a");
        let post_id = db.insert_post(&a, "post", None, None).unwrap();
        db.insert_comment(post_id, &a, "first").unwrap();
        db.insert_comment(post_id, &a, "second").unwrap();

        let comments = db.list_comments(post_id).unwrap();
        let texts: Vec<&str> = comments.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, vec!["first", "second"]);
    }

    #[test]
    fn group_resolved_by_slug() {
        let db = db();
        let id = db.create_group("Happy", "happy", Some("Good day")).unwrap();

        let group = db.get_group_by_slug("happy").unwrap().unwrap();
        assert_eq!(group.id, id);
        assert_eq!(group.title, "Happy");
        assert!(db.get_group_by_slug("missing").unwrap().is_none());
    }

    #[test]
    fn group_feed_filters_to_group() {
        let db = db();
        let a = add_user(&db, "a");
        let gid = db.create_group("Happy", "happy", None).unwrap();

        db.insert_post(&a, "grouped", Some(gid), None).unwrap();
        db.insert_post(&a, "ungrouped", None, None).unwrap();

        let feed = db.list_posts_by_group(gid, 10, 0).unwrap();
        assert_eq!(feed.len(), 1);
        assert_eq!(feed[0].text, "grouped");
        assert_eq!(feed[0].group_slug.as_deref(), Some("happy"));
        assert_eq!(db.count_posts_by_group(gid).unwrap(), 1);
    }

    #[test]
    fn listing_respects_limit_and_offset() {
        let db = db();
        let a = add_user(&db, "a");
        for i in 0..15 {
            db.insert_post(&a, &format!("post {i}"), None, None).unwrap();
        }

        assert_eq!(db.count_posts().unwrap(), 15);
        assert_eq!(db.list_posts(10, 0).unwrap().len(), 10);
        assert_eq!(db.list_posts(10, 10).unwrap().len(), 5);
        assert_eq!(db.count_posts_by_author(&a).unwrap(), 15);
        assert_eq!(db.list_posts_by_author(&a, 10, 10).unwrap().len(), 5);
    }
}
