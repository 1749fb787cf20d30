//! SQLite 저장소
//!
//! `sqlx` SQLite 드라이버로 계정, 접속 이력, 활성 세션, 연락처,
//! 메시지 통계를 파일에 저장합니다.
//!
//! # 테이블
//!
//! - `all_users` - 계정 (로그인, 비밀번호, 마지막 접속)
//! - `login_history` - 접속 이력
//! - `active_users` - 활성 세션 (저장소를 열 때 비움)
//! - `users_contacts` - 단방향 연락처 관계
//! - `actions_history` - 보낸/받은 메시지 수

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::Row;
use std::str::FromStr;
use tracing::{debug, info};

use super::{
    Account, ActiveSession, LoginRecord, MessengerStore, StoreError, StoreResult, UsageStats,
};

const SCHEMA: [&str; 5] = [
    "CREATE TABLE IF NOT EXISTS all_users (
        user_id INTEGER PRIMARY KEY AUTOINCREMENT,
        login TEXT NOT NULL UNIQUE,
        password TEXT NOT NULL,
        last_login TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS login_history (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        user_id INTEGER NOT NULL REFERENCES all_users(user_id),
        login_time TEXT NOT NULL,
        ip TEXT NOT NULL,
        port INTEGER NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS active_users (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        user_id INTEGER NOT NULL UNIQUE REFERENCES all_users(user_id),
        login_time TEXT NOT NULL,
        ip TEXT NOT NULL,
        port INTEGER NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS users_contacts (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        user INTEGER NOT NULL REFERENCES all_users(user_id),
        contact INTEGER NOT NULL REFERENCES all_users(user_id),
        UNIQUE(user, contact)
    )",
    "CREATE TABLE IF NOT EXISTS actions_history (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        user INTEGER NOT NULL UNIQUE REFERENCES all_users(user_id),
        sent INTEGER NOT NULL DEFAULT 0,
        accepted INTEGER NOT NULL DEFAULT 0
    )",
];

/// SQLite 저장소
#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// URL로 저장소를 열고 스키마를 준비합니다.
    ///
    /// 파일이 없으면 생성하며, 이전 프로세스가 남긴 활성 세션은 지웁니다.
    /// 연결은 하나만 사용하므로 `sqlite::memory:`도 같은 데이터베이스를 봅니다.
    pub async fn connect(url: &str) -> StoreResult<Self> {
        let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;

        let store = Self { pool };
        store.prepare_schema().await?;
        info!("SQLite 저장소 연결 완료: {}", url);
        Ok(store)
    }

    async fn prepare_schema(&self) -> StoreResult<()> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(&self.pool).await?;
        }

        let cleared = sqlx::query("DELETE FROM active_users")
            .execute(&self.pool)
            .await?
            .rows_affected();
        if cleared > 0 {
            debug!("이전 활성 세션 {}개 정리", cleared);
        }
        Ok(())
    }

    async fn user_id(&self, login: &str) -> StoreResult<Option<i64>> {
        let id = sqlx::query_scalar::<_, i64>("SELECT user_id FROM all_users WHERE login = ?")
            .bind(login)
            .fetch_optional(&self.pool)
            .await?;
        Ok(id)
    }
}

fn port_from_row(row: &SqliteRow) -> Result<u16, sqlx::Error> {
    let port: i64 = row.try_get("port")?;
    Ok(u16::try_from(port).unwrap_or_default())
}

fn login_record_from_row(row: &SqliteRow) -> Result<LoginRecord, sqlx::Error> {
    Ok(LoginRecord {
        login: row.try_get("login")?,
        ip: row.try_get("ip")?,
        port: port_from_row(row)?,
        login_time: row.try_get("login_time")?,
    })
}

#[async_trait]
impl MessengerStore for SqliteStore {
    async fn login(&self, name: &str, password: &str, ip: &str, port: u16) -> StoreResult<()> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        let existing: Option<(i64, String)> =
            sqlx::query_as("SELECT user_id, password FROM all_users WHERE login = ?")
                .bind(name)
                .fetch_optional(&mut *tx)
                .await?;

        let user_id = match existing {
            Some((user_id, stored)) => {
                if stored != password {
                    return Err(StoreError::InvalidPassword {
                        login: name.to_string(),
                    });
                }
                sqlx::query("UPDATE all_users SET last_login = ? WHERE user_id = ?")
                    .bind(now)
                    .bind(user_id)
                    .execute(&mut *tx)
                    .await?;
                user_id
            }
            None => {
                let user_id = sqlx::query(
                    "INSERT INTO all_users (login, password, last_login) VALUES (?, ?, ?)",
                )
                .bind(name)
                .bind(password)
                .bind(now)
                .execute(&mut *tx)
                .await?
                .last_insert_rowid();

                sqlx::query("INSERT INTO actions_history (user, sent, accepted) VALUES (?, 0, 0)")
                    .bind(user_id)
                    .execute(&mut *tx)
                    .await?;
                debug!("새 계정 생성: {} (id={})", name, user_id);
                user_id
            }
        };

        sqlx::query(
            "INSERT OR IGNORE INTO active_users (user_id, login_time, ip, port) VALUES (?, ?, ?, ?)",
        )
        .bind(user_id)
        .bind(now)
        .bind(ip)
        .bind(i64::from(port))
        .execute(&mut *tx)
        .await?;

        sqlx::query("INSERT INTO login_history (user_id, login_time, ip, port) VALUES (?, ?, ?, ?)")
            .bind(user_id)
            .bind(now)
            .bind(ip)
            .bind(i64::from(port))
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn logout(&self, name: &str) -> StoreResult<()> {
        sqlx::query(
            "DELETE FROM active_users WHERE user_id = (SELECT user_id FROM all_users WHERE login = ?)",
        )
        .bind(name)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn contacts(&self, name: &str) -> StoreResult<Vec<String>> {
        let contacts = sqlx::query_scalar::<_, String>(
            "SELECT c.login FROM users_contacts uc
             JOIN all_users o ON o.user_id = uc.user
             JOIN all_users c ON c.user_id = uc.contact
             WHERE o.login = ?
             ORDER BY uc.id",
        )
        .bind(name)
        .fetch_all(&self.pool)
        .await?;
        Ok(contacts)
    }

    async fn add_contact(&self, owner: &str, contact: &str) -> StoreResult<()> {
        sqlx::query(
            "INSERT OR IGNORE INTO users_contacts (user, contact)
             SELECT o.user_id, c.user_id FROM all_users o, all_users c
             WHERE o.login = ? AND c.login = ?",
        )
        .bind(owner)
        .bind(contact)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn del_contact(&self, owner: &str, contact: &str) -> StoreResult<()> {
        sqlx::query(
            "DELETE FROM users_contacts
             WHERE user = (SELECT user_id FROM all_users WHERE login = ?)
               AND contact = (SELECT user_id FROM all_users WHERE login = ?)",
        )
        .bind(owner)
        .bind(contact)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn record_message(&self, from: &str, to: &str) -> StoreResult<()> {
        let (Some(sender), Some(recipient)) = (self.user_id(from).await?, self.user_id(to).await?)
        else {
            return Ok(());
        };

        let mut tx = self.pool.begin().await?;
        sqlx::query("UPDATE actions_history SET sent = sent + 1 WHERE user = ?")
            .bind(sender)
            .execute(&mut *tx)
            .await?;
        sqlx::query("UPDATE actions_history SET accepted = accepted + 1 WHERE user = ?")
            .bind(recipient)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(())
    }

    async fn active_sessions(&self) -> StoreResult<Vec<ActiveSession>> {
        let rows = sqlx::query(
            "SELECT u.login, a.ip, a.port, a.login_time FROM active_users a
             JOIN all_users u ON u.user_id = a.user_id
             ORDER BY u.login",
        )
        .fetch_all(&self.pool)
        .await?;

        let sessions = rows
            .iter()
            .map(|row| {
                login_record_from_row(row).map(|r| ActiveSession {
                    login: r.login,
                    ip: r.ip,
                    port: r.port,
                    login_time: r.login_time,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(sessions)
    }

    async fn all_accounts(&self) -> StoreResult<Vec<Account>> {
        let rows: Vec<(String, DateTime<Utc>)> =
            sqlx::query_as("SELECT login, last_login FROM all_users ORDER BY login")
                .fetch_all(&self.pool)
                .await?;

        Ok(rows
            .into_iter()
            .map(|(login, last_login)| Account { login, last_login })
            .collect())
    }

    async fn usage_stats(&self) -> StoreResult<Vec<UsageStats>> {
        let rows: Vec<(String, DateTime<Utc>, i64, i64)> = sqlx::query_as(
            "SELECT u.login, u.last_login, h.sent, h.accepted FROM all_users u
             JOIN actions_history h ON h.user = u.user_id
             ORDER BY u.login",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(login, last_login, sent, received)| UsageStats {
                login,
                last_login,
                sent: sent.max(0) as u64,
                received: received.max(0) as u64,
            })
            .collect())
    }

    async fn login_history(&self, name: Option<&str>) -> StoreResult<Vec<LoginRecord>> {
        const BASE: &str = "SELECT u.login, h.ip, h.port, h.login_time FROM login_history h
             JOIN all_users u ON u.user_id = h.user_id";

        let rows = match name {
            Some(login) => {
                sqlx::query(&format!("{BASE} WHERE u.login = ? ORDER BY h.id"))
                    .bind(login)
                    .fetch_all(&self.pool)
                    .await?
            }
            None => {
                sqlx::query(&format!("{BASE} ORDER BY h.id"))
                    .fetch_all(&self.pool)
                    .await?
            }
        };

        let records = rows
            .iter()
            .map(login_record_from_row)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(records)
    }
}
