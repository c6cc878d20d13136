//! Connection descriptor (§3: "Identified by a globally unique name; carries
//! a dialect tag ... either a prebuilt connection string or host/port/...
//! components, pool limits, connect and query timeouts, dialect-specific
//! options, and three behavior flags").

use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dialect {
    Postgres,
    Sqlite,
    Mysql,
    Document,
}

impl Dialect {
    pub fn is_sql(self) -> bool {
        !matches!(self, Dialect::Document)
    }

    pub fn label(self) -> &'static str {
        match self {
            Dialect::Postgres => "postgres",
            Dialect::Sqlite => "sqlite",
            Dialect::Mysql => "mysql",
            Dialect::Document => "document",
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct PoolLimits {
    pub max_open: Option<u32>,
    pub max_idle: Option<u32>,
    pub max_lifetime: Option<Duration>,
    pub max_idle_time: Option<Duration>,
}

#[derive(Debug, Clone, Default)]
pub struct ConnectionOptions {
    pub tls_mode: Option<String>,
    pub default_schema: Option<String>,
    pub auth_source: Option<String>,
    pub replica_set: Option<String>,
    pub read_preference: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct BehaviorFlags {
    pub metrics_on: bool,
    pub tracing_on: bool,
    pub logging_on: bool,
}

/// Either a prebuilt connection string, host/port/user/password/database
/// components, or a filesystem path (embedded dialect).
#[derive(Debug, Clone)]
pub enum Target {
    Dsn(String),
    Components { host: String, port: u16, user: String, password: String, database: String },
    FilePath(String),
}

#[derive(Debug, Clone)]
pub struct ConnectionDescriptor {
    pub name: String,
    pub dialect: Dialect,
    pub target: Target,
    pub pool_limits: PoolLimits,
    pub connect_timeout: Option<Duration>,
    pub query_timeout: Option<Duration>,
    pub options: ConnectionOptions,
    pub flags: BehaviorFlags,
}

#[derive(Debug, thiserror::Error)]
pub enum DescriptorError {
    #[error("connection '{0}' must carry a DSN or host+database for network dialects")]
    MissingTarget(String),
    #[error("connection '{0}' (embedded dialect) must carry a filesystem path")]
    MissingPath(String),
}

impl ConnectionDescriptor {
    /// Invariant (§3): exactly one of DSN-present or (host+database)-present
    /// for network dialects; filesystem-path present for the embedded
    /// dialect.
    pub fn validate(&self) -> Result<(), DescriptorError> {
        match (&self.dialect, &self.target) {
            (Dialect::Sqlite, Target::FilePath(_)) => Ok(()),
            (Dialect::Sqlite, _) => Err(DescriptorError::MissingPath(self.name.clone())),
            (_, Target::Dsn(_)) | (_, Target::Components { .. }) => Ok(()),
            (_, Target::FilePath(_)) => Err(DescriptorError::MissingTarget(self.name.clone())),
        }
    }

    pub fn max_open(&self) -> u32 {
        self.pool_limits.max_open.unwrap_or(match self.dialect {
            Dialect::Sqlite => 1,
            _ => 16,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sqlite_without_path_is_rejected() {
        let d = ConnectionDescriptor {
            name: "embedded".into(),
            dialect: Dialect::Sqlite,
            target: Target::Dsn("postgres://".into()),
            pool_limits: PoolLimits::default(),
            connect_timeout: None,
            query_timeout: None,
            options: ConnectionOptions::default(),
            flags: BehaviorFlags::default(),
        };
        assert!(d.validate().is_err());
    }

    #[test]
    fn sqlite_defaults_to_max_open_one() {
        let d = ConnectionDescriptor {
            name: "embedded".into(),
            dialect: Dialect::Sqlite,
            target: Target::FilePath("/tmp/db.sqlite".into()),
            pool_limits: PoolLimits::default(),
            connect_timeout: None,
            query_timeout: None,
            options: ConnectionOptions::default(),
            flags: BehaviorFlags::default(),
        };
        assert_eq!(d.max_open(), 1);
    }

    #[test]
    fn explicit_pool_limit_overrides_dialect_default() {
        let mut d = ConnectionDescriptor {
            name: "embedded".into(),
            dialect: Dialect::Sqlite,
            target: Target::FilePath("/tmp/db.sqlite".into()),
            pool_limits: PoolLimits::default(),
            connect_timeout: None,
            query_timeout: None,
            options: ConnectionOptions::default(),
            flags: BehaviorFlags::default(),
        };
        d.pool_limits.max_open = Some(4);
        assert_eq!(d.max_open(), 4);
    }
}
