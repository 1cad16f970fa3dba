//! SQL Server driver built on tiberius.

use crate::db::connection::{ConnectionSettings, Connector, SqlConnection};
use crate::db::params::SqlParam;
use crate::db::types::{Row, row_to_json};
use crate::error::{DbError, DbResult, ErrorKind};
use async_trait::async_trait;
use futures_util::{StreamExt, TryStreamExt};
use std::borrow::Cow;
use tiberius::{AuthMethod, Client, ColumnData, Config, EncryptionLevel, ToSql};
use tokio::net::TcpStream;
use tokio_util::compat::{Compat, TokioAsyncWriteCompatExt};
use tracing::{debug, info, warn};

const APPLICATION_NAME: &str = "mssql-mcp-server";

impl ToSql for SqlParam {
    fn to_sql(&self) -> ColumnData<'_> {
        match self {
            SqlParam::Null => ColumnData::String(None),
            SqlParam::Bool(b) => ColumnData::Bit(Some(*b)),
            SqlParam::Int(i) => ColumnData::I64(Some(*i)),
            SqlParam::Float(f) => ColumnData::F64(Some(*f)),
            SqlParam::String(s) => ColumnData::String(Some(Cow::Borrowed(s.as_str()))),
        }
    }
}

/// Opens tiberius connections over TCP.
#[derive(Debug, Default, Clone, Copy)]
pub struct MssqlConnector;

impl MssqlConnector {
    pub fn new() -> Self {
        Self
    }

    fn build_config(settings: &ConnectionSettings) -> Config {
        let mut config = Config::new();
        config.host(&settings.host);
        config.port(settings.port);
        config.database(&settings.database);
        config.application_name(APPLICATION_NAME);
        config.authentication(AuthMethod::sql_server(&settings.user, &settings.password));
        config.encryption(if settings.encrypt {
            EncryptionLevel::Required
        } else {
            EncryptionLevel::Off
        });
        if settings.trust_server_certificate {
            config.trust_cert();
        }
        config
    }

    async fn open(config: Config) -> tiberius::Result<Client<Compat<TcpStream>>> {
        let tcp = TcpStream::connect(config.get_addr()).await?;
        tcp.set_nodelay(true)?;
        Client::connect(config, tcp.compat_write()).await
    }
}

#[async_trait]
impl Connector for MssqlConnector {
    async fn connect(&self, settings: &ConnectionSettings) -> DbResult<Box<dyn SqlConnection>> {
        let mut config = Self::build_config(settings);

        debug!(target = %settings.target(), encrypt = settings.encrypt, "Opening SQL Server connection");

        let client = match Self::open(config.clone()).await {
            Ok(client) => client,
            // Azure SQL gateways answer the first login with a redirect.
            Err(tiberius::error::Error::Routing { host, port }) => {
                info!(host = %host, port = port, "Following SQL Server routing redirect");
                config.host(&host);
                config.port(port);
                Self::open(config).await?
            }
            Err(e) => return Err(e.into()),
        };

        Ok(Box::new(MssqlConnection {
            client,
            connected: true,
        }))
    }
}

/// A single tiberius client.
pub struct MssqlConnection {
    client: Client<Compat<TcpStream>>,
    connected: bool,
}

impl MssqlConnection {
    /// Record transport failures so the manager replaces this handle.
    fn track<T>(&mut self, result: DbResult<T>) -> DbResult<T> {
        if let Err(e) = &result {
            if e.kind() == ErrorKind::Connection {
                warn!(error = %e, "SQL Server connection lost");
                self.connected = false;
            }
        }
        result
    }
}

fn bind(params: &[SqlParam]) -> Vec<&dyn ToSql> {
    params.iter().map(|p| p as &dyn ToSql).collect()
}

#[async_trait]
impl SqlConnection for MssqlConnection {
    fn is_connected(&self) -> bool {
        self.connected
    }

    async fn query(&mut self, sql: &str, params: &[SqlParam]) -> DbResult<Vec<Row>> {
        let bound = bind(params);
        let result = async {
            let stream = self.client.query(sql, &bound).await?;
            let rows = stream.into_first_result().await?;
            Ok::<_, DbError>(rows.into_iter().map(row_to_json).collect())
        }
        .await;
        self.track(result)
    }

    async fn query_limited(
        &mut self,
        sql: &str,
        params: &[SqlParam],
        limit: usize,
    ) -> DbResult<Vec<Row>> {
        let bound = bind(params);
        let result = async {
            let stream = self.client.query(sql, &bound).await?;
            let rows: Vec<tiberius::Row> =
                stream.into_row_stream().take(limit).try_collect().await?;
            Ok::<_, DbError>(rows.into_iter().map(row_to_json).collect())
        }
        .await;
        self.track(result)
    }

    async fn execute(&mut self, sql: &str, params: &[SqlParam]) -> DbResult<u64> {
        let bound = bind(params);
        let result = async {
            let outcome = self.client.execute(sql, &bound).await?;
            Ok::<_, DbError>(outcome.rows_affected().iter().sum())
        }
        .await;
        self.track(result)
    }

    async fn close(self: Box<Self>) -> DbResult<()> {
        self.client.close().await?;
        Ok(())
    }
}
