use anyhow::Result;
use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;
use url::Url;

/// The two commands the cache workload needs.
#[async_trait]
pub trait KeyValueStore: Send {
    async fn set(&mut self, key: &str, value: &str) -> Result<()>;
    async fn get(&mut self, key: &str) -> Result<Option<String>>;
}

/// Opens store sessions. A session lives for one request.
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    type Store: KeyValueStore;

    async fn connect(&self) -> Result<Self::Store>;
}

/// Redis reached over TCP with the static benchmark password.
pub struct RedisConnector {
    client: redis::Client,
}

impl RedisConnector {
    pub fn new(host: &str, port: u16, password: Option<&str>) -> Result<Self> {
        let client = redis::Client::open(connection_url(host, port, password)?.as_str())?;
        Ok(Self { client })
    }
}

pub fn connection_url(host: &str, port: u16, password: Option<&str>) -> Result<Url> {
    let mut url = Url::parse(&format!("redis://{host}:{port}/"))?;
    if let Some(password) = password.filter(|p| !p.is_empty()) {
        url.set_password(Some(password))
            .map_err(|()| anyhow::anyhow!("cannot set password on {url}"))?;
    }
    Ok(url)
}

#[async_trait]
impl Connector for RedisConnector {
    type Store = RedisStore;

    async fn connect(&self) -> Result<RedisStore> {
        let conn = self.client.get_multiplexed_async_connection().await?;
        Ok(RedisStore { conn })
    }
}

pub struct RedisStore {
    conn: MultiplexedConnection,
}

#[async_trait]
impl KeyValueStore for RedisStore {
    async fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.conn.set::<_, _, ()>(key, value).await?;
        Ok(())
    }

    async fn get(&mut self, key: &str) -> Result<Option<String>> {
        Ok(self.conn.get(key).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_carries_password() {
        let url = connection_url("redis.default", 6379, Some("s3cret")).unwrap();
        assert_eq!(url.as_str(), "redis://:s3cret@redis.default:6379/");
    }

    #[test]
    fn url_without_password() {
        let url = connection_url("localhost", 6380, None).unwrap();
        assert_eq!(url.as_str(), "redis://localhost:6380/");
        let url = connection_url("localhost", 6380, Some("")).unwrap();
        assert_eq!(url.password(), None);
    }

    #[test]
    fn client_accepts_the_url() {
        assert!(RedisConnector::new("localhost", 6379, Some("pw")).is_ok());
    }
}
