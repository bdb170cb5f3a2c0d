use std::fs::File;
use std::net::{SocketAddr, ToSocketAddrs};
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::error::{Error, Result};

/// Proxy configuration.
///
/// Loadable from a YAML file (see [`ServerConfig::with_file`]); the
/// read/write timeouts are programmatic knobs only and default to `None`,
/// which means a stalled peer is waited on indefinitely.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// addresses to listen on
    #[serde(default)]
    pub listen: Vec<String>,
    /// local address to source outbound connections from
    #[serde(default)]
    pub bind: Option<String>,
    #[serde(skip)]
    pub client_rw_timeout: Option<Duration>,
    #[serde(skip)]
    pub server_rw_timeout: Option<Duration>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            listen: vec!["0.0.0.0:1080".to_owned()],
            bind: None,
            client_rw_timeout: None,
            server_rw_timeout: None,
        }
    }
}

impl ServerConfig {
    pub fn new(listen: Vec<String>, bind: Option<String>) -> Self {
        Self {
            listen,
            bind,
            ..Self::default()
        }
    }

    pub fn with_file(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        serde_yaml::from_reader(file)
            .map_err(|err| Error::config(format!("{}: {}", path.display(), err)))
    }

    /// resolve every configured listen address
    pub fn listen_addrs(&self) -> Result<Vec<SocketAddr>> {
        self.listen
            .iter()
            .map(|listen| {
                listen
                    .to_socket_addrs()
                    .map_err(|err| Error::config(format!("listen address {:?}: {}", listen, err)))?
                    .next()
                    .ok_or_else(|| {
                        Error::config(format!("listen address {:?} did not resolve", listen))
                    })
            })
            .collect()
    }

    pub fn set_client_rw_timeout(&mut self, dur: Option<Duration>) -> &mut Self {
        self.client_rw_timeout = dur;
        self
    }

    pub fn set_server_rw_timeout(&mut self, dur: Option<Duration>) -> &mut Self {
        self.server_rw_timeout = dur;
        self
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn parse_yaml() {
        let config: ServerConfig = serde_yaml::from_str(
            r#"
listen:
  - 127.0.0.1:1080
  - "[::1]:1080"
bind: 127.0.0.1
"#,
        )
        .unwrap();
        assert_eq!(config.listen.len(), 2);
        assert_eq!(config.bind.as_deref(), Some("127.0.0.1"));
        assert_eq!(config.client_rw_timeout, None);
    }

    #[test]
    fn empty_document_uses_field_defaults() {
        let config: ServerConfig = serde_yaml::from_str("{}").unwrap();
        assert!(config.listen.is_empty());
        assert_eq!(config.bind, None);
    }

    #[test]
    fn resolve_listen_addrs() {
        let config = ServerConfig::new(vec!["127.0.0.1:1080".into()], None);
        assert_eq!(
            config.listen_addrs().unwrap(),
            vec!["127.0.0.1:1080".parse().unwrap()]
        );

        let config = ServerConfig::new(vec!["not an address".into()], None);
        assert!(matches!(
            config.listen_addrs(),
            Err(Error::Config { .. })
        ));
    }
}
