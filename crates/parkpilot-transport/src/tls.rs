//! rustls 后端
//!
//! TCP + TLS 1.2/1.3，支持双向认证（设备证书 + 私钥），证书均从 PEM 文件加载。

use crate::{Connector, Endpoint, SecureStream, TransportError};
use rustls::pki_types::{CertificateDer, PrivateKeyDer, ServerName};
use rustls::{ClientConfig, ClientConnection, RootCertStore, StreamOwned};
use std::fs::File;
use std::io::{BufReader, Read, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, trace};

/// 默认 TCP 连接超时
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// TLS 身份配置
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsIdentity {
    /// 根证书（PEM，可包含多个证书）
    pub ca_file: PathBuf,
    /// 设备证书（PEM），与 `key_file` 同时存在时启用双向认证
    pub cert_file: Option<PathBuf>,
    /// 设备私钥（PEM）
    pub key_file: Option<PathBuf>,
}

fn open_pem(path: &Path) -> Result<BufReader<File>, TransportError> {
    let file = File::open(path).map_err(|e| {
        TransportError::Certificate(format!("cannot open {}: {}", path.display(), e))
    })?;
    Ok(BufReader::new(file))
}

fn load_certs(path: &Path) -> Result<Vec<CertificateDer<'static>>, TransportError> {
    let mut reader = open_pem(path)?;
    let certs = rustls_pemfile::certs(&mut reader).collect::<Result<Vec<_>, _>>()?;
    if certs.is_empty() {
        return Err(TransportError::Certificate(format!(
            "no certificates in {}",
            path.display()
        )));
    }
    Ok(certs)
}

fn load_private_key(path: &Path) -> Result<PrivateKeyDer<'static>, TransportError> {
    let mut reader = open_pem(path)?;
    rustls_pemfile::private_key(&mut reader)?
        .ok_or_else(|| TransportError::Certificate(format!("no private key in {}", path.display())))
}

fn load_root_store(path: &Path) -> Result<RootCertStore, TransportError> {
    let mut roots = RootCertStore::empty();
    for cert in load_certs(path)? {
        roots.add(cert)?;
    }
    Ok(roots)
}

/// 构建 rustls 客户端配置（ring 加密后端）
pub fn client_config(identity: &TlsIdentity) -> Result<ClientConfig, TransportError> {
    let roots = load_root_store(&identity.ca_file)?;
    let provider = Arc::new(rustls::crypto::ring::default_provider());
    let builder = ClientConfig::builder_with_provider(provider)
        .with_safe_default_protocol_versions()?
        .with_root_certificates(roots);

    let config = match (&identity.cert_file, &identity.key_file) {
        (Some(cert), Some(key)) => {
            builder.with_client_auth_cert(load_certs(cert)?, load_private_key(key)?)?
        },
        _ => builder.with_no_client_auth(),
    };
    Ok(config)
}

/// rustls 连接工厂
#[derive(Clone)]
pub struct TlsConnector {
    config: Arc<ClientConfig>,
    connect_timeout: Duration,
}

impl TlsConnector {
    pub fn new(identity: &TlsIdentity) -> Result<Self, TransportError> {
        Ok(Self::with_config(Arc::new(client_config(identity)?)))
    }

    pub fn with_config(config: Arc<ClientConfig>) -> Self {
        Self {
            config,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }
}

impl Connector for TlsConnector {
    type Stream = TlsStream;

    fn connect(
        &mut self,
        endpoint: &Endpoint,
        receive_timeout: Duration,
    ) -> Result<TlsStream, TransportError> {
        let addr = (endpoint.host.as_str(), endpoint.port)
            .to_socket_addrs()
            .map_err(|_| TransportError::Resolve(endpoint.host.clone()))?
            .next()
            .ok_or_else(|| TransportError::Resolve(endpoint.host.clone()))?;

        debug!(%endpoint, %addr, "TLS connect");
        let tcp = TcpStream::connect_timeout(&addr, self.connect_timeout)
            .map_err(TransportError::from_io)?;
        tcp.set_read_timeout(Some(receive_timeout))?;
        tcp.set_nodelay(true)?;

        let server_name = ServerName::try_from(endpoint.host.clone())
            .map_err(|_| TransportError::InvalidServerName(endpoint.host.clone()))?;
        let conn = ClientConnection::new(Arc::clone(&self.config), server_name)?;
        let mut stream = StreamOwned::new(conn, tcp);

        // 在连接阶段完成握手，证书错误在这里暴露而不是在首个请求里
        while stream.conn.is_handshaking() {
            stream
                .conn
                .complete_io(&mut stream.sock)
                .map_err(TransportError::from_io)?;
        }
        trace!(%endpoint, "TLS handshake complete");

        Ok(TlsStream { inner: stream })
    }
}

/// rustls 连接
pub struct TlsStream {
    inner: StreamOwned<ClientConnection, TcpStream>,
}

impl SecureStream for TlsStream {
    fn send(&mut self, data: &[u8]) -> Result<(), TransportError> {
        self.inner.write_all(data).map_err(TransportError::from_io)?;
        self.inner.flush().map_err(TransportError::from_io)
    }

    fn receive(&mut self, buf: &mut [u8]) -> Result<usize, TransportError> {
        match self.inner.read(buf) {
            Ok(0) => Err(TransportError::Closed),
            Ok(n) => Ok(n),
            Err(e) => Err(TransportError::from_io(e)),
        }
    }

    fn set_receive_timeout(&mut self, timeout: Duration) -> Result<(), TransportError> {
        self.inner.sock.set_read_timeout(Some(timeout))?;
        Ok(())
    }
}

impl Drop for TlsStream {
    fn drop(&mut self) {
        self.inner.conn.send_close_notify();
        let _ = self.inner.conn.write_tls(&mut self.inner.sock);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;

    #[test]
    fn test_missing_ca_file() {
        let identity = TlsIdentity {
            ca_file: PathBuf::from("/nonexistent/ca.pem"),
            cert_file: None,
            key_file: None,
        };
        let result = TlsConnector::new(&identity);
        assert!(matches!(result, Err(TransportError::Certificate(_))));
    }

    #[test]
    fn test_empty_pem_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "not a certificate").unwrap();

        let identity = TlsIdentity {
            ca_file: file.path().to_path_buf(),
            cert_file: None,
            key_file: None,
        };
        match TlsConnector::new(&identity) {
            Err(TransportError::Certificate(msg)) => assert!(msg.contains("no certificates")),
            Err(e) => panic!("unexpected error: {}", e),
            Ok(_) => panic!("empty PEM must be rejected"),
        }
    }
}
