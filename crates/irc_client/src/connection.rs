//! TCP+TLS connection contract (§4.4): idempotent `connect()`, line
//! iteration via the shared framed codec, synchronous `send()`, and
//! `shutdown()`.
//!
//! TLS setup is grounded on comparable connection-establishment code in
//! this ecosystem: native root certs loaded via `rustls-native-certs`,
//! wrapped by `tokio-rustls`, framed by the shared [`irc_proto`] codec.

use std::sync::Arc;

use futures_util::{SinkExt as _, StreamExt as _};
use irc_proto::{ICaseStr, IrcLineCodec, Message};
use rustls_pki_types::ServerName;
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::net::TcpStream;
use tokio_rustls::{
    TlsConnector,
    rustls::{ClientConfig, RootCertStore},
};
use tokio_util::codec::Framed;

use crate::errors::ClientError;

/// Either a plain TCP stream or a TLS stream over one, so the framed
/// codec doesn't need to care which transport it's riding on.
pub enum MaybeTlsStream {
    Plain(TcpStream),
    Tls(Box<tokio_rustls::client::TlsStream<TcpStream>>),
}

impl AsyncRead for MaybeTlsStream {
    fn poll_read(
        self: std::pin::Pin<&mut Self>,
        cx: &mut std::task::Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> std::task::Poll<std::io::Result<()>> {
        match self.get_mut() {
            MaybeTlsStream::Plain(s) => std::pin::Pin::new(s).poll_read(cx, buf),
            MaybeTlsStream::Tls(s) => std::pin::Pin::new(s.as_mut()).poll_read(cx, buf),
        }
    }
}

impl AsyncWrite for MaybeTlsStream {
    fn poll_write(
        self: std::pin::Pin<&mut Self>,
        cx: &mut std::task::Context<'_>,
        buf: &[u8],
    ) -> std::task::Poll<std::io::Result<usize>> {
        match self.get_mut() {
            MaybeTlsStream::Plain(s) => std::pin::Pin::new(s).poll_write(cx, buf),
            MaybeTlsStream::Tls(s) => std::pin::Pin::new(s.as_mut()).poll_write(cx, buf),
        }
    }

    fn poll_flush(
        self: std::pin::Pin<&mut Self>,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<std::io::Result<()>> {
        match self.get_mut() {
            MaybeTlsStream::Plain(s) => std::pin::Pin::new(s).poll_flush(cx),
            MaybeTlsStream::Tls(s) => std::pin::Pin::new(s.as_mut()).poll_flush(cx),
        }
    }

    fn poll_shutdown(
        self: std::pin::Pin<&mut Self>,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<std::io::Result<()>> {
        match self.get_mut() {
            MaybeTlsStream::Plain(s) => std::pin::Pin::new(s).poll_shutdown(cx),
            MaybeTlsStream::Tls(s) => std::pin::Pin::new(s.as_mut()).poll_shutdown(cx),
        }
    }
}

pub struct Connection {
    host: String,
    port: u16,
    tls: bool,
    stream: Option<Framed<MaybeTlsStream, IrcLineCodec>>,
}

impl Connection {
    pub fn new(host: impl Into<String>, port: u16, tls: bool) -> Self {
        Connection {
            host: host.into(),
            port,
            tls,
            stream: None,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    /// Idempotent: a second call while already connected is a no-op.
    pub async fn connect(&mut self) -> Result<(), ClientError> {
        if self.stream.is_some() {
            return Ok(());
        }

        log::trace!("connecting to {}:{}", self.host, self.port);
        let tcp = TcpStream::connect((self.host.as_str(), self.port)).await?;

        let transport = if self.tls {
            log::trace!("starting TLS handshake with {}", self.host);
            let certs = rustls_native_certs::load_native_certs();
            if !certs.certs.is_empty() {
                log::trace!("loaded {} native root certificates", certs.certs.len());
            }
            let mut roots = RootCertStore::empty();
            let (added, rejected) = roots.add_parsable_certificates(certs.certs);
            if added == 0 {
                return Err(ClientError::TlsRoots(format!(
                    "no usable root certificates ({rejected} rejected)"
                )));
            }
            let config = ClientConfig::builder()
                .with_root_certificates(roots)
                .with_no_client_auth();
            let connector = TlsConnector::from(Arc::new(config));
            let server_name = ServerName::try_from(self.host.clone())
                .map_err(|e| ClientError::TlsServerName(e.to_string()))?;
            let tls_stream = connector.connect(server_name, tcp).await?;
            log::trace!("TLS established with {}", self.host);
            MaybeTlsStream::Tls(Box::new(tls_stream))
        } else {
            MaybeTlsStream::Plain(tcp)
        };

        self.stream = Some(Framed::new(transport, IrcLineCodec));
        Ok(())
    }

    /// Writes one frame immediately; the rate limiter, if any, is the
    /// caller's responsibility (see `facade.rs`).
    pub async fn send(&mut self, args: Vec<ICaseStr>) -> Result<(), ClientError> {
        let stream = self.stream.as_mut().ok_or(ClientError::NotConnected)?;
        stream.send(args).await?;
        Ok(())
    }

    /// Reads the next inbound message, or `None` on EOF.
    pub async fn next_message(&mut self) -> Result<Option<Message>, ClientError> {
        let stream = self.stream.as_mut().ok_or(ClientError::NotConnected)?;
        match stream.next().await {
            Some(Ok(msg)) => Ok(Some(msg)),
            Some(Err(e)) => Err(e.into()),
            None => Ok(None),
        }
    }

    /// Signals EOF on the read half and closes the write half.
    pub async fn shutdown(&mut self) -> Result<(), ClientError> {
        if let Some(mut stream) = self.stream.take() {
            let _ = stream.close().await;
        }
        Ok(())
    }
}
