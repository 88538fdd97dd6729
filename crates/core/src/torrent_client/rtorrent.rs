//! rTorrent backend (XML-RPC).
//!
//! Requests are built as XML-RPC method calls against the SCGI-fronted
//! HTTP endpoint. Responses are only inspected for fault envelopes; the
//! add methods return an empty value on success.

use std::time::Duration;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use reqwest::Client;
use tracing::debug;

use crate::config::RTorrentConfig;

use super::{
    extract_hash_from_magnet, InjectRequest, InjectResult, TorrentClient, TorrentClientError,
    TorrentSource,
};

/// rTorrent XML-RPC client.
pub struct RTorrentClient {
    client: Client,
    config: RTorrentConfig,
}

impl RTorrentClient {
    pub fn new(config: RTorrentConfig, timeout: Option<Duration>) -> Self {
        let mut builder = Client::builder();
        if let Some(t) = timeout {
            builder = builder.timeout(t);
        }
        let client = builder.build().expect("Failed to create HTTP client");
        Self { client, config }
    }

    async fn call(&self, body: String) -> Result<String, TorrentClientError> {
        let response = self
            .client
            .post(&self.config.url)
            .header("Content-Type", "text/xml")
            .body(body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    TorrentClientError::Timeout
                } else if e.is_connect() {
                    TorrentClientError::ConnectionFailed(e.to_string())
                } else {
                    TorrentClientError::ApiError(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(TorrentClientError::ApiError(format!("HTTP {}", status)));
        }

        let body = response
            .text()
            .await
            .map_err(|e| TorrentClientError::ApiError(e.to_string()))?;

        if body.contains("<fault>") {
            let fault = extract_fault_string(&body)
                .unwrap_or_else(|| "unknown XML-RPC fault".to_string());
            if fault.to_lowercase().contains("duplicate")
                || fault.to_lowercase().contains("already")
            {
                return Err(TorrentClientError::Duplicate(fault));
            }
            return Err(TorrentClientError::ApiError(fault));
        }

        Ok(body)
    }
}

#[async_trait]
impl TorrentClient for RTorrentClient {
    fn name(&self) -> &str {
        "rtorrent"
    }

    fn supports_categories(&self) -> bool {
        false
    }

    async fn inject(&self, request: InjectRequest) -> Result<InjectResult, TorrentClientError> {
        // d.directory.set keeps rtorrent pointed at the existing data;
        // check_hash=0 honors skip_recheck on load
        let mut commands = Vec::new();
        if let Some(ref path) = request.save_path {
            commands.push(format!("d.directory.set=\"{}\"", path));
        }
        if request.skip_recheck {
            commands.push("d.check_hash=0".to_string());
        }

        let (body, hash) = match request.source {
            TorrentSource::Magnet { ref uri } => {
                debug!("rTorrent load.start via magnet");
                (
                    build_load_call("load.start", &CallArg::Str(uri.clone()), &commands),
                    extract_hash_from_magnet(uri),
                )
            }
            TorrentSource::File { ref data, .. } => {
                debug!("rTorrent load.raw_start ({} bytes)", data.len());
                (
                    build_load_call(
                        "load.raw_start",
                        &CallArg::Base64(BASE64.encode(data)),
                        &commands,
                    ),
                    None,
                )
            }
        };

        self.call(body).await?;
        Ok(InjectResult { hash })
    }
}

enum CallArg {
    Str(String),
    Base64(String),
}

/// Build an XML-RPC load call: target, payload, then per-download
/// commands applied at load time.
fn build_load_call(method: &str, payload: &CallArg, commands: &[String]) -> String {
    let mut params = String::new();
    // First parameter is the XML-RPC target (empty for the only view)
    params.push_str("<param><value><string></string></value></param>");

    match payload {
        CallArg::Str(s) => params.push_str(&format!(
            "<param><value><string>{}</string></value></param>",
            xml_escape(s)
        )),
        CallArg::Base64(b) => params.push_str(&format!(
            "<param><value><base64>{}</base64></value></param>",
            b
        )),
    }

    for command in commands {
        params.push_str(&format!(
            "<param><value><string>{}</string></value></param>",
            xml_escape(command)
        ));
    }

    format!(
        "<?xml version=\"1.0\"?><methodCall><methodName>{}</methodName><params>{}</params></methodCall>",
        method, params
    )
}

fn xml_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Pull the faultString out of a fault response without a full XML parse.
fn extract_fault_string(body: &str) -> Option<String> {
    let start = body.find("<string>")? + "<string>".len();
    let end = body[start..].find("</string>")? + start;
    Some(body[start..end].to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_magnet_call() {
        let body = build_load_call(
            "load.start",
            &CallArg::Str("magnet:?xt=urn:btih:abc&dn=A".to_string()),
            &[],
        );
        assert!(body.contains("<methodName>load.start</methodName>"));
        assert!(body.contains("magnet:?xt=urn:btih:abc&amp;dn=A"));
    }

    #[test]
    fn test_build_raw_call_with_commands() {
        let body = build_load_call(
            "load.raw_start",
            &CallArg::Base64("AAAA".to_string()),
            &["d.directory.set=\"/data/x\"".to_string(), "d.check_hash=0".to_string()],
        );
        assert!(body.contains("<base64>AAAA</base64>"));
        assert!(body.contains("d.directory.set"));
        assert!(body.contains("d.check_hash=0"));
    }

    #[test]
    fn test_xml_escape() {
        assert_eq!(xml_escape("a&b<c>d"), "a&amp;b&lt;c&gt;d");
    }

    #[test]
    fn test_extract_fault_string() {
        let body = r#"<?xml version="1.0"?><methodResponse><fault><value><struct>
            <member><name>faultCode</name><value><int>-501</int></value></member>
            <member><name>faultString</name><value><string>Could not create download</string></value></member>
        </struct></value></fault></methodResponse>"#;
        // The first <string> in a fault envelope is the faultString
        assert_eq!(
            extract_fault_string(body),
            Some("Could not create download".to_string())
        );
    }

    #[test]
    fn test_name_and_categories() {
        let client = RTorrentClient::new(
            RTorrentConfig {
                url: "http://localhost:1234/RPC2".to_string(),
            },
            None,
        );
        assert_eq!(client.name(), "rtorrent");
        assert!(!client.supports_categories());
    }
}
