use anyhow::{anyhow, bail, Context, Result};
use native_tls::{Identity, TlsConnector, TlsStream};
use regex::Regex;
use serde_json::{json, Value};
use std::fs;
use std::io::{BufRead, BufReader, Read, Write};
use std::net::TcpStream;
use std::sync::OnceLock;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, info};

use super::{RecordingSource, SearchWindow, DVR_TIME_FORMAT};
use crate::config::Config;
use crate::domain::models::DvrRecord;

const SCHEMA_VERSION: u32 = 17;
const PAGE_SIZE: usize = 50;
const APPLICATION_NAME: &str = "Quicksilver";
const APPLICATION_VERSION: &str = "1.2";

static START_LINE: OnceLock<Regex> = OnceLock::new();

fn start_line() -> &'static Regex {
    START_LINE.get_or_init(|| Regex::new(r"^MRPC/2 (\d+) (\d+)$").unwrap())
}

/// A Mind RPC session with a TiVo on the local network.
pub struct MindSession<S: Read + Write> {
    stream: BufReader<S>,
    rpc_id: u64,
    session_id: u32,
    body_id: String,
}

impl MindSession<TlsStream<TcpStream>> {
    /// Opens a TLS connection using the PKCS#12 client certificate and
    /// authenticates with the media access key.
    pub fn connect(config: &Config) -> Result<Self> {
        info!(
            "Connecting to tivo at {}:{} using cert at {}",
            config.tivo_ip,
            config.tivo_port,
            config.cert_path.display()
        );

        let cert = fs::read(&config.cert_path).with_context(|| {
            format!("Failed to read client certificate {}", config.cert_path.display())
        })?;
        let identity = Identity::from_pkcs12(&cert, &config.cert_password)
            .context("Failed to load client certificate")?;
        // The DVR presents a self-signed certificate.
        let connector = TlsConnector::builder()
            .identity(identity)
            .danger_accept_invalid_certs(true)
            .danger_accept_invalid_hostnames(true)
            .build()?;

        let tcp = TcpStream::connect((config.tivo_ip.as_str(), config.tivo_port))
            .with_context(|| format!("Failed to connect to {}:{}", config.tivo_ip, config.tivo_port))?;
        let stream = connector
            .connect(&config.tivo_ip, tcp)
            .map_err(|e| anyhow!("TLS handshake with {} failed: {e}", config.tivo_ip))?;

        let mut session = MindSession::new(stream, new_session_id());
        session.authenticate(&config.tivo_mak)?;
        Ok(session)
    }
}

impl<S: Read + Write> MindSession<S> {
    pub fn new(stream: S, session_id: u32) -> Self {
        Self {
            stream: BufReader::new(stream),
            rpc_id: 0,
            session_id,
            body_id: "-".to_string(),
        }
    }

    pub fn authenticate(&mut self, mak: &str) -> Result<()> {
        let response = self.request(
            "bodyAuthenticate",
            json!({ "credential": { "type": "makCredential", "key": mak } }),
        )?;
        if response.get("status").and_then(Value::as_str) != Some("success") {
            bail!(
                "TiVo authentication failed: {}",
                response
                    .get("message")
                    .and_then(Value::as_str)
                    .unwrap_or("no reason given")
            );
        }

        let config = self.request("bodyConfigSearch", json!({ "bodyId": "-" }))?;
        self.body_id = config
            .pointer("/bodyConfig/0/bodyId")
            .and_then(Value::as_str)
            .ok_or_else(|| anyhow!("TiVo did not report a body id"))?
            .to_string();
        debug!("Authenticated with body id {}", self.body_id);
        Ok(())
    }

    /// Runs a paged `recordingSearch` until the DVR reports the end of the list.
    pub fn recording_search(&mut self, window: &SearchWindow) -> Result<Vec<DvrRecord>> {
        let mut records = Vec::new();
        let mut offset = 0;

        loop {
            let mut body = json!({
                "bodyId": self.body_id,
                "state": window.states,
                "levelOfDetail": "medium",
                "count": PAGE_SIZE,
                "offset": offset,
            });
            if let Some(min_start) = window.min_start {
                body["minStartTime"] = json!(min_start.format(DVR_TIME_FORMAT).to_string());
            }
            if let Some(max_start) = window.max_start {
                body["maxStartTime"] = json!(max_start.format(DVR_TIME_FORMAT).to_string());
            }

            let response = self.request("recordingSearch", body)?;
            let page = match response.get("recording") {
                Some(recordings) => serde_json::from_value::<Vec<DvrRecord>>(recordings.clone())?,
                None => Vec::new(),
            };
            let is_bottom = response
                .get("isBottom")
                .and_then(Value::as_bool)
                .unwrap_or(true);

            debug!("Fetched {} recordings at offset {offset}", page.len());
            offset += page.len();
            let empty = page.is_empty();
            records.extend(page);
            if is_bottom || empty {
                break;
            }
        }

        Ok(records)
    }

    fn request(&mut self, request_type: &str, mut body: Value) -> Result<Value> {
        self.rpc_id += 1;
        body["type"] = json!(request_type);
        let message = encode_request(
            self.rpc_id,
            self.session_id,
            &self.body_id,
            request_type,
            &body,
        );

        let stream = self.stream.get_mut();
        stream.write_all(message.as_bytes())?;
        stream.flush()?;

        let response = read_response(&mut self.stream)?;
        if response.get("type").and_then(Value::as_str) == Some("error") {
            bail!(
                "TiVo rejected {request_type}: {}",
                response
                    .get("text")
                    .and_then(Value::as_str)
                    .unwrap_or("unknown error")
            );
        }
        Ok(response)
    }
}

impl<S: Read + Write> RecordingSource for MindSession<S> {
    fn fetch_recordings(&mut self, window: &SearchWindow) -> Result<Vec<DvrRecord>> {
        info!("Querying tivo for to do list");
        self.recording_search(window)
    }
}

pub fn encode_request(
    rpc_id: u64,
    session_id: u32,
    body_id: &str,
    request_type: &str,
    body: &Value,
) -> String {
    let headers = [
        "Type: request".to_string(),
        format!("RpcId: {rpc_id}"),
        format!("SchemaVersion: {SCHEMA_VERSION}"),
        "Content-Type: application/json".to_string(),
        format!("RequestType: {request_type}"),
        "ResponseCount: single".to_string(),
        format!("BodyId: {body_id}"),
        format!("X-ApplicationName: {APPLICATION_NAME}"),
        format!("X-ApplicationVersion: {APPLICATION_VERSION}"),
        format!("X-ApplicationSessionId: 0x{session_id:x}"),
    ]
    .iter()
    .map(|line| format!("{line}\r\n"))
    .collect::<String>();
    let body = body.to_string();

    // The header length counts the blank line that ends the header block.
    format!(
        "MRPC/2 {} {}\r\n{headers}\r\n{body}",
        headers.len() + 2,
        body.len()
    )
}

/// Reads one `MRPC/2` frame and returns its JSON body.
pub fn read_response<R: BufRead>(reader: &mut R) -> Result<Value> {
    let mut line = String::new();
    loop {
        line.clear();
        if reader.read_line(&mut line)? == 0 {
            bail!("TiVo closed the connection");
        }
        if !line.trim().is_empty() {
            break;
        }
    }

    let caps = start_line()
        .captures(line.trim_end())
        .ok_or_else(|| anyhow!("Unexpected Mind RPC start line: {:?}", line.trim_end()))?;
    let header_len: usize = caps[1].parse()?;
    let body_len: usize = caps[2].parse()?;

    let mut headers = vec![0; header_len];
    reader.read_exact(&mut headers)?;
    let mut body = vec![0; body_len];
    reader.read_exact(&mut body)?;

    Ok(serde_json::from_slice(&body)?)
}

fn new_session_id() -> u32 {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.subsec_nanos())
        .unwrap_or_default();
    0x2_0000 + (nanos % 0x3_0000)
}
