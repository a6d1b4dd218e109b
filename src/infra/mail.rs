use anyhow::{Context, Result};
use lettre::address::Envelope;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Address, Message, SmtpTransport, Transport};
use tracing::{debug, info};

use crate::config::Config;

const DEFAULT_SMTP_PORT: u16 = 587;

pub fn compose_message(config: &Config, subject: &str, body: String) -> Result<Message> {
    let from_address = parse_address(&config.smtp_user)?;
    let mut builder = Message::builder()
        .from(Mailbox::new(Some(config.smtp_name.clone()), from_address))
        .subject(subject)
        .header(ContentType::TEXT_HTML);

    let mut recipients = Vec::with_capacity(config.to_emails.len());
    for to in &config.to_emails {
        let address = parse_address(to)?;
        builder = builder.to(Mailbox::new(None, address.clone()));
        recipients.push(address);
    }

    let envelope = Envelope::new(Some(parse_address(config.envelope_from())?), recipients)?;
    Ok(builder.envelope(envelope).body(body)?)
}

/// Sends `message` over STARTTLS, or only prints it when `dry_run` is set.
pub fn deliver(config: &Config, message: &Message, dry_run: bool) -> Result<()> {
    let formatted = String::from_utf8_lossy(&message.formatted()).into_owned();

    if dry_run {
        info!("Not sending email");
        println!("{formatted}");
        return Ok(());
    }

    info!("Sending email to {}", config.to_emails.join(","));
    debug!("{formatted}");

    let (host, port) = split_server(&config.smtp_server)?;
    let transport = SmtpTransport::starttls_relay(&host)?
        .port(port)
        .credentials(Credentials::new(
            config.smtp_user.clone(),
            config.smtp_password.clone(),
        ))
        .build();
    transport
        .send(message)
        .with_context(|| format!("Failed to send mail through {host}:{port}"))?;

    info!("Email sent");
    Ok(())
}

/// Splits `host` or `host:port`; the port defaults to submission (587).
pub fn split_server(server: &str) -> Result<(String, u16)> {
    match server.rsplit_once(':') {
        Some((host, port)) => {
            let port = port
                .parse()
                .with_context(|| format!("Invalid SMTP port in {server:?}"))?;
            Ok((host.to_string(), port))
        }
        None => Ok((server.to_string(), DEFAULT_SMTP_PORT)),
    }
}

fn parse_address(value: &str) -> Result<Address> {
    value
        .trim()
        .parse()
        .with_context(|| format!("Invalid email address {value:?}"))
}
