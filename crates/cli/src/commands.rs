use std::io::{BufRead, Read, Write};

use anyhow::{bail, Context, Result};
use serde::Serialize;
use tracing::{debug, info, warn};
use vaultmq_core::{DecodeError, Event, Message, MessageType};

use crate::config::{CliConfig, UnknownTypePolicy};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct InspectSummary {
    pub decoded: usize,
    pub forwarded: usize,
    pub skipped: usize,
}

#[derive(Serialize)]
struct InspectRecord<'a> {
    #[serde(rename = "type")]
    kind: u32,
    name: &'static str,
    content_id: String,
    payload: &'a Event,
}

#[derive(Serialize)]
struct TypeEntry {
    #[serde(rename = "type")]
    kind: u32,
    name: &'static str,
}

pub fn list_types<W: Write>(out: &mut W, config: &CliConfig) -> Result<()> {
    for kind in MessageType::ALL {
        let entry = TypeEntry {
            kind: kind.as_u32(),
            name: kind.as_str(),
        };
        write_json(out, &entry, config.pretty)?;
    }
    Ok(())
}

/// Decodes newline-delimited envelopes from `input`, writing one record per
/// envelope to `out`.
pub fn inspect<R: BufRead, W: Write>(
    input: R,
    out: &mut W,
    config: &CliConfig,
) -> Result<InspectSummary> {
    let mut summary = InspectSummary::default();

    for (index, line) in input.lines().enumerate() {
        let line_no = index + 1;
        let line = line.with_context(|| format!("failed to read line {line_no}"))?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let message: Message = line
            .parse()
            .with_context(|| format!("line {line_no}: invalid envelope"))?;

        let event = match Event::try_from(&message) {
            Ok(event) => event,
            Err(DecodeError::UnknownType(kind)) => {
                match config.unknown_types {
                    UnknownTypePolicy::Forward => {
                        debug!(line = line_no, kind, "forwarding unknown message type");
                        writeln!(out, "{}", message.to_json_string()?)?;
                        summary.forwarded += 1;
                    }
                    UnknownTypePolicy::Skip => {
                        warn!(line = line_no, kind, "skipping unknown message type");
                        summary.skipped += 1;
                    }
                    UnknownTypePolicy::Reject => {
                        bail!("line {line_no}: unknown message type {kind}");
                    }
                }
                continue;
            }
            Err(err) => {
                return Err(err).with_context(|| {
                    format!("line {line_no}: payload does not match type {}", message.kind())
                });
            }
        };

        if !event.success() {
            debug!(
                line = line_no,
                correlation_id = %event.base().correlation_id,
                "message reports a failed transaction"
            );
        }

        let record = InspectRecord {
            kind: message.kind(),
            name: event.message_type().as_str(),
            content_id: message.content_id(),
            payload: &event,
        };
        write_json(out, &record, config.pretty)?;
        summary.decoded += 1;
    }

    info!(
        decoded = summary.decoded,
        forwarded = summary.forwarded,
        skipped = summary.skipped,
        "inspection finished"
    );
    Ok(summary)
}

/// Validates a payload object against `kind` and writes the wrapped envelope.
pub fn encode<R: Read, W: Write>(kind: MessageType, mut input: R, out: &mut W) -> Result<()> {
    let mut raw = String::new();
    input
        .read_to_string(&mut raw)
        .context("failed to read payload")?;

    let message = Message::with_raw_data(kind, raw.trim()).context("payload is not valid JSON")?;
    let event = Event::try_from(&message)
        .with_context(|| format!("payload does not match type {kind}"))?;

    let envelope = event.to_message()?;
    writeln!(out, "{}", envelope.to_json_string()?)?;
    info!(%kind, content_id = %envelope.content_id(), "encoded message");
    Ok(())
}

fn write_json<W: Write, T: Serialize>(out: &mut W, value: &T, pretty: bool) -> Result<()> {
    if pretty {
        serde_json::to_writer_pretty(&mut *out, value)?;
    } else {
        serde_json::to_writer(&mut *out, value)?;
    }
    writeln!(out)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;
    use std::io::Cursor;

    const INVEST: &str = r#"{"type":1,"data":{"correlation_id":"abc123","tx_hash":"0xdead","ts":1700000000,"sender":"0xAAA","success":true,"receiver_address":"0xBBB","vault_token_amount":"1000","asset_token_amount":"500"}}"#;
    const UNKNOWN: &str = r#"{"type":9,"data":{"future":"field"}}"#;

    fn config_with(policy: UnknownTypePolicy) -> CliConfig {
        CliConfig {
            unknown_types: policy,
            ..CliConfig::default()
        }
    }

    fn output_lines(out: &[u8]) -> Vec<String> {
        String::from_utf8(out.to_vec())
            .unwrap()
            .lines()
            .map(str::to_owned)
            .collect()
    }

    #[test]
    fn inspect_decodes_known_envelopes() {
        let input = format!("{INVEST}\n\n{INVEST}\n");
        let mut out = Vec::new();

        let summary = inspect(Cursor::new(input), &mut out, &CliConfig::default()).unwrap();
        assert_eq!(summary.decoded, 2);

        let lines = output_lines(&out);
        assert_eq!(lines.len(), 2);
        let record: Value = serde_json::from_str(&lines[0]).unwrap();
        assert_eq!(record["type"], 1);
        assert_eq!(record["name"], "vault_invest");
        assert_eq!(record["payload"]["vault_token_amount"], "1000");
        assert_eq!(record["payload"]["correlation_id"], "abc123");
        assert_eq!(
            record["content_id"],
            INVEST.parse::<Message>().unwrap().content_id()
        );
    }

    #[test]
    fn unknown_types_are_forwarded_verbatim_by_default() {
        let input = format!("{UNKNOWN}\n{INVEST}\n");
        let mut out = Vec::new();

        let summary = inspect(Cursor::new(input), &mut out, &CliConfig::default()).unwrap();
        assert_eq!(
            summary,
            InspectSummary {
                decoded: 1,
                forwarded: 1,
                skipped: 0
            }
        );
        assert_eq!(output_lines(&out)[0], UNKNOWN);
    }

    #[test]
    fn unknown_types_can_be_skipped() {
        let mut out = Vec::new();
        let summary = inspect(
            Cursor::new(UNKNOWN),
            &mut out,
            &config_with(UnknownTypePolicy::Skip),
        )
        .unwrap();
        assert_eq!(summary.skipped, 1);
        assert!(out.is_empty());
    }

    #[test]
    fn unknown_types_can_be_rejected() {
        let mut out = Vec::new();
        let err = inspect(
            Cursor::new(format!("{INVEST}\n{UNKNOWN}")),
            &mut out,
            &config_with(UnknownTypePolicy::Reject),
        )
        .unwrap_err();
        assert!(err.to_string().contains("line 2"));
    }

    #[test]
    fn malformed_lines_name_the_line() {
        let mut out = Vec::new();
        let err = inspect(
            Cursor::new(format!("{INVEST}\n{{\"type\":1,\"data\":{{")),
            &mut out,
            &CliConfig::default(),
        )
        .unwrap_err();
        assert!(err.to_string().contains("line 2: invalid envelope"));
        assert!(err.downcast_ref::<DecodeError>().is_some());
    }

    #[test]
    fn mismatched_payload_is_an_error() {
        let withdraw_labelled_invest = r#"{"type":1,"data":{"correlation_id":"c","tx_hash":"","ts":0,"sender":"0x1","success":false,"receiver_address":"0x2","asset_token_amount":"1"}}"#;
        let mut out = Vec::new();
        let err = inspect(
            Cursor::new(withdraw_labelled_invest),
            &mut out,
            &CliConfig::default(),
        )
        .unwrap_err();
        assert!(err.to_string().contains("does not match type 1"));
    }

    #[test]
    fn encode_wraps_a_valid_payload() {
        let payload = r#"
            {"correlation_id":"t-1","tx_hash":"0x01","ts":1700000000,"sender":"0xA",
             "success":true,"receiver_address":"0xB","token_amount":"7","token_address":"0xT"}
        "#;
        let mut out = Vec::new();
        encode(MessageType::TokenTransfer, Cursor::new(payload), &mut out).unwrap();

        let lines = output_lines(&out);
        assert_eq!(lines.len(), 1);
        let message: Message = lines[0].parse().unwrap();
        assert_eq!(message.kind(), 7);
        match Event::try_from(&message).unwrap() {
            Event::TokenTransfer(transfer) => {
                assert_eq!(transfer.token_amount, "7");
                assert_eq!(transfer.base.correlation_id, "t-1");
            }
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[test]
    fn encode_rejects_payload_of_another_shape() {
        let dividend = r#"{"correlation_id":"d","tx_hash":"0x1","ts":1,"sender":"0xA","success":true,"asset_token_amount":"3"}"#;
        let mut out = Vec::new();
        let err = encode(MessageType::VaultClaim, Cursor::new(dividend), &mut out).unwrap_err();
        assert!(err.to_string().contains("vault_claim"));
        assert!(out.is_empty());
    }

    #[test]
    fn list_types_prints_every_discriminant() {
        let mut out = Vec::new();
        list_types(&mut out, &CliConfig::default()).unwrap();

        let lines = output_lines(&out);
        assert_eq!(lines.len(), 8);
        let last: Value = serde_json::from_str(&lines[7]).unwrap();
        assert_eq!(last["type"], 7);
        assert_eq!(last["name"], "token_transfer");
    }
}
