//! MPDU decode command.

use log::error;
use serde::Serialize;
use thiserror::Error;

use zlf_protocol::{
    validate_mpdu, Beaming, ChecksumKind, DataRate, DecodeError, HeaderType, HomeId, MacHeader,
};

use super::output::hex_upper;
use crate::context::OutputFormat;

#[derive(Error, Debug)]
pub(crate) enum MpduError {
    #[error("Invalid hex input: {0}")]
    Hex(#[from] hex::FromHexError),

    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error("MPDU of {0} bytes cannot hold a checksum")]
    NoChecksum(usize),
}

/// Checksum verdict for an MPDU.
#[derive(Debug, Clone, Serialize)]
pub(crate) struct ChecksumReport {
    pub kind: ChecksumKind,
    pub declared: String,
    pub computed: String,
    pub ok: bool,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct MpduReport {
    pub home_id: HomeId,
    pub source: u8,
    pub destination: u8,
    pub header_type: HeaderType,
    pub routed: bool,
    pub ack: bool,
    pub low_power: bool,
    pub speed_modified: bool,
    pub beaming: Beaming,
    pub sequence: u8,
    pub length: u8,
    pub checksum: Option<ChecksumReport>,
}

fn parse_hex(input: &str) -> Result<Vec<u8>, MpduError> {
    let cleaned: String = input
        .chars()
        .filter(|c| !c.is_whitespace() && *c != ':')
        .collect();
    Ok(hex::decode(cleaned)?)
}

/// Verify the checksum trailing `framed`, which may start with a length byte.
fn checksum_report(
    framed: &[u8],
    kind: ChecksumKind,
    length_prefixed: bool,
) -> Result<ChecksumReport, MpduError> {
    let prefix = usize::from(length_prefixed);
    if framed.len() < prefix + kind.len() {
        return Err(MpduError::NoChecksum(framed.len()));
    }
    let body = &framed[prefix..framed.len() - kind.len()];
    let declared = kind
        .read_declared(framed)
        .ok_or(MpduError::NoChecksum(framed.len()))?;
    let computed = kind.compute(body);

    let ok = if length_prefixed {
        validate_mpdu(framed, kind)?
    } else {
        computed == declared
    };

    let width = kind.len() * 2;
    Ok(ChecksumReport {
        kind,
        declared: format!("{:0width$X}", declared, width = width),
        computed: format!("{:0width$X}", computed, width = width),
        ok,
    })
}

/// Decode `input` into a report.
pub(crate) fn decode_mpdu(
    input: &str,
    rate: Option<DataRate>,
    length_prefixed: bool,
) -> Result<MpduReport, MpduError> {
    let bytes = parse_hex(input)?;
    let mpdu = if length_prefixed && !bytes.is_empty() {
        &bytes[1..]
    } else {
        &bytes[..]
    };
    let header = MacHeader::parse(mpdu)?;
    let fc = header.frame_control;

    let checksum = rate
        .map(|rate| {
            let kind = ChecksumKind::for_rate_code(rate.code());
            checksum_report(&bytes, kind, length_prefixed)
        })
        .transpose()?;

    Ok(MpduReport {
        home_id: header.home_id,
        source: header.source_node_id,
        destination: header.destination_node_id,
        header_type: fc.header_type(),
        routed: fc.routed(),
        ack: fc.ack(),
        low_power: fc.low_power(),
        speed_modified: fc.speed_modified(),
        beaming: fc.beaming(),
        sequence: fc.sequence_number(),
        length: header.length,
        checksum,
    })
}

fn print_mpdu_detail(bytes: &str, report: &MpduReport) {
    println!("MPDU Details:");
    println!("  Bytes:            {}", bytes);
    println!("  Home ID:          {}", report.home_id);
    println!("  Source:           {}", report.source);
    println!("  Destination:      {}", report.destination);
    println!("  Header Type:      {}", report.header_type);
    println!("  Routed:           {}", if report.routed { "Yes" } else { "No" });
    println!("  Ack Requested:    {}", if report.ack { "Yes" } else { "No" });
    println!("  Low Power:        {}", if report.low_power { "Yes" } else { "No" });
    println!(
        "  Speed Modified:   {}",
        if report.speed_modified { "Yes" } else { "No" }
    );
    println!("  Beaming:          {}", report.beaming);
    println!("  Sequence:         {}", report.sequence);
    println!("  Length:           {}", report.length);
    if let Some(cs) = &report.checksum {
        println!(
            "  Checksum:         {} (computed {}, {:?}) {}",
            cs.declared,
            cs.computed,
            cs.kind,
            if cs.ok { "OK" } else { "BAD" }
        );
    }
}

fn print_mpdu_csv(report: &MpduReport) {
    println!("home_id,source,destination,header_type,routed,ack,low_power,speed_modified,beaming,sequence,length,checksum,checksum_ok");
    let (declared, ok) = match &report.checksum {
        Some(cs) => (cs.declared.clone(), cs.ok.to_string()),
        None => (String::new(), String::new()),
    };
    println!(
        "{},{},{},{},{},{},{},{},{},{},{},{},{}",
        report.home_id,
        report.source,
        report.destination,
        report.header_type,
        report.routed,
        report.ack,
        report.low_power,
        report.speed_modified,
        report.beaming,
        report.sequence,
        report.length,
        declared,
        ok
    );
}

/// Mpdu command implementation.
pub fn cmd_mpdu(
    input: &str,
    rate: Option<DataRate>,
    length_prefixed: bool,
    format: OutputFormat,
) -> i32 {
    let report = match decode_mpdu(input, rate, length_prefixed) {
        Ok(report) => report,
        Err(e) => {
            error!("Failed to decode MPDU: {}", e);
            return 1;
        }
    };

    match format {
        OutputFormat::Table => {
            let bytes = parse_hex(input).map(|b| hex_upper(&b)).unwrap_or_default();
            print_mpdu_detail(&bytes, &report);
        }
        OutputFormat::Json => match serde_json::to_string_pretty(&report) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                error!("Failed to serialize report: {}", e);
                return 1;
            }
        },
        OutputFormat::Csv => print_mpdu_csv(&report),
    }

    match &report.checksum {
        Some(cs) if !cs.ok => 2,
        _ => 0,
    }
}
