//! Output rows and formatting for listings.

use std::io::{self, Write};

use chrono::SecondsFormat;
use colored::Colorize;
use serde::Serialize;

use zlf_protocol::{
    DecodeError, Direction, HeaderType, HomeId, LogicalDataFrame, MacHeader, Record,
};

use crate::context::OutputFormat;

/// A listing row that can be rendered in every output format.
pub(crate) trait Row: Serialize {
    const CSV_HEADER: &'static str;

    fn table_header() -> String;
    fn table_line(&self) -> String;
    fn csv_line(&self) -> String;
}

/// Uppercase hex without separators.
pub(crate) fn hex_upper(bytes: &[u8]) -> String {
    hex::encode_upper(bytes)
}

fn opt<T: ToString>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

fn dash<T: ToString>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_else(|| "-".to_string())
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct RecordRow {
    pub index: usize,
    pub time: String,
    pub direction: Direction,
    pub session: u8,
    pub kind: String,
    pub length: usize,
    pub payload: String,
}

impl RecordRow {
    pub fn new(index: usize, record: &Record) -> Self {
        RecordRow {
            index,
            time: record
                .timestamp
                .to_rfc3339_opts(SecondsFormat::Millis, true),
            direction: record.direction,
            session: record.session,
            kind: record.kind().to_string(),
            length: record.payload.len(),
            payload: hex_upper(&record.payload),
        }
    }
}

impl Row for RecordRow {
    const CSV_HEADER: &'static str = "index,time,direction,session,kind,length,payload";

    fn table_header() -> String {
        format!(
            "{:<6} {:<24} {:<9} {:<4} {:<14} {:>5}  {}",
            "#", "Time", "Dir", "Sess", "Kind", "Len", "Payload"
        )
    }

    fn table_line(&self) -> String {
        let payload: String = self.payload.chars().take(48).collect();
        let ellipsis = if self.payload.len() > 48 { "..." } else { "" };
        format!(
            "{:<6} {:<24} {:<9} {:<4} {:<14} {:>5}  {}{}",
            self.index,
            self.time,
            self.direction.to_string(),
            self.session,
            self.kind,
            self.length,
            payload,
            ellipsis
        )
    }

    fn csv_line(&self) -> String {
        format!(
            "{},{},{},{},{},{},{}",
            self.index,
            self.time,
            self.direction,
            self.session,
            self.kind,
            self.length,
            self.payload
        )
    }
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct FrameRow {
    pub index: usize,
    pub time: String,
    pub direction: Direction,
    pub session: u8,
    pub records: usize,
    pub frame_type: String,
    pub channel: u8,
    pub rate: Option<String>,
    pub region: u8,
    pub rssi: String,
    pub home_id: Option<HomeId>,
    pub source: Option<u8>,
    pub destination: Option<u8>,
    pub header_type: Option<HeaderType>,
    pub sequence: Option<u8>,
    pub checksum: Option<String>,
    pub checksum_ok: bool,
    pub mpdu: String,
}

impl FrameRow {
    /// Decode a logical frame into a row.
    ///
    /// Fails when the radio payload is structurally invalid. A MAC header that
    /// does not decode only leaves the header columns empty.
    pub fn new(index: usize, frame: &LogicalDataFrame) -> Result<Self, DecodeError> {
        let radio = frame.radio_frame()?;
        let mac: Option<MacHeader> = radio.mac_header().ok();
        let checksum_width = radio.checksum_kind().len() * 2;

        Ok(FrameRow {
            index,
            time: frame
                .timestamp()
                .to_rfc3339_opts(SecondsFormat::Millis, true),
            direction: frame.direction(),
            session: frame.session(),
            records: frame.records().len(),
            frame_type: radio.frame_type.to_string(),
            channel: radio.channel,
            rate: radio.data_rate().map(|r| r.label().to_string()),
            region: radio.region,
            rssi: radio.rssi().to_string(),
            home_id: radio.home_id,
            source: radio.source_node_id,
            destination: radio.destination_node_id,
            header_type: mac.map(|h| h.frame_control.header_type()),
            sequence: mac.map(|h| h.frame_control.sequence_number()),
            checksum: radio
                .checksum
                .map(|c| format!("{:0width$X}", c, width = checksum_width)),
            checksum_ok: radio.checksum_ok,
            mpdu: hex_upper(&radio.payload),
        })
    }
}

impl Row for FrameRow {
    const CSV_HEADER: &'static str = "index,time,direction,session,records,frame_type,channel,rate,region,rssi,home_id,source,destination,header_type,sequence,checksum,checksum_ok,mpdu";

    fn table_header() -> String {
        format!(
            "{:<6} {:<24} {:<9} {:<9} {:<2} {:<4} {:<7} {:<8} {:>3} {:>3} {:<10} {:>3} {:<6}  {}",
            "#", "Time", "Dir", "Type", "Ch", "Rate", "RSSI", "HomeId", "Src", "Dst", "Header",
            "Seq", "CS", "OK"
        )
    }

    fn table_line(&self) -> String {
        let verdict = if self.checksum_ok {
            "OK".green()
        } else {
            "BAD".red()
        };
        format!(
            "{:<6} {:<24} {:<9} {:<9} {:<2} {:<4} {:<7} {:<8} {:>3} {:>3} {:<10} {:>3} {:<6}  {}",
            self.index,
            self.time,
            self.direction.to_string(),
            self.frame_type,
            self.channel,
            dash(self.rate.as_deref()),
            self.rssi,
            dash(self.home_id),
            dash(self.source),
            dash(self.destination),
            dash(self.header_type),
            dash(self.sequence),
            dash(self.checksum.as_deref()),
            verdict
        )
    }

    fn csv_line(&self) -> String {
        format!(
            "{},{},{},{},{},{},{},{},{},{},{},{},{},{},{},{},{},{}",
            self.index,
            self.time,
            self.direction,
            self.session,
            self.records,
            self.frame_type,
            self.channel,
            opt(self.rate.as_deref()),
            self.region,
            self.rssi,
            opt(self.home_id),
            opt(self.source),
            opt(self.destination),
            opt(self.header_type),
            opt(self.sequence),
            opt(self.checksum.as_deref()),
            self.checksum_ok,
            self.mpdu
        )
    }
}

/// Writes rows in the selected format as they arrive.
pub(crate) struct Printer<W> {
    out: W,
    format: OutputFormat,
    rows: usize,
}

impl<W: Write> Printer<W> {
    pub fn new(out: W, format: OutputFormat) -> Self {
        Printer {
            out,
            format,
            rows: 0,
        }
    }

    pub fn begin<R: Row>(&mut self) -> io::Result<()> {
        match self.format {
            OutputFormat::Table => {
                let header = R::table_header();
                writeln!(self.out, "{}", header)?;
                writeln!(self.out, "{}", "-".repeat(header.len()))
            }
            OutputFormat::Csv => writeln!(self.out, "{}", R::CSV_HEADER),
            OutputFormat::Json => Ok(()),
        }
    }

    pub fn row<R: Row>(&mut self, row: &R) -> io::Result<()> {
        match self.format {
            OutputFormat::Table => writeln!(self.out, "{}", row.table_line())?,
            OutputFormat::Csv => writeln!(self.out, "{}", row.csv_line())?,
            OutputFormat::Json => {
                serde_json::to_writer(&mut self.out, row)?;
                writeln!(self.out)?;
            }
        }
        self.rows += 1;
        self.out.flush()
    }

    pub fn finish(&mut self, noun: &str) -> io::Result<()> {
        if self.format == OutputFormat::Table {
            writeln!(self.out, "\nTotal: {} {}", self.rows, noun)?;
        }
        self.out.flush()
    }

    #[cfg(test)]
    pub fn into_inner(self) -> W {
        self.out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use zlf_protocol::decode_record;

    const ENVELOPE_100K: &str =
        "41f1d75c4369dd8801170000002101000002003221030dc4a815cd0141040d0a8408ec85fe";
    const ENVELOPE_40K: &str =
        "c98274d94369dd8801140000002101000021003121030ac4a815cd0113010a0654fe";

    fn record(s: &str) -> Record {
        decode_record(&hex::decode(s).unwrap()).unwrap()
    }

    fn frame(s: &str) -> LogicalDataFrame {
        LogicalDataFrame::new(vec![record(s)]).unwrap()
    }

    fn render<R: Row>(format: OutputFormat, rows: &[R], noun: &str) -> String {
        let mut printer = Printer::new(Vec::new(), format);
        printer.begin::<R>().unwrap();
        for row in rows {
            printer.row(row).unwrap();
        }
        printer.finish(noun).unwrap();
        String::from_utf8(printer.into_inner()).unwrap()
    }

    #[test]
    fn test_record_row() {
        let row = RecordRow::new(0, &record(ENVELOPE_100K));
        assert_eq!(row.time, "2025-03-22T13:13:39.785Z");
        assert_eq!(row.kind, "data");
        assert_eq!(row.length, 23);
        assert!(row.payload.starts_with("2101000002"));
        assert_eq!(
            row.csv_line(),
            format!("0,2025-03-22T13:13:39.785Z,inbound,1,data,23,{}", row.payload)
        );
    }

    #[test]
    fn test_frame_row_100k() {
        let row = FrameRow::new(3, &frame(ENVELOPE_100K)).unwrap();
        assert_eq!(row.frame_type, "Data");
        assert_eq!(row.rate.as_deref(), Some("100K"));
        assert_eq!(row.rssi, "50 dBm");
        assert_eq!(row.home_id.unwrap().to_string(), "C4A815CD");
        assert_eq!(row.source, Some(1));
        assert_eq!(row.destination, Some(10));
        assert_eq!(row.header_type, Some(HeaderType::Singlecast));
        assert_eq!(row.checksum.as_deref(), Some("EC85"));
        assert!(row.checksum_ok);
        assert_eq!(row.mpdu, "C4A815CD0141040D0A8408");
    }

    #[test]
    fn test_frame_row_40k() {
        let row = FrameRow::new(0, &frame(ENVELOPE_40K)).unwrap();
        assert_eq!(row.channel, 1);
        assert_eq!(row.rate.as_deref(), Some("40K"));
        assert_eq!(row.header_type, Some(HeaderType::Ack));
        assert_eq!(row.checksum.as_deref(), Some("54"));
        assert!(row.checksum_ok);
    }

    #[test]
    fn test_json_lines() {
        let rows = vec![
            FrameRow::new(0, &frame(ENVELOPE_100K)).unwrap(),
            FrameRow::new(1, &frame(ENVELOPE_40K)).unwrap(),
        ];
        let text = render(OutputFormat::Json, &rows, "frames");
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);

        let value: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(value["home_id"], "C4A815CD");
        assert_eq!(value["destination"], 10);
        assert_eq!(value["direction"], "inbound");
        assert_eq!(value["header_type"], "singlecast");
        assert_eq!(value["checksum_ok"], true);
    }

    #[test]
    fn test_table_and_csv() {
        let rows = vec![RecordRow::new(0, &record(ENVELOPE_40K))];

        let table = render(OutputFormat::Table, &rows, "records");
        assert!(table.starts_with(&RecordRow::table_header()));
        assert!(table.contains("inbound"));
        assert!(table.trim_end().ends_with("Total: 1 records"));

        let csv = render(OutputFormat::Csv, &rows, "records");
        let mut lines = csv.lines();
        assert_eq!(lines.next(), Some(RecordRow::CSV_HEADER));
        assert!(lines.next().unwrap().starts_with("0,"));
        assert_eq!(lines.next(), None);
    }
}
