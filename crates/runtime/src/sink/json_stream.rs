//! NDJSON (newline-delimited JSON) stream sink.
//!
//! Each row is serialized directly to the writer without an intermediate
//! `String`.
//!
//! ```ignore
//! let mut sink = JsonStreamSink::stdout();
//! sink.write_events(wallet.events())?;
//! sink.write_transactions(&TransactionRow::from_wallet(&wallet))?;
//! ```

use super::TransactionRow;
use crate::evm::DispatchReceipt;
use cosign_core::WalletEvent;
use serde::Serialize;
use std::io::{self, BufWriter, Write};

/// Buffered NDJSON writer over any `Write`.
pub struct JsonStreamSink<W: Write> {
    writer: BufWriter<W>,
    rows_written: usize,
}

impl JsonStreamSink<io::Stdout> {
    /// Write NDJSON to stdout.
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> JsonStreamSink<W> {
    /// Create a sink wrapping any writer (file, Vec<u8>, etc.).
    pub fn new(writer: W) -> Self {
        Self {
            writer: BufWriter::with_capacity(64 * 1024, writer),
            rows_written: 0,
        }
    }

    fn write_row<T: Serialize>(&mut self, row: &T) -> io::Result<()> {
        serde_json::to_writer(&mut self.writer, row).map_err(io::Error::other)?;
        self.writer.write_all(b"\n")?;
        self.rows_written += 1;
        Ok(())
    }

    /// Write the wallet event log in order.
    pub fn write_events(&mut self, events: &[WalletEvent]) -> io::Result<()> {
        for event in events {
            self.write_row(event)?;
        }
        Ok(())
    }

    pub fn write_transactions(&mut self, rows: &[TransactionRow]) -> io::Result<()> {
        for row in rows {
            self.write_row(row)?;
        }
        Ok(())
    }

    pub fn write_receipts(&mut self, receipts: &[DispatchReceipt]) -> io::Result<()> {
        for receipt in receipts {
            self.write_row(receipt)?;
        }
        Ok(())
    }

    /// Flush and return how many rows were written.
    pub fn finish(mut self) -> io::Result<usize> {
        self.writer.flush()?;
        Ok(self.rows_written)
    }

    /// Number of rows written so far.
    pub fn rows_written(&self) -> usize {
        self.rows_written
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::Address;
    use cosign_core::TxStatus;

    #[test]
    fn writes_one_json_object_per_line() {
        let mut buf = Vec::new();
        let mut sink = JsonStreamSink::new(&mut buf);

        let owner = Address::new([0x11; 20]);
        let events = vec![
            WalletEvent::Submission { id: 0 },
            WalletEvent::Confirmation { owner, id: 0 },
        ];
        let rows = vec![TransactionRow {
            id: 0,
            destination: "0x99".into(),
            value: "1".into(),
            payload: "0x".into(),
            executed: false,
            confirmation_count: 1,
            required: 2,
            status: TxStatus::Pending,
            confirmed_by: vec![format!("{owner}")],
        }];

        sink.write_events(&events).unwrap();
        sink.write_transactions(&rows).unwrap();
        assert_eq!(sink.rows_written(), 3);
        let n = sink.finish().unwrap();
        assert_eq!(n, 3);

        let output = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = output.trim().split('\n').collect();
        assert_eq!(lines.len(), 3);

        let first: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first["event"], "submission");
        let back: WalletEvent = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(back, events[1]);
        let row: serde_json::Value = serde_json::from_str(lines[2]).unwrap();
        assert_eq!(row["status"], "Pending");
    }
}
