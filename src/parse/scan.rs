//! Byte-streaming parser for the `+COPS=?` network scan.
//!
//! The scan response is a `(stat,"long","short","numeric"),(...)` stream
//! that can outgrow any line buffer, so it is consumed one byte at a time
//! and the machine keeps its state across read chunks. The value lives
//! inside the scan request descriptor; constructing it is the reset.

use heapless::Vec;

use crate::config::MAX_SCAN_OPERATORS;
use crate::types::{OperatorStatus, ScanOperator};

#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct OperatorScan {
    ops: Vec<ScanOperator, MAX_SCAN_OPERATORS>,
    limit: usize,
    entry: ScanOperator,
    stat: i32,
    /// Inside a `(...)` tuple.
    in_tuple: bool,
    /// Latched on leading or doubled commas: the network reported no
    /// operators and the rest of the payload is format lists.
    no_operators: bool,
    /// Current term within the tuple: 0 status, 1 long, 2 short, 3 code.
    term: u8,
    prev: u8,
}

impl OperatorScan {
    pub fn new(limit: usize) -> Self {
        Self {
            limit: limit.min(MAX_SCAN_OPERATORS),
            ..Default::default()
        }
    }

    /// Operators fully parsed so far. Never exceeds the limit.
    pub fn found(&self) -> usize {
        self.ops.len()
    }

    pub fn operators(&self) -> &[ScanOperator] {
        &self.ops
    }

    pub fn into_operators(self) -> Vec<ScanOperator, MAX_SCAN_OPERATORS> {
        self.ops
    }

    pub fn feed(&mut self, ch: u8) {
        if self.no_operators || self.ops.len() >= self.limit {
            return;
        }
        if self.in_tuple {
            self.tuple_byte(ch);
        } else {
            match ch {
                b' ' => return, // leading spaces between tuples
                b',' => {
                    if self.prev == 0 || self.prev == b',' {
                        self.no_operators = true;
                    }
                }
                b'(' => {
                    self.in_tuple = true;
                    self.term = 0;
                    self.stat = 0;
                    self.entry = ScanOperator::default();
                }
                _ => {}
            }
            self.prev = ch;
        }
    }

    fn tuple_byte(&mut self, ch: u8) {
        match ch {
            b'"' => {}
            b')' => {
                self.in_tuple = false;
                self.term = 0;
                self.entry.status = OperatorStatus::from(self.stat);
                // Bounds guaranteed by the full-output gate in feed().
                let _ = self.ops.push(self.entry.clone());
            }
            b',' => {
                if self.term < 3 {
                    self.term += 1;
                }
            }
            _ => match self.term {
                0 => {
                    if ch.is_ascii_digit() {
                        self.stat = self
                            .stat
                            .saturating_mul(10)
                            .saturating_add((ch - b'0') as i32);
                    }
                }
                1 => {
                    // Overflowing name bytes are dropped.
                    let _ = self.entry.long_name.push(ch as char);
                }
                2 => {
                    let _ = self.entry.short_name.push(ch as char);
                }
                _ => {
                    if ch.is_ascii_digit() {
                        self.entry.code = self
                            .entry
                            .code
                            .saturating_mul(10)
                            .saturating_add((ch - b'0') as u32);
                    }
                }
            },
        }
        self.prev = ch;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed_all(scan: &mut OperatorScan, bytes: &[u8]) {
        for &b in bytes {
            scan.feed(b);
        }
    }

    #[test]
    fn two_operator_scan() {
        let mut scan = OperatorScan::new(2);
        feed_all(
            &mut scan,
            b"(2,\"Op1\",\"O1\",\"00101\"),(1,\"Op2\",\"O2\",\"00102\")\r",
        );

        assert_eq!(scan.found(), 2);
        let ops = scan.operators();
        assert_eq!(ops[0].status, OperatorStatus::Current);
        assert_eq!(ops[0].long_name.as_str(), "Op1");
        assert_eq!(ops[0].short_name.as_str(), "O1");
        assert_eq!(ops[0].code, 101);
        assert_eq!(ops[1].status, OperatorStatus::Available);
        assert_eq!(ops[1].long_name.as_str(), "Op2");
        assert_eq!(ops[1].short_name.as_str(), "O2");
        assert_eq!(ops[1].code, 102);
    }

    #[test]
    fn state_survives_chunk_boundaries() {
        let mut scan = OperatorScan::new(4);
        feed_all(&mut scan, b"(2,\"Operator On");
        feed_all(&mut scan, b"e\",\"Op1\",\"26201\"),(3,\"Two\",\"T2\",\"26202\")");

        assert_eq!(scan.found(), 2);
        assert_eq!(scan.operators()[0].long_name.as_str(), "Operator One");
        assert_eq!(scan.operators()[1].status, OperatorStatus::Forbidden);
        assert_eq!(scan.operators()[1].code, 26202);
    }

    #[test]
    fn leading_comma_latches_empty_scan() {
        let mut scan = OperatorScan::new(4);
        feed_all(&mut scan, b",,(0-4),(0-2)\r");
        assert_eq!(scan.found(), 0);
    }

    #[test]
    fn doubled_comma_latches_after_tuples() {
        let mut scan = OperatorScan::new(4);
        feed_all(&mut scan, b"(1,\"Op\",\"O\",\"00101\"),,(0-4)\r");
        assert_eq!(scan.found(), 1);
    }

    #[test]
    fn output_bound_holds_for_any_input() {
        let mut scan = OperatorScan::new(1);
        feed_all(
            &mut scan,
            b"(1,\"A\",\"A\",\"00101\"),(1,\"B\",\"B\",\"00102\"),(1,\"C\",\"C\",\"00103\")",
        );
        assert_eq!(scan.found(), 1);
        assert_eq!(scan.operators()[0].long_name.as_str(), "A");
    }

    #[test]
    fn oversized_status_digit_run_saturates() {
        let mut scan = OperatorScan::new(1);
        feed_all(&mut scan, b"(99999999999999999999,\"Op\",\"O\",\"26201\")");
        assert_eq!(scan.found(), 1);
        // Saturated far outside the 27.007 vocabulary, so it maps to
        // Unknown instead of wrapping or panicking.
        assert_eq!(scan.operators()[0].status, OperatorStatus::Unknown);
        assert_eq!(scan.operators()[0].code, 26201);
    }

    #[test]
    fn long_names_truncate_silently() {
        let mut scan = OperatorScan::new(1);
        feed_all(
            &mut scan,
            b"(1,\"An Operator Name Well Beyond Capacity\",\"SHORTNAMETOOBIG\",\"26201\")",
        );
        assert_eq!(scan.found(), 1);
        let op = &scan.operators()[0];
        assert_eq!(op.long_name.as_str(), "An Operator Name Wel");
        assert_eq!(op.short_name.as_str(), "SHORTNAMET");
    }
}
