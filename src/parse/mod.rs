//! Field-oriented parsing of AT response payloads.
//!
//! All parsers are best-effort: a missing or malformed field yields a zero
//! or `Unknown` value and the cursor still lands on the next structural
//! boundary (`,`, CR or end of input). Nothing here ever fails; tolerance
//! to vendor formatting quirks beats strictness on this wire.

pub(crate) mod response;
pub mod scan;

use heapless::String;

use crate::types::{DateTime, IpV4, Mac, MemoryKind, MemorySet, SmsStatus, MEMORY_MAP};

/// Movable read position over an immutable response payload.
#[derive(Debug)]
pub struct Cursor<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    pub fn pos(&self) -> usize {
        self.pos
    }

    pub fn rest(&self) -> &'a [u8] {
        &self.buf[self.pos..]
    }

    pub fn at_end(&self) -> bool {
        self.pos >= self.buf.len()
    }

    fn peek(&self) -> Option<u8> {
        self.buf.get(self.pos).copied()
    }

    fn peek_at(&self, n: usize) -> Option<u8> {
        self.buf.get(self.pos + n).copied()
    }

    fn bump(&mut self) -> Option<u8> {
        let b = self.peek()?;
        self.pos += 1;
        Some(b)
    }

    fn advance(&mut self, n: usize) {
        self.pos = (self.pos + n).min(self.buf.len());
    }

    fn skip_if(&mut self, b: u8) -> bool {
        if self.peek() == Some(b) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    /// Skip the `+XXXX: ` header of a recognized response.
    ///
    /// Every response code routed here is four letters plus colon and
    /// space, so a leading `+` means exactly seven header bytes.
    pub fn skip_response_prefix(&mut self) {
        if self.peek() == Some(b'+') {
            self.advance(7);
        }
    }

    /// Decimal integer field.
    ///
    /// Skips at most one each of `"`, `,`, `"`, `/`, `:`, `+` in that
    /// order, then an optional `-`, accumulates digits (saturating) and
    /// eats one trailing `,`.
    pub fn number(&mut self) -> i32 {
        for sep in [b'"', b',', b'"', b'/', b':', b'+'] {
            self.skip_if(sep);
        }
        let neg = self.skip_if(b'-');
        let mut val: i32 = 0;
        while let Some(d) = self.peek().filter(u8::is_ascii_digit) {
            val = val.saturating_mul(10).saturating_add((d - b'0') as i32);
            self.pos += 1;
        }
        self.skip_if(b',');
        if neg {
            -val
        } else {
            val
        }
    }

    /// Hexadecimal integer field, case-insensitive, saturating.
    pub fn hex_number(&mut self) -> u32 {
        for sep in [b'"', b',', b'"'] {
            self.skip_if(sep);
        }
        let mut val: u32 = 0;
        while let Some(d) = self.peek().filter(u8::is_ascii_hexdigit) {
            let digit = match d {
                b'0'..=b'9' => d - b'0',
                b'a'..=b'f' => d - b'a' + 10,
                _ => d - b'A' + 10,
            };
            val = val.saturating_mul(16).saturating_add(digit as u32);
            self.pos += 1;
        }
        self.skip_if(b',');
        val
    }

    /// String field, quoted or bare, copied into `dst`.
    ///
    /// A quoted string ends on a `"` directly followed by `,`, CR, LF or
    /// end of input (embedded quotes are kept); a bare string ends on the
    /// first `,`, CR or LF. When `dst` fills up, `trim` selects between
    /// draining the remaining input without copying and stopping right at
    /// the truncation point. The closing quote and one separating comma
    /// are consumed.
    pub fn read_string<const N: usize>(&mut self, dst: &mut String<N>, trim: bool) {
        dst.clear();
        self.copy_string(Some(dst), trim);
    }

    /// Drain one string field without keeping it.
    pub fn skip_string(&mut self) {
        self.copy_string::<0>(None, true);
    }

    fn copy_string<const N: usize>(&mut self, mut dst: Option<&mut String<N>>, trim: bool) {
        self.skip_if(b',');
        let quoted = self.skip_if(b'"');
        while let Some(b) = self.peek() {
            if quoted {
                if b == b'"'
                    && matches!(self.peek_at(1), None | Some(b',') | Some(b'\r') | Some(b'\n'))
                {
                    self.pos += 1;
                    break;
                }
            } else if matches!(b, b',' | b'\r' | b'\n') {
                break;
            }
            if let Some(out) = dst.as_deref_mut() {
                if out.push(b as char).is_err() {
                    if trim {
                        dst = None;
                    } else {
                        // Full destination, caller wants the cursor left
                        // right at the truncation point.
                        return;
                    }
                }
            }
            self.pos += 1;
        }
        self.skip_if(b',');
    }

    /// Advance to the next structural boundary if not already on one.
    pub fn trim_to_boundary(&mut self) {
        match self.peek() {
            Some(b'"') | Some(b'\r') | Some(b',') | None => {}
            _ => self.skip_string(),
        }
    }

    /// `a.b.c.d` address, optionally quoted.
    pub fn ip(&mut self) -> IpV4 {
        self.skip_if(b'"');
        let mut octets = [0u8; 4];
        for (i, octet) in octets.iter_mut().enumerate() {
            *octet = self.number() as u8;
            if i < 3 {
                // the dot
                self.bump();
            }
        }
        self.skip_if(b'"');
        IpV4(octets)
    }

    /// `AA:BB:CC:DD:EE:FF` address, optionally quoted.
    pub fn mac(&mut self) -> Mac {
        self.skip_if(b'"');
        let mut octets = [0u8; 6];
        for (i, octet) in octets.iter_mut().enumerate() {
            *octet = self.hex_number() as u8;
            if i < 5 {
                // the colon
                self.bump();
            }
        }
        self.skip_if(b'"');
        self.skip_if(b',');
        Mac(octets)
    }

    /// `dd/mm/yy,hh:mm:ss` timestamp; the two-digit year is biased by
    /// +2000. Timezone suffixes are trimmed away.
    pub fn datetime(&mut self) -> DateTime {
        let day = self.number() as u8;
        let month = self.number() as u8;
        let year = 2000u16.saturating_add(self.number() as u16);
        let hour = self.number() as u8;
        let minute = self.number() as u8;
        let second = self.number() as u8;
        self.trim_to_boundary();
        DateTime {
            year,
            month,
            day,
            hour,
            minute,
            second,
        }
    }

    /// Storage token (`"SM"`, `ME`, ...) resolved through [`MEMORY_MAP`],
    /// first prefix match wins. Unknown tokens are drained and map to
    /// [`MemoryKind::Unknown`].
    pub fn memory(&mut self) -> MemoryKind {
        self.skip_if(b',');
        self.skip_if(b'"');
        let mut kind = MemoryKind::Unknown;
        let mut matched = false;
        for (token, k) in MEMORY_MAP {
            if self.rest().starts_with(token.as_bytes()) {
                self.advance(token.len());
                kind = *k;
                matched = true;
                break;
            }
        }
        if !matched {
            self.trim_to_boundary();
        }
        self.skip_if(b'"');
        kind
    }

    /// `(A,B,...)` storage list folded into a bitset.
    pub fn memory_list(&mut self) -> MemorySet {
        self.skip_if(b',');
        self.skip_if(b'(');
        let mut set = MemorySet::empty();
        while let Some(b) = self.peek() {
            if b == b')' {
                self.pos += 1;
                break;
            }
            let before = self.pos;
            let kind = self.memory();
            if self.pos == before {
                // Byte no parser claims; step over it rather than spin.
                self.pos += 1;
                continue;
            }
            set.insert(kind);
        }
        set
    }

    /// Quoted text-mode SMS status token. Anything outside the 27.005
    /// vocabulary yields `None` and callers leave their record untouched.
    pub fn sms_status(&mut self) -> Option<SmsStatus> {
        let mut token: String<12> = String::new();
        self.read_string(&mut token, true);
        match token.as_str() {
            "REC UNREAD" => Some(SmsStatus::Unread),
            "REC READ" => Some(SmsStatus::Read),
            "STO UNSENT" => Some(SmsStatus::Unsent),
            "STO SENT" => Some(SmsStatus::Sent),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::MemoryKind;

    #[test]
    fn number_negative_with_trailing_comma() {
        let mut cur = Cursor::new(b"-42,rest");
        assert_eq!(cur.number(), -42);
        assert_eq!(cur.rest(), b"rest");
    }

    #[test]
    fn number_skips_structural_prefixes() {
        let mut cur = Cursor::new(b",\"129\"");
        assert_eq!(cur.number(), 129);

        let mut cur = Cursor::new(b":30+04");
        assert_eq!(cur.number(), 30);

        let mut cur = Cursor::new(b"+04\r");
        assert_eq!(cur.number(), 4);
    }

    #[test]
    fn number_saturates_instead_of_wrapping() {
        let mut cur = Cursor::new(b"99999999999999999999");
        assert_eq!(cur.number(), i32::MAX);
    }

    #[test]
    fn hex_number_mixed_case() {
        let mut cur = Cursor::new(b"aB,");
        assert_eq!(cur.hex_number(), 0xAB);
        assert!(cur.at_end());
    }

    #[test]
    fn string_copies_and_lands_past_separator() {
        let mut cur = Cursor::new(b"\"HELLO\",next");
        let mut buf: String<8> = String::new();
        cur.read_string(&mut buf, true);
        assert_eq!(buf.as_str(), "HELLO");
        assert_eq!(cur.rest(), b"next");
    }

    #[test]
    fn string_keeps_embedded_quote() {
        let mut cur = Cursor::new(b"\"A\"B\",x");
        let mut buf: String<8> = String::new();
        cur.read_string(&mut buf, true);
        assert_eq!(buf.as_str(), "A\"B");
        assert_eq!(cur.rest(), b"x");
    }

    #[test]
    fn string_overflow_trim_drains_input() {
        let mut cur = Cursor::new(b"\"ABCDEFGH\",x");
        let mut buf: String<4> = String::new();
        cur.read_string(&mut buf, true);
        assert_eq!(buf.as_str(), "ABCD");
        assert_eq!(cur.rest(), b"x");
    }

    #[test]
    fn string_overflow_without_trim_stops_short() {
        let mut cur = Cursor::new(b"\"ABCDEFGH\",x");
        let mut buf: String<4> = String::new();
        cur.read_string(&mut buf, false);
        assert_eq!(buf.as_str(), "ABCD");
        assert_eq!(cur.rest(), b"EFGH\",x");
    }

    #[test]
    fn bare_string_ends_on_comma() {
        let mut cur = Cursor::new(b"hello,world\r");
        let mut buf: String<16> = String::new();
        cur.read_string(&mut buf, true);
        assert_eq!(buf.as_str(), "hello");
        assert_eq!(cur.rest(), b"world\r");
    }

    #[test]
    fn ip_round_trip_quoted_and_bare() {
        for input in [&b"\"192.168.0.17\""[..], &b"192.168.0.17"[..]] {
            let mut cur = Cursor::new(input);
            assert_eq!(cur.ip(), IpV4([192, 168, 0, 17]));
        }
    }

    #[test]
    fn mac_round_trip_case_insensitive() {
        let mut cur = Cursor::new(b"\"aa:BB:cc:DD:ee:FF\",");
        assert_eq!(cur.mac(), Mac([0xAA, 0xBB, 0xCC, 0xDD, 0xEE, 0xFF]));
        assert!(cur.at_end());
    }

    #[test]
    fn datetime_year_bias_and_timezone_trim() {
        let mut cur = Cursor::new(b"\"21/07/15,10:20:30+04\"\r");
        let dt = cur.datetime();
        assert_eq!(
            dt,
            DateTime {
                year: 2015,
                month: 7,
                day: 21,
                hour: 10,
                minute: 20,
                second: 30,
            }
        );
        assert!(dt.year >= 2000);
        assert_eq!(cur.rest(), b"\r");
    }

    #[test]
    fn memory_token_first_match_and_unknown() {
        let mut cur = Cursor::new(b",\"ME\",5");
        assert_eq!(cur.memory(), MemoryKind::Me);
        assert_eq!(cur.number(), 5);

        let mut cur = Cursor::new(b"\"XX\",5");
        assert_eq!(cur.memory(), MemoryKind::Unknown);
        assert_eq!(cur.number(), 5);
    }

    #[test]
    fn memory_list_sets_exactly_the_listed_bits() {
        let mut cur = Cursor::new(b"(\"SM\",\"ME\",\"ON\")");
        let set = cur.memory_list();
        assert!(set.contains(MemoryKind::Sm));
        assert!(set.contains(MemoryKind::Me));
        assert!(set.contains(MemoryKind::On));
        assert!(!set.contains(MemoryKind::Mt));
        assert!(!set.contains(MemoryKind::Bm));
        assert!(!set.contains(MemoryKind::Sr));
    }

    #[test]
    fn sms_status_tokens() {
        let mut cur = Cursor::new(b"\"REC UNREAD\",");
        assert_eq!(cur.sms_status(), Some(SmsStatus::Unread));

        let mut cur = Cursor::new(b"\"STO SENT\"\r");
        assert_eq!(cur.sms_status(), Some(SmsStatus::Sent));

        let mut cur = Cursor::new(b"\"GARBAGE\",");
        assert_eq!(cur.sms_status(), None);
    }

    #[test]
    fn cursor_is_monotonic_on_junk() {
        let junk: &[&[u8]] = &[
            b"",
            b",",
            b"\"",
            b"\r\n",
            b"((((",
            b"::::",
            b"\xff\xfe\x01",
            b"no digits here",
        ];
        for input in junk {
            let run = |f: &dyn Fn(&mut Cursor)| {
                let mut cur = Cursor::new(input);
                let before = cur.pos();
                f(&mut cur);
                assert!(cur.pos() >= before);
                assert!(cur.pos() <= input.len());
            };
            run(&|c| {
                c.number();
            });
            run(&|c| {
                c.hex_number();
            });
            run(&|c| {
                c.skip_string();
            });
            run(&|c| {
                c.ip();
            });
            run(&|c| {
                c.mac();
            });
            run(&|c| {
                c.datetime();
            });
            run(&|c| {
                c.memory();
            });
            run(&|c| {
                c.memory_list();
            });
            run(&|c| {
                c.sms_status();
            });
        }
    }
}
