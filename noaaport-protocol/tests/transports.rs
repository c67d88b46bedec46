//! Both transports must produce identical records for the same bulletin.

use noaaport_rs_protocol::pdi::{FLAG_ABORT, FLAG_DATA, FLAG_HEADER, FLAG_TAIL, HEADER_FRAME_LEN};
use noaaport_rs_protocol::time::{self, Clock};
use noaaport_rs_protocol::wmo::{ETX, HEADER_END, MAX_BODY_LEN, SOH};
use noaaport_rs_protocol::{DcpRecord, ParserConfig, PdiFrameParser, WmoDcpParser};

fn config(day_of_year: u16) -> ParserConfig {
    ParserConfig {
        clock: Clock::Fixed(time::from_day_of_year(2026, day_of_year, 13, 0, 0).unwrap()),
        ..ParserConfig::default()
    }
}

fn bulletins() -> Vec<(Vec<u8>, Vec<u8>)> {
    vec![
        (
            b"SXMN20 KWAL 051200\r\r\n".to_vec(),
            b"CE40A1F2 005120000:HG 0 12.34 :TA 0 56.7 39+0NN 042E\r\n".to_vec(),
        ),
        (
            b"SRWUS KWAL 1234567890".to_vec(),
            b"1740B2C4 360235959 binary\x7f\x80 data 45-1NP 186W".to_vec(),
        ),
        (
            b"SXPA41 KWAL 051201".to_vec(),
            [&b"DD8A0A0E 004000001   7W"[..], b"51+2LN   7W"].concat(),
        ),
    ]
}

fn direct_stream(header: &[u8], body: &[u8]) -> Vec<u8> {
    let mut out = vec![SOH];
    out.extend_from_slice(header);
    out.push(HEADER_END);
    out.extend_from_slice(body);
    out.push(ETX);
    out
}

fn pdi_stream(header: &[u8], body: &[u8], chunk: usize) -> Vec<u8> {
    let mut bulletin = header.to_vec();
    bulletin.push(HEADER_END);
    bulletin.extend_from_slice(body);

    let mut out = vec![FLAG_HEADER];
    out.extend(std::iter::repeat_n(b' ', HEADER_FRAME_LEN));
    for part in bulletin.chunks(chunk) {
        out.push(FLAG_DATA);
        out.extend_from_slice(format!("{:04}", part.len()).as_bytes());
        out.extend_from_slice(part);
    }
    out.push(FLAG_TAIL);
    out
}

fn direct(header: &[u8], body: &[u8]) -> Vec<DcpRecord> {
    WmoDcpParser::new(config(5)).feed_all(&direct_stream(header, body))
}

#[test]
fn pdi_matches_direct() {
    for (header, body) in bulletins() {
        let expected = direct(&header, &body);
        assert_eq!(expected.len(), 1, "direct parse of {:?}", String::from_utf8_lossy(&header));

        for chunk in [1, 3, 16, 64, 9999] {
            let mut pdi = PdiFrameParser::new(config(5));
            let records = pdi.feed_all(&pdi_stream(&header, &body, chunk)).unwrap();
            assert_eq!(records, expected, "chunk size {chunk}");
        }
    }
}

fn body_of_len(len: usize) -> Vec<u8> {
    let head = b"CE40A1F2 005120000";
    let tail = b"39+0NN 042E";
    let mut body = head.to_vec();
    body.extend(std::iter::repeat_n(b'x', len - head.len() - tail.len()));
    body.extend_from_slice(tail);
    body
}

#[test]
fn largest_body_accepted_by_both() {
    let header = b"SXMN20 KWAL 051200";
    let body = body_of_len(MAX_BODY_LEN - 1);
    let expected = direct(header, &body);
    assert_eq!(expected.len(), 1);

    let mut pdi = PdiFrameParser::new(config(5));
    let records = pdi.feed_all(&pdi_stream(header, &body, 9999)).unwrap();
    assert_eq!(records, expected);
    assert_eq!(pdi.stats().parse_errors, 0);
}

#[test]
fn oversized_body_rejected_by_both() {
    let header = b"SXMN20 KWAL 051200";
    let body = body_of_len(MAX_BODY_LEN);

    let mut wmo = WmoDcpParser::new(config(5));
    assert!(wmo.feed_all(&direct_stream(header, &body)).is_empty());
    assert_eq!(wmo.stats().parse_errors, 1);

    let mut pdi = PdiFrameParser::new(config(5));
    assert!(pdi.feed_all(&pdi_stream(header, &body, 9999)).unwrap().is_empty());
    assert_eq!(pdi.stats().parse_errors, 1);
}

#[test]
fn mixed_stream_of_frames() {
    let all = bulletins();
    let mut pdi_bytes = Vec::new();
    let mut direct_bytes = Vec::new();
    for (header, body) in &all {
        pdi_bytes.extend(pdi_stream(header, body, 10));
        // An aborted partial bulletin between good ones.
        pdi_bytes.push(FLAG_DATA);
        pdi_bytes.extend_from_slice(b"0005SXMN2");
        pdi_bytes.push(FLAG_ABORT);
        direct_bytes.extend(direct_stream(header, body));
    }

    let from_pdi = PdiFrameParser::new(config(5)).feed_all(&pdi_bytes).unwrap();
    let from_direct = WmoDcpParser::new(config(5)).feed_all(&direct_bytes);
    assert_eq!(from_pdi.len(), all.len());
    assert_eq!(from_pdi, from_direct);
}

#[test]
fn year_inference_through_parser() {
    let (header, body) = &bulletins()[1];
    let records = direct(header, body);
    // Day 360 seen on day 5 belongs to the previous year.
    assert_eq!(&records[0].as_bytes()[8..13], b"25360");
    assert_eq!(records[0].failure_code(), '?');
    assert_eq!(records[0].spacecraft(), 'W');
    assert_eq!(records[0].data(), b" binary\x7f\x80 data ");
}

#[test]
fn address_and_payload_property() {
    for (header, body) in bulletins() {
        let rec = &direct(&header, &body)[0];
        assert_eq!(rec.address().as_bytes(), &body[..8]);
        let trimmed_len = body.iter().rposition(|b| !b.is_ascii_whitespace()).unwrap() + 1;
        assert_eq!(rec.data(), &body[18..trimmed_len - 11]);
        assert_eq!(rec.len(), 37 + rec.data().len());
    }
}
