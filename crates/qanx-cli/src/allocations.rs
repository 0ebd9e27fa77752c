//! CSV allocation lists for batch distribution
//!
//! One row per recipient:
//!
//! ```text
//! recipient,amount[,hard_lock_until,soft_lock_until,allowed_hops]
//! ```
//!
//! Amounts are decimal token quantities. Lock dates are `YYYY-MM-DD` or UNIX
//! timestamps. A leading header row starting with `recipient` is skipped.

use std::io::Read;
use std::path::Path;

use qanx_core::distribution::{Allocation, DistributionReport};
use qanx_core::types::{format_units, hops_from_signed, parse_units};
use qanx_core::{Address, LockTerms};
use serde::Serialize;

use crate::error::{CliError, Result};
use crate::time::parse_time;

pub fn load_allocations(path: &Path, decimals: u8) -> Result<Vec<Allocation>> {
    let file = std::fs::File::open(path)?;
    read_allocations(file, decimals)
}

pub fn read_allocations<R: Read>(reader: R, decimals: u8) -> Result<Vec<Allocation>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .comment(Some(b'#'))
        .from_reader(reader);

    let mut allocations = Vec::new();
    for (i, record) in rdr.records().enumerate() {
        let record = record?;
        let line = record.position().map_or(i as u64 + 1, |p| p.line());

        if i == 0 && record.get(0).is_some_and(|f| f.eq_ignore_ascii_case("recipient")) {
            continue;
        }
        allocations.push(parse_row(&record, decimals).map_err(|reason| CliError::InvalidRow {
            line,
            reason,
        })?);
    }
    Ok(allocations)
}

fn parse_row(record: &csv::StringRecord, decimals: u8) -> std::result::Result<Allocation, String> {
    let field = |i: usize| record.get(i).filter(|f| !f.is_empty());

    let recipient: Address = field(0)
        .ok_or("missing recipient")?
        .parse()
        .map_err(|e: qanx_core::Error| e.to_string())?;
    let amount = parse_units(field(1).ok_or("missing amount")?, decimals)
        .map_err(|e| e.to_string())?;

    let lock = match (field(2), field(3)) {
        (None, None) => None,
        (Some(hard), Some(soft)) => {
            let hops = match field(4) {
                Some(h) => {
                    let raw: i64 = h.parse().map_err(|_| format!("invalid hops '{}'", h))?;
                    hops_from_signed(raw).map_err(|e| e.to_string())?
                }
                None => 0,
            };
            Some(LockTerms::new(
                parse_time(hard).map_err(|e| e.to_string())?,
                parse_time(soft).map_err(|e| e.to_string())?,
                hops,
            ))
        }
        _ => return Err("hard and soft lock dates must be given together".into()),
    };

    Ok(Allocation {
        recipient,
        amount,
        lock,
    })
}

#[derive(Serialize)]
struct ReportRow {
    row: usize,
    recipient: String,
    amount: String,
    status: String,
}

/// Render a distribution report as CSV
pub fn report_csv(report: &DistributionReport, decimals: u8) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    for outcome in &report.rows {
        wtr.serialize(ReportRow {
            row: outcome.index,
            recipient: outcome.allocation.recipient.to_checksum(),
            amount: format_units(outcome.allocation.amount, decimals),
            status: outcome.error.clone().unwrap_or_else(|| "ok".to_string()),
        })?;
    }
    let bytes = wtr
        .into_inner()
        .map_err(|e| CliError::Serialization(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| CliError::Serialization(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOKEN: u128 = 1_000_000_000_000_000_000;

    #[test]
    fn test_read_mixed_rows() {
        let csv = "\
recipient,amount,hard_lock_until,soft_lock_until,allowed_hops
0x1111111111111111111111111111111111111111,1234.56
# vesting tranche
0x2222222222222222222222222222222222222222,100,2030-01-01,2031-01-01,2
0x3333333333333333333333333333333333333333,5,1900000000,1900000100
";
        let rows = read_allocations(csv.as_bytes(), 18).unwrap();
        assert_eq!(rows.len(), 3);

        assert_eq!(rows[0].recipient, Address::new([0x11; 20]));
        assert_eq!(rows[0].amount, 1_234_560_000_000_000_000_000);
        assert!(rows[0].lock.is_none());

        let lock = rows[1].lock.unwrap();
        assert_eq!(rows[1].amount, 100 * TOKEN);
        assert_eq!(lock.hard_lock_until, 1_893_456_000);
        assert_eq!(lock.soft_lock_until, 1_924_992_000);
        assert_eq!(lock.allowed_hops, 2);

        assert_eq!(rows[2].lock.unwrap().allowed_hops, 0);
    }

    #[test]
    fn test_bad_rows_report_line() {
        let csv = "0x1111111111111111111111111111111111111111,1\n0xzz,1\n";
        assert!(matches!(
            read_allocations(csv.as_bytes(), 18),
            Err(CliError::InvalidRow { line: 2, .. })
        ));

        let csv = "0x1111111111111111111111111111111111111111,1,2030-01-01\n";
        assert!(read_allocations(csv.as_bytes(), 18).is_err());

        let csv = "0x1111111111111111111111111111111111111111,1,2030-01-01,2031-01-01,-1\n";
        assert!(read_allocations(csv.as_bytes(), 18).is_err());
    }

    #[test]
    fn test_report_csv() {
        let report = DistributionReport {
            rows: vec![qanx_core::distribution::RowOutcome {
                index: 0,
                allocation: Allocation::unlocked(Address::new([0x11; 20]), 15 * TOKEN / 10),
                error: None,
            }],
            events: vec![],
        };
        let out = report_csv(&report, 18).unwrap();
        let mut lines = out.lines();
        assert_eq!(lines.next(), Some("row,recipient,amount,status"));
        assert!(lines.next().unwrap().ends_with(",1.5,ok"));
    }
}
