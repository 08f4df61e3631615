use std::fmt;

use nom::{
    bytes::complete::tag_no_case,
    character::complete::{anychar, hex_digit1, space0, space1},
    combinator::{eof, map_res, opt},
    sequence::preceded,
    IResult,
};
use thiserror::Error;

use crate::{addr::Addr, common::Operation};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TraceRecord {
    pub op: Operation,
    pub addr: u32,
}

impl fmt::Display for TraceRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.op, Addr::new(self.addr))
    }
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum TraceError {
    #[error("line {line}: expected `<r|w> <hex address>`, found `{content}`")]
    Malformed { line: usize, content: String },
    #[error("line {line}: unknown operation `{op}`")]
    UnknownOperation { line: usize, op: char },
}

/// memory operations in trace order.
#[derive(Debug, Default, Clone)]
pub struct Trace {
    records: Vec<TraceRecord>,
}

fn hex_u32(input: &str) -> IResult<&str, u32> {
    preceded(
        opt(tag_no_case("0x")),
        map_res(hex_digit1, |h| u32::from_str_radix(h, 16)),
    )(input)
}

/// `<op> <address>` with free surrounding blanks. the operation is returned raw
/// so that an unknown one can be told apart from a malformed line.
fn record(input: &str) -> IResult<&str, (char, u32)> {
    let (input, _) = space0(input)?;
    let (input, op) = anychar(input)?;
    let (input, _) = space1(input)?;
    let (input, addr) = hex_u32(input)?;
    let (input, _) = space0(input)?;
    let (input, _) = eof(input)?;
    Ok((input, (op, addr)))
}

impl Trace {
    /// parses a whole trace. blank lines are skipped; the first bad line aborts.
    pub fn parse(trace_str: &str) -> Result<Self, TraceError> {
        let mut records = Vec::new();
        for (index, content) in trace_str.lines().enumerate() {
            let line = index + 1;
            if content.trim().is_empty() {
                continue;
            }
            let Ok((_, (op, addr))) = record(content) else {
                return Err(TraceError::Malformed {
                    line,
                    content: content.to_owned(),
                });
            };
            let op = u8::try_from(op)
                .ok()
                .and_then(|b| Operation::try_from(b).ok())
                .ok_or(TraceError::UnknownOperation { line, op })?;
            records.push(TraceRecord { op, addr });
        }
        Ok(Self { records })
    }
    pub fn records(&self) -> &[TraceRecord] {
        &self.records
    }
    pub fn len(&self) -> usize {
        self.records.len()
    }
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
