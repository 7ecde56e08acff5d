//! Inclusive `start:end` memory range requests, validated against a memory size before any
//! memory is read.

use std::fmt::{Display, Formatter};

use nom::{
  character::complete::{char as one_char, digit1},
  combinator::all_consuming,
  sequence::separated_pair,
  IResult
};

use crate::error::RangeError;

/// An inclusive, non-empty range of memory cells known to fit the memory it was checked against.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash)]
pub struct MemoryRange {
  start : usize,
  end   : usize,
}

fn range_p(input: &str) -> IResult<&str, (&str, &str)> {
  all_consuming(separated_pair(digit1, one_char(':'), digit1))(input)
}

impl MemoryRange {
  pub fn new(start: usize, end: usize, memory_size: usize) -> Result<MemoryRange, RangeError> {
    let range = MemoryRange { start, end };
    range.check(memory_size)?;
    Ok(range)
  }

  /// Parses a request of the form `start:end`, both non-negative decimal integers.
  pub fn parse(request: &str, memory_size: usize) -> Result<MemoryRange, RangeError> {
    let invalid = |reason: &str| RangeError::InvalidRangeRequest {
      request: request.to_string(),
      reason: reason.to_string()
    };

    let (start, end) = match range_p(request) {
      Ok((_, (start, end))) => (start, end),
      Err(_) => return Err(invalid("expected the form start:end"))
    };
    let start = start.parse::<usize>().map_err(|_| invalid("start is too large"))?;
    let end   = end.parse::<usize>().map_err(|_| invalid("end is too large"))?;

    MemoryRange::new(start, end, memory_size)
      .map_err(|_| invalid(&bounds_reason(start, end, memory_size)))
  }

  /// Checks that `start <= end < memory_size`.
  pub fn check(&self, memory_size: usize) -> Result<(), RangeError> {
    if self.start <= self.end && self.end < memory_size {
      return Ok(());
    }
    Err(RangeError::InvalidRangeRequest {
      request: self.to_string(),
      reason: bounds_reason(self.start, self.end, memory_size)
    })
  }

  pub fn start(&self) -> usize {
    self.start
  }

  pub fn end(&self) -> usize {
    self.end
  }

  /// Number of cells covered. Never zero.
  pub fn len(&self) -> usize {
    self.end - self.start + 1
  }
}

fn bounds_reason(start: usize, end: usize, memory_size: usize) -> String {
  match start > end {
    true  => format!("start {} is greater than end {}", start, end),
    false => format!("end {} is outside memory of size {}", end, memory_size)
  }
}

impl Display for MemoryRange {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}:{}", self.start, self.end)
  }
}
