/*!
  The human readable textual form of bytecode is called assembly. One instruction per line: a
  case-insensitive mnemonic followed by decimal operands, separated by whitespace. `#` starts a
  comment that runs to the end of the line.

  Assembly is a fail-fast batch job. The first bad line stops everything, and no partial image is
  ever returned.
*/

use nom::{
  bytes::complete::{take_till1, take_while, take_while1},
  character::complete::char as one_char,
  combinator::{all_consuming, opt, rest},
  multi::many0,
  sequence::{delimited, pair, preceded},
  IResult
};
use std::num::IntErrorKind;
use tracing::debug;

use super::{encode_instruction, Instruction, Operand, Operation, Trace, TraceEntry};
use crate::error::{AssemblyError, BytecodeError};

/// A non-blank line of assembly split into tokens, not yet interpreted.
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct SourceLine<'a> {
  /// 1-based line number
  pub line     : usize,
  pub mnemonic : &'a str,
  pub operands : Vec<&'a str>,
}

/// The output of a successful assembly.
#[derive(Clone, Default, Eq, PartialEq, Debug)]
pub struct Assembly {
  pub image : Vec<u8>,
  pub trace : Trace,
}

// region Parsers

fn whitespace(input: &str) -> IResult<&str, &str> {
  take_while1(char::is_whitespace)(input)
}

fn token(input: &str) -> IResult<&str, &str> {
  take_till1(|c: char| c.is_whitespace() || c == '#')(input)
}

fn comment(input: &str) -> IResult<&str, &str> {
  preceded(one_char('#'), rest)(input)
}

/// `[mnemonic {operand}] [# comment]`, with whitespace anywhere between tokens.
fn line_p(input: &str) -> IResult<&str, Option<(&str, Vec<&str>)>> {
  all_consuming(
    delimited(
      take_while(char::is_whitespace),
      opt(pair(token, many0(preceded(whitespace, token)))),
      pair(take_while(char::is_whitespace), opt(comment))
    )
  )(input)
}

// endregion

/// Splits one line into tokens. Blank and comment-only lines give `None`.
pub fn parse_line(line: usize, text: &str) -> Result<Option<SourceLine<'_>>, AssemblyError> {
  match line_p(text) {
    Ok((_, parsed)) => Ok(parsed.map(|(mnemonic, operands)| SourceLine { line, mnemonic, operands })),
    Err(e) => Err(AssemblyError::Syntax { line, reason: e.to_string() })
  }
}

fn parse_operand(line: usize, token: &str) -> Result<Operand, AssemblyError> {
  token.parse::<Operand>().map_err(|e| {
    let reason = match e.kind() {
      | IntErrorKind::PosOverflow
      | IntErrorKind::NegOverflow => format!("operand '{}' does not fit in any field", token),
      _ => format!("operand '{}' is not a decimal integer", token)
    };
    AssemblyError::Syntax { line, reason }
  })
}

/// Resolves a tokenized line to an instruction, checking mnemonic, operand count, operand syntax,
/// and operand ranges in that order.
pub fn resolve_line(source: &SourceLine<'_>) -> Result<Instruction, AssemblyError> {
  let line = source.line;
  let encoding_error = |error: BytecodeError| AssemblyError::Encoding { line, error };

  let operation =
    source.mnemonic
          .parse::<Operation>()
          .map_err(|_| encoding_error(BytecodeError::UnknownMnemonic(source.mnemonic.to_uppercase())))?;

  if source.operands.len() != operation.arity() {
    return Err(encoding_error(BytecodeError::OperandCountMismatch {
      operation,
      expected: operation.arity(),
      found: source.operands.len()
    }));
  }

  let operands =
    source.operands
          .iter()
          .map(|token| parse_operand(line, token))
          .collect::<Result<Vec<Operand>, AssemblyError>>()?;

  Instruction::from_operands(operation, &operands).map_err(encoding_error)
}

/// Assembles a whole program. Line numbers in errors and in the trace are 1-based.
pub fn assemble(text: &str) -> Result<Assembly, AssemblyError> {
  assemble_lines(text.lines())
}

pub fn assemble_lines<'a, I>(lines: I) -> Result<Assembly, AssemblyError>
  where I: IntoIterator<Item = &'a str>
{
  let mut assembly = Assembly::default();

  for (index, text) in lines.into_iter().enumerate() {
    let source = match parse_line(index + 1, text)? {
      Some(source) => source,
      None => continue
    };

    let instruction = resolve_line(&source)?;
    let bytes       = encode_instruction(&instruction);
    debug!(line = source.line, offset = assembly.image.len(), %instruction, ?bytes, "assembled");

    assembly.image.extend_from_slice(&bytes);
    assembly.trace.push(TraceEntry::new(source.line, &instruction));
  }

  Ok(assembly)
}


#[cfg(test)]
mod tests {
  use super::*;
  use crate::bytecode::encode;

  #[test]
  fn tokenizes_lines() {
    assert_eq!(parse_line(1, ""), Ok(None));
    assert_eq!(parse_line(2, "   \t "), Ok(None));
    assert_eq!(parse_line(3, "  # just a comment"), Ok(None));
    assert_eq!(
      parse_line(4, "  load_const   10\t0  # r0 = 10"),
      Ok(Some(SourceLine { line: 4, mnemonic: "load_const", operands: vec!["10", "0"] }))
    );
    assert_eq!(
      parse_line(5, "LEQ 0 2 1#no space"),
      Ok(Some(SourceLine { line: 5, mnemonic: "LEQ", operands: vec!["0", "2", "1"] }))
    );
  }

  #[test]
  fn assembles_program() {
    let text = "
# Compare two constants.
LOAD_CONST 10 0
load_const 20 1   # second operand

Leq 0 2 1
";
    let assembly = assemble(text).unwrap();

    let mut expected = encode(Operation::LoadConst, &[10, 0]).unwrap();
    expected.extend(encode(Operation::LoadConst, &[20, 1]).unwrap());
    expected.extend(encode(Operation::Leq, &[0, 2, 1]).unwrap());
    assert_eq!(assembly.image, expected);

    let keys: Vec<String> = assembly.trace.entries().iter().map(TraceEntry::key).collect();
    assert_eq!(keys, vec!["instruction_3", "instruction_4", "instruction_6"]);
    assert_eq!(assembly.trace.entries()[1].mnemonic, "LOAD_CONST");
    assert_eq!(assembly.trace.entries()[2].d, Some(1));
  }

  #[test]
  fn deterministic() {
    let text = "LOAD_CONST 5 0\nWRITE_MEM 0 0 3\nREAD_MEM 1 1\n";
    let first  = assemble(text).unwrap();
    let second = assemble(text).unwrap();
    assert_eq!(first, second);
    assert_eq!(first.trace.to_json().unwrap(), second.trace.to_json().unwrap());
  }

  #[test]
  fn unknown_mnemonic_reports_line() {
    let error = assemble("LOAD_CONST 1 0\n\nJUMP 4\n").unwrap_err();
    assert_eq!(
      error,
      AssemblyError::Encoding { line: 3, error: BytecodeError::UnknownMnemonic("JUMP".to_string()) }
    );
    assert_eq!(error.line(), 3);
  }

  #[test]
  fn encoding_reason_is_reported_once() {
    let error = assemble("LOAD_CONST 1 0\nJUMP 4").unwrap_err();
    assert!(std::error::Error::source(&error).is_none());

    let chained = format!("{:#}", anyhow::Error::new(error));
    assert_eq!(chained, "line 2: unknown mnemonic 'JUMP'");
    assert_eq!(chained.matches("unknown mnemonic").count(), 1);
  }

  #[test]
  fn operand_count_mismatch() {
    assert_eq!(
      assemble("READ_MEM 1 2 3").unwrap_err(),
      AssemblyError::Encoding {
        line: 1,
        error: BytecodeError::OperandCountMismatch {
          operation: Operation::ReadMem,
          expected: 2,
          found: 3
        }
      }
    );
  }

  #[test]
  fn non_integer_operand() {
    assert!(matches!(
      assemble("LOAD_CONST 1 0\nLOAD_CONST ten 0").unwrap_err(),
      AssemblyError::Syntax { line: 2, .. }
    ));
    assert!(matches!(
      assemble("LOAD_CONST 99999999999999999999 0").unwrap_err(),
      AssemblyError::Syntax { line: 1, .. }
    ));
  }

  #[test]
  fn out_of_range_operand() {
    assert!(assemble("LOAD_CONST 2147483647 31").is_ok());
    assert!(matches!(
      assemble("LOAD_CONST 2147483648 0").unwrap_err(),
      AssemblyError::Encoding {
        line: 1,
        error: BytecodeError::OperandOutOfRange { field: "B", width: 31, .. }
      }
    ));
    assert!(matches!(
      assemble("WRITE_MEM 0 0 -1").unwrap_err(),
      AssemblyError::Encoding { error: BytecodeError::OperandOutOfRange { field: "D", value: -1, .. }, .. }
    ));
  }

  #[test]
  fn empty_program() {
    let assembly = assemble("# nothing here\n\n").unwrap();
    assert!(assembly.image.is_empty());
    assert!(assembly.trace.is_empty());
  }
}
