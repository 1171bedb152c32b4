//! Parser for the TI-TXT image format.
//!
//! ```text
//! @F860
//! 12 34 56 78 9A BC DE F0
//! @F998
//! 00 00 00 00 01 80 00 00
//! q
//! ```

use std::collections::BTreeMap;

/// Section data by start address.
pub(crate) type Sections = BTreeMap<u32, Vec<u8>>;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub(crate) enum ParseError {
    #[error("Unexpected token {token:?} on line {line}")]
    UnexpectedToken { token: String, line: usize },

    #[error("Invalid section address {0:?}")]
    InvalidAddress(String),

    #[error("Section at {0:#06x} is defined twice")]
    DuplicateSection(u32),

    #[error("Input is not terminated by 'q'")]
    Unterminated,
}

enum State {
    Initial,
    Section { address: u32, data: Vec<u8> },
    Done,
}

pub(crate) fn parse(text: &str) -> Result<Sections, ParseError> {
    let mut sections = Sections::new();
    let mut state = State::Initial;

    for (line, token) in text
        .lines()
        .enumerate()
        .flat_map(|(i, l)| l.split_whitespace().map(move |t| (i + 1, t)))
    {
        state = match (state, token) {
            (State::Done, _) => {
                return Err(ParseError::UnexpectedToken {
                    token: token.into(),
                    line,
                })
            }
            (previous, "q") => {
                save_section(&mut sections, previous)?;
                State::Done
            }
            (previous, _) if token.starts_with('@') => {
                save_section(&mut sections, previous)?;
                State::Section {
                    address: parse_address(&token[1..])?,
                    data: Vec::new(),
                }
            }
            (State::Section { address, mut data }, _) if is_byte(token) => {
                data.push(u8::from_str_radix(token, 16).map_err(|_| {
                    ParseError::UnexpectedToken {
                        token: token.into(),
                        line,
                    }
                })?);
                State::Section { address, data }
            }
            _ => {
                return Err(ParseError::UnexpectedToken {
                    token: token.into(),
                    line,
                })
            }
        };
    }

    match state {
        State::Done => Ok(sections),
        _ => Err(ParseError::Unterminated),
    }
}

fn save_section(sections: &mut Sections, state: State) -> Result<(), ParseError> {
    if let State::Section { address, data } = state {
        if sections.insert(address, data).is_some() {
            return Err(ParseError::DuplicateSection(address));
        }
    }
    Ok(())
}

fn parse_address(digits: &str) -> Result<u32, ParseError> {
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(ParseError::InvalidAddress(digits.into()));
    }
    u32::from_str_radix(digits, 16).map_err(|_| ParseError::InvalidAddress(digits.into()))
}

fn is_byte(token: &str) -> bool {
    token.len() == 2 && token.chars().all(|c| c.is_ascii_hexdigit())
}
