use std::fmt;

use crate::error::ParseError;

/// Single character splitting a line into key and value.
///
/// Stored pre-encoded so that lookups work on raw bytes. A multi-byte
/// character can only match at a character boundary, since UTF-8 is
/// self-synchronizing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Separator {
    ch: char,
    buf: [u8; 4],
    len: usize,
}

impl Separator {
    pub fn new(ch: char) -> Self {
        let mut buf = [0; 4];
        let len = ch.encode_utf8(&mut buf).len();
        Separator { ch, buf, len }
    }

    pub fn as_char(&self) -> char {
        self.ch
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf[..self.len]
    }

    #[inline]
    pub fn find(&self, line: &[u8]) -> Option<usize> {
        if self.len == 1 {
            memchr::memchr(self.buf[0], line)
        } else {
            memchr::memmem::find(line, self.as_bytes())
        }
    }
}

impl Default for Separator {
    fn default() -> Self {
        Separator::new(';')
    }
}

impl fmt::Display for Separator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.ch)
    }
}

/// Strips the line terminator left over by a line splitter.
#[inline]
pub fn trim_eol(line: &[u8]) -> &[u8] {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    line.strip_suffix(b"\r").unwrap_or(line)
}

/// Splits `line` at the first separator and parses the value.
///
/// The value is taken verbatim, so surrounding whitespace makes it invalid.
/// NaN and infinities are rejected; every other float is an ordinary
/// observation.
#[inline]
pub fn parse_line<'a>(line: &'a [u8], separator: &Separator) -> Result<(&'a str, f64), ParseError> {
    let pos = separator
        .find(line)
        .ok_or(ParseError::MissingSeparator(separator.as_char()))?;
    let key = std::str::from_utf8(&line[..pos]).map_err(|_| ParseError::InvalidKey)?;
    let raw = &line[pos + separator.as_bytes().len()..];
    let value = fast_float::parse::<f64, _>(raw)
        .map_err(|_| ParseError::InvalidValue(String::from_utf8_lossy(raw).into_owned()))?;
    if !value.is_finite() {
        return Err(ParseError::NonFinite(String::from_utf8_lossy(raw).into_owned()));
    }
    Ok((key, value))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn semi() -> Separator {
        Separator::default()
    }

    #[test]
    fn splits_on_first_separator() {
        assert_eq!(parse_line(b"Paris;10.0", &semi()), Ok(("Paris", 10.0)));
        assert_eq!(
            parse_line(b"a;b;1", &semi()),
            Err(ParseError::InvalidValue("b;1".to_string()))
        );
    }

    #[test]
    fn parses_signed_and_exponent_values() {
        assert_eq!(parse_line(b"X;-5.0", &semi()), Ok(("X", -5.0)));
        assert_eq!(parse_line(b"X;0", &semi()), Ok(("X", 0.0)));
        assert_eq!(parse_line(b"X;1e308", &semi()), Ok(("X", 1e308)));
        assert_eq!(parse_line(b"X;-2.5E-3", &semi()), Ok(("X", -0.0025)));
    }

    #[test]
    fn key_may_be_empty_or_contain_spaces() {
        assert_eq!(parse_line(b";1.5", &semi()), Ok(("", 1.5)));
        assert_eq!(parse_line(b"New York;1.5", &semi()), Ok(("New York", 1.5)));
    }

    #[test]
    fn missing_separator() {
        assert_eq!(
            parse_line(b"Berlin", &semi()),
            Err(ParseError::MissingSeparator(';'))
        );
    }

    #[test]
    fn rejects_bad_values() {
        assert_eq!(
            parse_line(b"Berlin;notanumber", &semi()),
            Err(ParseError::InvalidValue("notanumber".to_string()))
        );
        assert_eq!(
            parse_line(b"Berlin;", &semi()),
            Err(ParseError::InvalidValue(String::new()))
        );
        assert_eq!(
            parse_line(b"Berlin; 1.0", &semi()),
            Err(ParseError::InvalidValue(" 1.0".to_string()))
        );
        assert!(matches!(
            parse_line(b"Berlin;NaN", &semi()),
            Err(ParseError::NonFinite(_))
        ));
        assert!(matches!(
            parse_line(b"Berlin;-inf", &semi()),
            Err(ParseError::NonFinite(_))
        ));
    }

    #[test]
    fn rejects_non_utf8_key() {
        assert_eq!(
            parse_line(b"\xff\xfe;1.0", &semi()),
            Err(ParseError::InvalidKey)
        );
    }

    #[test]
    fn custom_separators() {
        let comma = Separator::new(',');
        assert_eq!(parse_line(b"k,2", &comma), Ok(("k", 2.0)));

        let arrow = Separator::new('→');
        assert_eq!(arrow.as_bytes().len(), 3);
        assert_eq!(parse_line("Köln→7.25".as_bytes(), &arrow), Ok(("Köln", 7.25)));
    }

    #[test]
    fn key_outlives_the_separator() {
        let line = b"Lyon;12.5".to_vec();
        let (key, value) = {
            let separator = Separator::new(';');
            parse_line(&line, &separator).unwrap()
        };
        assert_eq!((key, value), ("Lyon", 12.5));
    }

    #[test]
    fn trims_line_endings() {
        assert_eq!(trim_eol(b"a;1\r\n"), b"a;1");
        assert_eq!(trim_eol(b"a;1\n"), b"a;1");
        assert_eq!(trim_eol(b"a;1"), b"a;1");
    }
}
