//! Prometheus text format parser
//!
//! Just enough of the text exposition format to recover metric names and
//! their labels. Sample values are checked for shape but otherwise ignored.
//! <https://github.com/prometheus/docs/blob/main/content/docs/instrumenting/exposition_formats.md>

/// Type alias for label pairs
pub type LabelPairs = Vec<(String, String)>;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
/// Errors that can occur while parsing Prometheus text format
pub enum ParseError {
    /// Invalid format in the line
    #[error("invalid format: {0}")]
    InvalidFormat(String),
    /// Invalid value that cannot be parsed as a number
    #[error("invalid value: {0}")]
    InvalidValue(String),
    /// Missing value in metric line
    #[error("missing value")]
    MissingValue,
    /// Missing name in metric line
    #[error("missing metric name")]
    MissingName,
    /// Invalid label format
    #[error("invalid label: {0}")]
    InvalidLabel(String),
}

#[derive(Debug, Clone, PartialEq)]
/// One sample line of an exposition.
pub struct ParsedLine {
    /// The metric name
    pub name: String,
    /// The labels, in the order they appear
    pub labels: LabelPairs,
}

/// Parse every sample line of `text`. Comments and blank lines yield
/// nothing.
pub fn parse_text(text: &str) -> impl Iterator<Item = Result<ParsedLine, ParseError>> + '_ {
    text.lines().filter_map(parse_line)
}

/// Parse a single line.
#[must_use]
pub fn parse_line(line: &str) -> Option<Result<ParsedLine, ParseError>> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return None;
    }
    Some(parse_metric_line(line))
}

fn parse_metric_line(line: &str) -> Result<ParsedLine, ParseError> {
    let (name, rest) = match line.find(|c: char| c == '{' || c.is_whitespace()) {
        Some(idx) => line.split_at(idx),
        None => return Err(ParseError::MissingValue),
    };
    if name.is_empty() {
        return Err(ParseError::MissingName);
    }

    let (labels, rest) = if let Some(inner) = rest.strip_prefix('{') {
        parse_labels(inner)?
    } else {
        (Vec::new(), rest)
    };
    check_value(rest)?;

    Ok(ParsedLine {
        name: name.to_string(),
        labels,
    })
}

/// Parse `name="value",...}` and return the labels and the text after the
/// closing brace.
fn parse_labels(input: &str) -> Result<(LabelPairs, &str), ParseError> {
    let mut labels = Vec::new();
    let mut rest = input.trim_start();

    loop {
        if let Some(after) = rest.strip_prefix('}') {
            return Ok((labels, after));
        }
        let (name, after_name) = rest
            .split_once('=')
            .ok_or_else(|| ParseError::InvalidLabel(format!("label missing '=': {rest}")))?;
        let name = name.trim();
        if name.is_empty() {
            return Err(ParseError::InvalidLabel("empty label key".to_string()));
        }
        let (value, after_value) = parse_label_value(after_name.trim_start())?;
        labels.push((name.to_string(), value));

        rest = after_value.trim_start();
        if let Some(after_comma) = rest.strip_prefix(',') {
            rest = after_comma.trim_start();
        } else if !rest.starts_with('}') {
            return Err(ParseError::InvalidFormat(
                "unclosed labels bracket".to_string(),
            ));
        }
    }
}

/// Parse a quoted label value, unescaping `\\`, `\"` and `\n`, and return it
/// with the text after the closing quote.
fn parse_label_value(input: &str) -> Result<(String, &str), ParseError> {
    let inner = input
        .strip_prefix('"')
        .ok_or_else(|| ParseError::InvalidLabel("label value must be quoted".to_string()))?;

    let mut value = String::new();
    let mut chars = inner.char_indices();
    while let Some((idx, ch)) = chars.next() {
        match ch {
            '"' => return Ok((value, &inner[idx + 1..])),
            '\\' => match chars.next() {
                Some((_, '\\')) => value.push('\\'),
                Some((_, '"')) => value.push('"'),
                Some((_, 'n')) => value.push('\n'),
                Some((_, c)) => {
                    return Err(ParseError::InvalidLabel(format!(
                        "invalid escape sequence: \\{c}"
                    )));
                }
                None => break,
            },
            c => value.push(c),
        }
    }
    Err(ParseError::InvalidLabel(
        "label value quotes not properly paired".to_string(),
    ))
}

fn check_value(input: &str) -> Result<(), ParseError> {
    let mut parts = input.split_whitespace();
    let value = parts.next().ok_or(ParseError::MissingValue)?;
    match value {
        "NaN" | "+Inf" | "-Inf" => {}
        _ => {
            value
                .parse::<f64>()
                .map_err(|_| ParseError::InvalidValue(value.to_string()))?;
        }
    }
    if let Some(ts) = parts.next() {
        ts.parse::<f64>()
            .map_err(|_| ParseError::InvalidFormat(format!("invalid timestamp: {ts}")))?;
    }
    Ok(())
}
