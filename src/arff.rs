//! Text codec for persisted tables.
//!
//! The format is line oriented: an `@relation` line, one `@attribute` line
//! per column, then `@data` followed by one comma-separated row per line.
//! `?` marks a missing value and `%` starts a comment.
//!
//! The format has no field for the class column. It is carried by
//! prefixing the class attribute's declared name with
//! [`CLASS_ATTRIBUTE_PREFIX`] on encode and stripping the prefix on decode.
//! The prefix only ever exists in the written text; the table being
//! encoded is not renamed.
//!
//! Attribute names that already start with the prefix are escaped by
//! doubling every leading copy of it. A written name therefore marks the
//! class column exactly when it starts with an odd number of prefixes.
//!
//! # Examples
//!
//! ```
//! use dataview::{arff, ReadableTable};
//!
//! let text = "\
//! @relation tiny
//!
//! @attribute x numeric
//! @attribute $class$label {a,b}
//!
//! @data
//! 1.5,b
//! ?,a
//! ";
//! let table = arff::decode_str(text).unwrap();
//! assert_eq!(table.len(), 2);
//! assert_eq!(table.class_attribute().unwrap().name(), "label");
//! assert!(arff::encode_to_string(&table).unwrap().contains("@attribute $class$label {a,b}"));
//! ```

use crate::column::{Attribute, AttributeType, Value};
use crate::error::{DatasetError, Result};
use crate::table::{MutableTable, ReadableTable, Row, Schema, Table};
use std::io::{BufRead, Write};

/// Marker prepended to the class attribute's name in the written header.
pub const CLASS_ATTRIBUTE_PREFIX: &str = "$class$";

/// Parse a table from `reader`.
///
/// The first attribute whose name starts with an odd number of
/// [`CLASS_ATTRIBUTE_PREFIX`] copies becomes the class column. Errors in
/// the text are reported as [`DatasetError::Format`] with a 1-based line
/// number.
pub fn decode<R: BufRead>(reader: R) -> Result<Table> {
    let mut relation: Option<String> = None;
    let mut attributes: Vec<Attribute> = Vec::new();
    let mut class_index: Option<usize> = None;
    let mut table: Option<Table> = None;
    let mut last_line = 0;

    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        let line_no = idx + 1;
        last_line = line_no;

        let content = strip_comment(&line).trim();
        if content.is_empty() {
            continue;
        }

        if let Some(data) = table.as_mut() {
            let values = if content.starts_with('{') {
                parse_sparse_row(content, data, line_no)?
            } else {
                parse_dense_row(content, data, line_no)?
            };
            data.push_row_unchecked(Row::new(values));
            continue;
        }

        let (keyword, rest) = content
            .split_once(char::is_whitespace)
            .unwrap_or((content, ""));
        match keyword.to_ascii_lowercase().as_str() {
            "@relation" => {
                if relation.is_some() {
                    return Err(DatasetError::format(line_no, "Duplicate @relation declaration"));
                }
                let (name, _) = next_token(rest, line_no)?;
                relation = Some(name.text);
            }
            "@attribute" => {
                if relation.is_none() {
                    return Err(DatasetError::format(line_no, "Keyword @relation expected"));
                }
                let mut attribute = parse_attribute(rest, line_no)?;
                let (marks, base) = split_class_prefixes(attribute.name());
                let is_class = marks % 2 == 1;
                // A second marked attribute keeps its name as written.
                if marks > 0 && !(is_class && class_index.is_some()) {
                    let name = format!("{}{}", CLASS_ATTRIBUTE_PREFIX.repeat(marks / 2), base);
                    attribute.set_name(name);
                    if is_class {
                        class_index = Some(attributes.len());
                    }
                }
                attributes.push(attribute);
            }
            "@data" => {
                let name = relation
                    .take()
                    .ok_or_else(|| DatasetError::format(line_no, "Keyword @relation expected"))?;
                table = Some(build_table(
                    name,
                    std::mem::take(&mut attributes),
                    class_index,
                )?);
            }
            _ => {
                return Err(DatasetError::format(
                    line_no,
                    format!("Unexpected line in header: '{}'", content),
                ))
            }
        }
    }

    table.ok_or_else(|| DatasetError::format(last_line.max(1), "Missing @data section"))
}

pub fn decode_str(text: &str) -> Result<Table> {
    decode(text.as_bytes())
}

/// Write `table` to `writer`. Rows are written dense, in table order.
///
/// Accepts any readable table, so a view can be persisted as-is.
pub fn encode<T: ReadableTable + ?Sized, W: Write>(table: &T, mut writer: W) -> Result<()> {
    let attributes = table.attributes();
    if attributes.is_empty() {
        return Err(DatasetError::invalid_table(
            "Cannot encode a table without attributes",
        ));
    }
    let class_index = table.class_index();

    writeln!(writer, "@relation {}", quote(&table.relation_name()))?;
    writeln!(writer)?;
    for (i, attr) in attributes.iter().enumerate() {
        let name = written_attribute_name(attr.name(), class_index == Some(i));
        writeln!(writer, "@attribute {} {}", quote(&name), type_declaration(attr.kind()))?;
    }
    writeln!(writer)?;
    writeln!(writer, "@data")?;

    for index in 0..table.len() {
        let row = table.row(index)?;
        let fields = attributes
            .iter()
            .zip(row.values())
            .map(|(attr, value)| encode_value(attr, value))
            .collect::<Result<Vec<_>>>()?;
        writeln!(writer, "{}", fields.join(","))?;
    }
    writer.flush()?;
    Ok(())
}

pub fn encode_to_string<T: ReadableTable + ?Sized>(table: &T) -> Result<String> {
    let mut buf = Vec::new();
    encode(table, &mut buf)?;
    String::from_utf8(buf).map_err(|e| DatasetError::invalid_table(e.to_string()))
}

fn build_table(
    relation: String,
    attributes: Vec<Attribute>,
    class_index: Option<usize>,
) -> Result<Table> {
    if attributes.is_empty() {
        return Err(DatasetError::invalid_table(format!(
            "Relation '{}' declares no attributes",
            relation
        )));
    }
    let mut table = Table::new(relation, Schema::new(attributes)?);
    table.set_class_index(class_index)?;
    Ok(table)
}

/// Number of leading [`CLASS_ATTRIBUTE_PREFIX`] copies and the rest.
fn split_class_prefixes(name: &str) -> (usize, &str) {
    let mut rest = name;
    let mut count = 0;
    while let Some(after) = rest.strip_prefix(CLASS_ATTRIBUTE_PREFIX) {
        rest = after;
        count += 1;
    }
    (count, rest)
}

/// Double the name's own leading prefixes, then add one more for the
/// class column.
fn written_attribute_name(name: &str, is_class: bool) -> String {
    let (own, base) = split_class_prefixes(name);
    let marks = own * 2 + usize::from(is_class);
    format!("{}{}", CLASS_ATTRIBUTE_PREFIX.repeat(marks), base)
}

fn type_declaration(kind: &AttributeType) -> String {
    match kind {
        AttributeType::Numeric => "numeric".to_string(),
        AttributeType::String => "string".to_string(),
        AttributeType::Nominal(labels) => {
            let labels: Vec<String> = labels.iter().map(|l| quote(l)).collect();
            format!("{{{}}}", labels.join(","))
        }
    }
}

fn encode_value(attr: &Attribute, value: &Value) -> Result<String> {
    match value {
        Value::Missing => Ok("?".to_string()),
        Value::Numeric(v) => Ok(v.to_string()),
        Value::Text(s) => Ok(quote(s)),
        Value::Nominal(idx) => attr.label(*idx).map(quote).ok_or_else(|| {
            DatasetError::invalid_table(format!(
                "Label index {} not declared for attribute '{}'",
                idx,
                attr.name()
            ))
        }),
    }
}

/// Single-quote `s` if it would not read back as the same token.
fn quote(s: &str) -> String {
    let needs_quotes = s.is_empty()
        || s == "?"
        || s.chars().any(|c| {
            c.is_whitespace() || matches!(c, ',' | '{' | '}' | '\'' | '"' | '%' | '\\')
        });
    if !needs_quotes {
        return s.to_string();
    }

    let mut out = String::with_capacity(s.len() + 2);
    out.push('\'');
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c => out.push(c),
        }
    }
    out.push('\'');
    out
}

/// Everything before the first `%` that is not inside quotes.
fn strip_comment(line: &str) -> &str {
    let mut quote: Option<char> = None;
    let mut escaped = false;
    for (i, c) in line.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match (quote, c) {
            (Some(_), '\\') => escaped = true,
            (Some(q), c) if c == q => quote = None,
            (None, '\'') | (None, '"') => quote = Some(c),
            (None, '%') => return &line[..i],
            _ => {}
        }
    }
    line
}

/// A name or value as written; `quoted` separates a literal `'?'` from
/// the missing-value marker.
struct Token {
    text: String,
    quoted: bool,
}

/// Read one token from the start of `s`, returning it and the rest of the
/// line. Unquoted tokens end at whitespace, `,`, `{` or `}`.
fn next_token(s: &str, line: usize) -> Result<(Token, &str)> {
    let s = s.trim_start();
    match s.chars().next() {
        None => Err(DatasetError::format(line, "Unexpected end of line")),
        Some(q @ ('\'' | '"')) => read_quoted(s, q, line),
        Some(first) => {
            let end = s
                .find(|c: char| c.is_whitespace() || matches!(c, ',' | '{' | '}'))
                .unwrap_or(s.len());
            if end == 0 {
                return Err(DatasetError::format(line, format!("Unexpected '{}'", first)));
            }
            let token = Token {
                text: s[..end].to_string(),
                quoted: false,
            };
            Ok((token, &s[end..]))
        }
    }
}

fn read_quoted(s: &str, quote: char, line: usize) -> Result<(Token, &str)> {
    let mut text = String::new();
    let mut chars = s.char_indices().skip(1);
    while let Some((i, c)) = chars.next() {
        match c {
            '\\' => match chars.next() {
                Some((_, 'n')) => text.push('\n'),
                Some((_, 'r')) => text.push('\r'),
                Some((_, 't')) => text.push('\t'),
                Some((_, other)) => text.push(other),
                None => break,
            },
            c if c == quote => {
                let token = Token { text, quoted: true };
                return Ok((token, &s[i + c.len_utf8()..]));
            }
            c => text.push(c),
        }
    }
    Err(DatasetError::format(line, "Unterminated quoted value"))
}

fn parse_attribute(rest: &str, line: usize) -> Result<Attribute> {
    let (name, rest) = next_token(rest, line)?;
    let rest = rest.trim();

    if rest.starts_with('{') {
        let labels = parse_label_list(rest, line)?;
        for (i, label) in labels.iter().enumerate() {
            if labels[..i].contains(label) {
                return Err(DatasetError::format(
                    line,
                    format!("Duplicate label '{}' for attribute '{}'", label, name.text),
                ));
            }
        }
        return Ok(Attribute::nominal(name.text, labels));
    }

    let kind = rest.split_whitespace().next().unwrap_or("");
    match kind.to_ascii_lowercase().as_str() {
        "numeric" | "real" | "integer" => Ok(Attribute::numeric(name.text)),
        "string" => Ok(Attribute::string(name.text)),
        "" => Err(DatasetError::format(
            line,
            format!("Missing type for attribute '{}'", name.text),
        )),
        other => Err(DatasetError::format(
            line,
            format!("Unsupported type '{}' for attribute '{}'", other, name.text),
        )),
    }
}

/// `{a, b, 'c d'}` to its labels.
fn parse_label_list(s: &str, line: usize) -> Result<Vec<String>> {
    let mut labels = Vec::new();
    let mut rest = &s[1..];
    loop {
        let trimmed = rest.trim_start();
        if let Some(after) = trimmed.strip_prefix('}') {
            if !after.trim().is_empty() {
                return Err(DatasetError::format(line, "Unexpected text after label list"));
            }
            return Ok(labels);
        }
        let (label, after) = next_token(trimmed, line)?;
        labels.push(label.text);
        rest = list_separator(after, line)?;
    }
}

/// Skip a `,` between list entries, or stop in front of the closing `}`.
fn list_separator(s: &str, line: usize) -> Result<&str> {
    let s = s.trim_start();
    if let Some(after) = s.strip_prefix(',') {
        Ok(after)
    } else if s.starts_with('}') {
        Ok(s)
    } else if s.is_empty() {
        Err(DatasetError::format(line, "Missing closing '}'"))
    } else {
        Err(DatasetError::format(line, "Expected ',' or '}'"))
    }
}

fn parse_value(attr: &Attribute, token: Token, line: usize) -> Result<Value> {
    if !token.quoted && token.text == "?" {
        return Ok(Value::Missing);
    }
    match attr.kind() {
        AttributeType::Numeric => token.text.parse::<f64>().map(Value::Numeric).map_err(|_| {
            DatasetError::format(
                line,
                format!("Invalid number '{}' for attribute '{}'", token.text, attr.name()),
            )
        }),
        AttributeType::Nominal(_) => attr.value_of_label(&token.text).ok_or_else(|| {
            DatasetError::format(
                line,
                format!(
                    "Value '{}' is not declared for attribute '{}'",
                    token.text,
                    attr.name()
                ),
            )
        }),
        AttributeType::String => Ok(Value::Text(token.text)),
    }
}

fn parse_dense_row(content: &str, table: &Table, line: usize) -> Result<Vec<Value>> {
    let mut fields = Vec::with_capacity(table.num_attributes());
    let mut rest = content;
    loop {
        let (token, after) = next_token(rest, line)?;
        fields.push(token);
        let after = after.trim_start();
        if after.is_empty() {
            break;
        }
        rest = after
            .strip_prefix(',')
            .ok_or_else(|| DatasetError::format(line, "Expected ',' between values"))?;
    }

    if fields.len() != table.num_attributes() {
        return Err(DatasetError::format(
            line,
            format!(
                "Expected {} values but found {}",
                table.num_attributes(),
                fields.len()
            ),
        ));
    }
    table
        .columns()
        .iter()
        .zip(fields)
        .map(|(col, token)| parse_value(col.attribute(), token, line))
        .collect()
}

/// `{index value, ...}` with strictly increasing indices. Entries not
/// listed take the attribute's zero value.
fn parse_sparse_row(content: &str, table: &Table, line: usize) -> Result<Vec<Value>> {
    let columns = table.columns();
    let mut values: Vec<Value> = columns
        .iter()
        .map(|c| sparse_default(c.attribute()))
        .collect();
    let mut previous: Option<usize> = None;
    let mut rest = &content[1..];

    loop {
        let trimmed = rest.trim_start();
        if let Some(after) = trimmed.strip_prefix('}') {
            if !after.trim().is_empty() {
                return Err(DatasetError::format(line, "Unexpected text after sparse row"));
            }
            return Ok(values);
        }

        let (index_token, after) = next_token(trimmed, line)?;
        let index: usize = index_token.text.parse().map_err(|_| {
            DatasetError::format(line, format!("Invalid sparse index '{}'", index_token.text))
        })?;
        if index >= columns.len() {
            return Err(DatasetError::format(
                line,
                format!("Sparse index {} out of range [0, {})", index, columns.len()),
            ));
        }
        if previous.map_or(false, |p| index <= p) {
            return Err(DatasetError::format(line, "Sparse indices must be increasing"));
        }

        let (value_token, after) = next_token(after, line)?;
        values[index] = parse_value(columns[index].attribute(), value_token, line)?;
        previous = Some(index);
        rest = list_separator(after, line)?;
    }
}

fn sparse_default(attr: &Attribute) -> Value {
    match attr.kind() {
        AttributeType::Numeric => Value::Numeric(0.0),
        AttributeType::Nominal(labels) if !labels.is_empty() => Value::Nominal(0),
        AttributeType::Nominal(_) => Value::Missing,
        AttributeType::String => Value::Text(String::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::tests::weather;
    use crate::view::IndexedView;

    fn labeled_weather() -> Table {
        let mut table = weather();
        table.set_class_index(Some(4)).unwrap();
        table
    }

    #[test]
    fn test_round_trip_keeps_class() {
        let table = labeled_weather();
        let text = encode_to_string(&table).unwrap();
        let decoded = decode_str(&text).unwrap();
        assert_eq!(decoded, table);
        assert_eq!(decoded.class_index(), Some(4));
    }

    #[test]
    fn test_round_trip_empty_and_single_row() {
        let full = labeled_weather();

        let empty = full.empty_copy();
        let decoded = decode_str(&encode_to_string(&empty).unwrap()).unwrap();
        assert_eq!(decoded, empty);
        assert_eq!(decoded.class_index(), Some(4));

        let mut single = full.empty_copy();
        single.append_row(full.row(2).unwrap()).unwrap();
        let decoded = decode_str(&encode_to_string(&single).unwrap()).unwrap();
        assert_eq!(decoded, single);
    }

    #[test]
    fn test_round_trip_without_class() {
        let table = weather();
        let text = encode_to_string(&table).unwrap();
        assert!(!text.contains(CLASS_ATTRIBUTE_PREFIX));
        let decoded = decode_str(&text).unwrap();
        assert_eq!(decoded.class_index(), None);
        assert_eq!(decoded, table);
    }

    #[test]
    fn test_encode_marks_class_without_renaming() {
        let table = labeled_weather();
        let text = encode_to_string(&table).unwrap();
        assert!(text.starts_with("@relation weather\n\n"));
        assert!(text.contains("@attribute $class$play {yes,no}\n"));
        assert!(text.contains("@attribute outlook {sunny,overcast,rainy}\n"));
        assert!(text.contains("@data\nsunny,85,85,FALSE,no\n"));
        assert_eq!(table.attribute(4).unwrap().name(), "play");
    }

    #[test]
    fn test_quoting_round_trip() {
        let schema = Schema::new(vec![
            Attribute::string("full name"),
            Attribute::nominal("answer", vec!["?", "it's", "a,b"]),
            Attribute::numeric("score"),
        ])
        .unwrap();
        let rows = vec![
            Row::new(vec![
                Value::Text("Ada, Countess".into()),
                Value::Nominal(0),
                Value::Numeric(1.5),
            ]),
            Row::new(vec![Value::Text("?".into()), Value::Nominal(1), Value::Missing]),
            Row::new(vec![Value::Text(String::new()), Value::Nominal(2), Value::Numeric(-0.25)]),
            Row::new(vec![
                Value::Text("line\nbreak 50% \\ \"q\"".into()),
                Value::Missing,
                Value::Numeric(1e-7),
            ]),
        ];
        let table = Table::from_rows("my data", schema, rows).unwrap();

        let text = encode_to_string(&table).unwrap();
        assert!(text.contains("@relation 'my data'"));
        assert!(text.contains("@attribute answer {'?','it\\'s','a,b'}"));

        let decoded = decode_str(&text).unwrap();
        assert_eq!(decoded, table);
        assert_eq!(decoded.value(1, 0).unwrap(), Value::Text("?".into()));
        assert!(decoded.value(1, 2).unwrap().is_missing());
    }

    #[test]
    fn test_decode_handwritten() {
        let text = "\
% weather subset
@RELATION weather

@ATTRIBUTE outlook {sunny, overcast, rainy}
@attribute temperature REAL
@attribute humidity integer
@attribute windy {TRUE,FALSE}
@attribute $class$play {yes,no}

@data
sunny,85,85,FALSE,no   % trailing comment
overcast,?,86,FALSE,yes
";
        let table = decode_str(text).unwrap();
        assert_eq!(table.name(), "weather");
        assert_eq!(table.len(), 2);
        assert_eq!(table.class_index(), Some(4));
        assert_eq!(table.attribute(4).unwrap().name(), "play");
        assert_eq!(table.value(0, 3).unwrap(), Value::Nominal(1));
        assert!(table.value(1, 1).unwrap().is_missing());
        assert_eq!(table.value(1, 0).unwrap(), Value::Nominal(1));
    }

    #[test]
    fn test_decode_sparse_rows() {
        let text = "\
@relation sparse
@attribute a numeric
@attribute b {x,y}
@attribute c string
@attribute d numeric
@data
{1 y, 3 2.5}
{}
";
        let table = decode_str(text).unwrap();
        assert_eq!(
            table.row(0).unwrap().into_values(),
            vec![
                Value::Numeric(0.0),
                Value::Nominal(1),
                Value::Text(String::new()),
                Value::Numeric(2.5)
            ]
        );
        assert_eq!(
            table.row(1).unwrap().into_values(),
            vec![
                Value::Numeric(0.0),
                Value::Nominal(0),
                Value::Text(String::new()),
                Value::Numeric(0.0)
            ]
        );
    }

    #[test]
    fn test_only_first_marked_attribute_is_class() {
        let text = "\
@relation r
@attribute $class$a numeric
@attribute $class$b numeric
@data
1,2
";
        let table = decode_str(text).unwrap();
        assert_eq!(table.class_index(), Some(0));
        assert_eq!(table.attribute(0).unwrap().name(), "a");
        assert_eq!(table.attribute(1).unwrap().name(), "$class$b");
    }

    #[test]
    fn test_names_starting_with_marker_round_trip() {
        let mut table = labeled_weather();
        table.rename_attribute(0, "$class$outlook").unwrap();
        let text = encode_to_string(&table).unwrap();
        assert!(text.contains("@attribute $class$$class$outlook {"));
        assert!(text.contains("@attribute $class$play {"));
        let decoded = decode_str(&text).unwrap();
        assert_eq!(decoded.class_index(), Some(4));
        assert_eq!(decoded.attribute(0).unwrap().name(), "$class$outlook");
        assert_eq!(decoded, table);

        table.set_class_index(None).unwrap();
        let decoded = decode_str(&encode_to_string(&table).unwrap()).unwrap();
        assert_eq!(decoded.class_index(), None);
        assert_eq!(decoded, table);

        // The class column itself may carry the marker in its own name.
        table.set_class_index(Some(0)).unwrap();
        let text = encode_to_string(&table).unwrap();
        assert!(text.contains("@attribute $class$$class$$class$outlook {"));
        let decoded = decode_str(&text).unwrap();
        assert_eq!(decoded.class_index(), Some(0));
        assert_eq!(decoded, table);
    }

    fn format_error_line(text: &str) -> usize {
        match decode_str(text) {
            Err(DatasetError::Format { line, .. }) => line,
            other => panic!("expected a format error, got {:?}", other),
        }
    }

    #[test]
    fn test_format_errors_report_line() {
        let arity = "@relation r\n@attribute a numeric\n@attribute b numeric\n@data\n1,2\n3\n";
        assert_eq!(format_error_line(arity), 6);

        let label = "@relation r\n@attribute c {x,y}\n@data\nz\n";
        assert_eq!(format_error_line(label), 4);

        let number = "@relation r\n@attribute a numeric\n@data\n1\nabc\n";
        assert_eq!(format_error_line(number), 5);

        let no_data = "@relation r\n@attribute a numeric\n";
        assert_eq!(format_error_line(no_data), 2);

        let date = "@relation r\n@attribute when date\n@data\n";
        assert_eq!(format_error_line(date), 2);

        let unterminated = "@relation r\n@attribute s string\n@data\n'open\n";
        assert_eq!(format_error_line(unterminated), 4);
    }

    #[test]
    fn test_invalid_headers() {
        assert!(matches!(
            decode_str("@relation r\n@data\n"),
            Err(DatasetError::InvalidTable(_))
        ));
        assert!(matches!(
            decode_str("@relation r\n@attribute a numeric\n@attribute a string\n@data\n"),
            Err(DatasetError::InvalidTable(_))
        ));
    }

    #[test]
    fn test_encode_view_writes_visible_rows() {
        let base = labeled_weather().into_shared();
        let view = IndexedView::new(base, "weather.arff", &[3, 0]).unwrap();
        let decoded = decode_str(&encode_to_string(&view).unwrap()).unwrap();
        assert_eq!(decoded, view.materialize().unwrap());
    }

    #[test]
    fn test_strip_comment_respects_quotes() {
        assert_eq!(strip_comment("a,b % note"), "a,b ");
        assert_eq!(strip_comment("'50%',b"), "'50%',b");
        assert_eq!(strip_comment("'it\\'s % fine' % gone"), "'it\\'s % fine' ");
    }
}
