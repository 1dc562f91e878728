//! Reader for the line based descriptor files (`Init.txt`) that sit at the root of every pack.
//!
//! ```text
//! -- comment
//! -["Stone", color(120, 120, 120)]
//! [#nm:"Block", #sz:point(1,1), #tp:"box", #tags:["notTrashProp"]]
//! ```
//!
//! A line starting with `-` opens a category, the item lines that follow belong to it.
//! Item values are kept as written, only `#nm` is interpreted here.

use std::path::Path;

use leditor_catalog_models::{unquote, Category, Color, FromPropertyList, PropertyList};
use smol_str::SmolStr;
use tracing::{debug, instrument, trace, warn};

use crate::ImportError;

const COMMENT_PREFIX: &str = "--";
const CATEGORY_PREFIX: char = '-';
const NAME_KEY: &str = "nm";
const BYTE_ORDER_MARK: char = '\u{feff}';

/// Bytes that are not valid UTF-8 are replaced instead of failing the whole pack.
#[instrument(level = "debug")]
pub fn parse_descriptor<D: FromPropertyList>(
    path: &Path,
) -> Result<Vec<Category<D>>, ImportError> {
    let bytes = std::fs::read(path).map_err(|source| ImportError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let text = String::from_utf8_lossy(&bytes);
    if matches!(text, std::borrow::Cow::Owned(_)) {
        warn!(path = %path.display(), "descriptor is not valid utf-8, invalid bytes replaced");
    }
    parse_descriptor_str(path, &text)
}

/// `path` is only used to report errors. A leading byte order mark is ignored.
pub fn parse_descriptor_str<D: FromPropertyList>(
    path: &Path,
    text: &str,
) -> Result<Vec<Category<D>>, ImportError> {
    let text = text.strip_prefix(BYTE_ORDER_MARK).unwrap_or(text);
    let mut categories: Vec<Category<D>> = Vec::new();
    for (index, raw_line) in text.lines().enumerate() {
        let line_number = index + 1;
        let line = raw_line.trim();
        if line.is_empty() || line.starts_with(COMMENT_PREFIX) {
            continue;
        }
        let syntax = |message: String| ImportError::Syntax {
            path: path.to_path_buf(),
            line: line_number,
            message,
        };
        if let Some(header) = line.strip_prefix(CATEGORY_PREFIX) {
            let (name, color) = parse_category_header(header).map_err(syntax)?;
            trace!(line = line_number, %name, "category");
            categories.push(Category::new(name, color));
        } else {
            let properties = parse_property_list(line).map_err(syntax)?;
            let name = properties
                .get(NAME_KEY)
                .and_then(|v| unquote(v))
                .map(SmolStr::from)
                .ok_or_else(|| ImportError::MissingName {
                    path: path.to_path_buf(),
                    line: line_number,
                })?;
            let category = categories
                .last_mut()
                .ok_or_else(|| ImportError::OrphanItem {
                    path: path.to_path_buf(),
                    line: line_number,
                })?;
            category
                .items
                .push(D::from_property_list(name, properties));
        }
    }
    if categories.is_empty() {
        return Err(ImportError::Empty {
            path: path.to_path_buf(),
        });
    }
    debug!(
        categories = categories.len(),
        items = categories.iter().map(Category::len).sum::<usize>(),
        "descriptor parsed"
    );
    Ok(categories)
}

/// `["Name", color(r, g, b)]`
fn parse_category_header(header: &str) -> Result<(SmolStr, Color), String> {
    let inner = strip_brackets(header.trim())?;
    let parts = split_top_level(inner)?;
    let [name, color] = parts.as_slice() else {
        return Err(format!(
            "category header needs a name and a color, found {} values",
            parts.len()
        ));
    };
    let name = unquote(name).ok_or_else(|| format!("category name {name} is not a string"))?;
    Ok((name.into(), parse_color(color)?))
}

fn parse_color(value: &str) -> Result<Color, String> {
    let channels = value
        .trim()
        .strip_prefix("color(")
        .and_then(|v| v.strip_suffix(')'))
        .ok_or_else(|| format!("expected color(r, g, b), found {value}"))?;
    let channels = channels
        .split(',')
        .map(|c| c.trim().parse::<i64>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| format!("invalid color channel in {value}: {e}"))?;
    match channels.as_slice() {
        [r, g, b] => Ok(Color::from_channels(*r, *g, *b)),
        _ => Err(format!("expected three color channels, found {value}")),
    }
}

/// `[#key:value, #key2:value2]`
fn parse_property_list(line: &str) -> Result<PropertyList, String> {
    let inner = strip_brackets(line)?;
    let mut properties = PropertyList::new();
    for part in split_top_level(inner)? {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        let (key, value) = part
            .strip_prefix('#')
            .and_then(|p| p.split_once(':'))
            .ok_or_else(|| format!("expected #key:value, found {part}"))?;
        properties.insert(key.trim().into(), value.trim().to_string());
    }
    Ok(properties)
}

fn strip_brackets(value: &str) -> Result<&str, String> {
    value
        .strip_prefix('[')
        .and_then(|v| v.strip_suffix(']'))
        .ok_or_else(|| format!("expected a [...] list, found {value}"))
}

/// Splits on the commas that are neither quoted nor nested in `()` or `[]`.
fn split_top_level(value: &str) -> Result<Vec<&str>, String> {
    let mut parts = Vec::new();
    let mut depth: usize = 0;
    let mut quoted = false;
    let mut start = 0;
    for (i, c) in value.char_indices() {
        match c {
            '"' => quoted = !quoted,
            _ if quoted => {}
            '(' | '[' => depth += 1,
            ')' | ']' => {
                depth = depth
                    .checked_sub(1)
                    .ok_or_else(|| format!("unbalanced '{c}' in {value}"))?;
            }
            ',' if depth == 0 => {
                parts.push(&value[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    if quoted {
        return Err(format!("unterminated string in {value}"));
    }
    if depth != 0 {
        return Err(format!("unclosed list in {value}"));
    }
    parts.push(&value[start..]);
    Ok(parts)
}
