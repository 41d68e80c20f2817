//! Model description document reader.
//!
//! Reads the XML subset used by `modelDescription.xml` into a [`DescNode`]
//! tree: elements, attributes (single or double quoted, with the predefined
//! and numeric entities decoded), comments, processing instructions,
//! DOCTYPE/CDATA sections and character data. Character data is skipped;
//! FMI descriptions carry all information in attributes.

use crate::error::{DescResult, DescriptionError};
use crate::node::DescNode;
use nom::{
    branch::alt,
    bytes::complete::{tag, take_until, take_while, take_while1},
    character::complete::{char, multispace0, multispace1},
    combinator::value,
    multi::many0,
    sequence::{delimited, preceded, separated_pair, tuple},
    IResult, Parser,
};
use std::path::Path;

/// Deepest element nesting accepted. FMI descriptions need about five levels.
pub const MAX_DEPTH: usize = 64;

/// Parse a complete description document into its root element.
pub fn parse_document(input: &str) -> DescResult<DescNode> {
    let input = input.strip_prefix('\u{feff}').unwrap_or(input);

    let (rest, _) = misc(input).map_err(|e| to_error(input, e))?;
    let (rest, root) = element(input, rest, 1).map_err(|e| to_error(input, e))?;
    let (rest, _) = misc(rest).map_err(|e| to_error(input, e))?;

    if !rest.is_empty() {
        return Err(DescriptionError::syntax(
            line_at(input, rest),
            "content after the root element",
        ));
    }

    Ok(root)
}

/// Read and parse a description file.
pub fn parse_file<P: AsRef<Path>>(path: P) -> DescResult<DescNode> {
    let content = std::fs::read_to_string(path)?;
    parse_document(&content)
}

fn element<'a>(origin: &'a str, input: &'a str, depth: usize) -> IResult<&'a str, DescNode> {
    if depth > MAX_DEPTH {
        return Err(nom::Err::Failure(nom::error::Error::new(
            input,
            nom::error::ErrorKind::TooLarge,
        )));
    }
    let line = line_at(origin, input);
    let (input, _) = char('<')(input)?;
    let (input, name) = xml_name(input)?;
    let (input, attributes) = many0(preceded(multispace1, attribute)).parse(input)?;
    let (input, _) = multispace0(input)?;

    let mut node = DescNode {
        name: name.to_string(),
        attributes,
        children: Vec::new(),
        line,
    };

    if let Ok((input, _)) = tag::<_, _, nom::error::Error<&str>>("/>")(input) {
        return Ok((input, node));
    }

    let (input, _) = char('>')(input)?;
    let (input, children) = many0(preceded(misc, |i| element(origin, i, depth + 1))).parse(input)?;
    let (input, _) = misc(input)?;
    let (input, _) = tag("</")(input)?;
    let (after_name, closing) = xml_name(input)?;
    if closing != name {
        return Err(nom::Err::Failure(nom::error::Error::new(
            input,
            nom::error::ErrorKind::Tag,
        )));
    }
    let (input, _) = preceded(multispace0, char('>'))(after_name)?;

    node.children = children;
    Ok((input, node))
}

fn attribute(input: &str) -> IResult<&str, (String, String)> {
    let (input, (name, raw)) = separated_pair(
        xml_name,
        tuple((multispace0, char('='), multispace0)),
        quoted,
    )
    .parse(input)?;

    Ok((input, (name.to_string(), decode_entities(raw))))
}

fn quoted(input: &str) -> IResult<&str, &str> {
    alt((
        delimited(char('"'), take_while(|c| c != '"'), char('"')),
        delimited(char('\''), take_while(|c| c != '\''), char('\'')),
    ))(input)
}

fn xml_name(input: &str) -> IResult<&str, &str> {
    take_while1(|c: char| c.is_alphanumeric() || matches!(c, '_' | ':' | '-' | '.'))(input)
}

/// Skip everything between elements that carries no structure.
fn misc(input: &str) -> IResult<&str, ()> {
    value(
        (),
        many0(alt((
            value((), delimited(tag("<!--"), take_until("-->"), tag("-->"))),
            value((), delimited(tag("<?"), take_until("?>"), tag("?>"))),
            value((), delimited(tag("<![CDATA["), take_until("]]>"), tag("]]>"))),
            value((), delimited(tag("<!"), take_until(">"), char('>'))),
            value((), take_while1(|c| c != '<')),
        ))),
    )(input)
}

fn decode_entities(raw: &str) -> String {
    if !raw.contains('&') {
        return raw.to_string();
    }

    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(pos) = rest.find('&') {
        out.push_str(&rest[..pos]);
        let tail = &rest[pos..];
        match tail.find(';').and_then(|end| decode_entity(&tail[1..end]).map(|c| (c, end))) {
            Some((c, end)) => {
                out.push(c);
                rest = &tail[end + 1..];
            }
            None => {
                // Not a recognised entity; keep the ampersand literally.
                out.push('&');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

fn decode_entity(entity: &str) -> Option<char> {
    match entity {
        "lt" => Some('<'),
        "gt" => Some('>'),
        "amp" => Some('&'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        _ => {
            let numeric = entity.strip_prefix('#')?;
            let code = match numeric.strip_prefix(['x', 'X']) {
                Some(hex) => u32::from_str_radix(hex, 16).ok()?,
                None => numeric.parse().ok()?,
            };
            char::from_u32(code)
        }
    }
}

/// 1-based line of `rest`, which must be a suffix of `origin`.
fn line_at(origin: &str, rest: &str) -> usize {
    let consumed = origin.len().saturating_sub(rest.len());
    origin[..consumed].matches('\n').count() + 1
}

fn to_error(origin: &str, err: nom::Err<nom::error::Error<&str>>) -> DescriptionError {
    match err {
        nom::Err::Incomplete(_) => DescriptionError::syntax(line_at(origin, ""), "incomplete document"),
        nom::Err::Failure(e) if e.code == nom::error::ErrorKind::TooLarge => DescriptionError::syntax(
            line_at(origin, e.input),
            format!("elements nested deeper than {MAX_DEPTH} levels"),
        ),
        nom::Err::Error(e) | nom::Err::Failure(e) => {
            let preview: String = e.input.chars().take(20).collect();
            DescriptionError::syntax(
                line_at(origin, e.input),
                format!("{:?} at '{}...'", e.code, preview),
            )
        }
    }
}
