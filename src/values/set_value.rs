use std::borrow::Cow;

use nom::{
    branch::alt,
    bytes::complete::{is_not, tag},
    character::complete::char,
    combinator::{all_consuming, map, rest, value},
    error::{ContextError, ParseError},
    multi::{fold_many1, separated_list1},
    sequence::separated_pair,
    IResult, Parser,
};
use serde_json::{Map, Value};

/// A `--set path.to.key=value` override.
#[derive(Debug, Clone, PartialEq)]
pub struct SetValue {
    pub path: Vec<String>,
    pub value: Value,
}

#[derive(Debug, thiserror::Error)]
#[error("invalid --set expression {expr:?}: {reason}")]
pub struct SetValueParseError {
    expr: String,
    reason: String,
}

/// One key of the path. `\.` stands for a literal dot.
fn segment<'a, E: ParseError<&'a str> + ContextError<&'a str>>(
    s: &'a str,
) -> IResult<&'a str, String, E> {
    fold_many1(
        alt((
            value(Cow::Borrowed("."), tag("\\.")),
            map(is_not(".=\\"), Cow::Borrowed),
        )),
        String::default,
        |mut acc, part: Cow<'a, str>| {
            acc.push_str(&part);
            acc
        },
    )
    .parse(s)
}

fn path<'a, E: ParseError<&'a str> + ContextError<&'a str>>(
    s: &'a str,
) -> IResult<&'a str, Vec<String>, E> {
    separated_list1(char('.'), segment).parse(s)
}

fn expression<'a, E: ParseError<&'a str> + ContextError<&'a str>>(
    s: &'a str,
) -> IResult<&'a str, (Vec<String>, &'a str), E> {
    all_consuming(separated_pair(path, char('='), rest)).parse(s)
}

/// Scalars are typed the way helm types them: booleans, integers and `null`
/// are recognised, everything else stays a string.
fn typed(raw: &str) -> Value {
    match raw {
        "true" => Value::Bool(true),
        "false" => Value::Bool(false),
        "null" => Value::Null,
        _ => raw
            .parse::<i64>()
            .map(Value::from)
            .unwrap_or_else(|_| Value::String(raw.to_string())),
    }
}

impl std::str::FromStr for SetValue {
    type Err = SetValueParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        use nom::Err;
        use nom_language::error::{convert_error, VerboseError};

        match expression::<VerboseError<_>>(s) {
            Ok((_, (path, raw))) => Ok(SetValue {
                path,
                value: typed(raw),
            }),
            Err(Err::Error(err) | Err::Failure(err)) => Err(SetValueParseError {
                expr: s.to_string(),
                reason: convert_error(s, err),
            }),
            Err(err) => Err(SetValueParseError {
                expr: s.to_string(),
                reason: err.to_string(),
            }),
        }
    }
}

/// Folds overrides into one nested document. Later overrides win.
pub fn nest_set_values(values: &[SetValue]) -> Value {
    let mut root = Map::new();

    for SetValue { path, value } in values {
        insert(&mut root, path, value.clone());
    }

    Value::Object(root)
}

fn insert(map: &mut Map<String, Value>, path: &[String], value: Value) {
    match path {
        [] => {}
        [last] => {
            map.insert(last.clone(), value);
        }
        [head, tail @ ..] => {
            let entry = map
                .entry(head.clone())
                .or_insert_with(|| Value::Object(Map::new()));

            if !entry.is_object() {
                *entry = Value::Object(Map::new());
            }

            if let Value::Object(child) = entry {
                insert(child, tail, value);
            }
        }
    }
}
