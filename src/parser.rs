//! Parsers for column paths and textual join conditions, using nom.
//!
//! ```text
//! c.Id == ct.ClassRoomId && c.Grade == ct.Grade
//! ─┬ ─┬   ──────┬──────  ─┬ ──────────┬───────
//!  │  │         │         │           └── next equality
//!  │  │         │         └── only conjunction is accepted
//!  │  │         └── right-hand path
//!  │  └── property
//!  └── alias
//! ```

use nom::{
    branch::alt,
    bytes::complete::tag,
    character::complete::{alpha1, alphanumeric1, char, multispace0},
    combinator::{all_consuming, map, recognize},
    multi::{many0_count, separated_list1},
    sequence::{delimited, pair, separated_pair},
    IResult,
};

use crate::error::{QueryError, QueryResult};

/// `alias.Property`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnPath {
    pub alias: String,
    pub property: String,
}

/// One `a.X == b.Y` term of a join condition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinEquality {
    pub left: ColumnPath,
    pub right: ColumnPath,
}

/// Parse `alias.Property`, surrounding whitespace allowed.
pub fn parse_column_path(input: &str) -> QueryResult<ColumnPath> {
    match all_consuming(ws(column_path))(input) {
        Ok((_, path)) => Ok(path),
        Err(e) => Err(to_error(input, e, "expected 'alias.Property'")),
    }
}

/// Parse `a.X == b.Y && c.Z == d.W ...`; parentheses around single terms
/// or the whole conjunction are allowed.
pub fn parse_join_conditions(input: &str) -> QueryResult<Vec<JoinEquality>> {
    if let Some(pos) = input.find("||") {
        return Err(QueryError::parse(pos, "a disjunction ('||') is not allowed"));
    }
    let parsed = alt((
        all_consuming(delimited(ws(char('(')), conjunction, ws(char(')')))),
        all_consuming(conjunction),
    ))(input);
    match parsed {
        Ok((_, terms)) => Ok(terms),
        Err(e) => Err(to_error(
            input,
            e,
            "expected equalities of the form 'a.X == b.Y' joined by '&&'",
        )),
    }
}

/// True for `[A-Za-z_][A-Za-z0-9_]*`.
pub fn is_identifier(input: &str) -> bool {
    all_consuming(identifier)(input).is_ok()
}

fn to_error(
    original: &str,
    err: nom::Err<nom::error::Error<&str>>,
    message: &str,
) -> QueryError {
    let position = match &err {
        nom::Err::Error(e) | nom::Err::Failure(e) => original.len() - e.input.len(),
        nom::Err::Incomplete(_) => original.len(),
    };
    QueryError::parse(position, message)
}

fn ws<'a, O>(
    inner: impl FnMut(&'a str) -> IResult<&'a str, O>,
) -> impl FnMut(&'a str) -> IResult<&'a str, O> {
    delimited(multispace0, inner, multispace0)
}

fn identifier(input: &str) -> IResult<&str, &str> {
    recognize(pair(
        alt((alpha1, tag("_"))),
        many0_count(alt((alphanumeric1, tag("_")))),
    ))(input)
}

fn column_path(input: &str) -> IResult<&str, ColumnPath> {
    map(
        separated_pair(identifier, char('.'), identifier),
        |(alias, property)| ColumnPath {
            alias: alias.to_string(),
            property: property.to_string(),
        },
    )(input)
}

fn equality(input: &str) -> IResult<&str, JoinEquality> {
    alt((
        delimited(ws(char('(')), equality, ws(char(')'))),
        map(
            separated_pair(ws(column_path), tag("=="), ws(column_path)),
            |(left, right)| JoinEquality { left, right },
        ),
    ))(input)
}

fn conjunction(input: &str) -> IResult<&str, Vec<JoinEquality>> {
    separated_list1(tag("&&"), equality)(input)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path(alias: &str, property: &str) -> ColumnPath {
        ColumnPath {
            alias: alias.to_string(),
            property: property.to_string(),
        }
    }

    #[test]
    fn test_column_path() {
        assert_eq!(parse_column_path(" s.FirstName ").unwrap(), path("s", "FirstName"));
        assert_eq!(parse_column_path("ct.Class_Room2").unwrap(), path("ct", "Class_Room2"));
    }

    #[test]
    fn test_column_path_errors() {
        assert!(matches!(
            parse_column_path("FirstName"),
            Err(QueryError::Parse { position: 9, .. })
        ));
        assert!(parse_column_path("s.First Name").is_err());
        assert!(parse_column_path("1s.Id").is_err());
    }

    #[test]
    fn test_is_identifier() {
        assert!(is_identifier("ct"));
        assert!(is_identifier("_tmp1"));
        assert!(!is_identifier(""));
        assert!(!is_identifier("first name"));
        assert!(!is_identifier("9a"));
    }

    #[test]
    fn test_single_join_equality() {
        let terms = parse_join_conditions("c.Id == ct.ClassRoomId").unwrap();
        assert_eq!(
            terms,
            vec![JoinEquality {
                left: path("c", "Id"),
                right: path("ct", "ClassRoomId"),
            }]
        );
    }

    #[test]
    fn test_conjunction_with_parens() {
        let terms =
            parse_join_conditions("(a.X == b.Y) && (a.Z==b.W) && a.Q == b.R").unwrap();
        assert_eq!(terms.len(), 3);
        assert_eq!(terms[1].right, path("b", "W"));

        let wrapped = parse_join_conditions("(a.X == b.Y && a.Z == b.W)").unwrap();
        assert_eq!(wrapped.len(), 2);
    }

    #[test]
    fn test_disjunction_rejected() {
        let err = parse_join_conditions("a.X == b.Y || a.Z == b.W").unwrap_err();
        assert!(matches!(err, QueryError::Parse { position: 11, .. }));
    }

    #[test]
    fn test_other_operators_rejected() {
        assert!(parse_join_conditions("a.X != b.Y").is_err());
        assert!(parse_join_conditions("a.X > b.Y").is_err());
        assert!(parse_join_conditions("a.X == 5").is_err());
        assert!(parse_join_conditions("").is_err());
    }
}
