//! Inclusion filter evaluation
//!
//! Filters use the platform's encoded query form:
//!
//! ```text
//! active=true^nameSTARTSWITHfoo^ORnameINbar,baz^NQsys_scope=global
//! ```
//!
//! `^NQ` separates top-level alternatives, `^` joins clauses of one
//! alternative with AND, and `^OR` adds an OR term to the clause before it.
//! Parsing never fails: anything unrecognized evaluates to true, and a term
//! whose field the record does not carry passes as well.

use crate::record::Record;
use std::cmp::Ordering;

/// Comparison operator of a single term.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Eq,
    NotEq,
    Lt,
    Gt,
    Le,
    Ge,
    Like,
    NotLike,
    Contains,
    DoesNotContain,
    StartsWith,
    EndsWith,
    In,
    NotIn,
    IsEmpty,
    IsNotEmpty,
}

/// Operator spellings, longest first so that e.g. `<=` wins over `<` and
/// `NOT LIKE` over `LIKE` when both start at the same position.
const OPERATORS: &[(&str, Operator)] = &[
    ("DOES NOT CONTAIN", Operator::DoesNotContain),
    ("DOESNOTCONTAIN", Operator::DoesNotContain),
    ("STARTSWITH", Operator::StartsWith),
    ("ISNOTEMPTY", Operator::IsNotEmpty),
    ("ENDSWITH", Operator::EndsWith),
    ("NOT LIKE", Operator::NotLike),
    ("CONTAINS", Operator::Contains),
    ("ISEMPTY", Operator::IsEmpty),
    ("NOT IN", Operator::NotIn),
    ("LIKE", Operator::Like),
    ("!=", Operator::NotEq),
    ("<=", Operator::Le),
    (">=", Operator::Ge),
    ("IN", Operator::In),
    ("=", Operator::Eq),
    ("<", Operator::Lt),
    (">", Operator::Gt),
];

/// `field operator value`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Term {
    pub field: String,
    pub operator: Option<Operator>,
    pub value: String,
}

impl Term {
    fn parse(text: &str) -> Self {
        for start in 1..text.len() {
            if !text.is_char_boundary(start) {
                continue;
            }
            let rest = &text[start..];
            if let Some((spelling, operator)) =
                OPERATORS.iter().find(|(spelling, _)| rest.starts_with(spelling))
            {
                return Self {
                    field: text[..start].to_string(),
                    operator: Some(*operator),
                    value: percent_decode(&rest[spelling.len()..]),
                };
            }
        }
        Self {
            field: text.to_string(),
            operator: None,
            value: String::new(),
        }
    }

    /// Evaluate against a record. Absent fields and unknown operators pass.
    pub fn matches(&self, record: &Record) -> bool {
        let (Some(operator), Some(field)) = (self.operator, record.field(&self.field)) else {
            return true;
        };
        let actual = field.value.as_str();
        let expected = self.value.as_str();

        match operator {
            Operator::Eq => actual == expected,
            Operator::NotEq => actual != expected,
            Operator::Lt => compare(actual, expected) == Ordering::Less,
            Operator::Gt => compare(actual, expected) == Ordering::Greater,
            Operator::Le => compare(actual, expected) != Ordering::Greater,
            Operator::Ge => compare(actual, expected) != Ordering::Less,
            Operator::Like | Operator::Contains => {
                actual.to_lowercase().contains(&expected.to_lowercase())
            }
            Operator::NotLike | Operator::DoesNotContain => {
                !actual.to_lowercase().contains(&expected.to_lowercase())
            }
            Operator::StartsWith => actual.to_lowercase().starts_with(&expected.to_lowercase()),
            Operator::EndsWith => actual.to_lowercase().ends_with(&expected.to_lowercase()),
            Operator::In => in_list(actual, expected),
            Operator::NotIn => !in_list(actual, expected),
            Operator::IsEmpty => actual.is_empty(),
            Operator::IsNotEmpty => !actual.is_empty(),
        }
    }
}

fn in_list(actual: &str, list: &str) -> bool {
    let actual = actual.to_lowercase();
    list.split(',').any(|alt| alt.trim().to_lowercase() == actual)
}

/// Numeric comparison when both sides parse as numbers, lexicographic otherwise.
fn compare(actual: &str, expected: &str) -> Ordering {
    match (actual.trim().parse::<f64>(), expected.trim().parse::<f64>()) {
        (Ok(a), Ok(b)) => a.partial_cmp(&b).unwrap_or(Ordering::Equal),
        _ => actual.cmp(expected),
    }
}

fn percent_decode(input: &str) -> String {
    fn hex(b: u8) -> Option<u8> {
        (b as char).to_digit(16).map(|d| d as u8)
    }

    let bytes = input.as_bytes();
    let mut decoded = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            if let (Some(high), Some(low)) = (hex(bytes[i + 1]), hex(bytes[i + 2])) {
                decoded.push(high << 4 | low);
                i += 3;
                continue;
            }
        }
        decoded.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&decoded).into_owned()
}

/// OR group of terms
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Clause {
    terms: Vec<Term>,
}

/// AND group of clauses
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Segment {
    clauses: Vec<Clause>,
}

/// A parsed inclusion filter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Query {
    segments: Vec<Segment>,
}

impl Query {
    /// Parse an encoded query. Never fails.
    pub fn parse(encoded: &str) -> Self {
        let mut segments = vec![Segment::default()];

        for (index, piece) in encoded.split('^').enumerate() {
            if piece.is_empty() || piece == "EQ" || piece.starts_with("ORDERBY") {
                continue;
            }
            if index > 0 {
                if let Some(rest) = piece.strip_prefix("NQ") {
                    segments.push(Segment::default());
                    push_clause(&mut segments, rest);
                    continue;
                }
                if let Some(rest) = piece.strip_prefix("OR") {
                    push_or_term(&mut segments, rest);
                    continue;
                }
            }
            push_clause(&mut segments, piece);
        }

        segments.retain(|s| !s.clauses.is_empty());
        Self { segments }
    }

    /// Whether the query has no effective terms.
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Evaluate against a record. An empty query always matches.
    pub fn matches(&self, record: &Record) -> bool {
        self.is_empty()
            || self.segments.iter().any(|segment| {
                segment
                    .clauses
                    .iter()
                    .all(|clause| clause.terms.iter().any(|term| term.matches(record)))
            })
    }

    /// Distinct field names referenced by the query, in order of appearance.
    pub fn field_names(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        for term in self.terms() {
            if !names.contains(&term.field) {
                names.push(term.field.clone());
            }
        }
        names
    }

    fn terms(&self) -> impl Iterator<Item = &Term> {
        self.segments
            .iter()
            .flat_map(|s| s.clauses.iter())
            .flat_map(|c| c.terms.iter())
    }
}

fn push_clause(segments: &mut [Segment], text: &str) {
    if text.is_empty() {
        return;
    }
    if let Some(segment) = segments.last_mut() {
        segment.clauses.push(Clause {
            terms: vec![Term::parse(text)],
        });
    }
}

fn push_or_term(segments: &mut [Segment], text: &str) {
    if text.is_empty() {
        return;
    }
    let Some(segment) = segments.last_mut() else {
        return;
    };
    match segment.clauses.last_mut() {
        Some(clause) => clause.terms.push(Term::parse(text)),
        None => segment.clauses.push(Clause {
            terms: vec![Term::parse(text)],
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn record(pairs: &[(&str, &str)]) -> Record {
        pairs
            .iter()
            .fold(Record::new("sys_script", "1"), |r, (k, v)| {
                r.with_field(*k, *v)
            })
    }

    #[test]
    fn and_with_or_clause() {
        let query = Query::parse("active=true^name=foo^ORname=bar");
        assert!(!query.matches(&record(&[("active", "false"), ("name", "foo")])));
        assert!(query.matches(&record(&[("active", "true"), ("name", "bar")])));
        assert!(!query.matches(&record(&[("active", "true"), ("name", "baz")])));
    }

    #[test]
    fn absent_field_never_excludes() {
        let query = Query::parse("collection=incident");
        assert!(query.matches(&record(&[("name", "x")])));
    }

    #[test]
    fn nq_is_top_level_or() {
        let query = Query::parse("active=true^NQname=foo");
        assert!(query.matches(&record(&[("active", "false"), ("name", "foo")])));
        assert!(!query.matches(&record(&[("active", "false"), ("name", "bar")])));
    }

    #[rstest]
    #[case("nameLIKEFoO", "xfooy", true)]
    #[case("nameCONTAINSbar", "xfooy", false)]
    #[case("nameSTARTSWITHX", "xfooy", true)]
    #[case("nameENDSWITHOY", "xfooy", true)]
    #[case("nameNOT LIKEfoo", "xfooy", false)]
    #[case("nameDOES NOT CONTAINbar", "xfooy", true)]
    #[case("nameINa, XFOOY ,b", "xfooy", true)]
    #[case("nameNOT INa,b", "xfooy", true)]
    #[case("name!=xfooy", "xfooy", false)]
    #[case("nameISEMPTY", "", true)]
    #[case("nameISNOTEMPTY", "", false)]
    fn string_operators(#[case] encoded: &str, #[case] value: &str, #[case] expected: bool) {
        let query = Query::parse(encoded);
        assert_eq!(query.matches(&record(&[("name", value)])), expected);
    }

    #[rstest]
    #[case("order<200", "100", true)]
    #[case("order>=100", "100", true)]
    #[case("order>20", "100", true)]
    #[case("order<=99", "100", false)]
    #[case("when<b", "a", true)]
    fn ordering_operators(#[case] encoded: &str, #[case] value: &str, #[case] expected: bool) {
        let field = encoded
            .split(|c| c == '<' || c == '>')
            .next()
            .unwrap_or_default();
        let query = Query::parse(encoded);
        assert_eq!(query.matches(&record(&[(field, value)])), expected);
    }

    #[test]
    fn values_are_url_decoded() {
        let query = Query::parse("name=hello%20world");
        assert!(query.matches(&record(&[("name", "hello world")])));
    }

    #[test]
    fn malformed_escapes_stay_literal() {
        assert_eq!(percent_decode("50%"), "50%");
        assert_eq!(percent_decode("%zz%4"), "%zz%4");
        assert_eq!(percent_decode("a%41"), "aA");
    }

    #[test]
    fn unparseable_terms_pass() {
        assert!(Query::parse("garbage").matches(&record(&[("garbage", "x")])));
        assert!(Query::parse("").matches(&record(&[])));
        assert!(Query::parse("^^ORDERBYname^EQ").is_empty());
    }

    #[test]
    fn collects_field_names() {
        let query = Query::parse("active=true^name=foo^ORname=bar^NQsys_scope.name=global");
        assert_eq!(
            query.field_names(),
            vec!["active", "name", "sys_scope.name"]
        );
    }
}
