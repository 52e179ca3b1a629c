//! CSS selector subset
//!
//! Parsed with nom's context-based error capture so an invalid selector
//! reports where parsing stopped.
//!
//! # Supported Syntax
//!
//! - Universal and type selectors: `*`, `a`, `main`
//! - ID and class: `#links`, `.link-card`
//! - Attributes: `[href]`, `[data-kind="social"]`, `[rel=me]`
//! - Combinators: descendant (`main a`) and child (`main > a`)
//! - Lists: `.link-card, .featured`
//!
//! Pseudo-classes, sibling combinators and attribute operators other than
//! `=` are rejected as invalid.

use nom::{
    branch::alt,
    bytes::complete::{take_while, take_while1},
    character::complete::{char, multispace0, multispace1},
    combinator::{all_consuming, cut, map, opt, recognize, value},
    error::{
        context, ContextError, ErrorKind, ParseError as NomParseError, VerboseError,
        VerboseErrorKind,
    },
    multi::{many0, separated_list1},
    sequence::{delimited, pair, preceded, terminated},
    Finish, IResult,
};
use slotmap::SlotMap;

use crate::document::{ElementId, ElementNode};
use crate::error::DomError;

type ParseResult<'a, O> = IResult<&'a str, O, VerboseError<&'a str>>;

/// A single condition inside a compound selector
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SimpleSelector {
    Id(String),
    Class(String),
    Attribute { name: String, value: Option<String> },
}

/// Type selector plus conditions, all applying to one element
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CompoundSelector {
    /// Tag name, `None` for `*` or when omitted
    pub tag: Option<String>,
    pub conditions: Vec<SimpleSelector>,
}

/// Relationship between two compound selectors
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Combinator {
    /// `a b`
    Descendant,
    /// `a > b`
    Child,
}

/// Compound selectors joined by combinators, left to right
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ComplexSelector {
    pub head: CompoundSelector,
    pub tail: Vec<(Combinator, CompoundSelector)>,
}

/// Comma-separated selectors; an element matches if any member matches
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SelectorList(pub Vec<ComplexSelector>);

impl SelectorList {
    /// Parse selector text
    pub fn parse(selector: &str) -> Result<Self, DomError> {
        let trimmed = selector.trim();
        match all_consuming(selector_list)(trimmed).finish() {
            Ok((_, list)) => Ok(list),
            Err(err) => {
                let reason = describe_error(trimmed, &err);
                tracing::debug!(selector, %reason, "selector parse failed");
                Err(DomError::InvalidSelector {
                    selector: selector.to_string(),
                    reason,
                })
            }
        }
    }

    pub(crate) fn matches_in(&self, nodes: &SlotMap<ElementId, ElementNode>, el: ElementId) -> bool {
        self.0.iter().any(|complex| complex.matches_in(nodes, el))
    }
}

impl ComplexSelector {
    fn matches_in(&self, nodes: &SlotMap<ElementId, ElementNode>, el: ElementId) -> bool {
        let mut compounds = Vec::with_capacity(self.tail.len() + 1);
        let mut combinators = Vec::with_capacity(self.tail.len());
        compounds.push(&self.head);
        for (combinator, compound) in &self.tail {
            combinators.push(*combinator);
            compounds.push(compound);
        }
        match_from(nodes, &compounds, &combinators, compounds.len() - 1, el)
    }
}

/// Match `compounds[..=index]` right to left, with `compounds[index]` on `el`
fn match_from(
    nodes: &SlotMap<ElementId, ElementNode>,
    compounds: &[&CompoundSelector],
    combinators: &[Combinator],
    index: usize,
    el: ElementId,
) -> bool {
    let Some(node) = nodes.get(el) else {
        return false;
    };
    if !compounds[index].matches_node(node) {
        return false;
    }
    if index == 0 {
        return true;
    }

    match combinators[index - 1] {
        Combinator::Child => node
            .parent
            .is_some_and(|parent| match_from(nodes, compounds, combinators, index - 1, parent)),
        Combinator::Descendant => {
            let mut current = node.parent;
            while let Some(ancestor) = current {
                if match_from(nodes, compounds, combinators, index - 1, ancestor) {
                    return true;
                }
                current = nodes.get(ancestor).and_then(|n| n.parent);
            }
            false
        }
    }
}

impl CompoundSelector {
    fn matches_node(&self, node: &ElementNode) -> bool {
        if let Some(tag) = &self.tag {
            if *tag != node.tag {
                return false;
            }
        }
        self.conditions.iter().all(|condition| match condition {
            SimpleSelector::Id(id) => node.attributes.get("id") == Some(id),
            SimpleSelector::Class(class) => node.classes.iter().any(|c| c == class),
            SimpleSelector::Attribute { name, value } => match (node.attributes.get(name), value) {
                (Some(actual), Some(expected)) => actual == expected,
                (Some(_), None) => true,
                (None, _) => false,
            },
        })
    }
}

// ============================================================================
// Parsers
// ============================================================================

fn identifier(input: &str) -> ParseResult<&str> {
    recognize(pair(
        take_while1(|c: char| c.is_ascii_alphabetic() || c == '_' || c == '-'),
        take_while(|c: char| c.is_ascii_alphanumeric() || c == '_' || c == '-'),
    ))(input)
}

fn quoted(input: &str) -> ParseResult<&str> {
    alt((
        delimited(char('"'), take_while(|c: char| c != '"'), char('"')),
        delimited(char('\''), take_while(|c: char| c != '\''), char('\'')),
    ))(input)
}

fn attribute(input: &str) -> ParseResult<SimpleSelector> {
    context(
        "attribute selector",
        map(
            delimited(
                char('['),
                cut(pair(
                    delimited(multispace0, identifier, multispace0),
                    opt(preceded(
                        pair(char('='), multispace0),
                        terminated(alt((quoted, identifier)), multispace0),
                    )),
                )),
                cut(char(']')),
            ),
            |(name, value)| SimpleSelector::Attribute {
                name: name.to_ascii_lowercase(),
                value: value.map(str::to_string),
            },
        ),
    )(input)
}

fn simple_selector(input: &str) -> ParseResult<SimpleSelector> {
    alt((
        map(
            preceded(char('#'), context("id selector", cut(identifier))),
            |id| SimpleSelector::Id(id.to_string()),
        ),
        map(
            preceded(char('.'), context("class selector", cut(identifier))),
            |class| SimpleSelector::Class(class.to_string()),
        ),
        attribute,
    ))(input)
}

fn compound(input: &str) -> ParseResult<CompoundSelector> {
    let (rest, type_selector) = opt(alt((
        value(None, char('*')),
        map(identifier, |tag| Some(tag.to_ascii_lowercase())),
    )))(input)?;
    let (rest, conditions) = many0(simple_selector)(rest)?;

    if type_selector.is_none() && conditions.is_empty() {
        let err = VerboseError::from_error_kind(input, ErrorKind::Verify);
        return Err(nom::Err::Error(VerboseError::add_context(
            input,
            "compound selector",
            err,
        )));
    }

    Ok((
        rest,
        CompoundSelector {
            tag: type_selector.flatten(),
            conditions,
        },
    ))
}

fn combinator(input: &str) -> ParseResult<Combinator> {
    alt((
        value(
            Combinator::Child,
            delimited(multispace0, char('>'), multispace0),
        ),
        value(Combinator::Descendant, multispace1),
    ))(input)
}

fn complex(input: &str) -> ParseResult<ComplexSelector> {
    let (rest, head) = compound(input)?;
    let (rest, tail) = many0(pair(combinator, compound))(rest)?;
    Ok((rest, ComplexSelector { head, tail }))
}

fn selector_list(input: &str) -> ParseResult<SelectorList> {
    map(
        separated_list1(delimited(multispace0, char(','), multispace0), complex),
        SelectorList,
    )(input)
}

/// One-line description of where and why parsing stopped
fn describe_error(input: &str, err: &VerboseError<&str>) -> String {
    let Some((fragment, _)) = err.errors.first() else {
        return "unrecognized selector".to_string();
    };
    let column = input.len() - fragment.len() + 1;

    let contexts: Vec<&str> = err
        .errors
        .iter()
        .filter_map(|(_, kind)| match kind {
            VerboseErrorKind::Context(ctx) => Some(*ctx),
            _ => None,
        })
        .collect();

    let mut message = if fragment.is_empty() {
        format!("unexpected end of selector at column {}", column)
    } else {
        let near: String = fragment.chars().take(12).collect();
        format!("unexpected '{}' at column {}", near, column)
    };
    if !contexts.is_empty() {
        message.push_str(&format!(" (in {})", contexts.join(" > ")));
    }
    message
}

#[cfg(test)]
mod tests {
    use super::*;

    fn compound_of(list: &SelectorList) -> &CompoundSelector {
        &list.0[0].head
    }

    #[test]
    fn test_parse_class() {
        let list = SelectorList::parse(".link-card").unwrap();
        assert_eq!(
            compound_of(&list).conditions,
            vec![SimpleSelector::Class("link-card".into())]
        );
        assert_eq!(compound_of(&list).tag, None);
    }

    #[test]
    fn test_parse_compound() {
        let list = SelectorList::parse("A#main.links[data-kind=\"social\"][rel]").unwrap();
        let compound = compound_of(&list);
        assert_eq!(compound.tag.as_deref(), Some("a"));
        assert_eq!(
            compound.conditions,
            vec![
                SimpleSelector::Id("main".into()),
                SimpleSelector::Class("links".into()),
                SimpleSelector::Attribute {
                    name: "data-kind".into(),
                    value: Some("social".into())
                },
                SimpleSelector::Attribute {
                    name: "rel".into(),
                    value: None
                },
            ]
        );
    }

    #[test]
    fn test_parse_combinators_and_lists() {
        let list = SelectorList::parse("main.links > a .link-title ,  .featured").unwrap();
        assert_eq!(list.0.len(), 2);

        let first = &list.0[0];
        assert_eq!(first.tail.len(), 2);
        assert_eq!(first.tail[0].0, Combinator::Child);
        assert_eq!(first.tail[1].0, Combinator::Descendant);
    }

    #[test]
    fn test_universal() {
        let list = SelectorList::parse("*").unwrap();
        assert_eq!(*compound_of(&list), CompoundSelector::default());
    }

    #[test]
    fn test_invalid_selectors() {
        for bad in ["", "..x", ".", "#", "div[", "[=x]", "> a", "a >", "a,", "a:hover", "a ~ b", "a[x~=y]"] {
            let err = SelectorList::parse(bad).unwrap_err();
            assert!(
                matches!(err, DomError::InvalidSelector { .. }),
                "{:?} should be invalid",
                bad
            );
        }
    }

    #[test]
    fn test_error_mentions_column() {
        let err = SelectorList::parse("a:hover").unwrap_err();
        let DomError::InvalidSelector { reason, .. } = err else {
            panic!("expected invalid selector");
        };
        assert!(reason.contains("column 2"), "{}", reason);
    }
}
