use crate::{AnnotationError, EntitySpan, Span};
use std::mem::take;

/// Position of a token in an entity, as encoded by the prefix of its tag. Plain tags such as
/// `PERSON` carry no prefix and behave like `I`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Position {
    Outside,
    Begin,
    Inside,
    End,
    Single,
}

/// Splits an entity tag into its position and its type.
fn parse_tag(tag: &str) -> Result<(Position, &str), AnnotationError> {
    if tag.is_empty() || tag == "O" {
        return Ok((Position::Outside, ""));
    }
    if tag == "-" {
        return Err(AnnotationError::InvalidTag(String::from(tag)));
    }
    let mut chars = tag.char_indices();
    let prefixed = match (chars.next(), chars.next()) {
        (Some((_, prefix)), Some((_, '-'))) => match prefix {
            'B' => Some(Position::Begin),
            'I' => Some(Position::Inside),
            'E' | 'L' => Some(Position::End),
            'S' | 'U' => Some(Position::Single),
            _ => None,
        },
        _ => None,
    };
    match prefixed {
        Some(position) => {
            let entity_type = &tag[2..];
            if entity_type.is_empty() {
                return Err(AnnotationError::InvalidTag(String::from(tag)));
            }
            Ok((position, entity_type))
        }
        None => Ok((Position::Inside, tag)),
    }
}

/// Groups per-token entity tags into entity spans. Both plain tags (`PERSON PERSON O`) and
/// prefixed tags (`B-PER I-PER O`) are accepted.
pub fn entity_spans(tags: &[String]) -> Result<Vec<EntitySpan>, AnnotationError> {
    let mut entities = vec![];
    // Type and start of the entity currently open.
    let mut current: Option<(&str, usize)> = None;
    let mut close = |current: &mut Option<(&str, usize)>, end: usize| {
        if let Some((label, start)) = take(current) {
            entities.push(EntitySpan {
                label: String::from(label),
                span: Span { start, end },
            });
        }
    };
    for (index, tag) in tags.iter().enumerate() {
        let (position, entity_type) = parse_tag(tag)?;
        let continues = matches!(position, Position::Inside | Position::End)
            && matches!(current, Some((open, _)) if open == entity_type);
        if !continues {
            close(&mut current, index);
            if position != Position::Outside {
                current = Some((entity_type, index));
            }
        }
        if matches!(position, Position::End | Position::Single) {
            close(&mut current, index + 1);
        }
    }
    close(&mut current, tags.len());
    Ok(entities)
}

/// Converts one-based dependency heads, where `0` marks the root, into zero-based indices where
/// the root points at itself.
pub fn align_heads(heads: &[usize], len: usize) -> Result<Vec<usize>, AnnotationError> {
    heads
        .iter()
        .enumerate()
        .map(|(token, head)| match *head {
            0 => Ok(token),
            h if h <= len => Ok(h - 1),
            h => Err(AnnotationError::HeadOutOfRange {
                token,
                head: h,
                len,
            }),
        })
        .collect()
}
