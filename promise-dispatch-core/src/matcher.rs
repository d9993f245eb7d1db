//! Hook matching
//!
//! A [`Matcher`] decides whether a global hook applies to a notification.
//! It sees the lifecycle stage and the notification itself; string-based
//! matchers test the notification's resolved type name.
//!
//! Matchers support:
//! - stage sentinels from [`action_types`] (`START`, `SUCCESS`, `ERROR`, `FINISH`)
//! - exact type names
//! - glob patterns (`*` any sequence, `?` any single character)
//! - regular expressions
//! - custom predicates
//! - lists of any of the above, accepted when any element accepts

use std::fmt;
use std::sync::Arc;

use regex::Regex;

use crate::action::{Action, Stage, TYPE_FIELD};
use crate::error::Result;

/// Stage sentinel usable only as a matcher.
///
/// Sentinels are a distinct type, so they can never be confused with a user
/// type name that happens to read `"start"`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ActionType {
    /// Matches the start stage.
    Start,
    /// Matches the success stage.
    Success,
    /// Matches the error stage.
    Error,
    /// Matches success and error.
    Finish,
}

impl ActionType {
    /// Whether this sentinel accepts a stage.
    pub fn accepts(self, stage: Stage) -> bool {
        match self {
            ActionType::Start => stage == Stage::Start,
            ActionType::Success => stage == Stage::Success,
            ActionType::Error => stage == Stage::Error,
            ActionType::Finish => stage.is_finish(),
        }
    }
}

/// Sentinel constants for stage-based matching.
pub mod action_types {
    use super::ActionType;

    /// Matches start notifications.
    pub const START: ActionType = ActionType::Start;
    /// Matches success notifications.
    pub const SUCCESS: ActionType = ActionType::Success;
    /// Matches error notifications.
    pub const ERROR: ActionType = ActionType::Error;
    /// Matches success and error notifications.
    pub const FINISH: ActionType = ActionType::Finish;
}

/// Custom predicate: receives the resolved type name and the notification
/// without its `type` field.
#[derive(Clone)]
pub struct Predicate(Arc<dyn Fn(Option<&str>, &Action) -> bool + Send + Sync>);

impl Predicate {
    /// Wrap a predicate closure.
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(Option<&str>, &Action) -> bool + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    /// Evaluate the predicate.
    pub fn test(&self, type_name: Option<&str>, rest: &Action) -> bool {
        (self.0)(type_name, rest)
    }
}

impl fmt::Debug for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Predicate(..)")
    }
}

/// Predicate deciding whether a hook applies to a notification.
#[derive(Clone, Debug)]
pub enum Matcher {
    /// Stage sentinel.
    Stage(ActionType),
    /// Type name equals the string.
    Exact(String),
    /// Type name matches the glob pattern.
    Glob(String),
    /// Type name matches the regular expression.
    Pattern(Regex),
    /// Custom predicate.
    Predicate(Predicate),
    /// Any element matches. An empty list never matches.
    Any(Vec<Matcher>),
}

impl Matcher {
    /// Match a type name exactly.
    pub fn exact(type_name: impl Into<String>) -> Self {
        Matcher::Exact(type_name.into())
    }

    /// Match type names against a glob pattern.
    pub fn glob(pattern: impl Into<String>) -> Self {
        Matcher::Glob(pattern.into())
    }

    /// Match type names against a regular expression.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError::InvalidPattern`](crate::ConfigurationError::InvalidPattern)
    /// if the expression does not compile.
    pub fn pattern(expr: &str) -> Result<Self> {
        Ok(Matcher::Pattern(Regex::new(expr)?))
    }

    /// Match with a custom predicate.
    pub fn predicate<F>(f: F) -> Self
    where
        F: Fn(Option<&str>, &Action) -> bool + Send + Sync + 'static,
    {
        Matcher::Predicate(Predicate::new(f))
    }

    /// Match when any of the given matchers does.
    pub fn any<I, M>(matchers: I) -> Self
    where
        I: IntoIterator<Item = M>,
        M: Into<Matcher>,
    {
        Matcher::Any(matchers.into_iter().map(Into::into).collect())
    }

    /// Whether this matcher accepts the notification at the given stage.
    pub fn matches(&self, stage: Stage, notification: &Action) -> bool {
        let type_name = notification.type_name();
        match self {
            Matcher::Stage(sentinel) => sentinel.accepts(stage),
            Matcher::Exact(expected) => type_name == Some(expected.as_str()),
            Matcher::Glob(pattern) => type_name.is_some_and(|name| glob_match(pattern, name)),
            Matcher::Pattern(regex) => type_name.is_some_and(|name| regex.is_match(name)),
            Matcher::Predicate(predicate) => {
                predicate.test(type_name, &notification.without(&[TYPE_FIELD]))
            }
            // Every element is evaluated; predicates may observe their calls.
            Matcher::Any(matchers) => matchers
                .iter()
                .fold(false, |matched, m| m.matches(stage, notification) | matched),
        }
    }
}

impl From<ActionType> for Matcher {
    fn from(sentinel: ActionType) -> Self {
        Matcher::Stage(sentinel)
    }
}

impl From<&str> for Matcher {
    fn from(type_name: &str) -> Self {
        Matcher::exact(type_name)
    }
}

impl From<String> for Matcher {
    fn from(type_name: String) -> Self {
        Matcher::Exact(type_name)
    }
}

impl From<Regex> for Matcher {
    fn from(regex: Regex) -> Self {
        Matcher::Pattern(regex)
    }
}

impl From<Predicate> for Matcher {
    fn from(predicate: Predicate) -> Self {
        Matcher::Predicate(predicate)
    }
}

impl<M: Into<Matcher>> From<Vec<M>> for Matcher {
    fn from(matchers: Vec<M>) -> Self {
        Matcher::any(matchers)
    }
}

/// Combine an accept matcher with an exclude matcher.
///
/// A matching exclude rejects. With an exclude but no accept matcher,
/// everything not excluded is accepted. With neither, nothing is.
pub fn accepts(
    matcher: Option<&Matcher>,
    exclude: Option<&Matcher>,
    stage: Stage,
    notification: &Action,
) -> bool {
    if let Some(exclude) = exclude {
        let excluded = exclude.matches(stage, notification);
        let Some(matcher) = matcher else {
            return !excluded;
        };
        if excluded {
            return false;
        }
        return matcher.matches(stage, notification);
    }
    matcher.is_some_and(|m| m.matches(stage, notification))
}

/// Glob match of a whole type name.
///
/// `*` matches any run of characters, `?` exactly one. The pattern is split
/// on `*`: the first and last segments are anchored to the ends of the text,
/// the segments between are placed left to right at their earliest fit.
pub fn glob_match(pattern: &str, text: &str) -> bool {
    let text: Vec<char> = text.chars().collect();
    let segments: Vec<Vec<char>> = pattern.split('*').map(|s| s.chars().collect()).collect();

    match segments.as_slice() {
        [] => text.is_empty(),
        [literal] => literal.len() == text.len() && fits(literal, &text),
        [head, middle @ .., tail] => {
            if head.len() + tail.len() > text.len() {
                return false;
            }
            let (prefix, rest) = text.split_at(head.len());
            let (mut window, suffix) = rest.split_at(rest.len() - tail.len());
            if !fits(head, prefix) || !fits(tail, suffix) {
                return false;
            }
            for segment in middle {
                let Some(at) = earliest_fit(segment, window) else {
                    return false;
                };
                window = &window[at + segment.len()..];
            }
            true
        }
    }
}

/// Segment against an equally long slice of text.
fn fits(segment: &[char], text: &[char]) -> bool {
    segment.iter().zip(text).all(|(p, t)| *p == '?' || p == t)
}

fn earliest_fit(segment: &[char], text: &[char]) -> Option<usize> {
    if segment.is_empty() {
        return Some(0);
    }
    text.windows(segment.len()).position(|w| fits(segment, w))
}
