//! Resource ID - Parse and format hierarchical resource paths
//!
//! Every managed resource is keyed by a slash-delimited path such as
//! `/subscriptions/{subscriptionId}/resourceGroups/{resourceGroup}/providers/...`.
//! An [`IdShape`] is a static table of literal and value segments describing
//! one family of IDs. Parsing and formatting are driven entirely by that
//! table, so a new resource type only declares its shape (see
//! [`define_resource_id!`](crate::define_resource_id)).

pub mod arm;
mod error;
mod macros;
mod registry;

use std::fmt;

pub use error::{MalformedReason, ResourceIdError};
pub use registry::{RegistryError, ShapeRegistry, ShapeRegistryBuilder};

/// One element of a shape
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment {
    /// Fixed path component (e.g. "subscriptions", "Microsoft.Sql")
    Literal(&'static str),
    /// Variable path component bound to the named field
    UserValue(&'static str),
}

impl Segment {
    pub fn name(&self) -> &'static str {
        match self {
            Segment::Literal(token) => token,
            Segment::UserValue(field) => field,
        }
    }
}

/// How literal segments are compared against the input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LiteralMatch {
    Exact,
    IgnoreAsciiCase,
}

impl LiteralMatch {
    fn matches(self, token: &str, found: &str) -> bool {
        match self {
            LiteralMatch::Exact => token == found,
            LiteralMatch::IgnoreAsciiCase => token.eq_ignore_ascii_case(found),
        }
    }
}

/// Declared sequence of literal and value segments for one ID family
#[derive(Debug, PartialEq, Eq)]
pub struct IdShape {
    /// Registry key (e.g. "ContainerRegistryTaskSchedule")
    pub name: &'static str,
    /// Human-readable resource kind (e.g. "Container Registry Task Schedule")
    pub description: &'static str,
    pub segments: &'static [Segment],
}

impl IdShape {
    /// Parse an ID, matching literal segments with their declared casing
    pub fn parse(&'static self, input: &str) -> Result<ParsedId, ResourceIdError> {
        self.parse_with(input, LiteralMatch::Exact)
    }

    /// Parse an ID, matching literal segments ignoring ASCII case.
    ///
    /// Values keep their casing; formatting the result restores the
    /// declared casing of the literals.
    pub fn parse_insensitively(&'static self, input: &str) -> Result<ParsedId, ResourceIdError> {
        self.parse_with(input, LiteralMatch::IgnoreAsciiCase)
    }

    fn parse_with(
        &'static self,
        input: &str,
        matching: LiteralMatch,
    ) -> Result<ParsedId, ResourceIdError> {
        if input.is_empty() {
            return Err(self.malformed(input, MalformedReason::Empty));
        }
        let Some(path) = input.strip_prefix('/') else {
            return Err(self.malformed(input, MalformedReason::MissingLeadingSlash));
        };

        let mut pieces = path.split('/');
        let mut values = Vec::with_capacity(self.value_count());

        for segment in self.segments {
            let piece = pieces.next();
            match (*segment, piece) {
                (Segment::Literal(token), None | Some("")) => {
                    return Err(self.malformed(input, MalformedReason::MissingSegment(token)));
                }
                (Segment::Literal(token), Some(found)) => {
                    if !matching.matches(token, found) {
                        return Err(self.malformed(
                            input,
                            MalformedReason::UnexpectedSegment {
                                expected: token,
                                found: found.to_string(),
                            },
                        ));
                    }
                }
                (Segment::UserValue(field), None) => {
                    return Err(self.malformed(input, MalformedReason::MissingSegment(field)));
                }
                (Segment::UserValue(field), Some("")) => {
                    return Err(self.malformed(input, MalformedReason::EmptyValue(field)));
                }
                (Segment::UserValue(field), Some(value)) => {
                    values.push((field, value.to_string()));
                }
            }
        }

        let rest: Vec<&str> = pieces.collect();
        if !rest.is_empty() {
            return Err(self.malformed(
                input,
                MalformedReason::TrailingContent(format!("/{}", rest.join("/"))),
            ));
        }

        Ok(ParsedId {
            shape: self,
            values,
        })
    }

    /// Build an ID from values given in declared field order.
    ///
    /// Every value must be non-empty so that the formatted ID parses back.
    pub fn build<S: AsRef<str>>(&'static self, values: &[S]) -> Result<ParsedId, ResourceIdError> {
        let expected = self.value_count();
        if values.len() != expected {
            return Err(self.malformed(
                self.render(values.iter().map(|v| v.as_ref())),
                MalformedReason::FieldCountMismatch {
                    expected,
                    got: values.len(),
                },
            ));
        }

        let mut bound = Vec::with_capacity(expected);
        for (field, value) in self.field_names().zip(values) {
            let value = value.as_ref();
            if value.is_empty() {
                return Err(self.malformed(
                    self.render(values.iter().map(|v| v.as_ref())),
                    MalformedReason::EmptyValue(field),
                ));
            }
            bound.push((field, value.to_string()));
        }

        Ok(ParsedId {
            shape: self,
            values: bound,
        })
    }

    /// Format values (declared field order) into the canonical ID string
    pub fn format<S: AsRef<str>>(&'static self, values: &[S]) -> Result<String, ResourceIdError> {
        self.build(values).map(|id| id.id())
    }

    /// Field names of the value segments, in declared order
    pub fn field_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.segments.iter().filter_map(|s| match s {
            Segment::UserValue(field) => Some(*field),
            Segment::Literal(_) => None,
        })
    }

    pub fn value_count(&self) -> usize {
        self.field_names().count()
    }

    /// Path template with placeholders (e.g. `/subscriptions/{subscriptionId}/...`)
    pub fn template(&self) -> String {
        let mut out = String::new();
        for segment in self.segments {
            out.push('/');
            match segment {
                Segment::Literal(token) => out.push_str(token),
                Segment::UserValue(field) => {
                    out.push('{');
                    out.push_str(&placeholder(field));
                    out.push('}');
                }
            }
        }
        out
    }

    /// Join literals and the given values; values must be in declared order
    fn render<'v>(&self, values: impl IntoIterator<Item = &'v str>) -> String {
        let mut values = values.into_iter();
        let mut out = String::new();
        for segment in self.segments {
            out.push('/');
            match segment {
                Segment::Literal(token) => out.push_str(token),
                Segment::UserValue(_) => out.push_str(values.next().unwrap_or_default()),
            }
        }
        out
    }

    /// Human-readable summary, innermost value first
    fn describe<'v>(
        &self,
        f: &mut fmt::Formatter<'_>,
        fields: impl DoubleEndedIterator<Item = (&'static str, &'v str)>,
    ) -> fmt::Result {
        let parts: Vec<String> = fields
            .rev()
            .map(|(field, value)| format!("{} {:?}", label(field), value))
            .collect();
        write!(f, "{}: ({})", self.description, parts.join(" / "))
    }

    fn malformed(&self, input: impl Into<String>, reason: MalformedReason) -> ResourceIdError {
        ResourceIdError::new(self.name, input, reason)
    }
}

/// `resource_group` -> `Resource Group`
fn label(field: &str) -> String {
    field
        .split('_')
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// `resource_group` -> `resourceGroup`
fn placeholder(field: &str) -> String {
    let mut out = String::with_capacity(field.len());
    let mut upper = false;
    for c in field.chars() {
        if c == '_' {
            upper = true;
        } else if upper {
            out.extend(c.to_uppercase());
            upper = false;
        } else {
            out.push(c);
        }
    }
    out
}

/// Ordered field values extracted from (or built for) one shape
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedId {
    shape: &'static IdShape,
    values: Vec<(&'static str, String)>,
}

impl ParsedId {
    pub fn shape(&self) -> &'static IdShape {
        self.shape
    }

    /// Value bound to `field`
    pub fn get(&self, field: &str) -> Option<&str> {
        self.values
            .iter()
            .find(|(name, _)| *name == field)
            .map(|(_, value)| value.as_str())
    }

    /// `(field, value)` pairs in declared order
    pub fn fields(&self) -> impl DoubleEndedIterator<Item = (&'static str, &str)> {
        self.values.iter().map(|(name, value)| (*name, value.as_str()))
    }

    pub fn into_values(self) -> Vec<(&'static str, String)> {
        self.values
    }

    /// Fail unless this ID was parsed or built with `shape`
    pub fn expect_shape(&self, shape: &'static IdShape) -> Result<(), ResourceIdError> {
        if self.shape == shape {
            return Ok(());
        }
        Err(shape.malformed(
            self.id(),
            MalformedReason::ShapeMismatch {
                expected: shape.name,
                found: self.shape.name,
            },
        ))
    }

    /// Canonical ID string
    pub fn id(&self) -> String {
        self.shape.render(self.values.iter().map(|(_, v)| v.as_str()))
    }
}

impl fmt::Display for ParsedId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.shape.describe(f, self.fields())
    }
}

/// A strongly-typed ID bound to a single shape.
///
/// Implemented by the structs generated with
/// [`define_resource_id!`](crate::define_resource_id).
pub trait ResourceIdentifier: Sized + fmt::Display {
    const SHAPE: &'static IdShape;

    /// Typed view of a parsed ID; fails when it has another shape
    fn from_parsed(parsed: ParsedId) -> Result<Self, ResourceIdError>;

    /// Value of the named field
    fn field(&self, name: &str) -> Option<&str>;

    /// Field values in declared order
    fn values(&self) -> Vec<&str> {
        Self::SHAPE
            .field_names()
            .filter_map(|name| self.field(name))
            .collect()
    }

    /// Canonical ID string
    fn id(&self) -> String {
        Self::SHAPE.render(self.values())
    }

    /// Untyped view, for code that handles many shapes
    fn to_parsed(&self) -> ParsedId {
        ParsedId {
            shape: Self::SHAPE,
            values: Self::SHAPE
                .field_names()
                .map(|name| (name, self.field(name).unwrap_or_default().to_string()))
                .collect(),
        }
    }

    fn parse(input: &str) -> Result<Self, ResourceIdError> {
        Self::SHAPE.parse(input).and_then(Self::from_parsed)
    }

    fn parse_insensitively(input: &str) -> Result<Self, ResourceIdError> {
        Self::SHAPE.parse_insensitively(input).and_then(Self::from_parsed)
    }

    /// Describe the ID the way error messages refer to it
    fn describe(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fields: Vec<(&'static str, &str)> = Self::SHAPE
            .field_names()
            .filter_map(|name| self.field(name).map(|value| (name, value)))
            .collect();
        Self::SHAPE.describe(f, fields.into_iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    static TASK_SCHEDULE: IdShape = IdShape {
        name: "ContainerRegistryTaskSchedule",
        description: "Container Registry Task Schedule",
        segments: &[
            Segment::Literal("subscriptions"),
            Segment::UserValue("subscription_id"),
            Segment::Literal("resourceGroups"),
            Segment::UserValue("resource_group"),
            Segment::Literal("providers"),
            Segment::Literal("Microsoft.ContainerRegistry"),
            Segment::Literal("registries"),
            Segment::UserValue("registry_name"),
            Segment::Literal("tasks"),
            Segment::UserValue("task_name"),
            Segment::Literal("schedule"),
            Segment::UserValue("schedule_name"),
        ],
    };

    const VALID: &str = "/subscriptions/12345678-1234-9876-4563-123456789012/resourceGroups/group1/providers/Microsoft.ContainerRegistry/registries/registry1/tasks/task1/schedule/schedule1";

    fn reason(input: &str) -> MalformedReason {
        TASK_SCHEDULE.parse(input).unwrap_err().reason
    }

    #[test]
    fn parse_valid() {
        let id = TASK_SCHEDULE.parse(VALID).unwrap();
        assert_eq!(
            id.get("subscription_id"),
            Some("12345678-1234-9876-4563-123456789012")
        );
        assert_eq!(id.get("resource_group"), Some("group1"));
        assert_eq!(id.get("registry_name"), Some("registry1"));
        assert_eq!(id.get("task_name"), Some("task1"));
        assert_eq!(id.get("schedule_name"), Some("schedule1"));
        assert_eq!(id.id(), VALID);
    }

    #[test]
    fn parse_empty() {
        assert_eq!(reason(""), MalformedReason::Empty);
    }

    #[test]
    fn parse_requires_leading_slash() {
        assert_eq!(reason(&VALID[1..]), MalformedReason::MissingLeadingSlash);
    }

    #[test]
    fn parse_missing_segments() {
        assert_eq!(reason("/"), MalformedReason::MissingSegment("subscriptions"));
        assert_eq!(
            reason("/subscriptions"),
            MalformedReason::MissingSegment("subscription_id")
        );
        assert_eq!(
            reason("/subscriptions/12345678-1234-9876-4563-123456789012/"),
            MalformedReason::MissingSegment("resourceGroups")
        );
        assert_eq!(
            reason("/subscriptions/12345678-1234-9876-4563-123456789012/resourceGroups/group1/providers/Microsoft.ContainerRegistry/registries/registry1/tasks/task1/"),
            MalformedReason::MissingSegment("schedule")
        );
    }

    #[test]
    fn parse_empty_values() {
        assert_eq!(
            reason("/subscriptions/"),
            MalformedReason::EmptyValue("subscription_id")
        );
        assert_eq!(
            reason("/subscriptions/12345678-1234-9876-4563-123456789012/resourceGroups/group1/providers/Microsoft.ContainerRegistry/registries/registry1/tasks/task1/schedule/"),
            MalformedReason::EmptyValue("schedule_name")
        );
        assert_eq!(
            reason("/subscriptions//resourceGroups/group1/providers/Microsoft.ContainerRegistry/registries/registry1/tasks/task1/schedule/schedule1"),
            MalformedReason::EmptyValue("subscription_id")
        );
    }

    #[test]
    fn parse_rejects_every_truncation() {
        for (i, c) in VALID.char_indices() {
            if c == '/' {
                assert!(TASK_SCHEDULE.parse(&VALID[..=i]).is_err(), "{}", &VALID[..=i]);
                assert!(TASK_SCHEDULE.parse(&VALID[..i]).is_err(), "{}", &VALID[..i]);
            }
        }
    }

    #[test]
    fn parse_rejects_trailing_content() {
        assert_eq!(
            reason(&format!("{}/", VALID)),
            MalformedReason::TrailingContent("/".to_string())
        );
        assert_eq!(
            reason(&format!("{}/runs/run1", VALID)),
            MalformedReason::TrailingContent("/runs/run1".to_string())
        );
    }

    #[test]
    fn parse_is_case_sensitive_on_literals() {
        assert!(TASK_SCHEDULE.parse(&VALID.to_uppercase()).is_err());
        assert_eq!(
            reason(&VALID.replace("resourceGroups", "resourcegroups")),
            MalformedReason::UnexpectedSegment {
                expected: "resourceGroups",
                found: "resourcegroups".to_string(),
            }
        );
    }

    #[test]
    fn parse_insensitively_normalizes_literals() {
        let recased = VALID
            .replace("resourceGroups", "resourcegroups")
            .replace("Microsoft.ContainerRegistry", "microsoft.containerregistry");
        let id = TASK_SCHEDULE.parse_insensitively(&recased).unwrap();
        assert_eq!(id.id(), VALID);

        let upper = TASK_SCHEDULE
            .parse_insensitively(&VALID.to_uppercase())
            .unwrap();
        assert_eq!(upper.get("registry_name"), Some("REGISTRY1"));
    }

    #[test]
    fn format_exact() {
        let id = TASK_SCHEDULE
            .format(&[
                "12345678-1234-9876-4563-123456789012",
                "group1",
                "registry1",
                "task1",
                "schedule1",
            ])
            .unwrap();
        assert_eq!(id, VALID);
    }

    #[test]
    fn build_rejects_empty_values() {
        let err = TASK_SCHEDULE
            .build(&["sub", "group1", "", "task1", "schedule1"])
            .unwrap_err();
        assert_eq!(err.reason, MalformedReason::EmptyValue("registry_name"));
    }

    #[test]
    fn build_rejects_wrong_count() {
        let err = TASK_SCHEDULE.build(&["sub", "group1"]).unwrap_err();
        assert_eq!(
            err.reason,
            MalformedReason::FieldCountMismatch {
                expected: 5,
                got: 2
            }
        );
    }

    #[test]
    fn template_uses_camel_case_placeholders() {
        assert_eq!(
            TASK_SCHEDULE.template(),
            "/subscriptions/{subscriptionId}/resourceGroups/{resourceGroup}/providers/Microsoft.ContainerRegistry/registries/{registryName}/tasks/{taskName}/schedule/{scheduleName}"
        );
    }

    #[test]
    fn display_lists_innermost_first() {
        let id = TASK_SCHEDULE.parse(VALID).unwrap();
        assert_eq!(
            id.to_string(),
            "Container Registry Task Schedule: (Schedule Name \"schedule1\" / Task Name \"task1\" / Registry Name \"registry1\" / Resource Group \"group1\" / Subscription Id \"12345678-1234-9876-4563-123456789012\")"
        );
    }
    #[test]
    fn expect_shape_rejects_other_shapes() {
        static RESOURCE_GROUP: IdShape = IdShape {
            name: "ResourceGroup",
            description: "Resource Group",
            segments: &[
                Segment::Literal("subscriptions"),
                Segment::UserValue("subscription_id"),
                Segment::Literal("resourceGroups"),
                Segment::UserValue("resource_group"),
            ],
        };

        let id = TASK_SCHEDULE.parse(VALID).unwrap();
        assert!(id.expect_shape(&TASK_SCHEDULE).is_ok());

        let err = id.expect_shape(&RESOURCE_GROUP).unwrap_err();
        assert_eq!(err.shape, "ResourceGroup");
        assert_eq!(
            err.reason,
            MalformedReason::ShapeMismatch {
                expected: "ResourceGroup",
                found: "ContainerRegistryTaskSchedule",
            }
        );
    }
}
