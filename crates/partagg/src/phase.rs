use crate::value::Category;
use core::fmt;

/// Execution phase an evaluator instance is configured for
///
/// | phase | consumes | emits |
/// |-------|----------|-------|
/// | [`Phase::Partial`] | raw rows | frame |
/// | [`Phase::PartialMerge`] | frames | frame |
/// | [`Phase::Final`] | frames | result |
/// | [`Phase::Complete`] | raw rows | result |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// Raw rows in, partial frame out
    Partial,
    /// Partial frames in, partial frame out
    PartialMerge,
    /// Partial frames in, final result out
    Final,
    /// Raw rows in, final result out
    Complete,
}

impl Phase {
    /// Returns `true` if the phase consumes raw row values
    #[inline]
    pub const fn consumes_raw(self) -> bool {
        matches!(self, Phase::Partial | Phase::Complete)
    }
    /// Returns `true` if the phase emits a partial frame rather than a final result
    #[inline]
    pub const fn emits_frame(self) -> bool {
        matches!(self, Phase::Partial | Phase::PartialMerge)
    }
}

/// Shape of a value flowing in or out of an evaluator
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Shape {
    /// A primitive scalar of the given category
    Primitive(Category),
    /// A primitive scalar whose category travels with each value
    Any,
    /// A map from one shape to another
    Map(Box<Shape>, Box<Shape>),
    /// A record of named fields
    Struct(Vec<(&'static str, Shape)>),
}

impl Shape {
    /// Shape of every partial frame
    pub const BINARY: Shape = Shape::Primitive(Category::Binary);
    /// Shape of a double result
    pub const DOUBLE: Shape = Shape::Primitive(Category::Double);

    /// Returns the primitive category if the shape is primitive
    pub fn category(&self) -> Option<Category> {
        match self {
            Shape::Primitive(c) => Some(*c),
            _ => None,
        }
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Shape::Primitive(c) => write!(f, "{c}"),
            Shape::Any => f.write_str("any"),
            Shape::Map(k, v) => write!(f, "map<{k},{v}>"),
            Shape::Struct(fields) => {
                f.write_str("struct<")?;
                for (i, (name, shape)) in fields.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "{name}:{shape}")?;
                }
                f.write_str(">")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phase_table() {
        assert!(Phase::Partial.consumes_raw() && Phase::Partial.emits_frame());
        assert!(!Phase::PartialMerge.consumes_raw() && Phase::PartialMerge.emits_frame());
        assert!(!Phase::Final.consumes_raw() && !Phase::Final.emits_frame());
        assert!(Phase::Complete.consumes_raw() && !Phase::Complete.emits_frame());
    }

    #[test]
    fn struct_shape_display() {
        let shape = Shape::Struct(vec![("cardinality", Shape::DOUBLE), ("sketch", Shape::BINARY)]);
        assert_eq!(shape.to_string(), "struct<cardinality:double,sketch:binary>");
    }
}
