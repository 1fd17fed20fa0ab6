use super::value::NbtTag;

/// Schema describing the expected layout of an NBT tree.
///
/// Shapes guide the parser: a field present on disk but absent from a
/// [`Shape::Compound`] is skipped structurally without producing a value,
/// which is what keeps chunk parsing cheap across format generations.
/// [`Shape::Any`] accepts anything on the read side and refuses to
/// serialize, so `Any`-shaped data is parse-only by construction.
#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    /// Accept any value. Cannot be serialized.
    Any,
    /// A leaf of exactly this tag kind.
    Leaf(NbtTag),
    /// A list whose elements all match the inner shape.
    List(Box<Shape>),
    /// A compound where every key maps to the inner shape
    /// (e.g. block-state `Properties`).
    Wildcard(Box<Shape>),
    /// A compound with a fixed key set. Unlisted on-disk keys are skipped.
    Compound(Vec<(&'static str, Shape)>),
}

impl Shape {
    pub const BYTE: Shape = Shape::Leaf(NbtTag::Byte);
    pub const SHORT: Shape = Shape::Leaf(NbtTag::Short);
    pub const INT: Shape = Shape::Leaf(NbtTag::Int);
    pub const LONG: Shape = Shape::Leaf(NbtTag::Long);
    pub const FLOAT: Shape = Shape::Leaf(NbtTag::Float);
    pub const DOUBLE: Shape = Shape::Leaf(NbtTag::Double);
    pub const BYTE_ARRAY: Shape = Shape::Leaf(NbtTag::ByteArray);
    pub const STRING: Shape = Shape::Leaf(NbtTag::String);
    pub const INT_ARRAY: Shape = Shape::Leaf(NbtTag::IntArray);
    pub const LONG_ARRAY: Shape = Shape::Leaf(NbtTag::LongArray);

    pub fn list(inner: Shape) -> Shape {
        Shape::List(Box::new(inner))
    }

    pub fn wildcard(inner: Shape) -> Shape {
        Shape::Wildcard(Box::new(inner))
    }

    pub fn compound<I>(fields: I) -> Shape
    where
        I: IntoIterator<Item = (&'static str, Shape)>,
    {
        Shape::Compound(fields.into_iter().collect())
    }

    /// Shape for a named field of a compound shape. `None` means "skip".
    pub(crate) fn field(&self, name: &str) -> Option<&Shape> {
        match self {
            Shape::Any => Some(&Shape::Any),
            Shape::Wildcard(inner) => Some(inner),
            Shape::Compound(fields) => fields
                .iter()
                .find(|(key, _)| *key == name)
                .map(|(_, shape)| shape),
            _ => None,
        }
    }

    /// Element shape of a list shape.
    pub(crate) fn element(&self) -> &Shape {
        match self {
            Shape::List(inner) => inner,
            _ => &Shape::Any,
        }
    }

    /// Does a value of this tag kind satisfy the shape?
    pub(crate) fn matches(&self, tag: NbtTag) -> bool {
        match self {
            Shape::Any => true,
            Shape::Leaf(expected) => *expected == tag,
            Shape::List(_) => tag == NbtTag::List,
            Shape::Wildcard(_) | Shape::Compound(_) => tag == NbtTag::Compound,
        }
    }

    /// Human-readable kind for type-mismatch errors.
    pub(crate) fn expected_name(&self) -> &'static str {
        match self {
            Shape::Any => "any",
            Shape::Leaf(tag) => tag.name(),
            Shape::List(_) => "List",
            Shape::Wildcard(_) | Shape::Compound(_) => "Compound",
        }
    }

    /// On-disk tag byte a value of this shape serializes with.
    /// `None` for [`Shape::Any`], which cannot be written.
    pub(crate) fn serialized_tag(&self) -> Option<NbtTag> {
        match self {
            Shape::Any => None,
            Shape::Leaf(tag) => Some(*tag),
            Shape::List(_) => Some(NbtTag::List),
            Shape::Wildcard(_) | Shape::Compound(_) => Some(NbtTag::Compound),
        }
    }
}
