//! Resource schemas.
//!
//! A [`Schema`] is a tree of [`Block`]s holding typed [`Attribute`]s with
//! validators. The plugin runtime uses it for plan/diff; this crate uses it
//! to validate configuration JSON before touching the device.
//!
//! ```
//! use junos_provider::schema::{Attribute, Block, Schema, Validator};
//!
//! let schema = Schema::new(
//!     0,
//!     Block::new("Configure a NTP server.")
//!         .attribute("id", Attribute::id())
//!         .attribute(
//!             "address",
//!             Attribute::string()
//!                 .required()
//!                 .description("Address of the server.")
//!                 .validator(Validator::IpAddress),
//!         ),
//! );
//! assert!(schema.block.attributes.contains_key("address"));
//! ```

mod validate;

use indexmap::IndexMap;

pub use validate::Validator;

use crate::setline::tokenize;

/// Value type of an attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttrType {
    String,
    Bool,
    Int64,
    /// Ordered list of strings.
    ListString,
    /// Unordered set of strings.
    SetString,
}

impl AttrType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttrType::String => "string",
            AttrType::Bool => "bool",
            AttrType::Int64 => "number",
            AttrType::ListString => "list of string",
            AttrType::SetString => "set of string",
        }
    }
}

/// A typed attribute.
#[derive(Debug, Clone)]
pub struct Attribute {
    pub ty: AttrType,
    pub required: bool,
    pub computed: bool,
    pub sensitive: bool,
    pub description: String,
    pub validators: Vec<Validator>,
}

impl Attribute {
    fn of(ty: AttrType) -> Self {
        Self {
            ty,
            required: false,
            computed: false,
            sensitive: false,
            description: String::new(),
            validators: Vec::new(),
        }
    }

    pub fn string() -> Self {
        Self::of(AttrType::String)
    }

    pub fn bool() -> Self {
        Self::of(AttrType::Bool)
    }

    pub fn int64() -> Self {
        Self::of(AttrType::Int64)
    }

    pub fn list_string() -> Self {
        Self::of(AttrType::ListString)
    }

    pub fn set_string() -> Self {
        Self::of(AttrType::SetString)
    }

    /// The computed `id` attribute every resource carries.
    pub fn id() -> Self {
        Self::string()
            .computed()
            .description("An identifier for the resource.")
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn computed(mut self) -> Self {
        self.computed = true;
        self
    }

    pub fn sensitive(mut self) -> Self {
        self.sensitive = true;
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn validator(mut self, validator: Validator) -> Self {
        self.validators.push(validator);
        self
    }
}

/// How a nested block repeats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Nesting {
    /// At most one instance, a JSON object.
    Single,
    /// A JSON array of objects with bounds on the count (`max` 0 = unbounded).
    List { min: usize, max: usize },
    /// Like `List`, order does not matter.
    Set { min: usize, max: usize },
}

/// A nested block and how it repeats.
#[derive(Debug, Clone)]
pub struct NestedBlock {
    pub nesting: Nesting,
    pub block: Block,
}

impl NestedBlock {
    pub fn single(block: Block) -> Self {
        Self {
            nesting: Nesting::Single,
            block,
        }
    }

    pub fn list(block: Block) -> Self {
        Self {
            nesting: Nesting::List { min: 0, max: 0 },
            block,
        }
    }

    pub fn set(block: Block) -> Self {
        Self {
            nesting: Nesting::Set { min: 0, max: 0 },
            block,
        }
    }

    /// Bound the number of instances of a list or set block.
    pub fn bounds(mut self, min_items: usize, max_items: usize) -> Self {
        self.nesting = match self.nesting {
            Nesting::Single => Nesting::Single,
            Nesting::List { .. } => Nesting::List {
                min: min_items,
                max: max_items,
            },
            Nesting::Set { .. } => Nesting::Set {
                min: min_items,
                max: max_items,
            },
        };
        self
    }
}

/// Attributes and nested blocks at one level of the tree.
#[derive(Debug, Clone, Default)]
pub struct Block {
    pub description: String,
    pub attributes: IndexMap<&'static str, Attribute>,
    pub blocks: IndexMap<&'static str, NestedBlock>,
    /// Names (attributes or blocks) of which at least one must be set.
    pub at_least_one_of: Vec<&'static str>,
}

impl Block {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            ..Default::default()
        }
    }

    pub fn attribute(mut self, name: &'static str, attribute: Attribute) -> Self {
        self.attributes.insert(name, attribute);
        self
    }

    pub fn block(mut self, name: &'static str, block: NestedBlock) -> Self {
        self.blocks.insert(name, block);
        self
    }

    /// Require at least one of `names` to be configured.
    pub fn at_least_one_of(mut self, names: &[&'static str]) -> Self {
        self.at_least_one_of = names.to_vec();
        self
    }
}

/// A versioned resource or data source schema.
#[derive(Debug, Clone)]
pub struct Schema {
    pub version: i64,
    pub block: Block,
}

impl Schema {
    pub fn new(version: i64, block: Block) -> Self {
        Self { version, block }
    }

    /// Attribute path that a configuration line sets.
    ///
    /// `object` is the object's configuration path (`system ntp server
    /// 10.0.0.1`); a line outside it has no path. The segments after it
    /// are walked down the schema tree, reading `-` as `_`, up to the
    /// first attribute name.
    pub fn path_of_line(&self, line: &str, object: &str) -> Option<String> {
        let segments = tokenize(line);
        let object = tokenize(object);
        let rest = segments.get(1..)?.strip_prefix(object.as_slice())?;

        let mut block = &self.block;
        let mut path = String::new();
        for segment in rest {
            let name = segment.replace('-', "_");
            if let Some((key, _)) = block.attributes.get_key_value(name.as_str()) {
                return Some(join_path(&path, key));
            }
            if let Some((key, nested)) = block.blocks.get_key_value(name.as_str()) {
                path = join_path(&path, key);
                block = &nested.block;
            }
        }
        (!path.is_empty()).then_some(path)
    }

    /// Names of sensitive attributes, dotted from the root.
    pub fn sensitive_paths(&self) -> Vec<String> {
        let mut paths = Vec::new();
        collect_sensitive(&self.block, "", &mut paths);
        paths
    }
}

fn collect_sensitive(block: &Block, prefix: &str, out: &mut Vec<String>) {
    for (name, attr) in &block.attributes {
        if attr.sensitive {
            out.push(join_path(prefix, name));
        }
    }
    for (name, nested) in &block.blocks {
        collect_sensitive(&nested.block, &join_path(prefix, name), out);
    }
}

pub(crate) fn join_path(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{prefix}.{name}")
    }
}
