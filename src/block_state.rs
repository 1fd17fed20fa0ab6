use std::borrow::Cow;
use std::fmt;

use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

use crate::error::{Result, SchematicError};
use crate::nbt::NbtValue;

/// A block state: a `namespace:name` identifier plus optional properties.
///
/// Properties are kept sorted by key at all times, which makes `Display`
/// output canonical — two states with the same properties always render to
/// the same string, and that string parses back to an equal state.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BlockState {
    name: SmolStr,
    properties: Vec<(SmolStr, SmolStr)>,
}

impl fmt::Display for BlockState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        if !self.properties.is_empty() {
            write!(f, "[")?;
            for (i, (key, value)) in self.properties.iter().enumerate() {
                if i > 0 {
                    write!(f, ",")?;
                }
                write!(f, "{}={}", key, value)?;
            }
            write!(f, "]")?;
        }
        Ok(())
    }
}

impl BlockState {
    pub fn new(name: impl Into<SmolStr>) -> Self {
        BlockState {
            name: name.into(),
            properties: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    pub fn properties(&self) -> &[(SmolStr, SmolStr)] {
        &self.properties
    }

    pub fn with_property(mut self, key: impl Into<SmolStr>, value: impl Into<SmolStr>) -> Self {
        self.set_property(key, value);
        self
    }

    pub fn set_property(&mut self, key: impl Into<SmolStr>, value: impl Into<SmolStr>) {
        let key = key.into();
        let value = value.into();
        match self.properties.binary_search_by(|(k, _)| k.cmp(&key)) {
            Ok(slot) => self.properties[slot].1 = value,
            Err(slot) => self.properties.insert(slot, (key, value)),
        }
    }

    pub fn remove_property(&mut self, key: &str) {
        self.properties.retain(|(k, _)| k != key);
    }

    pub fn get_property(&self, key: &str) -> Option<&SmolStr> {
        self.properties
            .binary_search_by(|(k, _)| k.as_str().cmp(key))
            .ok()
            .map(|slot| &self.properties[slot].1)
    }

    /// Parse the canonical string form, `ns:name` or `ns:name[k=v,...]`.
    /// Exact inverse of `Display` for any well-formed input.
    pub fn parse(text: &str) -> Result<Self> {
        let malformed = || SchematicError::MalformedBlockState(text.to_string());

        let (name, props) = match text.find('[') {
            Some(open) => {
                let props = text[open..].strip_prefix('[').ok_or_else(malformed)?;
                let props = props.strip_suffix(']').ok_or_else(malformed)?;
                (&text[..open], Some(props))
            }
            None => (text, None),
        };
        if name.is_empty() {
            return Err(malformed());
        }

        let mut state = BlockState::new(name);
        if let Some(props) = props {
            if props.is_empty() {
                return Err(malformed());
            }
            for pair in props.split(',') {
                let (key, value) = pair.split_once('=').ok_or_else(malformed)?;
                if key.is_empty() || value.is_empty() {
                    return Err(malformed());
                }
                state.set_property(key, value);
            }
        }
        Ok(state)
    }

    /// The litematic/Anvil palette-entry form:
    /// `{Name: "...", Properties: {k: "v", ...}}`.
    pub fn to_nbt(&self) -> NbtValue<'static> {
        let mut entries: Vec<(Cow<'static, str>, NbtValue<'static>)> = vec![(
            "Name".into(),
            NbtValue::String(Cow::Owned(self.name.to_string())),
        )];
        if !self.properties.is_empty() {
            let props = self
                .properties
                .iter()
                .map(|(key, value)| {
                    (
                        Cow::Owned(key.to_string()),
                        NbtValue::String(Cow::Owned(value.to_string())),
                    )
                })
                .collect();
            entries.push(("Properties".into(), NbtValue::Compound(props)));
        }
        NbtValue::Compound(entries)
    }

    pub fn from_nbt(value: &NbtValue<'_>) -> Result<Self> {
        let name = value.get_str("Name").ok_or_else(|| {
            SchematicError::MalformedBlockState("palette entry without Name".into())
        })?;
        let mut state = BlockState::new(name);
        if let Some(props) = value.get("Properties").and_then(NbtValue::entries) {
            for (key, prop) in props {
                if let Some(text) = prop.as_str() {
                    state.set_property(key.as_ref(), text);
                }
            }
        }
        Ok(state)
    }
}
