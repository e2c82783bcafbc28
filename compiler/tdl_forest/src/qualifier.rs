//! Qualifier algebra.
//!
//! A node name is `basename[:qual]*[:key=v1,v2]*`. Positional qualifiers keep
//! their order; keyword qualifiers are rendered sorted by key so the same set
//! of qualifiers always yields the same name.
//!
//! Two merge modes exist:
//! - [`Quals::extend`] concatenates positional lists (duplicates kept). Used
//!   for explicit qualification, where `node(a, a)` means what it says.
//! - [`Quals::merge_unique`] drops positional values already present. Used
//!   when synthesizing names of composite nodes, so that children sharing
//!   qualifiers do not multiply them.
//!
//! Both modes union keyword values per key, dropping duplicates.

use std::collections::BTreeMap;
use std::fmt;

use smallvec::SmallVec;

/// A single qualifier value, kept in its rendered form.
#[derive(Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct Qual(String);

impl Qual {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Qual {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Qual({:?})", self.0)
    }
}

impl fmt::Display for Qual {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Qual {
    fn from(s: &str) -> Self {
        Qual(s.to_owned())
    }
}

impl From<String> for Qual {
    fn from(s: String) -> Self {
        Qual(s)
    }
}

impl From<&String> for Qual {
    fn from(s: &String) -> Self {
        Qual(s.clone())
    }
}

macro_rules! qual_from_integer {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Qual {
                fn from(v: $ty) -> Self {
                    Qual(v.to_string())
                }
            }
        )*
    };
}

qual_from_integer!(i32, i64, u32, u64, usize);

/// Qualifier values; most nodes carry at most a handful.
pub type QualList = SmallVec<[Qual; 4]>;

/// Positional and keyword qualifiers of a node.
#[derive(Clone, Default, Eq, PartialEq, Hash, Debug)]
pub struct Quals {
    positional: QualList,
    keyword: BTreeMap<String, QualList>,
}

impl Quals {
    /// No qualifiers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a positional qualifier.
    #[must_use]
    pub fn pos(mut self, qual: impl Into<Qual>) -> Self {
        self.positional.push(qual.into());
        self
    }

    /// Add a keyword qualifier value; a value already present for the key is ignored.
    #[must_use]
    pub fn kw(mut self, key: impl Into<String>, qual: impl Into<Qual>) -> Self {
        push_unique(self.keyword.entry(key.into()).or_default(), qual.into());
        self
    }

    pub fn positional(&self) -> &[Qual] {
        &self.positional
    }

    /// Keyword qualifiers, sorted by key.
    pub fn keyword(&self) -> &BTreeMap<String, QualList> {
        &self.keyword
    }

    pub fn is_empty(&self) -> bool {
        self.positional.is_empty() && self.keyword.is_empty()
    }

    /// Merge `other` into `self`, keeping repeated positional qualifiers.
    pub fn extend(&mut self, other: &Quals) {
        self.positional.extend(other.positional.iter().cloned());
        self.union_keywords(other);
    }

    /// Merge `other` into `self`, dropping positional qualifiers already present.
    pub fn merge_unique(&mut self, other: &Quals) {
        for qual in &other.positional {
            push_unique(&mut self.positional, qual.clone());
        }
        self.union_keywords(other);
    }

    /// Copy of `self` extended by `other`.
    #[must_use]
    pub fn extended(&self, other: &Quals) -> Quals {
        let mut merged = self.clone();
        merged.extend(other);
        merged
    }

    fn union_keywords(&mut self, other: &Quals) {
        for (key, values) in &other.keyword {
            let slot = self.keyword.entry(key.clone()).or_default();
            for value in values {
                push_unique(slot, value.clone());
            }
        }
    }

    /// The `:qual...:key=v1,v2...` suffix, empty when there are no qualifiers.
    pub fn suffix(&self) -> String {
        let mut out = String::new();
        for qual in &self.positional {
            out.push(':');
            out.push_str(qual.as_str());
        }
        for (key, values) in &self.keyword {
            out.push(':');
            out.push_str(key);
            out.push('=');
            for (i, value) in values.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(value.as_str());
            }
        }
        out
    }
}

fn push_unique(list: &mut QualList, qual: Qual) {
    if !list.contains(&qual) {
        list.push(qual);
    }
}

/// Canonical node name for a basename and its qualifiers.
pub fn qualified_name(basename: &str, quals: &Quals) -> String {
    let mut name = String::with_capacity(basename.len() + 8);
    name.push_str(basename);
    name.push_str(&quals.suffix());
    name
}
