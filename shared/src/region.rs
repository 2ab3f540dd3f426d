use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegionKind {
    Root,
    Parent,
    Child,
}

/// Administrative region. Only Root -> Parent -> Child is modeled.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Region {
    pub slug: String,
    pub name: String,
    pub kind: RegionKind,
}

impl Region {
    pub fn root(slug: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            slug: slug.into(),
            name: name.into(),
            kind: RegionKind::Root,
        }
    }

    pub fn parent(slug: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            slug: slug.into(),
            name: name.into(),
            kind: RegionKind::Parent,
        }
    }

    pub fn child(slug: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            slug: slug.into(),
            name: name.into(),
            kind: RegionKind::Child,
        }
    }

    pub const fn is_root(&self) -> bool {
        matches!(self.kind, RegionKind::Root)
    }
}

/// Entry of the "children of parent" endpoint consumed by cascading selectors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityChild {
    pub uuid: String,
    pub short_name: String,
}

#[cfg(test)]
mod tests {
    use super::{EntityChild, Region, RegionKind};

    #[test]
    fn region_kind_serializes_lowercase() {
        let region = Region::parent("p1", "Kinshasa");
        let json = serde_json::to_value(&region).expect("serialize region");
        assert_eq!(json["kind"], "parent");
        assert!(!region.is_root());
        assert!(Region::root("r", "R.D.C").is_root());
        assert_eq!(Region::child("c", "Gombe").kind, RegionKind::Child);
    }

    #[test]
    fn entity_child_ignores_extra_fields() {
        let child: EntityChild = serde_json::from_str(
            r#"{"uuid":"abc","short_name":"Gombe","name":"ZS Gombe","etype":"zone_sante"}"#,
        )
        .expect("entity child should parse");
        assert_eq!(child.uuid, "abc");
        assert_eq!(child.short_name, "Gombe");
    }
}
