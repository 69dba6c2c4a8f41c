use itertools::Itertools;
use std::fmt;

/// One step into the nested runtime specification: a named field or a list
/// index.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathSegment {
    Field(String),
    Index(usize),
}

/// Location of a single field inside an entity, e.g.
/// `spec.template.spec.domain.devices.disks[0].bus`. Equality is structural
/// over the segment sequence.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct FieldPath {
    segments: Vec<PathSegment>,
}

impl FieldPath {
    pub fn new(fields: &[&str]) -> Self {
        Self {
            segments: fields
                .iter()
                .map(|f| PathSegment::Field(f.to_string()))
                .collect(),
        }
    }

    pub fn child(&self, field: &str) -> Self {
        let mut path = self.clone();
        path.segments.push(PathSegment::Field(field.to_string()));
        path
    }

    pub fn index(&self, index: usize) -> Self {
        let mut path = self.clone();
        path.segments.push(PathSegment::Index(index));
        path
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            match segment {
                PathSegment::Field(name) => {
                    if i > 0 {
                        write!(f, ".")?;
                    }
                    write!(f, "{}", name)?;
                }
                PathSegment::Index(index) => write!(f, "[{}]", index)?,
            }
        }
        Ok(())
    }
}

/// Ordered, deduplicated set of conflicting field paths. Insertion order is
/// detection order; re-recording a path never duplicates it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConflictSet {
    paths: Vec<FieldPath>,
}

impl ConflictSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, path: FieldPath) {
        if !self.paths.contains(&path) {
            self.paths.push(path);
        }
    }

    pub fn merge(&mut self, other: ConflictSet) {
        for path in other.paths {
            self.record(path);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldPath> {
        self.paths.iter()
    }
}

impl fmt::Display for ConflictSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.paths.iter().join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_path_renders_fields_and_indices() {
        let path = FieldPath::new(&["spec", "template", "spec"])
            .child("domain")
            .child("devices")
            .child("disks")
            .index(0)
            .child("bus");
        assert_eq!(
            path.to_string(),
            "spec.template.spec.domain.devices.disks[0].bus"
        );
    }

    #[test]
    fn conflict_set_preserves_detection_order() {
        let mut conflicts = ConflictSet::new();
        conflicts.record(FieldPath::new(&["spec", "b"]));
        conflicts.record(FieldPath::new(&["spec", "a"]));
        let rendered: Vec<String> = conflicts.iter().map(|p| p.to_string()).collect();
        assert_eq!(rendered, vec!["spec.b", "spec.a"]);
    }

    #[test]
    fn conflict_set_deduplicates_structurally_equal_paths() {
        let mut conflicts = ConflictSet::new();
        conflicts.record(FieldPath::new(&["spec", "domain", "cpu", "cores"]));
        conflicts.record(FieldPath::new(&["spec", "domain", "cpu", "cores"]));
        assert_eq!(conflicts.len(), 1);

        let mut other = ConflictSet::new();
        other.record(FieldPath::new(&["spec", "domain", "cpu", "cores"]));
        other.record(FieldPath::new(&["spec", "domain", "cpu", "model"]));
        conflicts.merge(other);
        assert_eq!(conflicts.len(), 2);
        assert_eq!(
            conflicts.to_string(),
            "spec.domain.cpu.cores, spec.domain.cpu.model"
        );
    }

    #[test]
    fn index_distinguishes_list_positions() {
        let disks = FieldPath::new(&["disks"]);
        assert_ne!(disks.index(0), disks.index(1));
        assert_eq!(disks.index(1), FieldPath::new(&["disks"]).index(1));
    }
}
