//! Allowed includes: relation eager-loading and relation counts.

use std::sync::Arc;

use crate::query::QueryBuilder;

/// An include operation strategy.
pub trait Include: Send + Sync {
    /// Apply the include to `query` for the internal `include` path.
    fn handle(&self, query: &mut dyn QueryBuilder, include: &str);
}

/// Eager-load a relation path, nesting one preload per dotted segment.
/// Paths whose first segment is not a relation of the builder's model are
/// ignored.
pub struct IncludedRelationship;

impl Include for IncludedRelationship {
    fn handle(&self, query: &mut dyn QueryBuilder, include: &str) {
        let first_segment = include.split('.').next().unwrap_or(include);
        if !query.has_relation(first_segment) {
            tracing::debug!(include, "include does not name a relation; skipping");
            return;
        }

        preload_path(query, include);
    }
}

fn preload_path(query: &mut dyn QueryBuilder, path: &str) {
    match path.split_once('.') {
        Some((head, rest)) => query.preload(head, &mut |sub| preload_path(sub, rest)),
        None => query.preload(path, &mut |_| {}),
    }
}

/// Annotate results with a relation's row count. The internal name carries
/// the count suffix; stripping it yields the relation.
pub struct IncludedCount {
    suffix: String,
}

impl IncludedCount {
    pub fn new(suffix: &str) -> Self {
        Self {
            suffix: suffix.to_string(),
        }
    }
}

impl Include for IncludedCount {
    fn handle(&self, query: &mut dyn QueryBuilder, include: &str) {
        let relation = include.strip_suffix(self.suffix.as_str()).unwrap_or(include);
        query.with_count(relation);
    }
}

/// User callback signature for [`AllowedInclude::callback`].
pub type IncludeCallback = Arc<dyn Fn(&mut dyn QueryBuilder, &str) + Send + Sync>;

/// Escape hatch: the include delegated to a user closure.
pub struct IncludedCallback {
    callback: IncludeCallback,
}

impl IncludedCallback {
    pub fn new<F>(callback: F) -> Self
    where
        F: Fn(&mut dyn QueryBuilder, &str) + Send + Sync + 'static,
    {
        Self {
            callback: Arc::new(callback),
        }
    }
}

impl Include for IncludedCallback {
    fn handle(&self, query: &mut dyn QueryBuilder, include: &str) {
        (self.callback)(query, include);
    }
}

/// A declared, allow-listed include.
pub struct AllowedInclude {
    name: String,
    internal_name: String,
    operation: Arc<dyn Include>,
}

impl AllowedInclude {
    pub fn new(name: &str, operation: Arc<dyn Include>) -> Self {
        Self {
            name: name.to_string(),
            internal_name: name.to_string(),
            operation,
        }
    }

    /// Expand a dotted relation path into one include per prefix, so
    /// requesting the deep path implies its ancestors: `"posts.comments"`
    /// yields `posts`, `posts{suffix}` and `posts.comments`. The count
    /// sibling is added for the first segment only.
    ///
    /// `internal` aliases the path segment-wise when present.
    pub fn relationship(name: &str, internal: Option<&str>, count_suffix: &str) -> Vec<Self> {
        let internal = internal.unwrap_or(name);
        let names: Vec<&str> = name.split('.').collect();
        let internals: Vec<&str> = internal.split('.').collect();

        let mut includes = Vec::new();
        for index in 0..names.len() {
            let prefix = names[..=index].join(".");
            let internal_prefix = if internals.len() > index {
                internals[..=index].join(".")
            } else {
                prefix.clone()
            };

            let mut include = Self::new(&prefix, Arc::new(IncludedRelationship));
            include.internal_name = internal_prefix.clone();
            includes.push(include);

            if index == 0 {
                let mut count = Self::new(
                    &format!("{prefix}{count_suffix}"),
                    Arc::new(IncludedCount::new(count_suffix)),
                );
                count.internal_name = format!("{internal_prefix}{count_suffix}");
                includes.push(count);
            }
        }
        includes
    }

    /// A count include declared directly, e.g. `AllowedInclude::count("postsCount")`.
    pub fn count(name: &str, count_suffix: &str) -> Self {
        Self::new(name, Arc::new(IncludedCount::new(count_suffix)))
    }

    /// A count include whose internal relation differs from the external
    /// name.
    pub fn count_as(name: &str, internal_name: &str, count_suffix: &str) -> Self {
        let mut include = Self::count(name, count_suffix);
        include.internal_name = internal_name.to_string();
        include
    }

    /// Escape hatch: a user closure receives the builder and the internal
    /// include name.
    pub fn callback<F>(name: &str, callback: F) -> Self
    where
        F: Fn(&mut dyn QueryBuilder, &str) + Send + Sync + 'static,
    {
        Self::new(name, Arc::new(IncludedCallback::new(callback)))
    }

    /// Pair a name with a user-supplied [`Include`] implementation.
    pub fn custom(name: &str, operation: Arc<dyn Include>) -> Self {
        Self::new(name, operation)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn internal_name(&self) -> &str {
        &self.internal_name
    }

    pub fn is_for_include(&self, name: &str) -> bool {
        self.name == name
    }

    pub fn include(&self, query: &mut dyn QueryBuilder) {
        self.operation.handle(query, &self.internal_name);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::SqlQuery;
    use crate::schema::test_schema;

    fn query() -> SqlQuery {
        SqlQuery::new(test_schema(), "test_models")
    }

    #[test]
    fn relationship_expands_prefixes_and_adds_one_count_sibling() {
        let includes = AllowedInclude::relationship("a.b", None, "Count");
        let names: Vec<&str> = includes.iter().map(AllowedInclude::name).collect();
        assert_eq!(names, vec!["a", "aCount", "a.b"]);
    }

    #[test]
    fn relationship_aliases_internal_segments() {
        let includes = AllowedInclude::relationship("alias.b", Some("real.b"), "Count");
        let internals: Vec<&str> = includes.iter().map(AllowedInclude::internal_name).collect();
        assert_eq!(internals, vec!["real", "realCount", "real.b"]);
    }

    #[test]
    fn relationship_include_preloads_the_relation() {
        let includes = AllowedInclude::relationship("related_models", None, "Count");
        let mut q = query();
        includes[0].include(&mut q);
        assert_eq!(q.eager_paths(), vec!["related_models"]);
    }

    #[test]
    fn nested_relationship_include_preloads_each_segment() {
        let includes =
            AllowedInclude::relationship("related_models.nested_related_models", None, "Count");
        let mut q = query();
        includes.last().unwrap().include(&mut q);
        assert_eq!(q.eager_paths(), vec!["related_models.nested_related_models"]);
    }

    #[test]
    fn unknown_relation_is_ignored() {
        let include = AllowedInclude::new("not_a_relation", Arc::new(IncludedRelationship));
        let mut q = query();
        include.include(&mut q);
        assert!(q.eager_paths().is_empty());
    }

    #[test]
    fn count_include_strips_the_suffix() {
        let include = AllowedInclude::count("related_modelsCount", "Count");
        let mut q = query();
        include.include(&mut q);
        assert_eq!(q.counted_relations(), ["related_models"]);
    }

    #[test]
    fn count_as_targets_the_internal_relation() {
        let include = AllowedInclude::count_as("relatedCount", "related_modelsCount", "Count");
        assert!(include.is_for_include("relatedCount"));
        let mut q = query();
        include.include(&mut q);
        assert_eq!(q.counted_relations(), ["related_models"]);
    }

    #[test]
    fn callback_include_receives_the_internal_name() {
        let include = AllowedInclude::callback("related_models", |query, name| {
            query.with_count(name);
        });
        let mut q = query();
        include.include(&mut q);
        assert_eq!(q.counted_relations(), ["related_models"]);
    }
}
