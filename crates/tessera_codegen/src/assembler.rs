//! Template registration, contributions, and tag resolution.
//!
//! A template is plain text containing `{{name}}` markers. Contributions are
//! collected per (template, tag) pair with an explicit ordering key; at
//! resolution time every marker is replaced by the concatenation of its
//! contributions in ascending key order (registration order breaks ties).
//! A contributed fragment may itself contain further markers, which are
//! resolved in subsequent passes; the pass count is bounded so a cycle of
//! mutually contributing tags fails instead of spinning.
//!
//! Markers with zero contributions resolve to empty text. Generation is
//! open-ended: whether anyone contributes to a given insertion point is up
//! to the installed plugins.

use core::fmt;

use indexmap::IndexMap;

use crate::error::AssemblyError;

// ─────────────────────────────────────────────────────────────────────────────
// Identity types
// ─────────────────────────────────────────────────────────────────────────────

/// Identity of a registered template, typically the output artifact path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TemplateId(String);

impl TemplateId {
    /// Creates a template identity.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The identity as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TemplateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A named insertion point inside a template.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Tag(String);

impl Tag {
    /// Creates a tag.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// The tag name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.0
    }

    /// The marker text this tag occupies inside template text.
    #[must_use]
    pub fn marker(&self) -> String {
        format!("{{{{{}}}}}", self.0)
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A registered template: identity plus marker-bearing text.
#[derive(Debug, Clone)]
pub struct Template {
    /// The template's identity.
    pub id: TemplateId,
    /// The template text, containing zero or more `{{tag}}` markers.
    pub text: String,
}

// ─────────────────────────────────────────────────────────────────────────────
// ArtifactAssembler
// ─────────────────────────────────────────────────────────────────────────────

struct Contribution {
    tag: String,
    ordering_key: u64,
    sequence: usize,
    fragment: String,
}

/// Collects templates and contributions, then resolves templates into final
/// artifact text.
///
/// Resolution is deterministic: contributions for a tag are spliced in
/// ascending `ordering_key` order, with registration order breaking ties.
/// Callers derive ordering keys from the concept dependency order (see
/// [`OrderingIndex`](crate::generator::OrderingIndex)) so output does not
/// depend on plugin iteration order.
#[derive(Default)]
pub struct ArtifactAssembler {
    templates: IndexMap<TemplateId, String>,
    contributions: IndexMap<TemplateId, Vec<Contribution>>,
    next_sequence: usize,
}

/// Extra resolution passes allowed beyond one per distinct tag; covers
/// markers introduced by fragments late in the chain.
const PASS_BUDGET_BASE: usize = 4;

impl ArtifactAssembler {
    /// Creates an empty assembler.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a template. Re-registering an id replaces its text.
    pub fn add_template(&mut self, id: TemplateId, text: impl Into<String>) {
        self.templates.insert(id, text.into());
    }

    /// Returns true if a template with the given id is registered.
    #[must_use]
    pub fn has_template(&self, id: &TemplateId) -> bool {
        self.templates.contains_key(id)
    }

    /// Registers a text fragment for a tag of a template.
    ///
    /// Contributions may arrive before or after the template itself; they
    /// are only consulted at resolution time.
    pub fn contribute(
        &mut self,
        template: &TemplateId,
        tag: &Tag,
        ordering_key: u64,
        fragment: impl Into<String>,
    ) {
        let sequence = self.next_sequence;
        self.next_sequence += 1;
        self.contributions
            .entry(template.clone())
            .or_default()
            .push(Contribution {
                tag: tag.name().to_string(),
                ordering_key,
                sequence,
                fragment: fragment.into(),
            });
    }

    /// Resolves a template into final artifact text.
    ///
    /// # Errors
    ///
    /// [`AssemblyError::UnknownTemplate`] when the id was never registered;
    /// [`AssemblyError::PassBudgetExceeded`] when contributed fragments keep
    /// introducing new markers (a contribution cycle).
    pub fn resolve(&self, id: &TemplateId) -> Result<String, AssemblyError> {
        let Some(template_text) = self.templates.get(id) else {
            return Err(AssemblyError::UnknownTemplate { template: id.clone() });
        };

        // Contributions per tag, sorted once: ascending ordering key, then
        // registration sequence.
        let mut by_tag: IndexMap<&str, Vec<&Contribution>> = IndexMap::new();
        if let Some(contributions) = self.contributions.get(id) {
            for contribution in contributions {
                by_tag.entry(contribution.tag.as_str()).or_default().push(contribution);
            }
        }
        for group in by_tag.values_mut() {
            group.sort_by_key(|c| (c.ordering_key, c.sequence));
        }

        let budget = PASS_BUDGET_BASE + by_tag.len();
        let mut text = template_text.clone();
        let mut passes = 0usize;
        loop {
            let (next, replaced) = substitute_markers(&text, &by_tag);
            if replaced == 0 {
                tracing::trace!(template = %id, passes, "template resolved");
                return Ok(next);
            }
            passes += 1;
            if passes > budget {
                return Err(AssemblyError::PassBudgetExceeded {
                    template: id.clone(),
                    passes,
                });
            }
            text = next;
        }
    }

    /// Resolves every registered template, in registration order.
    ///
    /// # Errors
    ///
    /// Fails on the first template that does not resolve; no partial result
    /// is returned.
    pub fn resolve_all(&self) -> Result<IndexMap<TemplateId, String>, AssemblyError> {
        let mut artifacts = IndexMap::with_capacity(self.templates.len());
        for id in self.templates.keys() {
            artifacts.insert(id.clone(), self.resolve(id)?);
        }
        Ok(artifacts)
    }
}

/// Replaces every `{{name}}` marker in `text` with its contributions (empty
/// text when there are none). Returns the new text and the number of markers
/// replaced. Text between braces qualifies as a marker name only if it stays
/// on one line and contains no further braces; anything else is left alone.
fn substitute_markers(
    text: &str,
    by_tag: &IndexMap<&str, Vec<&Contribution>>,
) -> (String, usize) {
    let mut output = String::with_capacity(text.len());
    let mut replaced = 0usize;
    let mut rest = text;

    while let Some(start) = rest.find("{{") {
        let Some(end_offset) = rest[start + 2..].find("}}") else {
            break;
        };
        let name = &rest[start + 2..start + 2 + end_offset];
        if name.contains(['{', '}', '\n']) {
            // Not a marker; emit up to and including the opening braces and
            // keep scanning.
            output.push_str(&rest[..start + 2]);
            rest = &rest[start + 2..];
            continue;
        }

        output.push_str(&rest[..start]);
        let trimmed = name.trim();
        if let Some(group) = by_tag.get(trimmed) {
            for contribution in group {
                output.push_str(&contribution.fragment);
            }
        }
        replaced += 1;
        rest = &rest[start + 2 + end_offset + 2..];
    }
    output.push_str(rest);
    (output, replaced)
}
