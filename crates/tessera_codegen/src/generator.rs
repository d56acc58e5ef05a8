//! The code-generator contract and concept-order helpers.
//!
//! Generators are plugins: each one walks the expanded concept model and
//! registers templates and contributions on the shared
//! [`ArtifactAssembler`]. The [`OrderingIndex`] maps concept keys to their
//! position in the model's dependency order, which is the conventional
//! ordering key for contributions: it guarantees that output text follows
//! the model's reference structure instead of plugin iteration order.

use hashbrown::HashMap;

use crate::assembler::ArtifactAssembler;
use crate::error::AssemblyError;
use tessera_dsl::{ConceptKey, ConceptSet, DslError};

// ─────────────────────────────────────────────────────────────────────────────
// CodeGenerator
// ─────────────────────────────────────────────────────────────────────────────

/// A plugin that turns the expanded concept model into artifact text
/// contributions.
///
/// # Example
///
/// ```ignore
/// struct TableGenerator;
///
/// impl CodeGenerator for TableGenerator {
///     fn generate(
///         &self,
///         model: &ConceptSet,
///         assembler: &mut ArtifactAssembler,
///     ) -> Result<(), AssemblyError> {
///         let order = OrderingIndex::from_model(model)?;
///         for (key, concept) in model.iter() {
///             // contribute CREATE TABLE fragments keyed by `order`
///         }
///         Ok(())
///     }
/// }
/// ```
pub trait CodeGenerator: Send + Sync {
    /// The generator's name for diagnostics.
    fn name(&self) -> &str {
        core::any::type_name::<Self>()
    }

    /// Walks the model and registers templates and contributions.
    fn generate(
        &self,
        model: &ConceptSet,
        assembler: &mut ArtifactAssembler,
    ) -> Result<(), AssemblyError>;
}

/// Runs a set of generators against the model, in the given order.
///
/// The given order is expected to be the dependency-sorted plugin order from
/// discovery. The first failure aborts the run; downstream generators assume
/// every earlier contribution landed.
///
/// # Errors
///
/// Propagates the first generator failure unchanged.
pub fn run_generators(
    generators: &[Box<dyn CodeGenerator>],
    model: &ConceptSet,
    assembler: &mut ArtifactAssembler,
) -> Result<(), AssemblyError> {
    for generator in generators {
        tracing::debug!(generator = generator.name(), "running code generator");
        generator.generate(model, assembler)?;
    }
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// OrderingIndex
// ─────────────────────────────────────────────────────────────────────────────

/// Maps each concept key to its position in the model's dependency order.
///
/// Built once per generation run and shared by generators as the source of
/// contribution ordering keys.
pub struct OrderingIndex {
    positions: HashMap<ConceptKey, u64>,
}

impl OrderingIndex {
    /// Derives the index from the model's dependency order.
    ///
    /// # Errors
    ///
    /// Propagates model validation failures (unresolved references, key
    /// cycles) from [`ConceptSet::dependency_order`].
    pub fn from_model(model: &ConceptSet) -> Result<Self, DslError> {
        let order = model.dependency_order()?;
        let positions = order
            .into_iter()
            .enumerate()
            .map(|(position, key)| (key, position as u64))
            .collect();
        Ok(Self { positions })
    }

    /// The ordering key for a concept, if it is part of the model.
    #[must_use]
    pub fn ordering_key(&self, key: &ConceptKey) -> Option<u64> {
        self.positions.get(key).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assembler::{Tag, TemplateId};
    use tessera_dsl::prelude::*;

    #[derive(Debug)]
    struct Item {
        name: String,
        after: Option<ConceptKey>,
    }

    impl Concept for Item {
        fn kind(&self) -> &'static str {
            "Item"
        }

        fn key(&self) -> ConceptKey {
            ConceptKey::new(self.kind(), [self.name.clone()])
        }

        fn key_references(&self) -> Vec<ConceptKey> {
            self.after.clone().into_iter().collect()
        }
    }

    fn model_of_two_items() -> ConceptSet {
        let mut model = ConceptSet::new();
        let first = Item {
            name: "first".into(),
            after: None,
        };
        let first_key = first.key();
        // Declared out of dependency order on purpose.
        model
            .insert(
                Box::new(Item {
                    name: "second".into(),
                    after: Some(first_key),
                }),
                Origin::Declared(SourceLocation::new("t", 1)),
            )
            .unwrap();
        model
            .insert(
                Box::new(first),
                Origin::Declared(SourceLocation::new("t", 2)),
            )
            .unwrap();
        model
    }

    struct ItemGenerator;

    impl CodeGenerator for ItemGenerator {
        fn name(&self) -> &str {
            "ItemGenerator"
        }

        fn generate(
            &self,
            model: &ConceptSet,
            assembler: &mut ArtifactAssembler,
        ) -> Result<(), AssemblyError> {
            let order = OrderingIndex::from_model(model)?;
            let template = TemplateId::new("items.txt");
            assembler.add_template(template.clone(), "{{Items}}");
            for (key, concept) in model.iter() {
                let Some(ordering_key) = order.ordering_key(key) else {
                    continue;
                };
                let item = format!("{};", concept.key().args().join("."));
                assembler.contribute(&template, &Tag::new("Items"), ordering_key, item);
            }
            Ok(())
        }
    }

    #[test]
    fn generator_output_follows_dependency_order() {
        let model = model_of_two_items();
        let mut assembler = ArtifactAssembler::new();
        run_generators(&[Box::new(ItemGenerator)], &model, &mut assembler).unwrap();

        let text = assembler.resolve(&TemplateId::new("items.txt")).unwrap();
        // "first" precedes "second" even though "second" was declared first.
        assert_eq!(text, "first;second;");
    }

    #[test]
    fn ordering_index_covers_every_concept() {
        let model = model_of_two_items();
        let order = OrderingIndex::from_model(&model).unwrap();
        for key in model.keys() {
            assert!(order.ordering_key(key).is_some());
        }
        assert!(order.ordering_key(&ConceptKey::new("Item", ["absent"])).is_none());
    }

    #[test]
    fn failing_generator_aborts_the_run() {
        struct FailingGenerator;
        impl CodeGenerator for FailingGenerator {
            fn name(&self) -> &str {
                "FailingGenerator"
            }
            fn generate(
                &self,
                _model: &ConceptSet,
                _assembler: &mut ArtifactAssembler,
            ) -> Result<(), AssemblyError> {
                Err(AssemblyError::Generator {
                    generator: self.name().to_string(),
                    message: "boom".into(),
                })
            }
        }

        let model = model_of_two_items();
        let mut assembler = ArtifactAssembler::new();
        let err = run_generators(
            &[Box::new(FailingGenerator), Box::new(ItemGenerator)],
            &model,
            &mut assembler,
        )
        .unwrap_err();
        assert!(matches!(err, AssemblyError::Generator { .. }));
        // The second generator never ran.
        assert!(!assembler.has_template(&TemplateId::new("items.txt")));
    }
}
