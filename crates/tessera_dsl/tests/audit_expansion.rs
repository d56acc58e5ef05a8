//! Integration tests for macro expansion over a small audit-trail vocabulary.
//!
//! The vocabulary mirrors a common real-world macro: an `AuditLog` concept
//! attached to an entity derives a parallel `<Name>_Audit` entity plus a
//! reference from the audit entity back to its source. `AuditLog` needs
//! two-phase initialization because the derived audit entity is one of its
//! properties and cannot be parsed from the declaration.

use tessera_dsl::prelude::*;

// ─────────────────────────────────────────────────────────────────────────────
// Test vocabulary
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug)]
struct Entity {
    module: String,
    name: String,
}

impl Entity {
    fn key_for(module: &str, name: &str) -> ConceptKey {
        ConceptKey::new("Entity", [module, name])
    }
}

impl Concept for Entity {
    fn kind(&self) -> &'static str {
        "Entity"
    }

    fn key(&self) -> ConceptKey {
        ConceptKey::new(self.kind(), [self.module.clone(), self.name.clone()])
    }
}

#[derive(Debug)]
struct Reference {
    from: ConceptKey,
    name: String,
    to: ConceptKey,
}

impl Concept for Reference {
    fn kind(&self) -> &'static str {
        "Reference"
    }

    fn key(&self) -> ConceptKey {
        ConceptKey::new(self.kind(), [self.from.to_string(), self.name.clone()])
    }

    fn key_references(&self) -> Vec<ConceptKey> {
        vec![self.from.clone(), self.to.clone()]
    }
}

/// Audit trail for one entity. The audit entity itself is a deferred
/// property: it is derived, not parsed, and is created as a side effect of
/// phase-two initialization.
#[derive(Debug)]
struct AuditLog {
    entity: ConceptKey,
    audit_entity: Option<ConceptKey>,
}

impl AuditLog {
    fn attached_to(entity: ConceptKey) -> Self {
        Self {
            entity,
            audit_entity: None,
        }
    }
}

impl Concept for AuditLog {
    fn kind(&self) -> &'static str {
        "AuditLog"
    }

    fn key(&self) -> ConceptKey {
        ConceptKey::new(self.kind(), [self.entity.to_string()])
    }

    fn key_references(&self) -> Vec<ConceptKey> {
        vec![self.entity.clone()]
    }

    fn as_macro(&self) -> Option<&dyn MacroConcept> {
        Some(self)
    }

    fn as_alternative_init(&mut self) -> Option<&mut dyn AlternativeInitialization> {
        Some(self)
    }
}

impl AlternativeInitialization for AuditLog {
    fn declared_deferred_properties(&self) -> Vec<&'static str> {
        vec!["audit_entity"]
    }

    fn initialize_deferred_properties(&mut self) -> Result<Vec<Box<dyn Concept>>, DslError> {
        let module = self.entity.args()[0].clone();
        let name = format!("{}_Audit", self.entity.args()[1]);
        let audit = Entity {
            module: module.clone(),
            name: name.clone(),
        };
        self.audit_entity = Some(audit.key());
        Ok(vec![Box::new(audit)])
    }
}

impl MacroConcept for AuditLog {
    fn create_new_concepts(&self, _existing: &ConceptSet) -> Result<Vec<Box<dyn Concept>>, DslError> {
        let audit_entity = self.audit_entity.clone().ok_or_else(|| DslError::Expansion {
            concept: self.key().to_string(),
            message: "audit entity was not initialized".into(),
        })?;
        Ok(vec![Box::new(Reference {
            from: audit_entity,
            name: "Source".into(),
            to: self.entity.clone(),
        })])
    }
}

/// Attaches an `AuditLog` to every entity in a module that is not itself an
/// audit entity. Exercises cross-macro rounds: entities created by other
/// macros get audited in a later round.
#[derive(Debug)]
struct AuditAll {
    module: String,
}

impl Concept for AuditAll {
    fn kind(&self) -> &'static str {
        "AuditAll"
    }

    fn key(&self) -> ConceptKey {
        ConceptKey::new(self.kind(), [self.module.clone()])
    }

    fn as_macro(&self) -> Option<&dyn MacroConcept> {
        Some(self)
    }
}

impl MacroConcept for AuditAll {
    fn create_new_concepts(&self, existing: &ConceptSet) -> Result<Vec<Box<dyn Concept>>, DslError> {
        let mut new_concepts: Vec<Box<dyn Concept>> = Vec::new();
        for entity in existing.resolve_kind::<Entity>("Entity") {
            if entity.module != self.module || entity.name.ends_with("_Audit") {
                continue;
            }
            new_concepts.push(Box::new(AuditLog::attached_to(entity.key())));
        }
        Ok(new_concepts)
    }
}

/// Derives one plain entity; stands in for any vocabulary macro that brings
/// new entities into the model.
#[derive(Debug)]
struct DeriveEntity {
    module: String,
    name: String,
}

impl Concept for DeriveEntity {
    fn kind(&self) -> &'static str {
        "DeriveEntity"
    }

    fn key(&self) -> ConceptKey {
        ConceptKey::new(self.kind(), [self.module.clone(), self.name.clone()])
    }

    fn as_macro(&self) -> Option<&dyn MacroConcept> {
        Some(self)
    }
}

impl MacroConcept for DeriveEntity {
    fn create_new_concepts(&self, _existing: &ConceptSet) -> Result<Vec<Box<dyn Concept>>, DslError> {
        Ok(vec![Box::new(Entity {
            module: self.module.clone(),
            name: self.name.clone(),
        })])
    }
}

fn declared(concept: Box<dyn Concept>, line: u32) -> Declaration {
    Declaration::new(concept, SourceLocation::new("audit.tess", line))
}

fn keys_of(model: &ConceptSet) -> Vec<String> {
    let mut keys: Vec<String> = model.keys().map(ToString::to_string).collect();
    keys.sort();
    keys
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn audit_macro_expands_to_the_expected_fixpoint() {
    let driver = MacroExpansion::default();
    let order = Entity {
        module: "Sales".into(),
        name: "Order".into(),
    };
    let audit = AuditLog::attached_to(order.key());

    let model = driver
        .expand(vec![
            declared(Box::new(order), 1),
            declared(Box::new(audit), 2),
        ])
        .unwrap();

    let order_key = Entity::key_for("Sales", "Order");
    let audit_entity_key = Entity::key_for("Sales", "Order_Audit");
    assert!(model.contains(&order_key));
    assert!(model.contains(&audit_entity_key));
    assert!(model.contains(&ConceptKey::new(
        "Reference",
        [audit_entity_key.to_string(), "Source".to_string()],
    )));
    // Order, AuditLog, Order_Audit, Reference.
    assert_eq!(model.len(), 4);

    let audit_log: &AuditLog = model
        .resolve(&ConceptKey::new("AuditLog", [order_key.to_string()]))
        .expect("audit log present");
    assert_eq!(audit_log.audit_entity.as_ref(), Some(&audit_entity_key));
}

#[test]
fn expansion_is_idempotent_across_runs() {
    let seed = || {
        vec![
            declared(
                Box::new(Entity {
                    module: "Sales".into(),
                    name: "Order".into(),
                }),
                1,
            ),
            declared(
                Box::new(AuditLog::attached_to(Entity::key_for("Sales", "Order"))),
                2,
            ),
        ]
    };

    let first = MacroExpansion::default().expand(seed()).unwrap();
    let second = MacroExpansion::default().expand(seed()).unwrap();
    assert_eq!(keys_of(&first), keys_of(&second));
}

#[test]
fn macros_chain_across_rounds() {
    let driver = MacroExpansion::default();
    let model = driver
        .expand(vec![
            declared(
                Box::new(Entity {
                    module: "Sales".into(),
                    name: "Order".into(),
                }),
                1,
            ),
            declared(
                Box::new(DeriveEntity {
                    module: "Sales".into(),
                    name: "Report".into(),
                }),
                2,
            ),
            declared(Box::new(AuditAll { module: "Sales".into() }), 3),
        ])
        .unwrap();

    // The derived Report entity must itself have been audited, even though
    // it did not exist when AuditAll first ran.
    assert!(model.contains(&Entity::key_for("Sales", "Report")));
    assert!(model.contains(&Entity::key_for("Sales", "Report_Audit")));
    assert!(model.contains(&Entity::key_for("Sales", "Order_Audit")));
    // Audit entities themselves are not audited again.
    assert!(!model.contains(&Entity::key_for("Sales", "Order_Audit_Audit")));
}

#[test]
fn concept_order_puts_referenced_entities_first() {
    let driver = MacroExpansion::default();
    let model = driver
        .expand(vec![
            declared(
                Box::new(Entity {
                    module: "Sales".into(),
                    name: "Order".into(),
                }),
                1,
            ),
            declared(
                Box::new(AuditLog::attached_to(Entity::key_for("Sales", "Order"))),
                2,
            ),
        ])
        .unwrap();

    let order = model.dependency_order().unwrap();
    let pos = |key: &ConceptKey| order.iter().position(|k| k == key).expect("in order");

    let source = Entity::key_for("Sales", "Order");
    let audit_entity = Entity::key_for("Sales", "Order_Audit");
    let reference = ConceptKey::new(
        "Reference",
        [audit_entity.to_string(), "Source".to_string()],
    );
    assert!(pos(&source) < pos(&reference));
    assert!(pos(&audit_entity) < pos(&reference));
}

#[test]
fn conflicting_macro_output_is_an_expansion_error() {
    /// Same kind and key as `Entity`, different definition.
    #[derive(Debug)]
    struct ShadowEntity {
        module: String,
        name: String,
    }

    impl Concept for ShadowEntity {
        fn kind(&self) -> &'static str {
            "Entity"
        }

        fn key(&self) -> ConceptKey {
            ConceptKey::new(self.kind(), [self.module.clone(), self.name.clone()])
        }
    }

    #[derive(Debug)]
    struct ShadowMacro;

    impl Concept for ShadowMacro {
        fn kind(&self) -> &'static str {
            "ShadowMacro"
        }

        fn key(&self) -> ConceptKey {
            ConceptKey::new(self.kind(), ["only"])
        }

        fn as_macro(&self) -> Option<&dyn MacroConcept> {
            Some(self)
        }
    }

    impl MacroConcept for ShadowMacro {
        fn create_new_concepts(
            &self,
            _existing: &ConceptSet,
        ) -> Result<Vec<Box<dyn Concept>>, DslError> {
            Ok(vec![Box::new(ShadowEntity {
                module: "Sales".into(),
                name: "Order".into(),
            })])
        }
    }

    let driver = MacroExpansion::default();
    let err = driver
        .expand(vec![
            declared(
                Box::new(Entity {
                    module: "Sales".into(),
                    name: "Order".into(),
                }),
                1,
            ),
            declared(Box::new(ShadowMacro), 2),
        ])
        .unwrap_err();

    match err {
        DslError::Expansion { concept, .. } => {
            assert!(concept.contains("ShadowMacro"));
        }
        other => panic!("expected Expansion error, got {other:?}"),
    }
}
