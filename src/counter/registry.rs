use super::CounterDefinition;
use crate::error::{Error, Result};
use crate::event::hw::Hardware;
use crate::event::sw::Software;

/// Validated, duplicate-free set of counter definitions.
///
/// The order of insertion is the attach order, and so the slot order of
/// the resulting session.
///
/// # Examples
///
/// ```rust
/// use perfwatch::counter::{CounterDefinition, CounterRegistry};
/// use perfwatch::event::sw::Software;
///
/// let mut registry = CounterRegistry::with_defaults();
/// registry.add(Software::CtxSwitch.into()).unwrap();
///
/// // Same event under a new label is still a duplicate.
/// let again = CounterDefinition::software(Software::CtxSwitch).with_label("cs");
/// assert!(registry.add(again).is_err());
/// assert_eq!(registry.len(), 5);
/// ```
#[derive(Clone, Debug, Default)]
pub struct CounterRegistry {
    definitions: Vec<CounterDefinition>,
}

impl CounterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The built-in counters: instructions, cycles, cache misses and page faults.
    pub fn default_set() -> Vec<CounterDefinition> {
        vec![
            CounterDefinition::hardware(Hardware::Instr),
            CounterDefinition::hardware(Hardware::CpuCycle),
            CounterDefinition::hardware(Hardware::CacheMiss),
            CounterDefinition::software(Software::PageFault),
        ]
    }

    pub fn with_defaults() -> Self {
        Self {
            definitions: Self::default_set(),
        }
    }

    /// Registers every definition in order, stopping at the first invalid one.
    pub fn from_definitions<I>(definitions: I) -> Result<Self>
    where
        I: IntoIterator<Item = CounterDefinition>,
    {
        let mut registry = Self::new();
        for def in definitions {
            registry.add(def)?;
        }
        Ok(registry)
    }

    pub fn add(&mut self, def: CounterDefinition) -> Result<()> {
        Self::validate(&def)?;

        let duplicate = self
            .definitions
            .iter()
            .any(|it| it.label == def.label || (it.kind, it.code) == (def.kind, def.code));
        if duplicate {
            return Err(Error::DuplicateCounter { label: def.label });
        }

        self.definitions.push(def);
        Ok(())
    }

    pub fn validate(def: &CounterDefinition) -> Result<()> {
        if !def.kind.knows(def.code) {
            return Err(Error::UnknownCounterKind {
                ty: def.kind.as_raw(),
                code: def.code,
            });
        }

        // Labels end up as `label=value` tokens of a whitespace separated line.
        let label = &def.label;
        if label.is_empty() || label.contains(|c: char| c.is_whitespace() || c == '=') {
            return Err(Error::InvalidLabel {
                label: label.clone(),
            });
        }

        Ok(())
    }

    pub fn definitions(&self) -> &[CounterDefinition] {
        &self.definitions
    }

    pub fn into_definitions(self) -> Vec<CounterDefinition> {
        self.definitions
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}
