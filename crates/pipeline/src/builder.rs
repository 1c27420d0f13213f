//! Pipeline Builder - ordered, named stage factories
//!
//! The builder maps stage names to factories. Insertion order is
//! execution order on the inbound path. Callers adjust the base order with
//! overrides, which are recorded up front and resolved in one pass.
//!
//! # Design
//!
//! - **Resolve once, build per socket**: `resolve()` validates the order and
//!   yields a `PipelineTemplate`; every bound socket calls `build()` on it
//!   for its own stage instances
//! - **Overrides in order**: later overrides see the result of earlier ones
//! - **Fail at configuration time**: ordering problems surface from
//!   `resolve()`, never while datagrams flow
//!
//! # Override rules
//!
//! | name     | position                | result                 |
//! |----------|-------------------------|------------------------|
//! | existing | any                     | factory replaced       |
//! | new      | none                    | appended               |
//! | new      | `First`/`Last`/anchored | spliced in             |
//!
//! A name keeps the slot it first appeared in; a later override only swaps
//! its factory. Consecutive `First` overrides keep their relative order.
//! Anchoring on an unknown stage or on the stage itself is an error.
//!
//! # Example
//!
//! ```ignore
//! let template = PipelineBuilder::base(base_stages)
//!     .put("audit", audit_factory, Some(Position::After("throughput".into())))
//!     .disable("logging")
//!     .resolve()?;
//!
//! let pipeline = template.build(&identity);
//! ```

use crate::stages::{self, BaseStages};
use crate::{Inbound, ListenerIdentity, PipelineError, Result, Stage, StageFactory};
use std::fmt;
use std::sync::Arc;

#[cfg(test)]
#[path = "builder_test.rs"]
mod builder_test;

type Entry = (String, Arc<dyn StageFactory>);

/// Where an override places its stage
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Position {
    First,
    Last,
    Before(String),
    After(String),
}

#[derive(Clone)]
enum Override {
    Put {
        name: String,
        factory: Arc<dyn StageFactory>,
        position: Option<Position>,
    },
    Disable(String),
}

/// Pending changes to a base pipeline
///
/// Captured when a listener is constructed and applied when it launches.
#[derive(Clone, Default)]
pub struct StageOverrides {
    entries: Vec<Override>,
}

impl StageOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a stage
    pub fn put<F: StageFactory + 'static>(
        mut self,
        name: impl Into<String>,
        factory: F,
        position: Option<Position>,
    ) -> Self {
        self.entries.push(Override::Put {
            name: name.into(),
            factory: Arc::new(factory),
            position,
        });
        self
    }

    /// Remove a stage
    pub fn disable(mut self, name: impl Into<String>) -> Self {
        self.entries.push(Override::Disable(name.into()));
        self
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Debug for StageOverrides {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut list = f.debug_list();
        for entry in &self.entries {
            match entry {
                Override::Put { name, position, .. } => {
                    list.entry(&format_args!("put({}, {:?})", name, position));
                }
                Override::Disable(name) => {
                    list.entry(&format_args!("disable({})", name));
                }
            }
        }
        list.finish()
    }
}

/// Builder for a listener's stage order
#[derive(Default)]
pub struct PipelineBuilder {
    base: Vec<Entry>,
    overrides: StageOverrides,
}

impl PipelineBuilder {
    /// Create an empty builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Base order every listener starts from:
    /// `logging` (optional) → `throughput` → `decode` → `handoff`
    pub fn base(base: BaseStages) -> Self {
        let BaseStages {
            logging,
            throughput,
            consumer,
        } = base;

        let mut builder = Self::new();

        if let Some(level) = logging {
            builder = builder.stage(stages::LOGGING, move |identity: &ListenerIdentity| {
                Box::new(stages::LoggingStage::new(identity, level)) as Box<dyn Stage>
            });
        }

        let written = Arc::clone(&throughput);
        builder
            .stage(stages::THROUGHPUT, move |_: &ListenerIdentity| {
                Box::new(stages::ThroughputStage::new(Arc::clone(&throughput))) as Box<dyn Stage>
            })
            .stage(stages::DECODE, |identity: &ListenerIdentity| {
                Box::new(stages::DecodeStage::new(identity)) as Box<dyn Stage>
            })
            .stage(stages::HANDOFF, move |identity: &ListenerIdentity| {
                Box::new(stages::HandoffStage::new(
                    identity,
                    Arc::clone(&consumer),
                    Arc::clone(&written),
                )) as Box<dyn Stage>
            })
    }

    /// Append a base stage, replacing one with the same name in place
    pub fn stage<F: StageFactory + 'static>(mut self, name: impl Into<String>, factory: F) -> Self {
        let name = name.into();
        let factory: Arc<dyn StageFactory> = Arc::new(factory);
        match index_of(&self.base, &name) {
            Some(i) => self.base[i].1 = factory,
            None => self.base.push((name, factory)),
        }
        self
    }

    /// Queue an override
    pub fn put<F: StageFactory + 'static>(
        mut self,
        name: impl Into<String>,
        factory: F,
        position: Option<Position>,
    ) -> Self {
        self.overrides = self.overrides.put(name, factory, position);
        self
    }

    /// Queue removal of a stage
    pub fn disable(mut self, name: impl Into<String>) -> Self {
        self.overrides = self.overrides.disable(name);
        self
    }

    /// Queue a batch of overrides after any already queued
    pub fn overrides(mut self, overrides: StageOverrides) -> Self {
        self.overrides.entries.extend(overrides.entries);
        self
    }

    /// Resolved stage names in execution order
    pub fn names(&self) -> Result<Vec<String>> {
        Ok(self.resolve()?.names().map(str::to_string).collect())
    }

    /// Resolve and build in one step
    pub fn build(&self, identity: &ListenerIdentity) -> Result<Pipeline> {
        Ok(self.resolve()?.build(identity))
    }

    /// Apply every override to the base order
    pub fn resolve(&self) -> Result<PipelineTemplate> {
        let mut stages = self.base.clone();
        // Slot for the next `First` in a run of consecutive `First`s
        let mut first_run = 0usize;

        for entry in &self.overrides.entries {
            match entry {
                Override::Disable(name) => {
                    let i = index_of(&stages, name)
                        .ok_or_else(|| PipelineError::UnknownStage(name.clone()))?;
                    stages.remove(i);
                    first_run = 0;
                }
                Override::Put {
                    name,
                    factory,
                    position: None,
                } => {
                    match index_of(&stages, name) {
                        Some(i) => stages[i].1 = Arc::clone(factory),
                        None => stages.push((name.clone(), Arc::clone(factory))),
                    }
                    first_run = 0;
                }
                Override::Put {
                    name,
                    factory,
                    position: Some(position),
                } => {
                    if let Position::Before(anchor) | Position::After(anchor) = position
                        && anchor == name
                    {
                        return Err(PipelineError::SelfAnchor {
                            stage: name.clone(),
                        });
                    }

                    match index_of(&stages, name) {
                        Some(current) => stages[current].1 = Arc::clone(factory),
                        None => {
                            let at = insert_index(&stages, name, position, first_run)?;
                            stages.insert(at, (name.clone(), Arc::clone(factory)));
                        }
                    }

                    first_run = if *position == Position::First {
                        first_run + 1
                    } else {
                        0
                    };
                }
            }
        }

        Ok(PipelineTemplate { stages })
    }
}

fn index_of(stages: &[Entry], name: &str) -> Option<usize> {
    stages.iter().position(|(n, _)| n == name)
}

fn insert_index(stages: &[Entry], name: &str, position: &Position, first_run: usize) -> Result<usize> {
    match position {
        Position::First => Ok(first_run.min(stages.len())),
        Position::Last => Ok(stages.len()),
        Position::Before(anchor) => {
            index_of(stages, anchor).ok_or_else(|| PipelineError::unknown_anchor(name, anchor))
        }
        Position::After(anchor) => index_of(stages, anchor)
            .map(|i| i + 1)
            .ok_or_else(|| PipelineError::unknown_anchor(name, anchor)),
    }
}

/// A validated stage order, ready to instantiate
#[derive(Clone)]
pub struct PipelineTemplate {
    stages: Vec<Entry>,
}

impl PipelineTemplate {
    /// Stage names in execution order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.stages.iter().map(|(n, _)| n.as_str())
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Create fresh stage instances for one socket
    pub fn build(&self, identity: &ListenerIdentity) -> Pipeline {
        Pipeline {
            stages: self
                .stages
                .iter()
                .map(|(name, factory)| (name.clone(), factory.create(identity)))
                .collect(),
        }
    }
}

impl fmt::Debug for PipelineTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

/// Instantiated stages for one socket
///
/// Items run through the stages in order; a stage returning `None` ends
/// the walk.
pub struct Pipeline {
    stages: Vec<(String, Box<dyn Stage>)>,
}

impl Pipeline {
    /// Run an item through every stage
    ///
    /// Returns whatever the last stage passed on, `None` once consumed.
    #[inline]
    pub fn handle(&self, item: impl Into<Inbound>) -> Option<Inbound> {
        let mut current = item.into();
        for (_, stage) in &self.stages {
            current = stage.handle(current)?;
        }
        Some(current)
    }

    pub fn names(&self) -> Vec<&str> {
        self.stages.iter().map(|(n, _)| n.as_str()).collect()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}
