//! Physical program: a validated spec plus bound transforms.
//!
//! `bind` resolves every stage's `op` key through the operator registry and
//! fixes the execution order. The result is what the runner executes.

use std::sync::Arc;

use sluice_core::dag::PipelineSpec;
use sluice_core::hash::{hash_serde, Hash256};
use sluice_core::id::StageId;
use sluice_operators::{OpContext, Registry, Transform};

use crate::error::{PlanError, Result};

/// One stage with its transform instance.
#[derive(Clone)]
pub struct StageBinding {
    pub id: StageId,
    pub key: String,
    pub transform: Arc<dyn Transform>,
}

impl std::fmt::Debug for StageBinding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StageBinding")
            .field("id", &self.id)
            .field("key", &self.key)
            .field("transform", &self.transform.name())
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct PipelineDefinition {
    pub spec: PipelineSpec,
    /// Stage ids in execution order.
    pub order: Vec<StageId>,
    /// Indexed by `StageId`.
    pub bindings: Vec<StageBinding>,
    pub plan_hash: Hash256,
}

impl PipelineDefinition {
    pub fn name(&self) -> &str {
        &self.spec.name
    }

    pub fn binding(&self, id: StageId) -> Option<&StageBinding> {
        self.bindings.get(id.get() as usize)
    }

    /// Artifact the loader reads; always present after `bind`.
    pub fn final_artifact(&self) -> &str {
        self.spec.final_artifact().unwrap_or_default()
    }
}

/// Validate `spec` and instantiate its transforms.
pub fn bind(spec: PipelineSpec, registry: &Registry, ctx: &OpContext) -> Result<PipelineDefinition> {
    spec.validate()?;
    let order = spec.execution_order()?;

    let mut bindings = Vec::with_capacity(spec.stages.len());
    for (idx, stage) in spec.stages.iter().enumerate() {
        let transform = registry
            .build(&stage.op, &stage.params, ctx)
            .map_err(|e| PlanError::Binding {
                stage: stage.name.clone(),
                cause: e.to_string(),
            })?;
        if transform.arity() != stage.inputs.len() {
            return Err(PlanError::Binding {
                stage: stage.name.clone(),
                cause: format!(
                    "{} takes {} input(s), stage declares {}",
                    stage.op,
                    transform.arity(),
                    stage.inputs.len()
                ),
            });
        }
        bindings.push(StageBinding {
            id: StageId::new(idx as u64),
            key: stage.op.clone(),
            transform,
        });
    }

    let plan_hash = hash_serde(&spec)?;
    Ok(PipelineDefinition {
        spec,
        order,
        bindings,
        plan_hash,
    })
}
