//! Plain-text dump of a bound pipeline.

use std::fmt::Write as _;

use crate::physical::PipelineDefinition;

pub fn explain(def: &PipelineDefinition) -> String {
    let spec = &def.spec;
    let mut out = String::new();
    let _ = writeln!(out, "pipeline {} (plan {})", spec.name, &def.plan_hash.to_hex()[..12]);
    let _ = writeln!(out, "  gate    wait for '{}'", spec.source.artifact);
    for (step, id) in def.order.iter().enumerate() {
        let Some(stage) = spec.stage(*id) else {
            continue;
        };
        let _ = writeln!(
            out,
            "  {:<2}      {} [{}] {} -> {}",
            step + 1,
            stage.name,
            stage.op,
            stage.inputs.join(", "),
            stage.output
        );
    }
    let _ = writeln!(
        out,
        "  load    {} -> {}.{}",
        def.final_artifact(),
        spec.sink.database,
        spec.sink.collection
    );
    out
}
