//! GA012 fixer: synthesize a conventionally-named health check.

use gantry_core::finding::{Finding, RuleId};
use gantry_core::patch::{PatchSet, UnitCreate};

use crate::aggregate::HEALTH_CHECK_COVERAGE;
use crate::fix::Fixer;
use crate::program::Program;

/// Creates a new unit holding an `IHealthCheck` implementation whose name
/// matches the derived key carried on the finding. The probe body is left
/// for the author; the convention only establishes the association.
pub struct SynthesizeHealthCheck;

impl Fixer for SynthesizeHealthCheck {
    fn rule(&self) -> RuleId {
        HEALTH_CHECK_COVERAGE.id
    }

    fn fix(&self, finding: &Finding, program: &Program) -> PatchSet {
        let Some(name) = finding.property("healthCheckName") else {
            return PatchSet::new();
        };
        // A same-named type appearing since detection means the gap closed.
        if program.symbols.types().any(|(_, t)| t.name == name) {
            return PatchSet::new();
        }
        PatchSet::new().with_create(UnitCreate {
            path: format!("{name}.cs"),
            contents: render_unit(name),
        })
    }
}

fn render_unit(name: &str) -> String {
    format!(
        "using System;\n\
         using System.Threading;\n\
         using System.Threading.Tasks;\n\
         using Microsoft.Extensions.Diagnostics.HealthChecks;\n\
         \n\
         internal class {name} : IHealthCheck\n\
         {{\n\
         \x20   public Task<HealthCheckResult> CheckHealthAsync(HealthCheckContext context, CancellationToken cancellationToken = default)\n\
         \x20   {{\n\
         \x20       throw new NotImplementedException();\n\
         \x20   }}\n\
         }}\n"
    )
}
