use crate::cli::InspectArgs;
use crate::error::Result;
use srreal::engine::registries::{ComponentRegistries, TypeDescription};
use std::fmt::Write;
use tracing::info;

pub fn run(args: InspectArgs) -> Result<()> {
    let registries = ComponentRegistries::with_builtins()?;
    info!("Inspecting {} type '{}'.", args.kind, args.type_name);
    let description = registries.describe_type(args.kind, &args.type_name)?;
    print!("{}", render(&args.type_name, &description));
    Ok(())
}

pub fn render(requested: &str, description: &TypeDescription) -> String {
    let mut out = String::new();
    if requested == description.type_name {
        let _ = writeln!(out, "{} '{}'", description.kind, description.type_name);
    } else {
        let _ = writeln!(
            out,
            "{} '{}' (alias '{}')",
            description.kind, description.type_name, requested
        );
    }
    if description.attributes.is_empty() {
        let _ = writeln!(out, "  (no attributes)");
    }
    for attr in &description.attributes {
        let access = if attr.writable { "read-write" } else { "read-only" };
        let _ = writeln!(out, "  {} = {} [{}]", attr.name, attr.value, access);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use srreal::engine::registries::ComponentKind;

    fn describe(kind: ComponentKind, name: &str) -> String {
        let registries = ComponentRegistries::with_builtins().unwrap();
        let description = registries.describe_type(kind, name).unwrap();
        render(name, &description)
    }

    #[test]
    fn render_shows_access_of_each_attribute() {
        let out = describe(ComponentKind::PeakWidth, "constant");
        assert_eq!(
            out,
            "peak-width 'constant'\n  uisowidth = 0 [read-only]\n  width = 0 [read-write]\n"
        );
    }

    #[test]
    fn render_mentions_alias_used() {
        let out = describe(ComponentKind::ScatteringFactorTable, "EN");
        assert_eq!(
            out,
            "scattering-factor-table 'electronnumber' (alias 'EN')\n  (no attributes)\n"
        );
    }
}
