use crate::cli::TypesArgs;
use crate::error::Result;
use srreal::engine::registries::{ComponentKind, ComponentRegistries};
use std::fmt::Write;
use tracing::info;

pub fn run(args: TypesArgs) -> Result<()> {
    let registries = ComponentRegistries::with_builtins()?;
    let kinds: Vec<ComponentKind> = match args.kind {
        Some(kind) => vec![kind],
        None => ComponentKind::ALL.to_vec(),
    };
    info!("Listing registered types for {} kind(s).", kinds.len());
    print!("{}", render(&registries, &kinds));
    Ok(())
}

/// One block per kind: canonical names in order, each followed by its aliases.
pub fn render(registries: &ComponentRegistries, kinds: &[ComponentKind]) -> String {
    let mut out = String::new();
    for kind in kinds {
        let _ = writeln!(out, "{}:", kind);
        let aliases = registries.list_aliases(*kind);
        for type_name in registries.list_types(*kind) {
            let names: Vec<&str> = aliases
                .iter()
                .filter(|(_, canonical)| **canonical == type_name)
                .map(|(alias, _)| alias.as_str())
                .collect();
            if names.is_empty() {
                let _ = writeln!(out, "  {}", type_name);
            } else {
                let _ = writeln!(out, "  {} (aliases: {})", type_name, names.join(", "));
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_lists_types_with_aliases() {
        let registries = ComponentRegistries::with_builtins().unwrap();
        let out = render(&registries, &[ComponentKind::ScatteringFactorTable]);
        assert_eq!(out, "scattering-factor-table:\n  electronnumber (aliases: EN)\n");
    }

    #[test]
    fn render_covers_every_requested_kind() {
        let registries = ComponentRegistries::with_builtins().unwrap();
        let out = render(&registries, &ComponentKind::ALL);
        assert!(out.contains("peak-profile:\n  gauss\n"));
        assert!(out.contains("  debye-waller (aliases: debye_waller)\n"));
        assert!(out.contains("  jeong\n"));
    }

    #[test]
    fn render_of_empty_registries_has_only_headers() {
        let registries = ComponentRegistries::new();
        assert_eq!(
            render(&registries, &[ComponentKind::PeakWidth]),
            "peak-width:\n"
        );
    }
}
