//! Entry-field priority policy.
//!
//! Computes the ordered list of package.json fields consulted for a package
//! entry point, merging an explicit `main_fields` list with the deprecated
//! flags. Conflicts and empty results are construction-time errors.

use crate::config::{FieldFlag, ResolveOptions};
use crate::error::Error;

/// Deprecated flag processing order. Rust option structs carry no key
/// enumeration order, so the legacy flags apply in this fixed sequence.
const LEGACY_FLAGS: &[(&str, &str)] = &[
    ("browser", "browser"),
    ("module", "module"),
    ("jsnext", "jsnext:main"),
    ("main", "main"),
];

fn legacy_flag(options: &ResolveOptions, name: &str) -> Option<FieldFlag> {
    match name {
        "browser" => options.browser.clone(),
        "module" => options.module.clone(),
        "jsnext" => options.jsnext.clone(),
        "main" => options.main.map(FieldFlag::Toggle),
        _ => None,
    }
}

/// Toggle effect of a flag: string-valued flags count as set but adjust
/// nothing.
fn toggle(options: &ResolveOptions, name: &str) -> Option<bool> {
    legacy_flag(options, name).as_ref().and_then(FieldFlag::as_toggle)
}

/// Compute the final ordered field list from the configured options.
///
/// # Errors
/// `MainFieldsConflict` when `main_fields` is combined with any deprecated
/// flag, `EmptyMainFields` when the merged list ends up empty.
pub fn main_fields(options: &ResolveOptions) -> Result<Vec<String>, Error> {
    let any_legacy = LEGACY_FLAGS
        .iter()
        .any(|(name, _)| legacy_flag(options, name).is_some());
    if options.main_fields.is_some() && any_legacy {
        return Err(Error::MainFieldsConflict);
    }

    let mut fields = options.main_fields.clone().unwrap_or_default();

    for (name, field) in LEGACY_FLAGS {
        match toggle(options, name) {
            Some(false) => fields.retain(|f| f != field),
            Some(true) => {
                if !fields.iter().any(|f| f == field) {
                    fields.push((*field).to_string());
                }
            }
            None => {}
        }
    }

    // Ensure module/main are tried unless the caller explicitly opted out.
    for field in ["module", "main"] {
        let opted_out = toggle(options, field) == Some(false);
        if !opted_out && !fields.iter().any(|f| f == field) {
            fields.push(field.to_string());
        }
    }

    if fields.is_empty() {
        return Err(Error::EmptyMainFields);
    }
    Ok(fields)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn on() -> Option<FieldFlag> {
        Some(FieldFlag::Toggle(true))
    }

    fn off() -> Option<FieldFlag> {
        Some(FieldFlag::Toggle(false))
    }

    #[test]
    fn defaults_are_module_then_main() {
        let fields = main_fields(&ResolveOptions::default()).unwrap();
        assert_eq!(fields, vec!["module", "main"]);
    }

    #[test]
    fn browser_flag_prepends_nothing_but_appends() {
        let opts = ResolveOptions {
            browser: on(),
            ..ResolveOptions::default()
        };
        assert_eq!(main_fields(&opts).unwrap(), vec!["browser", "module", "main"]);
    }

    #[test]
    fn jsnext_flag_uses_legacy_field_name() {
        let opts = ResolveOptions {
            jsnext: on(),
            ..ResolveOptions::default()
        };
        assert_eq!(
            main_fields(&opts).unwrap(),
            vec!["jsnext:main", "module", "main"]
        );
    }

    #[test]
    fn main_false_removes_main() {
        let opts = ResolveOptions {
            main: Some(false),
            ..ResolveOptions::default()
        };
        assert_eq!(main_fields(&opts).unwrap(), vec!["module"]);
    }

    #[test]
    fn all_disabled_is_an_error() {
        let opts = ResolveOptions {
            module: off(),
            main: Some(false),
            ..ResolveOptions::default()
        };
        assert!(matches!(main_fields(&opts), Err(Error::EmptyMainFields)));
    }

    #[test]
    fn main_fields_with_legacy_flag_conflicts() {
        let opts = ResolveOptions {
            main_fields: Some(vec!["module".to_string()]),
            module: on(),
            ..ResolveOptions::default()
        };
        assert!(matches!(main_fields(&opts), Err(Error::MainFieldsConflict)));
    }

    #[test]
    fn string_valued_flag_leaves_the_list_alone() {
        let opts = ResolveOptions {
            module: Some(FieldFlag::Name("es2015".to_string())),
            ..ResolveOptions::default()
        };
        assert_eq!(main_fields(&opts).unwrap(), vec!["module", "main"]);
    }

    #[test]
    fn string_valued_flag_still_conflicts_with_main_fields() {
        let opts = ResolveOptions {
            main_fields: Some(vec!["main".to_string()]),
            jsnext: Some(FieldFlag::Name("jsnext:main".to_string())),
            ..ResolveOptions::default()
        };
        assert!(matches!(main_fields(&opts), Err(Error::MainFieldsConflict)));
    }

    #[test]
    fn idempotent_for_same_options() {
        let opts = ResolveOptions {
            browser: on(),
            jsnext: on(),
            ..ResolveOptions::default()
        };
        assert_eq!(main_fields(&opts).unwrap(), main_fields(&opts).unwrap());
    }
}
