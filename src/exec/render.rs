// src/exec/render.rs

//! Turn command templates into argv vectors.

use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::config::Config;
use crate::env::{Context, probe::find_executable};
use crate::errors::{MultirunError, Result};

/// Substitute `{name}` fields in `template` from `values`.
///
/// `{{` and `}}` are literal braces. An unknown field is an error rather
/// than being left in place.
pub fn render_template(template: &str, values: &BTreeMap<String, String>) -> Result<String> {
    let malformed = || MultirunError::MalformedTemplate(template.to_string());
    let mut out = String::with_capacity(template.len());
    let mut chars = template.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '{' if chars.peek() == Some(&'{') => {
                chars.next();
                out.push('{');
            }
            '{' => {
                let mut field = String::new();
                loop {
                    match chars.next() {
                        Some('}') => break,
                        Some('{') | None => return Err(malformed()),
                        Some(ch) => field.push(ch),
                    }
                }
                let field = field.trim();
                match values.get(field) {
                    Some(value) => out.push_str(value),
                    None => {
                        return Err(MultirunError::TemplateField {
                            template: template.to_string(),
                            field: field.to_string(),
                        });
                    }
                }
            }
            '}' if chars.peek() == Some(&'}') => {
                chars.next();
                out.push('}');
            }
            '}' => return Err(malformed()),
            other => out.push(other),
        }
    }

    Ok(out)
}

/// Values available to templates: the config's values plus the context's
/// runtime version as `python_version`.
pub fn template_values(config: &Config, context: &Context) -> BTreeMap<String, String> {
    let mut values = config.values.clone();
    values.insert("python_version".to_string(), context.version.to_string());
    values
}

/// Resolve `name` against the environment first, then `PATH`.
///
/// Falls back to `name` unchanged, so a missing tool surfaces as a failed
/// process rather than an error here.
pub fn which(name: &str, context: Option<&Context>) -> String {
    let found: Option<PathBuf> = context
        .and_then(|ctx| find_executable(name, Some(&ctx.bin_dir())))
        .or_else(|| find_executable(name, None));
    match found {
        Some(path) => path.to_string_lossy().into_owned(),
        None => name.to_string(),
    }
}

fn render_argv(template: &str, context: &Context, config: &Config) -> Result<Vec<String>> {
    let line = render_template(template, &template_values(config, context))?;
    match shlex::split(&line) {
        Some(argv) if !argv.is_empty() => Ok(argv),
        _ => Err(MultirunError::MalformedTemplate(template.to_string())),
    }
}

/// Render `template` for `context` without resolving the program.
///
/// Works before the context's environment exists.
pub fn check_template(template: &str, context: &Context, config: &Config) -> Result<()> {
    render_argv(template, context, config).map(|_| ())
}

/// Render a command template into an argv with a resolved program.
pub fn render_command(template: &str, context: &Context, config: &Config) -> Result<Vec<String>> {
    let mut argv = render_argv(template, context, config)?;
    argv[0] = which(&argv[0], Some(context));
    Ok(argv)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn substitutes_and_escapes() {
        let vals = values(&[("module", "frob")]);
        assert_eq!(render_template("flake8 {module}", &vals).unwrap(), "flake8 frob");
        assert_eq!(render_template("echo {{literal}}", &vals).unwrap(), "echo {literal}");
        assert_eq!(render_template("no fields", &vals).unwrap(), "no fields");
    }

    #[test]
    fn unknown_field_names_the_field() {
        let err = render_template("echo {nope}", &BTreeMap::new()).unwrap_err();
        match err {
            MultirunError::TemplateField { field, .. } => assert_eq!(field, "nope"),
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn unbalanced_braces_are_malformed() {
        let vals = BTreeMap::new();
        assert!(matches!(render_template("echo {", &vals), Err(MultirunError::MalformedTemplate(_))));
        assert!(matches!(render_template("echo }", &vals), Err(MultirunError::MalformedTemplate(_))));
    }

    #[test]
    fn which_falls_back_to_name() {
        assert_eq!(which("definitely-not-a-real-binary-xyz", None), "definitely-not-a-real-binary-xyz");
    }
}
